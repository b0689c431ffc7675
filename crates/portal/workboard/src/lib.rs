//! Portal Workboard - per-student kanban boards
//!
//! Boards are scoped per student with no cross-student visibility. A task
//! sits in exactly one column; moving it is an atomic reassignment, never a
//! copy. No ordering or priority is tracked within a column - render order
//! is structural order.
//!
//! Every board operation fails with [`WorkboardError::Forbidden`] once the
//! owning student is banned, independent of application status.

#![deny(unsafe_code)]

use portal_identity::{IdentityError, StudentDirectory};
use portal_types::{KanbanTask, StudentId, TaskId, TaskStatus};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Per-student kanban state.
pub struct Workboard {
    directory: Arc<StudentDirectory>,
    boards: RwLock<HashMap<StudentId, Vec<KanbanTask>>>,
}

impl Workboard {
    pub fn new(directory: Arc<StudentDirectory>) -> Self {
        Self {
            directory,
            boards: RwLock::new(HashMap::new()),
        }
    }

    /// Install the starter board every enrolled student begins with.
    pub fn seed_default_board(&self, student: &StudentId) -> Result<(), WorkboardError> {
        let starter = vec![
            KanbanTask {
                id: TaskId::new("1"),
                title: "Setup Environment".to_string(),
                description: "Install the toolchain and editor".to_string(),
                status: TaskStatus::Done,
            },
            KanbanTask {
                id: TaskId::new("2"),
                title: "Complete Module 1".to_string(),
                description: "Work through the first course module".to_string(),
                status: TaskStatus::InProgress,
            },
            KanbanTask {
                id: TaskId::new("3"),
                title: "Submit Proposal".to_string(),
                description: "Draft the problem statement".to_string(),
                status: TaskStatus::Todo,
            },
        ];
        self.seed_board(student, starter)
    }

    /// Replace a student's board with the given tasks.
    pub fn seed_board(
        &self,
        student: &StudentId,
        tasks: Vec<KanbanTask>,
    ) -> Result<(), WorkboardError> {
        self.ensure_active(student)?;
        let mut boards = self.write_boards()?;
        boards.insert(student.clone(), tasks);
        Ok(())
    }

    /// Add a new task; it starts in the `Todo` column.
    pub fn add_task(
        &self,
        student: &StudentId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<KanbanTask, WorkboardError> {
        self.ensure_active(student)?;
        let task = KanbanTask {
            id: TaskId::generate(),
            title: title.into(),
            description: description.into(),
            status: TaskStatus::Todo,
        };
        let mut boards = self.write_boards()?;
        boards.entry(student.clone()).or_default().push(task.clone());
        Ok(task)
    }

    /// Reassign a task to a new column.
    pub fn move_task(
        &self,
        student: &StudentId,
        task_id: &TaskId,
        new_status: TaskStatus,
    ) -> Result<KanbanTask, WorkboardError> {
        self.ensure_active(student)?;
        let mut boards = self.write_boards()?;
        let board = boards
            .get_mut(student)
            .ok_or_else(|| WorkboardError::TaskNotFound(task_id.to_string()))?;
        let task = board
            .iter_mut()
            .find(|task| &task.id == task_id)
            .ok_or_else(|| WorkboardError::TaskNotFound(task_id.to_string()))?;
        task.status = new_status;
        Ok(task.clone())
    }

    /// Filtered read view of one column. No mutation.
    pub fn list_tasks_by_status(
        &self,
        student: &StudentId,
        status: TaskStatus,
    ) -> Result<Vec<KanbanTask>, WorkboardError> {
        self.ensure_active(student)?;
        let boards = self.read_boards()?;
        Ok(boards
            .get(student)
            .map(|board| {
                board
                    .iter()
                    .filter(|task| task.status == status)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Full board snapshot.
    pub fn tasks(&self, student: &StudentId) -> Result<Vec<KanbanTask>, WorkboardError> {
        self.ensure_active(student)?;
        let boards = self.read_boards()?;
        Ok(boards.get(student).cloned().unwrap_or_default())
    }

    fn ensure_active(&self, student: &StudentId) -> Result<(), WorkboardError> {
        let record = self.directory.get(student)?;
        if record.banned {
            return Err(WorkboardError::Forbidden(student.to_string()));
        }
        Ok(())
    }

    fn read_boards(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<StudentId, Vec<KanbanTask>>>, WorkboardError>
    {
        self.boards.read().map_err(|_| WorkboardError::LockPoisoned)
    }

    fn write_boards(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<StudentId, Vec<KanbanTask>>>, WorkboardError>
    {
        self.boards.write().map_err(|_| WorkboardError::LockPoisoned)
    }
}

/// Workboard-related errors.
#[derive(Debug, Error)]
pub enum WorkboardError {
    #[error("Account suspended: {0}")]
    Forbidden(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("Board lock poisoned")]
    LockPoisoned,
}

impl From<IdentityError> for WorkboardError {
    fn from(value: IdentityError) -> Self {
        match value {
            IdentityError::LockPoisoned => Self::LockPoisoned,
            other => Self::StudentNotFound(other.to_string()),
        }
    }
}
