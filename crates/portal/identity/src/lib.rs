//! Portal Identity - student directory and login resolution
//!
//! The directory is the single source of truth for student records. Every
//! lifecycle mutation goes through [`StudentDirectory::with_student_mut`],
//! whose write lock serializes all changes to a record.
//!
//! Login is deterministic: one reserved address resolves to the admin role,
//! every other known email resolves to its student record, and unknown
//! emails fail instead of silently creating an account.

#![deny(unsafe_code)]

use portal_types::{ApplicationStatus, Role, Student, StudentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// The reserved login address that resolves to the admin role.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@portal.dev";

/// Demo roster used by the presentation shell and the test suites: one
/// student per interesting lifecycle stage.
pub const DEMO_ROSTER: &str = r#"[
    { "name": "Alice",   "email": "alice@example.com",   "status": "IN_PROGRESS" },
    { "name": "Bob",     "email": "bob@example.com",     "status": "OFFER_RELEASED" },
    { "name": "Charlie", "email": "charlie@example.com", "status": "INTERVIEW_PENDING" }
]"#;

/// Request to register a new student.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    /// Whether the registration form was fully completed. Complete
    /// registrations skip straight to the interview queue.
    pub complete: bool,
}

/// Resolved login identity: a role plus, for students, the backing record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginIdentity {
    pub role: Role,
    pub student_id: Option<StudentId>,
}

#[derive(Clone, Debug, Deserialize)]
struct RosterEntry {
    name: String,
    email: String,
    status: ApplicationStatus,
}

struct DirectoryInner {
    students: HashMap<StudentId, Student>,
    by_email: HashMap<String, StudentId>,
}

/// In-memory student directory.
pub struct StudentDirectory {
    admin_email: String,
    inner: RwLock<DirectoryInner>,
}

impl StudentDirectory {
    pub fn new() -> Self {
        Self::with_admin_email(DEFAULT_ADMIN_EMAIL)
    }

    pub fn with_admin_email(admin_email: impl Into<String>) -> Self {
        Self {
            admin_email: admin_email.into(),
            inner: RwLock::new(DirectoryInner {
                students: HashMap::new(),
                by_email: HashMap::new(),
            }),
        }
    }

    /// Directory pre-populated with the demo roster.
    pub fn seeded() -> Result<Self, IdentityError> {
        let directory = Self::new();
        directory.load_roster(DEMO_ROSTER)?;
        Ok(directory)
    }

    /// Load students from a JSON roster. Entries with already-registered
    /// emails are rejected as duplicates.
    pub fn load_roster(&self, roster_json: &str) -> Result<Vec<StudentId>, IdentityError> {
        let entries: Vec<RosterEntry> = serde_json::from_str(roster_json)
            .map_err(|err| IdentityError::InvalidRoster(err.to_string()))?;

        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let student = Student::new(entry.name, entry.email, entry.status);
            ids.push(self.insert(student)?);
        }
        Ok(ids)
    }

    /// Register a new student. A complete registration starts at
    /// `InterviewPending`, an incomplete one at `Registered`.
    pub fn register(&self, request: RegistrationRequest) -> Result<Student, IdentityError> {
        let name = request.name.trim();
        let email = request.email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(IdentityError::InvalidRegistration(
                "name and email are required".to_string(),
            ));
        }
        if email == self.admin_email {
            return Err(IdentityError::InvalidRegistration(
                "reserved address".to_string(),
            ));
        }

        let status = if request.complete {
            ApplicationStatus::InterviewPending
        } else {
            ApplicationStatus::Registered
        };

        let student = Student::new(name, email, status);
        let id = self.insert(student)?;
        self.get(&id)
    }

    /// Resolve a login email to a role and, for students, a record.
    ///
    /// Lookup is case-sensitive: the email is the key exactly as registered.
    pub fn resolve_login(&self, email: &str) -> Result<LoginIdentity, IdentityError> {
        if email == self.admin_email {
            return Ok(LoginIdentity {
                role: Role::Admin,
                student_id: None,
            });
        }

        let inner = self.inner.read().map_err(|_| IdentityError::LockPoisoned)?;
        let id = inner
            .by_email
            .get(email)
            .ok_or_else(|| IdentityError::UnknownEmail(email.to_string()))?;
        Ok(LoginIdentity {
            role: Role::Student,
            student_id: Some(id.clone()),
        })
    }

    /// Fetch a student record by id.
    pub fn get(&self, id: &StudentId) -> Result<Student, IdentityError> {
        let inner = self.inner.read().map_err(|_| IdentityError::LockPoisoned)?;
        inner
            .students
            .get(id)
            .cloned()
            .ok_or_else(|| IdentityError::UnknownStudent(id.to_string()))
    }

    /// All records, in no particular order.
    pub fn list(&self) -> Result<Vec<Student>, IdentityError> {
        let inner = self.inner.read().map_err(|_| IdentityError::LockPoisoned)?;
        Ok(inner.students.values().cloned().collect())
    }

    /// Run a mutation against one student record under the write lock.
    ///
    /// The lock makes the read-modify-write atomic and serializes every
    /// mutation on the same record, which keeps `status`, `proposal_status`
    /// and `banned` mutually consistent.
    pub fn with_student_mut<R>(
        &self,
        id: &StudentId,
        f: impl FnOnce(&mut Student) -> R,
    ) -> Result<R, IdentityError> {
        let mut inner = self.inner.write().map_err(|_| IdentityError::LockPoisoned)?;
        let student = inner
            .students
            .get_mut(id)
            .ok_or_else(|| IdentityError::UnknownStudent(id.to_string()))?;
        Ok(f(student))
    }

    fn insert(&self, student: Student) -> Result<StudentId, IdentityError> {
        let mut inner = self.inner.write().map_err(|_| IdentityError::LockPoisoned)?;
        if inner.by_email.contains_key(&student.email) {
            return Err(IdentityError::DuplicateEmail(student.email));
        }
        let id = student.id.clone();
        inner.by_email.insert(student.email.clone(), id.clone());
        inner.students.insert(id.clone(), student);
        Ok(id)
    }
}

impl Default for StudentDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity-related errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Unknown login email: {0}")]
    UnknownEmail(String),

    #[error("Unknown student: {0}")]
    UnknownStudent(String),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    #[error("Directory lock poisoned")]
    LockPoisoned,
}
