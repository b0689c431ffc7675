//! Portal Types - the entity model for the internship portal
//!
//! Every record a student's lifecycle touches lives here: identity,
//! application status, proposal, kanban tasks and daily logs. The types are
//! deliberately dumb; all business rules live in `portal-lifecycle`.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);
impl StudentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);
impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogId(pub String);
impl LogId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
impl std::fmt::Display for LogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Application status - the seven-state machine a student moves through.
///
/// The serialized names match the wire values the presentation shell renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Registered,
    InterviewPending,
    InterviewCompleted,
    Rejected,
    OfferReleased,
    OfferAccepted,
    InProgress,
    Completed,
}

impl ApplicationStatus {
    /// Terminal states have no outgoing edge.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }

    /// True once the student has accepted an offer (or is past that point).
    pub fn is_enrolled(&self) -> bool {
        matches!(self, Self::OfferAccepted | Self::InProgress | Self::Completed)
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Registered => "REGISTERED",
            Self::InterviewPending => "INTERVIEW_PENDING",
            Self::InterviewCompleted => "INTERVIEW_COMPLETED",
            Self::Rejected => "REJECTED",
            Self::OfferReleased => "OFFER_RELEASED",
            Self::OfferAccepted => "OFFER_ACCEPTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        };
        write!(f, "{name}")
    }
}

/// Proposal status - a one-deep approval queue orthogonal to the
/// application status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    NotSubmitted,
    Pending,
    Approved,
    Rejected,
}

/// Kanban column a task sits in. A task is in exactly one column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Student,
}

/// A student record. Mutated exclusively through the lifecycle engine;
/// never deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    /// Unique, case-sensitive login key.
    pub email: String,
    pub name: String,
    pub status: ApplicationStatus,
    pub proposal_status: ProposalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_text: Option<String>,
    /// Monotonic: once true, no operation resets it.
    pub banned: bool,
    /// Course completion percentage, 0..=100.
    pub progress: u8,
    /// Append-only journal, insertion order is chronological.
    pub logs: Vec<DailyLog>,
    pub registered_at: DateTime<Utc>,
}

impl Student {
    pub fn new(name: impl Into<String>, email: impl Into<String>, status: ApplicationStatus) -> Self {
        Self {
            id: StudentId::generate(),
            email: email.into(),
            name: name.into(),
            status,
            proposal_status: ProposalStatus::NotSubmitted,
            proposal_text: None,
            banned: false,
            progress: 0,
            logs: Vec::new(),
            registered_at: Utc::now(),
        }
    }
}

/// One daily journal entry. Append-only; no edit or delete exists.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DailyLog {
    pub id: LogId,
    pub date: DateTime<Utc>,
    pub content: String,
}

impl DailyLog {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: LogId::generate(),
            date: Utc::now(),
            content: content.into(),
        }
    }
}

/// A task on a student's kanban board.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KanbanTask {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
}

/// The offer-letter artifact released when a student accepts an offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDocument {
    pub content: String,
    pub filename: String,
}

/// The closed set of transition requests the engine understands.
///
/// The authorization gate keys off `is_self_service`, so adding an action
/// here forces an explicit permission decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleAction {
    AdvanceToInterview,
    SubmitInterview,
    ApproveApplication,
    RejectApplication,
    AcceptOffer,
    SettleEnrollment,
    CertifyCompletion,
    SubmitProposal,
    ApproveProposal,
    RejectProposal,
    RecordLog,
    SetProgress,
    MoveTask,
    ReportPasteViolation,
    Ban,
}

impl LifecycleAction {
    /// Actions a student may invoke on their own record. Everything else is
    /// admin-only.
    pub fn is_self_service(&self) -> bool {
        matches!(
            self,
            Self::SubmitInterview
                | Self::AcceptOffer
                | Self::SettleEnrollment
                | Self::SubmitProposal
                | Self::RecordLog
                | Self::MoveTask
                | Self::ReportPasteViolation
        )
    }
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(ApplicationStatus::Rejected.is_terminal());
        assert!(ApplicationStatus::Completed.is_terminal());
        assert!(!ApplicationStatus::OfferReleased.is_terminal());
    }

    #[test]
    fn self_service_actions_are_the_student_facing_ones() {
        assert!(LifecycleAction::AcceptOffer.is_self_service());
        assert!(LifecycleAction::SubmitProposal.is_self_service());
        assert!(!LifecycleAction::ApproveApplication.is_self_service());
        assert!(!LifecycleAction::Ban.is_self_service());
        assert!(!LifecycleAction::SetProgress.is_self_service());
    }

    #[test]
    fn new_student_starts_clean() {
        let student = Student::new("Alice", "alice@example.com", ApplicationStatus::Registered);
        assert_eq!(student.proposal_status, ProposalStatus::NotSubmitted);
        assert!(!student.banned);
        assert_eq!(student.progress, 0);
        assert!(student.logs.is_empty());
    }
}
