//! Portal Integrity - paste detection on the knowledge-check surface
//!
//! A single input surface is flagged: the knowledge-check answer field. Any
//! paste event observed there bans the acting student on the spot. No
//! retry, no confirmation, no threshold; the first occurrence is terminal.
//!
//! Events on other surfaces are recorded for audit but carry no sanction.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use portal_lifecycle::{LifecycleEngine, LifecycleError};
use portal_types::StudentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::warn;

/// Input surfaces the monitor can observe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSurface {
    /// The flagged surface. Pasting here is a violation.
    KnowledgeCheck,
    ProposalForm,
    DailyJournal,
}

impl InputSurface {
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::KnowledgeCheck)
    }
}

/// Outcome of reporting a paste event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasteOutcome {
    /// The surface was flagged; the student is now banned.
    Banned,
    /// The surface was not flagged; the event was recorded only.
    Recorded,
}

/// One observed paste event, append-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntegrityEvent {
    pub student: StudentId,
    pub surface: InputSurface,
    pub observed_at: DateTime<Utc>,
    pub sanctioned: bool,
}

/// Watches the flagged input surface and forces the ban transition.
pub struct IntegrityMonitor {
    engine: Arc<LifecycleEngine>,
    events: RwLock<HashMap<StudentId, Vec<IntegrityEvent>>>,
}

pub const PASTE_BAN_REASON: &str = "paste detected on knowledge-check answer field";

impl IntegrityMonitor {
    pub fn new(engine: Arc<LifecycleEngine>) -> Self {
        Self {
            engine,
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Report a paste event for `student` on `surface`.
    ///
    /// A paste on the flagged surface bans that student and nobody else.
    /// Repeated reports for an already-banned student still succeed; the
    /// ban is idempotent.
    pub fn report_paste(
        &self,
        student: &StudentId,
        surface: InputSurface,
    ) -> Result<PasteOutcome, IntegrityError> {
        let sanctioned = surface.is_flagged();
        if sanctioned {
            warn!(student = %student, ?surface, "paste violation, forcing ban");
            self.engine.ban(student, PASTE_BAN_REASON)?;
        }

        let event = IntegrityEvent {
            student: student.clone(),
            surface,
            observed_at: Utc::now(),
            sanctioned,
        };
        let mut events = self
            .events
            .write()
            .map_err(|_| IntegrityError::LockPoisoned)?;
        events.entry(student.clone()).or_default().push(event);

        Ok(if sanctioned {
            PasteOutcome::Banned
        } else {
            PasteOutcome::Recorded
        })
    }

    /// Append-only event trail for one student.
    pub fn events_for(&self, student: &StudentId) -> Result<Vec<IntegrityEvent>, IntegrityError> {
        let events = self
            .events
            .read()
            .map_err(|_| IntegrityError::LockPoisoned)?;
        Ok(events.get(student).cloned().unwrap_or_default())
    }
}

/// Integrity-related errors.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Event log lock poisoned")]
    LockPoisoned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_identity::{RegistrationRequest, StudentDirectory};

    fn monitor_with_students() -> (IntegrityMonitor, StudentId, StudentId) {
        let directory = Arc::new(StudentDirectory::new());
        let a = directory
            .register(RegistrationRequest {
                name: "A".to_string(),
                email: "a@example.com".to_string(),
                complete: true,
            })
            .unwrap()
            .id;
        let b = directory
            .register(RegistrationRequest {
                name: "B".to_string(),
                email: "b@example.com".to_string(),
                complete: true,
            })
            .unwrap()
            .id;
        let engine = Arc::new(LifecycleEngine::new(Arc::clone(&directory)));
        (IntegrityMonitor::new(engine), a, b)
    }

    #[test]
    fn paste_on_flagged_surface_bans_only_that_student() {
        let (monitor, a, b) = monitor_with_students();

        let outcome = monitor.report_paste(&a, InputSurface::KnowledgeCheck).unwrap();
        assert_eq!(outcome, PasteOutcome::Banned);

        let directory = monitor.engine.directory();
        assert!(directory.get(&a).unwrap().banned);
        assert!(!directory.get(&b).unwrap().banned);
    }

    #[test]
    fn paste_on_unflagged_surface_is_recorded_without_sanction() {
        let (monitor, a, _) = monitor_with_students();

        let outcome = monitor.report_paste(&a, InputSurface::DailyJournal).unwrap();
        assert_eq!(outcome, PasteOutcome::Recorded);
        assert!(!monitor.engine.directory().get(&a).unwrap().banned);

        let events = monitor.events_for(&a).unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].sanctioned);
    }

    #[test]
    fn repeated_violations_stay_banned_and_keep_appending() {
        let (monitor, a, _) = monitor_with_students();

        monitor.report_paste(&a, InputSurface::KnowledgeCheck).unwrap();
        monitor.report_paste(&a, InputSurface::KnowledgeCheck).unwrap();

        assert!(monitor.engine.directory().get(&a).unwrap().banned);
        assert_eq!(monitor.events_for(&a).unwrap().len(), 2);
    }
}
