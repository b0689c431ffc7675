//! Portal Interview - the interview boundary and the advisory AI seam
//!
//! The core does not grade interviews. Submitting answers moves a student
//! from `InterviewPending` to `InterviewCompleted` unconditionally; whether
//! that turns into an offer or a rejection is an admin decision made later,
//! with the retained transcript at hand.
//!
//! The AI collaborator is strictly advisory: it answers questions, it has no
//! write access to student state, and its failure degrades to an empty
//! answer instead of surfacing into any transition.

#![deny(unsafe_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_lifecycle::{LifecycleEngine, LifecycleError};
use portal_types::StudentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Default bound on one advisor round-trip.
pub const DEFAULT_ADVISOR_TIMEOUT: Duration = Duration::from_secs(10);

/// One question/answer pair from the interview form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterviewAnswer {
    pub question: String,
    pub answer: String,
}

/// A submitted interview, retained for admin review.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterviewTranscript {
    pub student: StudentId,
    pub answers: Vec<InterviewAnswer>,
    pub submitted_at: DateTime<Utc>,
}

/// Advisory text-completion collaborator.
#[async_trait]
pub trait CourseAdvisor: Send + Sync {
    async fn ask(&self, context: &str, question: &str) -> Result<String, AdvisorError>;
}

#[derive(Debug, Error)]
#[error("Advisor unavailable: {0}")]
pub struct AdvisorError(pub String);

/// Default advisor with no transport configured. A real completion backend
/// plugs in through the trait.
#[derive(Debug, Default)]
pub struct NoopAdvisor;

#[async_trait]
impl CourseAdvisor for NoopAdvisor {
    async fn ask(&self, _context: &str, _question: &str) -> Result<String, AdvisorError> {
        Err(AdvisorError("advisor transport not configured".to_string()))
    }
}

/// The interview desk: receives answers, triggers the status transition,
/// and fronts the advisory collaborator.
pub struct InterviewDesk {
    engine: Arc<LifecycleEngine>,
    advisor: Arc<dyn CourseAdvisor>,
    advisor_timeout: Duration,
    transcripts: RwLock<HashMap<StudentId, InterviewTranscript>>,
}

impl InterviewDesk {
    pub fn new(engine: Arc<LifecycleEngine>, advisor: Arc<dyn CourseAdvisor>) -> Self {
        Self {
            engine,
            advisor,
            advisor_timeout: DEFAULT_ADVISOR_TIMEOUT,
            transcripts: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_advisor_timeout(mut self, timeout: Duration) -> Self {
        self.advisor_timeout = timeout;
        self
    }

    /// Accept interview answers and complete the interview stage.
    ///
    /// The transition is unconditional once answers are received; an empty
    /// submission is a validation failure and changes nothing.
    pub fn submit_interview(
        &self,
        student: &StudentId,
        answers: Vec<InterviewAnswer>,
    ) -> Result<(), InterviewError> {
        if answers.is_empty() {
            return Err(InterviewError::Validation(
                "interview submission must contain at least one answer".to_string(),
            ));
        }

        self.engine.complete_interview(student)?;

        let mut transcripts = self
            .transcripts
            .write()
            .map_err(|_| InterviewError::LockPoisoned)?;
        transcripts.insert(
            student.clone(),
            InterviewTranscript {
                student: student.clone(),
                answers,
                submitted_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Retained transcript for admin review, if one was submitted.
    pub fn transcript_for(
        &self,
        student: &StudentId,
    ) -> Result<Option<InterviewTranscript>, InterviewError> {
        let transcripts = self
            .transcripts
            .read()
            .map_err(|_| InterviewError::LockPoisoned)?;
        Ok(transcripts.get(student).cloned())
    }

    /// Ask the advisory collaborator a contextual course question.
    ///
    /// Timeouts and transport failures degrade to the empty answer; no
    /// student record is touched either way.
    pub async fn ask_course_question(&self, context: &str, question: &str) -> String {
        let call = self.advisor.ask(context, question);
        match tokio::time::timeout(self.advisor_timeout, call).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(err)) => {
                warn!(%err, "advisor call failed, degrading to empty answer");
                String::new()
            }
            Err(_) => {
                warn!(timeout = ?self.advisor_timeout, "advisor call timed out");
                String::new()
            }
        }
    }
}

/// Interview-related errors.
#[derive(Debug, Error)]
pub enum InterviewError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Transcript lock poisoned")]
    LockPoisoned,
}
