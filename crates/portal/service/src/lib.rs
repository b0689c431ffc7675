//! Portal Service - the unified internship portal facade
//!
//! The only entry point callers use. Every mutation resolves the acting
//! identity, passes the authorization gate, and only then reaches the
//! component that owns the state; the lifecycle engine is unreachable with
//! an unauthorized actor. The presentation shell reads through the view
//! methods and never mutates state directly.

#![deny(unsafe_code)]

use portal_authz::{Actor, AuthorizationError, AuthorizationGate};
use portal_identity::{IdentityError, LoginIdentity, RegistrationRequest, StudentDirectory};
use portal_integrity::{InputSurface, IntegrityError, IntegrityEvent, IntegrityMonitor, PasteOutcome};
use portal_interview::{
    CourseAdvisor, InterviewAnswer, InterviewDesk, InterviewError, InterviewTranscript, NoopAdvisor,
};
use portal_lifecycle::{LifecycleEngine, LifecycleError, OfferRenderer, TextOfferRenderer};
use portal_types::{
    ApplicationStatus, DailyLog, KanbanTask, LifecycleAction, OfferDocument, ProposalStatus,
    Student, StudentId, TaskId, TaskStatus,
};
use portal_workboard::{Workboard, WorkboardError};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub use portal_authz::Actor as PortalActor;

/// The internship portal core behind one API.
pub struct PortalService {
    directory: Arc<StudentDirectory>,
    gate: AuthorizationGate,
    engine: Arc<LifecycleEngine>,
    monitor: IntegrityMonitor,
    workboard: Workboard,
    desk: InterviewDesk,
}

impl PortalService {
    /// Empty portal with the default offer renderer and a no-op advisor.
    pub fn new() -> Self {
        Self::with_collaborators(
            Arc::new(StudentDirectory::new()),
            Arc::new(TextOfferRenderer::default()),
            Arc::new(NoopAdvisor),
        )
    }

    /// Portal pre-populated with the demo roster; enrolled students get the
    /// starter board.
    pub fn seeded() -> Result<Self, PortalError> {
        let service = Self::with_collaborators(
            Arc::new(StudentDirectory::seeded()?),
            Arc::new(TextOfferRenderer::default()),
            Arc::new(NoopAdvisor),
        );
        for student in service.directory.list()? {
            if student.status.is_enrolled() {
                service.workboard.seed_default_board(&student.id)?;
            }
        }
        Ok(service)
    }

    /// Portal with explicit collaborators (directory, offer renderer, AI
    /// advisor).
    pub fn with_collaborators(
        directory: Arc<StudentDirectory>,
        renderer: Arc<dyn OfferRenderer>,
        advisor: Arc<dyn CourseAdvisor>,
    ) -> Self {
        let engine = Arc::new(LifecycleEngine::with_renderer(
            Arc::clone(&directory),
            renderer,
        ));
        Self {
            gate: AuthorizationGate::new(),
            monitor: IntegrityMonitor::new(Arc::clone(&engine)),
            workboard: Workboard::new(Arc::clone(&directory)),
            desk: InterviewDesk::new(Arc::clone(&engine), advisor),
            directory,
            engine,
        }
    }

    // ── identity ────────────────────────────────────────────────────

    /// Resolve a login email to an actor-shaped identity. Unknown emails
    /// fail; no account is ever created here.
    pub fn login(&self, email: &str) -> Result<LoginIdentity, PortalError> {
        Ok(self.directory.resolve_login(email)?)
    }

    /// Public self-registration.
    pub fn register_student(&self, request: RegistrationRequest) -> Result<Student, PortalError> {
        Ok(self.directory.register(request)?)
    }

    // ── application status transitions ──────────────────────────────

    pub fn advance_to_interview(
        &self,
        actor: &Actor,
        student: &StudentId,
    ) -> Result<ApplicationStatus, PortalError> {
        self.authorize(actor, student, LifecycleAction::AdvanceToInterview)?;
        Ok(self.engine.advance_to_interview(student)?)
    }

    pub fn submit_interview(
        &self,
        actor: &Actor,
        student: &StudentId,
        answers: Vec<InterviewAnswer>,
    ) -> Result<(), PortalError> {
        self.authorize(actor, student, LifecycleAction::SubmitInterview)?;
        Ok(self.desk.submit_interview(student, answers)?)
    }

    pub fn approve_application(
        &self,
        actor: &Actor,
        student: &StudentId,
    ) -> Result<ApplicationStatus, PortalError> {
        self.authorize(actor, student, LifecycleAction::ApproveApplication)?;
        Ok(self.engine.approve_application(student)?)
    }

    pub fn reject_application(
        &self,
        actor: &Actor,
        student: &StudentId,
    ) -> Result<ApplicationStatus, PortalError> {
        self.authorize(actor, student, LifecycleAction::RejectApplication)?;
        Ok(self.engine.reject_application(student)?)
    }

    /// Accept a released offer. Returns the offer document; the caller is
    /// expected to follow up with [`settle_enrollment`](Self::settle_enrollment),
    /// immediately or after a UX delay.
    pub fn accept_offer(
        &self,
        actor: &Actor,
        student: &StudentId,
    ) -> Result<OfferDocument, PortalError> {
        self.authorize(actor, student, LifecycleAction::AcceptOffer)?;
        Ok(self.engine.accept_offer(student)?)
    }

    /// Post-download settle step. Entering `InProgress` unlocks the task
    /// board: the starter board is installed if the student has none yet.
    pub fn settle_enrollment(
        &self,
        actor: &Actor,
        student: &StudentId,
    ) -> Result<ApplicationStatus, PortalError> {
        self.authorize(actor, student, LifecycleAction::SettleEnrollment)?;
        let status = self.engine.settle_enrollment(student)?;
        if self.workboard.tasks(student)?.is_empty() {
            self.workboard.seed_default_board(student)?;
        }
        Ok(status)
    }

    /// Accept and settle in one synchronous call, for callers that skip the
    /// delay theater.
    pub fn accept_offer_and_settle(
        &self,
        actor: &Actor,
        student: &StudentId,
    ) -> Result<OfferDocument, PortalError> {
        let document = self.accept_offer(actor, student)?;
        self.settle_enrollment(actor, student)?;
        Ok(document)
    }

    pub fn certify_completion(
        &self,
        actor: &Actor,
        student: &StudentId,
    ) -> Result<ApplicationStatus, PortalError> {
        self.authorize(actor, student, LifecycleAction::CertifyCompletion)?;
        Ok(self.engine.certify_completion(student)?)
    }

    // ── proposals ───────────────────────────────────────────────────

    pub fn submit_proposal(
        &self,
        actor: &Actor,
        student: &StudentId,
        text: &str,
    ) -> Result<(), PortalError> {
        self.authorize(actor, student, LifecycleAction::SubmitProposal)?;
        Ok(self.engine.submit_proposal(student, text)?)
    }

    pub fn approve_proposal(&self, actor: &Actor, student: &StudentId) -> Result<(), PortalError> {
        self.authorize(actor, student, LifecycleAction::ApproveProposal)?;
        Ok(self.engine.approve_proposal(student)?)
    }

    pub fn reject_proposal(&self, actor: &Actor, student: &StudentId) -> Result<(), PortalError> {
        self.authorize(actor, student, LifecycleAction::RejectProposal)?;
        Ok(self.engine.reject_proposal(student)?)
    }

    /// Admin review queue: every student with a pending proposal.
    pub fn pending_proposals(&self, actor: &Actor) -> Result<Vec<Student>, PortalError> {
        self.gate.require_admin(actor)?;
        let mut pending: Vec<Student> = self
            .directory
            .list()?
            .into_iter()
            .filter(|student| student.proposal_status == ProposalStatus::Pending)
            .collect();
        pending.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        Ok(pending)
    }

    // ── journal and progress ────────────────────────────────────────

    pub fn record_log(
        &self,
        actor: &Actor,
        student: &StudentId,
        content: &str,
    ) -> Result<DailyLog, PortalError> {
        self.authorize(actor, student, LifecycleAction::RecordLog)?;
        Ok(self.engine.record_log(student, content)?)
    }

    pub fn set_progress(
        &self,
        actor: &Actor,
        student: &StudentId,
        percent: u8,
    ) -> Result<u8, PortalError> {
        self.authorize(actor, student, LifecycleAction::SetProgress)?;
        Ok(self.engine.set_progress(student, percent)?)
    }

    // ── workboard ───────────────────────────────────────────────────

    pub fn move_task(
        &self,
        actor: &Actor,
        student: &StudentId,
        task_id: &TaskId,
        new_status: TaskStatus,
    ) -> Result<KanbanTask, PortalError> {
        self.authorize(actor, student, LifecycleAction::MoveTask)?;
        Ok(self.workboard.move_task(student, task_id, new_status)?)
    }

    pub fn add_task(
        &self,
        actor: &Actor,
        student: &StudentId,
        title: &str,
        description: &str,
    ) -> Result<KanbanTask, PortalError> {
        self.authorize(actor, student, LifecycleAction::MoveTask)?;
        Ok(self.workboard.add_task(student, title, description)?)
    }

    pub fn list_tasks_by_status(
        &self,
        actor: &Actor,
        student: &StudentId,
        status: TaskStatus,
    ) -> Result<Vec<KanbanTask>, PortalError> {
        self.gate.authorize_view(actor, student)?;
        Ok(self.workboard.list_tasks_by_status(student, status)?)
    }

    pub fn tasks(&self, actor: &Actor, student: &StudentId) -> Result<Vec<KanbanTask>, PortalError> {
        self.gate.authorize_view(actor, student)?;
        Ok(self.workboard.tasks(student)?)
    }

    // ── integrity ───────────────────────────────────────────────────

    /// Report a paste event. On the flagged knowledge-check surface this
    /// bans the acting student unconditionally.
    pub fn report_paste(
        &self,
        actor: &Actor,
        student: &StudentId,
        surface: InputSurface,
    ) -> Result<PasteOutcome, PortalError> {
        self.authorize(actor, student, LifecycleAction::ReportPasteViolation)?;
        Ok(self.monitor.report_paste(student, surface)?)
    }

    /// Direct admin suspension.
    pub fn ban_student(
        &self,
        actor: &Actor,
        student: &StudentId,
        reason: &str,
    ) -> Result<(), PortalError> {
        self.authorize(actor, student, LifecycleAction::Ban)?;
        Ok(self.engine.ban(student, reason)?)
    }

    pub fn integrity_events(
        &self,
        actor: &Actor,
        student: &StudentId,
    ) -> Result<Vec<IntegrityEvent>, PortalError> {
        self.gate.require_admin(actor)?;
        Ok(self.monitor.events_for(student)?)
    }

    // ── advisory AI ─────────────────────────────────────────────────

    /// Contextual course help. Purely advisory; failures degrade to the
    /// empty answer and no student record is touched.
    pub async fn ask_course_question(&self, context: &str, question: &str) -> String {
        self.desk.ask_course_question(context, question).await
    }

    // ── views ───────────────────────────────────────────────────────

    /// Read one student record. Banned students can still read their own
    /// record; that is the suspended view.
    pub fn student(&self, actor: &Actor, student: &StudentId) -> Result<Student, PortalError> {
        self.gate.authorize_view(actor, student)?;
        Ok(self.directory.get(student)?)
    }

    /// Admin roster view.
    pub fn students(&self, actor: &Actor) -> Result<Vec<Student>, PortalError> {
        self.gate.require_admin(actor)?;
        Ok(self.directory.list()?)
    }

    /// Retained interview transcript, for the admin review step.
    pub fn interview_transcript(
        &self,
        actor: &Actor,
        student: &StudentId,
    ) -> Result<Option<InterviewTranscript>, PortalError> {
        self.gate.require_admin(actor)?;
        Ok(self.desk.transcript_for(student)?)
    }

    fn authorize(
        &self,
        actor: &Actor,
        student: &StudentId,
        action: LifecycleAction,
    ) -> Result<(), PortalError> {
        self.gate.authorize(actor, student, &action).map_err(|err| {
            warn!(target_student = %student, %action, %err, "operation denied");
            PortalError::from(err)
        })
    }
}

impl Default for PortalService {
    fn default() -> Self {
        Self::new()
    }
}

/// Portal service errors, aggregating every component taxonomy.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Workboard error: {0}")]
    Workboard(#[from] WorkboardError),

    #[error("Interview error: {0}")]
    Interview(#[from] InterviewError),
}
