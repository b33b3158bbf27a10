//! # Phase State Machine
//!
//! Owns the workflow phase and job status for one run and validates every
//! transition against an explicit table. Event handlers never assign the
//! phase directly; they apply a trigger and let the table decide, so a stale
//! timer or a late redelivery can only produce a rejected transition, never
//! a corrupted phase.

use tracing::{debug, info, warn};

use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::states::{JobStatus, WorkflowPhase};

/// Inputs that can move the workflow to another phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseTrigger {
    /// Operator starts (or restarts) a pre-flight validation run
    StartPreCheck,
    /// A finished pre-check run moves to the review phase
    EnterReview,
    /// Operator commits to the upgrade after review
    StartUpgrade,
    /// A finished upgrade run moves to the results phase
    EnterResults,
    /// Operator abandons the run entirely
    Reset,
}

impl PhaseTrigger {
    /// String form for logging and error construction
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartPreCheck => "start_pre_check",
            Self::EnterReview => "enter_review",
            Self::StartUpgrade => "start_upgrade",
            Self::EnterResults => "enter_results",
            Self::Reset => "reset",
        }
    }
}

/// Phase and status holder with transition validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseStateMachine {
    phase: WorkflowPhase,
    status: JobStatus,
}

impl PhaseStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current workflow phase
    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    /// Current job status
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Determine the phase a trigger leads to from the given phase.
    ///
    /// `StartPreCheck` is legal from every phase because a new validation
    /// run is semantically a restart; the orchestrator separately refuses it
    /// while a job is still streaming. Event-driven triggers are legal only
    /// from the phase that produced them, which is what rejects stale timers
    /// and late redeliveries.
    pub fn determine_next_phase(
        current: WorkflowPhase,
        trigger: PhaseTrigger,
    ) -> WorkflowResult<WorkflowPhase> {
        match (current, trigger) {
            (_, PhaseTrigger::Reset) => Ok(WorkflowPhase::Configure),
            (_, PhaseTrigger::StartPreCheck) => Ok(WorkflowPhase::PreCheck),
            (WorkflowPhase::PreCheck, PhaseTrigger::EnterReview) => Ok(WorkflowPhase::Review),
            (WorkflowPhase::Review, PhaseTrigger::StartUpgrade) => Ok(WorkflowPhase::Upgrade),
            (WorkflowPhase::Upgrade, PhaseTrigger::EnterResults) => Ok(WorkflowPhase::Results),
            (phase, trigger) => Err(WorkflowError::invalid_transition(
                phase.to_string(),
                trigger.as_str(),
            )),
        }
    }

    /// Apply a trigger, moving to the next phase when the table allows it
    pub fn apply(&mut self, trigger: PhaseTrigger) -> WorkflowResult<WorkflowPhase> {
        match Self::determine_next_phase(self.phase, trigger) {
            Ok(next) => {
                info!(
                    from = %self.phase,
                    to = %next,
                    trigger = trigger.as_str(),
                    "workflow phase transition"
                );
                self.phase = next;
                Ok(next)
            }
            Err(err) => {
                warn!(
                    phase = %self.phase,
                    trigger = trigger.as_str(),
                    "rejected phase transition"
                );
                Err(err)
            }
        }
    }

    /// Record that a job is actively streaming
    pub fn mark_running(&mut self) {
        self.set_status(JobStatus::Running);
    }

    /// Record a successful job verdict
    pub fn mark_success(&mut self) {
        self.set_status(JobStatus::Success);
    }

    /// Record a failed job verdict
    pub fn mark_failed(&mut self) {
        self.set_status(JobStatus::Failed);
    }

    /// Return status to idle (reset path)
    pub fn mark_idle(&mut self) {
        self.set_status(JobStatus::Idle);
    }

    fn set_status(&mut self, status: JobStatus) {
        if self.status != status {
            debug!(from = %self.status, to = %status, "job status change");
            self.status = status;
        }
    }
}
