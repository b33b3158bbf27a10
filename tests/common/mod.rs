//! Shared harness for the end-to-end workflow suites.
//!
//! Everything runs against the deterministic collaborators from
//! `upgrade_workflow::test_helpers`: timers fire on command, submissions
//! replay from a scripted queue, and subscription intents are recorded. No
//! suite here touches a socket or the wall clock.

#![allow(dead_code)] // Each test binary uses a different slice of the harness

pub mod strategies;

use std::sync::Arc;

use anyhow::{ensure, Result};
use serde_json::Value;

use upgrade_workflow::api::{JobSubmissionClient, JobSubmissionResponse};
use upgrade_workflow::config::WorkflowConfig;
use upgrade_workflow::orchestration::WorkflowOrchestrator;
use upgrade_workflow::subscription::IntentSink;
use upgrade_workflow::test_helpers::{
    operation_start_event, pre_check_complete_event, sample_upgrade_request, step_complete_event,
    wrap_in_envelope, ManualScheduler, RecordingIntentSink, ScriptedSubmissionClient,
};
use upgrade_workflow::workflow::scheduler::TransitionScheduler;
use upgrade_workflow::workflow::states::WorkflowPhase;

/// One orchestrator wired to scripted collaborators, plus handles to all of
/// them for scripting and assertions.
pub struct TestWorkflow {
    pub orchestrator: WorkflowOrchestrator,
    pub scheduler: Arc<ManualScheduler>,
    pub sink: Arc<RecordingIntentSink>,
    pub client: Arc<ScriptedSubmissionClient>,
}

impl TestWorkflow {
    /// Build a workflow with default configuration and a connected transport
    pub fn connected() -> Self {
        let workflow = Self::disconnected();
        workflow.orchestrator.set_connected(true);
        workflow
    }

    /// Build a workflow whose transport has not connected yet
    pub fn disconnected() -> Self {
        let scheduler = Arc::new(ManualScheduler::new());
        let sink = Arc::new(RecordingIntentSink::new());
        let client = Arc::new(ScriptedSubmissionClient::new());
        let orchestrator = WorkflowOrchestrator::new(
            WorkflowConfig::default(),
            Arc::clone(&client) as Arc<dyn JobSubmissionClient>,
            Arc::clone(&scheduler) as Arc<dyn TransitionScheduler>,
            Arc::clone(&sink) as Arc<dyn IntentSink>,
        );
        Self {
            orchestrator,
            scheduler,
            sink,
            client,
        }
    }

    /// Start a pre-check run accepted under the given job id
    pub async fn start_pre_check(&self, job_id: &str) -> Result<JobSubmissionResponse> {
        self.client.push_accepted(job_id);
        let response = self
            .orchestrator
            .start_pre_check(sample_upgrade_request())
            .await?;
        Ok(response)
    }

    /// Deliver one event wrapped the way the gateway frames it
    pub fn feed(&self, job_id: &str, event: &Value) {
        self.orchestrator
            .handle_raw_message(&wrap_in_envelope(job_id, event));
    }

    /// Run a clean four-step pre-check through to the review phase, so the
    /// upgrade suites can start from an eligible state.
    pub async fn run_pre_check_to_review(&self, job_id: &str) -> Result<()> {
        self.start_pre_check(job_id).await?;
        self.feed(job_id, &operation_start_event(4));
        for step in 1..=4 {
            self.feed(job_id, &step_complete_event(step, "completed"));
        }
        self.feed(job_id, &pre_check_complete_event(4, 0, 0));
        ensure!(
            self.scheduler.fire_next(),
            "pre-check completion must schedule the review transition"
        );
        ensure!(
            self.orchestrator.phase() == WorkflowPhase::Review,
            "workflow should be in review, found {}",
            self.orchestrator.phase()
        );
        Ok(())
    }
}
