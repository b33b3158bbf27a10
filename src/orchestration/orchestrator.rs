//! # Workflow Orchestrator
//!
//! The façade that owns one workflow run: it consumes the raw message
//! stream, fans each canonical event out to progress tracking, summary
//! extraction, and the phase state machine, and exposes the externally
//! observable state plus the three operator actions (start pre-check, start
//! upgrade, reset).
//!
//! All mutable state lives behind one lock and every message is fully
//! applied before the next one is looked at. Delayed phase transitions
//! capture the run generation; a timer that fires after a restart or reset
//! finds a different generation and does nothing.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::{JobKind, JobSubmissionClient, JobSubmissionResponse, UpgradeJobRequest};
use crate::config::WorkflowConfig;
use crate::error::{ApiError, WorkflowError, WorkflowResult};
use crate::events::dedup::EventDeduplicator;
use crate::events::types::{ApplicationEvent, CheckResult, EventKind, LogEntry, PreCheckSummary};
use crate::events::unwrap::unwrap_message;
use crate::logging::{log_error, log_job_operation};
use crate::subscription::{IntentSink, SubscriptionManager};
use crate::workflow::progress::{ProgressState, ProgressTracker};
use crate::workflow::scheduler::{TimerHandle, TransitionScheduler};
use crate::workflow::state_machine::{PhaseStateMachine, PhaseTrigger};
use crate::workflow::states::{JobStatus, WorkflowPhase};
use crate::workflow::summary;

use super::notifications::{NotificationPublisher, WorkflowNotification};

/// Everything one workflow run owns. Guarded by the orchestrator's lock.
#[derive(Debug)]
struct WorkflowState {
    machine: PhaseStateMachine,
    progress: ProgressTracker,
    dedup: EventDeduplicator,
    subscriptions: SubscriptionManager,
    logs: Vec<LogEntry>,
    next_sequence: u64,
    check_results: Vec<CheckResult>,
    pre_check_summary: Option<PreCheckSummary>,
    final_results: Option<Value>,
    last_error: Option<String>,
    active_job_id: Option<String>,
    retained_request: Option<UpgradeJobRequest>,
    connected: bool,
    pending_transition: Option<TimerHandle>,
    /// Bumped on every run start and reset; stale timers check it.
    generation: u64,
}

impl WorkflowState {
    fn append_log(&mut self, event: ApplicationEvent) {
        let entry = LogEntry {
            sequence: self.next_sequence,
            event,
        };
        self.next_sequence += 1;
        self.logs.push(entry);
    }

    fn can_proceed(&self) -> bool {
        self.pre_check_summary
            .as_ref()
            .map(|summary| summary.can_proceed && !summary.is_error_placeholder())
            .unwrap_or(false)
    }

    /// Clear the per-run stream state. Summary and final results are owned
    /// by the actions, which decide per transition what survives.
    fn clear_run_state(&mut self) {
        self.progress.reset();
        self.dedup.clear();
        self.logs.clear();
        self.next_sequence = 0;
        self.check_results.clear();
        self.last_error = None;
    }

    fn snapshot(&self) -> WorkflowNotification {
        WorkflowNotification {
            phase: self.machine.phase(),
            status: self.machine.status(),
            progress: self.progress.snapshot(),
            log_count: self.logs.len(),
            has_summary: self.pre_check_summary.is_some(),
            connected: self.connected,
        }
    }
}

/// Owns the full message-to-state pipeline for one workflow at a time.
///
/// Collaborators are injected: the submission client, the transition
/// scheduler, and the subscription intent sink are all traits, so tests run
/// the entire pipeline without a gateway, a wall clock, or a socket.
#[derive(Debug)]
pub struct WorkflowOrchestrator {
    state: Arc<Mutex<WorkflowState>>,
    scheduler: Arc<dyn TransitionScheduler>,
    client: Arc<dyn JobSubmissionClient>,
    notifications: NotificationPublisher,
    config: WorkflowConfig,
}

impl WorkflowOrchestrator {
    pub fn new(
        config: WorkflowConfig,
        client: Arc<dyn JobSubmissionClient>,
        scheduler: Arc<dyn TransitionScheduler>,
        intent_sink: Arc<dyn IntentSink>,
    ) -> Self {
        let state = WorkflowState {
            machine: PhaseStateMachine::new(),
            progress: ProgressTracker::new(config.progress),
            dedup: EventDeduplicator::new(config.dedup.max_entries),
            subscriptions: SubscriptionManager::new(intent_sink),
            logs: Vec::new(),
            next_sequence: 0,
            check_results: Vec::new(),
            pre_check_summary: None,
            final_results: None,
            last_error: None,
            active_job_id: None,
            retained_request: None,
            connected: false,
            pending_transition: None,
            generation: 0,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            scheduler,
            client,
            notifications: NotificationPublisher::default(),
            config,
        }
    }

    // ------------------------------------------------------------------
    // Observable state
    // ------------------------------------------------------------------

    pub fn phase(&self) -> WorkflowPhase {
        self.state.lock().machine.phase()
    }

    pub fn job_status(&self) -> JobStatus {
        self.state.lock().machine.status()
    }

    pub fn progress(&self) -> ProgressState {
        self.state.lock().progress.snapshot()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.state.lock().logs.clone()
    }

    /// Per-check outcomes accumulated from `PRE_CHECK_RESULT` events
    pub fn check_results(&self) -> Vec<CheckResult> {
        self.state.lock().check_results.clone()
    }

    pub fn pre_check_summary(&self) -> Option<PreCheckSummary> {
        self.state.lock().pre_check_summary.clone()
    }

    pub fn final_results(&self) -> Option<Value> {
        self.state.lock().final_results.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    pub fn active_job_id(&self) -> Option<String> {
        self.state.lock().active_job_id.clone()
    }

    /// Check whether a completed pre-check allows starting the upgrade
    pub fn can_proceed_with_upgrade(&self) -> bool {
        self.state.lock().can_proceed()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Subscribe to state-change snapshots
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<WorkflowNotification> {
        self.notifications.subscribe()
    }

    // ------------------------------------------------------------------
    // Inputs from the transport collaborator
    // ------------------------------------------------------------------

    /// Record the transport's connectivity. Actions are refused while
    /// disconnected; inbound messages are processed regardless.
    pub fn set_connected(&self, connected: bool) {
        let notification = {
            let mut state = self.state.lock();
            if state.connected == connected {
                return;
            }
            state.connected = connected;
            info!(connected, "Transport connectivity changed");
            state.snapshot()
        };
        self.notifications.publish(notification);
    }

    /// Apply one raw transport message end to end: unwrap, stale-channel
    /// check, display gate, duplicate suppression, state mutation.
    ///
    /// Never fails: a malformed message degrades or is skipped, and the
    /// stream keeps flowing.
    pub fn handle_raw_message(&self, raw: &str) {
        let Some(unwrapped) = unwrap_message(raw) else {
            return;
        };

        let notification = {
            let mut state = self.state.lock();
            if !state
                .subscriptions
                .matches_active(unwrapped.channel.as_deref())
            {
                debug!(
                    channel = ?unwrapped.channel,
                    active = ?state.subscriptions.active_channel(),
                    "Ignoring message for a stale channel"
                );
                return;
            }

            let event = unwrapped.event;
            let first_delivery = !state.dedup.is_duplicate(&event);
            let display = state.dedup.should_display(&event);

            if display {
                state.append_log(event.clone());
            }
            if first_delivery {
                state.dedup.remember(&event);
                self.apply_event(&mut state, &event);
            }
            if !display && !first_delivery {
                return;
            }
            state.snapshot()
        };
        self.notifications.publish(notification);
    }

    /// Drive the orchestrator from a stream of raw transport messages until
    /// the stream ends.
    pub async fn process_message_stream<S>(&self, stream: S)
    where
        S: Stream<Item = String>,
    {
        futures::pin_mut!(stream);
        while let Some(raw) = stream.next().await {
            self.handle_raw_message(&raw);
        }
    }

    // ------------------------------------------------------------------
    // Operator actions
    // ------------------------------------------------------------------

    /// Submit a pre-check job and subscribe to its event channel.
    ///
    /// Restarts are allowed from any phase; a run that is still streaming
    /// must be reset first.
    pub async fn start_pre_check(
        &self,
        request: UpgradeJobRequest,
    ) -> WorkflowResult<JobSubmissionResponse> {
        request.validate().map_err(WorkflowError::from)?;

        let notification = {
            let mut state = self.state.lock();
            if !state.connected {
                return Err(WorkflowError::not_connected("start pre-check"));
            }
            if state.machine.status().is_running() {
                return Err(WorkflowError::already_running("start pre-check"));
            }

            // Infallible from every phase: a new validation run is a restart.
            state.machine.apply(PhaseTrigger::StartPreCheck)?;
            self.begin_run(&mut state);
            state.machine.mark_running();
            state.pre_check_summary = None;
            state.final_results = None;
            state.retained_request = Some(request.clone());
            state.append_log(ApplicationEvent::log(format!(
                "Submitting pre-check for {}",
                request.target_label()
            )));
            state.snapshot()
        };
        self.notifications.publish(notification);

        match self.client.submit(JobKind::PreCheck, &request).await {
            Ok(response) => Ok(self.accept_job("pre_check", response)),
            Err(err) => Err(self.fail_submission("Pre-check", err)),
        }
    }

    /// Submit the upgrade job using the parameters retained from the
    /// pre-check run. Requires a completed, proceed-eligible pre-check.
    pub async fn start_upgrade_execution(&self) -> WorkflowResult<JobSubmissionResponse> {
        let (request, notification) = {
            let mut state = self.state.lock();
            if !state.connected {
                return Err(WorkflowError::not_connected("start upgrade"));
            }
            if state.machine.status().is_running() {
                return Err(WorkflowError::already_running("start upgrade"));
            }
            if !state.can_proceed() {
                return Err(WorkflowError::pre_check_not_eligible("start upgrade"));
            }
            let Some(request) = state.retained_request.clone() else {
                return Err(WorkflowError::pre_check_not_eligible("start upgrade"));
            };

            // Only legal from the review phase; rejects a click that races
            // the delayed transition.
            state.machine.apply(PhaseTrigger::StartUpgrade)?;
            self.begin_run(&mut state);
            state.machine.mark_running();
            state.final_results = None;
            state.append_log(ApplicationEvent::log(format!(
                "Submitting upgrade for {}",
                request.target_label()
            )));
            (request, state.snapshot())
        };
        self.notifications.publish(notification);

        match self.client.submit(JobKind::CodeUpgrade, &request).await {
            Ok(response) => Ok(self.accept_job("code_upgrade", response)),
            Err(err) => Err(self.fail_submission("Upgrade", err)),
        }
    }

    /// Abandon the current run entirely: cancel timers, drop the channel,
    /// clear all state, and return to the configure phase.
    pub fn reset(&self) {
        let notification = {
            let mut state = self.state.lock();
            self.cancel_pending(&mut state);
            state.generation += 1;
            state.subscriptions.unsubscribe_active();
            state.clear_run_state();
            state.pre_check_summary = None;
            state.final_results = None;
            state.active_job_id = None;
            if let Err(err) = state.machine.apply(PhaseTrigger::Reset) {
                warn!(error = %err, "Reset trigger rejected");
            }
            state.machine.mark_idle();
            info!("Workflow reset to configure");
            state.snapshot()
        };
        self.notifications.publish(notification);
    }

    // ------------------------------------------------------------------
    // Event application
    // ------------------------------------------------------------------

    fn apply_event(&self, state: &mut WorkflowState, event: &ApplicationEvent) {
        static NULL: Value = Value::Null;
        let payload = event.data.as_ref().unwrap_or(&NULL);

        match event.kind() {
            EventKind::OperationStart { total_steps } => {
                state.machine.mark_running();
                state.progress.on_operation_start(total_steps.unwrap_or(0));
                info!(
                    total_steps = ?total_steps,
                    job_id = ?state.active_job_id,
                    "Operation started"
                );
            }
            EventKind::StepStart { step, step_name } => {
                debug!(step = ?step, step_name = ?step_name, "Step started");
            }
            EventKind::StepComplete { step, status } => {
                let counts = status.map(|s| s.counts_as_complete()).unwrap_or(true);
                match (counts, step) {
                    (true, Some(step)) => state.progress.on_step_complete(step),
                    (true, None) => debug!("STEP_COMPLETE without a step index; not counted"),
                    (false, _) => warn!(step = ?step, "Step reported failure"),
                }
            }
            EventKind::PreCheckResult { result } => {
                if let Some(result) = result {
                    debug!(
                        check = %result.check_name,
                        severity = %result.severity,
                        "Check result received"
                    );
                    state.check_results.push(result);
                }
            }
            EventKind::PreCheckComplete => self.on_pre_check_complete(state, payload),
            EventKind::PreCheckFailed { error } => self.on_pre_check_failed(state, error),
            EventKind::OperationComplete => self.on_operation_complete(state, payload),
            EventKind::DeviceProgress {
                hostname,
                percentage,
            } => {
                debug!(hostname = ?hostname, percentage = ?percentage, "Device progress");
                if let Some(pct) = percentage {
                    state.progress.on_progress_hint(pct.min(100) as u8);
                }
            }
            EventKind::UpgradeProgress { percentage } => {
                if let Some(pct) = percentage {
                    state.progress.on_progress_hint(pct.min(100) as u8);
                }
            }
            EventKind::OrchestratorLog | EventKind::Unknown => {}
        }
    }

    fn on_pre_check_complete(&self, state: &mut WorkflowState, payload: &Value) {
        if state.machine.phase() != WorkflowPhase::PreCheck {
            warn!(
                phase = %state.machine.phase(),
                "PRE_CHECK_COMPLETE outside the pre-check phase; ignoring"
            );
            return;
        }

        state.progress.force_complete();
        if state.pre_check_summary.is_none() {
            state.pre_check_summary = summary::from_pre_check_complete(payload);
        }
        match &state.pre_check_summary {
            Some(summary) => info!(
                can_proceed = summary.can_proceed,
                total_checks = summary.total_checks,
                critical_failures = summary.critical_failures,
                "Pre-check summary received"
            ),
            None => warn!("PRE_CHECK_COMPLETE carried no extractable summary"),
        }
        state.machine.mark_success();
        state.subscriptions.unsubscribe_active();
        self.schedule_transition(
            state,
            PhaseTrigger::EnterReview,
            self.config.transitions.review_delay(),
        );
    }

    fn on_pre_check_failed(&self, state: &mut WorkflowState, error: Option<String>) {
        if state.machine.phase() != WorkflowPhase::PreCheck {
            return;
        }
        self.cancel_pending(state);
        state.machine.mark_failed();
        state.last_error = error.or_else(|| Some("Pre-check aborted".to_string()));
        warn!(error = ?state.last_error, "Pre-check failed");
        state.subscriptions.unsubscribe_active();
    }

    fn on_operation_complete(&self, state: &mut WorkflowState, payload: &Value) {
        match state.machine.phase() {
            WorkflowPhase::PreCheck => self.complete_pre_check_run(state, payload),
            WorkflowPhase::Upgrade => self.complete_upgrade_run(state, payload),
            phase => {
                debug!(%phase, "OPERATION_COMPLETE outside a streaming phase; ignoring");
            }
        }
    }

    fn complete_pre_check_run(&self, state: &mut WorkflowState, payload: &Value) {
        state.progress.force_complete();
        state.subscriptions.unsubscribe_active();

        let succeeded = summary::operation_succeeded(payload);
        if state.pre_check_summary.is_none() {
            state.pre_check_summary = summary::from_operation_complete(payload);
        }

        match (succeeded, state.pre_check_summary.is_some()) {
            (true, true) => {
                state.machine.mark_success();
                self.schedule_transition(
                    state,
                    PhaseTrigger::EnterReview,
                    self.config.transitions.review_delay(),
                );
            }
            (true, false) => {
                // Completed without a summary anywhere: render a distinct
                // failure instead of an indefinite loading state.
                state.pre_check_summary =
                    Some(PreCheckSummary::error_placeholder("missing_summary"));
                state.last_error =
                    Some("Pre-check completed without returning a summary".to_string());
                state.machine.mark_failed();
                warn!("Pre-check completed without an extractable summary");
            }
            (false, _) => {
                let error = summary::operation_error(payload);
                if state.pre_check_summary.is_none() {
                    state.pre_check_summary =
                        Some(PreCheckSummary::error_placeholder("operation_failed"));
                }
                state.last_error = error
                    .clone()
                    .or_else(|| Some("Pre-check operation failed".to_string()));
                state.machine.mark_failed();
                warn!(error = ?error, "Pre-check operation failed");
            }
        }
    }

    fn complete_upgrade_run(&self, state: &mut WorkflowState, payload: &Value) {
        state.progress.force_complete();
        state.subscriptions.unsubscribe_active();

        if !payload.is_null() {
            state.final_results = Some(payload.clone());
        }

        if summary::operation_succeeded(payload) {
            state.machine.mark_success();
            info!("Upgrade operation completed");
        } else {
            state.last_error = summary::operation_error(payload)
                .or_else(|| Some("Upgrade operation failed".to_string()));
            state.machine.mark_failed();
            warn!(error = ?state.last_error, "Upgrade operation failed");
        }
        self.schedule_transition(
            state,
            PhaseTrigger::EnterResults,
            self.config.transitions.results_delay(),
        );
    }

    // ------------------------------------------------------------------
    // Run lifecycle plumbing
    // ------------------------------------------------------------------

    /// Prepare the state for a fresh streaming run. The phase trigger has
    /// already been applied by the caller.
    fn begin_run(&self, state: &mut WorkflowState) {
        self.cancel_pending(state);
        state.generation += 1;
        state.subscriptions.unsubscribe_active();
        state.clear_run_state();
        state.active_job_id = None;
    }

    fn cancel_pending(&self, state: &mut WorkflowState) {
        if let Some(handle) = state.pending_transition.take() {
            debug!("Cancelling pending phase transition");
            handle.cancel();
        }
    }

    /// Schedule a delayed phase transition, replacing any pending one.
    ///
    /// The delay is an observation window for a human watching the live
    /// log, not a synchronization mechanism.
    fn schedule_transition(
        &self,
        state: &mut WorkflowState,
        trigger: PhaseTrigger,
        delay: Duration,
    ) {
        self.cancel_pending(state);
        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        let notifications = self.notifications.clone();
        debug!(
            trigger = trigger.as_str(),
            delay_ms = delay.as_millis() as u64,
            "Scheduling delayed phase transition"
        );
        let handle = self.scheduler.schedule(
            delay,
            Box::new(move || {
                let notification = {
                    let mut state = shared.lock();
                    if state.generation != generation {
                        debug!(
                            trigger = trigger.as_str(),
                            "Stale transition timer; run has changed"
                        );
                        return;
                    }
                    state.pending_transition = None;
                    if state.machine.apply(trigger).is_err() {
                        return;
                    }
                    state.snapshot()
                };
                notifications.publish(notification);
            }),
        );
        state.pending_transition = Some(handle);
    }

    fn accept_job(&self, operation: &str, response: JobSubmissionResponse) -> JobSubmissionResponse {
        let notification = {
            let mut state = self.state.lock();
            state.active_job_id = Some(response.job_id.clone());
            state.subscriptions.subscribe(response.ws_channel.clone());
            state.append_log(ApplicationEvent::log(format!(
                "Job {} queued; listening on {}",
                response.job_id, response.ws_channel
            )));
            log_job_operation(
                operation,
                Some(&response.job_id),
                Some(&response.ws_channel),
                "queued",
                response.message.as_deref(),
            );
            state.snapshot()
        };
        self.notifications.publish(notification);
        response
    }

    fn fail_submission(&self, label: &str, err: ApiError) -> WorkflowError {
        let message = err.user_message();
        let notification = {
            let mut state = self.state.lock();
            state.machine.mark_failed();
            state.last_error = Some(message.clone());
            state.append_log(ApplicationEvent::log(format!(
                "{label} submission failed: {message}"
            )));
            log_error("orchestrator", "submit_job", &message, Some(label));
            state.snapshot()
        };
        self.notifications.publish(notification);
        WorkflowError::from(err)
    }
}
