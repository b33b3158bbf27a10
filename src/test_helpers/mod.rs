//! # Test Helpers
//!
//! Deterministic doubles and payload factories shared by the unit tests and
//! the integration suites. Compiled into the library rather than gated on
//! `cfg(test)` so the `tests/` directory and downstream consumers can drive
//! the orchestrator without a transport, a wall clock, or a gateway.
//!
//! ```
//! use upgrade_workflow::api::{JobKind, JobSubmissionClient};
//! use upgrade_workflow::test_helpers::{sample_upgrade_request, ScriptedSubmissionClient};
//!
//! # tokio_test::block_on(async {
//! let client = ScriptedSubmissionClient::new();
//! client.push_accepted("pre-check-7");
//!
//! let response = client
//!     .submit(JobKind::PreCheck, &sample_upgrade_request())
//!     .await
//!     .unwrap();
//! assert_eq!(response.job_id, "pre-check-7");
//! assert_eq!(client.submissions().len(), 1);
//! # });
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::api::{JobKind, JobSubmissionClient, JobSubmissionResponse, UpgradeJobRequest};
use crate::error::{ApiError, ApiResult};
use crate::subscription::{IntentSink, SubscriptionIntent};
use crate::workflow::scheduler::{TimerHandle, TransitionCallback, TransitionScheduler};

/// Scheduler whose timers fire only when the test says so.
///
/// Callbacks run in scheduling order and outside the internal lock, so a
/// callback may schedule further transitions without deadlocking.
#[derive(Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualSchedulerInner>>,
}

#[derive(Default)]
struct ManualSchedulerInner {
    next_id: u64,
    pending: Vec<PendingTransition>,
}

struct PendingTransition {
    id: u64,
    delay: Duration,
    callback: TransitionCallback,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transitions scheduled and not yet fired or cancelled
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Delays of the pending transitions, in scheduling order
    pub fn pending_delays(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .pending
            .iter()
            .map(|entry| entry.delay)
            .collect()
    }

    /// Fire the oldest pending transition. Returns false when none remain.
    pub fn fire_next(&self) -> bool {
        let next = {
            let mut inner = self.inner.lock();
            if inner.pending.is_empty() {
                None
            } else {
                Some(inner.pending.remove(0))
            }
        };
        match next {
            Some(entry) => {
                (entry.callback)();
                true
            }
            None => false,
        }
    }

    /// Fire pending transitions until none remain, including any scheduled
    /// by the callbacks themselves. Returns how many fired.
    pub fn fire_all(&self) -> usize {
        let mut fired = 0;
        while self.fire_next() {
            fired += 1;
        }
        fired
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl TransitionScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, callback: TransitionCallback) -> TimerHandle {
        let id = {
            let mut inner = self.inner.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.pending.push(PendingTransition {
                id,
                delay,
                callback,
            });
            id
        };
        let inner = Arc::clone(&self.inner);
        TimerHandle::new(move || {
            inner.lock().pending.retain(|entry| entry.id != id);
        })
    }
}

/// Intent sink that records everything sent through it
#[derive(Debug, Default)]
pub struct RecordingIntentSink {
    sent: Mutex<Vec<SubscriptionIntent>>,
}

impl RecordingIntentSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intents sent so far, in order
    pub fn sent(&self) -> Vec<SubscriptionIntent> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl IntentSink for RecordingIntentSink {
    fn send_intent(&self, intent: SubscriptionIntent) {
        self.sent.lock().push(intent);
    }
}

/// Submission client that returns scripted results and records requests.
///
/// With nothing scripted, every submission is accepted with a generated job
/// id, which keeps the happy-path tests short.
#[derive(Debug, Default)]
pub struct ScriptedSubmissionClient {
    responses: Mutex<VecDeque<ApiResult<JobSubmissionResponse>>>,
    submissions: Mutex<Vec<(JobKind, UpgradeJobRequest)>>,
}

impl ScriptedSubmissionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an accepted submission with the given job id
    pub fn push_accepted(&self, job_id: &str) {
        self.responses
            .lock()
            .push_back(Ok(accepted_submission(job_id)));
    }

    /// Queue a rejection or transport failure
    pub fn push_error(&self, error: ApiError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Requests received so far, in order
    pub fn submissions(&self) -> Vec<(JobKind, UpgradeJobRequest)> {
        self.submissions.lock().clone()
    }
}

#[async_trait]
impl JobSubmissionClient for ScriptedSubmissionClient {
    async fn submit(
        &self,
        kind: JobKind,
        request: &UpgradeJobRequest,
    ) -> ApiResult<JobSubmissionResponse> {
        request.validate()?;
        self.submissions.lock().push((kind, request.clone()));
        self.responses.lock().pop_front().unwrap_or_else(|| {
            // Mint a fresh id the way the gateway does.
            Ok(accepted_submission(&format!(
                "{}{}",
                kind.job_id_prefix(),
                uuid::Uuid::new_v4()
            )))
        })
    }
}

/// Accepted-submission response the gateway would return for `job_id`
pub fn accepted_submission(job_id: &str) -> JobSubmissionResponse {
    JobSubmissionResponse {
        job_id: job_id.to_string(),
        status: "queued".to_string(),
        ws_channel: format!("job:{job_id}"),
        message: Some("Job queued".to_string()),
        timestamp: None,
        phase: None,
    }
}

/// Valid single-device request for submission tests
pub fn sample_upgrade_request() -> UpgradeJobRequest {
    UpgradeJobRequest {
        hostname: Some("fw-edge-01".to_string()),
        inventory_file: None,
        username: "admin".to_string(),
        password: "secret".to_string(),
        vendor: "juniper".to_string(),
        platform: "srx".to_string(),
        target_version: "23.4R2.13".to_string(),
        image_filename: "junos-srxsme-23.4R2.13.tgz".to_string(),
        skip_storage_check: false,
        skip_snapshot_check: false,
    }
}

/// Wrap an event payload in the transport envelope for `job:<job_id>`,
/// serializing the payload to a string the way the hub does.
pub fn wrap_in_envelope(job_id: &str, event: &Value) -> String {
    json!({
        "channel": format!("ws_channel:job:{job_id}"),
        "data": event.to_string(),
    })
    .to_string()
}

/// `OPERATION_START` payload announcing `total_steps`
pub fn operation_start_event(total_steps: u32) -> Value {
    json!({
        "event_type": "OPERATION_START",
        "message": format!("Starting operation with {total_steps} steps"),
        "timestamp": "2025-03-14T10:00:00Z",
        "data": {"total_steps": total_steps},
    })
}

/// `STEP_COMPLETE` payload for one step index
pub fn step_complete_event(step: u32, status: &str) -> Value {
    json!({
        "event_type": "STEP_COMPLETE",
        "message": format!("Step {step} {status}"),
        "timestamp": "2025-03-14T10:00:01Z",
        "data": {"step": step, "status": status},
    })
}

/// `PRE_CHECK_COMPLETE` payload carrying a summary
pub fn pre_check_complete_event(passed: u32, warnings: u32, critical_failures: u32) -> Value {
    let total_checks = passed + warnings + critical_failures;
    json!({
        "event_type": "PRE_CHECK_COMPLETE",
        "message": "Pre-check completed",
        "timestamp": "2025-03-14T10:05:00Z",
        "data": {
            "pre_check_summary": {
                "total_checks": total_checks,
                "passed": passed,
                "warnings": warnings,
                "critical_failures": critical_failures,
                "can_proceed": critical_failures == 0,
                "results": [],
            }
        },
    })
}

/// `OPERATION_COMPLETE` payload with a nested final-results block
pub fn operation_complete_event(success: bool) -> Value {
    json!({
        "event_type": "OPERATION_COMPLETE",
        "message": "Operation completed",
        "timestamp": "2025-03-14T10:30:00Z",
        "data": {
            "status": if success { "SUCCESS" } else { "FAILED" },
            "final_results": {"success": success},
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_scheduler_cancel_removes_by_id() {
        let scheduler = ManualScheduler::new();
        let first = scheduler.schedule(Duration::from_millis(10), Box::new(|| {}));
        let _second = scheduler.schedule(Duration::from_millis(20), Box::new(|| {}));
        assert_eq!(scheduler.pending_count(), 2);

        first.cancel();
        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(scheduler.pending_delays(), vec![Duration::from_millis(20)]);
    }

    #[tokio::test]
    async fn test_scripted_client_defaults_to_accepted() {
        let client = ScriptedSubmissionClient::new();
        let response = client
            .submit(JobKind::PreCheck, &sample_upgrade_request())
            .await
            .unwrap();
        assert!(response.job_id.starts_with("pre-check-"));
        assert_eq!(client.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_scripted_client_replays_in_order() {
        let client = ScriptedSubmissionClient::new();
        client.push_accepted("pre-check-9");
        client.push_error(ApiError::rejected(422, "image_filename: field required"));

        let first = client
            .submit(JobKind::PreCheck, &sample_upgrade_request())
            .await
            .unwrap();
        assert_eq!(first.job_id, "pre-check-9");

        let second = client
            .submit(JobKind::PreCheck, &sample_upgrade_request())
            .await;
        assert!(matches!(second, Err(ApiError::Rejected { status: 422, .. })));
    }

    #[test]
    fn test_envelope_factory_round_trips() {
        let raw = wrap_in_envelope("pre-check-1", &operation_start_event(4));
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value.get("channel").and_then(Value::as_str),
            Some("ws_channel:job:pre-check-1")
        );
        // Inner payload is a serialized string, not an object.
        assert!(value.get("data").unwrap().is_string());
    }
}
