//! The inbound message path taken on its own: envelope unwrapping, stale
//! channel filtering, duplicate suppression, and the notification snapshots
//! the UI layer consumes.

mod common;

use common::TestWorkflow;
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

use upgrade_workflow::event_names;
use upgrade_workflow::test_helpers::{
    operation_start_event, pre_check_complete_event, step_complete_event,
};
use upgrade_workflow::workflow::states::{JobStatus, WorkflowPhase};

const JOB: &str = "pre-check-42";

fn log_count_of(wf: &TestWorkflow, event_type: &str) -> usize {
    wf.orchestrator
        .logs()
        .iter()
        .filter(|entry| entry.event.event_type == event_type)
        .count()
}

/// Critical events stay visible on redelivery but mutate state only once.
#[tokio::test]
async fn test_redelivered_step_complete_is_visible_but_counted_once() {
    let wf = TestWorkflow::connected();
    wf.start_pre_check(JOB).await.unwrap();
    wf.feed(JOB, &operation_start_event(4));

    let frame = step_complete_event(1, "completed");
    wf.feed(JOB, &frame);
    wf.feed(JOB, &frame);

    let progress = wf.orchestrator.progress();
    assert_eq!(progress.completed_steps, 1);
    assert_eq!(progress.percentage, 25);
    assert_eq!(log_count_of(&wf, event_names::STEP_COMPLETE), 2);
}

/// Non-critical duplicates vanish entirely: no log line, no notification.
#[tokio::test]
async fn test_duplicate_device_progress_is_suppressed() {
    let wf = TestWorkflow::connected();
    wf.start_pre_check(JOB).await.unwrap();
    wf.feed(JOB, &operation_start_event(4));

    let frame = json!({
        "event_type": "DEVICE_PROGRESS",
        "timestamp": "2025-03-14T10:02:11Z",
        "message": "fw-edge-01 at 40%",
        "data": {"hostname": "fw-edge-01", "percentage": 40},
    });
    wf.feed(JOB, &frame);
    assert_eq!(wf.orchestrator.progress().percentage, 40);
    assert_eq!(log_count_of(&wf, event_names::DEVICE_PROGRESS), 1);

    let mut notifications = wf.orchestrator.subscribe_notifications();
    wf.feed(JOB, &frame);
    assert_eq!(log_count_of(&wf, event_names::DEVICE_PROGRESS), 1);
    assert!(matches!(notifications.try_recv(), Err(TryRecvError::Empty)));
}

/// After a restart, traffic for the previous run's channel is dropped.
#[tokio::test]
async fn test_stale_channel_after_restart_is_ignored() {
    let wf = TestWorkflow::connected();
    wf.run_pre_check_to_review("pre-check-a").await.unwrap();
    wf.start_pre_check("pre-check-b").await.unwrap();

    let logs_before = wf.orchestrator.logs().len();
    wf.feed("pre-check-a", &operation_start_event(4));
    wf.feed("pre-check-a", &step_complete_event(1, "completed"));

    assert_eq!(wf.orchestrator.logs().len(), logs_before);
    let progress = wf.orchestrator.progress();
    assert_eq!(progress.total_steps, 0);
    assert_eq!(progress.completed_steps, 0);
}

/// A structured event smuggled through a log carrier's stderr line still
/// reaches the progress tracker.
#[tokio::test]
async fn test_marker_line_inside_stream_tag_unwraps() {
    let wf = TestWorkflow::connected();
    wf.start_pre_check(JOB).await.unwrap();
    wf.feed(JOB, &operation_start_event(4));

    let nested = json!({
        "event_type": "STEP_COMPLETE",
        "timestamp": "2025-03-14T10:03:00Z",
        "message": "Step 1 completed",
        "data": {"step": 1, "status": "completed"},
    });
    let carrier = json!({
        "event_type": "ORCHESTRATOR_LOG",
        "timestamp": "2025-03-14T10:03:00Z",
        "level": "info",
        "message": format!("[STDERR] JSON_PROGRESS: {nested}"),
    });
    wf.feed(JOB, &carrier);

    let progress = wf.orchestrator.progress();
    assert_eq!(progress.completed_steps, 1);
    assert_eq!(progress.percentage, 25);
    assert_eq!(log_count_of(&wf, event_names::STEP_COMPLETE), 1);
}

/// Events that arrive without an envelope carry no channel and are accepted.
#[tokio::test]
async fn test_bare_event_without_envelope_is_processed() {
    let wf = TestWorkflow::connected();
    wf.start_pre_check(JOB).await.unwrap();

    wf.orchestrator
        .handle_raw_message(&operation_start_event(6).to_string());

    let progress = wf.orchestrator.progress();
    assert_eq!(progress.total_steps, 6);
    assert_eq!(progress.percentage, 5);
    assert_eq!(wf.orchestrator.job_status(), JobStatus::Running);
}

/// Unrecognized event types land in the log once and change nothing else.
#[tokio::test]
async fn test_unknown_event_type_is_displayed_not_fatal() {
    let wf = TestWorkflow::connected();
    wf.start_pre_check(JOB).await.unwrap();

    let frame = json!({
        "event_type": "FAN_SPEED_ALERT",
        "timestamp": "2025-03-14T10:04:00Z",
        "message": "Fan tray 1 running high",
    });
    wf.feed(JOB, &frame);
    wf.feed(JOB, &frame);

    assert_eq!(log_count_of(&wf, "FAN_SPEED_ALERT"), 1);
    assert_eq!(wf.orchestrator.phase(), WorkflowPhase::PreCheck);
    assert_eq!(wf.orchestrator.job_status(), JobStatus::Running);
}

/// Garbage on the wire is skipped without disturbing the run.
#[tokio::test]
async fn test_malformed_messages_are_skipped() {
    let wf = TestWorkflow::connected();
    wf.start_pre_check(JOB).await.unwrap();
    wf.feed(JOB, &operation_start_event(4));
    let logs_before = wf.orchestrator.logs().len();

    wf.orchestrator.handle_raw_message("not json at all");
    wf.orchestrator.handle_raw_message("");
    wf.orchestrator.handle_raw_message("[1, 2, 3]");

    assert_eq!(wf.orchestrator.logs().len(), logs_before);
    assert_eq!(wf.orchestrator.progress().percentage, 5);
    assert_eq!(wf.orchestrator.job_status(), JobStatus::Running);
}

/// Reset tears down the armed review transition along with the run state.
#[tokio::test]
async fn test_reset_cancels_pending_review_transition() {
    let wf = TestWorkflow::connected();
    wf.start_pre_check(JOB).await.unwrap();
    wf.feed(JOB, &operation_start_event(2));
    wf.feed(JOB, &pre_check_complete_event(2, 0, 0));
    assert_eq!(wf.scheduler.pending_count(), 1);

    wf.orchestrator.reset();

    assert_eq!(wf.scheduler.pending_count(), 0);
    assert_eq!(wf.scheduler.fire_all(), 0);
    assert_eq!(wf.orchestrator.phase(), WorkflowPhase::Configure);
    assert_eq!(wf.orchestrator.job_status(), JobStatus::Idle);
    assert!(wf.orchestrator.logs().is_empty());
    assert!(wf.orchestrator.pre_check_summary().is_none());
}

/// Each processed event publishes a full snapshot for the UI layer.
#[tokio::test]
async fn test_notifications_carry_state_snapshots() {
    let wf = TestWorkflow::connected();
    wf.start_pre_check(JOB).await.unwrap();

    let mut notifications = wf.orchestrator.subscribe_notifications();
    wf.feed(JOB, &operation_start_event(6));

    let snapshot = notifications.try_recv().unwrap();
    assert_eq!(snapshot.phase, WorkflowPhase::PreCheck);
    assert_eq!(snapshot.status, JobStatus::Running);
    assert_eq!(snapshot.progress.total_steps, 6);
    assert_eq!(snapshot.progress.percentage, 5);
    assert_eq!(snapshot.log_count, 3);
    assert!(!snapshot.has_summary);
    assert!(snapshot.connected);
}

/// Losing the transport mid-run flips the connectivity flag but does not
/// touch the run; buffered messages are still applied.
#[tokio::test]
async fn test_disconnect_during_run_leaves_job_state_untouched() {
    let wf = TestWorkflow::connected();
    wf.start_pre_check(JOB).await.unwrap();
    wf.feed(JOB, &operation_start_event(4));

    let mut notifications = wf.orchestrator.subscribe_notifications();
    wf.orchestrator.set_connected(false);

    let snapshot = notifications.try_recv().unwrap();
    assert!(!snapshot.connected);
    assert_eq!(snapshot.status, JobStatus::Running);
    assert!(!wf.orchestrator.is_connected());
    assert_eq!(wf.orchestrator.phase(), WorkflowPhase::PreCheck);

    wf.feed(JOB, &step_complete_event(1, "completed"));
    assert_eq!(wf.orchestrator.progress().completed_steps, 1);
}
