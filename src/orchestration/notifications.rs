//! State-change notifications for workflow observers.
//!
//! Every applied mutation publishes a snapshot on a broadcast channel so UI
//! bridges and tests can react without polling the orchestrator. Publishing
//! is fire-and-forget: zero receivers is a normal condition, and a slow
//! receiver only loses its own backlog.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::workflow::progress::ProgressState;
use crate::workflow::states::{JobStatus, WorkflowPhase};

/// Snapshot of the externally observable workflow state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowNotification {
    pub phase: WorkflowPhase,
    pub status: JobStatus,
    pub progress: ProgressState,
    pub log_count: usize,
    pub has_summary: bool,
    pub connected: bool,
}

/// Broadcast publisher for workflow snapshots
#[derive(Debug, Clone)]
pub struct NotificationPublisher {
    sender: broadcast::Sender<WorkflowNotification>,
}

impl NotificationPublisher {
    /// Create a publisher with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a snapshot. A send error only means nobody is subscribed.
    pub fn publish(&self, notification: WorkflowNotification) {
        let _ = self.sender.send(notification);
    }

    /// Subscribe to snapshots
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowNotification> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}
