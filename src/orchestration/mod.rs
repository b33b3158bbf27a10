//! # Workflow Orchestration
//!
//! The composition layer: [`WorkflowOrchestrator`] wires the event pipeline,
//! progress tracker, phase state machine, subscription manager, and job
//! submission client together behind one façade, and
//! [`NotificationPublisher`] broadcasts state snapshots to whoever renders
//! them.
//!
//! Everything below this module is a passive component; this is where raw
//! transport messages and operator actions actually meet the state.

pub mod notifications;
pub mod orchestrator;

pub use notifications::{NotificationPublisher, WorkflowNotification};
pub use orchestrator::WorkflowOrchestrator;
