#![allow(clippy::doc_markdown)] // Allow technical terms like WebSocket, JSON in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Upgrade Workflow Core
//!
//! Event-driven workflow engine for network device firmware upgrades.
//!
//! ## Overview
//!
//! The crate sits between a message transport (a pub/sub gateway relaying
//! per-job event channels) and whatever renders the workflow to an operator.
//! It consumes the raw message stream a transport hands it, normalizes the
//! envelope and marker formats the upstream emits, deduplicates redelivered
//! events, tracks step-based progress, and drives the five-phase upgrade
//! workflow (configure, pre-check, review, upgrade, results) through a
//! validated state machine.
//!
//! ## Architecture
//!
//! Passive components, one composition point. The event pipeline, progress
//! tracker, phase state machine, and subscription manager are all plain
//! state holders with no I/O of their own;
//! [`WorkflowOrchestrator`](orchestration::WorkflowOrchestrator) owns them
//! behind a single lock and is the only place where transport messages and
//! operator actions meet the state. Collaborators with real I/O, the job
//! submission client, the transition timer, and the subscription intent
//! sink, are injected as traits.
//!
//! ## Module Organization
//!
//! - [`events`] - Envelope unwrapping, the event catalog, deduplication
//! - [`workflow`] - Progress tracking, phase state machine, summary
//!   extraction, delayed transitions
//! - [`subscription`] - Per-job channel intents and stale-channel filtering
//! - [`api`] - Job submission client for the upgrade gateway
//! - [`orchestration`] - The façade wiring everything together
//! - [`config`] - Tunables with environment and file overrides
//! - [`error`] - Structured error handling
//! - [`constants`] - Wire-format markers and behavioral constants
//! - [`test_helpers`] - Deterministic collaborators for driving the engine
//!   in tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use upgrade_workflow::api::HttpSubmissionClient;
//! use upgrade_workflow::config::WorkflowConfig;
//! use upgrade_workflow::orchestration::WorkflowOrchestrator;
//! use upgrade_workflow::subscription::SubscriptionIntent;
//! use upgrade_workflow::workflow::scheduler::TokioScheduler;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WorkflowConfig::load()?;
//! let client = Arc::new(HttpSubmissionClient::new(&config.api)?);
//!
//! // The transport task owns the receiving end and forwards intents
//! // over its socket.
//! let (intent_tx, _intent_rx) =
//!     tokio::sync::mpsc::unbounded_channel::<SubscriptionIntent>();
//!
//! let orchestrator = WorkflowOrchestrator::new(
//!     config,
//!     client,
//!     Arc::new(TokioScheduler),
//!     Arc::new(intent_tx),
//! );
//!
//! let _notifications = orchestrator.subscribe_notifications();
//! orchestrator.set_connected(true);
//!
//! // Feed raw frames exactly as the transport receives them.
//! orchestrator.handle_raw_message(
//!     r#"{"channel":"ws_channel:job:42","data":"{\"event_type\":\"OPERATION_START\"}"}"#,
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Components are tested in isolation; the orchestrator and the integration
//! suites run the full pipeline against scripted collaborators, so no test
//! needs a gateway, a socket, or wall-clock time:
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod orchestration;
pub mod subscription;
pub mod test_helpers;
pub mod workflow;

pub use config::WorkflowConfig;
// Re-export constants events with different name to avoid conflict
pub use constants::events as event_names;
pub use constants::system;
pub use error::{ApiError, EventError, WorkflowError, WorkflowResult};
pub use events::types::{ApplicationEvent, EventKind, LogEntry, PreCheckSummary};
pub use events::unwrap::unwrap_message;
pub use orchestration::{WorkflowNotification, WorkflowOrchestrator};
pub use workflow::progress::ProgressState;
pub use workflow::states::{JobStatus, WorkflowPhase};
