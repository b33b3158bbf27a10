//! # Event Pipeline
//!
//! Everything between a raw transport frame and a canonical, deduplicated
//! application event: wire types, envelope unwrapping, and signature-based
//! redelivery suppression.

pub mod dedup;
pub mod types;
pub mod unwrap;

// Re-export key types for convenience
pub use dedup::{EventDeduplicator, LogSignature};
pub use types::{
    ApplicationEvent, CheckResult, CheckSeverity, EventKind, LogEntry, PreCheckSummary,
    StepStatus, TransportEnvelope,
};
pub use unwrap::{extract_nested_event, unwrap_message, UnwrappedMessage};
