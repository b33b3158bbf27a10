//! # Job Submission API
//!
//! Client-side models and transport for starting pre-check and upgrade jobs
//! on the gateway. Request validation mirrors the server's rules; rejection
//! bodies (including FastAPI-style 422 field errors) are flattened into
//! single-line messages for the run log.

pub mod client;
pub mod types;

// Re-export key types for convenience
pub use client::{HttpSubmissionClient, JobSubmissionClient};
pub use types::{flatten_error_detail, JobKind, JobSubmissionResponse, UpgradeJobRequest};
