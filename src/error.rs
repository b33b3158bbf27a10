//! # Workflow Error Types
//!
//! Structured error handling for the upgrade workflow engine using thiserror
//! instead of `Box<dyn Error>` patterns.
//!
//! Three concerns, three enums: `EventError` for transport parsing,
//! `ApiError` for job submission, `WorkflowError` for state-machine guards
//! and summary extraction. Parse-level failures are swallowed and logged by
//! the message pipeline; the other two surface to the caller.

use thiserror::Error;

/// Errors raised while unwrapping or decoding transport messages
#[derive(Error, Debug)]
pub enum EventError {
    #[error("Transport envelope parse error: {message}")]
    EnvelopeParse { message: String },

    #[error("Event deserialization error: {message}")]
    EventDeserialization { message: String },

    #[error("Event serialization error: {message}")]
    EventSerialization { message: String },

    #[error("Nested event extraction failed in {location}: {message}")]
    NestedExtraction { location: String, message: String },
}

impl EventError {
    /// Create a transport envelope parse error
    pub fn envelope_parse(message: impl Into<String>) -> Self {
        Self::EnvelopeParse {
            message: message.into(),
        }
    }

    /// Create an event deserialization error
    pub fn event_deserialization(message: impl Into<String>) -> Self {
        Self::EventDeserialization {
            message: message.into(),
        }
    }

    /// Create an event serialization error
    pub fn event_serialization(message: impl Into<String>) -> Self {
        Self::EventSerialization {
            message: message.into(),
        }
    }

    /// Create a nested extraction error
    pub fn nested_extraction(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NestedExtraction {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Conversion from serde_json::Error to EventError
impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_eof() {
            EventError::event_deserialization(err.to_string())
        } else {
            EventError::event_serialization(err.to_string())
        }
    }
}

/// Errors raised by the job submission API client
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request validation failed: {message}")]
    Validation { message: String },

    #[error("Job submission rejected: HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Job submission transport error: {message}")]
    Transport { message: String },

    #[error("Job submission response decode error: {message}")]
    ResponseDecode { message: String },
}

impl ApiError {
    /// Create a request validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a rejection error from an HTTP status and flattened detail
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Create a transport-level error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a response decode error
    pub fn response_decode(message: impl Into<String>) -> Self {
        Self::ResponseDecode {
            message: message.into(),
        }
    }

    /// Human-readable message suitable for the run log
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation { message } => message.clone(),
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Transport { message } => format!("Connection to job API failed: {message}"),
            ApiError::ResponseDecode { message } => {
                format!("Unexpected response from job API: {message}")
            }
        }
    }
}

/// Conversion from reqwest::Error to ApiError
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::response_decode(err.to_string())
        } else {
            ApiError::transport(err.to_string())
        }
    }
}

/// Errors raised by workflow actions and phase transitions
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Transport not connected: cannot {action}")]
    NotConnected { action: String },

    #[error("A job is already running: cannot {action}")]
    AlreadyRunning { action: String },

    #[error("Invalid phase transition from {from} via {trigger}")]
    InvalidTransition { from: String, trigger: String },

    #[error("Action {action} requires a completed pre-check that allows proceeding")]
    PreCheckNotEligible { action: String },

    #[error("Completion event carried no extractable summary for job {job_id}")]
    IncompleteSummary { job_id: String },

    #[error("Job submission failed: {0}")]
    Submission(#[from] ApiError),
}

impl WorkflowError {
    /// Create a connectivity guard error
    pub fn not_connected(action: impl Into<String>) -> Self {
        Self::NotConnected {
            action: action.into(),
        }
    }

    /// Create an active-job guard error
    pub fn already_running(action: impl Into<String>) -> Self {
        Self::AlreadyRunning {
            action: action.into(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(from: impl Into<String>, trigger: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            trigger: trigger.into(),
        }
    }

    /// Create a pre-check eligibility error
    pub fn pre_check_not_eligible(action: impl Into<String>) -> Self {
        Self::PreCheckNotEligible {
            action: action.into(),
        }
    }

    /// Create an incomplete summary error
    pub fn incomplete_summary(job_id: impl Into<String>) -> Self {
        Self::IncompleteSummary {
            job_id: job_id.into(),
        }
    }
}

/// Result type alias for event decoding operations
pub type EventResult<T> = Result<T, EventError>;

/// Result type alias for job submission operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
