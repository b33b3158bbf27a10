//! # Canonical Event Types
//!
//! Wire shapes for the per-job pub/sub stream: the transport envelope, the
//! canonical application event, and the typed payloads the workflow engine
//! extracts from it.
//!
//! The raw `ApplicationEvent` keeps wire fidelity (unknown event types and
//! partial payloads must survive deserialization); `EventKind` is the typed
//! view the engine matches on exhaustively.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::constants::events;

/// Outer wrapper produced by the pub/sub transport.
///
/// `data` is usually a JSON string holding a serialized event, but an
/// already-deserialized object is accepted too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The canonical unit the workflow engine reasons about.
///
/// Every field except `event_type` is optional on the wire; payload
/// structure varies per event type and is kept as raw JSON until a handler
/// extracts what it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationEvent {
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApplicationEvent {
    /// Create a plain log event with the given message
    pub fn log(message: impl Into<String>) -> Self {
        Self {
            event_type: events::ORCHESTRATOR_LOG.to_string(),
            message: Some(message.into()),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            level: Some("info".to_string()),
            data: None,
        }
    }

    /// Create an event of the given type with a payload
    pub fn with_data(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            message: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            level: None,
            data: Some(data),
        }
    }

    /// Fetch a field from the payload object, if the payload is an object
    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(key))
    }

    /// Classify this event into the typed view the engine matches on
    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            events::OPERATION_START => EventKind::OperationStart {
                total_steps: self
                    .data_field("total_steps")
                    .and_then(Value::as_u64)
                    .map(|steps| steps as u32),
            },
            events::STEP_START => EventKind::StepStart {
                step: self
                    .data_field("step")
                    .and_then(Value::as_u64)
                    .map(|step| step as u32),
                step_name: self
                    .data_field("step_name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            events::STEP_COMPLETE => EventKind::StepComplete {
                step: self
                    .data_field("step")
                    .and_then(Value::as_u64)
                    .map(|step| step as u32),
                status: self
                    .data_field("status")
                    .and_then(Value::as_str)
                    .and_then(|status| status.parse().ok()),
            },
            events::PRE_CHECK_RESULT => EventKind::PreCheckResult {
                result: self
                    .data
                    .as_ref()
                    .and_then(|data| serde_json::from_value(data.clone()).ok()),
            },
            events::PRE_CHECK_COMPLETE => EventKind::PreCheckComplete,
            events::PRE_CHECK_FAILED => EventKind::PreCheckFailed {
                error: self
                    .data_field("error")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            events::OPERATION_COMPLETE => EventKind::OperationComplete,
            events::ORCHESTRATOR_LOG => EventKind::OrchestratorLog,
            events::DEVICE_PROGRESS => EventKind::DeviceProgress {
                hostname: self
                    .data_field("hostname")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                percentage: self.data_field("percentage").and_then(Value::as_u64),
            },
            events::UPGRADE_PROGRESS => EventKind::UpgradeProgress {
                percentage: self.data_field("percentage").and_then(Value::as_u64),
            },
            _ => EventKind::Unknown,
        }
    }

    /// Check if this event type ends a phase
    pub fn is_terminal(&self) -> bool {
        crate::constants::event_groups::TERMINAL_EVENTS.contains(&self.event_type.as_str())
    }

    /// Display text for the run log: the message when present, otherwise a
    /// compact payload rendering
    pub fn display_text(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match &self.data {
            Some(data) => format!("{}: {}", self.event_type, data),
            None => self.event_type.clone(),
        }
    }
}

/// Typed view of an [`ApplicationEvent`], discriminated by `event_type`.
///
/// Unknown event types classify as [`EventKind::Unknown`] and remain
/// displayable log lines; they never fail the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    OperationStart {
        total_steps: Option<u32>,
    },
    StepStart {
        step: Option<u32>,
        step_name: Option<String>,
    },
    StepComplete {
        step: Option<u32>,
        status: Option<StepStatus>,
    },
    PreCheckResult {
        result: Option<CheckResult>,
    },
    PreCheckComplete,
    PreCheckFailed {
        error: Option<String>,
    },
    OperationComplete,
    OrchestratorLog,
    DeviceProgress {
        hostname: Option<String>,
        percentage: Option<u64>,
    },
    UpgradeProgress {
        percentage: Option<u64>,
    },
    Unknown,
}

/// Severity of a single validation check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckSeverity {
    Pass,
    Warning,
    Critical,
}

impl CheckSeverity {
    /// Check if this severity blocks the upgrade from proceeding
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Critical)
    }
}

impl fmt::Display for CheckSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for CheckSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(Self::Pass),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Invalid check severity: {s}")),
        }
    }
}

impl Default for CheckSeverity {
    fn default() -> Self {
        Self::Pass
    }
}

/// Status reported by a `STEP_COMPLETE` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
    Warning,
}

impl StepStatus {
    /// Check if this status counts the step toward completed progress
    pub fn counts_as_complete(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped | Self::Warning)
    }

    /// Check if this status indicates the step failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

impl std::str::FromStr for StepStatus {
    type Err = String;

    // The upstream emits both `completed` and `COMPLETED` depending on the
    // code path, so parsing is case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            "warning" => Ok(Self::Warning),
            _ => Err(format!("Invalid step status: {s}")),
        }
    }
}

/// Outcome of one validation check within a pre-check run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    #[serde(default)]
    pub check_name: String,
    #[serde(default)]
    pub severity: CheckSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// Aggregate verdict of one pre-check run.
///
/// Immutable once set; replaced only by a new run. The upstream producer
/// sends partial summaries often enough that every count defaults to zero
/// rather than failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreCheckSummary {
    #[serde(default)]
    pub total_checks: u32,
    #[serde(default)]
    pub passed: u32,
    #[serde(default)]
    pub warnings: u32,
    #[serde(default)]
    pub critical_failures: u32,
    #[serde(default)]
    pub can_proceed: bool,
    #[serde(default)]
    pub results: Vec<CheckResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_occurred: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl PreCheckSummary {
    /// Placeholder summary for a run that ended without delivering one.
    ///
    /// Lets the consumer render a distinct "failed with no details" state
    /// instead of an indefinite loading view.
    pub fn error_placeholder(error_type: impl Into<String>) -> Self {
        Self {
            total_checks: 0,
            passed: 0,
            warnings: 0,
            critical_failures: 0,
            can_proceed: false,
            results: Vec::new(),
            error_occurred: Some(true),
            error_type: Some(error_type.into()),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Check if this summary is the no-details failure placeholder
    pub fn is_error_placeholder(&self) -> bool {
        self.error_occurred.unwrap_or(false)
    }

    /// Check if the shape looks like a real summary (used when probing
    /// loosely-typed payload locations)
    pub fn looks_like_summary(value: &Value) -> bool {
        value.get("total_checks").is_some() || value.get("results").is_some()
    }
}

/// One visible line in the run log, ordered by append sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub sequence: u64,
    pub event: ApplicationEvent,
}
