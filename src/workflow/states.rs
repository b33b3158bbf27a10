//! Workflow phase and job status definitions.
//!
//! The phase walks configure → pre-check → review → upgrade → results and
//! never regresses except through an explicit reset or a restarted run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One stage of the upgrade workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    /// Operator is filling in device and image parameters
    Configure,
    /// Pre-flight validation run is active or just finished
    PreCheck,
    /// Operator reviews validation results before committing
    Review,
    /// Upgrade run is active or just finished
    Upgrade,
    /// Final results are on display
    Results,
}

impl WorkflowPhase {
    /// Check if this is the final phase of a workflow run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Results)
    }

    /// Check if a job is expected to be streaming events in this phase
    pub fn expects_events(&self) -> bool {
        matches!(self, Self::PreCheck | Self::Upgrade)
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure => write!(f, "configure"),
            Self::PreCheck => write!(f, "pre_check"),
            Self::Review => write!(f, "review"),
            Self::Upgrade => write!(f, "upgrade"),
            Self::Results => write!(f, "results"),
        }
    }
}

impl std::str::FromStr for WorkflowPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "configure" => Ok(Self::Configure),
            "pre_check" => Ok(Self::PreCheck),
            "review" => Ok(Self::Review),
            "upgrade" => Ok(Self::Upgrade),
            "results" => Ok(Self::Results),
            _ => Err(format!("Invalid workflow phase: {s}")),
        }
    }
}

impl Default for WorkflowPhase {
    fn default() -> Self {
        Self::Configure
    }
}

/// Status of the job currently associated with the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// No job submitted
    Idle,
    /// Job submitted and streaming events
    Running,
    /// Job finished and reported success
    Success,
    /// Job finished and reported failure, or could not be submitted
    Failed,
}

impl JobStatus {
    /// Check if a job is actively streaming
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Check if the job reached a final verdict
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Idle
    }
}
