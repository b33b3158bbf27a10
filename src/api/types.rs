//! Request and response models for the job submission API.
//!
//! Validation mirrors the server's rules so obviously broken requests fail
//! fast with a readable message instead of a 422 round-trip; the 422 path is
//! still handled for everything only the server can know.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::system;
use crate::error::{ApiError, ApiResult};

/// Which kind of job a submission starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Pre-flight validation only
    PreCheck,
    /// Full upgrade execution
    CodeUpgrade,
}

impl JobKind {
    /// Submission endpoint path for this kind
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Self::PreCheck => "/api/code-upgrade/pre-check",
            Self::CodeUpgrade => "/api/code-upgrade/execute",
        }
    }

    /// Prefix the gateway embeds in job ids of this kind
    pub fn job_id_prefix(&self) -> &'static str {
        match self {
            Self::PreCheck => system::PRE_CHECK_JOB_PREFIX,
            Self::CodeUpgrade => system::CODE_UPGRADE_JOB_PREFIX,
        }
    }

    /// Human-readable label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreCheck => "pre_check",
            Self::CodeUpgrade => "code_upgrade",
        }
    }
}

/// Parameters for one upgrade or pre-check job.
///
/// Targets exactly one of `hostname` (single device) or `inventory_file`
/// (batch mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UpgradeJobRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_file: Option<String>,
    pub username: String,
    pub password: String,
    pub vendor: String,
    pub platform: String,
    pub target_version: String,
    pub image_filename: String,
    pub skip_storage_check: bool,
    pub skip_snapshot_check: bool,
}

impl UpgradeJobRequest {
    /// Apply the server's validation rules locally.
    pub fn validate(&self) -> ApiResult<()> {
        let has_hostname = self
            .hostname
            .as_deref()
            .map(|hostname| !hostname.trim().is_empty())
            .unwrap_or(false);
        let has_inventory = self
            .inventory_file
            .as_deref()
            .map(|file| !file.trim().is_empty())
            .unwrap_or(false);

        if !has_hostname && !has_inventory {
            return Err(ApiError::validation(
                "Either hostname or inventory_file must be provided",
            ));
        }
        if has_hostname && has_inventory {
            return Err(ApiError::validation(
                "Provide either hostname or inventory_file, not both",
            ));
        }
        if self.username.trim().is_empty() || self.password.trim().is_empty() {
            return Err(ApiError::validation("Username and password are required"));
        }
        if self.vendor.trim().is_empty() || self.platform.trim().is_empty() {
            return Err(ApiError::validation("Vendor and platform are required"));
        }
        if self.target_version.trim().is_empty() {
            return Err(ApiError::validation("Target version is required"));
        }
        if self.image_filename.trim().is_empty() {
            return Err(ApiError::validation("Image filename is required"));
        }
        Ok(())
    }

    /// The device label used in logs: hostname or the inventory file name
    pub fn target_label(&self) -> &str {
        self.hostname
            .as_deref()
            .or(self.inventory_file.as_deref())
            .unwrap_or("unknown")
    }
}

/// Accepted-submission response from the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmissionResponse {
    pub job_id: String,
    #[serde(default)]
    pub status: String,
    /// Bare per-job channel (`job:<uuid>`) to subscribe to
    pub ws_channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// Flatten a gateway error body into one readable line.
///
/// Handles `{"detail": "plain text"}`, the 422 shape
/// `{"detail": [{"loc": [...], "msg": "...", "type": "..."}]}`, and a
/// `{"message": "..."}` fallback.
pub fn flatten_error_detail(body: &Value) -> String {
    match body.get("detail") {
        Some(Value::String(detail)) => return detail.clone(),
        Some(Value::Array(items)) => {
            let lines: Vec<String> = items.iter().filter_map(flatten_field_error).collect();
            if !lines.is_empty() {
                return lines.join("; ");
            }
        }
        _ => {}
    }
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    "Unknown error".to_string()
}

fn flatten_field_error(item: &Value) -> Option<String> {
    let msg = item.get("msg").and_then(Value::as_str)?;
    let field = item
        .get("loc")
        .and_then(Value::as_array)
        .and_then(|loc| loc.last())
        .and_then(Value::as_str);
    Some(match field {
        Some(field) => format!("{field}: {msg}"),
        None => msg.to_string(),
    })
}
