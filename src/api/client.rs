//! Job submission client for the upgrade gateway.
//!
//! The orchestrator talks to the gateway through the [`JobSubmissionClient`]
//! trait so tests can script accepted/rejected submissions without a server.
//! [`HttpSubmissionClient`] is the production implementation.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

use super::types::{flatten_error_detail, JobKind, JobSubmissionResponse, UpgradeJobRequest};

/// Submits jobs to the upgrade gateway
#[async_trait]
pub trait JobSubmissionClient: Send + Sync + fmt::Debug {
    /// Submit a job of the given kind, returning the accepted job handle.
    async fn submit(
        &self,
        kind: JobKind,
        request: &UpgradeJobRequest,
    ) -> ApiResult<JobSubmissionResponse>;
}

/// HTTP implementation backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpSubmissionClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSubmissionClient {
    /// Build a client from API configuration.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, kind: JobKind) -> String {
        format!("{}{}", self.base_url, kind.endpoint_path())
    }
}

#[async_trait]
impl JobSubmissionClient for HttpSubmissionClient {
    async fn submit(
        &self,
        kind: JobKind,
        request: &UpgradeJobRequest,
    ) -> ApiResult<JobSubmissionResponse> {
        request.validate()?;

        let url = self.endpoint(kind);
        debug!(
            job_kind = kind.as_str(),
            url = %url,
            target = request.target_label(),
            "Submitting job"
        );

        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            // Error bodies are not always JSON; keep the status even when the
            // body is unreadable.
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = flatten_error_detail(&body);
            warn!(
                job_kind = kind.as_str(),
                status = status.as_u16(),
                message = %message,
                "Job submission rejected"
            );
            return Err(ApiError::rejected(status.as_u16(), message));
        }

        let accepted: JobSubmissionResponse = response.json().await?;
        info!(
            job_kind = kind.as_str(),
            job_id = %accepted.job_id,
            ws_channel = %accepted.ws_channel,
            "Job accepted"
        );
        Ok(accepted)
    }
}
