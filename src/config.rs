//! # Workflow Configuration
//!
//! Tunables for the workflow engine, grouped per component. Defaults match
//! the upstream consumer's observed behavior; every value can be overridden
//! through `UPGRADE_CORE_`-prefixed environment variables (for example
//! `UPGRADE_CORE_TRANSITIONS__REVIEW_DELAY_MS=500`).
//!
//! Components read their tunables from these structs; nothing in the crate
//! consults environment variables at use sites.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::system;

/// Job submission API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl ApiConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: system::DEFAULT_API_BASE_URL.to_string(),
            timeout_seconds: system::DEFAULT_API_TIMEOUT.as_secs(),
        }
    }
}

/// Progress tracker settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Percentage seeded when an operation announces itself
    pub seed_percent: u8,
    /// Ceiling applied until a terminal event lands
    pub ceiling_percent: u8,
    /// Per-step increment when the total step count is unknown
    pub fallback_increment: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            seed_percent: system::PROGRESS_SEED_PERCENT,
            ceiling_percent: system::PROGRESS_CEILING_PERCENT,
            fallback_increment: system::PROGRESS_FALLBACK_INCREMENT,
        }
    }
}

/// Delayed phase transition settings.
///
/// The delays are an observation window for a human reading the live log,
/// not debounce timers; shortening them to zero changes the product, not
/// just the timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub review_delay_ms: u64,
    pub results_delay_ms: u64,
}

impl TransitionConfig {
    /// Delay before a finished pre-check moves to review
    pub fn review_delay(&self) -> Duration {
        Duration::from_millis(self.review_delay_ms)
    }

    /// Delay before a finished upgrade moves to results
    pub fn results_delay(&self) -> Duration {
        Duration::from_millis(self.results_delay_ms)
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            review_delay_ms: system::REVIEW_TRANSITION_DELAY.as_millis() as u64,
            results_delay_ms: system::RESULTS_TRANSITION_DELAY.as_millis() as u64,
        }
    }
}

/// Deduplicator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Signature memory bound for one run
    pub max_entries: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { max_entries: 4096 }
    }
}

/// Top-level workflow engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkflowConfig {
    pub api: ApiConfig,
    pub progress: ProgressConfig,
    pub transitions: TransitionConfig,
    pub dedup: DedupConfig,
}

impl WorkflowConfig {
    /// Load configuration: defaults layered under `UPGRADE_CORE_`
    /// environment overrides, with `__` separating nesting levels.
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(
                config::Environment::with_prefix("UPGRADE_CORE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        settings.try_deserialize()
    }

    /// Load configuration from a file, layered between the defaults and the
    /// environment overrides. Format is inferred from the extension.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("UPGRADE_CORE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        settings.try_deserialize()
    }
}
