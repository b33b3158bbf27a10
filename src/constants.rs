//! # System Constants
//!
//! Core constants and wire-format literals that define the operational
//! boundaries of the upgrade workflow engine.
//!
//! Event names, channel prefixes, and extraction markers here mirror the
//! contract of the upstream job gateway and runner; changing any literal is a
//! protocol break, not a refactor.

/// Application event types delivered over the per-job pub/sub channel
pub mod events {
    // Operation lifecycle events
    pub const OPERATION_START: &str = "OPERATION_START";
    pub const OPERATION_COMPLETE: &str = "OPERATION_COMPLETE";

    // Step lifecycle events
    pub const STEP_START: &str = "STEP_START";
    pub const STEP_COMPLETE: &str = "STEP_COMPLETE";

    // Pre-check validation events
    pub const PRE_CHECK_RESULT: &str = "PRE_CHECK_RESULT";
    pub const PRE_CHECK_COMPLETE: &str = "PRE_CHECK_COMPLETE";
    pub const PRE_CHECK_FAILED: &str = "PRE_CHECK_FAILED";

    // Runner output and progress events
    pub const ORCHESTRATOR_LOG: &str = "ORCHESTRATOR_LOG";
    pub const DEVICE_PROGRESS: &str = "DEVICE_PROGRESS";
    pub const UPGRADE_PROGRESS: &str = "UPGRADE_PROGRESS";
}

/// Event groupings for display and suppression logic
pub mod event_groups {
    use super::events;

    /// Event types that must never be hidden from the visible run log, even
    /// when their signature has already been seen. Redelivery suppression for
    /// state mutation is a separate gate.
    pub const DISPLAY_CRITICAL_EVENTS: &[&str] = &[
        events::PRE_CHECK_COMPLETE,
        events::OPERATION_COMPLETE,
        events::OPERATION_START,
        events::STEP_COMPLETE,
        events::PRE_CHECK_RESULT,
        events::ORCHESTRATOR_LOG,
    ];

    /// Event types that end a phase
    pub const TERMINAL_EVENTS: &[&str] =
        &[events::OPERATION_COMPLETE, events::PRE_CHECK_COMPLETE];
}

/// Pub/sub channel naming
pub mod channels {
    /// Prefix the hub applies to stored channel names; inbound envelopes
    /// carry the prefixed form, subscription intents carry the bare form.
    pub const WS_CHANNEL_PREFIX: &str = "ws_channel:";

    /// Bare per-job channel prefix, completed with the job id
    pub const JOB_CHANNEL_PREFIX: &str = "job:";
}

/// Markers used by the runner to smuggle structured events through log text
pub mod markers {
    /// Prefix emitted on the runner's stderr ahead of a serialized event
    pub const JSON_PROGRESS_PREFIX: &str = "JSON_PROGRESS: ";

    /// Stream tags the gateway wraps around captured subprocess output
    pub const STREAM_TAGS: &[&str] = &["[STDOUT]", "[STDERR]", "[STDOUT_RAW]", "[STDERR_RAW]"];
}

/// System-wide defaults
pub mod system {
    use std::time::Duration;

    /// Progress percentage seeded when an operation announces itself
    pub const PROGRESS_SEED_PERCENT: u8 = 5;

    /// Ceiling applied to computed progress until a terminal event lands
    pub const PROGRESS_CEILING_PERCENT: u8 = 99;

    /// Coarse increment applied per step when the total step count is unknown
    pub const PROGRESS_FALLBACK_INCREMENT: u8 = 25;

    /// Signature prefix length taken from an event message for deduplication
    pub const SIGNATURE_MESSAGE_PREFIX_LEN: usize = 100;

    /// Pause before moving a finished pre-check into the review phase
    pub const REVIEW_TRANSITION_DELAY: Duration = Duration::from_millis(1500);

    /// Pause before moving a finished upgrade into the results phase
    pub const RESULTS_TRANSITION_DELAY: Duration = Duration::from_millis(2000);

    /// Default job submission endpoint
    pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

    /// Default job submission request timeout
    pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

    /// Job id prefix for validation-only runs
    pub const PRE_CHECK_JOB_PREFIX: &str = "pre-check-";

    /// Job id prefix for full upgrade runs
    pub const CODE_UPGRADE_JOB_PREFIX: &str = "code-upgrade-";
}
