//! Proptest strategies shaped like the gateway's wire traffic.
//!
//! The generators deliberately include unknown event types, missing optional
//! fields, repeated step indices, and out-of-range values; the pipeline has
//! to shrug all of those off.

use proptest::prelude::*;
use serde_json::{json, Value};

use upgrade_workflow::workflow::state_machine::PhaseTrigger;

/// Job identifiers the way the gateway mints them
pub fn job_id_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,24}"
}

/// Known event types plus arbitrary unknown ones
pub fn event_type_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("OPERATION_START".to_string()),
        Just("STEP_START".to_string()),
        Just("STEP_COMPLETE".to_string()),
        Just("PRE_CHECK_RESULT".to_string()),
        Just("PRE_CHECK_COMPLETE".to_string()),
        Just("PRE_CHECK_FAILED".to_string()),
        Just("OPERATION_COMPLETE".to_string()),
        Just("DEVICE_PROGRESS".to_string()),
        Just("UPGRADE_PROGRESS".to_string()),
        Just("ORCHESTRATOR_LOG".to_string()),
        "[A-Z][A-Z_]{2,23}",
    ]
}

/// Printable log messages. The nested-event marker is excluded so that
/// carrier extraction cannot rewrite a generated event's type mid-property.
pub fn message_strategy() -> impl Strategy<Value = String> {
    "[ -~]{0,200}".prop_filter("message must not embed the progress marker", |m| {
        !m.contains("JSON_PROGRESS")
    })
}

/// Timestamps in the RFC 3339 shape the upstream scripts emit
pub fn timestamp_strategy() -> impl Strategy<Value = String> {
    (2020u32..2031, 1u32..13, 1u32..29, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(year, month, day, hour, minute, second)| {
            format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
        },
    )
}

/// Complete event objects, with the optional fields sometimes absent
pub fn event_value_strategy() -> impl Strategy<Value = Value> {
    (
        event_type_strategy(),
        proptest::option::of(message_strategy()),
        proptest::option::of(timestamp_strategy()),
    )
        .prop_map(|(event_type, message, timestamp)| {
            let mut event = json!({ "event_type": event_type });
            if let Some(message) = message {
                event["message"] = json!(message);
            }
            if let Some(timestamp) = timestamp {
                event["timestamp"] = json!(timestamp);
            }
            event
        })
}

/// Arbitrary trigger sequences for the phase table
pub fn trigger_sequence_strategy() -> impl Strategy<Value = Vec<PhaseTrigger>> {
    proptest::collection::vec(
        prop_oneof![
            Just(PhaseTrigger::StartPreCheck),
            Just(PhaseTrigger::EnterReview),
            Just(PhaseTrigger::StartUpgrade),
            Just(PhaseTrigger::EnterResults),
            Just(PhaseTrigger::Reset),
        ],
        0..16,
    )
}

/// A step total plus a completion sequence full of repeats and stray indices
pub fn step_run_strategy() -> impl Strategy<Value = (u32, Vec<u32>)> {
    (1u32..=40).prop_flat_map(|total| {
        (
            Just(total),
            proptest::collection::vec(1..=total.saturating_mul(2), 0..80),
        )
    })
}
