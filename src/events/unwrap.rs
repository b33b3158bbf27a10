//! # Envelope Unwrapping
//!
//! Turns one raw transport message into at most one canonical
//! [`ApplicationEvent`], peeling away up to two layers of nesting:
//!
//! 1. The transport envelope (`{channel, data}`) around the event, where
//!    `data` may be a serialized string or an already-parsed object.
//! 2. A second serialized event smuggled inside an `ORCHESTRATOR_LOG`
//!    message, behind the `JSON_PROGRESS: ` marker or a bracketed stream
//!    tag (`[STDOUT]`, `[STDERR]`, `[STDOUT_RAW]`, `[STDERR_RAW]`).
//!
//! Malformed input degrades, never panics: a non-JSON message yields `None`,
//! a broken inner layer falls back to the outer layer as a plain log line.

use serde_json::Value;
use tracing::{debug, trace};

use crate::constants::{events, markers};
use crate::events::types::ApplicationEvent;

/// A fully unwrapped transport message: the envelope's channel tag (when the
/// envelope carried one) and the canonical event.
#[derive(Debug, Clone, PartialEq)]
pub struct UnwrappedMessage {
    pub channel: Option<String>,
    pub event: ApplicationEvent,
}

/// Unwrap one raw transport message into its canonical event.
///
/// Returns `None` when the message is not an application event at all
/// (non-JSON heartbeats, system frames, unparseable text). Never returns an
/// error: every recoverable malformation degrades toward "treat it as a log
/// line."
pub fn unwrap_message(raw: &str) -> Option<UnwrappedMessage> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        trace!("skipping non-JSON transport frame");
        return None;
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "transport frame looked like JSON but did not parse");
            return None;
        }
    };

    let (channel, working) = split_envelope(value)?;
    let event = resolve_carrier(working);
    Some(UnwrappedMessage { channel, event })
}

/// Separate the transport envelope from the event it carries.
///
/// A top-level `event_type` means the frame already is the event (its own
/// `data` field is the payload, not another layer). Without one, an object
/// carrying `data` is an envelope. Returns `None` when no event shape can be
/// recovered.
fn split_envelope(value: Value) -> Option<(Option<String>, ApplicationEvent)> {
    let Some(object) = value.as_object() else {
        trace!("JSON frame is not an object, not an application event");
        return None;
    };

    if object.contains_key("event_type") || !object.contains_key("data") {
        return match serde_json::from_value::<ApplicationEvent>(value) {
            Ok(event) => Some((None, event)),
            Err(err) => {
                trace!(error = %err, "JSON frame has no usable event shape, dropping");
                None
            }
        };
    }

    let channel = object
        .get("channel")
        .and_then(Value::as_str)
        .map(str::to_string);

    let data = object.get("data").cloned().unwrap_or(Value::Null);
    let event = match data {
        Value::String(inner) => match serde_json::from_str::<ApplicationEvent>(&inner) {
            Ok(event) => event,
            Err(err) => {
                debug!(error = %err, "envelope data string is not an event, degrading to log line");
                ApplicationEvent::log(inner)
            }
        },
        Value::Object(_) => {
            match serde_json::from_value::<ApplicationEvent>(data.clone()) {
                Ok(event) => event,
                Err(err) => {
                    debug!(error = %err, "envelope data object is not an event, degrading to log line");
                    ApplicationEvent::log(data.to_string())
                }
            }
        }
        other => {
            debug!("envelope data has unsupported shape, degrading to log line");
            ApplicationEvent::log(other.to_string())
        }
    };

    Some((channel, event))
}

/// Replace a log-carrier event with the event embedded in its message, when
/// one can be extracted. Extraction failure keeps the carrier untouched.
fn resolve_carrier(event: ApplicationEvent) -> ApplicationEvent {
    if event.event_type != events::ORCHESTRATOR_LOG {
        return event;
    }
    let Some(message) = event.message.as_deref() else {
        return event;
    };
    match extract_nested_event(message) {
        Some(nested) => {
            trace!(
                nested_type = %nested.event_type,
                "extracted nested event from log carrier"
            );
            nested
        }
        None => event,
    }
}

/// Extract a serialized event embedded in a log message.
///
/// Recognized forms, in order:
/// - `JSON_PROGRESS: {...}`
/// - `[STDOUT] {...}` / `[STDERR] {...}` (and their `_RAW` variants), where
///   the braced payload may itself repeat the marker prefix.
///
/// At most one nested event comes out of one carrier.
pub fn extract_nested_event(message: &str) -> Option<ApplicationEvent> {
    let trimmed = message.trim();

    if let Some(rest) = trimmed.strip_prefix(markers::JSON_PROGRESS_PREFIX) {
        return parse_embedded_json(rest);
    }

    for tag in markers::STREAM_TAGS {
        if let Some(rest) = trimmed.strip_prefix(tag) {
            let rest = rest.trim_start();
            let rest = rest
                .strip_prefix(markers::JSON_PROGRESS_PREFIX)
                .unwrap_or(rest);
            return parse_embedded_json(rest);
        }
    }

    None
}

fn parse_embedded_json(text: &str) -> Option<ApplicationEvent> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    match serde_json::from_str::<ApplicationEvent>(trimmed) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(error = %err, "embedded JSON did not parse as an event, keeping carrier");
            None
        }
    }
}
