//! # Event Deduplication
//!
//! The transport redelivers. Mutating workflow state twice for one
//! occurrence must be impossible, but hiding structurally important events
//! from the visible run log is not acceptable either. Two independent gates
//! cover this:
//!
//! - [`EventDeduplicator::is_duplicate`] is the state-mutation gate; handlers
//!   that increment progress or assign summaries consult it always.
//! - [`EventDeduplicator::should_display`] is the display gate; event types
//!   in [`DISPLAY_CRITICAL_EVENTS`](crate::constants::event_groups) pass it
//!   regardless of duplication status.

use std::collections::{HashSet, VecDeque};

use crate::constants::{event_groups, system};
use crate::events::types::ApplicationEvent;

/// Derived identity of one event occurrence.
///
/// `event_type + "::" + timestamp-or-empty + "::" + first 100 chars of the
/// message`. Not stored on the event; computed where needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogSignature(String);

impl LogSignature {
    /// Compute the signature for an event
    pub fn of(event: &ApplicationEvent) -> Self {
        let timestamp = event.timestamp.as_deref().unwrap_or("");
        let message_prefix: String = event
            .message
            .as_deref()
            .unwrap_or("")
            .chars()
            .take(system::SIGNATURE_MESSAGE_PREFIX_LEN)
            .collect();
        Self(format!(
            "{}::{}::{}",
            event.event_type, timestamp, message_prefix
        ))
    }

    /// The signature's key form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Signature memory for one workflow run.
///
/// Bounded: when `max_entries` is exceeded the oldest signatures are
/// forgotten first. A run's stream is small enough that the default bound is
/// effectively "remember everything."
#[derive(Debug)]
pub struct EventDeduplicator {
    seen: HashSet<LogSignature>,
    order: VecDeque<LogSignature>,
    max_entries: usize,
}

impl EventDeduplicator {
    /// Create a deduplicator with the given signature capacity
    pub fn new(max_entries: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Check whether this event's signature has been seen in this run
    pub fn is_duplicate(&self, event: &ApplicationEvent) -> bool {
        self.seen.contains(&LogSignature::of(event))
    }

    /// Record this event's signature
    pub fn remember(&mut self, event: &ApplicationEvent) {
        let signature = LogSignature::of(event);
        if !self.seen.insert(signature.clone()) {
            return;
        }
        self.order.push_back(signature);
        while self.order.len() > self.max_entries {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
    }

    /// Display gate: critical event types always pass; everything else
    /// passes only on first sight
    pub fn should_display(&self, event: &ApplicationEvent) -> bool {
        if event_groups::DISPLAY_CRITICAL_EVENTS.contains(&event.event_type.as_str()) {
            return true;
        }
        !self.is_duplicate(event)
    }

    /// Forget everything (a new run starts with clean memory)
    pub fn clear(&mut self) {
        self.seen.clear();
        self.order.clear();
    }

    /// Number of remembered signatures
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if no signatures are remembered
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for EventDeduplicator {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, timestamp: &str, message: &str) -> ApplicationEvent {
        ApplicationEvent {
            event_type: event_type.to_string(),
            message: Some(message.to_string()),
            timestamp: Some(timestamp.to_string()),
            level: None,
            data: None,
        }
    }

    #[test]
    fn test_identical_events_share_a_signature() {
        let first = event("STEP_COMPLETE", "2026-01-10T10:00:00Z", "Step 3 done");
        let second = event("STEP_COMPLETE", "2026-01-10T10:00:00Z", "Step 3 done");
        assert_eq!(LogSignature::of(&first), LogSignature::of(&second));
    }

    #[test]
    fn test_timestamp_distinguishes_occurrences() {
        let first = event("STEP_COMPLETE", "2026-01-10T10:00:00Z", "Step 3 done");
        let second = event("STEP_COMPLETE", "2026-01-10T10:00:05Z", "Step 3 done");
        assert_ne!(LogSignature::of(&first), LogSignature::of(&second));
    }

    #[test]
    fn test_signature_uses_message_prefix_only() {
        let long_a = format!("{}{}", "a".repeat(100), "tail one");
        let long_b = format!("{}{}", "a".repeat(100), "tail two");
        let first = event("ORCHESTRATOR_LOG", "", &long_a);
        let second = event("ORCHESTRATOR_LOG", "", &long_b);
        assert_eq!(LogSignature::of(&first), LogSignature::of(&second));
    }

    #[test]
    fn test_signature_handles_multibyte_messages() {
        let message = "проверка хранилища ".repeat(20);
        let first = event("ORCHESTRATOR_LOG", "", &message);
        // prefix is taken in chars, never splitting a multibyte boundary
        let _ = LogSignature::of(&first);
    }

    #[test]
    fn test_duplicate_detection() {
        let mut dedup = EventDeduplicator::default();
        let evt = event("PRE_CHECK_RESULT", "2026-01-10T10:00:00Z", "storage ok");

        assert!(!dedup.is_duplicate(&evt));
        dedup.remember(&evt);
        assert!(dedup.is_duplicate(&evt));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_display_gate_never_hides_critical_types() {
        let mut dedup = EventDeduplicator::default();
        let evt = ApplicationEvent::with_data("OPERATION_COMPLETE", json!({"status": "SUCCESS"}));

        dedup.remember(&evt);
        assert!(dedup.is_duplicate(&evt));
        assert!(dedup.should_display(&evt));
    }

    #[test]
    fn test_display_gate_filters_repeated_noise() {
        let mut dedup = EventDeduplicator::default();
        let evt = event("DEVICE_PROGRESS", "2026-01-10T10:00:00Z", "45%");

        assert!(dedup.should_display(&evt));
        dedup.remember(&evt);
        assert!(!dedup.should_display(&evt));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut dedup = EventDeduplicator::default();
        let evt = event("STEP_COMPLETE", "t1", "done");
        dedup.remember(&evt);
        dedup.clear();
        assert!(dedup.is_empty());
        assert!(!dedup.is_duplicate(&evt));
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let mut dedup = EventDeduplicator::new(2);
        let first = event("ORCHESTRATOR_LOG", "t1", "one");
        let second = event("ORCHESTRATOR_LOG", "t2", "two");
        let third = event("ORCHESTRATOR_LOG", "t3", "three");

        dedup.remember(&first);
        dedup.remember(&second);
        dedup.remember(&third);

        assert!(!dedup.is_duplicate(&first));
        assert!(dedup.is_duplicate(&second));
        assert!(dedup.is_duplicate(&third));
    }

    #[test]
    fn test_remember_is_idempotent() {
        let mut dedup = EventDeduplicator::new(2);
        let evt = event("STEP_COMPLETE", "t1", "done");
        dedup.remember(&evt);
        dedup.remember(&evt);
        assert_eq!(dedup.len(), 1);
    }
}
