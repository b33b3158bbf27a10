mod common;

use std::collections::HashSet;

use common::strategies::*;
use proptest::prelude::*;

use upgrade_workflow::constants::event_groups;
use upgrade_workflow::events::{ApplicationEvent, EventDeduplicator, LogSignature};
use upgrade_workflow::system;
use upgrade_workflow::test_helpers::wrap_in_envelope;
use upgrade_workflow::unwrap_message;
use upgrade_workflow::workflow::progress::ProgressTracker;
use upgrade_workflow::workflow::state_machine::{PhaseStateMachine, PhaseTrigger};
use upgrade_workflow::workflow::states::WorkflowPhase;

proptest! {
    /// Property: no transport frame can panic the unwrapper
    #[test]
    fn arbitrary_frames_never_panic(raw in any::<String>()) {
        let _ = unwrap_message(&raw);
    }

    /// Property: enveloped events come back with channel, type, and message intact
    #[test]
    fn enveloped_events_survive_unwrapping(
        job_id in job_id_strategy(),
        event in event_value_strategy(),
    ) {
        let raw = wrap_in_envelope(&job_id, &event);
        let unwrapped = unwrap_message(&raw);
        prop_assert!(unwrapped.is_some());
        let unwrapped = unwrapped.unwrap();

        let expected_channel = format!("ws_channel:job:{job_id}");
        prop_assert_eq!(unwrapped.channel.as_deref(), Some(expected_channel.as_str()));
        prop_assert_eq!(
            unwrapped.event.event_type.as_str(),
            event["event_type"].as_str().unwrap()
        );
        prop_assert_eq!(unwrapped.event.message.as_deref(), event["message"].as_str());
    }

    /// Property: frames that already are events carry no channel tag
    #[test]
    fn bare_event_frames_have_no_channel(event in event_value_strategy()) {
        let unwrapped = unwrap_message(&event.to_string());
        prop_assert!(unwrapped.is_some());
        prop_assert_eq!(unwrapped.unwrap().channel, None);
    }

    /// Property: first sight always passes the display gate; afterwards only
    /// the critical allow-list does
    #[test]
    fn display_gate_tracks_the_critical_list(event in event_value_strategy()) {
        let parsed: ApplicationEvent = serde_json::from_value(event).unwrap();
        let mut dedup = EventDeduplicator::new(64);

        prop_assert!(!dedup.is_duplicate(&parsed));
        prop_assert!(dedup.should_display(&parsed));

        dedup.remember(&parsed);
        dedup.remember(&parsed);
        prop_assert_eq!(dedup.len(), 1);
        prop_assert!(dedup.is_duplicate(&parsed));

        let critical = event_groups::DISPLAY_CRITICAL_EVENTS.contains(&parsed.event_type.as_str());
        prop_assert_eq!(dedup.should_display(&parsed), critical);
    }

    /// Property: signatures ignore message content beyond the hashed prefix
    #[test]
    fn signatures_ignore_the_message_tail(
        tail_a in "[ -~]{0,60}",
        tail_b in "[ -~]{0,60}",
    ) {
        let prefix = "x".repeat(system::SIGNATURE_MESSAGE_PREFIX_LEN);
        let event_with = |tail: &str| ApplicationEvent {
            event_type: "STEP_START".to_string(),
            message: Some(format!("{prefix}{tail}")),
            timestamp: Some("2025-03-14T10:00:00Z".to_string()),
            level: None,
            data: None,
        };
        prop_assert_eq!(
            LogSignature::of(&event_with(&tail_a)),
            LogSignature::of(&event_with(&tail_b))
        );
    }

    /// Property: the percentage always equals the distinct-step ratio under
    /// the ceiling, and only a terminal event reaches 100
    #[test]
    fn step_progress_follows_the_distinct_count((total, steps) in step_run_strategy()) {
        let mut tracker = ProgressTracker::default();
        tracker.on_operation_start(total);

        let mut distinct = HashSet::new();
        for step in steps {
            tracker.on_step_complete(step);
            distinct.insert(step);

            let snapshot = tracker.snapshot();
            prop_assert_eq!(snapshot.completed_steps, distinct.len() as u32);

            let ratio =
                (f64::from(distinct.len() as u32) / f64::from(total) * 100.0).round() as u8;
            prop_assert_eq!(snapshot.percentage, ratio.min(99));
        }

        tracker.force_complete();
        prop_assert_eq!(tracker.snapshot().percentage, 100);
        prop_assert_eq!(tracker.snapshot().completed_steps, total);
    }

    /// Property: coarse hints only ever move progress forward, capped below done
    #[test]
    fn progress_hints_are_monotone_and_capped(
        hints in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let mut tracker = ProgressTracker::default();
        let mut expected = 0u8;
        for hint in hints {
            tracker.on_progress_hint(hint);
            expected = expected.max(hint.min(99));
            prop_assert_eq!(tracker.snapshot().percentage, expected);
        }
    }

    /// Property: a rejected trigger leaves the phase exactly where it was
    #[test]
    fn rejected_triggers_leave_the_phase_alone(triggers in trigger_sequence_strategy()) {
        let mut machine = PhaseStateMachine::new();
        for trigger in triggers {
            let before = machine.phase();
            match machine.apply(trigger) {
                Ok(next) => prop_assert_eq!(machine.phase(), next),
                Err(_) => prop_assert_eq!(machine.phase(), before),
            }
        }
    }

    /// Property: restart and reset recover the machine from any history
    #[test]
    fn restart_and_reset_are_universal(triggers in trigger_sequence_strategy()) {
        let mut machine = PhaseStateMachine::new();
        for trigger in triggers {
            let _ = machine.apply(trigger);
        }
        prop_assert!(machine.apply(PhaseTrigger::StartPreCheck).is_ok());
        prop_assert_eq!(machine.phase(), WorkflowPhase::PreCheck);
        prop_assert!(machine.apply(PhaseTrigger::Reset).is_ok());
        prop_assert_eq!(machine.phase(), WorkflowPhase::Configure);
    }
}

/// The signature prefix boundary itself, pinned deterministically.
#[cfg(test)]
mod signature_prefix_invariants {
    use upgrade_workflow::events::{ApplicationEvent, LogSignature};
    use upgrade_workflow::system;

    fn step_event(message: &str) -> ApplicationEvent {
        ApplicationEvent {
            event_type: "STEP_START".to_string(),
            message: Some(message.to_string()),
            timestamp: Some("2025-03-14T10:00:00Z".to_string()),
            level: None,
            data: None,
        }
    }

    #[test]
    fn test_divergence_inside_the_prefix_changes_the_signature() {
        let len = system::SIGNATURE_MESSAGE_PREFIX_LEN;
        let base = "x".repeat(len);
        let mut diverged = "x".repeat(len - 1);
        diverged.push('y');
        assert_ne!(
            LogSignature::of(&step_event(&base)),
            LogSignature::of(&step_event(&diverged))
        );
    }

    #[test]
    fn test_divergence_past_the_prefix_is_invisible() {
        let base = "x".repeat(system::SIGNATURE_MESSAGE_PREFIX_LEN);
        let longer = format!("{base}z");
        assert_eq!(
            LogSignature::of(&step_event(&base)),
            LogSignature::of(&step_event(&longer))
        );
    }
}
