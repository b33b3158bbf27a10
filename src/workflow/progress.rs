//! Progress tracking for one workflow run.
//!
//! Step completions are applied exactly once per step index no matter how
//! often the transport redelivers them. The percentage is clamped below 100
//! until a terminal event lands; only the terminal path may claim "done."

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::ProgressConfig;

/// Externally observable progress of the active run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProgressState {
    pub completed_steps: u32,
    pub total_steps: u32,
    pub percentage: u8,
}

/// Applies step-completion events exactly once per step index.
#[derive(Debug)]
pub struct ProgressTracker {
    completed_steps: u32,
    total_steps: u32,
    percentage: u8,
    seen_steps: HashSet<u32>,
    config: ProgressConfig,
}

impl ProgressTracker {
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            completed_steps: 0,
            total_steps: 0,
            percentage: 0,
            seen_steps: HashSet::new(),
            config,
        }
    }

    /// An operation announced itself: record the expected step count and
    /// seed the percentage so the consumer sees movement immediately.
    pub fn on_operation_start(&mut self, total_steps: u32) {
        self.total_steps = total_steps;
        self.percentage = self.percentage.max(self.config.seed_percent);
    }

    /// A numbered step finished. Repeated deliveries of the same index are
    /// no-ops.
    pub fn on_step_complete(&mut self, step_index: u32) {
        if !self.seen_steps.insert(step_index) {
            return;
        }
        self.completed_steps += 1;

        let ceiling = self.config.ceiling_percent;
        if self.total_steps > 0 {
            let computed = (f64::from(self.completed_steps) / f64::from(self.total_steps)
                * 100.0)
                .round() as u8;
            self.percentage = computed.min(ceiling);
        } else {
            // Total unknown: coarse forward motion, still capped below done.
            self.percentage = self
                .percentage
                .saturating_add(self.config.fallback_increment)
                .min(ceiling);
        }
    }

    /// A producer reported a coarse percentage directly. Applied only when
    /// it moves progress forward, and still capped below done.
    pub fn on_progress_hint(&mut self, percentage: u8) {
        let capped = percentage.min(self.config.ceiling_percent);
        self.percentage = self.percentage.max(capped);
    }

    /// A terminal event landed: progress is done regardless of how many
    /// step completions were observed.
    pub fn force_complete(&mut self) {
        self.percentage = 100;
        if self.total_steps > 0 {
            self.completed_steps = self.total_steps;
        }
    }

    /// Current progress values
    pub fn snapshot(&self) -> ProgressState {
        ProgressState {
            completed_steps: self.completed_steps,
            total_steps: self.total_steps,
            percentage: self.percentage,
        }
    }

    /// Clear everything for a new run
    pub fn reset(&mut self) {
        self.completed_steps = 0;
        self.total_steps = 0;
        self.percentage = 0;
        self.seen_steps.clear();
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(ProgressConfig::default())
    }
}
