//! # Channel Subscription Management
//!
//! The pub/sub transport is an external collaborator that owns the socket;
//! this module only emits subscribe/unsubscribe intents toward it and keeps
//! track of which per-job channel the workflow currently cares about.
//!
//! Restart rule: a new job always unsubscribes the previous channel before
//! subscribing its own, so a freshly reused workflow never receives a stale
//! job's events. Inbound envelopes are matched against the active channel
//! with the hub's `ws_channel:` prefix applied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::constants::channels;

/// Intent direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntentKind {
    Subscribe,
    Unsubscribe,
}

/// One subscribe/unsubscribe request toward the transport.
///
/// Wire shape: `{"type": "SUBSCRIBE", "channel": "job:<uuid>"}`. The
/// channel is the bare form; the hub stores it with the `ws_channel:`
/// prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionIntent {
    #[serde(rename = "type")]
    pub kind: IntentKind,
    pub channel: String,
}

impl SubscriptionIntent {
    /// Create a subscribe intent for a bare channel
    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self {
            kind: IntentKind::Subscribe,
            channel: channel.into(),
        }
    }

    /// Create an unsubscribe intent for a bare channel
    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self {
            kind: IntentKind::Unsubscribe,
            channel: channel.into(),
        }
    }
}

/// Where subscription intents go.
///
/// The transport collaborator implements this; sends must not block message
/// processing, so the contract is fire-and-forget.
pub trait IntentSink: Send + Sync + fmt::Debug {
    fn send_intent(&self, intent: SubscriptionIntent);
}

/// The natural production sink: the transport task's inbound command queue.
/// A closed receiver means the transport is gone and there is nobody left to
/// tell, so the intent is dropped.
impl IntentSink for tokio::sync::mpsc::UnboundedSender<SubscriptionIntent> {
    fn send_intent(&self, intent: SubscriptionIntent) {
        let _ = self.send(intent);
    }
}

/// Tracks the active per-job channel and emits intents on changes
#[derive(Debug, Clone)]
pub struct SubscriptionManager {
    sink: Arc<dyn IntentSink>,
    active_channel: Option<String>,
}

impl SubscriptionManager {
    pub fn new(sink: Arc<dyn IntentSink>) -> Self {
        Self {
            sink,
            active_channel: None,
        }
    }

    /// Bare channel name for a job id
    pub fn job_channel(job_id: &str) -> String {
        format!("{}{}", channels::JOB_CHANNEL_PREFIX, job_id)
    }

    /// Subscribe to a bare channel, unsubscribing any previous one first.
    /// Subscribing to the already-active channel is a no-op.
    pub fn subscribe(&mut self, channel: impl Into<String>) {
        let channel = channel.into();
        if self.active_channel.as_deref() == Some(channel.as_str()) {
            debug!(channel = %channel, "already subscribed");
            return;
        }
        self.unsubscribe_active();
        debug!(channel = %channel, "subscribing to job channel");
        self.sink.send_intent(SubscriptionIntent::subscribe(channel.clone()));
        self.active_channel = Some(channel);
    }

    /// Unsubscribe from a bare channel. A channel that is not active is
    /// already unsubscribed, so this is a no-op for it.
    pub fn unsubscribe(&mut self, channel: &str) {
        if self.active_channel.as_deref() != Some(channel) {
            return;
        }
        self.unsubscribe_active();
    }

    /// Unsubscribe from whatever channel is active, if any
    pub fn unsubscribe_active(&mut self) {
        if let Some(previous) = self.active_channel.take() {
            debug!(channel = %previous, "unsubscribing from job channel");
            self.sink
                .send_intent(SubscriptionIntent::unsubscribe(previous));
        }
    }

    /// The bare channel the workflow is currently subscribed to
    pub fn active_channel(&self) -> Option<&str> {
        self.active_channel.as_deref()
    }

    /// Check whether an envelope's channel tag belongs to the active job.
    ///
    /// Envelopes carry the prefixed form; the bare form is accepted too. An
    /// envelope without a channel tag matches by default; only an explicit
    /// mismatch marks a stale message.
    pub fn matches_active(&self, envelope_channel: Option<&str>) -> bool {
        let Some(tag) = envelope_channel else {
            return true;
        };
        let Some(active) = self.active_channel.as_deref() else {
            return false;
        };
        let bare = tag.strip_prefix(channels::WS_CHANNEL_PREFIX).unwrap_or(tag);
        bare == active
    }
}
