//! Cancellable delayed transitions.
//!
//! Phase changes after a completion event are deliberately delayed so a
//! human watching the live log can read the final lines before the view
//! moves on. The delay is behind a trait: production uses the tokio timer,
//! tests use a manually fired scheduler and never wait on wall-clock time.
//!
//! Starting a new run or resetting the workflow must cancel a pending
//! transition; a stale timer firing after the operator moved on would yank
//! the view to a phase that no longer makes sense.

use std::fmt;
use std::time::Duration;

/// Deferred work scheduled by the workflow engine
pub type TransitionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Timer abstraction for delayed phase transitions
pub trait TransitionScheduler: Send + Sync + fmt::Debug {
    /// Run `callback` after `delay`, unless the returned handle is cancelled
    /// first.
    fn schedule(&self, delay: Duration, callback: TransitionCallback) -> TimerHandle;
}

/// Cancellation handle for one scheduled transition.
///
/// Dropping the handle does not cancel the timer; cancellation is always an
/// explicit decision.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Prevent the scheduled callback from running, if it has not run yet
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// Production scheduler backed by the tokio timer.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl TransitionScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, callback: TransitionCallback) -> TimerHandle {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        TimerHandle::new(move || task.abort())
    }
}
