//! # Workflow State Components
//!
//! The pieces that turn a deduplicated event stream into workflow state:
//! phase and status definitions, the transition table, per-step progress
//! tracking, pre-check summary extraction, and the cancellable scheduler
//! behind delayed phase changes.
//!
//! All mutable state here is owned by the orchestrator; these components
//! hold no cross-run memory of their own.

pub mod progress;
pub mod scheduler;
pub mod state_machine;
pub mod states;
pub mod summary;

// Re-export key types for convenience
pub use progress::{ProgressState, ProgressTracker};
pub use scheduler::{TimerHandle, TokioScheduler, TransitionCallback, TransitionScheduler};
pub use state_machine::{PhaseStateMachine, PhaseTrigger};
pub use states::{JobStatus, WorkflowPhase};
