//! Timer state management
//!
//! This module contains the timer entities, the registry that owns them and
//! the snapshot format they are persisted in.

pub mod app_state;
pub mod registry;
pub mod snapshot;
pub mod timer;

// Re-export main types
pub use app_state::AppState;
pub use registry::{CompleteOutcome, TickOutcome, TimerRegistry};
pub use snapshot::RegistrySnapshot;
pub use timer::{CompletedTimer, Timer, TimerDraft, TimerId, TimerStatus};
