//! Countdown Keeper - named, categorized countdown timers
//!
//! This library provides a timer registry with a per-timer countdown engine,
//! snapshot persistence to a key-value store, and an HTTP intent surface.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{StoreError, TimerError};
pub use services::{FileStore, KeyValueStore, MemoryStore};
pub use state::{AppState, CompleteOutcome, CompletedTimer, RegistrySnapshot, Timer, TimerDraft, TimerId, TimerStatus};
pub use tasks::{spawn_timer_service, TimerHandle};
pub use utils::signals::shutdown_signal;
