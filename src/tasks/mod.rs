//! Background tasks module
//!
//! This module contains the countdown engine and the service task that owns
//! the timer collections.

pub mod countdown;
pub mod timer_service;

// Re-export main types
pub use countdown::{CountdownEngine, Tick, DEFAULT_TICK_MS};
pub use timer_service::{spawn_timer_service, TimerHandle};
