//! Timer entities and input validation

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TimerError};

/// Stable identifier assigned to a timer at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(Uuid);

impl TimerId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for TimerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Whether the countdown engine should be ticking a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerStatus {
    Paused,
    Running,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerStatus::Paused => write!(f, "Paused"),
            TimerStatus::Running => write!(f, "Running"),
        }
    }
}

/// An active countdown timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub id: TimerId,
    pub name: String,
    pub category: String,
    /// Configured length in seconds
    pub duration: u64,
    /// Seconds left, always within `0..=duration`
    pub remaining: u64,
    pub status: TimerStatus,
}

impl Timer {
    /// Create a paused timer with a full countdown
    pub fn new(name: String, duration: u64, category: String) -> Self {
        Self {
            id: TimerId::new(),
            name,
            category,
            duration,
            remaining: duration,
            status: TimerStatus::Paused,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Set `remaining`, clamped to the configured duration
    pub fn set_remaining(&mut self, remaining: u64) {
        self.remaining = remaining.min(self.duration);
    }
}

/// A timer that has been moved out of the active collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTimer {
    #[serde(flatten)]
    pub timer: Timer,
    /// Unknown for entries migrated from the legacy layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompletedTimer {
    /// Freeze a timer into its completed form with nothing remaining
    pub fn from_timer(mut timer: Timer) -> Self {
        timer.remaining = 0;
        Self {
            timer,
            completed_at: Some(Utc::now()),
        }
    }
}

/// Raw "add timer" input as typed by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerDraft {
    pub name: String,
    pub duration: String,
    pub category: String,
}

impl TimerDraft {
    pub fn new(
        name: impl Into<String>,
        duration: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            duration: duration.into(),
            category: category.into(),
        }
    }

    /// Check every field and build a paused timer from the draft
    pub fn validate(&self) -> Result<Timer> {
        let name = self.name.trim();
        let duration = self.duration.trim();
        let category = self.category.trim();

        if name.is_empty() || duration.is_empty() || category.is_empty() {
            return Err(TimerError::Validation(
                "Please fill in all fields".to_string(),
            ));
        }

        let seconds: u64 = duration.parse().map_err(|_| {
            TimerError::Validation(format!(
                "Duration must be a whole number of seconds, got '{}'",
                duration
            ))
        })?;
        if seconds == 0 {
            return Err(TimerError::Validation(
                "Duration must be greater than zero".to_string(),
            ));
        }

        Ok(Timer::new(name.to_string(), seconds, category.to_string()))
    }
}
