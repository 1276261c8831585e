//! Active and completed timer collections and every transition between them

use tracing::{debug, info};

use crate::error::Result;
use super::{CompletedTimer, RegistrySnapshot, Timer, TimerDraft, TimerId, TimerStatus};

/// Result of applying one countdown tick to a timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No active timer has this id any more
    Missing,
    /// The timer exists but is not running
    NotRunning,
    /// One second was taken off; the new remaining value
    Counted(u64),
    /// The countdown reached zero and the timer moved to the completed list
    Expired(CompletedTimer),
}

/// Result of a complete intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// No active timer has this id, e.g. it was already completed
    Missing,
    /// The timer still has time left and stays active
    Unfinished(Timer),
    /// The timer moved to the completed list
    Completed(CompletedTimer),
}

/// Sole owner of both timer collections
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: Vec<Timer>,
    completed: Vec<CompletedTimer>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the registry from a persisted snapshot
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        Self {
            timers: snapshot.timers,
            completed: snapshot.completed_timers,
        }
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            timers: self.timers.clone(),
            completed_timers: self.completed.clone(),
        }
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn completed(&self) -> &[CompletedTimer] {
        &self.completed
    }

    pub fn get(&self, id: TimerId) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TimerId) -> Option<&mut Timer> {
        self.timers.iter_mut().find(|t| t.id == id)
    }

    /// Ids of timers whose countdown should be ticking
    pub fn running_ids(&self) -> Vec<TimerId> {
        self.timers
            .iter()
            .filter(|t| t.is_running())
            .map(|t| t.id)
            .collect()
    }

    /// Validate a draft and append it as a paused timer
    pub fn add(&mut self, draft: &TimerDraft) -> Result<Timer> {
        let timer = draft.validate()?;
        info!("Adding timer '{}' ({}s, {}) as {}", timer.name, timer.duration, timer.category, timer.id);
        self.timers.push(timer.clone());
        Ok(timer)
    }

    /// Change a timer's status and optionally its remaining seconds
    ///
    /// Returns `None` without touching anything when the id is unknown.
    pub fn set_status(
        &mut self,
        id: TimerId,
        status: TimerStatus,
        remaining: Option<u64>,
    ) -> Option<Timer> {
        let timer = self.get_mut(id)?;
        timer.status = status;
        if let Some(remaining) = remaining {
            timer.set_remaining(remaining);
        }
        info!("Timer '{}' ({}) is now {} with {}s remaining", timer.name, id, status, timer.remaining);
        Some(timer.clone())
    }

    /// Pause a timer and refill its countdown
    pub fn reset(&mut self, id: TimerId) -> Option<Timer> {
        let duration = self.get(id)?.duration;
        self.set_status(id, TimerStatus::Paused, Some(duration))
    }

    /// Move a finished timer from the active to the completed collection
    ///
    /// Only a timer whose countdown has reached zero can be completed.
    /// Completing an id that is no longer active has no further effect.
    pub fn complete(&mut self, id: TimerId) -> CompleteOutcome {
        let Some(index) = self.timers.iter().position(|t| t.id == id) else {
            return CompleteOutcome::Missing;
        };
        if self.timers[index].remaining > 0 {
            let timer = self.timers[index].clone();
            debug!("Timer '{}' ({}) still has {}s left, not completing", timer.name, id, timer.remaining);
            return CompleteOutcome::Unfinished(timer);
        }

        let timer = self.timers.remove(index);
        let done = CompletedTimer::from_timer(timer);
        info!("Timer '{}' ({}) completed", done.timer.name, id);
        self.completed.push(done.clone());
        CompleteOutcome::Completed(done)
    }

    /// Take one second off a running timer, completing it at zero
    pub fn tick(&mut self, id: TimerId) -> TickOutcome {
        let Some(timer) = self.get_mut(id) else {
            return TickOutcome::Missing;
        };
        if !timer.is_running() {
            return TickOutcome::NotRunning;
        }

        if timer.remaining <= 1 {
            timer.remaining = 0;
            debug!("Timer '{}' ({}) reached zero", timer.name, id);
            return match self.complete(id) {
                CompleteOutcome::Completed(done) => TickOutcome::Expired(done),
                CompleteOutcome::Missing | CompleteOutcome::Unfinished(_) => TickOutcome::Missing,
            };
        }

        timer.remaining -= 1;
        TickOutcome::Counted(timer.remaining)
    }
}
