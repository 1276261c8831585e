//! Countdown engine: one recurring tick task per running timer

use std::{collections::HashMap, time::Duration};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

use crate::state::TimerId;

/// Default spacing in milliseconds between two ticks of the same timer
pub const DEFAULT_TICK_MS: u64 = 1_000;

/// Message emitted by a ticker once per period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub id: TimerId,
    pub generation: u64,
}

struct Ticker {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Owns the recurring tick tasks, keyed by timer id
///
/// Ticks are delivered to the channel given at construction. Every ticker
/// gets a fresh generation so ticks still queued from a stopped ticker can
/// be told apart from live ones.
pub struct CountdownEngine {
    period: Duration,
    tick_tx: mpsc::UnboundedSender<Tick>,
    tickers: HashMap<TimerId, Ticker>,
    next_generation: u64,
}

impl CountdownEngine {
    pub fn new(period: Duration, tick_tx: mpsc::UnboundedSender<Tick>) -> Self {
        Self {
            period,
            tick_tx,
            tickers: HashMap::new(),
            next_generation: 0,
        }
    }

    pub fn is_ticking(&self, id: TimerId) -> bool {
        self.tickers.contains_key(&id)
    }

    pub fn ticking_count(&self) -> usize {
        self.tickers.len()
    }

    /// Whether `tick` came from the ticker currently registered for its timer
    pub fn is_current(&self, tick: &Tick) -> bool {
        self.tickers
            .get(&tick.id)
            .is_some_and(|ticker| ticker.generation == tick.generation)
    }

    /// Begin ticking a timer; does nothing if it already ticks
    pub fn start(&mut self, id: TimerId) {
        if self.tickers.contains_key(&id) {
            debug!("Timer {} already ticking, ignoring start", id);
            return;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let handle = tokio::spawn(tick_loop(id, generation, self.period, self.tick_tx.clone()));
        self.tickers.insert(id, Ticker { generation, handle });
        debug!("Started ticker for timer {} (generation {})", id, generation);
    }

    /// Cancel a timer's ticker; does nothing if none is registered
    pub fn stop(&mut self, id: TimerId) {
        if let Some(ticker) = self.tickers.remove(&id) {
            ticker.handle.abort();
            debug!("Stopped ticker for timer {}", id);
        }
    }

    /// Cancel every ticker
    pub fn teardown(&mut self) {
        let count = self.tickers.len();
        for (_, ticker) in self.tickers.drain() {
            ticker.handle.abort();
        }
        if count > 0 {
            debug!("Cancelled {} tickers", count);
        }
    }
}

impl Drop for CountdownEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn tick_loop(
    id: TimerId,
    generation: u64,
    period: Duration,
    tick_tx: mpsc::UnboundedSender<Tick>,
) {
    // First tick one full period after start, not immediately
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if tick_tx.send(Tick { id, generation }).is_err() {
            break;
        }
    }
}
