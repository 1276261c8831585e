//! Timer service task and the handle used to drive it
//!
//! A single coordinator task owns the registry, the countdown engine and the
//! store. Intents from [`TimerHandle`] and ticks from the engine arrive as
//! messages and are applied one at a time, so every mutation is followed by
//! exactly one snapshot write and one published update.

use std::{ops::ControlFlow, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::{Result, TimerError},
    services::KeyValueStore,
    state::{
        snapshot, CompleteOutcome, RegistrySnapshot, TickOutcome, Timer, TimerDraft, TimerId,
        TimerRegistry, TimerStatus,
    },
};
use super::countdown::{CountdownEngine, Tick};

const COMMAND_BUFFER: usize = 64;

enum Command {
    Add {
        draft: TimerDraft,
        reply: oneshot::Sender<Result<Timer>>,
    },
    SetStatus {
        id: TimerId,
        status: TimerStatus,
        remaining: Option<u64>,
        reply: oneshot::Sender<Option<Timer>>,
    },
    Reset {
        id: TimerId,
        reply: oneshot::Sender<Option<Timer>>,
    },
    Complete {
        id: TimerId,
        reply: oneshot::Sender<CompleteOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<RegistrySnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable client of the timer service; the only way to mutate timers
#[derive(Debug, Clone)]
pub struct TimerHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<RegistrySnapshot>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Add { .. } => "Add",
            Command::SetStatus { .. } => "SetStatus",
            Command::Reset { .. } => "Reset",
            Command::Complete { .. } => "Complete",
            Command::Snapshot { .. } => "Snapshot",
            Command::Shutdown { .. } => "Shutdown",
        };
        f.write_str(name)
    }
}

impl TimerHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| TimerError::ServiceClosed)?;
        response.await.map_err(|_| TimerError::ServiceClosed)
    }

    /// Validate and append a new paused timer
    pub async fn add(&self, draft: TimerDraft) -> Result<Timer> {
        self.request(|reply| Command::Add { draft, reply }).await?
    }

    /// Change a timer's status, optionally overriding its remaining seconds
    ///
    /// `Ok(None)` means no active timer has this id.
    pub async fn set_status(
        &self,
        id: TimerId,
        status: TimerStatus,
        remaining: Option<u64>,
    ) -> Result<Option<Timer>> {
        self.request(|reply| Command::SetStatus { id, status, remaining, reply })
            .await
    }

    pub async fn start(&self, id: TimerId) -> Result<Option<Timer>> {
        self.set_status(id, TimerStatus::Running, None).await
    }

    pub async fn pause(&self, id: TimerId) -> Result<Option<Timer>> {
        self.set_status(id, TimerStatus::Paused, None).await
    }

    /// Pause a timer and refill it to its full duration
    pub async fn reset(&self, id: TimerId) -> Result<Option<Timer>> {
        self.request(|reply| Command::Reset { id, reply }).await
    }

    /// Move a timer whose countdown reached zero into the completed list
    ///
    /// A timer with time left answers [`CompleteOutcome::Unfinished`] and
    /// stays active.
    pub async fn complete(&self, id: TimerId) -> Result<CompleteOutcome> {
        self.request(|reply| Command::Complete { id, reply }).await
    }

    /// Current collections, ordered after every intent sent before this call
    pub async fn snapshot(&self) -> Result<RegistrySnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Most recently published collections, without a round trip
    pub fn latest(&self) -> RegistrySnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified after every mutation
    pub fn subscribe(&self) -> watch::Receiver<RegistrySnapshot> {
        self.snapshots.clone()
    }

    /// Cancel all countdowns and stop the service task
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

struct Coordinator {
    registry: TimerRegistry,
    engine: CountdownEngine,
    store: Arc<dyn KeyValueStore>,
    commands: mpsc::Receiver<Command>,
    ticks: mpsc::UnboundedReceiver<Tick>,
    snapshots: watch::Sender<RegistrySnapshot>,
}

/// Spawn the timer service on the current runtime
///
/// The saved snapshot is loaded before the first intent is applied; intents
/// sent meanwhile wait in the queue.
pub fn spawn_timer_service(
    store: Arc<dyn KeyValueStore>,
    tick_period: Duration,
) -> (TimerHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (tick_tx, tick_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(RegistrySnapshot::default());

    let coordinator = Coordinator {
        registry: TimerRegistry::new(),
        engine: CountdownEngine::new(tick_period, tick_tx),
        store,
        commands: command_rx,
        ticks: tick_rx,
        snapshots: snapshot_tx,
    };
    let task = tokio::spawn(coordinator.run());

    let handle = TimerHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
    };
    (handle, task)
}

impl Coordinator {
    async fn run(mut self) {
        info!("Starting timer service");
        self.load().await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).await.is_break() {
                            break;
                        }
                    }
                    None => {
                        info!("All timer handles dropped");
                        break;
                    }
                },
                Some(tick) = self.ticks.recv() => self.handle_tick(tick).await,
            }
        }

        self.engine.teardown();
        info!("Timer service stopped");
    }

    async fn load(&mut self) {
        match snapshot::load(&*self.store).await {
            Ok(Some(saved)) => {
                info!(
                    "Loaded {} active and {} completed timers",
                    saved.timers.len(),
                    saved.completed_timers.len()
                );
                self.registry = TimerRegistry::from_snapshot(saved);
            }
            Ok(None) => info!("No saved timers found, starting empty"),
            Err(e) => warn!("Failed to load timers, starting empty: {}", e),
        }

        for id in self.registry.running_ids() {
            self.engine.start(id);
        }
        self.publish();
    }

    /// Apply one intent; `Break` once the service has been asked to stop
    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        debug!("Applying {:?}", command);
        match command {
            Command::Add { draft, reply } => {
                let result = self.registry.add(&draft);
                if result.is_ok() {
                    self.commit().await;
                }
                let _ = reply.send(result);
            }
            Command::SetStatus { id, status, remaining, reply } => {
                let updated = self.registry.set_status(id, status, remaining);
                if let Some(timer) = &updated {
                    match timer.status {
                        TimerStatus::Running => self.engine.start(id),
                        TimerStatus::Paused => self.engine.stop(id),
                    }
                    self.commit().await;
                } else {
                    debug!("Ignoring status change for unknown timer {}", id);
                }
                let _ = reply.send(updated);
            }
            Command::Reset { id, reply } => {
                let updated = self.registry.reset(id);
                if updated.is_some() {
                    self.engine.stop(id);
                    self.commit().await;
                }
                let _ = reply.send(updated);
            }
            Command::Complete { id, reply } => {
                let outcome = self.registry.complete(id);
                match &outcome {
                    CompleteOutcome::Completed(_) => {
                        self.engine.stop(id);
                        self.commit().await;
                    }
                    CompleteOutcome::Unfinished(timer) => {
                        info!("Refusing to complete timer {} with {}s left", id, timer.remaining);
                    }
                    CompleteOutcome::Missing => {
                        debug!("Timer {} is not active, nothing to complete", id);
                    }
                }
                let _ = reply.send(outcome);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.registry.snapshot());
            }
            Command::Shutdown { reply } => {
                info!("Timer service shutdown requested");
                self.engine.teardown();
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn handle_tick(&mut self, tick: Tick) {
        if !self.engine.is_current(&tick) {
            debug!("Dropping stale tick for timer {}", tick.id);
            return;
        }

        match self.registry.tick(tick.id) {
            TickOutcome::Counted(remaining) => {
                debug!("Timer {} has {}s remaining", tick.id, remaining);
                self.commit().await;
            }
            TickOutcome::Expired(done) => {
                self.engine.stop(tick.id);
                info!("Timer '{}' ({}) finished counting down", done.timer.name, tick.id);
                self.commit().await;
            }
            TickOutcome::Missing | TickOutcome::NotRunning => {
                self.engine.stop(tick.id);
            }
        }
    }

    /// Persist and publish the current collections
    async fn commit(&mut self) {
        let current = self.registry.snapshot();
        if let Err(e) = snapshot::save(&*self.store, &current).await {
            error!("Failed to save timers: {}", e);
        }
        self.snapshots.send_replace(current);
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.registry.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    fn service() -> (TimerHandle, MemoryStore) {
        let store = MemoryStore::new();
        let (handle, _task) = spawn_timer_service(Arc::new(store.clone()), Duration::from_secs(1));
        (handle, store)
    }

    #[tokio::test(start_paused = true)]
    async fn every_mutation_is_persisted() {
        let (timers, store) = service();
        let tea = timers.add(TimerDraft::new("Tea", "5", "Kitchen")).await.unwrap();

        let saved = snapshot::decode(&store.value(snapshot::SNAPSHOT_KEY).unwrap()).unwrap();
        assert_eq!(saved.timers, vec![tea.clone()]);

        timers.start(tea.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        let saved = snapshot::decode(&store.value(snapshot::SNAPSHOT_KEY).unwrap()).unwrap();
        assert_eq!(saved.timers[0].remaining, 4);
        assert_eq!(saved.timers[0].status, TimerStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_each_update() {
        let (timers, _store) = service();
        let mut updates = timers.subscribe();
        updates.borrow_and_update();

        let tea = timers.add(TimerDraft::new("Tea", "5", "Kitchen")).await.unwrap();
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().timers, vec![tea]);
        assert_eq!(timers.latest().timers.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failure_writes_nothing() {
        let (timers, store) = service();
        let err = timers.add(TimerDraft::new("Tea", "", "Kitchen")).await.unwrap_err();
        assert!(matches!(err, TimerError::Validation(_)));
        assert!(store.value(snapshot::SNAPSHOT_KEY).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn handle_reports_closed_service_after_shutdown() {
        let (timers, _store) = service();
        timers.shutdown().await.unwrap();
        assert!(matches!(timers.snapshot().await, Err(TimerError::ServiceClosed)));
    }
}
