use std::{sync::Arc, time::Duration};

use countdown_keeper::{
    error::StoreError,
    services::{FileStore, KeyValueStore, MemoryStore},
    state::snapshot::{LEGACY_COMPLETED_KEY, LEGACY_TIMERS_KEY, SNAPSHOT_KEY},
    state::snapshot, spawn_timer_service, CompleteOutcome, TimerDraft, TimerError, TimerHandle,
    TimerId, TimerStatus,
};
use futures::future::{BoxFuture, FutureExt};
use tokio::time::sleep;

const TICK: Duration = Duration::from_secs(1);

fn service_on(store: &MemoryStore) -> TimerHandle {
    let (handle, _task) = spawn_timer_service(Arc::new(store.clone()), TICK);
    handle
}

async fn remaining(timers: &TimerHandle, id: TimerId) -> u64 {
    timers.snapshot().await.unwrap().find(id).unwrap().remaining
}

#[tokio::test(start_paused = true)]
async fn tea_counts_down_and_completes() {
    let timers = service_on(&MemoryStore::new());

    let tea = timers.add(TimerDraft::new("Tea", "5", "Kitchen")).await.unwrap();
    let snapshot = timers.snapshot().await.unwrap();
    assert_eq!(snapshot.timers.len(), 1);
    assert_eq!(snapshot.timers[0].remaining, 5);
    assert_eq!(snapshot.timers[0].status, TimerStatus::Paused);

    timers.start(tea.id).await.unwrap();
    sleep(Duration::from_millis(4_500)).await;
    assert_eq!(remaining(&timers, tea.id).await, 1);

    sleep(Duration::from_secs(1)).await;
    let snapshot = timers.snapshot().await.unwrap();
    assert!(snapshot.timers.is_empty());
    assert_eq!(snapshot.completed_timers.len(), 1);
    let done = &snapshot.completed_timers[0].timer;
    assert_eq!(done.name, "Tea");
    assert_eq!(done.duration, 5);
    assert_eq!(done.remaining, 0);
}

#[tokio::test(start_paused = true)]
async fn remaining_only_falls_while_running() {
    let timers = service_on(&MemoryStore::new());
    let id = timers.add(TimerDraft::new("Bread", "60", "Kitchen")).await.unwrap().id;

    sleep(Duration::from_secs(3)).await;
    assert_eq!(remaining(&timers, id).await, 60);

    timers.start(id).await.unwrap();
    let mut last = 60;
    for _ in 0..4 {
        sleep(Duration::from_secs(1)).await;
        let now = remaining(&timers, id).await;
        assert!(now <= last);
        last = now;
    }
    assert!(last < 60);
}

#[tokio::test(start_paused = true)]
async fn paused_timer_stays_frozen() {
    let timers = service_on(&MemoryStore::new());
    let id = timers.add(TimerDraft::new("Bread", "10", "Kitchen")).await.unwrap().id;

    timers.start(id).await.unwrap();
    sleep(Duration::from_millis(2_500)).await;
    let paused = timers.pause(id).await.unwrap().unwrap();
    assert_eq!(paused.status, TimerStatus::Paused);
    assert_eq!(paused.remaining, 8);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(remaining(&timers, id).await, 8);
}

#[tokio::test(start_paused = true)]
async fn double_start_counts_once_per_second() {
    let timers = service_on(&MemoryStore::new());
    let id = timers.add(TimerDraft::new("Bread", "10", "Kitchen")).await.unwrap().id;

    let (a, b) = tokio::join!(timers.start(id), timers.start(id));
    a.unwrap();
    b.unwrap();

    sleep(Duration::from_millis(3_500)).await;
    assert_eq!(remaining(&timers, id).await, 7);
}

#[tokio::test(start_paused = true)]
async fn resume_after_pause_continues_from_where_it_stopped() {
    let timers = service_on(&MemoryStore::new());
    let id = timers.add(TimerDraft::new("Bread", "10", "Kitchen")).await.unwrap().id;

    timers.start(id).await.unwrap();
    sleep(Duration::from_millis(2_500)).await;
    timers.pause(id).await.unwrap();
    timers.start(id).await.unwrap();
    sleep(Duration::from_millis(1_500)).await;

    assert_eq!(remaining(&timers, id).await, 7);
}

#[tokio::test(start_paused = true)]
async fn reset_stops_and_refills() {
    let timers = service_on(&MemoryStore::new());
    let id = timers.add(TimerDraft::new("Bread", "10", "Kitchen")).await.unwrap().id;

    timers.start(id).await.unwrap();
    sleep(Duration::from_millis(3_500)).await;
    let reset = timers.reset(id).await.unwrap().unwrap();
    assert_eq!(reset.remaining, 10);
    assert_eq!(reset.status, TimerStatus::Paused);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(remaining(&timers, id).await, 10);
}

#[tokio::test(start_paused = true)]
async fn remaining_override_is_applied_with_status() {
    let timers = service_on(&MemoryStore::new());
    let id = timers.add(TimerDraft::new("Bread", "10", "Kitchen")).await.unwrap().id;

    let timer = timers.set_status(id, TimerStatus::Running, Some(2)).await.unwrap().unwrap();
    assert_eq!(timer.remaining, 2);

    sleep(Duration::from_millis(2_500)).await;
    let snapshot = timers.snapshot().await.unwrap();
    assert!(snapshot.timers.is_empty());
    assert_eq!(snapshot.completed_timers.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn completing_twice_moves_once() {
    let timers = service_on(&MemoryStore::new());
    let id = timers.add(TimerDraft::new("Tea", "5", "Kitchen")).await.unwrap().id;
    timers.set_status(id, TimerStatus::Running, Some(0)).await.unwrap();

    let CompleteOutcome::Completed(done) = timers.complete(id).await.unwrap() else {
        panic!("expected the timer to complete");
    };
    assert_eq!(done.timer.remaining, 0);
    assert_eq!(timers.complete(id).await.unwrap(), CompleteOutcome::Missing);

    sleep(Duration::from_secs(3)).await;
    let snapshot = timers.snapshot().await.unwrap();
    assert!(snapshot.timers.is_empty());
    assert_eq!(snapshot.completed_timers.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn completing_a_fresh_timer_leaves_it_active() {
    let store = MemoryStore::new();
    let timers = service_on(&store);
    let tea = timers.add(TimerDraft::new("Tea", "300", "Kitchen")).await.unwrap();
    let saved = store.value(SNAPSHOT_KEY);

    let CompleteOutcome::Unfinished(timer) = timers.complete(tea.id).await.unwrap() else {
        panic!("a timer with time left must not complete");
    };
    assert_eq!(timer.remaining, 300);

    let snapshot = timers.snapshot().await.unwrap();
    assert_eq!(snapshot.timers, vec![tea]);
    assert!(snapshot.completed_timers.is_empty());
    assert_eq!(store.value(SNAPSHOT_KEY), saved);
}

#[tokio::test(start_paused = true)]
async fn unknown_ids_are_ignored() {
    let timers = service_on(&MemoryStore::new());
    timers.add(TimerDraft::new("Tea", "5", "Kitchen")).await.unwrap();
    let before = timers.snapshot().await.unwrap();

    let ghost = TimerId::new();
    assert!(timers.start(ghost).await.unwrap().is_none());
    assert!(timers.reset(ghost).await.unwrap().is_none());
    assert_eq!(timers.complete(ghost).await.unwrap(), CompleteOutcome::Missing);

    assert_eq!(timers.snapshot().await.unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn reload_reproduces_collections_in_order() {
    let store = MemoryStore::new();
    let timers = service_on(&store);

    let tea = timers.add(TimerDraft::new("Tea", "5", "Kitchen")).await.unwrap();
    let bread = timers.add(TimerDraft::new("Bread", "60", "Kitchen")).await.unwrap();
    let eggs = timers.add(TimerDraft::new("Eggs", "420", "Kitchen")).await.unwrap();
    timers.set_status(tea.id, TimerStatus::Paused, Some(0)).await.unwrap();
    timers.complete(tea.id).await.unwrap();
    timers.start(bread.id).await.unwrap();
    sleep(Duration::from_millis(2_500)).await;
    timers.pause(bread.id).await.unwrap();
    timers.set_status(eggs.id, TimerStatus::Paused, Some(100)).await.unwrap();

    let before = timers.snapshot().await.unwrap();
    timers.shutdown().await.unwrap();

    let reloaded = service_on(&store).snapshot().await.unwrap();
    assert_eq!(reloaded, before);
    let names: Vec<_> = reloaded.timers.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Bread", "Eggs"]);
    assert_eq!(reloaded.timers[0].remaining, 58);
    assert_eq!(reloaded.timers[1].remaining, 100);
}

#[tokio::test(start_paused = true)]
async fn running_timers_resume_after_reload() {
    let store = MemoryStore::new();
    let timers = service_on(&store);
    let id = timers.add(TimerDraft::new("Bread", "10", "Kitchen")).await.unwrap().id;
    timers.start(id).await.unwrap();
    sleep(Duration::from_millis(1_500)).await;
    timers.shutdown().await.unwrap();

    let timers = service_on(&store);
    assert_eq!(remaining(&timers, id).await, 9);
    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(remaining(&timers, id).await, 7);
}

#[tokio::test(start_paused = true)]
async fn legacy_two_key_data_is_migrated() {
    let store = MemoryStore::new();
    store
        .insert(
            LEGACY_TIMERS_KEY,
            r#"[{"name":"Tea","duration":5,"remaining":3,"status":"Paused","category":"Kitchen"}]"#,
        )
        .unwrap();
    store
        .insert(
            LEGACY_COMPLETED_KEY,
            r#"[{"name":"Eggs","duration":420,"remaining":0,"status":"Running","category":"Kitchen"}]"#,
        )
        .unwrap();

    let timers = service_on(&store);
    let snapshot = timers.snapshot().await.unwrap();
    assert_eq!(snapshot.timers[0].name, "Tea");
    assert_eq!(snapshot.timers[0].remaining, 3);
    assert_eq!(snapshot.completed_timers[0].timer.name, "Eggs");

    timers.start(snapshot.timers[0].id).await.unwrap();
    assert!(store.value(SNAPSHOT_KEY).is_some());
}

#[tokio::test(start_paused = true)]
async fn corrupt_data_starts_empty() {
    let store = MemoryStore::new();
    store.insert(SNAPSHOT_KEY, "[[[ not a snapshot").unwrap();

    let timers = service_on(&store);
    let snapshot = timers.snapshot().await.unwrap();
    assert!(snapshot.timers.is_empty());
    assert!(snapshot.completed_timers.is_empty());

    timers.add(TimerDraft::new("Tea", "5", "Kitchen")).await.unwrap();
    assert_eq!(timers.snapshot().await.unwrap().timers.len(), 1);
}

/// Store whose reads and writes always fail
struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        async { Err(StoreError::Unavailable("disk unplugged".to_string())) }.boxed()
    }

    fn set<'a>(&'a self, _key: &'a str, _value: String) -> BoxFuture<'a, Result<(), StoreError>> {
        async { Err(StoreError::Unavailable("disk unplugged".to_string())) }.boxed()
    }
}

#[tokio::test(start_paused = true)]
async fn store_failures_never_stop_the_timers() {
    let (timers, _task) = spawn_timer_service(Arc::new(BrokenStore), TICK);

    let id = timers.add(TimerDraft::new("Tea", "3", "Kitchen")).await.unwrap().id;
    timers.start(id).await.unwrap();
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(remaining(&timers, id).await, 2);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(timers.snapshot().await.unwrap().completed_timers.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn validation_errors_are_returned() {
    let timers = service_on(&MemoryStore::new());
    let err = timers.add(TimerDraft::new("Tea", "five", "Kitchen")).await.unwrap_err();
    assert!(matches!(err, TimerError::Validation(_)));
    assert!(timers.snapshot().await.unwrap().timers.is_empty());
}

#[tokio::test]
async fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (timers, task) = spawn_timer_service(Arc::new(FileStore::new(dir.path())), TICK);
    let tea = timers.add(TimerDraft::new("Tea", "5", "Kitchen")).await.unwrap();
    timers.add(TimerDraft::new("Eggs", "420", "Kitchen")).await.unwrap();
    timers.set_status(tea.id, TimerStatus::Paused, Some(0)).await.unwrap();
    timers.complete(tea.id).await.unwrap();
    let before = timers.snapshot().await.unwrap();
    timers.shutdown().await.unwrap();
    task.await.unwrap();

    let (timers, _task) = spawn_timer_service(Arc::new(FileStore::new(dir.path())), TICK);
    assert_eq!(timers.snapshot().await.unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn no_tick_lands_after_shutdown() {
    let store = MemoryStore::new();
    let timers = service_on(&store);
    let id = timers.add(TimerDraft::new("Bread", "60", "Kitchen")).await.unwrap().id;
    timers.start(id).await.unwrap();
    sleep(Duration::from_millis(1_500)).await;

    timers.shutdown().await.unwrap();
    let persisted = || snapshot::decode(&store.value(SNAPSHOT_KEY).unwrap()).unwrap();
    let at_shutdown = persisted();
    assert_eq!(at_shutdown.find(id).unwrap().remaining, 59);
    assert_eq!(at_shutdown.find(id).unwrap().status, TimerStatus::Running);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(persisted(), at_shutdown);
}
