//! Persisted snapshot format for the timer collections
//!
//! Both collections are written together as one versioned JSON record under
//! [`SNAPSHOT_KEY`]. Older data kept the collections under two separate keys;
//! that layout is still read when no combined record exists.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{Result, TimerError},
    services::KeyValueStore,
};
use super::{CompletedTimer, Timer, TimerId, TimerStatus};

pub const SNAPSHOT_KEY: &str = "timerSnapshot";
pub const LEGACY_TIMERS_KEY: &str = "timers";
pub const LEGACY_COMPLETED_KEY: &str = "completedTimers";
pub const SNAPSHOT_VERSION: u32 = 1;

/// Read-only view of both collections, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    pub timers: Vec<Timer>,
    pub completed_timers: Vec<CompletedTimer>,
}

impl RegistrySnapshot {
    pub fn find(&self, id: TimerId) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id == id)
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedSnapshot {
    version: u32,
    #[serde(flatten)]
    snapshot: RegistrySnapshot,
}

/// Timer entry as written by the two-key layout, before ids existed
#[derive(Deserialize)]
struct LegacyTimer {
    name: String,
    category: String,
    duration: u64,
    remaining: u64,
    status: TimerStatus,
}

impl LegacyTimer {
    fn into_timer(self) -> Timer {
        let mut timer = Timer::new(self.name, self.duration, self.category);
        timer.set_remaining(self.remaining);
        timer.status = self.status;
        timer
    }
}

/// Serialize a snapshot into the combined record
pub fn encode(snapshot: &RegistrySnapshot) -> Result<String> {
    let record = PersistedSnapshot {
        version: SNAPSHOT_VERSION,
        snapshot: snapshot.clone(),
    };
    Ok(serde_json::to_string(&record)?)
}

/// Parse a combined record
pub fn decode(raw: &str) -> Result<RegistrySnapshot> {
    let record: PersistedSnapshot = serde_json::from_str(raw)?;
    if record.version > SNAPSHOT_VERSION {
        return Err(TimerError::UnsupportedVersion(record.version));
    }
    let mut snapshot = record.snapshot;
    for timer in &mut snapshot.timers {
        let remaining = timer.remaining;
        timer.set_remaining(remaining);
    }
    Ok(snapshot)
}

/// Parse the two-key layout; either key may be absent
pub fn decode_legacy(timers: Option<&str>, completed: Option<&str>) -> Result<RegistrySnapshot> {
    let timers: Vec<LegacyTimer> = match timers {
        Some(raw) => serde_json::from_str(raw)?,
        None => Vec::new(),
    };
    let completed: Vec<LegacyTimer> = match completed {
        Some(raw) => serde_json::from_str(raw)?,
        None => Vec::new(),
    };

    Ok(RegistrySnapshot {
        timers: timers.into_iter().map(LegacyTimer::into_timer).collect(),
        completed_timers: completed
            .into_iter()
            .map(|t| CompletedTimer {
                timer: {
                    let mut timer = t.into_timer();
                    timer.remaining = 0;
                    timer
                },
                completed_at: None,
            })
            .collect(),
    })
}

/// Read the last persisted snapshot, `None` when the store holds nothing
pub async fn load(store: &dyn KeyValueStore) -> Result<Option<RegistrySnapshot>> {
    if let Some(raw) = store.get(SNAPSHOT_KEY).await.map_err(TimerError::StoreRead)? {
        debug!("Loaded combined timer snapshot ({} bytes)", raw.len());
        return decode(&raw).map(Some);
    }

    let timers = store.get(LEGACY_TIMERS_KEY).await.map_err(TimerError::StoreRead)?;
    let completed = store.get(LEGACY_COMPLETED_KEY).await.map_err(TimerError::StoreRead)?;
    if timers.is_none() && completed.is_none() {
        return Ok(None);
    }

    info!("Migrating timers from legacy two-key layout");
    decode_legacy(timers.as_deref(), completed.as_deref()).map(Some)
}

/// Write both collections in a single store operation
pub async fn save(store: &dyn KeyValueStore, snapshot: &RegistrySnapshot) -> Result<()> {
    let raw = encode(snapshot)?;
    store.set(SNAPSHOT_KEY, raw).await.map_err(TimerError::StoreWrite)
}
