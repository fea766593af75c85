//! In-memory live state: the most recent reading per sensor.
//!
//! The live feeds snapshot this map instead of querying the database on
//! every tick. Entries only move forward in time; a stale or replayed
//! reading never overwrites a newer one.

use std::collections::HashMap;

use linewatch_core::reading::{OperatingBounds, SensorReading, Status};
use linewatch_core::types::DbId;
use tokio::sync::RwLock;

/// Live view of one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorLive {
    pub reading: SensorReading,
    pub status: Status,
    pub bounds: Option<OperatingBounds>,
}

/// Shared map of the latest evaluated reading per sensor.
#[derive(Default)]
pub struct LiveState {
    inner: RwLock<HashMap<DbId, SensorLive>>,
}

impl LiveState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an evaluated reading. The entry is replaced only when the
    /// incoming timestamp is at least as new as the stored one.
    pub async fn apply(&self, live: SensorLive) {
        let mut map = self.inner.write().await;
        let sensor_id = live.reading.sensor_id;
        match map.get(&sensor_id) {
            Some(existing) if existing.reading.recorded_at > live.reading.recorded_at => {}
            _ => {
                map.insert(sensor_id, live);
            }
        }
    }

    /// Current live view for one sensor.
    pub async fn get(&self, sensor_id: DbId) -> Option<SensorLive> {
        self.inner.read().await.get(&sensor_id).cloned()
    }

    /// Snapshot of all sensors with live data.
    pub async fn snapshot(&self) -> Vec<SensorLive> {
        let map = self.inner.read().await;
        let mut all: Vec<SensorLive> = map.values().cloned().collect();
        all.sort_by_key(|l| l.reading.sensor_id);
        all
    }

    /// Seed the map at startup from persisted latest-per-sensor rows.
    /// Uses the same newest-wins rule as [`apply`](Self::apply).
    pub async fn seed(&self, entries: Vec<SensorLive>) {
        for entry in entries {
            self.apply(entry).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn live(sensor_id: DbId, value: f64, secs: i64) -> SensorLive {
        SensorLive {
            reading: SensorReading {
                sensor_id,
                value,
                recorded_at: Utc.timestamp_opt(secs, 0).unwrap(),
            },
            status: Status::Normal,
            bounds: None,
        }
    }

    #[tokio::test]
    async fn newer_reading_replaces_older() {
        let state = LiveState::new();
        state.apply(live(1, 10.0, 100)).await;
        state.apply(live(1, 20.0, 200)).await;

        let current = state.get(1).await.unwrap();
        assert_eq!(current.reading.value, 20.0);
    }

    #[tokio::test]
    async fn stale_reading_is_ignored() {
        let state = LiveState::new();
        state.apply(live(1, 20.0, 200)).await;
        state.apply(live(1, 10.0, 100)).await;

        let current = state.get(1).await.unwrap();
        assert_eq!(current.reading.value, 20.0);
    }

    #[tokio::test]
    async fn equal_timestamp_takes_latest_arrival() {
        let state = LiveState::new();
        state.apply(live(1, 10.0, 100)).await;
        state.apply(live(1, 11.0, 100)).await;

        let current = state.get(1).await.unwrap();
        assert_eq!(current.reading.value, 11.0);
    }

    #[tokio::test]
    async fn snapshot_is_ordered_by_sensor_id() {
        let state = LiveState::new();
        state.apply(live(3, 3.0, 100)).await;
        state.apply(live(1, 1.0, 100)).await;
        state.apply(live(2, 2.0, 100)).await;

        let all = state.snapshot().await;
        let ids: Vec<DbId> = all.iter().map(|l| l.reading.sensor_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn seed_does_not_clobber_newer_live_data() {
        let state = LiveState::new();
        state.apply(live(1, 99.0, 500)).await;
        state.seed(vec![live(1, 10.0, 100), live(2, 20.0, 100)]).await;

        assert_eq!(state.get(1).await.unwrap().reading.value, 99.0);
        assert_eq!(state.get(2).await.unwrap().reading.value, 20.0);
    }
}
