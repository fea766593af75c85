//! Sensor registry with a TTL cache over the persistence layer.
//!
//! Sensor rows and bounds change rarely; the pipeline reads them on
//! every message. [`SensorRegistry`] caches lookups for a short TTL so
//! bounds edits take effect without a restart while the hot path stays
//! off the database.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use linewatch_core::reading::OperatingBounds;
use linewatch_core::types::DbId;
use linewatch_db::models::Sensor;
use linewatch_db::repositories::SensorRepo;
use linewatch_db::DbPool;
use tokio::sync::RwLock;

/// Default time-to-live for cached registry entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry query failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Source of truth for sensor metadata. Implemented against Postgres in
/// production and against in-memory fixtures in tests.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn fetch_sensor(&self, id: DbId) -> Result<Option<Sensor>, RegistryError>;
    async fn fetch_sensor_by_name(&self, name: &str) -> Result<Option<Sensor>, RegistryError>;
    async fn fetch_bounds(&self, sensor_id: DbId) -> Result<Option<OperatingBounds>, RegistryError>;
    async fn fetch_location_name(&self, sensor_id: DbId) -> Result<Option<String>, RegistryError>;
    async fn list_active_sensors(&self, location_id: DbId) -> Result<Vec<Sensor>, RegistryError>;
}

/// Registry source backed by the `sensors` and `operating_bounds` tables.
pub struct PgRegistrySource {
    pool: DbPool,
}

impl PgRegistrySource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrySource for PgRegistrySource {
    async fn fetch_sensor(&self, id: DbId) -> Result<Option<Sensor>, RegistryError> {
        Ok(SensorRepo::get(&self.pool, id).await?)
    }

    async fn fetch_sensor_by_name(&self, name: &str) -> Result<Option<Sensor>, RegistryError> {
        Ok(SensorRepo::get_by_name(&self.pool, name).await?)
    }

    async fn fetch_bounds(
        &self,
        sensor_id: DbId,
    ) -> Result<Option<OperatingBounds>, RegistryError> {
        Ok(SensorRepo::get_bounds(&self.pool, sensor_id)
            .await?
            .map(|row| row.as_bounds()))
    }

    async fn fetch_location_name(&self, sensor_id: DbId) -> Result<Option<String>, RegistryError> {
        Ok(SensorRepo::location_name(&self.pool, sensor_id).await?)
    }

    async fn list_active_sensors(&self, location_id: DbId) -> Result<Vec<Sensor>, RegistryError> {
        Ok(SensorRepo::list_active(&self.pool, location_id).await?)
    }
}

struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn fresh(&self, ttl: Duration) -> Option<T> {
        (self.fetched_at.elapsed() < ttl).then(|| self.value.clone())
    }
}

/// Drop entries whose TTL has lapsed.
///
/// Runs under the write lock on every miss, so a stream of distinct
/// unknown ids cannot grow a map past what one TTL window admits.
fn prune_lapsed<K, V>(map: &mut HashMap<K, CacheEntry<V>>, ttl: Duration) {
    map.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
}

/// TTL-cached view over a [`RegistrySource`].
///
/// Negative results (unknown sensor, absent bounds) are cached too, so
/// a stream of unresolvable messages does not hammer the database.
pub struct SensorRegistry {
    source: Arc<dyn RegistrySource>,
    ttl: Duration,
    by_id: RwLock<HashMap<DbId, CacheEntry<Option<Sensor>>>>,
    by_name: RwLock<HashMap<String, CacheEntry<Option<Sensor>>>>,
    bounds: RwLock<HashMap<DbId, CacheEntry<Option<OperatingBounds>>>>,
    locations: RwLock<HashMap<DbId, CacheEntry<Option<String>>>>,
}

impl SensorRegistry {
    pub fn new(source: Arc<dyn RegistrySource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            by_id: RwLock::new(HashMap::new()),
            by_name: RwLock::new(HashMap::new()),
            bounds: RwLock::new(HashMap::new()),
            locations: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a sensor by id, hitting the source only on cache miss.
    pub async fn sensor(&self, id: DbId) -> Result<Option<Sensor>, RegistryError> {
        if let Some(cached) = self.by_id.read().await.get(&id).and_then(|e| e.fresh(self.ttl)) {
            return Ok(cached);
        }
        let fetched = self.source.fetch_sensor(id).await?;
        let mut map = self.by_id.write().await;
        prune_lapsed(&mut map, self.ttl);
        map.insert(
            id,
            CacheEntry {
                value: fetched.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(fetched)
    }

    /// Look up a sensor by name.
    pub async fn sensor_by_name(&self, name: &str) -> Result<Option<Sensor>, RegistryError> {
        if let Some(cached) = self
            .by_name
            .read()
            .await
            .get(name)
            .and_then(|e| e.fresh(self.ttl))
        {
            return Ok(cached);
        }
        let fetched = self.source.fetch_sensor_by_name(name).await?;
        let mut map = self.by_name.write().await;
        prune_lapsed(&mut map, self.ttl);
        map.insert(
            name.to_string(),
            CacheEntry {
                value: fetched.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(fetched)
    }

    /// Current bounds for a sensor, or `None` when none are configured.
    pub async fn bounds(&self, sensor_id: DbId) -> Result<Option<OperatingBounds>, RegistryError> {
        if let Some(cached) = self
            .bounds
            .read()
            .await
            .get(&sensor_id)
            .and_then(|e| e.fresh(self.ttl))
        {
            return Ok(cached);
        }
        let fetched = self.source.fetch_bounds(sensor_id).await?;
        let mut map = self.bounds.write().await;
        prune_lapsed(&mut map, self.ttl);
        map.insert(
            sensor_id,
            CacheEntry {
                value: fetched,
                fetched_at: Instant::now(),
            },
        );
        Ok(fetched)
    }

    /// Active sensors on one production line. Listings bypass the cache;
    /// they serve dashboards, not the per-message hot path.
    pub async fn list_active_sensors(&self, location_id: DbId) -> Result<Vec<Sensor>, RegistryError> {
        self.source.list_active_sensors(location_id).await
    }

    #[cfg(test)]
    async fn cached_by_id_count(&self) -> usize {
        self.by_id.read().await.len()
    }

    /// Name of the production line a sensor belongs to.
    pub async fn location_name(&self, sensor_id: DbId) -> Result<Option<String>, RegistryError> {
        if let Some(cached) = self
            .locations
            .read()
            .await
            .get(&sensor_id)
            .and_then(|e| e.fresh(self.ttl))
        {
            return Ok(cached);
        }
        let fetched = self.source.fetch_location_name(sensor_id).await?;
        let mut map = self.locations.write().await;
        prune_lapsed(&mut map, self.ttl);
        map.insert(
            sensor_id,
            CacheEntry {
                value: fetched.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(fetched)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RegistrySource for CountingSource {
        async fn fetch_sensor(&self, id: DbId) -> Result<Option<Sensor>, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Sensor {
                id,
                name: "extruder_temperature".to_string(),
                location_id: 1,
                active: true,
            }))
        }

        async fn fetch_sensor_by_name(
            &self,
            _name: &str,
        ) -> Result<Option<Sensor>, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn fetch_bounds(
            &self,
            _sensor_id: DbId,
        ) -> Result<Option<OperatingBounds>, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn fetch_location_name(
            &self,
            _sensor_id: DbId,
        ) -> Result<Option<String>, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some("extruder".to_string()))
        }

        async fn list_active_sensors(
            &self,
            _location_id: DbId,
        ) -> Result<Vec<Sensor>, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn repeated_lookups_within_ttl_hit_cache() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let registry = SensorRegistry::new(source.clone(), Duration::from_secs(30));

        for _ in 0..5 {
            let sensor = registry.sensor(1).await.unwrap();
            assert!(sensor.is_some());
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn negative_results_are_cached() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let registry = SensorRegistry::new(source.clone(), Duration::from_secs(30));

        for _ in 0..3 {
            assert!(registry.bounds(1).await.unwrap().is_none());
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lapsed_entries_are_pruned_on_miss() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        // Zero TTL lapses every entry immediately, so each miss must
        // sweep out everything cached before it.
        let registry = SensorRegistry::new(source.clone(), Duration::ZERO);

        for id in 1..=50 {
            registry.sensor(id).await.unwrap();
        }
        assert_eq!(registry.cached_by_id_count().await, 1);
    }

    #[tokio::test]
    async fn zero_ttl_always_refetches() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let registry = SensorRegistry::new(source.clone(), Duration::ZERO);

        registry.sensor(1).await.unwrap();
        registry.sensor(1).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
