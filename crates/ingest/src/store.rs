//! Append-only event store behind a trait seam.
//!
//! The pipeline writes readings and alerts at least once; there is no
//! deduplication and no updates. [`PgEventStore`] is the production
//! implementation; tests substitute in-memory doubles.

use async_trait::async_trait;
use linewatch_core::types::{DbId, Timestamp};
use linewatch_db::repositories::{AlertRepo, ReadingRepo};
use linewatch_db::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store write failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store write timed out")]
    Timeout,
}

/// Durable sink for accepted readings and raised alerts.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append_reading(
        &self,
        sensor_id: DbId,
        value: f64,
        recorded_at: Timestamp,
    ) -> Result<(), StoreError>;

    async fn append_alert(
        &self,
        sensor_id: DbId,
        description: &str,
        raised_by: DbId,
        recorded_at: Timestamp,
    ) -> Result<(), StoreError>;
}

/// Event store backed by the `sensor_readings` and `alert_events` tables.
pub struct PgEventStore {
    pool: DbPool,
}

impl PgEventStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append_reading(
        &self,
        sensor_id: DbId,
        value: f64,
        recorded_at: Timestamp,
    ) -> Result<(), StoreError> {
        ReadingRepo::insert(&self.pool, sensor_id, value, recorded_at).await?;
        Ok(())
    }

    async fn append_alert(
        &self,
        sensor_id: DbId,
        description: &str,
        raised_by: DbId,
        recorded_at: Timestamp,
    ) -> Result<(), StoreError> {
        AlertRepo::insert(&self.pool, sensor_id, description, raised_by, recorded_at).await?;
        Ok(())
    }
}
