//! Sensor reading entity models.

use linewatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// One stored reading (append-only time-series).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReadingRow {
    pub id: DbId,
    pub sensor_id: DbId,
    pub value: f64,
    pub recorded_at: Timestamp,
}

/// The most recent reading per sensor, joined with sensor metadata and
/// the currently configured bounds (if any).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LatestReading {
    pub sensor_id: DbId,
    pub sensor_name: String,
    pub location_name: String,
    pub active: bool,
    pub value: f64,
    pub recorded_at: Timestamp,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}
