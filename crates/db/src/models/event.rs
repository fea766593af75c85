//! Alert event entity models.

use linewatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// One raised alert (append-only).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertRow {
    pub id: DbId,
    pub sensor_id: DbId,
    pub description: String,
    pub raised_by: DbId,
    pub recorded_at: Timestamp,
}

/// Alert joined with the originating sensor's name, for feeds and
/// history listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertWithSensor {
    pub id: DbId,
    pub sensor_id: DbId,
    pub sensor_name: String,
    pub description: String,
    pub raised_by: DbId,
    pub recorded_at: Timestamp,
}
