//! Sensor and operating-bounds entity models.

use linewatch_core::reading::OperatingBounds;
use linewatch_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A registered sensor on a production line.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Sensor {
    pub id: DbId,
    pub name: String,
    pub location_id: DbId,
    pub active: bool,
}

/// Configured operating range for one sensor. At most one row per sensor.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OperatingBoundsRow {
    pub id: DbId,
    pub sensor_id: DbId,
    pub min_value: f64,
    pub max_value: f64,
}

impl OperatingBoundsRow {
    /// Project onto the pure domain bounds type.
    pub fn as_bounds(&self) -> OperatingBounds {
        OperatingBounds {
            min_value: self.min_value,
            max_value: self.max_value,
        }
    }
}
