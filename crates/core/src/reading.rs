//! Canonical reading, bounds, and status types.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Classification of a reading relative to its sensor's operating bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Within bounds, or no bounds are configured for the sensor.
    Normal,
    /// Below the configured minimum.
    Low,
    /// Above the configured maximum.
    High,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Normal => "normal",
            Status::Low => "low",
            Status::High => "high",
        }
    }
}

/// Configured inclusive [min, max] acceptable range for a sensor.
///
/// Invariant (enforced by configuration, assumed here): `min_value < max_value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingBounds {
    pub min_value: f64,
    pub max_value: f64,
}

/// One timestamped numeric observation from a sensor.
///
/// Created once per accepted inbound message and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: DbId,
    pub value: f64,
    pub recorded_at: Timestamp,
}
