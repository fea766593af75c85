//! Rolling-window statistics over stored readings.
//!
//! Pure computation; the caller fetches the values and the sensor's
//! bounds. Bounds are whatever is configured at query time — historical
//! bounds are not versioned, so deviation counts reflect the current
//! configuration.

use crate::reading::{OperatingBounds, Status};
use crate::threshold::evaluate;

/// Aggregates over a closed time window of readings for one sensor.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StatsWindow {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub deviation_count: u64,
    pub deviation_percent: f64,
    pub count: u64,
}

impl StatsWindow {
    /// The empty window: all zeroes, never a division by zero.
    pub fn empty() -> Self {
        Self {
            avg: 0.0,
            min: 0.0,
            max: 0.0,
            deviation_count: 0,
            deviation_percent: 0.0,
            count: 0,
        }
    }
}

/// Compute window aggregates for a slice of reading values.
///
/// A deviation is any value that evaluates out of range against `bounds`;
/// with absent bounds the deviation count is always zero. No rounding is
/// applied here — presentation layers round at the boundary.
pub fn compute(values: &[f64], bounds: Option<&OperatingBounds>) -> StatsWindow {
    if values.is_empty() {
        return StatsWindow::empty();
    }

    let count = values.len() as u64;
    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let deviation_count = values
        .iter()
        .filter(|v| evaluate(**v, bounds) != Status::Normal)
        .count() as u64;

    StatsWindow {
        avg: sum / count as f64,
        min,
        max,
        deviation_count,
        deviation_percent: deviation_count as f64 / count as f64 * 100.0,
        count,
    }
}

/// Round to two decimal places. Applied only at presentation boundaries.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
