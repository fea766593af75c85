//! Threshold evaluation.
//!
//! Pure logic — no database access. The caller is responsible for
//! fetching the sensor's bounds and passing them in.

use crate::reading::{OperatingBounds, Status};

/// Classify a reading value against the sensor's operating bounds.
///
/// Bounds are inclusive on both ends: `value == min` and `value == max`
/// are [`Status::Normal`]. A sensor without configured bounds never
/// deviates. Comparison happens at full f64 precision; rounding is a
/// presentation concern.
pub fn evaluate(value: f64, bounds: Option<&OperatingBounds>) -> Status {
    let Some(bounds) = bounds else {
        return Status::Normal;
    };

    if value < bounds.min_value {
        Status::Low
    } else if value > bounds.max_value {
        Status::High
    } else {
        Status::Normal
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: OperatingBounds = OperatingBounds {
        min_value: 160.0,
        max_value: 180.0,
    };

    #[test]
    fn within_bounds_is_normal() {
        assert_eq!(evaluate(170.0, Some(&BOUNDS)), Status::Normal);
    }

    #[test]
    fn below_min_is_low() {
        assert_eq!(evaluate(159.9, Some(&BOUNDS)), Status::Low);
    }

    #[test]
    fn above_max_is_high() {
        assert_eq!(evaluate(190.0, Some(&BOUNDS)), Status::High);
    }

    #[test]
    fn bounds_are_inclusive_on_both_ends() {
        assert_eq!(evaluate(160.0, Some(&BOUNDS)), Status::Normal);
        assert_eq!(evaluate(180.0, Some(&BOUNDS)), Status::Normal);
    }

    #[test]
    fn absent_bounds_is_always_normal() {
        assert_eq!(evaluate(f64::MAX, None), Status::Normal);
        assert_eq!(evaluate(f64::MIN, None), Status::Normal);
        assert_eq!(evaluate(0.0, None), Status::Normal);
    }

    #[test]
    fn no_rounding_before_comparison() {
        // 180.004 would round to 180.00 for display, but it is above max.
        assert_eq!(evaluate(180.004, Some(&BOUNDS)), Status::High);
    }
}
