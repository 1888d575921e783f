//! Temporal interpolation of the location stream.
//!
//! The recorder's GPS fixes are sparse compared to its accelerometer
//! samples, so segment boundaries rarely coincide with a stored fix.
//! [`location_at`] estimates the position at an arbitrary timestamp by
//! linear interpolation between the two bracketing fixes, clamping to the
//! nearest fix outside the recorded range.

use crate::error::{AnalysisError, Result};
use crate::{EstimatedLocation, LocationFix};

/// Linear blend between two values at the given (clamped) fraction.
fn slide(from: f64, to: f64, percent: f64) -> f64 {
    from + (to - from) * percent.clamp(0.0, 1.0)
}

fn slide_f32(from: f32, to: f32, percent: f64) -> f32 {
    from + ((to - from) as f64 * percent.clamp(0.0, 1.0)) as f32
}

/// Estimate the position at `timestamp` from a non-empty, time-sorted,
/// deduplicated fix sequence.
///
/// A timestamp at or before the first fix yields that fix un-estimated; one
/// at or beyond the last fix yields the last fix un-estimated. A timestamp
/// that coincides exactly with a stored fix yields that fix un-estimated.
/// Anything in between is linearly interpolated across every numeric field,
/// including the timestamp itself, with the bracketing fixes retained as
/// back-references.
///
/// An empty `fixes` slice is a caller error and fails with
/// [`AnalysisError::MissingFromLocation`].
pub fn location_at(fixes: &[LocationFix], timestamp: i64) -> Result<EstimatedLocation> {
    // Find the fixes to interpolate between
    let mut from: Option<&LocationFix> = None;
    let mut to: Option<&LocationFix> = None;
    for (i, fix) in fixes.iter().enumerate() {
        if fix.time >= timestamp {
            to = Some(fix);
            from = if i > 0 { Some(&fixes[i - 1]) } else { to };
            break;
        }
    }
    if from.is_none() && to.is_none() {
        if let Some(last) = fixes.last() {
            if timestamp > last.time {
                // Requested a point beyond the recorded data; clamp
                from = Some(last);
                to = Some(last);
            }
        }
    }
    let from = *from.ok_or(AnalysisError::MissingFromLocation { timestamp })?;
    let to = *to.ok_or(AnalysisError::MissingToLocation { timestamp })?;

    let duration = to.time - from.time;
    if duration == 0 {
        // In zero milliseconds nobody moves anywhere
        return Ok(EstimatedLocation::observed(from));
    }
    let percent = ((timestamp - from.time) as f64 / duration as f64).clamp(0.0, 1.0);
    if percent == 0.0 {
        return Ok(EstimatedLocation::observed(from));
    }
    if percent == 1.0 {
        return Ok(EstimatedLocation::observed(to));
    }

    let fix = LocationFix {
        time: slide(from.time as f64, to.time as f64, percent) as i64,
        height: slide(from.height, to.height, percent),
        longitude: slide(from.longitude, to.longitude, percent),
        latitude: slide(from.latitude, to.latitude, percent),
        bearing_accuracy: slide_f32(from.bearing_accuracy, to.bearing_accuracy, percent),
        vertical_accuracy: slide_f32(from.vertical_accuracy, to.vertical_accuracy, percent),
        horizontal_accuracy: slide_f32(from.horizontal_accuracy, to.horizontal_accuracy, percent),
        bearing: slide_f32(from.bearing, to.bearing, percent),
        speed: slide_f32(from.speed, to.speed, percent),
        queried: false,
    };
    Ok(EstimatedLocation::interpolated(fix, from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fixes() -> Vec<LocationFix> {
        vec![
            LocationFix::new(0, 0.0, 0.0, 0.0),
            LocationFix::new(1_000, 1.0, 1.0, 100.0),
        ]
    }

    #[test]
    fn test_empty_fixes_fail() {
        let result = location_at(&[], 500);
        assert_eq!(
            result,
            Err(AnalysisError::MissingFromLocation { timestamp: 500 })
        );
    }

    #[test]
    fn test_before_range_clamps_to_first() {
        let fixes = sample_fixes();
        let loc = location_at(&fixes, -500).unwrap();
        assert!(!loc.was_estimated());
        assert_eq!(loc.fix, fixes[0]);
    }

    #[test]
    fn test_at_first_fix_returns_it_unestimated() {
        let fixes = sample_fixes();
        let loc = location_at(&fixes, 0).unwrap();
        assert!(!loc.was_estimated());
        assert_eq!(loc.fix, fixes[0]);
    }

    #[test]
    fn test_at_last_fix_returns_it_unestimated() {
        let fixes = sample_fixes();
        let loc = location_at(&fixes, 1_000).unwrap();
        assert!(!loc.was_estimated());
        assert_eq!(loc.fix, fixes[1]);
    }

    #[test]
    fn test_beyond_range_clamps_to_last() {
        let fixes = sample_fixes();
        let loc = location_at(&fixes, 5_000).unwrap();
        assert!(!loc.was_estimated());
        assert_eq!(loc.fix, fixes[1]);
    }

    #[test]
    fn test_midpoint_interpolation() {
        let fixes = sample_fixes();
        let loc = location_at(&fixes, 500).unwrap();
        assert!(loc.was_estimated());
        assert!((loc.fix.latitude - 0.5).abs() < 1e-9);
        assert!((loc.fix.longitude - 0.5).abs() < 1e-9);
        assert!((loc.fix.height - 50.0).abs() < 1e-9);
        assert_eq!(loc.fix.time, 500);
        assert!(!loc.fix.queried);
        assert_eq!(loc.from, Some(fixes[0]));
        assert_eq!(loc.to, Some(fixes[1]));
    }

    #[test]
    fn test_quarter_interpolation_of_float_fields() {
        let mut from = LocationFix::new(0, 0.0, 0.0, 0.0);
        from.speed = 4.0;
        from.bearing = 0.0;
        let mut to = LocationFix::new(1_000, 0.0, 0.0, 0.0);
        to.speed = 8.0;
        to.bearing = 90.0;
        let loc = location_at(&[from, to], 250).unwrap();
        assert!((loc.fix.speed - 5.0).abs() < 1e-6);
        assert!((loc.fix.bearing - 22.5).abs() < 1e-6);
    }

    #[test]
    fn test_single_fix_is_always_returned() {
        let only = LocationFix::new(1_000, 51.5, -0.1, 10.0);
        for timestamp in [0, 1_000, 2_000] {
            let loc = location_at(&[only], timestamp).unwrap();
            assert!(!loc.was_estimated());
            assert_eq!(loc.fix, only);
        }
    }
}
