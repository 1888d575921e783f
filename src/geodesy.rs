//! Spherical Earth math: Cartesian conversion, great-circle distance and
//! polyline length.
//!
//! Positions are treated as lying on a sphere of radius
//! `EARTH_RADIUS_M + height`. This matches the recorder's output exactly and
//! is accurate to well under a percent at trip scale; no ellipsoid model is
//! used.

use crate::{EstimatedLocation, LocationFix};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Convert a fix to Earth-centered Cartesian coordinates in meters.
pub fn to_cartesian(fix: &LocationFix) -> [f64; 3] {
    let r = EARTH_RADIUS_M + fix.height;
    let lat = fix.latitude.to_radians();
    let lon = fix.longitude.to_radians();
    [
        r * lat.cos() * lon.cos(),
        r * lat.cos() * lon.sin(),
        r * lat.sin(),
    ]
}

/// Great-circle distance between two fixes in meters.
pub fn distance(from: &LocationFix, to: &LocationFix) -> f64 {
    if from == to {
        return 0.0;
    }
    let a = to_cartesian(from);
    let b = to_cartesian(to);
    if a == b {
        return 0.0;
    }
    let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
    let frac = dot / ((EARTH_RADIUS_M + from.height) * (EARTH_RADIUS_M + to.height));
    // Rounding can push the ratio just past 1, outside acos' domain
    frac.min(1.0).acos() * EARTH_RADIUS_M
}

/// Total length of a location polyline in meters; 0 for fewer than 2 points.
pub fn path_length(locations: &[EstimatedLocation]) -> f64 {
    locations
        .windows(2)
        .map(|w| distance(&w[0].fix, &w[1].fix))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EstimatedLocation;

    #[test]
    fn test_distance_zero_for_equal_fixes() {
        let a = LocationFix::new(0, 51.5074, -0.1278, 20.0);
        assert_eq!(distance(&a, &a), 0.0);
    }

    #[test]
    fn test_distance_symmetry() {
        let a = LocationFix::new(0, 51.5074, -0.1278, 20.0);
        let b = LocationFix::new(1_000, 48.8566, 2.3522, 35.0);
        assert_eq!(distance(&a, &b), distance(&b, &a));
    }

    #[test]
    fn test_london_to_paris() {
        let london = LocationFix::new(0, 51.5074, -0.1278, 0.0);
        let paris = LocationFix::new(0, 48.8566, 2.3522, 0.0);
        let dist = distance(&london, &paris);
        // London to Paris is about 344 km
        assert!(dist > 340_000.0 && dist < 350_000.0);
    }

    #[test]
    fn test_nearby_points_do_not_hit_acos_domain() {
        // Fixes a few centimeters apart; the dot-product ratio lands right
        // at 1 and must not produce NaN
        let a = LocationFix::new(0, 51.507400, -0.127800, 0.0);
        let b = LocationFix::new(1, 51.5074000001, -0.127800, 0.0);
        let dist = distance(&a, &b);
        assert!(dist.is_finite());
        assert!(dist >= 0.0);
    }

    #[test]
    fn test_path_length_short_lists() {
        assert_eq!(path_length(&[]), 0.0);
        let single = EstimatedLocation::observed(LocationFix::new(0, 51.5, -0.1, 0.0));
        assert_eq!(path_length(&[single]), 0.0);
    }

    #[test]
    fn test_path_length_sums_pairs() {
        let a = EstimatedLocation::observed(LocationFix::new(0, 0.0, 0.0, 0.0));
        let b = EstimatedLocation::observed(LocationFix::new(1, 0.001, 0.0, 0.0));
        let c = EstimatedLocation::observed(LocationFix::new(2, 0.002, 0.0, 0.0));
        let total = path_length(&[a.clone(), b.clone(), c.clone()]);
        let first = distance(&a.fix, &b.fix);
        let second = distance(&b.fix, &c.fix);
        assert!((total - (first + second)).abs() < 1e-9);
        // 0.001 degrees of latitude is about 111 m
        assert!(first > 100.0 && first < 120.0);
    }
}
