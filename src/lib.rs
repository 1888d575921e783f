//! # Roughness Engine
//!
//! Offline trip analysis for road-roughness measurement. The engine takes a
//! finished recording — time-stamped accelerometer samples plus time-stamped
//! GPS fixes — and produces a partition of the trip into road segments along
//! with an IRI-like roughness value per segment.
//!
//! The engine is a pure library: data capture, persistence, reverse
//! geocoding and rendering are collaborators the host passes in through the
//! [`PointStore`], [`Geocoder`], [`ProgressSink`] and [`CancelToken`]
//! traits. A single call to [`TripAnalyzer::analyze`] runs the whole
//! load → segment → estimate → aggregate pipeline synchronously.
//!
//! ## Quick Start
//!
//! ```rust
//! use roughness_engine::{
//!     AnalysisConfig, InMemoryCollection, LocationFix, NeverCancelled, NoProgress,
//!     SensorKind, SensorSample, TripAnalyzer,
//! };
//!
//! let mut collection = InMemoryCollection::new();
//! for i in 0..20 {
//!     collection.push_sample(
//!         SensorKind::Accelerometer,
//!         SensorSample::new(i * 500, 0.1, 9.8, 0.2),
//!     );
//! }
//! collection.push_fix(LocationFix::new(0, 51.5074, -0.1278, 20.0));
//! collection.push_fix(LocationFix::new(5_000, 51.5080, -0.1290, 20.0));
//! collection.push_fix(LocationFix::new(9_500, 51.5090, -0.1300, 20.0));
//!
//! let analyzer = TripAnalyzer::new(&collection, None, AnalysisConfig::default()).unwrap();
//! let report = analyzer.analyze(&NoProgress, &NeverCancelled).unwrap();
//! assert_eq!(report.skipped_count, 0);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{AnalysisError, Result};

// Spherical Earth math (distances, path lengths)
pub mod geodesy;

// Temporal interpolation of the location stream
pub mod interpolate;
pub use interpolate::location_at;

// Point-store collaborator (sensor + location streams)
pub mod store;
pub use store::{InMemoryCollection, PointStore, SensorKind};

// Geocoder collaborator, address normalization and caching
pub mod geocode;
pub use geocode::{CachedGeocoder, Geocoder, GeocoderStats};

// Progress reporting and cooperative cancellation
pub mod progress;
pub use progress::{
    CancelFlag, CancelToken, NeverCancelled, NoProgress, ProgressSink, INDETERMINATE,
};

// Segmentation engine (cut detection + assembly)
pub mod segmentation;
pub use segmentation::find_segments;

// Roughness estimation per segment
pub mod roughness;

// Trip analysis facade (load → segment → estimate → aggregate)
pub mod analysis;
pub use analysis::{Report, SegmentReport, SegmentStatus, TripAnalyzer, TripData};

// ============================================================================
// Core Types
// ============================================================================

/// One motion-sensor reading.
///
/// All sensor kinds the recorder produces share this shape; the engine only
/// consumes the accelerometer stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Milliseconds since epoch
    pub time: i64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SensorSample {
    /// Create a new sensor sample.
    pub fn new(time: i64, x: f32, y: f32, z: f32) -> Self {
        Self { time, x, y, z }
    }

    /// Sum of the three axes, the quantity the anomaly scan thresholds on.
    pub(crate) fn axis_sum(&self) -> f64 {
        self.x as f64 + self.y as f64 + self.z as f64
    }
}

/// One GPS reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Milliseconds since epoch
    pub time: i64,
    /// Height above the reference sphere in meters
    pub height: f64,
    pub longitude: f64,
    pub latitude: f64,
    /// Bearing accuracy in degrees
    pub bearing_accuracy: f32,
    /// Vertical accuracy in meters
    pub vertical_accuracy: f32,
    /// Horizontal accuracy in meters
    pub horizontal_accuracy: f32,
    /// Bearing in degrees
    pub bearing: f32,
    /// Speed in m/s
    pub speed: f32,
    /// Whether this fix was actively queried rather than pushed by the
    /// platform
    pub queried: bool,
}

impl LocationFix {
    /// Create a fix with the given time and position; accuracy, bearing and
    /// speed fields are zeroed.
    pub fn new(time: i64, latitude: f64, longitude: f64, height: f64) -> Self {
        Self {
            time,
            height,
            longitude,
            latitude,
            bearing_accuracy: 0.0,
            vertical_accuracy: 0.0,
            horizontal_accuracy: 0.0,
            bearing: 0.0,
            speed: 0.0,
            queried: false,
        }
    }

    /// Compare every field except `time`. Consecutive fixes for which this
    /// holds are collapsed on ingestion, keeping the first occurrence.
    pub fn same_reading(&self, other: &LocationFix) -> bool {
        self.height == other.height
            && self.longitude == other.longitude
            && self.latitude == other.latitude
            && self.bearing_accuracy == other.bearing_accuracy
            && self.vertical_accuracy == other.vertical_accuracy
            && self.horizontal_accuracy == other.horizontal_accuracy
            && self.bearing == other.bearing
            && self.speed == other.speed
            && self.queried == other.queried
    }
}

/// A position derived from the location stream, possibly by interpolation.
///
/// Keeps back-references to the bracketing fixes it was interpolated
/// between. A location that coincides with a stored fix has no `to`
/// reference and reports `was_estimated() == false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedLocation {
    pub fix: LocationFix,
    pub from: Option<LocationFix>,
    pub to: Option<LocationFix>,
}

impl EstimatedLocation {
    /// Wrap a stored fix as a non-estimated location.
    pub fn observed(fix: LocationFix) -> Self {
        Self {
            fix,
            from: Some(fix),
            to: None,
        }
    }

    /// Build an interpolated location between two bracketing fixes.
    pub fn interpolated(fix: LocationFix, from: LocationFix, to: LocationFix) -> Self {
        Self {
            fix,
            from: Some(from),
            to: Some(to),
        }
    }

    /// True iff this location was interpolated rather than observed.
    pub fn was_estimated(&self) -> bool {
        self.to.is_some()
    }

    pub fn time(&self) -> i64 {
        self.fix.time
    }
}

/// A contiguous, time-bounded portion of the trip treated as one road unit
/// for roughness scoring.
///
/// `start`/`end` are derived from the first and last location. Segments
/// emitted by the engine never overlap in time but share their boundary
/// location with the neighboring segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Milliseconds since epoch
    pub start: i64,
    /// Milliseconds since epoch
    pub end: i64,
    pub locations: Vec<EstimatedLocation>,
}

impl Segment {
    /// Build a segment from its location polyline.
    ///
    /// # Panics
    /// Panics if fewer than two locations are given; the segmentation
    /// engine guarantees this structurally.
    pub fn new(locations: Vec<EstimatedLocation>) -> Self {
        assert!(
            locations.len() >= 2,
            "every segment needs at least two locations"
        );
        Self {
            start: locations[0].fix.time,
            end: locations[locations.len() - 1].fix.time,
            locations,
        }
    }
}

/// The time window spanned by a trip, across both point streams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripWindow {
    /// Earliest timestamp in milliseconds since epoch
    pub start: i64,
    /// Latest timestamp in milliseconds since epoch
    pub end: i64,
}

impl TripWindow {
    pub fn duration_ms(&self) -> i64 {
        self.end - self.start
    }
}

/// Configuration for a trip analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Derive candidate cut times from acceleration anomalies.
    /// Default: true
    pub use_accelerometer: bool,

    /// Derive candidate cut times from reverse-geocoded address changes
    /// (requires a geocoder collaborator). Default: true
    pub use_geocoding: bool,

    /// Minimum polyline length for a segment to be closed, in meters.
    /// The first and last segment of a trip bypass this filter.
    /// Default: 16.0
    pub min_segment_length: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            use_accelerometer: true,
            use_geocoding: true,
            min_segment_length: 16.0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
