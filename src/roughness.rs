//! Roughness estimation per segment.
//!
//! The estimator integrates acceleration jerk over the segment's time span,
//! weighted by the squared sample interval, and normalizes by the segment's
//! geodesic length. This is an engine-specific approximation of the
//! International Roughness Index: a true IRI requires a quarter-car
//! dynamical model integrated over the road-surface profile, which phone
//! sensors cannot provide. Values are comparable between segments of the
//! same recording, not against IRI-standard tables.

use crate::error::{AnalysisError, Result};
use crate::geodesy::path_length;
use crate::{Segment, SensorSample};

/// Estimate the roughness value of one segment.
///
/// Walks the in-window portion of the accelerometer stream and accumulates
/// `(|Δx| + |Δy| + |Δz|) · dt²` over consecutive sample pairs; the result is
/// half that sum divided by the segment's polyline length in meters. Always
/// non-negative. A segment without any in-window sample pair scores 0.
///
/// Fails with [`AnalysisError::DegenerateSegment`] when the segment's start
/// and end coincide spatially: roughness per meter is meaningless without
/// distance.
pub fn estimate(segment: &Segment, samples: &[SensorSample]) -> Result<f64> {
    let dist = path_length(&segment.locations);
    if dist <= 0.0 {
        return Err(AnalysisError::DegenerateSegment {
            start: segment.start,
            end: segment.end,
        });
    }

    let mut sum = 0.0;
    let mut last: Option<&SensorSample> = None;
    for sample in samples {
        if sample.time < segment.start {
            continue;
        }
        if sample.time > segment.end {
            break;
        }
        if let Some(prev) = last {
            let delta = (prev.x - sample.x).abs() as f64
                + (prev.y - sample.y).abs() as f64
                + (prev.z - sample.z).abs() as f64;
            let dt = (sample.time - prev.time) as f64;
            sum += delta * dt * dt;
        }
        last = Some(sample);
    }

    Ok(sum * 0.5 / dist)
}
