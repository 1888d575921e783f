//! Segmentation engine: partitions a trip into road segments.
//!
//! Candidate cut times come from two independent heuristics — acceleration
//! anomalies and reverse-geocoded address changes — which are merged, sorted
//! and greedily assembled into segments subject to a minimum polyline
//! length. Neighboring segments share their boundary location, so the
//! emitted list covers the whole trip window without gaps.

use log::{debug, warn};

use crate::error::{AnalysisError, Result};
use crate::geocode::{normalize_address, Geocoder};
use crate::geodesy::path_length;
use crate::interpolate::location_at;
use crate::progress::{CancelToken, ProgressSink, INDETERMINATE};
use crate::{
    AnalysisConfig, EstimatedLocation, LocationFix, Segment, SensorSample, TripWindow,
};

/// Progress stage names reported during segmentation.
pub const STAGE_ACCELERATION: &str = "acceleration";
pub const STAGE_GEOCODING: &str = "geocoding";
pub const STAGE_SORT: &str = "sort";
pub const STAGE_ASSEMBLE: &str = "assemble";

/// Candidate cut times from acceleration anomalies.
///
/// A sample is anomalous when its axis sum leaves the band
/// `mean ± variance`. The band deliberately uses the variance rather than
/// the standard deviation; the measurement pipeline was calibrated against
/// this behavior, so it is kept even though the units differ.
pub fn acceleration_cuts(
    samples: &[SensorSample],
    progress: &dyn ProgressSink,
    cancel: &dyn CancelToken,
) -> Result<Vec<i64>> {
    if samples.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            sample_count: samples.len(),
        });
    }
    let mean = samples.iter().map(SensorSample::axis_sum).sum::<f64>() / samples.len() as f64;
    let variance = samples
        .iter()
        .map(|s| {
            let p = s.axis_sum() - mean;
            p * p
        })
        .sum::<f64>()
        / (samples.len() - 1) as f64;
    debug!("[Segmentation] acceleration mean {mean} with variance of {variance}");

    let mut cuts = Vec::new();
    for (i, sample) in samples.iter().enumerate() {
        progress.report(STAGE_ACCELERATION, i as f64 / samples.len() as f64);
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let p = sample.axis_sum();
        if p > mean - variance && p < mean + variance {
            continue;
        }
        debug!(
            "[Segmentation] acceleration triggered new cut at {} with {p}",
            sample.time
        );
        cuts.push(sample.time);
    }
    Ok(cuts)
}

/// Candidate cut times from address changes along the location stream.
///
/// Addresses are normalized with [`normalize_address`] before comparison;
/// the first resolved address establishes the baseline without recording a
/// cut. Fixes the geocoder cannot resolve are skipped.
pub fn geocoding_cuts(
    fixes: &[LocationFix],
    geocoder: &dyn Geocoder,
    progress: &dyn ProgressSink,
    cancel: &dyn CancelToken,
) -> Result<Vec<i64>> {
    let mut cuts = Vec::new();
    let mut current: Option<String> = None;
    for (i, fix) in fixes.iter().enumerate() {
        if let Some(line) = geocoder.address_for(fix.latitude, fix.longitude) {
            let simple = normalize_address(&line);
            if current.as_deref() != Some(simple.as_str()) {
                debug!(
                    "[Segmentation] next location is at \"{simple}\" (from \"{line}\") at {}",
                    fix.time
                );
                if current.is_some() {
                    cuts.push(fix.time);
                }
                current = Some(simple);
            }
        }
        progress.report(STAGE_GEOCODING, i as f64 / fixes.len() as f64);
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
    }
    Ok(cuts)
}

/// Partition the trip into segments.
///
/// `fixes` must be the deduplicated, time-sorted location stream and
/// `window` the trip window computed over both streams. Segments are
/// emitted in increasing time order; all but the first and last exceed
/// `config.min_segment_length` meters of polyline length. A candidate cut
/// equal to a fix's timestamp takes effect after that fix, never before it.
pub fn find_segments(
    samples: &[SensorSample],
    fixes: &[LocationFix],
    window: TripWindow,
    geocoder: Option<&dyn Geocoder>,
    config: &AnalysisConfig,
    progress: &dyn ProgressSink,
    cancel: &dyn CancelToken,
) -> Result<Vec<Segment>> {
    let mut cuts: Vec<i64> = Vec::new();

    if config.use_accelerometer {
        match acceleration_cuts(samples, progress, cancel) {
            Ok(mut found) => cuts.append(&mut found),
            Err(AnalysisError::InsufficientData { sample_count }) if config.use_geocoding => {
                warn!(
                    "[Segmentation] only {sample_count} accelerometer samples, skipping anomaly scan"
                );
            }
            Err(e) => return Err(e),
        }
    }

    if config.use_geocoding {
        match geocoder {
            Some(geocoder) => {
                cuts.extend(geocoding_cuts(fixes, geocoder, progress, cancel)?);
            }
            None => warn!("[Segmentation] geocoder is not available"),
        }
    }

    if cuts.is_empty() {
        warn!("[Segmentation] no cut candidates found - no criteria yielded any results");
    }

    progress.report(STAGE_SORT, INDETERMINATE);
    cuts.sort_unstable();

    // Assemble segments from the cut times and the location stream. The
    // pending list always starts with the closing location of the previous
    // segment, so neighbors share their boundary point.
    let mut segments: Vec<Segment> = Vec::new();
    let mut pending: Vec<EstimatedLocation> = vec![location_at(fixes, window.start)?];
    let mut next_cut = 0usize;
    for (i, fix) in fixes.iter().enumerate() {
        while next_cut < cuts.len() && cuts[next_cut] < fix.time {
            let at_cut = location_at(fixes, cuts[next_cut])?;
            next_cut += 1;
            pending.push(at_cut.clone());
            if path_length(&pending) > config.min_segment_length {
                segments.push(Segment::new(std::mem::take(&mut pending)));
                // Reseed so the new segment continues from the cut point
                pending.push(at_cut);
            }
            // Too short to stand alone: keep accumulating into the same
            // pending list
        }
        pending.push(EstimatedLocation::observed(*fix));
        progress.report(STAGE_ASSEMBLE, i as f64 / fixes.len() as f64);
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
    }
    if pending.len() > 1 {
        // Close the final segment at the trip end, regardless of length
        pending.push(location_at(fixes, window.end)?);
        segments.push(Segment::new(pending));
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NeverCancelled, NoProgress};

    fn steady_samples(count: i64) -> Vec<SensorSample> {
        // Alternating ±2 around zero: the sample variance exceeds the
        // amplitude, so every sample stays inside the band
        (0..count)
            .map(|i| {
                let x = if i % 2 == 0 { 2.0 } else { -2.0 };
                SensorSample::new(i * 100, x, 0.0, 0.0)
            })
            .collect()
    }

    fn fix_row(count: usize, spacing_ms: i64, step_lat: f64) -> Vec<LocationFix> {
        (0..count)
            .map(|i| LocationFix::new(i as i64 * spacing_ms, i as f64 * step_lat, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn test_acceleration_cuts_need_two_samples() {
        let result = acceleration_cuts(&[], &NoProgress, &NeverCancelled);
        assert_eq!(
            result,
            Err(AnalysisError::InsufficientData { sample_count: 0 })
        );

        let one = [SensorSample::new(0, 1.0, 1.0, 1.0)];
        let result = acceleration_cuts(&one, &NoProgress, &NeverCancelled);
        assert_eq!(
            result,
            Err(AnalysisError::InsufficientData { sample_count: 1 })
        );
    }

    #[test]
    fn test_steady_motion_yields_no_cuts() {
        let samples = steady_samples(100);
        let cuts = acceleration_cuts(&samples, &NoProgress, &NeverCancelled).unwrap();
        assert!(cuts.is_empty());
    }

    #[test]
    fn test_spike_yields_cut_at_its_timestamp() {
        let mut samples = steady_samples(100);
        samples[50] = SensorSample::new(5_000, 80.0, 0.0, 0.0);
        let cuts = acceleration_cuts(&samples, &NoProgress, &NeverCancelled).unwrap();
        assert_eq!(cuts, vec![5_000]);
    }

    struct AddressPerLatitude;

    impl Geocoder for AddressPerLatitude {
        fn address_for(&self, latitude: f64, _longitude: f64) -> Option<String> {
            Some(format!(
                "Street {} 7, 49124 Town",
                (latitude * 10.0).round() as i64
            ))
        }
    }

    #[test]
    fn test_address_changes_skip_first_baseline() {
        // Three distinct normalized addresses: the first seeds the baseline,
        // the remaining two cut
        let fixes = fix_row(3, 1_000, 0.1);
        let cuts =
            geocoding_cuts(&fixes, &AddressPerLatitude, &NoProgress, &NeverCancelled).unwrap();
        assert_eq!(cuts, vec![1_000, 2_000]);
    }

    #[test]
    fn test_house_number_change_is_not_a_cut() {
        struct SameStreet;
        impl Geocoder for SameStreet {
            fn address_for(&self, latitude: f64, _longitude: f64) -> Option<String> {
                let number = (latitude * 1000.0).round() as i64;
                Some(format!("Main Road {number}, 49124 Town"))
            }
        }
        let fixes = fix_row(4, 1_000, 0.01);
        let cuts = geocoding_cuts(&fixes, &SameStreet, &NoProgress, &NeverCancelled).unwrap();
        assert!(cuts.is_empty());
    }

    #[test]
    fn test_unresolved_fixes_are_skipped() {
        struct Mute;
        impl Geocoder for Mute {
            fn address_for(&self, _latitude: f64, _longitude: f64) -> Option<String> {
                None
            }
        }
        let fixes = fix_row(3, 1_000, 0.1);
        let cuts = geocoding_cuts(&fixes, &Mute, &NoProgress, &NeverCancelled).unwrap();
        assert!(cuts.is_empty());
    }

    #[test]
    fn test_no_cuts_yield_single_spanning_segment() {
        // Both streams end at t=8000, so the window end coincides with the
        // last fix
        let samples = steady_samples(81);
        let fixes = fix_row(5, 2_000, 0.001);
        let window = TripWindow {
            start: 0,
            end: 8_000,
        };
        let config = AnalysisConfig {
            use_geocoding: false,
            ..AnalysisConfig::default()
        };
        let segments = find_segments(
            &samples,
            &fixes,
            window,
            None,
            &config,
            &NoProgress,
            &NeverCancelled,
        )
        .unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, window.start);
        assert_eq!(segments[0].end, window.end);
    }

    #[test]
    fn test_non_boundary_segments_exceed_minimum_length() {
        // Driving north at ~11 m/s with a spike every second; the spikes are
        // small enough that the variance band (squared units) does not
        // swallow them
        let samples: Vec<SensorSample> = (0..100)
            .map(|i| {
                let x = if i % 10 == 0 { 8.0 } else { 0.0 };
                SensorSample::new(i * 100, x, 0.0, 0.0)
            })
            .collect();
        let fixes = fix_row(10, 1_000, 0.001);
        let window = TripWindow {
            start: 0,
            end: 9_900,
        };
        let config = AnalysisConfig {
            use_geocoding: false,
            ..AnalysisConfig::default()
        };
        let segments = find_segments(
            &samples,
            &fixes,
            window,
            None,
            &config,
            &NoProgress,
            &NeverCancelled,
        )
        .unwrap();

        assert!(segments.len() >= 2);
        for segment in &segments[..segments.len() - 1] {
            assert!(path_length(&segment.locations) > config.min_segment_length);
        }
    }

    #[test]
    fn test_segments_share_boundary_points() {
        // Same trip as above: one cut per second, one segment per leg
        let samples: Vec<SensorSample> = (0..100)
            .map(|i| {
                let x = if i % 10 == 0 { 8.0 } else { 0.0 };
                SensorSample::new(i * 100, x, 0.0, 0.0)
            })
            .collect();
        let fixes = fix_row(10, 1_000, 0.001);
        let window = TripWindow {
            start: 0,
            end: 9_900,
        };
        let config = AnalysisConfig {
            use_geocoding: false,
            ..AnalysisConfig::default()
        };
        let segments = find_segments(
            &samples,
            &fixes,
            window,
            None,
            &config,
            &NoProgress,
            &NeverCancelled,
        )
        .unwrap();

        for pair in segments.windows(2) {
            let last = pair[0].locations.last().unwrap();
            let first = &pair[1].locations[0];
            assert_eq!(last, first);
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_insufficient_samples_fatal_without_geocoding() {
        let fixes = fix_row(3, 1_000, 0.001);
        let window = TripWindow { start: 0, end: 2_000 };
        let config = AnalysisConfig {
            use_geocoding: false,
            ..AnalysisConfig::default()
        };
        let result = find_segments(
            &[],
            &fixes,
            window,
            None,
            &config,
            &NoProgress,
            &NeverCancelled,
        );
        assert_eq!(
            result,
            Err(AnalysisError::InsufficientData { sample_count: 0 })
        );
    }

    #[test]
    fn test_insufficient_samples_tolerated_with_geocoding_configured() {
        let fixes = fix_row(3, 1_000, 0.001);
        let window = TripWindow { start: 0, end: 2_000 };
        let config = AnalysisConfig::default();
        // Geocoding configured but no geocoder supplied: the run still
        // proceeds and keeps the whole trip as one segment
        let segments = find_segments(
            &[],
            &fixes,
            window,
            None,
            &config,
            &NoProgress,
            &NeverCancelled,
        )
        .unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_cancellation_stops_assembly() {
        use crate::progress::CancelFlag;

        let samples = steady_samples(10);
        let fixes = fix_row(5, 1_000, 0.001);
        let window = TripWindow { start: 0, end: 4_000 };
        let flag = CancelFlag::new();
        flag.cancel();
        let result = find_segments(
            &samples,
            &fixes,
            window,
            None,
            &AnalysisConfig::default(),
            &NoProgress,
            &flag,
        );
        assert_eq!(result, Err(AnalysisError::Cancelled));
    }
}
