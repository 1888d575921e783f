//! Trip analysis facade: load → segment → estimate → aggregate.
//!
//! [`TripAnalyzer`] owns one analysis run over one finished recording. The
//! run is synchronous and non-reentrant; a host wanting to supersede an
//! outstanding run cancels it through its [`CancelFlag`](crate::CancelFlag)
//! and starts a fresh analyzer. Failures local to a single segment's
//! roughness estimation are recorded and skipped; everything else aborts
//! the run.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::geocode::Geocoder;
use crate::progress::{CancelToken, ProgressSink};
use crate::segmentation::find_segments;
use crate::store::{PointStore, SensorKind};
use crate::{roughness, AnalysisConfig, LocationFix, Segment, SensorSample, TripWindow};

/// Progress stage reported while segments are being scored.
pub const STAGE_CALCULATING: &str = "calculating";

/// Prefix applied to the segmentation engine's stage names.
const STAGE_SEARCHING_PREFIX: &str = "searching segments: ";

/// The loaded, validated streams of one recording.
#[derive(Debug, Clone)]
pub struct TripData {
    pub window: TripWindow,
    pub accelerometer: Vec<SensorSample>,
    pub locations: Vec<LocationFix>,
}

impl TripData {
    /// Pull both streams from the store, deduplicate the location stream
    /// and compute the trip window.
    ///
    /// Fails with [`AnalysisError::InsufficientTimepoints`] when the
    /// recording has fewer than two distinct timestamps across both
    /// streams.
    pub fn load(store: &dyn PointStore) -> Result<Self> {
        fn widen(time: i64, start: &mut Option<i64>, end: &mut Option<i64>) {
            if start.map_or(true, |s| s > time) {
                *start = Some(time);
            }
            if end.map_or(true, |e| e < time) {
                *end = Some(time);
            }
        }

        let mut start: Option<i64> = None;
        let mut end: Option<i64> = None;

        let accelerometer = store.samples(SensorKind::Accelerometer)?;
        for sample in &accelerometer {
            widen(sample.time, &mut start, &mut end);
        }

        let raw = store.fixes()?;
        let mut locations: Vec<LocationFix> = Vec::with_capacity(raw.len());
        for fix in raw {
            widen(fix.time, &mut start, &mut end);
            let duplicate = locations
                .last()
                .map_or(false, |prev| prev.same_reading(&fix));
            if !duplicate {
                locations.push(fix);
            }
        }

        match (start, end) {
            (Some(start), Some(end)) if start != end => Ok(Self {
                window: TripWindow { start, end },
                accelerometer,
                locations,
            }),
            _ => Err(AnalysisError::InsufficientTimepoints),
        }
    }
}

/// Outcome of scoring one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SegmentStatus {
    Processed { roughness: f64 },
    Skipped { reason: String },
}

/// One segment with its scoring outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub segment: Segment,
    pub status: SegmentStatus,
}

/// Aggregate result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// All emitted segments in time order, each with its outcome
    pub segments: Vec<SegmentReport>,
    /// Roughness values of the processed segments, in segment order
    pub roughness_values: Vec<f64>,
    pub processed_count: u32,
    pub skipped_count: u32,
    /// Total locations across all emitted segments
    pub location_count: u32,
    /// Mean of the processed values; NaN when nothing was processed, which
    /// callers must treat as "no usable result"
    pub average_roughness: f64,
    /// Sample variance (divisor n−1) of the processed values; 0 for fewer
    /// than two
    pub roughness_variance: f64,
}

impl Report {
    /// Serialize the report to JSON for the host's reporting layer.
    /// Non-finite aggregates serialize as `null`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Forwards segmentation progress under the facade's stage prefix.
struct SearchProgress<'a> {
    inner: &'a dyn ProgressSink,
}

impl ProgressSink for SearchProgress<'_> {
    fn report(&self, stage: &str, fraction: f64) {
        self.inner
            .report(&format!("{STAGE_SEARCHING_PREFIX}{stage}"), fraction);
    }
}

/// Mean and sample variance of the processed roughness values.
fn aggregate(values: &[f64], sum: f64) -> (f64, f64) {
    let average = sum / values.len() as f64;
    let variance = if values.len() > 1 {
        values
            .iter()
            .map(|v| {
                let d = v - average;
                d * d
            })
            .sum::<f64>()
            / (values.len() - 1) as f64
    } else {
        0.0
    };
    (average, variance)
}

/// One analysis run over one finished recording.
pub struct TripAnalyzer<'a> {
    data: TripData,
    geocoder: Option<&'a dyn Geocoder>,
    config: AnalysisConfig,
}

impl<'a> TripAnalyzer<'a> {
    /// Load and validate the recording's streams.
    ///
    /// Store failures and a too-small trip window abort here, before any
    /// analysis work starts.
    pub fn new(
        store: &dyn PointStore,
        geocoder: Option<&'a dyn Geocoder>,
        config: AnalysisConfig,
    ) -> Result<Self> {
        Ok(Self {
            data: TripData::load(store)?,
            geocoder,
            config,
        })
    }

    /// The loaded streams, after deduplication.
    pub fn data(&self) -> &TripData {
        &self.data
    }

    /// Run the full pipeline and aggregate a [`Report`].
    ///
    /// Progress is reported synchronously on the calling thread; the cancel
    /// token is polled at every progress point and yields
    /// [`AnalysisError::Cancelled`] without a partial report.
    pub fn analyze(
        &self,
        progress: &dyn ProgressSink,
        cancel: &dyn CancelToken,
    ) -> Result<Report> {
        let search = SearchProgress { inner: progress };
        let segments = find_segments(
            &self.data.accelerometer,
            &self.data.locations,
            self.data.window,
            self.geocoder,
            &self.config,
            &search,
            cancel,
        )?;
        info!("[Analysis] found {} segments", segments.len());

        let total = segments.len();
        let mut reports: Vec<SegmentReport> = Vec::with_capacity(total);
        let mut values: Vec<f64> = Vec::new();
        let mut sum = 0.0;
        let mut skipped_count = 0u32;
        let mut location_count = 0u32;
        for (i, segment) in segments.into_iter().enumerate() {
            progress.report(STAGE_CALCULATING, i as f64 / total as f64);
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
            location_count += segment.locations.len() as u32;
            match roughness::estimate(&segment, &self.data.accelerometer) {
                Ok(value) => {
                    info!(
                        "[Analysis] segment {} of {} locations scored {value}",
                        i,
                        segment.locations.len()
                    );
                    sum += value;
                    values.push(value);
                    reports.push(SegmentReport {
                        segment,
                        status: SegmentStatus::Processed { roughness: value },
                    });
                }
                Err(e) => {
                    skipped_count += 1;
                    warn!("[Analysis] skipped segment {i}: {e}");
                    reports.push(SegmentReport {
                        segment,
                        status: SegmentStatus::Skipped {
                            reason: e.to_string(),
                        },
                    });
                }
            }
        }

        let (average_roughness, roughness_variance) = aggregate(&values, sum);
        Ok(Report {
            processed_count: values.len() as u32,
            segments: reports,
            roughness_values: values,
            skipped_count,
            location_count,
            average_roughness,
            roughness_variance,
        })
    }
}
