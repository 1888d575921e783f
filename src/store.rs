//! Point-store collaborator: the engine's read-only view of a finished
//! recording.
//!
//! The store owns the raw point streams; the engine borrows them once per
//! analysis run. Streams must already be sorted ascending by time — the
//! engine never re-sorts, it only deduplicates the location stream.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{LocationFix, SensorSample};

/// The sensor streams a recording may carry.
///
/// Only [`SensorKind::Accelerometer`] is consumed by the analysis engine;
/// the other kinds exist so a store can expose everything the recorder
/// captured through one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Accelerometer,
    Gravity,
    Gyrometer,
    Magnetometer,
    Temperature,
    Pressure,
    Humidity,
}

/// Read access to a finished recording.
///
/// Implementations must return streams sorted ascending by `time`. Failures
/// (I/O, decoding) abort the whole analysis run.
pub trait PointStore {
    /// All samples of the given sensor kind, in time order.
    fn samples(&self, kind: SensorKind) -> Result<Vec<SensorSample>>;

    /// All location fixes, in time order, duplicates included.
    fn fixes(&self) -> Result<Vec<LocationFix>>;
}

/// A `PointStore` holding its streams in memory.
///
/// Useful for tests and for hosts that already decoded a recording; callers
/// are responsible for pushing points in time order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCollection {
    samples: HashMap<SensorKind, Vec<SensorSample>>,
    fixes: Vec<LocationFix>,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_sample(&mut self, kind: SensorKind, sample: SensorSample) {
        self.samples.entry(kind).or_default().push(sample);
    }

    pub fn push_fix(&mut self, fix: LocationFix) {
        self.fixes.push(fix);
    }

    pub fn sample_count(&self, kind: SensorKind) -> usize {
        self.samples.get(&kind).map_or(0, Vec::len)
    }

    pub fn fix_count(&self) -> usize {
        self.fixes.len()
    }
}

impl PointStore for InMemoryCollection {
    fn samples(&self, kind: SensorKind) -> Result<Vec<SensorSample>> {
        Ok(self.samples.get(&kind).cloned().unwrap_or_default())
    }

    fn fixes(&self) -> Result<Vec<LocationFix>> {
        Ok(self.fixes.clone())
    }
}
