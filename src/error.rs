//! Unified error handling for the trip-analysis engine.
//!
//! One error type covers the whole pipeline. Failures local to a single
//! segment's roughness estimation are caught by the facade and recorded as
//! skipped segments; everything else aborts the run and reaches the caller
//! as a single failure carrying the original cause.

use std::fmt;

/// Unified error type for trip-analysis operations.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The trip has too few distinct timestamps to bound a window
    InsufficientTimepoints,
    /// Too few accelerometer samples for the variance calculation
    InsufficientData { sample_count: usize },
    /// Interpolation found no fix at or before the requested timestamp
    MissingFromLocation { timestamp: i64 },
    /// Interpolation found a preceding fix but no bracketing one; indicates
    /// an internal scan inconsistency
    MissingToLocation { timestamp: i64 },
    /// A segment's start and end coincide spatially, so no roughness can be
    /// computed for it
    DegenerateSegment { start: i64, end: i64 },
    /// Cooperative cancellation was observed; not a failure
    Cancelled,
    /// The point-store collaborator failed
    Store { message: String },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InsufficientTimepoints => {
                write!(
                    f,
                    "Not enough timepoints to find a separate start and end for the trip"
                )
            }
            AnalysisError::InsufficientData { sample_count } => {
                write!(
                    f,
                    "Variance calculation needs at least 2 accelerometer samples, got {}",
                    sample_count
                )
            }
            AnalysisError::MissingFromLocation { timestamp } => {
                write!(f, "No from-location found for timestamp {}", timestamp)
            }
            AnalysisError::MissingToLocation { timestamp } => {
                write!(f, "No to-location found for timestamp {}", timestamp)
            }
            AnalysisError::DegenerateSegment { start, end } => {
                write!(
                    f,
                    "Segment [{}, {}] starts and ends at the same point (no distance)",
                    start, end
                )
            }
            AnalysisError::Cancelled => write!(f, "Analysis cancelled"),
            AnalysisError::Store { message } => write!(f, "Point store error: {}", message),
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Result type alias for trip-analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
