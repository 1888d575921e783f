//! Progress reporting and cooperative cancellation.
//!
//! Both collaborators are polled synchronously on the calling thread at
//! every progress point (per sample, fix and segment processed). Marshalling
//! updates to a UI thread is the host's responsibility.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Fraction value for stages whose progress cannot be quantified.
pub const INDETERMINATE: f64 = -1.0;

/// Receives progress updates from a running analysis.
///
/// `fraction` is in `[0, 1]`, or [`INDETERMINATE`] for stages without a
/// meaningful completion ratio.
pub trait ProgressSink {
    fn report(&self, stage: &str, fraction: f64);
}

/// Discards all progress updates.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _stage: &str, _fraction: f64) {}
}

/// Cooperative cancellation, polled by the engine at every progress point.
pub trait CancelToken {
    fn is_cancelled(&self) -> bool;
}

/// A token that never cancels.
pub struct NeverCancelled;

impl CancelToken for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A cloneable cancellation flag.
///
/// A host starting a new analysis while an older one is outstanding cancels
/// the older run by flipping its flag from any thread; the running analysis
/// observes it at its next progress point and returns
/// [`AnalysisError::Cancelled`](crate::AnalysisError::Cancelled).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed at the engine's next progress point.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl CancelToken for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_cancel_flag_is_shared_across_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());

        flag.cancel();
        assert!(clone.is_cancelled());
    }

    struct RecordingSink {
        seen: Mutex<Vec<(String, f64)>>,
    }

    impl ProgressSink for RecordingSink {
        fn report(&self, stage: &str, fraction: f64) {
            self.seen.lock().unwrap().push((stage.to_string(), fraction));
        }
    }

    #[test]
    fn test_sink_receives_reports() {
        let sink = RecordingSink {
            seen: Mutex::new(Vec::new()),
        };
        sink.report("sort", INDETERMINATE);
        sink.report("assemble", 0.5);

        let seen = sink.seen.into_inner().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("sort".to_string(), INDETERMINATE));
        assert_eq!(seen[1], ("assemble".to_string(), 0.5));
    }
}
