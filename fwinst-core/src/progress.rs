//! A lock-free percentage shared between the install worker and an observer.
use std::sync::atomic::{AtomicU32, Ordering};

/// The highest value a progress report can carry.
pub const MAX_PERCENT: u32 = 100;

/// A monotonically non-decreasing completion percentage.
///
/// The worker pushes values with [`Progress::report`] and the observer reads
/// them with [`Progress::read`]. Neither side ever blocks the other: the
/// value lives in a single atomic, so a reader can never see a torn write.
///
/// Reports above [`MAX_PERCENT`] are clamped, and a report lower than the
/// current value is ignored, so any sequence of reads taken while the worker
/// runs is non-decreasing.
#[derive(Debug, Default)]
pub struct Progress {
    percent: AtomicU32,
}

impl Progress {
    /// Creates a channel at 0%.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` and returns the percentage now in effect.
    pub fn report(&self, value: u32) -> u32 {
        let value = value.min(MAX_PERCENT);
        let previous = self.percent.fetch_max(value, Ordering::AcqRel);
        previous.max(value)
    }

    /// Returns the last reported percentage.
    pub fn read(&self) -> u32 {
        self.percent.load(Ordering::Acquire)
    }

    pub(crate) fn reset(&self) {
        self.percent.store(0, Ordering::Release);
    }
}
