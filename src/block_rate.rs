//!
//! Block production rate over the lifetime of the monitor.
//!
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Observed `(block, time)` pairs, oldest first
#[derive(Debug, Clone, Default)]
pub struct BlockRate {
    samples: VecDeque<(u64, DateTime<Utc>)>,
    max_samples: Option<usize>,
}

impl BlockRate {
    /// Unbounded sample buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_samples` samples, dropping the oldest first
    #[must_use]
    pub fn bounded(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            max_samples: Some(max_samples.max(2)),
        }
    }

    /// Record the block seen at `time`
    pub fn record(&mut self, block: u64, time: DateTime<Utc>) {
        self.samples.push_back((block, time));
        if let Some(max) = self.max_samples {
            while self.samples.len() > max {
                self.samples.pop_front();
            }
        }
    }

    /// Number of samples retained
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// No samples recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Blocks per second between the first and last sample, 0 if the span is empty
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn blocks_per_second(&self) -> f64 {
        let (Some((first_block, first_time)), Some((last_block, last_time))) =
            (self.samples.front(), self.samples.back())
        else {
            return 0.0;
        };

        let elapsed = (*last_time - *first_time).num_milliseconds() as f64 / 1000.0;
        if elapsed == 0.0 {
            return 0.0;
        }

        (i128::from(*last_block) - i128::from(*first_block)) as f64 / elapsed
    }
}
