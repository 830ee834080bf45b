//! Peak aggregator — reduce price records to the day with the highest `high`.
//!
//! Single pass, O(1) state. On ties the first record in input order wins;
//! a tie never produces more than one date.

use thiserror::Error;

use crate::domain::{PeakResult, PriceRecord};
use crate::parse::{records, BatchError};

/// Aggregation over zero records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("cannot aggregate an empty set of price records")]
    EmptyInput,
}

/// Failure of the combined parse-and-aggregate pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeakError {
    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Running maximum over a stream of records.
#[derive(Debug, Clone, Default)]
pub struct PeakTracker {
    best: Option<PeakResult>,
    count: usize,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one record. Only a strictly greater `high` replaces the current best.
    pub fn observe(&mut self, record: &PriceRecord) {
        self.count += 1;
        let replace = match &self.best {
            None => true,
            // NaN never wins over a number
            Some(best) => record.high > best.high || (best.high.is_nan() && !record.high.is_nan()),
        };
        if replace {
            self.best = Some(PeakResult::from(record));
        }
    }

    /// Best result so far, if any record has been observed.
    pub fn current(&self) -> Option<PeakResult> {
        self.best
    }

    /// Number of records observed.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn finish(self) -> Result<PeakResult, AggregateError> {
        self.best.ok_or(AggregateError::EmptyInput)
    }
}

/// Find the record with the maximum `high`.
pub fn find_peak<'a, I>(records: I) -> Result<PeakResult, AggregateError>
where
    I: IntoIterator<Item = &'a PriceRecord>,
{
    let mut tracker = PeakTracker::new();
    for record in records {
        tracker.observe(record);
    }
    tracker.finish()
}

/// Parse raw rows and aggregate them in one pass without collecting records.
///
/// Fails fast on the first bad row, exactly like [`crate::parse::parse_rows`].
pub fn peak_of_rows<I, R, S>(rows: I) -> Result<PeakResult, PeakError>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut tracker = PeakTracker::new();
    for record in records(rows) {
        tracker.observe(&record?);
    }
    Ok(tracker.finish()?)
}
