//! PeakResult — the day with the highest "high" across a batch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::PriceRecord;

/// Date format used for string keys handed to sinks.
pub const KEY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Aggregated peak of a batch of price records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakResult {
    pub date: NaiveDate,
    pub high: f64,
}

impl PeakResult {
    pub fn new(date: NaiveDate, high: f64) -> Self {
        Self { date, high }
    }

    /// Stable string key for string-keyed stores: `YYYY-MM-DD`.
    pub fn cache_key(&self) -> String {
        self.date.format(KEY_DATE_FORMAT).to_string()
    }

    /// Stable string value: shortest representation that round-trips the `f64`.
    pub fn cache_value(&self) -> String {
        self.high.to_string()
    }
}

impl From<&PriceRecord> for PeakResult {
    fn from(record: &PriceRecord) -> Self {
        Self::new(record.date, record.high)
    }
}

impl fmt::Display for PeakResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} high={}", self.cache_key(), self.high)
    }
}
