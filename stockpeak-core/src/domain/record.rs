//! PriceRecord — one trading day of price data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV record for a single stock.
///
/// Built by the row parser, which only enforces per-column type conversion.
/// Cross-field ordering (`low <= open/close <= high`) is not checked on
/// construction; use [`PriceRecord::is_consistent`] when a caller cares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceRecord {
    /// OHLC ordering check: high is the maximum and low the minimum of the day.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}
