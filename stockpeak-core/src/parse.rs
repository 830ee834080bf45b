//! Row parser — raw six-column text rows into [`PriceRecord`]s.
//!
//! Column order is fixed: `date, close, volume, open, high, low`.
//! - `date` must be `YYYY/MM/DD`
//! - prices must be finite decimals
//! - `volume` is read as a number and truncated toward zero, so `"1234.0"` is accepted
//!
//! Parsing is pure. Batches fail fast on the first bad row.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

use crate::domain::PriceRecord;

/// Number of columns in a raw row.
pub const COLUMN_COUNT: usize = 6;

/// Date format of the first column.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// A column of the raw row, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Date,
    Close,
    Volume,
    Open,
    High,
    Low,
}

impl Column {
    /// All columns in the order they appear in a row.
    pub const ORDER: [Column; COLUMN_COUNT] = [
        Column::Date,
        Column::Close,
        Column::Volume,
        Column::Open,
        Column::High,
        Column::Low,
    ];

    /// Zero-based position within the row.
    pub fn index(self) -> usize {
        match self {
            Column::Date => 0,
            Column::Close => 1,
            Column::Volume => 2,
            Column::Open => 3,
            Column::High => 4,
            Column::Low => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Close => "close",
            Column::Volume => "volume",
            Column::Open => "open",
            Column::High => "high",
            Column::Low => "low",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column {} ({})", self.index(), self.name())
    }
}

/// Why a single row could not become a record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("expected {expected} columns, found {found}")]
    Shape { expected: usize, found: usize },

    #[error("{column}: cannot parse {value:?}: {reason}")]
    Parse {
        column: Column,
        value: String,
        reason: String,
    },
}

impl RecordError {
    pub fn is_shape(&self) -> bool {
        matches!(self, RecordError::Shape { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, RecordError::Parse { .. })
    }

    fn parse(column: Column, value: &str, reason: impl Into<String>) -> Self {
        RecordError::Parse {
            column,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// A row-level failure inside a batch, tagged with its 1-based row number.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("row {row}: {source}")]
pub struct BatchError {
    pub row: usize,
    #[source]
    pub source: RecordError,
}

/// Parse one raw row.
pub fn parse_row<S: AsRef<str>>(fields: &[S]) -> Result<PriceRecord, RecordError> {
    if fields.len() != COLUMN_COUNT {
        return Err(RecordError::Shape {
            expected: COLUMN_COUNT,
            found: fields.len(),
        });
    }

    Ok(PriceRecord {
        date: parse_date(field(fields, Column::Date))?,
        close: parse_price(Column::Close, field(fields, Column::Close))?,
        volume: parse_volume(field(fields, Column::Volume))?,
        open: parse_price(Column::Open, field(fields, Column::Open))?,
        high: parse_price(Column::High, field(fields, Column::High))?,
        low: parse_price(Column::Low, field(fields, Column::Low))?,
    })
}

/// Lazily parse a sequence of rows, preserving order.
///
/// Each item carries its 1-based row number on failure. Nothing is buffered,
/// so very large inputs can be streamed straight into an aggregator.
pub fn records<I, R, S>(rows: I) -> impl Iterator<Item = Result<PriceRecord, BatchError>>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    rows.into_iter().enumerate().map(|(i, row)| {
        parse_row(row.as_ref()).map_err(|source| BatchError { row: i + 1, source })
    })
}

/// Parse a whole batch, aborting on the first bad row.
pub fn parse_rows<I, R, S>(rows: I) -> Result<Vec<PriceRecord>, BatchError>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    records(rows).collect()
}

fn field<S: AsRef<str>>(fields: &[S], column: Column) -> &str {
    fields[column.index()].as_ref()
}

fn parse_date(raw: &str) -> Result<NaiveDate, RecordError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| RecordError::parse(Column::Date, raw, format!("expected YYYY/MM/DD ({e})")))
}

fn parse_price(column: Column, raw: &str) -> Result<f64, RecordError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| RecordError::parse(column, raw, format!("{e}")))?;
    if !value.is_finite() {
        return Err(RecordError::parse(column, raw, "price must be finite"));
    }
    Ok(value)
}

fn parse_volume(raw: &str) -> Result<u64, RecordError> {
    let trimmed = raw.trim();
    // Exact integer path first: large volumes lose precision through f64.
    if let Ok(volume) = trimmed.parse::<u64>() {
        return Ok(volume);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|e| RecordError::parse(Column::Volume, raw, format!("{e}")))?;
    if !value.is_finite() {
        return Err(RecordError::parse(Column::Volume, raw, "volume must be finite"));
    }
    let truncated = value.trunc();
    if truncated < 0.0 {
        return Err(RecordError::parse(Column::Volume, raw, "volume must not be negative"));
    }
    if truncated >= u64::MAX as f64 {
        return Err(RecordError::parse(Column::Volume, raw, "volume out of range"));
    }
    Ok(truncated as u64)
}
