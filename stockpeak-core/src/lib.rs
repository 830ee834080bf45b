//! stockpeak core — price records, row parser, peak aggregator, sources and sinks.
//!
//! This crate holds the pure computation and the collaborator contracts:
//! - Domain types (price records, peak results)
//! - Row parser: six text columns into a typed record, fail-fast batches
//! - Peak aggregator: single-pass maximum with first-occurrence tie-break
//! - Row sources (local CSV files, object store) and result sinks (caches, object store)
//!
//! Parsing and aggregation never log and never perform I/O.

pub mod aggregate;
pub mod data;
pub mod domain;
pub mod parse;

pub use aggregate::{find_peak, peak_of_rows, AggregateError, PeakError, PeakTracker};
pub use domain::{PeakResult, PriceRecord};
pub use parse::{parse_row, parse_rows, records, BatchError, Column, RecordError};
