//! stockpeak runner — configuration and pipeline composition.
//!
//! This crate builds on `stockpeak-core` to provide:
//! - Typed TOML configuration (source kind, cache and store sinks)
//! - An explicit pipeline: fetch rows, parse, aggregate, deliver to sinks
//! - Run reports and parallel runs over independent keys

pub mod config;
pub mod pipeline;

pub use config::{CacheConfig, ConfigError, PipelineConfig, SourceConfig, StoreConfig};
pub use pipeline::{Pipeline, PipelineError, RunReport};
