//! Pipeline — wires a row source, the parser, the aggregator and result sinks.
//!
//! Stages, in order:
//! 1. fetch raw rows from the source
//! 2. parse every row (fail-fast)
//! 3. aggregate to a single peak
//! 4. deliver the peak to every sink
//!
//! Collaborators are passed in explicitly; `from_config` is a convenience that
//! builds them from a [`PipelineConfig`]. Sinks are independent: every sink is
//! attempted even when an earlier one fails, and all failures are reported.

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use stockpeak_core::data::{
    DirectoryCache, LocalFileSource, MemoryCache, ObjectStore, ObjectStoreSink, ResultSink,
    RowSource, SinkError, SourceError,
};
use stockpeak_core::{find_peak, parse_rows, AggregateError, BatchError, PeakResult};

use crate::config::{CacheConfig, ConfigError, PipelineConfig, SourceConfig, StoreConfig};

/// Errors from a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("parse error: {0}")]
    Parse(#[from] BatchError),

    #[error("aggregation error: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("{} sink(s) failed: {}", .failures.len(), describe_failures(.failures))]
    Sink { failures: Vec<(String, SinkError)> },
}

fn describe_failures(failures: &[(String, SinkError)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{name}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub key: String,
    pub source: String,
    pub row_count: usize,
    pub peak: PeakResult,
    pub sinks_written: Vec<String>,
    /// Records whose OHLC ordering is off; accepted, only counted.
    pub inconsistent_records: usize,
}

/// Row source plus the sinks that receive its peak.
pub struct Pipeline {
    source: Box<dyn RowSource>,
    sinks: Vec<Box<dyn ResultSink>>,
}

impl Pipeline {
    pub fn new(source: Box<dyn RowSource>) -> Self {
        Self {
            source,
            sinks: Vec::new(),
        }
    }

    /// Add a sink. Sinks receive the result in the order they were added.
    pub fn with_sink(mut self, sink: Box<dyn ResultSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Build the source and sinks described by `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let mut pipeline = Self::new(build_source(&config.source));

        match &config.cache {
            CacheConfig::Memory => pipeline = pipeline.with_sink(Box::new(MemoryCache::new())),
            CacheConfig::Directory { dir } => {
                pipeline = pipeline.with_sink(Box::new(DirectoryCache::new(dir)))
            }
            CacheConfig::Disabled => {}
        }

        match &config.store {
            StoreConfig::Memory => {
                let store = Arc::new(ObjectStore::in_memory("results"));
                pipeline = pipeline.with_sink(Box::new(ObjectStoreSink::new(store)));
            }
            StoreConfig::ObjectStore {
                root,
                bucket,
                prefix,
            } => {
                let store = Arc::new(ObjectStore::directory(root, bucket.clone()));
                pipeline = pipeline
                    .with_sink(Box::new(ObjectStoreSink::new(store).with_prefix(prefix.clone())));
            }
            StoreConfig::Disabled => {}
        }

        Ok(pipeline)
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Run every stage for one source key.
    pub fn run(&self, key: &str) -> Result<RunReport, PipelineError> {
        info!("fetching rows for '{key}' from {}", self.source.name());
        let rows = self.source.fetch_rows(key)?;
        debug!("fetched {} rows for '{key}'", rows.len());

        let records = parse_rows(&rows)?;
        let inconsistent_records = records.iter().filter(|r| !r.is_consistent()).count();
        if inconsistent_records > 0 {
            warn!("'{key}': {inconsistent_records} record(s) have inconsistent OHLC ordering");
        }

        let peak = find_peak(&records)?;
        info!("'{key}': peak {peak} across {} records", records.len());

        let sinks_written = self.deliver(&peak)?;

        Ok(RunReport {
            key: key.to_string(),
            source: self.source.name().to_string(),
            row_count: rows.len(),
            peak,
            sinks_written,
            inconsistent_records,
        })
    }

    /// Run independent keys in parallel. Results come back in key order.
    pub fn run_many<S: AsRef<str> + Sync>(
        &self,
        keys: &[S],
    ) -> Vec<(String, Result<RunReport, PipelineError>)> {
        keys.par_iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_string(), self.run(key))
            })
            .collect()
    }

    fn deliver(&self, peak: &PeakResult) -> Result<Vec<String>, PipelineError> {
        let mut written = Vec::with_capacity(self.sinks.len());
        let mut failures = Vec::new();

        for sink in &self.sinks {
            match sink.put(peak) {
                Ok(()) => {
                    debug!("wrote {} to {}", peak.cache_key(), sink.name());
                    written.push(sink.name().to_string());
                }
                Err(e) => {
                    warn!("sink {} failed: {e}", sink.name());
                    failures.push((sink.name().to_string(), e));
                }
            }
        }

        if failures.is_empty() {
            Ok(written)
        } else {
            Err(PipelineError::Sink { failures })
        }
    }
}

fn build_source(config: &SourceConfig) -> Box<dyn RowSource> {
    match config {
        SourceConfig::LocalFile {
            base_dir,
            has_headers,
        } => {
            let mut source = LocalFileSource::new().with_headers(*has_headers);
            if let Some(dir) = base_dir {
                source = source.with_base_dir(dir);
            }
            Box::new(source)
        }
        SourceConfig::ObjectStore {
            root,
            bucket,
            has_headers,
        } => Box::new(ObjectStore::directory(root, bucket.clone()).with_headers(*has_headers)),
    }
}
