//! Result sinks: where a computed [`PeakResult`] ends up.
//!
//! - `MemoryCache`: string key/value cache held in process
//! - `DirectoryCache`: string key/value cache persisted one file per key
//! - `ObjectStoreSink`: JSON document per result in an [`ObjectStore`]
//!
//! String-keyed sinks store `peak.cache_key() -> peak.cache_value()`.
//! Every sink overwrites: the last write for a date wins.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::object_store::{validate_key, write_atomic, ObjectMeta, ObjectStore, StoreError};
use crate::domain::PeakResult;

/// Errors raised while delivering a result.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("invalid cache key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("I/O error writing '{key}': {reason}")]
    Io { key: String, reason: String },

    #[error("serialization failed: {0}")]
    Serialize(String),

    #[error("object store error: {0}")]
    Store(#[from] StoreError),
}

/// Trait for result destinations.
pub trait ResultSink: Send + Sync {
    /// Human-readable name of this sink.
    fn name(&self) -> &str;

    /// Deliver one result.
    fn put(&self, peak: &PeakResult) -> Result<(), SinkError>;
}

impl<T: ResultSink + ?Sized> ResultSink for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn put(&self, peak: &PeakResult) -> Result<(), SinkError> {
        (**self).put(peak)
    }
}

/// In-process string cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `name`, replacing any previous value.
    pub fn put_data(&self, name: &str, value: &str) {
        self.lock().insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of all entries, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort();
        entries
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ResultSink for MemoryCache {
    fn name(&self) -> &str {
        "memory_cache"
    }

    fn put(&self, peak: &PeakResult) -> Result<(), SinkError> {
        self.put_data(&peak.cache_key(), &peak.cache_value());
        Ok(())
    }
}

/// String cache persisted as `{dir}/{key}`, one file per entry.
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    dir: PathBuf,
}

impl DirectoryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store `value` under `name` atomically.
    pub fn put_data(&self, name: &str, value: &str) -> Result<(), SinkError> {
        let path = self.entry_path(name)?;
        write_atomic(&path, value.as_bytes()).map_err(|e| SinkError::Io {
            key: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Read back a value. `Ok(None)` when nothing is stored under `name`.
    pub fn get(&self, name: &str) -> Result<Option<String>, SinkError> {
        let path = self.entry_path(name)?;
        match fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SinkError::Io {
                key: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf, SinkError> {
        let invalid = |reason: String| SinkError::InvalidKey {
            key: name.to_string(),
            reason,
        };
        validate_key(name).map_err(|e| invalid(e.to_string()))?;
        if name.contains('/') {
            return Err(invalid("cache keys are flat".into()));
        }
        Ok(self.dir.join(name))
    }
}

impl ResultSink for DirectoryCache {
    fn name(&self) -> &str {
        "directory_cache"
    }

    fn put(&self, peak: &PeakResult) -> Result<(), SinkError> {
        self.put_data(&peak.cache_key(), &peak.cache_value())
    }
}

/// Writes each result as a JSON object keyed by its date.
#[derive(Debug, Clone)]
pub struct ObjectStoreSink {
    store: Arc<ObjectStore>,
    prefix: String,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self {
            store,
            prefix: String::new(),
        }
    }

    /// Prepend `prefix` to every generated key (e.g. `"aggregations/"`).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Object key a result is written to: `{prefix}{YYYY-MM-DD}.json`.
    pub fn object_key(&self, peak: &PeakResult) -> String {
        format!("{}{}.json", self.prefix, peak.cache_key())
    }

    /// Write a result and return the stored object's metadata.
    pub fn write(&self, peak: &PeakResult) -> Result<ObjectMeta, SinkError> {
        let body =
            serde_json::to_vec_pretty(peak).map_err(|e| SinkError::Serialize(e.to_string()))?;
        Ok(self.store.put_object(&self.object_key(peak), &body)?)
    }

    /// Read a previously written result back.
    pub fn read(&self, peak_date_key: &str) -> Result<PeakResult, SinkError> {
        let key = format!("{}{peak_date_key}.json", self.prefix);
        let body = self.store.get_object(&key)?;
        serde_json::from_slice(&body).map_err(|e| SinkError::Serialize(e.to_string()))
    }
}

impl ResultSink for ObjectStoreSink {
    fn name(&self) -> &str {
        "object_store"
    }

    fn put(&self, peak: &PeakResult) -> Result<(), SinkError> {
        self.write(peak).map(|_| ())
    }
}
