//! Serializable pipeline configuration.
//!
//! One TOML document names where rows come from and where the peak goes:
//!
//! ```toml
//! key = "prefix/stock_9.csv"
//!
//! [source]
//! type = "object_store"
//! root = "store"
//! bucket = "dagster"
//!
//! [cache]
//! type = "directory"
//! dir = "cache"
//!
//! [store]
//! type = "object_store"
//! root = "store"
//! bucket = "dagster"
//! prefix = "aggregations/"
//! ```
//!
//! `[cache]` and `[store]` default to in-memory when omitted. When loaded with
//! [`PipelineConfig::from_file`], relative `root`, `dir` and `base_dir` values
//! resolve against the config file's directory; `key` is never rewritten, so a
//! relative local-file key without `base_dir` resolves against the working
//! directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use stockpeak_core::data::validate_key;

const SAMPLE_KEY_DATE: &str = "2000-01-01";

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source identifier handed to the row source (file path or object key).
    pub key: String,

    pub source: SourceConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Where raw rows are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// CSV file on the local filesystem; relative keys resolve against `base_dir`.
    LocalFile {
        #[serde(default)]
        base_dir: Option<PathBuf>,
        #[serde(default)]
        has_headers: bool,
    },

    /// CSV object in a directory-backed bucket at `{root}/{bucket}/{key}`.
    ObjectStore {
        root: PathBuf,
        bucket: String,
        #[serde(default)]
        has_headers: bool,
    },
}

/// String cache that receives `date -> high`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheConfig {
    /// In-process cache, gone when the run ends.
    #[default]
    Memory,

    /// One file per key under `dir`.
    Directory { dir: PathBuf },

    /// No cache sink.
    Disabled,
}

/// Object store that receives the JSON result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory bucket.
    #[default]
    Memory,

    /// Directory-backed bucket; results land at `{prefix}{YYYY-MM-DD}.json`.
    ObjectStore {
        root: PathBuf,
        bucket: String,
        #[serde(default)]
        prefix: String,
    },

    /// No store sink.
    Disabled,
}

impl PipelineConfig {
    /// Local preset: read a CSV file, keep results in memory.
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            key: path.into(),
            source: SourceConfig::LocalFile {
                base_dir: None,
                has_headers: false,
            },
            cache: CacheConfig::Memory,
            store: StoreConfig::Memory,
        }
    }

    /// Object-store preset: read from and write to the same bucket, cache on disk.
    pub fn object_store(
        root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        key: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        let root = root.into();
        let bucket = bucket.into();
        Self {
            key: key.into(),
            source: SourceConfig::ObjectStore {
                root: root.clone(),
                bucket: bucket.clone(),
                has_headers: false,
            },
            cache: CacheConfig::Directory {
                dir: cache_dir.into(),
            },
            store: StoreConfig::ObjectStore {
                root,
                bucket,
                prefix: String::new(),
            },
        }
    }

    /// Load and validate a TOML config file.
    ///
    /// Relative directories are resolved against the file's own directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.rebase_dirs(base);
        }
        Ok(config)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Replace the source key, keeping everything else.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Join every relative directory onto `base`. The source key is left alone.
    fn rebase_dirs(&mut self, base: &Path) {
        match &mut self.source {
            SourceConfig::LocalFile { base_dir, .. } => {
                if let Some(dir) = base_dir {
                    rebase(dir, base);
                }
            }
            SourceConfig::ObjectStore { root, .. } => rebase(root, base),
        }
        if let CacheConfig::Directory { dir } = &mut self.cache {
            rebase(dir, base);
        }
        if let StoreConfig::ObjectStore { root, .. } = &mut self.store {
            rebase(root, base);
        }
    }

    /// Check every field that can be checked without touching the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key.trim().is_empty() {
            return Err(ConfigError::Invalid("key must not be empty".into()));
        }

        match &self.source {
            SourceConfig::LocalFile { base_dir, .. } => {
                if let Some(dir) = base_dir {
                    check_dir("source.base_dir", dir)?;
                }
            }
            SourceConfig::ObjectStore { root, bucket, .. } => {
                check_dir("source.root", root)?;
                check_bucket("source.bucket", bucket)?;
            }
        }

        if let CacheConfig::Directory { dir } = &self.cache {
            check_dir("cache.dir", dir)?;
        }

        if let StoreConfig::ObjectStore {
            root,
            bucket,
            prefix,
        } = &self.store
        {
            check_dir("store.root", root)?;
            check_bucket("store.bucket", bucket)?;
            check_prefix(prefix)?;
        }

        Ok(())
    }
}

fn rebase(dir: &mut PathBuf, base: &Path) {
    if dir.is_relative() {
        *dir = base.join(&*dir);
    }
}

fn check_dir(field: &str, dir: &Path) -> Result<(), ConfigError> {
    if dir.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

/// The prefix must yield valid object keys for every result date.
fn check_prefix(prefix: &str) -> Result<(), ConfigError> {
    let sample = format!("{prefix}{SAMPLE_KEY_DATE}.json");
    validate_key(&sample).map_err(|e| {
        ConfigError::Invalid(format!("store.prefix '{prefix}' gives bad object keys: {e}"))
    })
}

fn check_bucket(field: &str, bucket: &str) -> Result<(), ConfigError> {
    if bucket.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must not be empty")));
    }
    if bucket.contains('/') || bucket.contains('\\') || bucket == "." || bucket == ".." {
        return Err(ConfigError::Invalid(format!(
            "{field} '{bucket}' must be a single path segment"
        )));
    }
    Ok(())
}
