//! Row sources and structured error types.
//!
//! The RowSource trait abstracts over where raw rows come from (a local CSV
//! file, an object store) so the pipeline can swap implementations and tests
//! can use in-memory fixtures. Sources only split text into rows; turning rows
//! into records is the parser's job.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::object_store::StoreError;

/// One raw row: ordered text fields, not yet validated.
pub type RawRow = Vec<String>;

/// Errors raised while fetching rows.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source '{key}' not found")]
    NotFound { key: String },

    #[error("I/O error reading '{key}': {reason}")]
    Io { key: String, reason: String },

    #[error("malformed CSV in '{key}': {reason}")]
    Csv { key: String, reason: String },

    #[error("object store error: {0}")]
    Store(#[from] StoreError),
}

/// Trait for anything that can hand out raw rows for a key.
pub trait RowSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch every row stored under `key`, in order.
    fn fetch_rows(&self, key: &str) -> Result<Vec<RawRow>, SourceError>;
}

impl<T: RowSource + ?Sized> RowSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_rows(&self, key: &str) -> Result<Vec<RawRow>, SourceError> {
        (**self).fetch_rows(key)
    }
}

/// Split CSV text into raw rows.
///
/// The reader is flexible: ragged rows come through as-is so the parser can
/// report them as shape errors with a row number. Blank lines are skipped.
pub fn read_csv_rows<R: Read>(reader: R, has_headers: bool) -> Result<Vec<RawRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

/// CSV files on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSource {
    base_dir: Option<PathBuf>,
    has_headers: bool,
}

impl LocalFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative keys against `base_dir`.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Skip the first line of every file.
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    /// Path a key resolves to.
    pub fn resolve(&self, key: &str) -> PathBuf {
        let path = Path::new(key);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl RowSource for LocalFileSource {
    fn name(&self) -> &str {
        "local_file"
    }

    fn fetch_rows(&self, key: &str) -> Result<Vec<RawRow>, SourceError> {
        let path = self.resolve(key);
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SourceError::NotFound {
                key: path.display().to_string(),
            },
            _ => SourceError::Io {
                key: path.display().to_string(),
                reason: e.to_string(),
            },
        })?;

        read_csv_rows(file, self.has_headers).map_err(|e| SourceError::Csv {
            key: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SAMPLE: &str = "2021/01/04,130.92,143301900,133.52,131.74,126.76\n\
                          2021/01/05,131.01,97664900,128.90,131.74,128.43\n";

    #[test]
    fn reads_rows_without_headers() {
        let rows = read_csv_rows(SAMPLE.as_bytes(), false).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "2021/01/04");
        assert_eq!(rows[1][4], "131.74");
    }

    #[test]
    fn header_line_is_skipped_when_requested() {
        let text = format!("date,close,volume,open,high,low\n{SAMPLE}");
        let rows = read_csv_rows(text.as_bytes(), true).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "2021/01/04");
    }

    #[test]
    fn ragged_rows_pass_through() {
        let text = "2021/01/04,1,2,3,4,5\n2021/01/05,1,2\n";
        let rows = read_csv_rows(text.as_bytes(), false).unwrap();
        assert_eq!(rows[0].len(), 6);
        assert_eq!(rows[1].len(), 3);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let text = "2021/01/04,1,2,3,4,5\n\n2021/01/05,1,2,3,4,5\n";
        let rows = read_csv_rows(text.as_bytes(), false).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn local_file_source_reads_relative_to_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stock.csv"), SAMPLE).unwrap();

        let source = LocalFileSource::new().with_base_dir(dir.path());
        let rows = source.fetch_rows("stock.csv").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(source.name(), "local_file");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalFileSource::new().with_base_dir(dir.path());
        match source.fetch_rows("missing.csv") {
            Err(SourceError::NotFound { key }) => assert!(key.ends_with("missing.csv")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn absolute_key_ignores_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abs.csv");
        fs::write(&path, SAMPLE).unwrap();

        let source = LocalFileSource::new().with_base_dir("/nonexistent");
        let rows = source.fetch_rows(path.to_str().unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
