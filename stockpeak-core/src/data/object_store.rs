//! Bucket-scoped object store.
//!
//! Two backends:
//! - in-memory, for local runs and tests
//! - directory, objects at `{root}/{bucket}/{key}`
//!
//! Directory writes are atomic (write to .tmp, rename into place). Every
//! stored object gets a BLAKE3 etag of its body.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

use super::source::{read_csv_rows, RawRow, RowSource, SourceError};

const TMP_SUFFIX: &str = ".tmp";

/// Errors from object store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("no object '{key}' in bucket '{bucket}'")]
    NotFound { bucket: String, key: String },

    #[error("I/O error on '{key}': {reason}")]
    Io { key: String, reason: String },
}

/// Metadata returned for a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub etag: String,
}

impl ObjectMeta {
    fn for_body(key: &str, body: &[u8]) -> Self {
        Self {
            key: key.to_string(),
            size: body.len() as u64,
            etag: blake3::hash(body).to_hex().to_string(),
        }
    }
}

#[derive(Debug)]
enum Backend {
    Memory(RwLock<BTreeMap<String, Vec<u8>>>),
    Directory(PathBuf),
}

/// A single bucket of objects.
#[derive(Debug)]
pub struct ObjectStore {
    bucket: String,
    backend: Backend,
    has_headers: bool,
}

impl ObjectStore {
    /// An empty bucket held in memory.
    pub fn in_memory(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            backend: Backend::Memory(RwLock::new(BTreeMap::new())),
            has_headers: false,
        }
    }

    /// A bucket stored under `{root}/{bucket}/`.
    pub fn directory(root: impl AsRef<Path>, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let dir = root.as_ref().join(&bucket);
        Self {
            bucket,
            backend: Backend::Directory(dir),
            has_headers: false,
        }
    }

    /// Treat the first line of CSV objects as a header when fetching rows.
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store `body` under `key`, replacing any existing object.
    pub fn put_object(&self, key: &str, body: &[u8]) -> Result<ObjectMeta, StoreError> {
        validate_key(key)?;
        match &self.backend {
            Backend::Memory(objects) => {
                let mut objects = objects.write().unwrap_or_else(|e| e.into_inner());
                objects.insert(key.to_string(), body.to_vec());
            }
            Backend::Directory(dir) => {
                let path = dir.join(key);
                write_atomic(&path, body).map_err(|e| io_error(key, e))?;
            }
        }
        Ok(ObjectMeta::for_body(key, body))
    }

    /// Read the body stored under `key`.
    pub fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        validate_key(key)?;
        match &self.backend {
            Backend::Memory(objects) => {
                let objects = objects.read().unwrap_or_else(|e| e.into_inner());
                objects.get(key).cloned().ok_or_else(|| self.not_found(key))
            }
            Backend::Directory(dir) => fs::read(dir.join(key)).map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    self.not_found(key)
                } else {
                    io_error(key, e)
                }
            }),
        }
    }

    /// Metadata of a stored object.
    pub fn head(&self, key: &str) -> Result<ObjectMeta, StoreError> {
        let body = self.get_object(key)?;
        Ok(ObjectMeta::for_body(key, &body))
    }

    pub fn contains(&self, key: &str) -> bool {
        if validate_key(key).is_err() {
            return false;
        }
        match &self.backend {
            Backend::Memory(objects) => objects
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .contains_key(key),
            Backend::Directory(dir) => dir.join(key).is_file(),
        }
    }

    /// Keys starting with `prefix`, sorted.
    pub fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = match &self.backend {
            Backend::Memory(objects) => objects
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect(),
            Backend::Directory(dir) => {
                let mut keys = Vec::new();
                if dir.exists() {
                    collect_keys(dir, dir, &mut keys).map_err(|e| io_error(prefix, e))?;
                }
                keys.retain(|k| k.starts_with(prefix));
                keys
            }
        };
        keys.sort();
        Ok(keys)
    }

    /// Remove an object. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        match &self.backend {
            Backend::Memory(objects) => Ok(objects
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(key)
                .is_some()),
            Backend::Directory(dir) => match fs::remove_file(dir.join(key)) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(io_error(key, e)),
            },
        }
    }

    fn not_found(&self, key: &str) -> StoreError {
        StoreError::NotFound {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        }
    }
}

impl RowSource for ObjectStore {
    fn name(&self) -> &str {
        "object_store"
    }

    fn fetch_rows(&self, key: &str) -> Result<Vec<RawRow>, SourceError> {
        let body = self.get_object(key).map_err(|e| match e {
            StoreError::NotFound { key, .. } => SourceError::NotFound { key },
            other => SourceError::Store(other),
        })?;
        read_csv_rows(body.as_slice(), self.has_headers).map_err(|e| SourceError::Csv {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Reject keys that could escape the bucket or that name a directory.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(invalid("key must be a relative '/'-separated path"));
    }
    for segment in key.split('/') {
        if segment.is_empty() {
            return Err(invalid("key has an empty segment"));
        }
        if segment == "." || segment == ".." {
            return Err(invalid("key must not contain '.' or '..' segments"));
        }
        if segment.ends_with(TMP_SUFFIX) {
            return Err(invalid("'.tmp' suffix is reserved"));
        }
    }
    Ok(())
}

/// Write to a uniquely named `.tmp` sibling then rename into place, creating parent dirs.
pub(crate) fn write_atomic(path: &Path, body: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    // unique per write so concurrent writers of one key never share a temp file
    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(TMP_SUFFIX)
        .tempfile_in(parent)?;
    tmp.write_all(body)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn collect_keys(root: &Path, dir: &Path, keys: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_keys(root, &path, keys)?;
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !key.ends_with(TMP_SUFFIX) {
            keys.push(key);
        }
    }
    Ok(())
}

fn io_error(key: &str, e: io::Error) -> StoreError {
    StoreError::Io {
        key: key.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backends(dir: &Path) -> Vec<ObjectStore> {
        vec![
            ObjectStore::in_memory("dagster"),
            ObjectStore::directory(dir, "dagster"),
        ]
    }

    #[test]
    fn put_then_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        for store in backends(dir.path()) {
            let meta = store.put_object("prefix/stock.csv", b"a,b,c").unwrap();
            assert_eq!(meta.size, 5);
            assert_eq!(meta.etag, blake3::hash(b"a,b,c").to_hex().to_string());
            assert_eq!(store.get_object("prefix/stock.csv").unwrap(), b"a,b,c");
            assert_eq!(store.head("prefix/stock.csv").unwrap(), meta);
        }
    }

    #[test]
    fn put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        for store in backends(dir.path()) {
            store.put_object("k", b"one").unwrap();
            store.put_object("k", b"two").unwrap();
            assert_eq!(store.get_object("k").unwrap(), b"two");
        }
    }

    #[test]
    fn concurrent_puts_of_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::directory(dir.path(), "dagster");
        let shared = &store;

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(move || {
                    for _ in 0..100 {
                        shared.put_object("out/2021-01-04.json", b"{}").unwrap();
                    }
                });
            }
        });

        assert_eq!(store.list("").unwrap(), vec!["out/2021-01-04.json"]);
        assert_eq!(store.get_object("out/2021-01-04.json").unwrap(), b"{}");
    }

    #[test]
    fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        for store in backends(dir.path()) {
            match store.get_object("nope") {
                Err(StoreError::NotFound { bucket, key }) => {
                    assert_eq!(bucket, "dagster");
                    assert_eq!(key, "nope");
                }
                other => panic!("expected NotFound, got {other:?}"),
            }
            assert!(!store.contains("nope"));
        }
    }

    #[test]
    fn list_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for store in backends(dir.path()) {
            store.put_object("b/2", b"x").unwrap();
            store.put_object("a/1", b"x").unwrap();
            store.put_object("b/1", b"x").unwrap();
            assert_eq!(store.list("").unwrap(), vec!["a/1", "b/1", "b/2"]);
            assert_eq!(store.list("b/").unwrap(), vec!["b/1", "b/2"]);
        }
    }

    #[test]
    fn delete_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        for store in backends(dir.path()) {
            store.put_object("k", b"x").unwrap();
            assert!(store.delete("k").unwrap());
            assert!(!store.delete("k").unwrap());
            assert!(!store.contains("k"));
        }
    }

    #[test]
    fn directory_layout_is_root_bucket_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::directory(dir.path(), "dagster");
        store.put_object("prefix/stock.csv", b"x").unwrap();
        assert!(dir.path().join("dagster/prefix/stock.csv").is_file());
        assert!(!dir.path().join("dagster/prefix/stock.csv.tmp").exists());
    }

    #[test]
    fn unsafe_keys_are_rejected() {
        let store = ObjectStore::in_memory("dagster");
        for key in ["", "/abs", "a/../b", "a//b", "./a", "a\\b", "x.tmp"] {
            assert!(
                matches!(store.put_object(key, b"x"), Err(StoreError::InvalidKey { .. })),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn fetch_rows_parses_csv_body() {
        let store = ObjectStore::in_memory("dagster");
        store
            .put_object("stock.csv", b"2021/01/04,130.92,143301900,133.52,131.74,126.76\n")
            .unwrap();
        let rows = store.fetch_rows("stock.csv").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][4], "131.74");
    }

    #[test]
    fn fetch_rows_honours_headers() {
        let store = ObjectStore::in_memory("dagster").with_headers(true);
        store
            .put_object("stock.csv", b"date,close,volume,open,high,low\n2021/01/04,1,2,3,4,5\n")
            .unwrap();
        assert_eq!(store.fetch_rows("stock.csv").unwrap().len(), 1);
    }

    #[test]
    fn fetch_rows_missing_key_is_source_not_found() {
        let store = ObjectStore::in_memory("dagster");
        assert!(matches!(
            store.fetch_rows("missing.csv"),
            Err(SourceError::NotFound { .. })
        ));
    }
}
