//! Content-addressed index of scanned files.
//!
//! `by_hash` is the authoritative store, `by_path` an alias view mapping every
//! known path to the hash of its record. A path is registered in `by_path`
//! only while the shard lock of its `by_hash` entry is held, so both views
//! change together. Lock order is always `by_hash` then `by_path`; readers
//! never hold a `by_path` guard while touching `by_hash`.

mod persist;
mod record;

pub use record::{format_capture_date, parse_capture_date, FileMetadata};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

use crate::error::{Error, Result};
use crate::hasher;
use crate::media::{CaptureTime, ExifCaptureTime};

/// Exactly one way to find a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey<'a> {
    Hash(&'a str),
    Path(&'a Path),
}

impl<'a> LookupKey<'a> {
    /// Builds a key from optional parts, as a command line supplies them.
    /// Both or neither is a contract violation.
    pub fn from_parts(hash: Option<&'a str>, path: Option<&'a Path>) -> Result<Self> {
        match (hash, path) {
            (Some(hash), None) => Ok(LookupKey::Hash(hash)),
            (None, Some(path)) => Ok(LookupKey::Path(path)),
            (Some(_), Some(_)) => Err(Error::Contract(
                "lookup given both a hash and a path".to_string(),
            )),
            (None, None) => Err(Error::Contract(
                "lookup given neither a hash nor a path".to_string(),
            )),
        }
    }
}

/// What `record_file` did with a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// The path was already in the index.
    Known,
    /// First path seen with this content.
    NewContent { hash: String },
    /// Another path already holds this content.
    Duplicate { hash: String },
}

pub struct ContentIndex {
    by_hash: DashMap<String, FileMetadata>,
    by_path: DashMap<PathBuf, String>,
    capture_time: Arc<dyn CaptureTime>,
}

impl std::fmt::Debug for ContentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentIndex")
            .field("by_hash", &self.by_hash)
            .field("by_path", &self.by_path)
            .finish_non_exhaustive()
    }
}

impl Default for ContentIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::with_capture_time(Arc::new(ExifCaptureTime))
    }

    pub fn with_capture_time(capture_time: Arc<dyn CaptureTime>) -> Self {
        Self {
            by_hash: DashMap::new(),
            by_path: DashMap::new(),
            capture_time,
        }
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn path_count(&self) -> usize {
        self.by_path.len()
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn lookup(&self, key: LookupKey<'_>) -> Option<FileMetadata> {
        match key {
            LookupKey::Hash(hash) => self.by_hash.get(hash).map(|r| r.value().clone()),
            LookupKey::Path(path) => {
                let hash = self.by_path.get(path).map(|h| h.value().clone())?;
                self.by_hash.get(&hash).map(|r| r.value().clone())
            }
        }
    }

    pub fn lookup_hash(&self, hash: &str) -> Option<FileMetadata> {
        self.lookup(LookupKey::Hash(hash))
    }

    pub fn lookup_path(&self, path: &Path) -> Option<FileMetadata> {
        self.lookup(LookupKey::Path(path))
    }

    /// Hashes `path` and files it under its content hash.
    ///
    /// Known paths return before any read. Locating or creating the record,
    /// appending the path and registering the alias happen under one lock, so
    /// concurrent callers never lose an append or record a path twice.
    pub fn record_file(&self, path: &Path) -> Result<Recorded> {
        if self.by_path.contains_key(path) {
            trace!("Already indexed {}", path.display());
            return Ok(Recorded::Known);
        }

        let digest = hasher::content_digest(path).map_err(|e| Error::read(path, e))?;
        let captured_at = self.capture_time.captured_at(path);

        match self.by_hash.entry(digest.hash) {
            Entry::Occupied(mut existing) => {
                if !self.claim_path(path, existing.key()) {
                    return Ok(Recorded::Known);
                }
                let hash = existing.key().clone();
                let record = existing.get_mut();
                record.paths.push(path.to_path_buf());
                if record.captured_at.is_none() {
                    record.captured_at = captured_at;
                }
                Ok(Recorded::Duplicate { hash })
            }
            Entry::Vacant(slot) => {
                if !self.claim_path(path, slot.key()) {
                    return Ok(Recorded::Known);
                }
                let hash = slot.key().clone();
                let mut record = FileMetadata::new(hash.clone(), digest.size, path.to_path_buf());
                record.captured_at = captured_at;
                slot.insert(record);
                Ok(Recorded::NewContent { hash })
            }
        }
    }

    /// Registers `path` as an alias of `hash` unless some record already has it.
    /// During a scan the caller holds the `by_hash` entry for `hash`.
    fn claim_path(&self, path: &Path, hash: &str) -> bool {
        match self.by_path.entry(path.to_path_buf()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(hash.to_string());
                true
            }
        }
    }

    /// Records where the hash tree materialized `hash`. Set at most once;
    /// repeating the same location is accepted.
    pub fn annotate_link(&self, hash: &str, link: &Path) -> Result<()> {
        let mut record = self
            .by_hash
            .get_mut(hash)
            .ok_or_else(|| Error::UnknownHash(hash.to_string()))?;
        if let Some(existing) = &record.canonical_link_path {
            if existing == link {
                return Ok(());
            }
            return Err(Error::AlreadyLinked {
                hash: hash.to_string(),
                existing: existing.clone(),
            });
        }
        record.canonical_link_path = Some(link.to_path_buf());
        Ok(())
    }

    /// Bytes on disk if every known path is an independent copy.
    /// Hard links already present among the inputs are not detected.
    pub fn total_size(&self) -> u64 {
        self.by_hash
            .iter()
            .map(|r| r.size * r.paths.len() as u64)
            .sum()
    }

    /// Bytes on disk with one copy per distinct content.
    pub fn deduped_size(&self) -> u64 {
        self.by_hash.iter().map(|r| r.size).sum()
    }

    /// Snapshot of every record, ordered by hash.
    pub fn records(&self) -> Vec<FileMetadata> {
        let mut records: Vec<FileMetadata> =
            self.by_hash.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.hash.cmp(&b.hash));
        records
    }

    /// Inserts a whole record, registering each path not already claimed.
    /// Returns the number of paths dropped because another record held them.
    fn insert_record(&self, mut record: FileMetadata) -> usize {
        let before = record.paths.len();
        let mut kept = Vec::with_capacity(before);
        for path in record.paths.drain(..) {
            if self.claim_path(&path, &record.hash) {
                kept.push(path);
            }
        }
        record.paths = kept;
        let dropped = before - record.paths.len();
        if !record.paths.is_empty() {
            self.by_hash.insert(record.hash.clone(), record);
        }
        dropped
    }
}
