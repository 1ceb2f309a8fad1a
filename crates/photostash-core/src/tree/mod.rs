//! Filesystem layouts derived from the content index.
//!
//! The hash tree holds one hard link per distinct content at
//! `<root>/<hash[0..3]>/<hash>.<ext>`. The date tree holds symlinks into the
//! hash tree at `<root>/<YYYY>/<MM>/<YYYY-MM-DD-HH-MM-SS>-<hash>.<ext>`, or
//! `<root>/Unknown/<hash>.<ext>` without a capture date. Both builds skip
//! destinations that already exist, so re-running them is safe.

mod date_tree;
mod hash_tree;

pub use date_tree::{build_date_tree, date_tree_path};
pub use hash_tree::{build_hash_tree, hash_tree_path, HashTree};

use std::path::Path;

use crate::error::EntryFailure;

/// Used when the first known path has no extension.
pub const DEFAULT_EXTENSION: &str = "jpg";

const BUCKET_PREFIX_LEN: usize = 3;

pub const UNKNOWN_DATE_DIR: &str = "Unknown";

/// Extension of the file name, or `jpg` when there is none.
pub fn extension_of(path: &Path) -> &str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or(DEFAULT_EXTENSION)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkStatus {
    Created,
    Existing,
}

#[derive(Debug, Default, Clone)]
pub struct TreeOutcome {
    pub created: usize,
    pub existing: usize,
    /// Entries that could not be linked. Logged and skipped.
    pub failures: Vec<EntryFailure>,
}

impl TreeOutcome {
    fn count(&mut self, status: LinkStatus) {
        match status {
            LinkStatus::Created => self.created += 1,
            LinkStatus::Existing => self.existing += 1,
        }
    }
}
