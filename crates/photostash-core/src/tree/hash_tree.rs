use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{extension_of, LinkStatus, TreeOutcome, BUCKET_PREFIX_LEN};
use crate::error::{EntryFailure, Result};
use crate::index::{ContentIndex, FileMetadata};
use crate::platform;
use crate::progress::{ProgressReporter, Stage, StageProgress};

/// A built hash tree. Only `build_hash_tree` produces one, and the date tree
/// needs one, so the date tree cannot be built first.
#[derive(Debug)]
pub struct HashTree {
    root: PathBuf,
    links: HashMap<String, PathBuf>,
    outcome: TreeOutcome,
}

impl HashTree {
    /// Absolute root of the tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the tree holds `hash`, if linking it succeeded.
    pub fn link_for(&self, hash: &str) -> Option<&Path> {
        self.links.get(hash).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn outcome(&self) -> &TreeOutcome {
        &self.outcome
    }
}

pub fn hash_tree_path(root: &Path, record: &FileMetadata) -> PathBuf {
    let hash = record.hash.as_str();
    let bucket = hash.get(..BUCKET_PREFIX_LEN).unwrap_or(hash);
    let ext = record
        .first_path()
        .map(|p| extension_of(p))
        .unwrap_or(super::DEFAULT_EXTENSION);
    root.join(bucket).join(format!("{}.{}", hash, ext))
}

/// Hard-links the first known path of every record into `root` and records
/// each location in the index. Per-entry failures are logged and skipped.
pub fn build_hash_tree(
    index: &ContentIndex,
    root: &Path,
    pool: &ThreadPool,
    reporter: &dyn ProgressReporter,
) -> Result<HashTree> {
    fs::create_dir_all(root)?;
    let root = root.canonicalize()?;
    info!("Building hash tree in {}", root.display());

    let records = index.records();
    let progress = StageProgress::start(Stage::HashTree, records.len(), reporter);
    let results: Vec<(String, PathBuf, io::Result<LinkStatus>)> = pool.install(|| {
        records
            .par_iter()
            .map(|record| {
                let dest = hash_tree_path(&root, record);
                let result = link_record(record, &dest);
                if result.is_ok() {
                    if let Err(e) = index.annotate_link(&record.hash, &dest) {
                        warn!("Keeping earlier link annotation: {}", e);
                    }
                }
                progress.tick();
                (record.hash.clone(), dest, result)
            })
            .collect()
    });
    progress.finish();

    let mut outcome = TreeOutcome::default();
    let mut links = HashMap::with_capacity(results.len());
    for (hash, dest, result) in results {
        match result {
            Ok(status) => {
                outcome.count(status);
                links.insert(hash, dest);
            }
            Err(e) => {
                warn!("{}", e);
                outcome.failures.push(EntryFailure::new(dest, e));
            }
        }
    }

    info!(
        "Hash tree: {} linked, {} already present, {} failed",
        outcome.created,
        outcome.existing,
        outcome.failures.len()
    );
    Ok(HashTree {
        root,
        links,
        outcome,
    })
}

fn link_record(record: &FileMetadata, dest: &Path) -> io::Result<LinkStatus> {
    if platform::occupied(dest) {
        return Ok(LinkStatus::Existing);
    }

    let first = record.first_path().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("No paths for hash {}", record.hash))
    })?;
    // hard_link does not follow symlinks, so link the file they resolve to.
    let resolved = first.canonicalize().map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Unable to resolve {} for {}: {}", first.display(), dest.display(), e),
        )
    })?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::hard_link(&resolved, dest) {
        Ok(()) => {
            debug!("Linked {} -> {}", dest.display(), resolved.display());
            Ok(LinkStatus::Created)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(LinkStatus::Existing),
        Err(e) => Err(io::Error::new(
            e.kind(),
            format!(
                "Unable to make link for {} to {}: {}",
                dest.display(),
                resolved.display(),
                e
            ),
        )),
    }
}
