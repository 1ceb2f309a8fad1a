use chrono::Datelike;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{extension_of, HashTree, LinkStatus, TreeOutcome, DEFAULT_EXTENSION, UNKNOWN_DATE_DIR};
use crate::error::{EntryFailure, Result};
use crate::index::{ContentIndex, FileMetadata};
use crate::platform;
use crate::progress::{ProgressReporter, Stage, StageProgress};

pub fn date_tree_path(root: &Path, record: &FileMetadata) -> PathBuf {
    let ext = record
        .first_path()
        .map(|p| extension_of(p))
        .unwrap_or(DEFAULT_EXTENSION);
    match record.captured_at {
        Some(date) => root
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!(
                "{}-{}.{}",
                date.format("%Y-%m-%d-%H-%M-%S"),
                record.hash,
                ext
            )),
        None => root
            .join(UNKNOWN_DATE_DIR)
            .join(format!("{}.{}", record.hash, ext)),
    }
}

/// Symlinks every record's hash-tree entry into a year/month layout under `root`.
/// Records the hash tree could not link are logged and skipped.
pub fn build_date_tree(
    index: &ContentIndex,
    hash_tree: &HashTree,
    root: &Path,
    pool: &ThreadPool,
    reporter: &dyn ProgressReporter,
) -> Result<TreeOutcome> {
    fs::create_dir_all(root)?;
    info!(
        "Building date tree in {} from {}",
        root.display(),
        hash_tree.root().display()
    );

    let records = index.records();
    let progress = StageProgress::start(Stage::DateTree, records.len(), reporter);
    let results: Vec<(PathBuf, io::Result<LinkStatus>)> = pool.install(|| {
        records
            .par_iter()
            .map(|record| {
                let dest = date_tree_path(root, record);
                if record.captured_at.is_none() {
                    debug!(
                        "No capture date for {}, filing under {}",
                        record.hash, UNKNOWN_DATE_DIR
                    );
                }
                let result = match hash_tree.link_for(&record.hash) {
                    Some(target) => link_date_entry(target, &dest),
                    None => Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!(
                            "Unable to create link for file {}, hash {} has no hash tree entry",
                            dest.display(),
                            record.hash
                        ),
                    )),
                };
                progress.tick();
                (dest, result)
            })
            .collect()
    });
    progress.finish();

    let mut outcome = TreeOutcome::default();
    for (dest, result) in results {
        match result {
            Ok(status) => outcome.count(status),
            Err(e) => {
                warn!("{}", e);
                outcome.failures.push(EntryFailure::new(dest, e));
            }
        }
    }

    info!(
        "Date tree: {} linked, {} already present, {} failed",
        outcome.created,
        outcome.existing,
        outcome.failures.len()
    );
    Ok(outcome)
}

fn link_date_entry(target: &Path, dest: &Path) -> io::Result<LinkStatus> {
    if platform::occupied(dest) {
        return Ok(LinkStatus::Existing);
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    match platform::symlink_file(target, dest) {
        Ok(()) => Ok(LinkStatus::Created),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(LinkStatus::Existing),
        Err(e) => Err(io::Error::new(
            e.kind(),
            format!(
                "Unable to create link for file {} to {}: {}",
                dest.display(),
                target.display(),
                e
            ),
        )),
    }
}
