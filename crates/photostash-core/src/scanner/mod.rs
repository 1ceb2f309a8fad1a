pub mod walk;

use glob::Pattern;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{EntryFailure, Error, Result};
use crate::index::{ContentIndex, Recorded};
use crate::media;
use crate::progress::{ProgressReporter, Stage, StageProgress};

/// Which entries a scan hands to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFilter {
    #[default]
    All,
    /// Only files whose leading bytes carry an image signature.
    ImagesOnly,
}

impl FileFilter {
    pub fn from_only_images(only_images: bool) -> Self {
        if only_images {
            FileFilter::ImagesOnly
        } else {
            FileFilter::All
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            FileFilter::All => true,
            FileFilter::ImagesOnly => media::is_image(path),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Entries that passed the filter; equals the final progress count.
    pub processed: usize,
    pub new_content: usize,
    pub duplicates: usize,
    pub already_known: usize,
    /// Files that could not be read. Logged and skipped.
    pub failures: Vec<EntryFailure>,
}

/// Walks `root`, then records every accepted file in `index` on `pool`.
///
/// An unreadable file does not abort the scan: it is logged, listed in
/// `ScanOutcome::failures`, and the remaining files are still recorded.
pub fn scan_directory(
    index: &ContentIndex,
    root: &Path,
    filter: FileFilter,
    ignore_patterns: &[Pattern],
    pool: &ThreadPool,
    reporter: &dyn ProgressReporter,
) -> Result<ScanOutcome> {
    let root = root
        .canonicalize()
        .map_err(|e| Error::read(root, e))?;
    info!("Adding directory {}", root.display());

    let listed = walk::list_files(&root, ignore_patterns)?;
    debug!("{} entries under {}", listed.len(), root.display());

    let candidates: Vec<PathBuf> = match filter {
        FileFilter::All => listed,
        FileFilter::ImagesOnly => pool.install(|| {
            listed
                .into_par_iter()
                .filter(|path| filter.accepts(path))
                .collect()
        }),
    };

    let progress = StageProgress::start(Stage::Scan, candidates.len(), reporter);
    let results: Vec<Result<Recorded>> = pool.install(|| {
        candidates
            .par_iter()
            .map(|path| {
                let result = index.record_file(path);
                progress.tick();
                result
            })
            .collect()
    });
    let processed = progress.finish();

    let mut outcome = ScanOutcome {
        processed,
        ..ScanOutcome::default()
    };
    for (path, result) in candidates.iter().zip(results) {
        match result {
            Ok(Recorded::NewContent { .. }) => outcome.new_content += 1,
            Ok(Recorded::Duplicate { .. }) => outcome.duplicates += 1,
            Ok(Recorded::Known) => outcome.already_known += 1,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                outcome.failures.push(EntryFailure::new(path, e));
            }
        }
    }

    info!(
        "Scanned {} files under {}: {} new, {} duplicates, {} known, {} skipped",
        outcome.processed,
        root.display(),
        outcome.new_content,
        outcome.duplicates,
        outcome.already_known,
        outcome.failures.len()
    );
    Ok(outcome)
}
