use rayon::prelude::*;
use rayon::ThreadPool;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ObjectStore, RemoteTarget};
use crate::error::{EntryFailure, Error, Result};
use crate::progress::{ProgressReporter, Stage, StageProgress};
use crate::scanner::walk;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub uploaded: usize,
    /// Keys already present remotely.
    pub skipped: usize,
    /// Entries that were not uploaded. `path` holds the key, or the local
    /// path when there is no key.
    pub failed: Vec<EntryFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncStatus {
    Uploaded,
    Present,
}

/// `prefix/relative/path`, always `/`-separated.
///
/// A component that is not valid UTF-8 is an error rather than a lossy key.
pub fn remote_key(prefix: &str, relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part.to_str().ok_or_else(|| {
                Error::Other(format!(
                    "{} is not valid UTF-8 and has no remote key",
                    relative.display()
                ))
            })?;
            parts.push(part);
        }
    }
    let relative = parts.join("/");
    if prefix.is_empty() {
        Ok(relative)
    } else {
        Ok(format!("{}/{}", prefix, relative))
    }
}

/// Uploads every file under `source` whose key is not already in `store`.
///
/// Transient remote failures are retried with backoff; a key that keeps
/// failing is reported in `SyncOutcome::failed` and the batch continues.
/// Dangling links and names without a remote key are reported there too.
/// Re-running after a complete sync uploads nothing.
pub fn sync_directory(
    store: &dyn ObjectStore,
    source: &Path,
    target: &RemoteTarget,
    pool: &ThreadPool,
    reporter: &dyn ProgressReporter,
) -> Result<SyncOutcome> {
    info!("Uploading from {} to {}", source.display(), target);
    let listing = walk::list_tree(source, &[])?;

    let progress = StageProgress::start(Stage::Sync, listing.files.len(), reporter);
    let results: Vec<(PathBuf, Result<SyncStatus>)> = pool.install(|| {
        listing
            .files
            .par_iter()
            .map(|path| {
                let relative = path.strip_prefix(source).unwrap_or(path);
                let result = match remote_key(&target.prefix, relative) {
                    Ok(key) => (PathBuf::from(&key), sync_file(store, path, &key)),
                    Err(e) => (path.clone(), Err(e)),
                };
                progress.tick();
                result
            })
            .collect()
    });
    progress.finish();

    let mut outcome = SyncOutcome::default();
    for (key, result) in results {
        match result {
            Ok(SyncStatus::Uploaded) => outcome.uploaded += 1,
            Ok(SyncStatus::Present) => outcome.skipped += 1,
            Err(e) => {
                warn!("Unable to sync {}: {}", key.display(), e);
                outcome.failed.push(EntryFailure::new(key, e));
            }
        }
    }
    for link in listing.dangling {
        outcome
            .failed
            .push(EntryFailure::new(link, "link target is missing, nothing to upload"));
    }

    info!(
        "Sync to {}: {} uploaded, {} already present, {} failed",
        target,
        outcome.uploaded,
        outcome.skipped,
        outcome.failed.len()
    );
    Ok(outcome)
}

fn sync_file(store: &dyn ObjectStore, path: &Path, key: &str) -> Result<SyncStatus> {
    let listed = with_retry("list", key, || store.list_prefix(key))?;
    if listed.iter().filter(|k| k.as_str() == key).count() == 1 {
        return Ok(SyncStatus::Present);
    }

    debug!("Putting file {}", key);
    let body = fs::read(path).map_err(|e| Error::read(path, e))?;
    with_retry("put", key, || store.put(key, body.clone()))?;
    Ok(SyncStatus::Uploaded)
}

fn with_retry<T>(what: &str, key: &str, mut call: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 1;
    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                warn!(
                    "{} {} failed (attempt {}/{}), retrying in {:?}: {}",
                    what, key, attempt, MAX_ATTEMPTS, delay, e
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_remote_key() {
        assert_eq!(
            remote_key("backup/photos", Path::new("abc/abcd.jpg")).unwrap(),
            "backup/photos/abc/abcd.jpg"
        );
        assert_eq!(remote_key("", Path::new("abc/abcd.jpg")).unwrap(), "abc/abcd.jpg");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_has_no_key() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"abc/caf\xe9.jpg");
        assert!(remote_key("backup", Path::new(name)).is_err());
    }

    #[test]
    fn test_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry("put", "k", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Io(io::Error::new(io::ErrorKind::TimedOut, "slow")))
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[test]
    fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry("put", "k", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Other("denied".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
