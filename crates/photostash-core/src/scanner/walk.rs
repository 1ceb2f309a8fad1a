use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Compiles glob ignore patterns, logging and skipping invalid ones.
pub fn compile_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

/// Every non-directory entry under `root`, recursively.
///
/// Paths are joined onto `root`; the process working directory is never
/// touched. Symlinks to directories are not followed. Symlinks to files are
/// listed; dangling ones are skipped with a warning.
pub fn list_files(root: &Path, ignore_patterns: &[Pattern]) -> io::Result<Vec<PathBuf>> {
    Ok(list_tree(root, ignore_patterns)?.files)
}

/// Result of walking a tree: listed files and the symlinks whose target is gone.
#[derive(Debug, Default)]
pub struct Listing {
    pub files: Vec<PathBuf>,
    pub dangling: Vec<PathBuf>,
}

/// Like `list_files`, but hands back dangling links instead of only logging them.
pub fn list_tree(root: &Path, ignore_patterns: &[Pattern]) -> io::Result<Listing> {
    let mut listing = Listing::default();
    visit_dirs(root, ignore_patterns, &mut listing)?;
    Ok(listing)
}

fn visit_dirs(dir: &Path, ignore_patterns: &[Pattern], listing: &mut Listing) -> io::Result<()> {
    if is_ignored(dir, ignore_patterns) {
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            error!("Access denied reading directory {}: {}", dir.display(), err);
            return Ok(());
        }
        Err(err) => {
            return Err(io::Error::new(
                err.kind(),
                format!("Error reading directory {}: {}", dir.display(), err),
            ));
        }
    };

    for entry_result in entries {
        let entry = entry_result.map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Error reading entry in directory {}: {}", dir.display(), err),
            )
        })?;

        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            visit_dirs(&path, ignore_patterns, listing)?;
            continue;
        }
        if is_ignored(&path, ignore_patterns) {
            continue;
        }

        if file_type.is_symlink() {
            match fs::metadata(&path) {
                Ok(target) if target.is_dir() => continue,
                Ok(_) => {}
                Err(err) => {
                    warn!("Skipping dangling link {}: {}", path.display(), err);
                    listing.dangling.push(path);
                    continue;
                }
            }
        }

        listing.files.push(path);
    }

    Ok(())
}

fn is_ignored(path: &Path, ignore_patterns: &[Pattern]) -> bool {
    ignore_patterns
        .iter()
        .any(|pattern| pattern.matches_path(path))
}
