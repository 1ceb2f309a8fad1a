use std::io;
use std::path::Path;

#[cfg(unix)]
pub fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
pub fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// True when something, even a dangling symlink, occupies `path`.
pub fn occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
