use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Parses the counter out of a backup file name of the form `_<name>.<n>_`.
fn backup_counter(candidate: &str, file_name: &str) -> Option<u32> {
    candidate
        .strip_prefix('_')?
        .strip_suffix('_')?
        .strip_prefix(file_name)?
        .strip_prefix('.')?
        .parse()
        .ok()
}

/// Makes room for a new file at `path`.
///
/// If `path` already exists it is renamed to `_<name>.<n>_` in the same
/// directory, where `n` is one past the largest existing backup counter for
/// that name. Returns the backup path, or `None` when nothing was moved.
pub fn prepare_path(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut max_counter = 0;
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let candidate = entry.file_name();
        if let Some(n) = backup_counter(&candidate.to_string_lossy(), &file_name) {
            max_counter = max_counter.max(n);
        }
    }

    let backup = dir.join(format!("_{}.{}_", file_name, max_counter + 1));
    warn!("Found {}, backing it up to {}", path.display(), backup.display());
    fs::rename(path, &backup)?;
    Ok(Some(backup))
}
