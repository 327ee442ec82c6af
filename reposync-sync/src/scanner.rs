//! Recursive file listing.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::error::SyncError;
use crate::matcher::to_slash;

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// List every file below `dir` as a root-relative, `/`-separated path.
///
/// Directories themselves are never listed. With `include_hidden == false`,
/// anything below a dot-directory and every dotfile is left out. Symlinks are
/// not followed into directories; a symlink to a file is listed. A missing
/// `dir` scans as empty. Results are sorted.
pub fn scan(dir: &Path, include_hidden: bool) -> Result<Vec<String>, SyncError> {
    if !dir.exists() {
        return Ok(vec![]);
    }

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| include_hidden || e.depth() == 0 || !is_hidden(e));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| SyncError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.depth() == 0 {
            continue;
        }

        let file_type = entry.file_type();
        let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }

        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        files.push(to_slash(rel));
    }

    files.sort();
    Ok(files)
}
