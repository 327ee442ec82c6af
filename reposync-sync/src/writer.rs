//! Atomic file writes into a destination working tree.
//!
//! ## Write protocol
//!
//! 1. Produce the new content (rendered text or a source file).
//! 2. SHA-256 hash it and the current destination file, if any.
//! 3. Identical digests → report [`FileChange::Unchanged`], touch nothing.
//! 4. Dry run → report [`FileChange::WouldWrite`].
//! 5. Write to `<path>.reposync.tmp`, then rename onto the final path.

use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// FileChange
// ---------------------------------------------------------------------------

/// Outcome for one destination file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// Copied verbatim from the source.
    Written { path: PathBuf },
    /// Rendered through the template engine and written.
    Rendered { path: PathBuf },
    /// Content already identical; nothing written.
    Unchanged { path: PathBuf },
    /// `replace: false` and the destination already exists.
    Skipped { path: PathBuf },
    /// Removed as an orphan or because its source disappeared.
    Deleted { path: PathBuf },
    /// Dry run: the file would have been written.
    WouldWrite { path: PathBuf },
    /// Dry run: the file would have been removed.
    WouldDelete { path: PathBuf },
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Written { path }
            | FileChange::Rendered { path }
            | FileChange::Unchanged { path }
            | FileChange::Skipped { path }
            | FileChange::Deleted { path }
            | FileChange::WouldWrite { path }
            | FileChange::WouldDelete { path } => path,
        }
    }

    /// True for outcomes that alter (or would alter) the destination tree.
    pub fn is_change(&self) -> bool {
        !matches!(
            self,
            FileChange::Unchanged { .. } | FileChange::Skipped { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

fn digest_bytes(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Streaming digest of the file at `path`; `None` if it does not exist.
fn digest_file(path: &Path) -> Result<Option<String>, SyncError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e)),
    };
    let mut h = Sha256::new();
    io::copy(&mut file, &mut h).map_err(|e| io_err(path, e))?;
    Ok(Some(hex::encode(h.finalize())))
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.reposync.tmp", path.display()))
}

fn ensure_parent(path: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    Ok(())
}

/// Rename `tmp` onto `path`, removing `tmp` if the rename fails.
fn commit_tmp(tmp: &Path, path: &Path) -> Result<(), SyncError> {
    if let Err(e) = fs::rename(tmp, path) {
        let _ = fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Write rendered template output to `path`.
pub(crate) fn write_rendered(
    path: &Path,
    content: &str,
    dry_run: bool,
) -> Result<FileChange, SyncError> {
    let digest = digest_bytes(content.as_bytes());
    if digest_file(path)?.as_deref() == Some(digest.as_str()) {
        tracing::debug!("unchanged: {}", path.display());
        return Ok(FileChange::Unchanged {
            path: path.to_path_buf(),
        });
    }

    if dry_run {
        tracing::info!("[dry-run] would render: {}", path.display());
        return Ok(FileChange::WouldWrite {
            path: path.to_path_buf(),
        });
    }

    ensure_parent(path)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    commit_tmp(&tmp, path)?;

    tracing::info!("rendered: {}", path.display());
    Ok(FileChange::Rendered {
        path: path.to_path_buf(),
    })
}

/// Copy `source` to `dest` byte for byte (permissions included).
pub(crate) fn copy_file(source: &Path, dest: &Path, dry_run: bool) -> Result<FileChange, SyncError> {
    let source_digest = digest_file(source)?.ok_or_else(|| {
        io_err(
            source,
            io::Error::new(ErrorKind::NotFound, "source file disappeared"),
        )
    })?;
    if digest_file(dest)?.as_deref() == Some(source_digest.as_str()) {
        tracing::debug!("unchanged: {}", dest.display());
        return Ok(FileChange::Unchanged {
            path: dest.to_path_buf(),
        });
    }

    if dry_run {
        tracing::info!("[dry-run] would copy: {}", dest.display());
        return Ok(FileChange::WouldWrite {
            path: dest.to_path_buf(),
        });
    }

    ensure_parent(dest)?;
    let tmp = tmp_path(dest);
    if let Err(e) = fs::copy(source, &tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(source, e));
    }
    commit_tmp(&tmp, dest)?;

    tracing::info!("copied: {}", dest.display());
    Ok(FileChange::Written {
        path: dest.to_path_buf(),
    })
}

/// Remove the file at `path`.
pub(crate) fn remove_file(path: &Path, dry_run: bool) -> Result<FileChange, SyncError> {
    if dry_run {
        tracing::info!("[dry-run] would delete: {}", path.display());
        return Ok(FileChange::WouldDelete {
            path: path.to_path_buf(),
        });
    }
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }
    tracing::info!("deleted: {}", path.display());
    Ok(FileChange::Deleted {
        path: path.to_path_buf(),
    })
}

/// Remove `dir` and its ancestors while they are empty, stopping before
/// `stop_at` (which is never removed) and at any `.git` directory.
pub(crate) fn prune_empty_dirs(dir: &Path, stop_at: &Path) -> Result<(), SyncError> {
    let mut current = Some(dir);
    while let Some(dir) = current {
        if dir == stop_at || !dir.starts_with(stop_at) {
            break;
        }
        if dir.file_name().is_some_and(|name| name == ".git") {
            break;
        }
        let mut entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                current = dir.parent();
                continue;
            }
            Err(e) => return Err(io_err(dir, e)),
        };
        if entries.next().is_some() {
            break;
        }
        fs::remove_dir(dir).map_err(|e| io_err(dir, e))?;
        tracing::debug!("removed empty directory: {}", dir.display());
        current = dir.parent();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
