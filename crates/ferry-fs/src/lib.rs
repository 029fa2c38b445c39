//! Local materialization helpers for fetched resources.
//!
//! Nothing here touches the network. The fetcher calls [`check_destination`]
//! before planning a transfer and [`ensure_parent`] right before it connects,
//! so a bad destination never costs a round trip.

mod error;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};

/// Reject destinations that can never hold a downloaded file.
///
/// A destination that does not exist yet is fine; one that names an existing
/// directory, or has no final file name component (`""`, `"a/.."`), is not.
/// Only metadata is read, nothing is created.
pub fn check_destination(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.file_name().is_none() {
        return Err(Error::NoFileName(path.to_path_buf()));
    }

    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Err(Error::IsDirectory(path.to_path_buf())),
        _ => Ok(()),
    }
}

/// Create the parent directory chain of `path` if it is missing.
///
/// Returns the directories that were created, outermost first. An empty vec
/// means the parent already existed (or `path` is a bare file name relative to
/// the working directory).
pub fn ensure_parent(path: &Path) -> Result<Vec<PathBuf>> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(Vec::new());
    };

    let mut missing: Vec<PathBuf> = parent
        .ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .map(Path::to_path_buf)
        .collect();

    if missing.is_empty() {
        if !parent.is_dir() {
            return Err(Error::NotADirectory(parent.to_path_buf()));
        }
        return Ok(missing);
    }

    std::fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
        path: parent.to_path_buf(),
        source,
    })?;

    missing.reverse();
    tracing::debug!(created = missing.len(), parent = %parent.display(), "created destination parent");
    Ok(missing)
}
