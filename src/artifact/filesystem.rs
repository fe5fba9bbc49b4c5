//! Filesystem helpers for staging CD contents.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, StepError};

/// Copy one input into the staging root, keeping its basename.
///
/// Files are copied flat. A directory is copied recursively as a subtree
/// named after the directory. An existing entry with the same name is
/// replaced whole, whatever its kind.
///
/// # Returns
///
/// The staged path inside `staging`.
pub fn stage_input(staging: &Path, source: &Path) -> Result<PathBuf> {
    let metadata = fs::metadata(source).map_err(|e| StepError::staging(source, e))?;

    let name = source.file_name().ok_or_else(|| {
        StepError::staging(
            source,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    let staged = staging.join(name);
    remove_path_if_exists(&staged).map_err(|e| StepError::staging(&staged, e))?;

    if metadata.is_dir() {
        copy_dir_recursive(source, &staged)?;
    } else {
        fs::copy(source, &staged).map_err(|e| StepError::staging(source, e))?;
    }

    Ok(staged)
}

/// Recursively copy a directory, following symlinks.
///
/// The image must contain real file contents, so links are resolved rather
/// than preserved.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            StepError::staging(path, e.into())
        })?;

        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| StepError::staging(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| StepError::staging(entry.path(), e))?;
        }
    }

    Ok(())
}

/// Remove a file or directory tree.
///
/// # Returns
///
/// `Ok(false)` when nothing was there to remove.
pub fn remove_path_if_exists(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match removed {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
