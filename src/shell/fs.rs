//! Filesystem helpers behind the `!cp` / `!rm` builtins.

use crate::error::{CliError, ReleaseError, Result};
use std::path::Path;
use walkdir::WalkDir;

/// Copy every match of `pattern` (relative to `base`) into `dest`.
///
/// With `keep_layout` the path relative to `base` is preserved; otherwise each
/// match lands directly in `dest` under its file name. Directories are copied
/// recursively. Returns the number of files copied.
pub(super) fn copy_matches(base: &Path, pattern: &str, dest: &Path, keep_layout: bool) -> Result<usize> {
    let full = base.join(pattern);
    let entries = glob::glob(&full.to_string_lossy()).map_err(|e| {
        ReleaseError::Cli(CliError::ExecutionFailed {
            command: format!("cp {}", pattern),
            reason: e.to_string(),
        })
    })?;

    let mut copied = 0;
    for entry in entries.flatten() {
        let relative = if keep_layout {
            entry.strip_prefix(base).unwrap_or(&entry).to_path_buf()
        } else {
            match entry.file_name() {
                Some(name) => name.into(),
                None => continue,
            }
        };
        copied += copy_tree(&entry, &dest.join(relative))?;
    }
    Ok(copied)
}

/// Copy a file or a directory tree
fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    if src.is_file() {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(src, dest)?;
        return Ok(1);
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Remove a file or directory; a missing path is not an error
pub(super) fn remove_path(path: &Path) -> Result<()> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
