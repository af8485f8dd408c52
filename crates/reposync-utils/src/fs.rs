use std::{fs, path::Path};

use crate::error::{FileSystemError, FileSystemResult};

/// Removes the specified file or directory safely.
///
/// If the path does not exist, this function returns `Ok(())` without error. Directories are
/// removed recursively.
///
/// # Errors
///
/// Returns a [`FileSystemError::File`] if the removal fails for any reason other than
/// the path not existing.
///
/// # Example
///
/// ```no_run
/// use reposync_utils::error::FileSystemResult;
/// use reposync_utils::fs::safe_remove;
///
/// fn main() -> FileSystemResult<()> {
///     safe_remove("/tmp/some_path")?;
///     Ok(())
/// }
/// ```
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();

    if fs::symlink_metadata(path).is_err() {
        return Ok(());
    }

    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    result.map_err(|err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "remove",
            source: err,
        }
    })
}

/// Creates a directory structure if it doesn't exist.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).map_err(|err| {
            FileSystemError::Directory {
                path: path.to_path_buf(),
                action: "create",
                source: err,
            }
        })?;
    } else if !path.is_dir() {
        return Err(FileSystemError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Makes the file at `src` also available at `dst`, leaving `src` untouched.
///
/// A hard link is attempted first. If the filesystem refuses it (different devices,
/// no link support), the contents are copied instead. Parent directories of `dst` are
/// created as needed and an existing `dst` is replaced.
///
/// # Errors
///
/// * [`FileSystemError::File`] if `src` cannot be linked or copied.
/// * [`FileSystemError::Directory`] if the parent of `dst` cannot be created.
pub fn link_or_copy<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> FileSystemResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        ensure_dir_exists(parent)?;
    }
    safe_remove(dst)?;

    if fs::hard_link(src, dst).is_ok() {
        return Ok(());
    }

    fs::copy(src, dst).map(|_| ()).map_err(|err| {
        FileSystemError::File {
            path: src.to_path_buf(),
            action: "copy",
            source: err,
        }
    })
}
