use std::path::{Component, Path, PathBuf};

use crate::error::{Result, StoreError};

/// Joins a repo-relative `path` onto `base`, refusing anything that could escape it.
///
/// `.` components are dropped. Empty paths, absolute paths and `..` components are
/// rejected with [`StoreError::InvalidPath`].
pub fn join_relative(base: &Path, path: &str) -> Result<PathBuf> {
    let invalid = |reason: &'static str| {
        StoreError::InvalidPath {
            path: path.to_string(),
            reason,
        }
    };

    let mut joined = base.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(invalid("parent directory components are not allowed"))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("absolute paths are not allowed"))
            }
        }
    }

    if depth == 0 {
        return Err(invalid("path does not name a file"));
    }
    Ok(joined)
}

/// `root` with `suffix` appended to its final component, e.g. `repo` -> `repo.staging`.
pub(crate) fn sibling(root: &Path, suffix: &str) -> PathBuf {
    let mut name = root.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
