use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, Result};

/// A remote rpm-md repository to mirror.
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Repository {
    /// Unique name of the repository.
    /// The mirror is stored in a directory of this name under `storage_path`.
    pub name: String,

    /// Base URL of the repository, i.e. the directory that contains `repodata/`.
    pub url: String,

    /// Package architectures to mirror. `noarch` packages are always mirrored.
    /// Default: [] (every architecture)
    #[serde(default)]
    pub archs: Vec<String>,

    /// Whether the repository is synced.
    /// Default: true
    pub enabled: Option<bool>,
}

impl Repository {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            archs: Vec::new(),
            enabled: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// The set of accepted architectures; empty accepts every architecture.
    pub fn arch_filter(&self) -> HashSet<String> {
        self.archs
            .iter()
            .map(|arch| arch.trim())
            .filter(|arch| !arch.is_empty())
            .map(String::from)
            .collect()
    }

    /// Directory this repository is mirrored to under `root`.
    pub fn storage_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.name)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let invalid = |reason: &'static str| {
            ConfigError::InvalidRepository {
                name: self.name.clone(),
                reason,
            }
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if self.name.contains('/') || self.name.contains('\\') {
            return Err(invalid("name cannot contain a path separator"));
        }
        if self.name == "." || self.name == ".." {
            return Err(invalid("name cannot be a relative directory"));
        }

        let url = Url::parse(&self.url).map_err(|err| {
            ConfigError::InvalidRepositoryUrl {
                name: self.name.clone(),
                reason: format!("{err}: {}", self.url),
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidRepositoryUrl {
                name: self.name.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        Ok(())
    }
}
