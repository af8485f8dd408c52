use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, PoisonError, RwLock},
    time::Duration,
};

use documented::{Documented, DocumentedFields};
use reposync_utils::{
    path::{resolve_path, xdg_config_home, xdg_data_home},
    time::parse_duration,
};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::{annotate_toml_array_of_tables, annotate_toml_table},
    error::{ConfigError, Result},
    repository::Repository,
};

/// reposync configuration
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Directory that holds one mirror per repository, named after the repository.
    /// Default: $XDG_DATA_HOME/reposync/repos
    pub storage_path: Option<String>,

    /// User agent sent with every HTTP request.
    /// Default: reposync/<version>
    pub user_agent: Option<String>,

    /// Timeout for each HTTP request (e.g. "30s", "5m").
    /// Default: no timeout
    pub timeout: Option<String>,

    /// Repositories to mirror.
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("REPOSYNC_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("reposync").join("config.toml"),
    })
});

/// Path of the configuration file currently in use.
pub fn config_path() -> PathBuf {
    CONFIG_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Overrides the configuration file location, e.g. from a command line flag.
pub fn set_config_path<P: Into<PathBuf>>(path: P) {
    *CONFIG_PATH.write().unwrap_or_else(PoisonError::into_inner) = path.into();
}

/// Loads the configuration file and makes it the global configuration.
pub fn init() -> Result<()> {
    let config = Config::new()?;
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = Some(config);
    Ok(())
}

/// Returns the global configuration, falling back to the defaults if [`init`] was
/// never called.
pub fn get_config() -> Config {
    if let Some(config) = CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return config.clone();
    }

    CONFIG
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(Config::default_config)
        .clone()
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            storage_path: Some(format!("{}/reposync/repos", xdg_data_home().display())),
            user_agent: None,
            timeout: None,
            repositories: Vec::new(),
        }
    }

    /// The defaults plus a disabled sample repository, written by `defconfig`.
    pub fn template() -> Self {
        let mut config = Self::default_config();
        config.timeout = Some("5m".to_string());
        config.repositories.push(Repository {
            name: "example".to_string(),
            url: "https://mirror.example.com/distro/os/x86_64".to_string(),
            archs: vec!["x86_64".to_string()],
            enabled: Some(false),
        });
        config
    }

    /// Loads the configuration from [`CONFIG_PATH`]. A missing file yields the
    /// defaults.
    pub fn new() -> Result<Self> {
        Self::load(&config_path())
    }

    /// Loads and validates the configuration stored at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;
        Ok(config)
    }

    /// Fills in defaults and validates every field.
    pub fn resolve(&mut self) -> Result<()> {
        if self.storage_path.is_none() {
            self.storage_path = Self::default_config().storage_path;
        }

        self.timeout()?;

        let mut seen_repos = HashSet::new();
        for repo in &mut self.repositories {
            repo.validate()?;
            if !seen_repos.insert(repo.name.clone()) {
                return Err(ConfigError::DuplicateRepositoryName(repo.name.clone()));
            }
            repo.enabled.get_or_insert(true);
        }

        Ok(())
    }

    /// Root directory of all mirrors. `$REPOSYNC_STORAGE` takes precedence over the
    /// config file.
    pub fn get_storage_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("REPOSYNC_STORAGE") {
            return Ok(resolve_path(&env_path)?);
        }
        match &self.storage_path {
            Some(storage_path) => Ok(resolve_path(storage_path)?),
            None => Ok(xdg_data_home().join("reposync").join("repos")),
        }
    }

    pub fn timeout(&self) -> Result<Option<Duration>> {
        match self.timeout.as_deref() {
            None => Ok(None),
            Some(value) => {
                parse_duration(value)
                    .map(Some)
                    .ok_or_else(|| ConfigError::InvalidTimeout(value.to_string()))
            }
        }
    }

    pub fn get_repository(&self, name: &str) -> Option<&Repository> {
        self.repositories.iter().find(|repo| repo.name == name)
    }

    pub fn enabled_repositories(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.iter().filter(|repo| repo.is_enabled())
    }

    /// Picks the repositories a sync should cover.
    ///
    /// With no names every enabled repository is returned. Otherwise each name must
    /// refer to a configured, enabled repository; duplicates are dropped.
    pub fn select_repositories<T: AsRef<str>>(&self, names: &[T]) -> Result<Vec<&Repository>> {
        if names.is_empty() {
            return Ok(self.enabled_repositories().collect());
        }

        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for name in names {
            let name = name.as_ref();
            if !seen.insert(name) {
                continue;
            }
            let repo = self
                .get_repository(name)
                .ok_or_else(|| ConfigError::UnknownRepository(name.to_string()))?;
            if !repo.is_enabled() {
                return Err(ConfigError::DisabledRepository(name.to_string()));
            }
            selected.push(repo);
        }
        Ok(selected)
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(repositories_item) = doc.get_mut("repositories") {
            if let Some(repositories_array) = repositories_item.as_array_of_tables_mut() {
                annotate_toml_array_of_tables::<Repository>(repositories_array)?;
            }
        }

        Ok(doc)
    }
}

/// Writes the annotated [`Config::template`] to [`CONFIG_PATH`].
///
/// # Errors
///
/// Returns [`ConfigError::ConfigAlreadyExists`] rather than overwriting an existing
/// file.
pub fn generate_default_config() -> Result<PathBuf> {
    let config_path = config_path();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let annotated_doc = Config::template().to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(config_path)
}
