use miette::Diagnostic;
use reposync_utils::error::{FileSystemError, PathError, UtilsError};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(reposync_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(reposync_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(reposync_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists,

    #[error("Invalid repository name {name:?}: {reason}")]
    #[diagnostic(
        code(reposync_config::invalid_repository),
        help("Repository names are used as directory names and must be a single path component")
    )]
    InvalidRepository { name: String, reason: &'static str },

    #[error("Invalid URL for repository '{name}': {reason}")]
    #[diagnostic(
        code(reposync_config::invalid_repository_url),
        help("Use the http(s) URL of the directory that contains repodata/")
    )]
    InvalidRepositoryUrl { name: String, reason: String },

    #[error("Duplicate repository name: {0}")]
    #[diagnostic(
        code(reposync_config::duplicate_repo),
        help("Each repository must have a unique name")
    )]
    DuplicateRepositoryName(String),

    #[error("Unknown repository: {0}")]
    #[diagnostic(
        code(reposync_config::unknown_repo),
        help("Run `reposync config` to list the configured repositories")
    )]
    UnknownRepository(String),

    #[error("Repository '{0}' is disabled")]
    #[diagnostic(
        code(reposync_config::disabled_repo),
        help("Set `enabled = true` for this repository in your config file")
    )]
    DisabledRepository(String),

    #[error("Invalid timeout: {0}")]
    #[diagnostic(
        code(reposync_config::invalid_timeout),
        help("Use a number followed by s, m, h or d, e.g. \"30s\"")
    )]
    InvalidTimeout(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(reposync_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(reposync_config::utils))]
    Utils(#[from] UtilsError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(reposync_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(reposync_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

impl From<PathError> for ConfigError {
    fn from(err: PathError) -> Self {
        Self::Utils(UtilsError::Path(err))
    }
}

impl From<FileSystemError> for ConfigError {
    fn from(err: FileSystemError) -> Self {
        Self::Utils(UtilsError::FileSystem(err))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
