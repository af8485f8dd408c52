//! Configuration for reposync.
//!
//! The configuration lives in `$REPOSYNC_CONFIG`, or `$XDG_CONFIG_HOME/reposync/config.toml`
//! when that is unset, and lists the repositories to mirror.

pub mod annotations;
pub mod config;
pub mod error;
pub mod repository;

#[cfg(test)]
mod test_utils;

pub use config::{generate_default_config, get_config, init, Config};
pub use error::{ConfigError, Result};
pub use repository::Repository;
