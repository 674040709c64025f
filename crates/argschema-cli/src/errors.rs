//! Error type for the migration command
//!
//! Wraps the library errors so `main` has a single thing to report before exiting 1.

use argschema_config::ConfigError;
use argschema_loader::{LoadError, ResolveError};
use argschema_manifest::ManifestError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("usage:\n\nargs-to-schema <path-to-driver-dir>")]
    MissingDriver,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Could not find a package.json for {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("Could not find Appium main class in {}", .0.display())]
    NoMainClass(PathBuf),

    #[error("{0} already has a schema!")]
    SchemaExists(String),

    #[error(
        "no argsConstraints found in driver {driver}, module {} and main class name {main_class}",
        module.display()
    )]
    NoConstraints {
        driver: String,
        module: PathBuf,
        main_class: String,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Failed to serialize schema: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for MigrateError {
    fn from(err: ConfigError) -> Self {
        MigrateError::Config(err.to_string())
    }
}

impl MigrateError {
    /// Usage errors are printed bare, without the `Error:` prefix
    pub fn is_usage(&self) -> bool {
        matches!(self, MigrateError::MissingDriver)
    }
}
