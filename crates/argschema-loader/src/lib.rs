//! Driver module loading for args-to-schema
//!
//! Resolves a driver specifier to a module file and reads the main class's
//! `argsConstraints` without executing any driver code. The result implements
//! [`DriverMetadataProvider`], which is all the translator needs.

mod javascript;
mod json_module;
mod literal;
pub mod resolve;

use argschema_core::{ArgsConstraints, ConstraintError, DriverMetadataProvider};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub use resolve::{resolve_from, ResolveError};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unsupported module type: {}", .0.display())]
    UnsupportedModule(PathBuf),

    #[error("Cannot statically evaluate argsConstraints of {origin} in {}: {message}", path.display())]
    Evaluate {
        path: PathBuf,
        origin: String,
        message: String,
    },

    #[error("Invalid argsConstraints in {}: {source}", path.display())]
    Constraints {
        path: PathBuf,
        source: ConstraintError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Follow relative imports from the entry module
    pub follow_imports: bool,
    /// Maximum import depth followed from the entry module
    pub max_depth: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            follow_imports: true,
            max_depth: 8,
        }
    }
}

/// Raw `argsConstraints` value and where it was declared
#[derive(Debug, Clone, PartialEq)]
pub struct FoundConstraints {
    pub value: Value,
    pub source: PathBuf,
    /// Human readable description, e.g. `class FakeDriver`
    pub origin: String,
}

/// A driver module's metadata as seen by static inspection
#[derive(Debug, Clone)]
pub struct LoadedDriver {
    main_class: String,
    module_path: PathBuf,
    origin: Option<FoundConstraints>,
    constraints: Option<ArgsConstraints>,
}

impl LoadedDriver {
    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    /// Where the constraints were found, if anywhere
    pub fn origin(&self) -> Option<&FoundConstraints> {
        self.origin.as_ref()
    }
}

impl DriverMetadataProvider for LoadedDriver {
    fn main_class(&self) -> &str {
        &self.main_class
    }

    fn args_constraints(&self) -> Option<&ArgsConstraints> {
        self.constraints.as_ref()
    }
}

/// Load the metadata of `main_class` from the module at `module_path`
pub fn load_driver(
    module_path: &Path,
    main_class: &str,
    options: &LoadOptions,
) -> Result<LoadedDriver, LoadError> {
    debug!("Loading driver module {:?} (main class {})", module_path, main_class);

    let is_json = module_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let found = if is_json {
        json_module::find_constraints(module_path, main_class)?
    } else if javascript::is_script(module_path) {
        javascript::find_constraints(module_path, main_class, options)?
    } else {
        return Err(LoadError::UnsupportedModule(module_path.to_path_buf()));
    };

    let constraints = match &found {
        Some(found) => {
            let constraints =
                ArgsConstraints::from_value(&found.value).map_err(|source| {
                    LoadError::Constraints {
                        path: found.source.clone(),
                        source,
                    }
                })?;
            info!(
                "Found {} argsConstraints on {} in {:?}",
                constraints.len(),
                found.origin,
                found.source
            );
            Some(constraints)
        }
        None => None,
    };

    Ok(LoadedDriver {
        main_class: main_class.to_string(),
        module_path: module_path.to_path_buf(),
        origin: found,
        constraints,
    })
}
