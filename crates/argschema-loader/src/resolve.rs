//! Module specifier resolution
//!
//! Implements the subset of Node's resolution algorithm a driver path needs:
//! - paths (`./driver`, `../x`, `/abs/path`) are tried as a file, then as a directory
//! - bare specifiers (`appium-fake-driver`) are looked up in `node_modules` of the base
//!   directory and each ancestor, then fall back to a path relative to the base
//!
//! A directory resolves through the `main` field of its `package.json`, then `index.*`.

use argschema_manifest::{PackageManifest, MANIFEST_FILE};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Extensions tried, in order, for extensionless specifiers
pub const EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "json"];

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Empty module specifier")]
    EmptySpecifier,

    #[error("Cannot find module '{specifier}' from {}", base.display())]
    NotFound { specifier: String, base: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve `specifier` as if it were required from a module in `base_dir`
pub fn resolve_from(base_dir: &Path, specifier: &str) -> Result<PathBuf, ResolveError> {
    if specifier.trim().is_empty() {
        return Err(ResolveError::EmptySpecifier);
    }

    let resolved = if is_path_specifier(specifier) {
        resolve_path(&base_dir.join(specifier))
    } else {
        base_dir
            .ancestors()
            .map(|dir| dir.join("node_modules").join(specifier))
            .find_map(|candidate| resolve_path(&candidate))
            .or_else(|| resolve_path(&base_dir.join(specifier)))
    };

    let resolved = resolved.ok_or_else(|| ResolveError::NotFound {
        specifier: specifier.to_string(),
        base: base_dir.to_path_buf(),
    })?;

    debug!("Resolved '{}' to {:?}", specifier, resolved);
    Ok(std::fs::canonicalize(resolved)?)
}

fn is_path_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

fn resolve_path(candidate: &Path) -> Option<PathBuf> {
    resolve_as_file(candidate).or_else(|| resolve_as_directory(candidate))
}

fn resolve_as_file(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    EXTENSIONS
        .iter()
        .map(|ext| with_appended_extension(candidate, ext))
        .find(|path| path.is_file())
}

fn resolve_as_directory(candidate: &Path) -> Option<PathBuf> {
    if !candidate.is_dir() {
        return None;
    }

    let manifest_path = candidate.join(MANIFEST_FILE);
    if manifest_path.is_file() {
        match PackageManifest::load_from_path(&manifest_path) {
            Ok(manifest) => {
                if let Some(main) = manifest.main_entry() {
                    let main_path = candidate.join(main);
                    if let Some(found) =
                        resolve_as_file(&main_path).or_else(|| resolve_index(&main_path))
                    {
                        return Some(found);
                    }
                }
            }
            Err(e) => debug!("Ignoring unreadable {:?}: {}", manifest_path, e),
        }
    }

    resolve_index(candidate)
}

fn resolve_index(dir: &Path) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("index.{}", ext)))
        .find(|path| path.is_file())
}

fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
