//! User configuration for args-to-schema
//!
//! Settings live in a TOML file. The location is, in order of precedence:
//! - the `ARGSCHEMA_CONFIG` environment variable
//! - `<config dir>/argschema/argschema.toml` (`~/.config` on Unix)
//!
//! A missing file is not an error; every key has a built-in default and command-line
//! flags override whatever the file says.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "ARGSCHEMA_CONFIG";
const CONFIG_DIR_NAME: &str = "argschema";
const CONFIG_FILE_NAME: &str = "argschema.toml";

/// Keys accepted by `get`/`set`, in display order
pub const KEYS: &[&str] = &["schema-draft", "semantics", "indent", "follow-imports"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine the configuration directory")]
    NoConfigDir,

    #[error("Unknown config key: {0}. Supported keys: {keys}", keys = KEYS.join(", "))]
    UnknownKey(String),

    #[error("Invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// `$schema` URL written into generated schemas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_draft: Option<String>,
    /// `descriptor` or `legacy`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantics: Option<String>,
    /// Indentation for manifests whose own indentation cannot be detected: `tab` or a width
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_imports: Option<bool>,
}

impl Config {
    /// Resolved path of the config file
    pub fn path() -> Result<PathBuf, ConfigError> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Directory holding the config file (also used for the log file)
    pub fn dir() -> Result<PathBuf, ConfigError> {
        let path = Self::path()?;
        Ok(path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(&Self::path()?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match key {
            "schema-draft" => Ok(self.schema_draft.clone()),
            "semantics" => Ok(self.semantics.clone()),
            "indent" => Ok(self.indent.clone()),
            "follow-imports" => Ok(self.follow_imports.map(|b| b.to_string())),
            _ => Err(ConfigError::UnknownKey(key.to_string())),
        }
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        match key {
            "schema-draft" => self.schema_draft = Some(value),
            "semantics" => {
                let normalized = value.trim().to_ascii_lowercase();
                if normalized != "descriptor" && normalized != "legacy" {
                    return Err(invalid(key, value, "'descriptor' or 'legacy'"));
                }
                self.semantics = Some(normalized);
            }
            "indent" => {
                let trimmed = value.trim();
                if !trimmed.eq_ignore_ascii_case("tab") && trimmed.parse::<usize>().is_err() {
                    return Err(invalid(key, value, "'tab' or a number of spaces"));
                }
                self.indent = Some(trimmed.to_string());
            }
            "follow-imports" => match value.trim().parse::<bool>() {
                Ok(b) => self.follow_imports = Some(b),
                Err(_) => return Err(invalid(key, value, "'true' or 'false'")),
            },
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values_iter().is_empty()
    }

    /// Set keys and their values, in display order
    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .filter_map(|key| self.get(key).ok().flatten().map(|value| (*key, value)))
            .collect()
    }
}

fn invalid(key: &str, value: String, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value,
        expected,
    }
}
