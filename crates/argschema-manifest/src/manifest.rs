//! Package manifest operations - lookup, field access, and guarded persistence
//!
//! Only the fields this tool needs are interpreted; every other field is carried through
//! untouched and in its original order.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::ManifestError;
use crate::manifest_writer::{self, Indent};

pub const MANIFEST_FILE: &str = "package.json";

/// Namespace holding Appium extension metadata
pub const APPIUM_FIELD: &str = "appium";
pub const MAIN_CLASS_FIELD: &str = "mainClass";
pub const SCHEMA_FIELD: &str = "schema";

/// A parsed `package.json` together with what is needed to write it back safely
#[derive(Debug, Clone)]
pub struct PackageManifest {
    path: PathBuf,
    data: Map<String, Value>,
    indent: Option<Indent>,
    fingerprint: u64,
}

impl PackageManifest {
    /// Find the nearest `package.json` at or above `start`
    ///
    /// When `start` is a file the search begins in its directory.
    pub fn find_up(start: &Path) -> Option<PathBuf> {
        let first = if start.is_file() {
            start.parent()?
        } else {
            start
        };

        first
            .ancestors()
            .map(|dir| dir.join(MANIFEST_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load the nearest manifest at or above `start`
    pub fn load_nearest(start: &Path) -> Result<Self, ManifestError> {
        let path =
            Self::find_up(start).ok_or_else(|| ManifestError::NotFound(start.to_path_buf()))?;
        Self::load_from_path(&path)
    }

    /// Load a manifest from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ManifestError> {
        debug!("Reading manifest from: {:?}", path);

        let content = fs::read_to_string(path)?;
        let data = match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => map,
            _ => return Err(ManifestError::NotAnObject(path.to_path_buf())),
        };

        Ok(PackageManifest {
            path: path.to_path_buf(),
            data,
            indent: Indent::detect(&content),
            fingerprint: manifest_writer::fingerprint(content.as_bytes()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Indentation used when saving: the detected one, or two spaces
    pub fn indent(&self) -> Indent {
        self.indent.unwrap_or_default()
    }

    /// Indentation found in the file, if it had any indented lines
    pub fn detected_indent(&self) -> Option<Indent> {
        self.indent
    }

    /// Override the indentation used when the manifest is saved
    pub fn set_indent(&mut self, indent: Indent) {
        self.indent = Some(indent);
    }

    /// Package name, if declared as a string
    pub fn name(&self) -> Option<&str> {
        self.data.get("name").and_then(Value::as_str)
    }

    /// The `main` entry point, if declared
    pub fn main_entry(&self) -> Option<&str> {
        self.data
            .get("main")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn appium(&self) -> Option<&Map<String, Value>> {
        self.data.get(APPIUM_FIELD).and_then(Value::as_object)
    }

    /// `appium.mainClass`; empty strings count as missing
    pub fn main_class(&self) -> Option<&str> {
        self.appium()
            .and_then(|appium| appium.get(MAIN_CLASS_FIELD))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// `appium.schema`, unless it is falsy (null, false, 0 or "")
    pub fn schema(&self) -> Option<&Value> {
        self.appium()
            .and_then(|appium| appium.get(SCHEMA_FIELD))
            .filter(|v| match v {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                Value::String(s) => !s.is_empty(),
                Value::Array(_) | Value::Object(_) => true,
            })
    }

    pub fn has_schema(&self) -> bool {
        self.schema().is_some()
    }

    /// Set `appium.schema`, creating the `appium` object if needed
    pub fn set_schema(&mut self, schema: Value) -> Result<(), ManifestError> {
        let appium = self
            .data
            .entry(APPIUM_FIELD)
            .or_insert_with(|| Value::Object(Map::new()));

        match appium {
            Value::Object(map) => {
                map.insert(SCHEMA_FIELD.to_string(), schema);
                Ok(())
            }
            _ => Err(ManifestError::InvalidField {
                field: APPIUM_FIELD.to_string(),
                path: self.path.clone(),
            }),
        }
    }

    /// Render the manifest as it would be written
    pub fn render(&self) -> Result<String, ManifestError> {
        manifest_writer::render(&self.data, self.indent())
    }

    /// Write the manifest back to the file it was loaded from
    ///
    /// Fails with [`ManifestError::ConcurrentModification`] if the file on disk no longer
    /// matches what was loaded.
    pub fn save(&mut self) -> Result<(), ManifestError> {
        let on_disk = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::ConcurrentModification(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        if manifest_writer::fingerprint(&on_disk) != self.fingerprint {
            return Err(ManifestError::ConcurrentModification(self.path.clone()));
        }

        let content = self.render()?;
        manifest_writer::write_atomic(&self.path, &content)?;
        self.fingerprint = manifest_writer::fingerprint(content.as_bytes());

        info!("Manifest written successfully to: {:?}", self.path);
        Ok(())
    }
}
