//! Serialization and atomic write-back of `package.json`
//!
//! Output keeps the indentation of the file it replaces and always ends with a newline,
//! matching what npm and most editors produce.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::hash::Hasher;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::errors::ManifestError;

/// Indentation unit of a JSON document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indent {
    Tab,
    Spaces(usize),
}

impl Default for Indent {
    fn default() -> Self {
        Indent::Spaces(2)
    }
}

impl Indent {
    /// Detect the indentation unit from the first indented line of `content`
    pub fn detect(content: &str) -> Option<Indent> {
        content.lines().find_map(|line| {
            let trimmed = line.trim_start_matches([' ', '\t']);
            if trimmed.is_empty() || trimmed.len() == line.len() {
                return None;
            }
            let leading = &line[..line.len() - trimmed.len()];
            if leading.starts_with('\t') {
                Some(Indent::Tab)
            } else {
                Some(Indent::Spaces(leading.chars().take_while(|c| *c == ' ').count()))
            }
        })
    }

    /// Parse a configured indent: `tab` or a number of spaces
    pub fn parse(value: &str) -> Option<Indent> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("tab") {
            return Some(Indent::Tab);
        }
        value.parse::<usize>().ok().map(Indent::Spaces)
    }

    fn unit(self) -> Vec<u8> {
        match self {
            Indent::Tab => b"\t".to_vec(),
            Indent::Spaces(n) => vec![b' '; n],
        }
    }
}

/// Render a manifest object with the given indentation and a trailing newline
pub fn render(data: &Map<String, Value>, indent: Indent) -> Result<String, ManifestError> {
    let unit = indent.unit();
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&unit);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut serializer)
        .map_err(|e| ManifestError::Serialize(e.to_string()))?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| ManifestError::Serialize(e.to_string()))
}

/// Fingerprint of file contents, used to detect writes by other processes
pub fn fingerprint(content: &[u8]) -> u64 {
    let mut hasher = ahash::AHasher::default();
    hasher.write(content);
    hasher.finish()
}

/// Replace `path` with `content` through a temporary sibling file and a rename
///
/// The temporary file is removed on every failure path, and the replacement keeps the
/// permissions of the file it replaces.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), ManifestError> {
    debug!("Writing manifest to: {:?}", path);

    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".package.json.")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }
    temp.as_file().sync_all()?;

    temp.persist(path)
        .map_err(|e| ManifestError::Io(e.error))?;
    Ok(())
}
