//! JSON export descriptors
//!
//! A `.json` module stands in for a module namespace object: top-level keys are export
//! names, values are the exported objects.
//!
//! ```json
//! { "FakeDriver": { "argsConstraints": { "port": { "isNumber": true } } } }
//! ```

use serde_json::Value;
use std::fs;
use std::path::Path;

use argschema_core::constraints::is_truthy;

use crate::{FoundConstraints, LoadError};

/// Look up `argsConstraints` on `exports[main_class] ?? exports.default ?? exports`
pub(crate) fn find_constraints(
    path: &Path,
    main_class: &str,
) -> Result<Option<FoundConstraints>, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let exports: Value = serde_json::from_str(&content).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let present = |v: &&Value| !v.is_null();
    let (origin, target) = match exports.get(main_class).filter(present) {
        Some(target) => (format!("export {}", main_class), target),
        None => match exports.get("default").filter(present) {
            Some(target) => ("default export".to_string(), target),
            None => ("module exports".to_string(), &exports),
        },
    };

    Ok(target
        .get("argsConstraints")
        .filter(|value| is_truthy(value))
        .map(|value| FoundConstraints {
            value: value.clone(),
            source: path.to_path_buf(),
            origin,
        }))
}

#[cfg(test)]
mod tests {
    use crate::json_module::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_module(dir: &Path, value: Value) -> std::path::PathBuf {
        let path = dir.join("driver.json");
        assert!(fs::write(&path, value.to_string()).is_ok());
        path
    }

    #[test]
    fn test_named_export_wins() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = write_module(
            temp_dir.path(),
            json!({
                "FakeDriver": {"argsConstraints": {"a": {}}},
                "default": {"argsConstraints": {"b": {}}}
            }),
        );
        let found = find_constraints(&path, "FakeDriver");
        assert!(found.is_ok_and(|f| f.is_some_and(|f| f.value == json!({"a": {}}))));
    }

    #[test]
    fn test_default_then_module_fallback() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = write_module(
            temp_dir.path(),
            json!({"default": {"argsConstraints": {"b": {}}}}),
        );
        let found = find_constraints(&path, "FakeDriver");
        assert!(found.is_ok_and(|f| f.is_some_and(|f| f.origin == "default export")));

        let path = write_module(temp_dir.path(), json!({"argsConstraints": {"c": {}}}));
        let found = find_constraints(&path, "FakeDriver");
        assert!(found.is_ok_and(|f| f.is_some_and(|f| f.value == json!({"c": {}}))));
    }

    #[test]
    fn test_named_export_without_constraints() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = write_module(
            temp_dir.path(),
            json!({"FakeDriver": {}, "default": {"argsConstraints": {"b": {}}}}),
        );
        assert!(matches!(find_constraints(&path, "FakeDriver"), Ok(None)));
    }

    #[test]
    fn test_invalid_json() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("driver.json");
        assert!(fs::write(&path, "{not json").is_ok());
        assert!(matches!(
            find_constraints(&path, "FakeDriver"),
            Err(LoadError::Json { .. })
        ));
    }
}
