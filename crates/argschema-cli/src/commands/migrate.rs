//! Migrate a driver's `argsConstraints` into `appium.schema` of its package.json
//!
//! Steps, each of which ends the run on failure:
//! 1. resolve the driver specifier from the working directory
//! 2. find the nearest package.json and its `appium.mainClass`
//! 3. statically load the main class's constraints
//! 4. refuse if `appium.schema` already exists
//! 5. translate and write the manifest (skipped with `--dry-run`)

use crate::errors::MigrateError;
use crate::logger;
use argschema_config::Config;
use argschema_core::{
    schema_for_driver, ConstraintSemantics, DriverSchema, TranslateOptions, DEFAULT_SCHEMA_DRAFT,
};
use argschema_loader::{load_driver, resolve_from, LoadOptions};
use argschema_manifest::{Indent, ManifestError, PackageManifest};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Args, Debug, Clone, Default)]
pub struct MigrateArgs {
    /// Driver to migrate: a path such as ./my-driver, or an installed package name
    #[arg(value_name = "DRIVER")]
    pub driver: Option<String>,

    /// Print the schema without touching package.json
    #[arg(long)]
    pub dry_run: bool,

    /// How constraint descriptors are read: descriptor or legacy
    #[arg(long, value_name = "SEMANTICS")]
    pub semantics: Option<ConstraintSemantics>,

    /// `$schema` URL written into the generated schema
    #[arg(long, value_name = "URL")]
    pub schema_draft: Option<String>,

    /// Only inspect the driver's entry module
    #[arg(long)]
    pub no_follow_imports: bool,
}

/// Settings after layering command-line flags over the config file
#[derive(Debug, Clone, PartialEq)]
pub struct MigrateSettings {
    pub translate: TranslateOptions,
    pub load: LoadOptions,
    /// Used only when the manifest's own indentation cannot be detected
    pub fallback_indent: Option<Indent>,
}

impl MigrateSettings {
    pub fn resolve(args: &MigrateArgs, config: &Config) -> Result<Self, MigrateError> {
        let semantics = match (args.semantics, config.semantics.as_deref()) {
            (Some(semantics), _) => semantics,
            (None, Some(configured)) => configured.parse().map_err(MigrateError::Config)?,
            (None, None) => ConstraintSemantics::default(),
        };

        let schema_draft = args
            .schema_draft
            .clone()
            .or_else(|| config.schema_draft.clone())
            .unwrap_or_else(|| DEFAULT_SCHEMA_DRAFT.to_string());

        let fallback_indent = match config.indent.as_deref() {
            Some(raw) => Some(Indent::parse(raw).ok_or_else(|| {
                MigrateError::Config(format!(
                    "invalid indent '{}' (expected 'tab' or a number of spaces)",
                    raw
                ))
            })?),
            None => None,
        };

        Ok(MigrateSettings {
            translate: TranslateOptions {
                semantics,
                schema_draft,
            },
            load: LoadOptions {
                follow_imports: !args.no_follow_imports && config.follow_imports.unwrap_or(true),
                ..LoadOptions::default()
            },
            fallback_indent,
        })
    }
}

/// What a successful migration produced
#[derive(Debug)]
pub struct MigrateOutcome {
    pub module_path: PathBuf,
    pub manifest_path: PathBuf,
    pub main_class: String,
    pub schema: DriverSchema,
    pub written: bool,
}

/// Run the migration for `args.driver`, resolved relative to `cwd`
pub fn run_migrate(
    args: &MigrateArgs,
    settings: &MigrateSettings,
    cwd: &Path,
) -> Result<MigrateOutcome, MigrateError> {
    let driver = args
        .driver
        .as_deref()
        .filter(|driver| !driver.trim().is_empty())
        .ok_or(MigrateError::MissingDriver)?;

    let module_path = resolve_from(cwd, driver)?;
    logger::plain(&format!("resolved {} to {}", driver, module_path.display()));

    let mut manifest = PackageManifest::load_nearest(&module_path).map_err(|err| match err {
        ManifestError::NotFound(_) => MigrateError::ManifestNotFound(module_path.clone()),
        other => other.into(),
    })?;
    let manifest_path = manifest.path().to_path_buf();
    debug!("Using manifest {:?}", manifest_path);

    let main_class = manifest
        .main_class()
        .ok_or_else(|| MigrateError::NoMainClass(manifest_path.clone()))?
        .to_string();

    let driver_module = load_driver(&module_path, &main_class, &settings.load)?;

    if manifest.has_schema() {
        return Err(MigrateError::SchemaExists(driver.to_string()));
    }

    let package_name = package_name(&manifest);
    let schema = schema_for_driver(&package_name, &driver_module, &settings.translate)
        .ok_or_else(|| MigrateError::NoConstraints {
            driver: driver.to_string(),
            module: module_path.clone(),
            main_class: main_class.clone(),
        })?;

    let written = if args.dry_run {
        info!("Dry run: leaving {:?} untouched", manifest_path);
        false
    } else {
        manifest.set_schema(schema.to_value()?)?;
        if manifest.detected_indent().is_none() {
            if let Some(indent) = settings.fallback_indent {
                manifest.set_indent(indent);
            }
        }
        manifest.save()?;
        true
    };

    Ok(MigrateOutcome {
        module_path,
        manifest_path,
        main_class,
        schema,
        written,
    })
}

/// Package name used in the schema title; falls back to the package directory name
fn package_name(manifest: &PackageManifest) -> String {
    if let Some(name) = manifest.name() {
        return name.to_string();
    }

    let fallback = manifest
        .path()
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    logger::warn(&format!(
        "{} has no \"name\"; using '{}' in the schema title",
        manifest.path().display(),
        fallback
    ));
    fallback
}

/// Print the schema and the follow-up reminder
pub fn report(outcome: &MigrateOutcome) -> Result<(), MigrateError> {
    let rendered = outcome.schema.to_json_pretty()?;
    let header = if outcome.written {
        format!(
            "wrote the following schema to {}",
            outcome.manifest_path.display()
        )
    } else {
        format!(
            "dry run: would write the following schema to {}",
            outcome.manifest_path.display()
        )
    };
    logger::plain(&format!(
        "{}:\n\n{}\nIMPORTANT: Don't forget to remove argsConstraints from {}!",
        header, rendered, outcome.main_class
    ));
    Ok(())
}

/// Entry point for `args-to-schema [DRIVER]`
pub fn handle_migrate(args: &MigrateArgs) -> Result<(), MigrateError> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            logger::warn(&format!("Failed to load config, using defaults: {}", e));
            Config::default()
        }
    };
    let settings = MigrateSettings::resolve(args, &config)?;
    logger::step(&format!(
        "semantics={} schema-draft={} follow-imports={}",
        settings.translate.semantics, settings.translate.schema_draft, settings.load.follow_imports
    ));

    let cwd = std::env::current_dir()?;
    let outcome = run_migrate(args, &settings, &cwd)?;
    debug!("Migrated {:?}", outcome.module_path);
    report(&outcome)
}

#[cfg(test)]
mod tests {
    use crate::commands::migrate::*;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    const DRIVER_JS: &str = r#"
class FakeDriver {
  static argsConstraints = {
    someArg: { isString: true, presence: true },
    verbose: { isBoolean: true },
  };
}
module.exports = { FakeDriver };
"#;

    fn write_package(dir: &Path, manifest: &str, driver: &str) {
        assert!(fs::write(dir.join("package.json"), manifest).is_ok());
        assert!(fs::write(dir.join("driver.js"), driver).is_ok());
    }

    fn args_for(driver: &str) -> MigrateArgs {
        MigrateArgs {
            driver: Some(driver.to_string()),
            ..MigrateArgs::default()
        }
    }

    fn read_json(path: &Path) -> Value {
        let content = fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or(Value::Null)
    }

    fn default_settings() -> MigrateSettings {
        let Ok(settings) = MigrateSettings::resolve(&MigrateArgs::default(), &Config::default())
        else {
            panic!("default settings should resolve");
        };
        settings
    }

    #[test]
    fn test_settings_flags_override_config() {
        let config = Config {
            schema_draft: Some("https://example.com/draft".to_string()),
            semantics: Some("legacy".to_string()),
            indent: Some("tab".to_string()),
            follow_imports: Some(false),
        };
        let Ok(from_config) = MigrateSettings::resolve(&MigrateArgs::default(), &config) else {
            panic!("config settings should resolve");
        };
        assert_eq!(from_config.translate.semantics, ConstraintSemantics::Legacy);
        assert_eq!(from_config.translate.schema_draft, "https://example.com/draft");
        assert!(!from_config.load.follow_imports);
        assert_eq!(from_config.fallback_indent, Some(Indent::Tab));

        let args = MigrateArgs {
            semantics: Some(ConstraintSemantics::Descriptor),
            schema_draft: Some("urn:draft".to_string()),
            ..MigrateArgs::default()
        };
        let Ok(from_flags) = MigrateSettings::resolve(&args, &config) else {
            panic!("flag settings should resolve");
        };
        assert_eq!(from_flags.translate.semantics, ConstraintSemantics::Descriptor);
        assert_eq!(from_flags.translate.schema_draft, "urn:draft");
    }

    #[test]
    fn test_settings_reject_bad_config() {
        let config = Config {
            semantics: Some("strict".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            MigrateSettings::resolve(&MigrateArgs::default(), &config),
            Err(MigrateError::Config(_))
        ));
    }

    #[test]
    fn test_missing_driver() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let settings = default_settings();
        for driver in [None, Some(String::new()), Some("  ".to_string())] {
            let args = MigrateArgs {
                driver,
                ..MigrateArgs::default()
            };
            assert!(matches!(
                run_migrate(&args, &settings, temp_dir.path()),
                Err(MigrateError::MissingDriver)
            ));
        }
    }

    #[test]
    fn test_migrate_writes_schema() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        write_package(
            temp_dir.path(),
            r#"{"name": "foo", "appium": {"mainClass": "FakeDriver"}}"#,
            DRIVER_JS,
        );

        let result = run_migrate(&args_for("./driver"), &default_settings(), temp_dir.path());
        let Ok(outcome) = result else {
            panic!("migration should succeed: {:?}", result.err());
        };
        assert!(outcome.written);
        assert_eq!(outcome.main_class, "FakeDriver");

        let manifest = read_json(&temp_dir.path().join("package.json"));
        assert_eq!(
            manifest["appium"]["schema"],
            json!({
                "$schema": DEFAULT_SCHEMA_DRAFT,
                "type": "object",
                "properties": {
                    "some-arg": {"type": "string", "appiumCliDest": "someArg"},
                    "verbose": {"type": "boolean"}
                },
                "additionalProperties": false,
                "title": "foo Driver Configuration",
                "description": "Appium configuration schema for the foo driver.",
                "required": ["some-arg"]
            })
        );
        assert_eq!(manifest["appium"]["mainClass"], "FakeDriver");
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let original = r#"{"name": "foo", "appium": {"mainClass": "FakeDriver"}}"#;
        write_package(temp_dir.path(), original, DRIVER_JS);

        let args = MigrateArgs {
            dry_run: true,
            ..args_for("./driver.js")
        };
        let result = run_migrate(&args, &default_settings(), temp_dir.path());
        assert!(result.is_ok_and(|outcome| !outcome.written));
        let content = fs::read_to_string(temp_dir.path().join("package.json")).unwrap_or_default();
        assert_eq!(content, original);
    }

    #[test]
    fn test_missing_main_class() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        write_package(temp_dir.path(), r#"{"name": "foo"}"#, DRIVER_JS);
        assert!(matches!(
            run_migrate(&args_for("./driver"), &default_settings(), temp_dir.path()),
            Err(MigrateError::NoMainClass(_))
        ));
    }

    #[test]
    fn test_existing_schema_is_not_overwritten() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let original = r#"{"name": "foo", "appium": {"mainClass": "FakeDriver", "schema": {"type": "object"}}}"#;
        write_package(temp_dir.path(), original, DRIVER_JS);

        let result = run_migrate(&args_for("./driver"), &default_settings(), temp_dir.path());
        assert!(matches!(result, Err(MigrateError::SchemaExists(ref d)) if d == "./driver"));
        let content = fs::read_to_string(temp_dir.path().join("package.json")).unwrap_or_default();
        assert_eq!(content, original);
    }

    #[test]
    fn test_no_constraints() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        write_package(
            temp_dir.path(),
            r#"{"name": "foo", "appium": {"mainClass": "FakeDriver"}}"#,
            "class FakeDriver {}\nmodule.exports = { FakeDriver };\n",
        );
        assert!(matches!(
            run_migrate(&args_for("./driver"), &default_settings(), temp_dir.path()),
            Err(MigrateError::NoConstraints { ref main_class, .. }) if main_class == "FakeDriver"
        ));
    }

    #[test]
    fn test_unresolvable_driver() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        assert!(matches!(
            run_migrate(&args_for("./nowhere"), &default_settings(), temp_dir.path()),
            Err(MigrateError::Resolve(_))
        ));
    }

    #[test]
    fn test_missing_name_uses_directory() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let package_dir = temp_dir.path().join("appium-fake-driver");
        assert!(fs::create_dir_all(&package_dir).is_ok());
        write_package(&package_dir, r#"{"appium": {"mainClass": "FakeDriver"}}"#, DRIVER_JS);

        let args = MigrateArgs {
            dry_run: true,
            ..args_for("./appium-fake-driver/driver")
        };
        let result = run_migrate(&args, &default_settings(), temp_dir.path());
        assert!(result
            .is_ok_and(|outcome| outcome.schema.title == "appium-fake-driver Driver Configuration"));
    }

    #[test]
    fn test_fallback_indent_applies_to_compact_manifest() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        write_package(
            temp_dir.path(),
            r#"{"name": "foo", "appium": {"mainClass": "FakeDriver"}}"#,
            DRIVER_JS,
        );
        let settings = MigrateSettings {
            fallback_indent: Some(Indent::Tab),
            ..default_settings()
        };
        assert!(run_migrate(&args_for("./driver"), &settings, temp_dir.path()).is_ok());
        let content = fs::read_to_string(temp_dir.path().join("package.json")).unwrap_or_default();
        assert!(content.starts_with("{\n\t\"name\": \"foo\""));
        assert!(content.ends_with("}\n"));
    }
}
