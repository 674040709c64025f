//! Boundary between module loading and translation
//!
//! Loaders (static analysis, JSON export files, test doubles) implement
//! [`DriverMetadataProvider`]; the translator only ever sees the constraint map.

use crate::constraints::ArgsConstraints;
use crate::schema::DriverSchema;
use crate::translate::{translate_with, TranslateOptions};

/// Metadata exposed by a driver's main class
pub trait DriverMetadataProvider {
    /// Name of the exported driver class (`appium.mainClass`)
    fn main_class(&self) -> &str;

    /// The class's `argsConstraints`, if it declares any
    fn args_constraints(&self) -> Option<&ArgsConstraints>;
}

/// Build the schema for a driver, or `None` if the driver declares no constraints
pub fn schema_for_driver<P: DriverMetadataProvider + ?Sized>(
    package_name: &str,
    provider: &P,
    options: &TranslateOptions,
) -> Option<DriverSchema> {
    let constraints = provider.args_constraints()?;
    tracing::debug!(
        "Building schema for {} from {} constraints on {}",
        package_name,
        constraints.len(),
        provider.main_class()
    );
    Some(translate_with(package_name, constraints, options))
}
