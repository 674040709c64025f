//! Appium driver argument constraints to JSON Schema
//!
//! Drivers used to declare their CLI arguments through an `argsConstraints` map on the
//! driver class. This crate converts that map into the JSON Schema document Appium reads
//! from the `appium.schema` field of the driver's `package.json`.
//!
//! Module loading and manifest handling live in sibling crates; everything here is a pure
//! function of its inputs.

pub mod constraints;
pub mod naming;
pub mod provider;
pub mod schema;
pub mod translate;

pub use constraints::{ArgsConstraints, ConstraintDescriptor, ConstraintError};
pub use provider::{schema_for_driver, DriverMetadataProvider};
pub use schema::{DriverSchema, JsonType, SchemaProperties, SchemaProperty, DEFAULT_SCHEMA_DRAFT};
pub use translate::{translate, translate_with, ConstraintSemantics, TranslateOptions};
