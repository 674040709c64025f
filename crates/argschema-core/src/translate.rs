//! Constraint map to driver schema translation

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::constraints::{ArgsConstraints, ConstraintDescriptor};
use crate::naming::{camel_case, kebab_case};
use crate::schema::{DriverSchema, ItemsSchema, JsonType, SchemaProperty, DEFAULT_SCHEMA_DRAFT};

/// Which record the array/object/enum/required rules are evaluated against
///
/// The first Appium migration script tested those four rules against the property it was
/// building instead of the descriptor, so they never applied. `Legacy` reproduces that output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConstraintSemantics {
    #[default]
    Descriptor,
    Legacy,
}

impl FromStr for ConstraintSemantics {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "descriptor" => Ok(ConstraintSemantics::Descriptor),
            "legacy" => Ok(ConstraintSemantics::Legacy),
            other => Err(format!(
                "unknown constraint semantics '{}' (expected 'descriptor' or 'legacy')",
                other
            )),
        }
    }
}

impl fmt::Display for ConstraintSemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSemantics::Descriptor => write!(f, "descriptor"),
            ConstraintSemantics::Legacy => write!(f, "legacy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateOptions {
    pub semantics: ConstraintSemantics,
    /// Value of the `$schema` keyword
    pub schema_draft: String,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        TranslateOptions {
            semantics: ConstraintSemantics::default(),
            schema_draft: DEFAULT_SCHEMA_DRAFT.to_string(),
        }
    }
}

/// Translate a constraint map with default options
pub fn translate(package_name: &str, constraints: &ArgsConstraints) -> DriverSchema {
    translate_with(package_name, constraints, &TranslateOptions::default())
}

/// Translate a constraint map into a driver schema
///
/// Properties are emitted in the iteration order of `constraints`. Two argument names
/// that normalize to the same property name collapse into one entry holding the later
/// descriptor's property.
pub fn translate_with(
    package_name: &str,
    constraints: &ArgsConstraints,
    options: &TranslateOptions,
) -> DriverSchema {
    let mut schema = DriverSchema::envelope(package_name, &options.schema_draft);

    for (arg_name, spec) in constraints.iter() {
        let prop_name = kebab_case(arg_name);
        let prop = translate_property(arg_name, &prop_name, spec, options.semantics);

        if options.semantics == ConstraintSemantics::Descriptor && spec.presence {
            schema.require(&prop_name);
        }

        debug!("Translated argument '{}' -> property '{}'", arg_name, prop_name);
        if schema.properties.insert(prop_name.clone(), prop).is_some() {
            warn!(
                "Argument '{}' normalizes to '{}', which was already defined; overwriting",
                arg_name, prop_name
            );
        }
    }

    schema
}

fn translate_property(
    arg_name: &str,
    prop_name: &str,
    spec: &ConstraintDescriptor,
    semantics: ConstraintSemantics,
) -> SchemaProperty {
    let mut prop = SchemaProperty::default();

    if spec.is_string {
        prop.property_type = Some(JsonType::String);
    } else if spec.is_boolean {
        prop.property_type = Some(JsonType::Boolean);
    } else if spec.is_number {
        prop.property_type = Some(JsonType::Integer);
    }

    if semantics == ConstraintSemantics::Descriptor {
        if spec.is_array {
            prop.property_type = Some(JsonType::Array);
            prop.items = Some(ItemsSchema {
                item_type: JsonType::String,
            });
        }
        if spec.is_object {
            prop.property_type = Some(JsonType::Object);
            prop.allow_additional_properties = Some(true);
        }
        if let Some(values) = &spec.inclusion {
            prop.allowed_values = Some(values.clone());
        }
    }

    if camel_case(arg_name) != prop_name {
        prop.appium_cli_dest = Some(arg_name.to_string());
    }

    prop
}
