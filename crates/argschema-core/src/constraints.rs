//! Argument constraint descriptors
//!
//! Drivers declare their CLI arguments as a map of argument name to a constraint
//! descriptor, for example:
//!
//! ```json
//! {
//!   "webkitDebugProxyPort": { "isNumber": true },
//!   "platform": { "presence": true, "inclusion": ["iOS", "Android"] }
//! }
//! ```
//!
//! Flag values are read the way the JavaScript that declared them would read them, so
//! `presence: { "allowEmpty": false }` still marks an argument as required.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("argsConstraints must be an object, found {0}")]
    NotAnObject(&'static str),
}

/// Constraint descriptor for a single argument
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintDescriptor {
    pub is_string: bool,
    pub is_boolean: bool,
    pub is_number: bool,
    pub is_array: bool,
    pub is_object: bool,
    /// Allowed literal values, in declaration order
    pub inclusion: Option<Vec<Value>>,
    pub presence: bool,
}

impl ConstraintDescriptor {
    /// Read a descriptor from its JSON form. Anything that is not an object has no flags set.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let flag = |key: &str| obj.get(key).map(is_truthy).unwrap_or(false);

        let inclusion = match obj.get("inclusion") {
            Some(Value::Array(values)) => Some(values.clone()),
            Some(other) if is_truthy(other) => {
                tracing::warn!("Ignoring non-array inclusion constraint: {}", other);
                None
            }
            _ => None,
        };

        ConstraintDescriptor {
            is_string: flag("isString"),
            is_boolean: flag("isBoolean"),
            is_number: flag("isNumber"),
            is_array: flag("isArray"),
            is_object: flag("isObject"),
            inclusion,
            presence: flag("presence"),
        }
    }
}

/// Ordered map of argument name to descriptor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgsConstraints {
    entries: Vec<(String, ConstraintDescriptor)>,
}

impl ArgsConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `argsConstraints` object of a driver class
    pub fn from_value(value: &Value) -> Result<Self, ConstraintError> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(ConstraintError::NotAnObject(json_kind(other))),
        }
    }

    /// Entries are taken in JavaScript property order, see [`js_property_order`]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut entries: Vec<_> = map.iter().collect();
        entries.sort_by_key(|(name, _)| property_rank(name));
        entries
            .into_iter()
            .map(|(name, spec)| (name.clone(), ConstraintDescriptor::from_value(spec)))
            .collect()
    }

    /// Insert a descriptor. Re-inserting a name replaces it in place.
    pub fn insert(&mut self, name: impl Into<String>, descriptor: ConstraintDescriptor) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = descriptor,
            None => self.entries.push((name, descriptor)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ConstraintDescriptor> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConstraintDescriptor)> {
        self.entries.iter().map(|(name, d)| (name.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ConstraintDescriptor)> for ArgsConstraints {
    fn from_iter<I: IntoIterator<Item = (String, ConstraintDescriptor)>>(iter: I) -> Self {
        let mut constraints = ArgsConstraints::new();
        for (name, descriptor) in iter {
            constraints.insert(name, descriptor);
        }
        constraints
    }
}

/// JavaScript truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Reorder keys the way a JavaScript object iterates them: array-index keys first in
/// ascending numeric order, then every other key in insertion order
pub fn js_property_order(map: Map<String, Value>) -> Map<String, Value> {
    if !map.keys().any(|key| array_index(key).is_some()) {
        return map;
    }
    let mut entries: Vec<_> = map.into_iter().collect();
    entries.sort_by_key(|(key, _)| property_rank(key));
    entries.into_iter().collect()
}

// Stable sorts by this rank keep named keys in insertion order
fn property_rank(key: &str) -> (u8, u32) {
    match array_index(key) {
        Some(index) => (0, index),
        None => (1, 0),
    }
}

/// Canonical array index: a decimal integer below 2^32 - 1 without sign or leading zeros
fn array_index(key: &str) -> Option<u32> {
    let index = key.parse::<u32>().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
