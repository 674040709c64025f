//! Driver configuration schema types
//!
//! The serialized key order of every type here is part of the output format: the schema
//! is written into `package.json` and diffed by humans.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use smallvec::SmallVec;

/// JSON Schema draft recorded in `$schema` unless configured otherwise
pub const DEFAULT_SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Boolean,
    Integer,
    Array,
    Object,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemsSchema {
    #[serde(rename = "type")]
    pub item_type: JsonType,
}

/// One property of the driver schema, derived from a single constraint descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaProperty {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<JsonType>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemsSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_additional_properties: Option<bool>,
    /// Original argument name, when it cannot be recovered by camel-casing the property name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appium_cli_dest: Option<String>,
}

/// Insertion-ordered property map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaProperties {
    entries: Vec<(String, SchemaProperty)>,
}

impl SchemaProperties {
    /// Insert a property; an existing key keeps its position and takes the new value
    pub fn insert(&mut self, name: String, property: SchemaProperty) -> Option<SchemaProperty> {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, property)),
            None => {
                self.entries.push((name, property));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaProperty> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, p)| p)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaProperty)> {
        self.entries.iter().map(|(name, p)| (name.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SchemaProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, property) in &self.entries {
            map.serialize_entry(name, property)?;
        }
        map.end()
    }
}

/// Complete configuration schema for one driver package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverSchema {
    #[serde(rename = "$schema")]
    pub schema: String,
    #[serde(rename = "type")]
    pub schema_type: JsonType,
    pub properties: SchemaProperties,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<SmallVec<[String; 4]>>,
}

impl DriverSchema {
    /// Empty schema envelope for a package
    pub fn envelope(package_name: &str, schema_draft: &str) -> Self {
        DriverSchema {
            schema: schema_draft.to_string(),
            schema_type: JsonType::Object,
            properties: SchemaProperties::default(),
            additional_properties: false,
            title: format!("{} Driver Configuration", package_name),
            description: format!(
                "Appium configuration schema for the {} driver.",
                package_name
            ),
            required: None,
        }
    }

    /// Mark a property as required, keeping the first position of repeated names
    pub(crate) fn require(&mut self, prop_name: &str) {
        let required = self.required.get_or_insert_with(SmallVec::new);
        if !required.iter().any(|name| name == prop_name) {
            required.push(prop_name.to_string());
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::*;
    use serde_json::json;

    #[test]
    fn test_envelope_key_order() {
        let schema = DriverSchema::envelope("foo", DEFAULT_SCHEMA_DRAFT);
        let Ok(json) = serde_json::to_string(&schema) else {
            panic!("schema should serialize");
        };
        assert_eq!(
            json,
            r#"{"$schema":"http://json-schema.org/draft-07/schema","type":"object","properties":{},"additionalProperties":false,"title":"foo Driver Configuration","description":"Appium configuration schema for the foo driver."}"#
        );
    }

    #[test]
    fn test_property_serialization() {
        let property = SchemaProperty {
            property_type: Some(JsonType::Array),
            items: Some(ItemsSchema {
                item_type: JsonType::String,
            }),
            appium_cli_dest: Some("someArgs".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&property).ok(),
            Some(json!({
                "type": "array",
                "items": {"type": "string"},
                "appiumCliDest": "someArgs"
            }))
        );
    }

    #[test]
    fn test_properties_replace_in_place() {
        let mut props = SchemaProperties::default();
        props.insert("a".to_string(), SchemaProperty::default());
        props.insert("b".to_string(), SchemaProperty::default());
        let previous = props.insert(
            "a".to_string(),
            SchemaProperty {
                property_type: Some(JsonType::Boolean),
                ..Default::default()
            },
        );
        assert_eq!(previous, Some(SchemaProperty::default()));
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(
            props.get("a").and_then(|p| p.property_type),
            Some(JsonType::Boolean)
        );
    }

    #[test]
    fn test_require_is_deduplicated() {
        let mut schema = DriverSchema::envelope("foo", DEFAULT_SCHEMA_DRAFT);
        schema.require("a");
        schema.require("b");
        schema.require("a");
        assert_eq!(
            schema.required.as_ref().map(|r| r.to_vec()),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }
}
