//! Tool definition types for describing tools to the model.
//!
//! Browser runtimes have no function-calling API, so definitions are rendered
//! into the system prompt rather than sent as a separate request field.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// JSON Schema for an object type (tool parameters).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectJsonSchema {
    /// The schema type (always "object" for tool parameters).
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Property definitions, in declaration order.
    pub properties: IndexMap<String, JsonValue>,

    /// List of required property names.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
}

impl ObjectJsonSchema {
    /// Create a new empty object schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }

    /// Add a property to the schema.
    #[must_use]
    pub fn with_property(mut self, name: &str, schema: JsonValue, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required && !self.is_required(name) {
            self.required.push(name.to_string());
        }
        self
    }

    /// Check if a property is required.
    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Get the number of properties.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

impl Default for ObjectJsonSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectJsonSchema> for JsonValue {
    fn from(schema: ObjectJsonSchema) -> Self {
        let mut object = serde_json::Map::new();
        object.insert("type".into(), JsonValue::String(schema.schema_type));
        object.insert(
            "properties".into(),
            JsonValue::Object(schema.properties.into_iter().collect()),
        );
        if !schema.required.is_empty() {
            object.insert(
                "required".into(),
                JsonValue::Array(schema.required.into_iter().map(JsonValue::String).collect()),
            );
        }
        JsonValue::Object(object)
    }
}

/// A tool the model may call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,

    /// Human-readable description of what the tool does.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// JSON Schema for the tool's parameters.
    #[serde(default = "empty_parameters")]
    pub parameters: JsonValue,
}

fn empty_parameters() -> JsonValue {
    ObjectJsonSchema::new().into()
}

impl ToolDefinition {
    /// Create a new tool definition with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: empty_parameters(),
        }
    }

    /// Set the parameters schema.
    #[must_use]
    pub fn with_parameters(mut self, schema: impl Into<JsonValue>) -> Self {
        self.parameters = schema.into();
        self
    }

    /// Get the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the parameters schema.
    #[must_use]
    pub fn parameters(&self) -> &JsonValue {
        &self.parameters
    }

    /// JSON shape listed in the tool-calling system prompt.
    #[must_use]
    pub fn to_prompt_json(&self) -> JsonValue {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_json_schema_with_property() {
        let schema = ObjectJsonSchema::new()
            .with_property("city", json!({"type": "string"}), true)
            .with_property("unit", json!({"type": "string"}), false)
            .with_property("city", json!({"type": "string"}), true);

        assert_eq!(schema.property_count(), 2);
        assert!(schema.is_required("city"));
        assert!(!schema.is_required("unit"));
        assert_eq!(schema.required, vec!["city".to_string()]);
    }

    #[test]
    fn test_schema_into_json_keeps_order() {
        let value: JsonValue = ObjectJsonSchema::new()
            .with_property("b", json!({"type": "string"}), false)
            .with_property("a", json!({"type": "number"}), true)
            .into();
        assert_eq!(value["type"], "object");
        assert_eq!(value["required"], json!(["a"]));
        let keys: Vec<_> = value["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_tool_definition_defaults() {
        let def = ToolDefinition::new("getWeather", "Get the current weather");
        assert_eq!(def.name(), "getWeather");
        assert_eq!(def.parameters()["type"], "object");

        let parsed: ToolDefinition = serde_json::from_str(r#"{"name":"ping"}"#).unwrap();
        assert_eq!(parsed.description, "");
        assert_eq!(parsed.parameters["type"], "object");
    }

    #[test]
    fn test_to_prompt_json() {
        let def = ToolDefinition::new("getWeather", "Weather lookup").with_parameters(
            ObjectJsonSchema::new().with_property("city", json!({"type": "string"}), true),
        );
        let value = def.to_prompt_json();
        assert_eq!(value["name"], "getWeather");
        assert_eq!(value["parameters"]["required"], json!(["city"]));
    }
}
