//! Tool descriptor and tool call types

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A tool as presented to the model: name, description, parameter schema.
///
/// Every upstream shape is converted once, here, so the rest of the crate
/// only ever deals with this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name (function name)
    pub name: String,
    /// Description of what the tool does
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub parameter_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

impl ToolDescriptor {
    /// Create a new tool descriptor with an empty object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema: empty_object_schema(),
        }
    }

    /// Set the parameter schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.parameter_schema = schema;
        self
    }

    /// Build a descriptor from a loosely shaped JSON object.
    ///
    /// Accepts `name` or `tool_name`, and `parameters`, `inputSchema` or
    /// `input_schema` for the schema. Returns `None` when no name is present.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = obj
            .get("name")
            .or_else(|| obj.get("tool_name"))
            .and_then(Value::as_str)?;
        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let schema = ["parameters", "inputSchema", "input_schema"]
            .iter()
            .find_map(|key| obj.get(*key))
            .cloned()
            .unwrap_or_else(empty_object_schema);

        Some(Self {
            name: name.to_string(),
            description: description.to_string(),
            parameter_schema: schema,
        })
    }
}

impl From<&rmcp::model::Tool> for ToolDescriptor {
    fn from(tool: &rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool
                .description
                .as_deref()
                .map(str::to_string)
                .unwrap_or_default(),
            parameter_schema: Value::Object(Map::clone(&tool.input_schema)),
        }
    }
}

/// Tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Input arguments for the tool
    pub input: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Arguments serialized as the JSON string the wire format carries
    pub fn arguments_json(&self) -> String {
        match &self.input {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_descriptor_from_value_spellings() {
        let a = ToolDescriptor::from_value(&json!({
            "name": "search",
            "description": "Search docs",
            "parameters": {"type": "object", "properties": {"q": {"type": "string"}}}
        }))
        .unwrap();
        assert_eq!(a.name, "search");
        assert_eq!(a.parameter_schema["properties"]["q"]["type"], "string");

        let b = ToolDescriptor::from_value(&json!({
            "tool_name": "lookup",
            "inputSchema": {"type": "object"}
        }))
        .unwrap();
        assert_eq!(b.name, "lookup");
        assert_eq!(b.description, "");

        let c = ToolDescriptor::from_value(&json!({"name": "bare"})).unwrap();
        assert_eq!(c.parameter_schema, empty_object_schema());

        assert!(ToolDescriptor::from_value(&json!({"description": "nameless"})).is_none());
    }

    #[test]
    fn test_descriptor_from_mcp_tool() {
        let schema = json!({"type": "object", "properties": {"id": {"type": "integer"}}});
        let tool = rmcp::model::Tool::new(
            "get_deal",
            "Fetch a deal | wouter",
            Arc::new(schema.as_object().cloned().unwrap()),
        );

        let descriptor = ToolDescriptor::from(&tool);
        assert_eq!(descriptor.name, "get_deal");
        assert_eq!(descriptor.description, "Fetch a deal | wouter");
        assert_eq!(descriptor.parameter_schema, schema);
    }

    #[test]
    fn test_tool_call_arguments_json() {
        let call = ToolCall::new("call_1", "search", json!({"q": "rust"}));
        assert_eq!(call.arguments_json(), r#"{"q":"rust"}"#);

        let raw = ToolCall::new("call_2", "search", Value::String("{\"q\":1}".into()));
        assert_eq!(raw.arguments_json(), "{\"q\":1}");
    }
}
