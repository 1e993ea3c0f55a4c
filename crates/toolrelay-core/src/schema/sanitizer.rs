//! Parameter schema repair
//!
//! Tool providers hand out JSON Schemas that strict model validators reject:
//! arrays without `items`, properties without `type`, objects that only
//! declare `properties`. [`repair`] rewrites such schemas in place into the
//! nearest valid form. It is idempotent: a repaired schema is a fixed point.

use serde_json::{json, Map, Value};

use crate::types::ToolDescriptor;

/// Nodes deeper than this are left as they are
pub const MAX_DEPTH: usize = 10;

const COMPOSITION_KEYS: [&str; 3] = ["allOf", "anyOf", "oneOf"];
const NESTED_LIST_KEYS: [&str; 4] = ["allOf", "anyOf", "oneOf", "prefixItems"];

/// What a repair pass ran into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Some part of the schema lies beyond [`MAX_DEPTH`] and was not visited
    pub depth_limited: bool,
}

/// Repair a tool's top-level parameter schema in place
pub fn repair(schema: &mut Value) -> RepairReport {
    let reset = match schema {
        Value::Object(map) => map.is_empty(),
        _ => true,
    };
    if reset {
        *schema = json!({"type": "object", "properties": {}});
        return RepairReport::default();
    }

    if let Value::Object(map) = schema {
        if !map.contains_key("type") {
            map.insert("type".to_string(), json!("object"));
        }
        if type_includes(map, "object") && !matches!(map.get("properties"), Some(Value::Object(_)))
        {
            map.insert("properties".to_string(), json!({}));
        }
        if let Some(Value::Object(properties)) = map.get_mut("properties") {
            for property in properties.values_mut() {
                coerce_property(property);
            }
        }
    }

    let mut report = RepairReport::default();
    repair_node(schema, 0, &mut report);
    report
}

/// Repair the schema of one tool
pub fn repair_tool(tool: &mut ToolDescriptor) -> RepairReport {
    repair(&mut tool.parameter_schema)
}

/// Repair every tool; returns the names whose schemas hit the depth limit
pub fn repair_all(tools: &mut [ToolDescriptor]) -> Vec<String> {
    tools
        .iter_mut()
        .filter_map(|tool| repair_tool(tool).depth_limited.then(|| tool.name.clone()))
        .collect()
}

/// Top-level property without a usable type
fn coerce_property(property: &mut Value) {
    if let Value::Object(map) = property {
        if map.contains_key("type") || COMPOSITION_KEYS.iter().any(|k| map.contains_key(*k)) {
            return;
        }
        if map.contains_key("properties") {
            map.insert("type".to_string(), json!("object"));
            return;
        }
        if map.contains_key("items") || map.contains_key("prefixItems") {
            map.insert("type".to_string(), json!("array"));
            return;
        }
    }

    let mut coerced = Map::new();
    coerced.insert("type".to_string(), json!("string"));
    if let Some(description) = property.get("description").cloned() {
        coerced.insert("description".to_string(), description);
    }
    *property = Value::Object(coerced);
}

fn repair_node(node: &mut Value, depth: usize, report: &mut RepairReport) {
    let Value::Object(map) = node else {
        return;
    };
    if depth > MAX_DEPTH {
        report.depth_limited = true;
        return;
    }

    infer_object_type(map);

    if type_includes(map, "array") {
        if let Some(Value::Object(items_map)) = map.get_mut("items") {
            infer_object_type(items_map);
        }
        if !has_typed_items(map) {
            map.insert("items".to_string(), json!({"type": "string"}));
        }
    }

    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        for child in properties.values_mut() {
            repair_node(child, depth + 1, report);
        }
    }

    match map.get_mut("items") {
        Some(items @ Value::Object(_)) => repair_node(items, depth + 1, report),
        Some(Value::Array(list)) => {
            for child in list.iter_mut() {
                repair_node(child, depth + 1, report);
            }
        }
        _ => {}
    }

    for key in NESTED_LIST_KEYS {
        if let Some(Value::Array(list)) = map.get_mut(key) {
            for child in list.iter_mut() {
                repair_node(child, depth + 1, report);
            }
        }
    }
}

/// A node with a non-empty `properties` map and no `type` is an object
fn infer_object_type(map: &mut Map<String, Value>) {
    let has_properties = matches!(map.get("properties"), Some(Value::Object(p)) if !p.is_empty());
    if has_properties && !map.contains_key("type") {
        map.insert("type".to_string(), json!("object"));
    }
}

fn has_typed_items(map: &Map<String, Value>) -> bool {
    match map.get("items") {
        Some(Value::Object(items)) => !items.is_empty() && items.contains_key("type"),
        _ => false,
    }
}

/// `type` equals `wanted`, or is a list containing it
fn type_includes(map: &Map<String, Value>, wanted: &str) -> bool {
    match map.get("type") {
        Some(Value::String(t)) => t == wanted,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repaired(mut schema: Value) -> Value {
        repair(&mut schema);
        schema
    }

    fn assert_idempotent(schema: Value) {
        let once = repaired(schema);
        let twice = repaired(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_and_non_object_top_level() {
        let expected = json!({"type": "object", "properties": {}});
        assert_eq!(repaired(json!({})), expected);
        assert_eq!(repaired(Value::Null), expected);
        assert_eq!(repaired(json!("string")), expected);
        assert_eq!(repaired(json!([1, 2])), expected);
    }

    #[test]
    fn test_top_level_missing_type() {
        let schema = repaired(json!({"properties": {"q": {"type": "string"}}}));
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["q"]["type"], "string");

        let schema = repaired(json!({"type": "object"}));
        assert_eq!(schema["properties"], json!({}));
    }

    #[test]
    fn test_array_without_items() {
        let schema = repaired(json!({
            "type": "object",
            "properties": {"ids": {"type": "array"}}
        }));
        assert_eq!(schema["properties"]["ids"]["items"], json!({"type": "string"}));
    }

    #[test]
    fn test_array_with_bad_items() {
        for items in [json!({}), json!("x"), json!([{"type": "string"}]), json!({"description": "id"})] {
            let schema = repaired(json!({
                "type": "object",
                "properties": {"ids": {"type": "array", "items": items}}
            }));
            assert_eq!(schema["properties"]["ids"]["items"], json!({"type": "string"}));
        }
    }

    #[test]
    fn test_nested_arrays_repaired() {
        let schema = repaired(json!({
            "type": "object",
            "properties": {
                "matrix": {"type": "array", "items": {"type": "array"}}
            }
        }));
        assert_eq!(
            schema["properties"]["matrix"]["items"]["items"],
            json!({"type": "string"})
        );
    }

    #[test]
    fn test_array_items_with_properties_become_objects() {
        let schema = repaired(json!({
            "type": "object",
            "properties": {
                "rows": {"type": "array", "items": {"properties": {"id": {"type": "integer"}}}}
            }
        }));
        let items = &schema["properties"]["rows"]["items"];
        assert_eq!(items["type"], "object");
        assert_eq!(items["properties"]["id"]["type"], "integer");
    }

    #[test]
    fn test_type_list_containing_array() {
        let schema = repaired(json!({
            "type": "object",
            "properties": {"tags": {"type": ["array", "null"]}}
        }));
        assert_eq!(schema["properties"]["tags"]["items"], json!({"type": "string"}));
    }

    #[test]
    fn test_untyped_property_coerced_with_description() {
        let schema = repaired(json!({
            "type": "object",
            "properties": {
                "empty": {},
                "described": {"description": "The channel id", "default": "C1"},
                "bare": 42
            }
        }));
        assert_eq!(schema["properties"]["empty"], json!({"type": "string"}));
        assert_eq!(
            schema["properties"]["described"],
            json!({"type": "string", "description": "The channel id"})
        );
        assert_eq!(schema["properties"]["bare"], json!({"type": "string"}));
    }

    #[test]
    fn test_structural_properties_keep_shape() {
        let schema = repaired(json!({
            "type": "object",
            "properties": {
                "filter": {"properties": {"owner": {"type": "string"}}},
                "ids": {"items": {}},
                "choice": {"anyOf": [{"type": "string"}, {"type": "array"}]}
            }
        }));
        assert_eq!(schema["properties"]["filter"]["type"], "object");
        assert_eq!(schema["properties"]["ids"]["type"], "array");
        assert_eq!(schema["properties"]["ids"]["items"], json!({"type": "string"}));
        assert!(schema["properties"]["choice"].get("type").is_none());
        assert_eq!(
            schema["properties"]["choice"]["anyOf"][1]["items"],
            json!({"type": "string"})
        );
    }

    #[test]
    fn test_composition_and_prefix_items_recursed() {
        let schema = repaired(json!({
            "type": "object",
            "properties": {
                "pair": {
                    "type": "array",
                    "items": {"type": "string"},
                    "prefixItems": [{"type": "array"}, {"type": "number"}]
                },
                "either": {"oneOf": [{"allOf": [{"type": "array", "items": 3}]}]}
            }
        }));
        assert_eq!(
            schema["properties"]["pair"]["prefixItems"][0]["items"],
            json!({"type": "string"})
        );
        assert_eq!(
            schema["properties"]["either"]["oneOf"][0]["allOf"][0]["items"],
            json!({"type": "string"})
        );
    }

    #[test]
    fn test_valid_schema_untouched() {
        let schema = json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search text"},
                "limit": {"type": "integer", "minimum": 1},
                "tags": {"type": "array", "items": {"type": "string"}},
                "filter": {
                    "type": "object",
                    "properties": {"owner": {"type": "string"}},
                    "required": ["owner"]
                }
            },
            "required": ["query"]
        });
        assert_eq!(repaired(schema.clone()), schema);
    }

    #[test]
    fn test_depth_limit_stops_silently() {
        let mut deep = json!({"type": "array"});
        for _ in 0..(MAX_DEPTH + 5) {
            deep = json!({"type": "object", "properties": {"next": deep}});
        }

        let mut schema = deep.clone();
        let report = repair(&mut schema);
        assert!(report.depth_limited);

        let mut innermost = &schema;
        while let Some(next) = innermost.get("properties").and_then(|p| p.get("next")) {
            innermost = next;
        }
        assert!(innermost.get("items").is_none());
        assert_idempotent(deep);
    }

    #[test]
    fn test_idempotent_on_messy_inputs() {
        let inputs = [
            json!({}),
            json!({"properties": {"a": {}, "b": {"type": "array"}, "c": {"items": "x"}}}),
            json!({"type": "object", "properties": {"d": {"properties": {"e": {"type": "array", "items": {}}}}}}),
            json!({"type": "object", "properties": {"f": {"anyOf": [{"type": ["array"]}, {"properties": {"g": {}}}]}}}),
            json!({"type": "object", "properties": []}),
        ];
        for input in inputs {
            assert_idempotent(input);
        }
    }

    #[test]
    fn test_repair_all_reports_depth_limited_tools() {
        let mut deep = json!({"type": "string"});
        for _ in 0..(MAX_DEPTH + 2) {
            deep = json!({"type": "object", "properties": {"n": deep}});
        }
        let mut tools = vec![
            ToolDescriptor::new("shallow", "").with_schema(json!({"type": "array"})),
            ToolDescriptor::new("deep", "").with_schema(deep),
        ];

        let limited = repair_all(&mut tools);
        assert_eq!(limited, vec!["deep".to_string()]);
        assert_eq!(tools[0].parameter_schema["items"], json!({"type": "string"}));
    }
}
