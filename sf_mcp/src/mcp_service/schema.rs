//! JSON Schema generation for tool input.
//!
//! Schemas are derived 1:1 from [`ParameterSpec`]s so that what clients are told and
//! what validation enforces can never drift apart.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::registry::{ParamKind, ParameterSpec, ToolDefinition};

/// Builds the schema for a single parameter.
pub fn parameter_schema(spec: &ParameterSpec) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String(spec.kind.json_type().to_string()));
    if let Some(description) = spec.description {
        schema.insert("description".to_string(), Value::String(description.to_string()));
    }
    match spec.kind {
        ParamKind::Enum(values) => {
            schema.insert(
                "enum".to_string(),
                Value::Array(values.iter().map(|v| Value::String(v.to_string())).collect()),
            );
        }
        ParamKind::StringList => {
            let mut items = Map::new();
            items.insert("type".to_string(), Value::String("string".to_string()));
            schema.insert("items".to_string(), Value::Object(items));
        }
        ParamKind::Boolean | ParamKind::String | ParamKind::Number => {}
    }
    schema
}

/// Object schema for a whole tool: one `properties` entry per parameter, plus
/// `required` (in declaration order) when any parameter is mandatory.
pub fn input_schema(tool: &ToolDefinition) -> Arc<Map<String, Value>> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for spec in tool.parameters {
        properties.insert(spec.name.to_string(), Value::Object(parameter_schema(spec)));
        if spec.required {
            required.push(Value::String(spec.name.to_string()));
        }
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String("object".to_string()));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    Arc::new(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{catalog, lookup, registry};
    use serde_json::json;

    #[test]
    fn data_query_schema_lists_properties_and_required() {
        let schema = input_schema(lookup(catalog::DATA_QUERY).unwrap());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(
            schema["properties"]["query"],
            json!({ "type": "string", "description": "SOQL query to execute" })
        );
        assert_eq!(schema["properties"]["bulk"]["type"], "boolean");
    }

    #[test]
    fn optional_only_tools_omit_required() {
        let schema = input_schema(lookup(catalog::ORG_LIST).unwrap());
        assert!(!schema.contains_key("required"));
        assert_eq!(schema["properties"].as_object().unwrap().len(), 3);
    }

    #[test]
    fn lists_and_enums_carry_their_constraints() {
        let schema = input_schema(lookup(catalog::PROJECT_DEPLOY).unwrap());
        assert_eq!(schema["properties"]["metadata"]["items"], json!({ "type": "string" }));
        assert_eq!(
            schema["properties"]["testLevel"],
            json!({
                "type": "string",
                "enum": ["NoTestRun", "RunSpecifiedTests", "RunLocalTests", "RunAllTestsInOrg"]
            })
        );
        assert_eq!(schema["properties"]["wait"]["type"], "number");
    }

    #[test]
    fn every_declared_parameter_appears_exactly_once() {
        for tool in registry().tools() {
            let schema = input_schema(tool);
            let properties = schema["properties"].as_object().unwrap();
            let names: Vec<_> = properties.keys().map(String::as_str).collect();
            let declared: Vec<_> = tool.parameters.iter().map(|p| p.name).collect();
            let mut sorted_declared = declared.clone();
            sorted_declared.sort_unstable();
            let mut sorted_names = names.clone();
            sorted_names.sort_unstable();
            assert_eq!(sorted_names, sorted_declared, "{}", tool.name);
        }
    }
}
