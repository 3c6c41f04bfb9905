//! Check tool call arguments against a tool's JSON Schema before invoking it.

use serde_json::Value;

/// Bring raw model arguments into object form.
///
/// Models sometimes send the argument object JSON-encoded inside a string,
/// or send nothing at all for parameterless tools.
pub fn normalize_arguments(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::Null => Ok(Value::Object(serde_json::Map::new())),
        Value::String(encoded) => {
            let trimmed = encoded.trim();
            if trimmed.is_empty() {
                return Ok(Value::Object(serde_json::Map::new()));
            }
            serde_json::from_str(trimmed)
                .map_err(|e| format!("arguments are not valid JSON (use double quotes): {e}"))
        }
        other => Ok(other.clone()),
    }
}

/// Validate arguments against a top-level object schema.
///
/// Checks the object type, required field presence, declared property types
/// and `enum` membership. Returns the first violation found.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    if let Some(schema_type) = schema.get("type").and_then(Value::as_str) {
        if schema_type == "object" && !args.is_object() {
            return Err(format!(
                "expected object arguments, got {}",
                json_type_name(args)
            ));
        }
    }

    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(name) {
                return Err(format!("missing required field '{name}'"));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, value) in obj {
        let Some(prop_schema) = properties.get(key) else {
            continue;
        };
        if let Some(expected) = prop_schema.get("type").and_then(Value::as_str) {
            if !value_matches_type(value, expected) {
                return Err(format!(
                    "field '{key}' expected type '{expected}', got {}",
                    json_type_name(value)
                ));
            }
        }
        if let Some(allowed) = prop_schema.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                return Err(format!("field '{key}' must be one of {}", Value::Array(allowed.clone())));
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
