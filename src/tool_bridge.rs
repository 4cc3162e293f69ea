//! Validation, freezing, and bidirectional mapping between tool specifications
//! / tool calls and the provider's JSON schema.

use crate::error::AdapterError;
use crate::json::{thaw, JsonValue};
use crate::message::ToolCall;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

static NAME_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap());

/// The framework's canonical tool/function description.
///
/// Construction validates and deeply freezes `parameters`; once built, a
/// `ToolSpec` is immutable for its lifetime.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    name: String,
    description: Option<String>,
    parameters: JsonValue,
}

impl ToolSpec {
    /// Validate and construct a tool specification.
    ///
    /// `parameters` must be a JSON object whose top-level `type` is
    /// `"object"`, with an object `properties` map and an optional `required`
    /// list referencing only defined properties.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        parameters: Value,
    ) -> crate::Result<Self> {
        let name = name.into();
        if !NAME_PATTERN.is_match(&name) {
            return Err(AdapterError::bad_tool_spec(
                format!("ToolSpec('{name}').name"),
                "tool name must match ^[A-Za-z0-9_-]{1,64}$",
            ));
        }

        let description = match description {
            None => None,
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(AdapterError::bad_tool_spec(
                        format!("ToolSpec('{name}').description"),
                        "tool description cannot be empty",
                    ));
                }
                Some(trimmed.to_string())
            }
        };

        let path = format!("ToolSpec('{name}').parameters");
        let frozen = JsonValue::freeze(&parameters, &path)
            .map_err(|detail| AdapterError::bad_tool_spec(path.clone(), detail))?;

        let object = frozen.as_object().ok_or_else(|| {
            AdapterError::bad_tool_spec(path.clone(), "tool parameters must be a mapping")
        })?;

        match object.get("type") {
            Some(JsonValue::String(s)) if &**s == "object" => {}
            _ => {
                return Err(AdapterError::bad_tool_spec(
                    path.clone(),
                    "tool parameters must describe a JSON object",
                ))
            }
        }

        let properties = object.get("properties").and_then(JsonValue::as_object).ok_or_else(|| {
            AdapterError::bad_tool_spec(
                path.clone(),
                "tool parameters must include an object 'properties' mapping",
            )
        })?;

        if let Some(JsonValue::Array(required)) = object.get("required") {
            for (index, item) in required.iter().enumerate() {
                let JsonValue::String(item_name) = item else {
                    return Err(AdapterError::bad_tool_spec(
                        format!("{path}.required[{index}]"),
                        "required parameter names must be non-empty strings",
                    ));
                };
                if item_name.is_empty() {
                    return Err(AdapterError::bad_tool_spec(
                        format!("{path}.required[{index}]"),
                        "required parameter names must be non-empty strings",
                    ));
                }
                if !properties.contains_key(&**item_name) {
                    return Err(AdapterError::bad_tool_spec(
                        format!("{path}.required[{index}]"),
                        format!("required parameter '{item_name}' is not defined"),
                    ));
                }
            }
        } else if object.get("required").is_some() {
            return Err(AdapterError::bad_tool_spec(
                format!("{path}.required"),
                "tool parameter 'required' must be a list of strings",
            ));
        }

        Ok(Self {
            name,
            description,
            parameters: frozen,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parameters(&self) -> &JsonValue {
        &self.parameters
    }
}

/// Convert canonical tool specifications to OpenAI's chat `tools` schema.
///
/// Rejects duplicate names.
pub fn tool_specs_to_openai(specs: &[ToolSpec]) -> crate::Result<Vec<Value>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(specs.len());

    for (index, spec) in specs.iter().enumerate() {
        if !seen.insert(spec.name.clone()) {
            return Err(AdapterError::bad_tool_spec(
                format!("tools[{index}]"),
                format!("duplicate tool name '{}'", spec.name),
            ));
        }

        let mut function = serde_json::Map::new();
        function.insert("name".to_string(), Value::String(spec.name.clone()));
        if let Some(description) = &spec.description {
            function.insert(
                "description".to_string(),
                Value::String(description.clone()),
            );
        }
        function.insert("parameters".to_string(), thaw(&spec.parameters));

        out.push(serde_json::json!({
            "type": "function",
            "function": Value::Object(function),
        }));
    }

    Ok(out)
}

/// Normalize provider tool-call payloads (the `tool_calls` array on an OpenAI
/// delta/message) into canonical [`ToolCall`]s.
pub fn normalize_tool_calls(tool_calls: &[Value]) -> crate::Result<Vec<ToolCall>> {
    let mut out = Vec::with_capacity(tool_calls.len());

    for (index, item) in tool_calls.iter().enumerate() {
        let path = format!("tool_calls[{index}]");
        let object = item.as_object().ok_or_else(|| {
            AdapterError::bad_tool_call(path.clone(), "must be a mapping")
        })?;

        let call_id = object
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AdapterError::bad_tool_call(path.clone(), "missing a valid id")
            })?;

        if object.get("type").and_then(Value::as_str) != Some("function") {
            return Err(AdapterError::bad_tool_call(
                path.clone(),
                "must have type 'function'",
            ));
        }

        let function = object
            .get("function")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                AdapterError::bad_tool_call(format!("{path}.function"), "must be a mapping")
            })?;

        let name = function
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AdapterError::bad_tool_call(
                    format!("{path}.function"),
                    "missing a valid function name",
                )
            })?;

        let raw_arguments = function.get("arguments").cloned().unwrap_or(Value::String("{}".into()));
        let args_path = format!("{path}.function.arguments");
        let arguments = coerce_arguments(&raw_arguments, &args_path)?;

        out.push(ToolCall {
            id: call_id.to_string(),
            name: name.to_string(),
            arguments,
        });
    }

    Ok(out)
}

/// Convert a canonical [`ToolCall`] back into the provider's representation,
/// encoding `arguments` as a JSON string.
pub fn tool_call_to_openai(tool_call: &ToolCall) -> crate::Result<Value> {
    let thawed = thaw(&tool_call.arguments);
    let arguments_json = serde_json::to_string(&thawed)
        .map_err(|e| AdapterError::bad_tool_call("tool_call.arguments", e.to_string()))?;

    Ok(serde_json::json!({
        "id": tool_call.id,
        "type": "function",
        "function": {
            "name": tool_call.name,
            "arguments": arguments_json,
        },
    }))
}

/// Accept either a JSON-encoded string or an already-decoded mapping for
/// `arguments`, freezing the result.
fn coerce_arguments(raw: &Value, path: &str) -> crate::Result<JsonValue> {
    let decoded: Value = match raw {
        Value::Object(_) => raw.clone(),
        Value::String(s) => {
            let candidate = if s.is_empty() { "{}" } else { s.as_str() };
            serde_json::from_str(candidate)
                .map_err(|_| AdapterError::bad_tool_call(path.to_string(), "must contain valid JSON"))?
        }
        _ => {
            return Err(AdapterError::bad_tool_call(
                path.to_string(),
                "must be a mapping or JSON string",
            ))
        }
    };

    if !decoded.is_object() {
        return Err(AdapterError::bad_tool_call(
            path.to_string(),
            "must decode to a JSON object",
        ));
    }

    JsonValue::freeze(&decoded, path).map_err(|detail| AdapterError::bad_tool_call(path.to_string(), detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object_params() -> Value {
        json!({
            "type": "object",
            "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
            "required": ["a"],
        })
    }

    #[test]
    fn test_tool_spec_valid_construction() {
        let spec = ToolSpec::new("sum", Some("adds two numbers".into()), object_params()).unwrap();
        assert_eq!(spec.name(), "sum");
        assert_eq!(spec.description(), Some("adds two numbers"));
    }

    #[test]
    fn test_tool_spec_rejects_bad_name() {
        let err = ToolSpec::new("bad name!", None, object_params()).unwrap_err();
        assert!(matches!(err, AdapterError::BadToolSpec { .. }));
    }

    #[test]
    fn test_tool_spec_rejects_whitespace_description() {
        let err = ToolSpec::new("sum", Some("   ".into()), object_params()).unwrap_err();
        assert!(err.to_string().contains("description"));
    }

    #[test]
    fn test_tool_spec_rejects_non_object_type() {
        let params = json!({"type": "string"});
        let err = ToolSpec::new("sum", None, params).unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn test_tool_spec_rejects_required_outside_properties() {
        let params = json!({
            "type": "object",
            "properties": {"a": {"type": "integer"}},
            "required": ["missing"],
        });
        let err = ToolSpec::new("sum", None, params).unwrap_err();
        assert!(err.to_string().contains("is not defined"));
    }

    #[test]
    fn test_tool_specs_to_openai_rejects_duplicates() {
        let spec = ToolSpec::new("sum", None, object_params()).unwrap();
        let err = tool_specs_to_openai(&[spec.clone(), spec]).unwrap_err();
        assert!(err.to_string().contains("duplicate tool name"));
    }

    #[test]
    fn test_tool_specs_to_openai_shape() {
        let spec = ToolSpec::new("sum", Some("adds".into()), object_params()).unwrap();
        let converted = tool_specs_to_openai(&[spec]).unwrap();
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0]["type"], "function");
        assert_eq!(converted[0]["function"]["name"], "sum");
        assert_eq!(converted[0]["function"]["parameters"]["required"][0], "a");
    }

    #[test]
    fn test_normalize_tool_calls_accepts_string_arguments() {
        let payload = json!([{
            "id": "call-1",
            "type": "function",
            "function": {"name": "sum", "arguments": "{\"a\": 1, \"b\": 3}"},
        }]);
        let calls = normalize_tool_calls(payload.as_array().unwrap()).unwrap();
        assert_eq!(calls[0].name, "sum");
        assert_eq!(calls[0].id, "call-1");
    }

    #[test]
    fn test_normalize_tool_calls_rejects_non_function_type() {
        let payload = json!([{"id": "call-1", "type": "other", "function": {"name": "sum", "arguments": "{}"}}]);
        let err = normalize_tool_calls(payload.as_array().unwrap()).unwrap_err();
        assert!(err.to_string().contains("type 'function'"));
    }

    #[test]
    fn test_normalize_tool_calls_rejects_bad_json_arguments() {
        let payload = json!([{"id": "call-1", "type": "function", "function": {"name": "sum", "arguments": "not json"}}]);
        let err = normalize_tool_calls(payload.as_array().unwrap()).unwrap_err();
        assert!(err.to_string().contains("valid JSON"));
    }

    #[test]
    fn test_tool_call_round_trip() {
        let payload = json!([{
            "id": "call-1",
            "type": "function",
            "function": {"name": "sum", "arguments": "{\"a\":1,\"b\":3}"},
        }]);
        let calls = normalize_tool_calls(payload.as_array().unwrap()).unwrap();
        let back = tool_call_to_openai(&calls[0]).unwrap();
        assert_eq!(back["function"]["name"], "sum");
        let args: Value = serde_json::from_str(back["function"]["arguments"].as_str().unwrap()).unwrap();
        assert_eq!(args, json!({"a": 1, "b": 3}));
    }
}
