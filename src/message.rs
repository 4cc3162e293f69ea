//! Role-tagged conversational messages with optional attached tool calls.

use crate::error::AdapterError;
use crate::json::JsonValue;
use crate::tool_bridge::{normalize_tool_calls, tool_call_to_openai};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical role names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Parse a lowercased role string against the closed set.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "system" => Some(MessageRole::System),
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// A tool invocation attached to a message (distinct from the streaming
/// [`crate::event::ToolCall`] event: this is the at-rest, message-schema form).
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: JsonValue,
}

/// A single message exchanged with a language model.
///
/// Invariant: `content` is non-empty OR `tool_calls` is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    /// Construct a message, enforcing the content/tool_calls invariant.
    pub fn new(
        role: MessageRole,
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> crate::Result<Self> {
        let content = content.into();
        if content.is_empty() && tool_calls.is_empty() {
            return Err(AdapterError::bad_input(
                "message",
                "content is empty and tool_calls is empty: at least one must be present",
            ));
        }
        Ok(Self {
            role,
            content,
            tool_calls,
        })
    }

    pub fn user(content: impl Into<String>) -> crate::Result<Self> {
        Self::new(MessageRole::User, content, Vec::new())
    }

    pub fn system(content: impl Into<String>) -> crate::Result<Self> {
        Self::new(MessageRole::System, content, Vec::new())
    }

    pub fn assistant(content: impl Into<String>) -> crate::Result<Self> {
        Self::new(MessageRole::Assistant, content, Vec::new())
    }
}

/// A raw `{role, content, tool_calls?}` record as it appears on the wire.
///
/// Deserialization via this type accepts only the keys `role`, `content`, and
/// `tool_calls`; any extra key is rejected by `deny_unknown_fields`, matching
/// the strict-key requirement of the message schema. `tool_calls` entries are
/// left as raw `Value`s here and normalized via [`normalize_tool_calls`],
/// since they follow the provider's nested `{id, type, function:{name,
/// arguments}}` shape rather than a flat one.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<Value>,
}

/// Serialize a canonical [`Message`] to its provider-facing `{role, content,
/// tool_calls?}` form, encoding any attached tool calls in OpenAI's nested
/// `{id, type:"function", function:{name, arguments:<JSON string>}}` shape
/// via [`tool_call_to_openai`].
pub fn message_to_wire(message: &Message) -> crate::Result<Value> {
    let role = match message.role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };
    let mut object = serde_json::Map::new();
    object.insert("role".to_string(), Value::String(role.to_string()));
    object.insert(
        "content".to_string(),
        Value::String(message.content.clone()),
    );
    if !message.tool_calls.is_empty() {
        let calls: Vec<Value> = message
            .tool_calls
            .iter()
            .map(tool_call_to_openai)
            .collect::<crate::Result<Vec<Value>>>()?;
        object.insert("tool_calls".to_string(), Value::Array(calls));
    }
    Ok(Value::Object(object))
}

/// Deserialize a provider-facing message record into a canonical [`Message`],
/// rejecting extra keys, unknown roles, and the empty-content-with-no-tool-calls
/// state. Tool calls are normalized via [`normalize_tool_calls`], the same
/// path the normalizer uses for streamed tool-call deltas.
pub fn wire_to_message(value: Value) -> crate::Result<Message> {
    let wire: WireMessage = serde_json::from_value(value)
        .map_err(|e| AdapterError::bad_input("message", e.to_string()))?;

    let role = MessageRole::parse(&wire.role)
        .ok_or_else(|| AdapterError::bad_input("message.role", format!("unknown role '{}'", wire.role)))?;

    let tool_calls = normalize_tool_calls(&wire.tool_calls)?;

    Message::new(role, wire.content, tool_calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_user_constructor() {
        let msg = Message::user("hello").unwrap();
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn test_message_rejects_empty_content_and_no_tool_calls() {
        let err = Message::new(MessageRole::User, "", Vec::new()).unwrap_err();
        assert!(matches!(err, AdapterError::BadInput { .. }));
    }

    #[test]
    fn test_message_allows_empty_content_with_tool_calls() {
        let call = ToolCall {
            id: "call-1".into(),
            name: "sum".into(),
            arguments: JsonValue::freeze(&json!({"a": 1}), "args").unwrap(),
        };
        let msg = Message::new(MessageRole::Assistant, "", vec![call]).unwrap();
        assert!(msg.content.is_empty());
        assert_eq!(msg.tool_calls.len(), 1);
    }

    #[test]
    fn test_wire_to_message_rejects_extra_key() {
        let value = json!({"role": "user", "content": "hi", "extra": true});
        let err = wire_to_message(value).unwrap_err();
        assert!(matches!(err, AdapterError::BadInput { .. }));
    }

    #[test]
    fn test_wire_to_message_rejects_unknown_role() {
        let value = json!({"role": "developer", "content": "hi"});
        let err = wire_to_message(value).unwrap_err();
        assert!(err.to_string().contains("unknown role"));
    }

    #[test]
    fn test_wire_to_message_defaults_content_to_empty_string() {
        let value = json!({"role": "assistant", "tool_calls": [
            {"id": "call-1", "type": "function", "function": {"name": "sum", "arguments": "{\"a\": 1}"}}
        ]});
        let msg = wire_to_message(value).unwrap();
        assert_eq!(msg.content, "");
        assert_eq!(msg.tool_calls[0].name, "sum");
    }

    #[test]
    fn test_message_to_wire_round_trip() {
        let msg = Message::user("hi").unwrap();
        let wire = message_to_wire(&msg).unwrap();
        let back = wire_to_message(wire).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_message_to_wire_nests_tool_calls_openai_shape() {
        let call = ToolCall {
            id: "call-1".into(),
            name: "sum".into(),
            arguments: JsonValue::freeze(&json!({"a": 1}), "args").unwrap(),
        };
        let msg = Message::new(MessageRole::Assistant, "", vec![call]).unwrap();
        let wire = message_to_wire(&msg).unwrap();
        let call = &wire["tool_calls"][0];
        assert_eq!(call["type"], "function");
        assert_eq!(call["function"]["name"], "sum");
        assert!(call["function"]["arguments"].is_string());
    }

    #[test]
    fn test_wire_to_message_rejects_flat_tool_call_shape() {
        let value = json!({"role": "assistant", "tool_calls": [
            {"id": "call-1", "name": "sum", "arguments": {"a": 1}}
        ]});
        let err = wire_to_message(value).unwrap_err();
        assert!(matches!(err, AdapterError::BadToolCall { .. }));
    }
}
