//! Provider wire format: the OpenAI-shaped chunks consumed by the normalizer
//! and the request payload produced by the adapter facade.

use serde::{Deserialize, Serialize};

/// One SSE chunk of a streaming chat completion.
///
/// Unlike [`crate::message::wire_to_message`], this type does not reject
/// unknown fields: providers are free to add fields this core does not
/// interpret (the teacher's `OpenAIChunk` carries several `id`/`object`/
/// `created`/`model` bookkeeping fields for the same reason).
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIChunk {
    #[serde(default)]
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
    /// Out-of-band extension: a tool result delivered inline on the chunk
    /// stream, per the documented test-harness convention (see the adapter
    /// core's design notes on this field).
    #[serde(default)]
    pub tool_result: Option<ToolResultPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: OpenAIDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAIDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAIToolCallDelta>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIToolCallDelta {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub call_type: Option<String>,
    #[serde(default)]
    pub function: Option<OpenAIFunctionDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAIFunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIUsage {
    #[serde(default)]
    pub total_tokens: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolResultPayload {
    pub id: String,
    pub output: String,
}

/// The request payload sent to start a stream.
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
    pub stream: bool,
    pub temperature: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
