//! The adapter facade: builds provider request payloads from canonical
//! messages, tool specs, and options, and constructs a [`StreamIterator`]
//! bound to a fresh [`Normalizer`].

use crate::error::AdapterError;
use crate::event::{DeterministicTsGenerator, MonotonicSeqGenerator};
use crate::message::{message_to_wire, wire_to_message, Message};
use crate::normalizer::Normalizer;
use crate::stream_iterator::{ChunkSource, StreamIterator};
use crate::tool_bridge::{tool_specs_to_openai, ToolSpec};
use crate::wire::{OpenAIChunk, OpenAIRequest};
use futures::{Stream, StreamExt, TryStreamExt};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::instrument;

const RESERVED_KEYS: [&str; 3] = ["messages", "stream", "tools"];

/// Tool specs may be supplied either as validated [`ToolSpec`]s or as
/// pre-converted provider mappings, but not a mixture of the two.
pub enum ToolsInput {
    Specs(Vec<ToolSpec>),
    Preconverted(Vec<Value>),
}

/// A pluggable function mapping `(client, request) -> chunk source`, used to
/// substitute test doubles for the real HTTP/SSE transport.
pub type StreamFactory = Arc<
    dyn Fn(
            reqwest::Client,
            String,
            OpenAIRequest,
        ) -> Pin<Box<dyn Future<Output = crate::Result<ChunkSource>> + Send>>
        + Send
        + Sync,
>;

/// Construction-time configuration for an [`Adapter`].
#[derive(Clone)]
pub struct AdapterConfig {
    default_model: Option<String>,
    default_options: serde_json::Map<String, Value>,
    ts_origin: SystemTime,
    ts_step: Duration,
}

impl AdapterConfig {
    pub fn builder() -> AdapterConfigBuilder {
        AdapterConfigBuilder::default()
    }
}

/// Builder for [`AdapterConfig`], following the staged-`Option<T>` pattern
/// used throughout this lineage's configuration builders.
#[derive(Default)]
pub struct AdapterConfigBuilder {
    default_model: Option<String>,
    default_options: serde_json::Map<String, Value>,
    ts_origin: Option<SystemTime>,
    ts_step: Option<Duration>,
}

impl AdapterConfigBuilder {
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn default_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.default_options.insert(key.into(), value);
        self
    }

    pub fn deterministic_origin(mut self, origin: SystemTime) -> Self {
        self.ts_origin = Some(origin);
        self
    }

    pub fn deterministic_step(mut self, step: Duration) -> Self {
        self.ts_step = Some(step);
        self
    }

    /// Validate and build. Strips a `model` key out of the default-options
    /// bag into the dedicated model field, then rejects a default-options
    /// bag that still contains any of the reserved keys `{messages, stream,
    /// tools}`, up front rather than deferring that check to
    /// request-building time.
    pub fn build(mut self) -> crate::Result<AdapterConfig> {
        if let Some(model) = self.default_options.remove("model").and_then(|v| v.as_str().map(String::from)) {
            self.default_model.get_or_insert(model);
        }
        reject_reserved_keys(&self.default_options, "AdapterConfig.default_options")?;
        Ok(AdapterConfig {
            default_model: self.default_model,
            default_options: self.default_options,
            ts_origin: self.ts_origin.unwrap_or_else(crate::event::default_origin),
            ts_step: self.ts_step.unwrap_or_else(crate::event::default_step),
        })
    }
}

fn reject_reserved_keys(options: &serde_json::Map<String, Value>, path: &str) -> crate::Result<()> {
    for key in RESERVED_KEYS {
        if options.contains_key(key) {
            return Err(AdapterError::bad_input(
                path,
                format!("reserved key '{key}' may not appear in options"),
            ));
        }
    }
    Ok(())
}

/// Builds provider requests and streams, given a transport client and
/// construction-time defaults.
pub struct Adapter {
    http_client: reqwest::Client,
    base_url: String,
    config: AdapterConfig,
    stream_factory: StreamFactory,
}

impl Adapter {
    /// Construct an adapter using the default HTTP/SSE stream factory.
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>, config: AdapterConfig) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            config,
            stream_factory: Arc::new(|client, base_url, request| Box::pin(default_stream_factory(client, base_url, request))),
        }
    }

    /// Construct an adapter with a custom stream factory (test doubles,
    /// alternate transports).
    pub fn with_stream_factory(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        config: AdapterConfig,
        stream_factory: StreamFactory,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            config,
            stream_factory,
        }
    }

    /// Build the provider request payload for a message list and optional
    /// tools/options, without starting a stream.
    #[instrument(skip(self, messages, tools, options), level = "debug")]
    pub fn build_request(
        &self,
        messages: &[Message],
        tools: Option<ToolsInput>,
        options: serde_json::Map<String, Value>,
        streaming: bool,
    ) -> crate::Result<OpenAIRequest> {
        reject_reserved_keys(&options, "options")?;

        let mut merged = self.config.default_options.clone();
        merged.extend(options);

        let model = merged
            .remove("model")
            .and_then(|v| v.as_str().map(String::from))
            .or_else(|| self.config.default_model.clone())
            .ok_or_else(|| AdapterError::bad_input("model", "no model specified by defaults or options"))?;

        let temperature = merged
            .remove("temperature")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        let tools = match tools {
            None => None,
            Some(ToolsInput::Preconverted(values)) => Some(values),
            Some(ToolsInput::Specs(specs)) => Some(tool_specs_to_openai(&specs)?),
        };

        let wire_messages: Vec<Value> = messages
            .iter()
            .map(message_to_wire)
            .collect::<crate::Result<Vec<Value>>>()?;

        Ok(OpenAIRequest {
            model,
            messages: wire_messages,
            tools,
            stream: streaming,
            temperature,
            extra: merged,
        })
    }

    /// Build a request and start a stream, wrapping the resulting chunk
    /// source in a fresh [`StreamIterator`] bound to a fresh [`Normalizer`]
    /// with this adapter's deterministic generators.
    #[instrument(skip(self, messages, tools, options), level = "debug")]
    pub async fn stream(
        &self,
        messages: &[Message],
        tools: Option<ToolsInput>,
        options: serde_json::Map<String, Value>,
    ) -> crate::Result<StreamIterator> {
        let request = self.build_request(messages, tools, options, true)?;
        let source = (self.stream_factory)(self.http_client.clone(), self.base_url.clone(), request).await?;

        let normalizer = Normalizer::new(
            Box::new(MonotonicSeqGenerator::default()),
            Box::new(DeterministicTsGenerator::new(self.config.ts_origin, self.config.ts_step)),
        );

        Ok(StreamIterator::new(source, normalizer))
    }

    /// Non-streaming entry, kept for parity with the streaming path. Parses
    /// a single provider response into one assistant [`Message`].
    #[instrument(skip(self, messages, tools, options), level = "debug")]
    pub async fn generate(
        &self,
        messages: &[Message],
        tools: Option<ToolsInput>,
        options: serde_json::Map<String, Value>,
    ) -> crate::Result<Message> {
        let request = self.build_request(messages, tools, options, false)?;

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdapterError::transport("generate", e))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::bad_input("generate.response", body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AdapterError::transport("generate.body", e))?;

        let message_value = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .cloned()
            .ok_or_else(|| AdapterError::bad_chunk("choices[0].message", "missing from response"))?;

        wire_to_message(message_value)
    }
}

/// The real HTTP/SSE stream factory: POSTs the request and parses the
/// response body as Server-Sent Events, yielding one `OpenAIChunk` per
/// `data:` line, mirroring the `parse_sse_stream` shape this lineage's SDKs
/// use for OpenAI-compatible providers.
async fn default_stream_factory(
    client: reqwest::Client,
    base_url: String,
    request: OpenAIRequest,
) -> crate::Result<ChunkSource> {
    let url = format!("{base_url}/chat/completions");
    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| AdapterError::transport("stream_factory", e))?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdapterError::bad_input("stream.response", body));
    }

    Ok(Box::pin(parse_sse_stream(response)))
}

fn parse_sse_stream(response: reqwest::Response) -> impl Stream<Item = crate::Result<OpenAIChunk>> {
    response
        .bytes_stream()
        .map_err(|e| AdapterError::transport("sse_body", e))
        .map(|chunk_result| {
            chunk_result.map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        })
        .filter_map(|line_result| async move {
            match line_result {
                Ok(text) => {
                    let mut events = Vec::new();
                    for line in text.lines() {
                        let Some(data) = line.strip_prefix("data: ") else {
                            continue;
                        };
                        if data == "[DONE]" {
                            continue;
                        }
                        events.push(
                            serde_json::from_str::<OpenAIChunk>(data)
                                .map_err(|e| AdapterError::transport("sse_chunk", e)),
                        );
                    }
                    if events.is_empty() {
                        None
                    } else {
                        Some(futures::stream::iter(events))
                    }
                }
                Err(err) => Some(futures::stream::iter(vec![Err(err)])),
            }
        })
        .flatten()
}
