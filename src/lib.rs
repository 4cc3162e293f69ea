//! # streamcore
//!
//! A streaming adapter core for OpenAI-compatible chat completion APIs.
//!
//! ## Overview
//!
//! This crate normalizes the chunked, provider-specific wire format of a
//! streaming chat completion into a small, closed set of canonical events —
//! [`Token`], [`ToolCall`](event::ToolCall), [`ToolResult`], and [`Final`] —
//! each carrying a strictly-increasing sequence number and a deterministic
//! timestamp. Tool-call argument fragments, which providers deliver split
//! across several chunks, are reassembled and frozen into a single canonical
//! [`ToolCall`](event::ToolCall) event emitted exactly once per call.
//!
//! ## Example
//!
//! ```rust,no_run
//! use streamcore::{Adapter, AdapterConfig, Message};
//!
//! #[tokio::main]
//! async fn main() -> streamcore::Result<()> {
//!     let config = AdapterConfig::builder()
//!         .default_model("qwen2.5-32b-instruct")
//!         .build()?;
//!     let adapter = Adapter::new(reqwest::Client::new(), "http://localhost:1234/v1", config);
//!
//!     let messages = vec![Message::user("What's the capital of France?")?];
//!     let mut stream = adapter.stream(&messages, None, Default::default()).await?;
//!
//!     while let Some(event) = stream.next_event().await? {
//!         println!("{event:?}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **error**: the single `AdapterError` taxonomy and `Result<T>` alias.
//! - **json**: a frozen, `Send + Sync`, deeply-immutable JSON value and the
//!   `freeze`/`thaw` conversions to and from `serde_json::Value`.
//! - **event**: the canonical event sum type and the deterministic sequence
//!   / timestamp generators that stamp it.
//! - **message**: role-tagged conversational messages and the strict
//!   message-schema wire codec.
//! - **tool_bridge**: tool specification validation and bidirectional
//!   mapping between canonical tool calls and the provider's JSON schema.
//! - **wire**: the permissive provider chunk/request wire types.
//! - **normalizer**: the per-stream stateful accumulator that turns a
//!   sequence of provider chunks into canonical events.
//! - **stream_iterator**: the cancellation-safe async pull shell presented
//!   to consumers.
//! - **adapter**: the facade tying construction, request-building, and
//!   streaming/non-streaming entry points together.

mod adapter;
mod error;
mod event;
mod json;
mod message;
mod normalizer;
mod stream_iterator;
mod tool_bridge;
mod wire;

// --- Error Handling ---

pub use error::{AdapterError, Result};

// --- Frozen JSON ---

pub use json::{thaw, JsonValue};

// --- Canonical Events ---

pub use event::{
    DeterministicTsGenerator, EventMeta, Final, FinishReason, MonotonicSeqGenerator, SeqGenerator,
    SeqId, StreamEvent, Token, TsGenerator, ToolResult,
};

// --- Messages ---

pub use message::{Message, MessageRole};

// --- Tool Bridge ---

pub use tool_bridge::{normalize_tool_calls, tool_call_to_openai, tool_specs_to_openai, ToolSpec};

// --- Wire Format ---

pub use wire::{OpenAIChoice, OpenAIChunk, OpenAIDelta, OpenAIRequest, OpenAIUsage, ToolResultPayload};

// --- Normalizer ---

pub use normalizer::Normalizer;

// --- Stream Iterator ---

pub use stream_iterator::{ChunkSource, StreamIterator};

// --- Adapter Facade ---

pub use adapter::{Adapter, AdapterConfig, AdapterConfigBuilder, StreamFactory, ToolsInput};

/// Canonical streaming `ToolCall` event and the at-rest message-schema
/// `ToolCall`, re-exported under their owning modules to keep the names
/// distinct at the call site (`event::ToolCall` vs. `message::ToolCall`).
pub mod prelude {
    pub use crate::{
        Adapter, AdapterConfig, AdapterError, Final, FinishReason, Message, MessageRole, Result,
        StreamEvent, StreamIterator, Token, ToolResult, ToolSpec, ToolsInput,
    };
    pub use crate::event::ToolCall as ToolCallEvent;
    pub use crate::message::ToolCall as ToolCallRecord;
}
