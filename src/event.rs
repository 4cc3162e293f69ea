//! Canonical streaming events and the deterministic generators that stamp them.
//!
//! Every event carries a strictly-increasing `seq_id` and a monotonic `ts`,
//! assigned in emission order by the [`Normalizer`](crate::normalizer::Normalizer)
//! that produced it. The four variants are the only vocabulary a consumer of
//! this crate needs: [`Token`] for incremental text, [`ToolCall`] for a fully
//! reassembled tool invocation, [`ToolResult`] for a provider-supplied result,
//! and [`Final`] for the one terminal event per stream.

use crate::json::JsonValue;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

/// A strictly-increasing, zero-based sequence number, unique within one stream.
pub type SeqId = u64;

/// Shared metadata carried by every canonical event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMeta {
    pub seq_id: SeqId,
    pub ts: SystemTime,
}

/// An incremental fragment of assistant-generated text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub meta: EventMeta,
    pub content: String,
    pub index: u64,
}

/// A fully reassembled tool invocation, emitted once per distinct `call_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub meta: EventMeta,
    pub call_id: String,
    pub name: String,
    pub args: JsonValue,
}

/// A provider-supplied result for a previously announced tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub meta: EventMeta,
    pub call_id: String,
    pub output: String,
}

/// Why the provider stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
}

impl FinishReason {
    /// Parse the provider's `finish_reason` string, if it names a known reason.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "stop" => Some(FinishReason::Stop),
            "length" => Some(FinishReason::Length),
            "content_filter" => Some(FinishReason::ContentFilter),
            _ => None,
        }
    }
}

/// The terminal event of a stream. Exactly one per stream; always last.
#[derive(Debug, Clone, PartialEq)]
pub struct Final {
    pub meta: EventMeta,
    pub output: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<BTreeMap<String, u64>>,
}

/// The canonical event sum type.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token(Token),
    ToolCall(ToolCall),
    ToolResult(ToolResult),
    Final(Final),
}

impl StreamEvent {
    pub fn meta(&self) -> &EventMeta {
        match self {
            StreamEvent::Token(e) => &e.meta,
            StreamEvent::ToolCall(e) => &e.meta,
            StreamEvent::ToolResult(e) => &e.meta,
            StreamEvent::Final(e) => &e.meta,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, StreamEvent::Final(_))
    }
}

/// Generates strictly-increasing sequence numbers, starting at 0.
pub trait SeqGenerator: Send {
    fn next_seq(&mut self) -> SeqId;
}

/// Generates monotonically-increasing timestamps.
pub trait TsGenerator: Send {
    fn next_ts(&mut self) -> SystemTime;
}

/// The default sequence generator: `0, 1, 2, …`.
#[derive(Debug, Default)]
pub struct MonotonicSeqGenerator {
    next: SeqId,
}

impl SeqGenerator for MonotonicSeqGenerator {
    fn next_seq(&mut self) -> SeqId {
        let seq = self.next;
        self.next += 1;
        seq
    }
}

/// Default origin used by [`DeterministicTsGenerator`]: 2024-01-01T00:00:00Z.
pub fn default_origin() -> SystemTime {
    // 2024-01-01T00:00:00Z, expressed as a Unix epoch offset to avoid pulling
    // in a datetime crate the rest of this lineage does not depend on.
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200)
}

/// Default step used by [`DeterministicTsGenerator`]: 1ms.
pub fn default_step() -> Duration {
    Duration::from_millis(1)
}

/// A deterministic timestamp generator: `origin + step * k` for the k-th call.
///
/// Tests construct this with a fixed origin and step so that event timestamps
/// are reproducible; production code uses the same generator with the
/// defaults from [`default_origin`] and [`default_step`], which still yields
/// deterministic, strictly-increasing timestamps independent of wall-clock
/// jitter between chunks.
#[derive(Debug, Clone)]
pub struct DeterministicTsGenerator {
    origin: SystemTime,
    step: Duration,
    calls: u32,
}

impl DeterministicTsGenerator {
    pub fn new(origin: SystemTime, step: Duration) -> Self {
        Self {
            origin,
            step,
            calls: 0,
        }
    }
}

impl Default for DeterministicTsGenerator {
    fn default() -> Self {
        Self::new(default_origin(), default_step())
    }
}

impl TsGenerator for DeterministicTsGenerator {
    fn next_ts(&mut self) -> SystemTime {
        let ts = self.origin + self.step * self.calls;
        self.calls += 1;
        ts
    }
}
