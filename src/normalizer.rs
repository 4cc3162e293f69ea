//! The stateful per-stream machine that turns OpenAI-shaped chunks into
//! canonical events.
//!
//! One [`Normalizer`] owns exactly one stream's worth of mutable state: the
//! sequence/timestamp generators, the running token index, the buffered text
//! used to synthesize `Final.output`, and the tool-call reassembly
//! accumulators keyed by the provider's per-chunk integer index. Feeding it
//! chunks out of order, or reusing it across two streams, is a logic error.

use crate::error::AdapterError;
use crate::event::{
    EventMeta, Final, FinishReason, SeqGenerator, StreamEvent, Token, ToolCall, ToolResult,
    TsGenerator,
};
use crate::json::JsonValue;
use crate::wire::OpenAIChunk;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct ToolCallAccumulator {
    call_id: Option<String>,
    name: Option<String>,
    arguments: String,
    touched_this_chunk: bool,
}

/// Per-stream normalizer. Construct one per stream via
/// [`Normalizer::new`], feed it chunks via [`Normalizer::process_chunk`].
pub struct Normalizer {
    seq_gen: Box<dyn SeqGenerator>,
    ts_gen: Box<dyn TsGenerator>,
    token_index: u64,
    text_fragments: Vec<String>,
    tool_states: BTreeMap<u32, ToolCallAccumulator>,
    final_emitted: bool,
    last_total_tokens: Option<u64>,
    last_tool_result_output: Option<String>,
}

impl Normalizer {
    pub fn new(seq_gen: Box<dyn SeqGenerator>, ts_gen: Box<dyn TsGenerator>) -> Self {
        Self {
            seq_gen,
            ts_gen,
            token_index: 0,
            text_fragments: Vec::new(),
            tool_states: BTreeMap::new(),
            final_emitted: false,
            last_total_tokens: None,
            last_tool_result_output: None,
        }
    }

    fn stamp(&mut self) -> EventMeta {
        EventMeta {
            seq_id: self.seq_gen.next_seq(),
            ts: self.ts_gen.next_ts(),
        }
    }

    /// True once a [`StreamEvent::Final`] has been emitted; the stream
    /// iterator consults this to know when to close.
    pub fn is_finalized(&self) -> bool {
        self.final_emitted
    }

    /// Process one provider chunk, returning the canonical events it
    /// produces in emission order: ToolResult, then Tokens, then ToolCalls,
    /// then Final.
    #[tracing::instrument(skip(self, chunk), level = "debug")]
    pub fn process_chunk(&mut self, chunk: &OpenAIChunk) -> crate::Result<Vec<StreamEvent>> {
        let mut events = Vec::new();

        if chunk.choices.is_empty() && chunk.tool_result.is_none() {
            debug!("chunk carries neither choices nor tool_result; no events");
            return Ok(events);
        }

        // 1. tool_result first.
        if let Some(result) = &chunk.tool_result {
            if result.id.is_empty() {
                return Err(AdapterError::bad_chunk("tool_result.id", "must be non-empty"));
            }
            let meta = self.stamp();
            self.last_tool_result_output = Some(result.output.clone());
            events.push(StreamEvent::ToolResult(ToolResult {
                meta,
                call_id: result.id.clone(),
                output: result.output.clone(),
            }));
        }

        let Some(choice) = chunk.choices.first() else {
            return Ok(events);
        };

        // reset per-chunk touched flags
        for state in self.tool_states.values_mut() {
            state.touched_this_chunk = false;
        }

        // 3. content fragments -> Token events.
        if let Some(content) = &choice.delta.content {
            if !content.is_empty() {
                let meta = self.stamp();
                let index = self.token_index;
                self.token_index += 1;
                self.text_fragments.push(content.clone());
                self.last_tool_result_output = None;
                events.push(StreamEvent::Token(Token {
                    meta,
                    content: content.clone(),
                    index,
                }));
            }
        }

        // 4. tool-call fragments -> upsert accumulators.
        if let Some(deltas) = &choice.delta.tool_calls {
            for delta in deltas {
                let path = format!("choices[0].delta.tool_calls[{}]", delta.index);

                if let Some(call_type) = &delta.call_type {
                    if call_type != "function" {
                        return Err(AdapterError::bad_chunk(
                            format!("{path}.type"),
                            "must equal 'function'",
                        ));
                    }
                }

                let state = self.tool_states.entry(delta.index).or_default();
                state.touched_this_chunk = true;

                if let Some(id) = &delta.id {
                    if id.is_empty() {
                        return Err(AdapterError::bad_chunk(format!("{path}.id"), "must be non-empty"));
                    }
                    state.call_id = Some(id.clone());
                }

                if let Some(function) = &delta.function {
                    if let Some(name) = &function.name {
                        if name.is_empty() {
                            return Err(AdapterError::bad_chunk(
                                format!("{path}.function.name"),
                                "must be non-empty",
                            ));
                        }
                        state.name = Some(name.clone());
                    }
                    if let Some(fragment) = &function.arguments {
                        state.arguments.push_str(fragment);
                    }
                }
            }
        }

        // usage, recorded but not yet emitted as an event.
        if let Some(usage) = &chunk.usage {
            if let Some(raw) = &usage.total_tokens {
                match raw {
                    serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => {
                        let value = n.as_i64().unwrap_or_default();
                        if value < 0 {
                            return Err(AdapterError::bad_chunk(
                                "usage.total_tokens",
                                "must be non-negative",
                            ));
                        }
                        self.last_total_tokens = Some(value as u64);
                    }
                    _ => {
                        return Err(AdapterError::bad_chunk(
                            "usage.total_tokens",
                            "must be a non-negative, non-boolean integer",
                        ))
                    }
                }
            }
        }

        // 5. finish_reason == "tool_calls": flush touched accumulators.
        if choice.finish_reason.as_deref() == Some("tool_calls") {
            let touched: Vec<u32> = self
                .tool_states
                .iter()
                .filter(|(_, state)| state.touched_this_chunk)
                .map(|(index, _)| *index)
                .collect();

            for index in touched {
                let state = self.tool_states.remove(&index).expect("just observed in iter");
                let path = format!("choices[0].delta.tool_calls[{index}]");

                let call_id = state.call_id.ok_or_else(|| {
                    AdapterError::bad_tool_call(path.clone(), "missing id before finalization")
                })?;
                let name = state.name.ok_or_else(|| {
                    AdapterError::bad_tool_call(path.clone(), "missing function.name before finalization")
                })?;

                let parsed: serde_json::Value = serde_json::from_str(&state.arguments)
                    .map_err(|_| AdapterError::bad_tool_call(format!("{path}.arguments"), "must contain valid JSON"))?;

                if !parsed.is_object() {
                    return Err(AdapterError::bad_tool_call(
                        format!("{path}.arguments"),
                        "must decode to a JSON object",
                    ));
                }

                let frozen = JsonValue::freeze(&parsed, &format!("{path}.arguments"))
                    .map_err(|detail| AdapterError::bad_tool_call(format!("{path}.arguments"), detail))?;

                let meta = self.stamp();
                events.push(StreamEvent::ToolCall(ToolCall {
                    meta,
                    call_id,
                    name,
                    args: frozen,
                }));
            }

            self.text_fragments.clear();
        }

        // 6. terminal finish_reason -> Final.
        if let Some(reason) = &choice.finish_reason {
            if let Some(finish_reason) = FinishReason::parse(reason) {
                if !self.final_emitted {
                    let output = if !self.text_fragments.is_empty() {
                        self.text_fragments.join("")
                    } else if let Some(output) = &self.last_tool_result_output {
                        output.clone()
                    } else {
                        String::new()
                    };

                    let usage = self.last_total_tokens.map(|total| {
                        let mut map = BTreeMap::new();
                        map.insert("total_tokens".to_string(), total);
                        map
                    });

                    let meta = self.stamp();
                    self.final_emitted = true;
                    events.push(StreamEvent::Final(Final {
                        meta,
                        output,
                        finish_reason: Some(finish_reason),
                        usage,
                    }));
                }
            } else if reason != "tool_calls" {
                warn!(reason, "unrecognized finish_reason; ignoring");
            }
        }

        Ok(events)
    }
}
