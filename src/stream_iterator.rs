//! The async iterator shell that presents a single sequence of canonical
//! events to a consumer, hiding chunk-batching and cancellation.

use crate::error::AdapterError;
use crate::event::StreamEvent;
use crate::normalizer::Normalizer;
use crate::wire::OpenAIChunk;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// A pluggable source of provider chunks: anything that yields
/// `Result<OpenAIChunk>` items, such as an SSE response body or an in-memory
/// fixture built from a `Vec<OpenAIChunk>` for tests.
pub type ChunkSource = Pin<Box<dyn Stream<Item = crate::Result<OpenAIChunk>> + Send>>;

/// Presents one stream's canonical events, backed by a chunk source and a
/// [`Normalizer`].
///
/// Cancellation-safe: dropping a `StreamIterator` mid-pull, or calling
/// [`close`](StreamIterator::close) from a concurrent task, disposes of the
/// underlying chunk source exactly once.
pub struct StreamIterator {
    source: Option<ChunkSource>,
    normalizer: Normalizer,
    buffer: VecDeque<StreamEvent>,
    closed: Arc<AtomicBool>,
    close_lock: Arc<Mutex<()>>,
}

impl StreamIterator {
    pub fn new(source: ChunkSource, normalizer: Normalizer) -> Self {
        Self {
            source: Some(source),
            normalizer,
            buffer: VecDeque::new(),
            closed: Arc::new(AtomicBool::new(false)),
            close_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Pull the next canonical event, or `None` at end-of-stream.
    ///
    /// Implements §4.4's pull operation: drain the buffer first; once
    /// drained, pull provider chunks and feed the normalizer until it yields
    /// at least one event or the source is exhausted. Handing a `Final`
    /// event to the caller finalizes the stream and, once the buffer is
    /// empty, closes it immediately.
    #[instrument(skip(self), level = "debug")]
    pub async fn next_event(&mut self) -> crate::Result<Option<StreamEvent>> {
        if self.closed.load(Ordering::Acquire) && self.buffer.is_empty() {
            return Ok(None);
        }

        loop {
            if let Some(event) = self.buffer.pop_front() {
                if event.is_final() {
                    if self.buffer.is_empty() {
                        self.close().await;
                    }
                }
                return Ok(Some(event));
            }

            if self.normalizer.is_finalized() {
                self.close().await;
                return Ok(None);
            }

            let Some(source) = self.source.as_mut() else {
                self.close().await;
                return Ok(None);
            };

            match source.next().await {
                None => {
                    debug!("chunk source exhausted");
                    self.close().await;
                    return Ok(None);
                }
                Some(Err(err)) => {
                    self.close().await;
                    return Err(err);
                }
                Some(Ok(chunk)) => {
                    let events = self.normalizer.process_chunk(&chunk)?;
                    self.buffer.extend(events);
                }
            }
        }
    }

    /// Idempotently dispose of the underlying chunk source. Safe to call
    /// concurrently with [`next_event`](StreamIterator::next_event) or with
    /// itself; only the first caller actually drops the source.
    pub async fn close(&mut self) {
        let _guard = self.close_lock.lock().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.buffer.clear();
        // Dropping the boxed stream releases the HTTP body / in-memory
        // fixture; there is no separate async `aclose` step in this crate's
        // model because `reqwest`'s body stream has no async teardown beyond
        // drop.
        self.source = None;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
