//! Error types for the streaming adapter core.

use thiserror::Error;

/// Result type alias using [`AdapterError`].
pub type Result<T> = std::result::Result<T, AdapterError>;

/// The single error taxonomy for all adapter-core failures.
///
/// Every variant carries a `path` describing the structural location of the
/// failure (e.g. `tool_calls[2].function.arguments`), so callers never have to
/// guess which chunk or field triggered a rejection.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Non-string or empty prompt; missing model; reserved option conflicts.
    #[error("bad input at {path}: {detail}")]
    BadInput { path: String, detail: String },

    /// Tool spec validation failures; duplicate names.
    #[error("bad tool spec at {path}: {detail}")]
    BadToolSpec { path: String, detail: String },

    /// Malformed provider chunk (wrong types, empty choices, non-finite usage, non-string content).
    #[error("bad chunk at {path}: {detail}")]
    BadChunk { path: String, detail: String },

    /// Missing id/name before arguments; invalid JSON arguments; non-object arguments.
    #[error("bad tool call at {path}: {detail}")]
    BadToolCall { path: String, detail: String },

    /// Stream factory or chunk source raised unexpectedly.
    #[error("transport error at {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl AdapterError {
    /// Construct a [`AdapterError::BadInput`] pinpointing `path`.
    pub fn bad_input(path: impl Into<String>, detail: impl Into<String>) -> Self {
        AdapterError::BadInput {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Construct a [`AdapterError::BadToolSpec`] pinpointing `path`.
    pub fn bad_tool_spec(path: impl Into<String>, detail: impl Into<String>) -> Self {
        AdapterError::BadToolSpec {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Construct a [`AdapterError::BadChunk`] pinpointing `path`.
    pub fn bad_chunk(path: impl Into<String>, detail: impl Into<String>) -> Self {
        AdapterError::BadChunk {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Construct a [`AdapterError::BadToolCall`] pinpointing `path`.
    pub fn bad_tool_call(path: impl Into<String>, detail: impl Into<String>) -> Self {
        AdapterError::BadToolCall {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Construct a [`AdapterError::Transport`] wrapping an arbitrary source error.
    pub fn transport(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AdapterError::Transport {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
