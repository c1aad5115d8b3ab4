//! Error types for chat-core

use thiserror::Error;

/// Main error type for the chat engine.
///
/// `InvalidInput` and `NoActiveSession` are contract violations and are
/// returned to the caller. `Transport` faults are recoverable and only
/// surface through connection state transitions; `Protocol` faults mark
/// inbound events that were dropped before reaching the log.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no active session")]
    NoActiveSession,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for chat-core
pub type Result<T> = std::result::Result<T, Error>;
