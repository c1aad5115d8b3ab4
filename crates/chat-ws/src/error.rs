//! Error types for chat-ws

use thiserror::Error;

/// WebSocket transport error type
#[derive(Error, Debug)]
pub enum WsError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] chat_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for chat-ws
pub type Result<T> = std::result::Result<T, WsError>;
