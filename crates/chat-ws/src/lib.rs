//! chat-ws: WebSocket Transport Binding
//!
//! Implements the engine's `Transport` contract over a WebSocket
//! connection to the chat backend. Built with tokio-tungstenite.

pub mod config;
pub mod error;
pub mod frame;
pub mod transport;

pub use config::WsConfig;
pub use error::{Result, WsError};
pub use frame::{ClientFrame, ServerFrame};
pub use transport::WsTransport;
