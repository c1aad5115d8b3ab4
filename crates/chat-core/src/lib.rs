//! chat-core: Chat Session Synchronization Core Library
//!
//! Data model for the chat engine: messages, delivery status, the
//! ordered deduplicated message log and the snapshot view pushed to
//! subscribers.

pub mod error;
pub mod log;
pub mod message;

pub use error::{Error, Result};
pub use log::MessageLog;
pub use message::{ChatMessage, DeliveryStatus, Snapshot};
