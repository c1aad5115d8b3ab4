//! Transport binding contract
//!
//! The engine treats the backend connection as an opaque capability:
//! a stream of inbound events, a sink for outbound requests, and a
//! one-shot close handle. Concrete wire protocols live in transport
//! crates (see chat-ws).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use chat_core::Result;

/// A message delivered by the backend, before validation.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Backend-assigned delivery identifier, if any
    pub delivery_id: Option<String>,
    /// Message content
    pub text: String,
    /// Sender display name
    pub username: Option<String>,
    /// Authoring timestamp
    pub created_at: DateTime<Utc>,
    /// True when this is the echo of a message sent by the local user
    pub is_own: bool,
}

/// Event delivered by an open connection.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// A chat message (new, redelivered, or the echo of our own send)
    Message(InboundMessage),
    /// The server acknowledged delivery of a locally-sent message
    Delivered { delivery_id: String },
    /// The connection dropped; no further events will follow
    Closed { reason: Option<String> },
}

/// Request forwarded to the backend.
#[derive(Debug, Clone)]
pub enum OutboundRequest {
    /// Send a chat message
    Message { text: String, username: String },
    /// Tell the backend everything up to now was read
    ReadReceipt,
}

/// Handle to one open connection.
///
/// The controller takes the event receiver for its inbound pump and
/// keeps the request sender and close handle for the session's
/// lifetime. The close handle is a oneshot, so a close can only be
/// requested once.
pub struct TransportConnection {
    pub(crate) events: mpsc::UnboundedReceiver<InboundEvent>,
    pub(crate) requests: mpsc::UnboundedSender<OutboundRequest>,
    pub(crate) close: oneshot::Sender<()>,
}

impl TransportConnection {
    /// Assemble a connection handle from its channel halves
    pub fn new(
        events: mpsc::UnboundedReceiver<InboundEvent>,
        requests: mpsc::UnboundedSender<OutboundRequest>,
        close: oneshot::Sender<()>,
    ) -> Self {
        Self {
            events,
            requests,
            close,
        }
    }

    /// Decompose the handle into its channel halves
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedReceiver<InboundEvent>,
        mpsc::UnboundedSender<OutboundRequest>,
        oneshot::Sender<()>,
    ) {
        (self.events, self.requests, self.close)
    }
}

/// Factory for per-user connections to the chat backend.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a connection scoped to `user_id`.
    ///
    /// May take arbitrarily long; the controller never blocks on it.
    async fn open(&self, user_id: &str) -> Result<TransportConnection>;
}
