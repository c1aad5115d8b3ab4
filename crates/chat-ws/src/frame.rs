//! WebSocket wire frames
//!
//! Defines the JSON message format between the client and the chat
//! backend, and the mapping onto the engine's transport events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chat_engine::{InboundEvent, InboundMessage, OutboundRequest};

/// Frame from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Send a chat message
    Message { text: String, username: String },

    /// Everything delivered so far was read
    MarkRead,

    /// Ping for keepalive
    Ping,
}

/// Frame from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A chat message (including echoes of our own sends)
    Message {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        sent_at: DateTime<Utc>,
        #[serde(default)]
        own: bool,
    },

    /// The server acknowledged delivery of a sent message
    Delivered { id: String },

    /// Pong response
    Pong,
}

impl From<OutboundRequest> for ClientFrame {
    fn from(request: OutboundRequest) -> Self {
        match request {
            OutboundRequest::Message { text, username } => ClientFrame::Message { text, username },
            OutboundRequest::ReadReceipt => ClientFrame::MarkRead,
        }
    }
}

impl ServerFrame {
    /// Map a server frame to a transport event, if it carries one
    pub fn into_event(self) -> Option<InboundEvent> {
        match self {
            ServerFrame::Message {
                id,
                text,
                username,
                sent_at,
                own,
            } => Some(InboundEvent::Message(InboundMessage {
                delivery_id: id,
                text,
                username,
                created_at: sent_at,
                is_own: own,
            })),
            ServerFrame::Delivered { id } => Some(InboundEvent::Delivered { delivery_id: id }),
            ServerFrame::Pong => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_client_frame() {
        let frame = ClientFrame::Message {
            text: "Hello".to_string(),
            username: "alice".to_string(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""type":"message"#));
        assert!(json.contains(r#""text":"Hello"#));
    }

    #[test]
    fn test_deserialize_server_frame() {
        let json = r#"{"type":"message","id":"m-1","text":"hi","username":"bob","sent_at":"2026-08-29T10:00:00Z","own":false}"#;
        let frame: ServerFrame = serde_json::from_str(json).unwrap();
        match frame {
            ServerFrame::Message { id, text, own, .. } => {
                assert_eq!(id.as_deref(), Some("m-1"));
                assert_eq!(text, "hi");
                assert!(!own);
            }
            _ => panic!("Wrong frame type"),
        }
    }

    #[test]
    fn test_own_flag_defaults_to_false() {
        let json = r#"{"type":"message","text":"hi","sent_at":"2026-08-29T10:00:00Z"}"#;
        let frame: ServerFrame = serde_json::from_str(json).unwrap();
        match frame.into_event() {
            Some(InboundEvent::Message(msg)) => {
                assert!(!msg.is_own);
                assert!(msg.username.is_none());
            }
            _ => panic!("Wrong event"),
        }
    }

    #[test]
    fn test_delivered_maps_to_event() {
        let json = r#"{"type":"delivered","id":"m-1"}"#;
        let frame: ServerFrame = serde_json::from_str(json).unwrap();
        assert!(matches!(
            frame.into_event(),
            Some(InboundEvent::Delivered { delivery_id }) if delivery_id == "m-1"
        ));
    }

    #[test]
    fn test_read_receipt_maps_to_mark_read() {
        let frame = ClientFrame::from(OutboundRequest::ReadReceipt);
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"mark_read"}"#);
    }
}
