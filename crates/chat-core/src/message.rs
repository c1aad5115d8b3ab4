//! Message and snapshot types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery acknowledgment state of a message.
///
/// Meaningful only for locally-sent messages; received messages stay at
/// `None` (the field is still present for shape uniformity on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryStatus {
    #[default]
    None,
    ReceivedByServer,
}

/// A single chat message as seen by the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Transport-assigned delivery identifier, when the backend provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
    /// Message content (non-empty, enforced at the controller boundary)
    pub text: String,
    /// Display identity of the sender; may be absent until resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Timestamp used for display ordering
    pub created_at: DateTime<Utc>,
    /// True if authored by the local session's user
    pub is_sent: bool,
    /// Delivery acknowledgment state
    #[serde(default)]
    pub status: DeliveryStatus,
}

impl ChatMessage {
    /// Create a message received from another party
    pub fn received(text: impl Into<String>, username: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            delivery_id: None,
            text: text.into(),
            username: Some(username.into()),
            created_at,
            is_sent: false,
            status: DeliveryStatus::None,
        }
    }

    /// Create a message authored by the local user
    pub fn sent(text: impl Into<String>, username: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            delivery_id: None,
            text: text.into(),
            username: Some(username.into()),
            created_at,
            is_sent: true,
            status: DeliveryStatus::None,
        }
    }

    /// Attach the transport-assigned delivery identifier
    pub fn with_delivery_id(mut self, id: impl Into<String>) -> Self {
        self.delivery_id = Some(id.into());
        self
    }

    /// Logical identity used for idempotent ingestion.
    ///
    /// Transports may redeliver; the delivery identifier is the key when
    /// present, otherwise sender + timestamp + content.
    pub fn dedup_key(&self) -> String {
        match &self.delivery_id {
            Some(id) => format!("id:{}", id),
            None => format!(
                "{}|{}|{}",
                self.username.as_deref().unwrap_or(""),
                self.created_at.timestamp_millis(),
                self.text
            ),
        }
    }
}

/// Full consistent view pushed to the subscriber (never a diff).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// All messages known to the session, display order
    pub messages: Vec<ChatMessage>,
    /// Total message count, equals `messages.len()`
    pub count: usize,
    /// Received messages not yet marked read
    pub unread_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_prefers_delivery_id() {
        let msg = ChatMessage::received("hi", "bob", Utc::now()).with_delivery_id("m-1");
        assert_eq!(msg.dedup_key(), "id:m-1");
    }

    #[test]
    fn test_dedup_key_fallback() {
        let at = Utc::now();
        let a = ChatMessage::received("hi", "bob", at);
        let b = ChatMessage::received("hi", "bob", at);
        let c = ChatMessage::received("yo", "bob", at);
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_ne!(a.dedup_key(), c.dedup_key());
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let msg = ChatMessage::sent("hello", "alice", Utc::now());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""createdAt""#));
        assert!(json.contains(r#""isSent":true"#));
        assert!(json.contains(r#""status":"none""#));
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let mut msg = ChatMessage::sent("hello", "alice", Utc::now());
        msg.status = DeliveryStatus::ReceivedByServer;
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""status":"receivedByServer""#));
    }
}
