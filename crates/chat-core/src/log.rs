//! Ordered, deduplicated message log
//!
//! Authoritative store of messages for one session, with derived
//! unread tracking. The log enforces ordering, dedup and count
//! invariants only; it is transport-format-agnostic.

use std::collections::HashSet;

use tracing::debug;

use crate::message::{ChatMessage, DeliveryStatus, Snapshot};

/// Message log for a single active session.
///
/// Messages are kept ordered by `created_at`, ties broken by arrival
/// order. Ingestion is idempotent: a message whose dedup key collides
/// with an existing entry is silently dropped.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
    keys: HashSet<String>,
    unread_count: usize,
}

impl MessageLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message, preserving display order.
    ///
    /// Returns `true` if the message was inserted, `false` on a dedup
    /// collision. A newly inserted received message counts as unread.
    pub fn append(&mut self, message: ChatMessage) -> bool {
        let key = message.dedup_key();
        if !self.keys.insert(key.clone()) {
            debug!("Dropping duplicate message: {}", key);
            return false;
        }

        if !message.is_sent {
            self.unread_count += 1;
        }

        // Stable insert: after all entries with an equal or earlier timestamp.
        let pos = self
            .messages
            .iter()
            .rposition(|m| m.created_at <= message.created_at)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.messages.insert(pos, message);

        true
    }

    /// Zero the unread counter without touching any message.
    ///
    /// Returns `true` if the counter changed. Idempotent.
    pub fn mark_all_as_read(&mut self) -> bool {
        if self.unread_count == 0 {
            return false;
        }
        self.unread_count = 0;
        true
    }

    /// Transition a locally-sent message's delivery status.
    ///
    /// Only `None -> ReceivedByServer` is valid; a regression or an
    /// unknown delivery id is a no-op. Returns `true` if a message
    /// changed.
    pub fn update_status(&mut self, delivery_id: &str, status: DeliveryStatus) -> bool {
        if status != DeliveryStatus::ReceivedByServer {
            return false;
        }

        let Some(message) = self.messages.iter_mut().find(|m| {
            m.is_sent && m.delivery_id.as_deref() == Some(delivery_id)
        }) else {
            debug!("Delivery ack for unknown message: {}", delivery_id);
            return false;
        };

        if message.status == DeliveryStatus::ReceivedByServer {
            return false;
        }
        message.status = status;
        true
    }

    /// Current immutable view
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            messages: self.messages.clone(),
            count: self.messages.len(),
            unread_count: self.unread_count,
        }
    }

    /// Message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Received messages not yet marked read
    pub fn unread_count(&self) -> usize {
        self.unread_count
    }
}
