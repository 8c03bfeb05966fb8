//! Canonical message types.
//!
//! A message is the persistent unit of a one-to-one conversation. Identity
//! is the history-store-assigned `id`; every other field may legitimately
//! differ between a live event and a later history fetch for the same
//! message, so deduplication and merging always key on `id` alone.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::status::DeliveryStatus;

/// A conversation message. Persisted by the history store, rendered by
/// the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique across the whole system, assigned by the history store at
    /// send time. Never changes once assigned.
    pub id: String,

    /// Sender user ID.
    pub sender_id: String,

    /// Receiver user ID.
    pub receiver_id: String,

    /// Text body. Non-empty after trimming.
    pub text: String,

    /// Server-assigned creation time, unix milliseconds. Not guaranteed
    /// monotonic per conversation; ties are broken by `id`.
    pub created_at: i64,

    /// Delivery status.
    pub status: DeliveryStatus,
}

impl Message {
    /// Create a message stamped with the current time and initial status.
    pub fn new(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            text: text.into(),
            created_at: Utc::now().timestamp_millis(),
            status: DeliveryStatus::initial(),
        }
    }

    /// Identity equality: two messages with the same `id` are the same
    /// message regardless of any other field.
    pub fn same_message(&self, other: &Message) -> bool {
        self.id == other.id
    }

    /// Whether `user_id` is either side of this message's ordered pair.
    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// Whether this message is addressed to `user_id`.
    pub fn addressed_to(&self, user_id: &str) -> bool {
        self.receiver_id == user_id
    }

    /// Sort key for timeline placement: creation time ascending, `id`
    /// ascending on tie.
    pub fn timeline_key(&self) -> (i64, String) {
        (self.created_at, self.id.clone())
    }

    /// Timeline ordering between two messages.
    pub fn cmp_in_timeline(&self, other: &Message) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, created_at: i64) -> Message {
        Message {
            id: id.to_string(),
            sender_id: "alice".to_string(),
            receiver_id: "bob".to_string(),
            text: "hello".to_string(),
            created_at,
            status: DeliveryStatus::Sent,
        }
    }

    #[test]
    fn test_identity_equality_ignores_other_fields() {
        let a = msg("m1", 100);
        let mut b = msg("m1", 999);
        b.text = "different".to_string();
        b.status = DeliveryStatus::Read;
        assert!(a.same_message(&b));
        assert!(!a.same_message(&msg("m2", 100)));
    }

    #[test]
    fn test_timeline_ordering_by_timestamp_then_id() {
        let early = msg("m9", 100);
        let late = msg("m1", 200);
        assert_eq!(early.cmp_in_timeline(&late), Ordering::Less);

        // Tie on timestamp falls back to id.
        let a = msg("m1", 100);
        let b = msg("m2", 100);
        assert_eq!(a.cmp_in_timeline(&b), Ordering::Less);
        assert!(a.timeline_key() < b.timeline_key());
    }

    #[test]
    fn test_pair_membership() {
        let m = msg("m1", 100);
        assert!(m.involves("alice"));
        assert!(m.involves("bob"));
        assert!(!m.involves("carol"));
        assert!(m.addressed_to("bob"));
        assert!(!m.addressed_to("alice"));
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let json = serde_json::to_string(&msg("m1", 100)).unwrap();
        assert!(json.contains("\"senderId\":\"alice\""));
        assert!(json.contains("\"receiverId\":\"bob\""));
        assert!(json.contains("\"createdAt\":100"));
        assert!(json.contains("\"status\":\"sent\""));
    }
}
