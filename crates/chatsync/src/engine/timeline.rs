//! Deduplicated, ordered conversation timeline.

use std::collections::{BTreeMap, HashMap};

use chatsync_protocol::{DeliveryStatus, Message};

/// Ordered sequence of messages for one open conversation, unique per
/// message identifier.
///
/// Storage is keyed by `(created_at, id)` so iteration is timeline order;
/// a secondary index maps identifiers to their current key.
#[derive(Debug, Default)]
pub struct Timeline {
    ordered: BTreeMap<(i64, String), Message>,
    index: HashMap<String, (i64, String)>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.index.contains_key(message_id)
    }

    pub fn get(&self, message_id: &str) -> Option<&Message> {
        self.index.get(message_id).and_then(|key| self.ordered.get(key))
    }

    /// Identifier of the newest message, by timeline order.
    pub fn newest_id(&self) -> Option<String> {
        self.ordered.values().next_back().map(|m| m.id.clone())
    }

    /// Insert-or-ignore by identity. Returns whether the message was new.
    pub fn insert(&mut self, message: Message) -> bool {
        if self.index.contains_key(&message.id) {
            return false;
        }
        let key = message.timeline_key();
        self.index.insert(message.id.clone(), key.clone());
        self.ordered.insert(key, message);
        true
    }

    /// Advance a message's status in place; regressions are no-ops.
    /// Returns false when the identifier is unknown (no placeholder is
    /// created).
    pub fn advance_status(&mut self, message_id: &str, proposed: DeliveryStatus) -> bool {
        let Some(key) = self.index.get(message_id) else {
            return false;
        };
        if let Some(message) = self.ordered.get_mut(key) {
            message.status = DeliveryStatus::advance(message.status, proposed);
        }
        true
    }

    /// Union the fetched history into the timeline.
    ///
    /// For identifiers present on both sides the higher status wins and
    /// every other field comes from the history record, which is
    /// authoritative for content and timestamp.
    pub fn merge_history(&mut self, history: Vec<Message>) {
        for mut fetched in history {
            if let Some(old_key) = self.index.remove(&fetched.id) {
                if let Some(live) = self.ordered.remove(&old_key) {
                    fetched.status = DeliveryStatus::advance(live.status, fetched.status);
                }
            }
            let key = fetched.timeline_key();
            self.index.insert(fetched.id.clone(), key.clone());
            self.ordered.insert(key, fetched);
        }
    }

    /// Ordered snapshot of the whole timeline.
    pub fn snapshot(&self) -> Vec<Message> {
        self.ordered.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.ordered.clear();
        self.index.clear();
    }
}
