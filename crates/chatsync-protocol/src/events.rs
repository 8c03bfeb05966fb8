//! Named events exchanged over the event channel.
//!
//! Event names and field casing follow the external wire contract:
//! kebab-case event names in a `type` tag, camelCase payload fields.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::status::DeliveryStatus;

// ============================================================================
// Events (channel -> client)
// ============================================================================

/// Events consumed from the event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A message was delivered live to this client.
    MessageReceived(Message),

    /// A message's delivery status changed.
    MessageStatusUpdated {
        message_id: String,
        status: DeliveryStatus,
    },
}

// ============================================================================
// Events (client -> channel)
// ============================================================================

/// Events produced onto the event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Request delivery of a new message. The message only enters the
    /// timeline when the channel echoes a `message-received` back.
    SendMessage {
        sender_id: String,
        receiver_id: String,
        text: String,
    },

    /// Advance a message's delivery status. Fire-and-forget.
    UpdateMessageStatus {
        message_id: String,
        status: DeliveryStatus,
    },
}
