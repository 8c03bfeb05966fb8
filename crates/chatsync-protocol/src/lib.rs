//! Canonical protocol types for one-to-one message synchronization.
//!
//! These types define the wire contract between a sync core and its two
//! external collaborators: the history store (request/response) and the
//! event channel (named events in both directions). They carry no
//! behavior beyond identity, ordering, and status transition rules.

pub mod events;
pub mod message;
pub mod status;

pub use events::{ClientEvent, ServerEvent};
pub use message::Message;
pub use status::DeliveryStatus;
