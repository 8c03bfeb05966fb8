//! One-to-one real-time message synchronization core.
//!
//! Reconciles a persisted message history (fetched on demand from a
//! history store) with a live event stream into a single deduplicated,
//! causally ordered timeline, and tracks per-message delivery status
//! through the `sent < delivered < read` lattice.
//!
//! The three external collaborators are trait seams:
//! - [`history::HistoryStore`] — request/response history fetch,
//!   bearer-token authenticated ([`history::HttpHistoryStore`]);
//! - [`channel::EventChannel`] — the persistent bidirectional event
//!   connection ([`channel::ChannelHub`]);
//! - [`identity::IdentityStore`] — the current user's durable ID.
//!
//! [`engine::SyncEngine`] ties them together and owns the timeline.

pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod identity;

pub use channel::{ChannelHub, EventChannel};
pub use config::SyncConfig;
pub use engine::{SyncEngine, SyncSignal, SyncState, Timeline};
pub use error::SyncError;
pub use history::{HistoryLoader, HistoryStore, HttpHistoryStore};
pub use identity::{FileIdentityStore, IdentityStore, StaticIdentity};

pub use chatsync_protocol::{ClientEvent, DeliveryStatus, Message, ServerEvent};
