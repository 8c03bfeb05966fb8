//! Live sync engine.
//!
//! Owns one conversation timeline and reconciles two sources that race
//! each other: the one-shot history fetch and the continuous event
//! stream. All timeline mutation happens behind a single mutex, so the
//! merge is order-independent no matter which source resolves first.

mod timeline;

pub use timeline::Timeline;

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use chatsync_protocol::{ClientEvent, DeliveryStatus, Message, ServerEvent};

use crate::channel::EventChannel;
use crate::error::SyncError;
use crate::history::{HistoryLoader, HistoryStore};
use crate::identity::IdentityStore;

/// Size of the consumer-facing signal channel.
const SIGNAL_BUFFER_SIZE: usize = 64;

/// Sync lifecycle of one open conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No identity or no conversation yet; inbound events are dropped.
    Uninitialized,
    /// History fetch in flight; live events apply to the timeline as they
    /// arrive and are reconciled when the fetch settles.
    Loading,
    /// Steady state: live events apply directly.
    Synced,
}

/// Advisory signals for the consumer of the timeline projection.
#[derive(Debug, Clone)]
pub enum SyncSignal {
    /// The snapshot grew or its newest entry changed; re-anchor to the
    /// newest content. Never blocks timeline mutation.
    ScrollToNewest,
    /// The history load failed. The timeline stays usable with whatever
    /// live events have accumulated; re-open the conversation to retry.
    HistoryFailed { error: String },
}

/// Per-conversation state, mutated only under the engine's mutex.
struct Conversation {
    state: SyncState,
    self_id: Option<String>,
    peer_id: Option<String>,
    /// Bumped on every open/close; tags in-flight loads so a stale
    /// completion cannot touch a newer conversation.
    epoch: u64,
    timeline: Timeline,
    /// Status updates that arrived while Loading for messages not yet in
    /// the timeline. Reconciled against the fetch result, then discarded.
    pending_status: HashMap<String, DeliveryStatus>,
    // Scroll-edge trackers.
    last_len: usize,
    last_newest: Option<String>,
}

impl Conversation {
    fn reset_timeline(&mut self) {
        self.timeline.clear();
        self.pending_status.clear();
        self.last_len = 0;
        self.last_newest = None;
    }
}

/// Live sync engine for one-to-one conversations.
///
/// Exactly one engine is active per `(self, peer)` pair; switching the
/// peer tears the timeline down and rebuilds it from scratch.
pub struct SyncEngine {
    channel: Arc<dyn EventChannel>,
    loader: HistoryLoader,
    identity: Arc<dyn IdentityStore>,
    inner: Mutex<Conversation>,
    signals_tx: broadcast::Sender<SyncSignal>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        channel: Arc<dyn EventChannel>,
        identity: Arc<dyn IdentityStore>,
    ) -> Arc<Self> {
        let (signals_tx, _) = broadcast::channel(SIGNAL_BUFFER_SIZE);
        Arc::new(Self {
            loader: HistoryLoader::new(store, Arc::clone(&channel)),
            channel,
            identity,
            inner: Mutex::new(Conversation {
                state: SyncState::Uninitialized,
                self_id: None,
                peer_id: None,
                epoch: 0,
                timeline: Timeline::new(),
                pending_status: HashMap::new(),
                last_len: 0,
                last_newest: None,
            }),
            signals_tx,
        })
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SyncState {
        self.inner.lock().await.state
    }

    /// Ordered snapshot of the active conversation's timeline.
    pub async fn snapshot(&self) -> Vec<Message> {
        self.inner.lock().await.timeline.snapshot()
    }

    /// Subscribe to advisory signals (scroll-to-newest, load failures).
    pub fn signals(&self) -> broadcast::Receiver<SyncSignal> {
        self.signals_tx.subscribe()
    }

    /// Open a conversation with `peer_id`, discarding any previous
    /// timeline and issuing exactly one history fetch.
    ///
    /// The identity is resolved from the local identity store on first
    /// open and cached for the session. Returns the handle of the
    /// spawned load so callers can await settlement; the engine is fully
    /// usable without doing so.
    pub async fn open_conversation(
        self: &Arc<Self>,
        peer_id: &str,
    ) -> Result<JoinHandle<()>, SyncError> {
        if peer_id.trim().is_empty() {
            return Err(SyncError::Validation(
                "peer identifier is empty".to_string(),
            ));
        }

        let cached = self.inner.lock().await.self_id.clone();
        let self_id = match cached {
            Some(id) => id,
            None => self
                .identity
                .current_user_id()
                .await?
                .ok_or(SyncError::IdentityUnavailable)?,
        };

        let epoch = {
            let mut inner = self.inner.lock().await;
            inner.self_id = Some(self_id.clone());
            inner.peer_id = Some(peer_id.to_string());
            inner.epoch += 1;
            inner.reset_timeline();
            inner.state = SyncState::Loading;
            inner.epoch
        };
        info!("Opened conversation with {}", peer_id);

        let engine = Arc::clone(self);
        let peer = peer_id.to_string();
        Ok(tokio::spawn(async move {
            let result = engine.loader.load(&self_id, &peer).await;
            engine.finish_load(epoch, result).await;
        }))
    }

    /// Close the active conversation. Already-issued status updates are
    /// not retracted; later inbound events are dropped.
    pub async fn close_conversation(&self) {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        inner.peer_id = None;
        inner.reset_timeline();
        inner.state = SyncState::Uninitialized;
        info!("Closed conversation");
    }

    async fn finish_load(&self, epoch: u64, result: Result<Vec<Message>, SyncError>) {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            debug!("Discarding history load for a superseded conversation");
            return;
        }

        match result {
            Ok(history) => {
                inner.timeline.merge_history(history);
                // Status updates that raced ahead of the fetch.
                let pending = std::mem::take(&mut inner.pending_status);
                for (message_id, status) in pending {
                    inner.timeline.advance_status(&message_id, status);
                }
                inner.state = SyncState::Synced;
                debug!("History merged, {} messages in timeline", inner.timeline.len());
            }
            Err(err) => {
                warn!("History load failed: {}", err);
                inner.pending_status.clear();
                inner.state = SyncState::Synced;
                let _ = self.signals_tx.send(SyncSignal::HistoryFailed {
                    error: err.to_string(),
                });
            }
        }
        self.emit_scroll_edge(&mut inner);
    }

    /// Apply one inbound event. Evaluated for every event regardless of
    /// state; events for a peer other than the active one are filtered
    /// here rather than by subscription teardown.
    pub async fn apply_event(&self, event: ServerEvent) {
        let mut inner = self.inner.lock().await;
        if inner.state == SyncState::Uninitialized {
            debug!("Dropping event received before a conversation is open");
            return;
        }
        let (Some(self_id), Some(peer_id)) = (inner.self_id.clone(), inner.peer_id.clone()) else {
            return;
        };

        match event {
            ServerEvent::MessageReceived(message) => {
                if !message.involves(&peer_id) {
                    debug!("Ignoring message {} outside active conversation", message.id);
                    return;
                }
                let inbound = message.addressed_to(&self_id);
                let message_id = message.id.clone();
                if inner.timeline.insert(message) && inbound {
                    self.emit_status_update(message_id, DeliveryStatus::Delivered);
                }
                self.emit_scroll_edge(&mut inner);
            }
            ServerEvent::MessageStatusUpdated { message_id, status } => {
                if inner.timeline.advance_status(&message_id, status) {
                    return;
                }
                if inner.state == SyncState::Loading {
                    // The message is likely in the fetch still in flight;
                    // hold the update for the merge.
                    let entry = inner
                        .pending_status
                        .entry(message_id)
                        .or_insert(status);
                    *entry = DeliveryStatus::advance(*entry, status);
                } else {
                    debug!("Dropping status update for unknown message {}", message_id);
                }
            }
        }
    }

    /// Send a message to the active peer.
    ///
    /// Rejects locally when the trimmed text is empty; no optimistic
    /// insert happens — the message enters the timeline when the channel
    /// echoes it back as `message-received`.
    pub async fn send(&self, text: &str) -> Result<(), SyncError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SyncError::Validation("message text is empty".to_string()));
        }

        let (sender_id, receiver_id) = {
            let inner = self.inner.lock().await;
            match (inner.self_id.clone(), inner.peer_id.clone()) {
                (Some(s), Some(p)) => (s, p),
                _ => return Err(SyncError::NoActiveConversation),
            }
        };

        self.channel
            .emit(ClientEvent::SendMessage {
                sender_id,
                receiver_id,
                text: trimmed.to_string(),
            })
            .await
    }

    /// Drive the engine from the channel subscription, in channel order.
    pub fn run_event_pump(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut rx = engine.channel.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => engine.apply_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Event pump lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Fire-and-forget status update; failures are logged and swallowed.
    fn emit_status_update(&self, message_id: String, status: DeliveryStatus) {
        let channel = Arc::clone(&self.channel);
        tokio::spawn(async move {
            let event = ClientEvent::UpdateMessageStatus {
                message_id: message_id.clone(),
                status,
            };
            if let Err(err) = channel.emit(event).await {
                debug!("Status update for {} not emitted: {}", message_id, err);
            }
        });
    }

    /// Edge-triggered scroll advisory: fires when the snapshot grew or
    /// its newest entry changed.
    fn emit_scroll_edge(&self, inner: &mut Conversation) {
        let len = inner.timeline.len();
        let newest = inner.timeline.newest_id();
        if len > inner.last_len || (newest.is_some() && newest != inner.last_newest) {
            let _ = self.signals_tx.send(SyncSignal::ScrollToNewest);
        }
        inner.last_len = len;
        inner.last_newest = newest;
    }
}
