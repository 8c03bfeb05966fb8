//! Event channel handle.
//!
//! One process-wide channel connection serves every conversation view.
//! Rather than ambient global state, the connection is an explicit handle
//! created by [`ChannelHub::connect`] at session start and passed into
//! each sync engine. The hub fans inbound events out to subscribers and
//! queues outbound events for whatever transport drains them.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, mpsc};

use chatsync_protocol::{ClientEvent, ServerEvent};

use crate::error::SyncError;

/// Size of the broadcast channel for inbound events.
const EVENT_BUFFER_SIZE: usize = 256;

/// Size of the outbound send queue.
const OUTBOUND_BUFFER_SIZE: usize = 64;

/// Handle to the live event channel.
///
/// Subscription order is FIFO per channel: events are observed in the
/// order the channel emitted them.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Subscribe to inbound events.
    fn subscribe(&self) -> broadcast::Receiver<ServerEvent>;

    /// Emit an outbound event. Fails with [`SyncError::Transport`] once
    /// the channel is disconnected.
    async fn emit(&self, event: ClientEvent) -> Result<(), SyncError>;
}

/// In-process event channel hub.
///
/// The hub owns both directions of the connection:
/// - inbound: a transport task injects events via [`ChannelHub::deliver`],
///   fanned out to every subscriber;
/// - outbound: [`EventChannel::emit`] queues events on an mpsc the
///   transport drains.
pub struct ChannelHub {
    inbound_tx: broadcast::Sender<ServerEvent>,
    outbound_tx: mpsc::Sender<ClientEvent>,
    connected: AtomicBool,
}

impl ChannelHub {
    /// Open the channel for the session. Returns the shared handle and
    /// the receiver end of the outbound queue for the transport.
    pub fn connect() -> (Arc<Self>, mpsc::Receiver<ClientEvent>) {
        let (inbound_tx, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER_SIZE);
        info!("Event channel connected");
        (
            Arc::new(Self {
                inbound_tx,
                outbound_tx,
                connected: AtomicBool::new(true),
            }),
            outbound_rx,
        )
    }

    /// Inject an inbound event from the transport.
    pub fn deliver(&self, event: ServerEvent) {
        if !self.is_connected() {
            debug!("Dropping inbound event after disconnect");
            return;
        }
        // Err means no live subscribers; nothing to do.
        let _ = self.inbound_tx.send(event);
    }

    /// Close the channel at session end. Inbound delivery stops and
    /// subsequent emits fail; events already queued are not retracted.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        info!("Event channel disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventChannel for ChannelHub {
    fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.inbound_tx.subscribe()
    }

    async fn emit(&self, event: ClientEvent) -> Result<(), SyncError> {
        if !self.is_connected() {
            return Err(SyncError::Transport(
                "event channel is disconnected".to_string(),
            ));
        }
        self.outbound_tx.send(event).await.map_err(|_| {
            warn!("Outbound event queue closed");
            SyncError::Transport("outbound event queue closed".to_string())
        })
    }
}
