//! End-to-end synchronization flow through the event pump.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use chatsync::{
    ChannelHub, ClientEvent, DeliveryStatus, EventChannel, HistoryStore, Message, ServerEvent,
    StaticIdentity, SyncEngine, SyncError, SyncSignal, SyncState,
};

struct FixedHistory(Vec<Message>);

#[async_trait]
impl HistoryStore for FixedHistory {
    async fn fetch_conversation(
        &self,
        _self_id: &str,
        _peer_id: &str,
    ) -> Result<Vec<Message>, SyncError> {
        Ok(self.0.clone())
    }
}

fn msg(id: &str, sender: &str, receiver: &str, created_at: i64, status: DeliveryStatus) -> Message {
    Message {
        id: id.to_string(),
        sender_id: sender.to_string(),
        receiver_id: receiver.to_string(),
        text: format!("text of {}", id),
        created_at,
        status,
    }
}

/// Poll until `check` passes or the deadline expires.
async fn wait_for<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if check().await {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("condition not reached within deadline");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn full_conversation_flow() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (hub, mut outbound_rx) = ChannelHub::connect();
    let history = vec![
        msg("m2", "alice", "bob", 200, DeliveryStatus::Read),
        msg("m1", "bob", "alice", 100, DeliveryStatus::Delivered),
    ];
    let engine = SyncEngine::new(
        Arc::new(FixedHistory(history)),
        hub.clone() as Arc<dyn EventChannel>,
        Arc::new(StaticIdentity("alice".to_string())),
    );
    let _pump = engine.run_event_pump();
    let mut signals = engine.signals();

    let load = engine.open_conversation("bob").await.unwrap();
    load.await.unwrap();
    assert_eq!(engine.state().await, SyncState::Synced);

    // History is merged in timeline order.
    let snapshot = engine.snapshot().await;
    assert_eq!(
        snapshot.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
        vec!["m1", "m2"]
    );

    // The unread inbound history message got a read receipt.
    assert_eq!(
        outbound_rx.recv().await.unwrap(),
        ClientEvent::UpdateMessageStatus {
            message_id: "m1".to_string(),
            status: DeliveryStatus::Read,
        }
    );

    // A live inbound message flows through the pump into the timeline.
    hub.deliver(ServerEvent::MessageReceived(msg(
        "m3",
        "bob",
        "alice",
        300,
        DeliveryStatus::Sent,
    )));
    wait_for(|| async { engine.snapshot().await.len() == 3 }).await;

    // It is acknowledged as delivered.
    assert_eq!(
        outbound_rx.recv().await.unwrap(),
        ClientEvent::UpdateMessageStatus {
            message_id: "m3".to_string(),
            status: DeliveryStatus::Delivered,
        }
    );

    // A status update for it advances the timeline entry.
    hub.deliver(ServerEvent::MessageStatusUpdated {
        message_id: "m3".to_string(),
        status: DeliveryStatus::Read,
    });
    wait_for(|| async {
        engine
            .snapshot()
            .await
            .iter()
            .any(|m| m.id == "m3" && m.status == DeliveryStatus::Read)
    })
    .await;

    // Sending trims the text and emits; the message only appears once the
    // channel echoes it back.
    engine.send("  see you soon  ").await.unwrap();
    assert_eq!(
        outbound_rx.recv().await.unwrap(),
        ClientEvent::SendMessage {
            sender_id: "alice".to_string(),
            receiver_id: "bob".to_string(),
            text: "see you soon".to_string(),
        }
    );
    assert_eq!(engine.snapshot().await.len(), 3);

    let mut echo = msg("m4", "alice", "bob", 400, DeliveryStatus::Sent);
    echo.text = "see you soon".to_string();
    hub.deliver(ServerEvent::MessageReceived(echo));
    wait_for(|| async { engine.snapshot().await.len() == 4 }).await;

    // Scroll advisories fired along the way.
    assert!(matches!(
        signals.recv().await.unwrap(),
        SyncSignal::ScrollToNewest
    ));

    // Messages outside the active pair never land in the timeline.
    hub.deliver(ServerEvent::MessageReceived(msg(
        "m5",
        "carol",
        "alice",
        500,
        DeliveryStatus::Sent,
    )));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(engine.snapshot().await.len(), 4);

    // Session end: the channel handle stops accepting emissions.
    hub.disconnect();
    assert!(matches!(
        engine.send("too late").await,
        Err(SyncError::Transport(_))
    ));
}

#[tokio::test]
async fn peer_switch_rebuilds_through_pump() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (hub, _outbound_rx) = ChannelHub::connect();
    let engine = SyncEngine::new(
        Arc::new(FixedHistory(Vec::new())),
        hub.clone() as Arc<dyn EventChannel>,
        Arc::new(StaticIdentity("alice".to_string())),
    );
    let _pump = engine.run_event_pump();

    let load = engine.open_conversation("bob").await.unwrap();
    load.await.unwrap();
    hub.deliver(ServerEvent::MessageReceived(msg(
        "m1",
        "bob",
        "alice",
        100,
        DeliveryStatus::Sent,
    )));
    wait_for(|| async { engine.snapshot().await.len() == 1 }).await;

    // Switching the peer discards the old timeline; stale events for the
    // old peer are filtered at apply time.
    let load = engine.open_conversation("carol").await.unwrap();
    load.await.unwrap();
    assert!(engine.snapshot().await.is_empty());

    hub.deliver(ServerEvent::MessageReceived(msg(
        "m2",
        "bob",
        "alice",
        200,
        DeliveryStatus::Sent,
    )));
    hub.deliver(ServerEvent::MessageReceived(msg(
        "m3",
        "carol",
        "alice",
        300,
        DeliveryStatus::Sent,
    )));
    wait_for(|| async { engine.snapshot().await.len() == 1 }).await;
    assert_eq!(engine.snapshot().await[0].id, "m3");

    engine.close_conversation().await;
    assert_eq!(engine.state().await, SyncState::Uninitialized);
    assert!(engine.snapshot().await.is_empty());
}
