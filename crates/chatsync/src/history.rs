//! History store client and loader.
//!
//! The history store answers one question: all messages ever exchanged
//! between two users. The loader performs the one-shot fetch for a
//! conversation-open, orders the result, and marks everything addressed
//! to the current user as read. It is never retried automatically; a
//! consumer re-invokes it explicitly on failure.

use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

use chatsync_protocol::{ClientEvent, DeliveryStatus, Message};

use crate::channel::EventChannel;
use crate::config::SyncConfig;
use crate::error::SyncError;

/// Read access to persisted conversation history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Fetch all messages between the two users.
    async fn fetch_conversation(
        &self,
        self_id: &str,
        peer_id: &str,
    ) -> Result<Vec<Message>, SyncError>;
}

/// Map a history store HTTP status to an error, or `None` for success.
fn classify_response_status(status: u16) -> Option<SyncError> {
    match status {
        200..=299 => None,
        401 | 403 => Some(SyncError::Auth),
        other => Some(SyncError::Server { status: other }),
    }
}

/// HTTP client for the history store, bearer-token authenticated.
pub struct HttpHistoryStore {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpHistoryStore {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
            client,
        })
    }

    /// Build a store from configuration, resolving `env:` tokens.
    pub fn from_config(config: &SyncConfig) -> anyhow::Result<Self> {
        let auth_token = config.resolve_auth_token()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.history_base_url.trim_end_matches('/').to_string(),
            auth_token,
            client,
        })
    }
}

#[async_trait]
impl HistoryStore for HttpHistoryStore {
    async fn fetch_conversation(
        &self,
        self_id: &str,
        peer_id: &str,
    ) -> Result<Vec<Message>, SyncError> {
        let token = self.auth_token.as_ref().ok_or(SyncError::Auth)?;

        let url = format!("{}/messages/{}/{}", self.base_url, self_id, peer_id);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if let Some(err) = classify_response_status(response.status().as_u16()) {
            return Err(err);
        }

        let messages: Vec<Message> = response.json().await?;
        Ok(messages)
    }
}

/// One-shot history fetch for an open conversation.
pub struct HistoryLoader {
    store: Arc<dyn HistoryStore>,
    channel: Arc<dyn EventChannel>,
}

impl HistoryLoader {
    pub fn new(store: Arc<dyn HistoryStore>, channel: Arc<dyn EventChannel>) -> Self {
        Self { store, channel }
    }

    /// Fetch the full history between `self_id` and `peer_id`, ordered by
    /// creation time with identifier tie-break.
    ///
    /// Side effect: every returned message addressed to `self_id` that is
    /// not yet read gets a read receipt emitted on the event channel,
    /// fire-and-forget. Receipt failures never fail the load.
    pub async fn load(&self, self_id: &str, peer_id: &str) -> Result<Vec<Message>, SyncError> {
        if self_id.trim().is_empty() || peer_id.trim().is_empty() {
            return Err(SyncError::Validation(
                "conversation requires both user identifiers".to_string(),
            ));
        }

        let mut messages = self.store.fetch_conversation(self_id, peer_id).await?;
        messages.sort_by(|a, b| a.cmp_in_timeline(b));
        info!(
            "Loaded {} history messages for conversation with {}",
            messages.len(),
            peer_id
        );

        for message in &messages {
            if message.addressed_to(self_id) && message.status < DeliveryStatus::Read {
                let channel = Arc::clone(&self.channel);
                let message_id = message.id.clone();
                tokio::spawn(async move {
                    let event = ClientEvent::UpdateMessageStatus {
                        message_id: message_id.clone(),
                        status: DeliveryStatus::Read,
                    };
                    if let Err(err) = channel.emit(event).await {
                        debug!("Read receipt for {} not emitted: {}", message_id, err);
                    }
                });
            }
        }

        Ok(messages)
    }
}
