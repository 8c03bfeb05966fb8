//! Synchronization errors.

use thiserror::Error;

/// Errors surfaced by the synchronization core.
///
/// Fire-and-forget status-update emissions never produce one of these for
/// the caller; their failures are logged and swallowed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or rejected authentication token.
    #[error("authentication rejected by history store")]
    Auth,

    /// Network or transport failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Non-success response from the history store.
    #[error("history store returned status {status}")]
    Server { status: u16 },

    /// Input rejected locally before any network or channel activity.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The local identity store has no identity yet.
    #[error("local identity not available")]
    IdentityUnavailable,

    /// A send was issued without an open conversation.
    #[error("no active conversation")]
    NoActiveConversation,
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport(err.to_string())
    }
}
