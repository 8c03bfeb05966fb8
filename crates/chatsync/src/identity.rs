//! Local identity store.
//!
//! Supplies the current user's durable identifier, loaded once per
//! session. Absence before the identity has been provisioned is a valid
//! transient state, not an error.

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::SyncError;

/// Source of the current user's identifier.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Returns the current user ID, or `None` if no identity has been
    /// provisioned yet.
    async fn current_user_id(&self) -> Result<Option<String>, SyncError>;
}

/// On-disk identity record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityRecord {
    user_id: String,
}

/// File-backed identity store reading a small JSON record
/// (`{"userId": "..."}`) from a fixed path.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn current_user_id(&self) -> Result<Option<String>, SyncError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("identity file not present: {}", self.path.display());
                return Ok(None);
            }
            Err(err) => return Err(SyncError::Transport(err.to_string())),
        };

        let record: IdentityRecord = serde_json::from_str(&contents)
            .map_err(|err| SyncError::Validation(format!("malformed identity file: {}", err)))?;

        if record.user_id.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(record.user_id))
    }
}

/// Fixed identity, for embedding and tests.
pub struct StaticIdentity(pub String);

#[async_trait]
impl IdentityStore for StaticIdentity {
    async fn current_user_id(&self) -> Result<Option<String>, SyncError> {
        Ok(Some(self.0.clone()))
    }
}
