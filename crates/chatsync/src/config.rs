//! Sync core configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the synchronization core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the history store.
    pub history_base_url: String,

    /// Bearer token for the history store. Supports `env:VAR_NAME` to
    /// read the token from the environment at resolution time.
    pub auth_token: Option<String>,

    /// Request timeout for history fetches, in seconds.
    pub request_timeout_secs: u64,

    /// Path to the local identity file. Defaults to no file-backed
    /// identity; embedders may supply an identity store directly.
    pub identity_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            history_base_url: "http://localhost:8080".to_string(),
            auth_token: None,
            request_timeout_secs: 30,
            identity_path: None,
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file. Missing keys fall back to
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file: {}", path.display()))?;
        let config: SyncConfig = toml::from_str(&contents)
            .with_context(|| format!("parsing config file: {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the auth token, expanding `env:VAR_NAME` syntax.
    pub fn resolve_auth_token(&self) -> Result<Option<String>> {
        match &self.auth_token {
            None => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    let token = std::env::var(var_name).with_context(|| {
                        format!("auth token environment variable not set: {}", var_name)
                    })?;
                    if token.is_empty() {
                        anyhow::bail!("auth token environment variable is empty: {}", var_name);
                    }
                    Ok(Some(token))
                } else {
                    Ok(Some(value.clone()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.auth_token.is_none());
        assert!(config.identity_path.is_none());
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "history_base_url = \"https://chat.example.com\"\nauth_token = \"tok-123\""
        )
        .unwrap();

        let config = SyncConfig::load(file.path()).unwrap();
        assert_eq!(config.history_base_url, "https://chat.example.com");
        assert_eq!(config.auth_token.as_deref(), Some("tok-123"));
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_resolve_literal_token() {
        let config = SyncConfig {
            auth_token: Some("tok-abc".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_auth_token().unwrap().as_deref(),
            Some("tok-abc")
        );
    }

    #[test]
    fn test_resolve_env_token() {
        // Unique variable name to avoid cross-test interference.
        unsafe { std::env::set_var("CHATSYNC_TEST_TOKEN_RESOLVE", "tok-env") };
        let config = SyncConfig {
            auth_token: Some("env:CHATSYNC_TEST_TOKEN_RESOLVE".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_auth_token().unwrap().as_deref(),
            Some("tok-env")
        );

        let missing = SyncConfig {
            auth_token: Some("env:CHATSYNC_TEST_TOKEN_MISSING".to_string()),
            ..Default::default()
        };
        assert!(missing.resolve_auth_token().is_err());
    }
}
