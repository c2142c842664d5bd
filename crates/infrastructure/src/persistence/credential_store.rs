//! File-based credential store implementation.
//!
//! Credentials and the per-install device identifier are stored as JSON in
//! the platform config directory (`<config>/riptide/credentials.json`).
//! Logout clears the credentials but keeps the device identifier, which is
//! generated exactly once per install.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;

use riptide_application::ports::{CredentialStore, CredentialStoreError};
use riptide_domain::Credentials;

const SCHEMA_VERSION: u32 = 1;

/// On-disk shape of the store:
/// ```json
/// {
///   "schema_version": 1,
///   "credentials": { "access_token": "...", "refresh_token": "...", "expires_at": "..." },
///   "device_token": "0192f7a0-..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedState {
    schema_version: u32,
    #[serde(default)]
    credentials: Option<Credentials>,
    #[serde(default)]
    device_token: Option<String>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            credentials: None,
            device_token: None,
        }
    }
}

/// File-based credential store.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    /// Cached device token so steady-state requests skip the disk read.
    device_token: RwLock<Option<String>>,
}

impl FileCredentialStore {
    /// Creates a store at the platform default location.
    ///
    /// # Errors
    ///
    /// Returns an error when no platform config directory is available.
    pub fn new() -> Result<Self, CredentialStoreError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            CredentialStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no platform config directory",
            ))
        })?;
        Ok(Self::with_path(
            config_dir.join("riptide").join("credentials.json"),
        ))
    }

    /// Creates a store backed by an explicit file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            device_token: RwLock::new(None),
        }
    }

    async fn read_state(&self) -> Result<PersistedState, CredentialStoreError> {
        match fs::read(&self.path).await {
            Ok(content) => serde_json::from_slice(&content)
                .map_err(|e| CredentialStoreError::Serialization(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistedState::default()),
            Err(e) => Err(CredentialStoreError::Io(e)),
        }
    }

    async fn write_state(&self, state: &PersistedState) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec_pretty(state)
            .map_err(|e| CredentialStoreError::Serialization(e.to_string()))?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credentials>, CredentialStoreError> {
        Ok(self.read_state().await?.credentials)
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), CredentialStoreError> {
        let mut state = self.read_state().await?;
        state.credentials = Some(credentials.clone());
        self.write_state(&state).await
    }

    async fn clear(&self) -> Result<(), CredentialStoreError> {
        let mut state = self.read_state().await?;
        if state.credentials.is_none() {
            return Ok(());
        }
        state.credentials = None;
        self.write_state(&state).await
    }

    async fn device_token(&self) -> Result<String, CredentialStoreError> {
        if let Some(token) = self.device_token.read().await.clone() {
            return Ok(token);
        }

        // Hold the write lock across the read-generate-persist sequence so
        // concurrent first calls cannot mint two identifiers.
        let mut cached = self.device_token.write().await;
        if let Some(token) = cached.clone() {
            return Ok(token);
        }

        let mut state = self.read_state().await?;
        let token = match &state.device_token {
            Some(token) => token.clone(),
            None => {
                let token = uuid::Uuid::now_v7().to_string();
                state.device_token = Some(token.clone());
                self.write_state(&state).await?;
                tracing::debug!("generated device identifier");
                token
            }
        };
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    fn credentials() -> Credentials {
        Credentials {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: DateTime::from_timestamp(2_000_000_000, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_load_without_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::with_path(dir.path().join("credentials.json"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::with_path(path.clone());
        store.save(&credentials()).await.unwrap();

        // A fresh instance reads the same state back.
        let reopened = FileCredentialStore::with_path(path);
        assert_eq!(reopened.load().await.unwrap(), Some(credentials()));
    }

    #[tokio::test]
    async fn test_clear_keeps_device_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::with_path(path.clone());
        let device = store.device_token().await.unwrap();
        store.save(&credentials()).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.load().await.unwrap(), None);
        let reopened = FileCredentialStore::with_path(path);
        assert_eq!(reopened.device_token().await.unwrap(), device);
    }

    #[tokio::test]
    async fn test_device_token_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::with_path(dir.path().join("credentials.json"));

        let first = store.device_token().await.unwrap();
        let second = store.device_token().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 36);
    }
}
