//! Credential store port
//!
//! Defines the interface for persisting session credentials and the
//! per-install device identifier through a platform-appropriate secure
//! store.

use async_trait::async_trait;

use riptide_domain::Credentials;

/// Errors that can occur during credential store operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository trait for credential persistence.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the persisted credentials, if a session exists.
    async fn load(&self) -> Result<Option<Credentials>, CredentialStoreError>;

    /// Persists a credential set, replacing any previous one.
    async fn save(&self, credentials: &Credentials) -> Result<(), CredentialStoreError>;

    /// Discards the persisted credentials. The device identifier survives.
    async fn clear(&self) -> Result<(), CredentialStoreError>;

    /// Returns the per-install device identifier, generating and persisting
    /// one on first use.
    async fn device_token(&self) -> Result<String, CredentialStoreError>;
}
