//! Local session lifecycle.

use std::sync::Arc;

use riptide_domain::Credentials;

use crate::auth::RefreshManager;
use crate::error::ApiResult;
use crate::ports::CredentialStore;

/// Installs and tears down the local authenticated session.
///
/// The login REST exchange itself lives with the consuming app; this type
/// owns only the local state transition: persisting credentials after a
/// successful login (which also lifts the refresh-failure cooldown) and
/// discarding them on logout.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    refresh: Arc<RefreshManager>,
}

impl SessionManager {
    /// Creates a session manager over the given store and refresh manager.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, refresh: Arc<RefreshManager>) -> Self {
        Self { store, refresh }
    }

    /// Persists credentials obtained from a successful login.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the credentials cannot be persisted.
    pub async fn install_credentials(&self, credentials: Credentials) -> ApiResult<()> {
        self.store.save(&credentials).await?;
        self.refresh.clear_failure().await;
        tracing::info!("session installed");
        Ok(())
    }

    /// Discards the persisted credentials. The device identifier survives.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be written.
    pub async fn logout(&self) -> ApiResult<()> {
        self.store.clear().await?;
        tracing::info!("session cleared");
        Ok(())
    }

    /// True when a credential set is currently persisted.
    pub async fn is_authenticated(&self) -> bool {
        matches!(self.store.load().await, Ok(Some(_)))
    }
}
