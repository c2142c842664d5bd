//! Single-flight credential refresh.
//!
//! Many unrelated requests can discover an expired token at the same moment.
//! All of them funnel through one [`RefreshManager`], which runs at most one
//! refresh exchange at a time: the first caller becomes the leader and
//! performs the network call, every concurrent caller awaits the same shared
//! outcome. A failed refresh invalidates the whole session, so the manager
//! also remembers recent failure and short-circuits until the next login.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::{Mutex, watch};
use url::Url;

use riptide_domain::{Credentials, HttpMethod};

use crate::client::join_url;
use crate::ports::{Clock, CredentialStore, HttpTransport, TransportRequest};

/// Path of the credential refresh endpoint.
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";

/// Body of a successful refresh response.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Seconds until the new access token expires.
    expires_in: i64,
}

/// Progress of the shared refresh exchange, broadcast to waiters.
#[derive(Debug, Clone)]
enum Outcome {
    Pending,
    Done(Option<String>),
}

/// What a caller turned out to be once the lock was taken.
enum Role {
    Leader(watch::Sender<Outcome>),
    Waiter(watch::Receiver<Outcome>),
}

#[derive(Default)]
struct Shared {
    in_flight: Option<watch::Receiver<Outcome>>,
    has_failed_recently: bool,
}

/// Process-wide single-flight coordinator for credential refresh.
///
/// Constructed once at startup and passed to the API client by explicit
/// dependency injection.
pub struct RefreshManager {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    base_url: Url,
    shared: Mutex<Shared>,
}

impl RefreshManager {
    /// Creates a refresh manager talking to `base_url`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        base_url: Url,
    ) -> Self {
        Self {
            transport,
            store,
            clock,
            base_url,
            shared: Mutex::new(Shared::default()),
        }
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// Returns the new access token, or `None` when the refresh failed or a
    /// recent failure put the manager in cooldown. Concurrent callers share
    /// one network call; every caller observes the same result. On failure
    /// the persisted credentials are cleared (forced logout) and the
    /// cooldown engages until [`Self::clear_failure`].
    pub async fn refresh(&self) -> Option<String> {
        let role = {
            let mut shared = self.shared.lock().await;
            if shared.has_failed_recently {
                tracing::debug!("refresh short-circuited: recent failure");
                return None;
            }
            if let Some(receiver) = &shared.in_flight {
                Role::Waiter(receiver.clone())
            } else {
                let (sender, receiver) = watch::channel(Outcome::Pending);
                shared.in_flight = Some(receiver);
                Role::Leader(sender)
            }
        };

        match role {
            Role::Waiter(mut receiver) => {
                let outcome = receiver
                    .wait_for(|outcome| matches!(outcome, Outcome::Done(_)))
                    .await;
                match outcome {
                    Ok(guard) => match &*guard {
                        Outcome::Done(token) => token.clone(),
                        Outcome::Pending => None,
                    },
                    Err(_) => None,
                }
            }
            Role::Leader(sender) => {
                let token = self.execute_refresh().await;

                {
                    let mut shared = self.shared.lock().await;
                    shared.in_flight = None;
                    shared.has_failed_recently = token.is_none();
                }
                if token.is_none() {
                    // A refresh failure invalidates the whole session.
                    tracing::warn!("credential refresh failed, clearing session");
                    if let Err(error) = self.store.clear().await {
                        tracing::warn!(%error, "failed to clear credentials");
                    }
                }

                let _ = sender.send(Outcome::Done(token.clone()));
                token
            }
        }
    }

    /// Clears the failure cooldown after a successful login.
    pub async fn clear_failure(&self) {
        let mut shared = self.shared.lock().await;
        shared.has_failed_recently = false;
    }

    /// True while the manager refuses to refresh because of a recent failure.
    pub async fn has_failed_recently(&self) -> bool {
        self.shared.lock().await.has_failed_recently
    }

    /// Performs the refresh exchange and persists the renewed credentials.
    async fn execute_refresh(&self) -> Option<String> {
        let current = match self.store.load().await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                tracing::debug!("no stored credentials to refresh");
                return None;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to load credentials");
                return None;
            }
        };
        let device_token = self.store.device_token().await.ok()?;

        let request = TransportRequest::new(
            HttpMethod::Post,
            join_url(&self.base_url, REFRESH_ENDPOINT),
        )
        .with_header("Content-Type", "application/json")
        .with_header("X-Device-Token", device_token)
        .with_body(json!({ "refresh_token": current.refresh_token.clone() }));

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "refresh request failed");
                return None;
            }
        };
        if !response.is_success() {
            tracing::warn!(status = response.status, "refresh request rejected");
            return None;
        }

        let parsed: RefreshResponse = match serde_json::from_slice(&response.body) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(%error, "malformed refresh response");
                return None;
            }
        };

        let renewed = Credentials::from_expires_in(
            parsed.access_token,
            parsed
                .refresh_token
                .unwrap_or(current.refresh_token),
            parsed.expires_in,
            self.clock.now(),
        );
        if let Err(error) = self.store.save(&renewed).await {
            tracing::warn!(%error, "failed to persist refreshed credentials");
            return None;
        }

        tracing::debug!("credentials refreshed");
        Some(renewed.access_token)
    }
}
