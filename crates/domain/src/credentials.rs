//! Credential state for the authenticated API session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before expiry at which a token is treated as already expired and
/// refreshed pre-emptively.
pub const REFRESH_BUFFER_SECONDS: i64 = 60;

/// One authenticated session's tokens.
///
/// Mutated only by a successful login, a successful refresh, or logout
/// (which discards the whole value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Bearer token attached to authenticated requests.
    pub access_token: String,
    /// Token exchanged for a new access token when the current one expires.
    pub refresh_token: String,
    /// Absolute instant the access token stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl Credentials {
    /// Creates credentials from a server response carrying a relative
    /// `expires_in` lifetime in seconds.
    #[must_use]
    pub fn from_expires_in(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: now + Duration::seconds(expires_in_secs),
        }
    }

    /// True when the access token has expired outright.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// True when the access token expires within `buffer_seconds` of `now`,
    /// i.e. it should be refreshed before use.
    #[must_use]
    pub fn expires_within(&self, buffer_seconds: i64, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::seconds(buffer_seconds)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn credentials(expires_at_secs: i64) -> Credentials {
        Credentials {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: at(expires_at_secs),
        }
    }

    #[test]
    fn test_from_expires_in_computes_absolute_expiry() {
        let creds = Credentials::from_expires_in("a", "r", 3600, at(1_000));
        assert_eq!(creds.expires_at, at(4_600));
    }

    #[test]
    fn test_is_expired() {
        let creds = credentials(1_000);
        assert!(!creds.is_expired(at(999)));
        assert!(creds.is_expired(at(1_000)));
        assert!(creds.is_expired(at(1_001)));
    }

    #[test]
    fn test_expires_within_buffer() {
        let creds = credentials(1_000);
        assert!(!creds.expires_within(REFRESH_BUFFER_SECONDS, at(900)));
        assert!(creds.expires_within(REFRESH_BUFFER_SECONDS, at(940)));
        assert!(creds.expires_within(REFRESH_BUFFER_SECONDS, at(1_200)));
    }
}
