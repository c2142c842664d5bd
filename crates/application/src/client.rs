//! Authenticated request client.
//!
//! Wraps the raw transport with credential injection, pre-emptive refresh of
//! expiring tokens, and a single retry after a 401. The retry is bounded:
//! one refresh-and-retry per request, never for the refresh endpoint itself.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use riptide_domain::{HttpMethod, REFRESH_BUFFER_SECONDS};

use crate::auth::{REFRESH_ENDPOINT, RefreshManager};
use crate::error::{ApiError, ApiResult};
use crate::ports::{Clock, CredentialStore, HttpTransport, TransportRequest, TransportResponse};

/// Joins an endpoint path onto the API base URL.
pub(crate) fn join_url(base: &Url, path: &str) -> String {
    format!("{}{}", base.as_str().trim_end_matches('/'), path)
}

/// A decoded successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiPayload {
    /// 204 or an empty body.
    Empty,
    /// A JSON response body.
    Json(Value),
    /// A non-JSON response body.
    Text(String),
}

impl ApiPayload {
    /// The payload as JSON; an empty payload maps to `null`.
    ///
    /// # Errors
    ///
    /// Fails when the server answered with a non-JSON body.
    pub fn into_json(self) -> ApiResult<Value> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Empty => Ok(Value::Null),
            Self::Text(_) => Err(ApiError::Normalization(
                "expected a JSON response, got text".to_string(),
            )),
        }
    }
}

/// HTTP client with credential handling.
///
/// Every outbound request carries the JSON content type and the per-install
/// device identifier; authenticated requests additionally carry the bearer
/// token, refreshed pre-emptively when it is about to expire.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn CredentialStore>,
    refresh: Arc<RefreshManager>,
    clock: Arc<dyn Clock>,
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for the API at `base_url`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn CredentialStore>,
        refresh: Arc<RefreshManager>,
        clock: Arc<dyn Clock>,
        base_url: Url,
    ) -> Self {
        Self {
            transport,
            store,
            refresh,
            clock,
            base_url,
        }
    }

    /// Convenience wrapper for authenticated GET requests.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn get(&self, path: &str, query: Option<&str>) -> ApiResult<ApiPayload> {
        self.request(HttpMethod::Get, path, query, None, true).await
    }

    /// Executes one API request.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Network`] when the transport fails or a 2xx body cannot
    ///   be parsed;
    /// - [`ApiError::Http`] for non-2xx responses other than a retryable 401;
    /// - [`ApiError::Authentication`] when no usable credential can be
    ///   produced for an authenticated endpoint, or a 401 survives the
    ///   refresh-and-retry.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: Option<&str>,
        body: Option<Value>,
        requires_auth: bool,
    ) -> ApiResult<ApiPayload> {
        let mut url = join_url(&self.base_url, path);
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        let device_token = self.store.device_token().await?;
        let mut token = self.initial_token(requires_auth).await?;
        let mut retried = false;

        loop {
            let mut request = TransportRequest::new(method, url.clone())
                .with_header("Content-Type", "application/json")
                .with_header("X-Device-Token", device_token.clone());
            if let Some(token) = &token {
                request = request.with_header("Authorization", format!("Bearer {token}"));
            }
            if let Some(body) = &body {
                request = request.with_body(body.clone());
            }

            let response = self.transport.send(request).await?;

            if response.status == 401 && path != REFRESH_ENDPOINT {
                if !retried {
                    retried = true;
                    tracing::debug!(path, "unauthorized, attempting refresh");
                    if let Some(renewed) = self.refresh.refresh().await {
                        token = Some(renewed);
                        continue;
                    }
                }
                return Err(ApiError::Authentication(
                    "request unauthorized after refresh".to_string(),
                ));
            }

            return Self::decode(response);
        }
    }

    /// Resolves the access token to attach before dispatch, refreshing
    /// pre-emptively when the stored one expires within the buffer.
    async fn initial_token(&self, requires_auth: bool) -> ApiResult<Option<String>> {
        if requires_auth && self.refresh.has_failed_recently().await {
            return Err(ApiError::Authentication(
                "session invalidated by a failed refresh".to_string(),
            ));
        }

        match self.store.load().await? {
            Some(credentials) => {
                if credentials.expires_within(REFRESH_BUFFER_SECONDS, self.clock.now()) {
                    match self.refresh.refresh().await {
                        Some(token) => Ok(Some(token)),
                        None if requires_auth => Err(ApiError::Authentication(
                            "could not refresh expired credentials".to_string(),
                        )),
                        None => Ok(None),
                    }
                } else {
                    Ok(Some(credentials.access_token))
                }
            }
            None if requires_auth => Err(ApiError::Authentication(
                "not signed in".to_string(),
            )),
            None => Ok(None),
        }
    }

    /// Decodes a transport response into a payload or an error.
    fn decode(response: TransportResponse) -> ApiResult<ApiPayload> {
        if !response.is_success() {
            let body = if response.is_json() {
                serde_json::from_slice(&response.body)
                    .unwrap_or_else(|_| Value::String(response.body_text()))
            } else {
                Value::String(response.body_text())
            };
            return Err(ApiError::Http {
                status: response.status,
                body,
            });
        }

        if response.status == 204 || response.body.is_empty() {
            return Ok(ApiPayload::Empty);
        }
        if response.is_json() {
            return serde_json::from_slice(&response.body)
                .map(ApiPayload::Json)
                .map_err(|e| ApiError::Network(format!("failed to parse response body: {e}")));
        }
        Ok(ApiPayload::Text(response.body_text()))
    }
}

/// Re-exported test doubles shared by the crate's unit tests.
#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use riptide_domain::Credentials;

    use crate::ports::{
        Clock, CredentialStore, CredentialStoreError, HttpTransport, TransportError,
        TransportRequest, TransportResponse,
    };

    /// Transport double answering from a handler closure and recording every
    /// request it saw. An optional delay keeps responses pending across an
    /// await point so tests can overlap concurrent callers.
    pub struct ScriptedTransport {
        handler: Box<
            dyn Fn(&TransportRequest) -> Result<TransportResponse, TransportError> + Send + Sync,
        >,
        calls: Mutex<Vec<TransportRequest>>,
        delay: std::time::Duration,
    }

    impl ScriptedTransport {
        pub fn new(
            handler: impl Fn(&TransportRequest) -> Result<TransportResponse, TransportError>
            + Send
            + Sync
            + 'static,
        ) -> Self {
            Self {
                handler: Box::new(handler),
                calls: Mutex::new(Vec::new()),
                delay: std::time::Duration::ZERO,
            }
        }

        pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> Vec<TransportRequest> {
            self.calls.lock().expect("calls lock").clone()
        }

        pub fn calls_to(&self, path_fragment: &str) -> usize {
            self.calls()
                .iter()
                .filter(|request| request.url.contains(path_fragment))
                .count()
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn send(
            &self,
            request: TransportRequest,
        ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + '_>>
        {
            let response = (self.handler)(&request);
            self.calls.lock().expect("calls lock").push(request);
            let delay = self.delay;
            Box::pin(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                response
            })
        }
    }

    /// In-memory credential store.
    pub struct MemoryCredentialStore {
        credentials: Mutex<Option<Credentials>>,
    }

    impl MemoryCredentialStore {
        pub fn empty() -> Self {
            Self {
                credentials: Mutex::new(None),
            }
        }

        pub fn with(credentials: Credentials) -> Self {
            Self {
                credentials: Mutex::new(Some(credentials)),
            }
        }
    }

    #[async_trait::async_trait]
    impl CredentialStore for MemoryCredentialStore {
        async fn load(&self) -> Result<Option<Credentials>, CredentialStoreError> {
            Ok(self.credentials.lock().expect("credentials lock").clone())
        }

        async fn save(&self, credentials: &Credentials) -> Result<(), CredentialStoreError> {
            *self.credentials.lock().expect("credentials lock") = Some(credentials.clone());
            Ok(())
        }

        async fn clear(&self) -> Result<(), CredentialStoreError> {
            *self.credentials.lock().expect("credentials lock") = None;
            Ok(())
        }

        async fn device_token(&self) -> Result<String, CredentialStoreError> {
            Ok("device-1".to_string())
        }
    }

    /// Clock frozen at a fixed instant.
    pub struct FixedClock(pub DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    pub fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).expect("valid timestamp")
    }

    pub fn json_response(status: u16, body: &serde_json::Value) -> TransportResponse {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/json".to_string(),
        );
        TransportResponse::new(status, headers, body.to_string().into_bytes())
    }

    pub fn credentials_expiring_at(secs: i64) -> Credentials {
        Credentials {
            access_token: "access-old".to_string(),
            refresh_token: "refresh-1".to_string(),
            expires_at: at(secs),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::test_support::{
        FixedClock, MemoryCredentialStore, ScriptedTransport, at, credentials_expiring_at,
        json_response,
    };
    use super::*;
    use crate::ports::TransportResponse;

    fn base_url() -> Url {
        Url::parse("https://api.example.com").unwrap()
    }

    fn client_over(
        transport: Arc<ScriptedTransport>,
        store: Arc<MemoryCredentialStore>,
        now_secs: i64,
    ) -> ApiClient {
        let clock = Arc::new(FixedClock(at(now_secs)));
        let refresh = Arc::new(RefreshManager::new(
            transport.clone(),
            store.clone(),
            clock.clone(),
            base_url(),
        ));
        ApiClient::new(transport, store, refresh, clock, base_url())
    }

    #[test]
    fn test_join_url_trims_trailing_slash() {
        let base = Url::parse("https://api.example.com/v1/").unwrap();
        assert_eq!(
            join_url(&base, "/articles"),
            "https://api.example.com/v1/articles"
        );
    }

    #[tokio::test]
    async fn test_request_attaches_standard_headers() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Ok(json_response(200, &json!([])))
        }));
        // Token valid until well past "now".
        let store = Arc::new(MemoryCredentialStore::with(credentials_expiring_at(10_000)));
        let client = client_over(transport.clone(), store, 0);

        client.get("/articles", Some("page_size=20")).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "https://api.example.com/articles?page_size=20");
        assert_eq!(calls[0].header("content-type"), Some("application/json"));
        assert_eq!(calls[0].header("x-device-token"), Some("device-1"));
        assert_eq!(calls[0].header("authorization"), Some("Bearer access-old"));
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed_preemptively() {
        let transport = Arc::new(ScriptedTransport::new(|request| {
            if request.url.contains("/auth/refresh") {
                Ok(json_response(
                    200,
                    &json!({ "access_token": "access-new", "expires_in": 3600 }),
                ))
            } else {
                Ok(json_response(200, &json!([])))
            }
        }));
        // Expires 30s from now, inside the 60s buffer.
        let store = Arc::new(MemoryCredentialStore::with(credentials_expiring_at(30)));
        let client = client_over(transport.clone(), store, 0);

        client.get("/articles", None).await.unwrap();

        assert_eq!(transport.calls_to("/auth/refresh"), 1);
        let calls = transport.calls();
        let fetch = calls.iter().find(|c| c.url.contains("/articles")).unwrap();
        assert_eq!(fetch.header("authorization"), Some("Bearer access-new"));
    }

    #[tokio::test]
    async fn test_401_triggers_one_refresh_and_retry() {
        let transport = Arc::new(ScriptedTransport::new(|request| {
            if request.url.contains("/auth/refresh") {
                return Ok(json_response(
                    200,
                    &json!({ "access_token": "access-new", "expires_in": 3600 }),
                ));
            }
            if request.header("authorization") == Some("Bearer access-new") {
                Ok(json_response(200, &json!({ "ok": true })))
            } else {
                Ok(json_response(401, &json!({ "error": "expired" })))
            }
        }));
        let store = Arc::new(MemoryCredentialStore::with(credentials_expiring_at(10_000)));
        let client = client_over(transport.clone(), store, 0);

        let payload = client.get("/articles", None).await.unwrap();

        assert_eq!(payload, ApiPayload::Json(json!({ "ok": true })));
        assert_eq!(transport.calls_to("/articles"), 2);
        assert_eq!(transport.calls_to("/auth/refresh"), 1);
    }

    #[tokio::test]
    async fn test_401_after_retry_surfaces_authentication_error() {
        let transport = Arc::new(ScriptedTransport::new(|request| {
            if request.url.contains("/auth/refresh") {
                return Ok(json_response(
                    200,
                    &json!({ "access_token": "access-new", "expires_in": 3600 }),
                ));
            }
            Ok(json_response(401, &json!({ "error": "nope" })))
        }));
        let store = Arc::new(MemoryCredentialStore::with(credentials_expiring_at(10_000)));
        let client = client_over(transport.clone(), store, 0);

        let result = client.get("/articles", None).await;

        assert!(matches!(result, Err(ApiError::Authentication(_))));
        assert_eq!(transport.calls_to("/articles"), 2);
    }

    #[tokio::test]
    async fn test_other_http_errors_carry_status_and_body() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Ok(json_response(500, &json!({ "message": "boom" })))
        }));
        let store = Arc::new(MemoryCredentialStore::with(credentials_expiring_at(10_000)));
        let client = client_over(transport.clone(), store, 0);

        let result = client.get("/articles", None).await;

        assert_eq!(
            result,
            Err(ApiError::Http {
                status: 500,
                body: json!({ "message": "boom" }),
            })
        );
        // No refresh attempt for a non-401 failure.
        assert_eq!(transport.calls_to("/auth/refresh"), 0);
    }

    #[tokio::test]
    async fn test_204_resolves_to_empty_payload() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Ok(TransportResponse::new(204, HashMap::new(), Vec::new()))
        }));
        let store = Arc::new(MemoryCredentialStore::with(credentials_expiring_at(10_000)));
        let client = client_over(transport.clone(), store, 0);

        let payload = client.get("/articles", None).await.unwrap();
        assert_eq!(payload, ApiPayload::Empty);
    }

    #[tokio::test]
    async fn test_non_json_body_returned_as_text() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            let mut headers = HashMap::new();
            headers.insert("content-type".to_string(), "text/plain".to_string());
            Ok(TransportResponse::new(200, headers, b"pong".to_vec()))
        }));
        let store = Arc::new(MemoryCredentialStore::with(credentials_expiring_at(10_000)));
        let client = client_over(transport.clone(), store, 0);

        let payload = client.get("/ping", None).await.unwrap();
        assert_eq!(payload, ApiPayload::Text("pong".to_string()));
    }

    #[tokio::test]
    async fn test_unauthenticated_request_without_session_fails_fast() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Ok(json_response(200, &json!([])))
        }));
        let store = Arc::new(MemoryCredentialStore::empty());
        let client = client_over(transport.clone(), store, 0);

        let result = client.get("/articles", None).await;

        assert!(matches!(result, Err(ApiError::Authentication(_))));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_optional_auth_proceeds_without_token() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Ok(json_response(200, &json!([])))
        }));
        let store = Arc::new(MemoryCredentialStore::empty());
        let client = client_over(transport.clone(), store, 0);

        let payload = client
            .request(HttpMethod::Get, "/articles", None, None, false)
            .await
            .unwrap();

        assert_eq!(payload, ApiPayload::Json(json!([])));
        assert_eq!(transport.calls()[0].header("authorization"), None);
    }
}
