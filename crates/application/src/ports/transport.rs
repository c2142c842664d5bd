//! HTTP transport port.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use thiserror::Error;

use riptide_domain::HttpMethod;

/// A fully assembled outbound request: absolute URL, headers and body
/// already in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Absolute request URL including any query string.
    pub url: String,
    /// Header name/value pairs, applied in order.
    pub headers: Vec<(String, String)>,
    /// JSON body, when the verb carries one.
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Creates a body-less request.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Looks up a header value, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The raw result of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, lowercased names.
    pub headers: HashMap<String, String>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Creates a response.
    #[must_use]
    pub const fn new(status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// True for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The `Content-Type` header, if present.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    /// True when the response declares a JSON content type.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    /// The body decoded as UTF-8, lossily.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Errors raised by the transport itself; anything the server answered,
/// whatever the status, is a response rather than an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(String),
}

/// Port for performing HTTP exchanges.
///
/// This trait abstracts the HTTP library, keeping the application layer
/// independent of it and letting tests script responses.
pub trait HttpTransport: Send + Sync {
    /// Executes an HTTP exchange and returns the raw response.
    fn send(
        &self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = TransportRequest::new(HttpMethod::Get, "https://api.example.com")
            .with_header("Authorization", "Bearer t");
        assert_eq!(request.header("authorization"), Some("Bearer t"));
        assert_eq!(request.header("x-missing"), None);
    }

    #[test]
    fn test_is_success_bounds() {
        let response = TransportResponse::new(204, HashMap::new(), Vec::new());
        assert!(response.is_success());
        let response = TransportResponse::new(301, HashMap::new(), Vec::new());
        assert!(!response.is_success());
    }

    #[test]
    fn test_json_content_type_detection() {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/json; charset=utf-8".to_string(),
        );
        let response = TransportResponse::new(200, headers, b"{}".to_vec());
        assert!(response.is_json());
    }
}
