//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port using the reqwest
//! library. It handles all HTTP communication for the sync core.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use reqwest::{Client, Method, Url};
use riptide_application::ports::{
    HttpTransport, TransportError, TransportRequest, TransportResponse,
};
use riptide_domain::HttpMethod;

/// HTTP transport implementation using reqwest.
///
/// Wraps a `reqwest::Client` configured with the defaults the content API
/// expects: redirects followed up to 10 hops, TLS verification on, and no
/// client-side timeout beyond the transport's own.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a new transport with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be created.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("Riptide/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self { client })
    }

    /// Creates a transport over a custom reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Converts the domain `HttpMethod` to a reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Maps reqwest errors to the transport error taxonomy.
    fn map_error(error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout;
        }
        if error.is_connect() {
            return TransportError::Connect(error.to_string());
        }
        TransportError::Other(error.to_string())
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + '_>> {
        Box::pin(async move {
            let url = Url::parse(&request.url)
                .map_err(|e| TransportError::InvalidUrl(format!("{e}: {}", request.url)))?;

            let mut builder = self
                .client
                .request(Self::to_reqwest_method(request.method), url);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|e| Self::map_error(&e))?;

            let status = response.status().as_u16();
            let headers: HashMap<String, String> = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_ascii_lowercase(),
                        value.to_str().unwrap_or("<binary>").to_string(),
                    )
                })
                .collect();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::Other(format!("failed to read body: {e}")))?
                .to_vec();

            Ok(TransportResponse::new(status, headers, body))
        })
    }
}
