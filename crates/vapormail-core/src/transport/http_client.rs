use reqwest::{Client, ClientBuilder};
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;

use crate::transport::errors::TransportError;

/// Default cap on concurrent outbound calls. Relay races issue a handful of
/// calls at once; this bounds the worst case across overlapping logical
/// requests.
const DEFAULT_CONCURRENT_LIMIT: usize = 16;

/// Longest error-body prefix kept for diagnostics.
const ERROR_BODY_LIMIT: usize = 256;

/// HTTP client shared by all transport paths.
///
/// Wraps a pooled reqwest client with semaphore-based concurrency control and
/// a per-call timeout. Redirects are followed (bounded) because public relays
/// routinely answer with one.
pub struct HttpClient {
    client: Client,
    concurrent_limit: Arc<Semaphore>,
}

impl HttpClient {
    /// Creates a client with the default concurrency limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_concurrency_limit(DEFAULT_CONCURRENT_LIMIT)
    }

    /// Creates a client capped at `concurrent_limit` in-flight calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_concurrency_limit(concurrent_limit: usize) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(8)
            .connect_timeout(Duration::from_secs(3))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("vapormail/", env!("CARGO_PKG_VERSION")))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                TransportError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self { client, concurrent_limit: Arc::new(Semaphore::new(concurrent_limit)) })
    }

    /// Issues a GET with the given per-call timeout and returns the body text
    /// of a 2xx response.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Timeout`] if the call exceeds `timeout`
    /// - [`TransportError::Http`] for non-success status codes, carrying a
    ///   truncated body
    /// - [`TransportError::ConnectionFailed`] for connect-level failures,
    ///   sanitized to avoid leaking addresses into logs
    /// - [`TransportError::Network`] for body-read failures
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<String, TransportError> {
        let _permit = Arc::clone(&self.concurrent_limit)
            .acquire_owned()
            .await
            .map_err(|_| TransportError::ConnectionFailed("http client shut down".to_string()))?;

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::ConnectionFailed(Self::sanitize_network_error(&e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let truncated = if raw.len() > ERROR_BODY_LIMIT {
                let mut end = ERROR_BODY_LIMIT;
                while !raw.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}... (truncated)", &raw[..end])
            } else {
                raw
            };
            return Err(TransportError::Http(status.as_u16(), truncated));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network(e)
            }
        })
    }

    /// Sanitizes network errors to a coarse category before they reach logs.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_timeout() {
            "connection timed out".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_decode() {
            "response decode error".to_string()
        } else if error.is_redirect() {
            "too many redirects".to_string()
        } else {
            "network error".to_string()
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.concurrent_limit.available_permits()
    }
}
