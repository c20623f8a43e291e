use thiserror::Error;

/// Errors that can occur while retrieving data from the mail service.
///
/// Everything except [`TransportError::AllPathsExhausted`] is path-local: it
/// describes one failed attempt against one mirror or relay and is absorbed
/// by the orchestrator, which simply moves on to the next path. Only total
/// exhaustion of every mirror x tier combination propagates to callers.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// A single call (direct or relayed) exceeded its timeout.
    #[error("request timeout")]
    Timeout,

    /// Failed to establish a connection to a mirror or relay.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-success HTTP status. First field is the status code, second a
    /// truncated body for diagnostics.
    #[error("HTTP error {0}: {1}")]
    Http(u16, String),

    /// Network-level error from the underlying HTTP client.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The body could not be normalized into a JSON payload. Treated exactly
    /// like a transport failure for path-selection purposes.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Every mirror and every relay tier failed for one logical request.
    /// Carries the most recent underlying error message for diagnostics.
    #[error("all connection paths exhausted; last error: {last_error}")]
    AllPathsExhausted { last_error: String },
}

impl TransportError {
    /// Returns `true` if this is the terminal exhaustion error, the only
    /// failure that may reach a caller of the retrieval layer.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::AllPathsExhausted { .. })
    }

    /// Returns `true` if this error is local to one path attempt and the
    /// orchestrator should simply try the next path.
    #[must_use]
    pub fn is_path_local(&self) -> bool {
        !self.is_exhausted()
    }
}
