//! Thin facade over the transport orchestrator.
//!
//! Collaborators (UI, CLI) call three logical operations: list available
//! domains, list messages for an address, fetch one message body. Domain
//! listing never fails, it degrades to a fixed fallback list so mailbox
//! creation is never blocked by a bad connection.

use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::{
    config::RetrievalConfig,
    health::{ConnectionHealth, HealthTracker},
    transport::{EndpointRegistry, HttpClient, Orchestrator, TransportError},
    types::{LogicalRequest, MessageDetail, MessageSummary},
};

/// Domains offered when the live domain list is unreachable.
pub const FALLBACK_DOMAINS: [&str; 8] = [
    "1secmail.com",
    "1secmail.org",
    "1secmail.net",
    "wwjmp.com",
    "esiix.com",
    "xagora.com",
    "uorak.com",
    "vjuum.com",
];

const LOGIN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const LOGIN_LEN: usize = 10;

/// Client for the disposable-mailbox service.
pub struct MailClient {
    orchestrator: Orchestrator,
    health: Arc<HealthTracker>,
}

impl MailClient {
    /// Builds a client from configuration: HTTP client, endpoint registry
    /// (configured mirrors + built-in relay tiers), and a fresh health
    /// tracker.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &RetrievalConfig) -> Result<Self, TransportError> {
        let http = Arc::new(HttpClient::with_concurrency_limit(config.concurrent_limit)?);
        let registry = Arc::new(EndpointRegistry::with_endpoints(&config.endpoints));
        let health = Arc::new(HealthTracker::new(config.failure_penalty));
        Ok(Self::with_parts(http, registry, health, config))
    }

    /// Builds a client from explicit parts, used by tests to inject mock
    /// registries and shared trackers.
    #[must_use]
    pub fn with_parts(
        http: Arc<HttpClient>,
        registry: Arc<EndpointRegistry>,
        health: Arc<HealthTracker>,
        config: &RetrievalConfig,
    ) -> Self {
        let orchestrator = Orchestrator::new(http, registry, Arc::clone(&health), config);
        Self { orchestrator, health }
    }

    /// Lists the domains currently usable for new mailboxes.
    ///
    /// Never fails: on exhaustion of every path, or a success payload that is
    /// not an array, the fixed fallback list is returned instead. Domain
    /// listing must never block mailbox creation.
    pub async fn list_domains(&self) -> Vec<String> {
        match self.orchestrator.fetch_logical(&LogicalRequest::domain_list()).await {
            Ok(Value::Array(entries)) => {
                let domains: Vec<String> = entries
                    .into_iter()
                    .filter_map(|entry| entry.as_str().map(str::to_string))
                    .collect();
                if domains.is_empty() {
                    fallback_domains()
                } else {
                    domains
                }
            }
            Ok(_) => {
                warn!("domain list payload was not an array, using fallback list");
                fallback_domains()
            }
            Err(e) => {
                warn!(error = %e, "domain list unreachable, using fallback list");
                fallback_domains()
            }
        }
    }

    /// Lists the inbox for one address.
    ///
    /// A success payload that is not an array is treated as an empty inbox,
    /// which is how the service answers for addresses with no mail yet.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::AllPathsExhausted`] when no path could serve
    /// the request, or [`TransportError::MalformedResponse`] if the array
    /// entries do not match the expected shape.
    pub async fn list_messages(
        &self,
        login: &str,
        domain: &str,
    ) -> Result<Vec<MessageSummary>, TransportError> {
        let payload =
            self.orchestrator.fetch_logical(&LogicalRequest::messages(login, domain)).await?;

        match payload {
            Value::Array(_) => serde_json::from_value(payload).map_err(|e| {
                TransportError::MalformedResponse(format!("unexpected inbox entry shape: {e}"))
            }),
            _ => Ok(Vec::new()),
        }
    }

    /// Fetches one full message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::AllPathsExhausted`] when no path could serve
    /// the request, or [`TransportError::MalformedResponse`] if the payload
    /// does not match the expected shape.
    pub async fn get_message(
        &self,
        login: &str,
        domain: &str,
        id: u64,
    ) -> Result<MessageDetail, TransportError> {
        let payload = self
            .orchestrator
            .fetch_logical(&LogicalRequest::read_message(login, domain, id))
            .await?;

        serde_json::from_value(payload).map_err(|e| {
            TransportError::MalformedResponse(format!("unexpected message shape: {e}"))
        })
    }

    /// Generates a random login part for a new mailbox address.
    #[must_use]
    pub fn random_login() -> String {
        let mut rng = rand::rng();
        (0..LOGIN_LEN)
            .map(|_| LOGIN_ALPHABET[rng.random_range(0..LOGIN_ALPHABET.len())] as char)
            .collect()
    }

    /// Manual recovery heuristic: clears health counters and forces a fresh
    /// domain-list fetch, returning the (possibly fallback) list.
    pub async fn recover(&self) -> Vec<String> {
        self.health.reset();
        self.list_domains().await
    }

    /// Read-only health snapshot for status display.
    #[must_use]
    pub fn current_health(&self) -> ConnectionHealth {
        self.health.snapshot()
    }

    /// Shared health tracker handle, for injecting into the poller.
    #[must_use]
    pub fn health(&self) -> Arc<HealthTracker> {
        Arc::clone(&self.health)
    }
}

fn fallback_domains() -> Vec<String> {
    FALLBACK_DOMAINS.iter().map(|d| (*d).to_string()).collect()
}
