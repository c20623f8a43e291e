//! Transport attempt orchestration.
//!
//! Resolves one logical request through the attempt ladder: for each mirror
//! (shuffled), a short direct call first, then each relay tier in priority
//! order with every relay in the tier raced concurrently. The first call that
//! returns HTTP OK with a normalizable, non-empty body wins; its tier siblings
//! are abandoned. Total failure of every mirror and tier is the only error
//! that escapes, as [`TransportError::AllPathsExhausted`].
//!
//! Every terminal success or terminal exhaustion updates the injected
//! [`HealthTracker`].

use futures_util::future::select_all;
use serde_json::Value;
use std::{pin::Pin, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    config::RetrievalConfig,
    health::HealthTracker,
    transport::{
        errors::TransportError,
        http_client::HttpClient,
        normalizer::normalize,
        registry::{EndpointRegistry, RelayTier},
    },
    types::LogicalRequest,
};

/// Path name recorded on the health tracker for non-relayed successes.
pub const DIRECT_PATH: &str = "direct";

type RelayOutcome = (String, Result<Value, TransportError>);
type RelayFuture = Pin<Box<dyn std::future::Future<Output = RelayOutcome> + Send>>;

/// Resolves logical requests through mirrors and relay tiers.
pub struct Orchestrator {
    http: Arc<HttpClient>,
    registry: Arc<EndpointRegistry>,
    health: Arc<HealthTracker>,
    direct_timeout: Duration,
    relay_timeout: Duration,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        http: Arc<HttpClient>,
        registry: Arc<EndpointRegistry>,
        health: Arc<HealthTracker>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            http,
            registry,
            health,
            direct_timeout: config.direct_timeout(),
            relay_timeout: config.relay_timeout(),
        }
    }

    /// Resolves one logical request to its JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::AllPathsExhausted`] once every mirror and
    /// every relay tier has failed, carrying the most recent underlying error
    /// message. No other error variant escapes this method.
    pub async fn fetch_logical(&self, request: &LogicalRequest) -> Result<Value, TransportError> {
        let query = request.to_query();
        let mut last_error = String::from("no paths attempted");

        for endpoint in self.registry.shuffled_endpoints() {
            let target = format!("{}{}", endpoint.base(), query);

            match self.attempt_direct(&target).await {
                Ok(value) => {
                    info!(action = request.action(), endpoint = endpoint.base(), "direct call succeeded");
                    self.health.record_success(DIRECT_PATH);
                    return Ok(value);
                }
                Err(e) => {
                    debug!(
                        action = request.action(),
                        endpoint = endpoint.base(),
                        error = %e,
                        "direct call failed, falling back to relays"
                    );
                    last_error = e.to_string();
                }
            }

            for tier in self.registry.tiers() {
                match self.race_tier(&tier, &target).await {
                    Ok((relay_name, value)) => {
                        info!(
                            action = request.action(),
                            endpoint = endpoint.base(),
                            tier = tier.name(),
                            relay = %relay_name,
                            "relay call succeeded"
                        );
                        self.health.record_success(&relay_name);
                        return Ok(value);
                    }
                    Err(e) => {
                        debug!(
                            action = request.action(),
                            endpoint = endpoint.base(),
                            tier = tier.name(),
                            error = %e,
                            "relay tier exhausted"
                        );
                        last_error = e.to_string();
                    }
                }
            }
        }

        warn!(action = request.action(), last_error = %last_error, "all connection paths exhausted");
        self.health.record_failure();
        Err(TransportError::AllPathsExhausted { last_error })
    }

    /// One direct call to a mirror, with the short timeout.
    async fn attempt_direct(&self, target: &str) -> Result<Value, TransportError> {
        let url = cache_busted(target);
        let body = self.http.get(&url, self.direct_timeout).await?;
        normalize(&body)
    }

    /// Races every relay in one tier against the same target URL, returning
    /// the first acceptable payload together with the winning relay's name.
    ///
    /// Losing siblings are dropped once a winner is accepted; their eventual
    /// responses are ignored.
    async fn race_tier(
        &self,
        tier: &RelayTier,
        target: &str,
    ) -> Result<(String, Value), TransportError> {
        let mut in_flight: Vec<RelayFuture> = Vec::with_capacity(tier.relays().len());

        for relay in tier.relays() {
            // Call-unique token per outbound URL so intermediary relays
            // cannot serve a stale cached error body.
            let url = relay.relay_url(&cache_busted(target));
            let name = relay.name().to_string();
            let http = Arc::clone(&self.http);
            let timeout = self.relay_timeout;

            in_flight.push(Box::pin(async move {
                let outcome = match http.get(&url, timeout).await {
                    Ok(body) => normalize(&body),
                    Err(e) => Err(e),
                };
                (name, outcome)
            }));
        }

        let mut tier_error =
            TransportError::ConnectionFailed(format!("relay tier {} is empty", tier.name()));

        while !in_flight.is_empty() {
            let ((name, outcome), _index, remaining) = select_all(in_flight).await;
            in_flight = remaining;

            match outcome {
                Ok(value) => return Ok((name, value)),
                Err(e) => {
                    debug!(relay = %name, error = %e, "relay attempt failed");
                    tier_error = e;
                }
            }
        }

        Err(tier_error)
    }
}

/// Appends a call-unique query token to defeat caching by intermediaries.
fn cache_busted(target: &str) -> String {
    format!("{}&_cb={}", target, uuid::Uuid::new_v4().simple())
}
