//! Static registry of upstream mirrors and public relays.
//!
//! The service publishes several functionally identical mirrors; any of them
//! may be blocked independently. When direct access fails, requests are routed
//! through public relays that forward the target URL on the caller's behalf.
//! Relays are grouped into priority tiers: a tier's relays are raced together,
//! and the next tier is only consulted when the whole tier fails.
//!
//! Both the endpoint order and the within-tier relay order are re-shuffled on
//! every top-level call so a persistently blocked path is not hammered first
//! on every request and load spreads across the public relays.

use rand::seq::SliceRandom;
use std::sync::Arc;

/// Base address of one upstream mirror.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: Arc<str>,
}

impl Endpoint {
    #[must_use]
    pub fn new(base: impl Into<Arc<str>>) -> Self {
        Self { base: base.into() }
    }

    /// The mirror's base address, ending where the query string begins.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }
}

/// One public relay: a name for health reporting plus the URL transform that
/// wraps a target URL into a relay request.
///
/// Every known relay follows the same shape, a fixed prefix followed by the
/// form-encoded target URL, so the transform is stored as that prefix.
#[derive(Debug, Clone)]
pub struct RelayDescriptor {
    name: Arc<str>,
    prefix: Arc<str>,
}

impl RelayDescriptor {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, prefix: impl Into<Arc<str>>) -> Self {
        Self { name: name.into(), prefix: prefix.into() }
    }

    /// Identifying name, recorded as the health tracker's last successful
    /// path when this relay wins a race.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wraps a target URL into the URL to actually request from the relay.
    #[must_use]
    pub fn relay_url(&self, target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("{}{}", self.prefix, encoded)
    }
}

/// An ordered group of relays sharing a priority level.
#[derive(Debug, Clone)]
pub struct RelayTier {
    name: Arc<str>,
    relays: Vec<RelayDescriptor>,
}

impl RelayTier {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, relays: Vec<RelayDescriptor>) -> Self {
        Self { name: name.into(), relays }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn relays(&self) -> &[RelayDescriptor] {
        &self.relays
    }
}

/// Immutable registry of mirrors and relay tiers, loaded once at startup.
///
/// Pure data: no error conditions. Injectable so tests can point the
/// orchestrator at mock servers.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
    tiers: Vec<RelayTier>,
}

impl EndpointRegistry {
    /// Builds a registry from explicit mirrors and tiers.
    #[must_use]
    pub fn new(endpoints: Vec<Endpoint>, tiers: Vec<RelayTier>) -> Self {
        Self { endpoints, tiers }
    }

    /// Builds a registry with the given mirror addresses and the built-in
    /// relay tiers.
    #[must_use]
    pub fn with_endpoints(bases: &[String]) -> Self {
        let endpoints = bases.iter().map(|base| Endpoint::new(base.as_str())).collect();
        Self::new(endpoints, Self::builtin_tiers())
    }

    /// The service's three public mirrors plus the built-in relay tiers.
    #[must_use]
    pub fn builtin() -> Self {
        let endpoints = vec![
            Endpoint::new("https://www.1secmail.com/api/v1/"),
            Endpoint::new("https://www.1secmail.org/api/v1/"),
            Endpoint::new("https://www.1secmail.net/api/v1/"),
        ];
        Self::new(endpoints, Self::builtin_tiers())
    }

    /// The known public relays, grouped by observed responsiveness.
    #[must_use]
    pub fn builtin_tiers() -> Vec<RelayTier> {
        vec![
            RelayTier::new(
                "fast",
                vec![
                    RelayDescriptor::new("allorigins-raw", "https://api.allorigins.win/raw?url="),
                    RelayDescriptor::new("corsproxy-io", "https://corsproxy.io/?"),
                ],
            ),
            RelayTier::new(
                "standard",
                vec![
                    RelayDescriptor::new("cors-lol", "https://api.cors.lol/?url="),
                    RelayDescriptor::new("codetabs", "https://api.codetabs.com/v1/proxy?quest="),
                ],
            ),
        ]
    }

    /// Returns the mirrors in a fresh shuffled order.
    #[must_use]
    pub fn shuffled_endpoints(&self) -> Vec<Endpoint> {
        let mut endpoints = self.endpoints.clone();
        endpoints.shuffle(&mut rand::rng());
        endpoints
    }

    /// Returns the tiers in priority order, each with its relays freshly
    /// shuffled. Tier order itself is never shuffled; it bounds worst-case
    /// latency.
    #[must_use]
    pub fn tiers(&self) -> Vec<RelayTier> {
        self.tiers
            .iter()
            .map(|tier| {
                let mut relays = tier.relays.clone();
                relays.shuffle(&mut rand::rng());
                RelayTier { name: Arc::clone(&tier.name), relays }
            })
            .collect()
    }
}
