//! # Vapormail Core
//!
//! Core library for the Vapormail disposable-mailbox client.
//!
//! The upstream mail service is unreliable and intermittently blocked, so the
//! interesting part of this crate is a resilient retrieval layer that composes
//! several unreliable transports into one dependable logical call:
//!
//! - **[`transport`]**: endpoint registry (mirrors + tiered public relays),
//!   response normalization for inconsistent relay envelopes, and the attempt
//!   orchestrator that races relays within a tier and falls back across tiers
//!   and mirrors.
//!
//! - **[`health`]**: advisory connection-health tracking (last successful
//!   path, 0-100 score, consecutive-failure streak) consumed by UIs and by the
//!   poller's backoff.
//!
//! - **[`poller`]**: adaptive inbox polling with failure-streak backoff and
//!   clean cancellation when the watched mailbox changes.
//!
//! - **[`client`]**: the thin facade collaborators call: list domains, list
//!   messages, fetch one message.
//!
//! - **[`config`]**: layered configuration (defaults, TOML file, environment).
//!
//! ## Request Flow
//!
//! ```text
//! AdaptivePoller ──► MailClient ──► Orchestrator
//!                                       │
//!                          for each mirror (shuffled):
//!                              direct GET (3s)
//!                              tier "fast"     ── race relays, first valid wins
//!                              tier "standard" ── race relays, first valid wins
//!                                       │
//!                                  Normalizer ──► HealthTracker update
//! ```
//!
//! Per-path failures never escape the orchestrator; callers only ever see
//! [`transport::TransportError::AllPathsExhausted`].

pub mod client;
pub mod config;
pub mod health;
pub mod poller;
pub mod transport;
pub mod types;

pub use client::{MailClient, FALLBACK_DOMAINS};
pub use config::{ConfigError, PollConfig, RetrievalConfig};
pub use health::{ConnectionHealth, HealthTracker};
pub use poller::{AdaptivePoller, PollEvent, PollSubject};
pub use transport::{
    normalize, Endpoint, EndpointRegistry, HttpClient, Orchestrator, RelayDescriptor, RelayTier,
    TransportError,
};
pub use types::{LogicalRequest, MessageDetail, MessageSummary};
