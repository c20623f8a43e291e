//! Resilient transport to the upstream mail service.
//!
//! This module composes several unreliable paths into one dependable logical
//! call:
//!
//! - Endpoint registry with mirror rotation and tiered public relays
//! - HTTP client with per-call timeouts and bounded concurrency
//! - Response normalization for inconsistent relay envelopes
//! - Attempt orchestration: direct access first, then relay tiers raced in
//!   priority order, across every mirror
//!
//! # Path Ordering
//!
//! Attempts are strictly ordered Endpoint-major / Tier-minor; races exist only
//! inside a tier, never across tiers or endpoints:
//!
//! ```text
//! mirror A ── direct ── tier "fast" (raced) ── tier "standard" (raced)
//! mirror B ── direct ── tier "fast" (raced) ── tier "standard" (raced)
//! mirror C ── ...
//! ```
//!
//! Direct access is always tried before any relay because it is cheapest and
//! fastest when unblocked. Per-path failures are absorbed here; only total
//! exhaustion ([`TransportError::AllPathsExhausted`]) reaches callers.

pub mod errors;
pub mod http_client;
pub mod normalizer;
pub mod orchestrator;
pub mod registry;

pub use errors::TransportError;
pub use http_client::HttpClient;
pub use normalizer::normalize;
pub use orchestrator::Orchestrator;
pub use registry::{Endpoint, EndpointRegistry, RelayDescriptor, RelayTier};
