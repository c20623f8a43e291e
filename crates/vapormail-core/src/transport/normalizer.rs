//! Response normalization for inconsistent relay envelopes.
//!
//! Some relays hand the upstream body through unchanged; older ones wrap it in
//! a JSON envelope whose `contents` field carries the real payload serialized
//! as a string. Blocked paths frequently answer with an HTML error page
//! instead of JSON.
//!
//! Normalization is a fixed-order sequence of checks, each returning a typed
//! result, rather than exception-driven probing:
//!
//! 1. payloads under 2 bytes are malformed
//! 2. bodies starting with a markup delimiter are malformed immediately, with
//!    no further parse attempts, so the orchestrator can move to the next path
//!    without wasting time
//! 3. direct JSON parse
//! 4. if the parsed value carries the envelope marker, parse the nested string
//!
//! The result is idempotent: normalizing an already-normalized payload returns
//! it unchanged.

use crate::transport::errors::TransportError;
use serde_json::Value;

/// Anything shorter than this cannot be a JSON payload worth keeping.
const MIN_PAYLOAD_BYTES: usize = 2;

/// Envelope field used by wrapping relays to carry the payload as a string.
const ENVELOPE_FIELD: &str = "contents";

/// Extracts the logical JSON payload from a raw response body.
///
/// # Errors
///
/// Returns [`TransportError::MalformedResponse`] if the body is empty or
/// near-empty, is markup rather than JSON, or cannot be parsed as JSON either
/// directly or through the relay envelope.
pub fn normalize(raw: &str) -> Result<Value, TransportError> {
    let trimmed = raw.trim();

    if trimmed.len() < MIN_PAYLOAD_BYTES {
        return Err(TransportError::MalformedResponse(format!(
            "payload too short ({} bytes)",
            trimmed.len()
        )));
    }

    if trimmed.starts_with('<') {
        return Err(TransportError::MalformedResponse(
            "markup body where JSON was expected".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| TransportError::MalformedResponse(format!("invalid JSON: {e}")))?;

    if let Some(inner) = value.get(ENVELOPE_FIELD).and_then(Value::as_str) {
        return serde_json::from_str(inner).map_err(|e| {
            TransportError::MalformedResponse(format!("invalid JSON inside relay envelope: {e}"))
        });
    }

    Ok(value)
}
