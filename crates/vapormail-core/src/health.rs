//! Advisory connection-health tracking.
//!
//! One mutable record per process: the name of the last path that worked, a
//! 0-100 score, and the consecutive-failure streak. The orchestrator's
//! completion path is the single writer; the UI and the adaptive poller read
//! snapshots. Stale reads are acceptable, the value is informational and never
//! blocks a retrieval attempt.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Score assigned after any successful logical request.
pub const FULL_SCORE: u8 = 100;

/// Read-only snapshot of connection health.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionHealth {
    /// Name of the path that served the last success (`direct` or a relay
    /// name). `None` until the first success.
    pub last_successful_path: Option<String>,
    /// 0-100; drops by a fixed penalty per exhausted logical request, resets
    /// to 100 on any success.
    pub score: u8,
    /// Consecutive exhausted logical requests since the last success.
    pub consecutive_failures: u32,
    /// When the last success happened.
    pub last_success_at: Option<DateTime<Utc>>,
}

impl Default for ConnectionHealth {
    fn default() -> Self {
        Self {
            last_successful_path: None,
            score: FULL_SCORE,
            consecutive_failures: 0,
            last_success_at: None,
        }
    }
}

/// Process-wide health state, explicitly owned and injected (not a hidden
/// singleton) so tests can construct independent instances.
pub struct HealthTracker {
    penalty: u8,
    inner: RwLock<ConnectionHealth>,
}

impl HealthTracker {
    /// Creates a tracker applying `penalty` score points per total failure.
    #[must_use]
    pub fn new(penalty: u8) -> Self {
        Self { penalty, inner: RwLock::new(ConnectionHealth::default()) }
    }

    /// Records a terminal success served by `path_name`.
    pub fn record_success(&self, path_name: &str) {
        let mut health = self.inner.write();
        health.last_successful_path = Some(path_name.to_string());
        health.score = FULL_SCORE;
        health.consecutive_failures = 0;
        health.last_success_at = Some(Utc::now());
    }

    /// Records a terminal exhaustion of one logical request.
    pub fn record_failure(&self) {
        let mut health = self.inner.write();
        health.consecutive_failures += 1;
        health.score = health.score.saturating_sub(self.penalty);
    }

    /// Resets all counters, used when the polled subject changes.
    pub fn reset(&self) {
        *self.inner.write() = ConnectionHealth::default();
    }

    /// Returns a read-only snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ConnectionHealth {
        self.inner.read().clone()
    }
}
