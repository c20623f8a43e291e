//! Adaptive inbox polling.
//!
//! One scheduler loop per polled mailbox, driven by an explicit state machine
//! (Idle -> Scheduled -> InFlight -> Scheduled -> ... -> Cancelled) rather
//! than recursive timer closures. Entering a subject triggers one forced
//! fetch immediately so the UI has data without waiting a full interval;
//! afterwards the delay is chosen from the *post-fetch* failure streak, so
//! backoff reacts to the call that just completed.
//!
//! Cancellation: switching or clearing the subject signals the loop's
//! shutdown channel before any new loop is armed, so at most one timer is
//! ever active per subject. An in-flight fetch raced against shutdown is
//! dropped; its result never reaches a subject that is no longer current.
//!
//! Error surfacing: an isolated background failure is swallowed to avoid
//! flicker; only a failure streak at or above the configured threshold, or a
//! forced (user-initiated) fetch failure, is emitted as an event.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Notify};
use tracing::{debug, info};

use crate::{
    client::MailClient,
    config::PollConfig,
    health::HealthTracker,
    types::MessageSummary,
};

/// The mailbox address currently being polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSubject {
    pub login: String,
    pub domain: String,
}

impl PollSubject {
    #[must_use]
    pub fn new(login: impl Into<String>, domain: impl Into<String>) -> Self {
        Self { login: login.into(), domain: domain.into() }
    }

    /// The full address, for display and logging.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}@{}", self.login, self.domain)
    }
}

/// Events emitted by the poller to its collaborator.
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A fetch completed with an inbox listing.
    Messages { subject: PollSubject, messages: Vec<MessageSummary> },
    /// A surfaced failure (forced fetch, or a background streak at the
    /// threshold).
    Failure { subject: PollSubject, message: String, consecutive_failures: u32 },
}

struct ActivePoll {
    shutdown: broadcast::Sender<()>,
    refresh: Arc<Notify>,
    handle: tokio::task::JoinHandle<()>,
}

/// Drives repeated inbox fetches for the current subject.
pub struct AdaptivePoller {
    client: Arc<MailClient>,
    health: Arc<HealthTracker>,
    config: PollConfig,
    events: mpsc::UnboundedSender<PollEvent>,
    active: parking_lot::Mutex<Option<ActivePoll>>,
}

impl AdaptivePoller {
    /// Creates a poller and the event stream its collaborator consumes.
    #[must_use]
    pub fn new(
        client: Arc<MailClient>,
        config: PollConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PollEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let health = client.health();
        let poller =
            Self { client, health, config, events, active: parking_lot::Mutex::new(None) };
        (poller, receiver)
    }

    /// Switches the polled subject.
    ///
    /// Always cancels the previous subject's timer (and discards any
    /// in-flight result) before arming a new one; health counters are reset
    /// for the new subject. Passing `None` stops polling entirely.
    pub fn set_subject(&self, subject: Option<PollSubject>) {
        let mut active = self.active.lock();

        if let Some(previous) = active.take() {
            // Signal first; the loop exits at its next suspension point and
            // any in-flight fetch is dropped.
            let _ = previous.shutdown.send(());
            previous.handle.abort();
        }

        let Some(subject) = subject else {
            debug!("polling cleared");
            return;
        };

        info!(subject = %subject.address(), "polling subject changed");
        self.health.reset();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let refresh = Arc::new(Notify::new());
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.client),
            Arc::clone(&self.health),
            self.config.clone(),
            subject,
            self.events.clone(),
            shutdown_rx,
            Arc::clone(&refresh),
        ));

        *active = Some(ActivePoll { shutdown: shutdown_tx, refresh, handle });
    }

    /// Forces an immediate fetch for the current subject, superseding the
    /// scheduled timer tick. No-op when idle.
    pub fn refresh(&self) {
        if let Some(active) = self.active.lock().as_ref() {
            active.refresh.notify_one();
        }
    }

    /// Returns `true` while a subject is being polled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl Drop for AdaptivePoller {
    fn drop(&mut self) {
        if let Some(active) = self.active.lock().take() {
            let _ = active.shutdown.send(());
            active.handle.abort();
        }
    }
}

/// Decides whether a fetch failure is shown to the user.
///
/// Forced (user-initiated) failures always surface; background failures only
/// once the streak reaches the threshold.
fn should_surface(forced: bool, consecutive_failures: u32, threshold: u32) -> bool {
    forced || consecutive_failures >= threshold
}

#[allow(clippy::too_many_arguments)]
async fn poll_loop(
    client: Arc<MailClient>,
    health: Arc<HealthTracker>,
    config: PollConfig,
    subject: PollSubject,
    events: mpsc::UnboundedSender<PollEvent>,
    mut shutdown: broadcast::Receiver<()>,
    refresh: Arc<Notify>,
) {
    // The first fetch is forced: it bypasses backoff so the collaborator has
    // data immediately after a subject change.
    let mut forced = true;

    loop {
        // InFlight
        tokio::select! {
            result = client.list_messages(&subject.login, &subject.domain) => {
                match result {
                    Ok(messages) => {
                        debug!(
                            subject = %subject.address(),
                            count = messages.len(),
                            "poll fetch succeeded"
                        );
                        let _ = events.send(PollEvent::Messages {
                            subject: subject.clone(),
                            messages,
                        });
                    }
                    Err(e) => {
                        let consecutive_failures = health.snapshot().consecutive_failures;
                        if should_surface(forced, consecutive_failures, config.surface_failure_threshold) {
                            let _ = events.send(PollEvent::Failure {
                                subject: subject.clone(),
                                message: e.to_string(),
                                consecutive_failures,
                            });
                        } else {
                            debug!(
                                subject = %subject.address(),
                                error = %e,
                                "swallowing isolated background poll failure"
                            );
                        }
                    }
                }
            }
            _ = shutdown.recv() => break,
        }

        forced = false;

        // Scheduled: the post-fetch streak picks the next delay.
        let delay = config.delay_for_streak(health.snapshot().consecutive_failures);
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = refresh.notified() => {
                debug!(subject = %subject.address(), "manual refresh supersedes poll timer");
                forced = true;
            }
            _ = shutdown.recv() => break,
        }
    }

    debug!(subject = %subject.address(), "poll loop cancelled");
}
