//! Integration tests for the adaptive poller.
//!
//! These tests verify the poller's lifecycle against mock mirrors:
//! - Entering a subject fetches immediately, without waiting an interval
//! - Switching subjects cancels the previous loop before arming the new one
//! - A forced first fetch surfaces its failure immediately
//! - Manual refresh supersedes the scheduled timer

use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use vapormail_core::{
    AdaptivePoller, Endpoint, EndpointRegistry, HealthTracker, HttpClient, MailClient,
    PollConfig, PollEvent, PollSubject, RelayDescriptor, RelayTier, RetrievalConfig,
};

use crate::mock_infrastructure::MailMockBuilder;

const UNREACHABLE_MIRROR: &str = "http://127.0.0.1:9/api/v1/";
const UNREACHABLE_RELAY: &str = "http://127.0.0.1:9/relay?url=";

/// Poll cadence with delays far beyond the test timeout, so every observed
/// fetch is either the forced first one or a manual refresh.
fn slow_poll_config() -> PollConfig {
    PollConfig { short_delay_ms: 60_000, long_delay_ms: 120_000, ..PollConfig::default() }
}

fn test_config() -> RetrievalConfig {
    RetrievalConfig {
        direct_timeout_ms: 2_000,
        relay_timeout_ms: 2_000,
        poll: slow_poll_config(),
        ..RetrievalConfig::default()
    }
}

fn mirror_client(mock: &MailMockBuilder, config: &RetrievalConfig) -> Arc<MailClient> {
    let registry =
        EndpointRegistry::new(vec![Endpoint::new(mock.endpoint_base())], vec![]);
    let http = Arc::new(HttpClient::with_concurrency_limit(8).expect("http client"));
    let health = Arc::new(HealthTracker::new(config.failure_penalty));
    Arc::new(MailClient::with_parts(http, Arc::new(registry), health, config))
}

fn unreachable_client(config: &RetrievalConfig) -> Arc<MailClient> {
    let registry = EndpointRegistry::new(
        vec![Endpoint::new(UNREACHABLE_MIRROR)],
        vec![RelayTier::new(
            "fast",
            vec![RelayDescriptor::new("dead-relay", UNREACHABLE_RELAY)],
        )],
    );
    let http = Arc::new(HttpClient::with_concurrency_limit(8).expect("http client"));
    let health = Arc::new(HealthTracker::new(config.failure_penalty));
    Arc::new(MailClient::with_parts(http, Arc::new(registry), health, config))
}

async fn next_event(events: &mut tokio::sync::mpsc::UnboundedReceiver<PollEvent>) -> PollEvent {
    timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("poller should emit an event before the timeout")
        .expect("event channel should stay open while the poller lives")
}

#[tokio::test]
async fn test_entering_a_subject_fetches_immediately() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_inbox("alice", &json!([{"id": 1, "from": "a@b.c", "subject": "s", "date": "d"}]))
        .await;

    let config = test_config();
    let client = mirror_client(&mock, &config);
    let (poller, mut events) = AdaptivePoller::new(client, config.poll.clone());

    poller.set_subject(Some(PollSubject::new("alice", "example.com")));
    assert!(poller.is_active());

    match next_event(&mut events).await {
        PollEvent::Messages { subject, messages } => {
            assert_eq!(subject.address(), "alice@example.com");
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].id, 1);
        }
        other => panic!("expected an immediate inbox listing, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_switching_subjects_cancels_the_previous_loop() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_inbox_once("alice", &json!([])).await;
    mock.mock_inbox("bob", &json!([{"id": 2, "from": "x@y.z", "subject": "t", "date": "d"}]))
        .await;

    let config = test_config();
    let client = mirror_client(&mock, &config);
    let (poller, mut events) = AdaptivePoller::new(client, config.poll.clone());

    poller.set_subject(Some(PollSubject::new("alice", "example.com")));
    match next_event(&mut events).await {
        PollEvent::Messages { subject, .. } => assert_eq!(subject.login, "alice"),
        other => panic!("expected alice's listing, got: {other:?}"),
    }

    poller.set_subject(Some(PollSubject::new("bob", "example.com")));
    match next_event(&mut events).await {
        PollEvent::Messages { subject, messages } => {
            assert_eq!(subject.login, "bob");
            assert_eq!(messages.len(), 1);
        }
        other => panic!("expected bob's listing, got: {other:?}"),
    }

    // No further events: bob's loop sleeps for a minute, and alice's loop is
    // gone. The expect(1) on alice's mock enforces that her inbox was fetched
    // exactly once.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(events.try_recv().is_err(), "no event should arrive after the switch settles");
    mock.verify_all().await;
}

#[tokio::test]
async fn test_clearing_the_subject_stops_polling() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_inbox("alice", &json!([])).await;

    let config = test_config();
    let client = mirror_client(&mock, &config);
    let (poller, mut events) = AdaptivePoller::new(client, config.poll.clone());

    poller.set_subject(Some(PollSubject::new("alice", "example.com")));
    let _ = next_event(&mut events).await;

    poller.set_subject(None);
    assert!(!poller.is_active());
}

#[tokio::test]
async fn test_forced_first_fetch_surfaces_failure_immediately() {
    let config = test_config();
    let client = unreachable_client(&config);
    let (poller, mut events) = AdaptivePoller::new(client, config.poll.clone());

    poller.set_subject(Some(PollSubject::new("alice", "example.com")));

    match next_event(&mut events).await {
        PollEvent::Failure { subject, consecutive_failures, message } => {
            assert_eq!(subject.address(), "alice@example.com");
            assert_eq!(consecutive_failures, 1, "the forced fetch is the first failure");
            assert!(!message.is_empty());
        }
        other => panic!("a forced fetch failure must surface, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_supersedes_the_poll_timer() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_inbox("alice", &json!([])).await;

    let config = test_config();
    let client = mirror_client(&mock, &config);
    let (poller, mut events) = AdaptivePoller::new(client, config.poll.clone());

    poller.set_subject(Some(PollSubject::new("alice", "example.com")));
    let _ = next_event(&mut events).await;

    // The short delay is a minute; only the refresh can explain a second
    // event arriving within the test timeout.
    poller.refresh();
    match next_event(&mut events).await {
        PollEvent::Messages { subject, .. } => assert_eq!(subject.login, "alice"),
        other => panic!("expected the refreshed listing, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_subject_switch_resets_health() {
    let config = test_config();
    let client = unreachable_client(&config);
    let health = client.health();
    let (poller, mut events) = AdaptivePoller::new(Arc::clone(&client), config.poll.clone());

    poller.set_subject(Some(PollSubject::new("alice", "example.com")));
    let _ = next_event(&mut events).await;
    assert!(health.snapshot().consecutive_failures >= 1);

    poller.set_subject(Some(PollSubject::new("bob", "example.com")));

    // The reset happens before the new loop is armed; by the time bob's
    // first failure lands the streak restarts from one, never carrying
    // alice's streak over.
    let event = next_event(&mut events).await;
    match event {
        PollEvent::Failure { subject, consecutive_failures, .. } => {
            assert_eq!(subject.login, "bob");
            assert_eq!(consecutive_failures, 1);
        }
        other => panic!("expected bob's first failure, got: {other:?}"),
    }
}
