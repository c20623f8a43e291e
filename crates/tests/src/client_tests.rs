//! Integration tests for the client facade.
//!
//! These tests verify the contract collaborators rely on:
//! - Domain listing degrades to the fixed fallback list, never to an error
//! - Inbox listing distinguishes empty inboxes from transport failure
//! - Message retrieval parses the service's camelCase body fields
//! - Recovery clears health counters before refetching

use serde_json::json;
use std::sync::Arc;
use vapormail_core::{
    Endpoint, EndpointRegistry, HealthTracker, HttpClient, MailClient, RelayDescriptor,
    RelayTier, RetrievalConfig, TransportError, FALLBACK_DOMAINS,
};

use crate::mock_infrastructure::MailMockBuilder;

const UNREACHABLE_MIRROR: &str = "http://127.0.0.1:9/api/v1/";
const UNREACHABLE_RELAY: &str = "http://127.0.0.1:9/relay?url=";

fn test_config() -> RetrievalConfig {
    RetrievalConfig {
        direct_timeout_ms: 2_000,
        relay_timeout_ms: 2_000,
        ..RetrievalConfig::default()
    }
}

fn unreachable_registry() -> EndpointRegistry {
    EndpointRegistry::new(
        vec![Endpoint::new(UNREACHABLE_MIRROR)],
        vec![RelayTier::new(
            "fast",
            vec![RelayDescriptor::new("dead-relay", UNREACHABLE_RELAY)],
        )],
    )
}

fn build_client(
    registry: EndpointRegistry,
    config: &RetrievalConfig,
) -> (MailClient, Arc<HealthTracker>) {
    let http = Arc::new(HttpClient::with_concurrency_limit(8).expect("http client"));
    let health = Arc::new(HealthTracker::new(config.failure_penalty));
    let client = MailClient::with_parts(http, Arc::new(registry), Arc::clone(&health), config);
    (client, health)
}

fn mirror_registry(mock: &MailMockBuilder) -> EndpointRegistry {
    EndpointRegistry::new(vec![Endpoint::new(mock.endpoint_base())], vec![])
}

#[tokio::test]
async fn test_list_domains_from_live_mirror() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_domain_list(&["example.com", "example.org"]).await;

    let config = test_config();
    let (client, _health) = build_client(mirror_registry(&mock), &config);

    let domains = client.list_domains().await;
    assert_eq!(domains, vec!["example.com".to_string(), "example.org".to_string()]);
}

#[tokio::test]
async fn test_list_domains_falls_back_on_exhaustion() {
    let config = test_config();
    let (client, health) = build_client(unreachable_registry(), &config);

    let domains = client.list_domains().await;
    assert_eq!(domains.len(), FALLBACK_DOMAINS.len());
    assert_eq!(domains[0], "1secmail.com");

    // The failure still counts against health even though the caller saw a
    // usable list.
    assert_eq!(health.snapshot().consecutive_failures, 1);
}

#[tokio::test]
async fn test_list_domains_falls_back_on_non_array_payload() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_domain_list_payload(&json!({"error": "maintenance"})).await;

    let config = test_config();
    let (client, _health) = build_client(mirror_registry(&mock), &config);

    let domains = client.list_domains().await;
    assert_eq!(domains.len(), FALLBACK_DOMAINS.len());
}

#[tokio::test]
async fn test_list_domains_falls_back_on_empty_array() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_domain_list(&[]).await;

    let config = test_config();
    let (client, _health) = build_client(mirror_registry(&mock), &config);

    let domains = client.list_domains().await;
    assert_eq!(domains.len(), FALLBACK_DOMAINS.len(), "an empty list is useless to callers");
}

#[tokio::test]
async fn test_list_messages_parses_inbox() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_inbox(
        "alice",
        &json!([
            {"id": 101, "from": "sender@example.org", "subject": "hello", "date": "2024-01-01 10:00:00"},
            {"id": 102, "from": "other@example.org", "subject": "again", "date": "2024-01-01 11:00:00"},
        ]),
    )
    .await;

    let config = test_config();
    let (client, _health) = build_client(mirror_registry(&mock), &config);

    let messages = client.list_messages("alice", "example.com").await.expect("inbox should parse");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, 101);
    assert_eq!(messages[1].subject, "again");
}

#[tokio::test]
async fn test_list_messages_treats_non_array_as_empty_inbox() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_inbox("alice", &json!({"status": "no messages"})).await;

    let config = test_config();
    let (client, _health) = build_client(mirror_registry(&mock), &config);

    let messages = client.list_messages("alice", "example.com").await.expect("should not error");
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_list_messages_surfaces_exhaustion() {
    let config = test_config();
    let (client, _health) = build_client(unreachable_registry(), &config);

    let result = client.list_messages("alice", "example.com").await;
    assert!(
        matches!(result, Err(TransportError::AllPathsExhausted { .. })),
        "inbox failure must not be silently converted, got: {result:?}"
    );
}

#[tokio::test]
async fn test_get_message_parses_camel_case_bodies() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_message(
        7,
        &json!({
            "id": 7,
            "from": "sender@example.org",
            "subject": "verification code",
            "date": "2024-01-01 10:00:00",
            "textBody": "your code is 123456",
            "htmlBody": "<p>your code is 123456</p>",
        }),
    )
    .await;

    let config = test_config();
    let (client, _health) = build_client(mirror_registry(&mock), &config);

    let message =
        client.get_message("alice", "example.com", 7).await.expect("message should parse");
    assert_eq!(message.id, 7);
    assert_eq!(message.preferred_body(), Some("your code is 123456"));
}

#[tokio::test]
async fn test_get_message_rejects_wrong_shape() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_message(7, &json!(["not", "a", "message"])).await;

    let config = test_config();
    let (client, _health) = build_client(mirror_registry(&mock), &config);

    let result = client.get_message("alice", "example.com", 7).await;
    assert!(matches!(result, Err(TransportError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_recover_resets_health_and_refetches() {
    let mut mock = MailMockBuilder::new().await;
    mock.mock_domain_list(&["example.com"]).await;

    let config = test_config();
    let (client, health) = build_client(mirror_registry(&mock), &config);

    health.record_failure();
    health.record_failure();
    assert_eq!(client.current_health().score, 60);

    let domains = client.recover().await;
    assert_eq!(domains, vec!["example.com".to_string()]);

    let snapshot = client.current_health();
    assert_eq!(snapshot.score, 100);
    assert_eq!(snapshot.consecutive_failures, 0);
}
