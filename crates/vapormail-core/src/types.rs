//! Wire types for the upstream mail protocol.
//!
//! The upstream protocol is fixed by the third-party service and reproduced
//! exactly: field names on the wire are camelCase where the service uses
//! camelCase (`textBody`, `htmlBody`).

use serde::{Deserialize, Serialize};

/// One entry of an inbox listing, as returned by `action=getMessages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: u64,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub date: String,
}

/// A full message, as returned by `action=readMessage`.
///
/// The service populates `body` and/or `text_body`/`html_body` depending on
/// the original message; all three are optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDetail {
    pub id: u64,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, rename = "textBody")]
    pub text_body: Option<String>,
    #[serde(default, rename = "htmlBody")]
    pub html_body: Option<String>,
}

impl MessageDetail {
    /// Returns the best available textual rendering of the message body.
    #[must_use]
    pub fn preferred_body(&self) -> Option<&str> {
        self.text_body
            .as_deref()
            .or(self.body.as_deref())
            .or(self.html_body.as_deref())
    }
}

/// One semantic operation against the service, independent of which mirror or
/// relay ultimately serves it.
///
/// Rendered into a query string appended to an endpoint base address:
/// `?action=getMessages&login=alice&domain=example.com`.
#[derive(Debug, Clone)]
pub struct LogicalRequest {
    action: &'static str,
    params: Vec<(&'static str, String)>,
}

impl LogicalRequest {
    /// `action=getDomainList`: the list of currently usable mail domains.
    #[must_use]
    pub fn domain_list() -> Self {
        Self { action: "getDomainList", params: Vec::new() }
    }

    /// `action=getMessages`: the inbox listing for one address.
    #[must_use]
    pub fn messages(login: &str, domain: &str) -> Self {
        Self {
            action: "getMessages",
            params: vec![("login", login.to_string()), ("domain", domain.to_string())],
        }
    }

    /// `action=readMessage`: one full message by id.
    #[must_use]
    pub fn read_message(login: &str, domain: &str, id: u64) -> Self {
        Self {
            action: "readMessage",
            params: vec![
                ("login", login.to_string()),
                ("domain", domain.to_string()),
                ("id", id.to_string()),
            ],
        }
    }

    /// The action name, used for logging.
    #[must_use]
    pub fn action(&self) -> &'static str {
        self.action
    }

    /// Renders the request as a query string, parameter values form-encoded.
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut query = format!("?action={}", self.action);
        for (key, value) in &self.params {
            let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
            query.push('&');
            query.push_str(key);
            query.push('=');
            query.push_str(&encoded);
        }
        query
    }
}
