// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Best-effort push of one log line per Event to a Loki push API.
//!
//! Each Event becomes its own request: one stream carrying the Event's labels
//! and a single `[timestamp, line]` value. Failures are logged and dropped;
//! there is no retry, batching or buffering, so an Event whose push fails
//! keeps its metric increment but loses its log line.

use crate::constants::{LOKI_PUSH_PATH, LOKI_PUSH_TIMEOUT};
use crate::errors::ShippingError;
use crate::event::ObservedEvent;
use crate::http::get_client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error};

/// Body of `POST /loki/api/v1/push`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LokiPayload {
    pub streams: Vec<LokiStream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LokiStream {
    pub stream: BTreeMap<String, String>,
    /// `[unix nanoseconds as a string, log line]` pairs.
    pub values: Vec<[String; 2]>,
}

impl LokiPayload {
    /// Builds the single-stream payload for one Event.
    ///
    /// The timestamp is the push instant truncated to whole seconds, not the
    /// Event's own occurrence time.
    #[must_use]
    pub fn from_event(event: &ObservedEvent, pushed_at: SystemTime) -> Self {
        let stream = BTreeMap::from([
            ("namespace".to_string(), event.namespace.clone()),
            ("reason".to_string(), event.reason.clone()),
            ("type".to_string(), event.event_type.clone()),
            ("component".to_string(), event.component.clone()),
        ]);

        Self {
            streams: vec![LokiStream {
                stream,
                values: vec![[nanosecond_timestamp(pushed_at), event.log_line()]],
            }],
        }
    }
}

fn nanosecond_timestamp(at: SystemTime) -> String {
    let secs = at
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    format!("{secs}000000000")
}

#[derive(Debug, Clone)]
pub struct LokiClientConfig {
    /// Push API base URL, e.g. `http://loki:3100`. `None` or blank disables
    /// the sink.
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for LokiClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: LOKI_PUSH_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
struct PushTarget {
    client: reqwest::Client,
    push_url: String,
    timeout: Duration,
}

/// Log-sink client. Holds no HTTP client at all when disabled.
#[derive(Debug, Clone)]
pub struct LokiClient {
    target: Option<PushTarget>,
}

impl LokiClient {
    #[must_use]
    pub fn new(config: LokiClientConfig) -> Self {
        let push_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| format!("{}{LOKI_PUSH_PATH}", url.trim_end_matches('/')));

        let Some(push_url) = push_url else {
            debug!("LOKI | No push URL configured, event logs are disabled");
            return LokiClient { target: None };
        };
        debug!("LOKI | Pushing event logs to {push_url}");

        LokiClient {
            target: Some(PushTarget {
                client: get_client(config.timeout),
                push_url,
                timeout: config.timeout,
            }),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    #[cfg(test)]
    fn push_url(&self) -> Option<&str> {
        self.target.as_ref().map(|target| target.push_url.as_str())
    }

    /// Pushes one Event. A no-op when the sink is disabled.
    ///
    /// Never fails: every error is reduced to one `error` log line.
    pub async fn push(&self, event: &ObservedEvent) {
        let Some(target) = &self.target else {
            return;
        };

        if let Err(e) = target.send(event, SystemTime::now()).await {
            error!("LOKI | Failed to push event log: {e}");
        }
    }
}

impl PushTarget {
    /// The timeout is set per request so it holds whichever way the client
    /// was built.
    async fn send(
        &self,
        event: &ObservedEvent,
        pushed_at: SystemTime,
    ) -> Result<(), ShippingError> {
        let payload = LokiPayload::from_event(event, pushed_at);

        let resp = self
            .client
            .post(&self.push_url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    ShippingError::Payload(e.to_string())
                } else {
                    ShippingError::Destination(e.status(), e.to_string())
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        Err(ShippingError::Destination(
            Some(status),
            format!(
                "loki returned non-2xx status: {:?}",
                resp.text().await.unwrap_or_default()
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tracing_test::traced_test;

    fn scheduled_event() -> ObservedEvent {
        ObservedEvent {
            namespace: "default".to_string(),
            reason: "Scheduled".to_string(),
            event_type: "Normal".to_string(),
            message: "Successfully assigned pod".to_string(),
            component: "scheduler".to_string(),
        }
    }

    fn client_for(base_url: Option<String>) -> LokiClient {
        LokiClient::new(LokiClientConfig {
            base_url,
            timeout: Duration::from_secs(1),
        })
    }

    #[test]
    fn test_payload_shape() {
        let pushed_at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_750);
        let payload = LokiPayload::from_event(&scheduled_event(), pushed_at);

        let value = serde_json::to_value(&payload).expect("failed to serialize payload");
        assert_eq!(
            value,
            json!({
                "streams": [{
                    "stream": {
                        "namespace": "default",
                        "reason": "Scheduled",
                        "type": "Normal",
                        "component": "scheduler"
                    },
                    "values": [["1700000000000000000", "[Normal] Scheduled: Successfully assigned pod"]]
                }]
            })
        );
    }

    #[test]
    fn test_timestamp_before_epoch_is_zero() {
        let before_epoch = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(nanosecond_timestamp(before_epoch), "0000000000");
    }

    #[test]
    fn test_push_url_construction() {
        assert_eq!(
            client_for(Some("http://loki:3100".to_string())).push_url(),
            Some("http://loki:3100/loki/api/v1/push")
        );
        assert_eq!(
            client_for(Some("http://loki:3100/".to_string())).push_url(),
            Some("http://loki:3100/loki/api/v1/push")
        );
        assert!(!client_for(Some("   ".to_string())).is_enabled());
        assert!(!client_for(None).is_enabled());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_push_ships_one_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/loki/api/v1/push")
            .match_header("Content-Type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "streams": [{
                    "stream": {
                        "namespace": "default",
                        "reason": "Scheduled",
                        "type": "Normal",
                        "component": "scheduler"
                    }
                }]
            })))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        client_for(Some(server.url())).push(&scheduled_event()).await;

        mock.assert_async().await;
        assert!(!logs_contain("Failed to push event log"));
    }

    #[tokio::test]
    async fn test_push_does_not_deduplicate() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/loki/api/v1/push")
            .with_status(204)
            .expect(3)
            .create_async()
            .await;

        let client = client_for(Some(server.url()));
        let event = scheduled_event();
        for _ in 0..3 {
            client.push(&event).await;
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    #[traced_test]
    async fn test_push_non_2xx_is_logged_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/loki/api/v1/push")
            .with_status(500)
            .with_body("ingester unavailable")
            .expect(1)
            .create_async()
            .await;

        client_for(Some(server.url())).push(&scheduled_event()).await;

        mock.assert_async().await;
        assert!(logs_contain("500"));
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("Failed to push event log"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one push failure, got {n}")),
            }
        });
    }

    #[tokio::test]
    #[traced_test]
    async fn test_push_unreachable_is_logged_once() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let addr = listener.local_addr().expect("failed to get address");
        drop(listener);

        client_for(Some(format!("http://{addr}")))
            .push(&scheduled_event())
            .await;

        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("Failed to push event log"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one push failure, got {n}")),
            }
        });
    }

    #[tokio::test]
    #[traced_test]
    async fn test_push_invalid_url_is_a_payload_error() {
        client_for(Some("not a url".to_string()))
            .push(&scheduled_event())
            .await;

        assert!(logs_contain("failed to prepare payload"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_push_timeout_holds_with_default_client() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind");
        let addr = listener.local_addr().expect("failed to get address");
        // Accepts and never answers.
        let hung = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.expect("failed to accept");
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = LokiClient {
            target: Some(PushTarget {
                client: reqwest::Client::new(),
                push_url: format!("http://{addr}{LOKI_PUSH_PATH}"),
                timeout: Duration::from_millis(200),
            }),
        };

        tokio::time::timeout(Duration::from_secs(5), client.push(&scheduled_event()))
            .await
            .expect("push was not bounded by its timeout");
        hung.abort();

        assert!(logs_contain("Failed to push event log"));
    }

    #[test]
    fn test_default_config_uses_push_timeout() {
        let config = LokiClientConfig::default();
        let copy = config.clone();
        assert_eq!(copy.timeout, LOKI_PUSH_TIMEOUT);
        assert!(format!("{config:?}").contains("base_url: None"));
    }

    #[test]
    fn test_disabled_client_builds_no_http_client() {
        assert!(client_for(None).target.is_none());
        assert!(client_for(Some(String::new())).target.is_none());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_disabled_push_is_silent() {
        let client = client_for(None);
        client.push(&scheduled_event()).await;

        assert!(!logs_contain("Failed to push event log"));
    }
}
