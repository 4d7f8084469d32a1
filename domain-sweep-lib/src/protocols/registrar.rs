//! Registrar check endpoint client.
//!
//! Each lookup is one `POST` of `{"sld": <name>, "tld": <suffix>}` to the
//! endpoint routed for the suffix. The JSON reply either carries an `error`
//! field (name unavailable) or a `result` payload (name available).

use crate::checker::Checker;
use crate::error::SweepError;
use crate::protocols::routes::RouteTable;
use crate::types::{Outcome, Task};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Default HTTP timeout when the sweep sets no per-task deadline.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct CheckRequest<'a> {
    sld: &'a str,
    tld: &'a str,
}

/// HTTP checker for registrar check endpoints.
#[derive(Clone)]
pub struct RegistrarClient {
    http_client: reqwest::Client,
    routes: RouteTable,
}

impl RegistrarClient {
    /// Client over the built-in routes.
    pub fn new() -> Result<Self, SweepError> {
        Self::with_config(RouteTable::builtin(), None)
    }

    /// Client over `routes`, with an optional HTTP timeout.
    pub fn with_config(routes: RouteTable, timeout: Option<Duration>) -> Result<Self, SweepError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT))
            .build()
            .map_err(|e| {
                SweepError::internal(format!("Failed to create registrar HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            routes,
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    async fn post_check(&self, url: &str, task: &Task) -> Outcome {
        let body = CheckRequest {
            sld: &task.name,
            tld: &task.suffix,
        };

        let response = match self.http_client.post(url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(task = %task, error = %e, "registrar request failed");
                return Outcome::TransportError {
                    detail: SweepError::from(e).to_string(),
                };
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(text) => {
                tracing::debug!(task = %task, %status, body = %text, "registrar response");
                match classify_response(&text) {
                    Outcome::TransportError { detail } if !status.is_success() => {
                        Outcome::TransportError {
                            detail: format!("HTTP {}: {}", status.as_u16(), detail),
                        }
                    }
                    outcome => outcome,
                }
            }
            Err(e) => Outcome::TransportError {
                detail: SweepError::from(e).to_string(),
            },
        }
    }
}

#[async_trait]
impl Checker for RegistrarClient {
    async fn check(&self, task: &Task) -> Result<Outcome, SweepError> {
        let url = self.routes.resolve(&task.suffix)?;
        Ok(self.post_check(url, task).await)
    }

    fn validate_suffix(&self, suffix: &str) -> Result<(), SweepError> {
        self.routes.resolve(suffix).map(|_| ())
    }
}

/// Classify a registrar response body.
///
/// - not JSON, or JSON that is not an object → `TransportError`
/// - object with a non-null `error` → `Unavailable` with the error message
/// - any other object → `Available` with the `result` payload as text
pub fn classify_response(body: &str) -> Outcome {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => {
            return Outcome::TransportError {
                detail: format!("invalid JSON response: {}", e),
            }
        }
    };

    let Some(object) = json.as_object() else {
        return Outcome::TransportError {
            detail: format!("unexpected response: {}", json),
        };
    };

    match object.get("error") {
        Some(error) if !error.is_null() => Outcome::Unavailable {
            detail: error_message(error),
        },
        _ => Outcome::Available {
            detail: object.get("result").map(value_text).unwrap_or_default(),
        },
    }
}

fn error_message(error: &Value) -> String {
    match error.get("message") {
        Some(message) => value_text(message),
        None => value_text(error),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_classify_available() {
        assert_eq!(
            classify_response(r#"{"result": true, "error": null}"#),
            Outcome::Available {
                detail: "true".to_string()
            }
        );
        assert_eq!(
            classify_response(r#"{"result": "ok"}"#),
            Outcome::Available {
                detail: "ok".to_string()
            }
        );
        assert_eq!(
            classify_response(r#"{}"#),
            Outcome::Available {
                detail: String::new()
            }
        );
    }

    #[test]
    fn test_classify_unavailable() {
        assert_eq!(
            classify_response(
                r#"{"result": null, "error": {"message": "Domain is already registered", "code": 9999}}"#
            ),
            Outcome::Unavailable {
                detail: "Domain is already registered".to_string()
            }
        );
        assert_eq!(
            classify_response(r#"{"error": "rate limited"}"#),
            Outcome::Unavailable {
                detail: "rate limited".to_string()
            }
        );
    }

    #[test]
    fn test_classify_transport_errors() {
        assert!(matches!(
            classify_response("<html>502 Bad Gateway</html>"),
            Outcome::TransportError { .. }
        ));
        assert!(matches!(
            classify_response("[1, 2]"),
            Outcome::TransportError { .. }
        ));
    }

    fn client_for(server: &mockito::ServerGuard) -> RegistrarClient {
        let mut routes = RouteTable::empty();
        routes
            .insert(".test", &format!("{}/check", server.url()))
            .unwrap();
        RegistrarClient::with_config(routes, Some(Duration::from_secs(5))).unwrap()
    }

    #[tokio::test]
    async fn test_check_posts_sld_and_tld() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/check")
            .match_body(Matcher::Json(json!({"sld": "aa", "tld": ".test"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result": true, "error": null}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let outcome = client.check(&Task::new("aa", ".test")).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Available {
                detail: "true".to_string()
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_check_registrar_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/check")
            .with_status(200)
            .with_body(r#"{"result": null, "error": {"message": "Domain is already registered"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let outcome = client.check(&Task::new("bb", ".test")).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Unavailable {
                detail: "Domain is already registered".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_check_non_json_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/check")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = client_for(&server);
        match client.check(&Task::new("cc", ".test")).await.unwrap() {
            Outcome::TransportError { detail } => assert!(detail.starts_with("HTTP 502")),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_check_connection_refused_is_transport_error() {
        let mut routes = RouteTable::empty();
        routes.insert(".test", "http://127.0.0.1:1/check").unwrap();
        let client = RegistrarClient::with_config(routes, Some(Duration::from_secs(2))).unwrap();

        let outcome = client.check(&Task::new("dd", ".test")).await.unwrap();
        assert!(matches!(outcome, Outcome::TransportError { .. }));
    }

    #[tokio::test]
    async fn test_unknown_suffix_is_an_error() {
        let client = RegistrarClient::new().unwrap();
        assert!(client.validate_suffix(".loc.cc").is_ok());
        assert!(matches!(
            client.validate_suffix(".nowhere"),
            Err(SweepError::UnknownSuffix { .. })
        ));
        assert!(matches!(
            client.check(&Task::new("aa", ".nowhere")).await,
            Err(SweepError::UnknownSuffix { .. })
        ));
    }
}
