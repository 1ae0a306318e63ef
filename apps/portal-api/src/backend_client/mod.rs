/// Backend Client: the single point of entry for all calls to the hiring backend.
///
/// ARCHITECTURAL RULE: No other module may build backend URLs or issue HTTP
/// requests directly. Everything goes through the `Transport` trait.
///
/// Every call carries an explicit timeout. There are no retries at this layer;
/// retry policy belongs to the caller (poll loops simply try again next tick).
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod endpoints;
#[cfg(test)]
pub mod fake;

pub use endpoints::{ApiRequest, Endpoint, Timeouts};

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Timed, cancellable JSON calls against the backend. Owns no state.
///
/// Cancellation is by drop: abandoning the returned future aborts the request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, request: &ApiRequest) -> Result<Value, TransportError>;
}

/// The `{ success, message, data }` wrapper every backend response carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub success: bool,
    pub message: Option<String>,
    pub data: Value,
}

impl Envelope {
    pub fn parse(body: Value) -> Result<Self, TransportError> {
        let Value::Object(mut map) = body else {
            return Err(TransportError::Malformed(
                "response body is not a JSON object".to_string(),
            ));
        };

        let success = map
            .get("success")
            .and_then(Value::as_bool)
            .ok_or_else(|| TransportError::Malformed("missing `success` flag".to_string()))?;

        let message = ["message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string);

        Ok(Self {
            success,
            message,
            data: map.remove("data").unwrap_or(Value::Null),
        })
    }
}

/// reqwest-backed transport. Cheap to clone; shares one connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    api_key: String,
    timeouts: Timeouts,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: String, timeouts: Timeouts) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("backend URL '{base_url}' cannot be used as a base URL");
        }

        Ok(Self {
            client: Client::builder().build()?,
            base_url,
            api_key,
            timeouts,
        })
    }

    fn url_for(&self, request: &ApiRequest) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "tickets",
                request.ticket.as_str(),
                request.endpoint.action(),
            ]);
        }
        url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        let timeout = self.timeouts.for_class(request.endpoint.timeout_class());

        let mut builder = self
            .client
            .request(request.endpoint.method(), self.url_for(request))
            .header(API_KEY_HEADER, &self.api_key)
            .header("accept", "application/json")
            .timeout(timeout);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("{} {} returned {}", request.endpoint.method(), request.path(), status);
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| classify(e, timeout))?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::TicketId;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    async fn spawn_backend() -> String {
        let app = Router::new()
            .route(
                "/api/tickets/:id/filtering-status",
                get(|Path(id): Path<String>, headers: HeaderMap| async move {
                    let key = headers
                        .get("x-api-key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Json(json!({"success": true, "data": {"ticket": id, "key": key}}))
                }),
            )
            .route(
                "/api/tickets/:id/top-resumes",
                get(|| async { (StatusCode::FORBIDDEN, "invalid api key") }),
            )
            .route(
                "/api/tickets/:id/filtering-report",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!({"success": true}))
                }),
            )
            .route("/api/tickets/:id/resumes", get(|| async { "<html>oops</html>" }))
            .route(
                "/api/tickets/:id/send-top-resumes",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({"success": true, "data": body}))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(
            base,
            "secret-key".to_string(),
            Timeouts {
                standard: Duration::from_millis(200),
                listing: Duration::from_millis(500),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_url_encodes_ticket_segment() {
        let t = transport("http://backend.local/api/");
        let url = t.url_for(&ApiRequest::new(
            Endpoint::FilteringStatus,
            &TicketId::new("T 1/2"),
        ));
        assert_eq!(
            url.as_str(),
            "http://backend.local/api/tickets/T%201%2F2/filtering-status"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(HttpTransport::new("mailto:hr@example.com", String::new(), Timeouts::default())
            .is_err());
    }

    #[test]
    fn test_envelope_parse() {
        let env = Envelope::parse(json!({"success": false, "error": "Ticket folder not found"}))
            .unwrap();
        assert!(!env.success);
        assert_eq!(env.message.as_deref(), Some("Ticket folder not found"));
        assert_eq!(env.data, Value::Null);
    }

    #[test]
    fn test_envelope_without_success_is_malformed() {
        assert!(matches!(
            Envelope::parse(json!({"data": []})),
            Err(TransportError::Malformed(_))
        ));
        assert!(matches!(
            Envelope::parse(json!([1, 2])),
            Err(TransportError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_success_sends_api_key_and_returns_json() {
        let base = spawn_backend().await;
        let body = transport(&base)
            .call(&ApiRequest::new(Endpoint::FilteringStatus, &TicketId::new("T-100")))
            .await
            .unwrap();
        assert_eq!(body["data"]["ticket"], "T-100");
        assert_eq!(body["data"]["key"], "secret-key");
    }

    #[tokio::test]
    async fn test_non_2xx_is_http_error() {
        let base = spawn_backend().await;
        let err = transport(&base)
            .call(&ApiRequest::new(Endpoint::TopResumes, &TicketId::new("T-100")))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::Http {
                status: 403,
                body: "invalid api key".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let base = spawn_backend().await;
        let err = transport(&base)
            .call(&ApiRequest::new(Endpoint::FilteringReport, &TicketId::new("T-100")))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout(Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let base = spawn_backend().await;
        let err = transport(&base)
            .call(&ApiRequest::new(Endpoint::ListResumes, &TicketId::new("T-100")))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_post_carries_json_body() {
        let base = spawn_backend().await;
        let body = transport(&base)
            .call(&ApiRequest::send_top_resumes(&TicketId::new("T-100"), 3))
            .await
            .unwrap();
        assert_eq!(body["data"]["candidate_count"], 3);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = transport(&format!("http://{addr}/api"))
            .call(&ApiRequest::new(Endpoint::FilteringStatus, &TicketId::new("T-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
