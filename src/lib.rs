//! chatbot-bridge - a single-purpose HTTP bridge
//!
//! Accepts a chat message from a frontend, forwards it to the fixed Vext
//! webhook, and relays the textual reply back after cosmetic reformatting.
//! The interesting part lives in [`formatter`]; everything else is request
//! forwarding and standard HTTP plumbing.

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, instrument};

pub mod client;
pub mod config;
pub mod errors;
pub mod formatter;
pub mod forwarder;
pub mod handlers;

use client::{HttpClient, HyperClient};
use config::Config;

/// The main application state: a pooled HTTP client plus the immutable
/// configuration read once at startup.
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub http_client: T,
    pub config: Arc<Config>,
}

impl AppState<HyperClient> {
    /// Create a new AppState with the default Hyper client
    pub fn new(config: Config) -> Self {
        let http_client = client::create_hyper_client();
        Self {
            http_client,
            config: Arc::new(config),
        }
    }
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState with a custom HTTP client (useful for testing)
    pub fn with_client(config: Config, http_client: T) -> Self {
        Self {
            http_client,
            config: Arc::new(config),
        }
    }
}

/// Build the bridge router:
/// - `GET /` and `GET /health` - liveness probes
/// - `POST /chat` - forward a message, return the formatted reply
/// - `GET /config` - configuration status
///
/// Unknown routes fall through to a JSON 404. CORS is permissive so the
/// frontend can call the bridge cross-origin.
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router");
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route("/config", get(handlers::config))
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub mod test_utils {
    //! Mock HTTP client for exercising the bridge without a network.
    use super::*;
    use crate::client::ClientError;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    enum Behavior {
        Respond { status: StatusCode, body: String },
        RespondAfter {
            delay: Duration,
            status: StatusCode,
            body: String,
        },
        StalledBody { status: StatusCode, body: String },
        FailConnect,
    }

    pub struct MockHttpClient {
        pub requests: Arc<Mutex<Vec<MockRequest>>>,
        behavior: Arc<Behavior>,
    }

    #[derive(Debug, Clone)]
    pub struct MockRequest {
        pub method: String,
        pub uri: String,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl MockHttpClient {
        pub fn new(status: StatusCode, body: &str) -> Self {
            Self::with_behavior(Behavior::Respond {
                status,
                body: body.to_string(),
            })
        }

        /// Responds only after `delay`, for driving the upstream timeout.
        pub fn with_delay(delay: Duration, status: StatusCode, body: &str) -> Self {
            Self::with_behavior(Behavior::RespondAfter {
                delay,
                status,
                body: body.to_string(),
            })
        }

        /// Sends the status and an initial body chunk immediately, then
        /// never finishes the body, for driving the timeout on body receipt.
        pub fn stalled_body(status: StatusCode, first_chunk: &str) -> Self {
            Self::with_behavior(Behavior::StalledBody {
                status,
                body: first_chunk.to_string(),
            })
        }

        /// Every request fails as if the TCP connect was refused.
        pub fn failing_connect() -> Self {
            Self::with_behavior(Behavior::FailConnect)
        }

        fn with_behavior(behavior: Behavior) -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                behavior: Arc::new(behavior),
            }
        }

        pub fn get_requests(&self) -> Vec<MockRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl std::fmt::Debug for MockHttpClient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockHttpClient")
                .field("requests", &self.requests)
                .finish()
        }
    }

    impl Clone for MockHttpClient {
        fn clone(&self) -> Self {
            Self {
                requests: Arc::clone(&self.requests),
                behavior: Arc::clone(&self.behavior),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn request(
            &self,
            req: axum::extract::Request,
        ) -> Result<axum::response::Response, ClientError> {
            let method = req.method().to_string();
            let uri = req.uri().to_string();
            let headers = req
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();

            let body = axum::body::to_bytes(req.into_body(), usize::MAX)
                .await
                .map_err(|e| ClientError::Transport(e.to_string()))?
                .to_vec();

            self.requests.lock().unwrap().push(MockRequest {
                method,
                uri,
                headers,
                body,
            });

            match &*self.behavior {
                Behavior::Respond { status, body } => Ok(respond(*status, body)),
                Behavior::RespondAfter {
                    delay,
                    status,
                    body,
                } => {
                    tokio::time::sleep(*delay).await;
                    Ok(respond(*status, body))
                }
                Behavior::StalledBody { status, body } => {
                    use futures_util::stream::{self, StreamExt};

                    let first = body.clone();
                    let stalled = stream::once(async move {
                        Ok::<_, std::io::Error>(axum::body::Bytes::from(first))
                    })
                    .chain(stream::pending());

                    Ok(axum::response::Response::builder()
                        .status(*status)
                        .body(axum::body::Body::from_stream(stalled))
                        .unwrap())
                }
                Behavior::FailConnect => {
                    Err(ClientError::Connect("connection refused".to_string()))
                }
            }
        }
    }

    fn respond(status: StatusCode, body: &str) -> axum::response::Response {
        axum::response::Response::builder()
            .status(status)
            .body(axum::body::Body::from(body.to_string()))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use std::time::Duration;
    use test_utils::MockHttpClient;

    fn test_config() -> Config {
        Config::builder()
            .api_key("test-key")
            .channel_token("tok-123")
            .environment("dev")
            .build()
    }

    fn server_with(config: Config, client: MockHttpClient) -> TestServer {
        let state = AppState::with_client(config, client);
        TestServer::new(build_router(state)).unwrap()
    }

    #[tokio::test]
    async fn chat_returns_formatted_plain_text() {
        let client = MockHttpClient::new(StatusCode::OK, r#"{"text": "**Hello** world"}"#);
        let server = server_with(test_config(), client.clone());

        let response = server.post("/chat").json(&json!({"message": "Hi"})).await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), "Hello world");
        assert!(
            response
                .headers()
                .get("content-type")
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );

        // The outbound request carried the message and the env tag.
        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["payload"], "Hi");
        assert_eq!(body["env"], "dev");
    }

    #[tokio::test]
    async fn chat_accepts_empty_message() {
        let client = MockHttpClient::new(StatusCode::OK, r#"{"text": "ok"}"#);
        let server = server_with(test_config(), client.clone());

        let response = server.post("/chat").json(&json!({"message": ""})).await;

        assert_eq!(response.status_code(), 200);
        let body: Value = serde_json::from_slice(&client.get_requests()[0].body).unwrap();
        assert_eq!(body["payload"], "");
    }

    #[tokio::test]
    async fn chat_without_message_is_400_naming_the_field() {
        let client = MockHttpClient::new(StatusCode::OK, "{}");
        let server = server_with(test_config(), client.clone());

        let response = server.post("/chat").json(&json!({})).await;

        assert_eq!(response.status_code(), 400);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("message"));
        assert!(
            response
                .headers()
                .get("content-type")
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("application/json")
        );
        // Nothing was forwarded upstream.
        assert_eq!(client.get_requests().len(), 0);
    }

    #[tokio::test]
    async fn chat_with_non_string_message_is_400() {
        let client = MockHttpClient::new(StatusCode::OK, "{}");
        let server = server_with(test_config(), client);

        let response = server.post("/chat").json(&json!({"message": 42})).await;
        assert_eq!(response.status_code(), 400);

        let server = server_with(
            test_config(),
            MockHttpClient::new(StatusCode::OK, "{}"),
        );
        let response = server.post("/chat").json(&json!({"message": null})).await;
        assert_eq!(response.status_code(), 400);
    }

    #[tokio::test]
    async fn chat_stringifies_json_without_text_field() {
        let client = MockHttpClient::new(StatusCode::OK, r#"{"ok": true}"#);
        let server = server_with(test_config(), client);

        let response = server.post("/chat").json(&json!({"message": "Hi"})).await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn chat_relays_non_json_upstream_body() {
        let client = MockHttpClient::new(StatusCode::OK, "pong");
        let server = server_with(test_config(), client);

        let response = server.post("/chat").json(&json!({"message": "Hi"})).await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), "pong");
    }

    #[tokio::test]
    async fn chat_propagates_upstream_error_status() {
        let client = MockHttpClient::new(StatusCode::SERVICE_UNAVAILABLE, "down");
        let server = server_with(test_config(), client);

        let response = server.post("/chat").json(&json!({"message": "Hi"})).await;

        assert_eq!(response.status_code(), 503);
        let body: Value = response.json();
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .contains("External API error: 503")
        );
    }

    #[tokio::test]
    async fn chat_times_out_with_408() {
        let client = MockHttpClient::with_delay(
            Duration::from_secs(3),
            StatusCode::OK,
            r#"{"text": "too late"}"#,
        );
        let config = Config::builder()
            .api_key("test-key")
            .channel_token("tok-123")
            .upstream_timeout_secs(1)
            .build();
        let server = server_with(config, client);

        let response = server.post("/chat").json(&json!({"message": "Hi"})).await;

        assert_eq!(response.status_code(), 408);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn chat_times_out_when_upstream_stalls_the_body() {
        let client = MockHttpClient::stalled_body(StatusCode::OK, r#"{"text": "#);
        let config = Config::builder()
            .api_key("test-key")
            .channel_token("tok-123")
            .upstream_timeout_secs(1)
            .build();
        let server = server_with(config, client);

        let response = server.post("/chat").json(&json!({"message": "Hi"})).await;

        assert_eq!(response.status_code(), 408);
    }

    #[tokio::test]
    async fn chat_reports_connect_failure_as_503() {
        let client = MockHttpClient::failing_connect();
        let server = server_with(test_config(), client);

        let response = server.post("/chat").json(&json!({"message": "Hi"})).await;

        assert_eq!(response.status_code(), 503);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("Connection error"));
    }

    #[tokio::test]
    async fn chat_without_secrets_is_500() {
        let client = MockHttpClient::new(StatusCode::OK, "{}");
        let server = server_with(Config::builder().environment("dev").build(), client);

        let response = server.post("/chat").json(&json!({"message": "Hi"})).await;

        assert_eq!(response.status_code(), 500);
    }

    #[tokio::test]
    async fn health_and_home_answer_200_without_secrets() {
        let client = MockHttpClient::new(StatusCode::OK, "{}");
        let server = server_with(Config::builder().build(), client);

        let response = server.get("/health").await;
        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "chatbot-bridge");
        assert_eq!(body["environment"], "production");

        let response = server.get("/").await;
        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        assert_eq!(body["status"], "online");
    }

    #[tokio::test]
    async fn config_endpoint_hides_secrets_by_default() {
        let client = MockHttpClient::new(StatusCode::OK, "{}");
        let server = server_with(test_config(), client);

        let response = server.get("/config").await;
        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        assert_eq!(body["environment"], "dev");
        assert_eq!(body["status"], "API keys configured");
        assert!(body.get("external_url").is_none());
        assert!(body.get("api_key_configured").is_none());
    }

    #[tokio::test]
    async fn config_endpoint_reports_missing_secrets() {
        let client = MockHttpClient::new(StatusCode::OK, "{}");
        let server = server_with(Config::builder().build(), client);

        let response = server.get("/config").await;
        let body: Value = response.json();
        assert_eq!(body["status"], "API keys missing");
    }

    #[tokio::test]
    async fn config_endpoint_exposes_details_only_when_flagged() {
        let client = MockHttpClient::new(StatusCode::OK, "{}");
        let config = Config::builder()
            .api_key("test-key")
            .channel_token("tok-123")
            .environment("dev")
            .expose_config_secrets(true)
            .build();
        let server = server_with(config, client);

        let response = server.get("/config").await;
        let body: Value = response.json();
        assert_eq!(body["api_key_configured"], true);
        assert_eq!(body["channel_token_configured"], true);
        assert_eq!(
            body["external_url"],
            "https://payload.vextapp.com/hook/AKEIS1C8PZ/catch/tok-123"
        );
        // The raw key itself is never echoed, even in the detailed view.
        assert!(!body.to_string().contains("test-key"));
    }

    #[tokio::test]
    async fn unknown_routes_get_json_404() {
        let client = MockHttpClient::new(StatusCode::OK, "{}");
        let server = server_with(test_config(), client);

        let response = server.get("/nope").await;
        assert_eq!(response.status_code(), 404);
        let body: Value = response.json();
        assert_eq!(body["error"], "Endpoint not found");
    }
}
