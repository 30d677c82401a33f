/// Axum handlers for the bridge endpoints
use crate::client::HttpClient;
use crate::errors::BridgeError;
use crate::forwarder::{self, excerpt};
use crate::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{info, instrument};

pub(crate) const SERVICE_NAME: &str = "chatbot-bridge";

#[instrument(skip(state))]
pub async fn home<T: HttpClient>(State(state): State<AppState<T>>) -> impl IntoResponse {
    Json(json!({
        "status": "online",
        "service": SERVICE_NAME,
        "environment": state.config.environment,
    }))
}

#[instrument(skip(state))]
pub async fn health<T: HttpClient>(State(state): State<AppState<T>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "environment": state.config.environment,
    }))
}

/// Takes `{"message": string}` from the frontend and forwards it upstream.
/// Success answers in plain text; every failure is a JSON `{"error": ...}`
/// via [`BridgeError`].
#[instrument(skip(state, req))]
pub async fn chat<T: HttpClient>(
    State(state): State<AppState<T>>,
    req: axum::extract::Request,
) -> Result<Response, BridgeError> {
    let body_bytes = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .map_err(|e| BridgeError::Internal(e.to_string()))?;

    // Only the presence of the key is validated; an empty message is
    // accepted and forwarded as-is.
    let data: Value =
        serde_json::from_slice(&body_bytes).map_err(|_| BridgeError::Validation("message"))?;
    let message = data
        .get("message")
        .and_then(Value::as_str)
        .ok_or(BridgeError::Validation("message"))?;

    info!("Received message: {}", excerpt(message));

    let reply = forwarder::forward_message(&state.http_client, &state.config, message).await?;
    Ok(reply.into_response())
}

/// Reports whether the upstream secrets are configured. The detailed view
/// (including the upstream URL) is only served when the operator set the
/// explicit expose flag; the environment tag alone never unlocks it.
#[instrument(skip(state))]
pub async fn config<T: HttpClient>(State(state): State<AppState<T>>) -> impl IntoResponse {
    let config = &state.config;
    if config.expose_config_secrets {
        Json(json!({
            "environment": config.environment,
            "api_key_configured": config.api_key.is_some(),
            "channel_token_configured": config.channel_token.is_some(),
            "external_url": config.upstream_url(),
        }))
    } else {
        let status = if config.secrets_configured() {
            "API keys configured"
        } else {
            "API keys missing"
        };
        Json(json!({
            "environment": config.environment,
            "status": status,
        }))
    }
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}
