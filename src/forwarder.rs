//! Builds the outbound call to the upstream webhook and classifies the
//! outcome. One inbound chat message maps to exactly one upstream POST; no
//! retries, no shared state between requests.
use crate::client::{ClientError, HttpClient};
use crate::config::{Config, UPSTREAM_HOST};
use crate::errors::BridgeError;
use crate::formatter::format_reply;
use axum::http::{Method, header};
use serde::Serialize;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info};

/// JSON body of the upstream POST.
#[derive(Debug, Serialize)]
struct OutboundPayload<'a> {
    payload: &'a str,
    env: &'a str,
}

/// Forwards one chat message to the webhook and renders the reply into the
/// plain-text body the caller receives.
///
/// A 2xx upstream response resolves in one of three ways:
/// - JSON with a string `text` field: the formatted text,
/// - JSON without one: the whole value re-serialized as JSON,
/// - anything else: the raw body verbatim.
pub async fn forward_message<T: HttpClient>(
    client: &T,
    config: &Config,
    message: &str,
) -> Result<String, BridgeError> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| BridgeError::Internal("VEXT_API_KEY is not configured".to_string()))?;
    let url = config
        .upstream_url()
        .ok_or_else(|| BridgeError::Internal("CHANNEL_TOKEN is not configured".to_string()))?;

    let body = serde_json::to_vec(&OutboundPayload {
        payload: message,
        env: &config.environment,
    })
    .map_err(|e| BridgeError::Internal(e.to_string()))?;

    // The URL carries the channel token, so log only the fixed host.
    info!("Sending request to upstream webhook at {}", UPSTREAM_HOST);
    let req = axum::http::Request::builder()
        .method(Method::POST)
        .uri(url.as_str())
        .header(header::HOST, UPSTREAM_HOST)
        .header(header::CONTENT_TYPE, "application/json")
        .header("Apikey", format!("Api-Key {api_key}"))
        .body(axum::body::Body::from(body))
        .map_err(|e| BridgeError::Internal(e.to_string()))?;

    // The timeout covers the whole exchange, headers and body: an upstream
    // that answers 2xx and then stalls the body is still a timeout.
    let exchange = async {
        let response = client.request(req).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok::<_, ClientError>((status, bytes))
    };
    let (status, bytes) = match timeout(config.upstream_timeout(), exchange).await {
        Ok(Ok(parts)) => parts,
        Ok(Err(ClientError::Connect(e))) => {
            debug!("connect failure: {e}");
            return Err(BridgeError::Connection);
        }
        Ok(Err(ClientError::Transport(e))) => return Err(BridgeError::Request(e)),
        Err(_) => return Err(BridgeError::Timeout),
    };

    if !status.is_success() {
        return Err(BridgeError::Upstream {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    let reply = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => match value.get("text").and_then(Value::as_str) {
            Some(text) => format_reply(text),
            // No `text` field: hand back the whole structure as stable JSON.
            None => serde_json::to_string(&value).map_err(|e| BridgeError::Internal(e.to_string()))?,
        },
        Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
    };

    info!("Received successful response: {}...", excerpt(&reply));
    Ok(reply)
}

/// First 100 characters, for log lines.
pub(crate) fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(100) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
