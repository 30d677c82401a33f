use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Everything that can go wrong between the caller and the upstream webhook.
/// Each variant carries the status code the bridge reports back; errors are
/// handled at the request boundary and never propagate past the handler.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The inbound body was missing a required field.
    #[error("Missing required field: {0}")]
    Validation(&'static str),

    /// The upstream webhook answered with a non-2xx status. The status is
    /// propagated to the caller as-is; the body is kept for the logs.
    #[error("External API error: {status}")]
    Upstream { status: StatusCode, body: String },

    /// The upstream call exceeded the configured timeout.
    #[error("Request timed out. Please try again.")]
    Timeout,

    /// The upstream webhook could not be reached at all.
    #[error("Connection error. Please check your internet connection.")]
    Connection,

    /// Any other transport-level failure.
    #[error("Request error: {0}")]
    Request(String),

    /// Unclassified internal failure.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Connection => StatusCode::SERVICE_UNAVAILABLE,
            Self::Request(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors become JSON `{"error": ...}` payloads; the success path answers in
/// plain text. That asymmetry is the stable contract, not an accident.
impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        match &self {
            BridgeError::Upstream { status, body } => {
                error!(%status, body = %body, "upstream webhook returned an error")
            }
            other => error!(error = %other, "request failed"),
        }
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
