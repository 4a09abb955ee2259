//! Error types surfaced by the HTTP handlers.
//!
//! Every variant renders as a JSON body with a status field; the HTTP status
//! code follows what browsers and the pipeline already expect from these
//! endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/// Failures of the conversion front end.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("No file received")]
    MissingFile,

    #[error("Invalid upload: {0}")]
    Multipart(String),

    #[error("Failed to upload file")]
    Rejected,

    #[error("Pipeline unreachable: {0:#}")]
    Unreachable(anyhow::Error),

    /// Artifact fetch or write failed while handling a callback.
    #[error("Artifact download failed: {0:#}")]
    Artifact(anyhow::Error),

    #[error("Failed to render page: {0}")]
    Render(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (code, body) = match &self {
            // The browser script reads these from a 200 response.
            RelayError::MissingFile | RelayError::Rejected => (
                StatusCode::OK,
                json!({"status": "error", "message": self.to_string()}),
            ),
            RelayError::Multipart(_) => (
                StatusCode::BAD_REQUEST,
                json!({"status": "error", "message": self.to_string()}),
            ),
            RelayError::Unreachable(_) | RelayError::Render(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"status": "error", "message": self.to_string()}),
            ),
            RelayError::Artifact(_) => (StatusCode::OK, json!({"status": "failed"})),
        };
        (code, Json(body)).into_response()
    }
}

/// Failures of the OCR endpoint.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("Timeout occurred while downloading image from '{0}'")]
    Timeout(String),

    #[error("Failed to download image from '{uri}': {reason}")]
    Download { uri: String, reason: String },

    #[error("OCR engine failed on '{uri}': {reason:#}")]
    Engine { uri: String, reason: anyhow::Error },
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let code = match self {
            OcrError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({"status": "failed", "error": self.to_string()});
        (code, Json(body)).into_response()
    }
}
