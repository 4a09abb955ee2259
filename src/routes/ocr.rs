//! Routes of the OCR endpoint.

use crate::error::OcrError;
use crate::ocr::batch::{parse_read_request, OcrRelay, ReadResponse};
use axum::{
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(relay: Arc<OcrRelay>) -> Router {
    Router::new()
        .route("/read", post(read))
        .route("/health", get(super::health))
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

/// Recognize text on a batch of page images.
async fn read(
    State(relay): State<Arc<OcrRelay>>,
    body: Bytes,
) -> Result<Json<ReadResponse>, OcrError> {
    // Unparseable bodies fail validation like empty ones.
    let data: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let items = parse_read_request(&data)?;
    info!("OCR batch of {} images", items.len());

    let response = relay.read_batch(&items).await?;
    Ok(Json(response))
}
