//! HTTP surfaces of the two services.

pub mod convert;
pub mod ocr;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "ok"
}
