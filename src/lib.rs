//! Mitta relay services: a conversion front end that hands uploads to a remote
//! pipeline and pushes job notifications over websockets, and an OCR endpoint
//! that runs page images through an EasyOCR sidecar.

pub mod artifact_store;
pub mod callback;
pub mod config;
pub mod error;
pub mod instructions;
pub mod messages;
pub mod ocr;
pub mod pipeline;
pub mod registry;
pub mod relay;
pub mod routes;
pub mod websocket;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber, honoring `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mitta_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
