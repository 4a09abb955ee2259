//! ocr-relay - batch text recognition over image URLs.

use mitta_relay::config::OcrConfig;
use mitta_relay::ocr::batch::OcrRelay;
use mitta_relay::ocr::easyocr::EasyOcrSidecar;
use mitta_relay::routes::ocr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    mitta_relay::init_tracing();

    let config = OcrConfig::from_env()?;
    let client = reqwest::Client::new();
    let engine = Arc::new(EasyOcrSidecar::new(client.clone(), config.easyocr_url.clone()));
    info!("EasyOCR sidecar at {}", config.easyocr_url);

    let relay = Arc::new(OcrRelay::new(engine, client, config.image_timeout));
    let app = ocr::router(relay);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Server listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
