//! EasyOCR sidecar engine.
//!
//! The sidecar wraps `easyocr.Reader(['en'], gpu=True)` behind two routes:
//! `POST /readtext` (multipart `image` plus option fields, answering with
//! EasyOCR's `[[bbox, text], ...]` output) and `POST /release`, which frees
//! the reader and empties the CUDA cache.

use super::{Detection, OcrEngine, Point, ReadOptions};
use anyhow::Context;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

/// One `[bbox, text]` pair as EasyOCR emits it with `detail=1`.
#[derive(Debug, Deserialize)]
struct RawDetection(Vec<Point>, String);

pub struct EasyOcrSidecar {
    url: String,
    client: reqwest::Client,
}

impl EasyOcrSidecar {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl OcrEngine for EasyOcrSidecar {
    fn name(&self) -> &str {
        "easyocr"
    }

    async fn read_text(
        &self,
        image: &[u8],
        options: &ReadOptions,
    ) -> anyhow::Result<Vec<Detection>> {
        let mime = sniff_mime(image);
        let part = Part::bytes(image.to_vec())
            .file_name("image")
            .mime_str(mime)?;

        let form = Form::new()
            .part("image", part)
            .text("paragraph", options.paragraph.to_string())
            .text("height_ths", options.height_ths.to_string())
            .text("width_ths", options.width_ths.to_string())
            .text("detail", u8::from(options.detail).to_string());

        let response = self
            .client
            .post(format!("{}/readtext", self.url))
            .multipart(form)
            .send()
            .await
            .context("Failed to reach EasyOCR sidecar")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("EasyOCR sidecar error ({}): {}", status, error_text);
        }

        let raw: Vec<RawDetection> = response
            .json()
            .await
            .context("Failed to parse EasyOCR sidecar response")?;
        debug!("EasyOCR sidecar returned {} regions", raw.len());

        Ok(raw
            .into_iter()
            .map(|RawDetection(bbox, text)| Detection { bbox, text })
            .collect())
    }

    async fn release(&self) -> anyhow::Result<()> {
        let response = self
            .client
            .post(format!("{}/release", self.url))
            .send()
            .await
            .context("Failed to reach EasyOCR sidecar for release")?;
        if !response.status().is_success() {
            anyhow::bail!("EasyOCR release returned {}", response.status());
        }
        Ok(())
    }
}

/// MIME type from the image's magic bytes.
fn sniff_mime(image: &[u8]) -> &'static str {
    image::guess_format(image)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}
