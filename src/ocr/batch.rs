//! Batch OCR over downloaded images.

use super::{Detection, OcrEngine, Point, ReadOptions};
use crate::error::OcrError;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// One validated (image URI, page number) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadItem {
    pub uri: String,
    pub page_num: i64,
}

/// `/read` response: three lists aligned with the request order.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct ReadResponse {
    pub texts: Vec<Vec<String>>,
    pub coords: Vec<Vec<Vec<Point>>>,
    pub page_nums: Vec<i64>,
}

/// Validate a `/read` body into items.
///
/// Checks run in a fixed order: presence, list type, element types, length.
pub fn parse_read_request(body: &Value) -> Result<Vec<ReadItem>, OcrError> {
    let uris = body.get("mitta_uri");
    let pages = body.get("page_nums");

    if !is_present(uris) || !is_present(pages) {
        return Err(OcrError::Validation(
            "Both `mitta_uri` and `page_nums` are required.",
        ));
    }

    let (Some(Value::Array(uris)), Some(Value::Array(pages))) = (uris, pages) else {
        return Err(OcrError::Validation(
            "`mitta_uri` and `page_nums` must be lists.",
        ));
    };

    if uris.len() != pages.len() {
        return Err(OcrError::Validation(
            "The number of `mitta_uri` and `page_nums` must be the same.",
        ));
    }

    uris.iter()
        .zip(pages)
        .map(|(uri, page)| match (uri.as_str(), page.as_i64()) {
            (Some(uri), Some(page_num)) => Ok(ReadItem {
                uri: uri.to_string(),
                page_num,
            }),
            _ => Err(OcrError::Validation(
                "`mitta_uri` must hold strings and `page_nums` integers.",
            )),
        })
        .collect()
}

/// Missing, null, empty and falsy values all count as absent.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Downloads images and runs them through the engine one at a time.
pub struct OcrRelay {
    engine: Arc<dyn OcrEngine>,
    client: reqwest::Client,
    image_timeout: Duration,
    options: ReadOptions,
    // Held for a whole batch: one request owns the GPU at a time.
    gate: Mutex<()>,
}

impl OcrRelay {
    pub fn new(engine: Arc<dyn OcrEngine>, client: reqwest::Client, image_timeout: Duration) -> Self {
        Self {
            engine,
            client,
            image_timeout,
            options: ReadOptions::default(),
            gate: Mutex::new(()),
        }
    }

    /// Recognize every item in order. Any failure aborts the batch.
    pub async fn read_batch(&self, items: &[ReadItem]) -> Result<ReadResponse, OcrError> {
        let _gpu = self.gate.lock().await;
        let mut response = ReadResponse::default();

        for item in items {
            info!(
                "Received /read for '{}', page number: {} (engine={})",
                item.uri,
                item.page_num,
                self.engine.name()
            );

            let image = self.download(&item.uri).await?;
            let detections = self.recognize(&item.uri, &image).await?;

            let (texts, coords): (Vec<String>, Vec<Vec<Point>>) = detections
                .into_iter()
                .map(|d| (d.text, d.bbox))
                .unzip();
            response.texts.push(texts);
            response.coords.push(coords);
            response.page_nums.push(item.page_num);
        }

        Ok(response)
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>, OcrError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                warn!("Timeout occurred while downloading image from '{}'", uri);
                OcrError::Timeout(uri.to_string())
            } else {
                OcrError::Download {
                    uri: uri.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(uri)
            .timeout(self.image_timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::Download {
                uri: uri.to_string(),
                reason: format!("status {}", status),
            });
        }

        let bytes = response.bytes().await.map_err(classify)?;
        Ok(bytes.to_vec())
    }

    /// Run the engine, release it, and order regions top to bottom.
    async fn recognize(&self, uri: &str, image: &[u8]) -> Result<Vec<Detection>, OcrError> {
        let result = self.engine.read_text(image, &self.options).await;

        if let Err(e) = self.engine.release().await {
            warn!("Failed to release {} engine state: {:#}", self.engine.name(), e);
        }

        let mut detections = result.map_err(|reason| OcrError::Engine {
            uri: uri.to_string(),
            reason,
        })?;
        // Stable, so regions on the same line keep engine order.
        detections.sort_by(|a, b| a.top().total_cmp(&b.top()));
        Ok(detections)
    }
}
