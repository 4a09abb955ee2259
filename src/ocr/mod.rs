//! OCR engine abstraction.
//!
//! Defines the [`OcrEngine`] trait the `/read` relay drives, so the
//! recognition backend (an EasyOCR sidecar in production, fakes in tests)
//! can be swapped without touching the relay.

pub mod batch;
pub mod easyocr;

use serde::{Deserialize, Serialize};

/// A polygon point, `[x, y]` in image pixels, kept as the engine wrote it
/// (EasyOCR emits integers in paragraph mode).
pub type Point = [serde_json::Number; 2];

/// One recognized region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Corner points, top-left first.
    pub bbox: Vec<Point>,
    pub text: String,
}

impl Detection {
    /// Vertical coordinate of the top-left corner, used for reading order.
    pub fn top(&self) -> f64 {
        self.bbox
            .first()
            .and_then(|p| p[1].as_f64())
            .unwrap_or(0.0)
    }
}

/// Recognition knobs forwarded to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadOptions {
    /// Merge nearby lines into paragraphs.
    pub paragraph: bool,
    pub height_ths: f64,
    pub width_ths: f64,
    /// Return boxes alongside text.
    pub detail: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            paragraph: true,
            height_ths: 5.0,
            width_ths: 0.8,
            detail: true,
        }
    }
}

/// Async trait implemented by each recognition backend.
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn read_text(&self, image: &[u8], options: &ReadOptions)
        -> anyhow::Result<Vec<Detection>>;

    /// Drop any GPU-resident state held since the last call.
    async fn release(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
