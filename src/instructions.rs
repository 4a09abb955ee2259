//! Instruction picker page.

use anyhow::{Context, Result};
use tera::Tera;

const TEMPLATE_NAME: &str = "index.html";
const TEMPLATE: &str = include_str!("../templates/index.html");

/// Suggestions shown in the picker, most useful first.
pub const DEFAULT_INSTRUCTIONS: &[&str] = &[
    "Rotate image by 90 degrees",
    "Resize width to 420 and crop to 420 high",
    "Convert to JPEG with quality 85",
    "Resize to 1080p HD resolution",
    "Extract first frame as PNG",
    "Convert to grayscale",
    "Apply sepia tone effect",
    "Enhance brightness and contrast",
    "Create a 5-second GIF from video",
    "Extract audio from video as MP3",
    "Convert to MP4 with H.264 encoding",
    "Trim video to first 10 seconds",
    "Convert to 360p WebM format",
    "Increase playback speed by 2x",
    "Create a thumbnail at the first minute",
    "Overlay text 'LOL' on image",
    "Flip image horizontally",
    "Normalize audio in a video file",
    "Compress to a smaller file size",
    "Convert audio to MP3 format",
    "Convert video to animated GIF",
    "Extract subtitles from a video",
];

/// Default list with `posted` placed on top when it is new.
pub fn instruction_list(posted: Option<&str>) -> Vec<String> {
    let mut list: Vec<String> = DEFAULT_INSTRUCTIONS.iter().map(|s| s.to_string()).collect();
    if let Some(posted) = posted.map(str::trim).filter(|s| !s.is_empty()) {
        if !list.iter().any(|existing| existing == posted) {
            list.insert(0, posted.to_string());
        }
    }
    list
}

/// Compiled page template.
pub struct InstructionPage {
    tera: Tera,
}

impl InstructionPage {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
            .context("Failed to compile instruction page template")?;
        Ok(Self { tera })
    }

    pub fn render(&self, instructions: &[String]) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("instructions", instructions);
        self.tera
            .render(TEMPLATE_NAME, &context)
            .context("Failed to render instruction page")
    }
}
