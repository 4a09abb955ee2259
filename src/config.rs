//! Environment-driven configuration for both relay services.
//!
//! Values come from the process environment; `main` loads an optional `.env`
//! file first.

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PIPELINE_BASE_URL: &str = "https://mitta.ai";
const DEFAULT_PUBLIC_BASE_URL: &str = "https://ai.mitta.ai";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5000,https://ai.mitta.ai";
const DEFAULT_EASYOCR_URL: &str = "http://localhost:8866";

/// Settings for the conversion front end.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Remote pipeline id (`FFMPEG_PIPELINE`).
    pub pipeline_id: String,
    /// Token used both to post tasks and to fetch artifacts (`MITTA_TOKEN`).
    pub token: String,
    pub pipeline_base_url: String,
    /// Origin prefixed to `/download/<filename>` links sent to browsers.
    pub public_base_url: String,
    pub download_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub upload_timeout: Duration,
    pub download_timeout: Duration,
    pub bind: SocketAddr,
}

impl ConvertConfig {
    pub fn from_env() -> Result<Self> {
        let pipeline_id = env::var("FFMPEG_PIPELINE")
            .context("FFMPEG_PIPELINE environment variable not set")?;
        let token =
            env::var("MITTA_TOKEN").context("MITTA_TOKEN environment variable not set")?;

        Ok(Self {
            pipeline_id,
            token,
            pipeline_base_url: var_or("PIPELINE_BASE_URL", DEFAULT_PIPELINE_BASE_URL),
            public_base_url: var_or("PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL),
            download_dir: PathBuf::from(var_or("DOWNLOAD_DIR", "download")),
            allowed_origins: split_list(&var_or("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)),
            upload_timeout: secs_var("UPLOAD_TIMEOUT_SECS", 30)?,
            download_timeout: secs_var("DOWNLOAD_TIMEOUT_SECS", 60)?,
            bind: addr_var("CONVERT_BIND", "0.0.0.0:5000")?,
        })
    }

    /// Task submission endpoint, without the token query parameter.
    pub fn task_url(&self) -> String {
        format!(
            "{}/pipeline/{}/task",
            self.pipeline_base_url.trim_end_matches('/'),
            self.pipeline_id
        )
    }

    /// Public link under which a downloaded artifact is served.
    pub fn download_link(&self, filename: &str) -> String {
        format!(
            "{}/download/{}",
            self.public_base_url.trim_end_matches('/'),
            filename
        )
    }
}

/// Settings for the OCR endpoint.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub easyocr_url: String,
    pub image_timeout: Duration,
    pub bind: SocketAddr,
}

impl OcrConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            easyocr_url: var_or("EASYOCR_URL", DEFAULT_EASYOCR_URL),
            image_timeout: secs_var("IMAGE_TIMEOUT_SECS", 60)?,
            bind: addr_var("OCR_BIND", "0.0.0.0:5001")?,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn secs_var(key: &str, default: u64) -> Result<Duration> {
    match env::var(key) {
        Ok(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds, got {:?}", key, raw))?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

fn addr_var(key: &str, default: &str) -> Result<SocketAddr> {
    let raw = var_or(key, default);
    raw.parse()
        .with_context(|| format!("{} is not a valid socket address: {:?}", key, raw))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConvertConfig {
        ConvertConfig {
            pipeline_id: "pipe42".to_string(),
            token: "secret".to_string(),
            pipeline_base_url: "https://mitta.ai/".to_string(),
            public_base_url: "https://ai.mitta.ai".to_string(),
            download_dir: PathBuf::from("download"),
            allowed_origins: vec![],
            upload_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60),
            bind: "127.0.0.1:5000".parse().unwrap(),
        }
    }

    #[test]
    fn test_task_url() {
        assert_eq!(sample().task_url(), "https://mitta.ai/pipeline/pipe42/task");
    }

    #[test]
    fn test_download_link() {
        assert_eq!(
            sample().download_link("clip.gif"),
            "https://ai.mitta.ai/download/clip.gif"
        );
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" http://a , ,https://b"),
            vec!["http://a".to_string(), "https://b".to_string()]
        );
    }
}
