//! HTTP client for the remote conversion pipeline.

use crate::config::ConvertConfig;
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A file received from the browser, ready to forward.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// What the pipeline said about a submitted task.
#[derive(Debug)]
pub struct TaskReceipt {
    pub status: StatusCode,
}

impl TaskReceipt {
    pub fn accepted(&self) -> bool {
        self.status == StatusCode::OK
    }
}

#[derive(Clone)]
pub struct PipelineClient {
    client: Client,
    task_url: String,
    token: String,
    upload_timeout: Duration,
    download_timeout: Duration,
}

impl PipelineClient {
    pub fn new(client: Client, config: &ConvertConfig) -> Self {
        Self {
            client,
            task_url: config.task_url(),
            token: config.token.clone(),
            upload_timeout: config.upload_timeout,
            download_timeout: config.download_timeout,
        }
    }

    /// Submit a file plus instruction as a new pipeline task.
    ///
    /// Transport failures (including the timeout) are errors; any HTTP
    /// status, 200 or not, is returned in the receipt.
    pub async fn submit_task(
        &self,
        file: UploadedFile,
        instruction: &str,
        uuid: Option<&str>,
    ) -> Result<TaskReceipt> {
        let envelope = json!({
            "user_document": { "uuid": uuid },
            "ffmpeg_request": instruction,
        });
        debug!("Task envelope: {}", envelope);

        let file_part = file_part(file)?;
        let json_part = Part::bytes(serde_json::to_vec(&envelope)?)
            .mime_str("application/json")
            .context("Failed to build json_data part")?;

        let form = Form::new().part("file", file_part).part("json_data", json_part);

        let response = self
            .client
            .post(&self.task_url)
            .query(&[("token", self.token.as_str())])
            .timeout(self.upload_timeout)
            .multipart(form)
            .send()
            .await
            .context("Failed to send task to pipeline")?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => info!("Pipeline task response ({}): {}", status, value),
            Err(_) => info!("Pipeline task response ({}), non-JSON body", status),
        }

        Ok(TaskReceipt { status })
    }

    /// Fetch a finished artifact, authenticating with the pipeline token.
    pub async fn fetch_artifact(&self, uri: &str) -> Result<Vec<u8>> {
        info!("Fetching artifact from {}", uri);
        let response = self
            .client
            .get(uri)
            .query(&[("token", self.token.as_str())])
            .timeout(self.download_timeout)
            .send()
            .await
            .with_context(|| format!("Failed to request artifact {}", uri))?;

        let status = response.status();
        if status != StatusCode::OK {
            anyhow::bail!("Artifact download from {} returned {}", uri, status);
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read artifact body from {}", uri))?;
        Ok(bytes.to_vec())
    }
}

/// Build the `file` part, dropping a browser content type that is not a
/// valid MIME type.
fn file_part(file: UploadedFile) -> Result<Part> {
    let content_type = file.content_type.filter(|content_type| {
        let valid = Part::text("").mime_str(content_type).is_ok();
        if !valid {
            warn!(
                "Forwarding {:?} without its invalid content type {:?}",
                file.filename, content_type
            );
        }
        valid
    });

    let part = Part::bytes(file.data).file_name(file.filename);
    match content_type {
        Some(content_type) => part
            .mime_str(&content_type)
            .with_context(|| format!("Invalid upload content type {:?}", content_type)),
        None => Ok(part),
    }
}
