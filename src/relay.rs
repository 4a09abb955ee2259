//! Upload relay and callback handling for the conversion front end.

use crate::artifact_store::ArtifactStore;
use crate::callback::CallbackPayload;
use crate::config::ConvertConfig;
use crate::error::RelayError;
use crate::messages::{ServerMessage, Status};
use crate::pipeline::{PipelineClient, UploadedFile};
use crate::registry::SessionRegistry;
use tracing::{error, info};

pub const DEFAULT_INSTRUCTION: &str = "Convert to a 640 wide gif";

/// Ties the pipeline client, artifact store and session registry together.
#[derive(Clone)]
pub struct ConvertRelay {
    pipeline: PipelineClient,
    store: ArtifactStore,
    registry: SessionRegistry,
    config: ConvertConfig,
}

impl ConvertRelay {
    pub fn new(
        pipeline: PipelineClient,
        store: ArtifactStore,
        registry: SessionRegistry,
        config: ConvertConfig,
    ) -> Self {
        Self {
            pipeline,
            store,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Forward an upload to the pipeline and broadcast the outcome.
    ///
    /// Returns the caller-facing success message.
    pub async fn relay_upload(
        &self,
        file: Option<UploadedFile>,
        instruction: Option<&str>,
        uuid: Option<&str>,
    ) -> Result<&'static str, RelayError> {
        let file = file.ok_or(RelayError::MissingFile)?;
        let instruction = instruction.unwrap_or(DEFAULT_INSTRUCTION);
        info!("Received instructions: {}", instruction);
        info!(
            "Relaying {} ({} bytes) for session {:?}",
            file.filename,
            file.data.len(),
            uuid
        );

        let receipt = match self.pipeline.submit_task(file, instruction, uuid).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!("Pipeline submission failed: {:#}", e);
                self.broadcast_failure();
                return Err(RelayError::Unreachable(e));
            }
        };

        if receipt.accepted() {
            self.registry.deliver(
                ServerMessage::relay(Status::Success, "File uploaded successfully!"),
                None,
            );
            Ok("File uploaded successfully")
        } else {
            error!("Pipeline rejected task with status {}", receipt.status);
            self.broadcast_failure();
            Err(RelayError::Rejected)
        }
    }

    fn broadcast_failure(&self) {
        self.registry.deliver(
            ServerMessage::relay(Status::Error, "File upload failed, sorry."),
            None,
        );
    }

    /// Handle a completion callback: fetch the artifact if one is named, then
    /// notify the session that started the job.
    pub async fn handle_callback(&self, payload: CallbackPayload) -> Result<(), RelayError> {
        let (convert_uri, filename) = match (payload.convert_uri, payload.filename) {
            (Some(uri), Some(filename)) => {
                let link = self.download_artifact(&uri, &filename).await?;
                (link, filename)
            }
            // Nothing to fetch without a filename; pass the remote link through.
            (Some(uri), None) => (uri, String::new()),
            (None, _) => (String::new(), String::new()),
        };

        info!("Notifying session {}", payload.recipient);
        self.registry.deliver(
            ServerMessage::Job {
                status: Status::Success,
                message: payload.message,
                convert_uri,
                filename,
            },
            Some(&payload.recipient),
        );
        Ok(())
    }

    async fn download_artifact(&self, uri: &str, filename: &str) -> Result<String, RelayError> {
        // Validate before spending a download on a name we cannot store.
        self.store.path_for(filename).map_err(|e| {
            error!("Refusing artifact from {}: {}", uri, e);
            RelayError::Artifact(e.into())
        })?;

        let data = self.pipeline.fetch_artifact(uri).await.map_err(|e| {
            error!("Failed to download file from {}: {:#}", uri, e);
            RelayError::Artifact(e)
        })?;
        let path = self.store.save(filename, &data).await.map_err(|e| {
            error!("Failed to store {}: {:#}", filename, e);
            RelayError::Artifact(e)
        })?;
        info!("File downloaded successfully: {:?}", path);

        let link = self.config.download_link(filename);
        info!("Download link: {}", link);
        Ok(link)
    }
}
