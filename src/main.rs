//! convert-relay - upload relay and job notifications for the conversion UI.

use mitta_relay::artifact_store::ArtifactStore;
use mitta_relay::config::ConvertConfig;
use mitta_relay::instructions::InstructionPage;
use mitta_relay::pipeline::PipelineClient;
use mitta_relay::registry::SessionRegistry;
use mitta_relay::relay::ConvertRelay;
use mitta_relay::routes::convert::{self, ConvertState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    mitta_relay::init_tracing();

    let config = ConvertConfig::from_env()?;
    info!(
        "Pipeline {} at {}, artifacts in {:?}",
        config.pipeline_id, config.pipeline_base_url, config.download_dir
    );

    let pipeline = PipelineClient::new(reqwest::Client::new(), &config);
    let store = ArtifactStore::new(config.download_dir.clone());
    let relay = ConvertRelay::new(pipeline, store, SessionRegistry::new(), config.clone());

    let state = ConvertState {
        relay,
        page: Arc::new(InstructionPage::new()?),
    };
    let app = convert::router(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Server listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
