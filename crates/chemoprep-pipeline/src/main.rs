//! chemoprep — drug feature-preparation pipeline entry point.

use tracing::info;
use tracing_subscriber::EnvFilter;

use chemoprep_common::PrepConfig;
use chemoprep_descriptors::PadelRunner;
use chemoprep_pipeline::run_prep;
use chemoprep_pubchem::PubChemClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chemoprep=debug,info")),
        )
        .init();

    info!("chemoprep starting up");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let cfg = match PrepConfig::load() {
        Ok(c) => {
            info!(input = %c.input.path, artifacts = %c.artifacts.dir, "Configuration loaded");
            c
        }
        Err(e) => {
            tracing::warn!("Could not load chemoprep.toml: {e}");
            tracing::warn!("Copy chemoprep.example.toml to chemoprep.toml and edit it.");
            return Ok(());
        }
    };

    let client = PubChemClient::new(&cfg.resolver)?;
    let runner = PadelRunner::new(cfg.descriptors.tool.clone());

    let summary = run_prep(&cfg, &client, &runner).await?;

    info!(
        rows = summary.rows_out,
        path = %cfg.artifacts.feature_path().display(),
        "Feature table written"
    );
    for failure in &summary.resolution_failures {
        info!(drug_id = %failure.drug_id, reason = %failure.reason, "Unresolved drug");
    }

    Ok(())
}
