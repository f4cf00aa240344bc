//! Development server command.

use std::path::Path;

use anyhow::{Context, Result};
use sitepipe_build::{Mode, Pipeline};
use sitepipe_server::{DevServer, DevServerConfig};

use super::build::load_build_config;

/// Build once for development, then serve and rebuild on change.
pub async fn run(config_path: &Path, port: u16, open: bool) -> Result<()> {
    let build = load_build_config(config_path, Mode::Development, None)?;

    let pipeline = Pipeline::new(build.clone());
    let result = tokio::task::spawn_blocking(move || pipeline.run())
        .await
        .context("Build task panicked")?
        .context("Initial build failed")?;
    tracing::info!("Built {} files in {}ms", result.files(), result.duration_ms);

    tracing::info!("Starting development server on port {}", port);

    let config = DevServerConfig {
        build,
        port,
        open,
        ..Default::default()
    };

    DevServer::new(config).start().await?;

    Ok(())
}
