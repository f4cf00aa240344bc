//! Static site build command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sitepipe_build::{BuildConfig, Mode, Pipeline, SiteConfig};

/// Load the site config and resolve it for `mode`.
pub fn load_build_config(
    config_path: &Path,
    mode: Mode,
    output: Option<PathBuf>,
) -> Result<BuildConfig> {
    let site = SiteConfig::load(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let mut config = BuildConfig::new(site, mode);
    if let Some(output) = output {
        config.output_dir = output;
    }
    Ok(config)
}

/// Run the build command.
pub async fn run(config_path: &Path, mode: Mode, output: Option<PathBuf>) -> Result<()> {
    let config = load_build_config(config_path, mode, output)?;
    let pipeline = Pipeline::new(config);

    let result = tokio::task::spawn_blocking(move || pipeline.run())
        .await
        .context("Build task panicked")?
        .context("Build failed")?;

    tracing::info!(
        "Built {} files in {}ms",
        result.files(),
        result.duration_ms
    );
    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
