//! Page manifest listing command.

use std::path::Path;

use anyhow::{Context, Result};
use sitepipe_build::Mode;
use sitepipe_pages::build_manifest;

use super::build::load_build_config;

/// Print one manifest entry per line.
pub fn run(config_path: &Path, sort: bool) -> Result<()> {
    let config = load_build_config(config_path, Mode::Development, None)?;
    let pages_dir = config.pages_dir();

    let manifest = build_manifest(&pages_dir, &config.page_pattern())
        .with_context(|| format!("Failed to list pages in {}", pages_dir.display()))?;
    let manifest = if sort { manifest.sorted() } else { manifest };

    tracing::debug!("Found {} pages in {}", manifest.len(), pages_dir.display());
    for page in manifest.iter() {
        println!("{page}");
    }

    Ok(())
}
