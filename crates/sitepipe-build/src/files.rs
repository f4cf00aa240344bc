//! Plain file tasks: cleaning the output folder and copying fonts.

use std::fs;
use std::path::PathBuf;

use crate::config::BuildConfig;
use crate::task::{source_files, BuildError, BuildTask, TaskKind};

/// Removes the output folder so no stale files survive a build.
#[derive(Debug, Default)]
pub struct CleanTask;

impl BuildTask for CleanTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Clean
    }

    fn run(&self, config: &BuildConfig) -> Result<Vec<PathBuf>, BuildError> {
        let output = &config.output_dir;
        if output.exists() {
            fs::remove_dir_all(output).map_err(|e| BuildError::write(output, e))?;
            tracing::debug!("Removed {}", output.display());
        }
        Ok(Vec::new())
    }
}

/// Copies `fonts/*` unchanged.
#[derive(Debug, Default)]
pub struct FontsTask;

impl BuildTask for FontsTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Fonts
    }

    fn run(&self, config: &BuildConfig) -> Result<Vec<PathBuf>, BuildError> {
        let sources = source_files(&config.fonts_dir(), &[])?;
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let target = config.fonts_output();
        fs::create_dir_all(&target).map_err(|e| BuildError::write(&target, e))?;

        let mut outputs = Vec::with_capacity(sources.len());
        for source in sources {
            let Some(name) = source.file_name() else {
                continue;
            };
            let dest = target.join(name);
            fs::copy(&source, &dest).map_err(|e| BuildError::write(&dest, e))?;
            outputs.push(dest);
        }

        Ok(outputs)
    }
}
