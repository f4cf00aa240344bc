//! Build pipeline: runs the tasks in order and fans out the independent ones.

use std::path::PathBuf;
use std::time::Instant;

use crate::config::BuildConfig;
use crate::files::{CleanTask, FontsTask};
use crate::images::ImagesTask;
use crate::pages::PagesTask;
use crate::scripts::ScriptsTask;
use crate::styles::StylesTask;
use crate::task::{BuildError, BuildTask, TaskKind, TaskReport};

/// Tasks that run one after another before the parallel stage.
const SEQUENTIAL: [TaskKind; 3] = [TaskKind::Clean, TaskKind::Styles, TaskKind::Scripts];

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// One report per task, in the order the tasks were started
    pub reports: Vec<TaskReport>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

impl BuildResult {
    /// Total number of files written.
    pub fn files(&self) -> usize {
        self.reports.iter().map(|r| r.files.len()).sum()
    }
}

/// Runs build tasks against one [`BuildConfig`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: BuildConfig,
}

impl Pipeline {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Full build: clean, styles, scripts, then pages, fonts and images in
    /// parallel.
    pub fn run(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        tracing::info!(
            "Building {} into {} ({:?})",
            self.config.source_dir.display(),
            self.config.output_dir.display(),
            self.config.mode
        );

        let mut reports = Vec::new();
        for kind in SEQUENTIAL {
            reports.push(self.run_task(kind)?);
        }

        let (pages, (fonts, images)) = rayon::join(
            || self.run_task(TaskKind::Pages),
            || {
                rayon::join(
                    || self.run_task(TaskKind::Fonts),
                    || self.run_task(TaskKind::Images),
                )
            },
        );
        reports.push(pages?);
        reports.push(fonts?);
        reports.push(images?);

        Ok(BuildResult {
            reports,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Run a single task, as the watcher does after a source change.
    pub fn run_task(&self, kind: TaskKind) -> Result<TaskReport, BuildError> {
        let start = Instant::now();

        let files = task(kind).run(&self.config)?;

        let report = TaskReport {
            task: kind,
            files,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            "Finished {} ({} files) in {}ms",
            kind,
            report.files.len(),
            report.duration_ms
        );

        Ok(report)
    }
}

fn task(kind: TaskKind) -> &'static dyn BuildTask {
    match kind {
        TaskKind::Clean => &CleanTask,
        TaskKind::Styles => &StylesTask,
        TaskKind::Scripts => &ScriptsTask,
        TaskKind::Pages => &PagesTask,
        TaskKind::Fonts => &FontsTask,
        TaskKind::Images => &ImagesTask,
    }
}
