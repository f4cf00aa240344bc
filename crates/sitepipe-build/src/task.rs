//! Build task trait and shared task types.

use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::BuildConfig;

/// The individual steps of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Clean,
    Styles,
    Scripts,
    Pages,
    Fonts,
    Images,
}

impl TaskKind {
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Clean => "clean",
            TaskKind::Styles => "styles",
            TaskKind::Scripts => "scripts",
            TaskKind::Pages => "pages",
            TaskKind::Fonts => "fonts",
            TaskKind::Images => "images",
        }
    }

    /// The task that owns a changed source file, judged by the first folder
    /// below the source root.
    pub fn for_source(source_dir: &Path, path: &Path) -> Option<TaskKind> {
        let relative = path.strip_prefix(source_dir).ok()?;
        let folder = relative.components().next()?.as_os_str().to_str()?;

        // A bare file directly in the source root belongs to no task.
        if relative.components().count() < 2 {
            return None;
        }

        match folder {
            "styles" => Some(TaskKind::Styles),
            "scripts" => Some(TaskKind::Scripts),
            "pages" => Some(TaskKind::Pages),
            "fonts" => Some(TaskKind::Fonts),
            "images" => Some(TaskKind::Images),
            _ => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of running one task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: TaskKind,

    /// Files written to the output folder
    pub files: Vec<PathBuf>,

    pub duration_ms: u64,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Failed to write output: {0}")]
    WriteError(String),

    #[error("Failed to compile stylesheet {path}: {message}")]
    StyleError { path: String, message: String },

    #[error("Failed to process script {path}: {message}")]
    ScriptError { path: String, message: String },

    #[error("Failed to render page {path}: {message}")]
    TemplateError { path: String, message: String },

    #[error("Failed to optimize image {path}: {message}")]
    ImageError { path: String, message: String },

    #[error(transparent)]
    Manifest(#[from] sitepipe_pages::ManifestError),
}

impl BuildError {
    pub(crate) fn read(path: &Path, err: impl fmt::Display) -> Self {
        BuildError::ReadError {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, err: impl fmt::Display) -> Self {
        BuildError::WriteError(format!("{}: {}", path.display(), err))
    }
}

/// One step of the pipeline.
pub trait BuildTask: Send + Sync {
    fn kind(&self) -> TaskKind;

    /// Run the task, returning the files it wrote.
    fn run(&self, config: &BuildConfig) -> Result<Vec<PathBuf>, BuildError>;
}

/// Files directly inside `dir` whose extension is in `extensions`, sorted by
/// name. An empty `extensions` accepts every file. A missing directory has no
/// files.
pub(crate) fn source_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, BuildError> {
    if !dir.exists() {
        tracing::debug!("Source folder {} not found, skipping", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| BuildError::read(dir, e))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        if extensions.is_empty() || extensions.contains(&ext.as_str()) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Create the parent folder of `path` and write `contents` to it.
pub(crate) fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BuildError::write(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| BuildError::write(path, e))
}
