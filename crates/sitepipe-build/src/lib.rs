//! Asset pipeline for sitepipe.
//!
//! Compiles stylesheets, transpiles scripts, renders page templates and copies
//! or optimizes static assets from a source tree into a build folder.

pub mod config;
pub mod files;
pub mod images;
pub mod pages;
pub mod pipeline;
pub mod scripts;
pub mod styles;
pub mod task;

pub use config::{BuildConfig, ConfigError, Mode, SiteConfig};
pub use pages::LIVE_RELOAD_SCRIPT;
pub use pipeline::{BuildResult, Pipeline};
pub use task::{BuildError, BuildTask, TaskKind, TaskReport};
