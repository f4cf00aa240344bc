//! Development server with live reload for sitepipe.
//!
//! Serves the build folder, watches the source tree, reruns the affected
//! build task on change and tells connected browsers to refresh.

pub mod livereload;
pub mod server;
pub mod watcher;

pub use livereload::{LiveReloadHub, ReloadMessage};
pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
