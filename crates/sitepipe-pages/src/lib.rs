//! Page manifest discovery and template context.
//!
//! Scans a pages directory for template files, derives the list of output
//! page names and combines it with site constants into the data handed to
//! the template renderer.

pub mod context;
pub mod manifest;

pub use context::TemplateContext;
pub use manifest::{build_manifest, page_identifier, ManifestError, PageManifest};
