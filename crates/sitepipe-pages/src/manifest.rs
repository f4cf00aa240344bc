//! Page manifest discovery.
//!
//! Walks a pages directory and turns every template file into the name of the
//! HTML page it will produce, so templates can link to their siblings.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use glob::Pattern;
use regex::Regex;
use walkdir::WalkDir;

/// File names that never become pages of their own.
const RESERVED: [&str; 2] = ["index", "layout"];

/// Stem made only of ASCII word characters and hyphens, then one extension.
static PAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_-]+)\.[^.]+$").expect("valid page name regex"));

/// Ordered list of output page names (`about.html`, `post-1.html`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct PageManifest {
    entries: Vec<String>,
}

impl PageManifest {
    /// Page names in discovery order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.entries
    }

    /// Copy of the manifest in lexicographic order.
    pub fn sorted(&self) -> Self {
        let mut entries = self.entries.clone();
        entries.sort();
        Self { entries }
    }
}

impl IntoIterator for PageManifest {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Errors that can occur while scanning for pages.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Invalid page pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to scan pages directory {root}: {source}")]
    Scan {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Extract the page identifier from a template file name.
///
/// Returns `None` when the stem contains anything besides ASCII letters,
/// digits, `-` and `_`, or when the name has no extension.
pub fn page_identifier(file_name: &str) -> Option<&str> {
    PAGE_NAME
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Build the page manifest for every file under `root` whose name matches
/// `pattern`, nested directories included.
///
/// Files named `index.*` or `layout.*` are left out, as are files whose
/// names do not form a valid identifier. Directories are visited in file
/// name order, so the result is stable for an unchanged tree.
pub fn build_manifest(root: &Path, pattern: &str) -> Result<PageManifest, ManifestError> {
    let matcher = Pattern::new(pattern).map_err(|source| ManifestError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut entries = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|source| ManifestError::Scan {
            root: root.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };

        if !matcher.matches(file_name) {
            continue;
        }

        match page_identifier(file_name) {
            Some(id) if !RESERVED.contains(&id) => entries.push(format!("{id}.html")),
            Some(_) => {}
            None => tracing::trace!("Skipping page with unsupported name: {}", entry.path().display()),
        }
    }

    Ok(PageManifest { entries })
}
