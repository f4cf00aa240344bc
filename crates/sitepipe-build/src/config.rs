//! Site configuration and resolved build settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Unminified output in the build folder, live reload enabled
    #[default]
    Development,
    /// Minified output in the dist folder
    Production,
}

impl Mode {
    /// Environment variable consulted by [`Mode::detect`].
    pub const ENV_VAR: &'static str = "SITEPIPE_ENV";

    /// Interpret the value of [`Mode::ENV_VAR`].
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("production") => Mode::Production,
            _ => Mode::Development,
        }
    }

    /// Production when forced by a flag, otherwise whatever the environment says.
    pub fn detect(production: bool) -> Self {
        if production {
            return Mode::Production;
        }
        Self::from_env_value(std::env::var(Self::ENV_VAR).ok().as_deref())
    }

    pub fn is_production(self) -> bool {
        self == Mode::Production
    }
}

/// Configuration file structure (sitepipe.toml).
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct SiteConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub vendor: VendorConfig,
    /// Constants exposed to page templates
    #[serde(default)]
    pub constants: toml::Table,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PathsConfig {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_build")]
    pub build: String,
    #[serde(default = "default_dist")]
    pub dist: String,
    #[serde(default = "default_page_extension")]
    pub page_extension: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            build: default_build(),
            dist: default_dist(),
            page_extension: default_page_extension(),
        }
    }
}

/// Third-party files bundled ahead of the project's own output.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct VendorConfig {
    #[serde(default)]
    pub css: Vec<String>,
    #[serde(default)]
    pub js: Vec<String>,
}

fn default_source() -> String {
    "src".to_string()
}
fn default_build() -> String {
    "build".to_string()
}
fn default_dist() -> String {
    "dist".to_string()
}
fn default_page_extension() -> String {
    "jinja".to_string()
}

/// Errors that can occur while loading the site configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl SiteConfig {
    /// Load configuration from `path`.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Resolved settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub mode: Mode,

    /// Source root (`styles/`, `scripts/`, `pages/`, `fonts/`, `images/`)
    pub source_dir: PathBuf,

    /// Output folder
    pub output_dir: PathBuf,

    /// Single extension of page templates, without the dot
    pub page_extension: String,

    pub vendor_css: Vec<PathBuf>,
    pub vendor_js: Vec<PathBuf>,

    /// Constants exposed to page templates
    pub constants: toml::Table,

    /// Minify CSS and JS output
    pub minify: bool,

    /// Append inline source maps to transpiled scripts
    pub source_maps: bool,

    /// Inject the live reload client into rendered pages
    pub live_reload: bool,
}

impl BuildConfig {
    pub fn new(site: SiteConfig, mode: Mode) -> Self {
        let output = match mode {
            Mode::Production => &site.paths.dist,
            Mode::Development => &site.paths.build,
        };

        Self {
            mode,
            source_dir: PathBuf::from(&site.paths.source),
            output_dir: PathBuf::from(output),
            page_extension: site.paths.page_extension.to_ascii_lowercase(),
            vendor_css: site.vendor.css.iter().map(PathBuf::from).collect(),
            vendor_js: site.vendor.js.iter().map(PathBuf::from).collect(),
            constants: site.constants,
            minify: mode.is_production(),
            source_maps: !mode.is_production(),
            live_reload: !mode.is_production(),
        }
    }

    pub fn styles_dir(&self) -> PathBuf {
        self.source_dir.join("styles")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.source_dir.join("scripts")
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.source_dir.join("pages")
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.source_dir.join("fonts")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.source_dir.join("images")
    }

    /// Glob matching page template file names, ignoring the case of the
    /// extension the same way source listing does.
    pub fn page_pattern(&self) -> String {
        let mut pattern = String::from("*.");
        for c in self.page_extension.chars() {
            if c.is_ascii_alphabetic() {
                pattern.push('[');
                pattern.push(c.to_ascii_lowercase());
                pattern.push(c.to_ascii_uppercase());
                pattern.push(']');
            } else {
                pattern.push_str(&glob::Pattern::escape(&c.to_string()));
            }
        }
        pattern
    }

    pub fn css_output(&self) -> PathBuf {
        self.output_dir.join("css")
    }

    pub fn js_output(&self) -> PathBuf {
        self.output_dir.join("js")
    }

    pub fn fonts_output(&self) -> PathBuf {
        self.output_dir.join("fonts")
    }

    pub fn images_output(&self) -> PathBuf {
        self.output_dir.join("images")
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new(SiteConfig::default(), Mode::Development)
    }
}
