//! Stylesheet task: Sass compilation, vendor CSS, prefixing and minification.

use std::fs;
use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::config::BuildConfig;
use crate::task::{source_files, write_output, BuildError, BuildTask, TaskKind};

/// Name of the bundled stylesheet inside the css output folder.
pub const MAIN_CSS: &str = "main.css";

/// Compiles `styles/*.scss` and vendor CSS into `css/main.css`.
#[derive(Debug, Default)]
pub struct StylesTask;

impl BuildTask for StylesTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Styles
    }

    fn run(&self, config: &BuildConfig) -> Result<Vec<PathBuf>, BuildError> {
        let mut chunks = Vec::new();

        for vendor in &config.vendor_css {
            if vendor.exists() {
                let css = fs::read_to_string(vendor).map_err(|e| BuildError::read(vendor, e))?;
                chunks.push(css);
            } else {
                tracing::warn!("Vendor stylesheet not found: {}", vendor.display());
            }
        }

        for path in source_files(&config.styles_dir(), &["scss"])? {
            if is_partial(&path) {
                continue;
            }
            tracing::debug!("Compiling {}", path.display());
            chunks.push(compile_sass(&path)?);
        }

        let bundle = chunks.join("\n");
        let css = process_css(&bundle, config.minify).map_err(|message| BuildError::StyleError {
            path: MAIN_CSS.to_string(),
            message,
        })?;

        let output = config.css_output().join(MAIN_CSS);
        write_output(&output, css)?;

        Ok(vec![output])
    }
}

/// Sass partials (`_name.scss`) are only compiled through imports.
fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Compile one Sass entry point with grass.
pub fn compile_sass(path: &Path) -> Result<String, BuildError> {
    grass::from_path(path, &grass::Options::default()).map_err(|e| BuildError::StyleError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Browsers the generated CSS has to support; drives vendor prefixing.
fn browser_targets() -> Targets {
    Targets::from(Browsers {
        chrome: Some(80 << 16),
        edge: Some(88 << 16),
        firefox: Some(78 << 16),
        safari: Some(13 << 16),
        ios_saf: Some(13 << 16),
        ..Browsers::default()
    })
}

/// Add vendor prefixes for the supported browsers and optionally minify,
/// using lightningcss.
pub fn process_css(css: &str, minify: bool) -> Result<String, String> {
    let mut stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| format!("CSS parse error: {}", e))?;

    stylesheet
        .minify(MinifyOptions {
            targets: browser_targets(),
            ..Default::default()
        })
        .map_err(|e| format!("CSS transform error: {}", e))?;

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify,
            targets: browser_targets(),
            ..Default::default()
        })
        .map_err(|e| format!("CSS print error: {}", e))?;

    Ok(printed.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, SiteConfig};
    use tempfile::tempdir;

    fn config_in(root: &Path, mode: Mode) -> BuildConfig {
        let mut config = BuildConfig::new(SiteConfig::default(), mode);
        config.source_dir = root.join("src");
        config.output_dir = root.join("out");
        config
    }

    #[test]
    fn compiles_sass_with_partials() {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("src/styles");
        fs::create_dir_all(&styles).unwrap();
        fs::write(styles.join("_colors.scss"), "$accent: #ff0000;").unwrap();
        fs::write(
            styles.join("main.scss"),
            "@import 'colors';\n.button { .icon { color: $accent; } }",
        )
        .unwrap();

        let config = config_in(temp.path(), Mode::Development);
        let outputs = StylesTask.run(&config).unwrap();

        assert_eq!(outputs, vec![temp.path().join("out/css/main.css")]);
        let css = fs::read_to_string(&outputs[0]).unwrap();
        assert!(css.contains(".button .icon"));
        assert!(css.contains("red") || css.contains("#f00"));
    }

    #[test]
    fn prepends_vendor_css() {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("src/styles");
        fs::create_dir_all(&styles).unwrap();
        fs::write(styles.join("site.scss"), ".site { margin: 0; }").unwrap();
        let vendor = temp.path().join("reset.css");
        fs::write(&vendor, ".reset { padding: 0; }").unwrap();

        let mut config = config_in(temp.path(), Mode::Development);
        config.vendor_css = vec![vendor, temp.path().join("missing.css")];
        let outputs = StylesTask.run(&config).unwrap();

        let css = fs::read_to_string(&outputs[0]).unwrap();
        let reset = css.find(".reset").unwrap();
        let site = css.find(".site").unwrap();
        assert!(reset < site);
    }

    #[test]
    fn minifies_in_production() {
        let css = r#"
.button {
    background-color: blue;
    padding: 10px;
}
        "#;

        let minified = process_css(css, true).unwrap();

        assert!(!minified.contains('\n'));
        assert!(minified.contains(".button"));
    }

    #[test]
    fn adds_vendor_prefixes() {
        let css = ".card { user-select: none; }";

        let processed = process_css(css, false).unwrap();

        assert!(processed.contains("-webkit-user-select"));
    }

    #[test]
    fn reports_sass_errors() {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("src/styles");
        fs::create_dir_all(&styles).unwrap();
        fs::write(styles.join("broken.scss"), ".a { color: $undefined; }").unwrap();

        let err = StylesTask
            .run(&config_in(temp.path(), Mode::Development))
            .unwrap_err();

        assert!(matches!(err, BuildError::StyleError { .. }));
    }

    #[test]
    fn empty_source_still_writes_bundle() {
        let temp = tempdir().unwrap();

        let outputs = StylesTask
            .run(&config_in(temp.path(), Mode::Production))
            .unwrap();

        assert!(outputs[0].exists());
    }
}
