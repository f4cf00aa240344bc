//! Page task: renders page templates with the site constants and page manifest.

use std::path::{Path, PathBuf};

use minijinja::{path_loader, AutoEscape, Environment};
use rayon::prelude::*;

use sitepipe_pages::{build_manifest, TemplateContext};

use crate::config::BuildConfig;
use crate::task::{source_files, write_output, BuildError, BuildTask, TaskKind};

/// URL of the live reload client served by the development server.
pub const LIVE_RELOAD_SCRIPT: &str = "/__livereload.js";

/// Stem of the shared layout template, which is never rendered on its own.
const LAYOUT_STEM: &str = "layout";

/// Template engine using minijinja, loading templates from the pages folder so
/// pages can `{% extends "layout.jinja" %}` and include partials.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new(pages_dir: &Path) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(pages_dir));
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        Self { env }
    }

    /// Render the template stored at `name`, relative to the pages folder.
    pub fn render_page(
        &self,
        name: &str,
        context: &TemplateContext,
    ) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(context.to_value())
    }
}

/// Renders every top-level page template except the layout into `<stem>.html`.
#[derive(Debug, Default)]
pub struct PagesTask;

impl BuildTask for PagesTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Pages
    }

    fn run(&self, config: &BuildConfig) -> Result<Vec<PathBuf>, BuildError> {
        let pages_dir = config.pages_dir();
        let sources = source_files(&pages_dir, &[config.page_extension.as_str()])?;
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let manifest = build_manifest(&pages_dir, &config.page_pattern())?;
        tracing::debug!("Page manifest: {:?}", manifest.entries());

        let context = TemplateContext::new(config.constants.clone(), manifest);
        let engine = TemplateEngine::new(&pages_dir);

        sources
            .par_iter()
            .filter(|path| stem(path) != Some(LAYOUT_STEM))
            .map(|path| render_one(&engine, &context, config, path))
            .collect()
    }
}

fn stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

fn render_one(
    engine: &TemplateEngine,
    context: &TemplateContext,
    config: &BuildConfig,
    path: &Path,
) -> Result<PathBuf, BuildError> {
    let template_error = |message: String| BuildError::TemplateError {
        path: path.display().to_string(),
        message,
    };

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| template_error("file name is not valid UTF-8".to_string()))?;
    let page_stem = stem(path).unwrap_or(name);

    let mut html = engine
        .render_page(name, context)
        .map_err(|e| template_error(format!("{:#}", e)))?;

    if config.live_reload {
        html = inject_live_reload(&html);
    }

    let output = config.output_dir.join(format!("{page_stem}.html"));
    write_output(&output, html)?;
    tracing::debug!("Rendered {}", output.display());

    Ok(output)
}

/// Insert the live reload client before the closing body tag, or append it
/// when the page has none.
pub fn inject_live_reload(html: &str) -> String {
    let tag = format!(r#"<script src="{LIVE_RELOAD_SCRIPT}"></script>"#);

    match html.rfind("</body>") {
        Some(pos) => format!("{}{}\n{}", &html[..pos], tag, &html[pos..]),
        None => format!("{html}\n{tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, SiteConfig};
    use std::fs;
    use tempfile::tempdir;

    const LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head><title>{{ site_name }}</title></head>
<body>
<nav>{% for page in pages %}<a href="{{ page }}">{{ page }}</a>{% endfor %}</nav>
{% block content %}{% endblock %}
</body>
</html>"#;

    fn site(root: &Path, mode: Mode) -> BuildConfig {
        let pages = root.join("src/pages");
        fs::create_dir_all(pages.join("blog")).unwrap();
        fs::write(pages.join("layout.jinja"), LAYOUT).unwrap();
        fs::write(
            pages.join("index.jinja"),
            r#"{% extends "layout.jinja" %}{% block content %}<h1>Home</h1>{% endblock %}"#,
        )
        .unwrap();
        fs::write(
            pages.join("about.jinja"),
            r#"{% extends "layout.jinja" %}{% block content %}<h1>About {{ site_name }}</h1>{% endblock %}"#,
        )
        .unwrap();
        fs::write(pages.join("blog/post-1.jinja"), "post").unwrap();

        let mut config = BuildConfig::new(SiteConfig::default(), mode);
        config.source_dir = root.join("src");
        config.output_dir = root.join("out");
        config.constants = toml::from_str(r#"site_name = "Atelier""#).unwrap();
        config
    }

    #[test]
    fn renders_top_level_pages_but_not_layout() {
        let temp = tempdir().unwrap();
        let config = site(temp.path(), Mode::Production);

        let mut outputs = PagesTask.run(&config).unwrap();
        outputs.sort();

        let out = temp.path().join("out");
        assert_eq!(outputs, vec![out.join("about.html"), out.join("index.html")]);
        assert!(!out.join("layout.html").exists());
        assert!(!out.join("post-1.html").exists());
    }

    #[test]
    fn pages_see_constants_and_manifest() {
        let temp = tempdir().unwrap();
        let config = site(temp.path(), Mode::Production);

        PagesTask.run(&config).unwrap();

        let html = fs::read_to_string(temp.path().join("out/index.html")).unwrap();
        assert!(html.contains("<title>Atelier</title>"));
        assert!(html.contains(r#"<a href="about.html">about.html</a>"#));
        assert!(html.contains(r#"<a href="post-1.html">post-1.html</a>"#));
        assert!(!html.contains(r#"href="index.html""#));
        assert!(!html.contains(LIVE_RELOAD_SCRIPT));
    }

    #[test]
    fn upper_case_extension_is_rendered_and_listed() {
        let temp = tempdir().unwrap();
        let config = site(temp.path(), Mode::Production);
        fs::write(
            config.pages_dir().join("Contact.JINJA"),
            r#"{% extends "layout.jinja" %}{% block content %}<h1>Contact</h1>{% endblock %}"#,
        )
        .unwrap();

        let outputs = PagesTask.run(&config).unwrap();

        let out = temp.path().join("out");
        assert!(outputs.contains(&out.join("Contact.html")));
        let html = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(html.contains(r#"<a href="Contact.html">Contact.html</a>"#));
    }

    #[test]
    fn development_pages_load_live_reload_client() {
        let temp = tempdir().unwrap();
        let config = site(temp.path(), Mode::Development);

        PagesTask.run(&config).unwrap();

        let html = fs::read_to_string(temp.path().join("out/about.html")).unwrap();
        let script = html.find(LIVE_RELOAD_SCRIPT).unwrap();
        assert!(script < html.find("</body>").unwrap());
    }

    #[test]
    fn injects_at_end_without_body() {
        let html = inject_live_reload("<p>fragment</p>");

        assert!(html.starts_with("<p>fragment</p>"));
        assert!(html.ends_with(r#"<script src="/__livereload.js"></script>"#));
    }

    #[test]
    fn reports_template_errors() {
        let temp = tempdir().unwrap();
        let config = site(temp.path(), Mode::Production);
        fs::write(config.pages_dir().join("broken.jinja"), "{% for %}").unwrap();

        let err = PagesTask.run(&config).unwrap_err();

        assert!(matches!(err, BuildError::TemplateError { .. }));
    }

    #[test]
    fn no_pages_folder_renders_nothing() {
        let temp = tempdir().unwrap();
        let mut config = BuildConfig::default();
        config.source_dir = temp.path().join("src");
        config.output_dir = temp.path().join("out");

        assert!(PagesTask.run(&config).unwrap().is_empty());
    }
}
