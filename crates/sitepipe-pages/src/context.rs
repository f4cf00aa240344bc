//! Data handed to page templates.

use minijinja::Value;

use crate::manifest::PageManifest;

/// Key under which the page manifest is exposed to templates.
pub const PAGES_KEY: &str = "pages";

/// Site constants plus the page manifest.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Constants from the `[constants]` table of the site config
    pub constants: toml::Table,
    /// Output page names
    pub pages: PageManifest,
}

impl TemplateContext {
    pub fn new(constants: toml::Table, pages: PageManifest) -> Self {
        Self { constants, pages }
    }

    /// Flatten into a single mapping for the renderer.
    ///
    /// `pages` always replaces a constant with the same name.
    pub fn to_value(&self) -> Value {
        let mut merged = self.constants.clone();
        merged.insert(
            PAGES_KEY.to_string(),
            toml::Value::Array(
                self.pages
                    .iter()
                    .map(|page| toml::Value::String(page.to_string()))
                    .collect(),
            ),
        );
        Value::from_serialize(&merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::build_manifest;
    use minijinja::Environment;
    use std::fs;
    use tempfile::tempdir;

    fn manifest_of(names: &[&str]) -> PageManifest {
        let temp = tempdir().unwrap();
        for name in names {
            fs::write(temp.path().join(name), "").unwrap();
        }
        build_manifest(temp.path(), "*.jinja").unwrap()
    }

    fn render(source: &str, ctx: &TemplateContext) -> String {
        let env = Environment::new();
        env.render_str(source, ctx.to_value()).unwrap()
    }

    #[test]
    fn exposes_constants_and_pages() {
        let constants: toml::Table = toml::from_str(
            r#"
site_name = "Portfolio"
year = 2024
"#,
        )
        .unwrap();
        let ctx = TemplateContext::new(constants, manifest_of(&["about.jinja", "index.jinja"]));

        let html = render(
            "{{ site_name }} {{ year }}:{% for p in pages %} {{ p }}{% endfor %}",
            &ctx,
        );

        assert_eq!(html, "Portfolio 2024: about.html");
    }

    #[test]
    fn pages_override_constant_of_same_name() {
        let constants: toml::Table = toml::from_str(r#"pages = "stale""#).unwrap();
        let ctx = TemplateContext::new(constants, manifest_of(&["work.jinja"]));

        let html = render("{{ pages | length }} {{ pages[0] }}", &ctx);

        assert_eq!(html, "1 work.html");
    }

    #[test]
    fn empty_context_still_has_pages() {
        let ctx = TemplateContext::default();

        let html = render("{{ pages | length }}", &ctx);

        assert_eq!(html, "0");
    }
}
