//! Tera templates compiled into the binary.

use crate::error::{Result, TopologyError};
use once_cell::sync::OnceCell;
use tera::{Context, Tera};

pub const REPORT_HTML: &str = "report.html";
pub const REPORT_MARKDOWN: &str = "report.md";
pub const VISUALIZATION_HTML: &str = "visualization.html";

static TEMPLATES: OnceCell<Tera> = OnceCell::new();

fn templates() -> std::result::Result<&'static Tera, tera::Error> {
    TEMPLATES.get_or_try_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (REPORT_HTML, include_str!("../templates/report.html.tera")),
            (REPORT_MARKDOWN, include_str!("../templates/report.md.tera")),
            (
                VISUALIZATION_HTML,
                include_str!("../templates/visualization.html.tera"),
            ),
        ])?;
        Ok(tera)
    })
}

/// Render one of the embedded templates. Names ending in `.html` are
/// auto-escaped.
pub fn render(template: &str, context: &Context) -> Result<String> {
    templates()
        .and_then(|tera| tera.render(template, context))
        .map_err(|source| TopologyError::Template {
            template: template.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_templates_compile() {
        let tera = templates().expect("templates parse");
        let names: Vec<&str> = tera.get_template_names().collect();
        for name in [REPORT_HTML, REPORT_MARKDOWN, VISUALIZATION_HTML] {
            assert!(names.contains(&name), "missing {name}");
        }
    }

    #[test]
    fn unknown_template_is_a_template_error() {
        let err = render("nope.html", &Context::new()).err().expect("missing template");
        assert_eq!(err.code(), crate::error::ErrorCode::Unexpected);
        assert!(err.to_string().contains("nope.html"));
    }
}
