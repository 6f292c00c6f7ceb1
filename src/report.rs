//! Validation report export (JSON, HTML, Markdown).

use crate::config::Environment;
use crate::error::Result;
use crate::ontology::vocab::compact_iri;
use crate::ontology::{ReportSummary, ValidationResult};
use crate::templates;
use crate::validate::ValidationOutcome;
use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use serde::Serialize;
use std::fs;
use std::path::Path;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Html,
    #[value(alias = "md")]
    #[strum(to_string = "markdown", serialize = "md")]
    Markdown,
}

impl ReportFormat {
    /// Format implied by a file extension, if any.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(ReportFormat::Json),
            "html" | "htm" => Some(ReportFormat::Html),
            "md" | "markdown" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    /// An explicit `--format` wins, then the extension, then JSON.
    pub fn resolve(explicit: Option<ReportFormat>, path: &Path) -> Self {
        explicit
            .or_else(|| Self::from_extension(path))
            .unwrap_or(ReportFormat::Json)
    }
}

#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    pub conforms: bool,
    pub generated_at: String,
    pub environment: Environment,
    pub summary: ReportSummary,
    pub results: &'a [ValidationResult],
    pub report_text: &'a str,
}

impl<'a> ReportDocument<'a> {
    pub fn new(outcome: &'a ValidationOutcome, environment: Environment) -> Self {
        Self {
            conforms: outcome.conforms,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            environment,
            summary: outcome.report.summary(),
            results: outcome.report.results(),
            report_text: &outcome.report_text,
        }
    }
}

/// Result row with IRIs compacted for the HTML and Markdown views.
#[derive(Debug, Serialize)]
struct ResultView {
    severity: String,
    focus_node: String,
    path: String,
    value: String,
    message: String,
    source_shape: String,
    component: String,
}

impl From<&ValidationResult> for ResultView {
    fn from(result: &ValidationResult) -> Self {
        let compact = |s: &str| {
            if s.starts_with("http://") || s.starts_with("https://") || s.starts_with("urn:") {
                compact_iri(s)
            } else {
                s.to_string()
            }
        };
        Self {
            severity: result.severity().to_string(),
            focus_node: compact(result.focus_node()),
            path: result.result_path().map(compact).unwrap_or_default(),
            value: result.value().map(compact).unwrap_or_default(),
            message: result.message().to_string(),
            source_shape: compact(result.source_shape()),
            component: compact(result.source_constraint_component()),
        }
    }
}

/// Render the report in `format`.
pub fn render_report(document: &ReportDocument<'_>, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => {
            let mut json = serde_json::to_string_pretty(document)?;
            json.push('\n');
            Ok(json)
        }
        ReportFormat::Html | ReportFormat::Markdown => {
            let mut context = tera::Context::from_serialize(document).map_err(|source| {
                crate::error::TopologyError::Template {
                    template: format.to_string(),
                    source,
                }
            })?;
            let views: Vec<ResultView> = document.results.iter().map(ResultView::from).collect();
            context.insert("rows", &views);
            let template = match format {
                ReportFormat::Html => templates::REPORT_HTML,
                _ => templates::REPORT_MARKDOWN,
            };
            templates::render(template, &context)
        }
    }
}

/// Write the validation report to `path`.
pub fn export_report(
    outcome: &ValidationOutcome,
    environment: Environment,
    path: &Path,
    format: ReportFormat,
) -> Result<()> {
    let document = ReportDocument::new(outcome, environment);
    let rendered = render_report(&document, format)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, rendered)?;
    tracing::info!(path = %path.display(), %format, "report exported");
    Ok(())
}
