//! Topology validation: ontology + deployment data checked against the
//! SHACL shapes after RDFS materialization.

use crate::config::Environment;
use crate::error::Result;
use crate::ontology::{InferenceStats, ShapeValidator, ValidationReport, load_graph, materialize_rdfs};
use std::fmt;
use std::path::Path;

pub const BANNER_WIDTH: usize = 80;

/// Topology rules encoded in the shipped shapes, listed on a passing run.
pub const TOPOLOGY_RULES: [&str; 4] = [
    "Rule 1: eARC return path (SmartDisplay to PreAmp)",
    "Rule 2: Audio interfaces bypass KVMs (can connect to PreAmp)",
    "Rule 3: Bidirectional cables (USB-C to DisplayPort)",
    "Rule 4: Production uptime-critical ports",
];

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub conforms: bool,
    pub report_text: String,
    pub report: ValidationReport,
    pub inference: InferenceStats,
}

/// Validate `data_path` against `shacl_path` with `ontology_path` merged into
/// the data graph. All shapes are evaluated; the first violation does not
/// stop the run.
pub fn validate_topology(
    ontology_path: &Path,
    shacl_path: &Path,
    data_path: &Path,
) -> Result<ValidationOutcome> {
    let ontology = load_graph(ontology_path)?;
    let data = load_graph(data_path)?;
    data.merge(&ontology)?;

    let validator = ShapeValidator::from_file(shacl_path)?;
    let inference = materialize_rdfs(&data)?;
    let report = validator.validate(&data)?;

    tracing::info!(
        data = %data_path.display(),
        shapes = validator.shape_count(),
        inferred = inference.inferred,
        conforms = report.conforms(),
        results = report.results().len(),
        "validation finished"
    );

    Ok(ValidationOutcome {
        conforms: report.conforms(),
        report_text: report.to_text(),
        report,
        inference,
    })
}

pub fn rule(ch: char) -> String {
    ch.to_string().repeat(BANNER_WIDTH)
}

/// Header printed before a validation run.
pub fn render_banner(
    environment: Environment,
    ontology_path: &Path,
    shacl_path: &Path,
    data_path: &Path,
) -> String {
    let heavy = rule('=');
    format!(
        "{heavy}\nNKLLON Hardware Topology Validation\n{heavy}\n\n\
         Environment: {environment}\n\
         Ontology:    {}\n\
         SHACL:       {}\n\
         Data:        {}\n\n{}\n",
        file_name(ontology_path),
        file_name(shacl_path),
        file_name(data_path),
        rule('-'),
    )
}

/// PASS section with the rule list, or FAIL section with the report.
impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conforms {
            writeln!(f, "\n✅ VALIDATION PASSED")?;
            writeln!(f, "\nAll SHACL constraints satisfied:")?;
            for rule in TOPOLOGY_RULES {
                writeln!(f, "  ✓ {rule}")?;
            }
        } else {
            writeln!(f, "\n❌ VALIDATION FAILED")?;
            writeln!(f, "\nViolations found:\n")?;
            writeln!(f, "{}", self.report_text)?;
        }
        writeln!(f, "\n{}", rule('='))
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
