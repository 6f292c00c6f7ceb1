//! RDF graph handling for topology files.
//!
//! - **graph** - Turtle loading and pattern / SPARQL access over an oxigraph store
//! - **inference** - RDFS materialization
//! - **shacl** - Shapes Constraint Language validation
//! - **vocab** - topology and SHACL IRIs
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use nkllon::ontology::{ShapeValidator, load_merged, materialize_rdfs};
//!
//! let data = load_merged(&[ontology.as_path(), deployment.as_path()])?;
//! materialize_rdfs(&data)?;
//!
//! let report = ShapeValidator::from_file(&shapes)?.validate(&data)?;
//! println!("{}", report);
//! ```

pub mod graph;
pub mod inference;
pub mod shacl;
pub mod vocab;

pub use graph::{TopologyGraph, as_subject, load_graph, load_merged};
pub use inference::{InferenceStats, materialize_rdfs, subclasses};
pub use shacl::{
    PropertyPath, ReportSummary, Severity, ShapeValidator, ValidationReport, ValidationResult,
};
