//! Validation, query, diff and visualization tools for hardware topologies
//! described in RDF/Turtle.

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod logging;
pub mod ontology;
pub mod query;
pub mod report;
pub mod sparql;
pub mod templates;
pub mod validate;
pub mod visualize;

pub use cli::{Cli, Command, run};
pub use config::{Environment, ProjectConfig};
pub use error::{ErrorCode, Result, TopologyError};
pub use logging::{LoggingConfig, init_logging};
pub use validate::{ValidationOutcome, validate_topology};
