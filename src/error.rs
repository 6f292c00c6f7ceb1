//! Error handling for the topology tools
//!
//! Every failure the CLI can report is a [`TopologyError`]. Each variant maps
//! onto an [`ErrorCode`], which is also the process exit code, so the binary
//! never has to inspect error messages to decide how to exit.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// EXIT CODES
// =============================================================================

/// Process exit codes reported by the `nkllon` binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    /// Command completed (or help was displayed)
    Success = 0,
    /// Validation ran but the data violates at least one constraint
    ConstraintsFailed = 1,
    /// A required input file does not exist
    FileNotFound = 2,
    /// Turtle, SHACL or SPARQL text could not be parsed
    ParseError = 3,
    /// Validation or query execution failed
    ValidationError = 4,
    /// Project root or config file is unusable
    ConfigurationError = 5,
    /// Anything else
    Unexpected = 99,
}

impl ErrorCode {
    /// Get the integer code
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Short category label used in log records
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::Success => "ok",
            ErrorCode::ConstraintsFailed => "constraint_violation",
            ErrorCode::FileNotFound => "resource_not_found",
            ErrorCode::ParseError => "parse_error",
            ErrorCode::ValidationError => "execution_error",
            ErrorCode::ConfigurationError => "configuration_error",
            ErrorCode::Unexpected => "internal_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

impl From<ErrorCode> for std::process::ExitCode {
    fn from(code: ErrorCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("required file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid SPARQL in {context}: {message}")]
    QuerySyntax { context: String, message: String },

    #[error("validation execution failed: {0}")]
    Validation(String),

    #[error("query execution failed: {0}")]
    Query(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to render template '{template}': {source}")]
    Template {
        template: String,
        #[source]
        source: tera::Error,
    },

    #[error("RDF store error: {0}")]
    Storage(#[from] oxigraph::store::StorageError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TopologyError {
    pub fn parse(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        TopologyError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn validation(message: impl fmt::Display) -> Self {
        TopologyError::Validation(message.to_string())
    }

    pub fn configuration(message: impl fmt::Display) -> Self {
        TopologyError::Configuration(message.to_string())
    }

    /// The exit code the CLI reports for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            TopologyError::FileNotFound(_) => ErrorCode::FileNotFound,
            TopologyError::Parse { .. } | TopologyError::QuerySyntax { .. } => {
                ErrorCode::ParseError
            }
            TopologyError::Validation(_) | TopologyError::Query(_) => ErrorCode::ValidationError,
            TopologyError::Configuration(_) => ErrorCode::ConfigurationError,
            TopologyError::Template { .. }
            | TopologyError::Storage(_)
            | TopologyError::Serialization(_)
            | TopologyError::Io(_) => ErrorCode::Unexpected,
        }
    }
}

pub type Result<T, E = TopologyError> = std::result::Result<T, E>;
