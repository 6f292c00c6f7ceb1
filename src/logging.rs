//! Diagnostics for the `nkllon` binary.
//!
//! Command output (reports, query listings, diffs) owns stdout. Log records
//! go to stderr unless `LOG_OUTPUT` says otherwise.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use strum::EnumString;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const FORMAT_ENV: &str = "LOG_FORMAT";
const OUTPUT_ENV: &str = "LOG_OUTPUT";
const DIR_ENV: &str = "LOG_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    /// Only used with [`LogOutput::File`]
    pub log_dir: PathBuf,
    pub log_file_prefix: String,
    /// Fallback when `RUST_LOG` is unset
    pub level: Level,
    pub daily_rotation: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            log_dir: PathBuf::from("logs"),
            log_file_prefix: "nkllon".to_string(),
            level: Level::WARN,
            daily_rotation: true,
        }
    }
}

impl LoggingConfig {
    /// Defaults overridden by `LOG_FORMAT`, `LOG_OUTPUT` and `LOG_DIR`.
    /// Unrecognized values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            format: parse_or(lookup(FORMAT_ENV), defaults.format),
            output: parse_or(lookup(OUTPUT_ENV), defaults.output),
            log_dir: lookup(DIR_ENV).map(PathBuf::from).unwrap_or(defaults.log_dir),
            ..defaults
        }
    }

    /// `--verbose` lowers the level to DEBUG, `--quiet` raises it to ERROR.
    pub fn with_verbosity(self, verbose: bool, quiet: bool) -> Self {
        let level = match (verbose, quiet) {
            (true, _) => Level::DEBUG,
            (false, true) => Level::ERROR,
            (false, false) => self.level,
        };
        Self { level, ..self }
    }

    fn writer(&self) -> Result<(NonBlocking, WorkerGuard)> {
        Ok(match self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
            LogOutput::File => {
                std::fs::create_dir_all(&self.log_dir).with_context(|| {
                    format!("creating log directory {}", self.log_dir.display())
                })?;
                let appender = if self.daily_rotation {
                    tracing_appender::rolling::daily(&self.log_dir, &self.log_file_prefix)
                } else {
                    tracing_appender::rolling::never(&self.log_dir, &self.log_file_prefix)
                };
                tracing_appender::non_blocking(appender)
            }
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

/// Install the global subscriber. The returned guard flushes buffered records
/// when dropped and must live until the process exits. `Ok(None)` means a
/// subscriber was already installed and has been kept.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_ascii_lowercase()));
    let (writer, guard) = config.writer()?;

    let layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(false)
            .with_ansi(config.output != LogOutput::File)
            .with_filter(filter)
            .boxed(),
    };

    match tracing_subscriber::registry().with(layer).try_init() {
        Ok(()) => Ok(Some(guard)),
        Err(_) => {
            tracing::debug!("subscriber already installed");
            Ok(None)
        }
    }
}
