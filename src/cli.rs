//! Command-line interface.

use crate::config::{Environment, PROJECT_ROOT_ENV, ProjectConfig};
use crate::diff::{compare_topologies, device_changes};
use crate::error::{ErrorCode, Result, TopologyError};
use crate::query::query_topology;
use crate::report::{ReportFormat, export_report};
use crate::validate::{render_banner, rule, validate_topology};
use crate::visualize::{DEFAULT_OUTPUT, generate_visualization};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

pub const EXIT_CODE_HELP: &str = "\
Exit codes:
  0 - Success, or help displayed without running validation
  1 - Validation completed but constraints failed
  2 - Required file not found
  3 - RDF/SHACL parsing error
  4 - Validation execution error
  5 - Configuration error
  99 - Unexpected error
";

#[derive(Parser, Debug)]
#[command(
    name = "nkllon",
    version,
    about = "NKLLON Hardware Topology Validation System",
    after_help = EXIT_CODE_HELP
)]
pub struct Cli {
    /// Project directory holding ontology/ and data/
    #[arg(long, global = true, env = PROJECT_ROOT_ENV, value_name = "DIR")]
    pub project_root: Option<PathBuf>,

    /// YAML or JSON file overriding the project root and file names
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run SHACL validation on deployment data
    Validate(ValidateArgs),
    /// Run example SPARQL queries
    Query(EnvArgs),
    /// Compare two topology configurations
    Diff(DiffArgs),
    /// Generate interactive topology visualization
    Visualize(VisualizeArgs),
    /// Display system information
    Info,
}

#[derive(Args, Debug)]
pub struct EnvArgs {
    /// Environment to use
    #[arg(long, value_enum, default_value_t = Environment::Prod)]
    pub env: Environment,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Environment to validate
    #[arg(long, value_enum, default_value_t = Environment::Prod)]
    pub env: Environment,

    /// Export report to file (format auto-detected from extension)
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Report format (overrides --export extension)
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Enable verbose logging
    #[arg(long, short, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(long, short)]
    pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// First topology file
    pub file1: PathBuf,

    /// Second topology file
    pub file2: PathBuf,

    /// Show only device-level changes
    #[arg(long)]
    pub devices_only: bool,
}

#[derive(Args, Debug)]
pub struct VisualizeArgs {
    /// Output HTML file path
    #[arg(long, short, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Environment to visualize
    #[arg(long, value_enum, default_value_t = Environment::Prod)]
    pub env: Environment,
}

impl Cli {
    /// `(verbose, quiet)` flags that drive the log level.
    pub fn verbosity(&self) -> (bool, bool) {
        match &self.command {
            Some(Command::Validate(args)) => (args.verbose, args.quiet),
            _ => (false, false),
        }
    }

    fn project(&self) -> Result<ProjectConfig> {
        ProjectConfig::resolve(self.project_root.clone(), self.config.as_deref())
    }
}

/// Run the parsed command, writing command output to `out`. Errors go to
/// stderr as a single line and are mapped to their exit code.
pub fn run(cli: &Cli, out: &mut dyn Write) -> ErrorCode {
    match dispatch(cli, out) {
        Ok(code) => code,
        Err(err) => {
            let code = err.code();
            tracing::debug!(code = code.code(), category = code.category(), error = ?err);
            eprintln!("❌ ERROR: {err}");
            code
        }
    }
}

fn dispatch(cli: &Cli, out: &mut dyn Write) -> Result<ErrorCode> {
    let Some(command) = &cli.command else {
        write!(out, "{}", Cli::command().render_long_help())?;
        return Ok(ErrorCode::Success);
    };

    match command {
        Command::Validate(args) => handle_validate(&cli.project()?, args, out),
        Command::Query(args) => {
            let project = cli.project()?;
            let results = query_topology(
                &project.ontology_path(),
                &project.get_deployment_path(args.env),
            )?;
            write!(out, "{results}")?;
            Ok(ErrorCode::Success)
        }
        Command::Diff(args) => handle_diff(cli, args, out),
        Command::Visualize(args) => {
            let project = cli.project()?;
            let summary = generate_visualization(
                &project.ontology_path(),
                &project.get_deployment_path(args.env),
                &args.output,
            )?;
            writeln!(out, "✅ Visualization generated: {}", summary.output.display())?;
            writeln!(out, "   Nodes: {}", summary.nodes)?;
            writeln!(out, "   Edges: {}", summary.edges)?;
            Ok(ErrorCode::Success)
        }
        Command::Info => {
            write!(out, "{}", render_info(cli.project().ok().as_ref()))?;
            Ok(ErrorCode::Success)
        }
    }
}

fn handle_validate(
    project: &ProjectConfig,
    args: &ValidateArgs,
    out: &mut dyn Write,
) -> Result<ErrorCode> {
    let ontology = project.ontology_path();
    let shapes = project.shacl_path();
    let data = project.get_deployment_path(args.env);

    if !args.quiet {
        write!(out, "{}", render_banner(args.env, &ontology, &shapes, &data))?;
    }

    let outcome = validate_topology(&ontology, &shapes, &data)?;

    if let Some(path) = &args.export {
        let format = ReportFormat::resolve(args.format, path);
        export_report(&outcome, args.env, path, format)?;
        if !args.quiet {
            writeln!(out, "\n📄 Report exported to: {}", path.display())?;
        }
    }

    if !args.quiet {
        write!(out, "{outcome}")?;
    }

    Ok(if outcome.conforms {
        ErrorCode::Success
    } else {
        ErrorCode::ConstraintsFailed
    })
}

fn handle_diff(cli: &Cli, args: &DiffArgs, out: &mut dyn Write) -> Result<ErrorCode> {
    for file in [&args.file1, &args.file2] {
        if !file.exists() {
            return Err(TopologyError::FileNotFound(file.clone()));
        }
    }

    if args.devices_only {
        let project = match cli.project() {
            Ok(project) => Some(project),
            Err(err) if cli.config.is_some() => return Err(err),
            Err(err) => {
                tracing::debug!(error = %err, "no project resolved, comparing snapshots alone");
                None
            }
        };
        let ontology = project.map(|project| project.ontology_path());
        let changes = device_changes(&args.file1, &args.file2, ontology.as_deref())?;
        write!(out, "{changes}")?;
    } else {
        let diff = compare_topologies(&args.file1, &args.file2)?;
        write!(out, "{}", diff.report(&args.file1, &args.file2))?;
    }
    Ok(ErrorCode::Success)
}

pub fn render_info(project: Option<&ProjectConfig>) -> String {
    let mut lines = vec![
        rule('='),
        "NKLLON Hardware Topology System".to_string(),
        rule('='),
        format!("\nVersion: {}", env!("CARGO_PKG_VERSION")),
        "\nDescription:".to_string(),
        "  Semantic web validation system for KVM hardware topologies".to_string(),
        "  using RDF/OWL ontologies and SHACL constraints.".to_string(),
        "\nCommands:".to_string(),
        "  nkllon validate     - Run SHACL validation".to_string(),
        "  nkllon query        - Run example SPARQL queries".to_string(),
        "  nkllon diff         - Compare two topologies".to_string(),
        "  nkllon visualize    - Generate interactive visualization".to_string(),
        "  nkllon info         - Display this information".to_string(),
    ];

    if let Some(project) = project {
        lines.push("\nProject files:".to_string());
        lines.push(format!("  Root:       {}", project.project_root.display()));
        lines.push(format!("  Ontology:   {}", project.ontology_path().display()));
        lines.push(format!("  SHACL:      {}", project.shacl_path().display()));
        lines.push(format!("  Deployment: {}", project.deployment_path().display()));
    }

    lines.extend([
        "\nExamples:".to_string(),
        "  nkllon validate --env prod --export report.html".to_string(),
        "  nkllon diff data/old.ttl data/new.ttl --devices-only".to_string(),
        "  nkllon visualize --output topology.html".to_string(),
        rule('='),
    ]);

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_validate_flags() {
        let cli = Cli::try_parse_from([
            "nkllon", "validate", "--env", "dev", "--export", "out.md", "--format", "md", "-q",
        ])
        .expect("valid arguments");
        let Some(Command::Validate(args)) = &cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.env, Environment::Dev);
        assert_eq!(args.format, Some(ReportFormat::Markdown));
        assert!(args.quiet);
        assert_eq!(cli.verbosity(), (false, true));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let err = Cli::try_parse_from(["nkllon", "validate", "-v", "-q"]).err();
        assert!(err.is_some());
    }

    #[test]
    fn rejects_unknown_environment() {
        assert!(Cli::try_parse_from(["nkllon", "query", "--env", "qa"]).is_err());
    }

    #[test]
    fn visualize_defaults() {
        let cli = Cli::try_parse_from(["nkllon", "visualize"]).expect("valid arguments");
        let Some(Command::Visualize(args)) = &cli.command else {
            panic!("expected visualize");
        };
        assert_eq!(args.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(args.env, Environment::Prod);
    }

    #[test]
    fn help_lists_exit_codes() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("Exit codes:"));
        assert!(help.contains("99 - Unexpected error"));
    }

    #[test]
    fn no_subcommand_prints_help() {
        let cli = Cli::try_parse_from(["nkllon"]).expect("valid arguments");
        let mut out = Vec::new();
        assert_eq!(run(&cli, &mut out), ErrorCode::Success);
        assert!(String::from_utf8_lossy(&out).contains("Usage:"));
    }

    #[test]
    fn info_lists_commands() {
        let text = render_info(None);
        assert!(text.contains("Version: "));
        assert!(text.contains("  nkllon visualize    - Generate interactive visualization"));
        assert!(!text.contains("Project files:"));
    }
}
