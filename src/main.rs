use clap::Parser;
use nkllon::{Cli, LoggingConfig, init_logging, run};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (verbose, quiet) = cli.verbosity();
    let logging_config = LoggingConfig::from_env().with_verbosity(verbose, quiet);
    let _guard = match init_logging(logging_config) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err:#}");
            None
        }
    };

    let mut stdout = std::io::stdout().lock();
    run(&cli, &mut stdout).into()
}
