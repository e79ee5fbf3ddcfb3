//! # orders-etl entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Resolve configuration (defaults, JSON file, flags)
//!   ├─> Initialize logging (tracing)
//!   └─> Run the subcommand; any fatal error exits non-zero
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stderr)] // Errors raised before logging is up

mod cli;

use clap::Parser as _;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let config = match cli::resolve_config(&cli.command) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = orders_etl::logging::init(config.log_dir.as_deref(), cli.verbose) {
        eprintln!("Error: {err:#}");
        return ExitCode::FAILURE;
    }

    match cli::run_command(&cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Pipeline failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
