//! pipeline-ir command-line interface.
//!
//! Thin front end over [`pipeline_ir`] and [`pipeline_ir_graph`]: reads JSON
//! pipeline definitions, builds them and prints validation results, resolved
//! edges, execution order or partial-run cuts.

// CLI needs to write to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

/// CLI argument parsing and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Configuration file loading.
pub mod config;
/// CLI errors and their rendering.
pub mod errors;
/// Tracing subscriber setup.
pub mod tracing;

pub use cli::{Cli, Commands, EXIT_CLI, EXIT_INVALID, EXIT_OK, OkEnvelope, OutputFormat};
pub use commands::{Command, CommandExecutor};
pub use config::CliConfig;
pub use errors::{CliError, ErrorEnvelope, exit_code_for, render_error};

/// Run one parsed invocation, returning the process exit code.
///
/// Loads the config, installs tracing, executes the command and prints its
/// output or error.
#[must_use]
pub fn run(cli: Cli) -> i32 {
    let requested_json = cli.requested_output() == Some(OutputFormat::Json);
    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config.with_overrides(&cli),
        Err(err) => {
            render_error(err, requested_json);
            return EXIT_CLI;
        }
    };
    let json = config.output == OutputFormat::Json;

    if let Err(err) = tracing::init_tracing(config.tracing_config()) {
        render_error(err, json);
        return EXIT_CLI;
    }

    let command: Command = cli.command.into();
    let span = ::tracing::info_span!(
        "command",
        command = %command,
        correlation_id = %tracing::correlation_id(),
    );
    let result = span.in_scope(|| CommandExecutor::new(config.output).execute(&command));

    match result {
        Ok(output) => {
            println!("{output}");
            EXIT_OK
        }
        Err(err) => {
            let code = exit_code_for(&err);
            render_error(err, json);
            code
        }
    }
}
