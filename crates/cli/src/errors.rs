//! CLI error types and rendering.

use crate::cli::{EXIT_CLI, EXIT_INVALID};
use miette::{Diagnostic, Report, SourceSpan};
use pipeline_ir_graph::ValidationReport;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// A file could not be read.
    #[error("Failed to {operation} '{}'", .path.display())]
    #[diagnostic(
        code(pipeline_ir::cli::file),
        help("Check file permissions and ensure the path exists")
    )]
    File {
        /// What was attempted.
        operation: &'static str,
        /// The file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("Invalid config file '{}': {message}", .path.display())]
    #[diagnostic(code(pipeline_ir::cli::config))]
    Config {
        /// The config file.
        path: PathBuf,
        /// Parser message.
        message: String,
        /// File contents.
        #[source_code]
        src: String,
        /// Location of the problem, when known.
        #[label("here")]
        span: Option<SourceSpan>,
    },

    /// The pipeline definition could not be decoded.
    #[error("Failed to decode pipeline definition '{}'", .path.display())]
    #[diagnostic(
        code(pipeline_ir::cli::definition),
        help("Definitions are JSON documents; run `pipeline-ir schema` for the format")
    )]
    Definition {
        /// The definition file.
        path: PathBuf,
        /// Decode error.
        #[source]
        source: pipeline_ir::Error,
    },

    /// The pipeline failed validation.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Invalid(#[from] ValidationReport),

    /// A graph operation on a valid pipeline failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] pipeline_ir_graph::Error),

    /// Output could not be rendered.
    #[error("Failed to render output: {message}")]
    #[diagnostic(code(pipeline_ir::cli::output))]
    Output {
        /// What went wrong.
        message: String,
    },

    /// The tracing subscriber could not be installed.
    #[error("Tracing initialization failed: {message}")]
    #[diagnostic(
        code(pipeline_ir::cli::tracing),
        help("Check RUST_LOG and the configured log level")
    )]
    Tracing {
        /// What went wrong.
        message: String,
    },
}

impl CliError {
    /// Create a file error.
    #[must_use]
    pub fn file(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::File {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Create a tracing error.
    #[must_use]
    pub fn tracing(message: impl Into<String>) -> Self {
        Self::Tracing {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output {
            message: err.to_string(),
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Invalid(_) | CliError::Graph(_) => EXIT_INVALID,
        CliError::File { .. }
        | CliError::Config { .. }
        | CliError::Definition { .. }
        | CliError::Output { .. }
        | CliError::Tracing { .. } => EXIT_CLI,
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    /// Status indicator, always "error"
    pub status: &'static str,
    /// Diagnostic code of the top-level error
    pub code: Option<String>,
    /// Top-level message
    pub message: String,
    /// Messages of every related diagnostic, e.g. each validation error
    pub errors: Vec<String>,
}

impl ErrorEnvelope {
    /// Describe an error.
    #[must_use]
    pub fn new(err: &CliError) -> Self {
        Self {
            status: "error",
            code: err.code().map(|code| code.to_string()),
            message: err.to_string(),
            errors: err
                .related()
                .into_iter()
                .flatten()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: CliError, json_mode: bool) {
    if json_mode {
        match serde_json::to_string(&ErrorEnvelope::new(&err)) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        eprintln!("{:?}", Report::new(err));
        let _ = io::stderr().flush();
    }
}
