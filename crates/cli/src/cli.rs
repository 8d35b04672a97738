use crate::commands::Command;
use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// The pipeline failed validation or a graph operation failed
pub const EXIT_INVALID: i32 = 1;
/// CLI, configuration or I/O error exit code
pub const EXIT_CLI: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "pipeline-ir")]
#[command(about = "Validate, resolve and inspect pipeline definitions")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        env = "PIPELINE_IR_CONFIG",
        help = "Path to a pipeline-ir.toml config file"
    )]
    pub config: Option<PathBuf>,

    #[arg(short = 'l', long, global = true, help = "Set logging level", value_enum)]
    pub level: Option<LogLevel>,

    #[arg(long, global = true, help = "Log output format", value_enum)]
    pub log_format: Option<TracingFormat>,

    #[arg(short = 'o', long, global = true, help = "Output format", value_enum)]
    pub output: Option<OutputFormat>,

    #[arg(long, global = true, help = "Shorthand for --output json")]
    pub json: bool,
}

impl Cli {
    /// Output format requested on the command line, if any.
    #[must_use]
    pub fn requested_output(&self) -> Option<OutputFormat> {
        if self.json {
            Some(OutputFormat::Json)
        } else {
            self.output
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Build a pipeline definition and report every validation error")]
    Validate {
        #[arg(help = "Path to a JSON pipeline definition")]
        file: PathBuf,
    },
    #[command(about = "Print the resolved producer-to-consumer edges")]
    Edges {
        #[arg(help = "Path to a JSON pipeline definition")]
        file: PathBuf,
    },
    #[command(about = "Print the topological order and execution layers")]
    Order {
        #[arg(help = "Path to a JSON pipeline definition")]
        file: PathBuf,
    },
    #[command(about = "Cut a SYNC pipeline down to the nodes between --from and --to")]
    Filter {
        #[arg(help = "Path to a JSON pipeline definition")]
        file: PathBuf,
        #[arg(long = "from", value_name = "NODE_ID", help = "Start node (repeatable; default all)")]
        from: Vec<String>,
        #[arg(long = "to", value_name = "NODE_ID", help = "End node (repeatable; default all)")]
        to: Vec<String>,
    },
    #[command(about = "Print the JSON Schema of pipeline definitions")]
    Schema,
}

impl From<Commands> for Command {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::Validate { file } => Self::Validate { file },
            Commands::Edges { file } => Self::Edges { file },
            Commands::Order { file } => Self::Order { file },
            Commands::Filter { file, from, to } => Self::Filter { file, from, to },
            Commands::Schema => Self::Schema,
        }
    }
}

/// Output format for command results
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text
    #[default]
    Text,
    /// JSON wrapped in a status envelope
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Json => "json",
        };
        write!(f, "{s}")
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct OkEnvelope<T> {
    /// Status indicator, always "ok"
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
