//! Command implementations.
//!
//! Every command reads one JSON pipeline definition, builds it against a fresh
//! type registry and renders the result as text or as a JSON envelope.

use crate::cli::{OkEnvelope, OutputFormat};
use crate::errors::CliError;
use pipeline_ir::{ChannelQuery, ExecutionMode, PipelineDefinition, TypeRegistry};
use pipeline_ir_graph::{Edge, Node, Pipeline, PipelineBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A parsed CLI command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Build and report validation errors.
    Validate {
        /// Definition file.
        file: PathBuf,
    },
    /// Print resolved edges.
    Edges {
        /// Definition file.
        file: PathBuf,
    },
    /// Print topological order and execution layers.
    Order {
        /// Definition file.
        file: PathBuf,
    },
    /// Print a partial-run cut of the pipeline.
    Filter {
        /// Definition file.
        file: PathBuf,
        /// Start nodes; empty selects all.
        from: Vec<String>,
        /// End nodes; empty selects all.
        to: Vec<String>,
    },
    /// Print the JSON Schema of pipeline definitions.
    Schema,
}

impl Command {
    /// Short command name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Validate { .. } => "validate",
            Self::Edges { .. } => "edges",
            Self::Order { .. } => "order",
            Self::Filter { .. } => "filter",
            Self::Schema => "schema",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Serialize)]
struct PipelineSummary<'a> {
    pipeline_id: &'a str,
    execution_mode: ExecutionMode,
    nodes: Vec<&'a str>,
    edges: usize,
}

#[derive(Debug, Serialize)]
struct OrderSummary<'a> {
    order: Vec<&'a str>,
    layers: Vec<Vec<&'a str>>,
}

#[derive(Debug, Serialize)]
struct FilterSummary<'a> {
    pipeline_id: &'a str,
    nodes: Vec<&'a str>,
    edges: &'a [Edge],
    removed_producer_channels: &'a BTreeMap<String, Vec<ChannelQuery>>,
}

/// Runs commands and renders their output.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    output: OutputFormat,
}

impl CommandExecutor {
    /// Create an executor rendering in `output` format.
    #[must_use]
    pub const fn new(output: OutputFormat) -> Self {
        Self { output }
    }

    /// Run a command, returning what should be printed to stdout.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Invalid`] when the pipeline fails validation and
    /// other [`CliError`] variants for I/O, decoding and graph failures.
    pub fn execute(&self, command: &Command) -> Result<String, CliError> {
        debug!(command = %command, output = %self.output, "Executing command");
        match command {
            Command::Validate { file } => self.validate(file),
            Command::Edges { file } => self.edges(file),
            Command::Order { file } => self.order(file),
            Command::Filter { file, from, to } => self.filter(file, from, to),
            Command::Schema => schema(),
        }
    }

    fn validate(&self, file: &Path) -> Result<String, CliError> {
        let pipeline = build(file)?;
        let summary = summarize(&pipeline);
        info!(pipeline_id = %pipeline.id(), "Pipeline is valid");
        self.render(&summary, || {
            format!(
                "Pipeline '{}' ({}) is valid: {} node(s), {} edge(s)",
                summary.pipeline_id,
                summary.execution_mode,
                summary.nodes.len(),
                summary.edges
            )
        })
    }

    fn edges(&self, file: &Path) -> Result<String, CliError> {
        let pipeline = build(file)?;
        self.render(pipeline.edges(), || {
            pipeline
                .edges()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")
        })
    }

    fn order(&self, file: &Path) -> Result<String, CliError> {
        let pipeline = build(file)?;
        let summary = OrderSummary {
            order: ids(pipeline.topological_order()?),
            layers: pipeline
                .execution_layers()?
                .into_iter()
                .map(ids)
                .collect(),
        };
        self.render(&summary, || {
            let mut lines = vec![format!("order: {}", summary.order.join(", "))];
            lines.extend(
                summary
                    .layers
                    .iter()
                    .enumerate()
                    .map(|(level, layer)| format!("layer {level}: {}", layer.join(", "))),
            );
            lines.join("\n")
        })
    }

    fn filter(&self, file: &Path, from: &[String], to: &[String]) -> Result<String, CliError> {
        let pipeline = build(file)?;
        let filtered = pipeline.filter_by_ids(from, to)?;
        let summary = FilterSummary {
            pipeline_id: filtered.pipeline.id(),
            nodes: ids(filtered.pipeline.nodes()),
            edges: filtered.pipeline.edges(),
            removed_producer_channels: &filtered.removed_producer_channels,
        };
        self.render(&summary, || {
            let mut lines = vec![format!("nodes: {}", summary.nodes.join(", "))];
            lines.extend(summary.edges.iter().map(|edge| format!("edge: {edge}")));
            for (producer, channels) in summary.removed_producer_channels {
                for channel in channels {
                    lines.push(format!("removed producer {producer}: {channel}"));
                }
            }
            lines.join("\n")
        })
    }

    fn render<T: Serialize + ?Sized>(
        &self,
        data: &T,
        text: impl FnOnce() -> String,
    ) -> Result<String, CliError> {
        match self.output {
            OutputFormat::Text => Ok(text()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&OkEnvelope::new(data))?),
        }
    }
}

/// Read and decode a pipeline definition.
///
/// # Errors
///
/// Returns [`CliError::File`] or [`CliError::Definition`].
pub fn load_definition(file: &Path) -> Result<PipelineDefinition, CliError> {
    let src =
        std::fs::read_to_string(file).map_err(|e| CliError::file("read definition", file, e))?;
    PipelineDefinition::from_json(&src).map_err(|source| CliError::Definition {
        path: file.to_path_buf(),
        source,
    })
}

fn build(file: &Path) -> Result<Pipeline, CliError> {
    let definition = load_definition(file)?;
    let builder = PipelineBuilder::new(Arc::new(TypeRegistry::new()));
    Ok(builder.build(&definition)?)
}

fn summarize(pipeline: &Pipeline) -> PipelineSummary<'_> {
    PipelineSummary {
        pipeline_id: pipeline.id(),
        execution_mode: pipeline.execution_mode(),
        nodes: ids(pipeline.nodes()),
        edges: pipeline.edges().len(),
    }
}

fn ids<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Vec<&'a str> {
    nodes.into_iter().map(Node::id).collect()
}

fn schema() -> Result<String, CliError> {
    let schema = schemars::schema_for!(PipelineDefinition);
    Ok(serde_json::to_string_pretty(&schema)?)
}
