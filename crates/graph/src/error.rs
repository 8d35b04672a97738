//! Error types for pipeline graph operations.

use miette::Diagnostic;
use pipeline_ir::ExecutionMode;
use std::fmt;
use thiserror::Error;

/// Result type for pipeline graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The consumer input a failed channel belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSite {
    /// Consumer node id.
    pub consumer: String,
    /// Consumer input key.
    pub input_key: String,
}

impl fmt::Display for ChannelSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input '{}' of node '{}'", self.input_key, self.consumer)
    }
}

fn site_suffix(site: Option<&ChannelSite>) -> String {
    site.map_or_else(String::new, |site| format!(" (for {site})"))
}

/// Errors that can occur while resolving, validating or traversing a pipeline.
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum Error {
    /// Type registry or definition error.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ir(#[from] pipeline_ir::Error),

    /// Two nodes share the same id.
    #[error("Node id '{node_id}' is declared more than once")]
    #[diagnostic(
        code(pipeline_ir::graph::duplicate_node_id),
        help("node ids must be unique within a pipeline; duplicates are never merged")
    )]
    DuplicateNodeId {
        /// The repeated id.
        node_id: String,
    },

    /// No node satisfies a channel query.
    #[error("No producer matches {query}{}", site_suffix(.site.as_ref()))]
    #[diagnostic(code(pipeline_ir::graph::no_matching_producer))]
    NoMatchingProducer {
        /// Description of the query.
        query: String,
        /// Consumer input the query belongs to, when known.
        site: Option<ChannelSite>,
    },

    /// More than one node satisfies a channel query.
    #[error(
        "Producer for {query} is ambiguous: candidates {}{}",
        .candidates.join(", "),
        site_suffix(.site.as_ref())
    )]
    #[diagnostic(
        code(pipeline_ir::graph::ambiguous_producer),
        help("add a producer id or more context filters to the query")
    )]
    AmbiguousProducer {
        /// Description of the query.
        query: String,
        /// Ids of every matching node.
        candidates: Vec<String>,
        /// Consumer input the query belongs to, when known.
        site: Option<ChannelSite>,
    },

    /// The resolved dependencies of a SYNC pipeline contain a cycle.
    #[error("Cycle detected between nodes: {}", .nodes.join(" -> "))]
    #[diagnostic(
        code(pipeline_ir::graph::cyclic),
        help("SYNC pipelines must be acyclic; use ASYNC execution for feedback loops")
    )]
    CyclicGraph {
        /// Nodes forming the cycle, in declaration order.
        nodes: Vec<String>,
    },

    /// A node consumes its own output.
    #[error("Node '{node_id}' declares itself as the producer of input '{input_key}'")]
    #[diagnostic(code(pipeline_ir::graph::self_reference))]
    SelfReference {
        /// The node.
        node_id: String,
        /// The self-referencing input.
        input_key: String,
    },

    /// An ordering was requested over a graph that has cycles.
    #[error("Cycle detected in pipeline graph: {message}")]
    #[diagnostic(code(pipeline_ir::graph::cycle_detected))]
    CycleDetected {
        /// Human-readable description of the cycle.
        message: String,
    },

    /// A node id does not exist in the pipeline.
    #[error("Unknown node '{node_id}'")]
    #[diagnostic(code(pipeline_ir::graph::unknown_node))]
    UnknownNode {
        /// The requested id.
        node_id: String,
    },

    /// The operation is not defined for the pipeline's execution mode.
    #[error("{operation} is only supported for SYNC pipelines, found {mode}")]
    #[diagnostic(code(pipeline_ir::graph::unsupported_mode))]
    UnsupportedExecutionMode {
        /// Name of the operation.
        operation: &'static str,
        /// The pipeline's mode.
        mode: ExecutionMode,
    },

    /// Declared node order does not respect the dependency edges.
    #[error(
        "Pipeline is not topologically sorted: node '{node_id}' depends on '{upstream}', which is declared after it"
    )]
    #[diagnostic(code(pipeline_ir::graph::not_sorted))]
    NotTopologicallySorted {
        /// The consumer declared too early.
        node_id: String,
        /// Its producer declared too late.
        upstream: String,
    },
}

impl Error {
    /// Attach the consumer input to a resolution error.
    ///
    /// Errors other than [`Error::NoMatchingProducer`] and
    /// [`Error::AmbiguousProducer`] are returned unchanged.
    #[must_use]
    pub fn at(self, consumer: &str, input_key: &str) -> Self {
        let site = Some(ChannelSite {
            consumer: consumer.to_string(),
            input_key: input_key.to_string(),
        });
        match self {
            Self::NoMatchingProducer { query, .. } => Self::NoMatchingProducer { query, site },
            Self::AmbiguousProducer {
                query, candidates, ..
            } => Self::AmbiguousProducer {
                query,
                candidates,
                site,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matching_producer_message() {
        let err = Error::NoMatchingProducer {
            query: "'A.out' of type 'Examples'".to_string(),
            site: None,
        };
        assert_eq!(
            err.to_string(),
            "No producer matches 'A.out' of type 'Examples'"
        );

        let err = err.at("B", "examples");
        assert_eq!(
            err.to_string(),
            "No producer matches 'A.out' of type 'Examples' (for input 'examples' of node 'B')"
        );
    }

    #[test]
    fn test_at_leaves_other_errors_untouched() {
        let err = Error::UnknownNode {
            node_id: "x".to_string(),
        };
        assert_eq!(err.clone().at("a", "b"), err);
    }

    #[test]
    fn test_cycle_message_lists_nodes() {
        let err = Error::CyclicGraph {
            nodes: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().contains("a -> b"));
    }

    #[test]
    fn test_ir_errors_are_transparent() {
        let err = Error::from(pipeline_ir::Error::unknown_type("Model"));
        assert_eq!(err.to_string(), "Unknown artifact type 'Model'");
    }
}
