//! Channel resolution and DAG validation for pipeline definitions.
//!
//! This crate turns a [`pipeline_ir::PipelineDefinition`] into a validated
//! [`Pipeline`]: every input channel is bound to exactly one producer output,
//! node ids are checked for uniqueness, and the execution mode decides whether
//! cycles are allowed. Errors are accumulated into one [`ValidationReport`].
//!
//! # Example
//!
//! ```
//! use pipeline_ir::{
//!     ArtifactType, ChannelQuery, ExecutionMode, NodeDefinition, PipelineDefinition,
//!     PropertyKind, TypeRegistry,
//! };
//! use pipeline_ir_graph::PipelineBuilder;
//! use std::sync::Arc;
//!
//! let examples = ArtifactType::new("Examples", [("span", PropertyKind::Int)]);
//! let definition = PipelineDefinition::new("taxi", ExecutionMode::Sync)
//!     .with_node(NodeDefinition::new("ExampleGen").with_output("examples", examples)?)
//!     .with_node(NodeDefinition::new("StatisticsGen").with_input(
//!         "examples",
//!         ChannelQuery::from_producer("ExampleGen", "examples", "Examples"),
//!     ));
//!
//! let builder = PipelineBuilder::new(Arc::new(TypeRegistry::new()));
//! let pipeline = builder.build(&definition).expect("valid pipeline");
//! assert_eq!(pipeline.edges()[0].to_string(), "ExampleGen.examples -> StatisticsGen.examples");
//! # Ok::<(), pipeline_ir::Error>(())
//! ```

pub mod builder;
pub mod error;
pub mod node;
pub mod partial;
pub mod pipeline;
pub mod resolver;
pub mod traversal;
pub mod validation;

pub use builder::{CyclePolicy, PipelineBuilder};
pub use error::{ChannelSite, Error, Result};
pub use node::{Edge, Node};
pub use partial::FilteredPipeline;
pub use pipeline::Pipeline;
pub use resolver::{ChannelResolver, ResolvedProducer, resolve};
pub use traversal::{ExecutionLayers, TopologicalOrder, transitive_closure};
pub use validation::ValidationReport;
