//! Typed model for pipeline intermediate representations.
//!
//! This crate holds the vocabulary that pipeline graphs are built from:
//!
//! - [`TypeRegistry`] and [`ArtifactType`]: canonical artifact types and their
//!   typed property schemas, shared across concurrent compilations
//! - [`Artifact`]: an immutable artifact record with schema-checked
//!   `properties` and schema-free `custom_properties`
//! - [`Context`]: typed tags used to group and query nodes
//! - [`PipelineDefinition`], [`NodeDefinition`], [`ChannelQuery`]: the wire
//!   form emitted by a compiler front-end
//!
//! # Example
//!
//! ```
//! use pipeline_ir::{Artifact, PropertyKind, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! registry
//!     .register(
//!         "ExampleStatistics",
//!         [("span".to_string(), PropertyKind::Int)].into_iter().collect(),
//!     )
//!     .unwrap();
//!
//! let stats = Artifact::from_registry(&registry, "ExampleStatistics")
//!     .unwrap()
//!     .property("span", 42)
//!     .custom_property("bar", "foo")
//!     .build()
//!     .unwrap();
//! assert_eq!(stats.custom_property("bar").and_then(|v| v.as_str()), Some("foo"));
//! ```

mod artifact;
mod context;
mod definition;
mod error;
mod registry;
mod value;

pub use artifact::{Artifact, ArtifactBuilder};
pub use context::{Context, ContextInterner, contexts_match};
pub use definition::{
    ChannelQuery, ExecutionMode, NodeDefinition, PipelineDefinition, RuntimeParameter,
};
pub use error::{Error, Result, SchemaMismatch};
pub use registry::{ArtifactType, PropertySchema, TypeRegistry};
pub use value::{PropertyKind, Value};
