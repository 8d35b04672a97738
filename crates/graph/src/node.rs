//! Resolved pipeline nodes and dependency edges.

use crate::{Error, Result};
use pipeline_ir::{ArtifactType, ChannelQuery, Context, contexts_match};
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;

/// A pipeline node with its contexts and output types bound to shared instances.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: String,
    contexts: Vec<Arc<Context>>,
    outputs: BTreeMap<String, Arc<ArtifactType>>,
    inputs: BTreeMap<String, Vec<ChannelQuery>>,
}

impl Node {
    /// Create a node with no contexts, inputs or outputs.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            contexts: Vec::new(),
            outputs: BTreeMap::new(),
            inputs: BTreeMap::new(),
        }
    }

    pub(crate) fn from_parts(
        id: String,
        contexts: Vec<Arc<Context>>,
        outputs: BTreeMap<String, Arc<ArtifactType>>,
        inputs: BTreeMap<String, Vec<ChannelQuery>>,
    ) -> Self {
        Self {
            id,
            contexts,
            outputs,
            inputs,
        }
    }

    /// Attach a context. Repeated contexts are ignored.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<Arc<Context>>) -> Self {
        let context = context.into();
        if !self.contexts.iter().any(|c| **c == *context) {
            self.contexts.push(context);
        }
        self
    }

    /// Declare an output.
    ///
    /// # Errors
    ///
    /// Returns [`pipeline_ir::Error::DuplicateOutputKey`] (wrapped in
    /// [`Error::Ir`]) if `key` is already declared.
    pub fn with_output(
        mut self,
        key: impl Into<String>,
        artifact_type: Arc<ArtifactType>,
    ) -> Result<Self> {
        match self.outputs.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(artifact_type);
                Ok(self)
            }
            Entry::Occupied(slot) => Err(pipeline_ir::Error::DuplicateOutputKey {
                node_id: self.id.clone(),
                output_key: slot.key().clone(),
            }
            .into()),
        }
    }

    /// Append a channel to an input.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, query: ChannelQuery) -> Self {
        self.inputs.entry(key.into()).or_default().push(query);
        self
    }

    /// Node id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Contexts in declaration order.
    #[must_use]
    pub fn contexts(&self) -> &[Arc<Context>] {
        &self.contexts
    }

    /// Declared outputs.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<String, Arc<ArtifactType>> {
        &self.outputs
    }

    /// Type promised for an output key.
    #[must_use]
    pub fn output_type(&self, key: &str) -> Option<&Arc<ArtifactType>> {
        self.outputs.get(key)
    }

    /// Declared inputs.
    #[must_use]
    pub const fn inputs(&self) -> &BTreeMap<String, Vec<ChannelQuery>> {
        &self.inputs
    }

    /// Iterate over `(input key, channel)` pairs.
    pub fn channels(&self) -> impl Iterator<Item = (&str, &ChannelQuery)> {
        self.inputs
            .iter()
            .flat_map(|(key, queries)| queries.iter().map(move |query| (key.as_str(), query)))
    }

    /// Whether the node carries every context in `filters`.
    #[must_use]
    pub fn matches_contexts(&self, filters: &[Context]) -> bool {
        contexts_match(self.contexts.iter().map(|c| &**c), filters)
    }
}

/// A resolved data dependency: `(producer, output key) -> (consumer, input key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    /// Producer node id.
    pub producer: String,
    /// Producer output key.
    pub output_key: String,
    /// Consumer node id.
    pub consumer: String,
    /// Consumer input key.
    pub input_key: String,
    /// The channel this edge was resolved from.
    #[serde(skip)]
    pub channel: ChannelQuery,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.producer, self.output_key, self.consumer, self.input_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_ir::PropertyKind;

    #[test]
    fn test_with_context_dedupes() {
        let node = Node::new("a")
            .with_context(Context::new("pipeline", "p"))
            .with_context(Context::new("pipeline", "p"))
            .with_context(Context::new("node", "p.a"));
        assert_eq!(node.contexts().len(), 2);
        assert!(node.matches_contexts(&[Context::new("node", "p.a")]));
        assert!(!node.matches_contexts(&[Context::new("node", "p.b")]));
    }

    #[test]
    fn test_with_output_rejects_repeated_key() {
        let model = Arc::new(ArtifactType::new("Model", [("version", PropertyKind::Int)]));
        let node = Node::new("Trainer")
            .with_output("model", Arc::clone(&model))
            .unwrap();

        let err = node.with_output("model", model).unwrap_err();
        assert_eq!(
            err,
            Error::Ir(pipeline_ir::Error::DuplicateOutputKey {
                node_id: "Trainer".to_string(),
                output_key: "model".to_string(),
            })
        );
    }

    #[test]
    fn test_edge_display() {
        let edge = Edge {
            producer: "CustomProducer".to_string(),
            output_key: "stats".to_string(),
            consumer: "CustomConsumer".to_string(),
            input_key: "data".to_string(),
            channel: ChannelQuery::from_producer("CustomProducer", "stats", "ExampleStatistics"),
        };
        assert_eq!(edge.to_string(), "CustomProducer.stats -> CustomConsumer.data");
    }
}
