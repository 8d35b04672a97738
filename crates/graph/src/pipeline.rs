//! The resolved, validated pipeline.

use crate::{Edge, Node};
use petgraph::graph::{DiGraph, NodeIndex};
use pipeline_ir::{Context, ExecutionMode, RuntimeParameter};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A validated pipeline: nodes in declaration order plus the resolved edge list.
///
/// Produced by [`PipelineBuilder::build`](crate::PipelineBuilder::build) and
/// never mutated afterwards. Handed to an external scheduler, which uses
/// [`edges`](Self::edges) (or the traversal helpers) for ordering decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    id: String,
    execution_mode: ExecutionMode,
    contexts: Vec<Arc<Context>>,
    runtime_parameters: Vec<RuntimeParameter>,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    deployment_config: BTreeMap<String, serde_json::Value>,
}

impl Pipeline {
    pub(crate) fn from_parts(
        id: String,
        execution_mode: ExecutionMode,
        contexts: Vec<Arc<Context>>,
        runtime_parameters: Vec<RuntimeParameter>,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        deployment_config: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id().to_string(), idx))
            .collect();
        Self {
            id,
            execution_mode,
            contexts,
            runtime_parameters,
            nodes,
            index,
            edges,
            deployment_config,
        }
    }

    /// Pipeline id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Execution mode.
    #[must_use]
    pub const fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    /// Distinct contexts used by the pipeline and its nodes.
    #[must_use]
    pub fn contexts(&self) -> &[Arc<Context>] {
        &self.contexts
    }

    /// Runtime parameters.
    #[must_use]
    pub fn runtime_parameters(&self) -> &[RuntimeParameter] {
        &self.runtime_parameters
    }

    /// Look up a runtime parameter by name.
    #[must_use]
    pub fn runtime_parameter(&self, name: &str) -> Option<&RuntimeParameter> {
        self.runtime_parameters.iter().find(|p| p.name == name)
    }

    /// Nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Whether a node exists.
    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Position of a node in declaration order.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// The resolved edge list.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges feeding a node.
    pub fn edges_into<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.consumer == id)
    }

    /// Edges leaving a node.
    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.producer == id)
    }

    /// Distinct direct producers of a node, in declaration order.
    #[must_use]
    pub fn upstream_nodes(&self, id: &str) -> Vec<&str> {
        self.neighbours(self.edges_into(id).map(|edge| edge.producer.as_str()))
    }

    /// Distinct direct consumers of a node, in declaration order.
    #[must_use]
    pub fn downstream_nodes(&self, id: &str) -> Vec<&str> {
        self.neighbours(self.edges_from(id).map(|edge| edge.consumer.as_str()))
    }

    fn neighbours<'b>(&self, ids: impl Iterator<Item = &'b str>) -> Vec<&str> {
        let mut positions: Vec<usize> = ids.filter_map(|id| self.position(id)).collect();
        positions.sort_unstable();
        positions.dedup();
        positions
            .into_iter()
            .map(|idx| self.nodes[idx].id())
            .collect()
    }

    /// Opaque deployment config of a node, passed through unchanged.
    #[must_use]
    pub fn deployment_config(&self, node_id: &str) -> Option<&serde_json::Value> {
        self.deployment_config.get(node_id)
    }

    /// All deployment configs keyed by node id.
    #[must_use]
    pub const fn deployment_configs(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.deployment_config
    }

    /// Producer-to-consumer graph over node positions.
    ///
    /// Node weights are positions in [`nodes`](Self::nodes); parallel edges
    /// between the same pair are collapsed.
    pub(crate) fn dependency_graph(&self) -> DiGraph<usize, ()> {
        dependency_graph(&self.nodes, &self.index, &self.edges)
    }
}

pub(crate) fn dependency_graph(
    nodes: &[Node],
    index: &HashMap<String, usize>,
    edges: &[Edge],
) -> DiGraph<usize, ()> {
    let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
    for idx in 0..nodes.len() {
        graph.add_node(idx);
    }
    for edge in edges {
        if let (Some(&from), Some(&to)) = (index.get(&edge.producer), index.get(&edge.consumer)) {
            graph.update_edge(NodeIndex::new(from), NodeIndex::new(to), ());
        }
    }
    graph
}
