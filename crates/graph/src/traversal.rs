//! Ordering and reachability over a resolved pipeline.
//!
//! Builds on the edge list only; nothing here re-resolves channels.

use crate::{Error, Node, Pipeline, Result};
use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::NodeIndex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Nodes in dependency order: every producer precedes its consumers.
pub type TopologicalOrder<'a> = Vec<&'a Node>;

/// Groups of nodes with no dependencies between them.
///
/// All nodes in group N depend only on nodes in groups before N, so a
/// scheduler can run each group concurrently once the previous one finished.
pub type ExecutionLayers<'a> = Vec<Vec<&'a Node>>;

impl Pipeline {
    /// Check if the resolved edges contain a cycle.
    ///
    /// Always `false` for a built SYNC pipeline.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.dependency_graph())
    }

    /// Nodes in topological order, ties broken by declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] if the graph contains a cycle, which
    /// only ASYNC pipelines may have.
    pub fn topological_order(&self) -> Result<TopologicalOrder<'_>> {
        let graph = self.dependency_graph();
        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let nodes = self.nodes();
        let mut order = Vec::with_capacity(nodes.len());
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(&nodes[idx]);
            for next in graph.neighbors(NodeIndex::new(idx)) {
                let degree = &mut in_degree[next.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(next.index()));
                }
            }
        }

        if order.len() != nodes.len() {
            let stuck: Vec<&str> = in_degree
                .iter()
                .enumerate()
                .filter(|&(_, &degree)| degree > 0)
                .map(|(idx, _)| nodes[idx].id())
                .collect();
            return Err(Error::CycleDetected {
                message: format!("nodes {} are part of or behind a cycle", stuck.join(", ")),
            });
        }

        Ok(order)
    }

    /// Group nodes by dependency level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] if the graph contains a cycle.
    pub fn execution_layers(&self) -> Result<ExecutionLayers<'_>> {
        let order = self.topological_order()?;
        let mut levels = vec![0usize; self.node_count()];
        let mut layers: ExecutionLayers<'_> = Vec::new();

        for node in order {
            let level = self
                .upstream_nodes(node.id())
                .into_iter()
                .filter_map(|id| self.position(id))
                .map(|idx| levels[idx] + 1)
                .max()
                .unwrap_or(0);

            if level >= layers.len() {
                layers.resize_with(level + 1, Vec::new);
            }
            layers[level].push(node);
            if let Some(idx) = self.position(node.id()) {
                levels[idx] = level;
            }
        }

        Ok(layers)
    }

    /// The given nodes plus everything they transitively depend on, in
    /// declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] if a seed id is not in the pipeline.
    pub fn upstream_closure<'s>(
        &self,
        ids: impl IntoIterator<Item = &'s str>,
    ) -> Result<Vec<&str>> {
        let seeds = self.seed_ids(ids)?;
        let closure = transitive_closure(seeds, |id| self.upstream_nodes(id));
        Ok(self.in_declaration_order(&closure))
    }

    /// The given nodes plus everything that transitively depends on them, in
    /// declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] if a seed id is not in the pipeline.
    pub fn downstream_closure<'s>(
        &self,
        ids: impl IntoIterator<Item = &'s str>,
    ) -> Result<Vec<&str>> {
        let seeds = self.seed_ids(ids)?;
        let closure = transitive_closure(seeds, |id| self.downstream_nodes(id));
        Ok(self.in_declaration_order(&closure))
    }

    /// Whether every producer is declared before its consumers.
    #[must_use]
    pub fn is_topologically_sorted(&self) -> bool {
        self.check_topologically_sorted().is_ok()
    }

    /// Verify that declaration order respects every edge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotTopologicallySorted`] for the first edge whose
    /// producer is declared after its consumer.
    pub fn check_topologically_sorted(&self) -> Result<()> {
        for edge in self.edges() {
            if self.position(&edge.producer) >= self.position(&edge.consumer) {
                return Err(Error::NotTopologicallySorted {
                    node_id: edge.consumer.clone(),
                    upstream: edge.producer.clone(),
                });
            }
        }
        Ok(())
    }

    fn seed_ids<'s>(&self, ids: impl IntoIterator<Item = &'s str>) -> Result<Vec<&str>> {
        ids.into_iter()
            .map(|id| {
                self.node(id).map(Node::id).ok_or_else(|| Error::UnknownNode {
                    node_id: id.to_string(),
                })
            })
            .collect()
    }

    fn in_declaration_order(&self, ids: &HashSet<&str>) -> Vec<&str> {
        self.nodes()
            .iter()
            .map(Node::id)
            .filter(|id| ids.contains(id))
            .collect()
    }
}

/// Compute the transitive closure of a set of node ids.
///
/// Starting from `initial`, repeatedly follows `next` until no new ids
/// appear. The result includes the starting ids.
///
/// # Example
///
/// ```
/// use pipeline_ir_graph::transitive_closure;
/// use std::collections::HashMap;
///
/// let producers: HashMap<&str, Vec<&str>> = [
///     ("ExampleGen", vec![]),
///     ("StatisticsGen", vec!["ExampleGen"]),
///     ("Trainer", vec!["StatisticsGen", "ExampleGen"]),
/// ]
/// .into_iter()
/// .collect();
///
/// let closure = transitive_closure(["Trainer"], |id| {
///     producers.get(id).cloned().unwrap_or_default()
/// });
/// assert_eq!(closure.len(), 3);
/// ```
#[must_use]
pub fn transitive_closure<'a, N>(
    initial: impl IntoIterator<Item = &'a str>,
    next: impl Fn(&str) -> N,
) -> HashSet<&'a str>
where
    N: IntoIterator<Item = &'a str>,
{
    let mut all = HashSet::new();
    let mut frontier: Vec<&str> = Vec::new();

    for id in initial {
        if all.insert(id) {
            frontier.push(id);
        }
    }

    while let Some(id) = frontier.pop() {
        for neighbour in next(id) {
            if all.insert(neighbour) {
                frontier.push(neighbour);
            }
        }
    }

    all
}
