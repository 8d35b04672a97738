//! Partial runs: cutting a SYNC pipeline down to a sub-range of its nodes.
//!
//! A partial run starts at a set of `from` nodes and stops at a set of `to`
//! nodes. Everything outside that range is dropped, and the channels that
//! pointed at dropped producers are handed back so an orchestrator can feed
//! them from artifacts of an earlier run instead.

use crate::{Error, Node, Pipeline, Result};
use pipeline_ir::{ChannelQuery, ExecutionMode};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// The result of [`Pipeline::filter`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredPipeline {
    /// The pipeline restricted to the kept nodes.
    pub pipeline: Pipeline,
    /// For every removed producer, the channels of kept nodes that read from it.
    pub removed_producer_channels: BTreeMap<String, Vec<ChannelQuery>>,
}

impl Pipeline {
    /// Restrict the pipeline to the nodes between `from_nodes` and `to_nodes`.
    ///
    /// A node is kept when it is downstream of (or equal to) a node selected
    /// by `from_nodes`, and upstream of (or equal to) a node selected by
    /// `to_nodes`. Kept nodes stay in declaration order with their inputs
    /// unchanged. Edges from removed producers are dropped and their channels
    /// reported in [`FilteredPipeline::removed_producer_channels`]; deployment
    /// configs of removed nodes are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedExecutionMode`] for ASYNC pipelines and
    /// [`Error::NotTopologicallySorted`] when declaration order does not
    /// respect the edges.
    pub fn filter(
        &self,
        from_nodes: impl Fn(&str) -> bool,
        to_nodes: impl Fn(&str) -> bool,
    ) -> Result<FilteredPipeline> {
        if self.execution_mode() != ExecutionMode::Sync {
            return Err(Error::UnsupportedExecutionMode {
                operation: "Pipeline filtering",
                mode: self.execution_mode(),
            });
        }
        self.check_topologically_sorted()?;

        let ids = || self.nodes().iter().map(Node::id);
        let downstream: HashSet<&str> = self
            .downstream_closure(ids().filter(|id| from_nodes(id)))?
            .into_iter()
            .collect();
        let upstream: HashSet<&str> = self
            .upstream_closure(ids().filter(|id| to_nodes(id)))?
            .into_iter()
            .collect();
        let kept: HashSet<&str> = downstream.intersection(&upstream).copied().collect();

        let mut removed_producer_channels: BTreeMap<String, Vec<ChannelQuery>> = BTreeMap::new();
        for edge in self.edges() {
            if kept.contains(edge.consumer.as_str()) && !kept.contains(edge.producer.as_str()) {
                let channels = removed_producer_channels
                    .entry(edge.producer.clone())
                    .or_default();
                if !channels.contains(&edge.channel) {
                    channels.push(edge.channel.clone());
                }
            }
        }

        let nodes: Vec<Node> = self
            .nodes()
            .iter()
            .filter(|node| kept.contains(node.id()))
            .cloned()
            .collect();

        let edges = self
            .edges()
            .iter()
            .filter(|edge| {
                kept.contains(edge.producer.as_str()) && kept.contains(edge.consumer.as_str())
            })
            .cloned()
            .collect();

        let contexts = self
            .contexts()
            .iter()
            .filter(|context| {
                nodes
                    .iter()
                    .any(|node| node.contexts().iter().any(|c| Arc::ptr_eq(c, context)))
            })
            .cloned()
            .collect();

        let deployment_config = self
            .deployment_configs()
            .iter()
            .filter(|(node_id, _)| kept.contains(node_id.as_str()))
            .map(|(node_id, config)| (node_id.clone(), config.clone()))
            .collect();

        info!(
            pipeline_id = %self.id(),
            kept = nodes.len(),
            removed = self.node_count() - nodes.len(),
            "Filtered pipeline"
        );
        for (producer, channels) in &removed_producer_channels {
            debug!(
                producer = %producer,
                channels = channels.len(),
                "Cut channels to removed producer"
            );
        }

        Ok(FilteredPipeline {
            pipeline: Pipeline::from_parts(
                self.id().to_string(),
                self.execution_mode(),
                contexts,
                self.runtime_parameters().to_vec(),
                nodes,
                edges,
                deployment_config,
            ),
            removed_producer_channels,
        })
    }

    /// [`filter`](Self::filter) with explicit id lists.
    ///
    /// An empty list selects every node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] for ids not in the pipeline, otherwise
    /// the errors of [`filter`](Self::filter).
    pub fn filter_by_ids(
        &self,
        from_ids: &[String],
        to_ids: &[String],
    ) -> Result<FilteredPipeline> {
        for id in from_ids.iter().chain(to_ids) {
            if !self.contains_node(id) {
                return Err(Error::UnknownNode {
                    node_id: id.clone(),
                });
            }
        }
        let selects = |ids: &[String], id: &str| ids.is_empty() || ids.iter().any(|s| s == id);
        self.filter(|id| selects(from_ids, id), |id| selects(to_ids, id))
    }
}
