//! Channel resolution.
//!
//! A [`ChannelQuery`] names its producer weakly, by id and/or contexts. The
//! [`ChannelResolver`] looks it up against a node set and returns exactly one
//! `(node, output key)` pair or an error. Resolution is a pure function of the
//! node set; callers that change the set simply build a new resolver.

use crate::{Error, Node, Result};
use pipeline_ir::ChannelQuery;
use std::collections::HashMap;

/// The producer a channel query resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedProducer<'a> {
    /// Position of the producer in the resolver's node slice.
    pub index: usize,
    /// The producer node.
    pub node: &'a Node,
    /// The bound output key.
    pub output_key: &'a str,
}

/// Resolves channel queries against a fixed node set.
#[derive(Debug)]
pub struct ChannelResolver<'a> {
    nodes: &'a [Node],
    by_id: HashMap<&'a str, Vec<usize>>,
}

impl<'a> ChannelResolver<'a> {
    /// Index `nodes` by id.
    #[must_use]
    pub fn new(nodes: &'a [Node]) -> Self {
        let mut by_id: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            by_id.entry(node.id()).or_default().push(idx);
        }
        Self { nodes, by_id }
    }

    /// The node set this resolver was built over.
    #[must_use]
    pub const fn nodes(&self) -> &'a [Node] {
        self.nodes
    }

    /// Resolve a query to its single producer.
    ///
    /// Candidates are the nodes with the queried id, or every node when the
    /// query addresses its producer by contexts alone. A candidate matches
    /// when it carries every queried context and declares `output_key` with
    /// the queried artifact type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoMatchingProducer`] when no candidate matches and
    /// [`Error::AmbiguousProducer`] when several do.
    pub fn resolve(&self, query: &ChannelQuery) -> Result<ResolvedProducer<'a>> {
        let candidates: Vec<usize> = match &query.producer_node_id {
            Some(id) => self.by_id.get(id.as_str()).cloned().unwrap_or_default(),
            None => (0..self.nodes.len()).collect(),
        };

        let nodes = self.nodes;
        let mut matches = candidates.into_iter().filter_map(|idx| {
            let node = &nodes[idx];
            if !node.matches_contexts(&query.context_queries) {
                return None;
            }
            let (key, artifact_type) = node.outputs().get_key_value(&query.output_key)?;
            (artifact_type.name() == query.artifact_type).then_some(ResolvedProducer {
                index: idx,
                node,
                output_key: key.as_str(),
            })
        });

        let Some(first) = matches.next() else {
            return Err(Error::NoMatchingProducer {
                query: query.to_string(),
                site: None,
            });
        };

        let rest: Vec<ResolvedProducer<'a>> = matches.collect();
        if rest.is_empty() {
            return Ok(first);
        }

        let candidates = std::iter::once(first)
            .chain(rest)
            .map(|producer| producer.node.id().to_string())
            .collect();
        Err(Error::AmbiguousProducer {
            query: query.to_string(),
            candidates,
            site: None,
        })
    }
}

/// Resolve a single query against `nodes`.
///
/// Convenience wrapper that builds a throwaway [`ChannelResolver`].
///
/// # Errors
///
/// See [`ChannelResolver::resolve`].
pub fn resolve<'a>(query: &ChannelQuery, nodes: &'a [Node]) -> Result<ResolvedProducer<'a>> {
    ChannelResolver::new(nodes).resolve(query)
}
