//! Pipeline graph builder.
//!
//! Turns a [`PipelineDefinition`] into a validated [`Pipeline`]:
//!
//! 1. check runtime parameters
//! 2. register node ids, rejecting duplicates
//! 3. check every declared output type against the shared [`TypeRegistry`]
//! 4. resolve every input channel into an [`Edge`]
//! 5. apply the execution-mode cycle policy
//!
//! All problems found along the way are returned together in a
//! [`ValidationReport`]. Output types are only written to the registry once
//! the whole pipeline is valid, so a failed build leaves the registry as it
//! was and running it again on the same definition yields an equal result.

use crate::pipeline::dependency_graph;
use crate::{ChannelResolver, Edge, Error, Node, Pipeline, ValidationReport};
use petgraph::algo::tarjan_scc;
use pipeline_ir::{
    ArtifactType, ContextInterner, ExecutionMode, NodeDefinition, PipelineDefinition, TypeRegistry,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info_span, warn};

/// How the builder treats cycles among resolved edges.
///
/// Self references are rejected under every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePolicy {
    /// Every cycle is an error (SYNC pipelines run as one ordered pass).
    Reject,
    /// Feedback between distinct nodes is allowed (ASYNC pipelines re-trigger).
    AllowFeedback,
}

impl From<ExecutionMode> for CyclePolicy {
    fn from(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::Sync => Self::Reject,
            ExecutionMode::Async => Self::AllowFeedback,
        }
    }
}

impl CyclePolicy {
    /// Check resolved edges against this policy.
    ///
    /// Returns one [`Error::CyclicGraph`] per strongly connected component
    /// with more than one node, listing its members in declaration order.
    #[must_use]
    pub fn check(self, nodes: &[Node], edges: &[Edge]) -> Vec<Error> {
        match self {
            Self::AllowFeedback => Vec::new(),
            Self::Reject => {
                let index: HashMap<String, usize> = nodes
                    .iter()
                    .enumerate()
                    .map(|(idx, node)| (node.id().to_string(), idx))
                    .collect();
                let graph = dependency_graph(nodes, &index, edges);

                let mut components: Vec<Vec<usize>> = tarjan_scc(&graph)
                    .into_iter()
                    .filter(|component| component.len() > 1)
                    .map(|component| {
                        let mut members: Vec<usize> =
                            component.into_iter().map(|n| graph[n]).collect();
                        members.sort_unstable();
                        members
                    })
                    .collect();
                components.sort();

                components
                    .into_iter()
                    .map(|members| Error::CyclicGraph {
                        nodes: members
                            .into_iter()
                            .map(|idx| nodes[idx].id().to_string())
                            .collect(),
                    })
                    .collect()
            }
        }
    }
}

/// Builds validated pipelines against a shared type registry.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    registry: Arc<TypeRegistry>,
}

impl PipelineBuilder {
    /// Create a builder over `registry`.
    #[must_use]
    pub const fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// The registry output types are registered in.
    #[must_use]
    pub const fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Build and validate a pipeline.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationReport`] holding every error found.
    pub fn build(&self, definition: &PipelineDefinition) -> Result<Pipeline, ValidationReport> {
        let span = info_span!(
            "build_pipeline",
            pipeline_id = %definition.id,
            mode = %definition.execution_mode,
            nodes = definition.nodes.len(),
        );
        let _enter = span.enter();

        let mut errors: Vec<Error> = definition
            .runtime_parameter_errors()
            .into_iter()
            .map(Error::from)
            .collect();

        let accepted = accept_unique_ids(&definition.nodes, &mut errors);

        let mut interner = ContextInterner::new();
        interner.intern_all(&definition.contexts);

        let mut staged = StagedTypes::default();
        let nodes: Vec<Node> = accepted
            .into_iter()
            .map(|node| {
                self.bind_node(definition, node, &mut interner, &mut staged, &mut errors)
            })
            .collect();

        let edges = self.resolve_edges(&nodes, &staged, &mut errors);
        errors.extend(CyclePolicy::from(definition.execution_mode).check(&nodes, &edges));

        for node_id in definition.deployment_config.keys() {
            if !nodes.iter().any(|node| node.id() == node_id) {
                warn!(node_id = %node_id, "Deployment config refers to an unknown node");
            }
        }

        if errors.is_empty()
            && let Err(err) = self.registry.register_all(staged.into_types())
        {
            errors.push(err.into());
        }

        if !errors.is_empty() {
            debug!(errors = errors.len(), "Pipeline failed validation");
            return Err(ValidationReport::new(&definition.id, errors));
        }

        debug!(edges = edges.len(), "Pipeline validated");
        Ok(Pipeline::from_parts(
            definition.id.clone(),
            definition.execution_mode,
            interner.into_contexts(),
            definition.runtime_parameters.clone(),
            nodes,
            edges,
            definition.deployment_config.clone(),
        ))
    }

    /// Bind output types and intern contexts for one node.
    ///
    /// Pipeline-level contexts come first, followed by the node's own.
    fn bind_node(
        &self,
        definition: &PipelineDefinition,
        node: &NodeDefinition,
        interner: &mut ContextInterner,
        staged: &mut StagedTypes,
        errors: &mut Vec<Error>,
    ) -> Node {
        let contexts = interner.intern_all(definition.contexts.iter().chain(&node.contexts));

        let outputs: BTreeMap<String, Arc<ArtifactType>> = node
            .outputs
            .iter()
            .map(|(key, artifact_type)| {
                let bound = match staged.stage(&self.registry, artifact_type) {
                    Ok(bound) => bound,
                    Err(err) => {
                        errors.push(err.into());
                        // Keep the declared schema so consumers still resolve.
                        Arc::new(artifact_type.clone())
                    }
                };
                (key.clone(), bound)
            })
            .collect();

        Node::from_parts(node.id.clone(), contexts, outputs, node.inputs.clone())
    }

    fn resolve_edges(
        &self,
        nodes: &[Node],
        staged: &StagedTypes,
        errors: &mut Vec<Error>,
    ) -> Vec<Edge> {
        let resolver = ChannelResolver::new(nodes);
        let mut seen = HashSet::new();
        let mut edges = Vec::new();

        for node in nodes {
            for (input_key, query) in node.channels() {
                let self_named = query.producer_node_id.as_deref() == Some(node.id());
                if self_named {
                    errors.push(self_reference(node, input_key));
                }
                if !staged.contains(&query.artifact_type)
                    && !self.registry.contains(&query.artifact_type)
                {
                    errors.push(pipeline_ir::Error::unknown_type(&query.artifact_type).into());
                    continue;
                }
                if self_named {
                    continue;
                }

                match resolver.resolve(query) {
                    Ok(producer) if producer.node.id() == node.id() => {
                        errors.push(self_reference(node, input_key));
                    }
                    Ok(producer) => {
                        let edge = Edge {
                            producer: producer.node.id().to_string(),
                            output_key: producer.output_key.to_string(),
                            consumer: node.id().to_string(),
                            input_key: input_key.to_string(),
                            channel: query.clone(),
                        };
                        debug!(%edge, "Resolved channel");
                        let key = (
                            edge.producer.clone(),
                            edge.output_key.clone(),
                            edge.consumer.clone(),
                            edge.input_key.clone(),
                        );
                        if seen.insert(key) {
                            edges.push(edge);
                        }
                    }
                    Err(err) => errors.push(err.at(node.id(), input_key)),
                }
            }
        }

        edges
    }
}

/// Output types declared by one build, checked against the registry but not
/// yet written to it.
#[derive(Debug, Default)]
struct StagedTypes {
    types: HashMap<String, Arc<ArtifactType>>,
}

impl StagedTypes {
    /// Bind a declared type to the registered instance, or stage a new one.
    fn stage(
        &mut self,
        registry: &TypeRegistry,
        artifact_type: &ArtifactType,
    ) -> pipeline_ir::Result<Arc<ArtifactType>> {
        let name = artifact_type.name();
        let existing = self
            .types
            .get(name)
            .cloned()
            .or_else(|| registry.lookup(name).ok());

        match existing {
            Some(existing) if existing.properties() == artifact_type.properties() => Ok(existing),
            Some(_) => Err(pipeline_ir::Error::duplicate_type(name)),
            None => {
                let staged = Arc::new(artifact_type.clone());
                self.types.insert(name.to_string(), Arc::clone(&staged));
                Ok(staged)
            }
        }
    }

    fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    fn into_types(self) -> impl Iterator<Item = Arc<ArtifactType>> {
        self.types.into_values()
    }
}

/// Keep the first declaration of every node id, reporting the rest.
fn accept_unique_ids<'a>(
    nodes: &'a [NodeDefinition],
    errors: &mut Vec<Error>,
) -> Vec<&'a NodeDefinition> {
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(nodes.len());
    for node in nodes {
        if seen.insert(node.id.as_str()) {
            accepted.push(node);
        } else {
            warn!(node_id = %node.id, "Duplicate node id");
            errors.push(Error::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }
    accepted
}

fn self_reference(node: &Node, input_key: &str) -> Error {
    Error::SelfReference {
        node_id: node.id().to_string(),
        input_key: input_key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_ir::{ChannelQuery, Context, PropertyKind, RuntimeParameter};

    fn examples() -> ArtifactType {
        ArtifactType::new("Examples", [("span", PropertyKind::Int)])
    }

    fn producer(id: &str) -> NodeDefinition {
        NodeDefinition::new(id).with_output("out", examples()).unwrap()
    }

    fn consumer(id: &str, from: &str) -> NodeDefinition {
        NodeDefinition::new(id)
            .with_input("in", ChannelQuery::from_producer(from, "out", "Examples"))
    }

    fn relay(id: &str, from: &str) -> NodeDefinition {
        consumer(id, from).with_output("out", examples()).unwrap()
    }

    fn builder() -> PipelineBuilder {
        PipelineBuilder::new(Arc::new(TypeRegistry::new()))
    }

    #[test]
    fn test_cycle_policy_from_mode() {
        assert_eq!(CyclePolicy::from(ExecutionMode::Sync), CyclePolicy::Reject);
        assert_eq!(
            CyclePolicy::from(ExecutionMode::Async),
            CyclePolicy::AllowFeedback
        );
    }

    #[test]
    fn test_build_linear_pipeline() {
        let definition = PipelineDefinition::new("linear", ExecutionMode::Sync)
            .with_node(producer("a"))
            .with_node(relay("b", "a"))
            .with_node(consumer("c", "b"));

        let pipeline = builder().build(&definition).unwrap();

        assert_eq!(pipeline.node_count(), 3);
        assert_eq!(pipeline.edges().len(), 2);
        assert_eq!(pipeline.upstream_nodes("b"), vec!["a"]);
        assert_eq!(pipeline.downstream_nodes("b"), vec!["c"]);
    }

    #[test]
    fn test_pipeline_contexts_attached_to_every_node() {
        let definition = PipelineDefinition::new("p", ExecutionMode::Sync)
            .with_context(Context::new("pipeline", "p"))
            .with_node(producer("a").with_context(Context::new("node", "p.a")))
            .with_node(producer("b").with_context(Context::new("node", "p.b")));

        let pipeline = builder().build(&definition).unwrap();

        assert_eq!(pipeline.contexts().len(), 3);
        let a = pipeline.node("a").unwrap();
        let b = pipeline.node("b").unwrap();
        assert!(Arc::ptr_eq(&a.contexts()[0], &b.contexts()[0]));
        assert_eq!(*a.contexts()[0], Context::new("pipeline", "p"));
    }

    #[test]
    fn test_errors_are_accumulated() {
        let definition = PipelineDefinition::new("broken", ExecutionMode::Sync)
            .with_runtime_parameter(RuntimeParameter::new(
                "root",
                PropertyKind::Int,
                Some("not-an-int".into()),
            ))
            .with_node(producer("a"))
            .with_node(producer("a"))
            .with_node(consumer("b", "missing"))
            .with_node(
                NodeDefinition::new("c")
                    .with_input("in", ChannelQuery::from_producer("a", "out", "Unregistered")),
            );

        let report = builder().build(&definition).unwrap_err();

        assert_eq!(report.len(), 4);
        assert!(report.contains(|e| matches!(
            e,
            Error::Ir(pipeline_ir::Error::InvalidRuntimeParameter { .. })
        )));
        assert!(report.contains(|e| matches!(e, Error::DuplicateNodeId { .. })));
        assert!(report.contains(|e| matches!(e, Error::NoMatchingProducer { .. })));
        assert!(report.contains(|e| matches!(
            e,
            Error::Ir(pipeline_ir::Error::UnknownType { .. })
        )));
    }

    #[test]
    fn test_conflicting_output_types_reported() {
        let definition = PipelineDefinition::new("p", ExecutionMode::Sync)
            .with_node(producer("a"))
            .with_node(
                NodeDefinition::new("b")
                    .with_output(
                        "out",
                        ArtifactType::new("Examples", [("span", PropertyKind::String)]),
                    )
                    .unwrap(),
            );

        let report = builder().build(&definition).unwrap_err();
        assert_eq!(
            report.errors(),
            &[Error::Ir(pipeline_ir::Error::duplicate_type("Examples"))]
        );
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let definition = PipelineDefinition::new("p", ExecutionMode::Sync)
            .with_node(producer("a"))
            .with_node(
                consumer("b", "a")
                    .with_input("in", ChannelQuery::from_producer("a", "out", "Examples")),
            );

        let pipeline = builder().build(&definition).unwrap();
        assert_eq!(pipeline.edges().len(), 1);
    }

    #[test]
    fn test_edges_differing_only_in_filters_collapse() {
        let definition = PipelineDefinition::new("p", ExecutionMode::Sync)
            .with_context(Context::new("pipeline", "p"))
            .with_node(producer("a"))
            .with_node(consumer("b", "a").with_input(
                "in",
                ChannelQuery::from_producer("a", "out", "Examples")
                    .with_context(Context::new("pipeline", "p")),
            ));

        let pipeline = builder().build(&definition).unwrap();
        assert_eq!(pipeline.edges().len(), 1);
        assert_eq!(pipeline.edges()[0].to_string(), "a.out -> b.in");
    }

    #[test]
    fn test_failed_build_leaves_registry_untouched() {
        let registry = Arc::new(TypeRegistry::new());
        let builder = PipelineBuilder::new(Arc::clone(&registry));

        let invalid = PipelineDefinition::new("invalid", ExecutionMode::Sync)
            .with_node(producer("a"))
            .with_node(consumer("b", "missing"));
        builder.build(&invalid).unwrap_err();
        assert!(registry.is_empty());

        let retyped = PipelineDefinition::new("retyped", ExecutionMode::Sync).with_node(
            NodeDefinition::new("a")
                .with_output(
                    "out",
                    ArtifactType::new("Examples", [("span", PropertyKind::String)]),
                )
                .unwrap(),
        );
        let pipeline = builder.build(&retyped).unwrap();
        assert_eq!(registry.type_names(), vec!["Examples"]);
        assert_eq!(
            registry.lookup("Examples").unwrap().property_kind("span"),
            Some(PropertyKind::String)
        );
        assert!(Arc::ptr_eq(
            pipeline.node("a").unwrap().output_type("out").unwrap(),
            &registry.lookup("Examples").unwrap()
        ));
    }

    #[test]
    fn test_types_registered_within_one_build_resolve() {
        let registry = Arc::new(TypeRegistry::new());
        let definition = PipelineDefinition::new("p", ExecutionMode::Sync)
            .with_node(producer("a"))
            .with_node(relay("b", "a"));

        PipelineBuilder::new(Arc::clone(&registry))
            .build(&definition)
            .unwrap();
        assert_eq!(registry.type_names(), vec!["Examples"]);
    }

    #[test]
    fn test_self_named_query_with_unknown_type() {
        let definition = PipelineDefinition::new("p", ExecutionMode::Async).with_node(
            producer("a").with_input("loop", ChannelQuery::from_producer("a", "out", "Nope")),
        );

        let report = builder().build(&definition).unwrap_err();
        assert_eq!(
            report.errors(),
            &[
                Error::SelfReference {
                    node_id: "a".to_string(),
                    input_key: "loop".to_string(),
                },
                Error::Ir(pipeline_ir::Error::unknown_type("Nope")),
            ]
        );
    }

    #[test]
    fn test_context_only_self_match_is_self_reference() {
        let definition = PipelineDefinition::new("p", ExecutionMode::Async).with_node(
            producer("a")
                .with_context(Context::new("node", "p.a"))
                .with_input(
                    "feedback",
                    ChannelQuery::by_contexts(
                        vec![Context::new("node", "p.a")],
                        "out",
                        "Examples",
                    ),
                ),
        );

        let report = builder().build(&definition).unwrap_err();
        assert_eq!(
            report.errors(),
            &[Error::SelfReference {
                node_id: "a".to_string(),
                input_key: "feedback".to_string(),
            }]
        );
    }

    #[test]
    fn test_cycle_members_reported_in_declaration_order() {
        let definition = PipelineDefinition::new("p", ExecutionMode::Sync)
            .with_node(relay("x", "z"))
            .with_node(relay("y", "x"))
            .with_node(relay("z", "y"));

        let report = builder().build(&definition).unwrap_err();
        assert_eq!(
            report.errors(),
            &[Error::CyclicGraph {
                nodes: vec!["x".to_string(), "y".to_string(), "z".to_string()],
            }]
        );
    }
}
