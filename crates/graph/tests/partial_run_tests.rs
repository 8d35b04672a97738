//! Integration tests for partial-run filtering.

use pipeline_ir::{
    ArtifactType, ChannelQuery, Context, ExecutionMode, NodeDefinition, PipelineDefinition,
    PropertyKind, TypeRegistry,
};
use pipeline_ir_graph::{Error, Pipeline, PipelineBuilder};
use std::sync::Arc;

fn artifact(name: &str) -> ArtifactType {
    ArtifactType::new(name, [("span", PropertyKind::Int)])
}

/// ExampleGen -> StatisticsGen -> SchemaGen -> Trainer -> Pusher,
/// with Trainer also reading examples directly from ExampleGen.
fn taxi(mode: ExecutionMode) -> PipelineDefinition {
    PipelineDefinition::new("taxi", mode)
        .with_context(Context::new("pipeline", "taxi"))
        .with_node(
            NodeDefinition::new("ExampleGen")
                .with_output("examples", artifact("Examples"))
                .unwrap(),
        )
        .with_node(
            NodeDefinition::new("StatisticsGen")
                .with_context(Context::new("node", "taxi.StatisticsGen"))
                .with_input(
                    "examples",
                    ChannelQuery::from_producer("ExampleGen", "examples", "Examples"),
                )
                .with_output("statistics", artifact("ExampleStatistics"))
                .unwrap(),
        )
        .with_node(
            NodeDefinition::new("SchemaGen")
                .with_input(
                    "statistics",
                    ChannelQuery::from_producer("StatisticsGen", "statistics", "ExampleStatistics"),
                )
                .with_output("schema", artifact("Schema"))
                .unwrap(),
        )
        .with_node(
            NodeDefinition::new("Trainer")
                .with_input(
                    "examples",
                    ChannelQuery::from_producer("ExampleGen", "examples", "Examples"),
                )
                .with_input(
                    "schema",
                    ChannelQuery::from_producer("SchemaGen", "schema", "Schema"),
                )
                .with_output("model", artifact("Model"))
                .unwrap(),
        )
        .with_node(
            NodeDefinition::new("Pusher")
                .with_input("model", ChannelQuery::from_producer("Trainer", "model", "Model")),
        )
        .with_deployment_config("ExampleGen", serde_json::json!({ "image": "example-gen" }))
        .with_deployment_config("Trainer", serde_json::json!({ "image": "trainer" }))
}

fn build(definition: &PipelineDefinition) -> Pipeline {
    PipelineBuilder::new(Arc::new(TypeRegistry::new()))
        .build(definition)
        .unwrap()
}

fn ids(pipeline: &Pipeline) -> Vec<&str> {
    pipeline.nodes().iter().map(|node| node.id()).collect()
}

#[test]
fn test_filter_everything_is_identity() {
    let pipeline = build(&taxi(ExecutionMode::Sync));
    let filtered = pipeline.filter(|_| true, |_| true).unwrap();

    assert_eq!(filtered.pipeline, pipeline);
    assert!(filtered.removed_producer_channels.is_empty());
}

#[test]
fn test_filter_from_schema_gen_to_trainer() {
    let pipeline = build(&taxi(ExecutionMode::Sync));
    let filtered = pipeline
        .filter(|id| id == "SchemaGen", |id| id == "Trainer")
        .unwrap();

    assert_eq!(ids(&filtered.pipeline), vec!["SchemaGen", "Trainer"]);
    assert_eq!(filtered.pipeline.edges().len(), 1);
    assert_eq!(
        filtered.pipeline.edges()[0].to_string(),
        "SchemaGen.schema -> Trainer.schema"
    );

    let removed: Vec<&str> = filtered
        .removed_producer_channels
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(removed, vec!["ExampleGen", "StatisticsGen"]);
    assert_eq!(
        filtered.removed_producer_channels["ExampleGen"],
        vec![ChannelQuery::from_producer("ExampleGen", "examples", "Examples")]
    );

    // Inputs stay declared; only the edges to removed producers are gone.
    let trainer = filtered.pipeline.node("Trainer").unwrap();
    assert_eq!(trainer, pipeline.node("Trainer").unwrap());
    assert!(trainer.inputs().contains_key("schema"));
    assert!(trainer.inputs().contains_key("examples"));
    assert_eq!(filtered.pipeline.upstream_nodes("Trainer"), vec!["SchemaGen"]);
    let schema_gen = filtered.pipeline.node("SchemaGen").unwrap();
    assert_eq!(
        schema_gen.inputs()["statistics"],
        vec![ChannelQuery::from_producer(
            "StatisticsGen",
            "statistics",
            "ExampleStatistics"
        )]
    );
    assert!(filtered.pipeline.upstream_nodes("SchemaGen").is_empty());
}

#[test]
fn test_filter_drops_deployment_config_and_unused_contexts() {
    let pipeline = build(&taxi(ExecutionMode::Sync));
    let filtered = pipeline
        .filter(|id| id == "Trainer", |id| id == "Pusher")
        .unwrap();

    assert_eq!(ids(&filtered.pipeline), vec!["Trainer", "Pusher"]);
    assert!(filtered.pipeline.deployment_config("Trainer").is_some());
    assert!(filtered.pipeline.deployment_config("ExampleGen").is_none());

    let contexts: Vec<String> = filtered
        .pipeline
        .contexts()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(contexts, vec!["pipeline=taxi"]);
}

#[test]
fn test_filter_empty_range() {
    let pipeline = build(&taxi(ExecutionMode::Sync));
    let filtered = pipeline
        .filter(|id| id == "Pusher", |id| id == "ExampleGen")
        .unwrap();

    assert_eq!(filtered.pipeline.node_count(), 0);
    assert!(filtered.pipeline.edges().is_empty());
    assert!(filtered.removed_producer_channels.is_empty());
}

#[test]
fn test_filter_by_ids() {
    let pipeline = build(&taxi(ExecutionMode::Sync));

    let filtered = pipeline
        .filter_by_ids(&["StatisticsGen".to_string()], &[])
        .unwrap();
    assert_eq!(
        ids(&filtered.pipeline),
        vec!["StatisticsGen", "SchemaGen", "Trainer", "Pusher"]
    );

    assert_eq!(
        pipeline.filter_by_ids(&[], &["Missing".to_string()]),
        Err(Error::UnknownNode {
            node_id: "Missing".to_string()
        })
    );
}

#[test]
fn test_filter_rejects_async_pipeline() {
    let pipeline = build(&taxi(ExecutionMode::Async));
    assert_eq!(
        pipeline.filter(|_| true, |_| true),
        Err(Error::UnsupportedExecutionMode {
            operation: "Pipeline filtering",
            mode: ExecutionMode::Async,
        })
    );
}

#[test]
fn test_filter_requires_sorted_declaration_order() {
    let mut definition = taxi(ExecutionMode::Sync);
    definition.nodes.swap(0, 1);
    let pipeline = build(&definition);

    assert_eq!(
        pipeline.filter(|_| true, |_| true),
        Err(Error::NotTopologicallySorted {
            node_id: "StatisticsGen".to_string(),
            upstream: "ExampleGen".to_string(),
        })
    );
}
