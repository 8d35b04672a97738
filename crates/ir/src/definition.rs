//! Wire-level pipeline definitions.
//!
//! These are the unresolved records a front-end emits: node declarations with
//! inline output types and channel queries that name their producers by id.
//! Resolution into an executable graph happens in `pipeline-ir-graph`.

use crate::{ArtifactType, Context, Error, PropertyKind, Result, Value};
use schemars::JsonSchema;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

/// Execution mode of a pipeline.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// One ordered, completed pass over the DAG.
    #[default]
    Sync,
    /// Nodes re-trigger as new inputs arrive and may run concurrently.
    Async,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync => f.write_str("SYNC"),
            Self::Async => f.write_str("ASYNC"),
        }
    }
}

/// Declarative description of how one consumer input binds to a producer output.
///
/// The producer is referenced by id only; it is looked up when the channel
/// is resolved. Without an id, the producer is addressed by its contexts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ChannelQuery {
    /// Producer node id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_node_id: Option<String>,
    /// Contexts the producer must carry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_queries: Vec<Context>,
    /// Expected artifact type name.
    pub artifact_type: String,
    /// Producer output key to bind to.
    pub output_key: String,
}

impl ChannelQuery {
    /// Query a producer by id.
    #[must_use]
    pub fn from_producer(
        producer_node_id: impl Into<String>,
        output_key: impl Into<String>,
        artifact_type: impl Into<String>,
    ) -> Self {
        Self {
            producer_node_id: Some(producer_node_id.into()),
            context_queries: Vec::new(),
            artifact_type: artifact_type.into(),
            output_key: output_key.into(),
        }
    }

    /// Query a producer by contexts alone.
    #[must_use]
    pub fn by_contexts(
        context_queries: Vec<Context>,
        output_key: impl Into<String>,
        artifact_type: impl Into<String>,
    ) -> Self {
        Self {
            producer_node_id: None,
            context_queries,
            artifact_type: artifact_type.into(),
            output_key: output_key.into(),
        }
    }

    /// Add a required producer context.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context_queries.push(context);
        self
    }
}

impl std::fmt::Display for ChannelQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.producer_node_id {
            Some(id) => write!(f, "'{id}.{}'", self.output_key)?,
            None => write!(f, "'*.{}'", self.output_key)?,
        }
        write!(f, " of type '{}'", self.artifact_type)?;
        if !self.context_queries.is_empty() {
            let contexts = self
                .context_queries
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " with contexts [{contexts}]")?;
        }
        Ok(())
    }
}

/// A named, typed pipeline parameter resolved at run time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuntimeParameter {
    /// Parameter name.
    pub name: String,
    /// Declared kind.
    pub kind: PropertyKind,
    /// Default value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl RuntimeParameter {
    /// Create a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: PropertyKind, default: Option<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
        }
    }

    /// Check that the name is non-empty and the default matches the kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRuntimeParameter`] describing the problem.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_parameter(&self.name, "name must not be empty"));
        }
        match &self.default {
            Some(default) if default.kind() != self.kind => Err(Error::invalid_parameter(
                &self.name,
                format!(
                    "default value is {} but parameter is declared {}",
                    default.kind(),
                    self.kind
                ),
            )),
            _ => Ok(()),
        }
    }
}

/// An unresolved node declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NodeDefinition {
    /// Node id, unique within the pipeline.
    pub id: String,
    /// Contexts the node belongs to.
    #[serde(default)]
    pub contexts: Vec<Context>,
    /// Output key to promised artifact type. Keys must be unique.
    #[serde(default, deserialize_with = "deserialize_unique_outputs")]
    #[schemars(with = "BTreeMap<String, ArtifactType>")]
    pub outputs: BTreeMap<String, ArtifactType>,
    /// Input key to the channels feeding it.
    #[serde(default)]
    pub inputs: BTreeMap<String, Vec<ChannelQuery>>,
}

/// Decode an output map, rejecting repeated keys instead of keeping the last.
fn deserialize_unique_outputs<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, ArtifactType>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OutputsVisitor;

    impl<'de> Visitor<'de> for OutputsVisitor {
        type Value = BTreeMap<String, ArtifactType>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a map of output keys to artifact types")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut outputs = BTreeMap::new();
            while let Some((key, artifact_type)) = map.next_entry::<String, ArtifactType>()? {
                match outputs.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert(artifact_type);
                    }
                    Entry::Occupied(slot) => {
                        return Err(de::Error::custom(format!(
                            "duplicate output key '{}'",
                            slot.key()
                        )));
                    }
                }
            }
            Ok(outputs)
        }
    }

    deserializer.deserialize_map(OutputsVisitor)
}

impl NodeDefinition {
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

    /// Add a context.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.contexts.push(context);
        self
    }

    /// Declare an output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateOutputKey`] if `key` is already declared.
    pub fn add_output(
        &mut self,
        key: impl Into<String>,
        artifact_type: ArtifactType,
    ) -> Result<()> {
        let key = key.into();
        if self.outputs.contains_key(&key) {
            return Err(Error::DuplicateOutputKey {
                node_id: self.id.clone(),
                output_key: key,
            });
        }
        self.outputs.insert(key, artifact_type);
        Ok(())
    }

    /// Declare an output, consuming and returning the node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateOutputKey`] if `key` is already declared.
    pub fn with_output(
        mut self,
        key: impl Into<String>,
        artifact_type: ArtifactType,
    ) -> Result<Self> {
        self.add_output(key, artifact_type)?;
        Ok(self)
    }

    /// Append a channel to an input.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, query: ChannelQuery) -> Self {
        self.inputs.entry(key.into()).or_default().push(query);
        self
    }

    /// Iterate over `(input key, channel)` pairs.
    pub fn channels(&self) -> impl Iterator<Item = (&str, &ChannelQuery)> {
        self.inputs
            .iter()
            .flat_map(|(key, queries)| queries.iter().map(move |query| (key.as_str(), query)))
    }
}

/// An unresolved pipeline as emitted by a compiler front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineDefinition {
    /// Pipeline id.
    pub id: String,
    /// Execution mode.
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    /// Pipeline-level contexts shared by every node.
    #[serde(default)]
    pub contexts: Vec<Context>,
    /// Runtime parameters (e.g. the pipeline root path).
    #[serde(default)]
    pub runtime_parameters: Vec<RuntimeParameter>,
    /// Nodes in declaration order.
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    /// Opaque per-node deployment configuration keyed by node id.
    #[serde(default)]
    pub deployment_config: BTreeMap<String, serde_json::Value>,
}

impl PipelineDefinition {
    /// Create an empty pipeline definition.
    #[must_use]
    pub fn new(id: impl Into<String>, execution_mode: ExecutionMode) -> Self {
        Self {
            id: id.into(),
            execution_mode,
            contexts: Vec::new(),
            runtime_parameters: Vec::new(),
            nodes: Vec::new(),
            deployment_config: BTreeMap::new(),
        }
    }

    /// Add a pipeline-level context.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.contexts.push(context);
        self
    }

    /// Append a node.
    #[must_use]
    pub fn with_node(mut self, node: NodeDefinition) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a runtime parameter.
    #[must_use]
    pub fn with_runtime_parameter(mut self, parameter: RuntimeParameter) -> Self {
        self.runtime_parameters.push(parameter);
        self
    }

    /// Attach an opaque deployment config to a node id.
    #[must_use]
    pub fn with_deployment_config(
        mut self,
        node_id: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        self.deployment_config.insert(node_id.into(), config);
        self
    }

    /// Validate every runtime parameter and their name uniqueness.
    ///
    /// Returns all problems found instead of stopping at the first one.
    #[must_use]
    pub fn runtime_parameter_errors(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        for parameter in &self.runtime_parameters {
            if let Err(err) = parameter.validate() {
                errors.push(err);
            }
            if !seen.insert(parameter.name.as_str()) {
                errors.push(Error::invalid_parameter(
                    &parameter.name,
                    "declared more than once",
                ));
            }
        }
        errors
    }

    /// Decode a definition from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on malformed input, including
    /// property values with an unknown kind tag.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode the definition as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
