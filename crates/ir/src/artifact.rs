//! Artifact instances.
//!
//! An [`Artifact`] is an immutable record of one produced artifact. Its
//! `properties` are checked against the referenced [`ArtifactType`] schema when
//! the artifact is built; `custom_properties` accept any key and only carry a
//! kind tag, which the [`Value`] union already guarantees.

use crate::error::SchemaMismatch;
use crate::{ArtifactType, Error, Result, TypeRegistry, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A typed artifact produced by a node execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    artifact_type: Arc<ArtifactType>,
    uri: Option<String>,
    properties: BTreeMap<String, Value>,
    custom_properties: BTreeMap<String, Value>,
}

impl Artifact {
    /// Start building an artifact of the given type.
    #[must_use]
    pub fn builder(artifact_type: Arc<ArtifactType>) -> ArtifactBuilder {
        ArtifactBuilder::new(artifact_type)
    }

    /// Start building an artifact of a type registered in `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if the type is not registered.
    pub fn from_registry(registry: &TypeRegistry, type_name: &str) -> Result<ArtifactBuilder> {
        registry.lookup(type_name).map(ArtifactBuilder::new)
    }

    /// The artifact type.
    #[must_use]
    pub fn artifact_type(&self) -> &Arc<ArtifactType> {
        &self.artifact_type
    }

    /// Location of the artifact payload, if known.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Schema-validated properties.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Producer-specific properties outside the type schema.
    #[must_use]
    pub const fn custom_properties(&self) -> &BTreeMap<String, Value> {
        &self.custom_properties
    }

    /// Look up a schema property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Look up a custom property.
    #[must_use]
    pub fn custom_property(&self, key: &str) -> Option<&Value> {
        self.custom_properties.get(key)
    }
}

/// Builder for [`Artifact`].
#[derive(Debug, Clone)]
pub struct ArtifactBuilder {
    artifact_type: Arc<ArtifactType>,
    uri: Option<String>,
    properties: BTreeMap<String, Value>,
    custom_properties: BTreeMap<String, Value>,
}

impl ArtifactBuilder {
    /// Create a builder for the given type.
    #[must_use]
    pub fn new(artifact_type: Arc<ArtifactType>) -> Self {
        Self {
            artifact_type,
            uri: None,
            properties: BTreeMap::new(),
            custom_properties: BTreeMap::new(),
        }
    }

    /// Set the payload location.
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set a schema property. Validated in [`build`](Self::build).
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set a custom property.
    #[must_use]
    pub fn custom_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_properties.insert(key.into(), value.into());
        self
    }

    /// Validate the schema properties and build the artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertySchemaMismatch`] for the first property (in
    /// key order) that is not declared by the type or whose kind differs
    /// from the declared kind.
    pub fn build(self) -> Result<Artifact> {
        for (key, value) in &self.properties {
            let reason = match self.artifact_type.property_kind(key) {
                None => Some(SchemaMismatch::UnknownProperty),
                Some(expected) if expected != value.kind() => Some(SchemaMismatch::KindMismatch {
                    expected,
                    found: value.kind(),
                }),
                Some(_) => None,
            };
            if let Some(reason) = reason {
                return Err(Error::schema_mismatch(
                    self.artifact_type.name(),
                    key.clone(),
                    reason,
                ));
            }
        }

        Ok(Artifact {
            artifact_type: self.artifact_type,
            uri: self.uri,
            properties: self.properties,
            custom_properties: self.custom_properties,
        })
    }
}
