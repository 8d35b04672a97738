//! Artifact type registry.
//!
//! The registry holds the canonical [`ArtifactType`] definitions. It is meant
//! to be shared (behind an [`Arc`]) by every compilation running in a
//! process: lookups take a shared read lock, registrations are serialized
//! behind the write lock and never overwrite an existing schema.

use crate::{Error, PropertyKind, Result};
use parking_lot::RwLock;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Property schema of an artifact type: property name to declared kind.
pub type PropertySchema = BTreeMap<String, PropertyKind>;

/// A named artifact type and its typed property schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ArtifactType {
    name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: PropertySchema,
}

impl ArtifactType {
    /// Create a new artifact type.
    #[must_use]
    pub fn new<K>(
        name: impl Into<String>,
        properties: impl IntoIterator<Item = (K, PropertyKind)>,
    ) -> Self
    where
        K: Into<String>,
    {
        Self {
            name: name.into(),
            properties: properties
                .into_iter()
                .map(|(key, kind)| (key.into(), kind))
                .collect(),
        }
    }

    /// The type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared property schema.
    #[must_use]
    pub const fn properties(&self) -> &PropertySchema {
        &self.properties
    }

    /// The declared kind of a property, if the schema has it.
    #[must_use]
    pub fn property_kind(&self, property: &str) -> Option<PropertyKind> {
        self.properties.get(property).copied()
    }
}

/// Process-wide registry of artifact types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<ArtifactType>>>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type from its name and property schema.
    ///
    /// Registering the same schema again is a no-op that returns the already
    /// registered type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateType`] if a different schema is already
    /// registered under `type_name`.
    pub fn register(&self, type_name: &str, schema: PropertySchema) -> Result<Arc<ArtifactType>> {
        self.register_type(ArtifactType {
            name: type_name.to_string(),
            properties: schema,
        })
    }

    /// Register a fully built [`ArtifactType`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateType`] on a conflicting schema.
    pub fn register_type(&self, artifact_type: ArtifactType) -> Result<Arc<ArtifactType>> {
        let mut types = self.types.write();

        if let Some(existing) = types.get(artifact_type.name()) {
            if existing.properties == artifact_type.properties {
                return Ok(Arc::clone(existing));
            }
            return Err(Error::duplicate_type(artifact_type.name()));
        }

        debug!(
            type_name = %artifact_type.name(),
            properties = artifact_type.properties.len(),
            "Registered artifact type"
        );
        let registered = Arc::new(artifact_type);
        types.insert(registered.name().to_string(), Arc::clone(&registered));
        Ok(registered)
    }

    /// Register several types under one write lock.
    ///
    /// Either every type is registered or, when one of them conflicts with a
    /// registered schema (or with another entry of `types`), none is.
    /// Already registered identical schemas are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateType`] for the first conflicting name.
    pub fn register_all(&self, types: impl IntoIterator<Item = Arc<ArtifactType>>) -> Result<()> {
        let types: Vec<Arc<ArtifactType>> = types.into_iter().collect();
        let mut registered = self.types.write();

        let mut pending: HashMap<&str, &Arc<ArtifactType>> = HashMap::new();
        for artifact_type in &types {
            let existing = registered
                .get(artifact_type.name())
                .or_else(|| pending.get(artifact_type.name()).copied());
            match existing {
                Some(existing) if existing.properties != artifact_type.properties => {
                    return Err(Error::duplicate_type(artifact_type.name()));
                }
                Some(_) => {}
                None => {
                    pending.insert(artifact_type.name(), artifact_type);
                }
            }
        }

        for artifact_type in pending.into_values() {
            debug!(
                type_name = %artifact_type.name(),
                properties = artifact_type.properties.len(),
                "Registered artifact type"
            );
            registered.insert(artifact_type.name().to_string(), Arc::clone(artifact_type));
        }
        Ok(())
    }

    /// Look up a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if nothing is registered under `type_name`.
    pub fn lookup(&self, type_name: &str) -> Result<Arc<ArtifactType>> {
        self.types
            .read()
            .get(type_name)
            .cloned()
            .ok_or_else(|| Error::unknown_type(type_name))
    }

    /// Check whether a type is registered.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.read().contains_key(type_name)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statistics_schema() -> PropertySchema {
        [
            ("span".to_string(), PropertyKind::Int),
            ("split_names".to_string(), PropertyKind::String),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = TypeRegistry::new();
        registry
            .register("ExampleStatistics", statistics_schema())
            .unwrap();

        let found = registry.lookup("ExampleStatistics").unwrap();
        assert_eq!(found.name(), "ExampleStatistics");
        assert_eq!(found.property_kind("span"), Some(PropertyKind::Int));
        assert_eq!(found.property_kind("missing"), None);
    }

    #[test]
    fn test_register_identical_schema_is_idempotent() {
        let registry = TypeRegistry::new();
        let first = registry
            .register("ExampleStatistics", statistics_schema())
            .unwrap();
        let second = registry
            .register("ExampleStatistics", statistics_schema())
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_conflicting_schema_fails() {
        let registry = TypeRegistry::new();
        registry
            .register("ExampleStatistics", statistics_schema())
            .unwrap();

        let mut other = statistics_schema();
        other.insert("span".to_string(), PropertyKind::String);
        let err = registry.register("ExampleStatistics", other).unwrap_err();

        assert_eq!(err, Error::duplicate_type("ExampleStatistics"));
        // Original schema is untouched
        let found = registry.lookup("ExampleStatistics").unwrap();
        assert_eq!(found.property_kind("span"), Some(PropertyKind::Int));
    }

    #[test]
    fn test_lookup_unknown_type() {
        let registry = TypeRegistry::new();
        let err = registry.lookup("Model").unwrap_err();
        assert_eq!(err, Error::unknown_type("Model"));
        assert!(!registry.contains("Model"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_all_is_all_or_nothing() {
        let registry = TypeRegistry::new();
        registry.register("Schema", PropertySchema::new()).unwrap();

        let conflicting = [
            Arc::new(ArtifactType::new("Examples", [("span", PropertyKind::Int)])),
            Arc::new(ArtifactType::new("Schema", [("version", PropertyKind::Int)])),
        ];
        let err = registry.register_all(conflicting).unwrap_err();
        assert_eq!(err, Error::duplicate_type("Schema"));
        assert_eq!(registry.type_names(), vec!["Schema"]);

        let model = Arc::new(ArtifactType::new("Model", [("version", PropertyKind::Int)]));
        registry
            .register_all([
                Arc::clone(&model),
                Arc::new(ArtifactType::new("Schema", PropertySchema::new())),
            ])
            .unwrap();
        assert_eq!(registry.type_names(), vec!["Model", "Schema"]);
        assert!(Arc::ptr_eq(&registry.lookup("Model").unwrap(), &model));
    }

    #[test]
    fn test_register_all_rejects_conflicts_within_batch() {
        let registry = TypeRegistry::new();
        let err = registry
            .register_all([
                Arc::new(ArtifactType::new("Model", [("version", PropertyKind::Int)])),
                Arc::new(ArtifactType::new("Model", [("version", PropertyKind::String)])),
            ])
            .unwrap_err();
        assert_eq!(err, Error::duplicate_type("Model"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_type_names_sorted() {
        let registry = TypeRegistry::new();
        registry.register("Schema", PropertySchema::new()).unwrap();
        registry.register("Examples", PropertySchema::new()).unwrap();
        assert_eq!(registry.type_names(), vec!["Examples", "Schema"]);
    }
}
