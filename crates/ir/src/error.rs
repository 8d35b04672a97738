//! Error types for the pipeline IR model.

use crate::PropertyKind;
use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// Result type for IR model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a schema property was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMismatch {
    /// The property is not declared by the artifact type.
    UnknownProperty,
    /// The value kind differs from the declared kind.
    KindMismatch {
        /// Kind declared by the artifact type schema.
        expected: PropertyKind,
        /// Kind of the supplied value.
        found: PropertyKind,
    },
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProperty => write!(f, "not declared in the type schema"),
            Self::KindMismatch { expected, found } => {
                write!(f, "expected {expected} value, found {found}")
            }
        }
    }
}

/// Errors raised while building types, artifacts and pipeline definitions.
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum Error {
    /// A different schema is already registered under this type name.
    #[error("Artifact type '{name}' is already registered with a different schema")]
    #[diagnostic(
        code(pipeline_ir::registry::duplicate_type),
        help("artifact types are immutable once registered; use a new type name")
    )]
    DuplicateType {
        /// The conflicting type name.
        name: String,
    },

    /// The type name has not been registered.
    #[error("Unknown artifact type '{name}'")]
    #[diagnostic(code(pipeline_ir::registry::unknown_type))]
    UnknownType {
        /// The type name that was looked up.
        name: String,
    },

    /// A schema property does not match the artifact type.
    #[error("Property '{property}' of artifact type '{type_name}' is invalid: {reason}")]
    #[diagnostic(code(pipeline_ir::artifact::schema_mismatch))]
    PropertySchemaMismatch {
        /// Name of the artifact type.
        type_name: String,
        /// The offending property key.
        property: String,
        /// What was wrong with it.
        reason: SchemaMismatch,
    },

    /// An output key was declared twice on the same node.
    #[error("Node '{node_id}' declares output '{output_key}' more than once")]
    #[diagnostic(code(pipeline_ir::node::duplicate_output))]
    DuplicateOutputKey {
        /// Node declaring the outputs.
        node_id: String,
        /// The repeated output key.
        output_key: String,
    },

    /// A runtime parameter is malformed.
    #[error("Invalid runtime parameter '{name}': {message}")]
    #[diagnostic(code(pipeline_ir::parameter::invalid))]
    InvalidRuntimeParameter {
        /// Parameter name.
        name: String,
        /// Description of the problem.
        message: String,
    },

    /// A pipeline definition could not be decoded or encoded.
    #[error("Serialization error: {message}")]
    #[diagnostic(code(pipeline_ir::serialization))]
    Serialization {
        /// Message from the underlying codec.
        message: String,
    },
}

impl Error {
    /// Create an unknown type error
    #[must_use]
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    /// Create a duplicate type error
    #[must_use]
    pub fn duplicate_type(name: impl Into<String>) -> Self {
        Self::DuplicateType { name: name.into() }
    }

    /// Create a schema mismatch error
    #[must_use]
    pub fn schema_mismatch(
        type_name: impl Into<String>,
        property: impl Into<String>,
        reason: SchemaMismatch,
    ) -> Self {
        Self::PropertySchemaMismatch {
            type_name: type_name.into(),
            property: property.into(),
            reason,
        }
    }

    /// Create a runtime parameter error
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRuntimeParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_display() {
        let err = Error::schema_mismatch(
            "ExampleStatistics",
            "span",
            SchemaMismatch::KindMismatch {
                expected: PropertyKind::Int,
                found: PropertyKind::String,
            },
        );
        let message = err.to_string();
        assert!(message.contains("span"));
        assert!(message.contains("ExampleStatistics"));
        assert!(message.contains("expected INT value, found STRING"));
    }

    #[test]
    fn test_unknown_property_display() {
        let err = Error::schema_mismatch("Examples", "bogus", SchemaMismatch::UnknownProperty);
        assert!(err.to_string().contains("not declared"));
    }

    #[test]
    fn test_serialization_from_json_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = Error::from(json_err);
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
