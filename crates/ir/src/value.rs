//! Property kinds and typed property values.
//!
//! [`Value`] is the tagged union used for schema properties, custom
//! properties, context names and runtime parameter defaults. On the wire it
//! is encoded with an explicit kind tag:
//!
//! ```json
//! {"int_value": 42}
//! {"string_value": "foo"}
//! {"double_value": 0.5}
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The closed set of property kinds an artifact type schema may declare.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyKind {
    /// 64-bit signed integer.
    Int,
    /// UTF-8 string.
    String,
    /// 64-bit float.
    Double,
}

impl PropertyKind {
    /// Returns the wire tag of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::String => "STRING",
            Self::Double => "DOUBLE",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed scalar value.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub enum Value {
    /// Integer payload.
    #[serde(rename = "int_value")]
    Int(i64),
    /// String payload.
    #[serde(rename = "string_value")]
    String(String),
    /// Double payload.
    #[serde(rename = "double_value")]
    Double(f64),
}

impl Value {
    /// The kind tag of this value.
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        match self {
            Self::Int(_) => PropertyKind::Int,
            Self::String(_) => PropertyKind::String,
            Self::Double(_) => PropertyKind::Double,
        }
    }

    /// Returns the string payload, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Int(_) | Self::Double(_) => None,
        }
    }

    /// Returns the integer payload, if this is an integer value.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::String(_) | Self::Double(_) => None,
        }
    }

    /// Returns the double payload, if this is a double value.
    #[must_use]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            Self::Int(_) | Self::String(_) => None,
        }
    }
}

// Doubles compare by bit pattern so values can key hash maps (context names).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Self::Int(i) => i.hash(state),
            Self::String(s) => s.hash(state),
            Self::Double(d) => d.to_bits().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
            Self::Double(d) => write!(f, "{d}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}
