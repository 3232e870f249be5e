//! Tagged property values stored in component property maps.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::PropertyKind;

/// A concrete property value.
///
/// Serialized untagged so configuration files can write plain scalars
/// (`intensity: 0.6`). Strings deserialize as [`PropertyValue::Text`]; the
/// schema coerces them into [`PropertyValue::Enum`] where the declared kind
/// is an enum.
///
/// The untagged form is lossy for enums: `Enum("viral")` serializes as the
/// bare string `"viral"` and reads back as `Text("viral")`. Serialized
/// snapshots are therefore for display; to rebuild typed values, pass them
/// back through the owning type's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(untagged)]
pub enum PropertyValue {
    /// A numeric value.
    Number(f64),
    /// A boolean flag.
    Bool(bool),
    /// Free-form text.
    Text(String),
    /// A named enum variant.
    Enum(String),
}

impl PropertyValue {
    /// The kind this value carries.
    pub const fn kind(&self) -> PropertyKind {
        match self {
            Self::Number(_) => PropertyKind::Number,
            Self::Bool(_) => PropertyKind::Bool,
            Self::Text(_) => PropertyKind::Text,
            Self::Enum(_) => PropertyKind::Enum,
        }
    }

    /// The numeric payload, if this is a number.
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// The boolean payload, if this is a flag.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The string payload of a text or enum value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) | Self::Enum(value) => Some(value),
            _ => None,
        }
    }
}

impl core::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
            Self::Enum(value) => f.write_str(value),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(String::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_scalars_deserialize_untagged() {
        let number: Option<PropertyValue> = serde_json::from_str("0.6").ok();
        assert_eq!(number, Some(PropertyValue::Number(0.6)));
        let flag: Option<PropertyValue> = serde_json::from_str("true").ok();
        assert_eq!(flag, Some(PropertyValue::Bool(true)));
        let text: Option<PropertyValue> = serde_json::from_str("\"airborne\"").ok();
        assert_eq!(text, Some(PropertyValue::Text(String::from("airborne"))));
    }

    #[test]
    fn accessors_match_kind() {
        let value = PropertyValue::Enum(String::from("airborne"));
        assert_eq!(value.kind(), PropertyKind::Enum);
        assert_eq!(value.as_str(), Some("airborne"));
        assert_eq!(value.as_number(), None);
        assert_eq!(PropertyValue::from(2.5).as_number(), Some(2.5));
    }
}
