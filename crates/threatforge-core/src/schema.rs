//! Property schemas declared by component types.
//!
//! Every property a component instance holds is declared here with its
//! kind and default. Values are validated (and text coerced into enum
//! variants) at instantiation and on every later write.

use threatforge_types::{ComponentTypeId, PropertyKind, PropertyValue};

use crate::error::PropertyError;

/// Declaration of one property in a component type's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    /// Declared kind.
    pub kind: PropertyKind,
    /// Value used when a configuration does not supply one.
    pub default: PropertyValue,
    /// Allowed variant names for [`PropertyKind::Enum`] properties.
    pub variants: Vec<String>,
    /// Weight in the entity's intensity average, if the property
    /// contributes to intensity.
    pub intensity_weight: Option<f64>,
    /// Whether the property is a spread measure.
    pub spread: bool,
}

impl PropertySpec {
    /// A numeric property.
    pub const fn number(default: f64) -> Self {
        Self {
            kind: PropertyKind::Number,
            default: PropertyValue::Number(default),
            variants: Vec::new(),
            intensity_weight: None,
            spread: false,
        }
    }

    /// A boolean property.
    pub const fn flag(default: bool) -> Self {
        Self {
            kind: PropertyKind::Bool,
            default: PropertyValue::Bool(default),
            variants: Vec::new(),
            intensity_weight: None,
            spread: false,
        }
    }

    /// A free-form text property.
    pub fn text(default: &str) -> Self {
        Self {
            kind: PropertyKind::Text,
            default: PropertyValue::Text(String::from(default)),
            variants: Vec::new(),
            intensity_weight: None,
            spread: false,
        }
    }

    /// An enum property with the given variants.
    pub fn enumeration(variants: &[&str], default: &str) -> Self {
        Self {
            kind: PropertyKind::Enum,
            default: PropertyValue::Enum(String::from(default)),
            variants: variants.iter().map(|v| String::from(*v)).collect(),
            intensity_weight: None,
            spread: false,
        }
    }

    /// Mark the property as contributing to intensity with `weight`.
    #[must_use]
    pub fn intensity(mut self, weight: f64) -> Self {
        self.intensity_weight = Some(weight);
        self
    }

    /// Mark the property as a spread measure.
    #[must_use]
    pub fn spread_like(mut self) -> Self {
        self.spread = true;
        self
    }

    /// Validate `value` against this declaration.
    ///
    /// Text is accepted for enum properties when it names a declared
    /// variant, and is returned as [`PropertyValue::Enum`].
    pub fn coerce(
        &self,
        type_id: &ComponentTypeId,
        property: &str,
        value: PropertyValue,
    ) -> Result<PropertyValue, PropertyError> {
        match (self.kind, value) {
            (PropertyKind::Number, PropertyValue::Number(n)) => {
                if n.is_finite() {
                    Ok(PropertyValue::Number(n))
                } else {
                    Err(PropertyError::NotFinite {
                        type_id: type_id.clone(),
                        property: String::from(property),
                    })
                }
            }
            (PropertyKind::Bool, PropertyValue::Bool(b)) => Ok(PropertyValue::Bool(b)),
            (PropertyKind::Text, PropertyValue::Text(s)) => Ok(PropertyValue::Text(s)),
            (PropertyKind::Enum, PropertyValue::Enum(s) | PropertyValue::Text(s)) => {
                if self.variants.iter().any(|v| *v == s) {
                    Ok(PropertyValue::Enum(s))
                } else {
                    Err(PropertyError::InvalidEnumVariant {
                        type_id: type_id.clone(),
                        property: String::from(property),
                        variant: s,
                    })
                }
            }
            (expected, other) => Err(PropertyError::KindMismatch {
                type_id: type_id.clone(),
                property: String::from(property),
                expected,
                found: other.kind(),
            }),
        }
    }
}
