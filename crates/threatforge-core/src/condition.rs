//! Trigger conditions for interaction and pattern rules.
//!
//! A condition reads one property of every participating instance of a
//! target type and compares it against a threshold, e.g.
//! `pathogen.virulence > 0.4`. Rules fire only when all of their
//! conditions hold.

use threatforge_types::{Comparison, ComponentTypeId, PropertyKind, PropertyValue};

use crate::error::ConditionError;
use crate::instance::ComponentInstance;

/// Tolerance used for numeric equality comparisons.
const NUMERIC_EPSILON: f64 = 1e-9;

/// A predicate over one property of a component type.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// The component type whose instances are tested.
    pub target: ComponentTypeId,
    /// The property read from each targeted instance.
    pub property: String,
    /// The comparison operator.
    pub comparison: Comparison,
    /// The value compared against.
    pub threshold: PropertyValue,
}

impl Condition {
    /// Create a condition.
    pub fn new(
        target: impl Into<ComponentTypeId>,
        property: impl Into<String>,
        comparison: Comparison,
        threshold: impl Into<PropertyValue>,
    ) -> Self {
        Self {
            target: target.into(),
            property: property.into(),
            comparison,
            threshold: threshold.into(),
        }
    }

    /// The numeric threshold, if this condition compares numbers.
    ///
    /// The step driver watches these values to detect material property
    /// changes.
    pub const fn numeric_threshold(&self) -> Option<f64> {
        self.threshold.as_number()
    }

    /// Evaluate the condition against a single instance.
    ///
    /// The caller is responsible for only passing instances of the target
    /// type.
    pub fn evaluate(&self, instance: &ComponentInstance) -> Result<bool, ConditionError> {
        let Some(value) = instance.property(&self.property) else {
            return Err(ConditionError::MissingProperty {
                type_id: instance.type_id().clone(),
                property: self.property.clone(),
            });
        };
        compare(value, self.comparison, &self.threshold).map_err(|mismatch| match mismatch {
            Mismatch::Kinds { expected, found } => ConditionError::KindMismatch {
                type_id: instance.type_id().clone(),
                property: self.property.clone(),
                expected,
                found,
            },
            Mismatch::Unordered(kind) => ConditionError::UnorderedComparison {
                property: self.property.clone(),
                kind,
            },
        })
    }

    /// Evaluate the condition against every participant of the target type.
    ///
    /// Holds only if at least one participant has the target type and all
    /// such participants satisfy it.
    pub fn holds_for(&self, participants: &[&ComponentInstance]) -> Result<bool, ConditionError> {
        let mut targeted = participants
            .iter()
            .filter(|instance| *instance.type_id() == self.target)
            .peekable();
        if targeted.peek().is_none() {
            return Err(ConditionError::TargetNotParticipating {
                condition: self.to_string(),
            });
        }
        let mut holds = true;
        for instance in targeted {
            holds &= self.evaluate(instance)?;
        }
        Ok(holds)
    }
}

impl core::fmt::Display for Condition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}.{} {} {}",
            self.target,
            self.property,
            self.comparison.symbol(),
            self.threshold
        )
    }
}

/// Evaluate a conjunction of conditions.
///
/// Every condition is evaluated, even after one is false, so a malformed
/// condition is always reported regardless of its position.
pub fn all_hold(
    conditions: &[Condition],
    participants: &[&ComponentInstance],
) -> Result<bool, ConditionError> {
    let mut holds = true;
    for condition in conditions {
        holds &= condition.holds_for(participants)?;
    }
    Ok(holds)
}

enum Mismatch {
    Kinds {
        expected: PropertyKind,
        found: PropertyKind,
    },
    Unordered(PropertyKind),
}

fn compare(
    value: &PropertyValue,
    comparison: Comparison,
    threshold: &PropertyValue,
) -> Result<bool, Mismatch> {
    match (value, threshold) {
        (PropertyValue::Number(v), PropertyValue::Number(t)) => Ok(match comparison {
            Comparison::Gt => v > t,
            Comparison::Ge => v >= t,
            Comparison::Lt => v < t,
            Comparison::Le => v <= t,
            Comparison::Eq => (v - t).abs() <= NUMERIC_EPSILON,
            Comparison::Ne => (v - t).abs() > NUMERIC_EPSILON,
        }),
        _ if comparison.is_ordering() => Err(Mismatch::Unordered(value.kind())),
        (PropertyValue::Bool(v), PropertyValue::Bool(t)) => Ok(equality(comparison, v == t)),
        // Text and enum values compare by name, so a YAML threshold like
        // `strain == viral` matches an enum property.
        (
            PropertyValue::Text(v) | PropertyValue::Enum(v),
            PropertyValue::Text(t) | PropertyValue::Enum(t),
        ) => Ok(equality(comparison, v == t)),
        _ => Err(Mismatch::Kinds {
            expected: threshold.kind(),
            found: value.kind(),
        }),
    }
}

const fn equality(comparison: Comparison, equal: bool) -> bool {
    match comparison {
        Comparison::Ne => !equal,
        _ => equal,
    }
}
