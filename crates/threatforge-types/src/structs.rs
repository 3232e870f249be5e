//! Emergent behavior records and read-only entity snapshots.
//!
//! These are the values that cross the boundary to the rendering layer, so
//! they hold identifiers and copies, never live references into simulation
//! state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Domain, EntityRole, ImpactLevel, InteractionKind};
use crate::ids::{ComponentInstanceId, ComponentTypeId, EmergentBehaviorId, EntityId, RuleId};
use crate::values::PropertyValue;

// ---------------------------------------------------------------------------
// Emergent behaviors
// ---------------------------------------------------------------------------

/// An effect an emergent behavior applies to its composed entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EmergentEffect {
    /// Multiplies the entity's spread aggregate.
    SpreadMultiplier(f64),
    /// Multiplies the entity's intensity aggregate.
    IntensityMultiplier(f64),
    /// A descriptive tag with no numeric effect.
    Label(String),
}

/// A behavior that emerged from a qualifying combination of components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EmergentBehavior {
    /// Identifier derived from the rule, its participants and the
    /// discovery tick.
    pub id: EmergentBehaviorId,
    /// The rule that fired.
    pub rule: RuleId,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Interaction kind of the originating rule.
    pub kind: InteractionKind,
    /// Impact classification.
    pub impact: ImpactLevel,
    /// Complexity score (rule complexity scaled by rule strength).
    pub complexity: f64,
    /// Component types involved, by value.
    pub component_types: Vec<ComponentTypeId>,
    /// Component instances that satisfied the rule when it fired.
    pub participants: Vec<ComponentInstanceId>,
    /// Effects applied to the owning entity.
    pub effects: Vec<EmergentEffect>,
    /// Simulation tick of the discovery pass that produced this behavior.
    pub discovered_tick: u64,
}

impl EmergentBehavior {
    /// Whether both records come from the same rule firing over the same
    /// participants, regardless of the tick they were discovered on.
    pub fn same_firing(&self, other: &Self) -> bool {
        self.rule == other.rule && self.participants == other.participants
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Aggregate scalars derived from an entity's components and emergent
/// behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntityAggregates {
    /// Weighted average of intensity-contributing properties.
    pub intensity: f64,
    /// Maximum spread-like property, scaled by spread multipliers.
    pub spread: f64,
    /// Impact-weighted sum of emergent behavior complexity.
    pub emergence_level: f64,
}

/// Read-only copy of one component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ComponentSnapshot {
    /// Instance identifier.
    pub id: ComponentInstanceId,
    /// Registered type of the instance.
    pub type_id: ComponentTypeId,
    /// Domain of the instance's type.
    pub domain: Domain,
    /// Current property values.
    pub properties: BTreeMap<String, PropertyValue>,
    /// Current derived emergence potential.
    pub emergence_potential: f64,
}

/// Read-only copy of a composed entity, handed to the rendering layer once
/// per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntitySnapshot {
    /// Entity identifier.
    pub id: EntityId,
    /// Threat or threatenable.
    pub role: EntityRole,
    /// Majority domain of the entity's components.
    pub domain: Domain,
    /// Derived aggregates at snapshot time.
    pub aggregates: EntityAggregates,
    /// Components in insertion order.
    pub components: Vec<ComponentSnapshot>,
    /// Accumulated emergent behaviors.
    pub emergent_behaviors: Vec<EmergentBehavior>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_serializes_adjacently_tagged() {
        let json = serde_json::to_string(&EmergentEffect::SpreadMultiplier(1.5)).ok();
        assert_eq!(
            json.as_deref(),
            Some(r#"{"type":"spread_multiplier","value":1.5}"#)
        );
    }

    fn firing(rule: u32, participants: Vec<ComponentInstanceId>, tick: u64) -> EmergentBehavior {
        EmergentBehavior {
            id: EmergentBehaviorId::derive(RuleId(rule), &participants, tick),
            rule: RuleId(rule),
            name: String::from("Aerosolized Outbreak"),
            description: String::new(),
            kind: InteractionKind::Synergy,
            impact: ImpactLevel::High,
            complexity: 1.0,
            component_types: Vec::new(),
            participants,
            effects: Vec::new(),
            discovered_tick: tick,
        }
    }

    #[test]
    fn repeat_firing_has_new_id_but_same_firing() {
        let pair = vec![ComponentInstanceId::new(), ComponentInstanceId::new()];
        let first = firing(1, pair.clone(), 0);
        let repeat = firing(1, pair.clone(), 5);
        assert_ne!(first.id, repeat.id);
        assert!(first.same_firing(&repeat));

        let other_rule = firing(2, pair, 0);
        assert!(!first.same_firing(&other_rule));
    }

    #[test]
    fn enum_values_read_back_as_text() {
        let json = serde_json::to_string(&PropertyValue::Enum(String::from("viral"))).ok();
        assert_eq!(json.as_deref(), Some(r#""viral""#));
        let restored: Option<PropertyValue> = json.and_then(|j| serde_json::from_str(&j).ok());
        assert_eq!(restored, Some(PropertyValue::Text(String::from("viral"))));
    }
}
