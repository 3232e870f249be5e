//! Type-safe identifiers.
//!
//! Runtime objects (entities, component instances) get UUID v7 wrappers so
//! they cannot be mixed up at compile time. Emergent behaviors get a UUID v5
//! derived from the rule that fired and the instances that took part, which
//! keeps discovery output identical across repeated passes over the same
//! inputs. Component types and rules are identified by registration data
//! rather than UUIDs.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a composed entity (threat or threatenable).
    EntityId
}

define_id! {
    /// Unique identifier for a component instance owned by an entity.
    ComponentInstanceId
}

define_id! {
    /// Identifier of an emergent behavior.
    ///
    /// Use [`EmergentBehaviorId::derive`] during discovery; [`new`] exists
    /// for tests and hand-built records.
    ///
    /// [`new`]: EmergentBehaviorId::new
    EmergentBehaviorId
}

/// Namespace for emergent behavior UUID v5 derivation.
const EMERGENCE_NAMESPACE: Uuid = Uuid::from_u128(0x7f3c_1a9e_5b42_4d0e_9c61_2e8a_f04b_d317);

impl EmergentBehaviorId {
    /// Derive a stable identifier from the firing rule, its participants
    /// and the discovery tick.
    ///
    /// Rediscovering the same firing on a later tick yields a new
    /// identifier, so accumulated repeats stay distinguishable. Within one
    /// tick the result is deterministic. Compare firings across ticks with
    /// `EmergentBehavior::same_firing`.
    pub fn derive(rule: RuleId, participants: &[ComponentInstanceId], tick: u64) -> Self {
        let mut name = Vec::with_capacity(participants.len().saturating_mul(16).saturating_add(12));
        name.extend_from_slice(&rule.0.to_be_bytes());
        name.extend_from_slice(&tick.to_be_bytes());
        for participant in participants {
            name.extend_from_slice(participant.0.as_bytes());
        }
        Self(Uuid::new_v5(&EMERGENCE_NAMESPACE, &name))
    }
}

/// Identifier of a registered component type, e.g. `"pathogen"`.
///
/// Ordered lexically so unordered type pairs can be stored under a
/// canonical key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ComponentTypeId(pub String);

impl ComponentTypeId {
    /// Create a type identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentTypeId {
    fn from(id: &str) -> Self {
        Self(String::from(id))
    }
}

impl From<String> for ComponentTypeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Registration-ordered identifier of an interaction or pattern rule.
///
/// Pair rules and pattern rules share one counter, so comparing two
/// `RuleId`s compares their registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RuleId(pub u32);

impl core::fmt::Display for RuleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "rule-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let entity = EntityId::new();
        let instance = ComponentInstanceId::new();
        assert_ne!(entity.into_inner(), Uuid::nil());
        assert_ne!(instance.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = EntityId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<EntityId, _> = serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn derived_emergent_id_is_stable() {
        let a = ComponentInstanceId::new();
        let b = ComponentInstanceId::new();
        let first = EmergentBehaviorId::derive(RuleId(3), &[a, b], 7);
        let second = EmergentBehaviorId::derive(RuleId(3), &[a, b], 7);
        assert_eq!(first, second);
    }

    #[test]
    fn derived_emergent_id_differs_across_ticks() {
        let a = ComponentInstanceId::new();
        let b = ComponentInstanceId::new();
        let earlier = EmergentBehaviorId::derive(RuleId(3), &[a, b], 1);
        let later = EmergentBehaviorId::derive(RuleId(3), &[a, b], 2);
        assert_ne!(earlier, later);
    }

    #[test]
    fn derived_emergent_id_depends_on_rule_and_participants() {
        let a = ComponentInstanceId::new();
        let b = ComponentInstanceId::new();
        let base = EmergentBehaviorId::derive(RuleId(1), &[a, b], 0);
        assert_ne!(base, EmergentBehaviorId::derive(RuleId(2), &[a, b], 0));
        assert_ne!(base, EmergentBehaviorId::derive(RuleId(1), &[b, a], 0));
    }

    #[test]
    fn type_id_serializes_as_plain_string() {
        let id = ComponentTypeId::from("pathogen");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"pathogen\""));
        assert_eq!(id.to_string(), "pathogen");
    }
}
