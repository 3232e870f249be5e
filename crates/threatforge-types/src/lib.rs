//! Shared type definitions for the `threatforge` composition engine.
//!
//! Types defined here are the vocabulary shared by the core engine and the
//! surrounding game: the browser renderer receives them as `TypeScript`
//! bindings generated by `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers for entities, instances, types, rules
//! - [`enums`] -- Domains, property kinds, interaction kinds, impact levels
//! - [`values`] -- Tagged property values
//! - [`structs`] -- Emergent behavior records and entity snapshots

pub mod enums;
pub mod ids;
pub mod structs;
pub mod values;

// Re-export all public types at crate root for convenience.
pub use enums::{Comparison, Domain, EntityRole, ImpactLevel, InteractionKind, PropertyKind};
pub use ids::{ComponentInstanceId, ComponentTypeId, EmergentBehaviorId, EntityId, RuleId};
pub use structs::{
    ComponentSnapshot, EmergentBehavior, EmergentEffect, EntityAggregates, EntitySnapshot,
};
pub use values::PropertyValue;
