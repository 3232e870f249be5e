//! Core composition engine for `threatforge`.
//!
//! Builds threats and threatenables out of typed components, discovers the
//! emergent behaviors their combinations produce, and advances them through
//! simulation ticks.
//!
//! # Modules
//!
//! - [`registry`] -- Component type definitions and the registry that owns them
//! - [`schema`] -- Property declarations and value validation
//! - [`instance`] -- Component instances with schema-validated properties
//! - [`behavior`] -- Built-in and plugin behaviors run each tick
//! - [`condition`] -- Trigger conditions for interaction rules
//! - [`matrix`] -- Pairwise and higher-order interaction rules
//! - [`discovery`] -- Emergence discovery, scoring, and caps
//! - [`entity`] -- Composed entities and their derived aggregates
//! - [`composition`] -- Composing and editing entities
//! - [`step`] -- Per-tick step driver with fault isolation
//! - [`config`] -- YAML configuration
//! - [`catalog`] -- Starter component catalog
//! - [`error`] -- Error types

pub mod behavior;
pub mod catalog;
pub mod composition;
pub mod condition;
pub mod config;
pub mod discovery;
pub mod entity;
pub mod error;
pub mod instance;
pub mod matrix;
pub mod registry;
pub mod schema;
pub mod step;

pub use behavior::{
    Behavior, BehaviorContext, BehaviorSignal, BehaviorSpec, BehaviorUpdate, NearbyEntity,
    SimulationContext,
};
pub use composition::{ComponentConfig, CompositionEngine};
pub use condition::Condition;
pub use config::{AccumulationPolicy, DiscoveryConfig, ImpactWeights, ThreatForgeConfig};
pub use discovery::{ConditionFailure, DiscoveryEngine, DiscoveryOutcome};
pub use entity::ComposedEntity;
pub use error::{
    BehaviorError, CompositionError, ConditionError, MatrixError, PropertyError, RegistryError,
};
pub use instance::ComponentInstance;
pub use matrix::{InteractionMatrix, InteractionRule, PatternRule};
pub use registry::{ComponentRegistry, ComponentTypeDefinition, PerformanceProfile};
pub use schema::PropertySpec;
pub use step::{BehaviorFault, StepDriver, StepReport};
