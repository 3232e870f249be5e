//! Error types for the `threatforge-core` crate.
//!
//! Configuration-time errors ([`RegistryError`], [`CompositionError`],
//! [`PropertyError`]) are always returned to the caller. Evaluation-time
//! errors ([`ConditionError`], [`BehaviorError`]) are recovered locally by
//! the discovery engine and step driver, logged, and reported alongside
//! the results.

use threatforge_types::{ComponentInstanceId, ComponentTypeId, PropertyKind};

/// Errors raised while validating a property value against a schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    /// The type's schema does not declare this property.
    #[error("type {type_id} has no property {property:?}")]
    UnknownProperty {
        /// The component type.
        type_id: ComponentTypeId,
        /// The undeclared property name.
        property: String,
    },

    /// The value's kind differs from the declared kind.
    #[error("property {type_id}.{property} expects {expected}, got {found}")]
    KindMismatch {
        /// The component type.
        type_id: ComponentTypeId,
        /// The property name.
        property: String,
        /// The declared kind.
        expected: PropertyKind,
        /// The kind of the supplied value.
        found: PropertyKind,
    },

    /// An enum property was given a variant outside its declared set.
    #[error("property {type_id}.{property} has no variant {variant:?}")]
    InvalidEnumVariant {
        /// The component type.
        type_id: ComponentTypeId,
        /// The property name.
        property: String,
        /// The rejected variant.
        variant: String,
    },

    /// A numeric property was given NaN or an infinity.
    #[error("property {type_id}.{property} must be a finite number")]
    NotFinite {
        /// The component type.
        type_id: ComponentTypeId,
        /// The property name.
        property: String,
    },
}

/// Errors raised by the interaction matrix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatrixError {
    /// A pattern rule named fewer than three distinct component types.
    #[error("pattern {name:?} needs at least 3 distinct component types, got {count}")]
    PatternTooSmall {
        /// The pattern name.
        name: String,
        /// Number of distinct types supplied.
        count: usize,
    },

    /// A rule carries a strength, complexity or effect multiplier that is
    /// not a finite, non-negative number.
    #[error("rule {name:?} is invalid: {reason}")]
    InvalidRule {
        /// The rule or pattern name.
        name: String,
        /// Which value was rejected.
        reason: String,
    },
}

/// Errors raised by the component registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// The type identifier is already registered.
    #[error("component type already registered: {0}")]
    DuplicateType(ComponentTypeId),

    /// The type identifier is not registered.
    #[error("unknown component type: {0}")]
    UnknownType(ComponentTypeId),

    /// The definition failed validation.
    #[error("invalid definition for {type_id}: {reason}")]
    InvalidDefinition {
        /// The rejected type.
        type_id: ComponentTypeId,
        /// Why the definition was rejected.
        reason: String,
    },

    /// A rule could not be added to the interaction matrix.
    #[error("matrix error: {source}")]
    Matrix {
        /// The underlying matrix error.
        #[from]
        source: MatrixError,
    },
}

/// Errors raised while composing an entity.
///
/// Composition is all-or-nothing: any of these means no entity was created.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompositionError {
    /// No component configurations were supplied.
    #[error("cannot compose an entity from zero components")]
    EmptyComposition,

    /// A configuration referenced an unregistered type.
    #[error("unknown component type: {0}")]
    UnknownType(ComponentTypeId),

    /// A configured property failed schema validation.
    #[error("property validation failed: {source}")]
    PropertyValidation {
        /// The underlying validation error.
        #[from]
        source: PropertyError,
    },

    /// More instances of a type than its profile allows in one entity.
    #[error("type {type_id} allows at most {limit} instance(s) per entity")]
    InstanceLimit {
        /// The limited type.
        type_id: ComponentTypeId,
        /// The per-entity limit.
        limit: usize,
    },

    /// The entity has no component instance with this identifier.
    #[error("entity has no component instance {0}")]
    UnknownInstance(ComponentInstanceId),
}

/// A trigger condition could not be evaluated.
///
/// The rule owning the condition does not fire; discovery continues with
/// the remaining rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    /// The condition targets a type that is not among the rule's
    /// participants.
    #[error("condition {condition} targets a type with no participating instance")]
    TargetNotParticipating {
        /// The condition, rendered for logs.
        condition: String,
    },

    /// The targeted instance's schema has no such property.
    #[error("type {type_id} has no property {property:?} referenced by a condition")]
    MissingProperty {
        /// The targeted type.
        type_id: ComponentTypeId,
        /// The missing property name.
        property: String,
    },

    /// The property and threshold kinds cannot be compared.
    #[error("cannot compare {type_id}.{property} ({found}) with a {expected} threshold")]
    KindMismatch {
        /// The targeted type.
        type_id: ComponentTypeId,
        /// The property name.
        property: String,
        /// Kind of the threshold.
        expected: PropertyKind,
        /// Kind of the property value.
        found: PropertyKind,
    },

    /// An ordering comparison was applied to a non-numeric property.
    #[error("ordering comparison on non-numeric property {property:?} ({kind})")]
    UnorderedComparison {
        /// The property name.
        property: String,
        /// The property's kind.
        kind: PropertyKind,
    },
}

/// A behavior update failed.
///
/// The step driver rolls the instance back to its pre-tick properties and
/// skips it for the rest of the tick.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BehaviorError {
    /// The behavior references a property the instance does not have.
    #[error("type {type_id} has no property {property:?}")]
    MissingProperty {
        /// The instance's type.
        type_id: ComponentTypeId,
        /// The missing property name.
        property: String,
    },

    /// The behavior needs a numeric property.
    #[error("property {type_id}.{property} is not numeric")]
    NotNumeric {
        /// The instance's type.
        type_id: ComponentTypeId,
        /// The property name.
        property: String,
    },

    /// Writing the updated value failed schema validation.
    #[error("behavior produced an invalid value: {source}")]
    Property {
        /// The underlying validation error.
        #[from]
        source: PropertyError,
    },

    /// A custom behavior reported a failure.
    #[error("behavior {behavior} failed: {message}")]
    Failed {
        /// The behavior name.
        behavior: String,
        /// Description of the failure.
        message: String,
    },

    /// The behavior panicked during its update.
    #[error("behavior {behavior} panicked: {message}")]
    Panicked {
        /// The behavior name.
        behavior: String,
        /// The panic payload, when it was a string.
        message: String,
    },
}
