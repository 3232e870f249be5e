//! The component registry: type definitions and their interaction rules.
//!
//! The registry is an explicitly constructed value owned by the caller's
//! top-level simulation context. It owns the [`InteractionMatrix`] so that
//! affinities declared on a definition land in the matrix at registration
//! time.
//!
//! Registration is append-only. The step driver and composition engine
//! borrow the registry immutably, so registering while a step is running
//! is rejected by the borrow checker; registering between ticks is fine.

use std::collections::BTreeMap;
use std::sync::Arc;

use threatforge_types::{ComponentTypeId, Domain, PropertyKind, RuleId};
use tracing::{debug, info};

use crate::behavior::Behavior;
use crate::error::RegistryError;
use crate::matrix::{InteractionMatrix, InteractionRule, PatternRule};
use crate::schema::PropertySpec;

/// Per-type cost and limit metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceProfile {
    /// Relative cost of updating one instance per tick.
    pub update_cost: f64,
    /// Maximum instances of this type in a single entity.
    pub max_instances_per_entity: Option<usize>,
}

impl Default for PerformanceProfile {
    fn default() -> Self {
        Self {
            update_cost: 1.0,
            max_instances_per_entity: None,
        }
    }
}

/// An interaction rule declared on a type definition.
#[derive(Debug, Clone)]
pub struct InteractionAffinity {
    /// The other type in the pair (may equal the declaring type).
    pub partner: ComponentTypeId,
    /// The rule to add for the pair.
    pub rule: InteractionRule,
}

/// A registered component type.
///
/// Immutable once registered; instances share it through an [`Arc`].
#[derive(Debug, Clone)]
pub struct ComponentTypeDefinition {
    /// Unique type identifier.
    pub id: ComponentTypeId,
    /// Display name.
    pub name: String,
    /// Domain tag.
    pub domain: Domain,
    /// Declared properties.
    pub schema: BTreeMap<String, PropertySpec>,
    /// Behaviors attached to every new instance.
    pub default_behaviors: Vec<Behavior>,
    /// Base emergence potential in `0.0..=1.0`.
    pub emergence_potential: f64,
    /// Interaction rules added to the matrix on registration.
    pub affinities: Vec<InteractionAffinity>,
    /// Cost and limit metadata.
    pub profile: PerformanceProfile,
}

impl ComponentTypeDefinition {
    /// Start a definition with an empty schema.
    pub fn new(id: impl Into<ComponentTypeId>, name: impl Into<String>, domain: Domain) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            domain,
            schema: BTreeMap::new(),
            default_behaviors: Vec::new(),
            emergence_potential: 0.5,
            affinities: Vec::new(),
            profile: PerformanceProfile::default(),
        }
    }

    /// Declare a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.schema.insert(name.into(), spec);
        self
    }

    /// Attach a default behavior.
    #[must_use]
    pub fn with_behavior(mut self, behavior: impl Into<Behavior>) -> Self {
        self.default_behaviors.push(behavior.into());
        self
    }

    /// Set the base emergence potential.
    #[must_use]
    pub fn with_emergence_potential(mut self, potential: f64) -> Self {
        self.emergence_potential = potential;
        self
    }

    /// Declare an interaction with `partner`.
    #[must_use]
    pub fn with_affinity(mut self, partner: impl Into<ComponentTypeId>, rule: InteractionRule) -> Self {
        self.affinities.push(InteractionAffinity {
            partner: partner.into(),
            rule,
        });
        self
    }

    /// Set the performance profile.
    #[must_use]
    pub fn with_profile(mut self, profile: PerformanceProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Look up a property declaration.
    pub fn spec(&self, property: &str) -> Option<&PropertySpec> {
        self.schema.get(property)
    }

    /// Whether any property contributes to intensity.
    pub fn has_intensity_properties(&self) -> bool {
        self.schema.values().any(|spec| spec.intensity_weight.is_some())
    }

    /// Check defaults against their declared kinds and the potential range.
    fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidDefinition {
            type_id: self.id.clone(),
            reason,
        };

        if !(0.0..=1.0).contains(&self.emergence_potential) {
            return Err(invalid(format!(
                "emergence potential {} is outside 0..=1",
                self.emergence_potential
            )));
        }

        for (name, spec) in &self.schema {
            spec.coerce(&self.id, name, spec.default.clone())
                .map_err(|e| invalid(e.to_string()))?;
            if let Some(weight) = spec.intensity_weight {
                if spec.kind != PropertyKind::Number {
                    return Err(invalid(format!("intensity property {name:?} is not numeric")));
                }
                if !weight.is_finite() || weight <= 0.0 {
                    return Err(invalid(format!(
                        "intensity weight of {name:?} must be positive"
                    )));
                }
            }
            if spec.spread && spec.kind != PropertyKind::Number {
                return Err(invalid(format!("spread property {name:?} is not numeric")));
            }
        }
        Ok(())
    }
}

/// Store of registered component types.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    /// Definitions in registration order.
    definitions: Vec<Arc<ComponentTypeDefinition>>,
    /// Type id -> position in `definitions`.
    index: BTreeMap<ComponentTypeId, usize>,
    /// Interaction rules between registered (or future) types.
    matrix: InteractionMatrix,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type.
    ///
    /// Affinities declared on the definition are added to the interaction
    /// matrix. Fails without side effects if the type id is taken or the
    /// definition is invalid.
    pub fn register(
        &mut self,
        definition: ComponentTypeDefinition,
    ) -> Result<Arc<ComponentTypeDefinition>, RegistryError> {
        if self.index.contains_key(&definition.id) {
            return Err(RegistryError::DuplicateType(definition.id));
        }
        definition.validate()?;
        for affinity in &definition.affinities {
            affinity.rule.validate()?;
        }

        for affinity in &definition.affinities {
            let rule_id = self.matrix.add_rule(
                definition.id.clone(),
                affinity.partner.clone(),
                affinity.rule.clone(),
            )?;
            debug!(
                type_id = %definition.id,
                partner = %affinity.partner,
                rule = %rule_id,
                "Affinity added to interaction matrix"
            );
        }

        let definition = Arc::new(definition);
        self.index
            .insert(definition.id.clone(), self.definitions.len());
        self.definitions.push(Arc::clone(&definition));
        info!(
            type_id = %definition.id,
            domain = %definition.domain,
            properties = definition.schema.len(),
            "Component type registered"
        );
        Ok(definition)
    }

    /// Look up a registered type.
    pub fn get(&self, type_id: &ComponentTypeId) -> Result<&Arc<ComponentTypeDefinition>, RegistryError> {
        self.find(type_id)
            .ok_or_else(|| RegistryError::UnknownType(type_id.clone()))
    }

    /// Look up a registered type, returning `None` when absent.
    pub fn find(&self, type_id: &ComponentTypeId) -> Option<&Arc<ComponentTypeDefinition>> {
        self.index
            .get(type_id)
            .and_then(|&i| self.definitions.get(i))
    }

    /// Whether a type is registered.
    pub fn contains(&self, type_id: &ComponentTypeId) -> bool {
        self.index.contains_key(type_id)
    }

    /// All definitions tagged with `domain`, in registration order.
    pub fn list_by_domain(&self, domain: &Domain) -> Vec<&Arc<ComponentTypeDefinition>> {
        self.definitions
            .iter()
            .filter(|definition| definition.domain == *domain)
            .collect()
    }

    /// All definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ComponentTypeDefinition>> {
        self.definitions.iter()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The interaction matrix.
    pub const fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    /// Add a pairwise interaction rule.
    pub fn add_rule(
        &mut self,
        type_a: impl Into<ComponentTypeId>,
        type_b: impl Into<ComponentTypeId>,
        rule: InteractionRule,
    ) -> Result<RuleId, RegistryError> {
        Ok(self.matrix.add_rule(type_a.into(), type_b.into(), rule)?)
    }

    /// Add a higher-order pattern rule.
    pub fn add_pattern(&mut self, pattern: PatternRule) -> Result<RuleId, RegistryError> {
        Ok(self.matrix.add_pattern(pattern)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use threatforge_types::InteractionKind;

    use super::*;

    fn pathogen() -> ComponentTypeDefinition {
        ComponentTypeDefinition::new("pathogen", "Pathogen", Domain::Biological)
            .with_property("virulence", PropertySpec::number(0.5).intensity(1.0))
    }

    #[test]
    fn register_then_get() {
        let mut registry = ComponentRegistry::new();
        registry.register(pathogen()).unwrap();
        let definition = registry.get(&ComponentTypeId::from("pathogen")).unwrap();
        assert_eq!(definition.name, "Pathogen");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ComponentRegistry::new();
        registry.register(pathogen()).unwrap();
        let err = registry.register(pathogen()).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateType(ComponentTypeId::from("pathogen")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_type_lookup_fails() {
        let registry = ComponentRegistry::new();
        assert!(matches!(
            registry.get(&ComponentTypeId::from("ghost")),
            Err(RegistryError::UnknownType(_))
        ));
    }

    #[test]
    fn list_by_domain_keeps_registration_order() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(ComponentTypeDefinition::new("worm", "Worm", Domain::Cyber))
            .unwrap();
        registry.register(pathogen()).unwrap();
        registry
            .register(ComponentTypeDefinition::new("botnet", "Botnet", Domain::Cyber))
            .unwrap();

        let cyber: Vec<_> = registry
            .list_by_domain(&Domain::Cyber)
            .iter()
            .map(|d| d.id.as_str().to_owned())
            .collect();
        assert_eq!(cyber, vec!["worm", "botnet"]);
    }

    #[test]
    fn affinities_populate_the_matrix() {
        let mut registry = ComponentRegistry::new();
        let definition = pathogen().with_affinity(
            "airborne_vector",
            InteractionRule::new("Aerosolized Outbreak", InteractionKind::Synergy),
        );
        registry.register(definition).unwrap();

        let rules = registry
            .matrix()
            .rules_for(&ComponentTypeId::from("airborne_vector"), &ComponentTypeId::from("pathogen"));
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn invalid_default_is_rejected() {
        let mut spec = PropertySpec::number(0.5);
        spec.default = threatforge_types::PropertyValue::Bool(true);
        let definition =
            ComponentTypeDefinition::new("broken", "Broken", Domain::Physical).with_property("mass", spec);
        let mut registry = ComponentRegistry::new();
        assert!(matches!(
            registry.register(definition),
            Err(RegistryError::InvalidDefinition { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn invalid_affinity_rejects_the_whole_definition() {
        let definition = pathogen()
            .with_affinity(
                "airborne_vector",
                InteractionRule::new("Aerosolized Outbreak", InteractionKind::Synergy),
            )
            .with_affinity(
                "hospital",
                InteractionRule::new("Overwhelmed Wards", InteractionKind::Cascade).with_strength(f64::NAN),
            );
        let mut registry = ComponentRegistry::new();
        assert!(matches!(
            registry.register(definition),
            Err(RegistryError::Matrix {
                source: crate::error::MatrixError::InvalidRule { .. }
            })
        ));
        assert!(registry.is_empty());
        assert_eq!(registry.matrix().rule_count(), 0);
    }

    #[test]
    fn add_rule_rejects_infinite_complexity() {
        let mut registry = ComponentRegistry::new();
        let rule = InteractionRule::new("Runaway", InteractionKind::Cascade).with_complexity(f64::INFINITY);
        assert!(registry.add_rule("malware", "power_grid", rule).is_err());
        assert_eq!(registry.matrix().rule_count(), 0);
    }

    #[test]
    fn potential_out_of_range_is_rejected() {
        let definition = pathogen().with_emergence_potential(1.5);
        let mut registry = ComponentRegistry::new();
        assert!(registry.register(definition).is_err());
    }
}
