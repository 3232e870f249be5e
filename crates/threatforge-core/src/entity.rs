//! Composed entities: threats and threatenables built from components.

use threatforge_types::{
    ComponentInstanceId, Domain, EmergentBehavior, EmergentEffect, EntityAggregates, EntityId,
    EntityRole, EntitySnapshot,
};

use crate::config::{AccumulationPolicy, ImpactWeights};
use crate::discovery::emergence_score;
use crate::instance::ComponentInstance;

/// A threat or threatenable made of component instances.
///
/// Aggregates are derived from components and emergent behaviors and are
/// only ever recomputed, never set directly. Entities are created by the
/// [`CompositionEngine`](crate::composition::CompositionEngine) and mutated
/// by it or the [`StepDriver`](crate::step::StepDriver).
#[derive(Debug, Clone)]
pub struct ComposedEntity {
    id: EntityId,
    role: EntityRole,
    domain: Domain,
    components: Vec<ComponentInstance>,
    emergent: Vec<EmergentBehavior>,
    aggregates: EntityAggregates,
}

impl ComposedEntity {
    pub(crate) fn new(
        role: EntityRole,
        components: Vec<ComponentInstance>,
        emergent: Vec<EmergentBehavior>,
        weights: &ImpactWeights,
    ) -> Self {
        let mut entity = Self {
            id: EntityId::new(),
            role,
            domain: Domain::Physical,
            components,
            emergent,
            aggregates: EntityAggregates::default(),
        };
        entity.recompute(weights);
        entity
    }

    /// Entity identifier.
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Threat or threatenable.
    pub const fn role(&self) -> EntityRole {
        self.role
    }

    /// Majority domain of the components.
    pub const fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Component instances in insertion order.
    pub fn components(&self) -> &[ComponentInstance] {
        &self.components
    }

    /// Look up a component instance.
    pub fn component(&self, id: ComponentInstanceId) -> Option<&ComponentInstance> {
        self.components.iter().find(|instance| instance.id() == id)
    }

    /// Accumulated emergent behaviors.
    pub fn emergent_behaviors(&self) -> &[EmergentBehavior] {
        &self.emergent
    }

    /// Derived aggregates.
    pub const fn aggregates(&self) -> EntityAggregates {
        self.aggregates
    }

    /// Weighted intensity, scaled by intensity multipliers.
    pub const fn intensity(&self) -> f64 {
        self.aggregates.intensity
    }

    /// Largest spread, scaled by spread multipliers.
    pub const fn spread(&self) -> f64 {
        self.aggregates.spread
    }

    /// Emergence score of the attached behaviors.
    pub const fn emergence_level(&self) -> f64 {
        self.aggregates.emergence_level
    }

    /// Immutable copy for the rendering layer.
    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            role: self.role,
            domain: self.domain.clone(),
            aggregates: self.aggregates,
            components: self.components.iter().map(ComponentInstance::snapshot).collect(),
            emergent_behaviors: self.emergent.clone(),
        }
    }

    pub(crate) fn components_mut(&mut self) -> &mut [ComponentInstance] {
        &mut self.components
    }

    pub(crate) fn push_component(&mut self, instance: ComponentInstance) {
        self.components.push(instance);
    }

    pub(crate) fn take_component(&mut self, id: ComponentInstanceId) -> Option<ComponentInstance> {
        let position = self.components.iter().position(|instance| instance.id() == id)?;
        Some(self.components.remove(position))
    }

    pub(crate) const fn emergent_mut(&mut self) -> &mut Vec<EmergentBehavior> {
        &mut self.emergent
    }

    /// Merge newly discovered behaviors. Returns how many were attached.
    pub(crate) fn merge(&mut self, found: Vec<EmergentBehavior>, policy: AccumulationPolicy) -> usize {
        let before = self.emergent.len();
        match policy {
            AccumulationPolicy::Accumulate => self.emergent.extend(found),
            AccumulationPolicy::Deduplicate => {
                for behavior in found {
                    if !self.emergent.iter().any(|existing| existing.same_firing(&behavior)) {
                        self.emergent.push(behavior);
                    }
                }
            }
        }
        self.emergent.len().saturating_sub(before)
    }

    /// Re-derive domain and aggregates from components and behaviors.
    pub(crate) fn recompute(&mut self, weights: &ImpactWeights) {
        if let Some(domain) = majority_domain(&self.components) {
            self.domain = domain;
        }

        let (sum, total_weight) = self
            .components
            .iter()
            .map(ComponentInstance::intensity_terms)
            .fold((0.0, 0.0), |(sum, total), (s, w)| (sum + s, total + w));
        let intensity = if total_weight > 0.0 {
            sum / total_weight * self.multiplier(|effect| match effect {
                EmergentEffect::IntensityMultiplier(factor) => Some(*factor),
                _ => None,
            })
        } else {
            0.0
        };

        let spread = self
            .components
            .iter()
            .filter_map(ComponentInstance::spread)
            .reduce(f64::max)
            .map_or(0.0, |max| {
                max * self.multiplier(|effect| match effect {
                    EmergentEffect::SpreadMultiplier(factor) => Some(*factor),
                    _ => None,
                })
            });

        self.aggregates = EntityAggregates {
            intensity,
            spread,
            emergence_level: emergence_score(&self.emergent, weights),
        };
    }

    fn multiplier(&self, select: impl Fn(&EmergentEffect) -> Option<f64>) -> f64 {
        self.emergent
            .iter()
            .flat_map(|behavior| behavior.effects.iter())
            .filter_map(select)
            .product()
    }
}

/// Most common component domain; ties go to the tied domain seen first.
fn majority_domain(components: &[ComponentInstance]) -> Option<Domain> {
    let mut counts: Vec<(&Domain, usize)> = Vec::new();
    for instance in components {
        match counts.iter_mut().find(|(domain, _)| *domain == instance.domain()) {
            Some((_, count)) => *count = count.saturating_add(1),
            None => counts.push((instance.domain(), 1)),
        }
    }
    counts
        .into_iter()
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
        .map(|(domain, _)| domain.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use threatforge_types::{EmergentBehaviorId, ImpactLevel, InteractionKind, PropertyValue, RuleId};

    use super::*;
    use crate::registry::ComponentTypeDefinition;
    use crate::schema::PropertySpec;

    fn instance(type_id: &str, domain: Domain, intensity: f64, spread: f64) -> ComponentInstance {
        let definition = ComponentTypeDefinition::new(type_id, type_id, domain)
            .with_property("intensity", PropertySpec::number(0.0).intensity(1.0))
            .with_property("reach", PropertySpec::number(0.0).spread_like());
        let mut instance = ComponentInstance::with_defaults(Arc::new(definition));
        instance.set_property("intensity", PropertyValue::Number(intensity)).unwrap();
        instance.set_property("reach", PropertyValue::Number(spread)).unwrap();
        instance
    }

    fn behavior(effects: Vec<EmergentEffect>) -> EmergentBehavior {
        EmergentBehavior {
            id: EmergentBehaviorId::derive(RuleId(0), &[], 0),
            rule: RuleId(0),
            name: String::from("test"),
            description: String::new(),
            kind: InteractionKind::Synergy,
            impact: ImpactLevel::High,
            complexity: 2.0,
            component_types: Vec::new(),
            participants: Vec::new(),
            effects,
            discovered_tick: 0,
        }
    }

    #[test]
    fn domain_tie_goes_to_first_inserted() {
        let entity = ComposedEntity::new(
            EntityRole::Threat,
            vec![
                instance("a", Domain::Cyber, 0.0, 0.0),
                instance("b", Domain::Biological, 0.0, 0.0),
            ],
            Vec::new(),
            &ImpactWeights::default(),
        );
        assert_eq!(*entity.domain(), Domain::Cyber);
    }

    #[test]
    fn domain_majority_wins() {
        let entity = ComposedEntity::new(
            EntityRole::Threat,
            vec![
                instance("a", Domain::Cyber, 0.0, 0.0),
                instance("b", Domain::Biological, 0.0, 0.0),
                instance("c", Domain::Biological, 0.0, 0.0),
            ],
            Vec::new(),
            &ImpactWeights::default(),
        );
        assert_eq!(*entity.domain(), Domain::Biological);
    }

    #[test]
    fn aggregates_apply_effect_multipliers() {
        let entity = ComposedEntity::new(
            EntityRole::Threat,
            vec![
                instance("a", Domain::Cyber, 0.2, 0.3),
                instance("b", Domain::Cyber, 0.6, 0.5),
            ],
            vec![behavior(vec![
                EmergentEffect::SpreadMultiplier(2.0),
                EmergentEffect::IntensityMultiplier(1.5),
                EmergentEffect::Label(String::from("airborne")),
            ])],
            &ImpactWeights::default(),
        );
        assert!((entity.intensity() - 0.6).abs() < 1e-12);
        assert!((entity.spread() - 1.0).abs() < 1e-12);
        assert!((entity.emergence_level() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn deduplicate_skips_known_firings() {
        let mut entity = ComposedEntity::new(
            EntityRole::Threatenable,
            vec![instance("a", Domain::Cyber, 0.0, 0.0)],
            vec![behavior(Vec::new())],
            &ImpactWeights::default(),
        );
        assert_eq!(entity.merge(vec![behavior(Vec::new())], AccumulationPolicy::Deduplicate), 0);
        assert_eq!(entity.merge(vec![behavior(Vec::new())], AccumulationPolicy::Accumulate), 1);
        assert_eq!(entity.emergent_behaviors().len(), 2);
    }

    #[test]
    fn snapshot_copies_state() {
        let entity = ComposedEntity::new(
            EntityRole::Threat,
            vec![instance("a", Domain::Cyber, 0.4, 0.1)],
            Vec::new(),
            &ImpactWeights::default(),
        );
        let snapshot = entity.snapshot();
        assert_eq!(snapshot.id, entity.id());
        assert_eq!(snapshot.components.len(), 1);
        assert_eq!(snapshot.aggregates, entity.aggregates());
    }
}
