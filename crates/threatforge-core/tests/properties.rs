//! Property-based tests for rule triggering and matrix lookup.

#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use proptest::prelude::*;
use threatforge_core::{
    ComponentConfig, ComponentRegistry, ComponentTypeDefinition, CompositionEngine, Condition,
    DiscoveryConfig, InteractionMatrix, InteractionRule, PropertySpec,
};
use threatforge_types::{Comparison, ComponentTypeId, Domain, EntityRole, InteractionKind};

const TYPES: [&str; 4] = ["pathogen", "malware", "flood_surge", "power_grid"];

/// Compose `A + B` where `A` has one property per condition and the rule
/// requires `A.p{i} > threshold_i` for every `i`.
fn fires(cases: &[(u8, u8)]) -> bool {
    let mut definition = ComponentTypeDefinition::new("A", "A", Domain::Quantum);
    let mut rule = InteractionRule::new("Conjunction", InteractionKind::Synergy);
    let mut config = ComponentConfig::new("A");
    for (i, (value, threshold)) in cases.iter().enumerate() {
        let property = format!("p{i}");
        definition = definition.with_property(property.clone(), PropertySpec::number(0.0));
        // Half-step offset keeps values and thresholds from ever being equal.
        let threshold = (f64::from(*threshold) + 0.5) / 100.0;
        rule = rule.with_condition(Condition::new("A", property.clone(), Comparison::Gt, threshold));
        config = config.with_property(property, f64::from(*value) / 100.0);
    }

    let mut registry = ComponentRegistry::new();
    registry.register(definition).unwrap();
    registry
        .register(ComponentTypeDefinition::new("B", "B", Domain::Quantum))
        .unwrap();
    registry.add_rule("A", "B", rule).unwrap();

    let discovery = DiscoveryConfig::default();
    let entity = CompositionEngine::new(&registry, &discovery)
        .compose(EntityRole::Threat, &[config, ComponentConfig::new("B")])
        .unwrap();
    match entity.emergent_behaviors().len() {
        0 => false,
        1 => true,
        n => panic!("a single pair fired {n} times"),
    }
}

proptest! {
    #[test]
    fn rule_fires_iff_every_condition_holds(
        cases in prop::collection::vec((0u8..=100, 0u8..100), 1..6)
    ) {
        let expected = cases.iter().all(|(value, threshold)| value > threshold);
        prop_assert_eq!(fires(&cases), expected);
    }

    #[test]
    fn falsifying_one_condition_prevents_firing(
        thresholds in prop::collection::vec(0u8..99, 1..6),
        flip in any::<prop::sample::Index>()
    ) {
        let mut cases: Vec<(u8, u8)> = thresholds.iter().map(|t| (t + 1, *t)).collect();
        prop_assert!(fires(&cases));

        let index = flip.index(cases.len());
        cases[index].0 = cases[index].1;
        prop_assert!(!fires(&cases));
    }

    #[test]
    fn pair_lookup_is_symmetric(
        rules in prop::collection::vec((0usize..TYPES.len(), 0usize..TYPES.len()), 0..12)
    ) {
        let mut matrix = InteractionMatrix::new();
        for (n, (a, b)) in rules.iter().enumerate() {
            matrix
                .add_rule(
                    ComponentTypeId::from(TYPES[*a]),
                    ComponentTypeId::from(TYPES[*b]),
                    InteractionRule::new(format!("rule {n}"), InteractionKind::Conflict),
                )
                .unwrap();
        }

        for a in TYPES {
            for b in TYPES {
                let a = ComponentTypeId::from(a);
                let b = ComponentTypeId::from(b);
                prop_assert_eq!(matrix.rules_for(&a, &b), matrix.rules_for(&b, &a));
            }
        }
    }
}
