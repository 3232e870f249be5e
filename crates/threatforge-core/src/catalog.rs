//! Starter catalog of component types and interaction rules.
//!
//! Ten component types across seven domains, with pairwise affinities, a
//! few extra rules, and one higher-order pattern. Used by the engine binary
//! and as a realistic fixture in tests.

use threatforge_types::{Comparison, Domain, EmergentEffect, EntityRole, ImpactLevel, InteractionKind};

use crate::behavior::BehaviorSpec;
use crate::composition::ComponentConfig;
use crate::condition::Condition;
use crate::config::EntityConfig;
use crate::error::RegistryError;
use crate::matrix::{InteractionRule, PatternRule};
use crate::registry::{ComponentRegistry, ComponentTypeDefinition, PerformanceProfile};
use crate::schema::PropertySpec;

/// Helper to build an intensity-contributing numeric property.
fn intensity(default: f64) -> PropertySpec {
    PropertySpec::number(default).intensity(1.0)
}

/// Helper to build a spread-like numeric property.
fn spread(default: f64) -> PropertySpec {
    PropertySpec::number(default).spread_like()
}

/// Helper to build a `type.property > threshold` condition.
fn above(target: &str, property: &str, threshold: f64) -> Condition {
    Condition::new(target, property, Comparison::Gt, threshold)
}

/// Register the starter catalog into `registry`.
///
/// Fails with [`RegistryError::DuplicateType`] if any catalog type is
/// already registered.
pub fn register_starter_catalog(registry: &mut ComponentRegistry) -> Result<(), RegistryError> {
    // -- Biological --------------------------------------------------------
    registry.register(
        ComponentTypeDefinition::new("pathogen", "Pathogen", Domain::Biological)
            .with_property("virulence", intensity(0.5))
            .with_property("transmission_rate", spread(0.3))
            .with_property("strain", PropertySpec::enumeration(&["viral", "bacterial", "fungal"], "viral"))
            .with_emergence_potential(0.8)
            .with_behavior(BehaviorSpec::Grow {
                property: String::from("virulence"),
                rate: 0.02,
                max: Some(1.0),
                environment_factor: Some(String::from("humidity")),
            })
            .with_affinity(
                "airborne_vector",
                InteractionRule::new("Aerosolized Outbreak", InteractionKind::Synergy)
                    .with_description("Airborne transport multiplies pathogen reach")
                    .with_condition(above("pathogen", "virulence", 0.4))
                    .with_impact(ImpactLevel::High)
                    .with_complexity(3.0)
                    .with_effect(EmergentEffect::SpreadMultiplier(1.5)),
            )
            .with_affinity(
                "hospital",
                InteractionRule::new("Overwhelmed Wards", InteractionKind::Cascade)
                    .with_description("Patient load exceeds hospital capacity")
                    .with_condition(above("pathogen", "virulence", 0.6))
                    .with_impact(ImpactLevel::High)
                    .with_complexity(2.5)
                    .with_effect(EmergentEffect::IntensityMultiplier(1.2)),
            ),
    )?;
    registry.register(
        ComponentTypeDefinition::new("airborne_vector", "Airborne Vector", Domain::Environmental)
            .with_property("range", spread(0.4))
            .with_property("particle_density", intensity(0.3))
            .with_behavior(BehaviorSpec::Fluctuate {
                property: String::from("range"),
                amplitude: 0.05,
                min: Some(0.0),
                max: Some(1.0),
            })
            .with_profile(PerformanceProfile {
                update_cost: 0.5,
                max_instances_per_entity: Some(2),
            }),
    )?;

    // -- Cyber -------------------------------------------------------------
    registry.register(
        ComponentTypeDefinition::new("malware", "Malware Payload", Domain::Cyber)
            .with_property("stealth", intensity(0.4))
            .with_property("payload", PropertySpec::enumeration(&["ransomware", "wiper", "spyware"], "ransomware"))
            .with_property("encrypted", PropertySpec::flag(false))
            .with_emergence_potential(0.7)
            .with_behavior(BehaviorSpec::Grow {
                property: String::from("stealth"),
                rate: 0.01,
                max: Some(1.0),
                environment_factor: None,
            })
            .with_affinity(
                "network_worm",
                InteractionRule::new("Self-Propagating Ransomware", InteractionKind::Cascade)
                    .with_description("Worm carries the payload laterally through the network")
                    .with_condition(above("malware", "stealth", 0.5))
                    .with_condition(Condition::new("malware", "payload", Comparison::Eq, "ransomware"))
                    .with_impact(ImpactLevel::Critical)
                    .with_complexity(4.0)
                    .with_effect(EmergentEffect::SpreadMultiplier(2.0))
                    .with_effect(EmergentEffect::Label(String::from("wormable"))),
            )
            .with_affinity(
                "power_grid",
                InteractionRule::new("Grid Sabotage", InteractionKind::Transformation)
                    .with_description("Control systems are turned against the grid")
                    .with_condition(above("malware", "stealth", 0.7))
                    .with_impact(ImpactLevel::Critical)
                    .with_complexity(3.5),
            ),
    )?;
    registry.register(
        ComponentTypeDefinition::new("network_worm", "Network Worm", Domain::Cyber)
            .with_property("propagation", spread(0.5))
            .with_property("aggression", intensity(0.4))
            .with_behavior(BehaviorSpec::Pulse {
                property: String::from("aggression"),
                threshold: 0.9,
            }),
    )?;

    // -- Environmental / Radiological --------------------------------------
    registry.register(
        ComponentTypeDefinition::new("flood_surge", "Flood Surge", Domain::Environmental)
            .with_property("water_level", intensity(0.4))
            .with_property("extent", spread(0.3))
            .with_behavior(BehaviorSpec::Grow {
                property: String::from("water_level"),
                rate: 0.03,
                max: Some(1.0),
                environment_factor: Some(String::from("rainfall")),
            })
            .with_affinity(
                "power_grid",
                InteractionRule::new("Grid Flooding", InteractionKind::Conflict)
                    .with_description("Substations short out under rising water")
                    .with_condition(above("flood_surge", "water_level", 0.6))
                    .with_condition(above("power_grid", "load", 0.5))
                    .with_impact(ImpactLevel::High)
                    .with_complexity(2.0)
                    .with_effect(EmergentEffect::IntensityMultiplier(1.3)),
            ),
    )?;
    registry.register(
        ComponentTypeDefinition::new("radiation_source", "Radiation Source", Domain::Radiological)
            .with_property("activity", intensity(0.6))
            .with_property("shielded", PropertySpec::flag(true))
            .with_emergence_potential(0.6)
            .with_behavior(BehaviorSpec::Decay {
                property: String::from("activity"),
                rate: 0.005,
                min: Some(0.0),
            })
            .with_affinity(
                "flood_surge",
                InteractionRule::new("Contaminated Runoff", InteractionKind::Transformation)
                    .with_description("Flood water carries radioactive material downstream")
                    .with_condition(Condition::new("radiation_source", "shielded", Comparison::Eq, false))
                    .with_impact(ImpactLevel::Critical)
                    .with_complexity(3.0)
                    .with_effect(EmergentEffect::SpreadMultiplier(1.8)),
            ),
    )?;

    // -- Infrastructure (threatenables) ------------------------------------
    registry.register(
        ComponentTypeDefinition::new("power_grid", "Power Grid Node", Domain::Physical)
            .with_property("load", intensity(0.5))
            .with_property("redundancy", PropertySpec::number(0.5))
            .with_behavior(BehaviorSpec::Fluctuate {
                property: String::from("load"),
                amplitude: 0.1,
                min: Some(0.0),
                max: Some(1.0),
            })
            .with_affinity(
                "hospital",
                InteractionRule::new("Backup Power Strain", InteractionKind::Cascade)
                    .with_description("Hospitals fall back to generators as the grid sags")
                    .with_condition(above("power_grid", "load", 0.8))
                    .with_impact(ImpactLevel::Medium)
                    .with_complexity(1.5),
            ),
    )?;
    registry.register(
        ComponentTypeDefinition::new("hospital", "Hospital", Domain::Social)
            .with_property("capacity", PropertySpec::number(0.7))
            .with_property("strain", intensity(0.3))
            .with_emergence_potential(0.4),
    )?;

    // -- Economic / Social -------------------------------------------------
    registry.register(
        ComponentTypeDefinition::new("financial_panic", "Financial Panic", Domain::Economic)
            .with_property("fear_index", intensity(0.4))
            .with_property("contagion", spread(0.2))
            .with_emergence_potential(0.9)
            .with_affinity(
                "financial_panic",
                InteractionRule::new("Bank Run", InteractionKind::Synergy)
                    .with_description("Panics feed each other into a run on deposits")
                    .with_condition(above("financial_panic", "fear_index", 0.5))
                    .with_impact(ImpactLevel::High)
                    .with_complexity(2.0)
                    .with_strength(1.5)
                    .with_effect(EmergentEffect::SpreadMultiplier(1.4)),
            ),
    )?;
    registry.register(
        ComponentTypeDefinition::new("misinformation", "Misinformation Campaign", Domain::Social)
            .with_property("virality", spread(0.5))
            .with_property("credibility", intensity(0.4))
            .with_behavior(BehaviorSpec::Grow {
                property: String::from("virality"),
                rate: 0.02,
                max: Some(1.0),
                environment_factor: None,
            })
            .with_affinity(
                "pathogen",
                InteractionRule::new("Infodemic", InteractionKind::Synergy)
                    .with_description("False health claims undermine containment")
                    .with_condition(above("misinformation", "virality", 0.6))
                    .with_impact(ImpactLevel::Medium)
                    .with_complexity(2.0)
                    .with_effect(EmergentEffect::IntensityMultiplier(1.25)),
            )
            .with_affinity(
                "financial_panic",
                InteractionRule::new("Rumor-Driven Selloff", InteractionKind::Cascade)
                    .with_description("Rumors accelerate market panic")
                    .with_condition(above("misinformation", "credibility", 0.5))
                    .with_impact(ImpactLevel::Medium)
                    .with_complexity(1.5),
            ),
    )?;

    // -- Extra rules and patterns ------------------------------------------
    registry.add_rule(
        "network_worm",
        "hospital",
        InteractionRule::new("Medical Device Compromise", InteractionKind::Conflict)
            .with_description("Worm reaches unpatched medical devices")
            .with_condition(above("network_worm", "aggression", 0.6))
            .with_impact(ImpactLevel::Critical)
            .with_complexity(2.5),
    )?;
    registry.add_pattern(
        PatternRule::new(
            "Pandemic Economic Collapse",
            InteractionKind::Cascade,
            ["pathogen", "misinformation", "financial_panic"],
        )
        .with_description("Outbreak, rumor and panic lock into a self-reinforcing collapse")
        .with_condition(above("pathogen", "virulence", 0.5))
        .with_impact(ImpactLevel::Critical)
        .with_complexity(6.0)
        .with_effect(EmergentEffect::IntensityMultiplier(1.5))
        .with_effect(EmergentEffect::Label(String::from("systemic"))),
    )?;

    Ok(())
}

/// Demonstration scenario over the starter catalog, used when the
/// configuration supplies no entities.
pub fn demo_scenario() -> Vec<EntityConfig> {
    vec![
        EntityConfig {
            name: String::from("airborne_outbreak"),
            role: EntityRole::Threat,
            components: vec![
                ComponentConfig::new("pathogen").with_property("virulence", 0.45),
                ComponentConfig::new("airborne_vector"),
                ComponentConfig::new("misinformation").with_property("virality", 0.55),
            ],
        },
        EntityConfig {
            name: String::from("ransomware_campaign"),
            role: EntityRole::Threat,
            components: vec![
                ComponentConfig::new("malware").with_property("stealth", 0.48),
                ComponentConfig::new("network_worm"),
            ],
        },
        EntityConfig {
            name: String::from("market_contagion"),
            role: EntityRole::Threat,
            components: vec![
                ComponentConfig::new("pathogen").with_property("virulence", 0.7),
                ComponentConfig::new("misinformation"),
                ComponentConfig::new("financial_panic").with_property("fear_index", 0.6),
                ComponentConfig::new("financial_panic").with_property("fear_index", 0.7),
            ],
        },
        EntityConfig {
            name: String::from("regional_infrastructure"),
            role: EntityRole::Threatenable,
            components: vec![
                ComponentConfig::new("power_grid").with_property("load", 0.75),
                ComponentConfig::new("hospital"),
            ],
        },
    ]
}
