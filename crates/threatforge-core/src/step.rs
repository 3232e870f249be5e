//! Step driver: advances composed entities by one tick.
//!
//! For each entity, in order:
//!
//! 1. **Update** -- run every instance's behaviors in insertion order with
//!    an instance-scoped [`BehaviorContext`](crate::behavior::BehaviorContext).
//!    A faulting behavior (an `Err` return or a panic) rolls its instance
//!    back to the pre-tick values and skips the instance's remaining
//!    behaviors.
//!
//! 2. **Detect** -- an entity changed materially if a numeric property
//!    crossed a threshold declared by a condition on its type, or a
//!    behavior emitted [`BehaviorSignal::RequestDiscovery`].
//!
//! 3. **Rediscover** -- on material change, run discovery over the entity
//!    and merge the results per the accumulation policy, then re-apply the
//!    caps.
//!
//! 4. **Recompute** -- re-derive aggregates, whether or not discovery ran.
//!
//! The driver borrows the registry immutably for the whole step, so no
//! type can be registered while a step is in progress.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use threatforge_types::{ComponentInstanceId, ComponentTypeId, EntityId, PropertyValue};
use tracing::{debug, info, warn};

use crate::behavior::{Behavior, BehaviorContext, BehaviorSignal, SimulationContext};
use crate::config::DiscoveryConfig;
use crate::discovery::{DiscoveryEngine, apply_caps};
use crate::entity::ComposedEntity;
use crate::error::BehaviorError;
use crate::instance::ComponentInstance;
use crate::registry::ComponentRegistry;

/// A behavior update that failed and was rolled back.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorFault {
    /// The owning entity.
    pub entity_id: EntityId,
    /// The rolled-back instance.
    pub instance_id: ComponentInstanceId,
    /// The instance's type.
    pub type_id: ComponentTypeId,
    /// Name of the failing behavior.
    pub behavior: String,
    /// What went wrong.
    pub error: BehaviorError,
}

/// Summary of one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// The simulated tick.
    pub tick: u64,
    /// Entities whose emergent behaviors were rediscovered.
    pub rediscovered: Vec<EntityId>,
    /// Emergent behaviors merged into entities this step.
    pub new_emergent_behaviors: usize,
    /// Behavior faults, in the order they happened.
    pub faults: Vec<BehaviorFault>,
}

/// Advances entities one tick at a time.
#[derive(Debug, Clone, Copy)]
pub struct StepDriver<'a> {
    registry: &'a ComponentRegistry,
    config: &'a DiscoveryConfig,
}

impl<'a> StepDriver<'a> {
    /// Create a driver.
    pub const fn new(registry: &'a ComponentRegistry, config: &'a DiscoveryConfig) -> Self {
        Self { registry, config }
    }

    /// Advance every entity by `delta_seconds`.
    ///
    /// Never fails: behavior faults and condition errors are logged and
    /// reported, and the rest of the simulation proceeds.
    pub fn step(
        &self,
        entities: &mut [ComposedEntity],
        delta_seconds: f64,
        context: &SimulationContext,
    ) -> StepReport {
        let tick = context.tick;
        let mut report = StepReport {
            tick,
            ..StepReport::default()
        };
        let scheduled = context
            .tick
            .checked_rem(self.config.rediscovery_interval_ticks)
            == Some(0);

        for (entity_index, entity) in entities.iter_mut().enumerate() {
            let entity_id = entity.id();
            let mut material = false;

            for (instance_index, instance) in entity.components_mut().iter_mut().enumerate() {
                let scoped = context.scoped(entity_id, entity_index, instance.id(), instance_index);
                match self.update_instance(instance, delta_seconds, &scoped) {
                    Ok(changed) => material |= changed,
                    Err((behavior, error)) => {
                        warn!(
                            tick,
                            %entity_id,
                            instance_id = %instance.id(),
                            type_id = %ComponentInstance::type_id(instance),
                            behavior = %behavior,
                            %error,
                            "Behavior failed, instance rolled back"
                        );
                        report.faults.push(BehaviorFault {
                            entity_id,
                            instance_id: instance.id(),
                            type_id: ComponentInstance::type_id(instance).clone(),
                            behavior,
                            error,
                        });
                    }
                }
            }

            if material || scheduled {
                let outcome = DiscoveryEngine::new(self.registry.matrix(), self.config)
                    .discover(entity.components(), tick);
                let added = entity.merge(outcome.behaviors, self.config.accumulation);
                apply_caps(entity.emergent_mut(), self.config);
                report.rediscovered.push(entity_id);
                report.new_emergent_behaviors = report.new_emergent_behaviors.saturating_add(added);
                debug!(tick, %entity_id, added, material, "Entity rediscovered");
            }

            entity.recompute(&self.config.impact_weights);
        }

        info!(
            tick,
            entities = entities.len(),
            rediscovered = report.rediscovered.len(),
            new_emergent = report.new_emergent_behaviors,
            faults = report.faults.len(),
            "Step complete"
        );
        report
    }

    /// Run one instance's behaviors. Returns whether the instance changed
    /// materially, or the failing behavior's name and error after rolling
    /// back.
    fn update_instance(
        &self,
        instance: &mut ComponentInstance,
        delta_seconds: f64,
        scoped: &BehaviorContext<'_>,
    ) -> Result<bool, (String, BehaviorError)> {
        let before = instance.properties().clone();
        let behaviors = instance.take_behaviors();
        let mut signalled = false;
        let mut fault = None;

        for behavior in &behaviors {
            match guarded_update(behavior, instance, delta_seconds, scoped) {
                Ok(signals) => {
                    for signal in signals {
                        match signal {
                            BehaviorSignal::RequestDiscovery { reason } => {
                                debug!(instance_id = %instance.id(), %reason, "Discovery requested");
                                signalled = true;
                            }
                        }
                    }
                }
                Err(error) => {
                    fault = Some((String::from(behavior.name()), error));
                    break;
                }
            }
        }
        instance.restore_behaviors(behaviors);

        if let Some(fault) = fault {
            instance.restore_properties(before);
            return Err(fault);
        }
        Ok(signalled || self.crossed_threshold(instance, &before))
    }

    fn crossed_threshold(
        &self,
        instance: &ComponentInstance,
        before: &BTreeMap<String, PropertyValue>,
    ) -> bool {
        self.registry
            .matrix()
            .thresholds_for(instance.type_id())
            .iter()
            .any(|(property, threshold)| {
                let old = before.get(property).and_then(PropertyValue::as_number);
                let new = instance.number(property);
                match (old, new) {
                    (Some(old), Some(new)) => {
                        old.partial_cmp(threshold) != new.partial_cmp(threshold)
                    }
                    _ => false,
                }
            })
    }
}

/// Run one behavior update, converting a panic into
/// [`BehaviorError::Panicked`].
///
/// The instance may be left half-written by the panic; the caller rolls it
/// back.
fn guarded_update(
    behavior: &Behavior,
    instance: &mut ComponentInstance,
    delta_seconds: f64,
    scoped: &BehaviorContext<'_>,
) -> Result<Vec<BehaviorSignal>, BehaviorError> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        behavior.update(instance, delta_seconds, scoped)
    }))
    .unwrap_or_else(|payload| {
        Err(BehaviorError::Panicked {
            behavior: String::from(behavior.name()),
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| String::from(*message))
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("non-string panic payload"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use threatforge_types::{Comparison, Domain, EntityRole, InteractionKind};

    use super::*;
    use crate::behavior::BehaviorSpec;
    use crate::composition::{ComponentConfig, CompositionEngine};
    use crate::condition::Condition;
    use crate::config::AccumulationPolicy;
    use crate::matrix::InteractionRule;
    use crate::registry::ComponentTypeDefinition;
    use crate::schema::PropertySpec;

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry
            .register(
                ComponentTypeDefinition::new("malware", "Malware", Domain::Cyber)
                    .with_property("stealth", PropertySpec::number(0.35).intensity(1.0))
                    .with_behavior(BehaviorSpec::Grow {
                        property: String::from("stealth"),
                        rate: 0.2,
                        max: Some(1.0),
                        environment_factor: None,
                    })
                    .with_affinity(
                        "network_worm",
                        InteractionRule::new("Self-Propagating Ransomware", InteractionKind::Cascade)
                            .with_condition(Condition::new("malware", "stealth", Comparison::Gt, 0.5)),
                    ),
            )
            .unwrap();
        registry
            .register(ComponentTypeDefinition::new("network_worm", "Network Worm", Domain::Cyber))
            .unwrap();
        registry
    }

    fn entity(registry: &ComponentRegistry, config: &DiscoveryConfig) -> ComposedEntity {
        CompositionEngine::new(registry, config)
            .compose(
                EntityRole::Threat,
                &[ComponentConfig::new("malware"), ComponentConfig::new("network_worm")],
            )
            .unwrap()
    }

    #[test]
    fn threshold_crossing_triggers_rediscovery() {
        let registry = registry();
        let config = DiscoveryConfig::default();
        let mut entities = vec![entity(&registry, &config)];
        assert!(entities[0].emergent_behaviors().is_empty());

        let driver = StepDriver::new(&registry, &config);
        let first = driver.step(&mut entities, 0.5, &SimulationContext::new(1, 42));
        assert!(first.rediscovered.is_empty());

        let second = driver.step(&mut entities, 0.5, &SimulationContext::new(2, 42));
        assert_eq!(second.rediscovered, vec![entities[0].id()]);
        assert_eq!(second.new_emergent_behaviors, 1);
        assert_eq!(entities[0].emergent_behaviors()[0].discovered_tick, 2);
    }

    #[test]
    fn no_crossing_no_rediscovery_but_aggregates_move() {
        let registry = registry();
        let config = DiscoveryConfig::default();
        let mut entities = vec![entity(&registry, &config)];
        let before = entities[0].intensity();

        let report = StepDriver::new(&registry, &config).step(&mut entities, 0.1, &SimulationContext::new(1, 42));
        assert!(report.rediscovered.is_empty());
        assert!(entities[0].intensity() > before);
    }

    #[test]
    fn scheduled_rediscovery_accumulates() {
        let registry = registry();
        let config = DiscoveryConfig {
            rediscovery_interval_ticks: 1,
            ..DiscoveryConfig::default()
        };
        let mut entities = vec![entity(&registry, &config)];
        let driver = StepDriver::new(&registry, &config);
        for tick in 1..=4 {
            driver.step(&mut entities, 0.5, &SimulationContext::new(tick, 42));
        }
        // stealth: 0.35 -> 0.45 -> 0.55 -> 0.65 -> 0.75; fires on ticks 2, 3 and 4.
        let behaviors = entities[0].emergent_behaviors();
        assert_eq!(behaviors.len(), 3);
        assert!(behaviors[0].same_firing(&behaviors[2]));
        assert_ne!(behaviors[0].id, behaviors[1].id);
        assert_ne!(behaviors[1].id, behaviors[2].id);
        assert_ne!(behaviors[0].id, behaviors[2].id);
    }

    #[test]
    fn scheduled_rediscovery_deduplicates() {
        let registry = registry();
        let config = DiscoveryConfig {
            rediscovery_interval_ticks: 1,
            accumulation: AccumulationPolicy::Deduplicate,
            ..DiscoveryConfig::default()
        };
        let mut entities = vec![entity(&registry, &config)];
        let driver = StepDriver::new(&registry, &config);
        for tick in 1..=4 {
            driver.step(&mut entities, 0.5, &SimulationContext::new(tick, 42));
        }
        assert_eq!(entities[0].emergent_behaviors().len(), 1);
    }
}
