//! Composition: turning component configurations into entities.
//!
//! [`CompositionEngine::compose`] is all-or-nothing. Every configuration is
//! resolved and validated before discovery runs, and nothing outside the
//! returned entity is touched, so a failed call leaves no trace.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use threatforge_types::{
    ComponentInstanceId, ComponentTypeId, EmergentBehavior, EntityRole, PropertyValue,
};
use tracing::{debug, info};

use crate::behavior::{Behavior, BehaviorSpec};
use crate::config::DiscoveryConfig;
use crate::discovery::{DiscoveryEngine, apply_caps};
use crate::entity::ComposedEntity;
use crate::error::CompositionError;
use crate::instance::ComponentInstance;
use crate::registry::ComponentRegistry;

/// Requested component: a registered type plus property overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// The registered type to instantiate.
    pub type_id: ComponentTypeId,
    /// Values applied over the schema defaults.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Built-in behaviors appended after the type's defaults.
    #[serde(default)]
    pub behaviors: Vec<BehaviorSpec>,
}

impl ComponentConfig {
    /// A configuration using every schema default.
    pub fn new(type_id: impl Into<ComponentTypeId>) -> Self {
        Self {
            type_id: type_id.into(),
            properties: BTreeMap::new(),
            behaviors: Vec::new(),
        }
    }

    /// Override one property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Append a behavior.
    #[must_use]
    pub fn with_behavior(mut self, behavior: BehaviorSpec) -> Self {
        self.behaviors.push(behavior);
        self
    }
}

/// Builds and edits composed entities against a registry.
#[derive(Debug, Clone, Copy)]
pub struct CompositionEngine<'a> {
    registry: &'a ComponentRegistry,
    config: &'a DiscoveryConfig,
    tick: u64,
}

impl<'a> CompositionEngine<'a> {
    /// Create an engine. Discovered behaviors are stamped with tick 0.
    pub const fn new(registry: &'a ComponentRegistry, config: &'a DiscoveryConfig) -> Self {
        Self {
            registry,
            config,
            tick: 0,
        }
    }

    /// Stamp discovered behaviors with `tick`.
    #[must_use]
    pub const fn at_tick(mut self, tick: u64) -> Self {
        self.tick = tick;
        self
    }

    /// Compose an entity from `configs`, in order.
    pub fn compose(
        &self,
        role: EntityRole,
        configs: &[ComponentConfig],
    ) -> Result<ComposedEntity, CompositionError> {
        if configs.is_empty() {
            return Err(CompositionError::EmptyComposition);
        }

        let mut components = Vec::with_capacity(configs.len());
        for config in configs {
            let instance = self.instantiate(config)?;
            self.check_limit(&components, instance.type_id())?;
            components.push(instance);
        }

        let outcome = self.discovery().discover(&components, self.tick);
        let entity = ComposedEntity::new(
            role,
            components,
            outcome.behaviors,
            &self.config.impact_weights,
        );
        info!(
            entity_id = %entity.id(),
            role = ?role,
            domain = %entity.domain(),
            components = entity.components().len(),
            emergent = entity.emergent_behaviors().len(),
            intensity = entity.intensity(),
            spread = entity.spread(),
            emergence_level = entity.emergence_level(),
            "Entity composed"
        );
        Ok(entity)
    }

    /// Validate and append one component, then discover what it adds.
    ///
    /// New findings are merged per the accumulation policy and the caps
    /// are re-applied. On error the entity is unchanged.
    pub fn add_component(
        &self,
        entity: &mut ComposedEntity,
        config: &ComponentConfig,
    ) -> Result<ComponentInstanceId, CompositionError> {
        let instance = self.instantiate(config)?;
        self.check_limit(entity.components(), instance.type_id())?;
        let id = instance.id();
        entity.push_component(instance);

        let new_index = entity.components().len().saturating_sub(1);
        let outcome = self
            .discovery()
            .discover_incremental(entity.components(), new_index, self.tick);
        let added = entity.merge(outcome.behaviors, self.config.accumulation);
        apply_caps(entity.emergent_mut(), self.config);
        entity.recompute(&self.config.impact_weights);

        debug!(
            entity_id = %entity.id(),
            instance_id = %id,
            type_id = %config.type_id,
            emergent_added = added,
            "Component added"
        );
        Ok(id)
    }

    /// Remove a component instance.
    ///
    /// Emergent behaviors it took part in stay attached.
    pub fn remove_component(
        &self,
        entity: &mut ComposedEntity,
        instance_id: ComponentInstanceId,
    ) -> Result<ComponentInstance, CompositionError> {
        let removed = entity
            .take_component(instance_id)
            .ok_or(CompositionError::UnknownInstance(instance_id))?;
        entity.recompute(&self.config.impact_weights);
        debug!(entity_id = %entity.id(), %instance_id, "Component removed");
        Ok(removed)
    }

    /// Drop every emergent behavior matching `predicate`. Returns how many
    /// were dropped.
    pub fn prune_emergent(
        &self,
        entity: &mut ComposedEntity,
        mut predicate: impl FnMut(&EmergentBehavior) -> bool,
    ) -> usize {
        let behaviors = entity.emergent_mut();
        let before = behaviors.len();
        behaviors.retain(|behavior| !predicate(behavior));
        let pruned = before.saturating_sub(behaviors.len());
        entity.recompute(&self.config.impact_weights);
        debug!(entity_id = %entity.id(), pruned, "Emergent behaviors pruned");
        pruned
    }

    /// Resolve and validate one configuration.
    pub fn instantiate(&self, config: &ComponentConfig) -> Result<ComponentInstance, CompositionError> {
        let definition = self
            .registry
            .find(&config.type_id)
            .ok_or_else(|| CompositionError::UnknownType(config.type_id.clone()))?;
        let extra = config.behaviors.iter().cloned().map(Behavior::from);
        Ok(ComponentInstance::from_config(
            std::sync::Arc::clone(definition),
            &config.properties,
            extra,
        )?)
    }

    const fn discovery(&self) -> DiscoveryEngine<'a> {
        DiscoveryEngine::new(self.registry.matrix(), self.config)
    }

    fn check_limit(
        &self,
        existing: &[ComponentInstance],
        type_id: &ComponentTypeId,
    ) -> Result<(), CompositionError> {
        let Some(definition) = self.registry.find(type_id) else {
            return Ok(());
        };
        let Some(limit) = definition.profile.max_instances_per_entity else {
            return Ok(());
        };
        let present = existing
            .iter()
            .filter(|instance| instance.type_id() == type_id)
            .count();
        if present >= limit {
            return Err(CompositionError::InstanceLimit {
                type_id: type_id.clone(),
                limit,
            });
        }
        Ok(())
    }
}
