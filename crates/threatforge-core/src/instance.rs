//! Component instances: a registered type plus concrete property values.

use std::collections::BTreeMap;
use std::sync::Arc;

use threatforge_types::{ComponentInstanceId, ComponentSnapshot, ComponentTypeId, Domain, PropertyValue};

use crate::behavior::Behavior;
use crate::error::PropertyError;
use crate::registry::ComponentTypeDefinition;

/// A live component inside a composed entity.
///
/// Every key in `properties` is declared by the definition's schema and
/// every value matches its declared kind. Writes go through
/// [`ComponentInstance::set_property`], which re-validates.
#[derive(Debug, Clone)]
pub struct ComponentInstance {
    id: ComponentInstanceId,
    definition: Arc<ComponentTypeDefinition>,
    properties: BTreeMap<String, PropertyValue>,
    behaviors: Vec<Behavior>,
    emergence_potential: f64,
}

impl ComponentInstance {
    /// Instantiate a definition with its schema defaults and default
    /// behaviors.
    pub fn with_defaults(definition: Arc<ComponentTypeDefinition>) -> Self {
        let properties = definition
            .schema
            .iter()
            .map(|(name, spec)| (name.clone(), spec.default.clone()))
            .collect();
        let behaviors = definition.default_behaviors.clone();
        let mut instance = Self {
            id: ComponentInstanceId::new(),
            definition,
            properties,
            behaviors,
            emergence_potential: 0.0,
        };
        instance.refresh_potential();
        instance
    }

    /// Instantiate a definition with property overrides and extra
    /// behaviors appended after the defaults.
    ///
    /// Every override must name a declared property and match its kind.
    pub fn from_config(
        definition: Arc<ComponentTypeDefinition>,
        overrides: &BTreeMap<String, PropertyValue>,
        extra_behaviors: impl IntoIterator<Item = Behavior>,
    ) -> Result<Self, PropertyError> {
        let mut instance = Self::with_defaults(definition);
        for (name, value) in overrides {
            let coerced = instance.validate(name, value.clone())?;
            instance.properties.insert(name.clone(), coerced);
        }
        instance.behaviors.extend(extra_behaviors);
        instance.refresh_potential();
        Ok(instance)
    }

    /// Instance identifier.
    pub const fn id(&self) -> ComponentInstanceId {
        self.id
    }

    /// The instance's type.
    pub fn type_id(&self) -> &ComponentTypeId {
        &self.definition.id
    }

    /// The shared type definition.
    pub const fn definition(&self) -> &Arc<ComponentTypeDefinition> {
        &self.definition
    }

    /// The type's domain.
    pub fn domain(&self) -> &Domain {
        &self.definition.domain
    }

    /// All property values.
    pub const fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    /// One property value.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// A numeric property value.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.property(name).and_then(PropertyValue::as_number)
    }

    /// Behaviors run on every step, in order.
    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    /// Current emergence potential.
    pub const fn emergence_potential(&self) -> f64 {
        self.emergence_potential
    }

    /// Set a property after validating it against the schema.
    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        let coerced = self.validate(name, value)?;
        self.properties.insert(String::from(name), coerced);
        self.refresh_potential();
        Ok(())
    }

    /// Weighted intensity contributions: `(sum of weight * value, sum of
    /// weights)`.
    pub(crate) fn intensity_terms(&self) -> (f64, f64) {
        self.definition
            .schema
            .iter()
            .filter_map(|(name, spec)| Some((self.number(name)?, spec.intensity_weight?)))
            .fold((0.0, 0.0), |(sum, weights), (value, weight)| {
                (value.mul_add(weight, sum), weights + weight)
            })
    }

    /// Largest spread-like property value.
    pub(crate) fn spread(&self) -> Option<f64> {
        self.definition
            .schema
            .iter()
            .filter(|(_, spec)| spec.spread)
            .filter_map(|(name, _)| self.number(name))
            .reduce(f64::max)
    }

    /// Detach the behavior list so behaviors can borrow the instance
    /// mutably.
    pub(crate) fn take_behaviors(&mut self) -> Vec<Behavior> {
        std::mem::take(&mut self.behaviors)
    }

    pub(crate) fn restore_behaviors(&mut self, behaviors: Vec<Behavior>) {
        self.behaviors = behaviors;
    }

    /// Replace every property at once. Used to roll back a faulted update.
    pub(crate) fn restore_properties(&mut self, properties: BTreeMap<String, PropertyValue>) {
        self.properties = properties;
        self.refresh_potential();
    }

    /// Serializable view of the instance.
    pub fn snapshot(&self) -> ComponentSnapshot {
        ComponentSnapshot {
            id: self.id,
            type_id: self.type_id().clone(),
            domain: self.domain().clone(),
            properties: self.properties.clone(),
            emergence_potential: self.emergence_potential,
        }
    }

    fn validate(&self, name: &str, value: PropertyValue) -> Result<PropertyValue, PropertyError> {
        let spec = self
            .definition
            .spec(name)
            .ok_or_else(|| PropertyError::UnknownProperty {
                type_id: self.type_id().clone(),
                property: String::from(name),
            })?;
        spec.coerce(self.type_id(), name, value)
    }

    /// Scale the type's base potential by the instance's mean intensity
    /// property, clamped to `0..=1`.
    fn refresh_potential(&mut self) {
        let base = self.definition.emergence_potential;
        let (sum, weights) = self.intensity_terms();
        self.emergence_potential = if weights > 0.0 {
            let mean = (sum / weights).clamp(0.0, 1.0);
            base * mean.mul_add(0.5, 0.5)
        } else {
            base
        };
    }
}
