//! Behaviors: per-instance update rules run by the step driver.
//!
//! A [`Behavior`] is either one of the built-in [`BehaviorSpec`] rules,
//! which can be written in configuration files, or a plugin-supplied
//! [`BehaviorUpdate`] object. Both are dispatched through
//! [`Behavior::update`], which receives elapsed seconds and an
//! instance-scoped [`BehaviorContext`].
//!
//! Built-in randomness uses a seeded `xorshift64` keyed by
//! `(seed, tick, entity index, instance index)`, so the same inputs always
//! produce the same simulation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use threatforge_types::{ComponentInstanceId, Domain, EntityId, EntityRole};

use crate::error::BehaviorError;
use crate::instance::ComponentInstance;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Another entity visible to behaviors during a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyEntity {
    /// The entity.
    pub id: EntityId,
    /// Its role.
    pub role: EntityRole,
    /// Its domain.
    pub domain: Domain,
    /// Its intensity at the start of the step.
    pub intensity: f64,
    /// Abstract distance from the entity being updated.
    pub distance: f64,
}

/// Read-only simulation state supplied by the game loop for one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationContext {
    /// The tick being simulated.
    pub tick: u64,
    /// World seed for deterministic randomness.
    pub seed: u64,
    /// Environment snapshot, e.g. `humidity -> 0.8`.
    pub environment: BTreeMap<String, f64>,
    /// Entities near the ones being stepped.
    pub nearby: Vec<NearbyEntity>,
}

impl SimulationContext {
    /// A context for `tick` with an empty environment.
    pub fn new(tick: u64, seed: u64) -> Self {
        Self {
            tick,
            seed,
            environment: BTreeMap::new(),
            nearby: Vec::new(),
        }
    }

    /// Narrow the context to one component instance.
    pub fn scoped(
        &self,
        entity_id: EntityId,
        entity_index: usize,
        instance_id: ComponentInstanceId,
        instance_index: usize,
    ) -> BehaviorContext<'_> {
        BehaviorContext {
            tick: self.tick,
            seed: self.seed,
            entity_id,
            entity_index,
            instance_id,
            instance_index,
            environment: &self.environment,
            nearby: &self.nearby,
        }
    }
}

/// The simulation context as seen by one component instance.
#[derive(Debug, Clone, Copy)]
pub struct BehaviorContext<'a> {
    /// The tick being simulated.
    pub tick: u64,
    /// World seed.
    pub seed: u64,
    /// The owning entity.
    pub entity_id: EntityId,
    /// Position of the owning entity in the stepped slice.
    pub entity_index: usize,
    /// The instance being updated.
    pub instance_id: ComponentInstanceId,
    /// Position of the instance within its entity.
    pub instance_index: usize,
    /// Environment snapshot.
    pub environment: &'a BTreeMap<String, f64>,
    /// Nearby entities, excluding nothing (filtering is the caller's job).
    pub nearby: &'a [NearbyEntity],
}

impl BehaviorContext<'_> {
    /// Value of an environment factor, if present.
    pub fn environment_factor(&self, key: &str) -> Option<f64> {
        self.environment.get(key).copied()
    }

    /// Deterministic noise in `[-1.0, 1.0]` for this instance and tick.
    pub fn noise(&self) -> f64 {
        let key = self
            .seed
            .wrapping_add((self.entity_index as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15))
            .wrapping_add((self.instance_index as u64).wrapping_mul(0xc2b2_ae3d_27d4_eb4f));
        let random = deterministic_random(key, self.tick);
        (random as f64 / u64::MAX as f64).mul_add(2.0, -1.0)
    }
}

/// Deterministic pseudo-random number generator using `xorshift64`.
///
/// The same `(seed, tick)` pair always produces the same output.
const fn deterministic_random(seed: u64, tick: u64) -> u64 {
    let mut state = seed.wrapping_add(tick.wrapping_mul(0x517c_c1b7_2722_0a95));

    // xorshift requires a non-zero state.
    if state == 0 {
        state = 0xdead_beef_cafe_babe;
    }

    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;

    state
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// A signal emitted by a behavior during its update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorSignal {
    /// Ask the step driver to re-run discovery for the owning entity.
    RequestDiscovery {
        /// Why discovery was requested.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Behaviors
// ---------------------------------------------------------------------------

/// Capability implemented by plugin behaviors.
pub trait BehaviorUpdate: Send + Sync + core::fmt::Debug {
    /// Name used in logs and fault reports.
    fn name(&self) -> &str;

    /// Advance `instance` by `delta_seconds`.
    ///
    /// Property writes go through [`ComponentInstance::set_property`] and
    /// are schema-validated. Returning an error makes the step driver roll
    /// the instance back to its pre-tick state.
    fn update(
        &self,
        instance: &mut ComponentInstance,
        delta_seconds: f64,
        context: &BehaviorContext<'_>,
    ) -> Result<Vec<BehaviorSignal>, BehaviorError>;
}

/// Built-in behaviors that can be declared in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BehaviorSpec {
    /// Increase a numeric property by `rate` per second.
    Grow {
        /// Property to increase.
        property: String,
        /// Units per second.
        rate: f64,
        /// Upper bound.
        #[serde(default)]
        max: Option<f64>,
        /// Environment key whose value scales the rate (missing keys count
        /// as `1.0`).
        #[serde(default)]
        environment_factor: Option<String>,
    },
    /// Decrease a numeric property by `rate` per second.
    Decay {
        /// Property to decrease.
        property: String,
        /// Units per second.
        rate: f64,
        /// Lower bound.
        #[serde(default)]
        min: Option<f64>,
    },
    /// Randomly perturb a numeric property by up to `amplitude` per second.
    Fluctuate {
        /// Property to perturb.
        property: String,
        /// Maximum change per second.
        amplitude: f64,
        /// Lower bound.
        #[serde(default)]
        min: Option<f64>,
        /// Upper bound.
        #[serde(default)]
        max: Option<f64>,
    },
    /// Request rediscovery while a numeric property is at or above
    /// `threshold`.
    Pulse {
        /// Property to watch.
        property: String,
        /// Trigger level.
        threshold: f64,
    },
}

impl BehaviorSpec {
    /// Short name of the behavior kind.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Grow { .. } => "grow",
            Self::Decay { .. } => "decay",
            Self::Fluctuate { .. } => "fluctuate",
            Self::Pulse { .. } => "pulse",
        }
    }

    fn update(
        &self,
        instance: &mut ComponentInstance,
        delta_seconds: f64,
        context: &BehaviorContext<'_>,
    ) -> Result<Vec<BehaviorSignal>, BehaviorError> {
        match self {
            Self::Grow {
                property,
                rate,
                max,
                environment_factor,
            } => {
                let factor = environment_factor
                    .as_deref()
                    .and_then(|key| context.environment_factor(key))
                    .unwrap_or(1.0);
                let current = read_number(instance, property)?;
                let next = clamp(rate.mul_add(factor * delta_seconds, current), None, *max);
                write_number(instance, property, next)?;
                Ok(Vec::new())
            }
            Self::Decay {
                property,
                rate,
                min,
            } => {
                let current = read_number(instance, property)?;
                let next = clamp(current - rate * delta_seconds, *min, None);
                write_number(instance, property, next)?;
                Ok(Vec::new())
            }
            Self::Fluctuate {
                property,
                amplitude,
                min,
                max,
            } => {
                let current = read_number(instance, property)?;
                let delta = amplitude * context.noise() * delta_seconds;
                write_number(instance, property, clamp(current + delta, *min, *max))?;
                Ok(Vec::new())
            }
            Self::Pulse {
                property,
                threshold,
            } => {
                let current = read_number(instance, property)?;
                if current >= *threshold {
                    Ok(vec![BehaviorSignal::RequestDiscovery {
                        reason: format!("{property} at {current} >= {threshold}"),
                    }])
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }
}

/// A behavior attached to a component instance.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// A built-in rule.
    Builtin(BehaviorSpec),
    /// A plugin-supplied rule.
    Custom(Arc<dyn BehaviorUpdate>),
}

impl Behavior {
    /// Wrap a plugin behavior.
    pub fn custom(update: impl BehaviorUpdate + 'static) -> Self {
        Self::Custom(Arc::new(update))
    }

    /// Name used in logs and fault reports.
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(spec) => spec.name(),
            Self::Custom(update) => update.name(),
        }
    }

    /// Advance `instance` by `delta_seconds`.
    pub fn update(
        &self,
        instance: &mut ComponentInstance,
        delta_seconds: f64,
        context: &BehaviorContext<'_>,
    ) -> Result<Vec<BehaviorSignal>, BehaviorError> {
        match self {
            Self::Builtin(spec) => spec.update(instance, delta_seconds, context),
            Self::Custom(update) => update.update(instance, delta_seconds, context),
        }
    }
}

impl From<BehaviorSpec> for Behavior {
    fn from(spec: BehaviorSpec) -> Self {
        Self::Builtin(spec)
    }
}

fn read_number(instance: &ComponentInstance, property: &str) -> Result<f64, BehaviorError> {
    match instance.property(property) {
        None => Err(BehaviorError::MissingProperty {
            type_id: instance.type_id().clone(),
            property: String::from(property),
        }),
        Some(value) => value.as_number().ok_or_else(|| BehaviorError::NotNumeric {
            type_id: instance.type_id().clone(),
            property: String::from(property),
        }),
    }
}

fn write_number(
    instance: &mut ComponentInstance,
    property: &str,
    value: f64,
) -> Result<(), BehaviorError> {
    instance.set_property(property, value.into())?;
    Ok(())
}

fn clamp(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let value = min.map_or(value, |lo| value.max(lo));
    max.map_or(value, |hi| value.min(hi))
}
