//! Configuration loading and typed config structures for `threatforge`.
//!
//! The canonical configuration lives in `threatforge-config.yaml` at the
//! project root. Every field has a default, so an empty file (or no file)
//! yields a usable configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use threatforge_types::{EntityRole, ImpactLevel};

use crate::composition::ComponentConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending key.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThreatForgeConfig {
    /// Seed and timing.
    #[serde(default)]
    pub simulation: SimulationSettings,

    /// Discovery caps, weights and accumulation policy.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Entities and environment for the engine binary.
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl ThreatForgeConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `THREATFORGE_SEED` overrides `simulation.seed`
    /// - `THREATFORGE_LOG` overrides `logging.level`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// No environment overrides are applied.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.discovery.validate()?;
        Ok(config)
    }

    /// Override fields from `THREATFORGE_*` environment variables when set.
    ///
    /// A `THREATFORGE_SEED` that is not a valid `u64` is ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(seed) = std::env::var("THREATFORGE_SEED")
            .ok()
            .and_then(|val| val.trim().parse().ok())
        {
            self.simulation.seed = seed;
        }
        if let Ok(val) = std::env::var("THREATFORGE_LOG") {
            self.logging.level = val;
        }
    }
}

/// Seed and timing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationSettings {
    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Simulated seconds per tick.
    #[serde(default = "default_tick_delta_seconds")]
    pub tick_delta_seconds: f64,

    /// Ticks the engine binary runs before exiting.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            tick_delta_seconds: default_tick_delta_seconds(),
            max_ticks: default_max_ticks(),
        }
    }
}

/// How repeated discovery passes merge into an entity's behavior list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulationPolicy {
    /// Append every new finding, including repeats of earlier ones.
    #[default]
    Accumulate,
    /// Skip findings whose rule already fired over the same participants.
    Deduplicate,
}

/// Weight of each impact level in the emergence score.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImpactWeights {
    /// Weight of [`ImpactLevel::Low`].
    #[serde(default = "default_low_weight")]
    pub low: f64,
    /// Weight of [`ImpactLevel::Medium`].
    #[serde(default = "default_medium_weight")]
    pub medium: f64,
    /// Weight of [`ImpactLevel::High`].
    #[serde(default = "default_high_weight")]
    pub high: f64,
    /// Weight of [`ImpactLevel::Critical`].
    #[serde(default = "default_critical_weight")]
    pub critical: f64,
}

impl ImpactWeights {
    /// Weight for `level`.
    pub const fn weight(&self, level: ImpactLevel) -> f64 {
        match level {
            ImpactLevel::Low => self.low,
            ImpactLevel::Medium => self.medium,
            ImpactLevel::High => self.high,
            ImpactLevel::Critical => self.critical,
        }
    }

    /// Every weight must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let levels = [
            ("low", self.low),
            ("medium", self.medium),
            ("high", self.high),
            ("critical", self.critical),
        ];
        for (level, weight) in levels {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid {
                    field: format!("discovery.impact_weights.{level}"),
                    reason: format!("weight must be finite and non-negative, got {weight}"),
                });
            }
        }
        Ok(())
    }
}

impl Default for ImpactWeights {
    fn default() -> Self {
        Self {
            low: default_low_weight(),
            medium: default_medium_weight(),
            high: default_high_weight(),
            critical: default_critical_weight(),
        }
    }
}

/// Discovery parameters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiscoveryConfig {
    /// Maximum emergence score per entity. Unbounded when absent.
    #[serde(default)]
    pub max_emergence_score: Option<f64>,

    /// Maximum emergent behaviors per entity. Unbounded when absent.
    #[serde(default)]
    pub max_emergent_behaviors: Option<usize>,

    /// Merge policy for repeated discovery passes.
    #[serde(default)]
    pub accumulation: AccumulationPolicy,

    /// Impact level weights.
    #[serde(default)]
    pub impact_weights: ImpactWeights,

    /// Force rediscovery every N ticks even without a material change.
    /// Zero disables.
    #[serde(default)]
    pub rediscovery_interval_ticks: u64,
}

impl DiscoveryConfig {
    /// Check the impact weights and the score cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.impact_weights.validate()?;
        if let Some(max) = self
            .max_emergence_score
            .filter(|max| !max.is_finite() || *max < 0.0)
        {
            return Err(ConfigError::Invalid {
                field: String::from("discovery.max_emergence_score"),
                reason: format!("cap must be finite and non-negative, got {max}"),
            });
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or an `EnvFilter`
    /// directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Entities composed at startup by the engine binary.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScenarioConfig {
    /// Environment factors passed to behaviors, e.g. `humidity: 0.8`.
    #[serde(default)]
    pub environment: BTreeMap<String, f64>,

    /// Entities to compose.
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

/// One entity in the scenario.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityConfig {
    /// Label used in logs.
    pub name: String,

    /// Threat or threatenable.
    #[serde(default = "default_role")]
    pub role: EntityRole,

    /// Component configurations, in insertion order.
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_seed() -> u64 {
    42
}

const fn default_tick_delta_seconds() -> f64 {
    0.1
}

const fn default_max_ticks() -> u64 {
    100
}

const fn default_low_weight() -> f64 {
    1.0
}

const fn default_medium_weight() -> f64 {
    2.0
}

const fn default_high_weight() -> f64 {
    3.0
}

const fn default_critical_weight() -> f64 {
    5.0
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_role() -> EntityRole {
    EntityRole::Threat
}
