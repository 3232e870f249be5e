//! Simulation driver binary for `threatforge`.
//!
//! Stands in for the game loop: it composes the configured scenario over
//! the starter catalog, steps it on a fixed timestep, and prints the final
//! entity snapshots as JSON on stdout.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (first argument, `THREATFORGE_CONFIG`, or
//!    `threatforge-config.yaml`; defaults if the file is missing)
//! 2. Initialize structured logging (tracing)
//! 3. Register the starter catalog
//! 4. Compose the scenario entities (the demo scenario if none are configured)
//! 5. Run `max_ticks` steps
//! 6. Print snapshots

mod error;

use std::path::PathBuf;

use threatforge_core::catalog::{demo_scenario, register_starter_catalog};
use threatforge_core::config::{LoggingConfig, ThreatForgeConfig};
use threatforge_core::{
    ComponentRegistry, ComposedEntity, CompositionEngine, NearbyEntity, SimulationContext,
    StepDriver,
};
use threatforge_types::EntitySnapshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "threatforge-config.yaml";

fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        path = %config_path.display(),
        seed = config.simulation.seed,
        tick_delta_seconds = config.simulation.tick_delta_seconds,
        max_ticks = config.simulation.max_ticks,
        "Configuration loaded"
    );

    // 3. Register the starter catalog.
    let mut registry = ComponentRegistry::new();
    register_starter_catalog(&mut registry)?;
    info!(
        types = registry.len(),
        rules = registry.matrix().rule_count(),
        patterns = registry.matrix().pattern_count(),
        "Starter catalog registered"
    );

    // 4. Compose the scenario.
    let scenario = if config.scenario.entities.is_empty() {
        info!("No scenario entities configured, using the demo scenario");
        demo_scenario()
    } else {
        config.scenario.entities.clone()
    };
    let composer = CompositionEngine::new(&registry, &config.discovery);
    let mut entities = Vec::with_capacity(scenario.len());
    for entity_config in &scenario {
        let entity = composer
            .compose(entity_config.role, &entity_config.components)
            .map_err(|source| EngineError::Composition {
                entity: entity_config.name.clone(),
                source,
            })?;
        info!(
            name = %entity_config.name,
            entity_id = %entity.id(),
            emergent = entity.emergent_behaviors().len(),
            "Scenario entity ready"
        );
        entities.push(entity);
    }

    // 5. Run the fixed-timestep loop.
    let driver = StepDriver::new(&registry, &config.discovery);
    let mut context = SimulationContext::new(0, config.simulation.seed);
    context.environment.clone_from(&config.scenario.environment);

    let mut fault_count: usize = 0;
    for tick in 1..=config.simulation.max_ticks {
        context.tick = tick;
        context.nearby = lineup(&entities);
        let report = driver.step(&mut entities, config.simulation.tick_delta_seconds, &context);
        for fault in &report.faults {
            warn!(
                tick,
                entity_id = %fault.entity_id,
                type_id = %fault.type_id,
                behavior = %fault.behavior,
                "Behavior fault recorded"
            );
        }
        fault_count = fault_count.saturating_add(report.faults.len());
    }

    for (entity_config, entity) in scenario.iter().zip(&entities) {
        info!(
            name = %entity_config.name,
            domain = %entity.domain(),
            intensity = entity.intensity(),
            spread = entity.spread(),
            emergence_level = entity.emergence_level(),
            emergent = entity.emergent_behaviors().len(),
            "Final entity state"
        );
    }
    info!(
        ticks = config.simulation.max_ticks,
        faults = fault_count,
        "Simulation complete"
    );

    // 6. Print snapshots.
    let snapshots: Vec<EntitySnapshot> = entities.iter().map(ComposedEntity::snapshot).collect();
    println!("{}", serde_json::to_string_pretty(&snapshots)?);
    Ok(())
}

/// Resolve the config path and load it, falling back to defaults when the
/// file does not exist.
fn load_config() -> Result<(ThreatForgeConfig, PathBuf), EngineError> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("THREATFORGE_CONFIG").ok())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        let config = ThreatForgeConfig::from_file(&path)?;
        Ok((config, path))
    } else {
        let mut config = ThreatForgeConfig::default();
        config.apply_env_overrides();
        Ok((config, path))
    }
}

/// Install the tracing subscriber on stderr, leaving stdout for the
/// snapshot JSON. `RUST_LOG` takes precedence over the configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    }
}

/// Scenario entities stand on a line in declaration order; distance is
/// measured from the first one.
fn lineup(entities: &[ComposedEntity]) -> Vec<NearbyEntity> {
    entities
        .iter()
        .enumerate()
        .map(|(position, entity)| NearbyEntity {
            id: entity.id(),
            role: entity.role(),
            domain: entity.domain().clone(),
            intensity: entity.intensity(),
            distance: position as f64,
        })
        .collect()
}
