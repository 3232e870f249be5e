//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup and the
//! simulation run so `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: threatforge_core::config::ConfigError,
    },

    /// Registering the starter catalog failed.
    #[error("registry error: {source}")]
    Registry {
        /// The underlying registry error.
        #[from]
        source: threatforge_core::RegistryError,
    },

    /// A scenario entity could not be composed.
    #[error("composition of {entity:?} failed: {source}")]
    Composition {
        /// Name of the entity in the scenario.
        entity: String,
        /// The underlying composition error.
        source: threatforge_core::CompositionError,
    },

    /// Serializing the final snapshots failed.
    #[error("snapshot serialization failed: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
