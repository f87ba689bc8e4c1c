#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session bootstrap that turns configuration into a running coordinator.

use std::{
    fs,
    path::{Path, PathBuf},
};

use delve_core::{
    ConfigError, CoordinatorConfig, CostModel, Event, GenerationError, Terrain, WELCOME_BANNER,
};
use delve_system_generation::{GeneratorSettings, RoomsAndCorridors};
use delve_system_movement::{CoordinatorError, MoveCoordinator};
use delve_world::{GeneratedLevel, StaticLayout};
use serde::Deserialize;
use tracing::debug;

/// Everything needed to start a session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Seed of the first level; chosen by the caller when absent.
    pub seed: Option<u64>,
    /// Settings of the rooms-and-corridors generator.
    pub generator: GeneratorSettings,
    /// Movement, sight and pathfinding tunables.
    pub coordinator: CoordinatorConfig,
}

impl SessionConfig {
    /// Parses and validates a TOML session description.
    pub fn from_toml_str(contents: &str) -> Result<Self, BootstrapError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML session file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BootstrapError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| BootstrapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "session config loaded");
        Self::from_toml_str(&contents)
    }

    /// Checks invariants that deserialization cannot express.
    pub fn validate(&self) -> Result<(), BootstrapError> {
        self.coordinator.validate()?;
        self.generator.validate()?;
        Ok(())
    }

    /// Configured seed, or `fallback` when none was configured.
    #[must_use]
    pub fn seed_or(&self, fallback: u64) -> u64 {
        self.seed.unwrap_or(fallback)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let costs = CostModel::new()
            .with_override(Terrain::Grass, 2.0)
            .and_then(|costs| costs.with_override(Terrain::ShallowWater, 4.0))
            .unwrap_or_default();

        Self {
            seed: None,
            generator: GeneratorSettings::default(),
            coordinator: CoordinatorConfig {
                costs,
                ..CoordinatorConfig::default()
            },
        }
    }
}

/// Errors raised while preparing a session.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The configuration file could not be read.
    #[error("failed to read session config {}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid TOML for a session.
    #[error("failed to parse session config")]
    Parse(#[from] toml::de::Error),
    /// A configuration value is out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The generator settings cannot produce a level.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The coordinator could not be started.
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}

/// Builds coordinators and the data required to greet the player.
#[derive(Debug, Default)]
pub struct Bootstrap;

impl Bootstrap {
    /// Banner shown when a session starts.
    #[must_use]
    pub fn welcome_banner(&self) -> &'static str {
        WELCOME_BANNER
    }

    /// Starts a session on levels from the rooms-and-corridors generator.
    pub fn launch(
        &self,
        config: &SessionConfig,
        seed: u64,
        out_events: &mut Vec<Event>,
    ) -> Result<MoveCoordinator, BootstrapError> {
        let generator = RoomsAndCorridors::new(config.generator.clone())?;
        let coordinator = MoveCoordinator::new(
            config.coordinator.clone(),
            Box::new(generator),
            seed,
            out_events,
        )?;
        Ok(coordinator)
    }

    /// Starts a session on a fixed level; rebuilding restores that level.
    pub fn launch_with_level(
        &self,
        config: &SessionConfig,
        level: GeneratedLevel,
        seed: u64,
        out_events: &mut Vec<Event>,
    ) -> Result<MoveCoordinator, BootstrapError> {
        let coordinator = MoveCoordinator::new(
            config.coordinator.clone(),
            Box::new(StaticLayout::new(level)),
            seed,
            out_events,
        )?;
        Ok(coordinator)
    }
}
