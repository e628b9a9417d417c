//! TOML configuration for a game session.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tile_defence_core::WorldConfig;

/// Default simulation frequency in ticks per second.
pub const DEFAULT_TICK_HZ: u32 = 60;

/// Settings of a single game session.
///
/// Every field is optional in the TOML document; missing fields keep their
/// default value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Simulation frequency in ticks per second.
    pub tick_hz: u32,
    /// Seed of the wave size draw.
    pub seed: u64,
    /// Directory searched for maps given by name.
    pub map_dir: PathBuf,
    /// Runs ticks back to back instead of pacing them in real time.
    pub headless: bool,
    /// Stops the loop after this many ticks.
    pub max_ticks: Option<u64>,
    /// Requests the next wave automatically whenever none is running.
    pub auto_wave: bool,
    /// Rules of the simulated world.
    pub world: WorldConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            seed: 0,
            map_dir: PathBuf::from("maps"),
            headless: false,
            max_ticks: None,
            auto_wave: false,
            world: WorldConfig::default(),
        }
    }
}

/// Error raised while loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {}", path.display())]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The document is not valid TOML for a configuration.
    #[error("failed to parse configuration")]
    Parse(#[from] toml::de::Error),
    /// The tick frequency is zero.
    #[error("tick_hz must be positive")]
    ZeroTickRate,
    /// The tile size is not a positive finite number.
    #[error("world.tile_size must be positive, got {0}")]
    TileSize(f64),
    /// The wave size bounds are reversed.
    #[error("world.spawn_min ({min}) exceeds world.spawn_max ({max})")]
    SpawnBounds {
        /// Configured lower bound.
        min: u32,
        /// Configured upper bound.
        max: u32,
    },
}

impl GameConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks the values serde cannot constrain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        let tile_size = self.world.tile_size;
        if !(tile_size.is_finite() && tile_size > 0.0) {
            return Err(ConfigError::TileSize(tile_size));
        }
        if self.world.spawn_min > self.world.spawn_max {
            return Err(ConfigError::SpawnBounds {
                min: self.world.spawn_min,
                max: self.world.spawn_max,
            });
        }
        Ok(())
    }

    /// Simulated time covered by one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }

    /// Resolves a map argument, falling back to the map directory when the
    /// argument does not name an existing file.
    #[must_use]
    pub fn resolve_map_path(&self, map: &Path) -> PathBuf {
        if map.exists() || map.is_absolute() {
            return map.to_path_buf();
        }
        let in_map_dir = self.map_dir.join(map);
        if in_map_dir.exists() {
            in_map_dir
        } else {
            map.to_path_buf()
        }
    }
}
