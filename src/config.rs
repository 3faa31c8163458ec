//! Configuration.
//!
//! Layered runtime configuration: compiled defaults, an optional TOML
//! file, then `PLINTH_*` environment overrides. World tuning values
//! (tolerances, batch size, radii, TTL) live here so deployments can
//! adjust them without a rebuild; the engine reads them once at startup.

use crate::geometry::Tolerances;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlinthConfig {
    #[serde(default)]
    pub world: WorldConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PlinthConfig {
    /// Load configuration: defaults, then the TOML file (if given or if
    /// `plinth.toml` exists in the working directory), then `PLINTH_*`
    /// environment variables (`PLINTH_WORLD__BATCH_SIZE=5` style).
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        match file {
            Some(path) => {
                builder = builder.add_source(File::from(path.to_path_buf()));
            }
            None => {
                builder = builder.add_source(File::with_name("plinth").required(false));
            }
        }
        let config: PlinthConfig = builder
            .add_source(Environment::with_prefix("PLINTH").separator("__"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

/// Physical and economic tuning for the build engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Maximum vertical gap treated as touching a support surface.
    #[serde(default = "default_snap_tolerance")]
    pub snap_tolerance: f32,

    /// Interpenetration depth beyond which two boxes overlap.
    #[serde(default = "default_overlap_tolerance")]
    pub overlap_tolerance: f32,

    /// Pieces attempted per `advance` call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum horizontal distance from the plan anchor at which an actor
    /// may continue building.
    #[serde(default = "default_site_radius")]
    pub site_radius: f32,

    /// Radius of the primitive-store snapshot handed to the validator.
    #[serde(default = "default_validation_radius")]
    pub validation_radius: f32,

    /// Plans untouched for longer than this are treated as abandoned.
    #[serde(default = "default_plan_ttl_secs")]
    pub plan_ttl_secs: u64,

    /// Credits debited per placed piece.
    #[serde(default = "default_piece_cost")]
    pub piece_cost: u64,
}

fn default_snap_tolerance() -> f32 {
    0.5
}

fn default_overlap_tolerance() -> f32 {
    0.05
}

fn default_batch_size() -> usize {
    5
}

fn default_site_radius() -> f32 {
    24.0
}

fn default_validation_radius() -> f32 {
    48.0
}

fn default_plan_ttl_secs() -> u64 {
    6 * 60 * 60
}

fn default_piece_cost() -> u64 {
    1
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: default_snap_tolerance(),
            overlap_tolerance: default_overlap_tolerance(),
            batch_size: default_batch_size(),
            site_radius: default_site_radius(),
            validation_radius: default_validation_radius(),
            plan_ttl_secs: default_plan_ttl_secs(),
            piece_cost: default_piece_cost(),
        }
    }
}

impl WorldConfig {
    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            snap: self.snap_tolerance,
            overlap: self.overlap_tolerance,
        }
    }

    pub fn plan_ttl_ms(&self) -> u64 {
        self.plan_ttl_secs * 1000
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snap_tolerance <= 0.0 {
            return Err(ConfigError::Invalid(
                "snap_tolerance must be positive".to_string(),
            ));
        }
        if self.overlap_tolerance < 0.0 {
            return Err(ConfigError::Invalid(
                "overlap_tolerance cannot be negative".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.site_radius <= 0.0 || self.validation_radius <= 0.0 {
            return Err(ConfigError::Invalid(
                "site_radius and validation_radius must be positive".to_string(),
            ));
        }
        if self.validation_radius < self.site_radius {
            return Err(ConfigError::Invalid(
                "validation_radius must cover at least the site radius".to_string(),
            ));
        }
        Ok(())
    }
}

/// Storage paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database directory. Plans and primitives live in separate
    /// trees of the same database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Optional directory of template TOML files. When unset, the
    /// compiled-in template set is used.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

fn default_db_path() -> PathBuf {
    // Prefer the XDG data directory; fall back to a dot-directory in the
    // working directory when the platform gives us nothing.
    directories::ProjectDirs::from("", "", "plinth")
        .map(|dirs| dirs.data_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from(".plinth/db"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            templates_dir: None,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path cannot be empty".to_string()));
        }
        Ok(())
    }
}
