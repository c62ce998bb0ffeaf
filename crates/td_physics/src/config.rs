//! Configuration system
//!
//! Tuning knobs for the simulation, loadable from TOML or RON files. The
//! defaults reproduce the constants the engine was tuned with; games override
//! them per-map rather than recompiling.

pub use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Tuning parameters for [`PhysicsWorld`](crate::physics::PhysicsWorld)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravitational acceleration applied to bodies with gravity enabled
    pub gravity: Vec3,

    /// Upper bound on a single step's delta, in seconds
    ///
    /// Frame stalls would otherwise integrate a huge delta in one step and
    /// tunnel bodies through each other; oversized deltas are clamped
    /// silently.
    pub max_timestep: f32,

    /// Edge length of a broad-phase grid cell
    ///
    /// Tune near the typical collider size: oversized cells inflate
    /// candidate sets, undersized cells make large bodies span many cells.
    pub cell_size: f32,

    /// Maximum broad-phase candidates examined per body per step
    ///
    /// Bounds worst-case narrow-phase cost under dense clustering at the
    /// price of missing some contacts that frame. Approximate physics is an
    /// intentional trade for stable frame times.
    pub max_contacts_per_body: usize,

    /// Slack factor on the squared-distance broad-phase pre-filter
    ///
    /// Pairs whose center distance squared exceeds
    /// `(radius_a + radius_b)^2 * broad_phase_slack` skip the exact test.
    pub broad_phase_slack: f32,

    /// Velocity-proportional drag applied to airborne bodies
    pub air_resistance: f32,

    /// Speed below which a ground bounce snaps to zero, in units/s
    ///
    /// Stops infinite micro-bouncing once the rebound is imperceptible.
    pub rest_threshold: f32,

    /// Fraction of penetration depth corrected positionally per contact
    ///
    /// Counters sinking from repeated shallow contacts without injecting
    /// visible jitter.
    pub position_correction: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            max_timestep: 0.1,
            cell_size: 4.0,
            max_contacts_per_body: 10,
            broad_phase_slack: 1.5,
            air_resistance: 0.1,
            rest_threshold: 0.1,
            position_correction: 0.2,
        }
    }
}

impl Config for PhysicsConfig {}
