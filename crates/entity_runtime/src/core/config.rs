//! # Unified Configuration System
//!
//! All configuration structures for the runtime live here so they can be
//! discovered, loaded and saved as one document.
//!
//! ## Configuration Categories
//!
//! - **Scene Config**: scene naming and commit diagnostics
//! - **Physics Config**: gravity, fixed timestep and substep cap
//! - **Logging Config**: default log filter

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::foundation::math::Vec3;

/// Standard gravity applied along -Y
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default fixed simulation timestep (60 Hz)
pub const DEFAULT_TIMESTEP: f32 = 1.0 / 60.0;

/// # Runtime Configuration
///
/// Top-level configuration, loadable from `.toml` or `.ron` through [`Config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Scene manager settings
    pub scene: SceneConfig,
    /// Physics bridge and simulation settings
    pub physics: PhysicsConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config for RuntimeConfig {}

/// # Scene Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Name given to newly created scenes
    pub name: String,
    /// Log skipped commands at `warn` instead of `debug`
    pub warn_on_skipped_commands: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            name: "Untitled Scene".to_string(),
            warn_on_skipped_commands: true,
        }
    }
}

/// # Physics Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Register bodies for physics components at all
    pub enabled: bool,
    /// Gravity vector in world space
    pub gravity: [f32; 3],
    /// Fixed simulation step in seconds
    pub fixed_timestep: f32,
    /// Upper bound on simulation steps per `step_physics` call
    pub max_substeps: u32,
}

impl PhysicsConfig {
    /// Gravity as a vector
    pub fn gravity_vector(&self) -> Vec3 {
        Vec3::from(self.gravity)
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gravity: DEFAULT_GRAVITY,
            fixed_timestep: DEFAULT_TIMESTEP,
            max_substeps: 4,
        }
    }
}

/// # Logging Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter directives, e.g. `info,entity_runtime::physics=debug`
    pub filter: String,
    /// Prefix log lines with timestamps
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            timestamps: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_physics_config() {
        let config = PhysicsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.gravity, [0.0, -9.81, 0.0]);
        assert!((config.fixed_timestep - 1.0 / 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RuntimeConfig = toml::from_str(
            r#"
            [physics]
            gravity = [0.0, -1.62, 0.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.physics.gravity, [0.0, -1.62, 0.0]);
        assert_eq!(config.physics.max_substeps, 4);
        assert_eq!(config.scene, SceneConfig::default());
    }

    #[test]
    fn test_save_and_load_ron() {
        let path = std::env::temp_dir().join(format!("entity_runtime_config_{}.ron", std::process::id()));
        let mut config = RuntimeConfig::default();
        config.scene.name = "Arena".to_string();
        config.logging.filter = "debug".to_string();

        config.save_to_file(&path).unwrap();
        let loaded = RuntimeConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = RuntimeConfig::load_from_file("settings.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_)) | Err(ConfigError::UnsupportedFormat(_))));

        let saved = RuntimeConfig::default().save_to_file(std::env::temp_dir().join("runtime.yaml"));
        assert!(matches!(saved, Err(ConfigError::UnsupportedFormat(_))));
    }
}
