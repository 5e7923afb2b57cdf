//! Core runtime configuration
//!
//! Groups the configuration structures for every subsystem of the runtime.

pub mod config;

pub use config::{LoggingConfig, PhysicsConfig, RuntimeConfig, SceneConfig};
