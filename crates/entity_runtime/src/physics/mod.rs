//! Physics bridge and simulation boundary
//!
//! Translates declarative RigidBody / MeshCollider components into bodies
//! and colliders in a physics simulation, and keeps both in step with the
//! entity lifecycle.
//!
//! With the `rapier` feature the default simulation is [`RapierWorld`];
//! otherwise it is the built-in [`PhysicsWorld`] integrator.

pub mod backend;
pub mod bridge;
pub mod builder;
pub mod components;
#[cfg(feature = "rapier")]
pub mod rapier;
pub mod world;

pub use backend::{BodyHandle, ColliderDesc, ColliderHandle, ColliderShape, PhysicsBackend, PhysicsError, Pose, RigidBodyDesc};
pub use bridge::{PhysicsBridge, PhysicsHandle};
pub use builder::{ColliderBuilder, RigidBodyBuilder};
pub use components::{ColliderType, PhysicsMaterial, RigidBodyType};
#[cfg(feature = "rapier")]
pub use rapier::RapierWorld;
pub use world::PhysicsWorld;

use crate::core::config::PhysicsConfig;

/// The simulation backend used when none is supplied
#[cfg(feature = "rapier")]
pub fn default_backend(config: &PhysicsConfig) -> Box<dyn PhysicsBackend> {
    Box::new(RapierWorld::from_config(config))
}

/// The simulation backend used when none is supplied
#[cfg(not(feature = "rapier"))]
pub fn default_backend(config: &PhysicsConfig) -> Box<dyn PhysicsBackend> {
    Box::new(PhysicsWorld::from_config(config))
}
