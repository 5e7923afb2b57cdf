//! # Entity Runtime
//!
//! A mutable scene runtime: entities with opaque component payloads, a
//! transform hierarchy, and physics bodies that follow the scene.
//!
//! ## Features
//!
//! - **Deferred Commands**: Any thread queues changes; one commit applies them
//! - **Entity Builder**: Fluent creation with ids known before the commit
//! - **Scene Graph**: Cached world transforms with dirty propagation
//! - **Physics Bridge**: Bodies created, rebuilt and removed with their entities
//! - **Component Registry**: Typed decoding of raw component payloads
//! - **Scene Documents**: JSON save and load with stable persistent ids
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use entity_runtime::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RuntimeConfig::default();
//!     let manager = SceneManager::empty(&config);
//!
//!     let crate_id = manager
//!         .create_entity()
//!         .with_name("Crate")
//!         .with_position([0.0, 5.0, 0.0])
//!         .with_rigid_body(&RigidBodyComponent::default())
//!         .with_collider(&ColliderComponent::default())
//!         .build();
//!
//!     manager.apply_pending_commands();
//!     manager.step_physics(1.0 / 60.0);
//!     println!("{:?}", manager.world_transform(crate_id)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod ecs;
pub mod foundation;
pub mod physics;
pub mod scene;

/// Common imports for runtime users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::config::{LoggingConfig, PhysicsConfig, RuntimeConfig, SceneConfig},
        ecs::{
            components::{ColliderComponent, MeshRendererComponent, RigidBodyComponent, TransformComponent},
            CommandSender, Component, ComponentRegistry, EntityBuilder, EntityId,
        },
        foundation::math::{Mat4, Quat, Transform, Vec3},
        physics::{PhysicsBackend, PhysicsWorld, Pose},
        scene::{
            CommitReport, Entity, LifecycleHook, RenderableInstance, Scene, SceneDocument, SceneManager,
            SceneManagerError,
        },
    };
}
