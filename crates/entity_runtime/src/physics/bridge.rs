//! Physics bridge
//!
//! Keeps the simulation in step with the scene. The scene manager calls
//! into the bridge during a commit: after an entity is created (with its
//! final component set), before it is dropped from the store, and when its
//! physics-relevant state changes. The bridge owns the mapping from entity
//! to simulated body and is the only code that creates or removes bodies.

use std::collections::HashMap;

use super::backend::{BodyHandle, ColliderHandle, PhysicsBackend, Pose};
use super::builder::{ColliderBuilder, RigidBodyBuilder};
use super::components::RigidBodyType;
use crate::core::config::PhysicsConfig;
use crate::ecs::components::{ColliderComponent, RigidBodyComponent, TransformComponent};
use crate::ecs::{Component, ComponentRegistry, EntityId};
use crate::foundation::math::{Transform, Vec3};
use crate::scene::Entity;

/// Scale difference that forces a body rebuild
const SCALE_TOLERANCE: f32 = 1e-5;

/// Simulation objects owned on behalf of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsHandle {
    /// The body
    pub body: BodyHandle,
    /// Colliders attached to the body
    pub colliders: Vec<ColliderHandle>,
    /// Body type at registration
    pub body_type: RigidBodyType,
    /// Entity scale at registration, baked into the collider sizes
    pub scale: Vec3,
}

/// Bridge between entity lifecycle and the physics simulation
pub struct PhysicsBridge {
    backend: Box<dyn PhysicsBackend>,
    handles: HashMap<EntityId, PhysicsHandle>,
    enabled: bool,
    fixed_timestep: f32,
    max_substeps: u32,
    accumulator: f32,
}

impl PhysicsBridge {
    /// Create a bridge over the default simulation backend
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self::new(super::default_backend(config), config)
    }

    /// Create a bridge over any backend
    pub fn new(backend: Box<dyn PhysicsBackend>, config: &PhysicsConfig) -> Self {
        Self {
            backend,
            handles: HashMap::new(),
            enabled: config.enabled,
            fixed_timestep: config.fixed_timestep.max(f32::EPSILON),
            max_substeps: config.max_substeps.max(1),
            accumulator: 0.0,
        }
    }

    /// Register the entity's body and collider, posed by its own Transform
    ///
    /// Suitable for root entities; see [`PhysicsBridge::on_entity_created_at`].
    pub fn on_entity_created(&mut self, entity: &Entity, registry: &ComponentRegistry) -> bool {
        let transform = authored_transform(entity, registry);
        self.on_entity_created_at(entity, registry, &transform)
    }

    /// Register the entity's body and collider at a world transform
    ///
    /// Returns whether a body now exists for the entity. Components that
    /// are disabled or fail to decode are treated as absent. A collider
    /// without a rigid body gets an implicit fixed body.
    pub fn on_entity_created_at(&mut self, entity: &Entity, registry: &ComponentRegistry, world: &Transform) -> bool {
        if !self.enabled || !entity.is_active() {
            return false;
        }

        let id = entity.id();
        let body = decode_enabled::<RigidBodyComponent>(entity, registry, |body| body.enabled);
        let collider = decode_enabled::<ColliderComponent>(entity, registry, |collider| collider.enabled);
        if body.is_none() && collider.is_none() {
            return false;
        }

        if self.handles.contains_key(&id) {
            log::debug!("Entity {id} already has a body, replacing it");
            self.on_entity_destroyed(id);
        }

        let body_desc = body
            .as_ref()
            .map_or_else(RigidBodyBuilder::fixed, RigidBodyBuilder::from_component)
            .pose(Pose::new(world.position, world.rotation))
            .build();
        let body_type = body_desc.body_type;
        let body_handle = self.backend.insert_body(body_desc);

        let mut colliders = Vec::new();
        if let Some(collider) = &collider {
            let mut builder = ColliderBuilder::from_component(collider).scale(world.scale);
            if collider.physics_material.is_none() {
                if let Some(material) = body.as_ref().and_then(|body| body.material) {
                    builder = builder.material(material);
                }
            }
            match self.backend.insert_collider(builder.build(), body_handle) {
                Ok(handle) => colliders.push(handle),
                Err(err) => log::warn!("Failed to attach collider to entity {id}: {err}"),
            }
        }

        log::debug!(
            "Registered {body_type:?} body for entity {id} ('{}') with {} collider(s)",
            entity.name(),
            colliders.len()
        );
        self.handles.insert(
            id,
            PhysicsHandle {
                body: body_handle,
                colliders,
                body_type,
                scale: world.scale,
            },
        );
        true
    }

    /// Remove the entity's body and colliders; no-op if it has none
    pub fn on_entity_destroyed(&mut self, id: EntityId) -> bool {
        let Some(handle) = self.handles.remove(&id) else {
            return false;
        };
        if !self.backend.remove_body(handle.body) {
            log::warn!("Body for entity {id} was already gone from the simulation");
        }
        log::trace!("Removed body for entity {id}");
        true
    }

    /// Rebuild the entity's body from its current components
    pub fn resync(&mut self, entity: &Entity, registry: &ComponentRegistry, world: &Transform) -> bool {
        self.on_entity_destroyed(entity.id());
        self.on_entity_created_at(entity, registry, world)
    }

    /// Move the entity's body to a new world transform
    ///
    /// Position and rotation teleport the body. A scale change rebuilds it,
    /// since scale is baked into collider sizes.
    pub fn on_transform_changed(&mut self, entity: &Entity, registry: &ComponentRegistry, world: &Transform) -> bool {
        let Some((body, registered_scale)) = self.handles.get(&entity.id()).map(|handle| (handle.body, handle.scale))
        else {
            return false;
        };

        if (world.scale - registered_scale).norm() > SCALE_TOLERANCE {
            return self.resync(entity, registry, world);
        }
        match self.backend.set_body_pose(body, Pose::new(world.position, world.rotation)) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Failed to move body for entity {}: {err}", entity.id());
                false
            }
        }
    }

    /// Advance the simulation in fixed steps, returning how many were taken
    pub fn step(&mut self, dt: f32) -> u32 {
        if !self.enabled {
            return 0;
        }
        self.accumulator += dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.fixed_timestep && steps < self.max_substeps {
            self.backend.step(self.fixed_timestep);
            self.accumulator -= self.fixed_timestep;
            steps += 1;
        }
        if self.accumulator >= self.fixed_timestep {
            log::debug!("Physics fell behind, dropping {:.3}s of simulation time", self.accumulator);
            self.accumulator = 0.0;
        }
        steps
    }

    /// Handle for an entity
    pub fn handle(&self, id: EntityId) -> Option<&PhysicsHandle> {
        self.handles.get(&id)
    }

    /// Current pose of an entity's body
    pub fn body_pose(&self, id: EntityId) -> Option<Pose> {
        self.handles
            .get(&id)
            .and_then(|handle| self.backend.body_pose(handle.body))
    }

    /// Poses of every body that can move, with the scale it was registered at
    pub fn movable_poses(&self) -> impl Iterator<Item = (EntityId, Pose, Vec3)> + '_ {
        self.handles
            .iter()
            .filter(|(_, handle)| handle.body_type.is_movable())
            .filter_map(|(&id, handle)| {
                self.backend
                    .body_pose(handle.body)
                    .map(|pose| (id, pose, handle.scale))
            })
    }

    /// Number of entities with a body
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Number of bodies in the simulation
    pub fn body_count(&self) -> usize {
        self.backend.body_count()
    }

    /// Number of colliders in the simulation
    pub fn collider_count(&self) -> usize {
        self.backend.collider_count()
    }

    /// Whether bodies are registered at all
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The simulation backend
    pub fn backend(&self) -> &dyn PhysicsBackend {
        self.backend.as_ref()
    }
}

impl std::fmt::Debug for PhysicsBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsBridge")
            .field("handles", &self.handles.len())
            .field("bodies", &self.backend.body_count())
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// The entity's own Transform, identity if absent or malformed
fn authored_transform(entity: &Entity, registry: &ComponentRegistry) -> Transform {
    match entity.decode::<TransformComponent>(registry) {
        Some(Ok(transform)) => transform.to_transform(),
        Some(Err(err)) => {
            log::warn!("Entity {} has an invalid Transform ({err}), placing body at origin", entity.id());
            Transform::default()
        }
        None => Transform::default(),
    }
}

fn decode_enabled<T: Component>(
    entity: &Entity,
    registry: &ComponentRegistry,
    is_enabled: impl Fn(&T) -> bool,
) -> Option<T> {
    match entity.decode::<T>(registry)? {
        Ok(component) if is_enabled(&component) => Some(component),
        Ok(_) => {
            log::trace!("{} on entity {} is disabled", T::KIND, entity.id());
            None
        }
        Err(err) => {
            log::warn!("Ignoring {} on entity {}: {err}", T::KIND, entity.id());
            None
        }
    }
}
