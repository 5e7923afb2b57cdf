//! Built-in simulation world
//!
//! A small integrator that is enough to drive the bridge: dynamic bodies
//! fall under scaled gravity, kinematic bodies move by their velocity and
//! fixed bodies never move. Contacts are not resolved.

use slotmap::SlotMap;

use super::backend::{BodyHandle, ColliderDesc, ColliderHandle, PhysicsBackend, PhysicsError, Pose, RigidBodyDesc};
use super::components::RigidBodyType;
use crate::core::config::{PhysicsConfig, DEFAULT_GRAVITY};
use crate::foundation::math::Vec3;

#[derive(Debug, Clone)]
struct SimBody {
    desc: RigidBodyDesc,
    linear_velocity: Vec3,
    colliders: Vec<ColliderHandle>,
}

#[derive(Debug, Clone)]
struct SimCollider {
    desc: ColliderDesc,
    body: BodyHandle,
}

/// Simulation world with slotmap-backed bodies and colliders
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    gravity: Vec3,
    bodies: SlotMap<BodyHandle, SimBody>,
    colliders: SlotMap<ColliderHandle, SimCollider>,
}

impl PhysicsWorld {
    /// Create an empty world
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            bodies: SlotMap::with_key(),
            colliders: SlotMap::with_key(),
        }
    }

    /// Create an empty world from configuration
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self::new(config.gravity_vector())
    }

    /// World gravity
    pub const fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Change world gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Body description as created, with its current pose
    pub fn body(&self, body: BodyHandle) -> Option<&RigidBodyDesc> {
        self.bodies.get(body).map(|sim| &sim.desc)
    }

    /// Colliders attached to a body
    pub fn body_colliders(&self, body: BodyHandle) -> &[ColliderHandle] {
        self.bodies
            .get(body)
            .map(|sim| sim.colliders.as_slice())
            .unwrap_or_default()
    }

    /// Collider description
    pub fn collider(&self, collider: ColliderHandle) -> Option<&ColliderDesc> {
        self.colliders.get(collider).map(|sim| &sim.desc)
    }

    /// Body a collider is attached to
    pub fn collider_parent(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        self.colliders.get(collider).map(|sim| sim.body)
    }

    /// Current linear velocity
    pub fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.bodies.get(body).map(|sim| sim.linear_velocity)
    }

    /// Set the linear velocity of a body
    pub fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> Result<(), PhysicsError> {
        let sim = self.bodies.get_mut(body).ok_or(PhysicsError::UnknownBody(body))?;
        sim.linear_velocity = velocity;
        Ok(())
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(Vec3::from(DEFAULT_GRAVITY))
    }
}

impl PhysicsBackend for PhysicsWorld {
    fn insert_body(&mut self, desc: RigidBodyDesc) -> BodyHandle {
        let linear_velocity = desc.linear_velocity;
        self.bodies.insert(SimBody {
            desc,
            linear_velocity,
            colliders: Vec::new(),
        })
    }

    fn insert_collider(&mut self, desc: ColliderDesc, body: BodyHandle) -> Result<ColliderHandle, PhysicsError> {
        if !self.bodies.contains_key(body) {
            return Err(PhysicsError::UnknownBody(body));
        }
        let handle = self.colliders.insert(SimCollider { desc, body });
        if let Some(sim) = self.bodies.get_mut(body) {
            sim.colliders.push(handle);
        }
        Ok(handle)
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        let Some(sim) = self.bodies.remove(body) else {
            return false;
        };
        for collider in sim.colliders {
            self.colliders.remove(collider);
        }
        true
    }

    fn body_pose(&self, body: BodyHandle) -> Option<Pose> {
        self.bodies.get(body).map(|sim| sim.desc.pose)
    }

    fn set_body_pose(&mut self, body: BodyHandle, pose: Pose) -> Result<(), PhysicsError> {
        let sim = self.bodies.get_mut(body).ok_or(PhysicsError::UnknownBody(body))?;
        sim.desc.pose = pose;
        Ok(())
    }

    fn body_type(&self, body: BodyHandle) -> Option<RigidBodyType> {
        self.bodies.get(body).map(|sim| sim.desc.body_type)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    fn step(&mut self, dt: f32) {
        for sim in self.bodies.values_mut() {
            match sim.desc.body_type {
                RigidBodyType::Fixed => continue,
                RigidBodyType::Dynamic => {
                    sim.linear_velocity += self.gravity * sim.desc.gravity_scale * dt;
                }
                RigidBodyType::Kinematic => {}
            }
            sim.desc.pose.position += sim.linear_velocity * dt;
        }
    }
}
