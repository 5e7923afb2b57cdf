//! Rapier-backed simulation
//!
//! Bodies and colliders live in rapier's sets; this module only maps the
//! bridge's handles onto rapier's and converts descriptions. Contacts,
//! sleeping and CCD are rapier's business.

use nalgebra::{Isometry3, Translation3};
use rapier3d::prelude::{
    BroadPhase, CCDSolver, ColliderBuilder, ColliderHandle as RapierColliderHandle, ColliderSet, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline, RigidBodyBuilder,
    RigidBodyHandle, RigidBodySet, RigidBodyType as RapierBodyType,
};
use slotmap::SlotMap;

use super::backend::{
    BodyHandle, ColliderDesc, ColliderHandle, ColliderShape, PhysicsBackend, PhysicsError, Pose, RigidBodyDesc,
};
use super::components::RigidBodyType;
use crate::core::config::{PhysicsConfig, DEFAULT_GRAVITY, DEFAULT_TIMESTEP};
use crate::foundation::math::Vec3;

struct BodyEntry {
    body: RigidBodyHandle,
    body_type: RigidBodyType,
    colliders: Vec<ColliderHandle>,
}

/// Simulation world driving a rapier pipeline
pub struct RapierWorld {
    gravity: Vec3,
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    rapier_colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    bodies: SlotMap<BodyHandle, BodyEntry>,
    colliders: SlotMap<ColliderHandle, RapierColliderHandle>,
}

impl RapierWorld {
    /// Create an empty world
    pub fn new(gravity: Vec3) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = DEFAULT_TIMESTEP;

        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            rapier_colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            bodies: SlotMap::with_key(),
            colliders: SlotMap::with_key(),
        }
    }

    /// Create an empty world from configuration
    pub fn from_config(config: &PhysicsConfig) -> Self {
        let mut world = Self::new(config.gravity_vector());
        world.integration_parameters.dt = config.fixed_timestep;
        world
    }

    /// World gravity
    pub const fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Change world gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Current linear velocity
    pub fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        let entry = self.bodies.get(body)?;
        self.rigid_bodies.get(entry.body).map(|rigid_body| *rigid_body.linvel())
    }

    /// Number of bodies rapier has not put to sleep
    pub fn awake_body_count(&self) -> usize {
        self.rigid_bodies.iter().filter(|(_, body)| !body.is_sleeping()).count()
    }
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(Vec3::from(DEFAULT_GRAVITY))
    }
}

impl std::fmt::Debug for RapierWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapierWorld")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish_non_exhaustive()
    }
}

fn isometry(pose: Pose) -> Isometry3<f32> {
    Isometry3::from_parts(Translation3::from(pose.position), pose.rotation)
}

const fn rapier_body_type(body_type: RigidBodyType) -> RapierBodyType {
    match body_type {
        RigidBodyType::Dynamic => RapierBodyType::Dynamic,
        RigidBodyType::Kinematic => RapierBodyType::KinematicPositionBased,
        RigidBodyType::Fixed => RapierBodyType::Fixed,
    }
}

impl PhysicsBackend for RapierWorld {
    fn insert_body(&mut self, desc: RigidBodyDesc) -> BodyHandle {
        let mut builder = RigidBodyBuilder::new(rapier_body_type(desc.body_type))
            .position(isometry(desc.pose))
            .sleeping(false)
            .can_sleep(desc.can_sleep)
            .gravity_scale(desc.gravity_scale)
            .linvel(desc.linear_velocity);
        if desc.body_type.is_dynamic() {
            builder = builder.additional_mass(desc.mass);
        }

        let body = self.rigid_bodies.insert(builder.build());
        self.bodies.insert(BodyEntry {
            body,
            body_type: desc.body_type,
            colliders: Vec::new(),
        })
    }

    fn insert_collider(&mut self, desc: ColliderDesc, body: BodyHandle) -> Result<ColliderHandle, PhysicsError> {
        let entry = self.bodies.get_mut(body).ok_or(PhysicsError::UnknownBody(body))?;

        let builder = match desc.shape {
            ColliderShape::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            ColliderShape::Ball { radius } => ColliderBuilder::ball(radius),
            ColliderShape::CapsuleY { half_height, radius } => ColliderBuilder::capsule_y(half_height, radius),
        };
        // sensors carry no mass
        let density = if desc.sensor { 0.0 } else { desc.material.density };
        let collider = builder
            .translation(desc.offset)
            .friction(desc.material.friction)
            .restitution(desc.material.restitution)
            .density(density)
            .sensor(desc.sensor)
            .build();

        let inserted = self
            .rapier_colliders
            .insert_with_parent(collider, entry.body, &mut self.rigid_bodies);
        let handle = self.colliders.insert(inserted);
        entry.colliders.push(handle);
        Ok(handle)
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        let Some(entry) = self.bodies.remove(body) else {
            return false;
        };
        for collider in entry.colliders {
            self.colliders.remove(collider);
        }
        self.rigid_bodies.remove(
            entry.body,
            &mut self.islands,
            &mut self.rapier_colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        true
    }

    fn body_pose(&self, body: BodyHandle) -> Option<Pose> {
        let entry = self.bodies.get(body)?;
        let position = self.rigid_bodies.get(entry.body)?.position();
        Some(Pose::new(position.translation.vector, position.rotation))
    }

    fn set_body_pose(&mut self, body: BodyHandle, pose: Pose) -> Result<(), PhysicsError> {
        let rigid_body = self
            .bodies
            .get(body)
            .and_then(|entry| self.rigid_bodies.get_mut(entry.body))
            .ok_or(PhysicsError::UnknownBody(body))?;
        rigid_body.set_position(isometry(pose), true);
        Ok(())
    }

    fn body_type(&self, body: BodyHandle) -> Option<RigidBodyType> {
        self.bodies.get(body).map(|entry| entry.body_type)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.rapier_colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }
}
