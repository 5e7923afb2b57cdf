//! Physics simulation boundary
//!
//! The bridge only needs body and collider creation, removal, pose access
//! and stepping. Anything implementing [`PhysicsBackend`] can sit behind it.

use crate::foundation::math::{Mat4, Quat, Transform, Vec3};

use super::components::{PhysicsMaterial, RigidBodyType};

slotmap::new_key_type! {
    /// Handle to a simulated rigid body
    pub struct BodyHandle;

    /// Handle to a collider attached to a body
    pub struct ColliderHandle;
}

/// Physics errors
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsError {
    /// The body handle does not refer to a live body
    #[error("unknown rigid body handle {0:?}")]
    UnknownBody(BodyHandle),
}

/// Position and orientation of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// World position
    pub position: Vec3,
    /// World orientation
    pub rotation: Quat,
}

impl Pose {
    /// Pose from position and rotation
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pose at the origin with no rotation
    pub fn identity() -> Self {
        Self::new(Vec3::zeros(), Quat::identity())
    }

    /// World matrix of a body carrying an entity with `scale`
    pub fn to_matrix_with_scale(&self, scale: Vec3) -> Mat4 {
        Transform {
            position: self.position,
            rotation: self.rotation,
            scale,
        }
        .to_matrix()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Everything needed to create a rigid body
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyDesc {
    /// Body type
    pub body_type: RigidBodyType,
    /// Initial pose
    pub pose: Pose,
    /// Mass; zero for non-dynamic bodies
    pub mass: f32,
    /// Gravity multiplier
    pub gravity_scale: f32,
    /// Whether the body may sleep
    pub can_sleep: bool,
    /// Initial linear velocity
    pub linear_velocity: Vec3,
}

/// Simulation shape, already scaled to world size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    /// Box with half extents
    Cuboid {
        /// Half extents along each axis
        half_extents: Vec3,
    },
    /// Sphere
    Ball {
        /// Radius
        radius: f32,
    },
    /// Capsule along the local Y axis
    CapsuleY {
        /// Half height of the cylindrical part
        half_height: f32,
        /// Cap radius
        radius: f32,
    },
}

/// Everything needed to create a collider
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderDesc {
    /// Shape
    pub shape: ColliderShape,
    /// Offset from the body origin in body space
    pub offset: Vec3,
    /// Surface material
    pub material: PhysicsMaterial,
    /// Sensors detect overlaps without generating contacts
    pub sensor: bool,
}

/// The subset of a physics engine the bridge talks to
pub trait PhysicsBackend: Send {
    /// Add a body
    fn insert_body(&mut self, desc: RigidBodyDesc) -> BodyHandle;

    /// Attach a collider to a body
    fn insert_collider(&mut self, desc: ColliderDesc, body: BodyHandle) -> Result<ColliderHandle, PhysicsError>;

    /// Remove a body and every collider attached to it; false if it was already gone
    fn remove_body(&mut self, body: BodyHandle) -> bool;

    /// Current pose of a body
    fn body_pose(&self, body: BodyHandle) -> Option<Pose>;

    /// Teleport a body
    fn set_body_pose(&mut self, body: BodyHandle, pose: Pose) -> Result<(), PhysicsError>;

    /// Type of a body
    fn body_type(&self, body: BodyHandle) -> Option<RigidBodyType>;

    /// Number of live bodies
    fn body_count(&self) -> usize;

    /// Number of live colliders
    fn collider_count(&self) -> usize;

    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32);
}
