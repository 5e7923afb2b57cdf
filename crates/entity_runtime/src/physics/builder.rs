//! Rigid body and collider builders
//!
//! Turn authored component values into simulation descriptions. The
//! collider builder is the one place where authored size meets entity
//! scale.

use super::backend::{ColliderDesc, ColliderShape, Pose, RigidBodyDesc};
use super::components::{ColliderType, PhysicsMaterial, RigidBodyType, MIN_EXTENT, MIN_MASS};
use crate::ecs::components::{ColliderComponent, ColliderSize, RigidBodyComponent};
use crate::foundation::math::{Quat, Vec3};

/// Builder for [`RigidBodyDesc`]
#[derive(Debug, Clone)]
pub struct RigidBodyBuilder {
    body_type: RigidBodyType,
    pose: Pose,
    mass: f32,
    gravity_scale: f32,
    can_sleep: bool,
    linear_velocity: Vec3,
}

impl RigidBodyBuilder {
    /// Start a body of the given type at the origin
    pub fn new(body_type: RigidBodyType) -> Self {
        Self {
            body_type,
            pose: Pose::identity(),
            mass: 1.0,
            gravity_scale: 1.0,
            can_sleep: true,
            linear_velocity: Vec3::zeros(),
        }
    }

    /// Start a dynamic body
    pub fn dynamic() -> Self {
        Self::new(RigidBodyType::Dynamic)
    }

    /// Start a kinematic body
    pub fn kinematic() -> Self {
        Self::new(RigidBodyType::Kinematic)
    }

    /// Start a fixed body
    pub fn fixed() -> Self {
        Self::new(RigidBodyType::Fixed)
    }

    /// Start from an authored component
    pub fn from_component(component: &RigidBodyComponent) -> Self {
        Self::new(component.kind())
            .mass(component.mass)
            .gravity_scale(component.gravity_scale)
            .can_sleep(component.can_sleep)
    }

    /// Set the position
    pub fn position(mut self, position: Vec3) -> Self {
        self.pose.position = position;
        self
    }

    /// Set the rotation
    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.pose.rotation = rotation;
        self
    }

    /// Set the full pose
    pub fn pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    /// Set the mass; clamped to a small positive minimum
    pub fn mass(mut self, mass: f32) -> Self {
        self.mass = mass.max(MIN_MASS);
        self
    }

    /// Set the gravity multiplier
    pub fn gravity_scale(mut self, gravity_scale: f32) -> Self {
        self.gravity_scale = gravity_scale;
        self
    }

    /// Allow or forbid sleeping
    pub fn can_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    /// Set the initial linear velocity
    pub fn linear_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    /// Finish the description; mass only applies to dynamic bodies
    pub fn build(self) -> RigidBodyDesc {
        RigidBodyDesc {
            body_type: self.body_type,
            pose: self.pose,
            mass: if self.body_type.is_dynamic() { self.mass } else { 0.0 },
            gravity_scale: self.gravity_scale,
            can_sleep: self.can_sleep,
            linear_velocity: self.linear_velocity,
        }
    }
}

/// Builder for [`ColliderDesc`]
#[derive(Debug, Clone)]
pub struct ColliderBuilder {
    collider_type: ColliderType,
    size: ColliderSize,
    center: Vec3,
    scale: Vec3,
    material: PhysicsMaterial,
    sensor: bool,
}

impl ColliderBuilder {
    /// Start a collider of the given type with default size
    pub fn new(collider_type: ColliderType) -> Self {
        Self {
            collider_type,
            size: ColliderSize::default(),
            center: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            material: PhysicsMaterial::default(),
            sensor: false,
        }
    }

    /// Start from an authored component
    pub fn from_component(component: &ColliderComponent) -> Self {
        Self::new(component.kind())
            .size(component.size)
            .center(Vec3::from(component.center))
            .material(component.physics_material.unwrap_or_default())
            .sensor(component.is_trigger)
    }

    /// Set the authored (unscaled) size
    pub fn size(mut self, size: ColliderSize) -> Self {
        self.size = size;
        self
    }

    /// Set the authored (unscaled) offset from the body origin
    pub fn center(mut self, center: Vec3) -> Self {
        self.center = center;
        self
    }

    /// Set the entity scale applied to size and offset
    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale.abs();
        self
    }

    /// Set the surface material
    pub fn material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    /// Make the collider a sensor
    pub fn sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    /// Finish the description, scaling the authored size exactly once
    pub fn build(self) -> ColliderDesc {
        let size = self.size;
        let scale = self.scale;
        let shape = match self.collider_type {
            ColliderType::Sphere => ColliderShape::Ball {
                radius: (size.radius * scale.max()).max(MIN_EXTENT),
            },
            ColliderType::Capsule => {
                let radius = (size.capsule_radius * scale.x.max(scale.z)).max(MIN_EXTENT);
                let half_height = (size.capsule_height * scale.y * 0.5 - radius).max(0.0);
                ColliderShape::CapsuleY { half_height, radius }
            }
            other => {
                if other != ColliderType::Box {
                    log::debug!("{other:?} collider approximated by a box");
                }
                let extents = Vec3::new(size.width, size.height, size.depth).component_mul(&scale) * 0.5;
                ColliderShape::Cuboid {
                    half_extents: extents.map(|half| half.max(MIN_EXTENT)),
                }
            }
        };

        let mut material = self.material;
        if self.sensor {
            material.density = 0.0;
        }

        ColliderDesc {
            shape,
            offset: self.center.component_mul(&scale),
            material,
            sensor: self.sensor,
        }
    }
}
