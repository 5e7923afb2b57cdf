//! Physics vocabulary shared by components, builders and the simulation

use serde::{Deserialize, Serialize};

/// Default friction coefficient
pub const DEFAULT_FRICTION: f32 = 0.7;
/// Default restitution (bounciness)
pub const DEFAULT_RESTITUTION: f32 = 0.3;
/// Default collider density
pub const DEFAULT_DENSITY: f32 = 1.0;
/// Smallest mass a dynamic body may have
pub const MIN_MASS: f32 = 0.0001;
/// Smallest collider half extent / radius
pub const MIN_EXTENT: f32 = 0.001;

/// How a body participates in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RigidBodyType {
    /// Moved by forces and gravity
    Dynamic,
    /// Moved only by explicit pose updates
    Kinematic,
    /// Never moves
    Fixed,
}

impl RigidBodyType {
    /// Parse an authored body type; unknown names fall back to dynamic
    pub fn from_authored(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "dynamic" => Self::Dynamic,
            "kinematic" => Self::Kinematic,
            "static" | "fixed" => Self::Fixed,
            other => {
                log::warn!("Unknown rigid body type '{other}', using dynamic");
                Self::Dynamic
            }
        }
    }

    /// Whether the simulation moves bodies of this type on its own
    pub const fn is_dynamic(self) -> bool {
        matches!(self, Self::Dynamic)
    }

    /// Whether bodies of this type can ever change pose
    pub const fn is_movable(self) -> bool {
        !matches!(self, Self::Fixed)
    }
}

/// Authored collider shape family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColliderType {
    /// Axis-aligned box in body space
    Box,
    /// Sphere
    Sphere,
    /// Y-aligned capsule
    Capsule,
    /// Convex hull (approximated by a box)
    Convex,
    /// Triangle mesh (approximated by a box)
    Mesh,
    /// Heightfield (approximated by a box)
    Heightfield,
}

impl ColliderType {
    /// Parse an authored collider type; unknown names fall back to box
    pub fn from_authored(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "box" | "cuboid" => Self::Box,
            "sphere" | "ball" => Self::Sphere,
            "capsule" => Self::Capsule,
            "convex" => Self::Convex,
            "mesh" | "trimesh" => Self::Mesh,
            "heightfield" => Self::Heightfield,
            other => {
                log::warn!("Unknown collider type '{other}', using box");
                Self::Box
            }
        }
    }
}

/// Surface properties of a collider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsMaterial {
    /// Friction coefficient
    pub friction: f32,
    /// Restitution (bounciness)
    pub restitution: f32,
    /// Density used to derive collider mass
    pub density: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            friction: DEFAULT_FRICTION,
            restitution: DEFAULT_RESTITUTION,
            density: DEFAULT_DENSITY,
        }
    }
}
