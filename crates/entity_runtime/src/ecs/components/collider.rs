//! Collider component
//!
//! Sizes are authored in the entity's unscaled space. The entity scale is
//! applied later, once, when the simulation shape is built.

use serde::{Deserialize, Serialize};

use crate::ecs::component::{Component, ComponentCapabilities};
use crate::physics::components::{ColliderType, PhysicsMaterial};

/// Authored collider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColliderComponent {
    /// Disabled colliders are ignored by the physics bridge
    pub enabled: bool,
    /// `box`, `sphere`, `capsule`, `convex`, `mesh` or `heightfield`
    #[serde(alias = "type")]
    pub collider_type: String,
    /// Sensor colliders report overlaps but have no mass
    pub is_trigger: bool,
    /// Offset from the body origin
    pub center: [f32; 3],
    /// Shape dimensions
    pub size: ColliderSize,
    /// Surface material
    #[serde(alias = "material")]
    pub physics_material: Option<PhysicsMaterial>,
}

/// Authored collider dimensions; each shape reads the fields it needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColliderSize {
    /// Box extent along X
    pub width: f32,
    /// Box extent along Y
    pub height: f32,
    /// Box extent along Z
    pub depth: f32,
    /// Sphere radius
    pub radius: f32,
    /// Capsule radius
    pub capsule_radius: f32,
    /// Capsule total height including caps
    pub capsule_height: f32,
}

impl Default for ColliderSize {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
            radius: 0.5,
            capsule_radius: 0.5,
            capsule_height: 2.0,
        }
    }
}

impl Component for ColliderComponent {
    const KIND: &'static str = "MeshCollider";
    const ALIASES: &'static [&'static str] = &["Collider"];

    fn capabilities() -> ComponentCapabilities {
        ComponentCapabilities::REQUIRES_PHYSICS | ComponentCapabilities::STABLE
    }
}

impl Default for ColliderComponent {
    fn default() -> Self {
        Self {
            enabled: true,
            collider_type: "box".to_string(),
            is_trigger: false,
            center: [0.0; 3],
            size: ColliderSize::default(),
            physics_material: None,
        }
    }
}

impl ColliderComponent {
    /// Parsed collider type
    pub fn kind(&self) -> ColliderType {
        ColliderType::from_authored(&self.collider_type)
    }
}
