//! Rigid body component

use serde::{Deserialize, Serialize};

use crate::ecs::component::{Component, ComponentCapabilities};
use crate::physics::components::{PhysicsMaterial, RigidBodyType};

/// Authored rigid body settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RigidBodyComponent {
    /// Disabled bodies are ignored by the physics bridge
    pub enabled: bool,
    /// `dynamic`, `kinematic`, `static` or `fixed`
    #[serde(alias = "type")]
    pub body_type: String,
    /// Body mass, only used for dynamic bodies
    pub mass: f32,
    /// Multiplier applied to world gravity
    pub gravity_scale: f32,
    /// Whether the body may be put to sleep
    pub can_sleep: bool,
    /// Surface material used when the collider has none
    pub material: Option<PhysicsMaterial>,
}

impl Component for RigidBodyComponent {
    const KIND: &'static str = "RigidBody";

    fn capabilities() -> ComponentCapabilities {
        ComponentCapabilities::REQUIRES_PHYSICS | ComponentCapabilities::STABLE
    }
}

impl Default for RigidBodyComponent {
    fn default() -> Self {
        Self {
            enabled: true,
            body_type: "dynamic".to_string(),
            mass: 1.0,
            gravity_scale: 1.0,
            can_sleep: true,
            material: None,
        }
    }
}

impl RigidBodyComponent {
    /// Parsed body type
    pub fn kind(&self) -> RigidBodyType {
        RigidBodyType::from_authored(&self.body_type)
    }
}
