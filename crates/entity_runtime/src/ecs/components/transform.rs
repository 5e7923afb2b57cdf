//! Transform component
//!
//! Authored as `{ position, rotation, scale }`. Rotation is either three
//! Euler angles in degrees or a quaternion `[x, y, z, w]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ecs::component::{Component, ComponentCapabilities};
use crate::foundation::math::{rotation_from_authored, Mat4, Transform, Vec3};

/// Authored local transform of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformComponent {
    /// Local position
    pub position: [f32; 3],
    /// Euler degrees (3 values) or quaternion `[x, y, z, w]` (4 values)
    pub rotation: Vec<f32>,
    /// Local scale
    pub scale: [f32; 3],
}

impl Component for TransformComponent {
    const KIND: &'static str = "Transform";

    fn capabilities() -> ComponentCapabilities {
        ComponentCapabilities::AFFECTS_TRANSFORM
            | ComponentCapabilities::AFFECTS_RENDERING
            | ComponentCapabilities::STABLE
    }
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: vec![0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl TransformComponent {
    /// Create from position only
    pub fn from_position(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Set the Euler rotation in degrees
    pub fn with_rotation_degrees(mut self, degrees: [f32; 3]) -> Self {
        self.rotation = degrees.to_vec();
        self
    }

    /// Set the scale
    pub fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a math transform, converting the authored rotation
    pub fn to_transform(&self) -> Transform {
        Transform {
            position: Vec3::from(self.position),
            rotation: rotation_from_authored(&self.rotation),
            scale: Vec3::from(self.scale),
        }
    }

    /// Local transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        self.to_transform().to_matrix()
    }

    /// Encode back into a component payload
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "position": self.position,
            "rotation": self.rotation,
            "scale": self.scale,
        })
    }
}
