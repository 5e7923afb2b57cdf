//! Built-in component types
//!
//! Each type mirrors the payload authoring tools write for it. Every field
//! is optional in the payload and falls back to the authoring default.

pub mod collider;
pub mod mesh_renderer;
pub mod rigid_body;
pub mod transform;

pub use collider::{ColliderComponent, ColliderSize};
pub use mesh_renderer::MeshRendererComponent;
pub use rigid_body::RigidBodyComponent;
pub use transform::TransformComponent;

use super::registry::ComponentRegistry;

/// Register every built-in component type
pub fn register_builtin(registry: &mut ComponentRegistry) {
    registry.register_component::<TransformComponent>();
    registry.register_component::<RigidBodyComponent>();
    registry.register_component::<ColliderComponent>();
    registry.register_component::<MeshRendererComponent>();
}
