//! Mesh renderer component

use serde::{Deserialize, Serialize};

use crate::ecs::component::{to_payload, Component, ComponentCapabilities};

/// Which mesh and material to draw for an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshRendererComponent {
    /// Disabled renderers produce no renderable instance
    pub enabled: bool,
    /// Mesh asset reference
    pub mesh_id: Option<String>,
    /// Material asset reference
    pub material_id: Option<String>,
    /// Whether the mesh casts shadows
    pub cast_shadows: bool,
    /// Whether the mesh receives shadows
    pub receive_shadows: bool,
}

impl Component for MeshRendererComponent {
    const KIND: &'static str = "MeshRenderer";

    fn capabilities() -> ComponentCapabilities {
        ComponentCapabilities::AFFECTS_RENDERING | ComponentCapabilities::STABLE
    }
}

impl Default for MeshRendererComponent {
    fn default() -> Self {
        Self {
            enabled: true,
            mesh_id: None,
            material_id: None,
            cast_shadows: true,
            receive_shadows: true,
        }
    }
}

impl MeshRendererComponent {
    /// Renderer for a mesh with the default material
    pub fn new(mesh_id: impl Into<String>) -> Self {
        Self {
            mesh_id: Some(mesh_id.into()),
            ..Default::default()
        }
    }

    /// Set the material reference
    pub fn with_material(mut self, material_id: impl Into<String>) -> Self {
        self.material_id = Some(material_id.into());
        self
    }

    /// Encode into a component payload
    pub fn to_payload(&self) -> serde_json::Value {
        to_payload(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_fields() {
        let renderer: MeshRendererComponent = serde_json::from_value(json!({
            "meshId": "cube",
            "materialId": "steel",
            "castShadows": false
        }))
        .unwrap();

        assert_eq!(renderer.mesh_id.as_deref(), Some("cube"));
        assert_eq!(renderer.material_id.as_deref(), Some("steel"));
        assert!(!renderer.cast_shadows);
        assert!(renderer.receive_shadows);
        assert!(renderer.enabled);
    }

    #[test]
    fn test_builder_payload_round_trip() {
        let renderer = MeshRendererComponent::new("sphere").with_material("glass");
        let decoded: MeshRendererComponent = serde_json::from_value(renderer.to_payload()).unwrap();
        assert_eq!(decoded, renderer);
    }
}
