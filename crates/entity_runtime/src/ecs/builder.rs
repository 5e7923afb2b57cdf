//! Fluent entity builder
//!
//! Accumulates an entity description and queues a single `CreateEntity`
//! command. The id is known as soon as [`EntityBuilder::build`] returns, so
//! it can be used as another builder's parent within the same batch.

use serde_json::Value;

use super::commands::{EntityCommand, EntityCommandBuffer};
use super::component::{to_payload, Component};
use super::components::{ColliderComponent, MeshRendererComponent, RigidBodyComponent, TransformComponent};
use super::entity::EntityId;

/// Name used when the builder is not given one
pub const DEFAULT_ENTITY_NAME: &str = "Entity";

/// Builder for a queued entity
#[must_use = "an entity is only queued when build() is called"]
pub struct EntityBuilder<'a> {
    commands: &'a EntityCommandBuffer,
    persistent_id: Option<String>,
    name: Option<String>,
    parent: Option<EntityId>,
    transform: Option<TransformComponent>,
    components: Vec<(String, Value)>,
}

impl<'a> EntityBuilder<'a> {
    /// Create a builder that queues into `commands`
    pub fn new(commands: &'a EntityCommandBuffer) -> Self {
        Self {
            commands,
            persistent_id: None,
            name: None,
            parent: None,
            transform: None,
            components: Vec::new(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the persistent string id the entity id is derived from
    pub fn with_persistent_id(mut self, persistent_id: impl Into<String>) -> Self {
        self.persistent_id = Some(persistent_id.into());
        self
    }

    /// Set the parent, or `None` for a root entity
    pub fn with_parent(mut self, parent: impl Into<Option<EntityId>>) -> Self {
        self.parent = parent.into();
        self
    }

    /// Set the local position
    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.transform_mut().position = position;
        self
    }

    /// Set the local rotation as Euler angles in degrees
    pub fn with_rotation(mut self, degrees: [f32; 3]) -> Self {
        self.transform_mut().rotation = degrees.to_vec();
        self
    }

    /// Set the local scale
    pub fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.transform_mut().scale = scale;
        self
    }

    /// Replace the whole local transform
    pub fn with_transform(mut self, transform: TransformComponent) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Attach a component payload; a later payload of the same type wins
    pub fn with_component(mut self, kind: impl Into<String>, payload: Value) -> Self {
        let kind = kind.into();
        if kind == TransformComponent::KIND {
            match serde_json::from_value::<TransformComponent>(payload.clone()) {
                Ok(transform) => {
                    self.transform = Some(transform);
                    return self;
                }
                Err(err) => {
                    log::warn!("Transform payload does not decode ({err}), storing it as given");
                    self.transform = None;
                }
            }
        }
        self.components.retain(|(existing, _)| *existing != kind);
        self.components.push((kind, payload));
        self
    }

    /// Attach a typed component
    pub fn with_typed<T: Component + serde::Serialize>(self, component: &T) -> Self {
        self.with_component(T::KIND, to_payload(component))
    }

    /// Attach a mesh renderer
    pub fn with_mesh_renderer(self, mesh_id: impl Into<String>, material_id: Option<String>) -> Self {
        let mut renderer = MeshRendererComponent::new(mesh_id);
        renderer.material_id = material_id;
        self.with_typed(&renderer)
    }

    /// Attach a rigid body
    pub fn with_rigid_body(self, body: &RigidBodyComponent) -> Self {
        self.with_typed(body)
    }

    /// Attach a collider
    pub fn with_collider(self, collider: &ColliderComponent) -> Self {
        self.with_typed(collider)
    }

    /// Queue the entity and return its id
    ///
    /// Nothing in the scene changes until the next commit.
    pub fn build(self) -> EntityId {
        let persistent_id = self
            .persistent_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let id = EntityId::from_persistent_id(&persistent_id);

        let mut components = self.components;
        if let Some(transform) = self.transform {
            components.push((TransformComponent::KIND.to_string(), transform.to_payload()));
        }

        self.commands.push(EntityCommand::CreateEntity {
            id,
            persistent_id,
            name: self.name.unwrap_or_else(|| DEFAULT_ENTITY_NAME.to_string()),
            parent: self.parent,
            components,
        });
        id
    }

    fn transform_mut(&mut self) -> &mut TransformComponent {
        self.transform.get_or_insert_with(TransformComponent::default)
    }
}
