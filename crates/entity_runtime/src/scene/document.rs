//! Persisted scene document
//!
//! A self-contained JSON form of a [`Scene`]: metadata, entity records with
//! their raw component payloads, and auxiliary material definitions.
//! Hierarchy is stored by persistent id, so a document can be produced and
//! loaded without a scene graph or physics world.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::store::{Entity, Scene, SceneError, SceneMetadata};
use crate::ecs::EntityId;

/// Current document layout version
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;

/// Errors reading or writing scene documents
#[derive(thiserror::Error, Debug)]
pub enum DocumentError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON or unexpected layout
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two records share a persistent id
    #[error("duplicate persistent id '{0}'")]
    DuplicatePersistentId(String),

    /// The store rejected a record
    #[error(transparent)]
    Store(#[from] SceneError),
}

/// Serialized scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    /// Layout version of this document
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// Scene metadata
    #[serde(default)]
    pub metadata: SceneMetadata,
    /// Entity records in scene order
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
    /// Material definitions, carried through untouched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Value>,
}

/// Serialized entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    /// Persistent id; the entity id is derived from it on load
    pub persistent_id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Persistent id of the parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_persistent_id: Option<String>,
    /// Active flag
    #[serde(default = "default_active")]
    pub active: bool,
    /// Component payloads keyed by type name, including unknown types
    #[serde(default)]
    pub components: BTreeMap<String, Value>,
}

const fn default_format_version() -> u32 {
    DOCUMENT_FORMAT_VERSION
}

const fn default_active() -> bool {
    true
}

impl SceneDocument {
    /// Parse a document from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        let document: Self = serde_json::from_str(json)?;
        if document.format_version > DOCUMENT_FORMAT_VERSION {
            log::warn!(
                "Scene document format {} is newer than supported format {}",
                document.format_version,
                DOCUMENT_FORMAT_VERSION
            );
        }
        Ok(document)
    }

    /// Render the document as pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Write the document to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

impl Scene {
    /// Export the scene as a document
    pub fn to_document(&self) -> SceneDocument {
        let entities = self
            .entities()
            .map(|entity| EntityRecord {
                persistent_id: entity.persistent_id().to_string(),
                name: entity.name().to_string(),
                parent_persistent_id: entity
                    .parent()
                    .and_then(|parent| self.get(parent))
                    .map(|parent| parent.persistent_id().to_string()),
                active: entity.is_active(),
                components: entity
                    .components()
                    .iter()
                    .map(|(kind, payload)| (kind.clone(), payload.clone()))
                    .collect(),
            })
            .collect();

        SceneDocument {
            format_version: DOCUMENT_FORMAT_VERSION,
            metadata: self.metadata.clone(),
            entities,
            materials: self.materials.clone(),
        }
    }

    /// Build a scene from a document
    ///
    /// Records may reference parents that appear later in the list. A
    /// reference to a missing parent loads the entity as a root. Cycles are
    /// not checked here; building a scene graph over the result rejects them.
    pub fn from_document(document: SceneDocument) -> Result<Self, DocumentError> {
        let mut scene = Self::with_metadata(document.metadata, document.materials);

        let mut links = Vec::new();
        for record in document.entities {
            let mut entity = Entity::new(record.persistent_id.clone(), record.name).with_active(record.active);
            for (kind, payload) in record.components {
                entity = entity.with_component(kind, payload);
            }
            let id = entity.id();
            match scene.insert(entity) {
                Ok(()) => {}
                Err(SceneError::DuplicateEntity(_)) => {
                    return Err(DocumentError::DuplicatePersistentId(record.persistent_id));
                }
                Err(err) => return Err(err.into()),
            }
            if let Some(parent) = record.parent_persistent_id {
                links.push((id, record.persistent_id, parent));
            }
        }

        for (child, persistent_id, parent_persistent_id) in links {
            let parent = EntityId::from_persistent_id(&parent_persistent_id);
            if scene.contains(parent) {
                scene.link_unchecked(child, parent)?;
            } else {
                log::warn!("Entity '{persistent_id}' references missing parent '{parent_persistent_id}', loading as root");
            }
        }

        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_export_import_preserves_hierarchy_and_unknown_components() {
        let mut scene = Scene::new("Level 1");
        scene.materials.push(json!({ "id": "steel", "color": [0.5, 0.5, 0.5] }));
        let root = Entity::new("root", "Root").with_component("Transform", json!({ "position": [1.0, 0.0, 0.0] }));
        let root_id = root.id();
        scene.insert(root).unwrap();
        let child = Entity::new("child", "Child")
            .with_parent(Some(root_id))
            .with_component("ParticleEmitter", json!({ "rate": 40 }))
            .with_active(false);
        let child_id = child.id();
        scene.insert(child).unwrap();

        let json = scene.to_document().to_json_string().unwrap();
        let restored = Scene::from_document(SceneDocument::from_json_str(&json).unwrap()).unwrap();

        assert_eq!(restored.metadata, scene.metadata);
        assert_eq!(restored.materials, scene.materials);
        let restored_child = restored.get(child_id).unwrap();
        assert_eq!(restored_child.parent(), Some(root_id));
        assert!(!restored_child.is_active());
        assert_eq!(restored_child.component("ParticleEmitter"), Some(&json!({ "rate": 40 })));
        assert_eq!(restored.get(root_id).unwrap().children(), &[child_id]);
    }

    #[test]
    fn test_parent_declared_after_child() {
        let document = SceneDocument::from_json_str(
            r#"{
                "metadata": { "name": "Out of order" },
                "entities": [
                    { "persistentId": "wheel", "parentPersistentId": "car" },
                    { "persistentId": "car", "name": "Car" }
                ]
            }"#,
        )
        .unwrap();

        let scene = Scene::from_document(document).unwrap();
        let wheel = scene.get(EntityId::from_persistent_id("wheel")).unwrap();
        assert_eq!(wheel.parent(), Some(EntityId::from_persistent_id("car")));
        assert!(wheel.is_active());
    }

    #[test]
    fn test_dangling_parent_loads_as_root() {
        let document = SceneDocument::from_json_str(
            r#"{ "entities": [ { "persistentId": "lost", "parentPersistentId": "nowhere" } ] }"#,
        )
        .unwrap();

        let scene = Scene::from_document(document).unwrap();
        assert_eq!(scene.roots().count(), 1);
    }

    #[test]
    fn test_duplicate_persistent_id_rejected() {
        let document = SceneDocument::from_json_str(
            r#"{ "entities": [ { "persistentId": "twin" }, { "persistentId": "twin" } ] }"#,
        )
        .unwrap();

        let err = Scene::from_document(document).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicatePersistentId(id) if id == "twin"));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("entity_runtime_scene_{}.json", std::process::id()));
        let mut scene = Scene::new("Saved");
        scene.insert(Entity::new("only", "Only")).unwrap();

        scene.to_document().save(&path).unwrap();
        let loaded = SceneDocument::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.entities.len(), 1);
        assert_eq!(loaded.metadata.name, "Saved");
    }
}
