//! Scene store
//!
//! Owns every entity record: identity, name, hierarchy links and the raw
//! component payloads. The store validates identity and hierarchy on every
//! mutation but knows nothing about transforms or physics; those are
//! derived by the scene graph and the physics bridge.

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ecs::{Component, ComponentRegistry, DecodeError, EntityId};

/// Errors raised by store mutations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The target entity does not exist
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),

    /// An entity with this id already exists
    #[error("entity {0} already exists")]
    DuplicateEntity(EntityId),

    /// The requested parent does not exist
    #[error("parent {parent} of entity {entity} does not exist")]
    UnknownParent {
        /// Entity being parented
        entity: EntityId,
        /// Missing parent
        parent: EntityId,
    },

    /// The requested parent is the entity itself or one of its descendants
    #[error("parenting {entity} under {parent} would create a cycle")]
    CycleDetected {
        /// Entity being parented
        entity: EntityId,
        /// Rejected parent
        parent: EntityId,
    },
}

/// Broad class of a [`SceneError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Operation on an id that does not (or already does) exist
    Identity,
    /// Operation that would break the hierarchy
    Topology,
}

impl SceneError {
    /// Classify the error
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownEntity(_) | Self::DuplicateEntity(_) | Self::UnknownParent { .. } => ErrorCategory::Identity,
            Self::CycleDetected { .. } => ErrorCategory::Topology,
        }
    }
}

/// Scene-wide metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneMetadata {
    /// Scene name
    pub name: String,
    /// Content revision, bumped by tools on save
    pub version: u32,
    /// Creation or last-save time in seconds since the Unix epoch
    pub timestamp: u64,
}

impl SceneMetadata {
    /// Metadata stamped with the current time
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            timestamp: unix_timestamp(),
        }
    }
}

impl Default for SceneMetadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: 1,
            timestamp: 0,
        }
    }
}

/// Seconds since the Unix epoch, or 0 if the clock is before it
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// An entity record owned by the [`Scene`]
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    persistent_id: String,
    name: String,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    components: HashMap<String, Value>,
    active: bool,
}

impl Entity {
    /// New root entity; the id is derived from `persistent_id`
    pub fn new(persistent_id: impl Into<String>, name: impl Into<String>) -> Self {
        let persistent_id = persistent_id.into();
        Self {
            id: EntityId::from_persistent_id(&persistent_id),
            persistent_id,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            components: HashMap::new(),
            active: true,
        }
    }

    /// New root entity with an id allocated ahead of time
    ///
    /// Used when replaying queued creations, whose ids were handed out
    /// before the entity existed.
    pub fn with_id(id: EntityId, persistent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            ..Self::new(persistent_id, name)
        }
    }

    /// Set the parent
    pub fn with_parent(mut self, parent: Option<EntityId>) -> Self {
        self.parent = parent;
        self
    }

    /// Attach a component payload
    pub fn with_component(mut self, kind: impl Into<String>, payload: Value) -> Self {
        self.components.insert(kind.into(), payload);
        self
    }

    /// Set the active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Stable id
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Persistent string id the id was derived from
    pub fn persistent_id(&self) -> &str {
        &self.persistent_id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent id, `None` for roots
    pub const fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Children in attach order
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Every component payload, keyed by type name
    pub const fn components(&self) -> &HashMap<String, Value> {
        &self.components
    }

    /// Payload for one component type
    pub fn component(&self, kind: &str) -> Option<&Value> {
        self.components.get(kind)
    }

    /// Whether a component type is present
    pub fn has_component(&self, kind: &str) -> bool {
        self.components.contains_key(kind)
    }

    /// Whether the entity takes part in rendering and physics
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Decode a typed component, looking under its type name and aliases.
    ///
    /// Returns `None` when the entity has no payload for the type.
    pub fn decode<T: Component>(&self, registry: &ComponentRegistry) -> Option<Result<T, DecodeError>> {
        std::iter::once(T::KIND)
            .chain(T::ALIASES.iter().copied())
            .find_map(|kind| self.components.get(kind).map(|payload| (kind, payload)))
            .map(|(kind, payload)| registry.decode_kind_as::<T>(kind, payload))
    }
}

/// The set of all entities plus scene metadata
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Scene metadata
    pub metadata: SceneMetadata,
    /// Material definitions carried through untouched
    pub materials: Vec<Value>,
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
}

impl Scene {
    /// Create an empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: SceneMetadata::new(name),
            ..Default::default()
        }
    }

    /// Create an empty scene carrying existing metadata and materials
    pub fn with_metadata(metadata: SceneMetadata, materials: Vec<Value>) -> Self {
        Self {
            metadata,
            materials,
            ..Default::default()
        }
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the scene has no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether an entity exists
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Look up an entity
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).map(|&slot| &self.entities[slot])
    }

    fn get_mut(&mut self, id: EntityId) -> Result<&mut Entity, SceneError> {
        let slot = *self.index.get(&id).ok_or(SceneError::UnknownEntity(id))?;
        Ok(&mut self.entities[slot])
    }

    /// Every entity in insertion order
    pub fn entities(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    /// Entities without a parent
    pub fn roots(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|entity| entity.parent.is_none())
    }

    /// Entities carrying a component type
    pub fn entities_with_component<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.entities.iter().filter(move |entity| entity.has_component(kind))
    }

    /// Insert a new entity under its declared parent
    pub fn insert(&mut self, mut entity: Entity) -> Result<(), SceneError> {
        let id = entity.id;
        if self.contains(id) {
            return Err(SceneError::DuplicateEntity(id));
        }
        if let Some(parent) = entity.parent {
            if parent == id {
                return Err(SceneError::CycleDetected { entity: id, parent });
            }
            if !self.contains(parent) {
                return Err(SceneError::UnknownParent { entity: id, parent });
            }
        }

        entity.children.clear();
        let parent = entity.parent;
        self.index.insert(id, self.entities.len());
        self.entities.push(entity);
        if let Some(parent) = parent {
            self.get_mut(parent)?.children.push(id);
        }
        Ok(())
    }

    /// Ids of `id` and all of its descendants, children before parents
    pub fn subtree_ids(&self, id: EntityId) -> Result<Vec<EntityId>, SceneError> {
        if !self.contains(id) {
            return Err(SceneError::UnknownEntity(id));
        }

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        // (entity, children already pushed)
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.push((current, true));
            if let Some(entity) = self.get(current) {
                for &child in entity.children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        Ok(order)
    }

    /// Remove an entity and all of its descendants
    ///
    /// Returns the removed records, children before parents.
    pub fn remove_subtree(&mut self, id: EntityId) -> Result<Vec<Entity>, SceneError> {
        let ids = self.subtree_ids(id)?;
        if let Some(parent) = self.get(id).and_then(Entity::parent) {
            if let Ok(parent) = self.get_mut(parent) {
                parent.children.retain(|&child| child != id);
            }
        }

        let doomed: HashSet<EntityId> = ids.iter().copied().collect();
        let mut removed: HashMap<EntityId, Entity> = HashMap::with_capacity(ids.len());
        let mut kept = Vec::with_capacity(self.entities.len() - ids.len());
        for entity in self.entities.drain(..) {
            if doomed.contains(&entity.id) {
                removed.insert(entity.id, entity);
            } else {
                kept.push(entity);
            }
        }
        self.entities = kept;
        self.reindex();

        Ok(ids.iter().filter_map(|id| removed.remove(id)).collect())
    }

    /// Insert or replace a component payload, returning the previous one
    pub fn set_component(
        &mut self,
        id: EntityId,
        kind: impl Into<String>,
        payload: Value,
    ) -> Result<Option<Value>, SceneError> {
        Ok(self.get_mut(id)?.components.insert(kind.into(), payload))
    }

    /// Remove a component payload, returning it if it was present
    pub fn remove_component(&mut self, id: EntityId, kind: &str) -> Result<Option<Value>, SceneError> {
        Ok(self.get_mut(id)?.components.remove(kind))
    }

    /// Change the active flag, returning whether it changed
    pub fn set_active(&mut self, id: EntityId, active: bool) -> Result<bool, SceneError> {
        let entity = self.get_mut(id)?;
        let changed = entity.active != active;
        entity.active = active;
        Ok(changed)
    }

    /// Whether making `parent` the parent of `id` would close a loop
    pub fn would_create_cycle(&self, id: EntityId, parent: EntityId) -> bool {
        let mut current = Some(parent);
        // Bounded walk so a corrupted store cannot spin forever
        for _ in 0..=self.entities.len() {
            match current {
                Some(ancestor) if ancestor == id => return true,
                Some(ancestor) => current = self.get(ancestor).and_then(Entity::parent),
                None => return false,
            }
        }
        true
    }

    /// Reparent an entity, returning whether the parent changed
    ///
    /// On error nothing is modified.
    pub fn set_parent(&mut self, id: EntityId, parent: Option<EntityId>) -> Result<bool, SceneError> {
        let old_parent = self.get(id).ok_or(SceneError::UnknownEntity(id))?.parent;
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(SceneError::UnknownParent { entity: id, parent });
            }
            if self.would_create_cycle(id, parent) {
                return Err(SceneError::CycleDetected { entity: id, parent });
            }
        }
        if old_parent == parent {
            return Ok(false);
        }

        if let Some(old) = old_parent {
            if let Ok(old) = self.get_mut(old) {
                old.children.retain(|&child| child != id);
            }
        }
        if let Some(new) = parent {
            self.get_mut(new)?.children.push(id);
        }
        self.get_mut(id)?.parent = parent;
        Ok(true)
    }

    /// Link a child to a parent without validation.
    ///
    /// Used when loading documents, where records may reference parents
    /// that appear later; the scene graph rejects any resulting cycle.
    pub(crate) fn link_unchecked(&mut self, child: EntityId, parent: EntityId) -> Result<(), SceneError> {
        self.get_mut(child)?.parent = Some(parent);
        self.get_mut(parent)?.children.push(child);
        Ok(())
    }

    fn reindex(&mut self) {
        self.index = self
            .entities
            .iter()
            .enumerate()
            .map(|(slot, entity)| (entity.id, slot))
            .collect();
    }
}
