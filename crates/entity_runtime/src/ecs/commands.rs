//! Deferred entity commands
//!
//! Callers never touch the scene directly. They append commands to an
//! [`EntityCommandBuffer`] and the scene manager replays the whole buffer,
//! in FIFO order, at its commit point. Appending only takes the buffer's
//! own lock, so any number of callers can queue work while the scene is
//! being read or committed.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::builder::EntityBuilder;
use super::entity::EntityId;

/// A queued mutation of the scene
#[derive(Debug, Clone, PartialEq)]
pub enum EntityCommand {
    /// Create a new entity
    CreateEntity {
        /// Pre-allocated id, derived from `persistent_id`
        id: EntityId,
        /// Persistent string id the entity id was derived from
        persistent_id: String,
        /// Display name
        name: String,
        /// Initial parent
        parent: Option<EntityId>,
        /// Initial components as `(type name, payload)` pairs
        components: Vec<(String, Value)>,
    },
    /// Destroy an entity and all of its descendants
    DestroyEntity {
        /// Target entity
        id: EntityId,
    },
    /// Insert or replace a component payload
    SetComponent {
        /// Target entity
        id: EntityId,
        /// Component type name
        kind: String,
        /// Opaque payload
        payload: Value,
    },
    /// Remove a component
    RemoveComponent {
        /// Target entity
        id: EntityId,
        /// Component type name
        kind: String,
    },
    /// Attach to a new parent, or detach to the root with `None`
    SetParent {
        /// Target entity
        id: EntityId,
        /// New parent
        parent: Option<EntityId>,
    },
    /// Toggle whether the entity participates in rendering and physics
    SetActive {
        /// Target entity
        id: EntityId,
        /// New active state
        active: bool,
    },
}

impl EntityCommand {
    /// Entity the command operates on
    pub const fn target(&self) -> EntityId {
        match self {
            Self::CreateEntity { id, .. }
            | Self::DestroyEntity { id }
            | Self::SetComponent { id, .. }
            | Self::RemoveComponent { id, .. }
            | Self::SetParent { id, .. }
            | Self::SetActive { id, .. } => *id,
        }
    }

    /// Short command name for diagnostics
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateEntity { .. } => "CreateEntity",
            Self::DestroyEntity { .. } => "DestroyEntity",
            Self::SetComponent { .. } => "SetComponent",
            Self::RemoveComponent { .. } => "RemoveComponent",
            Self::SetParent { .. } => "SetParent",
            Self::SetActive { .. } => "SetActive",
        }
    }
}

/// FIFO queue of pending commands
#[derive(Debug, Default)]
pub struct EntityCommandBuffer {
    commands: Mutex<Vec<EntityCommand>>,
}

impl EntityCommandBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command
    pub fn push(&self, command: EntityCommand) {
        self.commands.lock().push(command);
    }

    /// Take every queued command, leaving the buffer empty
    pub fn drain(&self) -> Vec<EntityCommand> {
        std::mem::take(&mut *self.commands.lock())
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.commands.lock().len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }

    /// Discard every queued command
    pub fn clear(&self) {
        self.commands.lock().clear();
    }
}

/// Cloneable handle for queuing commands from anywhere
///
/// This is the surface scripting and tooling layers talk to: every method
/// maps to exactly one queued command and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct CommandSender {
    buffer: Arc<EntityCommandBuffer>,
}

impl CommandSender {
    /// Create a sender with its own buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sender over an existing buffer
    pub fn from_buffer(buffer: Arc<EntityCommandBuffer>) -> Self {
        Self { buffer }
    }

    /// Underlying buffer
    pub fn buffer(&self) -> &EntityCommandBuffer {
        &self.buffer
    }

    /// Start building a new entity
    pub fn create_entity(&self) -> EntityBuilder<'_> {
        EntityBuilder::new(&self.buffer)
    }

    /// Queue creation of a bare named entity
    pub fn create(&self, name: impl Into<String>) -> EntityId {
        self.create_entity().with_name(name).build()
    }

    /// Queue destruction of an entity and its descendants
    pub fn destroy(&self, id: EntityId) {
        self.buffer.push(EntityCommand::DestroyEntity { id });
    }

    /// Queue a reparent; `None` detaches to the root
    pub fn set_parent(&self, id: EntityId, parent: Option<EntityId>) {
        self.buffer.push(EntityCommand::SetParent { id, parent });
    }

    /// Queue a component insert or replace
    pub fn set_component(&self, id: EntityId, kind: impl Into<String>, payload: Value) {
        self.buffer.push(EntityCommand::SetComponent {
            id,
            kind: kind.into(),
            payload,
        });
    }

    /// Queue a component removal
    pub fn remove_component(&self, id: EntityId, kind: impl Into<String>) {
        self.buffer.push(EntityCommand::RemoveComponent { id, kind: kind.into() });
    }

    /// Queue an active-state change
    pub fn set_active(&self, id: EntityId, active: bool) {
        self.buffer.push(EntityCommand::SetActive { id, active });
    }

    /// Number of commands waiting for the next commit
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
