//! Scene management system
//!
//! Holds the live scene and everything derived from it. Following Game
//! Engine Architecture Chapter 11.2.7 - Scene Graphs.
//!
//! ## Architecture
//!
//! ```text
//! Callers (any thread)
//!      ↓  EntityCommand
//! Command Buffer
//!      ↓  apply_pending_commands
//! Scene Store ──→ Scene Graph ──→ renderables
//!      └────────→ Physics Bridge
//! ```
//!
//! The Scene Manager:
//! - Replays queued commands against the store in one batch
//! - Rebuilds or dirties the scene graph to match
//! - Creates, rebuilds and removes physics bodies
//! - Notifies lifecycle hooks exactly once per entity

mod document;
mod scene_graph;
mod scene_manager;
mod store;

#[cfg(test)]
mod tests;

pub use document::{DocumentError, EntityRecord, SceneDocument, DOCUMENT_FORMAT_VERSION};
pub use scene_graph::{local_matrix, GraphError, RenderableInstance, Renderables, SceneGraph};
pub use scene_manager::{
    CommitReport, LifecycleHook, ManagerPhase, SceneManager, SceneManagerError, SkippedCommand,
};
pub use store::{unix_timestamp, Entity, ErrorCategory, Scene, SceneError, SceneMetadata};
