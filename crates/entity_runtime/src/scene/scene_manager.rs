//! Scene Manager - owner of the live scene
//!
//! Following Game Engine Architecture Chapter 16.2 - Runtime Object Model
//! Architectures.
//!
//! The Scene Manager:
//! 1. Owns the scene store, the scene graph and the physics bridge
//! 2. Queues structural changes into a shared command buffer
//! 3. Applies the whole buffer at once in [`SceneManager::apply_pending_commands`]
//! 4. Keeps the graph and physics in step with every applied change
//!
//! Nothing queued is visible to readers until a commit. Readers and the
//! committer never overlap: both go through the same state lock, so a reader
//! sees the scene as it was before or after a whole batch.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, MutexGuard, RwLock};
use serde_json::Value;

use super::document::{DocumentError, SceneDocument};
use super::scene_graph::{local_matrix, GraphError, RenderableInstance, SceneGraph};
use super::store::{Entity, Scene, SceneError};
use crate::core::config::{RuntimeConfig, SceneConfig};
use crate::ecs::{CommandSender, ComponentRegistry, EntityBuilder, EntityCommand, EntityId};
use crate::foundation::math::{Mat4, Transform};
use crate::physics::{default_backend, PhysicsBackend, PhysicsBridge, Pose};

/// Errors constructing or persisting a managed scene
#[derive(thiserror::Error, Debug)]
pub enum SceneManagerError {
    /// The scene's hierarchy could not be turned into a graph
    #[error("Scene graph error: {0}")]
    Graph(#[from] GraphError),

    /// The scene document could not be read or written
    #[error("Scene document error: {0}")]
    Document(#[from] DocumentError),
}

/// Whether a commit is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerPhase {
    /// Accepting commands; readers see a stable scene
    Idle,
    /// Applying a batch
    Committing,
}

/// Observer of entity lifecycle events
///
/// Hooks run on the committing thread while the scene is locked. They may
/// queue further commands through a [`CommandSender`], which land in the
/// next batch, but must not commit or read through the manager.
pub trait LifecycleHook: Send + Sync {
    /// Called once for each entity created by a commit, after its
    /// components are final and its physics body exists
    fn on_entity_created(&self, _entity: &Entity, _scene: &Scene) {}

    /// Called once for each entity destroyed by a commit, before it is
    /// removed from the scene
    fn on_entity_destroyed(&self, _entity: &Entity, _scene: &Scene) {}
}

/// A queued command the commit could not apply
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCommand {
    /// The command as queued
    pub command: EntityCommand,
    /// Why it was rejected
    pub error: SceneError,
}

/// Outcome of one commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReport {
    /// Commands applied successfully
    pub applied: usize,
    /// Commands rejected, in queue order
    pub skipped: Vec<SkippedCommand>,
    /// Entities created and still alive at the end of the batch
    pub created: Vec<EntityId>,
    /// Entities removed, including descendants of destroyed entities
    pub destroyed: Vec<EntityId>,
    /// Whether the scene graph was rebuilt
    pub graph_rebuilt: bool,
}

impl CommitReport {
    /// Total commands drained from the buffer
    pub fn total(&self) -> usize {
        self.applied + self.skipped.len()
    }

    /// Whether every command applied
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Insertion-ordered set of entity ids touched by a batch
#[derive(Debug, Default)]
struct Touched {
    order: Vec<EntityId>,
    seen: HashSet<EntityId>,
}

impl Touched {
    fn insert(&mut self, id: EntityId) {
        if self.seen.insert(id) {
            self.order.push(id);
        }
    }

    fn remove(&mut self, id: EntityId) -> bool {
        if !self.seen.remove(&id) {
            return false;
        }
        self.order.retain(|&queued| queued != id);
        true
    }

    fn contains(&self, id: EntityId) -> bool {
        self.seen.contains(&id)
    }

    fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied()
    }
}

/// Side effects collected while replaying a batch
#[derive(Debug, Default)]
struct BatchChanges {
    created: Touched,
    physics: Touched,
    transforms: Touched,
    topology_changed: bool,
}

/// Everything guarded by the state lock
struct SceneState {
    scene: Scene,
    graph: SceneGraph,
    physics: PhysicsBridge,
}

impl SceneState {
    fn commit(
        &mut self,
        commands: Vec<EntityCommand>,
        registry: &ComponentRegistry,
        hooks: &[Arc<dyn LifecycleHook>],
        config: &SceneConfig,
    ) -> CommitReport {
        let mut report = CommitReport::default();
        let mut changes = BatchChanges::default();

        for command in commands {
            match self.apply(&command, registry, hooks, &mut changes, &mut report) {
                Ok(()) => report.applied += 1,
                Err(error) => {
                    if config.warn_on_skipped_commands {
                        log::warn!("Skipped {} for entity {}: {error}", command.name(), command.target());
                    } else {
                        log::debug!("Skipped {} for entity {}: {error}", command.name(), command.target());
                    }
                    report.skipped.push(SkippedCommand { command, error });
                }
            }
        }

        self.update_graph(registry, &changes, &mut report);
        self.update_physics(registry, hooks, &changes, &mut report);
        report
    }

    fn apply(
        &mut self,
        command: &EntityCommand,
        registry: &ComponentRegistry,
        hooks: &[Arc<dyn LifecycleHook>],
        changes: &mut BatchChanges,
        report: &mut CommitReport,
    ) -> Result<(), SceneError> {
        match command {
            EntityCommand::CreateEntity {
                id,
                persistent_id,
                name,
                parent,
                components,
            } => {
                let mut entity = Entity::with_id(*id, persistent_id.as_str(), name.as_str()).with_parent(*parent);
                for (kind, payload) in components {
                    entity = entity.with_component(kind.as_str(), payload.clone());
                }
                self.scene.insert(entity)?;
                changes.created.insert(*id);
                changes.topology_changed = true;
            }
            EntityCommand::DestroyEntity { id } => {
                let doomed = self.scene.subtree_ids(*id)?;
                for &victim in &doomed {
                    if changes.created.remove(victim) {
                        // never observed, so nothing to announce
                        continue;
                    }
                    self.physics.on_entity_destroyed(victim);
                    if let Some(entity) = self.scene.get(victim) {
                        for hook in hooks {
                            hook.on_entity_destroyed(entity, &self.scene);
                        }
                    }
                }
                self.scene.remove_subtree(*id)?;
                report.destroyed.extend(doomed);
                changes.topology_changed = true;
            }
            EntityCommand::SetComponent { id, kind, payload } => {
                self.scene.set_component(*id, kind.clone(), payload.clone())?;
                classify_component(registry, kind, *id, changes);
            }
            EntityCommand::RemoveComponent { id, kind } => {
                if self.scene.remove_component(*id, kind)?.is_some() {
                    classify_component(registry, kind, *id, changes);
                }
            }
            EntityCommand::SetParent { id, parent } => {
                if self.scene.set_parent(*id, *parent)? {
                    changes.topology_changed = true;
                }
            }
            EntityCommand::SetActive { id, active } => {
                if self.scene.set_active(*id, *active)? {
                    changes.physics.insert(*id);
                }
            }
        }
        Ok(())
    }

    fn update_graph(&mut self, registry: &ComponentRegistry, changes: &BatchChanges, report: &mut CommitReport) {
        if changes.topology_changed {
            match SceneGraph::build(&self.scene, registry) {
                Ok(graph) => {
                    self.graph = graph;
                    report.graph_rebuilt = true;
                    // a fresh graph holds authored poses; bodies may have moved since
                    self.sync_physics_to_graph(&changes.transforms);
                }
                Err(err) => log::error!("Scene graph rebuild failed, keeping previous graph: {err}"),
            }
            return;
        }

        for id in changes.transforms.iter() {
            let Some(entity) = self.scene.get(id) else {
                continue;
            };
            if let Err(err) = self.graph.update_local_transform(id, local_matrix(entity, registry)) {
                log::warn!("Transform update for entity {id} did not reach the scene graph: {err}");
            }
        }
    }

    fn update_physics(
        &mut self,
        registry: &ComponentRegistry,
        hooks: &[Arc<dyn LifecycleHook>],
        changes: &BatchChanges,
        report: &mut CommitReport,
    ) {
        for id in changes.created.iter() {
            let world = self.world_transform(id);
            let Some(entity) = self.scene.get(id) else {
                continue;
            };
            self.physics.on_entity_created_at(entity, registry, &world);
            for hook in hooks {
                hook.on_entity_created(entity, &self.scene);
            }
            report.created.push(id);
        }

        for id in changes.physics.iter().filter(|id| !changes.created.contains(*id)) {
            let world = self.world_transform(id);
            if let Some(entity) = self.scene.get(id) {
                self.physics.resync(entity, registry, &world);
            }
        }

        let moved = changes
            .transforms
            .iter()
            .filter(|id| !changes.created.contains(*id) && !changes.physics.contains(*id));
        for id in moved {
            let world = self.world_transform(id);
            if let Some(entity) = self.scene.get(id) {
                self.physics.on_transform_changed(entity, registry, &world);
            }
        }
    }

    fn world_transform(&mut self, id: EntityId) -> Transform {
        self.graph
            .get_world_transform(id)
            .map_or_else(|_| Transform::default(), |world| Transform::from_matrix(&world))
    }

    /// Write movable body poses back into the graph as local transforms
    ///
    /// Entities in `authored` keep the transform the graph already holds.
    fn sync_physics_to_graph(&mut self, authored: &Touched) {
        let poses: Vec<(EntityId, Pose, _)> = self
            .physics
            .movable_poses()
            .filter(|(id, _, _)| !authored.contains(*id))
            .collect();
        for (id, pose, scale) in poses {
            let world = pose.to_matrix_with_scale(scale);
            let Ok(parent_world) = self.graph.parent_world_transform(id) else {
                continue;
            };
            let local = match parent_world.try_inverse() {
                Some(inverse) => inverse * world,
                None => {
                    log::warn!("Parent of entity {id} has a singular transform, using body pose as local");
                    world
                }
            };
            if let Err(err) = self.graph.update_local_transform(id, local) {
                log::warn!("Physics pose for entity {id} did not reach the scene graph: {err}");
            }
        }
    }
}

/// Route a component change to the systems that care about its type
fn classify_component(registry: &ComponentRegistry, kind: &str, id: EntityId, changes: &mut BatchChanges) {
    let Some(capabilities) = registry.capabilities(kind) else {
        return;
    };
    if capabilities.requires_physics() {
        changes.physics.insert(id);
    }
    if capabilities.affects_transform() {
        changes.transforms.insert(id);
    }
}

/// Clears the committing thread when a commit ends, even by unwinding
struct CommitGuard<'a> {
    committer: &'a Mutex<Option<ThreadId>>,
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        *self.committer.lock() = None;
    }
}

/// Scene Manager - owns the live scene and applies queued commands
pub struct SceneManager {
    /// Scene behaviour settings
    config: SceneConfig,

    /// Component decoders shared with the graph and physics
    registry: Arc<ComponentRegistry>,

    /// Handle onto the shared command buffer
    commands: CommandSender,

    /// Store, graph and physics, updated together
    state: Mutex<SceneState>,

    /// Lifecycle observers
    hooks: RwLock<Vec<Arc<dyn LifecycleHook>>>,

    /// Thread currently committing, if any
    committer: Mutex<Option<ThreadId>>,
}

impl SceneManager {
    /// Manage `scene` with default settings
    pub fn new(scene: Scene) -> Result<Self, SceneManagerError> {
        Self::from_config(scene, &RuntimeConfig::default())
    }

    /// Manage `scene` with the built-in components and the default simulation
    pub fn from_config(scene: Scene, config: &RuntimeConfig) -> Result<Self, SceneManagerError> {
        Self::with_backend(
            scene,
            config,
            ComponentRegistry::with_builtin_components(),
            default_backend(&config.physics),
        )
    }

    /// Manage `scene` with a custom registry and physics backend
    ///
    /// Entities already in the scene get their bodies here, as if created
    /// by a commit, but lifecycle hooks are not called for them.
    pub fn with_backend(
        scene: Scene,
        config: &RuntimeConfig,
        registry: ComponentRegistry,
        backend: Box<dyn PhysicsBackend>,
    ) -> Result<Self, SceneManagerError> {
        let graph = SceneGraph::build(&scene, &registry)?;
        let mut state = SceneState {
            scene,
            graph,
            physics: PhysicsBridge::new(backend, &config.physics),
        };

        let ids: Vec<EntityId> = state.scene.entities().map(Entity::id).collect();
        let mut bodies = 0;
        for id in ids {
            let world = state.world_transform(id);
            if let Some(entity) = state.scene.get(id) {
                if state.physics.on_entity_created_at(entity, &registry, &world) {
                    bodies += 1;
                }
            }
        }

        log::info!(
            "Scene '{}' ready with {} entities and {} physics bodies",
            state.scene.metadata.name,
            state.scene.len(),
            bodies
        );

        Ok(Self {
            config: config.scene.clone(),
            registry: Arc::new(registry),
            commands: CommandSender::new(),
            state: Mutex::new(state),
            hooks: RwLock::new(Vec::new()),
            committer: Mutex::new(None),
        })
    }

    /// Manage an empty scene named by the configuration
    pub fn empty(config: &RuntimeConfig) -> Self {
        Self {
            config: config.scene.clone(),
            registry: Arc::new(ComponentRegistry::with_builtin_components()),
            commands: CommandSender::new(),
            state: Mutex::new(SceneState {
                scene: Scene::new(config.scene.name.clone()),
                graph: SceneGraph::new(),
                physics: PhysicsBridge::from_config(&config.physics),
            }),
            hooks: RwLock::new(Vec::new()),
            committer: Mutex::new(None),
        }
    }

    /// Load a scene document from disk and manage it
    pub fn load(path: impl AsRef<Path>, config: &RuntimeConfig) -> Result<Self, SceneManagerError> {
        let path = path.as_ref();
        log::info!("Loading scene from {}", path.display());
        let document = SceneDocument::load(path)?;
        let scene = Scene::from_document(document)?;
        Self::from_config(scene, config)
    }

    /// Register a lifecycle observer
    pub fn add_lifecycle_hook(&self, hook: Arc<dyn LifecycleHook>) {
        self.hooks.write().push(hook);
    }

    /// The component registry in use
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Whether a commit is in progress
    pub fn phase(&self) -> ManagerPhase {
        if self.committer.lock().is_some() {
            ManagerPhase::Committing
        } else {
            ManagerPhase::Idle
        }
    }

    // Queueing

    /// Start building an entity; it appears at the next commit
    pub fn create_entity(&self) -> EntityBuilder<'_> {
        EntityBuilder::new(self.commands.buffer())
    }

    /// Queue destruction of an entity and its descendants
    pub fn destroy_entity(&self, id: EntityId) {
        self.commands.destroy(id);
    }

    /// Queue a component insert or replace
    pub fn set_component(&self, id: EntityId, kind: impl Into<String>, payload: Value) {
        self.commands.set_component(id, kind, payload);
    }

    /// Queue a component removal
    pub fn remove_component(&self, id: EntityId, kind: impl Into<String>) {
        self.commands.remove_component(id, kind);
    }

    /// Queue a reparent; `None` makes the entity a root
    pub fn set_parent(&self, id: EntityId, parent: Option<EntityId>) {
        self.commands.set_parent(id, parent);
    }

    /// Queue an active flag change
    pub fn set_active(&self, id: EntityId, active: bool) {
        self.commands.set_active(id, active);
    }

    /// A sender that queues into this manager from any thread
    pub fn commands(&self) -> CommandSender {
        self.commands.clone()
    }

    /// Number of commands waiting for the next commit
    pub fn pending_command_count(&self) -> usize {
        self.commands.pending()
    }

    // Committing

    /// Apply every queued command in FIFO order
    ///
    /// Invalid commands are skipped and reported; the rest still apply.
    /// Commands queued while the commit runs, including from hooks, wait
    /// for the next call.
    ///
    /// # Panics
    ///
    /// Panics if called from a lifecycle hook of a commit already running
    /// on this thread.
    pub fn apply_pending_commands(&self) -> CommitReport {
        self.assert_not_committing("apply_pending_commands");

        let mut state = self.state.lock();
        *self.committer.lock() = Some(thread::current().id());
        let _guard = CommitGuard {
            committer: &self.committer,
        };

        let commands = self.commands.buffer().drain();
        if commands.is_empty() {
            return CommitReport::default();
        }
        let hooks = self.hooks.read().clone();

        let report = state.commit(commands, &self.registry, &hooks, &self.config);
        log::debug!(
            "Commit applied {} of {} commands ({} created, {} destroyed)",
            report.applied,
            report.total(),
            report.created.len(),
            report.destroyed.len()
        );
        report
    }

    /// Advance physics and copy moving bodies back into the graph
    ///
    /// Returns the number of fixed steps taken.
    pub fn step_physics(&self, dt: f32) -> u32 {
        let mut state = self.lock_state("step_physics");
        let steps = state.physics.step(dt);
        if steps > 0 {
            state.sync_physics_to_graph(&Touched::default());
        }
        steps
    }

    // Reading

    /// Whether the committed scene contains `id`
    pub fn has_entity(&self, id: EntityId) -> bool {
        self.lock_state("has_entity").scene.contains(id)
    }

    /// Number of committed entities
    pub fn entity_count(&self) -> usize {
        self.lock_state("entity_count").scene.len()
    }

    /// Snapshot of a committed entity
    pub fn entity(&self, id: EntityId) -> Option<Entity> {
        self.lock_state("entity").scene.get(id).cloned()
    }

    /// Run `f` against the committed scene
    pub fn with_scene<R>(&self, f: impl FnOnce(&Scene) -> R) -> R {
        f(&self.lock_state("with_scene").scene)
    }

    /// World matrix of a committed entity
    pub fn world_transform(&self, id: EntityId) -> Result<Mat4, GraphError> {
        self.lock_state("world_transform").graph.get_world_transform(id)
    }

    /// Renderables for every active entity with an enabled mesh renderer
    pub fn renderables(&self) -> Vec<RenderableInstance> {
        let state = self.lock_state("renderables");
        state.graph.extract_renderables(&state.scene, &self.registry).collect()
    }

    /// Current pose of the entity's physics body
    pub fn body_pose(&self, id: EntityId) -> Option<Pose> {
        self.lock_state("body_pose").physics.body_pose(id)
    }

    /// Number of bodies in the physics backend
    pub fn physics_body_count(&self) -> usize {
        self.lock_state("physics_body_count").physics.body_count()
    }

    /// Number of entities tracked by the physics bridge
    pub fn physics_handle_count(&self) -> usize {
        self.lock_state("physics_handle_count").physics.handle_count()
    }

    /// Export the committed scene
    pub fn to_document(&self) -> SceneDocument {
        self.lock_state("to_document").scene.to_document()
    }

    /// Write the committed scene to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SceneManagerError> {
        let path = path.as_ref();
        self.to_document().save(path)?;
        log::info!("Saved scene to {}", path.display());
        Ok(())
    }

    fn lock_state(&self, operation: &str) -> MutexGuard<'_, SceneState> {
        self.assert_not_committing(operation);
        self.state.lock()
    }

    /// The state lock is not reentrant; a hook calling back in would deadlock
    fn assert_not_committing(&self, operation: &str) {
        let current = thread::current().id();
        let reentrant = *self.committer.lock() == Some(current);
        if reentrant {
            log::error!("{operation} called from inside a commit on the same thread");
            panic!("SceneManager re-entered by {operation} during apply_pending_commands; queue commands instead");
        }
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::empty(&RuntimeConfig::default())
    }
}

impl std::fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneManager")
            .field("config", &self.config)
            .field("phase", &self.phase())
            .field("pending_commands", &self.pending_command_count())
            .field("hooks", &self.hooks.read().len())
            .finish_non_exhaustive()
    }
}
