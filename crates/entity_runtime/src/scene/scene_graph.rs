//! Scene graph
//!
//! Following Game Engine Architecture Chapter 11.2.7 - Scene Graphs.
//!
//! Nodes live in a flat arena and refer to each other by index, never by
//! reference. Each node caches its world transform behind a dirty flag:
//! writing a local transform dirties the node and its descendants, and
//! reading a world transform resolves only the dirty part of the ancestor
//! chain. The dirty set is always closed under descendants, which is what
//! lets invalidation stop at a subtree that is already dirty.

use std::collections::HashMap;

use super::store::{Entity, Scene};
use crate::ecs::components::{MeshRendererComponent, TransformComponent};
use crate::ecs::{Component, ComponentRegistry, EntityId};
use crate::foundation::math::Mat4;

/// Scene graph errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The entity has no node in the graph
    #[error("entity {0} is not in the scene graph")]
    UnknownEntity(EntityId),

    /// The hierarchy loops back on itself
    #[error("cycle detected in hierarchy: {}", format_path(.path))]
    CycleDetected {
        /// Entities along the loop; the first entity is repeated at the end
        path: Vec<EntityId>,
    },
}

fn format_path(path: &[EntityId]) -> String {
    path.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
}

#[derive(Debug, Clone)]
struct GraphNode {
    entity: EntityId,
    local: Mat4,
    world: Mat4,
    dirty: bool,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// A drawable entity resolved to world space
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableInstance {
    /// Source entity
    pub entity: EntityId,
    /// World transform
    pub world: Mat4,
    /// Mesh asset reference
    pub mesh_id: Option<String>,
    /// Material asset reference
    pub material_id: Option<String>,
    /// Whether the mesh casts shadows
    pub cast_shadows: bool,
    /// Whether the mesh receives shadows
    pub receive_shadows: bool,
}

/// Index-based hierarchy with cached world transforms
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<EntityId, usize>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from the scene's parent references
    ///
    /// Fails on any cycle without producing a partially linked graph.
    /// Parent references to entities that are not in the scene are treated
    /// as roots.
    pub fn build(scene: &Scene, registry: &ComponentRegistry) -> Result<Self, GraphError> {
        let index: HashMap<EntityId, usize> = scene
            .entities()
            .enumerate()
            .map(|(slot, entity)| (entity.id(), slot))
            .collect();

        let mut nodes: Vec<GraphNode> = scene
            .entities()
            .map(|entity| {
                let parent = entity.parent().and_then(|parent| {
                    let slot = index.get(&parent).copied();
                    if slot.is_none() {
                        log::debug!("Entity {} has unknown parent {parent}, treating as root", entity.id());
                    }
                    slot
                });
                let local = local_matrix(entity, registry);
                GraphNode {
                    entity: entity.id(),
                    local,
                    world: local,
                    dirty: true,
                    parent,
                    children: Vec::new(),
                }
            })
            .collect();

        let parents: Vec<Option<usize>> = nodes.iter().map(|node| node.parent).collect();
        if let Some(cycle) = find_cycle(&parents) {
            let path = cycle.into_iter().map(|slot| nodes[slot].entity).collect();
            let err = GraphError::CycleDetected { path };
            log::error!("Scene graph build failed: {err}");
            return Err(err);
        }

        for (slot, parent) in parents.into_iter().enumerate() {
            if let Some(parent) = parent {
                nodes[parent].children.push(slot);
            }
        }

        log::debug!("Built scene graph with {} nodes", nodes.len());
        Ok(Self { nodes, index })
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether an entity has a node
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    fn slot(&self, id: EntityId) -> Result<usize, GraphError> {
        self.index.get(&id).copied().ok_or(GraphError::UnknownEntity(id))
    }

    /// Replace a node's local transform and invalidate its subtree
    pub fn update_local_transform(&mut self, id: EntityId, local: Mat4) -> Result<(), GraphError> {
        let slot = self.slot(id)?;
        self.nodes[slot].local = local;
        self.mark_subtree_dirty(slot);
        Ok(())
    }

    /// Current local transform
    pub fn local_transform(&self, id: EntityId) -> Result<Mat4, GraphError> {
        Ok(self.nodes[self.slot(id)?].local)
    }

    /// World transform, resolving and caching any dirty ancestors
    pub fn get_world_transform(&mut self, id: EntityId) -> Result<Mat4, GraphError> {
        let slot = self.slot(id)?;
        Ok(self.resolve(slot))
    }

    /// World transform of the parent, identity for roots
    pub fn parent_world_transform(&mut self, id: EntityId) -> Result<Mat4, GraphError> {
        let parent = self.nodes[self.slot(id)?].parent;
        Ok(parent.map_or_else(Mat4::identity, |parent| self.resolve(parent)))
    }

    /// Whether the cached world transform is stale
    pub fn is_dirty(&self, id: EntityId) -> Result<bool, GraphError> {
        Ok(self.nodes[self.slot(id)?].dirty)
    }

    /// Parent entity, `None` for roots
    pub fn parent(&self, id: EntityId) -> Result<Option<EntityId>, GraphError> {
        let slot = self.slot(id)?;
        Ok(self.nodes[slot].parent.map(|parent| self.nodes[parent].entity))
    }

    /// Child entities in attach order
    pub fn children(&self, id: EntityId) -> Result<Vec<EntityId>, GraphError> {
        let slot = self.slot(id)?;
        Ok(self.nodes[slot]
            .children
            .iter()
            .map(|&child| self.nodes[child].entity)
            .collect())
    }

    /// Move a node under a new parent, or to the root with `None`
    ///
    /// Rejects the move if `parent` is the node itself or one of its
    /// descendants; the graph is left untouched in that case.
    pub fn set_parent(&mut self, id: EntityId, parent: Option<EntityId>) -> Result<(), GraphError> {
        let slot = self.slot(id)?;
        let new_parent = parent.map(|parent| self.slot(parent)).transpose()?;

        if let Some(new_parent) = new_parent {
            let mut path = vec![id];
            let mut current = Some(new_parent);
            while let Some(ancestor) = current {
                path.push(self.nodes[ancestor].entity);
                if ancestor == slot {
                    path.reverse();
                    return Err(GraphError::CycleDetected { path });
                }
                current = self.nodes[ancestor].parent;
            }
        }

        if self.nodes[slot].parent == new_parent {
            return Ok(());
        }
        if let Some(old_parent) = self.nodes[slot].parent {
            self.nodes[old_parent].children.retain(|&child| child != slot);
        }
        if let Some(new_parent) = new_parent {
            self.nodes[new_parent].children.push(slot);
        }
        self.nodes[slot].parent = new_parent;
        self.mark_subtree_dirty(slot);
        Ok(())
    }

    /// Resolve every dirty world transform
    pub fn update_all(&mut self) {
        for slot in 0..self.nodes.len() {
            self.resolve(slot);
        }
    }

    /// Drawable entities with their world transforms
    ///
    /// Yields every active entity that has both a Transform and an enabled
    /// MeshRenderer. The graph is not modified; dirty transforms are
    /// computed on the fly without being cached. Clone the iterator to
    /// walk the sequence again.
    pub fn extract_renderables<'a>(&'a self, scene: &'a Scene, registry: &'a ComponentRegistry) -> Renderables<'a> {
        Renderables {
            graph: self,
            registry,
            entities: scene.entities(),
        }
    }

    fn mark_subtree_dirty(&mut self, root: usize) {
        self.nodes[root].dirty = true;
        let mut stack: Vec<usize> = self.nodes[root].children.clone();
        while let Some(slot) = stack.pop() {
            // Descendants of a dirty node are already dirty
            if self.nodes[slot].dirty {
                continue;
            }
            self.nodes[slot].dirty = true;
            stack.extend_from_slice(&self.nodes[slot].children);
        }
    }

    /// Dirty nodes from `slot` upwards, plus the clean world they sit under
    fn dirty_chain(&self, slot: usize) -> (Vec<usize>, Mat4) {
        let mut chain = Vec::new();
        let mut current = Some(slot);
        while let Some(node) = current {
            if !self.nodes[node].dirty {
                return (chain, self.nodes[node].world);
            }
            chain.push(node);
            current = self.nodes[node].parent;
        }
        (chain, Mat4::identity())
    }

    fn resolve(&mut self, slot: usize) -> Mat4 {
        let (chain, mut world) = self.dirty_chain(slot);
        if chain.is_empty() {
            return self.nodes[slot].world;
        }
        for &node in chain.iter().rev() {
            world *= self.nodes[node].local;
            self.nodes[node].world = world;
            self.nodes[node].dirty = false;
        }
        world
    }

    fn compute_world(&self, slot: usize) -> Mat4 {
        let (chain, base) = self.dirty_chain(slot);
        if chain.is_empty() {
            return base;
        }
        chain.iter().rev().fold(base, |world, &node| world * self.nodes[node].local)
    }
}

/// Local matrix authored on an entity, identity if absent or malformed
pub fn local_matrix(entity: &Entity, registry: &ComponentRegistry) -> Mat4 {
    match entity.decode::<TransformComponent>(registry) {
        Some(Ok(transform)) => transform.to_matrix(),
        Some(Err(err)) => {
            log::warn!("Entity {} has an invalid Transform ({err}), using identity", entity.id());
            Mat4::identity()
        }
        None => Mat4::identity(),
    }
}

/// Depth-first search over parent links with an on-stack marker.
/// Returns the slots forming the first cycle found, first slot repeated at the end.
fn find_cycle(parents: &[Option<usize>]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        OnStack,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; parents.len()];
    let mut stack = Vec::new();
    for start in 0..parents.len() {
        let mut current = Some(start);
        while let Some(node) = current {
            match marks[node] {
                Mark::Done => break,
                Mark::OnStack => {
                    let begin = stack.iter().position(|&slot| slot == node).unwrap_or(0);
                    let mut cycle = stack[begin..].to_vec();
                    cycle.push(node);
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    marks[node] = Mark::OnStack;
                    stack.push(node);
                    current = parents[node];
                }
            }
        }
        for node in stack.drain(..) {
            marks[node] = Mark::Done;
        }
    }
    None
}

/// Lazy, restartable sequence of [`RenderableInstance`]s
#[derive(Clone)]
pub struct Renderables<'a> {
    graph: &'a SceneGraph,
    registry: &'a ComponentRegistry,
    entities: std::slice::Iter<'a, Entity>,
}

impl Iterator for Renderables<'_> {
    type Item = RenderableInstance;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entity = self.entities.next()?;
            if !entity.is_active() || !entity.has_component(TransformComponent::KIND) {
                continue;
            }
            let renderer = match entity.decode::<MeshRendererComponent>(self.registry) {
                Some(Ok(renderer)) if renderer.enabled => renderer,
                Some(Err(err)) => {
                    log::debug!("Skipping renderable {}: {err}", entity.id());
                    continue;
                }
                _ => continue,
            };
            let Some(&slot) = self.graph.index.get(&entity.id()) else {
                continue;
            };

            return Some(RenderableInstance {
                entity: entity.id(),
                world: self.graph.compute_world(slot),
                mesh_id: renderer.mesh_id,
                material_id: renderer.material_id,
                cast_shadows: renderer.cast_shadows,
                receive_shadows: renderer.receive_shadows,
            });
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.entities.size_hint().1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{translation_of, Transform, Vec3};
    use approx::assert_relative_eq;
    use serde_json::json;

    const EPSILON: f32 = 1e-5;

    fn transform(position: [f32; 3]) -> serde_json::Value {
        TransformComponent::from_position(position).to_payload()
    }

    fn parent_child_scene() -> (Scene, EntityId, EntityId) {
        let mut scene = Scene::new("Graph");
        let parent = Entity::new("parent", "Parent").with_component("Transform", transform([10.0, 0.0, 0.0]));
        let parent_id = parent.id();
        let child = Entity::new("child", "Child")
            .with_parent(Some(parent_id))
            .with_component("Transform", transform([5.0, 0.0, 0.0]));
        let child_id = child.id();
        scene.insert(parent).unwrap();
        scene.insert(child).unwrap();
        (scene, parent_id, child_id)
    }

    #[test]
    fn test_world_transform_composes_parent() {
        let registry = ComponentRegistry::with_builtin_components();
        let (scene, parent, child) = parent_child_scene();
        let mut graph = SceneGraph::build(&scene, &registry).unwrap();

        let world = graph.get_world_transform(child).unwrap();
        assert_relative_eq!(translation_of(&world), Vec3::new(15.0, 0.0, 0.0), epsilon = EPSILON);
        assert_eq!(graph.parent(child).unwrap(), Some(parent));
        assert_eq!(graph.children(parent).unwrap(), vec![child]);
    }

    #[test]
    fn test_parent_update_propagates_lazily() {
        let registry = ComponentRegistry::with_builtin_components();
        let (scene, parent, child) = parent_child_scene();
        let mut graph = SceneGraph::build(&scene, &registry).unwrap();
        graph.update_all();
        assert!(!graph.is_dirty(child).unwrap());

        let moved = Transform::from_position(Vec3::new(0.0, 3.0, 0.0)).to_matrix();
        graph.update_local_transform(parent, moved).unwrap();
        assert!(graph.is_dirty(parent).unwrap());
        assert!(graph.is_dirty(child).unwrap());

        let world = graph.get_world_transform(child).unwrap();
        assert_relative_eq!(translation_of(&world), Vec3::new(5.0, 3.0, 0.0), epsilon = EPSILON);
        assert!(!graph.is_dirty(parent).unwrap());
        assert!(!graph.is_dirty(child).unwrap());
    }

    #[test]
    fn test_rotation_and_scale_propagate() {
        let registry = ComponentRegistry::with_builtin_components();
        let mut scene = Scene::new("Rotated");
        let parent = Entity::new("p", "P").with_component(
            "Transform",
            json!({ "position": [0.0, 0.0, 0.0], "rotation": [0.0, 90.0, 0.0], "scale": [2.0, 2.0, 2.0] }),
        );
        let parent_id = parent.id();
        let child = Entity::new("c", "C")
            .with_parent(Some(parent_id))
            .with_component("Transform", transform([1.0, 0.0, 0.0]));
        let child_id = child.id();
        scene.insert(parent).unwrap();
        scene.insert(child).unwrap();

        let mut graph = SceneGraph::build(&scene, &registry).unwrap();
        let world = graph.get_world_transform(child_id).unwrap();
        assert_relative_eq!(translation_of(&world), Vec3::new(0.0, 0.0, -2.0), epsilon = 1e-4);
    }

    #[test]
    fn test_deep_chain_resolves_once() {
        let registry = ComponentRegistry::with_builtin_components();
        let mut scene = Scene::new("Chain");
        let mut parent = None;
        let mut ids = Vec::new();
        for depth in 0..50 {
            let entity = Entity::new(format!("node-{depth}"), "Node")
                .with_parent(parent)
                .with_component("Transform", transform([1.0, 0.0, 0.0]));
            parent = Some(entity.id());
            ids.push(entity.id());
            scene.insert(entity).unwrap();
        }

        let mut graph = SceneGraph::build(&scene, &registry).unwrap();
        let leaf = *ids.last().unwrap();
        let world = graph.get_world_transform(leaf).unwrap();
        assert_relative_eq!(translation_of(&world), Vec3::new(50.0, 0.0, 0.0), epsilon = 1e-3);
        assert!(ids.iter().all(|&id| !graph.is_dirty(id).unwrap()));

        graph.update_local_transform(ids[10], Mat4::identity()).unwrap();
        assert!(!graph.is_dirty(ids[9]).unwrap());
        assert!(ids[10..].iter().all(|&id| graph.is_dirty(id).unwrap()));
        let world = graph.get_world_transform(leaf).unwrap();
        assert_relative_eq!(translation_of(&world), Vec3::new(49.0, 0.0, 0.0), epsilon = 1e-3);
    }

    #[test]
    fn test_build_rejects_cycle() {
        let registry = ComponentRegistry::with_builtin_components();
        let mut scene = Scene::new("Cycle");
        let a = Entity::new("a", "A");
        let b = Entity::new("b", "B");
        let c = Entity::new("c", "C");
        let (a_id, b_id, c_id) = (a.id(), b.id(), c.id());
        scene.insert(a).unwrap();
        scene.insert(b).unwrap();
        scene.insert(c).unwrap();
        scene.link_unchecked(a_id, b_id).unwrap();
        scene.link_unchecked(b_id, c_id).unwrap();
        scene.link_unchecked(c_id, a_id).unwrap();

        let err = SceneGraph::build(&scene, &registry).unwrap_err();
        let GraphError::CycleDetected { path } = err else {
            panic!("expected cycle error");
        };
        assert_eq!(path.len(), 4);
        assert_eq!(path.first(), path.last());
        for id in [a_id, b_id, c_id] {
            assert!(path.contains(&id));
        }
    }

    #[test]
    fn test_set_parent_rejects_cycle_and_keeps_state() {
        let registry = ComponentRegistry::with_builtin_components();
        let (scene, parent, child) = parent_child_scene();
        let mut graph = SceneGraph::build(&scene, &registry).unwrap();
        let before = graph.get_world_transform(parent).unwrap();

        let err = graph.set_parent(parent, Some(child)).unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected { .. }));
        assert_eq!(graph.parent(parent).unwrap(), None);
        assert_eq!(graph.children(parent).unwrap(), vec![child]);
        assert_eq!(graph.get_world_transform(parent).unwrap(), before);

        assert!(graph.set_parent(child, Some(child)).is_err());
    }

    #[test]
    fn test_set_parent_detaches_and_dirties() {
        let registry = ComponentRegistry::with_builtin_components();
        let (scene, parent, child) = parent_child_scene();
        let mut graph = SceneGraph::build(&scene, &registry).unwrap();
        graph.update_all();

        graph.set_parent(child, None).unwrap();
        assert!(graph.is_dirty(child).unwrap());
        assert!(graph.children(parent).unwrap().is_empty());
        let world = graph.get_world_transform(child).unwrap();
        assert_relative_eq!(translation_of(&world), Vec3::new(5.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_unknown_entity_errors() {
        let registry = ComponentRegistry::with_builtin_components();
        let (scene, ..) = parent_child_scene();
        let mut graph = SceneGraph::build(&scene, &registry).unwrap();
        let ghost = EntityId::new(1);

        assert_eq!(graph.get_world_transform(ghost), Err(GraphError::UnknownEntity(ghost)));
        assert_eq!(
            graph.update_local_transform(ghost, Mat4::identity()),
            Err(GraphError::UnknownEntity(ghost))
        );
    }

    #[test]
    fn test_extract_renderables_filters_and_does_not_mutate() {
        let registry = ComponentRegistry::with_builtin_components();
        let (mut scene, parent, child) = parent_child_scene();
        scene
            .set_component(child, "MeshRenderer", json!({ "meshId": "cube", "materialId": "red" }))
            .unwrap();
        let hidden = Entity::new("hidden", "Hidden")
            .with_component("Transform", transform([0.0; 3]))
            .with_component("MeshRenderer", json!({ "meshId": "cube", "enabled": false }));
        let inactive = Entity::new("inactive", "Inactive")
            .with_component("Transform", transform([0.0; 3]))
            .with_component("MeshRenderer", json!({ "meshId": "cube" }))
            .with_active(false);
        let no_transform = Entity::new("bare", "Bare").with_component("MeshRenderer", json!({ "meshId": "cube" }));
        scene.insert(hidden).unwrap();
        scene.insert(inactive).unwrap();
        scene.insert(no_transform).unwrap();

        let graph = SceneGraph::build(&scene, &registry).unwrap();
        let renderables = graph.extract_renderables(&scene, &registry);
        let first_pass: Vec<_> = renderables.clone().collect();
        let second_pass: Vec<_> = renderables.collect();

        assert_eq!(first_pass, second_pass);
        assert_eq!(first_pass.len(), 1);
        assert_eq!(first_pass[0].entity, child);
        assert_eq!(first_pass[0].mesh_id.as_deref(), Some("cube"));
        assert_relative_eq!(translation_of(&first_pass[0].world), Vec3::new(15.0, 0.0, 0.0), epsilon = EPSILON);
        assert!(graph.is_dirty(parent).unwrap());
    }

    #[test]
    fn test_invalid_transform_is_identity() {
        let registry = ComponentRegistry::with_builtin_components();
        let mut scene = Scene::new("Bad");
        let entity = Entity::new("bad", "Bad").with_component("Transform", json!({ "position": "up" }));
        let id = entity.id();
        scene.insert(entity).unwrap();

        let mut graph = SceneGraph::build(&scene, &registry).unwrap();
        assert_eq!(graph.get_world_transform(id).unwrap(), Mat4::identity());
    }
}
