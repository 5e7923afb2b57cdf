//! Integration tests for committing command batches
//!
//! Drives the scene manager end to end: queue, commit, then read back
//! through the store, graph and hooks.

use std::sync::{Arc, OnceLock, Weak};
use std::thread;

use parking_lot::Mutex;

use std::collections::BTreeMap;

use crate::core::config::RuntimeConfig;
use crate::ecs::components::{RigidBodyComponent, TransformComponent};
use crate::ecs::{Component, EntityId};
use crate::foundation::math::{translation_of, Vec3};
use crate::scene::{
    Entity, EntityRecord, GraphError, LifecycleHook, ManagerPhase, Scene, SceneDocument, SceneError, SceneManager,
    SceneManagerError, SceneMetadata, DOCUMENT_FORMAT_VERSION,
};

/// Records every lifecycle event in order
#[derive(Default)]
struct RecordingHook {
    events: Mutex<Vec<(&'static str, EntityId)>>,
}

impl RecordingHook {
    fn events(&self) -> Vec<(&'static str, EntityId)> {
        self.events.lock().clone()
    }
}

impl LifecycleHook for RecordingHook {
    fn on_entity_created(&self, entity: &Entity, _scene: &Scene) {
        self.events.lock().push(("created", entity.id()));
    }

    fn on_entity_destroyed(&self, entity: &Entity, _scene: &Scene) {
        self.events.lock().push(("destroyed", entity.id()));
    }
}

/// Commits again from inside a hook
struct ReentrantHook {
    manager: OnceLock<Weak<SceneManager>>,
}

impl LifecycleHook for ReentrantHook {
    fn on_entity_created(&self, _entity: &Entity, _scene: &Scene) {
        if let Some(manager) = self.manager.get().and_then(Weak::upgrade) {
            manager.apply_pending_commands();
        }
    }
}

/// Spawns a child under every entity named "Spawner"
struct SpawnerHook {
    commands: crate::ecs::CommandSender,
}

impl LifecycleHook for SpawnerHook {
    fn on_entity_created(&self, entity: &Entity, scene: &Scene) {
        if entity.name() == "Spawner" {
            assert!(scene.contains(entity.id()));
            self.commands
                .create_entity()
                .with_name("Spawned")
                .with_parent(entity.id())
                .build();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn world_position(manager: &SceneManager, id: EntityId) -> Vec3 {
        translation_of(&manager.world_transform(id).unwrap())
    }

    #[test]
    fn test_create_then_reparent_in_one_batch() {
        let manager = SceneManager::default();
        let parent = manager.create_entity().with_name("Parent").with_position([10.0, 0.0, 0.0]).build();
        let child = manager.create_entity().with_name("Child").with_position([1.0, 0.0, 0.0]).build();
        manager.set_parent(child, Some(parent));

        let report = manager.apply_pending_commands();
        assert_eq!(report.applied, 3);
        assert!(report.is_clean());
        assert!(report.graph_rebuilt);

        assert_eq!(manager.entity(child).unwrap().parent(), Some(parent));
        assert_eq!(manager.entity(parent).unwrap().children(), &[child]);
        assert_relative_eq!(world_position(&manager, child), Vec3::new(11.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_cycle_is_skipped_and_hierarchy_kept() {
        let manager = SceneManager::default();
        let a = manager.create_entity().with_position([1.0, 0.0, 0.0]).build();
        let b = manager.create_entity().with_parent(a).with_position([0.0, 1.0, 0.0]).build();
        manager.apply_pending_commands();

        manager.set_parent(a, Some(b));
        let report = manager.apply_pending_commands();

        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].error, SceneError::CycleDetected { entity: a, parent: b });
        assert_eq!(manager.entity(a).unwrap().parent(), None);
        assert_eq!(manager.entity(b).unwrap().parent(), Some(a));
        assert_relative_eq!(world_position(&manager, b), Vec3::new(1.0, 1.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_mixed_batch_applies_valid_commands() {
        let manager = SceneManager::default();
        let keep = manager.create_entity().with_name("Keep").build();
        manager.destroy_entity(EntityId::new(7));
        manager.set_parent(keep, Some(EntityId::new(8)));
        manager.set_active(keep, false);

        let report = manager.apply_pending_commands();
        assert_eq!(report.total(), 4);
        assert_eq!(report.applied, 2);
        let errors: Vec<_> = report.skipped.iter().map(|skipped| skipped.error.clone()).collect();
        assert_eq!(
            errors,
            vec![
                SceneError::UnknownEntity(EntityId::new(7)),
                SceneError::UnknownParent {
                    entity: keep,
                    parent: EntityId::new(8),
                },
            ]
        );
        assert!(!manager.entity(keep).unwrap().is_active());
    }

    #[test]
    fn test_transform_change_propagates_to_descendants() {
        let manager = SceneManager::default();
        let root = manager.create_entity().with_position([0.0, 0.0, 0.0]).build();
        let arm = manager.create_entity().with_parent(root).with_position([0.0, 2.0, 0.0]).build();
        let hand = manager.create_entity().with_parent(arm).with_position([1.0, 0.0, 0.0]).build();
        manager.apply_pending_commands();
        assert_relative_eq!(world_position(&manager, hand), Vec3::new(1.0, 2.0, 0.0), epsilon = EPSILON);

        manager.set_component(
            root,
            TransformComponent::KIND,
            TransformComponent::from_position([5.0, 0.0, 0.0]).to_payload(),
        );
        let report = manager.apply_pending_commands();

        assert!(!report.graph_rebuilt);
        assert_relative_eq!(world_position(&manager, arm), Vec3::new(5.0, 2.0, 0.0), epsilon = EPSILON);
        assert_relative_eq!(world_position(&manager, hand), Vec3::new(6.0, 2.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_rotation_is_authored_in_degrees() {
        let manager = SceneManager::default();
        let turret = manager.create_entity().with_rotation([0.0, 90.0, 0.0]).build();
        let barrel = manager.create_entity().with_parent(turret).with_position([1.0, 0.0, 0.0]).build();
        manager.apply_pending_commands();

        // +X rotated a quarter turn about +Y lands on -Z
        assert_relative_eq!(world_position(&manager, barrel), Vec3::new(0.0, 0.0, -1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_destroy_removes_subtree_children_first() {
        let manager = SceneManager::default();
        let hook = Arc::new(RecordingHook::default());
        manager.add_lifecycle_hook(hook.clone());

        let root = manager.create_entity().build();
        let middle = manager.create_entity().with_parent(root).build();
        let leaf = manager.create_entity().with_parent(middle).build();
        let bystander = manager.create_entity().build();
        manager.apply_pending_commands();

        manager.destroy_entity(root);
        let report = manager.apply_pending_commands();

        assert_eq!(report.destroyed, vec![leaf, middle, root]);
        assert_eq!(manager.entity_count(), 1);
        assert!(manager.has_entity(bystander));
        let destroyed: Vec<_> = hook
            .events()
            .into_iter()
            .filter(|(event, _)| *event == "destroyed")
            .map(|(_, id)| id)
            .collect();
        assert_eq!(destroyed, vec![leaf, middle, root]);
    }

    #[test]
    fn test_hooks_fire_exactly_once() {
        let manager = SceneManager::default();
        let hook = Arc::new(RecordingHook::default());
        manager.add_lifecycle_hook(hook.clone());

        let a = manager.create_entity().build();
        let b = manager.create_entity().build();
        manager.apply_pending_commands();

        manager.set_component(b, "Tag", serde_json::json!("enemy"));
        manager.set_active(b, false);
        manager.destroy_entity(a);
        manager.apply_pending_commands();
        manager.apply_pending_commands();

        assert_eq!(hook.events(), vec![("created", a), ("created", b), ("destroyed", a)]);
    }

    #[test]
    fn test_create_and_destroy_in_same_batch_is_silent() {
        let manager = SceneManager::default();
        let hook = Arc::new(RecordingHook::default());
        manager.add_lifecycle_hook(hook.clone());

        let fleeting = manager.create_entity().with_name("Fleeting").build();
        manager.destroy_entity(fleeting);
        let report = manager.apply_pending_commands();

        assert_eq!(report.applied, 2);
        assert!(report.created.is_empty());
        assert!(!manager.has_entity(fleeting));
        assert!(hook.events().is_empty());
    }

    #[test]
    fn test_recreated_in_same_batch_announced_once() {
        let manager = SceneManager::default();
        let hook = Arc::new(RecordingHook::default());
        manager.add_lifecycle_hook(hook.clone());

        let first = manager
            .create_entity()
            .with_persistent_id("phoenix")
            .with_rigid_body(&RigidBodyComponent::default())
            .build();
        manager.destroy_entity(first);
        let second = manager
            .create_entity()
            .with_persistent_id("phoenix")
            .with_rigid_body(&RigidBodyComponent::default())
            .build();
        assert_eq!(first, second);

        let report = manager.apply_pending_commands();
        assert_eq!(report.applied, 3);
        assert_eq!(report.created, vec![second]);
        assert_eq!(hook.events(), vec![("created", second)]);
        assert_eq!(manager.physics_body_count(), 1);
        assert_eq!(manager.physics_handle_count(), 1);
    }

    #[test]
    fn test_hooks_queue_into_next_batch() {
        let manager = SceneManager::default();
        manager.add_lifecycle_hook(Arc::new(SpawnerHook {
            commands: manager.commands(),
        }));

        let spawner = manager.create_entity().with_name("Spawner").build();
        manager.apply_pending_commands();
        assert_eq!(manager.entity_count(), 1);
        assert_eq!(manager.pending_command_count(), 1);

        let report = manager.apply_pending_commands();
        assert_eq!(report.created.len(), 1);
        let spawned = manager.entity(report.created[0]).unwrap();
        assert_eq!(spawned.name(), "Spawned");
        assert_eq!(spawned.parent(), Some(spawner));
    }

    #[test]
    #[should_panic(expected = "re-entered")]
    fn test_commit_from_hook_panics() {
        let manager = Arc::new(SceneManager::default());
        let hook = Arc::new(ReentrantHook {
            manager: OnceLock::new(),
        });
        hook.manager.set(Arc::downgrade(&manager)).ok();
        manager.add_lifecycle_hook(hook);

        manager.create_entity().build();
        manager.apply_pending_commands();
    }

    #[test]
    fn test_phase_returns_to_idle() {
        let manager = SceneManager::default();
        manager.create_entity().build();
        manager.apply_pending_commands();
        assert_eq!(manager.phase(), ManagerPhase::Idle);
    }

    #[test]
    fn test_concurrent_producers_single_commit() {
        let manager = SceneManager::default();
        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let commands = manager.commands();
                thread::spawn(move || {
                    for i in 0..250 {
                        commands.create(format!("worker-{worker}-{i}"));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(manager.entity_count(), 0);
        let report = manager.apply_pending_commands();
        assert_eq!(report.applied, 1000);
        assert_eq!(manager.entity_count(), 1000);
    }

    #[test]
    fn test_renderables_follow_active_flag() {
        let manager = SceneManager::default();
        let visible = manager
            .create_entity()
            .with_position([0.0, 1.0, 0.0])
            .with_mesh_renderer("cube", Some("steel".to_string()))
            .build();
        let hidden = manager
            .create_entity()
            .with_position([0.0, 2.0, 0.0])
            .with_mesh_renderer("sphere", None)
            .build();
        manager.create_entity().with_position([0.0, 3.0, 0.0]).build();
        manager.set_active(hidden, false);
        manager.apply_pending_commands();

        let renderables = manager.renderables();
        assert_eq!(renderables.len(), 1);
        assert_eq!(renderables[0].entity, visible);
        assert_eq!(renderables[0].mesh_id.as_deref(), Some("cube"));
        assert_relative_eq!(translation_of(&renderables[0].world), Vec3::new(0.0, 1.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!("entity_runtime_manager_{}.json", std::process::id()));
        let manager = SceneManager::default();
        let base = manager
            .create_entity()
            .with_persistent_id("base")
            .with_name("Base")
            .with_position([2.0, 0.0, 0.0])
            .build();
        let lamp = manager
            .create_entity()
            .with_persistent_id("lamp")
            .with_parent(base)
            .with_position([0.0, 3.0, 0.0])
            .with_component("Light", serde_json::json!({ "intensity": 2.5 }))
            .build();
        manager.apply_pending_commands();
        manager.save(&path).unwrap();

        let loaded = SceneManager::load(&path, &RuntimeConfig::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.entity_count(), 2);
        let restored = loaded.entity(lamp).unwrap();
        assert_eq!(restored.parent(), Some(base));
        assert_eq!(restored.component("Light"), Some(&serde_json::json!({ "intensity": 2.5 })));
        assert_relative_eq!(world_position(&loaded, lamp), Vec3::new(2.0, 3.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_load_rejects_cyclic_document() {
        let record = |persistent_id: &str, parent: &str| EntityRecord {
            persistent_id: persistent_id.to_string(),
            name: persistent_id.to_string(),
            parent_persistent_id: Some(parent.to_string()),
            active: true,
            components: BTreeMap::new(),
        };
        let document = SceneDocument {
            format_version: DOCUMENT_FORMAT_VERSION,
            metadata: SceneMetadata::new("Loop"),
            entities: vec![record("ouroboros", "tail"), record("tail", "ouroboros")],
            materials: Vec::new(),
        };

        // the store accepts the links as written; the graph refuses them
        let scene = Scene::from_document(document.clone()).unwrap();
        assert_eq!(scene.len(), 2);

        let path = std::env::temp_dir().join(format!("entity_runtime_cycle_{}.json", std::process::id()));
        document.save(&path).unwrap();
        let result = SceneManager::load(&path, &RuntimeConfig::default());
        std::fs::remove_file(&path).ok();

        match result {
            Err(SceneManagerError::Graph(GraphError::CycleDetected { path: cycle })) => {
                assert_eq!(cycle.len(), 3);
                assert_eq!(cycle.first(), cycle.last());
            }
            other => panic!("expected a cycle error, got {other:?}"),
        }
    }
}
