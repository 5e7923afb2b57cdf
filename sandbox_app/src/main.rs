//! Sandbox demo application
//!
//! Builds a small scene through the command buffer, drops a few spheres
//! onto a static floor for two seconds of simulated time, and writes the
//! resulting scene document.
//!
//! Usage: `sandbox [config.toml|config.ron] [output.json]`

use std::path::PathBuf;
use std::sync::Arc;

use entity_runtime::ecs::components::ColliderSize;
use entity_runtime::foundation::logging;
use entity_runtime::foundation::math::translation_of;
use entity_runtime::prelude::*;
use entity_runtime::scene::DocumentError;

const FRAME_TIME: f32 = 1.0 / 60.0;
const FRAME_COUNT: u32 = 120;

/// Sandbox failures
#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneManagerError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

/// Logs entity lifecycle events
struct LoggingHook;

impl LifecycleHook for LoggingHook {
    fn on_entity_created(&self, entity: &Entity, _scene: &Scene) {
        log::debug!("Created '{}' ({})", entity.name(), entity.id());
    }

    fn on_entity_destroyed(&self, entity: &Entity, _scene: &Scene) {
        log::debug!("Destroyed '{}' ({})", entity.name(), entity.id());
    }
}

/// Static floor, three spheres, and a small parent/child rig
fn populate(manager: &SceneManager) -> Vec<EntityId> {
    manager
        .create_entity()
        .with_persistent_id("floor")
        .with_name("Floor")
        .with_scale([20.0, 1.0, 20.0])
        .with_mesh_renderer("cube", Some("concrete".to_string()))
        .with_collider(&ColliderComponent::default())
        .build();

    let spheres = (0..3u8)
        .map(|i| {
            let offset = f32::from(i);
            manager
                .create_entity()
                .with_name(format!("Sphere {i}"))
                .with_position([offset * 2.0 - 2.0, 4.0 + offset, 0.0])
                .with_mesh_renderer("sphere", Some("rubber".to_string()))
                .with_rigid_body(&RigidBodyComponent::default())
                .with_collider(&ColliderComponent {
                    collider_type: "sphere".to_string(),
                    size: ColliderSize {
                        radius: 0.5,
                        ..Default::default()
                    },
                    ..Default::default()
                })
                .build()
        })
        .collect();

    let turret = manager
        .create_entity()
        .with_name("Turret")
        .with_position([0.0, 1.0, -5.0])
        .with_rotation([0.0, 90.0, 0.0])
        .with_mesh_renderer("turret_base", None)
        .build();
    manager
        .create_entity()
        .with_name("Barrel")
        .with_parent(turret)
        .with_position([1.5, 0.5, 0.0])
        .with_mesh_renderer("turret_barrel", None)
        .build();

    spheres
}

fn main() -> Result<(), AppError> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => RuntimeConfig::load_or_default(path)?,
        None => RuntimeConfig::default(),
    };
    let output = args.next().map(PathBuf::from);

    logging::init_with_config(&config.logging);
    log::info!("Starting sandbox with scene '{}'", config.scene.name);

    let manager = SceneManager::empty(&config);
    manager.add_lifecycle_hook(Arc::new(LoggingHook));

    let spheres = populate(&manager);
    let report = manager.apply_pending_commands();
    log::info!(
        "Initial commit: {} applied, {} skipped, {} physics bodies",
        report.applied,
        report.skipped.len(),
        manager.physics_body_count()
    );

    for frame in 0..FRAME_COUNT {
        manager.step_physics(FRAME_TIME);
        if frame == FRAME_COUNT / 2 {
            if let Some(&first) = spheres.first() {
                log::info!("Removing sphere {first} halfway through");
                manager.destroy_entity(first);
            }
        }
        manager.apply_pending_commands();
    }

    for renderable in manager.renderables() {
        log::info!(
            "{} '{}' at {:?}",
            renderable.entity,
            renderable.mesh_id.as_deref().unwrap_or("<none>"),
            translation_of(&renderable.world)
        );
    }

    match output {
        Some(path) => manager.save(&path)?,
        None => println!("{}", manager.to_document().to_json_string()?),
    }
    Ok(())
}
