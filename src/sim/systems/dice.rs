//! Die template readiness and the spawn/clear message handlers.

use bevy::asset::LoadState;
use bevy::gltf::{Gltf, GltfMesh};
use bevy::log::warn;
use bevy::prelude::*;

use super::setup::PendingDieGltf;
use crate::sim::collider;
use crate::sim::placement;
use crate::sim::session::{AssetPhase, DieTemplate, SimSession};
use crate::sim::types::{ClearRequested, Die, MainCamera, SpawnRequested};

/// Horizontal speed a throw inherits from the aim direction.
const THROW_SPEED: f32 = 1.5;
/// Downward bias so thrown dice head for the stage.
const THROW_DROP: f32 = 2.0;

/// Resolve the loading die glTF into a ready template.
///
/// Template bounds are the union over every mesh primitive, measured in
/// mesh-local space; die assets are expected to be authored centered on the
/// origin.
pub fn poll_die_template(
    asset_server: Res<AssetServer>,
    pending: Option<Res<PendingDieGltf>>,
    gltfs: Res<Assets<Gltf>>,
    gltf_meshes: Res<Assets<GltfMesh>>,
    meshes: Res<Assets<Mesh>>,
    mut session: ResMut<SimSession>,
    mut commands: Commands,
) {
    if session.template_phase() != AssetPhase::Loading {
        return;
    }
    let Some(pending) = pending else {
        return;
    };

    if let Some(LoadState::Failed(err)) = asset_server.get_load_state(&pending.0) {
        warn!("die asset failed to load: {err}");
        session.fail_template();
        commands.remove_resource::<PendingDieGltf>();
        return;
    }
    let Some(gltf) = gltfs.get(&pending.0) else {
        return;
    };

    let Some(scene) = gltf
        .default_scene
        .clone()
        .or_else(|| gltf.scenes.first().cloned())
    else {
        warn!("die asset has no scene; spawning unavailable");
        session.fail_template();
        commands.remove_resource::<PendingDieGltf>();
        return;
    };

    let mut min = Vec3::INFINITY;
    let mut max = Vec3::NEG_INFINITY;
    for mesh_handle in &gltf.meshes {
        let Some(gltf_mesh) = gltf_meshes.get(mesh_handle) else {
            // Sub-asset not ready yet; try again next frame.
            return;
        };
        for primitive in &gltf_mesh.primitives {
            let Some(mesh) = meshes.get(&primitive.mesh) else {
                return;
            };
            match collider::mesh_bounds(mesh) {
                Ok((lo, hi)) => {
                    min = min.min(lo);
                    max = max.max(hi);
                }
                Err(err) => warn!("die primitive skipped for bounds: {err}"),
            }
        }
    }

    let half_extents = (max - min) / 2.0;
    if min.x > max.x || half_extents.min_element() <= f32::EPSILON {
        warn!("die asset has no usable mesh bounds; spawning unavailable");
        session.fail_template();
        commands.remove_resource::<PendingDieGltf>();
        return;
    }

    session.install_template(DieTemplate::Scene {
        scene,
        half_extents,
    });
    commands.remove_resource::<PendingDieGltf>();
}

/// A throw follows the aim direction with a downward bias.
fn throw_velocity(direction: Vec3) -> Vec3 {
    let flat = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
    flat * THROW_SPEED + Vec3::new(0.0, -THROW_DROP, 0.0)
}

pub fn handle_spawn_requests(
    mut requests: MessageReader<SpawnRequested>,
    cameras: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    time: Res<Time>,
    mut session: ResMut<SimSession>,
    mut commands: Commands,
) {
    for request in requests.read() {
        let Ok((camera, camera_transform)) = cameras.single() else {
            continue;
        };
        let Ok(ray) = camera.viewport_to_world(camera_transform, request.cursor) else {
            continue;
        };

        let plane_y = session.stage_metrics().map(|m| m.top_y).unwrap_or(0.0);
        let aim = placement::aim_point(ray.origin, *ray.direction, plane_y);
        let throw = throw_velocity(*ray.direction);

        let entity = commands.spawn_empty().id();
        let Some(spawn) = session.try_spawn(entity, aim, throw, time.elapsed_secs_f64()) else {
            commands.entity(entity).despawn();
            continue;
        };

        for &cleared in &spawn.cleared {
            commands.entity(cleared).despawn();
        }

        let transform = Transform::from_translation(spawn.position).with_rotation(spawn.rotation);
        match session.template().cloned() {
            Some(DieTemplate::Mesh { mesh, material, .. }) => {
                commands.entity(entity).insert((
                    Mesh3d(mesh),
                    MeshMaterial3d(material),
                    transform,
                    Die,
                    Name::new("die"),
                ));
            }
            Some(DieTemplate::Scene { scene, .. }) => {
                commands
                    .entity(entity)
                    .insert((SceneRoot(scene), transform, Die, Name::new("die")));
            }
            // try_spawn already vouched for the template.
            None => {}
        }
    }
}

pub fn handle_clear_requests(
    mut requests: MessageReader<ClearRequested>,
    mut session: ResMut<SimSession>,
    mut commands: Commands,
) {
    if requests.is_empty() {
        return;
    }
    requests.clear();
    for entity in session.clear_all() {
        commands.entity(entity).despawn();
    }
}
