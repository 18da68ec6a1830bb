//! Build the static stage colliders once the stage meshes are available.
//!
//! Runs every frame while the stage is in its loading phase: waits until all
//! mesh descendants of the stage root are loaded with propagated transforms,
//! then performs a one-shot build. Individual meshes that cannot be
//! converted are logged and skipped; the fallback plane and the stage-top
//! measurement do not depend on them.

use bevy::asset::LoadState;
use bevy::log::{info, warn};
use bevy::prelude::*;

use super::setup::PendingStageScene;
use crate::sim::collider;
use crate::sim::session::{AssetPhase, SimSession};
use crate::sim::types::StageRoot;

fn collect_mesh_descendants(
    entity: Entity,
    children_query: &Query<&Children>,
    mesh_query: &Query<&Mesh3d>,
    out: &mut Vec<Entity>,
) {
    if mesh_query.get(entity).is_ok() {
        out.push(entity);
    }

    let Ok(children) = children_query.get(entity) else {
        return;
    };

    for child in children.iter() {
        collect_mesh_descendants(child, children_query, mesh_query, out);
    }
}

pub fn build_stage_colliders(
    asset_server: Res<AssetServer>,
    pending_scene: Option<Res<PendingStageScene>>,
    roots: Query<Entity, With<StageRoot>>,
    children_query: Query<&Children>,
    mesh_query: Query<&Mesh3d>,
    name_query: Query<&Name>,
    global_query: Query<&GlobalTransform>,
    meshes: Res<Assets<Mesh>>,
    mut session: ResMut<SimSession>,
    mut commands: Commands,
) {
    if session.stage_phase() != AssetPhase::Loading {
        return;
    }

    if let Some(pending) = pending_scene.as_ref() {
        if let Some(LoadState::Failed(err)) = asset_server.get_load_state(&pending.0) {
            warn!("stage asset failed to load: {err}");
            session.fail_stage();
            commands.remove_resource::<PendingStageScene>();
            return;
        }
    }

    let Ok(root) = roots.single() else {
        return;
    };

    let mut mesh_entities = Vec::new();
    collect_mesh_descendants(root, &children_query, &mesh_query, &mut mesh_entities);
    if mesh_entities.is_empty() {
        // Scene still instantiating.
        return;
    }

    // One-shot build: hold off until every mesh asset is loaded and its
    // global transform has been propagated.
    for &entity in &mesh_entities {
        let Ok(mesh_handle) = mesh_query.get(entity) else {
            return;
        };
        if meshes.get(&mesh_handle.0).is_none() {
            return;
        }
        if global_query.get(entity).is_err() {
            return;
        }
    }

    let mut shapes = Vec::new();
    let mut stage_top = f32::NEG_INFINITY;
    for &entity in &mesh_entities {
        let Ok(mesh_handle) = mesh_query.get(entity) else {
            continue;
        };
        let Some(mesh) = meshes.get(&mesh_handle.0) else {
            continue;
        };
        let Ok(global) = global_query.get(entity) else {
            continue;
        };
        let label = name_query
            .get(entity)
            .map(|name| name.as_str().to_string())
            .unwrap_or_else(|_| format!("{entity:?}"));

        // The top measurement only needs readable vertices, so a mesh whose
        // collider is rejected still raises the stage top.
        if let Some(max_y) = collider::world_max_y(mesh, global) {
            stage_top = stage_top.max(max_y);
        }

        let built = collider::world_triangles(mesh, global).and_then(|triangles| {
            let triangle_count = triangles.triangle_count();
            triangles.into_shape().map(|shape| (shape, triangle_count))
        });
        match built {
            Ok((shape, triangle_count)) => {
                info!("stage collider from '{label}': {triangle_count} triangles");
                shapes.push(shape);
            }
            Err(err) => warn!("stage mesh '{label}' skipped: {err}"),
        }
    }

    if !stage_top.is_finite() {
        warn!("stage has no measurable geometry; stage collision unavailable");
        session.fail_stage();
        return;
    }

    session.install_stage(shapes, stage_top);
    if pending_scene.is_some() {
        commands.remove_resource::<PendingStageScene>();
    }
}
