//! Scene bootstrap: camera, light, stage source, die template source.
//!
//! Procedural sources are built here directly; glTF sources only begin
//! loading, with `stage` and `dice` systems polling them to readiness. Both
//! kinds flow through the same collider and template pipelines afterwards.

use bevy::gltf::{Gltf, GltfAssetLabel};
use bevy::prelude::*;

use crate::sim::session::{DieTemplate, SimSession};
use crate::sim::types::{DieSource, MainCamera, StageRoot, StageSource};

pub const CAMERA_START: Vec3 = Vec3::new(0.0, 7.0, 11.0);

const STAGE_WIDTH: f32 = 9.0;
const STAGE_DEPTH: f32 = 9.0;
const STAGE_THICKNESS: f32 = 0.4;
const DIE_SIZE: f32 = 0.6;

/// Die glTF still being resolved into a template.
#[derive(Resource)]
pub struct PendingDieGltf(pub Handle<Gltf>);

/// Stage scene handle, kept for load-failure detection.
#[derive(Resource)]
pub struct PendingStageScene(pub Handle<Scene>);

pub fn setup(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut session: ResMut<SimSession>,
) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(CAMERA_START).looking_at(Vec3::ZERO, Vec3::Y),
        MainCamera,
        Name::new("camera"),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 9_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(6.0, 12.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
        Name::new("sun"),
    ));
    commands.insert_resource(AmbientLight {
        brightness: 250.0,
        ..default()
    });

    match session.config().stage.clone() {
        StageSource::Procedural => {
            spawn_procedural_stage(&mut commands, &mut meshes, &mut materials);
        }
        StageSource::Gltf(path) => {
            let scene: Handle<Scene> =
                asset_server.load(GltfAssetLabel::Scene(0).from_asset(path));
            commands.spawn((
                SceneRoot(scene.clone()),
                Transform::IDENTITY,
                StageRoot,
                Name::new("stage"),
            ));
            commands.insert_resource(PendingStageScene(scene));
        }
    }
    session.begin_stage_load();

    match session.config().die.clone() {
        DieSource::Procedural => {
            let mesh = meshes.add(Cuboid::new(DIE_SIZE, DIE_SIZE, DIE_SIZE));
            let material = materials.add(StandardMaterial {
                base_color: Color::srgb(0.93, 0.91, 0.86),
                perceptual_roughness: 0.35,
                ..default()
            });
            session.install_template(DieTemplate::Mesh {
                mesh,
                material,
                half_extents: Vec3::splat(DIE_SIZE / 2.0),
            });
        }
        DieSource::Gltf(path) => {
            let gltf: Handle<Gltf> = asset_server.load(path);
            commands.insert_resource(PendingDieGltf(gltf));
            session.begin_template_load();
        }
    }
}

/// A flat slab whose top surface doubles as the measured stage top.
fn spawn_procedural_stage(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    let slab = meshes.add(Cuboid::new(STAGE_WIDTH, STAGE_THICKNESS, STAGE_DEPTH));
    let felt = materials.add(StandardMaterial {
        base_color: Color::srgb(0.16, 0.34, 0.2),
        perceptual_roughness: 0.9,
        ..default()
    });
    commands
        .spawn((
            Transform::IDENTITY,
            Visibility::default(),
            StageRoot,
            Name::new("stage"),
        ))
        .with_children(|parent| {
            parent.spawn((
                Mesh3d(slab),
                MeshMaterial3d(felt),
                Transform::from_xyz(0.0, -STAGE_THICKNESS / 2.0, 0.0),
                Name::new("stage_slab"),
            ));
        });
}
