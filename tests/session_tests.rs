//! Headless integration tests for the simulation session.
//!
//! These drive `SimSession` through the same call sequence the Bevy systems
//! perform each frame, minting visual entities from a bare ECS world instead
//! of a window and renderer.

use bevy::prelude::*;

use dicefall::sim::collider;
use dicefall::sim::placement::SPAWN_CLEARANCE;
use dicefall::sim::session::{AssetPhase, DieTemplate, SimSession};
use dicefall::sim::types::SimConfig;

const HALF: f32 = 0.3;
const STAGE_TOP: f32 = 2.0;

fn config(single_set: bool) -> SimConfig {
    SimConfig {
        single_set,
        rng_seed: Some(11),
        ..SimConfig::default()
    }
}

fn cube_template() -> DieTemplate {
    DieTemplate::Mesh {
        mesh: Handle::default(),
        material: Handle::default(),
        half_extents: Vec3::splat(HALF),
    }
}

/// Session with a bare stage (fallback plane only) at `STAGE_TOP` and a
/// ready cube template.
fn ready_session(single_set: bool) -> SimSession {
    let mut session = SimSession::new(config(single_set));
    session.begin_stage_load();
    session.install_stage(Vec::new(), STAGE_TOP);
    session.install_template(cube_template());
    session
}

#[test]
fn test_spawn_before_ready_is_rejected() {
    let mut world = World::new();
    let mut session = SimSession::new(config(true));

    let entity = world.spawn_empty().id();
    assert!(
        session.try_spawn(entity, Vec3::ZERO, Vec3::ZERO, 0.0).is_none(),
        "nothing is loaded yet"
    );
    assert_eq!(session.live_count(), 0);
    assert_eq!(session.physics().dynamic_body_count(), 0);

    // The template alone is not enough; the stage build must finish too.
    session.install_template(cube_template());
    let entity = world.spawn_empty().id();
    assert!(session.try_spawn(entity, Vec3::ZERO, Vec3::ZERO, 0.0).is_none());
    assert_eq!(session.live_count(), 0, "rejected spawns leave no instance behind");
}

#[test]
fn test_failed_assets_keep_spawning_unavailable() {
    let mut world = World::new();
    let mut session = SimSession::new(config(true));
    session.begin_stage_load();
    session.install_stage(Vec::new(), STAGE_TOP);
    session.begin_template_load();
    session.fail_template();
    assert_eq!(session.template_phase(), AssetPhase::Failed);

    let entity = world.spawn_empty().id();
    assert!(
        session.try_spawn(entity, Vec3::ZERO, Vec3::ZERO, 0.0).is_none(),
        "a failed template load is permanent for the session"
    );
    assert_eq!(session.live_count(), 0);
}

#[test]
fn test_spawn_lands_on_the_computed_floor() {
    let mut world = World::new();
    let mut session = ready_session(true);

    let entity = world.spawn_empty().id();
    let spawn = session
        .try_spawn(entity, Vec3::ZERO, Vec3::ZERO, 0.0)
        .expect("session is ready");

    // Resolver output: exactly one clearance above the stage top, at the target.
    assert_eq!(spawn.placement.x, 0.0);
    assert_eq!(spawn.placement.z, 0.0);
    assert!((spawn.placement.y - (STAGE_TOP + HALF + SPAWN_CLEARANCE)).abs() < 1e-6);

    // After the pre-roll the corrective clamp keeps the die at or above the
    // floor; it is never embedded in the stage on its first rendered frame.
    assert!(
        spawn.position.y >= STAGE_TOP + HALF - 1e-4,
        "die sank below the floor: {:?}",
        spawn.position
    );
    assert_eq!(session.live_count(), 1);
}

#[test]
fn test_fresh_die_stacks_on_a_nearby_die() {
    let mut world = World::new();
    let mut session = ready_session(false);

    let first = world.spawn_empty().id();
    let spawn_a = session
        .try_spawn(first, Vec3::ZERO, Vec3::ZERO, 0.0)
        .expect("session is ready");
    let top_a = spawn_a.position.y + HALF;

    let second = world.spawn_empty().id();
    let spawn_b = session
        .try_spawn(second, Vec3::ZERO, Vec3::ZERO, 0.0)
        .expect("session is ready");

    assert!(spawn_b.cleared.is_empty(), "multi mode must not clear");
    assert!(
        (spawn_b.placement.y - (top_a + HALF + SPAWN_CLEARANCE)).abs() < 1e-4,
        "second die's floor must be the first die's top surface, placement {:?}",
        spawn_b.placement
    );
    assert!(
        spawn_b.placement.y > spawn_a.placement.y + 0.5,
        "stacked placement must beat the raw stage floor"
    );
    assert_eq!(session.live_count(), 2);
}

#[test]
fn test_single_set_spawn_displaces_the_previous_die() {
    let mut world = World::new();
    let mut session = ready_session(true);

    let first = world.spawn_empty().id();
    session
        .try_spawn(first, Vec3::ZERO, Vec3::ZERO, 0.0)
        .expect("session is ready");

    let second = world.spawn_empty().id();
    let spawn = session
        .try_spawn(second, Vec3::new(1.0, 0.0, 1.0), Vec3::ZERO, 0.0)
        .expect("session is ready");

    assert_eq!(spawn.cleared, vec![first], "previous throw is displaced");
    assert_eq!(session.live_count(), 1);
    assert_eq!(session.live()[0].entity, second);
    assert_eq!(session.physics().dynamic_body_count(), 1);
}

#[test]
fn test_clear_all_is_complete_and_idempotent() {
    let mut world = World::new();
    let mut session = ready_session(false);

    let mut bodies = Vec::new();
    for i in 0..3 {
        let entity = world.spawn_empty().id();
        session
            .try_spawn(entity, Vec3::new(i as f32 * 2.0, 0.0, 0.0), Vec3::ZERO, 0.0)
            .expect("session is ready");
        bodies.push(session.live().last().expect("just spawned").body);
    }
    assert_eq!(session.live_count(), 3);

    let cleared = session.clear_all();
    assert_eq!(cleared.len(), 3);
    assert_eq!(session.live_count(), 0);
    assert_eq!(session.physics().dynamic_body_count(), 0);
    for body in &bodies {
        assert!(
            !session.physics().contains(*body),
            "cleared body must leave the physics world"
        );
    }

    // Second call: no error, no change.
    assert!(session.clear_all().is_empty());
    assert_eq!(session.live_count(), 0);
}

#[test]
fn test_expiry_removes_a_die_exactly_once() {
    let mut world = World::new();
    let mut session = ready_session(true);
    let expiry = session.config().expiry_secs;

    let entity = world.spawn_empty().id();
    session
        .try_spawn(entity, Vec3::ZERO, Vec3::ZERO, 10.0)
        .expect("session is ready");

    assert!(
        session.expire(10.0 + expiry - 0.1).is_empty(),
        "die must outlive the timeout window"
    );
    assert_eq!(session.live_count(), 1);

    let removed = session.expire(10.0 + expiry);
    assert_eq!(removed, vec![entity], "removed exactly at the deadline");
    assert_eq!(session.live_count(), 0);
    assert_eq!(session.physics().dynamic_body_count(), 0);

    assert!(
        session.expire(10.0 + expiry + 5.0).is_empty(),
        "no double removal after the deadline"
    );
}

#[test]
fn test_synced_transforms_match_body_poses() {
    let mut world = World::new();
    let mut session = ready_session(false);

    for x in [-1.5f32, 1.5] {
        let entity = world.spawn(Transform::IDENTITY).id();
        session
            .try_spawn(entity, Vec3::new(x, 0.0, 0.0), Vec3::ZERO, 0.0)
            .expect("session is ready");
    }

    // A few frames of wall time, then the per-frame one-way copy.
    for _ in 0..30 {
        session.advance(1.0 / 60.0);
    }
    for (entity, position, rotation) in session.sync_poses() {
        let mut transform = world.get_mut::<Transform>(entity).expect("visual is live");
        transform.translation = position;
        transform.rotation = rotation;
    }

    for die in session.live() {
        let (position, rotation) = session.physics().body_pose(die.body).expect("body is live");
        let transform = world.get::<Transform>(die.entity).expect("visual is live");
        assert_eq!(transform.translation, position, "no drift after sync");
        assert_eq!(transform.rotation, rotation, "no stale rotation after sync");
    }
}

#[test]
fn test_die_settles_on_a_trimesh_stage() {
    let mut world = World::new();
    let mut session = SimSession::new(config(true));

    let mesh = Mesh::from(Cuboid::new(6.0, 1.0, 6.0));
    let transform = GlobalTransform::from(Transform::from_xyz(0.0, 0.5, 0.0));
    let triangles = collider::world_triangles(&mesh, &transform).expect("slab converts");
    let top = triangles.max_y();
    assert!((top - 1.0).abs() < 1e-6, "slab top sits at one unit");
    let shape = triangles.into_shape().expect("slab shape builds");

    session.begin_stage_load();
    session.install_stage(vec![shape], top);
    session.install_template(cube_template());

    let entity = world.spawn_empty().id();
    session
        .try_spawn(entity, Vec3::ZERO, Vec3::ZERO, 0.0)
        .expect("session is ready");

    // Several seconds of simulated frames; the die must come to rest with
    // its half-height above the measured stage top.
    for _ in 0..240 {
        session.advance(1.0 / 30.0);
    }
    let die = &session.live()[0];
    let (position, _) = session.physics().body_pose(die.body).expect("body is live");
    assert!(
        (position.y - (top + HALF)).abs() < 0.08,
        "die should rest on the slab, at {position:?}"
    );
}

#[test]
fn test_seeded_sessions_throw_identically() {
    let mut world = World::new();
    let mut session_a = ready_session(true);
    let mut session_b = ready_session(true);

    let aim = Vec3::new(0.4, 0.0, -0.7);
    let spawn_a = session_a
        .try_spawn(world.spawn_empty().id(), aim, Vec3::ZERO, 0.0)
        .expect("session is ready");
    let spawn_b = session_b
        .try_spawn(world.spawn_empty().id(), aim, Vec3::ZERO, 0.0)
        .expect("session is ready");

    assert_eq!(spawn_a.position, spawn_b.position);
    assert_eq!(spawn_a.rotation, spawn_b.rotation);
}
