//! Per-frame driver: physics, expiry, pose copy.

use bevy::prelude::*;

use crate::sim::session::SimSession;
use crate::sim::types::Die;

/// Advance the simulation and copy body poses onto visuals.
///
/// Physics always advances before poses are copied, and rendering runs after
/// this schedule, so a frame never draws a stale body transform. The frame
/// delta is clamped inside `advance`.
pub fn advance_and_sync(
    time: Res<Time>,
    mut session: ResMut<SimSession>,
    mut commands: Commands,
    mut transforms: Query<&mut Transform, With<Die>>,
) {
    session.advance(time.delta_secs());

    for entity in session.expire(time.elapsed_secs_f64()) {
        commands.entity(entity).despawn();
    }

    for (entity, position, rotation) in session.sync_poses() {
        if let Ok(mut transform) = transforms.get_mut(entity) {
            transform.translation = position;
            transform.rotation = rotation;
        }
    }
}
