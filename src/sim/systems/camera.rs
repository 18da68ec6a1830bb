//! Keyboard orbit and zoom for the main camera.

use bevy::prelude::*;

use crate::sim::types::MainCamera;

const ORBIT_SPEED: f32 = 1.2;
const ZOOM_SPEED: f32 = 8.0;
const MIN_DISTANCE: f32 = 4.0;
const MAX_DISTANCE: f32 = 26.0;
const FOCUS: Vec3 = Vec3::ZERO;

pub fn orbit_camera(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut cameras: Query<&mut Transform, With<MainCamera>>,
) {
    let Ok(mut transform) = cameras.single_mut() else {
        return;
    };
    let dt = time.delta_secs();

    let mut yaw = 0.0;
    if keyboard.pressed(KeyCode::KeyA) {
        yaw += ORBIT_SPEED * dt;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        yaw -= ORBIT_SPEED * dt;
    }

    let mut offset = transform.translation - FOCUS;
    if yaw != 0.0 {
        offset = Quat::from_rotation_y(yaw) * offset;
    }

    let mut distance = offset.length();
    if keyboard.pressed(KeyCode::KeyW) {
        distance -= ZOOM_SPEED * dt;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        distance += ZOOM_SPEED * dt;
    }
    distance = distance.clamp(MIN_DISTANCE, MAX_DISTANCE);

    if offset.length() > f32::EPSILON {
        transform.translation = FOCUS + offset.normalize() * distance;
        transform.look_at(FOCUS, Vec3::Y);
    }
}
