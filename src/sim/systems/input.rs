//! Raw input to simulation messages.
//!
//! Left click throws at the cursor; Space throws at the window center; R
//! clears every live die.

use bevy::prelude::*;

use crate::sim::types::{ClearRequested, SpawnRequested};

pub fn read_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    mut spawns: MessageWriter<SpawnRequested>,
    mut clears: MessageWriter<ClearRequested>,
) {
    let Ok(window) = windows.single() else {
        return;
    };

    if mouse.just_pressed(MouseButton::Left) {
        if let Some(cursor) = window.cursor_position() {
            spawns.write(SpawnRequested { cursor });
        }
    }

    if keyboard.just_pressed(KeyCode::Space) {
        let center = Vec2::new(window.width() / 2.0, window.height() / 2.0);
        spawns.write(SpawnRequested { cursor: center });
    }

    if keyboard.just_pressed(KeyCode::KeyR) {
        clears.write(ClearRequested);
    }
}
