//! 3D dice-throwing simulation.
//!
//! Dice are thrown onto a stage, fall under gravity, collide, settle, and
//! age out. The physics world is hand-driven rapier3d behind [`SimSession`],
//! advanced on a fixed interval from the variable frame clock; visuals are a
//! one-way copy of body poses.

pub mod collider;
pub mod physics;
pub mod placement;
pub mod session;
pub mod systems;
pub mod types;

use bevy::prelude::*;

use crate::sim::session::SimSession;
use crate::sim::types::{ClearRequested, SimConfig, SpawnRequested};

/// Installs the session resource, the simulation messages, and the ordered
/// frame pipeline: asset polling → input → spawn/clear → step & sync.
pub struct DiceFallPlugin {
    pub config: SimConfig,
}

impl Plugin for DiceFallPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SimSession::new(self.config.clone()))
            .add_message::<SpawnRequested>()
            .add_message::<ClearRequested>()
            .add_systems(Startup, systems::setup::setup)
            .add_systems(
                Update,
                (
                    systems::stage::build_stage_colliders,
                    systems::dice::poll_die_template,
                    systems::input::read_input,
                    systems::dice::handle_spawn_requests,
                    systems::dice::handle_clear_requests,
                    systems::frame::advance_and_sync,
                )
                    .chain(),
            )
            .add_systems(Update, systems::camera::orbit_camera);
    }
}
