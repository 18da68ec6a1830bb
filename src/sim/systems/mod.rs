//! Bevy systems: thin adapters between the app shell and the session.

pub mod camera;
pub mod dice;
pub mod frame;
pub mod input;
pub mod setup;
pub mod stage;
