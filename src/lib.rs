//! dicefall: throw simulated dice onto a stage.
//!
//! The simulation core (collision geometry, fixed-step physics, placement,
//! body lifecycle) lives in [`sim`]; the binary wraps it in a Bevy app.

pub mod sim;
