//! Shared components, messages, and configuration for the dice simulation.

use bevy::prelude::*;

/// Marker for the camera driven by the orbit controls and used for aim rays.
#[derive(Component)]
pub struct MainCamera;

/// Marker for the stage root entity; collider sources are its mesh descendants.
#[derive(Component)]
pub struct StageRoot;

/// Marker for spawned die visual entities.
#[derive(Component)]
pub struct Die;

/// Request to throw a die toward a viewport position.
#[derive(Message, Debug, Clone, Copy)]
pub struct SpawnRequested {
    pub cursor: Vec2,
}

/// Request to remove every live die.
#[derive(Message, Debug, Clone, Copy)]
pub struct ClearRequested;

/// Where the stage geometry comes from.
#[derive(Debug, Clone, Default)]
pub enum StageSource {
    /// Generated slab, available immediately.
    #[default]
    Procedural,
    /// glTF scene loaded from the assets directory.
    Gltf(String),
}

/// Where the die template comes from.
#[derive(Debug, Clone, Default)]
pub enum DieSource {
    /// Generated cuboid die, ready immediately.
    #[default]
    Procedural,
    /// glTF asset loaded from the assets directory.
    Gltf(String),
}

/// Session tunables. Everything has a default; the CLI overrides a few.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub stage: StageSource,
    pub die: DieSource,
    /// Gravity magnitude, applied straight down.
    pub gravity: f32,
    /// Fixed physics interval in seconds.
    pub fixed_dt: f32,
    /// Substep budget per frame; catch-up beyond this is dropped.
    pub max_substeps: u32,
    /// Upper bound on the frame delta fed to the stepper, so a stalled
    /// window cannot trigger a huge catch-up.
    pub max_frame_delta: f32,
    /// Shared contact friction for every collider pair.
    pub friction: f32,
    /// Shared contact restitution; dice settle rather than bounce.
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Die collider density; mass follows from the template's box.
    pub die_density: f32,
    /// Seconds a die lives before automatic removal.
    pub expiry_secs: f64,
    /// Keep at most one thrown set alive, clearing before each spawn.
    pub single_set: bool,
    /// Substeps run synchronously at spawn so a die settles before its
    /// first rendered frame.
    pub preroll_substeps: u32,
    /// Fixed seed for reproducible throws; entropy-seeded when `None`.
    pub rng_seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            stage: StageSource::default(),
            die: DieSource::default(),
            gravity: 9.81,
            fixed_dt: 1.0 / 60.0,
            max_substeps: 8,
            max_frame_delta: 0.25,
            friction: 0.6,
            restitution: 0.3,
            linear_damping: 0.1,
            angular_damping: 0.1,
            die_density: 1.5,
            expiry_secs: 90.0,
            single_set: true,
            preroll_substeps: 5,
            rng_seed: None,
        }
    }
}
