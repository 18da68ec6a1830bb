use bevy::prelude::*;
use clap::Parser;

use dicefall::sim::types::{DieSource, SimConfig, StageSource};
use dicefall::sim::DiceFallPlugin;

/// 3D dice-throwing simulation.
///
/// Left click or Space throws a die, R clears the stage, A/D orbit the
/// camera, W/S zoom.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// glTF stage asset under assets/ (a procedural slab when omitted).
    #[arg(long)]
    stage: Option<String>,

    /// glTF die asset under assets/ (a procedural die when omitted).
    #[arg(long)]
    die: Option<String>,

    /// Let thrown dice accumulate instead of clearing before each throw.
    #[arg(long)]
    multi: bool,

    /// Seconds a die lives before automatic removal.
    #[arg(long, default_value_t = 90.0)]
    expiry_secs: f64,

    /// Seed the throw randomness for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    let args = Args::parse();

    let mut config = SimConfig::default();
    if let Some(path) = args.stage {
        config.stage = StageSource::Gltf(path);
    }
    if let Some(path) = args.die {
        config.die = DieSource::Gltf(path);
    }
    config.single_set = !args.multi;
    config.expiry_secs = args.expiry_secs;
    config.rng_seed = args.seed;

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "dicefall".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(DiceFallPlugin { config })
        .run();
}
