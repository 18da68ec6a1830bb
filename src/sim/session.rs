//! The simulation session: every piece of mutable dice state in one place.
//!
//! One `SimSession` exists per process, owning the physics world, the live
//! die collection, the stage metrics, the die template, and the throw RNG.
//! Systems are thin adapters around its methods; nothing else holds
//! simulation state.

use bevy::log::{info, warn};
use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rapier3d::prelude::{RigidBodyHandle, SharedShape};
use std::f32::consts::TAU;

use crate::sim::physics::{ContactMaterial, PhysicsWorld};
use crate::sim::placement::{self, Occupant};
use crate::sim::types::SimConfig;

/// Spin range for the randomized angular velocity, per axis.
const ANGVEL_RANGE: f32 = 8.0;
/// Horizontal jitter added to the caller's throw so repeated throws differ.
const THROW_JITTER: f32 = 0.4;

/// Readiness of an asynchronously prepared asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetPhase {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

/// Prototype cloned for every spawned die.
#[derive(Debug, Clone)]
pub enum DieTemplate {
    /// Generated mesh and material.
    Mesh {
        mesh: Handle<Mesh>,
        material: Handle<StandardMaterial>,
        half_extents: Vec3,
    },
    /// Loaded glTF scene.
    Scene {
        scene: Handle<Scene>,
        half_extents: Vec3,
    },
}

impl DieTemplate {
    pub fn half_extents(&self) -> Vec3 {
        match self {
            Self::Mesh { half_extents, .. } | Self::Scene { half_extents, .. } => *half_extents,
        }
    }
}

/// Stage-top measurement, fixed once the stage build completes.
#[derive(Debug, Clone, Copy)]
pub struct StageMetrics {
    /// Maximum world-space Y of the stage geometry.
    pub top_y: f32,
    /// Per-mesh colliders installed (the fallback plane not included).
    pub collider_count: usize,
}

/// One live die: a visual entity and a dynamic body, removed as a pair.
#[derive(Debug, Clone)]
pub struct DieInstance {
    pub entity: Entity,
    pub body: RigidBodyHandle,
    pub half_height: f32,
    pub spawned_at: f64,
    pub expires_at: f64,
}

/// Result of a successful spawn.
#[derive(Debug, Clone)]
pub struct DieSpawn {
    /// Resolver output before the pre-roll ran.
    pub placement: Vec3,
    /// Pose after the pre-roll and corrective clamp; apply to the visual.
    pub position: Vec3,
    pub rotation: Quat,
    /// Entities displaced by the single-set policy; despawn their visuals.
    pub cleared: Vec<Entity>,
}

#[derive(Resource)]
pub struct SimSession {
    config: SimConfig,
    physics: PhysicsWorld,
    stage_phase: AssetPhase,
    stage: Option<StageMetrics>,
    template_phase: AssetPhase,
    template: Option<DieTemplate>,
    dice: Vec<DieInstance>,
    rng: SmallRng,
}

impl SimSession {
    pub fn new(config: SimConfig) -> Self {
        let material = ContactMaterial {
            friction: config.friction,
            restitution: config.restitution,
        };
        let physics = PhysicsWorld::new(config.gravity, material);
        let rng = match config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self {
            config,
            physics,
            stage_phase: AssetPhase::Unloaded,
            stage: None,
            template_phase: AssetPhase::Unloaded,
            template: None,
            dice: Vec::new(),
            rng,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    // --- stage readiness -------------------------------------------------

    pub fn stage_phase(&self) -> AssetPhase {
        self.stage_phase
    }

    pub fn stage_metrics(&self) -> Option<StageMetrics> {
        self.stage
    }

    pub fn begin_stage_load(&mut self) {
        self.stage_phase = AssetPhase::Loading;
    }

    /// Install the per-mesh stage colliders plus the unconditional fallback
    /// plane at the measured stage top. One-shot; repeats are ignored.
    pub fn install_stage(&mut self, shapes: Vec<SharedShape>, top_y: f32) -> StageMetrics {
        if let Some(existing) = self.stage {
            warn!("stage already installed; ignoring rebuild");
            return existing;
        }
        let collider_count = shapes.len();
        for shape in shapes {
            self.physics.add_static_shape(shape);
        }
        self.physics.add_ground_plane(top_y);
        let metrics = StageMetrics {
            top_y,
            collider_count,
        };
        self.stage = Some(metrics);
        self.stage_phase = AssetPhase::Ready;
        info!(
            "stage ready: mesh colliders={} fallback plane at y={:.2}",
            collider_count, top_y
        );
        metrics
    }

    pub fn fail_stage(&mut self) {
        if self.stage_phase != AssetPhase::Ready {
            self.stage_phase = AssetPhase::Failed;
        }
    }

    // --- template readiness ----------------------------------------------

    pub fn template_phase(&self) -> AssetPhase {
        self.template_phase
    }

    pub fn template(&self) -> Option<&DieTemplate> {
        self.template.as_ref()
    }

    pub fn begin_template_load(&mut self) {
        self.template_phase = AssetPhase::Loading;
    }

    pub fn install_template(&mut self, template: DieTemplate) {
        info!(
            "die template ready: half_extents={:?}",
            template.half_extents()
        );
        self.template = Some(template);
        self.template_phase = AssetPhase::Ready;
    }

    pub fn fail_template(&mut self) {
        self.template_phase = AssetPhase::Failed;
    }

    // --- lifecycle -------------------------------------------------------

    /// Spawn a die aimed at `aim` with initial velocity `throw`.
    ///
    /// `entity` is the pre-minted visual entity the instance is bound to.
    /// Returns `None`, logged, when the die template or the stage is not
    /// ready; the live collection is left untouched in that case.
    pub fn try_spawn(
        &mut self,
        entity: Entity,
        aim: Vec3,
        throw: Vec3,
        now: f64,
    ) -> Option<DieSpawn> {
        let half_extents = match (&self.template, self.template_phase) {
            (Some(template), AssetPhase::Ready) => template.half_extents(),
            _ => {
                warn!(
                    "spawn rejected: die template not ready ({:?})",
                    self.template_phase
                );
                return None;
            }
        };
        let Some(stage) = self.stage.filter(|_| self.stage_phase == AssetPhase::Ready) else {
            warn!("spawn rejected: stage not ready ({:?})", self.stage_phase);
            return None;
        };

        let cleared = if self.config.single_set {
            self.clear_all()
        } else {
            Vec::new()
        };

        let half_height = half_extents.y;
        let target = Vec2::new(aim.x, aim.z);
        let radius = placement::exclusion_radius(half_extents);
        let occupants = self.occupants();
        let floor = placement::placement_floor(target, stage.top_y, &occupants, radius);
        let placement = placement::spawn_position(target, floor, half_height);

        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rng.random_range(0.0..TAU),
            self.rng.random_range(0.0..TAU),
            self.rng.random_range(0.0..TAU),
        );
        let angvel = Vec3::new(
            self.rng.random_range(-ANGVEL_RANGE..ANGVEL_RANGE),
            self.rng.random_range(-ANGVEL_RANGE..ANGVEL_RANGE),
            self.rng.random_range(-ANGVEL_RANGE..ANGVEL_RANGE),
        );
        let throw = throw
            + Vec3::new(
                self.rng.random_range(-THROW_JITTER..THROW_JITTER),
                0.0,
                self.rng.random_range(-THROW_JITTER..THROW_JITTER),
            );

        let body = self.physics.add_die_body(
            placement,
            rotation,
            throw,
            angvel,
            half_extents,
            self.config.die_density,
            self.config.linear_damping,
            self.config.angular_damping,
        );

        // Let the solver act before the first rendered frame, then pull the
        // body back up if it was pushed below the computed safe floor.
        self.physics
            .step_immediate(self.config.fixed_dt, self.config.preroll_substeps);
        let safe_y = floor + half_height;
        if self.physics.clamp_body_above(body, safe_y) {
            info!("spawn corrected: die re-clamped to y={safe_y:.2}");
        }
        let (position, rotation) = self.physics.body_pose(body).unwrap_or((placement, rotation));

        let instance = DieInstance {
            entity,
            body,
            half_height,
            spawned_at: now,
            expires_at: now + self.config.expiry_secs,
        };
        info!(
            "die spawned: {:?} at ({:.2}, {:.2}, {:.2}), floor={:.2}, expires in {:.0}s",
            entity, position.x, position.y, position.z, floor, self.config.expiry_secs
        );
        self.dice.push(instance);

        Some(DieSpawn {
            placement,
            position,
            rotation,
            cleared,
        })
    }

    fn occupants(&self) -> Vec<Occupant> {
        self.dice
            .iter()
            .filter_map(|die| {
                let (position, _) = self.physics.body_pose(die.body)?;
                Some(Occupant {
                    center: Vec2::new(position.x, position.z),
                    top_y: position.y + die.half_height,
                })
            })
            .collect()
    }

    /// Remove every live die body, returning the visual entities to despawn.
    /// Idempotent: a second call is a no-op.
    pub fn clear_all(&mut self) -> Vec<Entity> {
        if self.dice.is_empty() {
            return Vec::new();
        }
        let mut entities = Vec::with_capacity(self.dice.len());
        for die in self.dice.drain(..) {
            self.physics.remove_body(die.body);
            entities.push(die.entity);
        }
        info!("cleared {} dice", entities.len());
        entities
    }

    /// Remove dice whose expiry timestamp has passed, exactly once each.
    pub fn expire(&mut self, now: f64) -> Vec<Entity> {
        let physics = &mut self.physics;
        let mut expired = Vec::new();
        self.dice.retain(|die| {
            if now >= die.expires_at {
                physics.remove_body(die.body);
                expired.push(die.entity);
                false
            } else {
                true
            }
        });
        if !expired.is_empty() {
            info!(
                "removed {} dice after the {:.0}s timeout",
                expired.len(),
                self.config.expiry_secs
            );
        }
        expired
    }

    /// Advance physics by one frame's clamped wall-time delta.
    pub fn advance(&mut self, frame_delta: f32) -> u32 {
        let clamped = frame_delta.min(self.config.max_frame_delta);
        self.physics
            .step(self.config.fixed_dt, clamped, self.config.max_substeps)
    }

    /// Current body pose for every live die, for the one-way visual copy.
    pub fn sync_poses(&self) -> Vec<(Entity, Vec3, Quat)> {
        self.dice
            .iter()
            .filter_map(|die| {
                let (position, rotation) = self.physics.body_pose(die.body)?;
                Some((die.entity, position, rotation))
            })
            .collect()
    }

    pub fn live(&self) -> &[DieInstance] {
        &self.dice
    }

    pub fn live_count(&self) -> usize {
        self.dice.len()
    }
}
