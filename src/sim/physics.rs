//! Hand-driven rapier3d world.
//!
//! The session owns stepping instead of a physics plugin so the spawn path
//! can run substeps synchronously before the first rendered frame. Wall time
//! is fed through a fixed-interval accumulator with a bounded substep budget;
//! a single substep never exceeds the fixed interval.

use bevy::prelude::{Quat, Vec3};
use rapier3d::math::{Isometry, Real, Vector};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::{
    CCDSolver, ColliderBuilder, ColliderSet, DefaultBroadPhase, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline,
    RigidBodyBuilder, RigidBodyHandle, RigidBodySet, SharedShape,
};
use std::num::NonZeroUsize;

/// Contact material shared by every collider pair.
#[derive(Debug, Clone, Copy)]
pub struct ContactMaterial {
    pub friction: f32,
    pub restitution: f32,
}

pub fn to_physics(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

pub fn to_render(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn to_physics_rotation(q: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub fn to_render_rotation(q: &UnitQuaternion<Real>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    material: ContactMaterial,
    accumulator: f32,
}

impl PhysicsWorld {
    pub fn new(gravity: f32, material: ContactMaterial) -> Self {
        // More solver iterations and a tighter positional tolerance than the
        // defaults: dice rest in persistent contact and must not jitter or
        // sink into the stage.
        let params = IntegrationParameters {
            num_solver_iterations: NonZeroUsize::new(8).unwrap_or(NonZeroUsize::MIN),
            num_additional_friction_iterations: 4,
            normalized_allowed_linear_error: 0.0005,
            contact_natural_frequency: 40.0,
            contact_damping_ratio: 5.0,
            ..IntegrationParameters::default()
        };

        Self {
            gravity: Vector::new(0.0, -gravity.abs(), 0.0),
            params,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            material,
            accumulator: 0.0,
        }
    }

    /// Advance by `elapsed` wall seconds in fixed `fixed_dt` substeps.
    ///
    /// At most `max_substeps` substeps run per call; debt beyond one interval
    /// is dropped afterwards so a stall never schedules an unbounded
    /// catch-up. Returns the number of substeps taken.
    pub fn step(&mut self, fixed_dt: f32, elapsed: f32, max_substeps: u32) -> u32 {
        self.accumulator += elapsed.max(0.0);
        let mut taken = 0;
        while self.accumulator >= fixed_dt && taken < max_substeps {
            self.substep(fixed_dt);
            self.accumulator -= fixed_dt;
            taken += 1;
        }
        if self.accumulator > fixed_dt {
            self.accumulator = fixed_dt;
        }
        taken
    }

    /// Run exactly `count` fixed substeps, bypassing the accumulator.
    ///
    /// This is the spawn pre-roll entry point; it is independent of the
    /// real-time clock by design.
    pub fn step_immediate(&mut self, fixed_dt: f32, count: u32) {
        for _ in 0..count {
            self.substep(fixed_dt);
        }
    }

    fn substep(&mut self, dt: f32) {
        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &(),
        );
    }

    /// Insert a fixed body carrying an already world-space shape.
    pub fn add_static_shape(&mut self, shape: SharedShape) -> RigidBodyHandle {
        let body = self.bodies.insert(RigidBodyBuilder::fixed().build());
        let collider = ColliderBuilder::new(shape)
            .friction(self.material.friction)
            .restitution(self.material.restitution)
            .build();
        self.colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        body
    }

    /// Insert the infinite ground plane at `height`, normal up.
    pub fn add_ground_plane(&mut self, height: f32) -> RigidBodyHandle {
        let body = self.bodies.insert(
            RigidBodyBuilder::fixed()
                .translation(Vector::new(0.0, height, 0.0))
                .build(),
        );
        let collider = ColliderBuilder::halfspace(Vector::y_axis())
            .friction(self.material.friction)
            .restitution(self.material.restitution)
            .build();
        self.colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        body
    }

    /// Insert a dynamic die body with a box collider.
    #[allow(clippy::too_many_arguments)]
    pub fn add_die_body(
        &mut self,
        position: Vec3,
        rotation: Quat,
        linvel: Vec3,
        angvel: Vec3,
        half_extents: Vec3,
        density: f32,
        linear_damping: f32,
        angular_damping: f32,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .position(Isometry::from_parts(
                Translation3::new(position.x, position.y, position.z),
                to_physics_rotation(rotation),
            ))
            .linvel(to_physics(linvel))
            .angvel(to_physics(angvel))
            .linear_damping(linear_damping)
            .angular_damping(angular_damping)
            .can_sleep(true)
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .density(density)
            .friction(self.material.friction)
            .restitution(self.material.restitution)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Remove a body together with its attached colliders.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub fn body_pose(&self, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        let body = self.bodies.get(handle)?;
        Some((
            to_render(body.translation()),
            to_render_rotation(body.rotation()),
        ))
    }

    pub fn body_linvel(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|body| to_render(body.linvel()))
    }

    /// Raise a body back above `min_y` if the solver pushed it lower.
    /// Returns whether a correction was applied.
    pub fn clamp_body_above(&mut self, handle: RigidBodyHandle, min_y: f32) -> bool {
        let Some(body) = self.bodies.get_mut(handle) else {
            return false;
        };
        let mut translation = *body.translation();
        if translation.y >= min_y {
            return false;
        }
        translation.y = min_y;
        body.set_translation(translation, true);
        true
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some()
    }

    pub fn dynamic_body_count(&self) -> usize {
        self.bodies.iter().filter(|(_, body)| body.is_dynamic()).count()
    }

    pub fn static_body_count(&self) -> usize {
        self.bodies.iter().filter(|(_, body)| body.is_fixed()).count()
    }

    #[cfg(test)]
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(
            9.81,
            ContactMaterial {
                friction: 0.6,
                restitution: 0.3,
            },
        )
    }

    fn drop_die(world: &mut PhysicsWorld, y: f32) -> RigidBodyHandle {
        world.add_die_body(
            Vec3::new(0.0, y, 0.0),
            Quat::IDENTITY,
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::splat(0.3),
            1.5,
            0.1,
            0.1,
        )
    }

    #[test]
    fn partial_interval_takes_no_substep() {
        let mut world = world();
        assert_eq!(world.step(DT, DT * 0.5, 8), 0);
        assert_eq!(world.step(DT, DT * 0.6, 8), 1);
        assert!(world.accumulator() < DT);
    }

    #[test]
    fn substep_budget_is_respected_and_debt_dropped() {
        let mut world = world();
        assert_eq!(world.step(DT, DT * 10.0, 3), 3);
        // Leftover debt collapses to at most one interval.
        assert!(world.accumulator() <= DT + f32::EPSILON);
        assert_eq!(world.step(DT, 0.0, 8), 1);
        assert_eq!(world.step(DT, 0.0, 8), 0);
    }

    #[test]
    fn immediate_steps_bypass_accumulator() {
        let mut world = world();
        let die = drop_die(&mut world, 5.0);
        world.step_immediate(DT, 30);
        let (position, _) = world.body_pose(die).unwrap();
        assert!(position.y < 5.0 - 0.5, "die should have fallen, at {position:?}");
        assert_eq!(world.accumulator(), 0.0);
    }

    #[test]
    fn die_settles_on_ground_plane() {
        let mut world = world();
        world.add_ground_plane(0.0);
        let die = drop_die(&mut world, 1.0);
        world.step_immediate(DT, 600);
        let (position, _) = world.body_pose(die).unwrap();
        assert!(
            (position.y - 0.3).abs() < 0.05,
            "die should rest with its half-extent above the plane, at {position:?}"
        );
        let linvel = world.body_linvel(die).unwrap();
        assert!(linvel.length() < 0.1, "die should be at rest, velocity {linvel:?}");
    }

    #[test]
    fn clamp_raises_only_low_bodies() {
        let mut world = world();
        let die = drop_die(&mut world, 1.0);
        assert!(!world.clamp_body_above(die, 0.5));
        assert!(world.clamp_body_above(die, 2.0));
        let (position, _) = world.body_pose(die).unwrap();
        assert_eq!(position.y, 2.0);
    }

    #[test]
    fn remove_body_clears_handle_and_counts() {
        let mut world = world();
        world.add_ground_plane(0.0);
        let die = drop_die(&mut world, 1.0);
        assert_eq!(world.dynamic_body_count(), 1);
        assert_eq!(world.static_body_count(), 1);
        world.remove_body(die);
        assert!(!world.contains(die));
        assert_eq!(world.dynamic_body_count(), 0);
        assert!(world.body_pose(die).is_none());
    }
}
