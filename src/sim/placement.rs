//! Spawn placement: where a new die may appear without touching anything.
//!
//! The floor for a spawn is the stage top, raised to the top surface of any
//! live die near the target. The die is placed a clearance above that floor
//! so it cannot start interpenetrating even before the first physics step.

use bevy::prelude::*;

/// Clearance between the new die's underside and the placement floor.
pub const SPAWN_CLEARANCE: f32 = 0.02;
/// Exclusion radius = this factor times the die's larger horizontal extent.
pub const EXCLUSION_RADIUS_FACTOR: f32 = 1.5;
/// Standoff along the view ray when the aim plane cannot be intersected.
pub const AIM_STANDOFF: f32 = 6.0;

const AIM_EPSILON: f32 = 1e-4;

/// Footprint of one live die, seen from above.
#[derive(Debug, Clone, Copy)]
pub struct Occupant {
    /// Body center in the horizontal (XZ) plane.
    pub center: Vec2,
    /// World Y of the die's top surface (body Y + half-height).
    pub top_y: f32,
}

/// Radius inside which existing dice raise the placement floor.
pub fn exclusion_radius(half_extents: Vec3) -> f32 {
    EXCLUSION_RADIUS_FACTOR * 2.0 * half_extents.x.max(half_extents.z)
}

/// Floor height at `target`: the stage top, or the highest top surface of
/// any occupant within `radius`.
pub fn placement_floor(target: Vec2, stage_top: f32, occupants: &[Occupant], radius: f32) -> f32 {
    let mut floor = stage_top;
    for occupant in occupants {
        if occupant.center.distance(target) <= radius {
            floor = floor.max(occupant.top_y);
        }
    }
    floor
}

/// Final spawn position over `target` for a die of the given half-height.
pub fn spawn_position(target: Vec2, floor: f32, half_height: f32) -> Vec3 {
    Vec3::new(target.x, floor + half_height + SPAWN_CLEARANCE, target.y)
}

/// Project the aim ray onto the horizontal plane at `plane_y`.
///
/// A ray nearly parallel to the plane, or one that meets it behind the
/// origin, falls back to a fixed standoff along the ray instead of solving
/// the intersection.
pub fn aim_point(origin: Vec3, direction: Vec3, plane_y: f32) -> Vec3 {
    if direction.y.abs() < AIM_EPSILON {
        return origin + direction * AIM_STANDOFF;
    }
    let t = (plane_y - origin.y) / direction.y;
    if t < 0.0 {
        return origin + direction * AIM_STANDOFF;
    }
    origin + direction * t
}
