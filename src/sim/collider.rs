//! Static collision geometry from render meshes.
//!
//! Stage visuals arrive as arbitrary triangle meshes (glTF scenes or
//! generated slabs). Each one is flattened into world-space triangles and
//! turned into a trimesh shape; a mesh that cannot be converted is reported
//! per mesh so the caller can skip it without aborting the stage build.

use bevy::prelude::*;
use bevy_mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use rapier3d::math::{Point, Real};
use rapier3d::parry::shape::TriMeshBuilderError;
use rapier3d::prelude::SharedShape;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ColliderError {
    #[error("mesh has no position attribute")]
    MissingPositions,
    #[error("mesh topology is {0:?}, expected TriangleList")]
    NonTriangleList(PrimitiveTopology),
    #[error("mesh has no complete triangle")]
    Empty,
    #[error("triangle index {0} is out of range")]
    IndexOutOfRange(u32),
    #[error("mesh contains a non-finite vertex")]
    NonFinite,
    #[error("collision shape construction failed: {0}")]
    Shape(#[from] TriMeshBuilderError),
}

/// Triangles of one mesh, world-transformed and flattened so that triangle i
/// occupies vertices [3i, 3i+1, 3i+2].
pub struct WorldTriangles {
    vertices: Vec<Point<Real>>,
    max_y: f32,
}

impl WorldTriangles {
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Highest world-space Y over every vertex.
    pub fn max_y(&self) -> f32 {
        self.max_y
    }

    /// Sequential connectivity over the flattened vertex list.
    pub fn indices(&self) -> Vec<[u32; 3]> {
        (0..self.triangle_count() as u32)
            .map(|i| [3 * i, 3 * i + 1, 3 * i + 2])
            .collect()
    }

    pub fn into_shape(self) -> Result<SharedShape, ColliderError> {
        let indices = self.indices();
        Ok(SharedShape::trimesh(self.vertices, indices)?)
    }
}

/// Flatten a render mesh into world-space triangles.
///
/// Indexed meshes (`U16` or `U32`) are expanded so every triangle owns three
/// unshared vertices; non-indexed meshes are taken in vertex order. Every
/// vertex is transformed by the node's accumulated world matrix first, so
/// the resulting shape lives in world space rather than mesh-local space.
pub fn world_triangles(
    mesh: &Mesh,
    transform: &GlobalTransform,
) -> Result<WorldTriangles, ColliderError> {
    let topology = mesh.primitive_topology();
    if topology != PrimitiveTopology::TriangleList {
        return Err(ColliderError::NonTriangleList(topology));
    }
    let Some(VertexAttributeValues::Float32x3(positions)) =
        mesh.attribute(Mesh::ATTRIBUTE_POSITION)
    else {
        return Err(ColliderError::MissingPositions);
    };

    let expanded: Vec<u32> = match mesh.indices() {
        Some(Indices::U16(values)) => values.iter().map(|&i| i as u32).collect(),
        Some(Indices::U32(values)) => values.clone(),
        None => (0..positions.len() as u32).collect(),
    };

    let triangle_count = expanded.len() / 3;
    if triangle_count == 0 {
        return Err(ColliderError::Empty);
    }

    let mut vertices = Vec::with_capacity(triangle_count * 3);
    let mut max_y = f32::NEG_INFINITY;
    // A trailing partial triangle is ignored.
    for &index in expanded.iter().take(triangle_count * 3) {
        let Some(p) = positions.get(index as usize) else {
            return Err(ColliderError::IndexOutOfRange(index));
        };
        let world = transform.transform_point(Vec3::new(p[0], p[1], p[2]));
        if !world.is_finite() {
            return Err(ColliderError::NonFinite);
        }
        max_y = max_y.max(world.y);
        vertices.push(Point::new(world.x, world.y, world.z));
    }

    Ok(WorldTriangles { vertices, max_y })
}

/// Highest world-space Y of a mesh's readable vertices.
///
/// Stage-top measurement is independent of shape construction: a mesh whose
/// collider is rejected still contributes to the measured stage top as long
/// as it has finite positions.
pub fn world_max_y(mesh: &Mesh, transform: &GlobalTransform) -> Option<f32> {
    let Some(VertexAttributeValues::Float32x3(positions)) =
        mesh.attribute(Mesh::ATTRIBUTE_POSITION)
    else {
        return None;
    };
    let mut max_y = f32::NEG_INFINITY;
    for p in positions.iter() {
        let world = transform.transform_point(Vec3::new(p[0], p[1], p[2]));
        if world.y.is_finite() {
            max_y = max_y.max(world.y);
        }
    }
    max_y.is_finite().then_some(max_y)
}

/// Axis-aligned bounds of a mesh in its local space, for template sizing.
pub fn mesh_bounds(mesh: &Mesh) -> Result<(Vec3, Vec3), ColliderError> {
    let Some(VertexAttributeValues::Float32x3(positions)) =
        mesh.attribute(Mesh::ATTRIBUTE_POSITION)
    else {
        return Err(ColliderError::MissingPositions);
    };
    if positions.is_empty() {
        return Err(ColliderError::Empty);
    }
    let mut min = Vec3::INFINITY;
    let mut max = Vec3::NEG_INFINITY;
    for p in positions.iter() {
        let v = Vec3::new(p[0], p[1], p[2]);
        if !v.is_finite() {
            return Err(ColliderError::NonFinite);
        }
        min = min.min(v);
        max = max.max(v);
    }
    Ok((min, max))
}
