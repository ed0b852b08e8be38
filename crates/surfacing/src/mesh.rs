//! Indexed triangle geometry and the read-only mesh view.
//!
//! [`MeshGeometry`] is a plain buffer owner: positions, optional normals, a
//! triangle index list and optional material groups. Buffers are never shared;
//! anything that derives new geometry returns a fresh `MeshGeometry`.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// A contiguous run of indices drawn with one material slot.
///
/// `start` and `count` are measured in indices (three per triangle), the same
/// way GPU draw ranges are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialGroup {
    pub start: usize,
    pub count: usize,
    pub material_index: usize,
}

impl MaterialGroup {
    /// Whether the triangle at `triangle` falls inside this group.
    pub fn contains_triangle(&self, triangle: usize) -> bool {
        let index = triangle * 3;
        index >= self.start && index < self.start + self.count
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box containing every point, or `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    /// Bounding box of this box after an affine transform.
    pub fn transformed(&self, transform: &Mat4) -> Self {
        let corners = (0..8).map(|i| {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            transform.transform_point3(corner)
        });
        // Eight corners are always present
        Self::from_points(corners).unwrap_or(*self)
    }
}

/// Indexed triangle geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshGeometry {
    pub positions: Vec<Vec3>,
    /// Per-vertex normals (same length as positions when present)
    pub normals: Option<Vec<Vec3>>,
    /// Triangle indices (3 per triangle)
    pub indices: Vec<u32>,
    /// Material groups; empty means the whole mesh uses slot 0
    pub groups: Vec<MaterialGroup>,
}

impl MeshGeometry {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals: None,
            indices,
            groups: Vec::new(),
        }
    }

    /// Build geometry from an unshared triangle list (three positions per triangle).
    pub fn from_triangle_list(positions: Vec<Vec3>) -> Self {
        let indices = (0..positions.len() as u32).collect();
        Self::new(positions, indices)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.len() < 3
    }

    /// Get the vertex indices for a triangle
    pub fn triangle_indices(&self, triangle: usize) -> [usize; 3] {
        let base = triangle * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Get the vertex positions for a triangle
    pub fn triangle(&self, triangle: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangle_indices(triangle);
        [self.positions[a], self.positions[b], self.positions[c]]
    }

    /// Unnormalized face normal (cross product of the triangle edges).
    pub fn face_normal(&self, triangle: usize) -> Vec3 {
        let [a, b, c] = self.triangle(triangle);
        (b - a).cross(c - a)
    }

    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().copied())
    }

    /// Material slot used by a triangle (slot 0 when no group covers it).
    pub fn material_index_of(&self, triangle: usize) -> usize {
        self.groups
            .iter()
            .find(|group| group.contains_triangle(triangle))
            .map_or(0, |group| group.material_index)
    }

    /// Copy of this geometry with every position and normal transformed.
    pub fn transformed(&self, transform: &Mat4) -> Self {
        let normal_matrix = transform.inverse().transpose();
        Self {
            positions: self
                .positions
                .iter()
                .map(|&p| transform.transform_point3(p))
                .collect(),
            normals: self.normals.as_ref().map(|normals| {
                normals
                    .iter()
                    .map(|&n| normal_matrix.transform_vector3(n).normalize_or_zero())
                    .collect()
            }),
            indices: self.indices.clone(),
            groups: self.groups.clone(),
        }
    }

    /// Append another geometry, offsetting its indices and groups.
    ///
    /// Normals are kept only when both sides carry them.
    pub fn append(&mut self, other: &MeshGeometry) {
        let vertex_offset = self.positions.len() as u32;
        let index_offset = self.indices.len();

        self.normals = match (self.normals.take(), &other.normals) {
            (Some(mut mine), Some(theirs)) => {
                mine.extend_from_slice(theirs);
                Some(mine)
            }
            _ => None,
        };
        self.positions.extend_from_slice(&other.positions);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
        self.groups.extend(other.groups.iter().map(|group| MaterialGroup {
            start: group.start + index_offset,
            ..*group
        }));
    }

    /// Positional equality within `epsilon`, ignoring normals.
    pub fn approx_eq(&self, other: &MeshGeometry, epsilon: f32) -> bool {
        self.indices == other.indices
            && self.groups == other.groups
            && self.positions.len() == other.positions.len()
            && self
                .positions
                .iter()
                .zip(&other.positions)
                .all(|(a, b)| a.distance(*b) <= epsilon)
    }
}

/// Explicit shape information carried by a mesh, when its creator knows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShapeHint {
    #[default]
    Unknown,
    /// A box primitive; every face is planar
    Box,
}

/// Read-only access to a mesh's triangles, bounds and placement.
pub trait MeshQuery {
    /// Geometry in the mesh's local space.
    fn geometry(&self) -> &MeshGeometry;

    /// Local-to-world transform.
    fn world_transform(&self) -> Mat4;

    fn shape_hint(&self) -> ShapeHint {
        ShapeHint::Unknown
    }

    /// World-space bounding box.
    fn bounding_box(&self) -> Option<Aabb> {
        let transform = self.world_transform();
        self.geometry()
            .bounding_box()
            .map(|bounds| bounds.transformed(&transform))
    }
}

/// A geometry placed in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInstance {
    pub geometry: MeshGeometry,
    pub transform: Mat4,
    pub shape: ShapeHint,
}

impl MeshInstance {
    pub fn new(geometry: MeshGeometry) -> Self {
        Self {
            geometry,
            transform: Mat4::IDENTITY,
            shape: ShapeHint::Unknown,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_shape(mut self, shape: ShapeHint) -> Self {
        self.shape = shape;
        self
    }
}

impl MeshQuery for MeshInstance {
    fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    fn world_transform(&self) -> Mat4 {
        self.transform
    }

    fn shape_hint(&self) -> ShapeHint {
        self.shape
    }
}
