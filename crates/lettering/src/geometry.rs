//! Text geometry buffers and glyph bookkeeping.

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use surfacing::{CylinderModel, MeshGeometry};

/// Coordinate space of a [`TextGeometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometrySpace {
    /// X = reading direction, Y = up, Z = extrusion (surface at Z = 0)
    Letter,
    World,
}

/// The triangles belonging to one glyph.
///
/// Text meshes are unshared triangle lists, so triangle `t` owns vertices
/// `3t..3t + 3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlyphRange {
    pub character: char,
    pub first_triangle: usize,
    pub triangle_count: usize,
    /// Left edge of the glyph cell in letter space
    pub min_x: f32,
    /// Right edge of the glyph cell in letter space
    pub max_x: f32,
}

impl GlyphRange {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn triangles(&self) -> Range<usize> {
        self.first_triangle..self.first_triangle + self.triangle_count
    }

    pub fn vertices(&self) -> Range<usize> {
        self.first_triangle * 3..(self.first_triangle + self.triangle_count) * 3
    }
}

/// Extruded text, either in letter space or wrapped into the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextGeometry {
    pub mesh: MeshGeometry,
    pub glyphs: Vec<GlyphRange>,
    pub space: GeometrySpace,
    /// Every glyph is a closed solid
    pub is_manifold: bool,
    /// Layout width in letter space, from the first glyph cell to the last
    pub width: f32,
    /// Cap height
    pub height: f32,
    /// Extrusion above the surface
    pub thickness: f32,
    /// Cylinder the geometry was wrapped on
    pub cylinder: Option<CylinderModel>,
}

impl TextGeometry {
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    /// Whether every edge, matched by position, borders exactly two triangles.
    pub fn is_closed(&self) -> bool {
        edges_are_closed(&self.mesh)
    }
}

/// Exact bit pattern of a position, for matching coincident vertices.
pub(crate) fn position_key(p: glam::Vec3) -> [u32; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

pub(crate) fn edges_are_closed(mesh: &MeshGeometry) -> bool {
    let mut edges: HashMap<([u32; 3], [u32; 3]), u32> = HashMap::new();
    for triangle in 0..mesh.triangle_count() {
        let corners = mesh.triangle(triangle).map(position_key);
        for i in 0..3 {
            let (a, b) = (corners[i], corners[(i + 1) % 3]);
            let key = if a <= b { (a, b) } else { (b, a) };
            *edges.entry(key).or_insert(0) += 1;
        }
    }
    !edges.is_empty() && edges.values().all(|&count| count == 2)
}

/// Whether every directed edge, matched by position, is used once and
/// traversed the other way by exactly one neighbour.
pub(crate) fn edges_are_oriented(mesh: &MeshGeometry) -> bool {
    let mut edges: HashMap<([u32; 3], [u32; 3]), u32> = HashMap::new();
    for triangle in 0..mesh.triangle_count() {
        let corners = mesh.triangle(triangle).map(position_key);
        for i in 0..3 {
            *edges.entry((corners[i], corners[(i + 1) % 3])).or_insert(0) += 1;
        }
    }
    !edges.is_empty()
        && edges
            .iter()
            .all(|(&(a, b), &count)| count == 1 && edges.get(&(b, a)) == Some(&1))
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn tetrahedron() -> MeshGeometry {
        let [a, b, c, d] = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        MeshGeometry::from_triangle_list(vec![a, c, b, a, b, d, a, d, c, b, c, d])
    }

    #[test]
    fn test_closed_solid_is_detected() {
        assert!(edges_are_closed(&tetrahedron()));
    }

    #[test]
    fn test_open_surface_is_not_closed() {
        let mut open = tetrahedron();
        open.positions.truncate(9);
        open.indices.truncate(9);
        assert!(!edges_are_closed(&open));
    }

    #[test]
    fn test_consistent_winding_is_oriented() {
        assert!(edges_are_oriented(&tetrahedron()));

        let mut flipped = tetrahedron();
        flipped.indices.swap(1, 2);
        assert!(edges_are_closed(&flipped));
        assert!(!edges_are_oriented(&flipped));
    }

    #[test]
    fn test_glyph_range_vertices() {
        let range = GlyphRange {
            character: 'A',
            first_triangle: 4,
            triangle_count: 2,
            min_x: 0.0,
            max_x: 1.5,
        };
        assert_eq!(range.vertices(), 12..18);
        assert_eq!(range.triangles(), 4..6);
        assert!((range.width() - 1.5).abs() < 1e-6);
    }
}
