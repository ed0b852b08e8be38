//! Vertex normal smoothing for wrapped text.

use std::collections::HashMap;

use glam::Vec3;
use surfacing::{CylinderModel, MeshGeometry};

use crate::geometry::position_key;

/// Average face normals over coincident vertices, then force cap normals
/// outward.
///
/// A normal is a cap normal when `|n . radial| > cap_alignment`; cap normals
/// pointing towards the axis are negated.
pub(super) fn smooth(mesh: &mut MeshGeometry, cylinder: &CylinderModel, cap_alignment: f32) {
    let mut sums: HashMap<[u32; 3], Vec3> = HashMap::new();
    for triangle in 0..mesh.triangle_count() {
        let face = mesh.face_normal(triangle);
        for index in mesh.triangle_indices(triangle) {
            *sums.entry(position_key(mesh.positions[index])).or_default() += face;
        }
    }

    let normals = mesh
        .positions
        .iter()
        .map(|&p| {
            let normal = sums
                .get(&position_key(p))
                .copied()
                .unwrap_or(Vec3::ZERO)
                .normalize_or_zero();
            let alignment = normal.dot(cylinder.radial_direction_at(p));
            if alignment.abs() > cap_alignment && alignment < 0.0 {
                -normal
            } else {
                normal
            }
        })
        .collect();
    mesh.normals = Some(normals);
}
