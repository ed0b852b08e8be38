//! Winding repair after bending.

use surfacing::{CylinderModel, MeshGeometry};

/// Dot product of a triangle's face normal with the radial direction at its
/// centroid.
///
/// The centroid is summed in index order so that swapping two corners
/// negates the result exactly.
pub fn radial_alignment(mesh: &MeshGeometry, triangle: usize, cylinder: &CylinderModel) -> f32 {
    let mut corners = mesh.triangle_indices(triangle);
    corners.sort_unstable();
    let centroid = corners
        .iter()
        .fold(glam::Vec3::ZERO, |sum, &i| sum + mesh.positions[i])
        / 3.0;
    mesh.face_normal(triangle)
        .dot(cylinder.radial_direction_at(centroid))
}

/// Normalized alignment a face may fall below zero before it counts as
/// pointing towards the axis. Side walls sit on either side of zero.
pub(crate) const TANGENT_TOLERANCE: f32 = 1e-2;

/// Flip every triangle whose face normal points towards the axis.
///
/// Degenerate and near-tangent faces keep their winding. Returns the number
/// of triangles flipped.
pub(super) fn repair(mesh: &mut MeshGeometry, cylinder: &CylinderModel) -> usize {
    let mut flipped = 0;
    for triangle in 0..mesh.triangle_count() {
        let area = mesh.face_normal(triangle).length();
        if area > 0.0 && radial_alignment(mesh, triangle, cylinder) / area < -TANGENT_TOLERANCE {
            mesh.indices.swap(triangle * 3 + 1, triangle * 3 + 2);
            flipped += 1;
        }
    }
    flipped
}
