//! Midpoint subdivision.

use std::collections::HashMap;

use surfacing::{MaterialGroup, MeshGeometry};

fn midpoint(
    positions: &mut Vec<glam::Vec3>,
    cache: &mut HashMap<(u32, u32), u32>,
    a: u32,
    b: u32,
) -> u32 {
    let key = (a.min(b), a.max(b));
    *cache.entry(key).or_insert_with(|| {
        let mid = (positions[key.0 as usize] + positions[key.1 as usize]) * 0.5;
        positions.push(mid);
        (positions.len() - 1) as u32
    })
}

/// Split every triangle into four, `levels` times.
///
/// Midpoints are shared through a cache keyed by the unordered index pair.
/// The result is an unshared triangle list; child triangles stay contiguous,
/// so triangle `t` of the input becomes `t * 4^levels .. (t + 1) * 4^levels`
/// and material groups scale the same way. Normals are dropped.
pub fn subdivide(mesh: &MeshGeometry, levels: u32) -> MeshGeometry {
    if levels == 0 {
        return mesh.clone();
    }

    let mut positions = mesh.positions.clone();
    let mut indices = mesh.indices.clone();

    for _ in 0..levels {
        let mut cache = HashMap::new();
        let mut next = Vec::with_capacity(indices.len() * 4);
        for triangle in indices.chunks_exact(3) {
            let (a, b, c) = (triangle[0], triangle[1], triangle[2]);
            let ab = midpoint(&mut positions, &mut cache, a, b);
            let bc = midpoint(&mut positions, &mut cache, b, c);
            let ca = midpoint(&mut positions, &mut cache, c, a);
            next.extend_from_slice(&[a, ab, ca, ab, b, bc, ca, bc, c, ab, bc, ca]);
        }
        indices = next;
    }

    let scale = 4usize.pow(levels);
    let mut out = MeshGeometry::from_triangle_list(
        indices.iter().map(|&i| positions[i as usize]).collect(),
    );
    out.groups = mesh
        .groups
        .iter()
        .map(|group| MaterialGroup {
            start: group.start * scale,
            count: group.count * scale,
            material_index: group.material_index,
        })
        .collect();
    out
}
