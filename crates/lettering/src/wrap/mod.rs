//! Wrapping flat letters onto a cylinder.
//!
//! ## Pipeline
//!
//! 1. Spacing compensation in letter space
//! 2. Optional midpoint subdivision so long flat faces can bend
//! 3. Per-vertex remap into the cylinder frame
//! 4. Winding repair
//! 5. Normal smoothing
//!
//! Letter-space X becomes arc length at the base radius, Y runs along the
//! axis and Z is added to the radius. The text block is centred on the start
//! point.

mod normals;
mod spacing;
mod subdivide;
mod winding;

pub use spacing::arc_ratio;
pub use subdivide::subdivide;
pub use winding::radial_alignment;

use glam::Vec3;
use inscribe_config::WrapConfig;
use surfacing::{CylinderModel, MeshGeometry};
use tracing::debug;

use crate::geometry::{
    edges_are_closed, edges_are_oriented, GeometrySpace, GlyphRange, TextGeometry,
};
use crate::GeometryError;

/// Where and which way text starts on a cylinder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WrapFrame {
    pub cylinder: CylinderModel,
    pub base_theta: f32,
    /// Height of the start point along the axis, from the cylinder centre
    pub base_height: f32,
    /// +1 when text reads towards increasing angle, -1 otherwise
    pub sign: f32,
}

impl WrapFrame {
    /// Project `start` into the cylinder frame and pick the reading sign from
    /// `direction`.
    pub fn new(cylinder: CylinderModel, start: Vec3, direction: Vec3) -> Self {
        let (base_theta, base_height) = cylinder.to_cylindrical(start);
        let sign = if direction.dot(cylinder.tangent_direction(base_theta)) < 0.0 {
            -1.0
        } else {
            1.0
        };
        Self {
            cylinder,
            base_theta,
            base_height,
            sign,
        }
    }

    /// Map a centred letter-space point to world space.
    ///
    /// With a negative sign the height offset flips as well, turning the text
    /// half a turn about the radial direction instead of mirroring it.
    pub fn map(&self, p: Vec3) -> Vec3 {
        let radius = self.cylinder.radius;
        let theta = self.base_theta + self.sign * p.x / radius;
        let height = self.base_height + self.sign * p.y;
        self.cylinder.point_at(theta, height, radius + p.z)
    }
}

/// Wrap letter-space text onto `cylinder`, centred on `start` and reading
/// along `direction`.
///
/// The cylinder is trusted as given; only a non-positive radius is refused.
pub fn wrap_text(
    flat: &TextGeometry,
    cylinder: &CylinderModel,
    start: Vec3,
    direction: Vec3,
    config: &WrapConfig,
) -> Result<TextGeometry, GeometryError> {
    if flat.space != GeometrySpace::Letter {
        return Err(GeometryError::NotLetterSpace);
    }
    if flat.mesh.is_empty() {
        return Err(GeometryError::EmptyText);
    }
    if !(cylinder.radius > 0.0) {
        return Err(GeometryError::InvalidCylinder {
            radius: cylinder.radius,
        });
    }

    let (spaced, glyphs, width) = spacing::compensate(flat, cylinder.radius);
    let mut mesh = subdivide(&spaced, config.subdivision_level);

    let frame = WrapFrame::new(*cylinder, start, direction);
    let centre = Vec3::new(width * 0.5, flat.height * 0.5, 0.0);
    remap(&mut mesh, &frame, centre);

    // Repair turns the inner caps towards the axis on purpose, so winding
    // consistency is judged on the bent mesh before it runs
    let oriented = edges_are_oriented(&mesh);
    let flipped = winding::repair(&mut mesh, cylinder);
    normals::smooth(&mut mesh, cylinder, config.cap_alignment);
    let closed = edges_are_closed(&mesh);

    debug!(
        "wrap_text: {} -> {} vertices (level {}), theta {:.3} sign {}, {} triangles flipped, closed {} oriented {}",
        flat.vertex_count(),
        mesh.vertex_count(),
        config.subdivision_level,
        frame.base_theta,
        frame.sign,
        flipped,
        closed,
        oriented
    );

    let scale = 4usize.pow(config.subdivision_level);
    Ok(TextGeometry {
        mesh,
        glyphs: glyphs
            .into_iter()
            .map(|glyph| GlyphRange {
                first_triangle: glyph.first_triangle * scale,
                triangle_count: glyph.triangle_count * scale,
                ..glyph
            })
            .collect(),
        space: GeometrySpace::World,
        is_manifold: closed && oriented,
        width,
        height: flat.height,
        thickness: flat.thickness,
        cylinder: Some(*cylinder),
    })
}

fn remap(mesh: &mut MeshGeometry, frame: &WrapFrame, centre: Vec3) {
    for position in &mut mesh.positions {
        *position = frame.map(*position - centre);
    }
}

#[cfg(test)]
mod tests {
    use inscribe_config::TextConfig;

    use super::*;
    use crate::extrude::build_flat_text;

    fn cylinder() -> CylinderModel {
        CylinderModel {
            center: Vec3::new(1.0, 2.0, 3.0),
            axis: Vec3::Y,
            radius: 2.0,
            height: 10.0,
            confidence: 0.9,
        }
    }

    fn flat() -> TextGeometry {
        build_flat_text("AXE", &TextConfig::new(0.7, 0.1)).unwrap()
    }

    fn start(cylinder: &CylinderModel) -> Vec3 {
        cylinder.point_at(0.4, 1.0, cylinder.radius)
    }

    fn wrap(level: u32, direction_sign: f32) -> TextGeometry {
        let cylinder = cylinder();
        let start = start(&cylinder);
        let (theta, _) = cylinder.to_cylindrical(start);
        let direction = cylinder.tangent_direction(theta) * direction_sign;
        wrap_text(
            &flat(),
            &cylinder,
            start,
            direction,
            &WrapConfig {
                subdivision_level: level,
                ..WrapConfig::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_vertex_count_scales_with_subdivision() {
        let input = flat().vertex_count();
        for level in 0..3 {
            assert_eq!(wrap(level, 1.0).vertex_count(), input * 4usize.pow(level));
        }
    }

    #[test]
    fn test_faces_point_away_from_axis() {
        for sign in [1.0, -1.0] {
            let wrapped = wrap(1, sign);
            let cylinder = cylinder();
            for t in 0..wrapped.triangle_count() {
                let area = wrapped.mesh.face_normal(t).length();
                let alignment = radial_alignment(&wrapped.mesh, t, &cylinder) / area;
                assert!(alignment >= -winding::TANGENT_TOLERANCE);
            }
        }
    }

    #[test]
    fn test_only_inner_caps_are_flipped() {
        let flat = flat();
        for level in 0..=1 {
            let children = 4usize.pow(level);
            for sign in [1.0, -1.0] {
                let wrapped = wrap(level, sign);
                for t in 0..wrapped.triangle_count() {
                    let flipped = wrapped.mesh.indices[t * 3 + 1] != (t * 3 + 1) as u32;
                    let inner_cap = flat.mesh.face_normal(t / children).z < 0.0;
                    assert_eq!(flipped, inner_cap, "triangle {t} at level {level}");
                }
            }
        }
    }

    #[test]
    fn test_output_lies_in_the_extrusion_shell() {
        let wrapped = wrap(1, 1.0);
        let cylinder = cylinder();
        let config = TextConfig::new(0.7, 0.1);
        for &p in &wrapped.mesh.positions {
            let d = cylinder.distance_to_axis(p);
            assert!(d >= cylinder.radius - config.engrave_depth - 1e-4);
            assert!(d <= cylinder.radius + config.thickness + 1e-4);
        }
        assert_eq!(wrapped.space, GeometrySpace::World);
        assert!(wrapped.is_manifold);
        assert_eq!(wrapped.cylinder, Some(cylinder));
    }

    #[test]
    fn test_text_is_centred_on_start() {
        let wrapped = wrap(0, 1.0);
        let cylinder = cylinder();
        let (start_theta, start_height) = cylinder.to_cylindrical(start(&cylinder));
        let (mut lo, mut hi) = (f32::MAX, f32::MIN);
        let (mut bottom, mut top) = (f32::MAX, f32::MIN);
        for &p in &wrapped.mesh.positions {
            let (theta, height) = cylinder.to_cylindrical(p);
            lo = lo.min(theta);
            hi = hi.max(theta);
            bottom = bottom.min(height);
            top = top.max(height);
        }
        assert!(((lo + hi) * 0.5 - start_theta).abs() < 1e-4);
        assert!(((bottom + top) * 0.5 - start_height).abs() < 1e-4);
        assert!(((hi - lo) - wrapped.width / cylinder.radius).abs() < 1e-4);
    }

    #[test]
    fn test_reversed_direction_is_a_rotation_not_a_mirror() {
        let cylinder = cylinder();
        let frame = WrapFrame::new(cylinder, start(&cylinder), -cylinder.tangent_direction(0.4));
        assert_eq!(frame.sign, -1.0);

        // Small letter-space basis mapped near the start point keeps its handedness
        let origin = frame.map(Vec3::ZERO);
        let x = frame.map(Vec3::X * 1e-3) - origin;
        let y = frame.map(Vec3::Y * 1e-3) - origin;
        let z = frame.map(Vec3::Z * 1e-3) - origin;
        assert!(x.cross(y).dot(z) > 0.0);
        assert!(z.dot(cylinder.radial_direction_at(origin)) > 0.0);
    }

    #[test]
    fn test_rejects_world_space_and_bad_radius() {
        let mut world = flat();
        world.space = GeometrySpace::World;
        let config = WrapConfig::default();
        assert!(matches!(
            wrap_text(&world, &cylinder(), Vec3::X, Vec3::Z, &config),
            Err(GeometryError::NotLetterSpace)
        ));

        let flat_cylinder = CylinderModel {
            radius: 0.0,
            ..cylinder()
        };
        assert!(matches!(
            wrap_text(&flat(), &flat_cylinder, Vec3::X, Vec3::Z, &config),
            Err(GeometryError::InvalidCylinder { .. })
        ));
    }

    #[test]
    fn test_wrapped_letters_stay_closed() {
        assert!(wrap(0, 1.0).is_closed());
        assert!(wrap(2, -1.0).is_closed());
    }

    #[test]
    fn test_glyph_ranges_follow_subdivision() {
        let flat = flat();
        let wrapped = wrap(2, 1.0);
        for (before, after) in flat.glyphs.iter().zip(&wrapped.glyphs) {
            assert_eq!(after.first_triangle, before.first_triangle * 16);
            assert_eq!(after.triangle_count, before.triangle_count * 16);
        }
        assert!(wrapped.mesh.normals.is_some());
    }
}
