//! Text placement and geometry generation for either surface kind.

use glam::{Mat4, Vec3};
use inscribe_config::{TextConfig, WrapConfig, MIN_CYLINDER_CONFIDENCE};
use surfacing::{MeshGeometry, SurfaceDescriptor};
use tracing::debug;

use crate::extrude::build_flat_text;
use crate::geometry::TextGeometry;
use crate::wrap::wrap_text;
use crate::GeometryError;

/// Where a text sits: the surface, the clicked point and the reading direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub descriptor: SurfaceDescriptor,
    /// World-space point the text block is centred on
    pub anchor: Vec3,
    /// World-space reading direction (projected onto the surface when used)
    pub direction: Vec3,
}

impl Placement {
    /// A new placement; cylinders below `min_confidence` become the tangent
    /// plane at `anchor`.
    pub fn new(
        descriptor: SurfaceDescriptor,
        anchor: Vec3,
        direction: Vec3,
        min_confidence: f32,
    ) -> Self {
        Self {
            descriptor: descriptor.degrade_below(min_confidence, anchor),
            anchor,
            direction,
        }
    }

    /// Outward surface normal at the anchor.
    pub fn normal(&self) -> Vec3 {
        self.descriptor.normal_at(self.anchor)
    }

    /// Letter-to-world frame for planar text: origin at the anchor, +Z along
    /// the normal and +X along the reading direction within the plane.
    pub fn surface_frame(&self) -> Mat4 {
        let z = self.normal();
        let x = (self.direction - z * self.direction.dot(z))
            .try_normalize()
            .unwrap_or_else(|| z.any_orthonormal_vector());
        let y = z.cross(x);
        Mat4::from_cols(
            x.extend(0.0),
            y.extend(0.0),
            z.extend(0.0),
            self.anchor.extend(1.0),
        )
    }
}

/// Geometry generated for one text.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedText {
    /// Descriptor actually used (after confidence degradation)
    pub descriptor: SurfaceDescriptor,
    /// Letter-space solids
    pub flat: TextGeometry,
    /// World-space solids, cylinder placements only
    pub wrapped: Option<TextGeometry>,
    /// Letter-to-world transform for `flat`; identity for wrapped text
    pub transform: Mat4,
}

impl GeneratedText {
    /// World-space text solids.
    pub fn world_geometry(&self) -> MeshGeometry {
        match &self.wrapped {
            Some(wrapped) => wrapped.mesh.clone(),
            None => self.flat.mesh.transformed(&self.transform),
        }
    }
}

/// Build the geometry for `content` at `placement`.
///
/// Planes get the flat solids plus a transform centring them on the anchor;
/// cylinders get the flat solids plus a world-space wrapped copy. Cylinders
/// that fail the minimum confidence are placed as planes.
pub fn generate_text_geometry(
    content: &str,
    config: &TextConfig,
    placement: &Placement,
    wrap: &WrapConfig,
) -> Result<GeneratedText, GeometryError> {
    let flat = build_flat_text(content, config)?;
    let descriptor = placement
        .descriptor
        .degrade_below(MIN_CYLINDER_CONFIDENCE, placement.anchor);

    match descriptor {
        SurfaceDescriptor::Cylinder(cylinder) => {
            let wrapped = wrap_text(&flat, &cylinder, placement.anchor, placement.direction, wrap)?;
            debug!(
                "generate_text_geometry: {:?} wrapped on r={:.3}, {} vertices",
                content,
                cylinder.radius,
                wrapped.vertex_count()
            );
            Ok(GeneratedText {
                descriptor,
                flat,
                wrapped: Some(wrapped),
                transform: Mat4::IDENTITY,
            })
        }
        SurfaceDescriptor::Plane(_) => {
            let placement = Placement {
                descriptor,
                ..*placement
            };
            let centre = Mat4::from_translation(Vec3::new(-flat.width * 0.5, -flat.height * 0.5, 0.0));
            let transform = placement.surface_frame() * centre;
            debug!(
                "generate_text_geometry: {:?} on plane, {} vertices",
                content,
                flat.vertex_count()
            );
            Ok(GeneratedText {
                descriptor,
                flat,
                wrapped: None,
                transform,
            })
        }
    }
}
