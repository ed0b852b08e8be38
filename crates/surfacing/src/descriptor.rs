//! Surface models produced by classification.
//!
//! A descriptor is created once per text placement and never mutated; a new
//! placement always gets a new descriptor.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// An infinite plane through `point`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneModel {
    pub point: Vec3,
    /// Unit normal
    pub normal: Vec3,
}

impl PlaneModel {
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self {
            point,
            normal: normal.try_normalize().unwrap_or(Vec3::Y),
        }
    }
}

/// A finite right circular cylinder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CylinderModel {
    /// Point on the axis at mid-height
    pub center: Vec3,
    /// Unit axis direction
    pub axis: Vec3,
    pub radius: f32,
    /// Extent along the axis covered by the fitted points
    pub height: f32,
    /// Fit confidence in 0..=1
    pub confidence: f32,
}

impl CylinderModel {
    /// Two fixed unit vectors spanning the plane normal to the axis.
    ///
    /// `u x v == axis`, so increasing angle runs counter-clockwise when
    /// looking down the axis.
    pub fn frame(&self) -> (Vec3, Vec3) {
        let u = self.axis.any_orthonormal_vector();
        let v = self.axis.cross(u);
        (u, v)
    }

    /// Outward unit direction at angle `theta` around the axis.
    pub fn radial_direction(&self, theta: f32) -> Vec3 {
        let (u, v) = self.frame();
        u * theta.cos() + v * theta.sin()
    }

    /// Unit tangent at angle `theta`, pointing towards increasing angle.
    pub fn tangent_direction(&self, theta: f32) -> Vec3 {
        let (u, v) = self.frame();
        v * theta.cos() - u * theta.sin()
    }

    /// Offset of `p` from the axis line, perpendicular to the axis.
    pub fn radial_offset(&self, p: Vec3) -> Vec3 {
        let rel = p - self.center;
        rel - self.axis * rel.dot(self.axis)
    }

    /// Outward unit direction from the axis towards `p`.
    ///
    /// Points on the axis have no radial direction; the frame's first vector
    /// is returned so callers always get a unit vector.
    pub fn radial_direction_at(&self, p: Vec3) -> Vec3 {
        self.radial_offset(p)
            .try_normalize()
            .unwrap_or_else(|| self.frame().0)
    }

    pub fn distance_to_axis(&self, p: Vec3) -> f32 {
        self.radial_offset(p).length()
    }

    /// Unsigned distance from `p` to the cylinder's lateral surface.
    pub fn surface_distance(&self, p: Vec3) -> f32 {
        (self.distance_to_axis(p) - self.radius).abs()
    }

    /// `(theta, height)` of `p` in the cylinder frame; height is measured from `center`.
    pub fn to_cylindrical(&self, p: Vec3) -> (f32, f32) {
        let (u, v) = self.frame();
        let rel = p - self.center;
        let radial = self.radial_offset(p);
        (radial.dot(v).atan2(radial.dot(u)), rel.dot(self.axis))
    }

    /// World position at `(theta, height, radius)` in the cylinder frame.
    pub fn point_at(&self, theta: f32, height: f32, radius: f32) -> Vec3 {
        self.center + self.axis * height + self.radial_direction(theta) * radius
    }

    /// Tangent plane through `anchor`, facing away from the axis.
    pub fn tangent_plane(&self, anchor: Vec3) -> PlaneModel {
        PlaneModel::new(anchor, self.radial_direction_at(anchor))
    }
}

/// The surface a text is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SurfaceDescriptor {
    Plane(PlaneModel),
    Cylinder(CylinderModel),
}

impl SurfaceDescriptor {
    pub fn is_cylinder(&self) -> bool {
        matches!(self, SurfaceDescriptor::Cylinder(_))
    }

    /// Replace a cylinder below `min_confidence` with its tangent plane at `anchor`.
    pub fn degrade_below(self, min_confidence: f32, anchor: Vec3) -> Self {
        match self {
            SurfaceDescriptor::Cylinder(cylinder) if cylinder.confidence < min_confidence => {
                SurfaceDescriptor::Plane(cylinder.tangent_plane(anchor))
            }
            other => other,
        }
    }

    /// Outward surface normal at `anchor`.
    pub fn normal_at(&self, anchor: Vec3) -> Vec3 {
        match self {
            SurfaceDescriptor::Plane(plane) => plane.normal,
            SurfaceDescriptor::Cylinder(cylinder) => cylinder.radial_direction_at(anchor),
        }
    }
}
