//! Ray picking and closest-point queries against mesh geometry.
//!
//! Ray tests use the Moller-Trumbore algorithm. Both queries work in world
//! space: the geometry is read in its local frame and mapped through the
//! supplied transform, so callers never need a transformed copy of the mesh.

use glam::{Mat4, Vec3};

use crate::mesh::MeshGeometry;

/// Epsilon for floating point comparisons in ray intersection
const EPSILON: f32 = 1e-6;

/// A world-space ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Direction (normalized on construction)
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a ray-triangle intersection test
#[derive(Debug, Clone, Copy)]
struct TriangleHit {
    /// Distance along the ray to the intersection point
    t: f32,
}

/// Closest intersection of a ray with a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    /// Triangle index in the geometry
    pub triangle: usize,
    /// Distance along the ray
    pub distance: f32,
    /// World-space hit position
    pub point: Vec3,
    /// World-space unit face normal
    pub normal: Vec3,
}

/// Point on a mesh surface nearest to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    pub triangle: usize,
    /// World-space closest point
    pub point: Vec3,
    /// World-space unit face normal
    pub normal: Vec3,
    pub distance: f32,
}

/// Moller-Trumbore ray-triangle intersection algorithm.
fn ray_triangle_intersection(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);

    // Ray lies in plane of triangle or misses
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let tvec = ray.origin - v0;

    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;

    // Only accept hits in front of the ray
    if t < EPSILON {
        return None;
    }

    Some(TriangleHit { t })
}

fn world_triangle(geometry: &MeshGeometry, transform: &Mat4, triangle: usize) -> [Vec3; 3] {
    geometry
        .triangle(triangle)
        .map(|p| transform.transform_point3(p))
}

/// Cast a ray against a mesh and return the closest hit.
pub fn raycast_mesh(geometry: &MeshGeometry, transform: &Mat4, ray: &Ray) -> Option<MeshHit> {
    let mut closest: Option<(TriangleHit, usize, [Vec3; 3])> = None;

    // Brute force; text targets are modest meshes picked once per click
    for triangle in 0..geometry.triangle_count() {
        let [v0, v1, v2] = world_triangle(geometry, transform, triangle);
        if let Some(hit) = ray_triangle_intersection(ray, v0, v1, v2) {
            let dominated = closest.as_ref().is_some_and(|(prev, _, _)| hit.t >= prev.t);
            if !dominated {
                closest = Some((hit, triangle, [v0, v1, v2]));
            }
        }
    }

    closest.map(|(hit, triangle, [v0, v1, v2])| MeshHit {
        triangle,
        distance: hit.t,
        point: ray.at(hit.t),
        normal: (v1 - v0).cross(v2 - v0).normalize_or_zero(),
    })
}

/// Closest point on triangle `abc` to `p` (Ericson, Real-Time Collision Detection 5.1.5).
fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Find the triangle nearest to a world-space point.
///
/// Degenerate (zero-area) triangles are skipped since they carry no normal.
pub fn closest_triangle(
    geometry: &MeshGeometry,
    transform: &Mat4,
    point: Vec3,
) -> Option<SurfacePoint> {
    let mut best: Option<SurfacePoint> = None;

    for triangle in 0..geometry.triangle_count() {
        let [a, b, c] = world_triangle(geometry, transform, triangle);
        let normal = (b - a).cross(c - a);
        if normal.length_squared() < EPSILON * EPSILON {
            continue;
        }
        let closest = closest_point_on_triangle(point, a, b, c);
        let distance = closest.distance(point);
        if best.as_ref().is_none_or(|prev| distance < prev.distance) {
            best = Some(SurfacePoint {
                triangle,
                point: closest,
                normal: normal.normalize(),
                distance,
            });
        }
    }

    best
}
