//! RANSAC cylinder fit against the three world axes.
//!
//! Each iteration draws `ransac_sample_size` distinct samples. The first
//! three define a circle once projected onto the plane normal to a candidate
//! axis; the remaining samples pick the axis whose circle explains them best.
//! The candidate with the most inliers wins, provided it reaches
//! `min_inlier_ratio`.

use glam::Vec3;
use inscribe_config::ClassifierConfig;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use tracing::trace;

use super::{CylinderFit, FitMethod};
use crate::descriptor::CylinderModel;

const CANDIDATE_AXES: [Vec3; 3] = [Vec3::X, Vec3::Y, Vec3::Z];

/// Circle through three points (all lying in a common plane).
#[derive(Debug, Clone, Copy)]
struct Circle {
    center: Vec3,
    radius: f32,
}

/// Circumcircle of `a`, `b`, `c`; `None` when the points are collinear.
fn circumcircle(a: Vec3, b: Vec3, c: Vec3, collinear_epsilon: f32) -> Option<Circle> {
    let ab = b - a;
    let ac = c - a;
    let normal = ab.cross(ac);
    let normal_len_sq = normal.length_squared();
    if normal_len_sq.sqrt() < collinear_epsilon {
        return None;
    }

    let offset = (normal.cross(ab) * ac.length_squared()
        + ac.cross(normal) * ab.length_squared())
        / (2.0 * normal_len_sq);
    let radius = offset.length();
    if !radius.is_finite() {
        return None;
    }

    Some(Circle {
        center: a + offset,
        radius,
    })
}

/// Drop the component along `axis`.
fn project_onto_plane(p: Vec3, axis: Vec3) -> Vec3 {
    p - axis * p.dot(axis)
}

/// Fit a circle for each world axis and keep the one the check points agree with.
fn best_axis_candidate(
    circle_points: &[Vec3],
    check_points: &[Vec3],
    collinear_epsilon: f32,
) -> Option<(Vec3, Circle)> {
    let mut best: Option<(f32, Vec3, Circle)> = None;

    for axis in CANDIDATE_AXES {
        let [a, b, c] = [circle_points[0], circle_points[1], circle_points[2]]
            .map(|p| project_onto_plane(p, axis));
        let Some(circle) = circumcircle(a, b, c, collinear_epsilon) else {
            continue;
        };

        let residual = check_points
            .iter()
            .map(|&p| {
                let offset = project_onto_plane(p, axis) - circle.center;
                (offset.length() - circle.radius).abs()
            })
            .sum::<f32>();

        if best.as_ref().is_none_or(|(prev, _, _)| residual < *prev) {
            best = Some((residual, axis, circle));
        }
    }

    best.map(|(_, axis, circle)| (axis, circle))
}

/// Build a finite cylinder around the line through `circle.center` along
/// `axis`, spanning the axial extent of the supporting points.
fn cylinder_from_support(axis: Vec3, line_point: Vec3, radius: f32, support: &[Vec3]) -> CylinderModel {
    let (min_h, max_h) = support.iter().fold((f32::MAX, f32::MIN), |(lo, hi), &p| {
        let h = (p - line_point).dot(axis);
        (lo.min(h), hi.max(h))
    });
    let (min_h, max_h) = if min_h <= max_h { (min_h, max_h) } else { (0.0, 0.0) };

    CylinderModel {
        center: line_point + axis * ((min_h + max_h) * 0.5),
        axis,
        radius,
        height: max_h - min_h,
        confidence: 0.0,
    }
}

pub(crate) fn fit(samples: &[Vec3], config: &ClassifierConfig) -> Option<CylinderFit> {
    let sample_size = config.ransac_sample_size.max(3);
    if samples.len() < sample_size {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(config.ransac_seed);
    let required = (config.min_inlier_ratio * samples.len() as f32).ceil() as usize;
    let mut best: Option<(usize, Vec3, Circle)> = None;
    let mut iterations = 0;

    for iteration in 0..config.ransac_iterations {
        iterations = iteration + 1;

        let picked: Vec<Vec3> = index::sample(&mut rng, samples.len(), sample_size)
            .iter()
            .map(|i| samples[i])
            .collect();
        let (circle_points, check_points) = picked.split_at(3);

        let Some((axis, circle)) =
            best_axis_candidate(circle_points, check_points, config.collinear_epsilon)
        else {
            continue;
        };

        let inliers = samples
            .iter()
            .filter(|&&p| {
                let offset = project_onto_plane(p, axis) - circle.center;
                (offset.length() - circle.radius).abs() < config.inlier_tolerance
            })
            .count();

        trace!(
            "ransac iteration {}: axis={:?} r={:.3} inliers={}",
            iteration,
            axis,
            circle.radius,
            inliers
        );

        if best.as_ref().is_none_or(|(prev, _, _)| inliers > *prev) {
            best = Some((inliers, axis, circle));
            if inliers == samples.len() {
                break;
            }
        }
    }

    let (inlier_count, axis, circle) = best?;
    if inlier_count < required.max(1) {
        return None;
    }

    // Refine the radius and extent from the inliers of the winning circle
    let support: Vec<Vec3> = samples
        .iter()
        .copied()
        .filter(|&p| {
            let offset = project_onto_plane(p, axis) - circle.center;
            (offset.length() - circle.radius).abs() < config.inlier_tolerance
        })
        .collect();
    let radius = support
        .iter()
        .map(|&p| (project_onto_plane(p, axis) - circle.center).length())
        .sum::<f32>()
        / support.len() as f32;

    Some(CylinderFit {
        model: cylinder_from_support(axis, circle.center, radius, &support),
        method: FitMethod::Ransac,
        iterations,
    })
}
