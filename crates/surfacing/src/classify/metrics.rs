//! Fit quality measures shared by scoring and validation.

use glam::Vec3;
use inscribe_config::ClassifierConfig;
use serde::{Deserialize, Serialize};

use crate::descriptor::CylinderModel;

const RADIUS_WEIGHT: f32 = 0.4;
const ASPECT_WEIGHT: f32 = 0.3;
const SURFACE_WEIGHT: f32 = 0.3;

/// How the confidence of a cylinder candidate was composed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    /// 1 - (std-dev of axis distance / radius), clamped to 0..=1
    pub radius_consistency: f32,
    /// Rewards one long extent and two similar cross-section extents
    pub aspect: f32,
    /// Fraction of samples within the inlier tolerance of the surface
    pub surface_fraction: f32,
    /// Weighted sum, 0.4 / 0.3 / 0.3
    pub total: f32,
}

/// Mean and standard deviation.
pub(crate) fn mean_and_std(values: impl IntoIterator<Item = f32>) -> (f32, f32) {
    let (mut n, mut sum, mut sum_sq) = (0usize, 0.0f32, 0.0f32);
    for v in values {
        n += 1;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f32;
    let variance = (sum_sq / n as f32 - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

pub(crate) fn count_within(model: &CylinderModel, samples: &[Vec3], tolerance: f32) -> usize {
    samples
        .iter()
        .filter(|&&p| model.surface_distance(p) < tolerance)
        .count()
}

pub(crate) fn fraction_within(model: &CylinderModel, samples: &[Vec3], tolerance: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    count_within(model, samples, tolerance) as f32 / samples.len() as f32
}

/// Extents of the samples along the cylinder frame: `(axial, u, v)`.
fn frame_extents(model: &CylinderModel, samples: &[Vec3]) -> (f32, f32, f32) {
    let (u, v) = model.frame();
    let axes = [model.axis, u, v];
    let mut lo = [f32::MAX; 3];
    let mut hi = [f32::MIN; 3];
    for &p in samples {
        let rel = p - model.center;
        for (i, axis) in axes.iter().enumerate() {
            let d = rel.dot(*axis);
            lo[i] = lo[i].min(d);
            hi[i] = hi[i].max(d);
        }
    }
    let extent = |i: usize| (hi[i] - lo[i]).max(0.0);
    (extent(0), extent(1), extent(2))
}

fn aspect_score(model: &CylinderModel, samples: &[Vec3]) -> f32 {
    let (axial, eu, ev) = frame_extents(model, samples);
    let wide = eu.max(ev);
    if wide <= f32::EPSILON {
        return 0.0;
    }
    let similarity = eu.min(ev) / wide;
    let elongation = (axial / wide).min(1.0);
    0.6 * similarity + 0.4 * elongation
}

pub(crate) fn confidence(
    model: &CylinderModel,
    samples: &[Vec3],
    config: &ClassifierConfig,
) -> ConfidenceBreakdown {
    let (_, spread) = mean_and_std(samples.iter().map(|&p| model.distance_to_axis(p)));
    let radius_consistency = (1.0 - spread / model.radius).clamp(0.0, 1.0);
    let aspect = aspect_score(model, samples);
    let surface_fraction = fraction_within(model, samples, config.inlier_tolerance);

    ConfidenceBreakdown {
        radius_consistency,
        aspect,
        surface_fraction,
        total: (RADIUS_WEIGHT * radius_consistency
            + ASPECT_WEIGHT * aspect
            + SURFACE_WEIGHT * surface_fraction)
            .clamp(0.0, 1.0),
    }
}

/// Normalized entropy of the angle histogram around the axis (1 = uniform).
pub(crate) fn angular_uniformity(model: &CylinderModel, samples: &[Vec3], bins: usize) -> f32 {
    if samples.is_empty() || bins < 2 {
        return 0.0;
    }
    let mut counts = vec![0usize; bins];
    for &p in samples {
        let (theta, _) = model.to_cylindrical(p);
        let t = (theta + std::f32::consts::PI) / std::f32::consts::TAU;
        let bin = ((t * bins as f32) as usize).min(bins - 1);
        counts[bin] += 1;
    }
    let n = samples.len() as f32;
    let entropy: f32 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f32 / n;
            -p * p.ln()
        })
        .sum();
    entropy / (bins as f32).ln()
}

/// Fraction of equal slices along the fitted height that contain a sample.
pub(crate) fn axial_coverage(model: &CylinderModel, samples: &[Vec3], bins: usize) -> f32 {
    if samples.is_empty() || bins == 0 || model.height <= f32::EPSILON {
        return 0.0;
    }
    let mut occupied = vec![false; bins];
    for &p in samples {
        let (_, h) = model.to_cylindrical(p);
        let t = (h / model.height + 0.5).clamp(0.0, 1.0);
        let bin = ((t * bins as f32) as usize).min(bins - 1);
        occupied[bin] = true;
    }
    occupied.iter().filter(|&&o| o).count() as f32 / bins as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> CylinderModel {
        CylinderModel {
            center: Vec3::ZERO,
            axis: Vec3::Y,
            radius: 1.0,
            height: 4.0,
            confidence: 0.0,
        }
    }

    fn ring_stack(angles: usize, rings: usize) -> Vec<Vec3> {
        let m = model();
        let mut points = Vec::new();
        for ring in 0..rings {
            let h = -2.0 + 4.0 * ring as f32 / (rings - 1) as f32;
            for a in 0..angles {
                let theta = std::f32::consts::TAU * a as f32 / angles as f32;
                points.push(m.point_at(theta, h, 1.0));
            }
        }
        points
    }

    #[test]
    fn test_perfect_cylinder_scores_high() {
        let samples = ring_stack(24, 9);
        let breakdown = confidence(&model(), &samples, &ClassifierConfig::default());
        assert!(breakdown.radius_consistency > 0.999);
        assert!((breakdown.surface_fraction - 1.0).abs() < 1e-6);
        assert!(breakdown.aspect > 0.95);
        assert!(breakdown.total > 0.95);
    }

    #[test]
    fn test_uniformity_drops_for_partial_arc() {
        let full = ring_stack(24, 5);
        let half: Vec<Vec3> = full
            .iter()
            .copied()
            .filter(|p| model().to_cylindrical(*p).0 >= 0.0)
            .collect();
        let full_score = angular_uniformity(&model(), &full, 12);
        let half_score = angular_uniformity(&model(), &half, 12);
        assert!(full_score > 0.99);
        assert!(half_score < 0.8);
        assert!(half_score > 0.6);
    }

    #[test]
    fn test_axial_coverage_of_single_ring() {
        let ring = ring_stack(24, 2)[..24].to_vec();
        assert!((axial_coverage(&model(), &ring, 10) - 0.1).abs() < 1e-6);
        assert!((axial_coverage(&model(), &ring_stack(24, 11), 10) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_and_std() {
        let (mean, std) = mean_and_std([1.0, 3.0]);
        assert!((mean - 2.0).abs() < 1e-6);
        assert!((std - 1.0).abs() < 1e-6);
    }
}
