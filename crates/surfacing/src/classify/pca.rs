//! PCA cylinder fit, used when RANSAC finds no axis-aligned candidate.
//!
//! The axis is the eigenvector of the sample covariance with the largest
//! eigenvalue, obtained from a full symmetric eigendecomposition rather than
//! the largest diagonal entry, so tilted cylinders resolve correctly.

use glam::Vec3;
use nalgebra::Matrix3;

use super::{CylinderFit, FitMethod};
use crate::descriptor::CylinderModel;

/// Sample covariance of `points` about `mean`.
fn covariance(points: &[Vec3], mean: Vec3) -> Matrix3<f32> {
    let mut cov = Matrix3::<f32>::zeros();
    for &p in points {
        let d = p - mean;
        let d = [d.x, d.y, d.z];
        for row in 0..3 {
            for col in 0..3 {
                cov[(row, col)] += d[row] * d[col];
            }
        }
    }
    cov / points.len() as f32
}

/// Unit eigenvector of the largest eigenvalue of a symmetric 3x3 matrix.
pub(crate) fn dominant_direction(cov: Matrix3<f32>) -> Option<Vec3> {
    let eigen = cov.symmetric_eigen();
    let (index, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))?;
    let column = eigen.eigenvectors.column(index);
    Vec3::new(column[0], column[1], column[2]).try_normalize()
}

pub(crate) fn fit(samples: &[Vec3]) -> Option<CylinderFit> {
    if samples.len() < 3 {
        return None;
    }

    let mean = samples.iter().copied().sum::<Vec3>() / samples.len() as f32;
    let axis = dominant_direction(covariance(samples, mean))?;

    let mut radius_sum = 0.0;
    let (mut min_h, mut max_h) = (f32::MAX, f32::MIN);
    for &p in samples {
        let rel = p - mean;
        let h = rel.dot(axis);
        radius_sum += (rel - axis * h).length();
        min_h = min_h.min(h);
        max_h = max_h.max(h);
    }
    let radius = radius_sum / samples.len() as f32;
    if !radius.is_finite() || radius <= f32::EPSILON {
        return None;
    }

    Some(CylinderFit {
        model: CylinderModel {
            center: mean + axis * ((min_h + max_h) * 0.5),
            axis,
            radius,
            height: max_h - min_h,
            confidence: 0.0,
        },
        method: FitMethod::Pca,
        iterations: 0,
    })
}
