//! Planar/cylindrical classification of a clicked surface.
//!
//! ## Pipeline
//!
//! 1. Short-circuit to a plane for box primitives and sparse meshes
//! 2. Sample up to `max_samples` evenly strided world-space vertices
//! 3. RANSAC circle fit against the three world axes
//! 4. PCA fallback (dominant eigenvector of the sample covariance)
//! 5. Confidence scoring and lenient/strict validation
//!
//! Any step that cannot produce a trustworthy cylinder degrades to a plane
//! through the clicked point, oriented by the nearest face. The reason is
//! kept in [`FitDiagnostics::degraded`].

mod metrics;
mod pca;
mod ransac;
mod validation;

use glam::Vec3;
use inscribe_config::ClassifierConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::descriptor::{CylinderModel, PlaneModel, SurfaceDescriptor};
use crate::mesh::{MeshQuery, ShapeHint};
use crate::raycast::closest_triangle;

pub use metrics::ConfidenceBreakdown;

/// Which estimator produced the cylinder candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitMethod {
    Ransac,
    Pca,
}

/// Why a classification fell back to a plane.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DegradeReason {
    #[error("mesh is an explicit box primitive")]
    BoxPrimitive,
    #[error("only {count} vertices, too few for a reliable fit")]
    TooFewVertices { count: usize },
    #[error("no cylinder candidate could be fitted")]
    NoCandidate,
    #[error("confidence {confidence:.3} below {minimum:.3}")]
    LowConfidence { confidence: f32, minimum: f32 },
    #[error("degenerate cylinder (radius {radius:.4}, height {height:.4})")]
    Degenerate { radius: f32, height: f32 },
    #[error("radius {radius:.3} is effectively flat for extent {extent:.3}")]
    RadiusTooLarge { radius: f32, extent: f32 },
    #[error("lenient check failed: {within:.2} of points near the surface, need {required:.2}")]
    LenientCheckFailed { within: f32, required: f32 },
    #[error("strict check failed on {check}: {value:.3}")]
    StrictCheckFailed { check: StrictCheck, value: f32 },
}

/// Individual criteria of the strict validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrictCheck {
    InlierRatio,
    Deviation,
    AngularUniformity,
    AxialCoverage,
}

impl std::fmt::Display for StrictCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StrictCheck::InlierRatio => "inlier ratio",
            StrictCheck::Deviation => "surface deviation",
            StrictCheck::AngularUniformity => "angular uniformity",
            StrictCheck::AxialCoverage => "axial coverage",
        };
        f.write_str(name)
    }
}

/// Structured record of how a classification was reached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitDiagnostics {
    /// Vertices used for fitting
    pub sample_count: usize,
    pub method: Option<FitMethod>,
    /// RANSAC iterations actually run
    pub iterations: usize,
    /// Samples within the inlier tolerance of the final candidate
    pub inlier_count: usize,
    pub confidence: Option<ConfidenceBreakdown>,
    /// Best cylinder found, even when it was rejected
    pub candidate: Option<CylinderModel>,
    /// Set whenever the result is a fallback plane
    pub degraded: Option<DegradeReason>,
}

/// Result of [`classify_surface`]: the descriptor plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub descriptor: SurfaceDescriptor,
    pub diagnostics: FitDiagnostics,
}

impl Classification {
    fn plane(plane: PlaneModel, diagnostics: FitDiagnostics) -> Self {
        Self {
            descriptor: SurfaceDescriptor::Plane(plane),
            diagnostics,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.diagnostics.degraded.is_some()
    }
}

/// A candidate cylinder with the samples that support it.
#[derive(Debug, Clone)]
pub(crate) struct CylinderFit {
    pub model: CylinderModel,
    pub method: FitMethod,
    pub iterations: usize,
}

/// Plane through the clicked point, oriented by the nearest face.
fn fallback_plane(mesh: &impl MeshQuery, hint: Vec3) -> PlaneModel {
    let normal = closest_triangle(mesh.geometry(), &mesh.world_transform(), hint)
        .map_or(Vec3::Y, |surface| surface.normal);
    PlaneModel::new(hint, normal)
}

/// Evenly strided world-space vertex sample.
pub(crate) fn sample_vertices(mesh: &impl MeshQuery, max_samples: usize) -> Vec<Vec3> {
    let positions = &mesh.geometry().positions;
    let transform = mesh.world_transform();
    let stride = (positions.len() / max_samples.max(1)).max(1);
    positions
        .iter()
        .step_by(stride)
        .take(max_samples)
        .map(|&p| transform.transform_point3(p))
        .collect()
}

/// Classify the surface around `hint` (a world-space point on the mesh).
///
/// Never fails: the worst case is a plane through `hint`.
pub fn classify_surface(
    mesh: &impl MeshQuery,
    hint: Vec3,
    config: &ClassifierConfig,
) -> Classification {
    let plane = fallback_plane(mesh, hint);
    let mut diagnostics = FitDiagnostics::default();

    if mesh.shape_hint() == ShapeHint::Box {
        diagnostics.degraded = Some(DegradeReason::BoxPrimitive);
        return Classification::plane(plane, diagnostics);
    }

    let vertex_count = mesh.geometry().vertex_count();
    if vertex_count < config.min_vertices {
        diagnostics.degraded = Some(DegradeReason::TooFewVertices {
            count: vertex_count,
        });
        return Classification::plane(plane, diagnostics);
    }

    let samples = sample_vertices(mesh, config.max_samples);
    diagnostics.sample_count = samples.len();

    let fit = ransac::fit(&samples, config).or_else(|| pca::fit(&samples));
    let Some(CylinderFit {
        model,
        method,
        iterations,
    }) = fit
    else {
        debug!("classify_surface: no cylinder candidate from {} samples", samples.len());
        diagnostics.degraded = Some(DegradeReason::NoCandidate);
        return Classification::plane(plane, diagnostics);
    };

    let breakdown = metrics::confidence(&model, &samples, config);
    let model = CylinderModel {
        confidence: breakdown.total,
        ..model
    };

    diagnostics.method = Some(method);
    diagnostics.iterations = iterations;
    diagnostics.inlier_count = metrics::count_within(&model, &samples, config.inlier_tolerance);
    diagnostics.confidence = Some(breakdown);
    diagnostics.candidate = Some(model);

    debug!(
        "classify_surface: {:?} candidate r={:.3} h={:.3} confidence={:.3} ({} / {} inliers)",
        method,
        model.radius,
        model.height,
        model.confidence,
        diagnostics.inlier_count,
        samples.len()
    );

    match validation::validate(&model, &samples, config) {
        Ok(()) => Classification {
            descriptor: SurfaceDescriptor::Cylinder(model),
            diagnostics,
        },
        Err(reason) => {
            warn!("Cylinder rejected, using plane: {}", reason);
            diagnostics.degraded = Some(reason);
            Classification::plane(plane, diagnostics)
        }
    }
}
