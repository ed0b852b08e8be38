//! Acceptance checks for a scored cylinder candidate.
//!
//! Candidates between `min_confidence` and `strict_confidence` only need most
//! samples near the surface. Anything above must also be well distributed
//! around and along the axis, which rules out spheres and partial arcs that
//! happen to score well.

use glam::Vec3;
use inscribe_config::ClassifierConfig;

use super::metrics::{angular_uniformity, axial_coverage, fraction_within, mean_and_std};
use super::{DegradeReason, StrictCheck};
use crate::descriptor::CylinderModel;
use crate::mesh::Aabb;

pub(crate) fn validate(
    model: &CylinderModel,
    samples: &[Vec3],
    config: &ClassifierConfig,
) -> Result<(), DegradeReason> {
    if model.confidence < config.min_confidence {
        return Err(DegradeReason::LowConfidence {
            confidence: model.confidence,
            minimum: config.min_confidence,
        });
    }

    if model.radius < config.min_dimension || model.height < config.min_dimension {
        return Err(DegradeReason::Degenerate {
            radius: model.radius,
            height: model.height,
        });
    }

    let extent = Aabb::from_points(samples.iter().copied()).map_or(0.0, |bounds| bounds.diagonal());
    if model.radius > config.max_radius_ratio * extent {
        return Err(DegradeReason::RadiusTooLarge {
            radius: model.radius,
            extent,
        });
    }

    if model.confidence < config.strict_confidence {
        lenient(model, samples, config)
    } else {
        strict(model, samples, config)
    }
}

fn lenient(
    model: &CylinderModel,
    samples: &[Vec3],
    config: &ClassifierConfig,
) -> Result<(), DegradeReason> {
    let tolerance = config
        .lenient_tolerance_floor
        .max(config.lenient_tolerance_factor * model.radius);
    let within = fraction_within(model, samples, tolerance);
    if within < config.lenient_inlier_ratio {
        return Err(DegradeReason::LenientCheckFailed {
            within,
            required: config.lenient_inlier_ratio,
        });
    }
    Ok(())
}

fn strict(
    model: &CylinderModel,
    samples: &[Vec3],
    config: &ClassifierConfig,
) -> Result<(), DegradeReason> {
    let fail = |check, value| Err(DegradeReason::StrictCheckFailed { check, value });

    let inliers = fraction_within(model, samples, config.inlier_tolerance);
    if inliers < config.strict_inlier_ratio {
        return fail(StrictCheck::InlierRatio, inliers);
    }

    let (_, spread) = mean_and_std(
        samples
            .iter()
            .map(|&p| model.distance_to_axis(p) - model.radius),
    );
    let deviation = spread / model.radius;
    if deviation >= config.strict_max_deviation {
        return fail(StrictCheck::Deviation, deviation);
    }

    let uniformity = angular_uniformity(model, samples, config.angular_bins);
    if uniformity <= config.strict_min_angular_uniformity {
        return fail(StrictCheck::AngularUniformity, uniformity);
    }

    let coverage = axial_coverage(model, samples, config.axial_bins);
    if coverage <= config.strict_min_axial_coverage {
        return fail(StrictCheck::AxialCoverage, coverage);
    }

    Ok(())
}
