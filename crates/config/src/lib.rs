//! Shared configuration for surface text
//!
//! This crate is the single source of truth for every tunable used when
//! placing text on a mesh: letter shape and size, surface classification
//! thresholds, cylindrical wrapping detail and engraving presentation.
//!
//! All structs are closed, carry explicit defaults and can be loaded from a
//! partial JSON document; missing fields fall back to the defaults below.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cap height of a line of text in world units
pub const DEFAULT_TEXT_SIZE: f32 = 1.0;

/// Default extrusion height of raised letters above the surface
pub const DEFAULT_TEXT_THICKNESS: f32 = 0.2;

/// Default depth letters reach below the surface (cut depth when engraved)
pub const DEFAULT_ENGRAVE_DEPTH: f32 = 0.1;

/// Default base gap between letters, as a fraction of the text size
pub const DEFAULT_LETTER_SPACING: f32 = 0.15;

/// Default letter color (light grey, linear RGBA)
pub const DEFAULT_TEXT_COLOR: [f32; 4] = [0.85, 0.85, 0.85, 1.0];

/// Cylinder fits below this confidence are always treated as planes
pub const MIN_CYLINDER_CONFIDENCE: f32 = 0.3;

/// Cylinder fits at or above this confidence go through strict validation
pub const STRICT_CYLINDER_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Built-in letter faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFace {
    /// Square block cells
    #[default]
    Block,
    /// Block cells at three quarters of the width
    BlockCondensed,
}

impl FontFace {
    /// Horizontal cell size relative to the vertical cell size.
    pub fn cell_aspect(self) -> f32 {
        match self {
            FontFace::Block => 1.0,
            FontFace::BlockCondensed => 0.75,
        }
    }
}

/// Chamfer applied to the outline of the outer letter cap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BevelConfig {
    pub enabled: bool,
    /// How far the cap outline is lowered, in world units
    pub depth: f32,
}

impl Default for BevelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            depth: 0.04,
        }
    }
}

/// Per-text shape and appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Cap height in world units
    pub size: f32,
    /// Extrusion above the surface
    pub thickness: f32,
    /// Extrusion below the surface; this is the cut depth when engraved
    pub engrave_depth: f32,
    pub font: FontFace,
    /// Linear RGBA
    pub color: [f32; 4],
    /// Base gap between letters as a fraction of `size`
    pub letter_spacing: f32,
    pub bevel: BevelConfig,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_TEXT_SIZE,
            thickness: DEFAULT_TEXT_THICKNESS,
            engrave_depth: DEFAULT_ENGRAVE_DEPTH,
            font: FontFace::default(),
            color: DEFAULT_TEXT_COLOR,
            letter_spacing: DEFAULT_LETTER_SPACING,
            bevel: BevelConfig::default(),
        }
    }
}

impl TextConfig {
    /// Create a config with the given size and thickness, other fields default
    pub fn new(size: f32, thickness: f32) -> Self {
        Self {
            size,
            thickness,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.size > 0.0) {
            return Err(invalid("text.size", format!("{} must be positive", self.size)));
        }
        if !(self.thickness > 0.0) {
            return Err(invalid(
                "text.thickness",
                format!("{} must be positive", self.thickness),
            ));
        }
        if !(self.engrave_depth >= 0.0) {
            return Err(invalid(
                "text.engrave_depth",
                format!("{} must not be negative", self.engrave_depth),
            ));
        }
        if !(self.letter_spacing >= 0.0) {
            return Err(invalid(
                "text.letter_spacing",
                format!("{} must not be negative", self.letter_spacing),
            ));
        }
        if self.bevel.enabled && !(self.bevel.depth > 0.0 && self.bevel.depth < self.thickness) {
            return Err(invalid(
                "text.bevel.depth",
                format!(
                    "{} must be between 0 and the thickness {}",
                    self.bevel.depth, self.thickness
                ),
            ));
        }
        Ok(())
    }
}

/// Thresholds for planar/cylindrical surface classification.
///
/// Values are configurable and should not be treated as magic numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Maximum number of evenly strided vertices used for fitting (default: 100)
    pub max_samples: usize,
    /// Meshes with fewer vertices are planes without fitting (default: 100)
    pub min_vertices: usize,
    /// RANSAC iterations (default: 150)
    pub ransac_iterations: usize,
    /// Samples drawn per RANSAC iteration, 3 for the circle + checks (default: 5)
    pub ransac_sample_size: usize,
    /// Seed for the RANSAC sampler so fits are reproducible
    pub ransac_seed: u64,
    /// Circle points with a smaller cross-product magnitude are collinear (default: 1e-3)
    pub collinear_epsilon: f32,
    /// Max |distance-to-axis - radius| for an inlier (default: 0.15)
    pub inlier_tolerance: f32,
    /// Minimum inlier fraction for a RANSAC candidate (default: 0.5)
    pub min_inlier_ratio: f32,
    /// Below this confidence the fit is rejected (default: 0.3)
    pub min_confidence: f32,
    /// At or above this confidence the strict check runs (default: 0.5)
    pub strict_confidence: f32,
    /// Radius or height below this is degenerate (default: 0.05)
    pub min_dimension: f32,
    /// Radius above this multiple of the sample extent is effectively flat (default: 10.0)
    pub max_radius_ratio: f32,
    /// Lenient check: required fraction within tolerance (default: 0.6)
    pub lenient_inlier_ratio: f32,
    /// Lenient check: tolerance floor (default: 0.3)
    pub lenient_tolerance_floor: f32,
    /// Lenient check: tolerance as a fraction of radius (default: 0.2)
    pub lenient_tolerance_factor: f32,
    /// Strict check: required inlier fraction (default: 0.7)
    pub strict_inlier_ratio: f32,
    /// Strict check: max residual std-dev as a fraction of radius (default: 0.15)
    pub strict_max_deviation: f32,
    /// Strict check: min angular uniformity (default: 0.6)
    pub strict_min_angular_uniformity: f32,
    /// Strict check: min axial coverage (default: 0.5)
    pub strict_min_axial_coverage: f32,
    /// Histogram bins around the axis (default: 12)
    pub angular_bins: usize,
    /// Histogram bins along the axis (default: 10)
    pub axial_bins: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_samples: 100,
            min_vertices: 100,
            ransac_iterations: 150,
            ransac_sample_size: 5,
            ransac_seed: 0x5eed_c11d,
            collinear_epsilon: 1e-3,
            inlier_tolerance: 0.15,
            min_inlier_ratio: 0.5,
            min_confidence: MIN_CYLINDER_CONFIDENCE,
            strict_confidence: STRICT_CYLINDER_CONFIDENCE,
            min_dimension: 0.05,
            max_radius_ratio: 10.0,
            lenient_inlier_ratio: 0.6,
            lenient_tolerance_floor: 0.3,
            lenient_tolerance_factor: 0.2,
            strict_inlier_ratio: 0.7,
            strict_max_deviation: 0.15,
            strict_min_angular_uniformity: 0.6,
            strict_min_axial_coverage: 0.5,
            angular_bins: 12,
            axial_bins: 10,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ransac_sample_size < 3 {
            return Err(invalid(
                "classifier.ransac_sample_size",
                "a circle needs at least 3 samples",
            ));
        }
        if self.max_samples < self.ransac_sample_size {
            return Err(invalid(
                "classifier.max_samples",
                format!("must be at least ransac_sample_size ({})", self.ransac_sample_size),
            ));
        }
        if self.angular_bins < 2 || self.axial_bins < 1 {
            return Err(invalid("classifier.angular_bins", "histograms need bins"));
        }
        if self.min_confidence > self.strict_confidence {
            return Err(invalid(
                "classifier.min_confidence",
                "must not exceed strict_confidence",
            ));
        }
        Ok(())
    }
}

/// Cylindrical wrapping detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapConfig {
    /// Midpoint subdivision levels applied before bending (each level = 4x triangles)
    pub subdivision_level: u32,
    /// Vertex normals aligned with the radial direction beyond this are cap normals (default: 0.7)
    pub cap_alignment: f32,
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            subdivision_level: 1,
            cap_alignment: 0.7,
        }
    }
}

impl WrapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 4^6 times the letter triangles is already far beyond what a label needs
        if self.subdivision_level > 6 {
            return Err(invalid(
                "wrap.subdivision_level",
                format!("{} exceeds the maximum of 6", self.subdivision_level),
            ));
        }
        if !(0.0..=1.0).contains(&self.cap_alignment) {
            return Err(invalid("wrap.cap_alignment", "must be within 0..=1"));
        }
        Ok(())
    }
}

/// Presentation of engraved text on the target mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngravingConfig {
    /// Multiplier applied to the surface color for cut regions (default: 0.6)
    pub cut_darkening: f32,
    /// Outward offset of a text while its position is being edited (default: 0.02)
    pub edit_offset: f32,
}

impl Default for EngravingConfig {
    fn default() -> Self {
        Self {
            cut_darkening: 0.6,
            edit_offset: 0.02,
        }
    }
}

/// Everything the engraving core can be configured with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngravingSettings {
    pub text: TextConfig,
    pub classifier: ClassifierConfig,
    pub wrap: WrapConfig,
    pub engraving: EngravingConfig,
}

impl EngravingSettings {
    /// Parse settings from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.text.validate()?;
        self.classifier.validate()?;
        self.wrap.validate()?;
        if !(0.0..=1.0).contains(&self.engraving.cut_darkening) {
            return Err(invalid("engraving.cut_darkening", "must be within 0..=1"));
        }
        Ok(())
    }
}
