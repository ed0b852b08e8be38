//! Extruded letters for placing text on surfaces.
//!
//! This crate provides:
//! - [`font`] - The built-in 5x7 block font
//! - [`extrude`] - Layout and extrusion of flat, closed letter solids
//! - [`wrap`] - Wrapping flat letters onto a cylinder
//! - [`placement`] - Plane or cylinder geometry for a text placement
//!
//! Flat letters live in letter space: X along the reading direction, Y up
//! and Z out of the surface, with the surface itself at Z = 0. Wrapped
//! letters are in world space.

pub mod extrude;
pub mod font;
pub mod geometry;
pub mod placement;
pub mod wrap;

pub use extrude::build_flat_text;
pub use geometry::{GeometrySpace, GlyphRange, TextGeometry};
pub use placement::{generate_text_geometry, GeneratedText, Placement};
pub use wrap::{wrap_text, WrapFrame};

use inscribe_config::ConfigError;
use thiserror::Error;

/// Text shape generation failures.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Text has no printable characters")]
    EmptyText,
    #[error("Character {0:?} is not in the font")]
    UnsupportedCharacter(char),
    #[error("Invalid text config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("Cannot wrap onto a cylinder of radius {radius}")]
    InvalidCylinder { radius: f32 },
    #[error("Expected letter-space geometry")]
    NotLetterSpace,
}
