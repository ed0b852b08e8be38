//! Letter spacing compensation for curved surfaces.
//!
//! Bending maps letter-space X to arc length at the base radius, but the
//! letter caps sit further out and are stretched by `(radius + thickness) /
//! radius`. Without compensation neighbouring caps crowd each other, so every
//! glyph pushes the ones after it along by the width it gains.

use surfacing::MeshGeometry;

use crate::geometry::{GlyphRange, TextGeometry};

/// Outer-to-base arc length ratio for a text of `thickness` on `radius`.
pub fn arc_ratio(radius: f32, thickness: f32) -> f32 {
    (radius + thickness) / radius
}

/// Shift glyphs apart for `radius`; returns the new mesh, glyph ranges and width.
pub(super) fn compensate(flat: &TextGeometry, radius: f32) -> (MeshGeometry, Vec<GlyphRange>, f32) {
    let stretch = arc_ratio(radius, flat.thickness) - 1.0;
    let mut mesh = flat.mesh.clone();
    let mut glyphs = Vec::with_capacity(flat.glyphs.len());
    let mut shift = 0.0;

    for glyph in &flat.glyphs {
        for position in &mut mesh.positions[glyph.vertices()] {
            position.x += shift;
        }
        glyphs.push(GlyphRange {
            min_x: glyph.min_x + shift,
            max_x: glyph.max_x + shift,
            ..*glyph
        });
        shift += glyph.width() * stretch;
    }

    // The last glyph's gain has nothing after it to push
    let width = glyphs.last().map_or(flat.width, |last| last.max_x);
    (mesh, glyphs, width)
}

#[cfg(test)]
mod tests {
    use inscribe_config::TextConfig;

    use super::*;
    use crate::extrude::build_flat_text;

    #[test]
    fn test_gap_grows_by_width_times_ratio() {
        let flat = build_flat_text("AB", &TextConfig::new(1.0, 0.5)).unwrap();
        let (_, glyphs, width) = compensate(&flat, 2.0);

        let flat_gap = flat.glyphs[1].min_x - flat.glyphs[0].max_x;
        let gap = glyphs[1].min_x - glyphs[0].max_x;
        let expected_extra = flat.glyphs[0].width() * (arc_ratio(2.0, 0.5) - 1.0);
        assert!((gap - flat_gap - expected_extra).abs() < 1e-5);
        assert!((width - flat.width - expected_extra).abs() < 1e-5);
    }

    #[test]
    fn test_first_glyph_stays_put() {
        let flat = build_flat_text("AB", &TextConfig::default()).unwrap();
        let (mesh, _, _) = compensate(&flat, 1.0);
        let first = flat.glyphs[0].vertices();
        assert_eq!(&mesh.positions[first.clone()], &flat.mesh.positions[first]);
    }
}
