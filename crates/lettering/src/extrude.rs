//! Flat letter extrusion.
//!
//! Every filled font cell contributes a top cap, a bottom cap and a wall on
//! each side that faces an empty cell, so a glyph is the closed surface of
//! its voxels. Grid corners where two cells touch only diagonally would be
//! shared by four walls; each owning cell pulls its copy of such a corner
//! slightly towards its own centre, so every edge borders exactly two faces.
//!
//! ```text
//!   +---+            +---+
//!   | B |            | B |
//!   +---X---+   ->   +--x x--+
//!       | A |            | A |
//!       +---+            +---+
//! ```

use glam::Vec3;
use inscribe_config::TextConfig;
use tracing::debug;

use crate::font::{self, Glyph, GLYPH_COLUMNS, GLYPH_ROWS};
use crate::geometry::{
    edges_are_closed, edges_are_oriented, GeometrySpace, GlyphRange, TextGeometry,
};
use crate::GeometryError;
use surfacing::MeshGeometry;

/// Fraction of a cell a diagonal-only corner is pulled inwards
const DIAGONAL_INSET: f32 = 0.01;

/// Dimensions of one glyph cell in letter space.
#[derive(Debug, Clone, Copy)]
struct CellMetrics {
    width: f32,
    height: f32,
    top: f32,
    bottom: f32,
    /// Cap outline drop, zero without bevel
    bevel: f32,
}

/// Append a quad as two triangles, each wound to face `outward`.
fn push_quad(out: &mut Vec<Vec3>, [a, b, c, d]: [Vec3; 4], outward: Vec3) {
    for [p, q, r] in [[a, b, c], [a, c, d]] {
        if (q - p).cross(r - p).dot(outward) >= 0.0 {
            out.extend_from_slice(&[p, q, r]);
        } else {
            out.extend_from_slice(&[p, r, q]);
        }
    }
}

/// Whether the grid corner `(i, j)` sits on the glyph outline.
fn on_outline(glyph: &Glyph, i: i32, j: i32) -> bool {
    let around = [
        glyph.filled(i - 1, j - 1),
        glyph.filled(i, j - 1),
        glyph.filled(i - 1, j),
        glyph.filled(i, j),
    ];
    around.iter().any(|&f| f) && around.iter().any(|&f| !f)
}

/// Extrude one glyph with its lower-left corner at `pen` on the baseline.
fn extrude_glyph(glyph: &Glyph, pen: f32, metrics: &CellMetrics, out: &mut Vec<Vec3>) {
    for column in 0..GLYPH_COLUMNS as i32 {
        for row in 0..GLYPH_ROWS as i32 {
            if !glyph.filled(column, row) {
                continue;
            }

            // Corner (dx, dy) of this cell, at the top or bottom cap height
            let corner = |dx: i32, dy: i32, top: bool| {
                let toward_x = 1 - 2 * dx;
                let toward_y = 1 - 2 * dy;
                let diagonal_only = glyph.filled(column - toward_x, row - toward_y)
                    && !glyph.filled(column - toward_x, row)
                    && !glyph.filled(column, row - toward_y);
                let inset = if diagonal_only { DIAGONAL_INSET } else { 0.0 };

                let (i, j) = (column + dx, row + dy);
                let x = pen + (i as f32 + inset * toward_x as f32) * metrics.width;
                let y = (j as f32 + inset * toward_y as f32) * metrics.height;
                let z = if !top {
                    metrics.bottom
                } else if metrics.bevel > 0.0 && on_outline(glyph, i, j) {
                    metrics.top - metrics.bevel
                } else {
                    metrics.top
                };
                Vec3::new(x, y, z)
            };

            push_quad(
                out,
                [corner(0, 0, true), corner(1, 0, true), corner(1, 1, true), corner(0, 1, true)],
                Vec3::Z,
            );
            push_quad(
                out,
                [corner(0, 0, false), corner(0, 1, false), corner(1, 1, false), corner(1, 0, false)],
                Vec3::NEG_Z,
            );

            let walls = [
                ((-1, 0), [(0, 0), (0, 1)], Vec3::NEG_X),
                ((1, 0), [(1, 0), (1, 1)], Vec3::X),
                ((0, -1), [(0, 0), (1, 0)], Vec3::NEG_Y),
                ((0, 1), [(0, 1), (1, 1)], Vec3::Y),
            ];
            for ((nx, ny), [(ax, ay), (bx, by)], outward) in walls {
                if glyph.filled(column + nx, row + ny) {
                    continue;
                }
                push_quad(
                    out,
                    [
                        corner(ax, ay, false),
                        corner(bx, by, false),
                        corner(bx, by, true),
                        corner(ax, ay, true),
                    ],
                    outward,
                );
            }
        }
    }
}

/// Lay out `content` on one line and extrude it into closed letter solids.
///
/// The result is in letter space: the baseline runs along +X from the
/// origin, caps face +Z at `thickness` and the letters reach down to
/// `-engrave_depth`. Whitespace only advances the pen.
pub fn build_flat_text(content: &str, config: &TextConfig) -> Result<TextGeometry, GeometryError> {
    config.validate()?;
    if content.trim().is_empty() {
        return Err(GeometryError::EmptyText);
    }

    let cell_height = config.size / GLYPH_ROWS as f32;
    let metrics = CellMetrics {
        width: cell_height * config.font.cell_aspect(),
        height: cell_height,
        top: config.thickness,
        bottom: -config.engrave_depth,
        bevel: if config.bevel.enabled {
            config.bevel.depth
        } else {
            0.0
        },
    };
    let glyph_width = metrics.width * GLYPH_COLUMNS as f32;
    let gap = config.letter_spacing * config.size;

    let mut triangles = Vec::new();
    let mut glyphs = Vec::new();
    let mut pen = 0.0;

    for c in content.chars() {
        if !c.is_whitespace() {
            let glyph = font::glyph(c).ok_or(GeometryError::UnsupportedCharacter(c))?;
            let first_triangle = triangles.len() / 3;
            extrude_glyph(&glyph, pen, &metrics, &mut triangles);
            glyphs.push(GlyphRange {
                character: c,
                first_triangle,
                triangle_count: triangles.len() / 3 - first_triangle,
                min_x: pen,
                max_x: pen + glyph_width,
            });
        }
        pen += glyph_width + gap;
    }

    let width = glyphs.last().map_or(0.0, |last| last.max_x);
    debug!(
        "build_flat_text: {} glyphs, {} triangles, width {:.3}",
        glyphs.len(),
        triangles.len() / 3,
        width
    );

    let mesh = MeshGeometry::from_triangle_list(triangles);
    let is_manifold = edges_are_closed(&mesh) && edges_are_oriented(&mesh);
    Ok(TextGeometry {
        mesh,
        glyphs,
        space: GeometrySpace::Letter,
        is_manifold,
        width,
        height: config.size,
        thickness: config.thickness,
        cylinder: None,
    })
}
