//! Target material slots.
//!
//! Slot 0 is the target's own surface material. Every engraved text adds one
//! slot holding a darkened copy of that color, tagged with the text's id so a
//! picked triangle can be traced back to its text through the material groups.

use serde::{Deserialize, Serialize};

use crate::text::TextId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMaterial {
    /// Linear RGBA
    pub color: [f32; 4],
    /// Text whose cut this slot colors
    pub engraved_text: Option<TextId>,
}

impl SurfaceMaterial {
    pub fn new(color: [f32; 4]) -> Self {
        Self {
            color,
            engraved_text: None,
        }
    }

    pub fn is_engraved_text(&self) -> bool {
        self.engraved_text.is_some()
    }

    /// Cut material for `text`: this color darkened by `factor`, alpha kept.
    pub fn cut_for(&self, text: TextId, factor: f32) -> Self {
        let [r, g, b, a] = self.color;
        Self {
            color: [r * factor, g * factor, b * factor, a],
            engraved_text: Some(text),
        }
    }
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self::new([0.8, 0.8, 0.8, 1.0])
    }
}
