//! Text objects and their mode.

use std::fmt;

use glam::{Mat4, Vec3};
use inscribe_config::TextConfig;
use lettering::{GeneratedText, Placement, TextGeometry};
use serde::{Deserialize, Serialize};
use surfacing::{MeshGeometry, SurfaceDescriptor};

/// Unique text identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextId(pub u64);

impl fmt::Display for TextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "text#{}", self.0)
    }
}

/// Unique target mesh identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// How a text is rendered against its target.
///
/// `Raised -> Engraved` and back are the normal transitions. A failed attempt
/// to engrave lands in `EngraveFailed`, which a later successful switch clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextMode {
    #[default]
    Raised,
    Engraved,
    EngraveFailed,
}

/// State kept while a text is lifted off its target for repositioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionEdit {
    /// The text was engraved when the edit began and is re-engraved at the end
    pub was_engraved: bool,
}

/// A text placed on a target mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct TextObject {
    pub id: TextId,
    pub target: TargetId,
    pub content: String,
    pub config: TextConfig,
    pub placement: Placement,
    /// Letter-space solids
    pub flat: TextGeometry,
    /// World-space solids (cylinder placements only)
    pub wrapped: Option<TextGeometry>,
    /// Letter-to-world transform of `flat` (plane placements)
    pub transform: Mat4,
    pub mode: TextMode,
    /// Whether the text's own mesh is shown
    pub visible: bool,
    pub edit: Option<PositionEdit>,
    /// Captured error of the last failed engrave
    pub error: Option<String>,
}

impl TextObject {
    pub(crate) fn new(
        id: TextId,
        target: TargetId,
        content: String,
        config: TextConfig,
        placement: Placement,
        generated: GeneratedText,
    ) -> Self {
        Self {
            id,
            target,
            content,
            config,
            placement: Placement {
                descriptor: generated.descriptor,
                ..placement
            },
            flat: generated.flat,
            wrapped: generated.wrapped,
            transform: generated.transform,
            mode: TextMode::Raised,
            visible: true,
            edit: None,
            error: None,
        }
    }

    /// Replace the geometry; the placement adopts the descriptor actually used.
    pub(crate) fn set_geometry(&mut self, generated: GeneratedText) {
        self.placement.descriptor = generated.descriptor;
        self.flat = generated.flat;
        self.wrapped = generated.wrapped;
        self.transform = generated.transform;
    }

    pub fn surface_descriptor(&self) -> &SurfaceDescriptor {
        &self.placement.descriptor
    }

    pub fn is_engraved(&self) -> bool {
        self.mode == TextMode::Engraved
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    /// World-space letter solids.
    pub fn world_geometry(&self) -> MeshGeometry {
        match &self.wrapped {
            Some(wrapped) => wrapped.mesh.clone(),
            None => self.flat.mesh.transformed(&self.transform),
        }
    }

    /// Letter solids in the local space of a target placed at `target_world`.
    pub fn tool_geometry(&self, target_world: &Mat4) -> MeshGeometry {
        let to_target = target_world.inverse();
        match &self.wrapped {
            Some(wrapped) => wrapped.mesh.transformed(&to_target),
            None => self.flat.mesh.transformed(&(to_target * self.transform)),
        }
    }

    /// World-space geometry as shown, lifted by `edit_offset` along the
    /// surface normal while the position is being edited. `None` when hidden.
    pub fn display_geometry(&self, edit_offset: f32) -> Option<MeshGeometry> {
        if !self.visible {
            return None;
        }
        let geometry = self.world_geometry();
        if self.is_editing() {
            let lift = Mat4::from_translation(self.placement.normal() * edit_offset);
            return Some(geometry.transformed(&lift));
        }
        Some(geometry)
    }

    /// World-space anchor the text block is centred on.
    pub fn anchor(&self) -> Vec3 {
        self.placement.anchor
    }
}
