//! Target meshes and their pristine snapshot.

use glam::Mat4;
use surfacing::{MeshGeometry, MeshInstance, MeshQuery, ShapeHint};

use crate::material::SurfaceMaterial;
use crate::text::{TargetId, TextId};

/// Geometry and material of a target before any text was cut into it.
///
/// Captured on the first engrave and never modified; every recomputation
/// starts from a copy of it.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSnapshot {
    pub geometry: MeshGeometry,
    pub material: SurfaceMaterial,
}

/// A mesh that texts are placed on.
#[derive(Debug, Clone, PartialEq)]
pub struct EngravingTarget {
    pub id: TargetId,
    /// Current geometry (possibly cut), world transform and shape hint
    pub(crate) mesh: MeshInstance,
    /// Slot 0 is the surface material, then one slot per engraved text
    pub(crate) materials: Vec<SurfaceMaterial>,
    pub(crate) snapshot: Option<TargetSnapshot>,
    /// Engraved texts in the order they became engraved
    pub(crate) engraved: Vec<TextId>,
    /// Text currently lifted for repositioning
    pub(crate) editing: Option<TextId>,
}

impl EngravingTarget {
    pub(crate) fn new(id: TargetId, mesh: MeshInstance, material: SurfaceMaterial) -> Self {
        Self {
            id,
            mesh,
            materials: vec![material],
            snapshot: None,
            engraved: Vec::new(),
            editing: None,
        }
    }

    pub fn mesh(&self) -> &MeshInstance {
        &self.mesh
    }

    pub fn materials(&self) -> &[SurfaceMaterial] {
        &self.materials
    }

    pub fn snapshot(&self) -> Option<&TargetSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn engraved_texts(&self) -> &[TextId] {
        &self.engraved
    }

    pub fn editing_text(&self) -> Option<TextId> {
        self.editing
    }

    /// Capture the snapshot unless one is already held. Returns true when a
    /// new snapshot was taken.
    pub(crate) fn ensure_snapshot(&mut self) -> bool {
        if self.snapshot.is_some() {
            return false;
        }
        self.snapshot = Some(TargetSnapshot {
            geometry: self.mesh.geometry.clone(),
            material: self.materials[0],
        });
        true
    }

    /// Put the pristine geometry and material back and drop the snapshot.
    pub(crate) fn restore_snapshot(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.mesh.geometry = snapshot.geometry;
            self.materials = vec![snapshot.material];
        }
    }

    /// Read-only view of the uncut mesh, used for classification.
    pub fn pristine(&self) -> PristineView<'_> {
        PristineView { target: self }
    }
}

impl MeshQuery for EngravingTarget {
    fn geometry(&self) -> &MeshGeometry {
        &self.mesh.geometry
    }

    fn world_transform(&self) -> Mat4 {
        self.mesh.transform
    }

    fn shape_hint(&self) -> ShapeHint {
        self.mesh.shape
    }
}

/// A target as it was before any cut.
#[derive(Debug, Clone, Copy)]
pub struct PristineView<'a> {
    target: &'a EngravingTarget,
}

impl MeshQuery for PristineView<'_> {
    fn geometry(&self) -> &MeshGeometry {
        self.target
            .snapshot
            .as_ref()
            .map_or(&self.target.mesh.geometry, |snapshot| &snapshot.geometry)
    }

    fn world_transform(&self) -> Mat4 {
        self.target.mesh.transform
    }

    fn shape_hint(&self) -> ShapeHint {
        self.target.mesh.shape
    }
}
