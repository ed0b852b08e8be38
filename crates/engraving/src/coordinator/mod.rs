//! Per-target engraving state and the operations that change it.
//!
//! Every structural change (engrave, raise, delete, update, reposition)
//! recomputes the target from its pristine snapshot by replaying the cuts of
//! all engraved texts in the order they were engraved. A replay is built on
//! scratch geometry and committed only when every subtract succeeded.
//!
//! Operations take `&mut self`, so at most one of them is in flight per
//! coordinator at a time.

mod replay;

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use inscribe_config::{EngravingSettings, TextConfig};
use lettering::{generate_text_geometry, GeneratedText, GeometryError, Placement};
use surfacing::{classify_surface, raycast_mesh, MeshGeometry, MeshInstance, Ray};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::boolean::{BooleanError, BooleanSubtract};
use crate::material::SurfaceMaterial;
use crate::target::EngravingTarget;
use crate::text::{PositionEdit, TargetId, TextId, TextMode, TextObject};

use replay::{replay, Replayed};

#[derive(Debug, Error)]
pub enum EngraveError {
    #[error("Unknown text: {0}")]
    UnknownText(TextId),

    #[error("Unknown target: {0}")]
    UnknownTarget(TargetId),

    #[error("Text {0} is not being repositioned")]
    NotEditing(TextId),

    #[error("Text {0} is being repositioned")]
    Editing(TextId),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Boolean(#[from] BooleanError),
}

/// Result of a mode switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Success,
    /// The boolean subtract failed; `error` is the captured message
    Failed { error: String },
}

impl SwitchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SwitchOutcome::Success)
    }
}

/// Owns the targets and texts and drives a [`BooleanSubtract`] backend.
pub struct EngravingCoordinator<B> {
    backend: B,
    settings: EngravingSettings,
    targets: HashMap<TargetId, EngravingTarget>,
    texts: HashMap<TextId, TextObject>,
    next_target_id: u64,
    next_text_id: u64,
}

impl<B: BooleanSubtract> EngravingCoordinator<B> {
    pub fn new(backend: B, settings: EngravingSettings) -> Self {
        Self {
            backend,
            settings,
            targets: HashMap::new(),
            texts: HashMap::new(),
            next_target_id: 1,
            next_text_id: 1,
        }
    }

    pub fn settings(&self) -> &EngravingSettings {
        &self.settings
    }

    /// Register a mesh that texts can be placed on.
    pub fn add_target(&mut self, mesh: MeshInstance, material: SurfaceMaterial) -> TargetId {
        let id = TargetId(self.next_target_id);
        self.next_target_id += 1;
        self.targets
            .insert(id, EngravingTarget::new(id, mesh, material));
        debug!("add_target: {} registered", id);
        id
    }

    pub fn target(&self, id: TargetId) -> Option<&EngravingTarget> {
        self.targets.get(&id)
    }

    pub fn text(&self, id: TextId) -> Option<&TextObject> {
        self.texts.get(&id)
    }

    /// Texts placed on `target`, ordered by id.
    pub fn texts_on(&self, target: TargetId) -> Vec<&TextObject> {
        let mut texts: Vec<_> = self
            .texts
            .values()
            .filter(|text| text.target == target)
            .collect();
        texts.sort_by_key(|text| text.id);
        texts
    }

    /// Engraved texts on `target` in replay order.
    pub fn engraved_texts(&self, target: TargetId) -> &[TextId] {
        self.targets
            .get(&target)
            .map(|target| target.engraved_texts())
            .unwrap_or_default()
    }

    /// Geometry to show for a text, or `None` while it is hidden by its cut.
    pub fn display_geometry(&self, id: TextId) -> Option<MeshGeometry> {
        self.texts
            .get(&id)
            .and_then(|text| text.display_geometry(self.settings.engraving.edit_offset))
    }

    /// Move a target in the world. Cuts are not recomputed until
    /// [`reapply_engraving`](Self::reapply_engraving) is called.
    pub fn set_target_transform(
        &mut self,
        target: TargetId,
        transform: Mat4,
    ) -> Result<(), EngraveError> {
        let target = self
            .targets
            .get_mut(&target)
            .ok_or(EngraveError::UnknownTarget(target))?;
        target.mesh.transform = transform;
        Ok(())
    }

    /// Place a raised text on `target`, centred on the world-space `point`.
    ///
    /// The surface is classified on the uncut target so existing engravings
    /// don't disturb the fit.
    pub fn place_text(
        &mut self,
        target: TargetId,
        point: Vec3,
        direction: Vec3,
        content: &str,
    ) -> Result<TextId, EngraveError> {
        let config = self.settings.text.clone();
        let (placement, generated) = self.generate(target, point, direction, content, &config)?;

        let id = TextId(self.next_text_id);
        self.next_text_id += 1;
        info!(
            "place_text: {} {:?} on {} ({})",
            id,
            content,
            target,
            if generated.descriptor.is_cylinder() {
                "cylinder"
            } else {
                "plane"
            }
        );
        self.texts.insert(
            id,
            TextObject::new(id, target, content.to_owned(), config, placement, generated),
        );
        Ok(id)
    }

    /// Classify the surface at `point` and build the text geometry there.
    fn generate(
        &self,
        target: TargetId,
        point: Vec3,
        direction: Vec3,
        content: &str,
        config: &TextConfig,
    ) -> Result<(Placement, GeneratedText), EngraveError> {
        let mesh = self
            .targets
            .get(&target)
            .ok_or(EngraveError::UnknownTarget(target))?;
        let classifier = &self.settings.classifier;
        let classification = classify_surface(&mesh.pristine(), point, classifier);
        if let Some(reason) = &classification.diagnostics.degraded {
            debug!("generate: {} classified as plane ({})", target, reason);
        }

        let placement = Placement::new(
            classification.descriptor,
            point,
            direction,
            classifier.min_confidence,
        );
        let generated = generate_text_geometry(content, config, &placement, &self.settings.wrap)?;
        Ok((placement, generated))
    }

    /// Change a text's content and config. Engraved texts are re-cut.
    ///
    /// When generation fails the text is left as it was.
    pub async fn update_text(
        &mut self,
        id: TextId,
        content: &str,
        config: TextConfig,
    ) -> Result<(), EngraveError> {
        let text = self.texts.get(&id).ok_or(EngraveError::UnknownText(id))?;
        let generated =
            generate_text_geometry(content, &config, &text.placement, &self.settings.wrap)?;

        let text = self
            .texts
            .get_mut(&id)
            .ok_or(EngraveError::UnknownText(id))?;
        text.content = content.to_owned();
        text.config = config;
        text.set_geometry(generated);
        let target = text.target;
        debug!("update_text: {} now {:?}", id, content);

        if text.is_engraved() {
            let order = self.engraved_texts(target).to_vec();
            self.rebuild(target, order).await?;
        }
        Ok(())
    }

    /// Remove a text, re-cutting the target without it when it was engraved.
    pub async fn delete_text(&mut self, id: TextId) -> Result<(), EngraveError> {
        let text = self.texts.remove(&id).ok_or(EngraveError::UnknownText(id))?;
        let target = self
            .targets
            .get_mut(&text.target)
            .ok_or(EngraveError::UnknownTarget(text.target))?;
        if target.editing == Some(id) {
            target.editing = None;
        }
        info!("delete_text: {} removed from {}", id, text.target);

        if target.engraved.contains(&id) {
            let order: Vec<_> = target.engraved.iter().copied().filter(|t| *t != id).collect();
            self.rebuild(text.target, order).await?;
        }
        Ok(())
    }

    /// Switch a text between raised and engraved.
    ///
    /// A failed subtract is reported as [`SwitchOutcome::Failed`]; unknown
    /// ids, repositioning texts and generation errors are errors.
    pub async fn switch_text_mode(
        &mut self,
        id: TextId,
        mode: TextMode,
    ) -> Result<SwitchOutcome, EngraveError> {
        let result = match mode {
            TextMode::Engraved => self.switch_to_engraved(id).await,
            TextMode::Raised | TextMode::EngraveFailed => self.switch_to_raised(id).await,
        };
        match result {
            Ok(()) => Ok(SwitchOutcome::Success),
            Err(EngraveError::Boolean(err)) => Ok(SwitchOutcome::Failed {
                error: err.to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    /// Cut a text into its target.
    ///
    /// The first engrave on a target captures its snapshot. The cut is a
    /// replay of every engraved text plus this one; on failure the target is
    /// left exactly as it was and the text becomes [`TextMode::EngraveFailed`].
    pub async fn switch_to_engraved(&mut self, id: TextId) -> Result<(), EngraveError> {
        let text = self.texts.get(&id).ok_or(EngraveError::UnknownText(id))?;
        if text.is_editing() {
            return Err(EngraveError::Editing(id));
        }
        if text.is_engraved() {
            return Ok(());
        }
        let target_id = text.target;

        let target = self
            .targets
            .get_mut(&target_id)
            .ok_or(EngraveError::UnknownTarget(target_id))?;
        let captured = target.ensure_snapshot();
        if captured {
            info!("switch_to_engraved: snapshot of {} captured", target_id);
        }
        let mut order = target.engraved.clone();
        order.push(id);

        match self.run_replay(target_id, &order).await {
            Ok(replayed) => {
                self.commit(target_id, order, replayed)?;
                if let Some(text) = self.texts.get_mut(&id) {
                    text.mode = TextMode::Engraved;
                    text.visible = false;
                    text.error = None;
                }
                info!("switch_to_engraved: {} engraved into {}", id, target_id);
                Ok(())
            }
            Err(err) => {
                if captured && let Some(target) = self.targets.get_mut(&target_id) {
                    target.snapshot = None;
                }
                if let Some(text) = self.texts.get_mut(&id) {
                    text.mode = TextMode::EngraveFailed;
                    text.error = Some(err.to_string());
                }
                warn!("switch_to_engraved: {} failed: {}", id, err);
                Err(err)
            }
        }
    }

    /// Remove a text's cut and show it raised again.
    ///
    /// Restores the pristine target when no other text stays engraved,
    /// otherwise replays the remaining cuts.
    pub async fn switch_to_raised(&mut self, id: TextId) -> Result<(), EngraveError> {
        let text = self
            .texts
            .get_mut(&id)
            .ok_or(EngraveError::UnknownText(id))?;
        let was_engraved = text.is_engraved();
        text.mode = TextMode::Raised;
        text.visible = true;
        text.error = None;
        // Raising a lifted text cancels its pending re-engrave
        if let Some(edit) = text.edit.as_mut() {
            edit.was_engraved = false;
        }
        if !was_engraved {
            return Ok(());
        }
        let target_id = text.target;

        let target = self
            .targets
            .get(&target_id)
            .ok_or(EngraveError::UnknownTarget(target_id))?;
        let order: Vec<_> = target.engraved.iter().copied().filter(|t| *t != id).collect();
        info!("switch_to_raised: {} raised on {}", id, target_id);
        self.rebuild(target_id, order).await
    }

    /// Recompute a target from its snapshot, e.g. after it was moved.
    pub async fn reapply_engraving(&mut self, target: TargetId) -> Result<(), EngraveError> {
        let order = self
            .targets
            .get(&target)
            .ok_or(EngraveError::UnknownTarget(target))?
            .engraved
            .clone();
        if order.is_empty() {
            return Ok(());
        }
        debug!("reapply_engraving: {} cuts on {}", order.len(), target);
        self.rebuild(target, order).await
    }

    /// Find the text under `ray` on `target`.
    ///
    /// Engraved texts are found through the material slot of the hit target
    /// triangle; visible texts are tested against their own geometry. The
    /// closest hit wins, and a hit on the bare surface picks nothing.
    pub fn pick_text(&self, target: TargetId, ray: &Ray) -> Option<TextId> {
        let mesh = self.targets.get(&target)?;
        let mut best: Option<(f32, Option<TextId>)> = None;

        if let Some(hit) = raycast_mesh(&mesh.mesh.geometry, &mesh.mesh.transform, ray) {
            let slot = mesh.mesh.geometry.material_index_of(hit.triangle);
            let owner = mesh
                .materials
                .get(slot)
                .and_then(|material| material.engraved_text);
            best = Some((hit.distance, owner));
        }

        for text in self.texts_on(target) {
            let Some(geometry) = text.display_geometry(self.settings.engraving.edit_offset) else {
                continue;
            };
            if let Some(hit) = raycast_mesh(&geometry, &Mat4::IDENTITY, ray)
                && best.is_none_or(|(distance, _)| hit.distance < distance)
            {
                best = Some((hit.distance, Some(text.id)));
            }
        }

        best.and_then(|(_, owner)| owner)
    }

    /// Lift a text off its target so it can be moved.
    ///
    /// Any other text being repositioned on the same target is put back
    /// first. An engraved text is shown raised, offset along the surface
    /// normal, and the target is re-cut without it.
    pub async fn begin_position_edit(&mut self, id: TextId) -> Result<(), EngraveError> {
        let text = self.texts.get(&id).ok_or(EngraveError::UnknownText(id))?;
        if text.is_editing() {
            return Ok(());
        }
        let target_id = text.target;
        let other = self
            .targets
            .get(&target_id)
            .ok_or(EngraveError::UnknownTarget(target_id))?
            .editing;
        if let Some(other) = other {
            self.cancel_position_edit(other).await?;
        }

        let text = self
            .texts
            .get_mut(&id)
            .ok_or(EngraveError::UnknownText(id))?;
        let was_engraved = text.is_engraved();
        text.edit = Some(PositionEdit { was_engraved });
        text.mode = TextMode::Raised;
        text.visible = true;

        let target = self
            .targets
            .get_mut(&target_id)
            .ok_or(EngraveError::UnknownTarget(target_id))?;
        target.editing = Some(id);
        debug!("begin_position_edit: {} lifted off {}", id, target_id);

        if was_engraved {
            let order: Vec<_> = target.engraved.iter().copied().filter(|t| *t != id).collect();
            self.rebuild(target_id, order).await?;
        }
        Ok(())
    }

    /// Drop a repositioned text at `anchor`.
    ///
    /// The surface is classified again and the geometry regenerated. A text
    /// that was engraved when the edit began is engraved again. If generation
    /// fails the edit stays open.
    pub async fn end_position_edit(
        &mut self,
        id: TextId,
        anchor: Vec3,
        direction: Vec3,
    ) -> Result<(), EngraveError> {
        let text = self.texts.get(&id).ok_or(EngraveError::UnknownText(id))?;
        if !text.is_editing() {
            return Err(EngraveError::NotEditing(id));
        }
        let (placement, generated) =
            self.generate(text.target, anchor, direction, &text.content, &text.config)?;

        let text = self
            .texts
            .get_mut(&id)
            .ok_or(EngraveError::UnknownText(id))?;
        text.placement = placement;
        text.set_geometry(generated);
        debug!("end_position_edit: {} moved to {}", id, anchor);
        self.finish_edit(id).await
    }

    /// Put a repositioned text back where it was.
    pub async fn cancel_position_edit(&mut self, id: TextId) -> Result<(), EngraveError> {
        let text = self.texts.get(&id).ok_or(EngraveError::UnknownText(id))?;
        if !text.is_editing() {
            return Err(EngraveError::NotEditing(id));
        }
        debug!("cancel_position_edit: {}", id);
        self.finish_edit(id).await
    }

    async fn finish_edit(&mut self, id: TextId) -> Result<(), EngraveError> {
        let text = self
            .texts
            .get_mut(&id)
            .ok_or(EngraveError::UnknownText(id))?;
        let was_engraved = text.edit.take().is_some_and(|edit| edit.was_engraved);
        let target_id = text.target;
        if let Some(target) = self.targets.get_mut(&target_id)
            && target.editing == Some(id)
        {
            target.editing = None;
        }

        if was_engraved {
            self.switch_to_engraved(id).await?;
        }
        Ok(())
    }

    /// Tools for `order`, in the target's local space.
    fn tools(
        &self,
        target: &EngravingTarget,
        order: &[TextId],
    ) -> Result<Vec<(TextId, MeshGeometry)>, EngraveError> {
        order
            .iter()
            .map(|id| {
                let text = self.texts.get(id).ok_or(EngraveError::UnknownText(*id))?;
                Ok((*id, text.tool_geometry(&target.mesh.transform)))
            })
            .collect()
    }

    /// Replay `order` on scratch geometry without touching the target.
    async fn run_replay(
        &self,
        target_id: TargetId,
        order: &[TextId],
    ) -> Result<Replayed, EngraveError> {
        let target = self
            .targets
            .get(&target_id)
            .ok_or(EngraveError::UnknownTarget(target_id))?;
        let tools = self.tools(target, order)?;
        let Some(snapshot) = target.snapshot.as_ref() else {
            // Never engraved: the current geometry is pristine
            return Ok(Replayed {
                geometry: target.mesh.geometry.clone(),
                materials: target.materials.clone(),
            });
        };
        let replayed = replay(
            &self.backend,
            snapshot,
            &tools,
            self.settings.engraving.cut_darkening,
        )
        .await?;
        Ok(replayed)
    }

    fn commit(
        &mut self,
        target_id: TargetId,
        order: Vec<TextId>,
        replayed: Replayed,
    ) -> Result<(), EngraveError> {
        let target = self
            .targets
            .get_mut(&target_id)
            .ok_or(EngraveError::UnknownTarget(target_id))?;
        target.mesh.geometry = replayed.geometry;
        target.materials = replayed.materials;
        target.engraved = order;
        Ok(())
    }

    /// Make `order` the engraved set of a target.
    ///
    /// An empty order restores and releases the snapshot. If the replay fails
    /// the pristine target is restored and every text in `order` is shown
    /// raised and marked [`TextMode::EngraveFailed`].
    async fn rebuild(&mut self, target_id: TargetId, order: Vec<TextId>) -> Result<(), EngraveError> {
        if order.is_empty() {
            let target = self
                .targets
                .get_mut(&target_id)
                .ok_or(EngraveError::UnknownTarget(target_id))?;
            target.restore_snapshot();
            target.engraved.clear();
            info!("rebuild: {} restored, snapshot released", target_id);
            return Ok(());
        }

        match self.run_replay(target_id, &order).await {
            Ok(replayed) => {
                debug!("rebuild: {} re-cut with {} texts", target_id, order.len());
                self.commit(target_id, order, replayed)
            }
            Err(err) => {
                warn!(
                    "rebuild: replay on {} failed, restoring snapshot: {}",
                    target_id, err
                );
                if let Some(target) = self.targets.get_mut(&target_id) {
                    target.restore_snapshot();
                    target.engraved.clear();
                }
                for id in &order {
                    if let Some(text) = self.texts.get_mut(id) {
                        text.mode = TextMode::EngraveFailed;
                        text.visible = true;
                        text.error = Some(err.to_string());
                    }
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use surfacing::{ShapeHint, SurfaceDescriptor};

    use super::*;
    use crate::boolean::test_backends::{AppendTool, FailingSubtract, NoOpSubtract, PoisonedSubtract};

    /// Flat square in the XZ plane facing +Y.
    fn grid(size: f32, divisions: u32) -> MeshGeometry {
        let step = size / divisions as f32;
        let half = size * 0.5;
        let mut positions = Vec::new();
        for i in 0..divisions {
            for j in 0..divisions {
                let x0 = -half + i as f32 * step;
                let z0 = -half + j as f32 * step;
                let (x1, z1) = (x0 + step, z0 + step);
                positions.extend([
                    Vec3::new(x0, 0.0, z0),
                    Vec3::new(x0, 0.0, z1),
                    Vec3::new(x1, 0.0, z0),
                    Vec3::new(x1, 0.0, z0),
                    Vec3::new(x0, 0.0, z1),
                    Vec3::new(x1, 0.0, z1),
                ]);
            }
        }
        MeshGeometry::from_triangle_list(positions)
    }

    /// Open cylinder along +Y, radius 2, height 10.
    fn cylinder() -> MeshGeometry {
        let (radius, height, segments, rings) = (2.0_f32, 10.0_f32, 64_u32, 20_u32);
        let mut positions = Vec::new();
        for ring in 0..=rings {
            let y = -height * 0.5 + height * ring as f32 / rings as f32;
            for segment in 0..segments {
                let theta = std::f32::consts::TAU * segment as f32 / segments as f32;
                positions.push(Vec3::new(radius * theta.cos(), y, radius * theta.sin()));
            }
        }
        let mut indices = Vec::new();
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * segments + segment;
                let b = ring * segments + (segment + 1) % segments;
                let c = a + segments;
                let d = b + segments;
                indices.extend([a, c, b, b, c, d]);
            }
        }
        MeshGeometry::new(positions, indices)
    }

    fn coordinator_with<B: BooleanSubtract>(backend: B) -> (EngravingCoordinator<B>, TargetId) {
        let mut coordinator = EngravingCoordinator::new(backend, EngravingSettings::default());
        let mesh = MeshInstance::new(grid(10.0, 10)).with_shape(ShapeHint::Box);
        let target = coordinator.add_target(mesh, SurfaceMaterial::default());
        (coordinator, target)
    }

    fn geometry_of<B: BooleanSubtract>(coordinator: &EngravingCoordinator<B>, target: TargetId) -> MeshGeometry {
        coordinator.target(target).unwrap().mesh().geometry.clone()
    }

    #[tokio::test]
    async fn test_engrave_then_raise_restores_target() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let pristine = geometry_of(&coordinator, target);
        let text = coordinator
            .place_text(target, Vec3::ZERO, Vec3::X, "HI")
            .unwrap();

        let outcome = coordinator
            .switch_text_mode(text, TextMode::Engraved)
            .await
            .unwrap();
        assert_eq!(outcome, SwitchOutcome::Success);
        let engraved = coordinator.target(target).unwrap();
        assert!(engraved.mesh().geometry.vertex_count() > pristine.vertex_count());
        assert_eq!(engraved.materials().len(), 2);
        assert_eq!(engraved.materials()[1].engraved_text, Some(text));
        assert_eq!(engraved.snapshot().unwrap().geometry, pristine);
        assert!(coordinator.display_geometry(text).is_none());

        let outcome = coordinator
            .switch_text_mode(text, TextMode::Raised)
            .await
            .unwrap();
        assert!(outcome.is_success());
        let raised = coordinator.target(target).unwrap();
        assert!(raised.mesh().geometry.approx_eq(&pristine, 1e-6));
        assert_eq!(raised.materials(), &[SurfaceMaterial::default()]);
        assert!(raised.snapshot().is_none());
        assert_eq!(coordinator.text(text).unwrap().mode, TextMode::Raised);
        assert!(coordinator.display_geometry(text).is_some());
    }

    #[tokio::test]
    async fn test_delete_leaves_only_remaining_cut() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let first = coordinator
            .place_text(target, Vec3::new(-2.0, 0.0, 0.0), Vec3::X, "AB")
            .unwrap();
        let second = coordinator
            .place_text(target, Vec3::new(2.0, 0.0, 2.0), Vec3::X, "CD")
            .unwrap();
        coordinator.switch_to_engraved(first).await.unwrap();
        coordinator.switch_to_engraved(second).await.unwrap();
        assert_eq!(coordinator.engraved_texts(target), &[first, second]);

        coordinator.delete_text(first).await.unwrap();
        assert!(coordinator.text(first).is_none());
        assert_eq!(coordinator.engraved_texts(target), &[second]);

        let (mut fresh, fresh_target) = coordinator_with(AppendTool);
        let only = fresh
            .place_text(fresh_target, Vec3::new(2.0, 0.0, 2.0), Vec3::X, "CD")
            .unwrap();
        fresh.switch_to_engraved(only).await.unwrap();

        assert!(geometry_of(&coordinator, target).approx_eq(&geometry_of(&fresh, fresh_target), 1e-6));
        let materials = coordinator.target(target).unwrap().materials();
        assert_eq!(materials.len(), 2);
        assert_eq!(materials[1].engraved_text, Some(second));
    }

    #[tokio::test]
    async fn test_failed_engrave_leaves_target_untouched() {
        let (mut coordinator, target) = coordinator_with(FailingSubtract);
        let before = geometry_of(&coordinator, target);
        let text = coordinator
            .place_text(target, Vec3::ZERO, Vec3::X, "NO")
            .unwrap();

        let outcome = coordinator
            .switch_text_mode(text, TextMode::Engraved)
            .await
            .unwrap();
        let SwitchOutcome::Failed { error } = outcome else {
            panic!("expected a failed switch");
        };
        assert!(!error.is_empty());

        assert_eq!(geometry_of(&coordinator, target), before);
        let target = coordinator.target(target).unwrap();
        assert!(target.snapshot().is_none());
        assert!(target.engraved_texts().is_empty());
        let text = coordinator.text(text).unwrap();
        assert_eq!(text.mode, TextMode::EngraveFailed);
        assert!(text.error.as_deref().is_some_and(|e| !e.is_empty()));
        assert!(text.visible);
    }

    #[tokio::test]
    async fn test_no_op_subtract_is_a_failure() {
        let (mut coordinator, target) = coordinator_with(NoOpSubtract);
        let text = coordinator
            .place_text(target, Vec3::ZERO, Vec3::X, "NOP")
            .unwrap();
        let outcome = coordinator
            .switch_text_mode(text, TextMode::Engraved)
            .await
            .unwrap();
        assert!(!outcome.is_success());
        assert_eq!(coordinator.text(text).unwrap().mode, TextMode::EngraveFailed);
    }

    #[tokio::test]
    async fn test_failed_replay_restores_pristine_target() {
        let backend = PoisonedSubtract::default();
        let poisoned = backend.poisoned.clone();
        let (mut coordinator, target) = coordinator_with(backend);
        let pristine = geometry_of(&coordinator, target);
        let first = coordinator
            .place_text(target, Vec3::new(-2.0, 0.0, 0.0), Vec3::X, "ONE")
            .unwrap();
        let second = coordinator
            .place_text(target, Vec3::new(2.0, 0.0, 2.0), Vec3::X, "TWO")
            .unwrap();
        coordinator.switch_to_engraved(first).await.unwrap();
        coordinator.switch_to_engraved(second).await.unwrap();

        poisoned.borrow_mut().insert(second);
        let outcome = coordinator
            .switch_text_mode(first, TextMode::Raised)
            .await
            .unwrap();
        assert!(!outcome.is_success());

        assert_eq!(geometry_of(&coordinator, target), pristine);
        assert!(coordinator.engraved_texts(target).is_empty());
        assert!(coordinator.target(target).unwrap().snapshot().is_none());
        assert_eq!(coordinator.text(first).unwrap().mode, TextMode::Raised);
        let sacrificed = coordinator.text(second).unwrap();
        assert_eq!(sacrificed.mode, TextMode::EngraveFailed);
        assert!(sacrificed.visible);

        // A later successful switch clears the failure
        poisoned.borrow_mut().clear();
        coordinator.switch_to_engraved(second).await.unwrap();
        let recovered = coordinator.text(second).unwrap();
        assert_eq!(recovered.mode, TextMode::Engraved);
        assert!(recovered.error.is_none());
    }

    #[tokio::test]
    async fn test_second_engrave_keeps_first_cut() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let first = coordinator
            .place_text(target, Vec3::new(-2.0, 0.0, 0.0), Vec3::X, "A")
            .unwrap();
        let second = coordinator
            .place_text(target, Vec3::new(2.0, 0.0, 0.0), Vec3::X, "B")
            .unwrap();
        coordinator.switch_to_engraved(first).await.unwrap();
        let after_first = geometry_of(&coordinator, target).vertex_count();
        coordinator.switch_to_engraved(second).await.unwrap();

        let target = coordinator.target(target).unwrap();
        assert!(target.mesh().geometry.vertex_count() > after_first);
        let owners: Vec<_> = target.materials().iter().map(|m| m.engraved_text).collect();
        assert_eq!(owners, vec![None, Some(first), Some(second)]);
    }

    #[tokio::test]
    async fn test_update_text_recuts_target() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let pristine = geometry_of(&coordinator, target).vertex_count();
        let text = coordinator
            .place_text(target, Vec3::ZERO, Vec3::X, "I")
            .unwrap();
        coordinator.switch_to_engraved(text).await.unwrap();

        coordinator
            .update_text(text, "HELLO", TextConfig::default())
            .await
            .unwrap();
        let text = coordinator.text(text).unwrap();
        assert_eq!(text.content, "HELLO");
        assert!(text.is_engraved());
        assert_eq!(
            geometry_of(&coordinator, target).vertex_count(),
            pristine + text.flat.vertex_count()
        );
    }

    #[tokio::test]
    async fn test_update_with_bad_content_keeps_text() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let text = coordinator
            .place_text(target, Vec3::ZERO, Vec3::X, "OK")
            .unwrap();
        let result = coordinator.update_text(text, "   ", TextConfig::default()).await;
        assert!(matches!(result, Err(EngraveError::Geometry(_))));
        assert_eq!(coordinator.text(text).unwrap().content, "OK");
    }

    #[tokio::test]
    async fn test_unknown_ids_are_errors() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let result = coordinator.switch_text_mode(TextId(99), TextMode::Engraved).await;
        assert!(matches!(result, Err(EngraveError::UnknownText(TextId(99)))));
        let result = coordinator.place_text(TargetId(42), Vec3::ZERO, Vec3::X, "A");
        assert!(matches!(result, Err(EngraveError::UnknownTarget(TargetId(42)))));
        assert!(coordinator.engraved_texts(TargetId(42)).is_empty());
        assert!(coordinator.reapply_engraving(target).await.is_ok());
    }

    #[tokio::test]
    async fn test_pick_text_resolves_cut_and_raised_texts() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let engraved = coordinator
            .place_text(target, Vec3::new(-2.0, 0.0, 0.0), Vec3::X, "I")
            .unwrap();
        let raised = coordinator
            .place_text(target, Vec3::new(2.0, 0.0, 0.0), Vec3::X, "I")
            .unwrap();
        coordinator.switch_to_engraved(engraved).await.unwrap();

        let down = |x: f32| Ray::new(Vec3::new(x + 0.013, 5.0, 0.021), Vec3::NEG_Y);
        assert_eq!(coordinator.pick_text(target, &down(-2.0)), Some(engraved));
        assert_eq!(coordinator.pick_text(target, &down(2.0)), Some(raised));
        assert_eq!(coordinator.pick_text(target, &down(4.0)), None);
        let away = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::Y);
        assert_eq!(coordinator.pick_text(target, &away), None);
    }

    #[tokio::test]
    async fn test_position_edit_lifts_and_recuts() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let pristine = geometry_of(&coordinator, target);
        let text = coordinator
            .place_text(target, Vec3::ZERO, Vec3::X, "MOVE")
            .unwrap();
        coordinator.switch_to_engraved(text).await.unwrap();

        coordinator.begin_position_edit(text).await.unwrap();
        assert_eq!(geometry_of(&coordinator, target), pristine);
        assert_eq!(coordinator.target(target).unwrap().editing_text(), Some(text));
        let lifted = coordinator.display_geometry(text).unwrap();
        let resting = coordinator.text(text).unwrap().world_geometry();
        let offset = coordinator.settings().engraving.edit_offset;
        assert!((lifted.positions[0] - resting.positions[0] - Vec3::Y * offset).length() < 1e-5);

        let result = coordinator.switch_to_engraved(text).await;
        assert!(matches!(result, Err(EngraveError::Editing(_))));

        let destination = Vec3::new(1.0, 0.0, -2.0);
        coordinator
            .end_position_edit(text, destination, Vec3::X)
            .await
            .unwrap();
        let moved = coordinator.text(text).unwrap();
        assert!(moved.is_engraved());
        assert!(!moved.is_editing());
        assert_eq!(moved.anchor(), destination);
        assert!(coordinator.target(target).unwrap().editing_text().is_none());
        assert_eq!(coordinator.engraved_texts(target), &[text]);

        let tool = moved.tool_geometry(&Mat4::IDENTITY);
        let cut = geometry_of(&coordinator, target);
        assert_eq!(cut.positions[pristine.vertex_count()..], tool.positions[..]);
    }

    #[tokio::test]
    async fn test_raise_during_edit_stays_raised() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let pristine = geometry_of(&coordinator, target);
        let text = coordinator
            .place_text(target, Vec3::ZERO, Vec3::X, "LIFT")
            .unwrap();
        coordinator.switch_to_engraved(text).await.unwrap();
        coordinator.begin_position_edit(text).await.unwrap();

        let outcome = coordinator
            .switch_text_mode(text, TextMode::Raised)
            .await
            .unwrap();
        assert!(outcome.is_success());
        coordinator.cancel_position_edit(text).await.unwrap();

        let raised = coordinator.text(text).unwrap();
        assert_eq!(raised.mode, TextMode::Raised);
        assert!(!raised.is_editing());
        assert!(coordinator.engraved_texts(target).is_empty());
        assert_eq!(geometry_of(&coordinator, target), pristine);
    }

    #[tokio::test]
    async fn test_one_position_edit_per_target() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let first = coordinator
            .place_text(target, Vec3::new(-2.0, 0.0, 0.0), Vec3::X, "A")
            .unwrap();
        let second = coordinator
            .place_text(target, Vec3::new(2.0, 0.0, 0.0), Vec3::X, "B")
            .unwrap();
        coordinator.switch_to_engraved(first).await.unwrap();

        coordinator.begin_position_edit(first).await.unwrap();
        coordinator.begin_position_edit(second).await.unwrap();

        assert!(!coordinator.text(first).unwrap().is_editing());
        assert!(coordinator.text(first).unwrap().is_engraved());
        assert!(coordinator.text(second).unwrap().is_editing());
        assert_eq!(coordinator.target(target).unwrap().editing_text(), Some(second));

        coordinator.cancel_position_edit(second).await.unwrap();
        assert!(!coordinator.text(second).unwrap().is_engraved());
        let result = coordinator.cancel_position_edit(second).await;
        assert!(matches!(result, Err(EngraveError::NotEditing(_))));
    }

    #[tokio::test]
    async fn test_reapply_follows_target_transform() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let pristine = geometry_of(&coordinator, target).vertex_count();
        let text = coordinator
            .place_text(target, Vec3::ZERO, Vec3::X, "GO")
            .unwrap();
        coordinator.switch_to_engraved(text).await.unwrap();

        let moved = Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0));
        coordinator.set_target_transform(target, moved).unwrap();
        coordinator.reapply_engraving(target).await.unwrap();

        let tool = coordinator.text(text).unwrap().tool_geometry(&moved);
        let cut = geometry_of(&coordinator, target);
        assert_eq!(cut.positions[pristine..], tool.positions[..]);
    }

    #[tokio::test]
    async fn test_cylinder_target_gets_wrapped_text() {
        let mut coordinator = EngravingCoordinator::new(AppendTool, EngravingSettings::default());
        let target = coordinator.add_target(MeshInstance::new(cylinder()), SurfaceMaterial::default());
        let text = coordinator
            .place_text(target, Vec3::new(2.0, 0.0, 0.0), Vec3::Z, "CAN")
            .unwrap();

        let text_object = coordinator.text(text).unwrap();
        assert!(matches!(text_object.surface_descriptor(), SurfaceDescriptor::Cylinder(_)));
        let wrapped = text_object.wrapped.as_ref().unwrap();
        let tool_vertices = wrapped.vertex_count();

        let pristine = geometry_of(&coordinator, target).vertex_count();
        coordinator.switch_to_engraved(text).await.unwrap();
        assert_eq!(geometry_of(&coordinator, target).vertex_count(), pristine + tool_vertices);
    }

    #[tokio::test]
    async fn test_delete_last_engraved_releases_snapshot() {
        let (mut coordinator, target) = coordinator_with(AppendTool);
        let pristine = geometry_of(&coordinator, target);
        let text = coordinator
            .place_text(target, Vec3::ZERO, Vec3::X, "BYE")
            .unwrap();
        coordinator.switch_to_engraved(text).await.unwrap();
        coordinator.delete_text(text).await.unwrap();

        assert_eq!(geometry_of(&coordinator, target), pristine);
        assert!(coordinator.target(target).unwrap().snapshot().is_none());
        assert!(coordinator.texts_on(target).is_empty());
    }
}
