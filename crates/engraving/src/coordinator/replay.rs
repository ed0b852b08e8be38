//! Replay of engraved cuts from the pristine snapshot.

use surfacing::MeshGeometry;
use tracing::debug;

use crate::boolean::{check_output, BooleanError, BooleanSubtract, SubtractMeta};
use crate::material::SurfaceMaterial;
use crate::target::TargetSnapshot;
use crate::text::TextId;

/// Target state produced by a successful replay, not yet committed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Replayed {
    pub geometry: MeshGeometry,
    pub materials: Vec<SurfaceMaterial>,
}

/// Cut every tool, in order, into a fresh copy of `snapshot`.
///
/// Tool `i` gets material slot `i + 1`. The first failing subtract aborts the
/// whole replay; nothing from a partial replay is returned.
pub(crate) async fn replay<B: BooleanSubtract>(
    backend: &B,
    snapshot: &TargetSnapshot,
    tools: &[(TextId, MeshGeometry)],
    cut_darkening: f32,
) -> Result<Replayed, BooleanError> {
    let mut geometry = snapshot.geometry.clone();
    let mut materials = vec![snapshot.material];

    for (i, (text_id, tool)) in tools.iter().enumerate() {
        let meta = SubtractMeta {
            text_id: *text_id,
            cut_material_index: i + 1,
        };
        let output = backend.subtract(&geometry, tool, &meta).await?;
        geometry = check_output(&geometry, output)?;
        materials.push(snapshot.material.cut_for(*text_id, cut_darkening));
        debug!(
            "replay: cut {} ({}/{}), target now {} vertices",
            text_id,
            i + 1,
            tools.len(),
            geometry.vertex_count()
        );
    }

    Ok(Replayed {
        geometry,
        materials,
    })
}
