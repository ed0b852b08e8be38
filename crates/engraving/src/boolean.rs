//! The boolean-subtract seam.
//!
//! The coordinator never cuts meshes itself. A [`BooleanSubtract`]
//! implementation receives the target and tool in the target's local space
//! and returns the cut geometry; the coordinator owns the material policy.

use surfacing::MeshGeometry;
use thiserror::Error;

use crate::text::TextId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BooleanError {
    #[error("Boolean subtract failed: {0}")]
    Failed(String),

    #[error("Boolean subtract returned an empty mesh")]
    EmptyResult,

    #[error("Boolean subtract left the target unchanged ({vertices} vertices)")]
    NoOp { vertices: usize },
}

/// Context for one subtract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtractMeta {
    pub text_id: TextId,
    /// Material index for faces created by the tool. Faces that come from the
    /// target keep the group index they arrived with.
    pub cut_material_index: usize,
}

/// Cut geometry returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtractOutput {
    pub geometry: MeshGeometry,
}

/// Backend that subtracts a tool mesh from a target mesh
#[allow(async_fn_in_trait)]
pub trait BooleanSubtract {
    /// Subtract `tool` from `target`; both are in the target's local space.
    async fn subtract(
        &self,
        target: &MeshGeometry,
        tool: &MeshGeometry,
        meta: &SubtractMeta,
    ) -> Result<SubtractOutput, BooleanError>;
}

/// Reject results that cannot be a real cut: empty meshes and meshes with
/// the same vertex count as the input.
pub(crate) fn check_output(
    input: &MeshGeometry,
    output: SubtractOutput,
) -> Result<MeshGeometry, BooleanError> {
    if output.geometry.is_empty() {
        return Err(BooleanError::EmptyResult);
    }
    if output.geometry.vertex_count() == input.vertex_count() {
        return Err(BooleanError::NoOp {
            vertices: input.vertex_count(),
        });
    }
    Ok(output.geometry)
}

#[cfg(test)]
pub(crate) mod test_backends {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    use surfacing::MaterialGroup;

    use super::*;

    /// Appends the tool to the target instead of cutting it.
    ///
    /// Deterministic, always changes the vertex count, and tags the tool's
    /// faces with the requested material slot the way a real backend does.
    pub struct AppendTool;

    impl BooleanSubtract for AppendTool {
        async fn subtract(
            &self,
            target: &MeshGeometry,
            tool: &MeshGeometry,
            meta: &SubtractMeta,
        ) -> Result<SubtractOutput, BooleanError> {
            Ok(SubtractOutput {
                geometry: append_tool(target, tool, meta),
            })
        }
    }

    pub fn append_tool(target: &MeshGeometry, tool: &MeshGeometry, meta: &SubtractMeta) -> MeshGeometry {
        let mut geometry = target.clone();
        if geometry.groups.is_empty() {
            geometry.groups.push(MaterialGroup {
                start: 0,
                count: geometry.indices.len(),
                material_index: 0,
            });
        }
        let mut tool = tool.clone();
        tool.groups.clear();
        let start = geometry.indices.len();
        geometry.append(&tool);
        geometry.groups.push(MaterialGroup {
            start,
            count: tool.indices.len(),
            material_index: meta.cut_material_index,
        });
        geometry
    }

    pub struct FailingSubtract;

    impl BooleanSubtract for FailingSubtract {
        async fn subtract(
            &self,
            _target: &MeshGeometry,
            _tool: &MeshGeometry,
            _meta: &SubtractMeta,
        ) -> Result<SubtractOutput, BooleanError> {
            Err(BooleanError::Failed("manifold check failed".into()))
        }
    }

    /// Returns the target untouched.
    pub struct NoOpSubtract;

    impl BooleanSubtract for NoOpSubtract {
        async fn subtract(
            &self,
            target: &MeshGeometry,
            _tool: &MeshGeometry,
            _meta: &SubtractMeta,
        ) -> Result<SubtractOutput, BooleanError> {
            Ok(SubtractOutput {
                geometry: target.clone(),
            })
        }
    }

    /// Appends like [`AppendTool`] but fails for any text in `poisoned`.
    #[derive(Default, Clone)]
    pub struct PoisonedSubtract {
        pub poisoned: Rc<RefCell<HashSet<TextId>>>,
    }

    impl BooleanSubtract for PoisonedSubtract {
        async fn subtract(
            &self,
            target: &MeshGeometry,
            tool: &MeshGeometry,
            meta: &SubtractMeta,
        ) -> Result<SubtractOutput, BooleanError> {
            if self.poisoned.borrow().contains(&meta.text_id) {
                return Err(BooleanError::Failed(format!("cannot cut {}", meta.text_id)));
            }
            Ok(SubtractOutput {
                geometry: append_tool(target, tool, meta),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn triangle() -> MeshGeometry {
        MeshGeometry::from_triangle_list(vec![Vec3::ZERO, Vec3::X, Vec3::Y])
    }

    #[test]
    fn test_unchanged_vertex_count_is_a_no_op() {
        let input = triangle();
        let output = SubtractOutput {
            geometry: input.clone(),
        };
        assert_eq!(
            check_output(&input, output),
            Err(BooleanError::NoOp { vertices: 3 })
        );
    }

    #[test]
    fn test_empty_result_is_rejected() {
        let output = SubtractOutput {
            geometry: MeshGeometry::default(),
        };
        assert_eq!(check_output(&triangle(), output), Err(BooleanError::EmptyResult));
    }

    #[test]
    fn test_changed_geometry_is_accepted() {
        let mut geometry = triangle();
        geometry.append(&triangle());
        let output = SubtractOutput {
            geometry: geometry.clone(),
        };
        assert_eq!(check_output(&triangle(), output), Ok(geometry));
    }
}
