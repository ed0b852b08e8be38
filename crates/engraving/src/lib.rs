//! Raised and engraved text on target meshes.
//!
//! This crate provides:
//! - [`text`] - Text objects, ids and the raised/engraved mode
//! - [`target`] - Target meshes and their pristine snapshot
//! - [`material`] - Surface and cut material slots
//! - [`boolean`] - The [`BooleanSubtract`] seam to the mesh-cutting backend
//! - [`coordinator`] - Placement, mode switches and replay of cuts
//!
//! The boolean subtract itself is not implemented here. Applications supply
//! a [`BooleanSubtract`] backend to [`EngravingCoordinator`].

pub mod boolean;
pub mod coordinator;
pub mod material;
pub mod target;
pub mod text;

pub use boolean::{BooleanError, BooleanSubtract, SubtractMeta, SubtractOutput};
pub use coordinator::{EngraveError, EngravingCoordinator, SwitchOutcome};
pub use material::SurfaceMaterial;
pub use target::{EngravingTarget, PristineView, TargetSnapshot};
pub use text::{PositionEdit, TargetId, TextId, TextMode, TextObject};
