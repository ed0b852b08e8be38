//! Surface analysis for placing text on meshes.
//!
//! This crate provides:
//! - [`mesh`] - Indexed triangle geometry with material groups, and the
//!   read-only [`MeshQuery`] view used by every consumer
//! - [`raycast`] - Ray picking and closest-triangle lookup
//! - [`descriptor`] - Plane and cylinder surface models
//! - [`classify`] - Planar/cylindrical classification of a clicked surface
//!
//! # Classification
//!
//! [`classify_surface`] never fails. Every path that cannot produce a
//! trustworthy cylinder falls back to a plane through the clicked point, and
//! the reason is reported in [`FitDiagnostics`] instead of being logged and
//! lost.

pub mod classify;
pub mod descriptor;
pub mod mesh;
pub mod raycast;

pub use classify::{
    classify_surface, Classification, ConfidenceBreakdown, DegradeReason, FitDiagnostics,
    FitMethod, StrictCheck,
};
pub use descriptor::{CylinderModel, PlaneModel, SurfaceDescriptor};
pub use mesh::{Aabb, MaterialGroup, MeshGeometry, MeshInstance, MeshQuery, ShapeHint};
pub use raycast::{closest_triangle, raycast_mesh, MeshHit, Ray, SurfacePoint};
