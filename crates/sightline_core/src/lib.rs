//! Sightline Core - line-of-sight queries over static triangle meshes.
//!
//! This crate provides:
//!
//! - **Mesh model**: [`Mesh`] as an ordered triangle list, plus the
//!   [`MeshSource`] seam for upstream geometry parsers
//! - **Acceleration**: a per-mesh bounding volume hierarchy ([`BvhNode`])
//! - **Persistence**: the raw `.opt` geometry format and the BVH cache
//!   format, so tree construction cost is paid once
//! - **Queries**: the [`VisibilityEngine`] façade with `is_visible`
//!
//! # Example
//!
//! ```ignore
//! use sightline_core::{Mesh, VisibilityEngine};
//! use sightline_math::{Triangle, Vec3};
//!
//! let mut engine = VisibilityEngine::new();
//! engine.load_geometry(vec![Mesh::new(vec![Triangle::new(
//!     Vec3::new(-1.0, 0.0, 5.0),
//!     Vec3::new(1.0, 0.0, 5.0),
//!     Vec3::new(0.0, 2.0, 5.0),
//! )])]);
//!
//! let visible = engine.is_visible(Vec3::ZERO, Vec3::new(0.0, 1.0, 10.0));
//! ```

pub mod bvh;
pub mod engine;
pub mod error;
pub mod formats;
pub mod mesh;

// Re-export commonly used types
pub use bvh::BvhNode;
pub use engine::VisibilityEngine;
pub use error::{GeometryError, GeometryResult};
pub use formats::opt::GeometryFile;
pub use mesh::{Mesh, MeshSource};
