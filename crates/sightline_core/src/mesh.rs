//! Mesh representation for visibility queries.
//!
//! A mesh here is nothing more than an ordered triangle list. Upstream
//! formats with indexed vertices, normals, or materials are flattened to
//! triangle soup before they reach this crate; occlusion tests need no
//! other attributes.

use sightline_math::Triangle;

use crate::error::GeometryResult;

/// An ordered sequence of triangles.
///
/// The order is preserved by the persistence formats but carries no
/// meaning at query time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Triangle soup making up the mesh
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a new mesh from a triangle list.
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Check whether the mesh holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Producer of triangle meshes from an upstream asset format.
///
/// The engine stays decoupled from the physics-format parser behind this
/// seam: anything that can yield a list of meshes can feed
/// [`create_opt_file`](crate::formats::opt::create_opt_file) or
/// [`VisibilityEngine::load_geometry`](crate::VisibilityEngine::load_geometry).
/// Parser failures surface as an error; an empty mesh list is treated as a
/// load failure by the engine.
pub trait MeshSource {
    /// Produce all meshes of the source asset.
    fn meshes(&self) -> GeometryResult<Vec<Mesh>>;
}
