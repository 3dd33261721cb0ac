//! Raw geometry (.opt) format.
//!
//! Layout, all little-endian:
//!
//! ```text
//! u64 num_meshes
//! per mesh:
//!     u64 num_triangles
//!     num_triangles * (3 * Vec3)      36 bytes per triangle
//! ```
//!
//! The format is a plain dump of mesh order and triangle order; reading a
//! file back yields bit-exact triangle sequences.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::GeometryResult;
use crate::mesh::{Mesh, MeshSource};

use super::{clamped_capacity, read_len, read_triangle, write_triangle, write_u64};

/// Write a mesh list in .opt layout.
pub fn write_meshes<W: Write>(out: &mut W, meshes: &[Mesh]) -> GeometryResult<()> {
    write_u64(out, meshes.len() as u64)?;
    for mesh in meshes {
        write_u64(out, mesh.triangle_count() as u64)?;
        for tri in &mesh.triangles {
            write_triangle(out, tri)?;
        }
    }
    Ok(())
}

/// Read a mesh list in .opt layout.
///
/// Meshes come back exactly as stored, including zero-triangle entries;
/// policy on empty meshes belongs to the caller.
pub fn read_meshes<R: Read>(input: &mut R) -> GeometryResult<Vec<Mesh>> {
    let num_meshes = read_len(input)?;
    let mut meshes = Vec::with_capacity(clamped_capacity(num_meshes));

    for _ in 0..num_meshes {
        let num_triangles = read_len(input)?;
        let mut triangles = Vec::with_capacity(clamped_capacity(num_triangles));
        for _ in 0..num_triangles {
            triangles.push(read_triangle(input)?);
        }
        meshes.push(Mesh::new(triangles));
    }

    Ok(meshes)
}

/// A standalone .opt file: mesh lists decoupled from any engine.
///
/// Useful for asset pipeline steps that convert or inspect geometry
/// without paying for BVH construction.
#[derive(Clone, Debug, Default)]
pub struct GeometryFile {
    pub meshes: Vec<Mesh>,
}

impl GeometryFile {
    /// Load raw geometry from an .opt file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GeometryResult<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let meshes = read_meshes(&mut reader)?;
        Ok(Self { meshes })
    }

    /// Write this geometry to an .opt file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> GeometryResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_meshes(&mut writer, &self.meshes)?;
        writer.flush()?;
        Ok(())
    }
}

/// Pull meshes from an upstream parser and write them as an .opt file.
pub fn create_opt_file<S, P>(source: &S, path: P) -> GeometryResult<()>
where
    S: MeshSource,
    P: AsRef<Path>,
{
    let meshes = source.meshes()?;
    log::info!(
        "writing {} meshes to {}",
        meshes.len(),
        path.as_ref().display()
    );
    GeometryFile { meshes }.save_to_file(path)
}
