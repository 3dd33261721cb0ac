//! BVH cache format.
//!
//! Stores pre-built trees so construction cost is paid once per asset.
//! Layout, all little-endian:
//!
//! ```text
//! u32 version                          currently 1
//! u64 num_meshes
//! num_meshes * u64 triangle_count      per-mesh totals, used to pre-size
//! per mesh, preorder:
//!     u8  is_null                      must be 0 in a well-formed file
//!     Vec3 bounds.min, Vec3 bounds.max
//!     u8  is_leaf
//!     leaf:  u64 num_triangles + inline triangles
//!     inner: left subtree, then right subtree
//! ```
//!
//! Loading rebuilds each mesh by walking the tree's leaves left to right;
//! the per-mesh totals in the header must match what the trees hold.

use std::io::{Read, Write};

use sightline_math::Aabb;

use crate::bvh::BvhNode;
use crate::error::{GeometryError, GeometryResult};
use crate::mesh::Mesh;

use super::{
    clamped_capacity, read_bool, read_len, read_triangle, read_u32, read_vec3, write_bool,
    write_triangle, write_u32, write_u64, write_vec3,
};

/// Current cache format version. Files with any other version are refused.
pub const CACHE_VERSION: u32 = 1;

/// Write meshes and their trees in cache layout.
///
/// `meshes` and `roots` are parallel, one tree per mesh.
pub fn write_cache<W: Write>(
    out: &mut W,
    meshes: &[Mesh],
    roots: &[BvhNode],
) -> GeometryResult<()> {
    debug_assert_eq!(meshes.len(), roots.len());

    write_u32(out, CACHE_VERSION)?;
    write_u64(out, meshes.len() as u64)?;

    for mesh in meshes {
        write_u64(out, mesh.triangle_count() as u64)?;
    }
    for root in roots {
        write_node(out, root)?;
    }
    Ok(())
}

fn write_node<W: Write>(out: &mut W, node: &BvhNode) -> GeometryResult<()> {
    // The null flag is part of the wire layout; built trees have no null
    // subtrees, so it is always written as false.
    write_bool(out, false)?;

    let bounds = node.bounds();
    write_vec3(out, bounds.min)?;
    write_vec3(out, bounds.max)?;

    match node {
        BvhNode::Leaf { triangles, .. } => {
            write_bool(out, true)?;
            write_u64(out, triangles.len() as u64)?;
            for tri in triangles {
                write_triangle(out, tri)?;
            }
        }
        BvhNode::Inner { left, right, .. } => {
            write_bool(out, false)?;
            write_node(out, left)?;
            write_node(out, right)?;
        }
    }
    Ok(())
}

/// Read a cache stream, returning the rebuilt meshes and their trees.
pub fn read_cache<R: Read>(input: &mut R) -> GeometryResult<(Vec<Mesh>, Vec<BvhNode>)> {
    let version = read_u32(input)?;
    if version != CACHE_VERSION {
        return Err(GeometryError::UnsupportedVersion(version));
    }

    let num_meshes = read_len(input)?;
    if num_meshes == 0 {
        return Err(GeometryError::Malformed("cache holds no meshes".into()));
    }

    let mut triangle_counts = Vec::with_capacity(clamped_capacity(num_meshes));
    for _ in 0..num_meshes {
        triangle_counts.push(read_len(input)?);
    }

    let mut meshes = Vec::with_capacity(clamped_capacity(num_meshes));
    let mut roots = Vec::with_capacity(clamped_capacity(num_meshes));

    for (i, &expected) in triangle_counts.iter().enumerate() {
        let root = read_node(input)?;

        let mut triangles = Vec::with_capacity(clamped_capacity(expected));
        root.extract_triangles(&mut triangles);
        if triangles.len() != expected {
            return Err(GeometryError::Malformed(format!(
                "tree {i} holds {} triangles, header says {expected}",
                triangles.len()
            )));
        }

        meshes.push(Mesh::new(triangles));
        roots.push(root);
    }

    Ok((meshes, roots))
}

fn read_node<R: Read>(input: &mut R) -> GeometryResult<BvhNode> {
    if read_bool(input)? {
        return Err(GeometryError::Malformed("null subtree in cache".into()));
    }

    let min = read_vec3(input)?;
    let max = read_vec3(input)?;
    let bounds = Aabb::new(min, max);

    if read_bool(input)? {
        let num_triangles = read_len(input)?;
        if num_triangles == 0 {
            return Err(GeometryError::Malformed("leaf holds no triangles".into()));
        }
        let mut triangles = Vec::with_capacity(clamped_capacity(num_triangles));
        for _ in 0..num_triangles {
            triangles.push(read_triangle(input)?);
        }
        Ok(BvhNode::Leaf { bounds, triangles })
    } else {
        let left = Box::new(read_node(input)?);
        let right = Box::new(read_node(input)?);
        Ok(BvhNode::Inner {
            bounds,
            left,
            right,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_math::{Triangle, Vec3};
    use std::io::Cursor;

    fn grid_mesh(n: usize, z: f32) -> Mesh {
        let triangles = (0..n)
            .map(|i| {
                let x = (i % 8) as f32 * 3.0;
                let y = (i / 8) as f32 * 3.0;
                Triangle::new(
                    Vec3::new(x, y, z),
                    Vec3::new(x + 1.0, y, z),
                    Vec3::new(x, y + 1.0, z),
                )
            })
            .collect();
        Mesh::new(triangles)
    }

    fn sorted_bits(mesh: &Mesh) -> Vec<[u32; 9]> {
        let mut keys: Vec<[u32; 9]> = mesh
            .triangles
            .iter()
            .map(|t| {
                [
                    t.v0.x.to_bits(),
                    t.v0.y.to_bits(),
                    t.v0.z.to_bits(),
                    t.v1.x.to_bits(),
                    t.v1.y.to_bits(),
                    t.v1.z.to_bits(),
                    t.v2.x.to_bits(),
                    t.v2.y.to_bits(),
                    t.v2.z.to_bits(),
                ]
            })
            .collect();
        keys.sort_unstable();
        keys
    }

    fn build_scene() -> (Vec<Mesh>, Vec<BvhNode>) {
        let meshes = vec![grid_mesh(30, 0.0), grid_mesh(3, 10.0)];
        let roots = meshes
            .iter()
            .map(|m| BvhNode::build(&m.triangles))
            .collect();
        (meshes, roots)
    }

    #[test]
    fn test_round_trip_preserves_triangle_multiset() {
        let (meshes, roots) = build_scene();

        let mut buf = Vec::new();
        write_cache(&mut buf, &meshes, &roots).unwrap();

        let (restored_meshes, restored_roots) = read_cache(&mut Cursor::new(buf)).unwrap();
        assert_eq!(restored_meshes.len(), meshes.len());
        assert_eq!(restored_roots.len(), roots.len());

        for (restored, original) in restored_meshes.iter().zip(&meshes) {
            assert_eq!(restored.triangle_count(), original.triangle_count());
            assert_eq!(sorted_bits(restored), sorted_bits(original));
        }
    }

    #[test]
    fn test_reserialized_cache_is_identical() {
        // A loaded tree serializes back to the same bytes
        let (meshes, roots) = build_scene();

        let mut first = Vec::new();
        write_cache(&mut first, &meshes, &roots).unwrap();

        let (meshes2, roots2) = read_cache(&mut Cursor::new(first.clone())).unwrap();
        let mut second = Vec::new();
        write_cache(&mut second, &meshes2, &roots2).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_version_mismatch_refused() {
        let (meshes, roots) = build_scene();
        let mut buf = Vec::new();
        write_cache(&mut buf, &meshes, &roots).unwrap();
        buf[0] = 2;

        assert!(matches!(
            read_cache(&mut Cursor::new(buf)),
            Err(GeometryError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_zero_meshes_refused() {
        let mut buf = Vec::new();
        write_u32(&mut buf, CACHE_VERSION).unwrap();
        write_u64(&mut buf, 0).unwrap();

        assert!(matches!(
            read_cache(&mut Cursor::new(buf)),
            Err(GeometryError::Malformed(_))
        ));
    }

    #[test]
    fn test_null_root_refused() {
        let mut buf = Vec::new();
        write_u32(&mut buf, CACHE_VERSION).unwrap();
        write_u64(&mut buf, 1).unwrap();
        write_u64(&mut buf, 0).unwrap();
        write_bool(&mut buf, true).unwrap();

        assert!(matches!(
            read_cache(&mut Cursor::new(buf)),
            Err(GeometryError::Malformed(_))
        ));
    }

    #[test]
    fn test_triangle_count_mismatch_refused() {
        let (meshes, roots) = build_scene();
        let mut buf = Vec::new();
        write_cache(&mut buf, &meshes, &roots).unwrap();

        // Corrupt the first header count (bytes 12..20)
        buf[12] = buf[12].wrapping_add(1);

        assert!(matches!(
            read_cache(&mut Cursor::new(buf)),
            Err(GeometryError::Malformed(_))
        ));
    }

    #[test]
    fn test_truncated_cache_fails() {
        let (meshes, roots) = build_scene();
        let mut buf = Vec::new();
        write_cache(&mut buf, &meshes, &roots).unwrap();
        buf.truncate(buf.len() / 2);

        assert!(read_cache(&mut Cursor::new(buf)).is_err());
    }
}
