//! On-disk formats.
//!
//! Two binary formats, both little-endian with fixed-width counts so that
//! files are portable across platforms and pointer widths:
//!
//! - `.opt` raw geometry: a list of meshes of triangles ([`opt`])
//! - BVH cache: versioned, preorder-serialized trees ([`cache`])

pub mod cache;
pub mod opt;

use std::io::{Read, Write};

use sightline_math::{Triangle, Vec3};

use crate::error::{GeometryError, GeometryResult};

/// Counts read from a stream are untrusted until the payload behind them
/// has actually been consumed; never pre-size a Vec beyond this.
const MAX_PREALLOC: usize = 1 << 20;

pub(crate) fn clamped_capacity(count: usize) -> usize {
    count.min(MAX_PREALLOC)
}

pub(crate) fn read_u32<R: Read>(input: &mut R) -> GeometryResult<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_u64<R: Read>(input: &mut R) -> GeometryResult<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a u64 count and narrow it to usize (fails on 32-bit overflow).
pub(crate) fn read_len<R: Read>(input: &mut R) -> GeometryResult<usize> {
    let count = read_u64(input)?;
    usize::try_from(count)
        .map_err(|_| GeometryError::Malformed(format!("count {count} exceeds address space")))
}

pub(crate) fn read_bool<R: Read>(input: &mut R) -> GeometryResult<bool> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    match buf[0] {
        0 => Ok(false),
        1 => Ok(true),
        byte => Err(GeometryError::Malformed(format!(
            "invalid boolean byte {byte:#04x}"
        ))),
    }
}

pub(crate) fn read_vec3<R: Read>(input: &mut R) -> GeometryResult<Vec3> {
    let mut buf = [0u8; 12];
    input.read_exact(&mut buf)?;
    Ok(Vec3::new(
        f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
        f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
    ))
}

pub(crate) fn read_triangle<R: Read>(input: &mut R) -> GeometryResult<Triangle> {
    Ok(Triangle::new(
        read_vec3(input)?,
        read_vec3(input)?,
        read_vec3(input)?,
    ))
}

pub(crate) fn write_u32<W: Write>(out: &mut W, value: u32) -> GeometryResult<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_u64<W: Write>(out: &mut W, value: u64) -> GeometryResult<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_bool<W: Write>(out: &mut W, value: bool) -> GeometryResult<()> {
    out.write_all(&[value as u8])?;
    Ok(())
}

pub(crate) fn write_vec3<W: Write>(out: &mut W, v: Vec3) -> GeometryResult<()> {
    out.write_all(&v.x.to_le_bytes())?;
    out.write_all(&v.y.to_le_bytes())?;
    out.write_all(&v.z.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_triangle<W: Write>(out: &mut W, tri: &Triangle) -> GeometryResult<()> {
    write_vec3(out, tri.v0)?;
    write_vec3(out, tri.v1)?;
    write_vec3(out, tri.v2)?;
    Ok(())
}
