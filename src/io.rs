//! Binary serialization of navigation meshes.
//!
//! The format is little-endian throughout: a header (magic, version, mesh
//! parameters, tile count) followed by one record per live tile. Decoding
//! is all-or-nothing; it builds a fresh [`NavMesh`] and never touches any
//! existing mesh, so a caller keeping a mesh alive across a failed decode
//! loses nothing. Links and BV trees are not serialized; they are rebuilt
//! at tile insertion during decode.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::nav_mesh::{NavMesh, PolyParams, TileParams};
use crate::status::{Result, Status};
use crate::{NavMeshParams, PolyFlags, MAX_VERTS_PER_POLY};

/// Magic number identifying serialized mesh data ("TNAV" in little-endian)
pub const NAVMESH_MAGIC: u32 = 0x5641_4E54;

/// Current format version
pub const NAVMESH_VERSION: u32 = 1;

/// Fixed size of one polygon record:
/// vert count (1) + area (1) + flags (2) + 6 vertex indices (12) +
/// 6 neighbor entries (12)
const POLY_RECORD_SIZE: u64 = 28;

/// Serializes a mesh to bytes.
///
/// Tiles are written in slot order; vertex tables, polygon tables, areas
/// and flags survive a round trip bit-exactly.
pub fn encode(mesh: &NavMesh) -> Vec<u8> {
    let mut out = Vec::new();

    // Writes to a Vec cannot fail.
    let _ = write_mesh(&mut out, mesh);
    out
}

fn write_mesh(out: &mut Vec<u8>, mesh: &NavMesh) -> std::io::Result<()> {
    out.write_u32::<LittleEndian>(NAVMESH_MAGIC)?;
    out.write_u32::<LittleEndian>(NAVMESH_VERSION)?;

    let params = mesh.params();
    for v in params.origin {
        out.write_f32::<LittleEndian>(v)?;
    }
    out.write_f32::<LittleEndian>(params.tile_width)?;
    out.write_f32::<LittleEndian>(params.tile_height)?;
    out.write_i32::<LittleEndian>(params.max_tiles)?;
    out.write_i32::<LittleEndian>(params.max_polys_per_tile)?;

    out.write_u32::<LittleEndian>(mesh.tile_count() as u32)?;

    for tile in mesh.tiles() {
        out.write_i32::<LittleEndian>(tile.x)?;
        out.write_i32::<LittleEndian>(tile.y)?;
        for v in tile.bmin {
            out.write_f32::<LittleEndian>(v)?;
        }
        for v in tile.bmax {
            out.write_f32::<LittleEndian>(v)?;
        }
        out.write_u32::<LittleEndian>(tile.verts.len() as u32)?;
        out.write_u32::<LittleEndian>(tile.polys.len() as u32)?;

        for vert in &tile.verts {
            for &v in vert {
                out.write_f32::<LittleEndian>(v)?;
            }
        }

        for poly in &tile.polys {
            out.write_u8(poly.vert_count)?;
            out.write_u8(poly.area)?;
            out.write_u16::<LittleEndian>(poly.flags.bits())?;
            for &v in &poly.verts {
                out.write_u16::<LittleEndian>(v)?;
            }
            for &n in &poly.neighbors {
                out.write_u16::<LittleEndian>(n)?;
            }
        }
    }
    Ok(())
}

/// Deserializes a mesh from bytes.
///
/// Fails with `WRONG_MAGIC` or `WRONG_VERSION` on unrecognized data, and
/// `INVALID_PARAM` when declared counts do not fit the buffer or any tile
/// fails insertion validation.
pub fn decode(data: &[u8]) -> Result<NavMesh> {
    let mut cursor = Cursor::new(data);

    // Every deserialization failure carries INVALID_PARAM; the magic and
    // version details narrow the cause on top of it.
    let magic = cursor.read_u32::<LittleEndian>()?;
    if magic != NAVMESH_MAGIC {
        return Err(Status::failure_detail(
            Status::INVALID_PARAM | Status::WRONG_MAGIC,
        ));
    }
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != NAVMESH_VERSION {
        return Err(Status::failure_detail(
            Status::INVALID_PARAM | Status::WRONG_VERSION,
        ));
    }

    let mut origin = [0.0f32; 3];
    for v in &mut origin {
        *v = cursor.read_f32::<LittleEndian>()?;
    }
    let params = NavMeshParams {
        origin,
        tile_width: cursor.read_f32::<LittleEndian>()?,
        tile_height: cursor.read_f32::<LittleEndian>()?,
        max_tiles: cursor.read_i32::<LittleEndian>()?,
        max_polys_per_tile: cursor.read_i32::<LittleEndian>()?,
    };

    let mut mesh = NavMesh::new(params)?;

    let tile_count = cursor.read_u32::<LittleEndian>()?;
    if tile_count > params.max_tiles as u32 {
        return Err(Status::invalid_param());
    }

    for _ in 0..tile_count {
        let tile = read_tile(&mut cursor, data.len() as u64)?;
        mesh.add_tile(tile)?;
    }

    log::debug!("decoded mesh with {} tiles", mesh.tile_count());
    Ok(mesh)
}

fn read_tile(cursor: &mut Cursor<&[u8]>, data_len: u64) -> Result<TileParams> {
    let x = cursor.read_i32::<LittleEndian>()?;
    let y = cursor.read_i32::<LittleEndian>()?;

    // Bounds are stored for format completeness; insertion recomputes them
    // from the vertex table to the same values.
    for _ in 0..6 {
        cursor.read_f32::<LittleEndian>()?;
    }

    let vert_count = cursor.read_u32::<LittleEndian>()? as u64;
    let poly_count = cursor.read_u32::<LittleEndian>()? as u64;

    // Declared counts must fit the remaining buffer before any allocation.
    let remaining = data_len.saturating_sub(cursor.position());
    let vert_bytes = vert_count.checked_mul(12).ok_or(Status::invalid_param())?;
    let poly_bytes = poly_count
        .checked_mul(POLY_RECORD_SIZE)
        .ok_or(Status::invalid_param())?;
    let needed = vert_bytes
        .checked_add(poly_bytes)
        .ok_or(Status::invalid_param())?;
    if needed > remaining {
        return Err(Status::invalid_param());
    }

    let mut verts = Vec::with_capacity(vert_count as usize * 3);
    for _ in 0..vert_count * 3 {
        verts.push(cursor.read_f32::<LittleEndian>()?);
    }

    let mut polys = Vec::with_capacity(poly_count as usize);
    for _ in 0..poly_count {
        let poly_vert_count = cursor.read_u8()? as usize;
        let area = cursor.read_u8()?;
        let flags = PolyFlags::from_bits_retain(cursor.read_u16::<LittleEndian>()?);

        let mut all_verts = [0u16; MAX_VERTS_PER_POLY];
        for v in &mut all_verts {
            *v = cursor.read_u16::<LittleEndian>()?;
        }
        let mut all_neighbors = [0u16; MAX_VERTS_PER_POLY];
        for n in &mut all_neighbors {
            *n = cursor.read_u16::<LittleEndian>()?;
        }

        if poly_vert_count < 3 || poly_vert_count > MAX_VERTS_PER_POLY {
            return Err(Status::invalid_param());
        }

        polys.push(PolyParams {
            verts: all_verts[..poly_vert_count].to_vec(),
            neighbors: all_neighbors[..poly_vert_count].to_vec(),
            flags,
            area,
        });
    }

    Ok(TileParams { x, y, verts, polys })
}
