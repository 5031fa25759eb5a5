//! Tiled navigation-mesh query engine.
//!
//! A navigation mesh is a tiled collection of convex polygons approximating a
//! walkable surface. This crate answers spatial questions against an
//! already-built mesh: which polygon contains a point, what is a traversable
//! path between two points, where is a random reachable point. Mesh
//! construction from raw geometry is out of scope; meshes are populated
//! either programmatically through [`NavMesh::add_tile`] or by decoding the
//! binary format in [`io`].
//!
//! Queries run through a [`NavMeshQuery`] bound to a [`NavMesh`]. The query
//! holds a shared borrow of the mesh, so tile mutation while a query context
//! is alive is rejected at compile time. Traversability is decided per call
//! by a caller-supplied [`QueryFilter`].

mod bvh;
mod filter;
mod math;
mod nav_mesh;
mod node_pool;
mod query;
mod status;

pub mod io;
pub mod loader;

#[cfg(test)]
mod test_mesh_helpers;

#[cfg(test)]
mod serialization_tests;

pub use filter::QueryFilter;
pub use nav_mesh::{Link, MeshTile, NavMesh, Poly, PolyParams, TileParams};
pub use query::{
    NavMeshQuery, PolyPath, StraightPath, StraightPathFlags, StraightPathPoint,
    DEFAULT_NODE_BUDGET,
};
pub use status::{Result, Status};

/// Maximum number of vertices per polygon
pub const MAX_VERTS_PER_POLY: usize = 6;

/// Number of area types addressable by a query filter cost table
pub const MAX_AREAS: usize = 64;

/// Sentinel for "this polygon edge has no neighbor" (mesh boundary)
pub const NO_NEIGHBOR: u16 = 0xffff;

/// Area type for open ground
pub const AREA_GROUND: u8 = 0;
/// Area type for water
pub const AREA_WATER: u8 = 1;
/// Area type for roads
pub const AREA_ROAD: u8 = 2;
/// Area type for doors
pub const AREA_DOOR: u8 = 3;
/// Area type for grass
pub const AREA_GRASS: u8 = 4;
/// Area type for jump zones
pub const AREA_JUMP: u8 = 5;

bitflags::bitflags! {
    /// Per-polygon traversal flags.
    ///
    /// The semantics are caller-defined; the named constants mirror the
    /// conventional sample set and carry no meaning inside the engine beyond
    /// the include/exclude masking done by [`QueryFilter`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PolyFlags: u16 {
        /// Ability to walk (ground, grass, road)
        const WALK = 0x01;
        /// Ability to swim (water)
        const SWIM = 0x02;
        /// Ability to move through doors
        const DOOR = 0x04;
        /// Ability to jump
        const JUMP = 0x08;
        /// Disabled polygon
        const DISABLED = 0x10;
        /// All abilities
        const ALL = 0xffff;
    }
}

impl Default for PolyFlags {
    fn default() -> Self {
        PolyFlags::WALK
    }
}

/// Number of bits for the polygon index within a [`PolyRef`]
const POLY_BITS: u32 = 16;
/// Number of bits for the tile id within a [`PolyRef`]
const TILE_BITS: u32 = 10;
/// Number of bits for the tile salt within a [`PolyRef`]
const SALT_BITS: u32 = 6;

const POLY_MASK: u32 = (1 << POLY_BITS) - 1;
const TILE_MASK: u32 = (1 << TILE_BITS) - 1;
const SALT_MASK: u32 = (1 << SALT_BITS) - 1;

/// Opaque handle to a polygon within a navigation mesh.
///
/// Packs the owning tile's slot id, the tile's generation salt and the
/// polygon index into a single integer. A ref stays resolvable only while
/// the tile generation it was issued against is live; once the slot is
/// cleared or reused the embedded salt no longer matches and resolution
/// reports an invalid parameter instead of aliasing the new occupant.
///
/// The value 0 is reserved for "no polygon" ([`PolyRef::NONE`]); tile ids
/// are stored 1-based so no live polygon encodes to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PolyRef(u32);

impl PolyRef {
    /// The reserved "no polygon" handle
    pub const NONE: PolyRef = PolyRef(0);

    /// Creates a ref from a raw id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id
    pub const fn id(&self) -> u32 {
        self.0
    }

    /// Returns true if this is the reserved "no polygon" handle
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }
}

/// Packs salt, 1-based tile id and polygon index into a [`PolyRef`]
#[inline]
pub(crate) fn encode_poly_ref(salt: u32, tile_id: u32, poly: u32) -> PolyRef {
    PolyRef::new(
        ((salt & SALT_MASK) << (POLY_BITS + TILE_BITS))
            | ((tile_id & TILE_MASK) << POLY_BITS)
            | (poly & POLY_MASK),
    )
}

/// Splits a [`PolyRef`] into (salt, 1-based tile id, polygon index)
#[inline]
pub(crate) fn decode_poly_ref(reference: PolyRef) -> (u32, u32, u32) {
    let id = reference.id();
    (
        (id >> (POLY_BITS + TILE_BITS)) & SALT_MASK,
        (id >> POLY_BITS) & TILE_MASK,
        id & POLY_MASK,
    )
}

/// Configuration parameters for a navigation mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavMeshParams {
    /// World-space origin of the tile grid
    pub origin: [f32; 3],
    /// Width of each tile along the x axis
    pub tile_width: f32,
    /// Height of each tile along the z axis
    pub tile_height: f32,
    /// Maximum number of tiles the mesh can hold
    pub max_tiles: i32,
    /// Maximum number of polygons per tile
    pub max_polys_per_tile: i32,
}

impl NavMeshParams {
    /// Validates the parameters against the [`PolyRef`] bit budget.
    pub(crate) fn validate(&self) -> Result<()> {
        for v in self.origin {
            if !v.is_finite() {
                return Err(Status::invalid_param());
            }
        }
        if self.tile_width <= 0.0 || self.tile_height <= 0.0 {
            return Err(Status::invalid_param());
        }
        if self.max_tiles <= 0 || self.max_polys_per_tile <= 0 {
            return Err(Status::invalid_param());
        }
        // Tile ids are 1-based inside refs, so the last usable slot is
        // TILE_MASK - 1.
        if self.max_tiles as u32 >= (1 << TILE_BITS) {
            return Err(Status::invalid_param());
        }
        if self.max_polys_per_tile as u32 > (1 << POLY_BITS) {
            return Err(Status::invalid_param());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poly_ref_round_trip() {
        let reference = encode_poly_ref(5, 12, 345);
        let (salt, tile, poly) = decode_poly_ref(reference);
        assert_eq!(salt, 5);
        assert_eq!(tile, 12);
        assert_eq!(poly, 345);
        assert!(!reference.is_none());
    }

    #[test]
    fn test_poly_ref_masks_overflow() {
        let reference = encode_poly_ref(SALT_MASK + 1, 0, 0);
        let (salt, _, _) = decode_poly_ref(reference);
        assert_eq!(salt, 0);
    }

    #[test]
    fn test_null_ref() {
        assert!(PolyRef::NONE.is_none());
        assert_eq!(PolyRef::default(), PolyRef::NONE);
    }

    #[test]
    fn test_params_validation() {
        let good = NavMeshParams {
            origin: [0.0, 0.0, 0.0],
            tile_width: 10.0,
            tile_height: 10.0,
            max_tiles: 64,
            max_polys_per_tile: 256,
        };
        assert!(good.validate().is_ok());

        let mut bad = good;
        bad.tile_width = 0.0;
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.origin[1] = f32::NAN;
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.max_tiles = 1 << TILE_BITS;
        assert!(bad.validate().is_err());
    }
}
