//! Tile store: the navigation mesh itself.
//!
//! A [`NavMesh`] owns a fixed array of tile slots. Each slot carries a
//! generation salt that is baked into every [`PolyRef`] issued for the tile
//! occupying it; dropping or replacing the tile bumps the salt, so stale
//! refs fail salt validation instead of resolving to the new occupant.
//!
//! Polygon adjacency is stored as per-poly link chains. Internal links come
//! from the neighbor table supplied at insertion; external links are
//! stitched at insertion time by matching boundary-edge endpoints against
//! the four grid-adjacent tiles.

use std::collections::HashMap;

use crate::bvh::BvTree;
use crate::filter::QueryFilter;
use crate::math::overlap_bounds;
use crate::status::{Result, Status};
use crate::{
    decode_poly_ref, encode_poly_ref, NavMeshParams, PolyFlags, PolyRef, MAX_AREAS,
    MAX_VERTS_PER_POLY, NO_NEIGHBOR,
};

/// Matching tolerance for boundary-edge endpoints when stitching tiles
const EDGE_MATCH_EPS: f32 = 1e-4;

/// Polygon within a mesh tile.
#[derive(Debug, Clone)]
pub struct Poly {
    /// Indices into the tile vertex table; only the first `vert_count` used
    pub verts: [u16; MAX_VERTS_PER_POLY],
    /// Per-edge neighbor table: `NO_NEIGHBOR`, or neighbor poly index + 1
    pub neighbors: [u16; MAX_VERTS_PER_POLY],
    /// Number of vertices (3..=6)
    pub vert_count: u8,
    /// Area type
    pub area: u8,
    /// Traversal flags
    pub flags: PolyFlags,
    /// Head of this polygon's link chain, index into the tile link table
    pub first_link: Option<u32>,
}

/// Directed adjacency edge from one polygon to another.
#[derive(Debug, Clone)]
pub struct Link {
    /// Target polygon
    pub reference: PolyRef,
    /// Edge of the owning polygon the link crosses
    pub edge: u8,
    /// Next link in the owning polygon's chain
    pub next: Option<u32>,
}

/// Input polygon for [`NavMesh::add_tile`].
#[derive(Debug, Clone)]
pub struct PolyParams {
    /// Vertex indices into [`TileParams::verts`], 3 to 6 of them
    pub verts: Vec<u16>,
    /// Per-edge neighbor table, same length as `verts`; entry j covers the
    /// edge from vertex j to vertex j+1. `NO_NEIGHBOR` marks a boundary
    /// edge, any other value is the neighbor poly index + 1.
    pub neighbors: Vec<u16>,
    /// Traversal flags
    pub flags: PolyFlags,
    /// Area type, below [`MAX_AREAS`]
    pub area: u8,
}

/// Input data for [`NavMesh::add_tile`].
#[derive(Debug, Clone)]
pub struct TileParams {
    /// Grid x coordinate
    pub x: i32,
    /// Grid y coordinate
    pub y: i32,
    /// Vertex table, flat x/y/z triples
    pub verts: Vec<f32>,
    /// Polygon table
    pub polys: Vec<PolyParams>,
}

/// One tile of the navigation mesh.
#[derive(Debug, Clone)]
pub struct MeshTile {
    /// Grid x coordinate
    pub x: i32,
    /// Grid y coordinate
    pub y: i32,
    /// World-space minimum bounds
    pub bmin: [f32; 3],
    /// World-space maximum bounds
    pub bmax: [f32; 3],
    /// Vertex table
    pub verts: Vec<[f32; 3]>,
    /// Polygon table
    pub polys: Vec<Poly>,
    /// Link table; polygons chain into it through `first_link`
    pub links: Vec<Link>,
    /// Spatial index over the polygon table
    pub(crate) bv_tree: BvTree,
}

impl MeshTile {
    /// World-space vertices of a polygon; only the first `vert_count`
    /// entries are meaningful.
    pub(crate) fn poly_vertices(&self, poly: &Poly) -> [[f32; 3]; MAX_VERTS_PER_POLY] {
        let mut out = [[0.0; 3]; MAX_VERTS_PER_POLY];
        for (slot, &vi) in out
            .iter_mut()
            .zip(&poly.verts[..poly.vert_count as usize])
        {
            *slot = self.verts[vi as usize];
        }
        out
    }

    /// Iterates the link chain of a polygon
    pub(crate) fn links_of<'a>(&'a self, poly: &Poly) -> LinkIter<'a> {
        LinkIter {
            tile: self,
            next: poly.first_link,
        }
    }

    /// World-space bounds of one polygon
    fn poly_bounds(&self, poly: &Poly) -> ([f32; 3], [f32; 3]) {
        let verts = self.poly_vertices(poly);
        let count = poly.vert_count as usize;
        let mut bmin = verts[0];
        let mut bmax = verts[0];
        for v in &verts[1..count] {
            for axis in 0..3 {
                bmin[axis] = bmin[axis].min(v[axis]);
                bmax[axis] = bmax[axis].max(v[axis]);
            }
        }
        (bmin, bmax)
    }
}

pub(crate) struct LinkIter<'a> {
    tile: &'a MeshTile,
    next: Option<u32>,
}

impl<'a> Iterator for LinkIter<'a> {
    type Item = &'a Link;

    fn next(&mut self) -> Option<&'a Link> {
        let link = self.tile.links.get(self.next? as usize)?;
        self.next = link.next;
        Some(link)
    }
}

#[derive(Debug, Clone)]
struct TileSlot {
    /// Generation salt; advances whenever the slot's occupant changes
    salt: u32,
    tile: Option<MeshTile>,
    next_free: Option<usize>,
}

/// Boundary edge of a tile, used during cross-tile stitching
#[derive(Debug, Clone, Copy)]
struct BoundaryEdge {
    poly: usize,
    edge: u8,
    va: [f32; 3],
    vb: [f32; 3],
}

/// Tiled navigation mesh.
#[derive(Debug, Clone)]
pub struct NavMesh {
    params: NavMeshParams,
    slots: Vec<TileSlot>,
    free_head: Option<usize>,
    pos_lookup: HashMap<(i32, i32), usize>,
}

impl NavMesh {
    /// Creates an empty mesh.
    ///
    /// Fails with `INVALID_PARAM` when the parameters are inconsistent or
    /// exceed the ref bit budget.
    pub fn new(params: NavMeshParams) -> Result<Self> {
        params.validate()?;
        let max_tiles = params.max_tiles as usize;

        let mut slots = Vec::with_capacity(max_tiles);
        for i in 0..max_tiles {
            slots.push(TileSlot {
                salt: 1,
                tile: None,
                next_free: if i + 1 < max_tiles { Some(i + 1) } else { None },
            });
        }

        Ok(Self {
            params,
            slots,
            free_head: if max_tiles > 0 { Some(0) } else { None },
            pos_lookup: HashMap::new(),
        })
    }

    /// Mesh parameters
    pub fn params(&self) -> &NavMeshParams {
        &self.params
    }

    /// Number of live tiles
    pub fn tile_count(&self) -> usize {
        self.pos_lookup.len()
    }

    /// Iterates live tiles in slot order
    pub fn tiles(&self) -> impl Iterator<Item = &MeshTile> {
        self.slots.iter().filter_map(|slot| slot.tile.as_ref())
    }

    /// Tile at a grid location
    pub fn tile_at(&self, x: i32, y: i32) -> Option<&MeshTile> {
        let slot = *self.pos_lookup.get(&(x, y))?;
        self.slots[slot].tile.as_ref()
    }

    /// Adds a tile, returning the ref of its first polygon.
    ///
    /// Fails with `ALREADY_OCCUPIED` when a live tile holds the same grid
    /// location, `OUT_OF_MEMORY` when every slot is taken, and
    /// `INVALID_PARAM` when the vertex or polygon tables are malformed.
    pub fn add_tile(&mut self, tile: TileParams) -> Result<PolyRef> {
        validate_tile_params(&tile, self.params.max_polys_per_tile as usize)?;

        if self.pos_lookup.contains_key(&(tile.x, tile.y)) {
            return Err(Status::failure_detail(Status::ALREADY_OCCUPIED));
        }

        let slot = match self.free_head {
            Some(slot) => slot,
            None => return Err(Status::out_of_memory()),
        };
        self.free_head = self.slots[slot].next_free;
        self.slots[slot].next_free = None;

        let verts: Vec<[f32; 3]> = tile
            .verts
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();

        let mut bmin = verts[0];
        let mut bmax = verts[0];
        for v in &verts[1..] {
            for axis in 0..3 {
                bmin[axis] = bmin[axis].min(v[axis]);
                bmax[axis] = bmax[axis].max(v[axis]);
            }
        }

        let polys: Vec<Poly> = tile
            .polys
            .iter()
            .map(|p| {
                let mut verts = [0u16; MAX_VERTS_PER_POLY];
                let mut neighbors = [NO_NEIGHBOR; MAX_VERTS_PER_POLY];
                verts[..p.verts.len()].copy_from_slice(&p.verts);
                neighbors[..p.neighbors.len()].copy_from_slice(&p.neighbors);
                Poly {
                    verts,
                    neighbors,
                    vert_count: p.verts.len() as u8,
                    area: p.area,
                    flags: p.flags,
                    first_link: None,
                }
            })
            .collect();

        let mut mesh_tile = MeshTile {
            x: tile.x,
            y: tile.y,
            bmin,
            bmax,
            verts,
            polys,
            links: Vec::new(),
            bv_tree: BvTree::default(),
        };

        let poly_bounds: Vec<_> = mesh_tile
            .polys
            .iter()
            .map(|p| mesh_tile.poly_bounds(p))
            .collect();
        mesh_tile.bv_tree = BvTree::build(&mesh_tile.bmin, &mesh_tile.bmax, &poly_bounds);

        let (x, y) = (tile.x, tile.y);
        self.slots[slot].tile = Some(mesh_tile);
        self.pos_lookup.insert((x, y), slot);

        self.rebuild_links(slot);
        for neighbor in self.adjacent_slots(x, y) {
            self.rebuild_links(neighbor);
        }

        let bv_nodes = self.slots[slot]
            .tile
            .as_ref()
            .map(|t| t.bv_tree.node_count())
            .unwrap_or(0);
        log::debug!(
            "added tile at ({x}, {y}) in slot {slot}, {} polys, {bv_nodes} bv nodes",
            tile.polys.len()
        );

        Ok(encode_poly_ref(self.slots[slot].salt, slot as u32 + 1, 0))
    }

    /// Removes the tile at a grid location.
    ///
    /// All refs into the tile become invalid; fails with `INVALID_PARAM`
    /// when no tile occupies the location.
    pub fn remove_tile(&mut self, x: i32, y: i32) -> Result<()> {
        let slot = match self.pos_lookup.remove(&(x, y)) {
            Some(slot) => slot,
            None => return Err(Status::invalid_param()),
        };

        self.slots[slot].tile = None;
        self.slots[slot].salt = next_salt(self.slots[slot].salt);
        self.slots[slot].next_free = self.free_head;
        self.free_head = Some(slot);

        for neighbor in self.adjacent_slots(x, y) {
            self.rebuild_links(neighbor);
        }

        log::debug!("removed tile at ({x}, {y}) from slot {slot}");
        Ok(())
    }

    /// Drops every tile. All outstanding refs become invalid.
    pub fn clear(&mut self) {
        let max_tiles = self.slots.len();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.tile.take().is_some() {
                slot.salt = next_salt(slot.salt);
            }
            slot.next_free = if i + 1 < max_tiles { Some(i + 1) } else { None };
        }
        self.free_head = if max_tiles > 0 { Some(0) } else { None };
        self.pos_lookup.clear();
        log::debug!("cleared all tiles");
    }

    /// Replaces this mesh's contents with another mesh's.
    ///
    /// Every slot salt advances past both meshes' generations, so refs
    /// issued against either the old contents or `other` itself resolve
    /// invalid afterwards; callers re-resolve through queries on the
    /// replaced mesh.
    pub fn replace(&mut self, other: NavMesh) {
        let old_salts: Vec<u32> = self.slots.iter().map(|slot| slot.salt).collect();
        *self = other;

        for (i, slot) in self.slots.iter_mut().enumerate() {
            let floor = old_salts.get(i).copied().unwrap_or(0).max(slot.salt);
            slot.salt = next_salt(floor);
        }

        // Links embed the donor mesh's salts; rebuild them all.
        let live: Vec<usize> = self.pos_lookup.values().copied().collect();
        for slot in live {
            self.rebuild_links(slot);
        }
        log::debug!("replaced mesh contents, {} tiles", self.tile_count());
    }

    /// Checks whether a ref resolves against the current mesh generation
    pub fn is_valid_poly_ref(&self, reference: PolyRef) -> bool {
        self.get_tile_and_poly(reference).is_ok()
    }

    /// Resolves a ref to its tile and polygon.
    ///
    /// Fails with `INVALID_PARAM` for the null ref, out-of-range ids, dead
    /// slots, salt mismatches and out-of-range polygon indices.
    pub fn get_tile_and_poly(&self, reference: PolyRef) -> Result<(&MeshTile, &Poly)> {
        if reference.is_none() {
            return Err(Status::invalid_param());
        }
        let (salt, tile_id, poly) = decode_poly_ref(reference);
        if tile_id == 0 || tile_id as usize > self.slots.len() {
            return Err(Status::invalid_param());
        }
        let slot = &self.slots[tile_id as usize - 1];
        if slot.salt != salt {
            return Err(Status::invalid_param());
        }
        let tile = slot.tile.as_ref().ok_or(Status::invalid_param())?;
        let poly = tile.polys.get(poly as usize).ok_or(Status::invalid_param())?;
        Ok((tile, poly))
    }

    /// Collects refs of polygons overlapping a world-space box and passing
    /// the filter, in deterministic tile-slot order.
    pub fn query_polygons(
        &self,
        bmin: &[f32; 3],
        bmax: &[f32; 3],
        filter: &QueryFilter,
    ) -> Vec<PolyRef> {
        let mut out = Vec::new();
        let mut hits = Vec::new();

        for (slot_index, slot) in self.slots.iter().enumerate() {
            let Some(tile) = slot.tile.as_ref() else {
                continue;
            };
            if !overlap_bounds(bmin, bmax, &tile.bmin, &tile.bmax) {
                continue;
            }

            hits.clear();
            tile.bv_tree.query(&tile.bmin, bmin, bmax, &mut hits);
            hits.sort_unstable();

            for &poly_index in &hits {
                if filter.pass_filter(&tile.polys[poly_index]) {
                    out.push(encode_poly_ref(
                        slot.salt,
                        slot_index as u32 + 1,
                        poly_index as u32,
                    ));
                }
            }
        }
        out
    }

    /// Ref of a polygon by slot index, valid for the current generation
    pub(crate) fn poly_ref_at(&self, slot: usize, poly: usize) -> PolyRef {
        encode_poly_ref(self.slots[slot].salt, slot as u32 + 1, poly as u32)
    }

    /// Iterates (slot index, tile) pairs in slot order
    pub(crate) fn tile_slots(&self) -> impl Iterator<Item = (usize, &MeshTile)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.tile.as_ref().map(|tile| (i, tile)))
    }

    fn adjacent_slots(&self, x: i32, y: i32) -> Vec<usize> {
        [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
            .iter()
            .filter_map(|pos| self.pos_lookup.get(pos).copied())
            .collect()
    }

    /// Boundary edges of a tile: edges with no internal neighbor
    fn boundary_edges(&self, slot: usize) -> Vec<BoundaryEdge> {
        let Some(tile) = self.slots[slot].tile.as_ref() else {
            return Vec::new();
        };
        let mut edges = Vec::new();
        for (poly_index, poly) in tile.polys.iter().enumerate() {
            let count = poly.vert_count as usize;
            for edge in 0..count {
                if poly.neighbors[edge] != NO_NEIGHBOR {
                    continue;
                }
                edges.push(BoundaryEdge {
                    poly: poly_index,
                    edge: edge as u8,
                    va: tile.verts[poly.verts[edge] as usize],
                    vb: tile.verts[poly.verts[(edge + 1) % count] as usize],
                });
            }
        }
        edges
    }

    /// Rebuilds a tile's link table: internal links from the neighbor
    /// table, then external links stitched against grid-adjacent tiles.
    fn rebuild_links(&mut self, slot: usize) {
        let (x, y) = match self.slots[slot].tile.as_ref() {
            Some(tile) => (tile.x, tile.y),
            None => return,
        };

        // Match boundary edges against adjacent tiles before taking the
        // mutable borrow.
        let own_edges = self.boundary_edges(slot);
        let mut external: Vec<(usize, u8, PolyRef)> = Vec::new();
        for neighbor_slot in self.adjacent_slots(x, y) {
            let neighbor_salt = self.slots[neighbor_slot].salt;
            for theirs in self.boundary_edges(neighbor_slot) {
                for ours in &own_edges {
                    if edges_match(ours, &theirs) {
                        external.push((
                            ours.poly,
                            ours.edge,
                            encode_poly_ref(
                                neighbor_salt,
                                neighbor_slot as u32 + 1,
                                theirs.poly as u32,
                            ),
                        ));
                    }
                }
            }
        }

        let salt = self.slots[slot].salt;
        let Some(tile) = self.slots[slot].tile.as_mut() else {
            return;
        };

        tile.links.clear();
        for poly in &mut tile.polys {
            poly.first_link = None;
        }

        for poly_index in 0..tile.polys.len() {
            let count = tile.polys[poly_index].vert_count as usize;
            for edge in 0..count {
                let neighbor = tile.polys[poly_index].neighbors[edge];
                if neighbor == NO_NEIGHBOR {
                    continue;
                }
                let target = encode_poly_ref(salt, slot as u32 + 1, neighbor as u32 - 1);
                push_link(tile, poly_index, target, edge as u8);
            }
        }

        for (poly_index, edge, reference) in external {
            push_link(tile, poly_index, reference, edge);
        }
    }
}

fn push_link(tile: &mut MeshTile, poly: usize, reference: PolyRef, edge: u8) {
    let next = tile.polys[poly].first_link;
    tile.links.push(Link {
        reference,
        edge,
        next,
    });
    tile.polys[poly].first_link = Some(tile.links.len() as u32 - 1);
}

/// Two boundary edges stitch when their endpoints coincide; adjacent tiles
/// wind in the same direction, so the shared edge runs reversed.
fn edges_match(a: &BoundaryEdge, b: &BoundaryEdge) -> bool {
    (points_match(&a.va, &b.vb) && points_match(&a.vb, &b.va))
        || (points_match(&a.va, &b.va) && points_match(&a.vb, &b.vb))
}

fn points_match(a: &[f32; 3], b: &[f32; 3]) -> bool {
    (a[0] - b[0]).abs() <= EDGE_MATCH_EPS
        && (a[1] - b[1]).abs() <= EDGE_MATCH_EPS
        && (a[2] - b[2]).abs() <= EDGE_MATCH_EPS
}

fn next_salt(salt: u32) -> u32 {
    let salt = (salt + 1) & crate::SALT_MASK;
    if salt == 0 {
        1
    } else {
        salt
    }
}

fn validate_tile_params(tile: &TileParams, max_polys: usize) -> Result<()> {
    if tile.verts.is_empty() || tile.verts.len() % 3 != 0 {
        return Err(Status::invalid_param());
    }
    if tile.polys.is_empty() || tile.polys.len() > max_polys {
        return Err(Status::invalid_param());
    }
    for v in &tile.verts {
        if !v.is_finite() {
            return Err(Status::invalid_param());
        }
    }

    let vert_count = tile.verts.len() / 3;
    let poly_count = tile.polys.len();
    for poly in &tile.polys {
        if poly.verts.len() < 3 || poly.verts.len() > MAX_VERTS_PER_POLY {
            return Err(Status::invalid_param());
        }
        if poly.neighbors.len() != poly.verts.len() {
            return Err(Status::invalid_param());
        }
        if poly.area as usize >= MAX_AREAS {
            return Err(Status::invalid_param());
        }
        for &vi in &poly.verts {
            if vi as usize >= vert_count {
                return Err(Status::invalid_param());
            }
        }
        for &n in &poly.neighbors {
            if n != NO_NEIGHBOR && (n == 0 || n as usize > poly_count) {
                return Err(Status::invalid_param());
            }
        }
    }
    Ok(())
}
