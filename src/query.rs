//! Query engine: pathfinding and spatial sampling over a navigation mesh.
//!
//! A [`NavMeshQuery`] borrows the mesh for its whole lifetime, so the mesh
//! cannot be mutated while queries are in flight; after a `replace` the
//! caller constructs a new query context against the new generation.
//!
//! Pathfinding is two-phase: [`find_path`](NavMeshQuery::find_path) runs A*
//! over the polygon adjacency graph and returns a polygon corridor, then
//! [`find_straight_path`](NavMeshQuery::find_straight_path) pulls a taut
//! string of waypoints through that corridor with the funnel algorithm.

use crate::filter::QueryFilter;
use crate::math::{
    closest_point_on_segment, dist, dist_sqr, point_in_poly_2d, poly_area_2d, poly_height_at,
    random_point_in_triangle, tri_area_2d, v_equal_2d,
};
use crate::nav_mesh::{MeshTile, NavMesh, Poly};
use crate::node_pool::{NodeFlags, NodePool, OpenList, NULL_IDX};
use crate::status::{Result, Status};
use crate::PolyRef;

/// Default node pool capacity for a query context
pub const DEFAULT_NODE_BUDGET: usize = 2048;

bitflags::bitflags! {
    /// Flags describing a straight-path waypoint.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StraightPathFlags: u8 {
        /// The waypoint is the start position
        const START = 0x01;
        /// The waypoint is the end position
        const END = 0x02;
        /// The waypoint is a portal crossing (a corridor corner)
        const PORTAL = 0x04;
    }
}

/// One waypoint of a straightened path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightPathPoint {
    /// Waypoint position
    pub pos: [f32; 3],
    /// Waypoint kind
    pub flags: StraightPathFlags,
    /// Polygon entered at this waypoint; `PolyRef::NONE` for the end point
    pub reference: PolyRef,
}

/// Result of [`NavMeshQuery::find_straight_path`].
#[derive(Debug, Clone)]
pub struct StraightPath {
    /// Waypoints from start to end
    pub points: Vec<StraightPathPoint>,
    /// `SUCCESS`, possibly with `BUFFER_TOO_SMALL` when truncated
    pub status: Status,
}

/// Result of [`NavMeshQuery::find_path`].
#[derive(Debug, Clone)]
pub struct PolyPath {
    /// Polygon corridor from the start polygon towards the end polygon
    pub polys: Vec<PolyRef>,
    /// `SUCCESS`, possibly with `PARTIAL_RESULT`, `OUT_OF_NODES` or
    /// `BUFFER_TOO_SMALL` details
    pub status: Status,
}

impl PolyPath {
    /// True when the corridor stops short of the requested end polygon
    pub fn is_partial(&self) -> bool {
        self.status.has_detail(Status::PARTIAL_RESULT)
    }
}

/// Query context bound to one navigation mesh.
///
/// Holds the search node pool, which is reused across calls; construction
/// fixes its capacity. The context is cheap enough to create per caller,
/// and each concurrent caller needs its own since searches take `&mut self`.
pub struct NavMeshQuery<'m> {
    mesh: &'m NavMesh,
    pool: NodePool,
    open: OpenList,
}

impl<'m> NavMeshQuery<'m> {
    /// Creates a query context with the default node budget
    pub fn new(mesh: &'m NavMesh) -> Self {
        Self::with_node_budget(mesh, DEFAULT_NODE_BUDGET)
    }

    /// Creates a query context with an explicit node budget
    pub fn with_node_budget(mesh: &'m NavMesh, max_nodes: usize) -> Self {
        Self {
            mesh,
            pool: NodePool::new(max_nodes.max(1)),
            open: OpenList::new(),
        }
    }

    /// The mesh this context queries
    pub fn mesh(&self) -> &'m NavMesh {
        self.mesh
    }

    /// Finds a polygon corridor from `start_ref` to `end_ref` with A*.
    ///
    /// Node positions are portal-edge midpoints, hop cost is the Euclidean
    /// distance between node positions scaled by the destination polygon's
    /// area cost, and the heuristic is the Euclidean distance to `end_pos`.
    ///
    /// When the search exhausts the graph without reaching the end, the
    /// corridor towards the heuristically closest visited polygon is
    /// returned with `PARTIAL_RESULT`. Running out of search nodes before
    /// reaching the end is a failure with `OUT_OF_NODES`. A corridor longer
    /// than `max_path` is truncated from the end with `BUFFER_TOO_SMALL`.
    pub fn find_path(
        &mut self,
        start_ref: PolyRef,
        end_ref: PolyRef,
        start_pos: &[f32; 3],
        end_pos: &[f32; 3],
        filter: &QueryFilter,
        max_path: usize,
    ) -> Result<PolyPath> {
        let (_, start_poly) = self.mesh.get_tile_and_poly(start_ref)?;
        let (_, end_poly) = self.mesh.get_tile_and_poly(end_ref)?;
        if !filter.pass_filter(start_poly) || !filter.pass_filter(end_poly) {
            return Err(Status::invalid_param());
        }
        if max_path == 0 {
            return Err(Status::invalid_param());
        }

        if start_ref == end_ref {
            return Ok(PolyPath {
                polys: vec![start_ref],
                status: Status::success(),
            });
        }

        self.pool.clear();
        self.open.clear();

        let start_idx = match self.pool.get_node(start_ref) {
            Some(idx) => idx,
            None => return Err(Status::failure_detail(Status::OUT_OF_NODES)),
        };
        {
            let node = self.pool.node_mut(start_idx);
            node.pos = *start_pos;
            node.cost = 0.0;
            node.total = dist(start_pos, end_pos);
            node.flags.insert(NodeFlags::OPEN);
        }
        self.open.push(start_idx, self.pool.node(start_idx).total);

        let mut best_idx = start_idx;
        let mut best_heur = self.pool.node(start_idx).total;
        let mut out_of_nodes = false;
        let mut reached_end = false;

        while let Some(cur_idx) = self.open.pop(&self.pool) {
            let (cur_ref, cur_pos, cur_cost, cur_total) = {
                let node = self.pool.node_mut(cur_idx);
                node.flags.remove(NodeFlags::OPEN);
                node.flags.insert(NodeFlags::CLOSED);
                (node.poly, node.pos, node.cost, node.total)
            };

            if cur_ref == end_ref {
                best_idx = cur_idx;
                reached_end = true;
                break;
            }

            let heur = cur_total - cur_cost;
            if heur < best_heur {
                best_heur = heur;
                best_idx = cur_idx;
            }

            let parent_ref = {
                let pidx = self.pool.node(cur_idx).pidx;
                if pidx == NULL_IDX {
                    PolyRef::NONE
                } else {
                    self.pool.node(pidx).poly
                }
            };

            let (cur_tile, cur_poly) = match self.mesh.get_tile_and_poly(cur_ref) {
                Ok(pair) => pair,
                Err(_) => continue,
            };

            for link in cur_tile.links_of(cur_poly) {
                let (neighbor_ref, edge) = (link.reference, link.edge);
                if neighbor_ref == parent_ref {
                    continue;
                }
                let Ok((_, neighbor_poly)) = self.mesh.get_tile_and_poly(neighbor_ref) else {
                    continue;
                };
                if !filter.pass_filter(neighbor_poly) {
                    continue;
                }

                let neighbor_pos = if neighbor_ref == end_ref {
                    *end_pos
                } else {
                    edge_midpoint(cur_tile, cur_poly, edge)
                };

                let hop = dist(&cur_pos, &neighbor_pos) * filter.poly_cost(neighbor_poly);
                let cost = cur_cost + hop;
                let heuristic = if neighbor_ref == end_ref {
                    0.0
                } else {
                    dist(&neighbor_pos, end_pos)
                };
                let total = cost + heuristic;

                let Some(neighbor_idx) = self.pool.get_node(neighbor_ref) else {
                    out_of_nodes = true;
                    continue;
                };
                let node = self.pool.node_mut(neighbor_idx);
                if (node.flags.contains(NodeFlags::OPEN) || node.flags.contains(NodeFlags::CLOSED))
                    && total >= node.total
                {
                    continue;
                }

                node.pos = neighbor_pos;
                node.cost = cost;
                node.total = total;
                node.pidx = cur_idx;
                node.flags.remove(NodeFlags::CLOSED);
                node.flags.insert(NodeFlags::OPEN);
                self.open.push(neighbor_idx, total);
            }
        }

        if !reached_end && out_of_nodes {
            return Err(Status::failure_detail(Status::OUT_OF_NODES));
        }

        let mut status = Status::success();
        if !reached_end {
            status = status.with_detail(Status::PARTIAL_RESULT);
        }
        if out_of_nodes {
            status = status.with_detail(Status::OUT_OF_NODES);
        }

        // Walk parents back to the start, then reverse.
        let mut polys = Vec::new();
        let mut idx = best_idx;
        loop {
            polys.push(self.pool.node(idx).poly);
            let pidx = self.pool.node(idx).pidx;
            if pidx == NULL_IDX {
                break;
            }
            idx = pidx;
        }
        polys.reverse();

        if polys.len() > max_path {
            polys.truncate(max_path);
            status = status.with_detail(Status::BUFFER_TOO_SMALL);
        }

        Ok(PolyPath { polys, status })
    }

    /// Straightens a polygon corridor into waypoints with the funnel
    /// algorithm.
    ///
    /// `path` is a corridor of pairwise-adjacent polygons, as produced by
    /// [`find_path`](NavMeshQuery::find_path). Start and end positions are
    /// clamped onto the first and last polygon. Waypoints past `max_points`
    /// are dropped and the status carries `BUFFER_TOO_SMALL`.
    pub fn find_straight_path(
        &self,
        start_pos: &[f32; 3],
        end_pos: &[f32; 3],
        path: &[PolyRef],
        max_points: usize,
    ) -> Result<StraightPath> {
        let (first, last) = match (path.first(), path.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(Status::invalid_param()),
        };
        if max_points == 0 {
            return Err(Status::invalid_param());
        }

        let start = self.closest_point_on_poly(first, start_pos)?;
        let end = self.closest_point_on_poly(last, end_pos)?;

        let mut out = StraightPath {
            points: Vec::new(),
            status: Status::success(),
        };

        if !append_point(&mut out, start, StraightPathFlags::START, first, max_points) {
            return Ok(out);
        }

        let mut portal_apex = start;
        let mut portal_left = start;
        let mut portal_right = start;
        let mut apex_index = 0usize;
        let mut left_index = 0usize;
        let mut right_index = 0usize;
        let mut left_ref = PolyRef::NONE;
        let mut right_ref = PolyRef::NONE;

        let mut i = 0usize;
        while i < path.len() {
            // The end position acts as a final degenerate portal so the
            // last corridor leg is funneled like any other.
            let (left, right, entered) = if i + 1 < path.len() {
                let (l, r) = self.get_portal_points(path[i], path[i + 1])?;
                (l, r, path[i + 1])
            } else {
                (end, end, PolyRef::NONE)
            };

            // Tighten the right side of the funnel.
            if tri_area_2d(&portal_apex, &portal_right, &right) <= 0.0 {
                if v_equal_2d(&portal_apex, &portal_right)
                    || tri_area_2d(&portal_apex, &portal_left, &right) > 0.0
                {
                    portal_right = right;
                    right_ref = entered;
                    right_index = i;
                } else {
                    // Right crossed over left: the left corner becomes a
                    // waypoint and the new apex; restart from it.
                    let flags = if left_ref.is_none() {
                        StraightPathFlags::END
                    } else {
                        StraightPathFlags::PORTAL
                    };
                    if !append_point(&mut out, portal_left, flags, left_ref, max_points) {
                        return Ok(out);
                    }
                    portal_apex = portal_left;
                    portal_right = portal_apex;
                    apex_index = left_index;
                    right_index = apex_index;
                    left_ref = PolyRef::NONE;
                    right_ref = PolyRef::NONE;
                    i = apex_index + 1;
                    continue;
                }
            }

            // Tighten the left side of the funnel.
            if tri_area_2d(&portal_apex, &portal_left, &left) >= 0.0 {
                if v_equal_2d(&portal_apex, &portal_left)
                    || tri_area_2d(&portal_apex, &portal_right, &left) < 0.0
                {
                    portal_left = left;
                    left_ref = entered;
                    left_index = i;
                } else {
                    let flags = if right_ref.is_none() {
                        StraightPathFlags::END
                    } else {
                        StraightPathFlags::PORTAL
                    };
                    if !append_point(&mut out, portal_right, flags, right_ref, max_points) {
                        return Ok(out);
                    }
                    portal_apex = portal_right;
                    portal_left = portal_apex;
                    apex_index = right_index;
                    left_index = apex_index;
                    left_ref = PolyRef::NONE;
                    right_ref = PolyRef::NONE;
                    i = apex_index + 1;
                    continue;
                }
            }

            i += 1;
        }

        append_point(
            &mut out,
            end,
            StraightPathFlags::END,
            PolyRef::NONE,
            max_points,
        );
        Ok(out)
    }

    /// Finds the polygon nearest to `center` within a box of `half_extents`.
    ///
    /// Returns the polygon ref and the closest point on it, or `Ok(None)`
    /// when no polygon passing the filter overlaps the box. Ties keep the
    /// first candidate in tile order.
    pub fn find_nearest_poly(
        &self,
        center: &[f32; 3],
        half_extents: &[f32; 3],
        filter: &QueryFilter,
    ) -> Result<Option<(PolyRef, [f32; 3])>> {
        for (v, h) in center.iter().zip(half_extents) {
            if !v.is_finite() || !h.is_finite() || *h < 0.0 {
                return Err(Status::invalid_param());
            }
        }

        let bmin = [
            center[0] - half_extents[0],
            center[1] - half_extents[1],
            center[2] - half_extents[2],
        ];
        let bmax = [
            center[0] + half_extents[0],
            center[1] + half_extents[1],
            center[2] + half_extents[2],
        ];

        let mut nearest: Option<(PolyRef, [f32; 3])> = None;
        let mut nearest_dist = f32::MAX;

        for reference in self.mesh.query_polygons(&bmin, &bmax, filter) {
            let point = self.closest_point_on_poly(reference, center)?;
            let d = dist_sqr(center, &point);
            if d < nearest_dist {
                nearest_dist = d;
                nearest = Some((reference, point));
            }
        }
        Ok(nearest)
    }

    /// Picks a uniformly distributed random point on the mesh surface.
    ///
    /// `frand` supplies unit random draws in `[0, 1)`. Polygons are chosen
    /// with probability proportional to their surface area, then a point is
    /// sampled inside the chosen polygon. Fails when no polygon passes the
    /// filter.
    pub fn find_random_point<F: FnMut() -> f32>(
        &self,
        filter: &QueryFilter,
        mut frand: F,
    ) -> Result<(PolyRef, [f32; 3])> {
        // Prefix sums of polygon areas over all candidate polygons.
        let mut candidates: Vec<(PolyRef, f32)> = Vec::new();
        let mut total_area = 0.0f32;

        for (slot, tile) in self.mesh.tile_slots() {
            for (poly_index, poly) in tile.polys.iter().enumerate() {
                if !filter.pass_filter(poly) {
                    continue;
                }
                let verts = tile.poly_vertices(poly);
                let area = poly_area_2d(&verts[..poly.vert_count as usize]);
                if area <= 0.0 {
                    continue;
                }
                total_area += area;
                candidates.push((self.mesh.poly_ref_at(slot, poly_index), total_area));
            }
        }

        if candidates.is_empty() {
            return Err(Status::failure());
        }

        let target = frand() * total_area;
        let chosen = candidates.partition_point(|&(_, prefix)| prefix <= target);
        let reference = candidates[chosen.min(candidates.len() - 1)].0;

        let (tile, poly) = self.mesh.get_tile_and_poly(reference)?;
        let verts = tile.poly_vertices(poly);
        let verts = &verts[..poly.vert_count as usize];

        // Pick a fan triangle weighted by area, then a point within it.
        let poly_area = poly_area_2d(verts);
        let mut remaining = frand() * poly_area;
        let mut tri = (verts[0], verts[1], verts[2]);
        for k in 2..verts.len() {
            let area = tri_area_2d(&verts[0], &verts[k - 1], &verts[k]).abs() * 0.5;
            tri = (verts[0], verts[k - 1], verts[k]);
            if remaining < area {
                break;
            }
            remaining -= area;
        }

        let point = random_point_in_triangle(&tri.0, &tri.1, &tri.2, frand(), frand());
        Ok((reference, point))
    }

    /// Closest point on a polygon to a position.
    ///
    /// Positions over the polygon project straight down onto its surface;
    /// positions outside clamp to the nearest boundary edge.
    pub fn closest_point_on_poly(&self, reference: PolyRef, pos: &[f32; 3]) -> Result<[f32; 3]> {
        let (tile, poly) = self.mesh.get_tile_and_poly(reference)?;
        let verts = tile.poly_vertices(poly);
        let verts = &verts[..poly.vert_count as usize];

        if point_in_poly_2d(pos, verts) {
            let height = poly_height_at(pos, verts).unwrap_or(pos[1]);
            return Ok([pos[0], height, pos[2]]);
        }

        let mut closest = verts[0];
        let mut closest_dist = f32::MAX;
        for j in 0..verts.len() {
            let candidate =
                closest_point_on_segment(pos, &verts[j], &verts[(j + 1) % verts.len()]);
            let d = dist_sqr(pos, &candidate);
            if d < closest_dist {
                closest_dist = d;
                closest = candidate;
            }
        }
        Ok(closest)
    }

    /// Left and right endpoints of the portal edge from one polygon to an
    /// adjacent one, oriented for travel from `from` to `to`.
    pub fn get_portal_points(&self, from: PolyRef, to: PolyRef) -> Result<([f32; 3], [f32; 3])> {
        let (tile, poly) = self.mesh.get_tile_and_poly(from)?;
        for link in tile.links_of(poly) {
            if link.reference == to {
                let count = poly.vert_count as usize;
                let left = tile.verts[poly.verts[link.edge as usize] as usize];
                let right = tile.verts[poly.verts[(link.edge as usize + 1) % count] as usize];
                return Ok((left, right));
            }
        }
        Err(Status::invalid_param())
    }
}

/// Midpoint of a polygon edge, used as the search node position for the
/// polygon entered through that edge
fn edge_midpoint(tile: &MeshTile, poly: &Poly, edge: u8) -> [f32; 3] {
    let count = poly.vert_count as usize;
    let a = tile.verts[poly.verts[edge as usize] as usize];
    let b = tile.verts[poly.verts[(edge as usize + 1) % count] as usize];
    [
        (a[0] + b[0]) * 0.5,
        (a[1] + b[1]) * 0.5,
        (a[2] + b[2]) * 0.5,
    ]
}

/// Appends a waypoint, merging with the previous one when positions
/// coincide. Returns false when the output is full; the status is then
/// marked `BUFFER_TOO_SMALL`.
fn append_point(
    out: &mut StraightPath,
    pos: [f32; 3],
    flags: StraightPathFlags,
    reference: PolyRef,
    max_points: usize,
) -> bool {
    if let Some(last) = out.points.last_mut() {
        if v_equal_2d(&last.pos, &pos) {
            last.flags = flags;
            last.reference = reference;
            return true;
        }
    }
    if out.points.len() >= max_points {
        out.status = out.status.with_detail(Status::BUFFER_TOO_SMALL);
        return false;
    }
    out.points.push(StraightPathPoint {
        pos,
        flags,
        reference,
    });
    true
}
