//! Per-tile bounding-volume tree for polygon box queries.
//!
//! The tree is a flat array of nodes in depth-first order. Node bounds are
//! quantized to `u16` against the tile bounds, which keeps the node small and
//! lets queries compare integer boxes. A leaf stores the polygon index in
//! `i`; an internal node stores the negated escape index (the number of nodes
//! to skip when the query box misses its bounds).

/// Node of a flat, quantized bounding-volume tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvNode {
    /// Quantized minimum bounds
    pub bmin: [u16; 3],
    /// Quantized maximum bounds
    pub bmax: [u16; 3],
    /// Polygon index when >= 0; negated escape index when < 0
    pub i: i32,
}

/// Quantized BV tree over one tile's polygons.
#[derive(Debug, Clone, Default)]
pub struct BvTree {
    nodes: Vec<BvNode>,
    /// World units per quantized unit, inverted (65535 / longest extent)
    quant_factor: f32,
}

struct BuildItem {
    poly: i32,
    bmin: [u16; 3],
    bmax: [u16; 3],
}

impl BvTree {
    /// Builds a tree over per-polygon world-space bounds.
    ///
    /// `tile_bmin`/`tile_bmax` are the tile bounds the node boxes quantize
    /// against; `poly_bounds` holds one (bmin, bmax) pair per polygon, in
    /// polygon-table order.
    pub(crate) fn build(
        tile_bmin: &[f32; 3],
        tile_bmax: &[f32; 3],
        poly_bounds: &[([f32; 3], [f32; 3])],
    ) -> Self {
        let extent = (tile_bmax[0] - tile_bmin[0])
            .max(tile_bmax[1] - tile_bmin[1])
            .max(tile_bmax[2] - tile_bmin[2]);
        let quant_factor = if extent > 0.0 { 65535.0 / extent } else { 0.0 };

        let mut items: Vec<BuildItem> = poly_bounds
            .iter()
            .enumerate()
            .map(|(poly, (bmin, bmax))| BuildItem {
                poly: poly as i32,
                bmin: quantize(bmin, tile_bmin, quant_factor, false),
                bmax: quantize(bmax, tile_bmin, quant_factor, true),
            })
            .collect();

        let mut nodes = Vec::with_capacity(items.len().saturating_mul(2));
        if !items.is_empty() {
            let count = items.len();
            subdivide(&mut items, 0, count, &mut nodes);
        }

        Self {
            nodes,
            quant_factor,
        }
    }

    /// Collects polygon indices whose quantized bounds overlap the box.
    ///
    /// The box is world-space; callers pass the tile minimum so it can be
    /// quantized with the same factor the tree was built with.
    pub(crate) fn query(
        &self,
        tile_bmin: &[f32; 3],
        bmin: &[f32; 3],
        bmax: &[f32; 3],
        out: &mut Vec<usize>,
    ) {
        if self.nodes.is_empty() {
            return;
        }

        let qmin = quantize(bmin, tile_bmin, self.quant_factor, false);
        let qmax = quantize(bmax, tile_bmin, self.quant_factor, true);

        let mut i = 0;
        while i < self.nodes.len() {
            let node = &self.nodes[i];
            let overlap = overlap_quant(&qmin, &qmax, &node.bmin, &node.bmax);
            let is_leaf = node.i >= 0;

            if is_leaf && overlap {
                out.push(node.i as usize);
            }

            if overlap || is_leaf {
                i += 1;
            } else {
                i += (-node.i) as usize;
            }
        }
    }

    /// Number of nodes in the tree
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn quantize(v: &[f32; 3], origin: &[f32; 3], factor: f32, round_up: bool) -> [u16; 3] {
    let mut out = [0u16; 3];
    for axis in 0..3 {
        let q = (v[axis] - origin[axis]) * factor;
        let q = if round_up { q.ceil() } else { q.floor() };
        out[axis] = q.clamp(0.0, 65535.0) as u16;
    }
    out
}

fn overlap_quant(amin: &[u16; 3], amax: &[u16; 3], bmin: &[u16; 3], bmax: &[u16; 3]) -> bool {
    amin[0] <= bmax[0]
        && amax[0] >= bmin[0]
        && amin[1] <= bmax[1]
        && amax[1] >= bmin[1]
        && amin[2] <= bmax[2]
        && amax[2] >= bmin[2]
}

/// Emits nodes for `items[imin..imax]` in depth-first order.
fn subdivide(items: &mut [BuildItem], imin: usize, imax: usize, nodes: &mut Vec<BvNode>) {
    let count = imax - imin;

    if count == 1 {
        let item = &items[imin];
        nodes.push(BvNode {
            bmin: item.bmin,
            bmax: item.bmax,
            i: item.poly,
        });
        return;
    }

    let (bmin, bmax) = calc_extents(&items[imin..imax]);
    let node_index = nodes.len();
    nodes.push(BvNode { bmin, bmax, i: 0 });

    // Median split along the longest quantized axis.
    let axis = longest_axis(&bmin, &bmax);
    items[imin..imax].sort_by_key(|item| item.bmin[axis]);
    let split = imin + count / 2;

    subdivide(items, imin, split, nodes);
    subdivide(items, split, imax, nodes);

    let escape = (nodes.len() - node_index) as i32;
    nodes[node_index].i = -escape;
}

fn calc_extents(items: &[BuildItem]) -> ([u16; 3], [u16; 3]) {
    let mut bmin = items[0].bmin;
    let mut bmax = items[0].bmax;
    for item in &items[1..] {
        for axis in 0..3 {
            bmin[axis] = bmin[axis].min(item.bmin[axis]);
            bmax[axis] = bmax[axis].max(item.bmax[axis]);
        }
    }
    (bmin, bmax)
}

fn longest_axis(bmin: &[u16; 3], bmax: &[u16; 3]) -> usize {
    let dx = bmax[0] - bmin[0];
    let dy = bmax[1] - bmin[1];
    let dz = bmax[2] - bmin[2];
    if dy > dx && dy >= dz {
        1
    } else if dz > dx {
        2
    } else {
        0
    }
}
