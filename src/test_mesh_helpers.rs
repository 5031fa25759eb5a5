//! Hand-built meshes shared by the scenario tests.
//!
//! All geometry lives on the y = 0 plane with unit squares in the xz plane.
//! Vertex winding is (0,0), (0,1), (1,1), (1,0) in (x, z), matching the
//! portal orientation expected by the funnel.

use crate::nav_mesh::{NavMesh, PolyParams, TileParams};
use crate::{NavMeshParams, PolyFlags, AREA_GROUND, AREA_WATER, NO_NEIGHBOR};

pub(crate) fn basic_params() -> NavMeshParams {
    NavMeshParams {
        origin: [0.0, 0.0, 0.0],
        tile_width: 8.0,
        tile_height: 8.0,
        max_tiles: 8,
        max_polys_per_tile: 64,
    }
}

fn walkable(verts: Vec<u16>, neighbors: Vec<u16>) -> PolyParams {
    PolyParams {
        verts,
        neighbors,
        flags: PolyFlags::WALK,
        area: AREA_GROUND,
    }
}

/// Two unit squares sharing the edge x = 1, in one tile.
///
/// Polygon 0 covers x in [0, 1], polygon 1 covers x in [1, 2].
pub(crate) fn two_square_mesh() -> NavMesh {
    let mut mesh = NavMesh::new(basic_params()).unwrap();
    mesh.add_tile(TileParams {
        x: 0,
        y: 0,
        verts: vec![
            0.0, 0.0, 0.0, // 0
            0.0, 0.0, 1.0, // 1
            1.0, 0.0, 1.0, // 2
            1.0, 0.0, 0.0, // 3
            2.0, 0.0, 1.0, // 4
            2.0, 0.0, 0.0, // 5
        ],
        polys: vec![
            walkable(vec![0, 1, 2, 3], vec![NO_NEIGHBOR, NO_NEIGHBOR, 2, NO_NEIGHBOR]),
            walkable(vec![3, 2, 4, 5], vec![1, NO_NEIGHBOR, NO_NEIGHBOR, NO_NEIGHBOR]),
        ],
    })
    .unwrap();
    mesh
}

/// A straight corridor of `n` unit squares along x, in one tile.
pub(crate) fn corridor_mesh(n: usize) -> NavMesh {
    let mut verts = Vec::new();
    for i in 0..=n {
        verts.extend_from_slice(&[i as f32, 0.0, 0.0]);
        verts.extend_from_slice(&[i as f32, 0.0, 1.0]);
    }

    let mut polys = Vec::new();
    for i in 0..n {
        let base = (2 * i) as u16;
        let left = if i == 0 { NO_NEIGHBOR } else { i as u16 };
        let right = if i + 1 == n {
            NO_NEIGHBOR
        } else {
            i as u16 + 2
        };
        polys.push(walkable(
            vec![base, base + 1, base + 3, base + 2],
            vec![left, NO_NEIGHBOR, right, NO_NEIGHBOR],
        ));
    }

    let mut mesh = NavMesh::new(basic_params()).unwrap();
    mesh.add_tile(TileParams {
        x: 0,
        y: 0,
        verts,
        polys,
    })
    .unwrap();
    mesh
}

/// An L-shaped corridor of three unit squares bending around (1, 1):
/// polygon 0 at (0..1, 0..1), polygon 1 at (1..2, 0..1), polygon 2 at
/// (1..2, 1..2). Any path from polygon 0 deep into polygon 2 must corner
/// at (1, 1).
pub(crate) fn l_corridor_mesh() -> NavMesh {
    let mut mesh = NavMesh::new(basic_params()).unwrap();
    mesh.add_tile(TileParams {
        x: 0,
        y: 0,
        verts: vec![
            0.0, 0.0, 0.0, // 0
            0.0, 0.0, 1.0, // 1
            1.0, 0.0, 1.0, // 2
            1.0, 0.0, 0.0, // 3
            2.0, 0.0, 1.0, // 4
            2.0, 0.0, 0.0, // 5
            1.0, 0.0, 2.0, // 6
            2.0, 0.0, 2.0, // 7
        ],
        polys: vec![
            walkable(vec![0, 1, 2, 3], vec![NO_NEIGHBOR, NO_NEIGHBOR, 2, NO_NEIGHBOR]),
            walkable(vec![3, 2, 4, 5], vec![1, 3, NO_NEIGHBOR, NO_NEIGHBOR]),
            walkable(vec![2, 6, 7, 4], vec![NO_NEIGHBOR, NO_NEIGHBOR, NO_NEIGHBOR, 2]),
        ],
    })
    .unwrap();
    mesh
}

/// One tile with a 1x1 ground polygon next to a 3x1 water polygon, for
/// area-weighted sampling checks. The water polygon has three times the
/// ground polygon's area.
pub(crate) fn ground_and_water_mesh() -> NavMesh {
    let mut mesh = NavMesh::new(basic_params()).unwrap();
    mesh.add_tile(TileParams {
        x: 0,
        y: 0,
        verts: vec![
            0.0, 0.0, 0.0, // 0
            0.0, 0.0, 1.0, // 1
            1.0, 0.0, 1.0, // 2
            1.0, 0.0, 0.0, // 3
            4.0, 0.0, 1.0, // 4
            4.0, 0.0, 0.0, // 5
        ],
        polys: vec![
            walkable(vec![0, 1, 2, 3], vec![NO_NEIGHBOR, NO_NEIGHBOR, 2, NO_NEIGHBOR]),
            PolyParams {
                verts: vec![3, 2, 4, 5],
                neighbors: vec![1, NO_NEIGHBOR, NO_NEIGHBOR, NO_NEIGHBOR],
                flags: PolyFlags::SWIM,
                area: AREA_WATER,
            },
        ],
    })
    .unwrap();
    mesh
}

/// Two disconnected unit squares in one tile, with a gap between them.
pub(crate) fn disconnected_mesh() -> NavMesh {
    let mut mesh = NavMesh::new(basic_params()).unwrap();
    mesh.add_tile(TileParams {
        x: 0,
        y: 0,
        verts: vec![
            0.0, 0.0, 0.0, // 0
            0.0, 0.0, 1.0, // 1
            1.0, 0.0, 1.0, // 2
            1.0, 0.0, 0.0, // 3
            5.0, 0.0, 0.0, // 4
            5.0, 0.0, 1.0, // 5
            6.0, 0.0, 1.0, // 6
            6.0, 0.0, 0.0, // 7
        ],
        polys: vec![
            walkable(vec![0, 1, 2, 3], vec![NO_NEIGHBOR; 4]),
            walkable(vec![4, 5, 6, 7], vec![NO_NEIGHBOR; 4]),
        ],
    })
    .unwrap();
    mesh
}
