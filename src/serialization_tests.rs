//! Scenario tests for binary persistence and mesh replacement.

use crate::io;
use crate::query::NavMeshQuery;
use crate::test_mesh_helpers::{basic_params, two_square_mesh};
use crate::{NavMesh, PolyFlags, QueryFilter, Status, TileParams};

const EXTENTS: [f32; 3] = [0.5, 0.5, 0.5];

fn multi_tile_mesh() -> NavMesh {
    let mut mesh = NavMesh::new(basic_params()).unwrap();
    for (x, y) in [(0, 0), (1, 0), (0, 1)] {
        let ox = x as f32;
        let oz = y as f32;
        mesh.add_tile(TileParams {
            x,
            y,
            verts: vec![
                ox,
                0.0,
                oz,
                ox,
                0.0,
                oz + 1.0,
                ox + 1.0,
                0.0,
                oz + 1.0,
                ox + 1.0,
                0.0,
                oz,
            ],
            polys: vec![crate::PolyParams {
                verts: vec![0, 1, 2, 3],
                neighbors: vec![crate::NO_NEIGHBOR; 4],
                flags: PolyFlags::WALK,
                area: crate::AREA_GROUND,
            }],
        })
        .unwrap();
    }
    mesh
}

#[test]
fn test_round_trip_preserves_tables() {
    let mesh = two_square_mesh();
    let decoded = io::decode(&io::encode(&mesh)).unwrap();

    assert_eq!(decoded.tile_count(), mesh.tile_count());
    assert_eq!(decoded.params(), mesh.params());

    for (original, restored) in mesh.tiles().zip(decoded.tiles()) {
        assert_eq!(original.x, restored.x);
        assert_eq!(original.y, restored.y);
        assert_eq!(original.verts, restored.verts);
        assert_eq!(original.bmin, restored.bmin);
        assert_eq!(original.bmax, restored.bmax);
        assert_eq!(original.polys.len(), restored.polys.len());
        for (p, q) in original.polys.iter().zip(&restored.polys) {
            assert_eq!(p.verts, q.verts);
            assert_eq!(p.neighbors, q.neighbors);
            assert_eq!(p.vert_count, q.vert_count);
            assert_eq!(p.area, q.area);
            assert_eq!(p.flags, q.flags);
        }
    }
}

#[test]
fn test_round_trip_preserves_connectivity() {
    let mesh = two_square_mesh();
    let decoded = io::decode(&io::encode(&mesh)).unwrap();

    // The decoded mesh answers the same path query; links were rebuilt.
    let start_pos = [0.5, 0.0, 0.5];
    let end_pos = [1.5, 0.0, 0.5];
    let filter = QueryFilter::new();

    let mut query = NavMeshQuery::new(&decoded);
    let start = query
        .find_nearest_poly(&start_pos, &EXTENTS, &filter)
        .unwrap()
        .unwrap()
        .0;
    let end = query
        .find_nearest_poly(&end_pos, &EXTENTS, &filter)
        .unwrap()
        .unwrap()
        .0;
    let path = query
        .find_path(start, end, &start_pos, &end_pos, &filter, 16)
        .unwrap();
    assert_eq!(path.polys.len(), 2);
    assert!(!path.is_partial());
}

#[test]
fn test_round_trip_multi_tile() {
    let mesh = multi_tile_mesh();
    let decoded = io::decode(&io::encode(&mesh)).unwrap();
    assert_eq!(decoded.tile_count(), 3);

    // Cross-tile stitching is rebuilt on decode.
    let filter = QueryFilter::new();
    let mut query = NavMeshQuery::new(&decoded);
    let start_pos = [0.5, 0.0, 0.5];
    let end_pos = [1.5, 0.0, 0.5];
    let start = query
        .find_nearest_poly(&start_pos, &EXTENTS, &filter)
        .unwrap()
        .unwrap()
        .0;
    let end = query
        .find_nearest_poly(&end_pos, &EXTENTS, &filter)
        .unwrap()
        .unwrap()
        .0;
    let path = query
        .find_path(start, end, &start_pos, &end_pos, &filter, 16)
        .unwrap();
    assert_eq!(path.polys.len(), 2);
}

#[test]
fn test_corrupted_magic_leaves_existing_mesh_untouched() {
    let mesh = two_square_mesh();
    let reference = NavMeshQuery::new(&mesh)
        .find_nearest_poly(&[0.5, 0.0, 0.5], &EXTENTS, &QueryFilter::new())
        .unwrap()
        .unwrap()
        .0;

    let mut data = io::encode(&mesh);
    data[0] ^= 0xff;
    let err = io::decode(&data).unwrap_err();
    assert!(err.has_detail(Status::WRONG_MAGIC));
    assert!(err.has_detail(Status::INVALID_PARAM));

    // The failed decode produced nothing to install; the live mesh and its
    // refs are untouched.
    assert!(mesh.is_valid_poly_ref(reference));
    assert_eq!(mesh.tile_count(), 1);
}

#[test]
fn test_truncated_data_is_rejected() {
    let mesh = two_square_mesh();
    let data = io::encode(&mesh);
    let err = io::decode(&data[..data.len() / 2]).unwrap_err();
    assert!(err.has_detail(Status::INVALID_PARAM));
}

#[test]
fn test_replace_with_decoded_mesh_invalidates_old_refs() {
    let mut mesh = two_square_mesh();
    let old_ref = NavMeshQuery::new(&mesh)
        .find_nearest_poly(&[0.5, 0.0, 0.5], &EXTENTS, &QueryFilter::new())
        .unwrap()
        .unwrap()
        .0;

    let decoded = io::decode(&io::encode(&mesh)).unwrap();
    mesh.replace(decoded);

    assert!(!mesh.is_valid_poly_ref(old_ref));

    // Fresh resolution against the replaced mesh works end to end.
    let mut query = NavMeshQuery::new(&mesh);
    let filter = QueryFilter::new();
    let start = query
        .find_nearest_poly(&[0.5, 0.0, 0.5], &EXTENTS, &filter)
        .unwrap()
        .unwrap()
        .0;
    let end = query
        .find_nearest_poly(&[1.5, 0.0, 0.5], &EXTENTS, &filter)
        .unwrap()
        .unwrap()
        .0;
    let path = query
        .find_path(start, end, &[0.5, 0.0, 0.5], &[1.5, 0.0, 0.5], &filter, 16)
        .unwrap();
    assert_eq!(path.polys, vec![start, end]);
}
