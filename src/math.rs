//! Geometry helpers shared by the spatial queries.
//!
//! Positions on the wire and in tile storage are `[f32; 3]` triples; these
//! helpers convert through [`glam::Vec3`] where the arithmetic benefits.

use glam::Vec3;

/// Converts an `[f32; 3]` triple to a [`Vec3`]
#[inline]
pub(crate) fn vec3(v: &[f32; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

/// Euclidean distance between two points
#[inline]
pub(crate) fn dist(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    vec3(a).distance(vec3(b))
}

/// Squared Euclidean distance between two points
#[inline]
pub(crate) fn dist_sqr(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    vec3(a).distance_squared(vec3(b))
}

/// Signed area of a triangle projected onto the xz plane.
///
/// The sign follows the portal orientation convention used by the funnel:
/// positive when `c` lies to the left of the directed segment `a -> b`.
#[inline]
pub(crate) fn tri_area_2d(a: &[f32; 3], b: &[f32; 3], c: &[f32; 3]) -> f32 {
    let abx = b[0] - a[0];
    let abz = b[2] - a[2];
    let acx = c[0] - a[0];
    let acz = c[2] - a[2];
    acx * abz - abx * acz
}

/// Checks if two positions are approximately equal in the xz plane
#[inline]
pub(crate) fn v_equal_2d(a: &[f32; 3], b: &[f32; 3]) -> bool {
    let dx = a[0] - b[0];
    let dz = a[2] - b[2];
    dx * dx + dz * dz < 1e-5
}

/// Closest point to `pos` on the segment `a -> b`
pub(crate) fn closest_point_on_segment(pos: &[f32; 3], a: &[f32; 3], b: &[f32; 3]) -> [f32; 3] {
    let ab = vec3(b) - vec3(a);
    let len_sqr = ab.length_squared();
    if len_sqr < 1e-12 {
        return *a;
    }
    let t = ((vec3(pos) - vec3(a)).dot(ab) / len_sqr).clamp(0.0, 1.0);
    let p = vec3(a) + ab * t;
    [p.x, p.y, p.z]
}

/// Even-odd point-in-polygon test in the xz plane.
///
/// Points exactly on the boundary may report either side; callers that need
/// an on-boundary answer clamp to the edges instead.
pub(crate) fn point_in_poly_2d(pos: &[f32; 3], verts: &[[f32; 3]]) -> bool {
    let mut inside = false;
    let px = pos[0];
    let pz = pos[2];

    let mut j = verts.len() - 1;
    for i in 0..verts.len() {
        let vi = &verts[i];
        let vj = &verts[j];
        if ((vi[2] > pz) != (vj[2] > pz))
            && (px < (vj[0] - vi[0]) * (pz - vi[2]) / (vj[2] - vi[2]) + vi[0])
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Unsigned area of a convex polygon projected onto the xz plane,
/// accumulated over the fan triangulation from the first vertex.
pub(crate) fn poly_area_2d(verts: &[[f32; 3]]) -> f32 {
    let mut area = 0.0;
    for i in 2..verts.len() {
        area += tri_area_2d(&verts[0], &verts[i - 1], &verts[i]).abs();
    }
    area * 0.5
}

/// Height of the polygon surface under `pos`, interpolated over the fan
/// triangulation. Returns `None` when `pos` is outside every fan triangle
/// in the xz plane.
pub(crate) fn poly_height_at(pos: &[f32; 3], verts: &[[f32; 3]]) -> Option<f32> {
    for i in 2..verts.len() {
        if let Some(h) = tri_height_at(pos, &verts[0], &verts[i - 1], &verts[i]) {
            return Some(h);
        }
    }
    None
}

/// Barycentric height lookup for a single triangle; `None` when `pos` falls
/// outside the triangle in the xz plane.
fn tri_height_at(pos: &[f32; 3], a: &[f32; 3], b: &[f32; 3], c: &[f32; 3]) -> Option<f32> {
    const EPS: f32 = 1e-4;

    let v0 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let v1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v2 = [pos[0] - a[0], pos[1] - a[1], pos[2] - a[2]];

    let denom = v0[0] * v1[2] - v0[2] * v1[0];
    if denom.abs() < EPS {
        return None;
    }

    let mut u = (v1[2] * v2[0] - v1[0] * v2[2]) / denom;
    let mut v = (v0[0] * v2[2] - v0[2] * v2[0]) / denom;
    if u.abs() < EPS {
        u = 0.0;
    }
    if v.abs() < EPS {
        v = 0.0;
    }
    if u >= 0.0 && v >= 0.0 && u + v <= 1.0 + EPS {
        return Some(a[1] + v0[1] * u + v1[1] * v);
    }
    None
}

/// Uniform random point in a triangle from two unit random draws, via the
/// square-root barycentric transform.
pub(crate) fn random_point_in_triangle(
    a: &[f32; 3],
    b: &[f32; 3],
    c: &[f32; 3],
    r1: f32,
    r2: f32,
) -> [f32; 3] {
    let sqrt_r1 = r1.sqrt();
    let u = 1.0 - sqrt_r1;
    let v = r2 * sqrt_r1;
    let w = 1.0 - u - v;
    [
        a[0] * u + b[0] * v + c[0] * w,
        a[1] * u + b[1] * v + c[1] * w,
        a[2] * u + b[2] * v + c[2] * w,
    ]
}

/// Checks if two axis-aligned boxes overlap
#[inline]
pub(crate) fn overlap_bounds(
    amin: &[f32; 3],
    amax: &[f32; 3],
    bmin: &[f32; 3],
    bmax: &[f32; 3],
) -> bool {
    amin[0] <= bmax[0]
        && amax[0] >= bmin[0]
        && amin[1] <= bmax[1]
        && amax[1] >= bmin[1]
        && amin[2] <= bmax[2]
        && amax[2] >= bmin[2]
}
