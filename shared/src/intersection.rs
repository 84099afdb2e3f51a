use glam::{vec3, Vec3};
use crate::ray::RayBBox;
use crate::TracerConfig;

/// Exact ray-triangle hit on the query segment
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TriangleHit {
    /// Parametric distance along the segment
    pub t: f32,
    /// Weight of the second corner
    pub barycentric_b: f32,
    /// Weight of the third corner
    pub barycentric_c: f32,
}

impl TriangleHit {
    /// Weight of the first corner
    pub fn barycentric_a(&self) -> f32 {
        1.0 - self.barycentric_b - self.barycentric_c
    }
}

/// Segment vs. node box separating-axis test.
///
/// Conservative: may accept near edges and corners, never rejects a box the
/// segment actually crosses.
pub fn overlap_bv_ray(ray: &RayBBox, center: Vec3, extents: Vec3) -> bool {
    let v = ray.v;
    let w = ray.w;
    let h = extents;
    let c = ray.c - center;

    // Coordinate axes
    if c.abs().cmpgt(v + h).any() {
        return false;
    }

    // Segment direction crossed with each coordinate axis
    let swept = vec3(
        c.y * w.z - c.z * w.y,
        c.x * w.z - c.z * w.x,
        c.x * w.y - c.y * w.x,
    )
    .abs();
    let projected = vec3(
        h.y * v.z + h.z * v.y,
        h.x * v.z + h.z * v.x,
        h.x * v.y + h.y * v.x,
    );

    !swept.cmpgt(projected).any()
}

/// Moeller-Trumbore intersection of the segment with triangle `corners`.
///
/// Double-sided. Returns `None` for parallel segments, hits outside the
/// triangle and hits at or behind the segment start. Hits beyond the segment
/// end are returned with `t >= 1.0`; the caller decides whether they count.
pub fn intersect_triangle_ray(ray: &RayBBox, corners: [Vec3; 3]) -> Option<TriangleHit> {
    let [p0, p1, p2] = corners;
    let d = ray.segment();

    let e1 = p1 - p0;
    let e2 = p2 - p0;

    let p = d.cross(e2);
    let det = e1.dot(p);

    // Segment lies in the triangle's plane
    if det > -TracerConfig::FLT_EPSILON && det < TracerConfig::FLT_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let t_vec = ray.start - p0;

    let u = t_vec.dot(p) * inv_det;
    if u < 0.0 || u > 1.0 {
        return None;
    }

    let q = t_vec.cross(e1);
    let v = d.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(q) * inv_det;
    if t <= TracerConfig::FLT_EPSILON {
        return None;
    }

    Some(TriangleHit {
        t,
        barycentric_b: u,
        barycentric_c: v,
    })
}
