use glam::Vec3;
use crate::TracerConfig;

/// Query segment in midpoint/half-vector form for the separating-axis tests
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayBBox {
    pub start: Vec3,
    pub end: Vec3,
    /// Segment midpoint
    pub c: Vec3,
    /// Half vector `end - c`
    pub w: Vec3,
    /// `|w|` per component
    pub v: Vec3,
}

impl RayBBox {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        let c = (start + end) * 0.5;
        let w = end - c;
        Self {
            start,
            end,
            c,
            w,
            v: w.abs(),
        }
    }

    /// Full segment vector `end - start`
    pub fn segment(&self) -> Vec3 {
        self.end - self.start
    }
}

/// A ray rescaled so that parametric distances run over `[0, 1]`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SegmentQuery {
    pub ray: RayBBox,
    /// `tmin / tmax` of the original ray
    pub tmin: f32,
}

impl SegmentQuery {
    /// Build the segment `origin -> origin + direction * tmax`.
    ///
    /// Returns `None` when `tmax` is not positive (or NaN): such queries never hit.
    /// `direction` must not be the zero vector.
    pub fn new(origin: Vec3, tmin: f32, direction: Vec3, tmax: f32) -> Option<Self> {
        if tmax.is_nan() || tmax <= 0.0 {
            return None;
        }

        Some(Self {
            ray: RayBBox::new(origin, origin + direction * tmax),
            tmin: tmin / tmax,
        })
    }

    /// Whether a triangle hit at parametric distance `t` counts for this query
    pub fn accepts(&self, t: f32) -> bool {
        t >= self.tmin && t < TracerConfig::MISS_T
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    #[test]
    fn test_ray_bbox_fields() {
        let ray = RayBBox::new(vec3(1.0, 2.0, 3.0), vec3(3.0, -2.0, 3.0));

        assert_eq!(ray.c, vec3(2.0, 0.0, 3.0));
        assert_eq!(ray.w, vec3(1.0, -2.0, 0.0));
        assert_eq!(ray.v, vec3(1.0, 2.0, 0.0));
        assert_eq!(ray.segment(), vec3(2.0, -4.0, 0.0));
    }

    #[test]
    fn test_segment_scales_by_tmax() {
        let query = SegmentQuery::new(Vec3::ZERO, 1.0, vec3(0.0, 0.0, -1.0), 4.0).unwrap();

        assert_eq!(query.ray.start, Vec3::ZERO);
        assert_eq!(query.ray.end, vec3(0.0, 0.0, -4.0));
        assert_eq!(query.tmin, 0.25);
    }

    #[test]
    fn test_non_positive_tmax_is_rejected() {
        let dir = vec3(1.0, 0.0, 0.0);
        assert!(SegmentQuery::new(Vec3::ZERO, 0.0, dir, 0.0).is_none());
        assert!(SegmentQuery::new(Vec3::ZERO, 0.0, dir, -3.0).is_none());
        assert!(SegmentQuery::new(Vec3::ZERO, 0.0, dir, f32::NAN).is_none());
    }

    #[test]
    fn test_accept_range_is_half_open() {
        let query = SegmentQuery::new(Vec3::ZERO, 2.0, vec3(1.0, 0.0, 0.0), 10.0).unwrap();

        assert!(!query.accepts(0.1));
        assert!(query.accepts(0.2));
        assert!(query.accepts(0.999));
        assert!(!query.accepts(1.0));
        assert!(!query.accepts(1.5));
    }

    #[test]
    fn test_zero_direction_is_a_caller_precondition() {
        // A zero direction yields a zero-length segment; the query is still
        // constructed and any result from it is meaningless.
        let query = SegmentQuery::new(vec3(1.0, 1.0, 1.0), 0.0, Vec3::ZERO, 1.0).unwrap();
        assert_eq!(query.ray.segment(), Vec3::ZERO);
    }
}
