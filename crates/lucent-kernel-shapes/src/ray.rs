//! Ray representation and the slab test against bounding boxes.

use lucent_kernel_math::{Bounds3, Dir3, Point3, Vec3};

/// A ray in 3D space defined by origin, direction and a hit horizon.
///
/// `direction` is not required to be normalized; all `t` parameters are
/// expressed in units of `direction`'s length. `max_t` starts at
/// infinity and is tightened by every successful [`Primitive`]
/// intersection, which is what lets an ordered tree traversal stop
/// early.
///
/// [`Primitive`]: crate::Primitive
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Direction of the ray.
    pub direction: Vec3,
    /// Current hit horizon: intersections beyond this parameter are ignored.
    pub max_t: f32,
}

impl Ray {
    /// Create a new ray with an unbounded hit horizon.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            max_t: f32::INFINITY,
        }
    }

    /// Create a new ray with an explicit hit horizon.
    pub fn with_max_t(origin: Point3, direction: Vec3, max_t: f32) -> Self {
        Self {
            origin,
            direction,
            max_t,
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Point3 {
        self.origin + t * self.direction
    }

    /// Parametric clip of the ray against a bounding box (slab method).
    ///
    /// Returns `Some((t_min, t_max))` with the entry and exit parameters
    /// of the overlap of `[0, self.max_t]` and the box interior, or
    /// `None` when the ray misses the box entirely. Axis-aligned rays
    /// (zero direction components) are handled through the usual
    /// infinite-slab arithmetic.
    #[inline]
    pub fn intersect_bounds(&self, bounds: &Bounds3) -> Option<(f32, f32)> {
        let mut t0 = 0.0_f32;
        let mut t1 = self.max_t;
        for axis in 0..3 {
            let inv = 1.0 / self.direction[axis];
            let mut t_near = (bounds.min[axis] - self.origin[axis]) * inv;
            let mut t_far = (bounds.max[axis] - self.origin[axis]) * inv;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            // NaN-tolerant comparisons keep rays that graze a slab alive
            if t_near > t0 {
                t0 = t_near;
            }
            if t_far < t1 {
                t1 = t_far;
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }
}

/// Geometric detail of a ray-primitive intersection.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    /// Parameter along the ray where the hit occurs.
    pub t: f32,
    /// 3D hit point.
    pub point: Point3,
    /// Outward surface normal at the hit point.
    pub normal: Dir3,
}

impl Default for Intersection {
    fn default() -> Self {
        Self {
            t: f32::INFINITY,
            point: Point3::origin(),
            normal: Dir3::new_unchecked(Vec3::z()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0));
        let p = ray.at(1.5);
        assert!((p.x - 1.0).abs() < 1e-6);
        assert!((p.y - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_hit() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let b = Bounds3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let (t0, t1) = ray.intersect_bounds(&b).unwrap();
        assert!((t0 - 5.0).abs() < 1e-5);
        assert!((t1 - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_bounds_miss() {
        let ray = Ray::new(Point3::new(-5.0, 5.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let b = Bounds3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(ray.intersect_bounds(&b).is_none());
    }

    #[test]
    fn test_bounds_origin_inside() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(0.0, 0.0, 1.0));
        let b = Bounds3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let (t0, t1) = ray.intersect_bounds(&b).unwrap();
        assert!(t0 >= 0.0);
        assert!((t1 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_behind_ray() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        let b = Bounds3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(ray.intersect_bounds(&b).is_none());
    }

    #[test]
    fn test_bounds_respects_max_t() {
        let ray = Ray::with_max_t(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0), 2.0);
        let b = Bounds3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        // Box entry at t=5 lies beyond the horizon
        assert!(ray.intersect_bounds(&b).is_none());
    }

    #[test]
    fn test_bounds_axis_aligned_ray() {
        // Zero direction components exercise the infinite-slab path
        let ray = Ray::new(Point3::new(0.5, 0.5, -3.0), Vec3::new(0.0, 0.0, 1.0));
        let b = Bounds3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let (t0, t1) = ray.intersect_bounds(&b).unwrap();
        assert!((t0 - 3.0).abs() < 1e-6);
        assert!((t1 - 4.0).abs() < 1e-6);
    }
}
