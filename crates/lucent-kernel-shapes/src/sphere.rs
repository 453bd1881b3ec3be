//! Ray-sphere intersection (quadratic equation).

use std::sync::Arc;

use lucent_kernel_math::{Bounds3, Dir3, Point3, Vec3};

use crate::{Intersection, Primitive, Ray, ShapeError};

/// A sphere defined by center and radius.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    /// Center of the sphere.
    pub center: Point3,
    /// Radius of the sphere.
    pub radius: f32,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: Point3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// The closest hit parameter in `(0, max_t]`, if any.
    fn closest_hit(&self, ray: &Ray) -> Option<f32> {
        let oc = ray.origin - self.center;
        let d = &ray.direction;

        // Quadratic: |oc + t*d|^2 = r^2
        let a = d.dot(d);
        let b = 2.0 * oc.dot(d);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);

        for t in [t1, t2] {
            if t > 0.0 && t <= ray.max_t {
                return Some(t);
            }
        }
        None
    }
}

impl Primitive for Sphere {
    fn world_bound(&self) -> Bounds3 {
        let r = Vec3::new(self.radius, self.radius, self.radius);
        Bounds3::new(self.center - r, self.center + r)
    }

    fn intersect(&self, ray: &mut Ray, isect: &mut Intersection) -> bool {
        let Some(t) = self.closest_hit(ray) else {
            return false;
        };
        let point = ray.at(t);
        ray.max_t = t;
        isect.t = t;
        isect.point = point;
        isect.normal = Dir3::new_normalize(point - self.center);
        true
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.closest_hit(ray).is_some()
    }

    fn fully_refine(&self, sink: &mut Vec<Arc<dyn Primitive>>) -> Result<(), ShapeError> {
        sink.push(Arc::new(*self));
        Ok(())
    }
}
