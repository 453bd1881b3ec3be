#![warn(missing_docs)]

//! lucent — ray-tracing acceleration in Rust
//!
//! A parallel SAH kd-tree over arbitrary primitives, with ordered
//! front-to-back traversal for nearest-hit and shadow queries.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lucent::{KdTree, KdTreeParams, Intersection, Primitive, Ray, Sphere};
//! use lucent::math::{Point3, Vec3};
//!
//! let prims: Vec<Arc<dyn Primitive>> = vec![
//!     Arc::new(Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0)),
//!     Arc::new(Sphere::new(Point3::new(4.0, 0.0, 0.0), 1.0)),
//! ];
//! let tree = KdTree::build(&prims, &KdTreeParams::default()).unwrap();
//!
//! let mut ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
//! let mut isect = Intersection::default();
//! assert!(tree.intersect(&mut ray, &mut isect));
//! assert!((isect.t - 4.0).abs() < 1e-4);
//! ```

/// Math types: points, vectors, bounding boxes.
pub use lucent_kernel_math as math;
/// Geometric primitives and the ray/intersection types.
pub use lucent_kernel_shapes as shapes;
/// The kd-tree accelerator.
pub use lucent_kernel_accel as accel;

pub use lucent_kernel_accel::{BuildError, BuildStats, KdTree, KdTreeParams};
pub use lucent_kernel_math::Bounds3;
pub use lucent_kernel_shapes::{Intersection, Primitive, Ray, Sphere, Triangle, TriangleMesh};
