#![warn(missing_docs)]

//! Parallel SAH kd-tree acceleration for the lucent ray-tracing kernel.
//!
//! Organises an arbitrary collection of [`Primitive`]s so that a ray can
//! locate its nearest intersecting primitive in expected sub-linear time.
//!
//! # Architecture
//!
//! - [`KdTree`] - the immutable accelerator: a flat array of packed
//!   8-byte nodes plus the refined primitive list
//! - [`KdTreeParams`] - SAH weights and build policy knobs
//! - `build` - recursive surface-area-heuristic construction; large
//!   enough scenes refine, bound and build sub-trees on a rayon pool
//! - `splice` - stitches independently built sub-trees back into one
//!   contiguous node array
//! - `traverse` - stackless-style front-to-back descent with a bounded
//!   to-do stack, shared by nearest-hit and any-hit queries
//!
//! # Example
//!
//! ```ignore
//! use lucent_kernel_accel::{KdTree, KdTreeParams};
//! use lucent_kernel_shapes::{Ray, Sphere, Intersection};
//!
//! let prims = vec![Arc::new(Sphere::new(Point3::origin(), 1.0)) as Arc<dyn Primitive>];
//! let tree = KdTree::build(&prims, &KdTreeParams::default())?;
//!
//! let mut ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vec3::x());
//! let mut isect = Intersection::default();
//! if tree.intersect(&mut ray, &mut isect) {
//!     println!("hit at t = {}", isect.t);
//! }
//! ```
//!
//! [`Primitive`]: lucent_kernel_shapes::Primitive

/// Construction tracing - only prints when the debug-kdtree feature is
/// enabled.
#[allow(unused_macros)]
#[cfg(feature = "debug-kdtree")]
macro_rules! debug_kd {
    ($($arg:tt)*) => {
        eprintln!($($arg)*)
    };
}

/// No-op version when the debug-kdtree feature is disabled.
#[allow(unused_macros)]
#[cfg(not(feature = "debug-kdtree"))]
macro_rules! debug_kd {
    ($($arg:tt)*) => {};
}

mod build;
mod error;
mod node;
mod params;
mod refine;
mod splice;
mod task;
mod traverse;
mod tree;

pub use error::BuildError;
pub use node::{KdNode, LeafIds};
pub use params::KdTreeParams;
pub use tree::{BuildStats, KdTree};
