//! The primitive trait consumed by the acceleration structure.

use std::sync::Arc;

use lucent_kernel_math::Bounds3;
use thiserror::Error;

use crate::{Intersection, Ray};

/// Errors that can occur while preparing shapes for tracing.
#[derive(Error, Debug)]
pub enum ShapeError {
    /// A triangle references a vertex outside the mesh's vertex buffer.
    #[error("triangle {triangle} references vertex {index} but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        /// Index of the offending triangle.
        triangle: usize,
        /// The out-of-range vertex index.
        index: u32,
        /// Number of vertices actually present.
        vertex_count: usize,
    },

    /// The index buffer length is not a multiple of three.
    #[error("mesh index buffer length {0} is not a multiple of 3")]
    RaggedIndexBuffer(usize),
}

/// A traceable object.
///
/// Implementations fall into two groups: shapes that can be intersected
/// directly (spheres, individual triangles), and containers that
/// [`fully_refine`](Primitive::fully_refine) into such shapes (meshes).
/// Both groups must report a conservative world-space bound.
pub trait Primitive: Send + Sync {
    /// Conservative axis-aligned bound of the primitive in world space.
    fn world_bound(&self) -> Bounds3;

    /// Find the closest intersection in `(0, ray.max_t]`.
    ///
    /// On a hit the implementation MUST set `ray.max_t` to the hit
    /// parameter and fill `isect` before returning `true`. Leaving
    /// `max_t` untouched breaks the pruning the traversal relies on.
    fn intersect(&self, ray: &mut Ray, isect: &mut Intersection) -> bool;

    /// Predicate form: does any intersection exist in `(0, ray.max_t]`?
    fn intersect_p(&self, ray: &Ray) -> bool;

    /// Append directly intersectable primitives equivalent to `self`.
    ///
    /// Shapes that are already intersectable push a handle to
    /// themselves; containers push one handle per constituent shape.
    fn fully_refine(&self, sink: &mut Vec<Arc<dyn Primitive>>) -> Result<(), ShapeError>;
}
