#![warn(missing_docs)]

//! Math types for the lucent ray-tracing kernel.
//!
//! Thin wrappers around nalgebra providing the scalar and vector types
//! shared by the kernel crates, plus the axis-aligned bounding box that
//! carries spatial extent for primitives and tree nodes.
//!
//! The kernel works in single precision throughout: the packed
//! acceleration nodes store an `f32` split plane, and keeping builder
//! and traversal arithmetic in the same width avoids inconsistent
//! classifications at node boundaries.

mod bbox;

pub use bbox::Bounds3;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f32>;

/// A vector in 3D space.
pub type Vec3 = nalgebra::Vector3<f32>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = nalgebra::Unit<nalgebra::Vector3<f32>>;
