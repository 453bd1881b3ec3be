//! Error types for kd-tree construction.

use lucent_kernel_shapes::ShapeError;
use thiserror::Error;

/// Errors that can occur while building a [`KdTree`].
///
/// Only recoverable conditions surface here; structural invariant
/// violations (placeholder bookkeeping, node-emission drift, traversal
/// stack overflow) are programming errors and abort via assertions.
///
/// [`KdTree`]: crate::KdTree
#[derive(Error, Debug)]
pub enum BuildError {
    /// A construction parameter is out of its valid range.
    #[error("invalid build parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A primitive failed to refine into intersectable shapes.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}
