//! Construction parameters for the kd-tree builder.

use crate::BuildError;

/// Tuning knobs for [`KdTree::build`].
///
/// The defaults reproduce the classic SAH weighting: an intersection is
/// taken to cost 80x a traversal step, a split leaving one side empty
/// earns a 50% discount, and leaves hold a single primitive unless the
/// heuristic refuses to split further.
///
/// [`KdTree::build`]: crate::KdTree::build
#[derive(Debug, Clone)]
pub struct KdTreeParams {
    /// Estimated cost of one ray-primitive intersection test.
    pub intersect_cost: f32,
    /// Estimated cost of one interior-node traversal step.
    pub traversal_cost: f32,
    /// SAH discount in `[0, 1]` applied when one child is empty.
    pub empty_bonus: f32,
    /// Primitive count at or below which a leaf is always formed.
    pub max_prims: usize,
    /// Maximum recursion depth; `None` selects
    /// `round(8 + 1.3 * log2(n))` from the refined primitive count.
    pub max_depth: Option<usize>,
    /// Enables parallel refinement, parallel bounds computation and
    /// sub-tree task spawning.
    pub parallel_entry: bool,
    /// Upper bound on the primitive count of a sub-problem offloaded as
    /// a sub-tree task; `None` selects `max(1024, n / workers / 64)`.
    pub parallel_worksize: Option<usize>,
    /// Whether sub-tree tasks inherit the spawn site's running count of
    /// cost-increasing splits, or restart it at zero.
    pub inherit_bad_refines: bool,
}

impl Default for KdTreeParams {
    fn default() -> Self {
        Self {
            intersect_cost: 80.0,
            traversal_cost: 1.0,
            empty_bonus: 0.5,
            max_prims: 1,
            max_depth: None,
            parallel_entry: true,
            parallel_worksize: None,
            inherit_bad_refines: true,
        }
    }
}

impl KdTreeParams {
    /// Check that every parameter is inside its valid range.
    pub fn validate(&self) -> Result<(), BuildError> {
        if !self.intersect_cost.is_finite() || self.intersect_cost <= 0.0 {
            return Err(BuildError::InvalidParameter {
                name: "intersect_cost",
                reason: format!("must be finite and positive, got {}", self.intersect_cost),
            });
        }
        if !self.traversal_cost.is_finite() || self.traversal_cost <= 0.0 {
            return Err(BuildError::InvalidParameter {
                name: "traversal_cost",
                reason: format!("must be finite and positive, got {}", self.traversal_cost),
            });
        }
        if !(0.0..=1.0).contains(&self.empty_bonus) {
            return Err(BuildError::InvalidParameter {
                name: "empty_bonus",
                reason: format!("must lie in [0, 1], got {}", self.empty_bonus),
            });
        }
        if self.max_prims == 0 {
            return Err(BuildError::InvalidParameter {
                name: "max_prims",
                reason: "must be at least 1".into(),
            });
        }
        // The traversal's deferred-child stack has a fixed capacity;
        // deeper trees could overflow it
        if let Some(depth) = self.max_depth {
            if depth > crate::traverse::MAX_TODO {
                return Err(BuildError::InvalidParameter {
                    name: "max_depth",
                    reason: format!("must not exceed {}", crate::traverse::MAX_TODO),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(KdTreeParams::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_max_prims() {
        let params = KdTreeParams {
            max_prims: 0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(BuildError::InvalidParameter { name: "max_prims", .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_empty_bonus() {
        let params = KdTreeParams {
            empty_bonus: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_depth_beyond_traversal_stack() {
        let params = KdTreeParams {
            max_depth: Some(65),
            ..Default::default()
        };
        assert!(params.validate().is_err());
        let params = KdTreeParams {
            max_depth: Some(64),
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }
}
