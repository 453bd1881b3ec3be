//! Independent sub-tree construction tasks.
//!
//! A task owns everything it needs: the primitive subset extracted at
//! the spawn site, the bounding box of the sub-region, the remaining
//! depth budget and the spawn site's bad-refine count. It runs a
//! sequential build producing a self-contained node array whose leaves
//! reference *local* primitive ids; the carried `local_to_global` map
//! lets the splice pass translate them back.

use std::sync::Arc;

use lucent_kernel_math::Bounds3;
use lucent_kernel_shapes::Primitive;

use crate::build::{edge_buffers, TreeBuilder};
use crate::node::KdNode;
use crate::tree::BuildStats;
use crate::KdTreeParams;

/// A packaged sub-problem awaiting a worker.
pub(crate) struct SubtreeTask {
    /// The sub-problem's primitives, extracted by value from the flat list.
    pub prims: Vec<Arc<dyn Primitive>>,
    /// `local_to_global[local_id] = global_id` into the flat list.
    pub local_to_global: Vec<u32>,
    /// Bounding box of the sub-region this task covers.
    pub bounds: Bounds3,
    /// Remaining recursion depth budget.
    pub depth: usize,
    /// Bad-refine count at the spawn site.
    pub bad_refines: u32,
    /// Index of the placeholder slot reserved in the parent node array.
    pub origin_node: usize,
}

/// The finished output of a [`SubtreeTask`].
pub(crate) struct SubtreeResult {
    /// Self-contained node array; leaves hold local primitive ids.
    pub nodes: Vec<KdNode>,
    /// The task's own leaf id pool, also in local ids.
    pub leaf_ids: Vec<u32>,
    /// Translation map applied by the splice pass.
    pub local_to_global: Vec<u32>,
    /// Placeholder slot this result replaces.
    pub origin_node: usize,
}

impl SubtreeTask {
    /// Build the sub-tree sequentially. Tasks never spawn further
    /// tasks, so the produced node array is a complete DFS layout.
    pub fn run(self, params: &KdTreeParams) -> (SubtreeResult, BuildStats) {
        let n = self.prims.len();
        let prim_bounds: Vec<Bounds3> = self.prims.iter().map(|p| p.world_bound()).collect();
        let prim_nums: Vec<u32> = (0..n as u32).collect();

        let mut edges = edge_buffers(n);
        let mut prims0 = vec![0_u32; n];
        let mut prims1 = vec![0_u32; (self.depth + 1) * n];

        let bad_refines = if params.inherit_bad_refines {
            self.bad_refines
        } else {
            0
        };

        let mut builder = TreeBuilder::new(params, &prim_bounds, None);
        builder.build_tree(
            0,
            &self.bounds,
            &prim_nums,
            self.depth,
            &mut edges,
            &mut prims0,
            &mut prims1,
            bad_refines,
        );
        let (nodes, leaf_ids, tasks, stats) = builder.finish();
        debug_assert!(tasks.is_empty());

        (
            SubtreeResult {
                nodes,
                leaf_ids,
                local_to_global: self.local_to_global,
                origin_node: self.origin_node,
            },
            stats,
        )
    }
}
