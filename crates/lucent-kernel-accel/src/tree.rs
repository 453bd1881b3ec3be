//! The kd-tree accelerator and its construction pipeline.

use std::sync::Arc;

use lucent_kernel_math::Bounds3;
use lucent_kernel_shapes::{Intersection, Primitive, Ray, ShapeError};
use rayon::prelude::*;

use crate::build::{edge_buffers, SpawnContext, TreeBuilder};
use crate::node::KdNode;
use crate::refine::{compute_bounds, refine_primitives};
use crate::splice::splice;
use crate::task::SubtreeResult;
use crate::{BuildError, KdTreeParams};

/// Counters accumulated during construction.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildStats {
    /// Size of the refined flat primitive list.
    pub n_primitives: usize,
    /// Total nodes in the final array.
    pub n_nodes: usize,
    /// Leaf nodes.
    pub n_leaves: usize,
    /// Interior nodes.
    pub n_interior: usize,
    /// Sub-tree tasks offloaded to workers.
    pub n_subtree_tasks: usize,
}

impl BuildStats {
    /// Fold a sub-tree task's counters into the root build's.
    pub(crate) fn merge(&mut self, other: &BuildStats) {
        self.n_leaves += other.n_leaves;
        self.n_interior += other.n_interior;
        self.n_subtree_tasks += other.n_subtree_tasks;
    }
}

/// SAH kd-tree over a set of primitives.
///
/// Immutable once built: traversal takes `&self` and any number of
/// rays may be traced concurrently. Construction refines the input
/// primitives into a flat list whose indices are the ids stored in
/// leaves, computes per-primitive bounds, and recursively partitions
/// space; with [`parallel_entry`](KdTreeParams::parallel_entry) the
/// refinement and bounds phases fan out across workers and mid-sized
/// sub-problems are built as independent tasks, spliced back into one
/// contiguous node array afterwards.
#[derive(Clone)]
pub struct KdTree {
    primitives: Vec<Arc<dyn Primitive>>,
    nodes: Vec<KdNode>,
    leaf_ids: Vec<u32>,
    bounds: Bounds3,
    stats: BuildStats,
}

impl KdTree {
    /// Build an accelerator over `prims` with the given parameters.
    ///
    /// The input primitives are fully refined first, so containers
    /// (meshes) may be passed directly. Refinement errors and invalid
    /// parameters are returned; on error no accelerator exists.
    pub fn build(prims: &[Arc<dyn Primitive>], params: &KdTreeParams) -> Result<Self, BuildError> {
        params.validate()?;

        // Phase 1: refinement into the flat primitive list
        let primitives = refine_primitives(prims, params.parallel_entry)?;
        let n = primitives.len();

        let max_depth = params
            .max_depth
            .unwrap_or_else(|| (8.0 + 1.3 * (n.max(1) as f32).log2()).round() as usize);

        // Phase 2: per-primitive bounds and the scene bound
        let (prim_bounds, bounds, prim_nums) = compute_bounds(&primitives, params.parallel_entry);

        // Sub-problems below this size are worth offloading; the floor
        // keeps tasks large enough to amortise their overhead.
        let workers = rayon::current_num_threads().max(1);
        let worksize = params
            .parallel_worksize
            .unwrap_or_else(|| (n / workers / 64).max(1024));

        // Phase 3: recursive root build, emitting sub-tree tasks
        let mut edges = edge_buffers(n);
        let mut prims0 = vec![0_u32; n];
        let mut prims1 = vec![0_u32; (max_depth + 1) * n];

        let spawn = params.parallel_entry.then(|| SpawnContext {
            primitives: &primitives,
            worksize,
        });
        let mut builder = TreeBuilder::new(params, &prim_bounds, spawn);
        builder.build_tree(
            0,
            &bounds,
            &prim_nums,
            max_depth,
            &mut edges,
            &mut prims0,
            &mut prims1,
            0,
        );
        let (nodes, leaf_ids, tasks, mut stats) = builder.finish();

        // Phases 4 and 5: parallel sub-tree builds, then the splice
        let (nodes, leaf_ids) = if tasks.is_empty() {
            (nodes, leaf_ids)
        } else {
            let outcomes: Vec<(SubtreeResult, BuildStats)> =
                tasks.into_par_iter().map(|task| task.run(params)).collect();
            let mut results = Vec::with_capacity(outcomes.len());
            for (result, task_stats) in outcomes {
                stats.merge(&task_stats);
                results.push(result);
            }
            splice(nodes, leaf_ids, results)
        };

        stats.n_primitives = n;
        stats.n_nodes = nodes.len();

        Ok(Self {
            primitives,
            nodes,
            leaf_ids,
            bounds,
            stats,
        })
    }

    /// Bounding box of the whole scene.
    pub fn bounds(&self) -> &Bounds3 {
        &self.bounds
    }

    /// The flattened node array, root first.
    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    /// The shared primitive id pool referenced by multi-primitive leaves.
    pub fn leaf_ids(&self) -> &[u32] {
        &self.leaf_ids
    }

    /// The refined flat primitive list; leaf ids index into this.
    pub fn primitives(&self) -> &[Arc<dyn Primitive>] {
        &self.primitives
    }

    /// Construction counters.
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}

impl Primitive for KdTree {
    fn world_bound(&self) -> Bounds3 {
        self.bounds
    }

    fn intersect(&self, ray: &mut Ray, isect: &mut Intersection) -> bool {
        KdTree::intersect(self, ray, isect)
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        KdTree::intersect_p(self, ray)
    }

    /// An accelerator is already intersectable; refining yields itself.
    fn fully_refine(&self, sink: &mut Vec<Arc<dyn Primitive>>) -> Result<(), ShapeError> {
        sink.push(Arc::new(self.clone()));
        Ok(())
    }
}
