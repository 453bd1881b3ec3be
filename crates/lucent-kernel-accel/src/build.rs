//! Recursive SAH kd-tree construction.
//!
//! The builder emits nodes in strict depth-first pre-order into a flat
//! array: the below child of an interior node is always the next slot,
//! the above child's index is patched in once the below sub-tree is
//! complete. When parallel entry is enabled and a sub-problem falls
//! into the spawn window, a placeholder slot is reserved instead and
//! the sub-problem is packaged as a [`SubtreeTask`]; the splice pass
//! later replaces each placeholder with the task's finished sub-tree.

use std::sync::Arc;

use lucent_kernel_math::Bounds3;
use lucent_kernel_shapes::Primitive;

use crate::node::KdNode;
use crate::task::SubtreeTask;
use crate::tree::BuildStats;
use crate::KdTreeParams;

/// Start or end of a primitive's bounding interval along an axis.
/// `Start` must order before `End` so that a primitive whose interval
/// collapses to a point at the split is counted as inside the split
/// region, not straddling it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum EdgeKind {
    /// The primitive's interval begins here.
    #[default]
    Start,
    /// The primitive's interval ends here.
    End,
}

/// One projected bounding-interval endpoint used by the SAH sweep.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BoundEdge {
    pub t: f32,
    pub prim: u32,
    pub kind: EdgeKind,
}

/// Reusable per-axis edge buffers, each sized `2 * n_primitives`.
pub(crate) type EdgeBuffers = [Vec<BoundEdge>; 3];

/// The split selected by the SAH sweep.
pub(crate) struct SplitChoice {
    pub axis: usize,
    /// Index of the winning edge in the sorted buffer for `axis`.
    pub offset: usize,
    pub cost: f32,
}

/// Borrowed context enabling sub-tree task spawning in the root build.
pub(crate) struct SpawnContext<'a> {
    /// The flat refined primitive list; spawn sites extract subsets.
    pub primitives: &'a [Arc<dyn Primitive>],
    /// Sub-problems at least this large stay in the recursive build.
    pub worksize: usize,
}

/// Mutable state of one builder invocation (root build or sub-tree
/// task). Owns the node array and leaf id pool it is producing.
pub(crate) struct TreeBuilder<'a> {
    params: &'a KdTreeParams,
    prim_bounds: &'a [Bounds3],
    spawn: Option<SpawnContext<'a>>,
    nodes: Vec<KdNode>,
    leaf_ids: Vec<u32>,
    next_free_node: usize,
    tasks: Vec<SubtreeTask>,
    stats: BuildStats,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        params: &'a KdTreeParams,
        prim_bounds: &'a [Bounds3],
        spawn: Option<SpawnContext<'a>>,
    ) -> Self {
        Self {
            params,
            prim_bounds,
            spawn,
            nodes: Vec::new(),
            leaf_ids: Vec::new(),
            next_free_node: 0,
            tasks: Vec::new(),
            stats: BuildStats::default(),
        }
    }

    /// Tear down the builder, returning the emitted (partial) node
    /// array, its leaf id pool, the pending sub-tree tasks in spawn
    /// order, and the accumulated counters.
    pub fn finish(mut self) -> (Vec<KdNode>, Vec<u32>, Vec<SubtreeTask>, BuildStats) {
        self.nodes.truncate(self.next_free_node);
        (self.nodes, self.leaf_ids, self.tasks, self.stats)
    }

    /// Claim the next node slot, growing the array if it is full.
    /// Growth doubles the allocation with a floor of 512 slots.
    fn alloc_node(&mut self) {
        if self.next_free_node == self.nodes.len() {
            let n_alloc = (2 * self.nodes.len()).max(512);
            self.nodes.resize(n_alloc, KdNode::default());
        }
        self.next_free_node += 1;
    }

    fn init_leaf(&mut self, node_num: usize, prim_nums: &[u32]) {
        debug_kd!("kd: leaf {} with {} prims", node_num, prim_nums.len());
        self.nodes[node_num] = KdNode::leaf(prim_nums, &mut self.leaf_ids);
        self.stats.n_leaves += 1;
    }

    fn should_spawn(&self, n_child: usize) -> bool {
        match &self.spawn {
            Some(ctx) => n_child > self.params.max_prims && n_child < ctx.worksize,
            None => false,
        }
    }

    /// Reserve a placeholder node slot and package the sub-problem as
    /// an independent task. The extracted primitive subset carries its
    /// ids as the local-to-global map the splice pass will apply.
    fn spawn_subtree(&mut self, ids: &[u32], bounds: Bounds3, depth: usize, bad_refines: u32) {
        let origin_node = self.next_free_node;
        self.alloc_node();

        let ctx = self.spawn.as_ref().expect("spawn outside parallel entry");
        let prims: Vec<Arc<dyn Primitive>> = ids
            .iter()
            .map(|&id| Arc::clone(&ctx.primitives[id as usize]))
            .collect();
        debug_kd!(
            "kd: spawned sub-tree task at node {} over {} prims",
            origin_node,
            ids.len()
        );
        self.tasks.push(SubtreeTask {
            prims,
            local_to_global: ids.to_vec(),
            bounds,
            depth,
            bad_refines,
            origin_node,
        });
        self.stats.n_subtree_tasks += 1;
    }

    /// SAH split selection for one sub-problem.
    ///
    /// Starts on the node's longest axis and sweeps the sorted edge
    /// events, evaluating the split cost at every candidate position
    /// strictly inside the node bound. If an axis yields no candidate
    /// at all the next axis is tried, up to all three; `None` means the
    /// caller must form a leaf.
    fn choose_split(
        &self,
        node_bounds: &Bounds3,
        prim_nums: &[u32],
        edges: &mut EdgeBuffers,
    ) -> Option<SplitChoice> {
        let n = prim_nums.len();
        let total_sa = node_bounds.surface_area();
        let inv_total_sa = 1.0 / total_sa;
        let d = node_bounds.diagonal();

        let mut best: Option<SplitChoice> = None;
        let mut best_cost = f32::INFINITY;
        let mut axis = node_bounds.maximum_extent();

        for _retry in 0..3 {
            let buf = &mut edges[axis];
            for (i, &pn) in prim_nums.iter().enumerate() {
                let b = &self.prim_bounds[pn as usize];
                buf[2 * i] = BoundEdge {
                    t: b.min[axis],
                    prim: pn,
                    kind: EdgeKind::Start,
                };
                buf[2 * i + 1] = BoundEdge {
                    t: b.max[axis],
                    prim: pn,
                    kind: EdgeKind::End,
                };
            }
            buf[..2 * n].sort_unstable_by(|a, b| a.t.total_cmp(&b.t).then(a.kind.cmp(&b.kind)));

            // Sweep left to right tracking the primitive count on each
            // side of the candidate plane. Ends leave the above set
            // before the cost is evaluated; starts join the below set
            // after.
            let mut n_below = 0_usize;
            let mut n_above = n;
            for i in 0..2 * n {
                let edge = buf[i];
                if edge.kind == EdgeKind::End {
                    n_above -= 1;
                }
                if edge.t > node_bounds.min[axis] && edge.t < node_bounds.max[axis] {
                    let other0 = (axis + 1) % 3;
                    let other1 = (axis + 2) % 3;
                    let below_sa = 2.0
                        * (d[other0] * d[other1]
                            + (edge.t - node_bounds.min[axis]) * (d[other0] + d[other1]));
                    let above_sa = 2.0
                        * (d[other0] * d[other1]
                            + (node_bounds.max[axis] - edge.t) * (d[other0] + d[other1]));
                    let p_below = below_sa * inv_total_sa;
                    let p_above = above_sa * inv_total_sa;
                    let bonus = if n_above == 0 || n_below == 0 {
                        self.params.empty_bonus
                    } else {
                        0.0
                    };
                    let cost = self.params.traversal_cost
                        + self.params.intersect_cost
                            * (1.0 - bonus)
                            * (p_below * n_below as f32 + p_above * n_above as f32);
                    // A NaN cost (degenerate zero-area bounds) never
                    // passes this comparison and so never wins
                    if cost < best_cost {
                        best_cost = cost;
                        best = Some(SplitChoice {
                            axis,
                            offset: i,
                            cost,
                        });
                    }
                }
                if edge.kind == EdgeKind::Start {
                    n_below += 1;
                }
            }
            assert!(
                n_below == n && n_above == 0,
                "edge sweep counters out of balance"
            );

            if best.is_some() {
                break;
            }
            axis = (axis + 1) % 3;
        }
        best
    }

    /// Recursively build the sub-tree for `prim_nums` into node slot
    /// `node_num`, which must be the next free slot.
    ///
    /// `prims0` and `prims1` are classification scratch. The below
    /// child's id set is copied out before recursing (it would
    /// otherwise alias `prims0`); the above child's set lives in the
    /// leading `n` entries of `prims1`, with the remainder handed down
    /// as the next recursion level's scratch.
    pub fn build_tree(
        &mut self,
        node_num: usize,
        node_bounds: &Bounds3,
        prim_nums: &[u32],
        depth: usize,
        edges: &mut EdgeBuffers,
        prims0: &mut [u32],
        prims1: &mut [u32],
        mut bad_refines: u32,
    ) {
        assert_eq!(node_num, self.next_free_node, "node emission drift");
        self.alloc_node();

        let n = prim_nums.len();
        if n <= self.params.max_prims || depth == 0 {
            self.init_leaf(node_num, prim_nums);
            return;
        }

        let old_cost = self.params.intersect_cost * n as f32;
        let split = self.choose_split(node_bounds, prim_nums, edges);

        let split = match split {
            Some(s) => {
                if s.cost > old_cost {
                    bad_refines += 1;
                }
                if (s.cost > 4.0 * old_cost && n < 16) || bad_refines == 3 {
                    self.init_leaf(node_num, prim_nums);
                    return;
                }
                s
            }
            None => {
                self.init_leaf(node_num, prim_nums);
                return;
            }
        };

        // Classify primitives against the winning plane; straddlers
        // land in both sets.
        let (above_ids, prims1_rest) = prims1.split_at_mut(n);
        let buf = &edges[split.axis];
        let mut n0 = 0_usize;
        let mut n1 = 0_usize;
        for edge in &buf[..split.offset] {
            if edge.kind == EdgeKind::Start {
                prims0[n0] = edge.prim;
                n0 += 1;
            }
        }
        for edge in &buf[split.offset + 1..2 * n] {
            if edge.kind == EdgeKind::End {
                above_ids[n1] = edge.prim;
                n1 += 1;
            }
        }

        let t_split = buf[split.offset].t;
        debug_kd!(
            "kd: interior {} axis {} at {} ({} below / {} above)",
            node_num,
            split.axis,
            t_split,
            n0,
            n1
        );
        let mut bounds_below = *node_bounds;
        let mut bounds_above = *node_bounds;
        bounds_below.max[split.axis] = t_split;
        bounds_above.min[split.axis] = t_split;

        let below_ids: Vec<u32> = prims0[..n0].to_vec();
        if self.should_spawn(n0) {
            self.spawn_subtree(&below_ids, bounds_below, depth - 1, bad_refines);
        } else {
            self.build_tree(
                node_num + 1,
                &bounds_below,
                &below_ids,
                depth - 1,
                edges,
                prims0,
                prims1_rest,
                bad_refines,
            );
        }

        let above_child = self.next_free_node as u32;
        self.nodes[node_num] = KdNode::interior(split.axis, above_child, t_split);
        self.stats.n_interior += 1;

        if self.should_spawn(n1) {
            let ids: Vec<u32> = above_ids[..n1].to_vec();
            self.spawn_subtree(&ids, bounds_above, depth - 1, bad_refines);
        } else {
            self.build_tree(
                above_child as usize,
                &bounds_above,
                &above_ids[..n1],
                depth - 1,
                edges,
                prims0,
                prims1_rest,
                bad_refines,
            );
        }
    }
}

/// Allocate the edge buffers for a build over `n` primitives.
pub(crate) fn edge_buffers(n: usize) -> EdgeBuffers {
    [
        vec![BoundEdge::default(); 2 * n],
        vec![BoundEdge::default(); 2 * n],
        vec![BoundEdge::default(); 2 * n],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucent_kernel_math::Point3;

    fn params() -> KdTreeParams {
        KdTreeParams {
            parallel_entry: false,
            ..Default::default()
        }
    }

    fn bounds_of(prim_bounds: &[Bounds3]) -> Bounds3 {
        prim_bounds
            .iter()
            .fold(Bounds3::empty(), |acc, b| acc.union(b))
    }

    #[test]
    fn test_choose_split_separated_pair() {
        // Two unit boxes separated along x: the plane must fall on one
        // of the inner edges at x = -4 or x = 4.
        let prim_bounds = vec![
            Bounds3::new(Point3::new(-6.0, -1.0, -1.0), Point3::new(-4.0, 1.0, 1.0)),
            Bounds3::new(Point3::new(4.0, -1.0, -1.0), Point3::new(6.0, 1.0, 1.0)),
        ];
        let p = params();
        let builder = TreeBuilder::new(&p, &prim_bounds, None);
        let mut edges = edge_buffers(2);
        let split = builder
            .choose_split(&bounds_of(&prim_bounds), &[0, 1], &mut edges)
            .unwrap();
        assert_eq!(split.axis, 0);
        let t = edges[0][split.offset].t;
        assert!(t == -4.0 || t == 4.0);
    }

    #[test]
    fn test_choose_split_none_for_coincident_points() {
        // All intervals collapse onto the node boundary on every axis:
        // no strictly interior candidate exists anywhere.
        let b = Bounds3::new(Point3::new(1.0, 2.0, 3.0), Point3::new(1.0, 2.0, 3.0));
        let prim_bounds = vec![b; 4];
        let p = params();
        let builder = TreeBuilder::new(&p, &prim_bounds, None);
        let mut edges = edge_buffers(4);
        assert!(builder
            .choose_split(&bounds_of(&prim_bounds), &[0, 1, 2, 3], &mut edges)
            .is_none());
    }

    #[test]
    fn test_split_cost_recomputes() {
        // Recompute the winning cost from the stored counts: an
        // independent resweep must land on the identical value.
        let prim_bounds = vec![
            Bounds3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0)),
            Bounds3::new(Point3::new(3.0, 0.0, 0.0), Point3::new(5.0, 1.0, 1.0)),
            Bounds3::new(Point3::new(6.0, 0.0, 0.0), Point3::new(9.0, 1.0, 1.0)),
        ];
        let node_bounds = bounds_of(&prim_bounds);
        let p = params();
        let builder = TreeBuilder::new(&p, &prim_bounds, None);
        let mut edges = edge_buffers(3);
        let split = builder
            .choose_split(&node_bounds, &[0, 1, 2], &mut edges)
            .unwrap();

        let buf = &edges[split.axis];
        let mut n_below = 0_usize;
        let mut n_above = 3_usize;
        let mut recomputed = None;
        for (i, edge) in buf[..6].iter().enumerate() {
            if edge.kind == EdgeKind::End {
                n_above -= 1;
            }
            if i == split.offset {
                let d = node_bounds.diagonal();
                let (o0, o1) = ((split.axis + 1) % 3, (split.axis + 2) % 3);
                let below_sa = 2.0
                    * (d[o0] * d[o1] + (edge.t - node_bounds.min[split.axis]) * (d[o0] + d[o1]));
                let above_sa = 2.0
                    * (d[o0] * d[o1] + (node_bounds.max[split.axis] - edge.t) * (d[o0] + d[o1]));
                let inv_sa = 1.0 / node_bounds.surface_area();
                let bonus = if n_above == 0 || n_below == 0 { p.empty_bonus } else { 0.0 };
                recomputed = Some(
                    p.traversal_cost
                        + p.intersect_cost
                            * (1.0 - bonus)
                            * (below_sa * inv_sa * n_below as f32
                                + above_sa * inv_sa * n_above as f32),
                );
            }
            if edge.kind == EdgeKind::Start {
                n_below += 1;
            }
        }
        assert_eq!(recomputed.unwrap(), split.cost);
    }

    #[test]
    fn test_degenerate_axis_still_splits() {
        // Zero x-extent everywhere but a clean separation along y: the
        // chooser must find the y plane even though one axis is flat.
        let prim_bounds = vec![
            Bounds3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.1)),
            Bounds3::new(Point3::new(0.0, 3.0, 0.0), Point3::new(0.0, 4.0, 0.1)),
        ];
        let node_bounds = bounds_of(&prim_bounds);
        let p = params();
        let builder = TreeBuilder::new(&p, &prim_bounds, None);
        let mut edges = edge_buffers(2);
        let split = builder
            .choose_split(&node_bounds, &[0, 1], &mut edges)
            .unwrap();
        assert_eq!(split.axis, 1);
    }
}
