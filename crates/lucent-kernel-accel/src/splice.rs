//! Splicing sub-tree task results into the root node array.
//!
//! The root build leaves one placeholder slot per spawned task. This
//! pass treats the partial array and every task output as immutable
//! inputs and produces a fresh contiguous array: partial-array segments
//! and task blocks are interleaved in placeholder order, interior child
//! indices are renumbered into the final coordinate space, and task
//! leaf ids are translated from local to global through each task's
//! map. Leaf id lists are re-appended to a fresh pool as they are
//! copied, so (offset, len) references stay valid in the output.

use crate::node::KdNode;
use crate::task::SubtreeResult;

/// Classification of one slot of the partial array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Leaf,
    Interior,
    /// Placeholder reserved for the task with this index.
    Task(usize),
}

/// Merge the partial root array with the finished sub-trees.
///
/// `results` must be ordered by their placeholder index, which is how
/// the builder emits them. Any bookkeeping violation here means the
/// build itself went wrong, so this pass asserts rather than returns.
pub(crate) fn splice(
    partial: Vec<KdNode>,
    partial_pool: Vec<u32>,
    results: Vec<SubtreeResult>,
) -> (Vec<KdNode>, Vec<u32>) {
    if results.is_empty() {
        return (partial, partial_pool);
    }
    let n = partial.len();

    let mut slots: Vec<Slot> = partial
        .iter()
        .map(|nd| if nd.is_leaf() { Slot::Leaf } else { Slot::Interior })
        .collect();
    let mut prev = None;
    for (k, r) in results.iter().enumerate() {
        assert!(r.origin_node < n, "task placeholder {} out of range", r.origin_node);
        assert_eq!(
            slots[r.origin_node],
            Slot::Leaf,
            "task placeholder {} collides with an emitted node",
            r.origin_node
        );
        assert!(
            prev.map_or(true, |p| p < r.origin_node),
            "task results out of placeholder order"
        );
        prev = Some(r.origin_node);
        slots[r.origin_node] = Slot::Task(k);
    }

    // Final node count of the sub-tree rooted at each partial index.
    // Children always sit at higher indices, so a reverse scan sees
    // them first.
    let mut final_size = vec![0_usize; n];
    for i in (0..n).rev() {
        final_size[i] = match slots[i] {
            Slot::Task(k) => results[k].nodes.len(),
            Slot::Leaf => 1,
            Slot::Interior => {
                let above = partial[i].above_child() as usize;
                debug_assert!(above > i + 1);
                1 + final_size[i + 1] + final_size[above]
            }
        };
    }
    let total = final_size[0];
    debug_assert_eq!(
        total,
        n + results.iter().map(|r| r.nodes.len() - 1).sum::<usize>()
    );

    let mut out_nodes: Vec<KdNode> = Vec::with_capacity(total);
    let mut out_pool: Vec<u32> = Vec::with_capacity(
        partial_pool.len() + results.iter().map(|r| r.leaf_ids.len()).sum::<usize>(),
    );

    let mut read = 0_usize;
    for r in &results {
        copy_segment(
            &partial,
            &partial_pool,
            &final_size,
            read..r.origin_node,
            &mut out_nodes,
            &mut out_pool,
        );
        read = r.origin_node + 1; // the placeholder itself is consumed

        let block_start = out_nodes.len() as u32;
        for nd in &r.nodes {
            if nd.is_leaf() {
                out_nodes.push(translate_leaf(nd, &r.leaf_ids, &r.local_to_global, &mut out_pool));
            } else {
                out_nodes.push(nd.offset_above_child(block_start));
            }
        }
    }
    // Trailing segment after the last placeholder
    copy_segment(
        &partial,
        &partial_pool,
        &final_size,
        read..n,
        &mut out_nodes,
        &mut out_pool,
    );

    assert_eq!(out_nodes.len(), total, "spliced node count mismatch");
    (out_nodes, out_pool)
}

/// Copy a run of non-placeholder partial nodes, renumbering interior
/// children into final coordinates. A node at partial index `i` lands
/// at final index `i + delta` where `delta` is the surplus injected by
/// all preceding task blocks; its above child lands just past the final
/// rendering of its below sub-tree.
fn copy_segment(
    partial: &[KdNode],
    partial_pool: &[u32],
    final_size: &[usize],
    range: std::ops::Range<usize>,
    out_nodes: &mut Vec<KdNode>,
    out_pool: &mut Vec<u32>,
) {
    let delta = out_nodes.len() - range.start;
    for i in range {
        let nd = &partial[i];
        if nd.is_leaf() {
            // Ids emitted by the root build are already global
            out_nodes.push(copy_leaf(nd, partial_pool, out_pool));
        } else {
            let above = i + 1 + final_size[i + 1] + delta;
            out_nodes.push(KdNode::interior(nd.split_axis(), above as u32, nd.split_pos()));
        }
    }
}

/// Re-encode a leaf against the output pool without changing its ids.
fn copy_leaf(nd: &KdNode, src_pool: &[u32], out_pool: &mut Vec<u32>) -> KdNode {
    let ids: Vec<u32> = nd.leaf_ids(src_pool).iter().collect();
    KdNode::leaf(&ids, out_pool)
}

/// Re-encode a task leaf, translating every primitive id through the
/// task's local-to-global map.
fn translate_leaf(nd: &KdNode, src_pool: &[u32], map: &[u32], out_pool: &mut Vec<u32>) -> KdNode {
    let ids: Vec<u32> = nd
        .leaf_ids(src_pool)
        .iter()
        .map(|local| map[local as usize])
        .collect();
    KdNode::leaf(&ids, out_pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(ids: &[u32], pool: &mut Vec<u32>) -> KdNode {
        KdNode::leaf(ids, pool)
    }

    fn result(
        origin_node: usize,
        nodes: Vec<KdNode>,
        leaf_ids: Vec<u32>,
        local_to_global: Vec<u32>,
    ) -> SubtreeResult {
        SubtreeResult {
            nodes,
            leaf_ids,
            local_to_global,
            origin_node,
        }
    }

    #[test]
    fn test_no_tasks_is_identity() {
        let mut pool = Vec::new();
        let partial = vec![
            KdNode::interior(0, 2, 1.0),
            leaf(&[0], &mut pool),
            leaf(&[1], &mut pool),
        ];
        let (nodes, out_pool) = splice(partial.clone(), pool.clone(), Vec::new());
        assert_eq!(nodes, partial);
        assert_eq!(out_pool, pool);
    }

    #[test]
    fn test_below_child_task_expansion() {
        // Root splits; its below child is a 3-node task sub-tree, the
        // above child is an ordinary leaf that must shift right.
        let mut pool = Vec::new();
        let partial = vec![
            KdNode::interior(0, 2, 1.0),
            KdNode::default(), // placeholder
            leaf(&[5], &mut pool),
        ];
        let mut task_pool = Vec::new();
        let task_nodes = vec![
            KdNode::interior(1, 2, 0.5),
            leaf(&[0], &mut task_pool),
            leaf(&[1], &mut task_pool),
        ];
        let results = vec![result(1, task_nodes, task_pool, vec![10, 11])];

        let (nodes, out_pool) = splice(partial, pool, results);
        assert_eq!(nodes.len(), 5);

        // Root's above child moved from 2 to 4
        assert_eq!(nodes[0].split_axis(), 0);
        assert_eq!(nodes[0].above_child(), 4);
        // Task interior re-anchored at block start 1: above child 1 + 2
        assert_eq!(nodes[1].split_axis(), 1);
        assert_eq!(nodes[1].above_child(), 3);
        // Task leaves translated to global ids
        assert_eq!(nodes[2].one_primitive(), 10);
        assert_eq!(nodes[3].one_primitive(), 11);
        // Trailing root leaf copied unchanged
        assert_eq!(nodes[4].one_primitive(), 5);
        assert!(out_pool.is_empty());
    }

    #[test]
    fn test_above_child_task_no_trailing() {
        // Placeholder in the final slot: nothing follows it.
        let mut pool = Vec::new();
        let partial = vec![
            KdNode::interior(2, 2, -1.0),
            leaf(&[3], &mut pool),
            KdNode::default(), // placeholder
        ];
        let mut task_pool = Vec::new();
        let task_nodes = vec![
            KdNode::interior(0, 2, 0.0),
            leaf(&[1], &mut task_pool),
            leaf(&[0, 1], &mut task_pool),
        ];
        let results = vec![result(2, task_nodes, task_pool, vec![7, 9])];

        let (nodes, out_pool) = splice(partial, pool, results);
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[0].above_child(), 2);
        assert_eq!(nodes[1].one_primitive(), 3);
        assert_eq!(nodes[2].above_child(), 4);
        assert_eq!(nodes[3].one_primitive(), 9);
        // Pooled leaf ids translated through the map
        assert_eq!(nodes[4].n_primitives(), 2);
        let ids: Vec<u32> = nodes[4].leaf_ids(&out_pool).iter().collect();
        assert_eq!(ids, vec![7, 9]);
    }

    #[test]
    fn test_two_tasks_cumulative_offsets() {
        // Root with two placeholder children: the second block's
        // position must account for the first block's surplus.
        let partial = vec![
            KdNode::interior(0, 2, 0.0),
            KdNode::default(), // task 0 (below)
            KdNode::default(), // task 1 (above)
        ];
        let mut p0 = Vec::new();
        let t0 = vec![
            KdNode::interior(1, 2, 5.0),
            leaf(&[0], &mut p0),
            leaf(&[1], &mut p0),
        ];
        let mut p1 = Vec::new();
        let t1 = vec![leaf(&[0], &mut p1)];
        let results = vec![
            result(1, t0, p0, vec![2, 4]),
            result(2, t1, p1, vec![6]),
        ];

        let (nodes, _pool) = splice(partial, Vec::new(), results);
        assert_eq!(nodes.len(), 5);
        // Root's above child is the start of the second task block
        assert_eq!(nodes[0].above_child(), 4);
        assert_eq!(nodes[1].above_child(), 3);
        assert_eq!(nodes[2].one_primitive(), 2);
        assert_eq!(nodes[3].one_primitive(), 4);
        assert_eq!(nodes[4].one_primitive(), 6);
    }

    #[test]
    fn test_pool_offsets_rebased() {
        // Pooled leaves from the partial array must re-anchor their id
        // lists in the merged pool.
        let mut pool = Vec::new();
        let partial = vec![
            KdNode::interior(0, 2, 0.0),
            KdNode::default(), // placeholder
            leaf(&[8, 9, 10], &mut pool),
        ];
        let mut task_pool = Vec::new();
        let task_nodes = vec![leaf(&[0, 1], &mut task_pool)];
        let results = vec![result(1, task_nodes, task_pool, vec![20, 21])];

        let (nodes, out_pool) = splice(partial, pool, results);
        assert_eq!(nodes.len(), 3);
        let task_ids: Vec<u32> = nodes[1].leaf_ids(&out_pool).iter().collect();
        assert_eq!(task_ids, vec![20, 21]);
        let tail_ids: Vec<u32> = nodes[2].leaf_ids(&out_pool).iter().collect();
        assert_eq!(tail_ids, vec![8, 9, 10]);
    }
}
