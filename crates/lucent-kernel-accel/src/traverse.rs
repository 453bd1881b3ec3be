//! Ordered front-to-back kd-tree traversal.
//!
//! Nearest-hit and any-hit queries share the same descent: clip the ray
//! against the scene bound, then walk interior nodes in ray-parameter
//! order, deferring the far child on a small fixed-capacity stack. The
//! node array is immutable after construction, so any number of rays
//! may traverse concurrently; the to-do stack lives in the caller's
//! frame.

use lucent_kernel_math::Vec3;
use lucent_kernel_shapes::{Intersection, Ray};

use crate::tree::KdTree;

/// Capacity of the deferred-child stack. Build parameters are checked
/// against this, so a correctly built tree never exceeds it on one
/// root-to-leaf path; overflowing it is a build bug, not a traversal
/// condition.
pub(crate) const MAX_TODO: usize = 64;

/// A deferred (node, parametric range) entry.
#[derive(Debug, Clone, Copy, Default)]
struct KdToDo {
    node: u32,
    t_min: f32,
    t_max: f32,
}

impl KdTree {
    /// Find the nearest primitive intersection along `ray`.
    ///
    /// Returns `true` and fills `isect` if any primitive is hit;
    /// `ray.max_t` ends at the nearest hit parameter. Primitives
    /// straddling a split plane may be tested more than once; their
    /// `max_t` contract keeps the result consistent.
    pub fn intersect(&self, ray: &mut Ray, isect: &mut Intersection) -> bool {
        // Compute initial parametric range of the ray inside the tree extent
        let Some((mut t_min, mut t_max)) = ray.intersect_bounds(self.bounds()) else {
            return false;
        };

        let inv_dir = Vec3::new(
            1.0 / ray.direction.x,
            1.0 / ray.direction.y,
            1.0 / ray.direction.z,
        );
        let mut todo = [KdToDo::default(); MAX_TODO];
        let mut todo_pos = 0_usize;

        let nodes = self.nodes();
        let mut hit = false;
        let mut node_idx = 0_usize;
        loop {
            // Bail out if an earlier leaf produced a hit in front of
            // everything still pending
            if ray.max_t < t_min {
                break;
            }
            let node = nodes[node_idx];
            if !node.is_leaf() {
                let axis = node.split_axis();
                let split = node.split_pos();
                // Parametric distance along the ray to the split plane
                let t_plane = (split - ray.origin[axis]) * inv_dir[axis];

                // Which child does the ray enter first?
                let below_first = ray.origin[axis] < split
                    || (ray.origin[axis] == split && ray.direction[axis] <= 0.0);
                let (first, second) = if below_first {
                    (node_idx + 1, node.above_child() as usize)
                } else {
                    (node.above_child() as usize, node_idx + 1)
                };

                if t_plane > t_max || t_plane <= 0.0 {
                    node_idx = first;
                } else if t_plane < t_min {
                    node_idx = second;
                } else {
                    assert!(todo_pos < MAX_TODO, "kd-tree to-do stack overflow");
                    todo[todo_pos] = KdToDo {
                        node: second as u32,
                        t_min: t_plane,
                        t_max,
                    };
                    todo_pos += 1;
                    node_idx = first;
                    t_max = t_plane;
                }
            } else {
                let n = node.n_primitives();
                if n == 1 {
                    let prim = &self.primitives()[node.one_primitive() as usize];
                    if prim.intersect(ray, isect) {
                        hit = true;
                    }
                } else {
                    let offset = node.ids_offset() as usize;
                    for &id in &self.leaf_ids()[offset..offset + n as usize] {
                        let prim = &self.primitives()[id as usize];
                        if prim.intersect(ray, isect) {
                            hit = true;
                        }
                    }
                }

                match todo_pos {
                    0 => break,
                    _ => {
                        todo_pos -= 1;
                        let entry = todo[todo_pos];
                        node_idx = entry.node as usize;
                        t_min = entry.t_min;
                        t_max = entry.t_max;
                    }
                }
            }
        }
        hit
    }

    /// Does any primitive intersect `ray`? Returns on the first hit
    /// found, in arbitrary order (shadow-ray query).
    pub fn intersect_p(&self, ray: &Ray) -> bool {
        let Some((mut t_min, mut t_max)) = ray.intersect_bounds(self.bounds()) else {
            return false;
        };

        let inv_dir = Vec3::new(
            1.0 / ray.direction.x,
            1.0 / ray.direction.y,
            1.0 / ray.direction.z,
        );
        let mut todo = [KdToDo::default(); MAX_TODO];
        let mut todo_pos = 0_usize;

        let nodes = self.nodes();
        let mut node_idx = 0_usize;
        loop {
            let node = nodes[node_idx];
            if node.is_leaf() {
                let n = node.n_primitives();
                if n == 1 {
                    let prim = &self.primitives()[node.one_primitive() as usize];
                    if prim.intersect_p(ray) {
                        return true;
                    }
                } else {
                    let offset = node.ids_offset() as usize;
                    for &id in &self.leaf_ids()[offset..offset + n as usize] {
                        if self.primitives()[id as usize].intersect_p(ray) {
                            return true;
                        }
                    }
                }

                match todo_pos {
                    0 => break,
                    _ => {
                        todo_pos -= 1;
                        let entry = todo[todo_pos];
                        node_idx = entry.node as usize;
                        t_min = entry.t_min;
                        t_max = entry.t_max;
                    }
                }
            } else {
                let axis = node.split_axis();
                let split = node.split_pos();
                let t_plane = (split - ray.origin[axis]) * inv_dir[axis];

                let below_first = ray.origin[axis] < split
                    || (ray.origin[axis] == split && ray.direction[axis] <= 0.0);
                let (first, second) = if below_first {
                    (node_idx + 1, node.above_child() as usize)
                } else {
                    (node.above_child() as usize, node_idx + 1)
                };

                if t_plane > t_max || t_plane <= 0.0 {
                    node_idx = first;
                } else if t_plane < t_min {
                    node_idx = second;
                } else {
                    assert!(todo_pos < MAX_TODO, "kd-tree to-do stack overflow");
                    todo[todo_pos] = KdToDo {
                        node: second as u32,
                        t_min: t_plane,
                        t_max,
                    };
                    todo_pos += 1;
                    node_idx = first;
                    t_max = t_plane;
                }
            }
        }
        false
    }
}
