//! Pre-build phases: primitive refinement and bounds computation.
//!
//! Both phases fan work out over `T` contiguous index ranges (one per
//! rayon worker) and concatenate the per-range outputs in range order,
//! so the flat primitive list and the bounds array are deterministic
//! for a given input order regardless of scheduling.

use std::sync::Arc;

use lucent_kernel_math::Bounds3;
use lucent_kernel_shapes::{Primitive, ShapeError};
use rayon::prelude::*;

use crate::BuildError;

/// Split `[0, len)` into one contiguous range per worker.
fn worker_ranges(len: usize) -> Vec<(usize, usize)> {
    let workers = rayon::current_num_threads().max(1);
    (0..workers)
        .map(|k| (len * k / workers, len * (k + 1) / workers))
        .collect()
}

/// Replace every input primitive by its full refinement, producing the
/// flat list whose indices become the canonical primitive ids.
///
/// The flat list is always fully refined, for both parallel and
/// sequential entry; a container primitive must never reach the
/// builder. Refinement errors propagate unchanged.
pub(crate) fn refine_primitives(
    prims: &[Arc<dyn Primitive>],
    parallel: bool,
) -> Result<Vec<Arc<dyn Primitive>>, BuildError> {
    if parallel {
        let parts = worker_ranges(prims.len())
            .into_par_iter()
            .map(|(start, end)| {
                let mut local: Vec<Arc<dyn Primitive>> = Vec::new();
                for prim in &prims[start..end] {
                    prim.fully_refine(&mut local)?;
                }
                Ok(local)
            })
            .collect::<Result<Vec<_>, ShapeError>>()?;

        let mut flat = Vec::with_capacity(parts.iter().map(Vec::len).sum());
        for part in parts {
            flat.extend(part);
        }
        Ok(flat)
    } else {
        let mut flat = Vec::new();
        for prim in prims {
            prim.fully_refine(&mut flat)?;
        }
        Ok(flat)
    }
}

/// Compute per-primitive world bounds, the scene bound, and the initial
/// primitive id set `0..n`.
pub(crate) fn compute_bounds(
    primitives: &[Arc<dyn Primitive>],
    parallel: bool,
) -> (Vec<Bounds3>, Bounds3, Vec<u32>) {
    let n = primitives.len();
    let prim_nums: Vec<u32> = (0..n as u32).collect();

    if parallel {
        let parts: Vec<(Vec<Bounds3>, Bounds3)> = worker_ranges(n)
            .into_par_iter()
            .map(|(start, end)| {
                let mut local_scene = Bounds3::empty();
                let mut local_bounds = Vec::with_capacity(end - start);
                for prim in &primitives[start..end] {
                    let b = prim.world_bound();
                    local_scene = local_scene.union(&b);
                    local_bounds.push(b);
                }
                (local_bounds, local_scene)
            })
            .collect();

        // Serial reduction of the per-worker partial results
        let mut prim_bounds = Vec::with_capacity(n);
        let mut scene = Bounds3::empty();
        for (local_bounds, local_scene) in parts {
            prim_bounds.extend(local_bounds);
            scene = scene.union(&local_scene);
        }
        (prim_bounds, scene, prim_nums)
    } else {
        let mut scene = Bounds3::empty();
        let mut prim_bounds = Vec::with_capacity(n);
        for prim in primitives {
            let b = prim.world_bound();
            scene = scene.union(&b);
            prim_bounds.push(b);
        }
        (prim_bounds, scene, prim_nums)
    }
}
