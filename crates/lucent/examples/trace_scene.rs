//! Build an accelerator over a small scene and cast a few rays.

use std::sync::Arc;

use lucent::math::{Point3, Vec3};
use lucent::{Intersection, KdTree, KdTreeParams, Primitive, Ray, Sphere, TriangleMesh};

fn main() {
    // A floor quad plus a 6x6 grid of spheres hovering above it
    let floor = TriangleMesh::new(
        vec![
            Point3::new(-10.0, -10.0, 0.0),
            Point3::new(10.0, -10.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(-10.0, 10.0, 0.0),
        ],
        vec![0, 1, 2, 0, 2, 3],
    )
    .expect("valid floor mesh");

    let mut prims: Vec<Arc<dyn Primitive>> = vec![Arc::new(floor)];
    for i in 0..6 {
        for j in 0..6 {
            let center = Point3::new(i as f32 * 3.0 - 7.5, j as f32 * 3.0 - 7.5, 2.0);
            prims.push(Arc::new(Sphere::new(center, 1.0)));
        }
    }

    let tree = KdTree::build(&prims, &KdTreeParams::default()).expect("build failed");
    let stats = tree.stats();
    println!(
        "built kd-tree: {} primitives, {} nodes ({} interior / {} leaves), {} sub-tree tasks",
        stats.n_primitives, stats.n_nodes, stats.n_interior, stats.n_leaves, stats.n_subtree_tasks
    );

    // Fire a fan of rays down at the scene
    for k in 0..8 {
        let x = k as f32 * 2.0 - 7.0;
        let mut ray = Ray::new(Point3::new(x, 0.0, 20.0), Vec3::new(0.0, 0.05, -1.0));
        let mut isect = Intersection::default();
        if tree.intersect(&mut ray, &mut isect) {
            println!(
                "ray at x={:+.1} hit ({:+.2}, {:+.2}, {:+.2}) at t={:.3}",
                x, isect.point.x, isect.point.y, isect.point.z, isect.t
            );
        } else {
            println!("ray at x={:+.1} escaped", x);
        }
    }

    // Shadow query straight through the sphere grid
    let shadow = Ray::new(Point3::new(-12.0, -7.5, 2.0), Vec3::new(1.0, 0.0, 0.0));
    println!("shadow ray blocked: {}", tree.intersect_p(&shadow));
}
