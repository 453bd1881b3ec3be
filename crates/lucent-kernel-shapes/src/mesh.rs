//! Triangle meshes and their refinement into individual triangles.

use std::sync::Arc;

use lucent_kernel_math::{Bounds3, Dir3, Point3};

use crate::{Intersection, Primitive, Ray, ShapeError};

/// Threshold below which the Moller-Trumbore determinant is treated as
/// a parallel or degenerate configuration.
const MT_EPSILON: f32 = 1e-8;

/// Shared vertex and index storage for a mesh and its triangles.
#[derive(Debug)]
struct MeshData {
    positions: Vec<Point3>,
    indices: Vec<[u32; 3]>,
}

/// An indexed triangle mesh.
///
/// A mesh is a container primitive: it can be intersected directly
/// (linear scan over its faces), but the intended use is
/// [`fully_refine`](Primitive::fully_refine), which expands it into one
/// [`Triangle`] per face, all sharing this mesh's vertex storage.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    data: Arc<MeshData>,
}

impl TriangleMesh {
    /// Create a mesh from vertex positions and a flat index buffer.
    ///
    /// The index buffer holds three entries per triangle. Index values
    /// are validated lazily, at refinement time.
    pub fn new(positions: Vec<Point3>, indices: Vec<u32>) -> Result<Self, ShapeError> {
        if indices.len() % 3 != 0 {
            return Err(ShapeError::RaggedIndexBuffer(indices.len()));
        }
        let indices = indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        Ok(Self {
            data: Arc::new(MeshData { positions, indices }),
        })
    }

    /// Number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.data.indices.len()
    }
}

impl Primitive for TriangleMesh {
    fn world_bound(&self) -> Bounds3 {
        let mut b = Bounds3::empty();
        for p in &self.data.positions {
            b.include_point(p);
        }
        b
    }

    fn intersect(&self, ray: &mut Ray, isect: &mut Intersection) -> bool {
        let mut hit = false;
        for index in 0..self.data.indices.len() {
            let tri = Triangle {
                data: Arc::clone(&self.data),
                index,
            };
            if tri.intersect(ray, isect) {
                hit = true;
            }
        }
        hit
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        (0..self.data.indices.len()).any(|index| {
            Triangle {
                data: Arc::clone(&self.data),
                index,
            }
            .intersect_p(ray)
        })
    }

    fn fully_refine(&self, sink: &mut Vec<Arc<dyn Primitive>>) -> Result<(), ShapeError> {
        let vertex_count = self.data.positions.len();
        for (triangle, idx) in self.data.indices.iter().enumerate() {
            for &index in idx {
                if index as usize >= vertex_count {
                    return Err(ShapeError::IndexOutOfRange {
                        triangle,
                        index,
                        vertex_count,
                    });
                }
            }
            sink.push(Arc::new(Triangle {
                data: Arc::clone(&self.data),
                index: triangle,
            }));
        }
        Ok(())
    }
}

/// A single face of a [`TriangleMesh`].
#[derive(Debug, Clone)]
pub struct Triangle {
    data: Arc<MeshData>,
    index: usize,
}

impl Triangle {
    /// The three vertex positions of this face.
    pub fn vertices(&self) -> (Point3, Point3, Point3) {
        let [i0, i1, i2] = self.data.indices[self.index];
        (
            self.data.positions[i0 as usize],
            self.data.positions[i1 as usize],
            self.data.positions[i2 as usize],
        )
    }

    /// Moller-Trumbore intersection; `Some(t)` with `t` in `(0, max_t]`.
    fn hit_parameter(&self, ray: &Ray) -> Option<f32> {
        let (v0, v1, v2) = self.vertices();
        let e1 = v1 - v0;
        let e2 = v2 - v0;

        let pvec = ray.direction.cross(&e2);
        let det = e1.dot(&pvec);
        if det.abs() < MT_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = ray.origin - v0;
        let u = tvec.dot(&pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(&e1);
        let v = ray.direction.dot(&qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(&qvec) * inv_det;
        if t > 0.0 && t <= ray.max_t {
            Some(t)
        } else {
            None
        }
    }
}

impl Primitive for Triangle {
    fn world_bound(&self) -> Bounds3 {
        let (v0, v1, v2) = self.vertices();
        let mut b = Bounds3::from_point(v0);
        b.include_point(&v1);
        b.include_point(&v2);
        b
    }

    fn intersect(&self, ray: &mut Ray, isect: &mut Intersection) -> bool {
        let Some(t) = self.hit_parameter(ray) else {
            return false;
        };
        let (v0, v1, v2) = self.vertices();
        ray.max_t = t;
        isect.t = t;
        isect.point = ray.at(t);
        isect.normal = Dir3::new_normalize((v1 - v0).cross(&(v2 - v0)));
        true
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.hit_parameter(ray).is_some()
    }

    fn fully_refine(&self, sink: &mut Vec<Arc<dyn Primitive>>) -> Result<(), ShapeError> {
        sink.push(Arc::new(self.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucent_kernel_math::Vec3;

    fn unit_quad() -> TriangleMesh {
        // Two triangles spanning the unit square in the z=0 plane
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        TriangleMesh::new(positions, vec![0, 1, 2, 0, 2, 3]).unwrap()
    }

    #[test]
    fn test_mesh_refine() {
        let mesh = unit_quad();
        let mut sink: Vec<Arc<dyn Primitive>> = Vec::new();
        mesh.fully_refine(&mut sink).unwrap();
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_triangle_hit() {
        let mesh = unit_quad();
        let mut sink: Vec<Arc<dyn Primitive>> = Vec::new();
        mesh.fully_refine(&mut sink).unwrap();

        let mut ray = Ray::new(Point3::new(0.75, 0.25, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let mut isect = Intersection::default();
        assert!(sink[0].intersect(&mut ray, &mut isect));
        assert!((isect.t - 5.0).abs() < 1e-5);
        assert!((ray.max_t - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_triangle_miss_outside_barycentrics() {
        let mesh = unit_quad();
        let mut sink: Vec<Arc<dyn Primitive>> = Vec::new();
        mesh.fully_refine(&mut sink).unwrap();

        // Hits the quad's plane but outside the first triangle
        let ray = Ray::new(Point3::new(0.1, 0.9, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(!sink[0].intersect_p(&ray));
        assert!(sink[1].intersect_p(&ray));
    }

    #[test]
    fn test_parallel_ray_misses() {
        let mesh = unit_quad();
        let ray = Ray::new(Point3::new(0.5, 0.5, 1.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(!mesh.intersect_p(&ray));
    }

    #[test]
    fn test_mesh_brute_force_intersect() {
        let mesh = unit_quad();
        let mut ray = Ray::new(Point3::new(0.5, 0.5, 3.0), Vec3::new(0.0, 0.0, -1.0));
        let mut isect = Intersection::default();
        assert!(mesh.intersect(&mut ray, &mut isect));
        assert!((isect.point.z).abs() < 1e-5);
    }

    #[test]
    fn test_ragged_index_buffer_rejected() {
        let positions = vec![Point3::origin()];
        assert!(matches!(
            TriangleMesh::new(positions, vec![0, 0]),
            Err(ShapeError::RaggedIndexBuffer(2))
        ));
    }

    #[test]
    fn test_out_of_range_index_fails_refine() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = TriangleMesh::new(positions, vec![0, 1, 7]).unwrap();
        let mut sink: Vec<Arc<dyn Primitive>> = Vec::new();
        let err = mesh.fully_refine(&mut sink).unwrap_err();
        assert!(matches!(err, ShapeError::IndexOutOfRange { index: 7, .. }));
    }

    #[test]
    fn test_mesh_world_bound() {
        let mesh = unit_quad();
        let b = mesh.world_bound();
        assert_eq!(b.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(b.max, Point3::new(1.0, 1.0, 0.0));
    }
}
