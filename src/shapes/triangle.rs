// std
use std::mem;
use std::sync::Arc;
// pbrt
use crate::core::geometry::{
    bnd3_union_pnt3f, nrm_faceforward_nrm, pnt3_permutef, vec3_cross_vec3, vec3_max_componentf,
    vec3_max_dimensionf, vec3_permutef,
};
use crate::core::geometry::{Bounds3f, Normal3f, Point2f, Point3f, Ray, Vector3f};
use crate::core::interaction::SurfaceInteraction;
use crate::core::pbrt::gamma;
use crate::core::pbrt::Float;

#[derive(Debug, Clone)]
pub struct TriangleMesh {
    /// the total number of triangles in the mesh
    pub n_triangles: usize,
    /// three vertex indices per triangle
    pub vertex_indices: Vec<usize>,
    /// the total number of vertices in the mesh
    pub n_vertices: usize,
    /// vector of *n_vertices* vertex positions
    pub p: Vec<Point3f>,
    /// an optional vector of per-vertex normals (can be empty)
    pub n: Vec<Normal3f>,
    /// an optional vector of parametric (u, v) values (can be empty)
    pub uv: Vec<Point2f>,
}

impl TriangleMesh {
    pub fn new(
        vertex_indices: Vec<usize>,
        p: Vec<Point3f>,
        n: Vec<Normal3f>,
        uv: Vec<Point2f>,
    ) -> Self {
        assert_eq!(
            vertex_indices.len() % 3,
            0,
            "vertex indices must come in triples"
        );
        let n_vertices: usize = p.len();
        if let Some(bad) = vertex_indices.iter().find(|&&vi| vi >= n_vertices) {
            panic!(
                "vertex index {} out of range for {} vertices",
                bad, n_vertices
            );
        }
        assert!(
            n.is_empty() || n.len() == n_vertices,
            "expected {} normals, found {}",
            n_vertices,
            n.len()
        );
        assert!(
            uv.is_empty() || uv.len() == n_vertices,
            "expected {} uvs, found {}",
            n_vertices,
            uv.len()
        );
        TriangleMesh {
            n_triangles: vertex_indices.len() / 3,
            vertex_indices,
            n_vertices,
            p,
            n,
            uv,
        }
    }
    /// The three vertex positions of triangle *id*.
    pub fn vertices(&self, id: usize) -> [Point3f; 3] {
        [
            self.p[self.vertex_indices[id * 3]],
            self.p[self.vertex_indices[id * 3 + 1]],
            self.p[self.vertex_indices[id * 3 + 2]],
        ]
    }
    pub fn triangle_bound(&self, id: usize) -> Bounds3f {
        let [p0, p1, p2] = self.vertices(id);
        bnd3_union_pnt3f(&Bounds3f::new(p0, p1), &p2)
    }
    pub fn world_bound(&self) -> Bounds3f {
        self.p
            .iter()
            .fold(Bounds3f::default(), |b, p| bnd3_union_pnt3f(&b, p))
    }
}

/// Ray parameter and barycentric coordinates of a ray-triangle hit.
#[derive(Debug, Default, Copy, Clone)]
pub struct TriangleHit {
    pub t: Float,
    pub b0: Float,
    pub b1: Float,
    pub b2: Float,
}

/// Watertight ray-triangle test on resolved vertex positions. Hits
/// outside of `(ray.t_min, ray.t_max)` are rejected.
pub fn intersect_triangle(p0: &Point3f, p1: &Point3f, p2: &Point3f, ray: &Ray) -> Option<TriangleHit> {
    // translate vertices based on ray origin
    let mut p0t: Point3f = *p0 - Vector3f::from(ray.o);
    let mut p1t: Point3f = *p1 - Vector3f::from(ray.o);
    let mut p2t: Point3f = *p2 - Vector3f::from(ray.o);
    // permute components of triangle vertices and ray direction
    let kz: usize = vec3_max_dimensionf(&ray.d.abs());
    let mut kx: usize = kz + 1;
    if kx == 3 {
        kx = 0;
    }
    let mut ky: usize = kx + 1;
    if ky == 3 {
        ky = 0;
    }
    let d: Vector3f = vec3_permutef(&ray.d, kx, ky, kz);
    p0t = pnt3_permutef(&p0t, kx, ky, kz);
    p1t = pnt3_permutef(&p1t, kx, ky, kz);
    p2t = pnt3_permutef(&p2t, kx, ky, kz);
    // apply shear transformation to translated vertex positions
    let sx: Float = -d.x / d.z;
    let sy: Float = -d.y / d.z;
    let sz: Float = 1.0 / d.z;
    p0t.x += sx * p0t.z;
    p0t.y += sy * p0t.z;
    p1t.x += sx * p1t.z;
    p1t.y += sy * p1t.z;
    p2t.x += sx * p2t.z;
    p2t.y += sy * p2t.z;
    // compute edge function coefficients _e0_, _e1_, and _e2_
    let mut e0: Float = p1t.x * p2t.y - p1t.y * p2t.x;
    let mut e1: Float = p2t.x * p0t.y - p2t.y * p0t.x;
    let mut e2: Float = p0t.x * p1t.y - p0t.y * p1t.x;
    // fall back to double precision test at triangle edges
    if mem::size_of::<Float>() == mem::size_of::<f32>() && (e0 == 0.0 || e1 == 0.0 || e2 == 0.0) {
        let p2txp1ty: f64 = p2t.x as f64 * p1t.y as f64;
        let p2typ1tx: f64 = p2t.y as f64 * p1t.x as f64;
        e0 = (p2typ1tx - p2txp1ty) as Float;
        let p0txp2ty: f64 = p0t.x as f64 * p2t.y as f64;
        let p0typ2tx: f64 = p0t.y as f64 * p2t.x as f64;
        e1 = (p0typ2tx - p0txp2ty) as Float;
        let p1txp0ty: f64 = p1t.x as f64 * p0t.y as f64;
        let p1typ0tx: f64 = p1t.y as f64 * p0t.x as f64;
        e2 = (p1typ0tx - p1txp0ty) as Float;
    }
    // perform triangle edge and determinant tests
    if (e0 < 0.0 || e1 < 0.0 || e2 < 0.0) && (e0 > 0.0 || e1 > 0.0 || e2 > 0.0) {
        return None;
    }
    let det: Float = e0 + e1 + e2;
    if det == 0.0 || det.is_nan() {
        return None;
    }
    // compute scaled hit distance to triangle and test against ray $t$ range
    p0t.z *= sz;
    p1t.z *= sz;
    p2t.z *= sz;
    let t_scaled: Float = e0 * p0t.z + e1 * p1t.z + e2 * p2t.z;
    let t_max: Float = ray.t_max.get();
    if det < 0.0 && (t_scaled >= 0.0 || t_scaled < t_max * det) {
        return None;
    } else if det > 0.0 && (t_scaled <= 0.0 || t_scaled > t_max * det) {
        return None;
    }
    // compute barycentric coordinates and $t$ value for triangle intersection
    let inv_det: Float = 1.0 / det;
    let b0: Float = e0 * inv_det;
    let b1: Float = e1 * inv_det;
    let b2: Float = e2 * inv_det;
    let t: Float = t_scaled * inv_det;
    // ensure that computed triangle $t$ is conservatively greater than zero

    // compute $\delta_z$ term for triangle $t$ error bounds
    let max_zt: Float = vec3_max_componentf(
        &Vector3f {
            x: p0t.z,
            y: p1t.z,
            z: p2t.z,
        }
        .abs(),
    );
    let delta_z: Float = gamma(3_i32) * max_zt;
    // compute $\delta_x$ and $\delta_y$ terms for triangle $t$ error bounds
    let max_xt: Float = vec3_max_componentf(
        &Vector3f {
            x: p0t.x,
            y: p1t.x,
            z: p2t.x,
        }
        .abs(),
    );
    let max_yt: Float = vec3_max_componentf(
        &Vector3f {
            x: p0t.y,
            y: p1t.y,
            z: p2t.y,
        }
        .abs(),
    );
    let delta_x: Float = gamma(5) * (max_xt + max_zt);
    let delta_y: Float = gamma(5) * (max_yt + max_zt);
    // compute $\delta_e$ term for triangle $t$ error bounds
    let delta_e: Float = 2.0 * (gamma(2) * max_xt * max_yt + delta_y * max_xt + delta_x * max_yt);
    // compute $\delta_t$ term for triangle $t$ error bounds and check _t_
    let max_e: Float = vec3_max_componentf(
        &Vector3f {
            x: e0,
            y: e1,
            z: e2,
        }
        .abs(),
    );
    let delta_t: Float =
        3.0 * (gamma(3) * max_e * max_zt + delta_e * max_zt + delta_z * max_e) * inv_det.abs();
    // the segment is closed, a hit exactly at t_min counts
    if t.is_nan() || t <= delta_t || t < ray.t_min {
        return None;
    }
    Some(TriangleHit { t, b0, b1, b2 })
}

/// A single triangle of a shared mesh.
#[derive(Debug, Clone)]
pub struct Triangle {
    mesh: Arc<TriangleMesh>,
    pub id: usize,
}

impl Triangle {
    pub fn new(mesh: Arc<TriangleMesh>, tri_number: usize) -> Self {
        assert!(tri_number < mesh.n_triangles);
        Triangle {
            mesh,
            id: tri_number,
        }
    }
    pub fn get_uvs(&self) -> [Point2f; 3] {
        if self.mesh.uv.is_empty() {
            [
                Point2f { x: 0.0, y: 0.0 },
                Point2f { x: 1.0, y: 0.0 },
                Point2f { x: 1.0, y: 1.0 },
            ]
        } else {
            [
                self.mesh.uv[self.mesh.vertex_indices[self.id * 3]],
                self.mesh.uv[self.mesh.vertex_indices[self.id * 3 + 1]],
                self.mesh.uv[self.mesh.vertex_indices[self.id * 3 + 2]],
            ]
        }
    }
    /// Fill in a _SurfaceInteraction_ from a triangle hit.
    pub fn interaction(&self, ray: &Ray, hit: &TriangleHit) -> SurfaceInteraction {
        let [p0, p1, p2] = self.mesh.vertices(self.id);
        let (b0, b1, b2) = (hit.b0, hit.b1, hit.b2);
        // compute error bounds for triangle intersection
        let x_abs_sum: Float = (b0 * p0.x).abs() + (b1 * p1.x).abs() + (b2 * p2.x).abs();
        let y_abs_sum: Float = (b0 * p0.y).abs() + (b1 * p1.y).abs() + (b2 * p2.y).abs();
        let z_abs_sum: Float = (b0 * p0.z).abs() + (b1 * p1.z).abs() + (b2 * p2.z).abs();
        let p_error: Vector3f = Vector3f {
            x: x_abs_sum,
            y: y_abs_sum,
            z: z_abs_sum,
        } * gamma(7);
        // interpolate $(u,v)$ parametric coordinates and hit point
        let uv: [Point2f; 3] = self.get_uvs();
        let p_hit: Point3f = p0 * b0 + p1 * b1 + p2 * b2;
        let uv_hit: Point2f = uv[0] * b0 + uv[1] * b1 + uv[2] * b2;
        // geometric normal follows the winding order
        let dp02: Vector3f = p0 - p2;
        let dp12: Vector3f = p1 - p2;
        let surface_normal: Normal3f = Normal3f::from(vec3_cross_vec3(&dp02, &dp12).normalize());
        let wo: Vector3f = -ray.d;
        let mut si: SurfaceInteraction = SurfaceInteraction::new(
            &p_hit,
            &p_error,
            &uv_hit,
            &wo,
            &surface_normal,
            hit.t,
            self.id,
        );
        if !self.mesh.n.is_empty() {
            // compute shading normal _ns_ for triangle
            let n0: Normal3f = self.mesh.n[self.mesh.vertex_indices[self.id * 3]];
            let n1: Normal3f = self.mesh.n[self.mesh.vertex_indices[self.id * 3 + 1]];
            let n2: Normal3f = self.mesh.n[self.mesh.vertex_indices[self.id * 3 + 2]];
            let ns: Normal3f = n0 * b0 + n1 * b1 + n2 * b2;
            if ns.length_squared() > 0.0 {
                si.shading.n = ns.normalize();
            }
            // ensure correct orientation of the geometric normal
            si.n = nrm_faceforward_nrm(&si.n, &si.shading.n);
        }
        si
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn single_triangle() -> Arc<TriangleMesh> {
        Arc::new(TriangleMesh::new(
            vec![0, 1, 2],
            vec![
                Point3f {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                },
                Point3f {
                    x: 1.0,
                    y: 0.0,
                    z: 0.0,
                },
                Point3f {
                    x: 0.0,
                    y: 1.0,
                    z: 0.0,
                },
            ],
            Vec::new(),
            Vec::new(),
        ))
    }

    fn hits(mesh: &TriangleMesh, ray: &Ray) -> Option<TriangleHit> {
        let [p0, p1, p2] = mesh.vertices(0);
        intersect_triangle(&p0, &p1, &p2, ray)
    }

    fn down_ray(x: Float, y: Float) -> Ray {
        Ray::new(
            Point3f { x, y, z: 2.0 },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            0.0,
            std::f32::INFINITY,
        )
    }

    #[test]
    fn hit_inside_triangle() {
        let tri = Triangle::new(single_triangle(), 0);
        let ray = down_ray(0.25, 0.25);
        let hit = hits(&tri.mesh, &ray).unwrap();
        let si = tri.interaction(&ray, &hit);
        assert_relative_eq!(hit.t, 2.0);
        assert_relative_eq!(si.t_hit, 2.0);
        assert_relative_eq!(si.p.x, 0.25);
        assert_relative_eq!(si.p.y, 0.25);
        // counter-clockwise seen from +z
        assert_relative_eq!(si.n.z, 1.0);
        assert_eq!(si.triangle_id, 0);
    }

    #[test]
    fn miss_outside_and_beyond_segment() {
        let mesh = single_triangle();
        assert!(hits(&mesh, &down_ray(0.75, 0.75)).is_none());
        let short = down_ray(0.25, 0.25);
        short.t_max.set(1.5);
        assert!(hits(&mesh, &short).is_none());
        let mut late = down_ray(0.25, 0.25);
        late.t_min = 2.5;
        assert!(hits(&mesh, &late).is_none());
    }

    #[test]
    fn hit_exactly_at_t_min_counts() {
        let mesh = single_triangle();
        let t: Float = hits(&mesh, &down_ray(0.3, 0.2)).unwrap().t;
        let mut ray = down_ray(0.3, 0.2);
        ray.t_min = t;
        let hit = hits(&mesh, &ray).unwrap();
        assert_eq!(hit.t, t);
        ray.t_min = t * (1.0 + 1e-6);
        assert!(hits(&mesh, &ray).is_none());
    }

    #[test]
    fn degenerate_triangles_never_hit() {
        let p = Point3f {
            x: 0.5,
            y: 0.5,
            z: 0.0,
        };
        assert!(intersect_triangle(&p, &p, &p, &down_ray(0.5, 0.5)).is_none());
        let nan = Point3f {
            x: std::f32::NAN,
            y: 0.0,
            z: 0.0,
        };
        assert!(intersect_triangle(&nan, &p, &p, &down_ray(0.5, 0.5)).is_none());
    }

    #[test]
    fn shading_normals_are_interpolated() {
        let base = single_triangle();
        let n = Normal3f {
            x: 0.0,
            y: 0.0,
            z: -1.0,
        };
        let mesh = Arc::new(TriangleMesh::new(
            base.vertex_indices.clone(),
            base.p.clone(),
            vec![n, n, n],
            Vec::new(),
        ));
        let ray = down_ray(0.2, 0.2);
        let hit = hits(&mesh, &ray).unwrap();
        let si = Triangle::new(mesh, 0).interaction(&ray, &hit);
        assert_relative_eq!(si.shading.n.z, -1.0);
        // geometric normal flipped into the shading hemisphere
        assert_relative_eq!(si.n.z, -1.0);
    }

    #[test]
    #[should_panic]
    fn rejects_out_of_range_indices() {
        TriangleMesh::new(vec![0, 1, 3], vec![Point3f::default(); 3], Vec::new(), Vec::new());
    }
}
