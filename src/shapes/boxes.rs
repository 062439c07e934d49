//! Procedural box meshes, used for the built-in test scene of the
//! command line tool and for the acceptance tests.

// pbrt
use crate::core::geometry::{Bounds3f, Point3f};
use crate::core::pbrt::Float;
use crate::shapes::triangle::TriangleMesh;

/// Twelve triangles, counter-clockwise seen from outside, indexing
/// the corners in `x | y << 1 | z << 2` order.
const BOX_INDICES: [usize; 36] = [
    0, 2, 1, 1, 2, 3, // -z
    4, 5, 6, 5, 7, 6, // +z
    0, 4, 2, 2, 4, 6, // -x
    1, 3, 5, 3, 7, 5, // +x
    0, 1, 4, 1, 5, 4, // -y
    2, 6, 3, 3, 6, 7, // +y
];

fn corner(b: &Bounds3f, c: usize) -> Point3f {
    Point3f {
        x: if c & 1 == 0 { b.p_min.x } else { b.p_max.x },
        y: if c & 2 == 0 { b.p_min.y } else { b.p_max.y },
        z: if c & 4 == 0 { b.p_min.z } else { b.p_max.z },
    }
}

fn append_box(b: &Bounds3f, vertex_indices: &mut Vec<usize>, p: &mut Vec<Point3f>) {
    let first: usize = p.len();
    for c in 0..8 {
        p.push(corner(b, c));
    }
    vertex_indices.extend(BOX_INDICES.iter().map(|i| first + i));
}

/// A closed box with outward facing triangles.
pub fn create_box_mesh(b: &Bounds3f) -> TriangleMesh {
    let mut vertex_indices: Vec<usize> = Vec::with_capacity(36);
    let mut p: Vec<Point3f> = Vec::with_capacity(8);
    append_box(b, &mut vertex_indices, &mut p);
    TriangleMesh::new(vertex_indices, p, Vec::new(), Vec::new())
}

/// *n* x *n* x *n* boxes with edge length *size*, the box `(i, j, k)`
/// centered at `(i, j, k) * spacing`.
pub fn create_box_grid(n: usize, size: Float, spacing: Float) -> TriangleMesh {
    let half: Float = size * 0.5;
    let mut vertex_indices: Vec<usize> = Vec::with_capacity(n * n * n * 36);
    let mut p: Vec<Point3f> = Vec::with_capacity(n * n * n * 8);
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let c: Point3f = Point3f {
                    x: i as Float * spacing,
                    y: j as Float * spacing,
                    z: k as Float * spacing,
                };
                let b: Bounds3f = Bounds3f::new(
                    Point3f {
                        x: c.x - half,
                        y: c.y - half,
                        z: c.z - half,
                    },
                    Point3f {
                        x: c.x + half,
                        y: c.y + half,
                        z: c.z + half,
                    },
                );
                append_box(&b, &mut vertex_indices, &mut p);
            }
        }
    }
    TriangleMesh::new(vertex_indices, p, Vec::new(), Vec::new())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::geometry::{vec3_cross_vec3, vec3_dot_vec3f, Vector3f};

    #[test]
    fn box_triangles_face_outwards() {
        let b = Bounds3f::new(
            Point3f {
                x: -1.0,
                y: -1.0,
                z: -1.0,
            },
            Point3f {
                x: 1.0,
                y: 1.0,
                z: 1.0,
            },
        );
        let mesh = create_box_mesh(&b);
        assert_eq!(mesh.n_triangles, 12);
        for id in 0..mesh.n_triangles {
            let [p0, p1, p2] = mesh.vertices(id);
            let n: Vector3f = vec3_cross_vec3(&(p1 - p0), &(p2 - p0));
            let to_face: Vector3f = Vector3f::from((p0 + p1 + p2) * (1.0 / 3.0));
            assert!(vec3_dot_vec3f(&n, &to_face) > 0.0, "triangle {}", id);
        }
    }

    #[test]
    fn grid_sizes() {
        let mesh = create_box_grid(3, 1.0, 2.0);
        assert_eq!(mesh.n_triangles, 27 * 12);
        assert_eq!(mesh.n_vertices, 27 * 8);
        let wb = mesh.world_bound();
        assert_eq!(wb.p_min.x, -0.5);
        assert_eq!(wb.p_max.z, 4.5);
    }
}
