//! The geometry of a particular point on a triangle, as found by a
//! closest-hit query, is represented by a **SurfaceInteraction**.

// pbrt
use crate::core::geometry::{Normal3f, Point2f, Point3f, Vector3f};
use crate::core::pbrt::Float;

#[derive(Debug, Default, Copy, Clone)]
pub struct Shading {
    pub n: Normal3f,
}

#[derive(Debug, Default, Copy, Clone)]
pub struct SurfaceInteraction {
    /// hit position
    pub p: Point3f,
    /// conservative bound on the floating-point error of *p*
    pub p_error: Vector3f,
    /// geometric normal
    pub n: Normal3f,
    pub shading: Shading,
    pub uv: Point2f,
    /// outgoing direction, the negated ray direction
    pub wo: Vector3f,
    /// ray parameter of the hit
    pub t_hit: Float,
    /// index of the triangle within its mesh
    pub triangle_id: usize,
    /// number of node bounding boxes tested by the query
    pub nodes_visited: usize,
}

impl SurfaceInteraction {
    pub fn new(
        p: &Point3f,
        p_error: &Vector3f,
        uv: &Point2f,
        wo: &Vector3f,
        n: &Normal3f,
        t_hit: Float,
        triangle_id: usize,
    ) -> Self {
        SurfaceInteraction {
            p: *p,
            p_error: *p_error,
            n: *n,
            shading: Shading { n: *n },
            uv: *uv,
            wo: *wo,
            t_hit,
            triangle_id,
            nodes_visited: 0_usize,
        }
    }
}
