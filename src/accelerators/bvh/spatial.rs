//! Spatial splits: instead of partitioning the references, cut space
//! with an axis aligned plane and clip every triangle crossing it
//! against both halves, so a triangle may end up referenced by more
//! than one leaf.

// pbrt
use crate::accelerators::bvh::build::{BVHBuilder, BVHPrimitiveInfo, SplitCandidate, SplitKind};
use crate::core::geometry::{
    bnd3_expand, bnd3_intersect_bnd3f, bnd3_union_bnd3f, bnd3_union_pnt3f, Bounds3f, Point3f,
    XYZEnum,
};
use crate::core::pbrt::{clamp_t, lerp, Float};

/// Spatial splits are only searched when the overlap of the best
/// object split, relative to the root surface area, exceeds this.
pub const SPATIAL_SPLIT_ALPHA: Float = 1e-5;
const N_SPATIAL_BINS: usize = 64;

#[derive(Debug, Copy, Clone)]
struct SpatialBin {
    bounds: Bounds3f,
    /// references starting in this bin
    entry: usize,
    /// references ending in this bin
    exit: usize,
}

impl Default for SpatialBin {
    fn default() -> Self {
        SpatialBin {
            bounds: Bounds3f::default(),
            entry: 0_usize,
            exit: 0_usize,
        }
    }
}

/// Boxes of the parts of triangle *p* on either side of the plane
/// `p[axis] == position`. A side the triangle doesn't reach gets an
/// empty box.
pub fn split_triangle(p: &[Point3f; 3], axis: XYZEnum, position: Float) -> (Bounds3f, Bounds3f) {
    let mut left: Bounds3f = Bounds3f::default();
    let mut right: Bounds3f = Bounds3f::default();
    for i in 0..3 {
        let v0: Point3f = p[i];
        let v1: Point3f = p[(i + 1) % 3];
        let v0_left: bool = v0[axis] <= position;
        let v1_left: bool = v1[axis] <= position;
        if v0_left {
            left = bnd3_union_pnt3f(&left, &v0);
        } else {
            right = bnd3_union_pnt3f(&right, &v0);
        }
        if v0_left != v1_left {
            // edge crosses the plane
            let t: Float = clamp_t(
                (position - v0[axis]) / (v1[axis] - v0[axis]),
                0.0 as Float,
                1.0 as Float,
            );
            let mut m: Point3f = lerp(t, v0, v1);
            m[axis] = position;
            left = bnd3_union_pnt3f(&left, &m);
            right = bnd3_union_pnt3f(&right, &m);
        }
    }
    (left, right)
}

impl<'a> BVHBuilder<'a> {
    /// Bin the references along the longest centroid axis, clipping the
    /// triangles at every bin border they cross, and sweep the bin
    /// borders for the cheapest split plane.
    pub fn find_spatial_split(
        &self,
        primitive_info: &[BVHPrimitiveInfo],
        bounds: &Bounds3f,
        centroid_bounds: &Bounds3f,
    ) -> Option<SplitCandidate> {
        let n: usize = primitive_info.len();
        let surface_area: Float = bounds.surface_area();
        if n < 2 || surface_area <= 0.0 as Float {
            return None;
        }
        let axis: XYZEnum = centroid_bounds.maximum_extent();
        let origin: Float = bounds.p_min[axis];
        let extent: Float = bounds.p_max[axis] - origin;
        if !(extent > 0.0 as Float) {
            return None;
        }
        let bin_size: Float = extent / N_SPATIAL_BINS as Float;
        let inv_bin_size: Float = 1.0 as Float / bin_size;
        let bin_index = |v: Float| -> usize {
            let b: usize = ((v - origin) * inv_bin_size).max(0.0 as Float) as usize;
            b.min(N_SPATIAL_BINS - 1)
        };
        let mut bins: [SpatialBin; N_SPATIAL_BINS] = [SpatialBin::default(); N_SPATIAL_BINS];
        for pi in primitive_info {
            let first: usize = bin_index(pi.bounds.p_min[axis]);
            let last: usize = bin_index(pi.bounds.p_max[axis]);
            bins[first].entry += 1;
            bins[last].exit += 1;
            if first == last {
                bins[first].bounds = bnd3_union_bnd3f(&bins[first].bounds, &pi.bounds);
                continue;
            }
            let p: [Point3f; 3] = self.mesh.vertices(pi.primitive_number);
            let mut current: Bounds3f = pi.bounds;
            for (j, bin) in bins.iter_mut().enumerate().take(last).skip(first) {
                let plane: Float = origin + (j + 1) as Float * bin_size;
                let (left, right) = split_triangle(&p, axis, plane);
                let piece: Bounds3f = bnd3_intersect_bnd3f(&left, &current);
                if piece.is_valid() {
                    bin.bounds = bnd3_union_bnd3f(&bin.bounds, &piece);
                }
                current = bnd3_intersect_bnd3f(&right, &current);
            }
            if current.is_valid() {
                bins[last].bounds = bnd3_union_bnd3f(&bins[last].bounds, &current);
            }
        }
        // running unions from the right
        let mut right_bounds: [Bounds3f; N_SPATIAL_BINS] = [Bounds3f::default(); N_SPATIAL_BINS];
        let mut acc: Bounds3f = Bounds3f::default();
        for i in (1..N_SPATIAL_BINS).rev() {
            acc = bnd3_union_bnd3f(&acc, &bins[i].bounds);
            right_bounds[i] = acc;
        }
        // sweep from the left
        let mut best: Option<SplitCandidate> = None;
        let mut left_bounds: Bounds3f = Bounds3f::default();
        let mut left_count: usize = 0;
        let mut right_count: usize = n;
        for i in 0..(N_SPATIAL_BINS - 1) {
            left_bounds = bnd3_union_bnd3f(&left_bounds, &bins[i].bounds);
            left_count += bins[i].entry;
            right_count -= bins[i].exit;
            if left_count == 0 || right_count == 0 {
                continue;
            }
            let cost: Float = 1.0
                + (left_count as Float * left_bounds.surface_area()
                    + right_count as Float * right_bounds[i + 1].surface_area())
                    / surface_area;
            if cost.is_finite() && best.map_or(true, |b| cost < b.cost) {
                best = Some(SplitCandidate {
                    cost,
                    overlap: 0.0 as Float,
                    kind: SplitKind::Spatial {
                        axis,
                        position: origin + (i + 1) as Float * bin_size,
                    },
                });
            }
        }
        best
    }
    /// Distribute the references to both sides of the plane. Straddling
    /// triangles are clipped and referenced on both sides, unless the
    /// clipped part on one side is empty.
    pub fn apply_spatial_split(
        &self,
        primitive_info: &[BVHPrimitiveInfo],
        axis: XYZEnum,
        position: Float,
    ) -> (Vec<BVHPrimitiveInfo>, Vec<BVHPrimitiveInfo>) {
        let mut left: Vec<BVHPrimitiveInfo> = Vec::with_capacity(primitive_info.len());
        let mut right: Vec<BVHPrimitiveInfo> = Vec::with_capacity(primitive_info.len());
        for pi in primitive_info {
            if pi.bounds.p_max[axis] <= position {
                left.push(*pi);
            } else if pi.bounds.p_min[axis] >= position {
                right.push(*pi);
            } else {
                let p: [Point3f; 3] = self.mesh.vertices(pi.primitive_number);
                let (lb, rb) = split_triangle(&p, axis, position);
                let lb: Bounds3f = bnd3_intersect_bnd3f(&lb, &pi.bounds);
                let rb: Bounds3f = bnd3_intersect_bnd3f(&rb, &pi.bounds);
                match (lb.is_valid(), rb.is_valid()) {
                    (true, true) => {
                        left.push(BVHPrimitiveInfo::new(
                            pi.primitive_number,
                            bnd3_expand(&lb, self.clip_epsilon),
                        ));
                        right.push(BVHPrimitiveInfo::new(
                            pi.primitive_number,
                            bnd3_expand(&rb, self.clip_epsilon),
                        ));
                    }
                    (false, true) => right.push(*pi),
                    _ => left.push(*pi),
                }
            }
        }
        (left, right)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::accelerators::bvh::SplitMethod;
    use crate::shapes::triangle::TriangleMesh;
    use approx::assert_relative_eq;

    fn p(x: Float, y: Float, z: Float) -> Point3f {
        Point3f { x, y, z }
    }

    #[test]
    fn split_triangle_at_plane() {
        let tri = [p(0.0, 0.0, 0.0), p(4.0, 0.0, 0.0), p(0.0, 4.0, 0.0)];
        let (left, right) = split_triangle(&tri, XYZEnum::X, 1.0);
        assert_relative_eq!(left.p_min.x, 0.0);
        assert_relative_eq!(left.p_max.x, 1.0);
        assert_relative_eq!(left.p_max.y, 4.0);
        assert_relative_eq!(right.p_min.x, 1.0);
        assert_relative_eq!(right.p_max.x, 4.0);
        // the crossing of edge (4,0)-(0,4) lies at y = 3
        assert_relative_eq!(right.p_max.y, 3.0);
        assert_relative_eq!(right.p_min.y, 0.0);
    }

    #[test]
    fn split_outside_triangle_leaves_one_side_empty() {
        let tri = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
        let (left, right) = split_triangle(&tri, XYZEnum::X, 2.0);
        assert!(left.is_valid());
        assert!(!right.is_valid());
    }

    #[test]
    fn long_triangles_get_split() {
        // long slivers along x, shifted a bit, all overlapping each other
        let mut vertex_indices = Vec::new();
        let mut points = Vec::new();
        for i in 0..8 {
            let x = i as Float * 10.0;
            let y = i as Float * 0.1;
            let first = points.len();
            points.push(p(x, y, 0.0));
            points.push(p(x + 100.0, y + 0.05, 0.0));
            points.push(p(x + 100.0, y, 1.0));
            vertex_indices.extend_from_slice(&[first, first + 1, first + 2]);
        }
        let mesh = TriangleMesh::new(vertex_indices, points, Vec::new(), Vec::new());
        let builder = BVHBuilder::new(&mesh, 1, SplitMethod::Sbvh);
        let pis = builder.primitive_info();
        let bounds = pis
            .iter()
            .fold(Bounds3f::default(), |b, pi| bnd3_union_bnd3f(&b, &pi.bounds));
        let centroids = pis
            .iter()
            .fold(Bounds3f::default(), |b, pi| bnd3_union_pnt3f(&b, &pi.centroid));
        let split = builder.find_spatial_split(&pis, &bounds, &centroids).unwrap();
        match split.kind {
            SplitKind::Spatial { axis, position } => {
                assert_eq!(axis, XYZEnum::X);
                let (left, right) = builder.apply_spatial_split(&pis, axis, position);
                assert!(left.len() + right.len() > 8);
                assert!(!left.is_empty() && left.len() < 8);
                for r in &left {
                    assert!(r.bounds.p_max.x <= position + 1e-3);
                }
                for r in &right {
                    assert!(r.bounds.p_min.x >= position - 1e-3);
                }
            }
            _ => panic!("expected a spatial split"),
        }
    }
}
