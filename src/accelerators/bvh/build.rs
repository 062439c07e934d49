//! Top-down construction. Each recursion step bounds its primitive
//! references, asks the selected split policy for the cheapest
//! partition according to the surface area heuristic (SAH), and
//! either emits a leaf or builds both children before appending the
//! interior node itself. The root therefore ends up as the last node.

// std
use std::cmp::Ordering;
// others
use smallvec::SmallVec;
use strum::IntoEnumIterator;
// pbrt
use crate::accelerators::bvh::node::{BVHNode, LeafTriangle};
use crate::accelerators::bvh::spatial::SPATIAL_SPLIT_ALPHA;
use crate::accelerators::bvh::SplitMethod;
use crate::core::geometry::{
    bnd3_overlap_area, bnd3_union_bnd3f, bnd3_union_pnt3f, Bounds3f, Point3f, XYZEnum,
};
use crate::core::pbrt::Float;
use crate::shapes::triangle::TriangleMesh;

/// Recursion deeper than this always emits a leaf.
pub const MAX_BUILD_DEPTH: usize = 64;
const N_BUCKETS: usize = 16;

#[derive(Debug, Default, Copy, Clone)]
pub struct BVHPrimitiveInfo {
    pub primitive_number: usize,
    pub bounds: Bounds3f,
    pub centroid: Point3f,
}

impl BVHPrimitiveInfo {
    pub fn new(primitive_number: usize, bounds: Bounds3f) -> Self {
        BVHPrimitiveInfo {
            primitive_number,
            bounds,
            centroid: bounds.centroid(),
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct BucketInfo {
    count: usize,
    bounds: Bounds3f,
}

impl Default for BucketInfo {
    fn default() -> Self {
        BucketInfo {
            count: 0_usize,
            bounds: Bounds3f::default(),
        }
    }
}

/// Which bound of a reference the exhaustive sweep sorts by.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SortKey {
    Lower,
    Upper,
}

#[derive(Debug, Copy, Clone)]
pub enum SplitKind {
    /// centroid buckets `0..=bucket` go left
    Bucket {
        axis: XYZEnum,
        bucket: usize,
        centroid_bounds: Bounds3f,
    },
    /// the first *index* references in key order go left
    Object {
        axis: XYZEnum,
        key: SortKey,
        index: usize,
    },
    /// plane at *position*, straddlers go both ways
    Spatial { axis: XYZEnum, position: Float },
    /// centroid median, used to enforce the leaf size limit
    Median { axis: XYZEnum },
}

#[derive(Debug, Copy, Clone)]
pub struct SplitCandidate {
    pub cost: Float,
    /// surface area of the intersection of both child boxes
    pub overlap: Float,
    pub kind: SplitKind,
}

fn better(best: &Option<SplitCandidate>, cost: Float) -> bool {
    cost.is_finite() && best.map_or(true, |b| cost < b.cost)
}

fn sort_key(pi: &BVHPrimitiveInfo, axis: XYZEnum, key: SortKey) -> Float {
    match key {
        SortKey::Lower => pi.bounds.p_min[axis],
        SortKey::Upper => pi.bounds.p_max[axis],
    }
}

fn cmp_float(a: Float, b: Float) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn bucket_index(centroid_bounds: &Bounds3f, centroid: &Point3f, axis: XYZEnum) -> usize {
    let b: usize = (N_BUCKETS as Float * centroid_bounds.offset(centroid)[axis]) as usize;
    b.min(N_BUCKETS - 1)
}

pub struct BVHBuilder<'a> {
    pub(super) mesh: &'a TriangleMesh,
    max_prims_in_node: usize,
    split_method: SplitMethod,
    root_surface_area: Float,
    /// padding applied to clipped reference boxes
    pub(super) clip_epsilon: Float,
    pub nodes: Vec<BVHNode>,
    pub n_references: usize,
    pub n_spatial_splits: usize,
    pub max_depth: usize,
}

impl<'a> BVHBuilder<'a> {
    pub fn new(mesh: &'a TriangleMesh, max_prims_in_node: usize, split_method: SplitMethod) -> Self {
        let world: Bounds3f = mesh.world_bound();
        let mut diagonal: Float = world.diagonal().length();
        if !diagonal.is_finite() || diagonal <= 0.0 as Float {
            diagonal = 1.0 as Float;
        }
        BVHBuilder {
            mesh,
            max_prims_in_node: max_prims_in_node.max(1),
            split_method,
            root_surface_area: 0.0 as Float,
            clip_epsilon: diagonal * 1e-6 as Float,
            nodes: Vec::with_capacity(2 * mesh.n_triangles),
            n_references: 0_usize,
            n_spatial_splits: 0_usize,
            max_depth: 0_usize,
        }
    }
    /// One reference per triangle; degenerate boxes are widened.
    pub fn primitive_info(&self) -> Vec<BVHPrimitiveInfo> {
        (0..self.mesh.n_triangles)
            .map(|i| {
                let bounds: Bounds3f = self.mesh.triangle_bound(i).fix_degenerate(self.clip_epsilon);
                BVHPrimitiveInfo::new(i, bounds)
            })
            .collect()
    }
    /// Build the whole hierarchy; returns the root index and its box.
    pub fn build(&mut self) -> (usize, Bounds3f) {
        let primitive_info: Vec<BVHPrimitiveInfo> = self.primitive_info();
        let world: Bounds3f = primitive_info
            .iter()
            .fold(Bounds3f::default(), |b, pi| bnd3_union_bnd3f(&b, &pi.bounds));
        self.root_surface_area = world.surface_area();
        self.recursive_build(primitive_info, 0_usize)
    }
    fn recursive_build(
        &mut self,
        mut primitive_info: Vec<BVHPrimitiveInfo>,
        depth: usize,
    ) -> (usize, Bounds3f) {
        assert!(!primitive_info.is_empty(), "can't build a node without primitives");
        self.max_depth = self.max_depth.max(depth);
        // compute bounds of all primitives in BVH node
        let bounds: Bounds3f = primitive_info
            .iter()
            .fold(Bounds3f::default(), |b, pi| bnd3_union_bnd3f(&b, &pi.bounds));
        let n_primitives: usize = primitive_info.len();
        if n_primitives == 1 || depth >= MAX_BUILD_DEPTH {
            return (self.make_leaf(&primitive_info), bounds);
        }
        let centroid_bounds: Bounds3f = primitive_info
            .iter()
            .fold(Bounds3f::default(), |b, pi| bnd3_union_pnt3f(&b, &pi.centroid));
        let leaf_cost: Float = n_primitives as Float;
        let must_split: bool = n_primitives > self.max_prims_in_node;
        let object_split: Option<SplitCandidate> = match self.split_method {
            SplitMethod::Binned => self.find_bucket_split(&primitive_info, &bounds, &centroid_bounds),
            SplitMethod::Sah | SplitMethod::Sbvh => self.find_object_split(&primitive_info, &bounds),
        };
        if self.split_method == SplitMethod::Sbvh && self.root_surface_area > 0.0 as Float {
            let overlap: Float = object_split.map_or(0.0 as Float, |s| s.overlap);
            if overlap / self.root_surface_area > SPATIAL_SPLIT_ALPHA {
                if let Some(spatial) =
                    self.find_spatial_split(&primitive_info, &bounds, &centroid_bounds)
                {
                    let cheaper: bool = object_split.map_or(true, |o| spatial.cost < o.cost);
                    if cheaper && (spatial.cost < leaf_cost || must_split) {
                        if let SplitKind::Spatial { axis, position } = spatial.kind {
                            let (left, right) =
                                self.apply_spatial_split(&primitive_info, axis, position);
                            if !left.is_empty()
                                && !right.is_empty()
                                && left.len() < n_primitives
                                && right.len() < n_primitives
                            {
                                self.n_spatial_splits += 1;
                                return self.build_interior(left, right, depth);
                            }
                        }
                    }
                }
            }
        }
        let split: SplitCandidate = match object_split {
            Some(s) if s.cost < leaf_cost || must_split => s,
            None if must_split => SplitCandidate {
                cost: std::f32::INFINITY,
                overlap: 0.0 as Float,
                kind: SplitKind::Median {
                    axis: centroid_bounds.maximum_extent(),
                },
            },
            // create leaf
            _ => return (self.make_leaf(&primitive_info), bounds),
        };
        let right: Vec<BVHPrimitiveInfo> = partition(&mut primitive_info, &split.kind);
        self.build_interior(primitive_info, right, depth)
    }
    fn build_interior(
        &mut self,
        left: Vec<BVHPrimitiveInfo>,
        right: Vec<BVHPrimitiveInfo>,
        depth: usize,
    ) -> (usize, Bounds3f) {
        let (c0, b0) = self.recursive_build(left, depth + 1);
        let (c1, b1) = self.recursive_build(right, depth + 1);
        let index: usize = self.nodes.len();
        self.nodes.push(BVHNode::new_interior([c0, c1], [b0, b1]));
        self.nodes[c0].parent = Some(index);
        self.nodes[c0].index_as_child = 0_u8;
        self.nodes[c1].parent = Some(index);
        self.nodes[c1].index_as_child = 1_u8;
        (index, bnd3_union_bnd3f(&b0, &b1))
    }
    fn make_leaf(&mut self, primitive_info: &[BVHPrimitiveInfo]) -> usize {
        let triangles: SmallVec<[LeafTriangle; 4]> = primitive_info
            .iter()
            .map(|pi| LeafTriangle {
                p: self.mesh.vertices(pi.primitive_number),
                id: pi.primitive_number,
            })
            .collect();
        self.n_references += triangles.len();
        self.nodes.push(BVHNode::new_leaf(triangles));
        self.nodes.len() - 1
    }
    /// Binned SAH over centroid buckets on every axis with a non-zero
    /// centroid extent.
    pub fn find_bucket_split(
        &self,
        primitive_info: &[BVHPrimitiveInfo],
        bounds: &Bounds3f,
        centroid_bounds: &Bounds3f,
    ) -> Option<SplitCandidate> {
        let surface_area: Float = bounds.surface_area();
        if surface_area <= 0.0 as Float {
            return None;
        }
        let mut best: Option<SplitCandidate> = None;
        for axis in XYZEnum::iter() {
            if centroid_bounds.p_max[axis] <= centroid_bounds.p_min[axis] {
                continue;
            }
            // initialize _BucketInfo_ for SAH partition buckets
            let mut buckets: [BucketInfo; N_BUCKETS] = [BucketInfo::default(); N_BUCKETS];
            for pi in primitive_info {
                let b: usize = bucket_index(centroid_bounds, &pi.centroid, axis);
                buckets[b].count += 1;
                buckets[b].bounds = bnd3_union_bnd3f(&buckets[b].bounds, &pi.bounds);
            }
            // running unions from the right
            let mut right_area: [Float; N_BUCKETS] = [0.0; N_BUCKETS];
            let mut right_count: [usize; N_BUCKETS] = [0; N_BUCKETS];
            let mut b1: Bounds3f = Bounds3f::default();
            let mut count1: usize = 0;
            for i in (1..N_BUCKETS).rev() {
                b1 = bnd3_union_bnd3f(&b1, &buckets[i].bounds);
                count1 += buckets[i].count;
                right_area[i] = b1.surface_area();
                right_count[i] = count1;
            }
            // compute costs for splitting after each bucket
            let mut b0: Bounds3f = Bounds3f::default();
            let mut count0: usize = 0;
            for i in 0..(N_BUCKETS - 1) {
                b0 = bnd3_union_bnd3f(&b0, &buckets[i].bounds);
                count0 += buckets[i].count;
                let count1: usize = right_count[i + 1];
                if count0 == 0 || count1 == 0 {
                    continue;
                }
                let cost: Float = 1.0
                    + (count0 as Float * b0.surface_area()
                        + count1 as Float * right_area[i + 1])
                        / surface_area;
                if better(&best, cost) {
                    best = Some(SplitCandidate {
                        cost,
                        overlap: 0.0 as Float,
                        kind: SplitKind::Bucket {
                            axis,
                            bucket: i,
                            centroid_bounds: *centroid_bounds,
                        },
                    });
                }
            }
        }
        best
    }
    /// Exhaustive SAH: every split index after sorting by the lower
    /// and by the upper bound on each axis. Reports the overlap of the
    /// winning child boxes.
    pub fn find_object_split(
        &self,
        primitive_info: &[BVHPrimitiveInfo],
        bounds: &Bounds3f,
    ) -> Option<SplitCandidate> {
        let n: usize = primitive_info.len();
        let surface_area: Float = bounds.surface_area();
        if n < 2 || surface_area <= 0.0 as Float {
            return None;
        }
        let mut order: Vec<usize> = (0..n).collect();
        let mut right_bounds: Vec<Bounds3f> = vec![Bounds3f::default(); n];
        let mut best: Option<SplitCandidate> = None;
        let mut best_boxes: (Bounds3f, Bounds3f) = (Bounds3f::default(), Bounds3f::default());
        for axis in XYZEnum::iter() {
            for &key in &[SortKey::Lower, SortKey::Upper] {
                order.sort_unstable_by(|&a, &b| {
                    cmp_float(
                        sort_key(&primitive_info[a], axis, key),
                        sort_key(&primitive_info[b], axis, key),
                    )
                });
                let mut acc: Bounds3f = Bounds3f::default();
                for i in (1..n).rev() {
                    acc = bnd3_union_bnd3f(&acc, &primitive_info[order[i]].bounds);
                    right_bounds[i] = acc;
                }
                acc = Bounds3f::default();
                for i in 1..n {
                    acc = bnd3_union_bnd3f(&acc, &primitive_info[order[i - 1]].bounds);
                    let cost: Float = 1.0
                        + (i as Float * acc.surface_area()
                            + (n - i) as Float * right_bounds[i].surface_area())
                            / surface_area;
                    if better(&best, cost) {
                        best = Some(SplitCandidate {
                            cost,
                            overlap: 0.0 as Float,
                            kind: SplitKind::Object {
                                axis,
                                key,
                                index: i,
                            },
                        });
                        best_boxes = (acc, right_bounds[i]);
                    }
                }
            }
        }
        best.map(|mut s| {
            s.overlap = bnd3_overlap_area(&best_boxes.0, &best_boxes.1);
            s
        })
    }
}

/// Reorder *primitive_info* for a non-spatial split; the left part
/// stays in place, the right part is returned.
fn partition(primitive_info: &mut Vec<BVHPrimitiveInfo>, kind: &SplitKind) -> Vec<BVHPrimitiveInfo> {
    match *kind {
        SplitKind::Bucket {
            axis,
            bucket,
            ref centroid_bounds,
        } => {
            let (left, right): (Vec<BVHPrimitiveInfo>, Vec<BVHPrimitiveInfo>) = primitive_info
                .drain(..)
                .partition(|pi| bucket_index(centroid_bounds, &pi.centroid, axis) <= bucket);
            *primitive_info = left;
            right
        }
        SplitKind::Object { axis, key, index } => {
            primitive_info.select_nth_unstable_by(index, |a, b| {
                cmp_float(sort_key(a, axis, key), sort_key(b, axis, key))
            });
            primitive_info.split_off(index)
        }
        SplitKind::Median { axis } => {
            let mid: usize = primitive_info.len() / 2;
            primitive_info
                .select_nth_unstable_by(mid, |a, b| cmp_float(a.centroid[axis], b.centroid[axis]));
            primitive_info.split_off(mid)
        }
        SplitKind::Spatial { .. } => panic!("spatial splits duplicate references"),
    }
}
