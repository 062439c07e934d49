//! Bounding volume hierarchy over the triangles of a single mesh.
//!
//! The hierarchy is a binary tree stored in a flat node vector. It is
//! built top-down with one of three split policies (see
//! [`SplitMethod`]), can afterwards be improved by treelet
//! reinsertion (`optimize()`), and answers any-hit (`hit()`) and
//! closest-hit (`intersect()`) ray queries from many threads at once.

// std
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
// others
use log::{info, warn};
// pbrt
use crate::core::geometry::{bnd3_inside_bnd3, bnd3_intersect_bnd3f, bnd3_union_bnd3f, Bounds3f};
use crate::core::paramset::ParamSet;
use crate::core::pbrt::Float;
use crate::shapes::triangle::TriangleMesh;

pub mod build;
pub mod node;
pub mod optimize;
pub mod spatial;
pub mod traversal;

pub use self::build::MAX_BUILD_DEPTH;
pub use self::optimize::OptimizerSettings;
pub use self::spatial::SPATIAL_SPLIT_ALPHA;

use self::build::BVHBuilder;
use self::node::{BVHNode, NodeContent};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SplitMethod {
    /// binned SAH over 16 centroid buckets
    Binned,
    /// exhaustive SAH over all sorted split positions
    Sah,
    /// exhaustive SAH plus spatial splits
    Sbvh,
}

impl Default for SplitMethod {
    fn default() -> Self {
        SplitMethod::Sbvh
    }
}

impl SplitMethod {
    /// Parse one of `"binned"`, `"sah"` or `"sbvh"`; anything else
    /// falls back to spatial splits.
    pub fn from_name(name: &str) -> SplitMethod {
        match name {
            "binned" => SplitMethod::Binned,
            "sah" => SplitMethod::Sah,
            "sbvh" => SplitMethod::Sbvh,
            _ => {
                warn!("BVH split method {:?} unknown.  Using \"sbvh\".", name);
                SplitMethod::Sbvh
            }
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct BVHStats {
    pub n_interior: usize,
    pub n_leaves: usize,
    /// triangle references over all leaves, at least the triangle
    /// count once spatial splits duplicated some
    pub n_references: usize,
    pub max_depth: usize,
    pub max_leaf_size: usize,
    pub mean_leaf_size: Float,
}

pub struct BVHAccel {
    max_prims_in_node: usize,
    split_method: SplitMethod,
    pub mesh: Arc<TriangleMesh>,
    pub nodes: Vec<BVHNode>,
    pub root: usize,
    pub world_bound: Bounds3f,
}

impl BVHAccel {
    pub fn new(mesh: Arc<TriangleMesh>, max_prims_in_node: usize, split_method: SplitMethod) -> Self {
        assert!(
            mesh.n_triangles > 0,
            "can't build a BVH for a mesh without triangles"
        );
        let max_prims_in_node: usize = max_prims_in_node.clamp(1, 255);
        let start = Instant::now();
        let (nodes, root, world_bound, n_spatial_splits) = {
            let mut builder = BVHBuilder::new(&mesh, max_prims_in_node, split_method);
            let (root, world_bound) = builder.build();
            (builder.nodes, root, world_bound, builder.n_spatial_splits)
        };
        let bvh = BVHAccel {
            max_prims_in_node,
            split_method,
            mesh,
            nodes,
            root,
            world_bound,
        };
        let stats: BVHStats = bvh.stats();
        info!(
            "BVH ({:?}) over {} triangles: {} references, {} interior nodes, {} leaves, depth {}, {} spatial splits, SAH cost {:.3} [{:.3} s]",
            split_method,
            bvh.mesh.n_triangles,
            stats.n_references,
            stats.n_interior,
            stats.n_leaves,
            stats.max_depth,
            n_spatial_splits,
            bvh.sah_cost(),
            start.elapsed().as_secs_f32()
        );
        bvh
    }
    /// Build (and optionally optimize) from named parameters.
    pub fn create(mesh: Arc<TriangleMesh>, ps: &ParamSet) -> BVHAccel {
        let split_method_name: String = ps.find_one_string("splitmethod", String::from("sbvh"));
        let split_method: SplitMethod = SplitMethod::from_name(&split_method_name);
        let max_prims_in_node: i32 = ps.find_one_int("maxnodeprims", 64);
        let optimize_passes: i32 = ps.find_one_int("optimizepasses", 0);
        let batch_fraction: Float = ps.find_one_float("optimizebatch", 0.01);
        let seed: i32 = ps.find_one_int("seed", 0);
        ps.report_unused();
        let mut bvh = BVHAccel::new(mesh, max_prims_in_node.max(1) as usize, split_method);
        if optimize_passes > 0 {
            let settings = OptimizerSettings {
                max_passes: optimize_passes as usize,
                seed: seed as u64,
                batch_fraction,
                ..Default::default()
            };
            bvh.optimize(&settings);
        }
        bvh
    }
    pub fn max_prims_in_node(&self) -> usize {
        self.max_prims_in_node
    }
    pub fn split_method(&self) -> SplitMethod {
        self.split_method
    }
    pub fn world_bound(&self) -> Bounds3f {
        self.world_bound
    }
    /// Indices of all nodes reachable from the root, parents first.
    pub fn reachable(&self) -> Vec<usize> {
        let mut order: Vec<usize> = Vec::with_capacity(self.nodes.len());
        let mut todo: Vec<usize> = vec![self.root];
        while let Some(n) = todo.pop() {
            order.push(n);
            if let Some(children) = self.nodes[n].children() {
                todo.push(children[1]);
                todo.push(children[0]);
            }
        }
        order
    }
    /// Expected cost of a random ray query with unit traversal and
    /// intersection costs, relative to the root box.
    pub fn sah_cost(&self) -> Float {
        let root_area: Float = self.world_bound.surface_area();
        if root_area <= 0.0 as Float {
            return 0.0 as Float;
        }
        let mut cost: Float = 0.0;
        for n in self.reachable() {
            let area: Float = self.node_bounds(n).surface_area();
            match self.nodes[n].content {
                NodeContent::Leaf(ref triangles) => cost += area * triangles.len() as Float,
                NodeContent::Interior { .. } => cost += area,
            }
        }
        cost / root_area
    }
    /// Total structure cost minimized by `optimize()`: the surface area
    /// of every interior node weighted by the number of nodes below it,
    /// relative to the root box.
    pub fn tree_cost(&self) -> Float {
        let root_area: Float = self.world_bound.surface_area();
        if root_area <= 0.0 as Float {
            return 0.0 as Float;
        }
        let mut descendants: Vec<usize> = vec![0_usize; self.nodes.len()];
        let mut cost: Float = 0.0;
        // children before parents
        for n in self.reachable().into_iter().rev() {
            if let Some(children) = self.nodes[n].children() {
                descendants[n] = 2 + descendants[children[0]] + descendants[children[1]];
                cost += self.node_bounds(n).surface_area() * descendants[n] as Float;
            }
        }
        cost / root_area
    }
    pub fn stats(&self) -> BVHStats {
        let mut stats: BVHStats = BVHStats::default();
        let mut todo: Vec<(usize, usize)> = vec![(self.root, 0_usize)];
        while let Some((n, depth)) = todo.pop() {
            stats.max_depth = stats.max_depth.max(depth);
            match self.nodes[n].content {
                NodeContent::Leaf(ref triangles) => {
                    stats.n_leaves += 1;
                    stats.n_references += triangles.len();
                    stats.max_leaf_size = stats.max_leaf_size.max(triangles.len());
                }
                NodeContent::Interior { children, .. } => {
                    stats.n_interior += 1;
                    todo.push((children[0], depth + 1));
                    todo.push((children[1], depth + 1));
                }
            }
        }
        if stats.n_leaves > 0 {
            stats.mean_leaf_size = stats.n_references as Float / stats.n_leaves as Float;
        }
        stats
    }
    /// Check the structure of the tree and report the first broken
    /// invariant.
    pub fn validate(&self) -> Result<(), String> {
        let n_nodes: usize = self.nodes.len();
        if self.root >= n_nodes {
            return Err(format!("root {} outside node store of {}", self.root, n_nodes));
        }
        if self.nodes[self.root].parent.is_some() {
            return Err(format!("root {} has a parent", self.root));
        }
        let clipped: bool = self.split_method == SplitMethod::Sbvh;
        let mut visited: Vec<bool> = vec![false; n_nodes];
        let mut covered: HashSet<usize> = HashSet::with_capacity(self.mesh.n_triangles);
        let mut todo: Vec<usize> = vec![self.root];
        let mut bounds: Bounds3f = Bounds3f::default();
        while let Some(n) = todo.pop() {
            if visited[n] {
                return Err(format!("node {} is reachable twice", n));
            }
            visited[n] = true;
            let node: &BVHNode = &self.nodes[n];
            if node.removed {
                return Err(format!("node {} is reachable but marked removed", n));
            }
            match node.content {
                NodeContent::Leaf(ref triangles) => {
                    if triangles.is_empty() {
                        return Err(format!("leaf {} is empty", n));
                    }
                    let node_bounds: Bounds3f = self.node_bounds(n);
                    for tri in triangles.iter() {
                        if tri.id >= self.mesh.n_triangles {
                            return Err(format!("leaf {} references triangle {}", n, tri.id));
                        }
                        covered.insert(tri.id);
                        let tb: Bounds3f = self.mesh.triangle_bound(tri.id);
                        if !tb.is_valid() {
                            continue;
                        }
                        if clipped {
                            // a clipped reference still covers part of its triangle
                            if !bnd3_intersect_bnd3f(&tb, &node_bounds).is_valid() {
                                return Err(format!(
                                    "triangle {} doesn't overlap leaf {} box",
                                    tri.id, n
                                ));
                            }
                        } else if !bnd3_inside_bnd3(&tb, &node_bounds) {
                            return Err(format!(
                                "triangle {} sticks out of leaf {} box",
                                tri.id, n
                            ));
                        }
                    }
                }
                NodeContent::Interior {
                    bounds: child_bounds,
                    children,
                } => {
                    for slot in 0..2 {
                        let c: usize = children[slot];
                        if c >= n_nodes {
                            return Err(format!("node {} has child {} outside store", n, c));
                        }
                        let child: &BVHNode = &self.nodes[c];
                        if child.parent != Some(n) || child.index_as_child as usize != slot {
                            return Err(format!(
                                "child {} of node {} has back-pointer {:?}/{}",
                                c, n, child.parent, child.index_as_child
                            ));
                        }
                        if let Some(inner) = child.interior_bounds() {
                            if !bnd3_inside_bnd3(&inner, &child_bounds[slot]) {
                                return Err(format!(
                                    "box of node {} not contained in slot {} of node {}",
                                    c, slot, n
                                ));
                            }
                        }
                        todo.push(c);
                    }
                    if n == self.root {
                        bounds = bnd3_union_bnd3f(&child_bounds[0], &child_bounds[1]);
                    }
                }
            }
        }
        if !self.nodes[self.root].is_leaf() && !bnd3_inside_bnd3(&bounds, &self.world_bound) {
            return Err(String::from("world bound doesn't contain the root's children"));
        }
        if covered.len() != self.mesh.n_triangles {
            return Err(format!(
                "only {} of {} triangles are referenced",
                covered.len(),
                self.mesh.n_triangles
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shapes::boxes::create_box_grid;

    #[test]
    fn split_method_names() {
        assert_eq!(SplitMethod::from_name("binned"), SplitMethod::Binned);
        assert_eq!(SplitMethod::from_name("sah"), SplitMethod::Sah);
        assert_eq!(SplitMethod::from_name("sbvh"), SplitMethod::Sbvh);
        assert_eq!(SplitMethod::from_name("hlbvh"), SplitMethod::Sbvh);
    }

    #[test]
    fn builds_are_valid() {
        let mesh = Arc::new(create_box_grid(4, 1.0, 1.5));
        for &method in &[SplitMethod::Binned, SplitMethod::Sah, SplitMethod::Sbvh] {
            let bvh = BVHAccel::new(mesh.clone(), 4, method);
            assert_eq!(bvh.validate(), Ok(()), "{:?}", method);
            let stats = bvh.stats();
            assert_eq!(stats.n_leaves, stats.n_interior + 1);
            assert!(stats.n_references >= mesh.n_triangles);
            assert!(stats.max_leaf_size <= 4);
            assert!(stats.max_depth <= MAX_BUILD_DEPTH);
            assert!(bvh.sah_cost() > 0.0);
        }
    }

    #[test]
    fn misplaced_leaf_boxes_are_reported() {
        let mesh = Arc::new(create_box_grid(3, 1.0, 2.0));
        for &method in &[SplitMethod::Sah, SplitMethod::Sbvh] {
            let mut bvh = BVHAccel::new(mesh.clone(), 2, method);
            let leaf: usize = bvh
                .reachable()
                .into_iter()
                .find(|&n| bvh.nodes[n].is_leaf())
                .unwrap();
            let parent: usize = bvh.nodes[leaf].parent.unwrap();
            let slot: usize = bvh.nodes[leaf].index_as_child as usize;
            let far = Bounds3f::new(
                crate::core::geometry::Point3f {
                    x: 100.0,
                    y: 100.0,
                    z: 100.0,
                },
                crate::core::geometry::Point3f {
                    x: 101.0,
                    y: 101.0,
                    z: 101.0,
                },
            );
            if let NodeContent::Interior { ref mut bounds, .. } = bvh.nodes[parent].content {
                bounds[slot] = far;
            }
            assert!(bvh.validate().is_err(), "{:?}", method);
        }
    }

    #[test]
    fn single_triangle_is_a_leaf() {
        let mesh = Arc::new(TriangleMesh::new(
            vec![0, 1, 2],
            vec![
                crate::core::geometry::Point3f {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                },
                crate::core::geometry::Point3f {
                    x: 1.0,
                    y: 0.0,
                    z: 0.0,
                },
                crate::core::geometry::Point3f {
                    x: 0.0,
                    y: 1.0,
                    z: 0.0,
                },
            ],
            Vec::new(),
            Vec::new(),
        ));
        let bvh = BVHAccel::new(mesh, 4, SplitMethod::Sbvh);
        assert_eq!(bvh.nodes.len(), 1);
        assert!(bvh.nodes[bvh.root].is_leaf());
        assert_eq!(bvh.validate(), Ok(()));
        // flat box got widened
        assert!(bvh.world_bound().surface_area() > 0.0);
    }

    #[test]
    fn tree_cost_weights_interior_nodes() {
        // two triangles far apart end up in two leaves below the root
        let p = |x: Float| crate::core::geometry::Point3f { x, y: 0.0, z: 0.0 };
        let q = |x: Float| crate::core::geometry::Point3f { x, y: 1.0, z: 1.0 };
        let r = |x: Float| crate::core::geometry::Point3f { x, y: 1.0, z: 0.0 };
        let mesh = Arc::new(TriangleMesh::new(
            vec![0, 1, 2, 3, 4, 5],
            vec![p(0.0), q(0.0), r(0.5), p(10.0), q(10.0), r(10.5)],
            Vec::new(),
            Vec::new(),
        ));
        let bvh = BVHAccel::new(mesh, 1, SplitMethod::Sah);
        assert_eq!(bvh.stats().n_interior, 1);
        assert!((bvh.tree_cost() - 2.0).abs() < 1e-6);
        // the leaves' own areas add to the SAH cost only
        assert!(bvh.sah_cost() > 1.0);
    }

    #[test]
    fn create_reads_parameters() {
        let mesh = Arc::new(create_box_grid(2, 1.0, 2.0));
        let mut ps = ParamSet::default();
        ps.add_string(String::from("splitmethod"), String::from("binned"));
        ps.add_int(String::from("maxnodeprims"), 2);
        let bvh = BVHAccel::create(mesh, &ps);
        assert_eq!(bvh.split_method(), SplitMethod::Binned);
        assert_eq!(bvh.max_prims_in_node(), 2);
        assert!(ps.unused().is_empty());
        assert!(bvh.stats().max_leaf_size <= 2);
    }

    #[test]
    #[should_panic]
    fn empty_mesh_panics() {
        let mesh = Arc::new(TriangleMesh::new(Vec::new(), Vec::new(), Vec::new(), Vec::new()));
        BVHAccel::new(mesh, 4, SplitMethod::Sbvh);
    }
}
