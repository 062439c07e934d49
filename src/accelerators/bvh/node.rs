//! The node store: a flat vector of nodes addressed by index. Each
//! interior node caches the boxes of both children, each node knows
//! its parent and which child slot of the parent it occupies.

// others
use smallvec::SmallVec;
// pbrt
use crate::accelerators::bvh::BVHAccel;
use crate::core::geometry::{bnd3_union_bnd3f, Bounds3f, Point3f};

/// A triangle stored inline in a leaf, vertices already resolved.
#[derive(Debug, Default, Copy, Clone)]
pub struct LeafTriangle {
    pub p: [Point3f; 3],
    /// index of the triangle within the mesh
    pub id: usize,
}

#[derive(Debug, Clone)]
pub enum NodeContent {
    Leaf(SmallVec<[LeafTriangle; 4]>),
    Interior {
        bounds: [Bounds3f; 2],
        children: [usize; 2],
    },
}

#[derive(Debug, Clone)]
pub struct BVHNode {
    pub parent: Option<usize>,
    pub index_as_child: u8,
    /// set while the optimizer has the node detached
    pub removed: bool,
    pub content: NodeContent,
}

impl BVHNode {
    pub fn new_leaf(triangles: SmallVec<[LeafTriangle; 4]>) -> Self {
        BVHNode {
            parent: None,
            index_as_child: 0_u8,
            removed: false,
            content: NodeContent::Leaf(triangles),
        }
    }
    pub fn new_interior(children: [usize; 2], bounds: [Bounds3f; 2]) -> Self {
        BVHNode {
            parent: None,
            index_as_child: 0_u8,
            removed: false,
            content: NodeContent::Interior { bounds, children },
        }
    }
    pub fn is_leaf(&self) -> bool {
        match self.content {
            NodeContent::Leaf(_) => true,
            NodeContent::Interior { .. } => false,
        }
    }
    pub fn children(&self) -> Option<[usize; 2]> {
        match self.content {
            NodeContent::Interior { children, .. } => Some(children),
            NodeContent::Leaf(_) => None,
        }
    }
    pub fn child_bounds(&self) -> Option<[Bounds3f; 2]> {
        match self.content {
            NodeContent::Interior { bounds, .. } => Some(bounds),
            NodeContent::Leaf(_) => None,
        }
    }
    pub fn triangles(&self) -> &[LeafTriangle] {
        match self.content {
            NodeContent::Leaf(ref triangles) => triangles.as_slice(),
            NodeContent::Interior { .. } => &[],
        }
    }
    /// Union of both cached child boxes; `None` for leaves.
    pub fn interior_bounds(&self) -> Option<Bounds3f> {
        self.child_bounds()
            .map(|b| bnd3_union_bnd3f(&b[0], &b[1]))
    }
}

impl BVHAccel {
    /// The box of node *n* as seen by its parent (the world bound for
    /// the root).
    pub fn node_bounds(&self, n: usize) -> Bounds3f {
        let node: &BVHNode = &self.nodes[n];
        match node.parent {
            Some(p) => match self.nodes[p].content {
                NodeContent::Interior { ref bounds, .. } => bounds[node.index_as_child as usize],
                NodeContent::Leaf(_) => panic!("parent {} of node {} is a leaf", p, n),
            },
            None => self.world_bound,
        }
    }
    /// Make *child* the child in *slot* of *parent*, caching *bounds*.
    pub(crate) fn set_child(&mut self, parent: usize, slot: u8, child: usize, bounds: Bounds3f) {
        assert!(slot < 2, "child slot {} out of range", slot);
        assert!(child < self.nodes.len(), "child {} outside node store", child);
        match self.nodes[parent].content {
            NodeContent::Interior {
                bounds: ref mut b,
                ref mut children,
            } => {
                b[slot as usize] = bounds;
                children[slot as usize] = child;
            }
            NodeContent::Leaf(_) => panic!("node {} is a leaf and can't take children", parent),
        }
        self.nodes[child].parent = Some(parent);
        self.nodes[child].index_as_child = slot;
    }
    /// Recompute the cached boxes on the path from interior node *n*
    /// up to the top of its tree, including the world bound if that is
    /// the root.
    pub(crate) fn refit_upwards(&mut self, n: usize) {
        let mut current: usize = n;
        loop {
            let bounds: Bounds3f = match self.nodes[current].interior_bounds() {
                Some(b) => b,
                None => self.node_bounds(current),
            };
            match self.nodes[current].parent {
                Some(p) => {
                    let slot: usize = self.nodes[current].index_as_child as usize;
                    if let NodeContent::Interior {
                        bounds: ref mut b, ..
                    } = self.nodes[p].content
                    {
                        b[slot] = bounds;
                    }
                    current = p;
                }
                None => {
                    // detached subtrees have no parent either
                    if current == self.root {
                        self.world_bound = bounds;
                    }
                    return;
                }
            }
        }
    }
}
