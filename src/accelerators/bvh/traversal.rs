//! Ray queries. Both walk the tree with a small explicit stack and a
//! cursor; the boxes of both children are tested before descending, so
//! leaf children never need a stack entry of their own.

// others
use smallvec::SmallVec;
// pbrt
use crate::accelerators::bvh::node::{LeafTriangle, NodeContent};
use crate::accelerators::bvh::BVHAccel;
use crate::core::geometry::{Ray, RayInverse};
use crate::core::interaction::SurfaceInteraction;
use crate::core::pbrt::Float;
use crate::shapes::triangle::{intersect_triangle, Triangle, TriangleHit};

type TraversalStack = SmallVec<[(usize, Float); 64]>;

impl BVHAccel {
    /// Closest hit along the ray. On success `ray.t_max` holds the hit
    /// distance and *isect* describes the hit point.
    pub fn intersect(&self, ray: &Ray, isect: &mut SurfaceInteraction) -> bool {
        let mut nodes_visited: usize = 0;
        match self.traverse(ray, false, &mut nodes_visited) {
            Some((id, hit)) => {
                *isect = Triangle::new(self.mesh.clone(), id).interaction(ray, &hit);
                isect.nodes_visited = nodes_visited;
                true
            }
            None => false,
        }
    }
    /// Is there any hit within `[ray.t_min, ray.t_max]`?
    pub fn hit(&self, ray: &Ray) -> bool {
        let mut nodes_visited: usize = 0;
        self.traverse(ray, true, &mut nodes_visited).is_some()
    }
    /// Like `hit()`, but also return the number of node boxes tested.
    pub fn hit_counted(&self, ray: &Ray) -> (bool, usize) {
        let mut nodes_visited: usize = 0;
        let hit: bool = self.traverse(ray, true, &mut nodes_visited).is_some();
        (hit, nodes_visited)
    }
    /// Closest-hit query returning the triangle index, its distance and
    /// the number of node boxes tested, hit or not.
    pub fn intersect_counted(&self, ray: &Ray) -> (Option<(usize, Float)>, usize) {
        let mut nodes_visited: usize = 0;
        let hit = self.traverse(ray, false, &mut nodes_visited);
        (hit.map(|(id, h)| (id, h.t)), nodes_visited)
    }
    /// Brute force closest hit over all triangles of the mesh, leaving
    /// *ray* untouched.
    pub fn intersect_linear(&self, ray: &Ray) -> Option<(usize, Float)> {
        let r: Ray = ray.clone();
        let mut closest: Option<(usize, Float)> = None;
        for id in 0..self.mesh.n_triangles {
            let [p0, p1, p2] = self.mesh.vertices(id);
            if let Some(hit) = intersect_triangle(&p0, &p1, &p2, &r) {
                r.t_max.set(hit.t);
                closest = Some((id, hit.t));
            }
        }
        closest
    }
    fn traverse(
        &self,
        ray: &Ray,
        any_hit: bool,
        nodes_visited: &mut usize,
    ) -> Option<(usize, TriangleHit)> {
        let inv: RayInverse = RayInverse::new(ray);
        *nodes_visited += 1;
        self.world_bound.intersect_p_ray(&inv, ray)?;
        let mut closest: Option<(usize, TriangleHit)> = None;
        let mut stack: TraversalStack = SmallVec::new();
        let mut current: usize = self.root;
        // every node becomes the cursor at most once
        let max_steps: usize = self.nodes.len();
        let mut steps: usize = 0;
        loop {
            steps += 1;
            if steps > max_steps {
                break;
            }
            match self.nodes[current].content {
                NodeContent::Leaf(ref triangles) => {
                    // only reached for a root leaf
                    if intersect_leaf(triangles, ray, any_hit, &mut closest) && any_hit {
                        return closest;
                    }
                }
                NodeContent::Interior {
                    ref bounds,
                    children,
                } => {
                    let mut next: [(usize, Float); 2] = [(0, 0.0); 2];
                    let mut n_next: usize = 0;
                    for slot in 0..2 {
                        *nodes_visited += 1;
                        let t: Float = match bounds[slot].intersect_p_ray(&inv, ray) {
                            Some(t) => t,
                            None => continue,
                        };
                        let c: usize = children[slot];
                        match self.nodes[c].content {
                            NodeContent::Leaf(ref triangles) => {
                                if intersect_leaf(triangles, ray, any_hit, &mut closest) && any_hit {
                                    return closest;
                                }
                            }
                            NodeContent::Interior { .. } => {
                                next[n_next] = (c, t);
                                n_next += 1;
                            }
                        }
                    }
                    match n_next {
                        2 => {
                            let (near, far) = if next[1].1 < next[0].1 {
                                (next[1], next[0])
                            } else {
                                (next[0], next[1])
                            };
                            stack.push(far);
                            current = near.0;
                            continue;
                        }
                        1 => {
                            current = next[0].0;
                            continue;
                        }
                        _ => {}
                    }
                }
            }
            // pop the next subtree the ray can still reach
            let mut popped: Option<usize> = None;
            while let Some((n, t)) = stack.pop() {
                if t <= ray.t_max.get() {
                    popped = Some(n);
                    break;
                }
            }
            match popped {
                Some(n) => current = n,
                None => break,
            }
        }
        closest
    }
}

/// Test all triangles of a leaf. For closest-hit queries every hit
/// shrinks `ray.t_max`.
fn intersect_leaf(
    triangles: &[LeafTriangle],
    ray: &Ray,
    any_hit: bool,
    closest: &mut Option<(usize, TriangleHit)>,
) -> bool {
    let mut found: bool = false;
    for tri in triangles {
        if let Some(hit) = intersect_triangle(&tri.p[0], &tri.p[1], &tri.p[2], ray) {
            *closest = Some((tri.id, hit));
            found = true;
            if any_hit {
                return true;
            }
            ray.t_max.set(hit.t);
        }
    }
    found
}
