//! Post-build optimization by reinsertion: badly placed interior nodes
//! are taken out of the tree together with their parent, and their two
//! subtrees are put back wherever the SAH cost grows least.

// std
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;
// others
use log::{debug, info, warn};
// pbrt
use crate::accelerators::bvh::node::BVHNode;
use crate::accelerators::bvh::BVHAccel;
use crate::core::geometry::{bnd3_overlap_area, bnd3_union_bnd3f, Bounds3f};
use crate::core::pbrt::Float;
use crate::core::rng::Rng;

/// How many passes between two convergence checks.
const CHECK_INTERVAL: usize = 5;

#[derive(Debug, Copy, Clone)]
pub struct OptimizerSettings {
    /// upper limit on the number of passes
    pub max_passes: usize,
    /// seeds the random node selection
    pub seed: u64,
    /// fraction of the interior nodes reinserted per pass
    pub batch_fraction: Float,
    /// relative cost improvement per check below which the tree counts
    /// as converged
    pub convergence_threshold: Float,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        OptimizerSettings {
            max_passes: 256_usize,
            seed: 0_u64,
            batch_fraction: 0.01 as Float,
            convergence_threshold: 1e-3 as Float,
        }
    }
}

/// Search front entry, ordered so that `BinaryHeap` pops the smallest
/// induced cost first.
#[derive(Debug, Copy, Clone)]
struct InsertionCandidate {
    induced: Float,
    node: usize,
}

impl PartialEq for InsertionCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for InsertionCandidate {}

impl PartialOrd for InsertionCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InsertionCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .induced
            .partial_cmp(&self.induced)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

fn nan_to_zero(v: Float) -> Float {
    if v.is_nan() {
        0.0 as Float
    } else {
        v
    }
}

impl BVHAccel {
    /// Improve the tree by repeatedly removing and reinserting batches
    /// of interior nodes. A pass which makes the tree worse is undone,
    /// so `tree_cost()` never increases.
    pub fn optimize(&mut self, settings: &OptimizerSettings) {
        if self.nodes[self.root].is_leaf() {
            return;
        }
        let start = Instant::now();
        let mut rng: Rng = Rng::new(settings.seed);
        let initial_cost: Float = self.tree_cost();
        let mut cost: Float = initial_cost;
        let mut last_check_cost: Float = cost;
        let mut slow_checks: usize = 0;
        let mut n_passes: usize = 0;
        let mut n_rollbacks: usize = 0;
        for pass in 0..settings.max_passes {
            let random: bool = pass % 3 == 2;
            let batch: Vec<usize> = self.select_batch(settings.batch_fraction, random, &mut rng);
            if batch.is_empty() {
                debug!("pass {}: nothing left to reinsert", pass);
                break;
            }
            let snapshot: (Vec<BVHNode>, usize, Bounds3f) =
                (self.nodes.clone(), self.root, self.world_bound);
            let mut loose: Vec<(usize, Bounds3f)> = Vec::with_capacity(2 * batch.len());
            let mut free: Vec<usize> = Vec::with_capacity(2 * batch.len());
            for &n in &batch {
                if self.is_removable(n) {
                    self.detach(n, &mut loose, &mut free);
                }
            }
            // biggest subtrees first
            let mut loose: Vec<(usize, Bounds3f, Float)> = loose
                .into_iter()
                .map(|(n, stored)| {
                    let b: Bounds3f = self.nodes[n].interior_bounds().unwrap_or(stored);
                    (n, b, b.surface_area())
                })
                .collect();
            loose.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
            for (n, b, _area) in loose {
                // subtrees reinserted before may have shrunk this one
                let b: Bounds3f = self.nodes[n].interior_bounds().unwrap_or(b);
                let target: usize = match self.find_insertion_target(&b) {
                    Some(x) => x,
                    None => {
                        warn!("no insertion target for node {}, using the root", n);
                        self.root
                    }
                };
                let slot: usize = match free.pop() {
                    Some(slot) => slot,
                    None => {
                        self.nodes.push(BVHNode::new_interior([0, 0], [Bounds3f::default(); 2]));
                        self.nodes.len() - 1
                    }
                };
                self.insert(n, &b, target, slot);
            }
            let new_cost: Float = self.tree_cost();
            n_passes += 1;
            if !(new_cost <= cost) {
                debug!(
                    "pass {}: cost {:.4} -> {:.4}, rolled back",
                    pass, cost, new_cost
                );
                self.nodes = snapshot.0;
                self.root = snapshot.1;
                self.world_bound = snapshot.2;
                n_rollbacks += 1;
            } else {
                debug!(
                    "pass {} ({} selection, {} nodes): cost {:.4} -> {:.4}",
                    pass,
                    if random { "random" } else { "worst" },
                    batch.len(),
                    cost,
                    new_cost
                );
                cost = new_cost;
            }
            if (pass + 1) % CHECK_INTERVAL == 0 {
                let improvement: Float = if last_check_cost > 0.0 as Float {
                    (last_check_cost - cost) / last_check_cost
                } else {
                    0.0 as Float
                };
                debug!("convergence check: relative improvement {:.6}", improvement);
                if improvement < settings.convergence_threshold {
                    slow_checks += 1;
                    if slow_checks >= 2 {
                        break;
                    }
                } else {
                    slow_checks = 0;
                }
                last_check_cost = cost;
            }
        }
        info!(
            "BVH optimized in {} passes ({} rolled back): tree cost {:.3} -> {:.3}, SAH cost {:.3} [{:.3} s]",
            n_passes,
            n_rollbacks,
            initial_cost,
            cost,
            self.sah_cost(),
            start.elapsed().as_secs_f32()
        );
    }
    /// Interior nodes with a live parent and a live grandparent, none of
    /// them the root, can be taken out of the tree.
    fn is_removable(&self, n: usize) -> bool {
        let node: &BVHNode = &self.nodes[n];
        if node.removed || node.is_leaf() || n == self.root {
            return false;
        }
        let p: usize = match node.parent {
            Some(p) if !self.nodes[p].removed => p,
            _ => return false,
        };
        match self.nodes[p].parent {
            Some(g) => g != self.root && !self.nodes[g].removed,
            None => false,
        }
    }
    /// How badly node *n* is placed: large compared to its children,
    /// and with overlapping children.
    fn inefficiency(&self, n: usize) -> Float {
        let bounds: [Bounds3f; 2] = match self.nodes[n].child_bounds() {
            Some(b) => b,
            None => return 0.0 as Float,
        };
        let area: Float = self.node_bounds(n).surface_area();
        let a0: Float = bounds[0].surface_area();
        let a1: Float = bounds[1].surface_area();
        let m_min: Float = area / a0.min(a1);
        let m_sum: Float = area / (0.5 as Float * (a0 + a1));
        let overlap: Float = bnd3_overlap_area(&bounds[0], &bounds[1]) / area;
        nan_to_zero(m_min * m_sum * (1.0 as Float + nan_to_zero(overlap)))
    }
    fn select_batch(&self, batch_fraction: Float, random: bool, rng: &mut Rng) -> Vec<usize> {
        let reachable: Vec<usize> = self.reachable();
        let n_interior: usize = reachable
            .iter()
            .filter(|&&n| !self.nodes[n].is_leaf())
            .count();
        let mut candidates: Vec<usize> = reachable
            .into_iter()
            .filter(|&n| self.is_removable(n))
            .collect();
        let batch_size: usize = ((n_interior as Float * batch_fraction) as usize)
            .max(1)
            .min(candidates.len());
        if batch_size == 0 {
            return Vec::new();
        }
        if random {
            rng.shuffle(&mut candidates);
            candidates.truncate(batch_size);
            candidates
        } else {
            let mut scored: Vec<(Float, usize)> = candidates
                .into_iter()
                .map(|n| (self.inefficiency(n), n))
                .collect();
            // worst first
            scored.select_nth_unstable_by(batch_size - 1, |a, b| {
                b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal)
            });
            scored.truncate(batch_size);
            scored.into_iter().map(|(_, n)| n).collect()
        }
    }
    /// Take node *l* and its parent out of the tree; the sibling of *l*
    /// takes the parent's place. The children of *l* become loose.
    fn detach(&mut self, l: usize, loose: &mut Vec<(usize, Bounds3f)>, free: &mut Vec<usize>) {
        let p: usize = match self.nodes[l].parent {
            Some(p) => p,
            None => return,
        };
        let g: usize = match self.nodes[p].parent {
            Some(g) => g,
            None => return,
        };
        let (children, bounds) = match (self.nodes[l].children(), self.nodes[l].child_bounds()) {
            (Some(c), Some(b)) => (c, b),
            _ => return,
        };
        let (p_children, p_bounds) = match (self.nodes[p].children(), self.nodes[p].child_bounds()) {
            (Some(c), Some(b)) => (c, b),
            _ => return,
        };
        let sibling_slot: usize = 1 - self.nodes[l].index_as_child as usize;
        let p_slot: u8 = self.nodes[p].index_as_child;
        self.set_child(g, p_slot, p_children[sibling_slot], p_bounds[sibling_slot]);
        self.refit_upwards(g);
        for slot in 0..2 {
            self.nodes[children[slot]].parent = None;
            loose.push((children[slot], bounds[slot]));
        }
        for &n in &[l, p] {
            self.nodes[n].removed = true;
            self.nodes[n].parent = None;
            free.push(n);
        }
    }
    /// Branch and bound search for the node whose replacement by a new
    /// parent of itself and a subtree bounded by *b* adds the least
    /// surface area to the tree.
    fn find_insertion_target(&self, b: &Bounds3f) -> Option<usize> {
        let area: Float = b.surface_area();
        let mut best_cost: Float = std::f32::INFINITY;
        let mut best: Option<usize> = None;
        let mut heap: BinaryHeap<InsertionCandidate> = BinaryHeap::new();
        heap.push(InsertionCandidate {
            induced: 0.0 as Float,
            node: self.root,
        });
        while let Some(candidate) = heap.pop() {
            if candidate.induced + area >= best_cost {
                // everything left on the heap is at least as expensive
                break;
            }
            let x_bounds: Bounds3f = self.node_bounds(candidate.node);
            let direct: Float = bnd3_union_bnd3f(&x_bounds, b).surface_area();
            let total: Float = candidate.induced + direct;
            if total < best_cost {
                best_cost = total;
                best = Some(candidate.node);
            }
            if let Some(children) = self.nodes[candidate.node].children() {
                let induced: Float = total - x_bounds.surface_area();
                if induced + area < best_cost {
                    for &c in &children {
                        heap.push(InsertionCandidate { induced, node: c });
                    }
                }
            }
        }
        best
    }
    /// Reuse node *slot* as the new parent of *x* and the loose subtree
    /// *n* (bounded by *b*), in the place *x* occupied so far.
    fn insert(&mut self, n: usize, b: &Bounds3f, x: usize, slot: usize) {
        let x_bounds: Bounds3f = self.node_bounds(x);
        let parent: Option<usize> = self.nodes[x].parent;
        let index_as_child: u8 = self.nodes[x].index_as_child;
        self.nodes[slot] = BVHNode::new_interior([x, n], [x_bounds, *b]);
        self.set_child(slot, 0_u8, x, x_bounds);
        self.set_child(slot, 1_u8, n, *b);
        match parent {
            Some(p) => {
                self.set_child(p, index_as_child, slot, bnd3_union_bnd3f(&x_bounds, b));
                self.refit_upwards(p);
            }
            None => {
                self.nodes[slot].parent = None;
                self.root = slot;
                self.refit_upwards(slot);
            }
        }
    }
}
