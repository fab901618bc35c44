//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Nodes live in a flat `Vec` and refer to each other by index. Leaves own a
//! contiguous range of a reordered primitive-index array, so the primitives
//! themselves are never moved. Two split policies are supported: the surface
//! area heuristic and an equal-counts median split on a random axis.

use crate::error::RenderError;
use crate::hittable::{Hit, Hittable};
use ember_math::{Aabb, Interval, Ray};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Maximum primitives per leaf node before splitting.
pub const DEFAULT_MAX_LEAF_SIZE: usize = 8;

/// Hard cap on tree depth. Nodes at this depth become leaves regardless of size.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Candidate split planes per axis tried by the SAH builder.
pub const DEFAULT_SAH_SPLITS: usize = 32;

/// How interior nodes choose their split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitMethod {
    /// Surface area heuristic over a fixed number of candidate planes.
    #[default]
    Sah,
    /// Median split on a uniformly random axis.
    EqualCounts,
}

impl FromStr for SplitMethod {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sah" => Ok(SplitMethod::Sah),
            "equal-counts" | "equal_counts" | "equalcounts" => Ok(SplitMethod::EqualCounts),
            "middle" => Err(RenderError::NotImplemented("middle split method")),
            "hlbvh" => Err(RenderError::NotImplemented("hlbvh split method")),
            other => Err(RenderError::InvalidArgument(format!(
                "unknown split method '{other}' (expected 'sah' or 'equal-counts')"
            ))),
        }
    }
}

impl fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitMethod::Sah => write!(f, "sah"),
            SplitMethod::EqualCounts => write!(f, "equal-counts"),
        }
    }
}

/// Build parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhOptions {
    pub split_method: SplitMethod,
    pub max_leaf_size: usize,
    pub max_depth: usize,
    pub sah_splits_per_axis: usize,
    /// Seed for the equal-counts axis choice
    pub seed: u64,
}

impl Default for BvhOptions {
    fn default() -> Self {
        Self {
            split_method: SplitMethod::default(),
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            sah_splits_per_axis: DEFAULT_SAH_SPLITS,
            seed: 0,
        }
    }
}

impl BvhOptions {
    pub fn with_split_method(mut self, split_method: SplitMethod) -> Self {
        self.split_method = split_method;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<(), RenderError> {
        if self.max_leaf_size == 0 {
            return Err(RenderError::InvalidArgument("max_leaf_size must be at least 1".into()));
        }
        if self.sah_splits_per_axis < 2 {
            return Err(RenderError::InvalidArgument(
                "sah_splits_per_axis must be at least 2".into(),
            ));
        }
        Ok(())
    }
}

/// A node of the tree. Child and primitive references are indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BvhNode {
    /// Internal node with exactly two children. `left` holds the lower side of `axis`.
    Interior {
        bbox: Aabb,
        left: u32,
        right: u32,
        axis: u8,
    },
    /// `count` primitive indices starting at `first` in the index array.
    Leaf { bbox: Aabb, first: u32, count: u32 },
}

impl BvhNode {
    pub fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Interior { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }
}

/// Shape summary of a built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub max_depth: usize,
    pub max_leaf_size: usize,
}

/// Per-query counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub nodes_visited: usize,
    pub primitives_tested: usize,
}

/// Nearest hit returned by [`Bvh::intersect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhHit {
    /// Index into the primitive slice the tree was built over
    pub primitive: usize,
    pub hit: Hit,
}

/// Estimated cost of splitting `parent` into two children.
///
/// Traversal step costs 1, each primitive test costs 1, and a child is reached
/// with probability proportional to its surface area.
pub fn sah_cost(parent: &Aabb, left: &Aabb, n_left: usize, right: &Aabb, n_right: usize) -> f32 {
    let sa = parent.surface_area();
    if sa <= 0.0 {
        return 1.0 + (n_left + n_right) as f32;
    }
    1.0 + left.surface_area() / sa * n_left as f32 + right.surface_area() / sa * n_right as f32
}

/// Union of the bounding boxes of `primitives`.
///
/// An empty input yields a degenerate box at the origin.
pub fn bound_primitives<'a, P, I>(primitives: I) -> Aabb
where
    P: Hittable + 'a,
    I: IntoIterator<Item = &'a P>,
{
    Aabb::enclosing(primitives.into_iter().map(|p| p.bounding_box()))
}

/// Immutable BVH over a primitive slice.
///
/// The tree stores indices only; every query takes the same slice it was
/// built from.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    indices: Vec<usize>,
    stats: BvhStats,
}

impl Bvh {
    /// Build a tree over `primitives`.
    pub fn build<P: Hittable>(primitives: &[P], options: BvhOptions) -> Result<Self, RenderError> {
        if primitives.is_empty() {
            return Err(RenderError::InvalidArgument(
                "cannot build a BVH over zero primitives".into(),
            ));
        }
        options.validate()?;

        let start = Instant::now();
        let mut builder = Builder {
            boxes: primitives.iter().map(|p| p.bounding_box()).collect(),
            options,
            rng: StdRng::seed_from_u64(options.seed),
            nodes: Vec::with_capacity(2 * primitives.len() / options.max_leaf_size + 1),
            stats: BvhStats::default(),
        };

        let mut indices: Vec<usize> = (0..primitives.len()).collect();
        builder.build_node(&mut indices, 0, 0);

        let mut stats = builder.stats;
        stats.node_count = builder.nodes.len();

        log::info!(
            "Built {} BVH over {} primitives in {:.2?}: {} nodes, {} leaves, depth {}, largest leaf {}",
            options.split_method,
            primitives.len(),
            start.elapsed(),
            stats.node_count,
            stats.leaf_count,
            stats.max_depth,
            stats.max_leaf_size,
        );

        Ok(Self {
            nodes: builder.nodes,
            indices,
            stats,
        })
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Root node index. Always 0.
    pub fn root(&self) -> usize {
        0
    }

    pub fn stats(&self) -> BvhStats {
        self.stats
    }

    /// Bounds of the whole tree.
    pub fn bounds(&self) -> Aabb {
        *self.nodes[0].bbox()
    }

    /// Primitive indices of a leaf; empty for interior nodes.
    pub fn leaf_primitives(&self, node: usize) -> &[usize] {
        match self.nodes[node] {
            BvhNode::Leaf { first, count, .. } => {
                &self.indices[first as usize..(first + count) as usize]
            }
            BvhNode::Interior { .. } => &[],
        }
    }

    /// Nearest hit with `t` inside `ray_t`.
    pub fn intersect<P: Hittable>(&self, primitives: &[P], ray: &Ray, ray_t: Interval) -> Option<BvhHit> {
        let mut stats = TraversalStats::default();
        self.intersect_with_stats(primitives, ray, ray_t, &mut stats)
    }

    pub fn intersect_with_stats<P: Hittable>(
        &self,
        primitives: &[P],
        ray: &Ray,
        ray_t: Interval,
        stats: &mut TraversalStats,
    ) -> Option<BvhHit> {
        self.intersect_node(self.root(), primitives, ray, ray_t, stats)
    }

    /// True as soon as any primitive is hit inside `ray_t`.
    pub fn intersect_any<P: Hittable>(&self, primitives: &[P], ray: &Ray, ray_t: Interval) -> bool {
        let mut stats = TraversalStats::default();
        self.intersect_any_with_stats(primitives, ray, ray_t, &mut stats)
    }

    pub fn intersect_any_with_stats<P: Hittable>(
        &self,
        primitives: &[P],
        ray: &Ray,
        ray_t: Interval,
        stats: &mut TraversalStats,
    ) -> bool {
        self.intersect_any_node(self.root(), primitives, ray, ray_t, stats)
    }

    fn intersect_node<P: Hittable>(
        &self,
        index: usize,
        primitives: &[P],
        ray: &Ray,
        ray_t: Interval,
        stats: &mut TraversalStats,
    ) -> Option<BvhHit> {
        stats.nodes_visited += 1;
        let node = &self.nodes[index];
        if !node.bbox().hit(ray, ray_t) {
            return None;
        }

        match *node {
            BvhNode::Leaf { .. } => {
                let mut t = ray_t;
                let mut closest = None;
                for &primitive in self.leaf_primitives(index) {
                    stats.primitives_tested += 1;
                    if let Some(hit) = primitives[primitive].hit(ray, t) {
                        t = t.with_max(hit.t);
                        closest = Some(BvhHit { primitive, hit });
                    }
                }
                closest
            }
            BvhNode::Interior { left, right, axis, .. } => {
                let (near, far) = near_far(ray, axis, left, right);

                let near_hit = self.intersect_node(near, primitives, ray, ray_t, stats);
                let t = near_hit.map_or(ray_t, |h| ray_t.with_max(h.hit.t));
                // Anything found in the far child is inside the shrunk range,
                // so it is at least as near.
                self.intersect_node(far, primitives, ray, t, stats).or(near_hit)
            }
        }
    }

    fn intersect_any_node<P: Hittable>(
        &self,
        index: usize,
        primitives: &[P],
        ray: &Ray,
        ray_t: Interval,
        stats: &mut TraversalStats,
    ) -> bool {
        stats.nodes_visited += 1;
        let node = &self.nodes[index];
        if !node.bbox().hit(ray, ray_t) {
            return false;
        }

        match *node {
            BvhNode::Leaf { .. } => self.leaf_primitives(index).iter().any(|&primitive| {
                stats.primitives_tested += 1;
                primitives[primitive].hit_any(ray, ray_t)
            }),
            BvhNode::Interior { left, right, axis, .. } => {
                let (near, far) = near_far(ray, axis, left, right);
                self.intersect_any_node(near, primitives, ray, ray_t, stats)
                    || self.intersect_any_node(far, primitives, ray, ray_t, stats)
            }
        }
    }
}

#[inline]
fn near_far(ray: &Ray, axis: u8, left: u32, right: u32) -> (usize, usize) {
    if ray.direction[axis as usize] >= 0.0 {
        (left as usize, right as usize)
    } else {
        (right as usize, left as usize)
    }
}

struct Builder {
    boxes: Vec<Aabb>,
    options: BvhOptions,
    rng: StdRng,
    nodes: Vec<BvhNode>,
    stats: BvhStats,
}

impl Builder {
    /// Build the subtree over `indices`, whose first element sits at `first`
    /// in the final index array. Returns the new node's index.
    fn build_node(&mut self, indices: &mut [usize], first: usize, depth: usize) -> u32 {
        let bbox = Aabb::enclosing(indices.iter().map(|&i| self.boxes[i]));
        let count = indices.len();
        let node_index = self.nodes.len();
        self.stats.max_depth = self.stats.max_depth.max(depth);

        let split = if count <= self.options.max_leaf_size || depth >= self.options.max_depth {
            None
        } else {
            match self.options.split_method {
                SplitMethod::EqualCounts => Some(self.split_equal_counts(indices)),
                SplitMethod::Sah => self.split_sah(&bbox, indices),
            }
        };

        let Some((axis, mid)) = split else {
            self.stats.leaf_count += 1;
            self.stats.max_leaf_size = self.stats.max_leaf_size.max(count);
            self.nodes.push(BvhNode::Leaf {
                bbox,
                first: first as u32,
                count: count as u32,
            });
            return node_index as u32;
        };

        // Reserve the slot so children land after their parent.
        self.nodes.push(BvhNode::Leaf {
            bbox,
            first: first as u32,
            count: 0,
        });

        let (lower, upper) = indices.split_at_mut(mid);
        let left = self.build_node(lower, first, depth + 1);
        let right = self.build_node(upper, first + mid, depth + 1);

        self.nodes[node_index] = BvhNode::Interior {
            bbox,
            left,
            right,
            axis: axis as u8,
        };
        node_index as u32
    }

    /// Sort by box minimum on a random axis and split at the median.
    fn split_equal_counts(&mut self, indices: &mut [usize]) -> (usize, usize) {
        let axis = self.rng.gen_range(0..3);
        let boxes = &self.boxes;
        indices.sort_by(|&a, &b| {
            boxes[a]
                .axis_interval(axis)
                .min
                .total_cmp(&boxes[b].axis_interval(axis).min)
        });
        (axis, indices.len() / 2)
    }

    /// Where a primitive's box minimum falls inside the node, in `[0, 1]`.
    fn relative_position(&self, node: &Aabb, primitive: usize, axis: usize) -> f32 {
        let extent = node.axis_interval(axis);
        (self.boxes[primitive].axis_interval(axis).min - extent.min) / extent.size()
    }

    /// Best SAH split over all axes, or `None` when staying a leaf is cheaper.
    ///
    /// On success the indices are partitioned so the left child comes first.
    fn split_sah(&self, node: &Aabb, indices: &mut [usize]) -> Option<(usize, usize)> {
        let splits = self.options.sah_splits_per_axis;
        let mut best: Option<(f32, usize, f32)> = None;

        for axis in 0..3 {
            if node.axis_interval(axis).size() <= 0.0 {
                continue;
            }

            for i in 1..splits {
                let threshold = i as f32 / splits as f32;
                let (mut left_box, mut right_box) = (Aabb::EMPTY, Aabb::EMPTY);
                let (mut n_left, mut n_right) = (0, 0);

                for &p in indices.iter() {
                    if self.relative_position(node, p, axis) < threshold {
                        left_box = Aabb::surrounding(&left_box, &self.boxes[p]);
                        n_left += 1;
                    } else {
                        right_box = Aabb::surrounding(&right_box, &self.boxes[p]);
                        n_right += 1;
                    }
                }

                // Larger thresholds cannot move anything back to the right.
                if n_right == 0 {
                    break;
                }
                if n_left == 0 {
                    continue;
                }

                let cost = sah_cost(node, &left_box, n_left, &right_box, n_right);
                if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                    best = Some((cost, axis, threshold));
                }
            }
        }

        let (cost, axis, threshold) = best?;
        if cost >= indices.len() as f32 {
            return None;
        }

        let mut mid = 0;
        for i in 0..indices.len() {
            if self.relative_position(node, indices[i], axis) < threshold {
                indices.swap(i, mid);
                mid += 1;
            }
        }
        Some((axis, mid))
    }
}
