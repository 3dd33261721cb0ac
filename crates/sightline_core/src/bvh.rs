//! Bounding volume hierarchy over a single mesh.
//!
//! A binary tree built by recursive median splits along the longest axis
//! of the node bounds. Traversal is a straightforward recursive walk that
//! prunes on the ray/box test; children are visited in a fixed order
//! rather than nearest-first, which keeps the walk simple at the cost of
//! some pruning.

use sightline_math::{Aabb, Ray, Triangle};

/// Maximum triangles per leaf node before splitting.
pub const LEAF_THRESHOLD: usize = 4;

/// BVH node - either an inner node with two children or a leaf with
/// a small number of triangles.
///
/// Nodes own their children outright; a tree over an empty triangle set
/// is not representable, and the builders never produce one.
#[derive(Clone, Debug)]
pub enum BvhNode {
    /// Inner node with exactly two children.
    Inner {
        bounds: Aabb,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
    /// Leaf node holding between 1 and [`LEAF_THRESHOLD`] triangles.
    Leaf {
        bounds: Aabb,
        triangles: Vec<Triangle>,
    },
}

impl BvhNode {
    /// Build a BVH over a non-empty triangle slice.
    ///
    /// Callers filter out empty meshes before building; passing an empty
    /// slice is a bug in the caller.
    pub fn build(triangles: &[Triangle]) -> Self {
        debug_assert!(!triangles.is_empty(), "BVH build over empty triangle set");

        let bounds = triangles
            .iter()
            .map(Triangle::aabb)
            .reduce(|acc, aabb| acc.union(&aabb))
            .expect("non-empty triangle set");

        if triangles.len() <= LEAF_THRESHOLD {
            return BvhNode::Leaf {
                bounds,
                triangles: triangles.to_vec(),
            };
        }

        let axis = bounds.longest_axis();

        let mut sorted = triangles.to_vec();
        sorted.sort_unstable_by(|a, b| {
            a.centroid_on_axis(axis)
                .partial_cmp(&b.centroid_on_axis(axis))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Median count split: both halves are non-empty whenever the set
        // is larger than the leaf threshold, so recursion terminates even
        // when every centroid coincides on the chosen axis.
        let mid = sorted.len() / 2;
        let (left, right) = sorted.split_at(mid);

        BvhNode::Inner {
            bounds,
            left: Box::new(Self::build(left)),
            right: Box::new(Self::build(right)),
        }
    }

    /// Bounds enclosing every triangle in this subtree.
    pub fn bounds(&self) -> Aabb {
        match self {
            BvhNode::Inner { bounds, .. } => *bounds,
            BvhNode::Leaf { bounds, .. } => *bounds,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    /// Walk the tree for the nearest triangle hit along `ray`.
    ///
    /// `hit_dist` is shared across calls (and across trees) and only ever
    /// tightens; a hit is recorded when its parameter beats both
    /// `max_dist` and the current `hit_dist`. Returns whether this call
    /// recorded any hit. Both children are always visited so `hit_dist`
    /// ends at the true minimum.
    pub fn intersect(&self, ray: &Ray, max_dist: f32, hit_dist: &mut f32) -> bool {
        if !self.bounds().ray_intersects(ray) {
            return false;
        }

        match self {
            BvhNode::Leaf { triangles, .. } => {
                let mut hit = false;
                for triangle in triangles {
                    if let Some(t) = triangle.intersect(ray) {
                        if t < max_dist && t < *hit_dist {
                            *hit_dist = t;
                            hit = true;
                        }
                    }
                }
                hit
            }
            BvhNode::Inner { left, right, .. } => {
                let hit_left = left.intersect(ray, max_dist, hit_dist);
                let hit_right = right.intersect(ray, max_dist, hit_dist);
                hit_left || hit_right
            }
        }
    }

    /// Collect the triangles of every leaf, left to right.
    pub fn extract_triangles(&self, out: &mut Vec<Triangle>) {
        match self {
            BvhNode::Leaf { triangles, .. } => out.extend_from_slice(triangles),
            BvhNode::Inner { left, right, .. } => {
                left.extract_triangles(out);
                right.extract_triangles(out);
            }
        }
    }

    /// Total number of triangles stored in this subtree's leaves.
    pub fn triangle_count(&self) -> usize {
        match self {
            BvhNode::Leaf { triangles, .. } => triangles.len(),
            BvhNode::Inner { left, right, .. } => {
                left.triangle_count() + right.triangle_count()
            }
        }
    }
}
