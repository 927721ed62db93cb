//! Bounding Volume Hierarchy (BVH) over triangle references.
//!
//! Uses a binary tree built by median split on the longest centroid axis.
//! Leaves hold references into the scene's meshes; the caller supplies the
//! primitive test during traversal.

use ember_math::{Aabb, Ray};

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// A triangle of one surface, with its bounds.
#[derive(Debug, Clone, Copy)]
pub struct PrimRef {
    pub geom_id: u32,
    pub prim_id: u32,
    pub bbox: Aabb,
}

/// BVH node - either a branch with two children or a leaf with primitives.
pub enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node with a small number of primitives.
    Leaf { prims: Vec<PrimRef>, bbox: Aabb },
    /// Empty node (for edge cases).
    Empty,
}

impl BvhNode {
    /// Create a BVH from a list of primitive references.
    pub fn new(prims: Vec<PrimRef>) -> Self {
        if prims.is_empty() {
            return BvhNode::Empty;
        }
        Self::build(prims)
    }

    fn build(mut prims: Vec<PrimRef>) -> Self {
        let n = prims.len();
        let bounds = prims
            .iter()
            .fold(Aabb::EMPTY, |acc, p| Aabb::surrounding(&acc, &p.bbox));

        if n <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                prims,
                bbox: bounds,
            };
        }

        // Choose split axis based on centroid spread
        let centroid_bounds = prims.iter().fold(Aabb::EMPTY, |acc, p| {
            let c = p.bbox.centroid();
            Aabb::surrounding(&acc, &Aabb::from_points(c, c))
        });
        let axis = centroid_bounds.longest_axis();

        prims.sort_unstable_by(|a, b| {
            let a_val = a.bbox.centroid()[axis];
            let b_val = b.bbox.centroid()[axis];
            a_val
                .partial_cmp(&b_val)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let right_prims = prims.split_off(n / 2);
        let left = Self::build(prims);
        let right = Self::build(right_prims);

        BvhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox: bounds,
        }
    }

    /// Visit every primitive whose bounds the ray reaches.
    ///
    /// `test` returns true when it accepted a hit; it is expected to shrink
    /// `ray.tfar` so later boxes are culled against the nearest hit so far.
    /// With `first_hit` set, traversal stops at the first accepted hit.
    pub fn traverse<F>(&self, ray: &mut Ray, first_hit: bool, test: &mut F) -> bool
    where
        F: FnMut(&PrimRef, &mut Ray) -> bool,
    {
        match self {
            BvhNode::Empty => false,

            BvhNode::Leaf { prims, bbox } => {
                if !bbox.hit(ray) {
                    return false;
                }

                let mut hit_anything = false;
                for prim in prims {
                    if test(prim, ray) {
                        hit_anything = true;
                        if first_hit {
                            break;
                        }
                    }
                }
                hit_anything
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray) {
                    return false;
                }

                let hit_left = left.traverse(ray, first_hit, test);
                if hit_left && first_hit {
                    return true;
                }
                let hit_right = right.traverse(ray, first_hit, test);

                hit_left || hit_right
            }
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    /// Depth of the deepest leaf.
    pub fn depth(&self) -> usize {
        match self {
            BvhNode::Empty | BvhNode::Leaf { .. } => 1,
            BvhNode::Branch { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}
