//! 2D k-d tree over projected catalog stars.
//!
//! Built by recursive median partition, alternating `x` and `y` with depth.
//! The median point goes to the left half. Every node records the box its
//! subtree occupies: the root spans the projection square and each split
//! halves the parent's box at the median value. Leaves hold exactly one
//! catalog star; interior nodes carry the median point only as the split
//! value.
//!
//! Preferred over the quadtree for large catalogs: depth is `⌈log2 n⌉`
//! regardless of how the stars cluster.

use std::cmp::Ordering;

use tracing::info;

use super::{project_all, SpatialIndex};
use crate::{Bounds, Mercator, Star};

#[derive(Debug, Clone, PartialEq)]
pub struct KdNode {
    pub x: f64,
    pub y: f64,
    /// Axis split at this node: 0 for `x`, 1 for `y`.
    pub dimension: usize,
    /// Box containing every point of this subtree.
    pub bounds: Bounds,
    left: Option<usize>,
    right: Option<usize>,
    /// Catalog index for leaves; `None` for interior (median) nodes.
    origin_index: Option<usize>,
}

impl KdNode {
    pub fn is_leaf(&self) -> bool {
        self.origin_index.is_some()
    }

    pub fn origin_index(&self) -> Option<usize> {
        self.origin_index
    }

    pub fn left(&self) -> Option<usize> {
        self.left
    }

    pub fn right(&self) -> Option<usize> {
        self.right
    }

    /// Coordinate along this node's splitting axis.
    pub fn split_value(&self) -> f64 {
        if self.dimension == 0 {
            self.x
        } else {
            self.y
        }
    }
}

#[derive(Clone, Copy)]
struct Entry {
    x: f64,
    y: f64,
    origin: usize,
}

impl Entry {
    fn coord(&self, dimension: usize) -> f64 {
        if dimension == 0 {
            self.x
        } else {
            self.y
        }
    }
}

#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    root: Option<usize>,
    width: f64,
    len: usize,
}

impl KdTree {
    pub fn build(stars: &[Star], width: f64) -> Self {
        let mut entries: Vec<Entry> = project_all(stars, width)
            .into_iter()
            .enumerate()
            .map(|(origin, (x, y))| Entry { x, y, origin })
            .collect();

        let mut tree = Self {
            nodes: Vec::with_capacity(2 * stars.len()),
            root: None,
            width,
            len: stars.len(),
        };
        if !entries.is_empty() {
            let half = width / 2.0;
            let bounds = Bounds::new(-half, -half, half, half);
            tree.root = Some(tree.grow(&mut entries, 0, bounds));
        }

        info!(
            "Built k-d tree: {} stars, {} nodes",
            stars.len(),
            tree.nodes.len()
        );
        tree
    }

    /// Build the subtree over a non-empty slice and return its arena index.
    fn grow(&mut self, entries: &mut [Entry], depth: usize, bounds: Bounds) -> usize {
        let dimension = depth % 2;
        let id = self.nodes.len();

        if let [only] = entries {
            self.nodes.push(KdNode {
                x: only.x,
                y: only.y,
                dimension,
                bounds,
                left: None,
                right: None,
                origin_index: Some(only.origin),
            });
            return id;
        }

        let median = (entries.len() - 1) / 2;
        sort_by_dimension(entries, median, dimension);
        let pivot = entries[median];
        let split = pivot.coord(dimension);

        self.nodes.push(KdNode {
            x: pivot.x,
            y: pivot.y,
            dimension,
            bounds,
            left: None,
            right: None,
            origin_index: None,
        });

        let (mut left_bounds, mut right_bounds) = (bounds, bounds);
        if dimension == 0 {
            left_bounds.max_x = split;
            right_bounds.min_x = split;
        } else {
            left_bounds.max_y = split;
            right_bounds.min_y = split;
        }

        let (lower, upper) = entries.split_at_mut(median + 1);
        let left = self.grow(lower, depth + 1, left_bounds);
        let right = self.grow(upper, depth + 1, right_bounds);
        self.nodes[id].left = Some(left);
        self.nodes[id].right = Some(right);
        id
    }

    pub fn root(&self) -> Option<&KdNode> {
        self.root.and_then(|id| self.nodes.get(id))
    }

    pub fn node(&self, id: usize) -> Option<&KdNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    /// Catalog indices of leaves inside `query`, up to `limit`. Subtrees
    /// whose box misses `query` are skipped.
    pub fn box_query(&self, query: &Bounds, limit: usize) -> Vec<usize> {
        self.query_bounds(std::slice::from_ref(query), limit)
    }

    fn query_bounds(&self, boxes: &[Bounds], limit: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let Some(root) = self.root else {
            return out;
        };
        if limit == 0 || boxes.is_empty() {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !boxes.iter().any(|b| node.bounds.intersects(b)) {
                continue;
            }
            if let Some(origin) = node.origin_index {
                if boxes.iter().any(|b| b.contains(node.x, node.y)) {
                    out.push(origin);
                    if out.len() >= limit {
                        break;
                    }
                }
                continue;
            }
            stack.extend(node.right);
            stack.extend(node.left);
        }
        out
    }
}

/// Place the `k`-th smallest entry along `dimension` at index `k`, with
/// smaller-or-equal entries before it and larger-or-equal after.
fn sort_by_dimension(entries: &mut [Entry], k: usize, dimension: usize) {
    entries.select_nth_unstable_by(k, |a, b| {
        a.coord(dimension)
            .partial_cmp(&b.coord(dimension))
            .unwrap_or(Ordering::Equal)
    });
}

impl SpatialIndex for KdTree {
    fn width(&self) -> f64 {
        self.width
    }

    fn len(&self) -> usize {
        self.len
    }

    fn nearby_indices(&self, focus: &Star, theta: f64, limit: usize) -> Vec<usize> {
        self.query_bounds(&Mercator::search_bounds(focus, theta, self.width), limit)
    }
}
