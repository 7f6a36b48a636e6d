//! Quadtree over the projection square.
//!
//! The root spans the whole square. A node holding more than
//! [`QuadTreeConfig::leaf_capacity`] points splits into four equal quadrants
//! (top-left, top-right, bottom-left, bottom-right, with "top" meaning larger
//! `y`); empty quadrants become dead children. Nodes that cannot split any
//! further, because they are small enough, narrow enough or deep enough,
//! are leaf-colored and keep every point they received.
//!
//! Nodes live in one arena; children are arena indices.

use tracing::info;

use super::{project_all, SpatialIndex};
use crate::{Bounds, Mercator, Star};

/// Global width carried by the dead-child sentinel.
pub const ROOT_SENTINEL: f64 = -1.0;

/// Tuning for quadtree construction.
#[derive(Debug, Clone)]
pub struct QuadTreeConfig {
    /// Most points a node keeps before it is split.
    pub leaf_capacity: usize,
    /// Nodes narrower than this are never split.
    pub min_local_width: f64,
    /// Depth at which splitting stops regardless of occupancy.
    pub max_depth: usize,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: 4,
            min_local_width: 1e-9,
            max_depth: 48,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuadNode {
    pub center_x: f64,
    pub center_y: f64,
    /// Side of this node's square.
    pub local_width: f64,
    /// Side of the whole projection square, or [`ROOT_SENTINEL`].
    pub global_width: f64,
    leaf_colored: bool,
    children: [Option<usize>; 4],
    points: Vec<usize>,
}

static DEAD_CHILD: QuadNode = QuadNode {
    center_x: 0.0,
    center_y: 0.0,
    local_width: 0.0,
    global_width: ROOT_SENTINEL,
    leaf_colored: false,
    children: [None; 4],
    points: Vec::new(),
};

impl QuadNode {
    /// True for the sentinel standing in for an empty quadrant.
    pub fn is_dead_child(&self) -> bool {
        self.global_width == ROOT_SENTINEL
    }

    /// True for a terminal node holding points directly.
    pub fn is_leaf_colored(&self) -> bool {
        self.leaf_colored
    }

    /// Catalog indices held by a leaf-colored node.
    pub fn points(&self) -> &[usize] {
        &self.points
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::square(self.center_x, self.center_y, self.local_width)
    }

    /// Centers of the four quadrants, each `local_width / 2` wide, ordered
    /// top-left, top-right, bottom-left, bottom-right.
    pub fn find_quadrant_centers(&self) -> [(f64, f64); 4] {
        let a = self.local_width / 4.0;
        let (x, y) = (self.center_x, self.center_y);
        [(x - a, y + a), (x + a, y + a), (x - a, y - a), (x + a, y - a)]
    }

    /// Quadrant a point belongs to. Points on a dividing line go right and
    /// up, so every point has exactly one quadrant.
    pub fn quadrant_of(&self, x: f64, y: f64) -> usize {
        match (x < self.center_x, y >= self.center_y) {
            (true, true) => 0,
            (false, true) => 1,
            (true, false) => 2,
            (false, false) => 3,
        }
    }

    /// Point lies within this node's (closed) square.
    pub fn within_quadrant(&self, x: f64, y: f64) -> bool {
        self.bounds().contains(x, y)
    }

    /// Indices of `candidates` whose coordinates fall in quadrant `q`.
    pub fn reduce_to_quadrant(
        &self,
        q: usize,
        candidates: &[usize],
        coords: &[(f64, f64)],
    ) -> Vec<usize> {
        candidates
            .iter()
            .copied()
            .filter(|&i| {
                let (x, y) = coords[i];
                self.within_quadrant(x, y) && self.quadrant_of(x, y) == q
            })
            .collect()
    }

    /// Axis-aligned overlap between this node's square and `other`.
    pub fn quadrant_intersects_quadrant(&self, other: &Bounds) -> bool {
        self.bounds().intersects(other)
    }
}

/// Quadtree over a star list projected at a fixed width.
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<QuadNode>,
    coords: Vec<(f64, f64)>,
    width: f64,
}

impl QuadTree {
    pub fn build(stars: &[Star], width: f64) -> Self {
        Self::build_with_config(stars, width, &QuadTreeConfig::default())
    }

    pub fn build_with_config(stars: &[Star], width: f64, config: &QuadTreeConfig) -> Self {
        let coords = project_all(stars, width);
        let mut tree = Self {
            nodes: Vec::new(),
            coords,
            width,
        };
        let all: Vec<usize> = (0..stars.len()).collect();
        tree.grow(0.0, 0.0, width, all, 0, config);

        info!(
            "Built quadtree: {} stars, {} nodes, {} leaf-colored",
            stars.len(),
            tree.nodes.len(),
            tree.nodes.iter().filter(|n| n.leaf_colored).count()
        );
        tree
    }

    /// Append the subtree for `points` and return its arena index.
    fn grow(
        &mut self,
        center_x: f64,
        center_y: f64,
        local_width: f64,
        points: Vec<usize>,
        depth: usize,
        config: &QuadTreeConfig,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(QuadNode {
            center_x,
            center_y,
            local_width,
            global_width: self.width,
            leaf_colored: false,
            children: [None; 4],
            points: Vec::new(),
        });

        if points.len() <= config.leaf_capacity
            || local_width / 2.0 < config.min_local_width
            || depth >= config.max_depth
        {
            let node = &mut self.nodes[id];
            node.leaf_colored = true;
            node.points = points;
            return id;
        }

        let node = self.nodes[id].clone();
        let mut quadrants: [Vec<usize>; 4] = Default::default();
        for i in points {
            let (x, y) = self.coords[i];
            quadrants[node.quadrant_of(x, y)].push(i);
        }

        let centers = node.find_quadrant_centers();
        for (q, members) in quadrants.into_iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let (cx, cy) = centers[q];
            let child = self.grow(cx, cy, local_width / 2.0, members, depth + 1, config);
            self.nodes[id].children[q] = Some(child);
        }
        id
    }

    pub fn root(&self) -> &QuadNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: usize) -> Option<&QuadNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[QuadNode] {
        &self.nodes
    }

    /// Child `c` of `node`, or the dead-child sentinel when that quadrant is
    /// empty (or `node` is itself terminal).
    pub fn child(&self, node: &QuadNode, c: usize) -> &QuadNode {
        node.children
            .get(c)
            .copied()
            .flatten()
            .and_then(|id| self.nodes.get(id))
            .unwrap_or(&DEAD_CHILD)
    }

    /// Projected coordinates of catalog star `i`.
    pub fn coords(&self, i: usize) -> Option<(f64, f64)> {
        self.coords.get(i).copied()
    }

    /// Catalog indices in leaf order (depth first, quadrant order).
    pub fn leaves(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.coords.len());
        let mut stack = vec![0usize];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.leaf_colored {
                out.extend_from_slice(&node.points);
            } else {
                stack.extend(node.children.iter().rev().flatten());
            }
        }
        out
    }

    /// Catalog indices held in nodes overlapping any of `boxes` whose
    /// projected point lies inside one of them, up to `limit`.
    pub fn query_bounds(&self, boxes: &[Bounds], limit: usize) -> Vec<usize> {
        let mut out = Vec::new();
        if limit == 0 || boxes.is_empty() {
            return out;
        }
        let mut stack = vec![0usize];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !boxes.iter().any(|b| node.quadrant_intersects_quadrant(b)) {
                continue;
            }
            if !node.leaf_colored {
                stack.extend(node.children.iter().rev().flatten());
                continue;
            }
            for &i in &node.points {
                let (x, y) = self.coords[i];
                if boxes.iter().any(|b| b.contains(x, y)) {
                    out.push(i);
                    if out.len() >= limit {
                        return out;
                    }
                }
            }
        }
        out
    }
}

impl SpatialIndex for QuadTree {
    fn width(&self) -> f64 {
        self.width
    }

    fn len(&self) -> usize {
        self.coords.len()
    }

    fn nearby_indices(&self, focus: &Star, theta: f64, limit: usize) -> Vec<usize> {
        self.query_bounds(&Mercator::search_bounds(focus, theta, self.width), limit)
    }
}
