//! Spatial indexes over projected catalog stars.
//!
//! Both trees project the catalog once with [`Mercator::project`] and answer
//! "which stars lie within `θ` degrees of `v`" by walking only the parts of
//! the square that overlap [`Mercator::search_bounds`]. Results are a
//! superset of the true angular neighbourhood (the boxes are wider than the
//! cap); [`SpatialIndex::nearby_exact`] applies the final angle test.
//!
//! Trees are immutable after construction and can be queried from many
//! threads at once.

pub mod kd;
pub mod quad;

pub use kd::{KdNode, KdTree};
pub use quad::{QuadNode, QuadTree, QuadTreeConfig, ROOT_SENTINEL};

use crate::{Mercator, Star};

/// Radius search over a fixed catalog, addressed by catalog index.
pub trait SpatialIndex {
    /// Width of the projection square the catalog was placed on.
    fn width(&self) -> f64;

    /// Number of catalog stars indexed.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear width spanning `theta` degrees on this tree's square.
    fn width_given_angle(&self, theta: f64) -> f64 {
        Mercator::width_given_angle(theta, self.width())
    }

    /// Up to `limit` catalog indices whose projection falls inside the
    /// search boxes for `theta` degrees around `focus`.
    fn nearby_indices(&self, focus: &Star, theta: f64, limit: usize) -> Vec<usize>;

    /// [`SpatialIndex::nearby_indices`] resolved against `catalog`, the
    /// list the tree was built from.
    fn nearby(&self, focus: &Star, theta: f64, limit: usize, catalog: &[Star]) -> Vec<Star> {
        self.nearby_indices(focus, theta, limit)
            .into_iter()
            .filter_map(|i| catalog.get(i).copied())
            .collect()
    }

    /// Up to `limit` catalog stars whose true angle to `focus` is at most
    /// `theta` degrees.
    fn nearby_exact(&self, focus: &Star, theta: f64, limit: usize, catalog: &[Star]) -> Vec<Star> {
        self.nearby_indices(focus, theta, usize::MAX)
            .into_iter()
            .filter_map(|i| catalog.get(i).copied())
            .filter(|s| focus.angle_between(s) <= theta)
            .take(limit)
            .collect()
    }
}

/// Projected coordinates of every star, in catalog order.
pub(crate) fn project_all(stars: &[Star], width: f64) -> Vec<(f64, f64)> {
    stars
        .iter()
        .map(|s| {
            let m = Mercator::project(s, width);
            (m.x, m.y)
        })
        .collect()
}
