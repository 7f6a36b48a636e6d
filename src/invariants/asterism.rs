//! Four-star geometric hash.
//!
//! The four stars are projected onto a unit square. The most distant pair
//! becomes the anchors `A`, `B`, and the square is turned and mirrored until
//! `A` is the anchor nearest the origin with the smaller coordinates. `C` and
//! `D` are then written in the frame where `A = (0, 0)` and `B = (1, 1)`;
//! their four coordinates are the hash.
//!
//! A valid hash has both `C'` and `D'` inside the circle with `AB` as
//! diameter, `C'.x ≥ D'.x` and `C'.x + D'.x < 1`. Quads that cannot meet
//! this (including coincident or collinear stars) hash to [`MALFORMED_HASH`].

use tracing::debug;

use crate::{Mercator, Star};

/// Hash returned for quads without a canonical ordering.
pub const MALFORMED_HASH: [f64; 4] = [0.0; 4];

/// Width of the square the quad is projected onto.
const HASH_PROJECTION_WIDTH: f64 = 1.0;

/// A quad of stars awaiting canonical ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Asterism {
    stars: [Star; 4],
}

/// Result of canonicalizing a quad: input slots in `A, B, C, D` order plus
/// the hash.
struct Canonical {
    order: [usize; 4],
    hash: [f64; 4],
}

#[derive(Clone, Copy)]
struct Point {
    x: f64,
    y: f64,
}

impl Point {
    fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl Asterism {
    pub fn new(stars: [Star; 4]) -> Self {
        Self { stars }
    }

    /// Quad from the first four entries of `stars`; `None` if fewer exist.
    pub fn from_slice(stars: &[Star]) -> Option<Self> {
        let quad: [Star; 4] = stars.get(..4)?.try_into().ok()?;
        Some(Self::new(quad))
    }

    pub fn stars(&self) -> &[Star; 4] {
        &self.stars
    }

    /// `[C'.x, C'.y, D'.x, D'.y]`, or [`MALFORMED_HASH`].
    pub fn hash(&self) -> [f64; 4] {
        self.canonicalize()
            .map(|c| c.hash)
            .unwrap_or(MALFORMED_HASH)
    }

    /// The input stars reordered as `[A, B, C, D]`; `None` when the quad has
    /// no canonical order.
    pub fn find_order(&self) -> Option<[Star; 4]> {
        let c = self.canonicalize()?;
        Some(c.order.map(|i| self.stars[i]))
    }

    /// Componentwise mean of the four vectors, not normalized and unlabeled.
    ///
    /// Different quads can share a center, so this is not a unique key.
    pub fn center(&self) -> Star {
        let sum = self
            .stars
            .iter()
            .fold(Star::new(0.0, 0.0, 0.0), |acc, s| acc + s.reset_label());
        (sum * 0.25).reset_label()
    }

    fn canonicalize(&self) -> Option<Canonical> {
        let projected = self.stars.map(|s| {
            let m = Mercator::project(&s, HASH_PROJECTION_WIDTH);
            Point { x: m.x, y: m.y }
        });

        // Anchors: the first strictly-largest pair.
        let (mut ia, mut ib, mut d_max) = (0, 0, 0.0);
        for i in 0..3 {
            for j in i + 1..4 {
                let d = projected[i].distance(&projected[j]);
                if d > d_max {
                    (ia, ib, d_max) = (i, j, d);
                }
            }
        }
        if d_max == 0.0 {
            debug!("asterism rejected: all four stars coincide");
            return None;
        }
        let mut rest = (0..4).filter(|&i| i != ia && i != ib);
        let (ic, id) = (rest.next()?, rest.next()?);

        // Slots A, B, C, D and their current coordinates.
        let mut order = [ia, ib, ic, id];
        let mut pts = order.map(|i| Point {
            x: projected[i].x + 0.5,
            y: projected[i].y + 0.5,
        });
        verify_ab(&mut order, &mut pts);

        let (a, b) = (pts[0], pts[1]);
        let to_ab = |p: &Point| Point {
            x: (p.x - a.x) / (b.x - a.x),
            y: (p.y - a.y) / (b.y - a.y),
        };
        let (mut c, mut d) = (to_ab(&pts[2]), to_ab(&pts[3]));

        if !cd_property_met(&c, &d) {
            std::mem::swap(&mut c, &mut d);
            order.swap(2, 3);
        }
        if !cd_property_met(&c, &d) {
            return None;
        }

        let hash = [c.x, c.y, d.x, d.y];
        if hash.iter().any(|h| !h.is_finite()) {
            return None;
        }
        Some(Canonical { order, hash })
    }
}

/// Turn and mirror the translated quad so that `A` is the anchor nearest the
/// origin and lies below and left of `B`.
fn verify_ab(order: &mut [usize; 4], pts: &mut [Point; 4]) {
    let origin = Point { x: 0.0, y: 0.0 };

    let mut closest = 0;
    for (slot, p) in pts.iter().enumerate().skip(1) {
        if p.distance(&origin) < pts[closest].distance(&origin) {
            closest = slot;
        }
    }

    // A quarter turn that keeps the square in the positive quadrant.
    if closest > 1 {
        for p in pts.iter_mut() {
            *p = Point {
                x: p.y,
                y: -p.x + 1.0,
            };
        }
    }

    if pts[1].distance(&origin) < pts[0].distance(&origin) {
        pts.swap(0, 1);
        order.swap(0, 1);
    }

    // Mirror across y = x.
    if pts[0].x > pts[1].x || pts[0].y > pts[1].y {
        for p in pts.iter_mut() {
            *p = Point { x: p.y, y: p.x };
        }
    }
}

fn cd_property_met(c: &Point, d: &Point) -> bool {
    let center = Point { x: 0.5, y: 0.5 };
    if c.distance(&center) > 0.5 || d.distance(&center) > 0.5 {
        return false;
    }
    c.x >= d.x && c.x + d.x < 1.0
}
