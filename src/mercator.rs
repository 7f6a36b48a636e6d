//! Projection of unit vectors onto a flat square.
//!
//! Longitude maps linearly onto `x`; latitude maps onto `y` through the
//! Mercator ordinate `ln(tan(π/4 + φ/2))`, scaled so that a square of width
//! `w` holds the whole sphere. Latitudes are clamped to [`MAX_LATITUDE_DEG`],
//! where the ordinate reaches ±π, so every projected point satisfies
//! `|x|, |y| ≤ w/2`. Screen convention: `+y` points toward the south.
//!
//! Because the projection stretches distances by `sec(φ)`, the square of
//! half-width [`Mercator::width_given_angle`] around a point only
//! approximates an angular cap. [`Mercator::search_bounds`] widens it by the
//! local stretch so that no point within the cap is ever left outside.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::Star;

/// Latitude (degrees) at which the Mercator ordinate equals ±π.
pub const MAX_LATITUDE_DEG: f64 = 85.051_128_779_806_59;

const EQUALITY_EPSILON: f64 = 1e-12;

/// Relative padding added to search boxes to absorb rounding.
const BOUNDS_PAD: f64 = 1e-9;

/// Axis-aligned rectangle in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Square of side `width` centered on `(x, y)`.
    pub fn square(x: f64, y: f64, width: f64) -> Self {
        let a = width / 2.0;
        Self::new(x - a, y - a, x + a, y + a)
    }

    /// Rectangle spanned by corners in [`Mercator::find_corners`] order.
    pub fn from_corners(corners: &[Mercator; 4]) -> Self {
        Self::new(corners[0].x, corners[2].y, corners[1].x, corners[0].y)
    }

    /// Closed-interval overlap test; touching edges count as intersecting.
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// A star projected onto the square of width `w`.
#[derive(Debug, Clone, Copy)]
pub struct Mercator {
    pub x: f64,
    pub y: f64,
    /// Width of the projection square this point lives in.
    pub w: f64,
    pub label: Option<u64>,
}

impl PartialEq for Mercator {
    fn eq(&self, other: &Self) -> bool {
        (self.x - other.x).abs() < EQUALITY_EPSILON && (self.y - other.y).abs() < EQUALITY_EPSILON
    }
}

impl Mercator {
    pub fn new(x: f64, y: f64, w: f64) -> Self {
        Self {
            x,
            y,
            w,
            label: None,
        }
    }

    /// Project `star` onto a square of width `w`, carrying its label.
    ///
    /// The vector need not be unit length. The zero vector lands on the
    /// center of the square.
    pub fn project(star: &Star, w: f64) -> Self {
        let r = star.norm();
        if r == 0.0 {
            return Self {
                label: star.label,
                ..Self::new(0.0, 0.0, w)
            };
        }
        let lat = (star.z / r).clamp(-1.0, 1.0).asin().to_degrees();
        let lon = star.y.atan2(star.x).to_degrees();
        Self {
            x: x_of_longitude(lon, w),
            y: y_of_latitude(lat, w),
            w,
            label: star.label,
        }
    }

    /// Unit vector this point was projected from, up to latitude clamping.
    pub fn inverse(&self) -> Star {
        let lon = (self.x * 360.0 / self.w).to_radians();
        let n = -self.y * 2.0 * PI / self.w;
        let lat = 2.0 * n.exp().atan() - FRAC_PI_2;
        let s = Star::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin());
        match self.label {
            Some(l) => s.with_label(l),
            None => s,
        }
    }

    /// Unit vector for an image point `(x, y)` measured in pixels from the
    /// image center, with `dpp` degrees per pixel and `+y` pointing up.
    pub fn transform_point(x: f64, y: f64, dpp: f64) -> Star {
        let lon = (x * dpp).to_radians();
        let lat = 2.0 * (y * dpp).to_radians().exp().atan() - FRAC_PI_2;
        Star::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()).as_unit()
    }

    /// Corners of the square of side `a` centered on this point, ordered
    /// top-left, top-right, bottom-left, bottom-right.
    pub fn find_corners(&self, a: f64) -> [Mercator; 4] {
        let h = a / 2.0;
        [
            Mercator::new(self.x - h, self.y + h, self.w),
            Mercator::new(self.x + h, self.y + h, self.w),
            Mercator::new(self.x - h, self.y - h, self.w),
            Mercator::new(self.x + h, self.y - h, self.w),
        ]
    }

    /// Strictly inside the box described by `corners` (in
    /// [`Mercator::find_corners`] order).
    pub fn is_within_bounds(&self, corners: &[Mercator; 4]) -> bool {
        corners[0].x < self.x
            && self.x < corners[1].x
            && corners[2].y < self.y
            && self.y < corners[0].y
    }

    /// Points of `points` strictly inside the square of side `a` around this
    /// point.
    pub fn reduce_far_points(&self, points: &[Mercator], a: f64) -> Vec<Mercator> {
        let corners = self.find_corners(a);
        points
            .iter()
            .filter(|p| p.is_within_bounds(&corners))
            .copied()
            .collect()
    }

    pub fn distance_between(&self, other: &Mercator) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Linear width covering `theta` degrees of longitude on a square of
    /// width `w`.
    pub fn width_given_angle(theta: f64, w: f64) -> f64 {
        theta / 360.0 * w
    }

    /// Boxes that together cover every direction within `theta` degrees of
    /// `focus`, projected at width `w`.
    ///
    /// Starts from the latitude band `[φ - θ, φ + θ]` and a longitude
    /// half-span of `asin(sin θ / cos φ)`. A cap that reaches a pole spans
    /// every longitude, and a span crossing ±180° is split in two. The
    /// result always contains the plain `width_given_angle` square around
    /// the projected focus, clipped to the projection square.
    pub fn search_bounds(focus: &Star, theta: f64, w: f64) -> Vec<Bounds> {
        let half = w / 2.0;
        let pad = w.abs() * BOUNDS_PAD;
        if theta.is_nan() || theta < 0.0 {
            return Vec::new();
        }
        let r = focus.norm();
        if r == 0.0 || theta >= 180.0 {
            return vec![Bounds::new(-half - pad, -half - pad, half + pad, half + pad)];
        }

        let lat = (focus.z / r).clamp(-1.0, 1.0).asin().to_degrees();
        let lon = focus.y.atan2(focus.x).to_degrees();
        let lat_hi = lat + theta;
        let lat_lo = lat - theta;

        // y decreases with latitude.
        let min_y = y_of_latitude(lat_hi.min(90.0), w) - pad;
        let max_y = y_of_latitude(lat_lo.max(-90.0), w) + pad;

        if lat_hi >= 90.0 || lat_lo <= -90.0 {
            return vec![Bounds::new(-half - pad, min_y, half + pad, max_y)];
        }

        let ratio = theta.to_radians().sin() / lat.to_radians().cos();
        let dlon = ratio.clamp(-1.0, 1.0).asin().to_degrees();
        let min_x = x_of_longitude(lon - dlon, w) - pad;
        let max_x = x_of_longitude(lon + dlon, w) + pad;

        if min_x < -half {
            vec![
                Bounds::new(min_x + w, min_y, half + pad, max_y),
                Bounds::new(-half - pad, min_y, max_x, max_y),
            ]
        } else if max_x > half {
            vec![
                Bounds::new(min_x, min_y, half + pad, max_y),
                Bounds::new(-half - pad, min_y, max_x - w, max_y),
            ]
        } else {
            vec![Bounds::new(min_x, min_y, max_x, max_y)]
        }
    }
}

#[inline]
fn x_of_longitude(lon_deg: f64, w: f64) -> f64 {
    lon_deg * w / 360.0
}

#[inline]
fn y_of_latitude(lat_deg: f64, w: f64) -> f64 {
    let lat = lat_deg
        .clamp(-MAX_LATITUDE_DEG, MAX_LATITUDE_DEG)
        .to_radians();
    let n = (FRAC_PI_4 + lat / 2.0).tan().ln();
    let half = w.abs() / 2.0;
    (-w * n / (2.0 * PI)).clamp(-half, half)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};

    #[test]
    fn projection_is_bounded() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..2000 {
            let w = rng.random_range(1.0..5000.0);
            let p = Mercator::project(&Star::chance(&mut rng), w);
            assert!(p.x.abs() <= w / 2.0 + 1e-9, "x {} outside {}", p.x, w);
            assert!(p.y.abs() <= w / 2.0 + 1e-9, "y {} outside {}", p.y, w);
        }
        for pole in [Star::new(0.0, 0.0, 1.0), Star::new(0.0, 0.0, -1.0)] {
            let p = Mercator::project(&pole, 1000.0);
            assert!((p.y.abs() - 500.0).abs() < 1e-9);
        }
    }

    #[test]
    fn project_known_points() {
        let p = Mercator::project(&Star::new(1.0, 0.0, 0.0).with_label(4), 1000.0);
        assert!(p.x.abs() < 1e-12 && p.y.abs() < 1e-12);
        assert_eq!(p.label, Some(4));

        let q = Mercator::project(&Star::from_radec(90.0, 0.0), 1000.0);
        assert!((q.x - 250.0).abs() < 1e-9);

        // Northern stars sit above the equator in screen terms (negative y).
        let n = Mercator::project(&Star::from_radec(0.0, 30.0), 1000.0);
        assert!(n.y < 0.0);
    }

    #[test]
    fn inverse_recovers_direction() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            let s = Star::chance(&mut rng);
            let (_, dec) = s.to_radec();
            if dec.abs() >= MAX_LATITUDE_DEG {
                continue;
            }
            let back = Mercator::project(&s, 1000.0).inverse();
            assert!(s.angle_between(&back) < 1e-9);
        }
    }

    #[test]
    fn corners_are_ordered() {
        let c = Mercator::new(10.0, 20.0, 1000.0).find_corners(4.0);
        assert_eq!(c[0], Mercator::new(8.0, 22.0, 1000.0));
        assert_eq!(c[1], Mercator::new(12.0, 22.0, 1000.0));
        assert_eq!(c[2], Mercator::new(8.0, 18.0, 1000.0));
        assert_eq!(c[3], Mercator::new(12.0, 18.0, 1000.0));

        let b = Bounds::from_corners(&c);
        assert_eq!(b, Bounds::new(8.0, 18.0, 12.0, 22.0));
    }

    #[test]
    fn within_bounds_is_strict() {
        let corners = Mercator::new(0.0, 0.0, 100.0).find_corners(10.0);
        assert!(Mercator::new(4.9, -4.9, 100.0).is_within_bounds(&corners));
        assert!(!Mercator::new(5.0, 0.0, 100.0).is_within_bounds(&corners));
        assert!(!Mercator::new(0.0, -5.0, 100.0).is_within_bounds(&corners));
    }

    #[test]
    fn reduce_far_points_keeps_inner() {
        let center = Mercator::new(0.0, 0.0, 100.0);
        let pts = [
            Mercator::new(1.0, 1.0, 100.0),
            Mercator::new(-2.0, 3.0, 100.0),
            Mercator::new(30.0, 0.0, 100.0),
        ];
        let kept = center.reduce_far_points(&pts, 10.0);
        assert_eq!(kept.len(), 2);
        assert!((center.distance_between(&pts[2]) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn transform_point_keeps_ballpark_distance() {
        let mut rng = StdRng::seed_from_u64(5);
        let dpp = 5.0 / 5000.0;
        for _ in 0..20 {
            let (ax, ay): (f64, f64) = (rng.random_range(-2500.0..2500.0), rng.random_range(-2500.0..2500.0));
            let (bx, by) = (rng.random_range(-2500.0..2500.0), rng.random_range(-2500.0..2500.0));
            let pixel_distance = ((ax - bx) * (ax - bx) + (ay - by) * (ay - by)).sqrt() * dpp;
            let c = Mercator::transform_point(ax, ay, dpp);
            let d = Mercator::transform_point(bx, by, dpp);
            assert!((c.angle_between(&d) - pixel_distance).abs() < 0.1);
        }
    }

    #[test]
    fn search_bounds_cover_the_cap() {
        let mut rng = StdRng::seed_from_u64(9);
        let w = 1000.0;
        for _ in 0..200 {
            let focus = Star::chance(&mut rng);
            let theta = rng.random_range(0.5..30.0);
            let boxes = Mercator::search_bounds(&focus, theta, w);
            assert!(!boxes.is_empty());
            for _ in 0..50 {
                let s = Star::chance(&mut rng);
                if focus.angle_between(&s) <= theta {
                    let p = Mercator::project(&s, w);
                    assert!(
                        boxes.iter().any(|b| b.contains(p.x, p.y)),
                        "missed star at {} deg",
                        focus.angle_between(&s)
                    );
                }
            }
        }
    }

    #[test]
    fn search_bounds_contain_linear_square() {
        let focus = Star::from_radec(40.0, 20.0);
        let w = 1000.0;
        let theta = 10.0;
        let p = Mercator::project(&focus, w);
        let a = Mercator::width_given_angle(theta, w);
        let boxes = Mercator::search_bounds(&focus, theta, w);
        assert_eq!(boxes.len(), 1);
        assert!(boxes[0].contains(p.x - a, p.y - a));
        assert!(boxes[0].contains(p.x + a, p.y + a));
    }

    #[test]
    fn search_bounds_split_across_the_seam() {
        let focus = Star::from_radec(178.0, 0.0);
        let boxes = Mercator::search_bounds(&focus, 5.0, 360.0);
        assert_eq!(boxes.len(), 2);
        let across = Mercator::project(&Star::from_radec(-178.0, 0.0), 360.0);
        assert!(boxes.iter().any(|b| b.contains(across.x, across.y)));

        let polar = Mercator::search_bounds(&Star::from_radec(0.0, 88.0), 5.0, 360.0);
        assert_eq!(polar.len(), 1);
        assert!(polar[0].width() >= 360.0);
    }

    #[test]
    fn bounds_overlap_is_inclusive() {
        let a = Bounds::new(0.0, 0.0, 1.0, 1.0);
        assert!(a.intersects(&Bounds::new(1.0, 1.0, 2.0, 2.0)));
        assert!(!a.intersects(&Bounds::new(1.1, 0.0, 2.0, 1.0)));
        assert_eq!(a.union(&Bounds::new(2.0, -1.0, 3.0, 0.5)), Bounds::new(0.0, -1.0, 3.0, 1.0));
    }
}
