//! Triangle invariants over three vectors.
//!
//! Planar quantities treat the vectors as points in 3-space (no
//! normalization). Spherical quantities treat them as directions on the unit
//! sphere and work in radians.

use crate::error::GeometryError;
use crate::Star;

/// Default quadrisection depth for [`Trio::spherical_moment`].
pub const DEFAULT_MOMENT_DEPTH: u32 = 3;

/// Deepest quadrisection accepted; cost grows as `4^depth`.
pub const MAX_MOMENT_DEPTH: u32 = 10;

/// Three vectors forming a (planar or spherical) triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trio {
    pub b1: Star,
    pub b2: Star,
    pub b3: Star,
}

impl Trio {
    pub fn new(b1: Star, b2: Star, b3: Star) -> Self {
        Self { b1, b2, b3 }
    }

    fn is_degenerate(&self) -> bool {
        self.b1 == self.b2 || self.b2 == self.b3 || self.b3 == self.b1
    }

    /// Side lengths `|b1-b2|, |b2-b3|, |b3-b1|`.
    pub fn planar_lengths(&self) -> [f64; 3] {
        [
            (self.b1 - self.b2).norm(),
            (self.b2 - self.b3).norm(),
            (self.b3 - self.b1).norm(),
        ]
    }

    /// Side lengths as great-circle angles, in radians.
    pub fn spherical_lengths(&self) -> [f64; 3] {
        [
            self.b1.angle_between(&self.b2).to_radians(),
            self.b2.angle_between(&self.b3).to_radians(),
            self.b3.angle_between(&self.b1).to_radians(),
        ]
    }

    /// Heron's formula. Collinear points give exactly zero.
    pub fn planar_area(&self) -> f64 {
        let [a, b, c] = self.planar_lengths();
        let s = (a + b + c) / 2.0;
        (s * (s - a) * (s - b) * (s - c)).max(0.0).sqrt()
    }

    /// Polar moment of the flat triangle about its centroid.
    pub fn planar_moment(&self) -> f64 {
        let [a, b, c] = self.planar_lengths();
        self.planar_area() * (a * a + b * b + c * c) / 36.0
    }

    /// Spherical excess by L'Huilier's theorem, in steradians.
    ///
    /// Zero when two vertices coincide.
    pub fn spherical_area(&self) -> Result<f64, GeometryError> {
        if self.is_degenerate() {
            return Ok(0.0);
        }
        let [a, b, c] = self.spherical_lengths();
        let s = (a + b + c) / 2.0;
        let f = (s / 2.0).tan()
            * ((s - a) / 2.0).tan()
            * ((s - b) / 2.0).tan()
            * ((s - c) / 2.0).tan();
        if f.is_nan() || f < 0.0 {
            return Err(GeometryError::InvalidSphericalTriangle(f));
        }
        Ok(4.0 * f.sqrt().atan())
    }

    /// Mean of the three vertices (not normalized).
    pub fn planar_centroid(&self) -> Star {
        Star::new(
            (self.b1.x + self.b2.x + self.b3.x) / 3.0,
            (self.b1.y + self.b2.y + self.b3.y) / 3.0,
            (self.b1.z + self.b2.z + self.b3.z) / 3.0,
        )
    }

    /// One of the four triangles of a quadrisection along edge midpoints.
    ///
    /// `k = 0, 1, 2` keeps vertex `b1`, `b2` or `b3` respectively; any other
    /// `k` gives the middle triangle of midpoints. Midpoints are taken on the
    /// sphere.
    pub fn cut_triangle(&self, k: usize) -> Trio {
        let m12 = ((self.b1 + self.b2) * 0.5).as_unit();
        let m23 = ((self.b2 + self.b3) * 0.5).as_unit();
        let m31 = ((self.b3 + self.b1) * 0.5).as_unit();
        match k {
            0 => Trio::new(self.b1, m12, m31),
            1 => Trio::new(m12, self.b2, m23),
            2 => Trio::new(m31, m23, self.b3),
            _ => Trio::new(m12, m23, m31),
        }
    }

    fn recurse_spherical_moment(
        &self,
        root_centroid: &Star,
        depth: u32,
    ) -> Result<f64, GeometryError> {
        if depth == 0 {
            let r = root_centroid
                .angle_between(&self.planar_centroid())
                .to_radians();
            return Ok(self.spherical_area()? * r * r);
        }
        let mut total = 0.0;
        for k in 0..4 {
            total += self
                .cut_triangle(k)
                .recurse_spherical_moment(root_centroid, depth - 1)?;
        }
        Ok(total)
    }

    /// Polar moment of the spherical triangle about its centroid, integrated
    /// over `4^depth` sub-triangles.
    pub fn spherical_moment(&self, depth: u32) -> Result<f64, GeometryError> {
        if depth > MAX_MOMENT_DEPTH {
            return Err(GeometryError::DepthTooLarge {
                requested: depth,
                max: MAX_MOMENT_DEPTH,
            });
        }
        if self.is_degenerate() {
            return Ok(0.0);
        }
        let moment = self.recurse_spherical_moment(&self.planar_centroid(), depth)?;
        if moment.is_nan() || moment < 0.0 {
            return Err(GeometryError::InvalidSphericalTriangle(moment));
        }
        Ok(moment)
    }

    /// Angle at `central` between the rays toward `b1` and `b2`, in degrees.
    pub fn dot_angle(b1: &Star, b2: &Star, central: &Star) -> f64 {
        let u = (*b1 - *central).as_unit();
        let v = (*b2 - *central).as_unit();
        u.angle_between(&v)
    }
}
