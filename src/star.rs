//! The vector primitive shared by every index and invariant.

use std::ops::{Add, Mul, Neg, Sub};

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, UnitSphere};
use rkyv::{Archive, Deserialize, Serialize};

/// Default tolerance for componentwise equality.
pub const STAR_EQUALITY_EPSILON: f64 = 1e-12;

/// A 3D direction (or transient general vector) with an optional catalog
/// label and magnitude.
///
/// The type does not force unit length: sums, differences and zero vectors
/// are valid intermediate values. Callers normalize with [`Star::as_unit`]
/// when a direction is required.
#[derive(Debug, Clone, Copy, Archive, Serialize, Deserialize)]
pub struct Star {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Catalog identifier; `None` when the vector is not tied to a catalog row.
    pub label: Option<u64>,
    /// Apparent magnitude, when known.
    pub magnitude: Option<f64>,
}

impl Star {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            label: None,
            magnitude: None,
        }
    }

    pub fn with_label(mut self, label: u64) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = Some(magnitude);
        self
    }

    /// Unit vector toward right ascension / declination given in degrees.
    pub fn from_radec(ra_deg: f64, dec_deg: f64) -> Self {
        let (sin_ra, cos_ra) = ra_deg.to_radians().sin_cos();
        let (sin_dec, cos_dec) = dec_deg.to_radians().sin_cos();
        Self::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
    }

    /// Right ascension in `[0, 360)` and declination in `[-90, 90]`, degrees.
    pub fn to_radec(&self) -> (f64, f64) {
        let r = self.norm();
        if r == 0.0 {
            return (0.0, 0.0);
        }
        let ra = self.y.atan2(self.x).to_degrees().rem_euclid(360.0);
        let dec = (self.z / r).clamp(-1.0, 1.0).asin().to_degrees();
        (ra, dec)
    }

    /// Components as an `nalgebra` vector.
    pub fn uvec(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn dot(&self, other: &Star) -> f64 {
        self.uvec().dot(&other.uvec())
    }

    /// Cross product. The result carries no label.
    pub fn cross(&self, other: &Star) -> Star {
        Star::from(self.uvec().cross(&other.uvec()))
    }

    pub fn norm(&self) -> f64 {
        self.uvec().norm()
    }

    /// Normalized copy, preserving label and magnitude.
    ///
    /// The zero vector is returned unchanged.
    pub fn as_unit(&self) -> Star {
        let n = self.norm();
        if n == 0.0 {
            return *self;
        }
        Star {
            x: self.x / n,
            y: self.y / n,
            z: self.z / n,
            ..*self
        }
    }

    /// Copy of this star with the label removed.
    pub fn reset_label(&self) -> Star {
        Star {
            label: None,
            ..*self
        }
    }

    /// Copy of this star carrying `label`.
    pub fn define_label(&self, label: u64) -> Star {
        Star {
            label: Some(label),
            ..*self
        }
    }

    /// Componentwise equality within `epsilon`, ignoring label and magnitude.
    pub fn approx_eq(&self, other: &Star, epsilon: f64) -> bool {
        (self.x - other.x).abs() < epsilon
            && (self.y - other.y).abs() < epsilon
            && (self.z - other.z).abs() < epsilon
    }

    /// Great-circle angle to `other`, in degrees.
    ///
    /// Identical vectors give exactly zero; the cosine is clamped so rounding
    /// past ±1 never produces NaN.
    pub fn angle_between(&self, other: &Star) -> f64 {
        if self == other {
            return 0.0;
        }
        let cos = self.as_unit().dot(&other.as_unit()).clamp(-1.0, 1.0);
        cos.acos().to_degrees()
    }

    /// True when every distinct pair in `stars` is strictly closer than
    /// `theta` degrees.
    pub fn within_angle(stars: &[Star], theta: f64) -> bool {
        stars.iter().enumerate().all(|(i, a)| {
            stars[i + 1..]
                .iter()
                .all(|b| a.angle_between(b) < theta)
        })
    }

    /// Uniformly distributed random unit vector.
    pub fn chance<R: Rng + ?Sized>(rng: &mut R) -> Star {
        let [x, y, z]: [f64; 3] = UnitSphere.sample(rng);
        Star::new(x, y, z)
    }

    /// Uniformly distributed random unit vector carrying `label`.
    pub fn chance_labeled<R: Rng + ?Sized>(rng: &mut R, label: u64) -> Star {
        Self::chance(rng).with_label(label)
    }
}

impl PartialEq for Star {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(other, STAR_EQUALITY_EPSILON)
    }
}

impl From<Vector3<f64>> for Star {
    fn from(v: Vector3<f64>) -> Self {
        Star::new(v.x, v.y, v.z)
    }
}

impl From<&Star> for Vector3<f64> {
    fn from(s: &Star) -> Self {
        s.uvec()
    }
}

/// Sum of two vectors; the label and magnitude of the right operand survive.
impl Add for Star {
    type Output = Star;

    fn add(self, rhs: Star) -> Star {
        Star {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
            ..rhs
        }
    }
}

impl Sub for Star {
    type Output = Star;

    fn sub(self, rhs: Star) -> Star {
        Star {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
            ..rhs
        }
    }
}

impl Mul<f64> for Star {
    type Output = Star;

    fn mul(self, k: f64) -> Star {
        Star {
            x: self.x * k,
            y: self.y * k,
            z: self.z * k,
            ..self
        }
    }
}

impl Neg for Star {
    type Output = Star;

    fn neg(self) -> Star {
        self * -1.0
    }
}
