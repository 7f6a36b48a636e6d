//! Attitude as a unit quaternion, plus the solvers that recover it from
//! matched vector pairs.
//!
//! Conventions: [`Rotation::rotate`] applies the active rotation `R·v`.
//! Both solvers return the rotation that carries the *second* frame onto
//! the *first*, so `solved.rotate(&c) ≈ b` for every pair `(b, c)`.

use std::fmt;
use std::ops::Mul;

use nalgebra::{Matrix3, Quaternion, Unit, UnitQuaternion};
use rand::Rng;
use tracing::debug;

use crate::Star;

/// Relative size below which a cross product counts as parallel input.
const PARALLEL_TOLERANCE: f64 = 1e-12;

/// A unit quaternion. Every constructor normalizes, so `‖q‖ = 1` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation(UnitQuaternion<f64>);

impl Rotation {
    pub fn identity() -> Self {
        Self(UnitQuaternion::identity())
    }

    /// Normalized quaternion `w + i·x + j·y + k·z`; `None` for a zero or
    /// non-finite input.
    pub fn from_components(w: f64, i: f64, j: f64, k: f64) -> Option<Self> {
        let q = Quaternion::new(w, i, j, k);
        let n = q.norm();
        if !n.is_finite() || n == 0.0 {
            return None;
        }
        Some(Self(UnitQuaternion::new_normalize(q)))
    }

    /// Right-handed rotation of `angle_deg` degrees about `axis`.
    pub fn from_axis_angle(axis: &Star, angle_deg: f64) -> Option<Self> {
        let axis = Unit::try_new(axis.uvec(), 0.0)?;
        Some(Self(UnitQuaternion::from_axis_angle(
            &axis,
            angle_deg.to_radians(),
        )))
    }

    pub fn from_unit_quaternion(q: UnitQuaternion<f64>) -> Self {
        Self(q)
    }

    pub fn as_unit_quaternion(&self) -> &UnitQuaternion<f64> {
        &self.0
    }

    pub fn w(&self) -> f64 {
        self.0.w
    }

    pub fn i(&self) -> f64 {
        self.0.i
    }

    pub fn j(&self) -> f64 {
        self.0.j
    }

    pub fn k(&self) -> f64 {
        self.0.k
    }

    /// Norm of the underlying quaternion.
    pub fn norm(&self) -> f64 {
        self.0.quaternion().norm()
    }

    /// Rotation angle in degrees, in `[0, 180]`.
    pub fn angle(&self) -> f64 {
        self.0.angle().to_degrees()
    }

    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    /// Explicit 3×3 rotation matrix.
    pub fn matrix(&self) -> Matrix3<f64> {
        let (w, x, y, z) = (self.w(), self.i(), self.j(), self.k());
        Matrix3::new(
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        )
    }

    /// Rotate one vector. Label and magnitude are kept.
    pub fn rotate(&self, star: &Star) -> Star {
        rotate_with(&self.matrix(), star)
    }

    /// Rotate many vectors, building the matrix once.
    pub fn rotate_all(&self, stars: &[Star]) -> Vec<Star> {
        let m = self.matrix();
        stars.iter().map(|s| rotate_with(&m, s)).collect()
    }

    /// Equality up to `epsilon` per component, treating `q` and `-q` as the
    /// same rotation.
    pub fn approx_eq(&self, other: &Rotation, epsilon: f64) -> bool {
        let a = self.0.coords;
        let b = other.0.coords;
        (a - b).amax() < epsilon || (a + b).amax() < epsilon
    }

    /// Random rotation taking one random direction onto another.
    ///
    /// Convenient for tests; the distribution is not Haar-uniform.
    pub fn chance<R: Rng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let p = Star::chance(rng);
            let q = Star::chance(rng);
            let c = p.cross(&q);
            if let Some(r) = Self::from_components(1.0 + p.dot(&q), c.x, c.y, c.z) {
                return r;
            }
        }
    }

    /// Quaternion of a proper rotation matrix.
    ///
    /// Branches on the largest of the trace and the diagonal (Shepperd), so
    /// the divisor is never smaller than 1, including near 180° rotations.
    pub fn from_matrix(m: &Matrix3<f64>) -> Option<Self> {
        let tr = m.trace();
        let (m00, m11, m22) = (m[(0, 0)], m[(1, 1)], m[(2, 2)]);

        let (w, x, y, z) = if tr >= m00 && tr >= m11 && tr >= m22 {
            let s = 2.0 * (1.0 + tr).sqrt();
            (
                s / 4.0,
                (m[(2, 1)] - m[(1, 2)]) / s,
                (m[(0, 2)] - m[(2, 0)]) / s,
                (m[(1, 0)] - m[(0, 1)]) / s,
            )
        } else if m00 >= m11 && m00 >= m22 {
            let s = 2.0 * (1.0 + m00 - m11 - m22).sqrt();
            (
                (m[(2, 1)] - m[(1, 2)]) / s,
                s / 4.0,
                (m[(0, 1)] + m[(1, 0)]) / s,
                (m[(0, 2)] + m[(2, 0)]) / s,
            )
        } else if m11 >= m22 {
            let s = 2.0 * (1.0 + m11 - m00 - m22).sqrt();
            (
                (m[(0, 2)] - m[(2, 0)]) / s,
                (m[(0, 1)] + m[(1, 0)]) / s,
                s / 4.0,
                (m[(1, 2)] + m[(2, 1)]) / s,
            )
        } else {
            let s = 2.0 * (1.0 + m22 - m00 - m11).sqrt();
            (
                (m[(1, 0)] - m[(0, 1)]) / s,
                (m[(0, 2)] + m[(2, 0)]) / s,
                (m[(1, 2)] + m[(2, 1)]) / s,
                s / 4.0,
            )
        };
        Self::from_components(w, x, y, z)
    }

    /// TRIAD: rotation carrying the pair `c` onto the pair `b`.
    ///
    /// The first vector of each pair is matched exactly; the second only
    /// fixes the roll about it. Returns `None` if either pair is zero or
    /// parallel.
    pub fn rotation_across_frames(b: &[Star; 2], c: &[Star; 2]) -> Option<Self> {
        let Some(tb) = triad(&b[0], &b[1]) else {
            debug!("TRIAD rejected degenerate first pair");
            return None;
        };
        let Some(tc) = triad(&c[0], &c[1]) else {
            debug!("TRIAD rejected degenerate second pair");
            return None;
        };
        Self::from_matrix(&(tb * tc.transpose()))
    }

    /// Least-squares rotation carrying `frame_b[i]` onto `frame_a[i]` for
    /// every matched pair (Wahba's problem, solved by SVD).
    ///
    /// Needs at least two non-parallel pairs; returns `None` otherwise.
    pub fn solve_wahba(frame_a: &[Star], frame_b: &[Star]) -> Option<Self> {
        if frame_a.len() != frame_b.len() || frame_a.len() < 2 {
            return None;
        }
        let mut h = Matrix3::<f64>::zeros();
        for (a, b) in frame_a.iter().zip(frame_b) {
            h += a.as_unit().uvec() * b.as_unit().uvec().transpose();
        }

        let svd = h.svd(true, true);
        let sv = svd.singular_values;
        let smax = sv.max();
        let rank = sv.iter().filter(|&&s| s > smax * PARALLEL_TOLERANCE).count();
        if smax == 0.0 || rank < 2 {
            debug!("Wahba solve rejected rank-{} attitude profile", rank);
            return None;
        }
        let u = svd.u?;
        let v_t = svd.v_t?;

        // Keep det(R) = +1.
        let d = (u * v_t).determinant().signum();
        let correction = Matrix3::from_diagonal(&nalgebra::Vector3::new(1.0, 1.0, d));
        Self::from_matrix(&(u * correction * v_t))
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

/// Hamilton product: `(a * b).rotate(v) == a.rotate(&b.rotate(v))`.
impl Mul for Rotation {
    type Output = Rotation;

    fn mul(self, rhs: Rotation) -> Rotation {
        Rotation(self.0 * rhs.0)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rotation(w={:.9}, i={:.9}, j={:.9}, k={:.9})",
            self.w(),
            self.i(),
            self.j(),
            self.k()
        )
    }
}

fn rotate_with(m: &Matrix3<f64>, star: &Star) -> Star {
    let v = m * star.uvec();
    Star {
        x: v.x,
        y: v.y,
        z: v.z,
        ..*star
    }
}

/// Orthonormal triad as matrix columns `[v1̂, (v1×v2)̂, (v1×(v1×v2))̂]`.
fn triad(v1: &Star, v2: &Star) -> Option<Matrix3<f64>> {
    let a = v1.uvec();
    let b = v2.uvec();
    let na = a.norm();
    let cross = a.cross(&b);
    if na == 0.0 || cross.norm() <= PARALLEL_TOLERANCE * na * b.norm() {
        return None;
    }
    let e1 = a / na;
    let e2 = cross.normalize();
    let e3 = e1.cross(&e2).normalize();
    Some(Matrix3::from_columns(&[e1, e2, e3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn factories_return_unit_quaternions() {
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..500 {
            let r = Rotation::chance(&mut rng);
            assert!((r.norm() - 1.0).abs() < 1e-12);
        }
        let r = Rotation::from_components(2.0, 0.0, 0.0, 0.0).unwrap();
        assert!((r.norm() - 1.0).abs() < 1e-15);
        assert!(Rotation::from_components(0.0, 0.0, 0.0, 0.0).is_none());
        assert!(Rotation::from_components(f64::NAN, 1.0, 0.0, 0.0).is_none());
    }

    #[test]
    fn rotate_about_z() {
        let r = Rotation::from_axis_angle(&Star::new(0.0, 0.0, 1.0), 90.0).unwrap();
        let v = r.rotate(&Star::new(1.0, 0.0, 0.0).with_label(8));
        assert_eq!(v, Star::new(0.0, 1.0, 0.0));
        assert_eq!(v.label, Some(8));
    }

    #[test]
    fn matrix_agrees_with_nalgebra() {
        let mut rng = StdRng::seed_from_u64(22);
        for _ in 0..50 {
            let r = Rotation::chance(&mut rng);
            let expected = r.as_unit_quaternion().to_rotation_matrix().into_inner();
            assert_relative_eq!(r.matrix(), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn hamilton_product_composes() {
        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..50 {
            let a = Rotation::chance(&mut rng);
            let b = Rotation::chance(&mut rng);
            let v = Star::chance(&mut rng);
            let lhs = (a * b).rotate(&v);
            let rhs = a.rotate(&b.rotate(&v));
            assert!(lhs.approx_eq(&rhs, 1e-12));
        }
        let id = Rotation::identity();
        let a = Rotation::chance(&mut rng);
        assert!((a * id).approx_eq(&a, 1e-15));
        assert!((a * a.inverse()).approx_eq(&id, 1e-12));
    }

    #[test]
    fn double_cover_is_equal() {
        let a = Rotation::from_components(0.5, 0.5, 0.5, 0.5).unwrap();
        let b = Rotation::from_components(-0.5, -0.5, -0.5, -0.5).unwrap();
        assert!(a.approx_eq(&b, 1e-15));
    }

    #[test]
    fn triad_round_trip() {
        let mut rng = StdRng::seed_from_u64(24);
        for _ in 0..500 {
            let q = Rotation::chance(&mut rng);
            let b = [Star::chance(&mut rng), Star::chance(&mut rng)];
            let c = [q.rotate(&b[0]), q.rotate(&b[1])];
            let r = Rotation::rotation_across_frames(&b, &c).unwrap();
            assert!(r.rotate(&c[0]).approx_eq(&b[0], 1e-9));
            assert!(r.rotate(&c[1]).approx_eq(&b[1], 1e-9));
            assert!(r.approx_eq(&q.inverse(), 1e-9));
        }
    }

    #[test]
    fn triad_handles_half_turns() {
        for axis in [
            Star::new(1.0, 0.0, 0.0),
            Star::new(0.0, 1.0, 0.0),
            Star::new(0.0, 0.0, 1.0),
            Star::new(1.0, 1.0, 0.0),
        ] {
            let q = Rotation::from_axis_angle(&axis, 180.0).unwrap();
            let b = [Star::new(0.3, -0.2, 0.9).as_unit(), Star::new(-0.5, 0.7, 0.1).as_unit()];
            let c = [q.rotate(&b[0]), q.rotate(&b[1])];
            let r = Rotation::rotation_across_frames(&b, &c).unwrap();
            assert!(r.w().is_finite());
            assert!(r.rotate(&c[0]).approx_eq(&b[0], 1e-9));
            assert!(r.rotate(&c[1]).approx_eq(&b[1], 1e-9));
        }
    }

    #[test]
    fn triad_rejects_parallel_pairs() {
        let a = Star::new(1.0, 0.0, 0.0);
        let b = Star::new(0.0, 1.0, 0.0);
        assert!(Rotation::rotation_across_frames(&[a, a * 2.0], &[a, b]).is_none());
        assert!(Rotation::rotation_across_frames(&[a, b], &[Star::new(0.0, 0.0, 0.0), b]).is_none());
    }

    #[test]
    fn wahba_recovers_rotation() {
        let mut rng = StdRng::seed_from_u64(25);
        let q = Rotation::chance(&mut rng);
        let body: Vec<Star> = (0..6).map(|_| Star::chance(&mut rng)).collect();
        let moved = q.rotate_all(&body);
        let r = Rotation::solve_wahba(&body, &moved).unwrap();
        assert!(r.approx_eq(&q.inverse(), 1e-9));
        assert!(Rotation::solve_wahba(&body[..1], &moved[..1]).is_none());
    }
}
