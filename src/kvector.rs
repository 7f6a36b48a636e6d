//! K-vector range search over a sorted numeric column.
//!
//! For a column `x` sorted ascending with `n` rows, a line
//! `Z(i) = m·i + q` is laid from just below `x[0]` to just above `x[n-1]`
//! and `K[i]` counts the rows with `x < Z(i)`. A query `[lo, hi]` maps both
//! bounds onto the line, reads two entries of `K`, and gets a row range that
//! differs from the exact answer by at most a bucket at each end. The
//! [`KVector::query`] path trims that slack against the column itself, so
//! results are exact.
//!
//! Reference: D. Mortari, "Search-Less Algorithm for Star Pattern
//! Recognition", J. Astronautical Sciences 45(2), 1997.

use std::ops::Range;

use rkyv::{Archive, Deserialize, Serialize};
use tracing::debug;

use crate::error::KVectorError;

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct KVector {
    m: f64,
    q: f64,
    /// `k[i]` = rows strictly below `Z(i)`, for `i` in `0..=n+1`.
    k: Vec<u64>,
    first: f64,
    last: f64,
}

impl KVector {
    /// Build over a column already sorted ascending.
    ///
    /// An empty column gives an empty index whose queries return no rows.
    pub fn build(sorted: &[f64]) -> Result<Self, KVectorError> {
        let n = sorted.len();
        let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
            debug!("Built empty K-vector");
            return Ok(Self {
                m: 1.0,
                q: 0.0,
                k: vec![0, 0],
                first: 0.0,
                last: 0.0,
            });
        };
        if let Some(row) = sorted.iter().position(|v| !v.is_finite()) {
            return Err(KVectorError::NonFinite(row));
        }
        if let Some(row) = sorted.windows(2).position(|w| w[1] < w[0]) {
            return Err(KVectorError::Unsorted(row + 1));
        }

        // Machine epsilon at the scale of the data.
        let eps = f64::EPSILON * first.abs().max(last.abs()).max(1.0);
        let m = (last - first + 2.0 * eps) / n as f64;
        let q = first - m - eps;

        let mut k = Vec::with_capacity(n + 2);
        let mut below = 0usize;
        for i in 0..=n + 1 {
            let z = m * i as f64 + q;
            while below < n && sorted[below] < z {
                below += 1;
            }
            k.push(below as u64);
        }
        // Pin the ends regardless of rounding in Z.
        k[0] = 0;
        k[n + 1] = n as u64;

        debug!("Built K-vector over {} rows (m = {:e}, q = {:e})", n, m, q);
        Ok(Self {
            m,
            q,
            k,
            first,
            last,
        })
    }

    /// Number of rows indexed.
    pub fn len(&self) -> usize {
        self.k.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slope of the bucket line.
    pub fn slope(&self) -> f64 {
        self.m
    }

    /// Intercept of the bucket line.
    pub fn intercept(&self) -> f64 {
        self.q
    }

    pub fn k(&self) -> &[u64] {
        &self.k
    }

    /// Bucket index of `y` on the line, clamped into `K`.
    fn bucket(&self, y: f64, round: fn(f64) -> f64) -> usize {
        let j = round((y - self.q) / self.m);
        j.clamp(0.0, (self.k.len() - 1) as f64) as usize
    }

    /// Row range bracketing every row with value in `[lo, hi]`, computed
    /// from `K` alone. May include up to a bucket of extra rows at each end.
    pub fn candidate_rows(&self, lo: f64, hi: f64) -> Range<usize> {
        if self.is_empty() || lo.is_nan() || hi.is_nan() || lo > hi {
            return 0..0;
        }
        let j_lo = self.bucket(lo, f64::floor).saturating_sub(1);
        let j_hi = (self.bucket(hi, f64::ceil) + 1).min(self.k.len() - 1);
        let start = self.k[j_lo] as usize;
        let end = (self.k[j_hi] as usize).max(start);
        start..end
    }

    /// Exact row range of `column` whose values lie in `[lo, hi]`.
    ///
    /// `column` must be the column this index was built from. A column whose
    /// length or extremes differ is reported as [`KVectorError::Stale`].
    pub fn query(&self, column: &[f64], lo: f64, hi: f64) -> Result<Range<usize>, KVectorError> {
        if lo.is_nan() || hi.is_nan() {
            return Err(KVectorError::InvalidRange(lo, hi));
        }
        if self.is_empty() {
            return if column.is_empty() {
                Ok(0..0)
            } else {
                Err(KVectorError::Stale)
            };
        }
        if column.len() != self.len()
            || column.first() != Some(&self.first)
            || column.last() != Some(&self.last)
        {
            return Err(KVectorError::Stale);
        }
        if lo > hi {
            return Ok(0..0);
        }

        let Range { mut start, mut end } = self.candidate_rows(lo, hi);
        let n = column.len();

        // Widen past any row the bucket rounding left out.
        while start > 0 && column[start - 1] >= lo {
            start -= 1;
        }
        while end < n && column[end] <= hi {
            end += 1;
        }
        // Then drop the slack at both ends.
        while start < end && column[start] < lo {
            start += 1;
        }
        while end > start && column[end - 1] > hi {
            end -= 1;
        }
        Ok(start..end)
    }
}
