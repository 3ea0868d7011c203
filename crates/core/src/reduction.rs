//! Reductions over the physical representation.
//!
//! Sums are evaluated over fixed-size chunks in parallel and the per-chunk
//! partials are combined in chunk order, so every result is independent of
//! the number of worker threads. The `*_quad` variants use Kahan
//! compensated summation both inside the chunks and when combining them.

use rayon::prelude::*;

use crate::field::SpectralField;

/// Elements per reduction chunk.
pub const REDUCTION_CHUNK: usize = 4096;

// ============================================================================
// Kahan summation
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    /// Fold another partial sum (value and pending correction) into this one.
    #[inline]
    pub fn merge(&mut self, other: KahanSum) {
        self.add(other.sum);
        self.add(-other.compensation);
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.sum - self.compensation
    }

    pub fn sum_iter<I: IntoIterator<Item = f64>>(iter: I) -> f64 {
        let mut kahan = Self::new();
        for v in iter {
            kahan.add(v);
        }
        kahan.value()
    }
}

// ============================================================================
// Deterministic chunked kernels
// ============================================================================

/// Plain summation of `f(x)` with a thread-count independent combine order.
pub fn chunked_sum<F>(values: &[f64], f: F) -> f64
where
    F: Fn(f64) -> f64 + Sync,
{
    let partials: Vec<f64> = values
        .par_chunks(REDUCTION_CHUNK)
        .map(|chunk| chunk.iter().fold(0.0, |acc, &v| acc + f(v)))
        .collect();
    partials.into_iter().fold(0.0, |acc, v| acc + v)
}

/// Kahan summation of `f(x)` with a thread-count independent combine order.
pub fn chunked_kahan_sum<F>(values: &[f64], f: F) -> f64
where
    F: Fn(f64) -> f64 + Sync,
{
    let partials: Vec<KahanSum> = values
        .par_chunks(REDUCTION_CHUNK)
        .map(|chunk| {
            let mut kahan = KahanSum::new();
            for &v in chunk {
                kahan.add(f(v));
            }
            kahan
        })
        .collect();
    let mut total = KahanSum::new();
    for partial in partials {
        total.merge(partial);
    }
    total.value()
}

// ============================================================================
// Field reductions
// ============================================================================

impl SpectralField {
    pub fn reduce_max(&self) -> f64 {
        self.read_physical(|values| {
            values
                .par_iter()
                .copied()
                .reduce(|| f64::MIN, f64::max)
        })
    }

    pub fn reduce_min(&self) -> f64 {
        self.read_physical(|values| {
            values
                .par_iter()
                .copied()
                .reduce(|| f64::MAX, f64::min)
        })
    }

    pub fn reduce_max_abs(&self) -> f64 {
        self.read_physical(|values| {
            values
                .par_iter()
                .map(|v| v.abs())
                .reduce(|| 0.0, f64::max)
        })
    }

    pub fn reduce_sum(&self) -> f64 {
        self.read_physical(|values| chunked_sum(values, |v| v))
    }

    pub fn reduce_sum_quad(&self) -> f64 {
        self.read_physical(|values| chunked_kahan_sum(values, |v| v))
    }

    /// Root mean square.
    pub fn reduce_rms(&self) -> f64 {
        self.read_physical(|values| (chunked_sum(values, |v| v * v) / values.len() as f64).sqrt())
    }

    pub fn reduce_rms_quad(&self) -> f64 {
        self.read_physical(|values| {
            (chunked_kahan_sum(values, |v| v * v) / values.len() as f64).sqrt()
        })
    }

    /// Sum of absolute values.
    pub fn reduce_norm1(&self) -> f64 {
        self.read_physical(|values| chunked_sum(values, f64::abs))
    }

    pub fn reduce_norm1_quad(&self) -> f64 {
        self.read_physical(|values| chunked_kahan_sum(values, f64::abs))
    }

    /// Euclidean norm.
    pub fn reduce_norm2(&self) -> f64 {
        self.read_physical(|values| chunked_sum(values, |v| v * v).sqrt())
    }

    pub fn reduce_norm2_quad(&self) -> f64 {
        self.read_physical(|values| chunked_kahan_sum(values, |v| v * v).sqrt())
    }

    /// True iff no sample is NaN or infinite.
    ///
    /// Evaluated as a full logical-AND reduction (no early exit).
    pub fn reduce_all_finite(&self) -> bool {
        self.read_physical(|values| {
            values
                .par_iter()
                .map(|v| v.is_finite())
                .reduce(|| true, |a, b| a && b)
        })
    }
}
