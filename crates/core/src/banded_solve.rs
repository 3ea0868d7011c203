//! Applying and inverting complex banded operators on spectral fields.
//!
//! Every order block is independent, so both operations run one block per
//! rayon task and scatter the block results back through the mode layout.
//! The solver is a banded Gaussian elimination with partial pivoting; row
//! swaps widen the upper band from `h` to `2h`.

use std::sync::Arc;

use log::debug;
use num_complex::Complex64;
use num_traits::Zero;
use rayon::prelude::*;

use crate::banded::BandedMatrix;
use crate::error::BandedSolveError;
use crate::field::SpectralField;

impl BandedMatrix<Complex64> {
    /// `A * x` in spectral space.
    pub fn apply(&self, x: &SpectralField) -> SpectralField {
        assert!(
            Arc::ptr_eq(self.config(), x.config()),
            "banded operator and field belong to different grid configurations"
        );
        let modes = *self.config().modes();
        let halo = self.halo_radius() as isize;

        let blocks: Vec<Vec<Complex64>> = x.read_spectral(|xs| {
            (0..=modes.max_order())
                .into_par_iter()
                .map(|order| {
                    modes
                        .block_degrees(order)
                        .map(|degree| {
                            let mut acc = Complex64::zero();
                            for rel in -halo..=halo {
                                let coeff = self.get_element(degree, order, rel);
                                if coeff.is_zero() {
                                    continue;
                                }
                                let neighbor = (degree as isize + rel) as usize;
                                acc += coeff * xs[modes.index(neighbor, order)];
                            }
                            acc
                        })
                        .collect()
                })
                .collect()
        });

        let mut out = vec![Complex64::zero(); modes.len()];
        for (order, block) in blocks.into_iter().enumerate() {
            for (offset, value) in modes.block_offsets(order).zip(block) {
                out[offset] = value;
            }
        }
        SpectralField::from_spectral(self.config(), out)
    }

    /// Solve `A * x = rhs` block by block.
    pub fn solve(&self, rhs: &SpectralField) -> Result<SpectralField, BandedSolveError> {
        if !Arc::ptr_eq(self.config(), rhs.config()) {
            return Err(BandedSolveError::ConfigMismatch);
        }
        let modes = *self.config().modes();
        debug!(
            "banded solve: {} order blocks, halo {}",
            modes.max_order() + 1,
            self.halo_radius()
        );

        let blocks: Vec<Result<Vec<Complex64>, BandedSolveError>> = rhs.read_spectral(|bs| {
            (0..=modes.max_order())
                .into_par_iter()
                .map(|order| {
                    let b: Vec<Complex64> = modes.block_offsets(order).map(|i| bs[i]).collect();
                    let mut lu = BandLu::assemble(self, order);
                    lu.solve(b).map_err(|local| BandedSolveError::Singular {
                        order,
                        degree: modes.min_degree(order) + local,
                    })
                })
                .collect()
        });

        let mut out = vec![Complex64::zero(); modes.len()];
        for (order, block) in blocks.into_iter().enumerate() {
            for (offset, value) in modes.block_offsets(order).zip(block?) {
                out[offset] = value;
            }
        }
        Ok(SpectralField::from_spectral(self.config(), out))
    }
}

// ============================================================================
// Dense-band elimination for one order block
// ============================================================================

/// Row `i` stores columns `i - kl ..= i + kl + ku`.
struct BandLu {
    n: usize,
    kl: usize,
    ku: usize,
    width: usize,
    ab: Vec<Complex64>,
}

impl BandLu {
    fn assemble(matrix: &BandedMatrix<Complex64>, order: usize) -> Self {
        let modes = matrix.config().modes();
        let n = modes.block_len(order);
        let h = matrix.halo_radius();
        let width = 3 * h + 1;
        let mut lu = Self {
            n,
            kl: h,
            ku: h,
            width,
            ab: vec![Complex64::zero(); n * width],
        };
        let halo = h as isize;
        for (local, degree) in modes.block_degrees(order).enumerate() {
            for rel in -halo..=halo {
                let col = local as isize + rel;
                if col < 0 || col >= n as isize {
                    continue;
                }
                let value = matrix.get_element(degree, order, rel);
                *lu.at(local, col as usize) = value;
            }
        }
        lu
    }

    #[inline]
    fn at(&mut self, row: usize, col: usize) -> &mut Complex64 {
        debug_assert!(col + self.kl >= row && col <= row + self.kl + self.ku);
        &mut self.ab[row * self.width + (col + self.kl - row)]
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> Complex64 {
        self.ab[row * self.width + (col + self.kl - row)]
    }

    /// Returns the local row of the first zero pivot on failure.
    fn solve(&mut self, mut b: Vec<Complex64>) -> Result<Vec<Complex64>, usize> {
        let n = self.n;
        let reach = self.kl + self.ku;

        for k in 0..n {
            let last_row = (k + self.kl).min(n - 1);
            let last_col = (k + reach).min(n - 1);

            let pivot = (k..=last_row)
                .max_by(|&i, &j| self.get(i, k).norm().total_cmp(&self.get(j, k).norm()))
                .unwrap_or(k);
            if self.get(pivot, k).is_zero() {
                return Err(k);
            }
            if pivot != k {
                for col in k..=last_col {
                    let tmp = self.get(k, col);
                    *self.at(k, col) = self.get(pivot, col);
                    *self.at(pivot, col) = tmp;
                }
                b.swap(k, pivot);
            }

            let diag = self.get(k, k);
            for i in k + 1..=last_row {
                let factor = self.get(i, k) / diag;
                if factor.is_zero() {
                    continue;
                }
                *self.at(i, k) = Complex64::zero();
                for col in k + 1..=last_col {
                    let update = factor * self.get(k, col);
                    *self.at(i, col) -= update;
                }
                let update = factor * b[k];
                b[i] -= update;
            }
        }

        for i in (0..n).rev() {
            let last_col = (i + reach).min(n - 1);
            let mut acc = b[i];
            for col in i + 1..=last_col {
                acc -= self.get(i, col) * b[col];
            }
            b[i] = acc / self.get(i, i);
        }
        Ok(b)
    }
}
