//! CPU spectral transform built on rustfft.
//!
//! [`FftTransform`] is the full complex 2D FFT of a real grid, laid out like
//! the physical grid (`[ky][kx]`, row-major), which is exactly the
//! rectangular mode layout of `specfield-core`. Forward is unnormalized;
//! backward divides by `nx * ny` and keeps the real part.

use std::sync::Arc;

use log::debug;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use specfield_core::grid::Grid2D;
use specfield_core::grid_config::GridConfig;
use specfield_core::modes::ModeLayout;
use specfield_core::transform::SpectralTransform;

pub struct FftTransform {
    grid: Grid2D,
    forward_x: Arc<dyn Fft<f64>>,
    forward_y: Arc<dyn Fft<f64>>,
    inverse_x: Arc<dyn Fft<f64>>,
    inverse_y: Arc<dyn Fft<f64>>,
}

impl FftTransform {
    pub fn new(grid: Grid2D) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        debug!("planning {}x{} FFT", grid.nx, grid.ny);
        Self {
            grid,
            forward_x: planner.plan_fft_forward(grid.nx),
            forward_y: planner.plan_fft_forward(grid.ny),
            inverse_x: planner.plan_fft_inverse(grid.nx),
            inverse_y: planner.plan_fft_inverse(grid.ny),
        }
    }

    pub fn grid(&self) -> Grid2D {
        self.grid
    }

    /// Row FFTs followed by column FFTs, in place.
    fn process_2d(&self, data: &mut [Complex64], fft_x: &dyn Fft<f64>, fft_y: &dyn Fft<f64>) {
        let (nx, ny) = (self.grid.nx, self.grid.ny);

        for row in data.chunks_exact_mut(nx) {
            fft_x.process(row);
        }

        // Column FFTs (gather/scatter)
        let mut col_buf = vec![Complex64::default(); ny];
        for col in 0..nx {
            for (row, slot) in col_buf.iter_mut().enumerate() {
                *slot = data[row * nx + col];
            }
            fft_y.process(&mut col_buf);
            for (row, value) in col_buf.iter().enumerate() {
                data[row * nx + col] = *value;
            }
        }
    }
}

impl SpectralTransform for FftTransform {
    fn forward(&self, physical: &[f64], spectral: &mut [Complex64]) {
        for (out, &value) in spectral.iter_mut().zip(physical) {
            *out = Complex64::new(value, 0.0);
        }
        self.process_2d(spectral, self.forward_x.as_ref(), self.forward_y.as_ref());
    }

    fn backward(&self, spectral: &[Complex64], physical: &mut [f64]) {
        let scale = 1.0 / self.grid.len() as f64;
        let mut work = spectral.to_vec();
        self.process_2d(&mut work, self.inverse_x.as_ref(), self.inverse_y.as_ref());
        for (out, value) in physical.iter_mut().zip(&work) {
            *out = value.re * scale;
        }
    }

    fn name(&self) -> &str {
        "rustfft-2d"
    }
}

/// Grid configuration with the rectangular layout and an FFT transform.
pub fn plane_config(grid: Grid2D) -> Arc<GridConfig> {
    GridConfig::new(
        grid,
        ModeLayout::rectangular(grid.nx, grid.ny),
        Box::new(FftTransform::new(grid)),
    )
}

#[cfg(test)]
mod _tests_lib;
