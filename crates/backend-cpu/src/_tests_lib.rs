//! Tests for the CPU transform.
//!
//! These check the FFT against the properties the field algebra relies on:
//! the round trip, the mean-mode scaling and the placement of plane waves in
//! the rectangular mode layout.

#![cfg(test)]

use crate::{plane_config, FftTransform};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use specfield_core::field::SpectralField;
use specfield_core::grid::Grid2D;
use specfield_core::transform::{SpectralTransform, TransformDirection};
use std::f64::consts::PI;

fn random_samples(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0..=1.0)).collect()
}

// ============================================================================
// Transform Tests
// ============================================================================

#[test]
fn fft_roundtrip_recovers_signal() {
    let grid = Grid2D::new(6, 4, 1.0, 1.0);
    let transform = FftTransform::new(grid);
    let original: Vec<f64> = (0..grid.len()).map(|idx| idx as f64 - 3.5).collect();

    let mut spectral = vec![Complex64::default(); grid.len()];
    let mut recovered = vec![0.0; grid.len()];
    transform.forward(&original, &mut spectral);
    transform.backward(&spectral, &mut recovered);

    for (rec, expect) in recovered.iter().zip(&original) {
        let diff = (rec - expect).abs();
        assert!(diff < 1e-12, "FFT roundtrip diverged: diff={diff}");
    }
}

#[test]
fn fft_forward_of_constant_is_dc_component() {
    let grid = Grid2D::new(4, 4, 1.0, 1.0);
    let transform = FftTransform::new(grid);
    let n = grid.len() as f64;
    let mut spectral = vec![Complex64::default(); grid.len()];

    transform.forward(&vec![1.0; grid.len()], &mut spectral);

    // DC component should be n (sum of all 1s)
    let dc = spectral[0];
    assert!(
        (dc - Complex64::new(n, 0.0)).norm() < 1e-9,
        "DC component should be {n}, got {dc}"
    );
    for (idx, &value) in spectral.iter().enumerate().skip(1) {
        assert!(
            value.norm() < 1e-9,
            "Non-DC component at index {idx} should be zero, got {value}"
        );
    }
}

#[test]
fn fft_of_cosine_wave_peaks_at_matching_modes() {
    let (nx, ny) = (8, 4);
    let grid = Grid2D::new(nx, ny, 1.0, 1.0);
    let transform = FftTransform::new(grid);

    // cos(2π x) with one cycle across x splits between kx = 1 and kx = nx - 1.
    let samples: Vec<f64> = (0..grid.len())
        .map(|idx| (2.0 * PI * (idx % nx) as f64 / nx as f64).cos())
        .collect();
    let mut spectral = vec![Complex64::default(); grid.len()];
    transform.forward(&samples, &mut spectral);

    let half = grid.len() as f64 / 2.0;
    for (idx, value) in spectral.iter().enumerate() {
        let expected = if idx == grid.idx(0, 1) || idx == grid.idx(0, nx - 1) {
            half
        } else {
            0.0
        };
        assert!(
            (value.norm() - expected).abs() < 1e-9,
            "index {idx}: expected magnitude {expected}, got {value}"
        );
    }
}

#[test]
fn fft_of_row_wave_uses_degree_axis() {
    let (nx, ny) = (4, 8);
    let grid = Grid2D::new(nx, ny, 1.0, 1.0);
    let transform = FftTransform::new(grid);

    let samples: Vec<f64> = (0..grid.len())
        .map(|idx| (2.0 * PI * 2.0 * (idx / nx) as f64 / ny as f64).sin())
        .collect();
    let mut spectral = vec![Complex64::default(); grid.len()];
    transform.forward(&samples, &mut spectral);

    let peak = spectral[grid.idx(2, 0)];
    let half = grid.len() as f64 / 2.0;
    assert!((peak - Complex64::new(0.0, -half)).norm() < 1e-9, "got {peak}");
}

// ============================================================================
// Field Integration
// ============================================================================

#[test]
fn constant_field_mean_mode_is_value_times_point_count() {
    let config = plane_config(Grid2D::new(4, 4, 1.0, 1.0));
    let mut field = SpectralField::zeros(&config);
    field.set_all_physical(3.0);
    let mean = field.get_spectral(0, 0);
    assert!((mean.re - 48.0).abs() < 1e-12, "got {mean}");
    assert!(mean.im.abs() < 1e-12);
}

#[test]
fn field_round_trip_through_fft_backend() {
    let grid = Grid2D::new(32, 16, 1.0, 1.0);
    let config = plane_config(grid);
    let samples = random_samples(grid.len(), 5);
    let field = SpectralField::from_physical(&config, samples.clone());

    field.ensure_spectral();
    field.ensure_physical();
    for (got, expected) in field.physical_values().iter().zip(&samples) {
        assert!((got - expected).abs() < 1e-12);
    }
    assert_eq!(config.transform_count(TransformDirection::Forward), 1);
    assert_eq!(config.transform_count(TransformDirection::Backward), 1);
}

#[test]
fn spectral_scalar_shift_matches_physical_shift() {
    let grid = Grid2D::new(8, 8, 1.0, 1.0);
    let config = plane_config(grid);
    let samples = random_samples(grid.len(), 9);
    let physical = SpectralField::from_physical(&config, samples.clone());
    let spectral = SpectralField::from_physical(&config, samples);
    spectral.ensure_spectral();

    let a = &physical + 2.5;
    let b = &spectral + 2.5;
    for (x, y) in a.physical_values().iter().zip(b.physical_values()) {
        assert!((x - y).abs() < 1e-12);
    }
}

#[test]
fn spectral_derivative_operator_matches_analytic_derivative() {
    let (nx, ny) = (16, 8);
    let grid = Grid2D::new(nx, ny, 2.0 * PI, 2.0 * PI);
    let config = plane_config(grid);
    let field = SpectralField::from_physical_fn(&config, |_, col| {
        (2.0 * PI * col as f64 / nx as f64 * 3.0).sin()
    });

    // d/dx on a 2π-periodic grid: multiply mode kx by i * kx (signed wavenumber).
    let mut derivative_op = SpectralField::zeros(&config);
    derivative_op.set_all_spectral(0.0, 0.0);
    derivative_op.update_spectral(|idx, value| {
        let kx = (idx % nx) as isize;
        let signed = if kx > nx as isize / 2 { kx - nx as isize } else { kx };
        *value = Complex64::new(0.0, signed as f64);
    });

    let derivative = field.spectral_mul_element_wise(&derivative_op);
    for col in 0..nx {
        let x = 2.0 * PI * col as f64 / nx as f64;
        let expected = 3.0 * (3.0 * x).cos();
        for row in 0..ny {
            let got = derivative.get_physical(row, col);
            assert!((got - expected).abs() < 1e-10, "({row}, {col}): {got} vs {expected}");
        }
    }
}
