#![cfg(test)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::_tests_support::{assert_close, dft_config};
use super::field::SpectralField;
use super::grid::Grid2D;
use super::grid_config::GridConfig;
use super::modes::ModeLayout;
use super::reduction::{chunked_kahan_sum, chunked_sum, KahanSum, REDUCTION_CHUNK};

fn random_values(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0..=1.0)).collect()
}

fn spectral_only_config(nx: usize, ny: usize) -> std::sync::Arc<GridConfig> {
    GridConfig::without_transform(Grid2D::new(nx, ny, 1.0, 1.0), ModeLayout::rectangular(nx, ny))
}

#[test]
fn extrema_and_norms_of_small_field() {
    let config = dft_config(3, 2);
    let field = SpectralField::from_physical(&config, vec![1.0, -4.0, 2.0, 0.5, 3.0, -1.5]);

    assert_eq!(field.reduce_max(), 3.0);
    assert_eq!(field.reduce_min(), -4.0);
    assert_eq!(field.reduce_max_abs(), 4.0);
    assert_close(field.reduce_sum(), 1.0, 1e-15);
    assert_close(field.reduce_norm1(), 12.0, 1e-15);
    assert_close(field.reduce_norm1_quad(), 12.0, 1e-15);

    let sum_sq: f64 = 1.0 + 16.0 + 4.0 + 0.25 + 9.0 + 2.25;
    assert_close(field.reduce_norm2(), sum_sq.sqrt(), 1e-14);
    assert_close(field.reduce_norm2_quad(), sum_sq.sqrt(), 1e-14);
    assert_close(field.reduce_rms(), (sum_sq / 6.0).sqrt(), 1e-14);
    assert_close(field.reduce_rms_quad(), (sum_sq / 6.0).sqrt(), 1e-14);
    assert!(field.reduce_all_finite());
}

#[test]
fn reductions_sync_physical_representation_first() {
    let config = dft_config(4, 4);
    let vals: Vec<f64> = (0..16).map(|i| i as f64 - 7.5).collect();
    let field = SpectralField::from_physical(&config, vals);
    field.ensure_spectral();

    assert_close(field.reduce_max(), 7.5, 1e-12);
    assert_close(field.reduce_min(), -7.5, 1e-12);
    assert!(field.is_physical_valid());
}

#[test]
fn all_finite_detects_nan_and_infinity() {
    let config = spectral_only_config(4, 4);
    let mut vals = vec![0.0; 16];
    vals[7] = f64::NAN;
    let with_nan = SpectralField::from_physical(&config, vals.clone());
    assert!(!with_nan.reduce_all_finite());

    vals[7] = f64::NEG_INFINITY;
    let with_inf = SpectralField::from_physical(&config, vals);
    assert!(!with_inf.reduce_all_finite());
}

#[test]
fn plain_and_compensated_sums_agree_on_random_data() {
    let (nx, ny) = (128, 96);
    let config = spectral_only_config(nx, ny);
    let vals = random_values(nx * ny, 7);
    let field = SpectralField::from_physical(&config, vals.clone());

    let abs_total: f64 = vals.iter().map(|v| v.abs()).sum();
    let tol = (nx * ny) as f64 * f64::EPSILON * abs_total;

    assert_close(field.reduce_sum(), field.reduce_sum_quad(), tol);
    assert_close(field.reduce_norm2(), field.reduce_norm2_quad(), tol);
    assert_close(field.reduce_rms(), field.reduce_rms_quad(), tol);
    assert_close(field.reduce_norm1(), abs_total, tol);
}

#[test]
fn compensated_sum_recovers_small_terms_next_to_large_one() {
    let (nx, ny) = (1001, 1000);
    let ones = 1_000_000;
    let config = spectral_only_config(nx, ny);
    let mut vals = vec![0.0; nx * ny];
    vals[0] = 1e16;
    for v in vals.iter_mut().skip(1).take(ones) {
        *v = 1.0;
    }
    let field = SpectralField::from_physical(&config, vals);
    let exact = 1e16 + ones as f64;

    let plain_err = (field.reduce_sum() - exact).abs();
    let quad_err = (field.reduce_sum_quad() - exact).abs();
    assert!(
        quad_err < plain_err,
        "compensated error {quad_err} should beat plain error {plain_err}"
    );
    assert!(quad_err <= 2.0, "compensated error {quad_err} too large");
}

#[test]
fn reductions_are_independent_of_thread_count() {
    let (nx, ny) = (100, 90);
    assert!(nx * ny > 2 * REDUCTION_CHUNK);
    let config = spectral_only_config(nx, ny);
    let field = SpectralField::from_physical(&config, random_values(nx * ny, 11));

    let run = |threads: usize| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
            .install(|| (field.reduce_sum(), field.reduce_sum_quad(), field.reduce_norm2()))
    };
    let single = run(1);
    for threads in [2, 3, 8] {
        let multi = run(threads);
        assert_eq!(single.0.to_bits(), multi.0.to_bits());
        assert_eq!(single.1.to_bits(), multi.1.to_bits());
        assert_eq!(single.2.to_bits(), multi.2.to_bits());
    }
}

#[test]
fn kahan_merge_matches_sequential_accumulation() {
    let vals = random_values(10_000, 3);
    let sequential = KahanSum::sum_iter(vals.iter().copied());

    let mut left = KahanSum::new();
    let mut right = KahanSum::new();
    for v in &vals[..5_000] {
        left.add(*v);
    }
    for v in &vals[5_000..] {
        right.add(*v);
    }
    left.merge(right);
    assert_close(left.value(), sequential, 1e-12);
    assert_close(chunked_kahan_sum(&vals, |v| v), sequential, 1e-12);
    assert_close(chunked_sum(&vals, |v| v), sequential, 1e-10);
}

#[test]
#[should_panic(expected = "no valid data to transform from")]
fn reducing_an_unset_field_is_fatal() {
    let config = dft_config(2, 2);
    let field = SpectralField::new(&config);
    let _ = field.reduce_sum();
}
