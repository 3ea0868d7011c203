//! Transform trait connecting the physical and spectral representations.
//!
//! Implementations live outside the core (see the CPU backend crate). The core
//! relies only on the contract below:
//!
//! - `forward` maps `physical_element_count` real samples to
//!   `spectral_element_count` complex coefficients.
//! - `backward` is the inverse, up to floating-point error:
//!   `backward(forward(x)) ≈ x`.
//! - Both are deterministic and do not read the destination buffer.

use num_complex::Complex64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformDirection {
    /// Physical → spectral.
    Forward,
    /// Spectral → physical.
    Backward,
}

pub trait SpectralTransform: Send + Sync {
    fn forward(&self, physical: &[f64], spectral: &mut [Complex64]);
    fn backward(&self, spectral: &[Complex64], physical: &mut [f64]);

    /// Scale carried by the mean mode: a constant field `c` has mean
    /// coefficient `c * mean_mode_scale()`.
    ///
    /// `None` defers to the configuration default (the physical element count,
    /// which is what an unnormalized forward transform produces).
    fn mean_mode_scale(&self) -> Option<f64> {
        None
    }

    fn name(&self) -> &str {
        "transform"
    }
}
