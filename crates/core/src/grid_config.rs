//! Shared, immutable problem-size description.
//!
//! A `GridConfig` is built once at setup time and shared through an `Arc` by
//! every field and banded matrix of a solver. Binary operations compare
//! configurations by pointer identity: two configurations with equal sizes
//! are still different configurations.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{info, trace};
use num_complex::Complex64;

use crate::error::FieldError;
use crate::grid::Grid2D;
use crate::memory::BufferPool;
use crate::modes::ModeLayout;
use crate::transform::{SpectralTransform, TransformDirection};

pub struct GridConfig {
    grid: Grid2D,
    modes: ModeLayout,
    transform: Option<Box<dyn SpectralTransform>>,
    forward_count: AtomicUsize,
    backward_count: AtomicUsize,
    pool: BufferPool,
}

impl GridConfig {
    /// Configuration with a bound transform.
    pub fn new(grid: Grid2D, modes: ModeLayout, transform: Box<dyn SpectralTransform>) -> Arc<Self> {
        assert!(!grid.is_empty(), "grid must have non-zero dimensions");
        if let ModeLayout::Rectangular { orders, degrees } = modes {
            assert!(
                orders == grid.nx && degrees == grid.ny,
                "rectangular mode layout {orders}x{degrees} does not match grid {}x{}",
                grid.nx,
                grid.ny
            );
        }
        info!(
            "grid config: {}x{} physical, {} spectral modes, transform '{}'",
            grid.nx,
            grid.ny,
            modes.len(),
            transform.name()
        );
        Arc::new(Self::build(grid, modes, Some(transform)))
    }

    /// Configuration for spectral-only work (e.g. operator assembly).
    ///
    /// Any transform request on fields bound to it is fatal.
    pub fn without_transform(grid: Grid2D, modes: ModeLayout) -> Arc<Self> {
        info!(
            "grid config: {}x{} physical, {} spectral modes, no transform",
            grid.nx,
            grid.ny,
            modes.len()
        );
        Arc::new(Self::build(grid, modes, None))
    }

    fn build(grid: Grid2D, modes: ModeLayout, transform: Option<Box<dyn SpectralTransform>>) -> Self {
        Self {
            grid,
            modes,
            transform,
            forward_count: AtomicUsize::new(0),
            backward_count: AtomicUsize::new(0),
            pool: BufferPool::new(),
        }
    }

    pub fn grid(&self) -> Grid2D {
        self.grid
    }

    pub fn modes(&self) -> &ModeLayout {
        &self.modes
    }

    pub fn physical_element_count(&self) -> usize {
        self.grid.len()
    }

    pub fn spectral_element_count(&self) -> usize {
        self.modes.len()
    }

    /// `[rows, cols]` of the physical grid.
    pub fn physical_extent(&self) -> [usize; 2] {
        self.grid.extent()
    }

    /// `[rows, cols]` of the spectral coefficient array.
    pub fn spectral_extent(&self) -> [usize; 2] {
        self.modes.extent()
    }

    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }

    /// Factor relating a constant physical value to the mean spectral mode.
    pub fn mean_mode_scale(&self) -> f64 {
        self.transform
            .as_ref()
            .and_then(|transform| transform.mean_mode_scale())
            .unwrap_or(self.physical_element_count() as f64)
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Physical → spectral.
    pub fn forward(&self, physical: &[f64], spectral: &mut [Complex64]) -> Result<(), FieldError> {
        let transform = self.transform.as_ref().ok_or(FieldError::NoTransform {
            direction: TransformDirection::Forward,
        })?;
        debug_assert_eq!(physical.len(), self.physical_element_count());
        debug_assert_eq!(spectral.len(), self.spectral_element_count());
        trace!("forward transform ({})", transform.name());
        transform.forward(physical, spectral);
        self.forward_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Spectral → physical.
    pub fn backward(&self, spectral: &[Complex64], physical: &mut [f64]) -> Result<(), FieldError> {
        let transform = self.transform.as_ref().ok_or(FieldError::NoTransform {
            direction: TransformDirection::Backward,
        })?;
        debug_assert_eq!(physical.len(), self.physical_element_count());
        debug_assert_eq!(spectral.len(), self.spectral_element_count());
        trace!("backward transform ({})", transform.name());
        transform.backward(spectral, physical);
        self.backward_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of transforms run through this configuration in `direction`.
    pub fn transform_count(&self, direction: TransformDirection) -> usize {
        match direction {
            TransformDirection::Forward => self.forward_count.load(Ordering::Relaxed),
            TransformDirection::Backward => self.backward_count.load(Ordering::Relaxed),
        }
    }

    pub fn total_transforms(&self) -> usize {
        self.transform_count(TransformDirection::Forward)
            + self.transform_count(TransformDirection::Backward)
    }

    pub fn reset_transform_counts(&self) {
        self.forward_count.store(0, Ordering::Relaxed);
        self.backward_count.store(0, Ordering::Relaxed);
    }
}

impl fmt::Debug for GridConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridConfig")
            .field("grid", &self.grid)
            .field("modes", &self.modes)
            .field(
                "transform",
                &self.transform.as_ref().map(|transform| transform.name()),
            )
            .finish()
    }
}

/// Fatal unless `a` and `b` are the same configuration instance.
#[inline]
pub(crate) fn check_same(a: &Arc<GridConfig>, b: &Arc<GridConfig>) -> Result<(), FieldError> {
    if Arc::ptr_eq(a, b) {
        Ok(())
    } else {
        Err(FieldError::ConfigMismatch)
    }
}
