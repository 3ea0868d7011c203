//! Scalar field held in a physical and a spectral representation.
//!
//! A `SpectralField` owns two buffers bound to one shared [`GridConfig`]:
//!
//! - **physical**: `f64` grid values, row-major `[row][col]`
//! - **spectral**: `Complex64` transform coefficients
//!
//! and a validity flag per buffer. Conversions happen lazily: asking for a
//! representation that is not valid runs the configured transform and makes
//! the freshly computed buffer the only valid one. Writing one
//! representation invalidates the other.
//!
//! # Interior mutability
//!
//! Read accessors take `&self` but may have to run a transform. The state
//! lives behind a `parking_lot::RwLock`: reads of already valid data share
//! the lock, a transform needs it exclusively. A field must not be
//! transformed while another thread is using it; debug builds detect that
//! case and panic instead of blocking. Closures that borrow a whole buffer
//! ([`SpectralField::with_physical`], [`SpectralField::with_spectral`]) take
//! `&mut self`, so the same thread can never request a transform while it
//! still holds such a borrow.
//!
//! # Fatal conditions
//!
//! Requesting a transform on a field that was never populated, or combining
//! fields bound to different configurations, is a solver bug and panics.
//! The `try_*` methods report the same conditions as [`FieldError`].

use std::fmt;
use std::sync::Arc;

use num_complex::Complex64;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rayon::prelude::*;

use crate::error::FieldError;
use crate::grid_config::{check_same, GridConfig};
use crate::transform::TransformDirection;

// ============================================================================
// State
// ============================================================================

pub(crate) struct FieldState {
    pub(crate) physical: Vec<f64>,
    pub(crate) spectral: Vec<Complex64>,
    pub(crate) physical_valid: bool,
    pub(crate) spectral_valid: bool,
}

impl FieldState {
    fn sync_physical(&mut self, config: &GridConfig) -> Result<(), FieldError> {
        if self.physical_valid {
            return Ok(());
        }
        if !self.spectral_valid {
            return Err(FieldError::UninitializedSource {
                direction: TransformDirection::Backward,
            });
        }
        config.backward(&self.spectral, &mut self.physical)?;
        self.physical_valid = true;
        self.spectral_valid = false;
        Ok(())
    }

    fn sync_spectral(&mut self, config: &GridConfig) -> Result<(), FieldError> {
        if self.spectral_valid {
            return Ok(());
        }
        if !self.physical_valid {
            return Err(FieldError::UninitializedSource {
                direction: TransformDirection::Forward,
            });
        }
        config.forward(&self.physical, &mut self.spectral)?;
        self.spectral_valid = true;
        self.physical_valid = false;
        Ok(())
    }

    pub(crate) fn mark_physical(&mut self) {
        self.physical_valid = true;
        self.spectral_valid = false;
    }

    pub(crate) fn mark_spectral(&mut self) {
        self.spectral_valid = true;
        self.physical_valid = false;
    }
}

// ============================================================================
// Field
// ============================================================================

pub struct SpectralField {
    config: Arc<GridConfig>,
    state: RwLock<FieldState>,
}

impl SpectralField {
    /// Allocate a field whose buffers hold no valid data yet.
    ///
    /// The field must be populated (any setter or bulk fill) before it is read.
    pub fn new(config: &Arc<GridConfig>) -> Self {
        let physical = config.pool().take_real(config.physical_element_count());
        let spectral = config.pool().take_complex(config.spectral_element_count());
        Self {
            config: Arc::clone(config),
            state: RwLock::new(FieldState {
                physical,
                spectral,
                physical_valid: false,
                spectral_valid: false,
            }),
        }
    }

    pub fn zeros(config: &Arc<GridConfig>) -> Self {
        let mut field = Self::new(config);
        field.set_all_physical(0.0);
        field
    }

    pub fn from_physical(config: &Arc<GridConfig>, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            config.physical_element_count(),
            "physical data length must match grid size"
        );
        let mut field = Self::new(config);
        let state = field.state.get_mut();
        config.pool().give_real(std::mem::replace(&mut state.physical, data));
        state.mark_physical();
        field
    }

    pub fn from_spectral(config: &Arc<GridConfig>, data: Vec<Complex64>) -> Self {
        assert_eq!(
            data.len(),
            config.spectral_element_count(),
            "spectral data length must match mode count"
        );
        let mut field = Self::new(config);
        let state = field.state.get_mut();
        config.pool().give_complex(std::mem::replace(&mut state.spectral, data));
        state.mark_spectral();
        field
    }

    /// Build a field from a function of `(row, col)`.
    pub fn from_physical_fn<F>(config: &Arc<GridConfig>, f: F) -> Self
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let mut field = Self::new(config);
        field.fill_physical_with(f);
        field
    }

    pub fn config(&self) -> &Arc<GridConfig> {
        &self.config
    }

    pub fn is_physical_valid(&self) -> bool {
        self.state.read_recursive().physical_valid
    }

    pub fn is_spectral_valid(&self) -> bool {
        self.state.read_recursive().spectral_valid
    }

    /// True once any representation holds data.
    pub fn is_initialized(&self) -> bool {
        let state = self.state.read_recursive();
        state.physical_valid || state.spectral_valid
    }

    // ------------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------------

    pub fn try_ensure_physical(&self) -> Result<(), FieldError> {
        if self.state.read_recursive().physical_valid {
            return Ok(());
        }
        let mut state = self.lock_for_transform();
        state.sync_physical(&self.config)
    }

    pub fn try_ensure_spectral(&self) -> Result<(), FieldError> {
        if self.state.read_recursive().spectral_valid {
            return Ok(());
        }
        let mut state = self.lock_for_transform();
        state.sync_spectral(&self.config)
    }

    /// Make the physical representation valid, transforming if needed.
    pub fn ensure_physical(&self) {
        if let Err(err) = self.try_ensure_physical() {
            panic!("ensure_physical: {err}");
        }
    }

    /// Make the spectral representation valid, transforming if needed.
    pub fn ensure_spectral(&self) {
        if let Err(err) = self.try_ensure_spectral() {
            panic!("ensure_spectral: {err}");
        }
    }

    fn lock_for_transform(&self) -> RwLockWriteGuard<'_, FieldState> {
        if cfg!(debug_assertions) {
            match self.state.try_write() {
                Some(guard) => guard,
                None => panic!(
                    "concurrent transform: field state is in use while a transform was requested"
                ),
            }
        } else {
            self.state.write()
        }
    }

    /// Physical buffer of a field already synchronized to physical space.
    pub(crate) fn physical_guard(&self) -> PhysicalRead<'_> {
        self.ensure_physical();
        let guard = self.state.read_recursive();
        debug_assert!(guard.physical_valid);
        PhysicalRead(guard)
    }

    /// Spectral buffer of a field already synchronized to spectral space.
    pub(crate) fn spectral_guard(&self) -> SpectralRead<'_> {
        self.ensure_spectral();
        let guard = self.state.read_recursive();
        debug_assert!(guard.spectral_valid);
        SpectralRead(guard)
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, FieldState> {
        self.state.read_recursive()
    }

    /// Exclusive state access; `&mut self` needs no locking.
    pub(crate) fn state_mut(&mut self) -> &mut FieldState {
        self.state.get_mut()
    }

    pub(crate) fn physical_mut(&mut self) -> &mut FieldState {
        let Self { config, state } = self;
        let state = state.get_mut();
        if let Err(err) = state.sync_physical(config) {
            panic!("ensure_physical: {err}");
        }
        state
    }

    pub(crate) fn spectral_mut(&mut self) -> &mut FieldState {
        let Self { config, state } = self;
        let state = state.get_mut();
        if let Err(err) = state.sync_spectral(config) {
            panic!("ensure_spectral: {err}");
        }
        state
    }

    /// Empty field on the same configuration, for operation results.
    pub(crate) fn alloc_like(&self) -> Self {
        Self::new(&self.config)
    }

    pub(crate) fn check_config(&self, other: &SpectralField) -> Result<(), FieldError> {
        check_same(&self.config, &other.config)
    }

    pub(crate) fn assert_config(&self, other: &SpectralField) {
        if let Err(err) = self.check_config(other) {
            panic!("{err}");
        }
    }

    // ------------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------------

    pub fn get_physical(&self, row: usize, col: usize) -> f64 {
        let idx = self.config.grid().idx(row, col);
        self.physical_guard()[idx]
    }

    /// Write one physical sample and mark physical space as the only valid
    /// representation. No transform runs: if the field was spectral-valid,
    /// the remaining samples are whatever the physical buffer last held.
    pub fn set_physical(&mut self, row: usize, col: usize, value: f64) {
        let idx = self.config.grid().idx(row, col);
        let state = self.state.get_mut();
        state.physical[idx] = value;
        state.mark_physical();
    }

    /// Like [`set_physical`](Self::set_physical), but brings physical space
    /// up to date first so the other samples keep their values.
    pub fn patch_physical(&mut self, row: usize, col: usize, value: f64) {
        let idx = self.config.grid().idx(row, col);
        let state = self.physical_mut();
        state.physical[idx] = value;
        state.mark_physical();
    }

    pub fn get_spectral(&self, row: usize, col: usize) -> Complex64 {
        let idx = self.spectral_idx(row, col);
        self.spectral_guard()[idx]
    }

    pub fn get_spectral_re(&self, row: usize, col: usize) -> f64 {
        self.get_spectral(row, col).re
    }

    pub fn get_spectral_im(&self, row: usize, col: usize) -> f64 {
        self.get_spectral(row, col).im
    }

    /// Write one spectral coefficient; no transform runs.
    pub fn set_spectral(&mut self, row: usize, col: usize, value: Complex64) {
        let idx = self.spectral_idx(row, col);
        let state = self.state.get_mut();
        state.spectral[idx] = value;
        state.mark_spectral();
    }

    pub fn get_spectral_mode(&self, degree: usize, order: usize) -> Complex64 {
        let idx = self.mode_idx(degree, order);
        self.spectral_guard()[idx]
    }

    pub fn set_spectral_mode(&mut self, degree: usize, order: usize, value: Complex64) {
        let idx = self.mode_idx(degree, order);
        let state = self.state.get_mut();
        state.spectral[idx] = value;
        state.mark_spectral();
    }

    /// Spectral counterpart of [`patch_physical`](Self::patch_physical).
    pub fn patch_spectral_mode(&mut self, degree: usize, order: usize, value: Complex64) {
        let idx = self.mode_idx(degree, order);
        let state = self.spectral_mut();
        state.spectral[idx] = value;
        state.mark_spectral();
    }

    pub fn set_all_physical(&mut self, value: f64) {
        let state = self.state.get_mut();
        state.physical.par_iter_mut().for_each(|v| *v = value);
        state.mark_physical();
    }

    pub fn set_all_spectral(&mut self, re: f64, im: f64) {
        let value = Complex64::new(re, im);
        let state = self.state.get_mut();
        state.spectral.par_iter_mut().for_each(|v| *v = value);
        state.mark_spectral();
    }

    /// Overwrite every physical sample with `f(row, col)`; no transform runs.
    pub fn fill_physical_with<F>(&mut self, f: F)
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let nx = self.config.grid().nx;
        let state = self.state.get_mut();
        state
            .physical
            .par_chunks_mut(nx)
            .enumerate()
            .for_each(|(row, values)| {
                for (col, value) in values.iter_mut().enumerate() {
                    *value = f(row, col);
                }
            });
        state.mark_physical();
    }

    /// Update every physical sample in place through `f(row, col, &mut value)`.
    pub fn update_physical<F>(&mut self, f: F)
    where
        F: Fn(usize, usize, &mut f64) + Sync,
    {
        let nx = self.config.grid().nx;
        let state = self.physical_mut();
        state
            .physical
            .par_chunks_mut(nx)
            .enumerate()
            .for_each(|(row, values)| {
                for (col, value) in values.iter_mut().enumerate() {
                    f(row, col, value);
                }
            });
        state.mark_physical();
    }

    /// Update every spectral coefficient in place through `f(flat_index, &mut value)`.
    pub fn update_spectral<F>(&mut self, f: F)
    where
        F: Fn(usize, &mut Complex64) + Sync,
    {
        let state = self.spectral_mut();
        state
            .spectral
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, value)| f(idx, value));
        state.mark_spectral();
    }

    /// Run `f` on the synchronized physical buffer without copying it.
    ///
    /// Takes `&mut self` so `f` cannot reach back into the field while the
    /// buffer is borrowed:
    ///
    /// ```compile_fail
    /// # use specfield_core::{SpectralField, Grid2D, GridConfig, ModeLayout};
    /// # let config = GridConfig::without_transform(Grid2D::new(2, 2, 1.0, 1.0), ModeLayout::rectangular(2, 2));
    /// let mut field = SpectralField::zeros(&config);
    /// field.with_physical(|_| field.get_spectral(0, 0));
    /// ```
    pub fn with_physical<R>(&mut self, f: impl FnOnce(&[f64]) -> R) -> R {
        f(&self.physical_mut().physical)
    }

    /// Run `f` on the synchronized spectral buffer without copying it.
    pub fn with_spectral<R>(&mut self, f: impl FnOnce(&[Complex64]) -> R) -> R {
        f(&self.spectral_mut().spectral)
    }

    /// Shared-borrow variant for crate-internal kernels; `f` must not touch
    /// the field again.
    pub(crate) fn read_physical<R>(&self, f: impl FnOnce(&[f64]) -> R) -> R {
        f(&self.physical_guard())
    }

    pub(crate) fn read_spectral<R>(&self, f: impl FnOnce(&[Complex64]) -> R) -> R {
        f(&self.spectral_guard())
    }

    pub fn physical_values(&self) -> Vec<f64> {
        self.read_physical(<[f64]>::to_vec)
    }

    pub fn spectral_values(&self) -> Vec<Complex64> {
        self.read_spectral(<[Complex64]>::to_vec)
    }

    // ------------------------------------------------------------------------
    // Row utilities
    // ------------------------------------------------------------------------

    /// Set every sample of one row; negative rows count from the end.
    pub fn set_physical_row(&mut self, row: isize, value: f64) {
        let grid = self.config.grid();
        let start = grid.idx(grid.wrap_row(row), 0);
        let state = self.physical_mut();
        state.physical[start..start + grid.nx].fill(value);
        state.mark_physical();
    }

    /// Copy row `src` onto row `dst`; negative rows count from the end.
    pub fn copy_physical_row(&mut self, src: isize, dst: isize) {
        self.copy_row_scaled(src, dst, 1.0);
    }

    /// Copy row `src` onto row `dst` with flipped sign.
    pub fn copy_physical_row_inv_sign(&mut self, src: isize, dst: isize) {
        self.copy_row_scaled(src, dst, -1.0);
    }

    fn copy_row_scaled(&mut self, src: isize, dst: isize, scale: f64) {
        let grid = self.config.grid();
        let src_start = grid.idx(grid.wrap_row(src), 0);
        let dst_start = grid.idx(grid.wrap_row(dst), 0);
        let state = self.physical_mut();
        for i in 0..grid.nx {
            state.physical[dst_start + i] = scale * state.physical[src_start + i];
        }
        state.mark_physical();
    }

    // ------------------------------------------------------------------------
    // Physical queries
    // ------------------------------------------------------------------------

    /// 1 where the value is positive, 0 elsewhere.
    pub fn one_if_positive(&self) -> Self {
        self.map_physical(|v| if v > 0.0 { 1.0 } else { 0.0 })
    }

    /// The value where it is positive, 0 elsewhere.
    pub fn value_if_positive(&self) -> Self {
        self.map_physical(|v| if v > 0.0 { v } else { 0.0 })
    }

    /// 1 where the value is negative, 0 elsewhere.
    pub fn one_if_negative(&self) -> Self {
        self.map_physical(|v| if v < 0.0 { 1.0 } else { 0.0 })
    }

    /// The value where it is negative, 0 elsewhere.
    pub fn value_if_negative(&self) -> Self {
        self.map_physical(|v| if v < 0.0 { v } else { 0.0 })
    }

    /// New physical-valid field with `f` applied to every sample.
    pub fn map_physical<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Sync,
    {
        let mut out = self.alloc_like();
        {
            let src = self.physical_guard();
            let dst = out.state_mut();
            dst.physical
                .par_iter_mut()
                .zip(src.par_iter())
                .for_each(|(o, &v)| *o = f(v));
            dst.mark_physical();
        }
        out
    }

    // ------------------------------------------------------------------------
    // Index helpers
    // ------------------------------------------------------------------------

    fn spectral_idx(&self, row: usize, col: usize) -> usize {
        let [_, cols] = self.config.spectral_extent();
        row * cols + col
    }

    fn mode_idx(&self, degree: usize, order: usize) -> usize {
        let modes = self.config.modes();
        assert!(
            modes.contains(degree, order),
            "mode (degree={degree}, order={order}) outside the configured layout"
        );
        modes.index(degree, order)
    }
}

// ============================================================================
// Read guards
// ============================================================================

pub(crate) struct PhysicalRead<'a>(RwLockReadGuard<'a, FieldState>);

impl std::ops::Deref for PhysicalRead<'_> {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0.physical
    }
}

pub(crate) struct SpectralRead<'a>(RwLockReadGuard<'a, FieldState>);

impl std::ops::Deref for SpectralRead<'_> {
    type Target = [Complex64];

    fn deref(&self) -> &[Complex64] {
        &self.0.spectral
    }
}

// ============================================================================
// Value semantics
// ============================================================================

impl Clone for SpectralField {
    /// Duplicates the valid buffer(s) only; never transforms.
    fn clone(&self) -> Self {
        let mut out = self.alloc_like();
        {
            let src = self.read_state();
            let dst = out.state_mut();
            copy_valid(&src, dst);
        }
        out
    }

    fn clone_from(&mut self, source: &Self) {
        self.assert_config(source);
        let src = source.read_state();
        copy_valid(&src, self.state.get_mut());
    }
}

fn copy_valid(src: &FieldState, dst: &mut FieldState) {
    if src.physical_valid {
        dst.physical.copy_from_slice(&src.physical);
    }
    if src.spectral_valid {
        dst.spectral.copy_from_slice(&src.spectral);
    }
    dst.physical_valid = src.physical_valid;
    dst.spectral_valid = src.spectral_valid;
}

impl Drop for SpectralField {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let pool = self.config.pool();
        pool.give_real(std::mem::take(&mut state.physical));
        pool.give_complex(std::mem::take(&mut state.spectral));
    }
}

impl fmt::Debug for SpectralField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        f.debug_struct("SpectralField")
            .field("grid", &self.config.grid())
            .field("physical_valid", &state.physical_valid)
            .field("spectral_valid", &state.spectral_valid)
            .finish()
    }
}
