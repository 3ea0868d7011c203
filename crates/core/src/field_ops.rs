//! Arithmetic on [`SpectralField`].
//!
//! Where an operation runs:
//!
//! | operation                   | space                                              |
//! |-----------------------------|----------------------------------------------------|
//! | field ± field               | spectral if both are spectral-valid, else physical if both are physical-valid, else forced spectral |
//! | field × / ÷ scalar          | every currently valid representation, no transform |
//! | field ± scalar              | mean mode (`c * N`) and/or every physical sample, no transform |
//! | −field                      | every currently valid representation               |
//! | field × / ÷ field           | physical (pointwise)                               |
//! | `spectral_*` methods        | spectral                                           |
//! | `mul_dealiased`, 2/3 rule   | spectral truncation around a physical product      |
//!
//! Binary operations require both operands to share one `GridConfig`
//! instance; mixing configurations panics (use the `try_*` forms to get a
//! [`FieldError`] instead).

use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign,
};

use std::sync::Arc;

use num_complex::Complex64;
use rayon::prelude::*;

use crate::error::FieldError;
use crate::field::{FieldState, SpectralField};
use crate::grid_config::GridConfig;
use crate::modes::ModeLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Space {
    Physical,
    Spectral,
}

/// Space for a linear binary operation that avoids transforms when possible.
fn linear_space(a: &SpectralField, b: &SpectralField) -> Space {
    let (a_phys, a_spec) = flags(a);
    let (b_phys, b_spec) = flags(b);
    if a_spec && b_spec {
        Space::Spectral
    } else if a_phys && b_phys {
        Space::Physical
    } else {
        Space::Spectral
    }
}

fn flags(field: &SpectralField) -> (bool, bool) {
    let state = field.read_state();
    (state.physical_valid, state.spectral_valid)
}

fn assert_initialized(state: &FieldState, operation: &str) {
    assert!(
        state.physical_valid || state.spectral_valid,
        "{operation}: no valid data in either representation"
    );
}

// ============================================================================
// Kernels
// ============================================================================

fn zip_physical<F>(a: &SpectralField, b: &SpectralField, f: F) -> SpectralField
where
    F: Fn(f64, f64) -> f64 + Sync,
{
    a.ensure_physical();
    b.ensure_physical();
    let mut out = a.alloc_like();
    {
        let lhs = a.physical_guard();
        let rhs = b.physical_guard();
        let dst = out.state_mut();
        dst.physical
            .par_iter_mut()
            .zip(lhs.par_iter())
            .zip(rhs.par_iter())
            .for_each(|((o, &x), &y)| *o = f(x, y));
        dst.mark_physical();
    }
    out
}

fn zip_spectral<F>(a: &SpectralField, b: &SpectralField, f: F) -> SpectralField
where
    F: Fn(Complex64, Complex64) -> Complex64 + Sync,
{
    a.ensure_spectral();
    b.ensure_spectral();
    let mut out = a.alloc_like();
    {
        let lhs = a.spectral_guard();
        let rhs = b.spectral_guard();
        let dst = out.state_mut();
        dst.spectral
            .par_iter_mut()
            .zip(lhs.par_iter())
            .zip(rhs.par_iter())
            .for_each(|((o, &x), &y)| *o = f(x, y));
        dst.mark_spectral();
    }
    out
}

fn zip_linear<F, G>(a: &SpectralField, b: &SpectralField, real: F, complex: G) -> SpectralField
where
    F: Fn(f64, f64) -> f64 + Sync,
    G: Fn(Complex64, Complex64) -> Complex64 + Sync,
{
    a.assert_config(b);
    match linear_space(a, b) {
        Space::Spectral => zip_spectral(a, b, complex),
        Space::Physical => zip_physical(a, b, real),
    }
}

fn assign_linear<F, G>(lhs: &mut SpectralField, rhs: &SpectralField, real: F, complex: G)
where
    F: Fn(&mut f64, f64) + Sync,
    G: Fn(&mut Complex64, Complex64) + Sync,
{
    lhs.assert_config(rhs);
    match linear_space(lhs, rhs) {
        Space::Spectral => {
            let src = rhs.spectral_guard();
            let dst = lhs.spectral_mut();
            dst.spectral
                .par_iter_mut()
                .zip(src.par_iter())
                .for_each(|(o, &v)| complex(o, v));
            dst.mark_spectral();
        }
        Space::Physical => {
            let src = rhs.physical_guard();
            let dst = lhs.physical_mut();
            dst.physical
                .par_iter_mut()
                .zip(src.par_iter())
                .for_each(|(o, &v)| real(o, v));
            dst.mark_physical();
        }
    }
}

fn assign_physical<F>(lhs: &mut SpectralField, rhs: &SpectralField, f: F)
where
    F: Fn(&mut f64, f64) + Sync,
{
    lhs.assert_config(rhs);
    let src = rhs.physical_guard();
    let dst = lhs.physical_mut();
    dst.physical
        .par_iter_mut()
        .zip(src.par_iter())
        .for_each(|(o, &v)| f(o, v));
    dst.mark_physical();
}

/// Apply a linear per-element update to every valid representation.
fn update_valid<F, G>(state: &mut FieldState, real: F, complex: G)
where
    F: Fn(&mut f64) + Sync,
    G: Fn(&mut Complex64) + Sync,
{
    if state.physical_valid {
        state.physical.par_iter_mut().for_each(|v| real(v));
    }
    if state.spectral_valid {
        state.spectral.par_iter_mut().for_each(|v| complex(v));
    }
}

impl SpectralField {
    /// Copy of `self` with `real`/`complex` applied to each valid representation.
    fn map_valid<F, G>(&self, operation: &str, real: F, complex: G) -> SpectralField
    where
        F: Fn(&mut f64) + Sync,
        G: Fn(&mut Complex64) + Sync,
    {
        let mut out = self.clone();
        let state = out.state_mut();
        assert_initialized(state, operation);
        update_valid(state, real, complex);
        out
    }

    fn scale_in_place(&mut self, factor: f64, operation: &str) {
        let state = self.state_mut();
        assert_initialized(state, operation);
        update_valid(state, |v| *v *= factor, |v| *v *= factor);
    }

    fn shift_in_place(&mut self, value: f64) {
        let offset = value * self.config().mean_mode_scale();
        let mean = self.config().modes().index(0, 0);
        let state = self.state_mut();
        assert_initialized(state, "scalar addition");
        if state.physical_valid {
            state.physical.par_iter_mut().for_each(|v| *v += value);
        }
        if state.spectral_valid {
            state.spectral[mean] += offset;
        }
    }

    // ------------------------------------------------------------------------
    // Checked binary operations
    // ------------------------------------------------------------------------

    pub fn try_add(&self, rhs: &SpectralField) -> Result<SpectralField, FieldError> {
        self.check_config(rhs)?;
        Ok(zip_linear(self, rhs, |x, y| x + y, |x, y| x + y))
    }

    pub fn try_sub(&self, rhs: &SpectralField) -> Result<SpectralField, FieldError> {
        self.check_config(rhs)?;
        Ok(zip_linear(self, rhs, |x, y| x - y, |x, y| x - y))
    }

    pub fn try_mul(&self, rhs: &SpectralField) -> Result<SpectralField, FieldError> {
        self.check_config(rhs)?;
        Ok(zip_physical(self, rhs, |x, y| x * y))
    }

    pub fn try_div(&self, rhs: &SpectralField) -> Result<SpectralField, FieldError> {
        self.check_config(rhs)?;
        Ok(zip_physical(self, rhs, |x, y| x / y))
    }

    pub fn try_spectral_div_element_wise(
        &self,
        operator: &SpectralField,
    ) -> Result<SpectralField, FieldError> {
        self.check_config(operator)?;
        Ok(zip_spectral(self, operator, complex_div))
    }

    // ------------------------------------------------------------------------
    // Spectral-space operations
    // ------------------------------------------------------------------------

    /// Invert a diagonal spectral operator: `self / operator` per mode.
    pub fn spectral_div_element_wise(&self, operator: &SpectralField) -> SpectralField {
        self.assert_config(operator);
        zip_spectral(self, operator, complex_div)
    }

    /// Apply a diagonal spectral operator: `self * operator` per mode.
    pub fn spectral_mul_element_wise(&self, operator: &SpectralField) -> SpectralField {
        self.assert_config(operator);
        zip_spectral(self, operator, |a, b| a * b)
    }

    /// Reciprocal of every spectral coefficient. Zero coefficients produce non-finite values.
    pub fn spectral_invert(&self) -> SpectralField {
        let mut out = self.alloc_like();
        {
            let src = self.spectral_guard();
            let dst = out.state_mut();
            dst.spectral
                .par_iter_mut()
                .zip(src.par_iter())
                .for_each(|(o, &v)| *o = v.inv());
            dst.mark_spectral();
        }
        out
    }

    /// Add `value` to every spectral coefficient (not only the mean mode).
    pub fn spectral_add_scalar_all(&self, value: f64) -> SpectralField {
        let mut out = self.alloc_like();
        {
            let src = self.spectral_guard();
            let dst = out.state_mut();
            dst.spectral
                .par_iter_mut()
                .zip(src.par_iter())
                .for_each(|(o, &v)| *o = v + value);
            dst.mark_spectral();
        }
        out
    }

    /// `value - self`.
    pub fn value_minus_this(&self, value: f64) -> SpectralField {
        let mut out = -self;
        out.shift_in_place(value);
        out
    }
}

// ============================================================================
// Stencils and dealiasing
// ============================================================================

impl SpectralField {
    /// Spectral multiplier of an `S x S` finite-difference stencil.
    ///
    /// `kernel` is written as a picture centred on the sample: row 0 is the
    /// `+S/2` row offset, column 0 the `-S/2` column offset. Multiplying a
    /// field by the result with [`spectral_mul_element_wise`] computes
    ///
    /// ```text
    /// out(r, c) = scale * sum_{j,i} kernel[j][i] * u(r + S/2 - j, c + i - S/2)
    /// ```
    ///
    /// with periodic wrap. The returned field is spectral-valid.
    ///
    /// [`spectral_mul_element_wise`]: Self::spectral_mul_element_wise
    pub fn stencil_operator<const S: usize>(
        config: &Arc<GridConfig>,
        kernel: &[[f64; S]; S],
        scale: f64,
    ) -> SpectralField {
        assert!(S % 2 == 1, "stencil size must be odd, got {S}");
        let grid = config.grid();
        assert!(
            S <= grid.nx && S <= grid.ny,
            "{S}x{S} stencil does not fit a {}x{} grid",
            grid.nx,
            grid.ny
        );
        let radius = (S / 2) as isize;

        let mut out = SpectralField::zeros(config);
        {
            let state = out.state_mut();
            for (j, weights) in kernel.iter().enumerate() {
                for (i, &weight) in weights.iter().enumerate() {
                    // The product in spectral space is a circular convolution,
                    // so each weight sits at the negated offset it reads from.
                    let row = (j as isize - radius).rem_euclid(grid.ny as isize) as usize;
                    let col = (radius - i as isize).rem_euclid(grid.nx as isize) as usize;
                    state.physical[grid.idx(row, col)] = weight * scale;
                }
            }
        }
        out.ensure_spectral();
        out
    }

    /// Zero every mode outside the 2/3 rule: signed wavenumbers with
    /// `|kx| > 2 * (nx / 2) / 3` or `|ky| > 2 * (ny / 2) / 3`.
    ///
    /// Needs the rectangular layout. The field is left spectral-valid.
    pub fn truncate_high_modes(&mut self) {
        let (orders, degrees) = match *self.config().modes() {
            ModeLayout::Rectangular { orders, degrees } => (orders, degrees),
            ModeLayout::Triangular { .. } => {
                panic!("2/3 truncation needs a rectangular mode layout")
            }
        };
        let cut_x = 2 * (orders / 2) / 3;
        let cut_y = 2 * (degrees / 2) / 3;

        let state = self.spectral_mut();
        state
            .spectral
            .par_chunks_mut(orders)
            .enumerate()
            .for_each(|(ky, row)| {
                let high_y = wavenumber(ky, degrees) > cut_y;
                for (kx, value) in row.iter_mut().enumerate() {
                    if high_y || wavenumber(kx, orders) > cut_x {
                        *value = Complex64::new(0.0, 0.0);
                    }
                }
            });
        state.mark_spectral();
    }

    /// Pointwise product with both factors and the result 2/3-truncated.
    ///
    /// Removes more modes than strictly needed to suppress aliasing.
    pub fn mul_dealiased(&self, rhs: &SpectralField) -> SpectralField {
        self.assert_config(rhs);
        let mut lhs = self.clone();
        lhs.truncate_high_modes();
        let mut rhs = rhs.clone();
        rhs.truncate_high_modes();

        let mut out = zip_physical(&lhs, &rhs, |x, y| x * y);
        out.truncate_high_modes();
        out
    }
}

/// Magnitude of the signed wavenumber stored in slot `k` of an `n`-point transform.
#[inline]
fn wavenumber(k: usize, n: usize) -> usize {
    if k <= n / 2 {
        k
    } else {
        n - k
    }
}

/// `a / b` written as `(a * conj(b)) / |b|^2`.
#[inline]
fn complex_div(a: Complex64, b: Complex64) -> Complex64 {
    let den = b.norm_sqr();
    Complex64::new(
        (a.re * b.re + a.im * b.im) / den,
        (a.im * b.re - a.re * b.im) / den,
    )
}

// ============================================================================
// Field ∘ field operators
// ============================================================================

impl Add<&SpectralField> for &SpectralField {
    type Output = SpectralField;

    fn add(self, rhs: &SpectralField) -> SpectralField {
        zip_linear(self, rhs, |x, y| x + y, |x, y| x + y)
    }
}

impl Sub<&SpectralField> for &SpectralField {
    type Output = SpectralField;

    fn sub(self, rhs: &SpectralField) -> SpectralField {
        zip_linear(self, rhs, |x, y| x - y, |x, y| x - y)
    }
}

impl Mul<&SpectralField> for &SpectralField {
    type Output = SpectralField;

    /// Pointwise product in physical space.
    fn mul(self, rhs: &SpectralField) -> SpectralField {
        self.assert_config(rhs);
        zip_physical(self, rhs, |x, y| x * y)
    }
}

impl Div<&SpectralField> for &SpectralField {
    type Output = SpectralField;

    /// Pointwise quotient in physical space.
    fn div(self, rhs: &SpectralField) -> SpectralField {
        self.assert_config(rhs);
        zip_physical(self, rhs, |x, y| x / y)
    }
}

macro_rules! forward_owned_binop {
    ($($trait:ident :: $method:ident),* $(,)?) => {
        $(
            impl $trait<SpectralField> for SpectralField {
                type Output = SpectralField;

                fn $method(self, rhs: SpectralField) -> SpectralField {
                    (&self).$method(&rhs)
                }
            }

            impl $trait<&SpectralField> for SpectralField {
                type Output = SpectralField;

                fn $method(self, rhs: &SpectralField) -> SpectralField {
                    (&self).$method(rhs)
                }
            }

            impl $trait<SpectralField> for &SpectralField {
                type Output = SpectralField;

                fn $method(self, rhs: SpectralField) -> SpectralField {
                    self.$method(&rhs)
                }
            }
        )*
    };
}

forward_owned_binop!(Add::add, Sub::sub, Mul::mul, Div::div);

impl AddAssign<&SpectralField> for SpectralField {
    fn add_assign(&mut self, rhs: &SpectralField) {
        assign_linear(self, rhs, |o, v| *o += v, |o, v| *o += v);
    }
}

impl SubAssign<&SpectralField> for SpectralField {
    fn sub_assign(&mut self, rhs: &SpectralField) {
        assign_linear(self, rhs, |o, v| *o -= v, |o, v| *o -= v);
    }
}

impl MulAssign<&SpectralField> for SpectralField {
    fn mul_assign(&mut self, rhs: &SpectralField) {
        assign_physical(self, rhs, |o, v| *o *= v);
    }
}

impl DivAssign<&SpectralField> for SpectralField {
    fn div_assign(&mut self, rhs: &SpectralField) {
        assign_physical(self, rhs, |o, v| *o /= v);
    }
}

// ============================================================================
// Field ∘ scalar operators
// ============================================================================

impl AddAssign<f64> for SpectralField {
    /// Adds `value * N` to the mean mode and/or `value` to every sample.
    fn add_assign(&mut self, value: f64) {
        self.shift_in_place(value);
    }
}

impl SubAssign<f64> for SpectralField {
    fn sub_assign(&mut self, value: f64) {
        self.shift_in_place(-value);
    }
}

impl MulAssign<f64> for SpectralField {
    fn mul_assign(&mut self, value: f64) {
        self.scale_in_place(value, "scalar multiplication");
    }
}

impl DivAssign<f64> for SpectralField {
    fn div_assign(&mut self, value: f64) {
        let state = self.state_mut();
        assert_initialized(state, "scalar division");
        update_valid(state, |v| *v /= value, |v| *v /= value);
    }
}

impl Add<f64> for &SpectralField {
    type Output = SpectralField;

    fn add(self, value: f64) -> SpectralField {
        let mut out = self.clone();
        out += value;
        out
    }
}

impl Sub<f64> for &SpectralField {
    type Output = SpectralField;

    fn sub(self, value: f64) -> SpectralField {
        let mut out = self.clone();
        out -= value;
        out
    }
}

impl Mul<f64> for &SpectralField {
    type Output = SpectralField;

    fn mul(self, value: f64) -> SpectralField {
        self.map_valid("scalar multiplication", |v| *v *= value, |v| *v *= value)
    }
}

impl Div<f64> for &SpectralField {
    type Output = SpectralField;

    fn div(self, value: f64) -> SpectralField {
        self.map_valid("scalar division", |v| *v /= value, |v| *v /= value)
    }
}

macro_rules! forward_owned_scalar_op {
    ($($trait:ident :: $method:ident => $assign:ident),* $(,)?) => {
        $(
            impl $trait<f64> for SpectralField {
                type Output = SpectralField;

                fn $method(mut self, value: f64) -> SpectralField {
                    self.$assign(value);
                    self
                }
            }
        )*
    };
}

forward_owned_scalar_op!(
    Add::add => add_assign,
    Sub::sub => sub_assign,
    Mul::mul => mul_assign,
    Div::div => div_assign,
);

impl Add<&SpectralField> for f64 {
    type Output = SpectralField;

    fn add(self, field: &SpectralField) -> SpectralField {
        field + self
    }
}

impl Add<SpectralField> for f64 {
    type Output = SpectralField;

    fn add(self, field: SpectralField) -> SpectralField {
        field + self
    }
}

impl Sub<&SpectralField> for f64 {
    type Output = SpectralField;

    fn sub(self, field: &SpectralField) -> SpectralField {
        field.value_minus_this(self)
    }
}

impl Sub<SpectralField> for f64 {
    type Output = SpectralField;

    fn sub(self, field: SpectralField) -> SpectralField {
        field.value_minus_this(self)
    }
}

impl Mul<&SpectralField> for f64 {
    type Output = SpectralField;

    fn mul(self, field: &SpectralField) -> SpectralField {
        field * self
    }
}

impl Mul<SpectralField> for f64 {
    type Output = SpectralField;

    fn mul(self, field: SpectralField) -> SpectralField {
        field * self
    }
}

// ============================================================================
// Negation
// ============================================================================

impl Neg for &SpectralField {
    type Output = SpectralField;

    fn neg(self) -> SpectralField {
        self.map_valid("negation", |v| *v = -*v, |v| *v = -*v)
    }
}

impl Neg for SpectralField {
    type Output = SpectralField;

    fn neg(mut self) -> SpectralField {
        let state = self.state_mut();
        assert_initialized(state, "negation");
        update_valid(state, |v| *v = -*v, |v| *v = -*v);
        self
    }
}
