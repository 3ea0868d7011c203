//! Banded storage for linear operators in spectral space.
//!
//! Coefficients are partitioned into independent blocks, one per zonal order
//! `m`. Inside a block the band only couples neighbouring degrees, so a row
//! for mode `(n, m)` stores the couplings to `(n - h, m) ..= (n + h, m)` where
//! `h` is the halo radius:
//!
//! ```text
//! row (n, m):  [ a(n, n-h) ... a(n, n-1) | a(n, n) | a(n, n+1) ... a(n, n+h) ]
//!                              2h + 1 = band width
//! ```
//!
//! Rows are addressed through the same [`ModeLayout`](crate::modes::ModeLayout) as spectral field
//! coefficients, so the operator and the field agree on every flat offset.
//!
//! Couplings to degrees outside the block (below `min_degree(m)` or above
//! `max_degree`) do not exist. Reading them yields zero and writing them is a
//! no-op, so assembly code can sweep a fixed stencil over every row without
//! special-casing the block edges.

use std::fmt;
use std::ops::AddAssign;
use std::sync::{Arc, OnceLock};

use log::debug;
use num_traits::Zero;

use crate::grid_config::GridConfig;

pub struct BandedMatrix<T> {
    config: Arc<GridConfig>,
    halo_radius: usize,
    band_width: usize,
    coefficients: Vec<T>,
    column_major: OnceLock<Vec<T>>,
}

impl<T> BandedMatrix<T>
where
    T: Copy + Zero + AddAssign,
{
    /// Allocate a zeroed matrix with `2 * halo_radius + 1` diagonals.
    pub fn new(config: &Arc<GridConfig>, halo_radius: usize) -> Self {
        let band_width = 2 * halo_radius + 1;
        let rows = config.spectral_element_count();
        debug!("banded matrix: {rows} rows, halo {halo_radius}, band width {band_width}");
        Self {
            config: Arc::clone(config),
            halo_radius,
            band_width,
            coefficients: vec![T::zero(); rows * band_width],
            column_major: OnceLock::new(),
        }
    }

    pub fn zero_all(&mut self) {
        self.invalidate();
        self.coefficients.fill(T::zero());
    }

    pub fn config(&self) -> &Arc<GridConfig> {
        &self.config
    }

    pub fn halo_radius(&self) -> usize {
        self.halo_radius
    }

    pub fn band_width(&self) -> usize {
        self.band_width
    }

    pub fn rows(&self) -> usize {
        self.config.spectral_element_count()
    }

    /// Row-major band storage: row `r` occupies `[r * band_width, (r + 1) * band_width)`.
    pub fn coefficients(&self) -> &[T] {
        &self.coefficients
    }

    pub fn coefficients_mut(&mut self) -> &mut [T] {
        self.invalidate();
        &mut self.coefficients
    }

    // ------------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------------

    /// Offset of the band belonging to mode `(degree, order)`.
    pub fn row_offset(&self, degree: usize, order: usize) -> usize {
        let modes = self.config.modes();
        assert!(
            order <= modes.max_order(),
            "order {order} outside configured range 0..={}",
            modes.max_order()
        );
        assert!(
            modes.contains(degree, order),
            "degree {degree} outside the block of order {order}"
        );
        modes.index(degree, order) * self.band_width
    }

    pub fn row(&self, degree: usize, order: usize) -> BandRow<'_, T> {
        let start = self.row_offset(degree, order);
        BandRow {
            values: &self.coefficients[start..start + self.band_width],
            locator: self.locator(degree, order),
        }
    }

    pub fn row_mut(&mut self, degree: usize, order: usize) -> BandRowMut<'_, T> {
        let start = self.row_offset(degree, order);
        let locator = self.locator(degree, order);
        self.invalidate();
        BandRowMut {
            values: &mut self.coefficients[start..start + self.band_width],
            locator,
        }
    }

    // ------------------------------------------------------------------------
    // Relative element access
    // ------------------------------------------------------------------------

    /// Coupling of row `(degree, order)` to degree `degree + rel`; zero outside the block.
    pub fn get_element(&self, degree: usize, order: usize, rel: isize) -> T {
        match self.slot(degree, order, rel) {
            Some(idx) => self.coefficients[idx],
            None => T::zero(),
        }
    }

    /// No-op when the target lies outside the block.
    pub fn set_element(&mut self, degree: usize, order: usize, rel: isize, value: T) {
        if let Some(idx) = self.slot(degree, order, rel) {
            self.invalidate();
            self.coefficients[idx] = value;
        }
    }

    /// Accumulate into an element; no-op when the target lies outside the block.
    pub fn add_element(&mut self, degree: usize, order: usize, rel: isize, value: T) {
        if let Some(idx) = self.slot(degree, order, rel) {
            self.invalidate();
            self.coefficients[idx] += value;
        }
    }

    fn locator(&self, degree: usize, order: usize) -> BandLocator {
        BandLocator {
            degree,
            min_degree: self.config.modes().min_degree(order),
            max_degree: self.config.modes().max_degree(),
            halo_radius: self.halo_radius,
        }
    }

    /// Flat coefficient index, or `None` for couplings outside the block.
    fn slot(&self, degree: usize, order: usize, rel: isize) -> Option<usize> {
        let modes = self.config.modes();
        assert!(
            order <= modes.max_order(),
            "order {order} outside configured range 0..={}",
            modes.max_order()
        );
        if !modes.contains(degree, order) {
            return None;
        }
        let band = self.locator(degree, order).band_index(rel)?;
        Some(modes.index(degree, order) * self.band_width + band)
    }

    // ------------------------------------------------------------------------
    // Column-major export
    // ------------------------------------------------------------------------

    /// Band-major copy for column-major banded solvers:
    /// `out[band * rows + row] = coefficients[row * band_width + band]`.
    ///
    /// Built on first use and cached until the matrix is modified.
    pub fn to_column_major(&self) -> &[T] {
        self.column_major.get_or_init(|| {
            let rows = self.rows();
            let mut out = vec![T::zero(); self.coefficients.len()];
            for (row, band) in self.coefficients.chunks_exact(self.band_width).enumerate() {
                for (diag, &value) in band.iter().enumerate() {
                    out[diag * rows + row] = value;
                }
            }
            out
        })
    }

    pub fn is_column_major_cached(&self) -> bool {
        self.column_major.get().is_some()
    }

    fn invalidate(&mut self) {
        self.column_major.take();
    }
}

impl<T> BandedMatrix<T>
where
    T: Copy + Zero + AddAssign + fmt::Display,
{
    /// Tab-separated dump of one order block, one line per row.
    pub fn describe_block(&self, order: usize) -> String {
        let modes = self.config.modes();
        let mut out = format!(
            "block m={order} with n=[{}, {}]\n",
            modes.min_degree(order),
            modes.max_degree()
        );
        for degree in modes.block_degrees(order) {
            let row = self.row(degree, order);
            let line: Vec<String> = row.values.iter().map(ToString::to_string).collect();
            out.push_str(&format!("n={degree}\t{}\n", line.join("\t")));
        }
        out
    }
}

impl<T> fmt::Debug for BandedMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BandedMatrix")
            .field("modes", self.config.modes())
            .field("halo_radius", &self.halo_radius)
            .field("column_major_cached", &self.column_major.get().is_some())
            .finish()
    }
}

// ============================================================================
// Row views
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct BandLocator {
    degree: usize,
    min_degree: usize,
    max_degree: usize,
    halo_radius: usize,
}

impl BandLocator {
    fn band_index(&self, rel: isize) -> Option<usize> {
        let neighbor = self.degree as isize + rel;
        if neighbor < 0 || neighbor < self.min_degree as isize || neighbor > self.max_degree as isize
        {
            return None;
        }
        let halo = self.halo_radius as isize;
        assert!(
            (-halo..=halo).contains(&rel),
            "relative degree offset {rel} exceeds halo radius {halo}"
        );
        Some((rel + halo) as usize)
    }
}

/// Read-only view of one band row.
pub struct BandRow<'a, T> {
    values: &'a [T],
    locator: BandLocator,
}

impl<T: Copy + Zero> BandRow<'_, T> {
    pub fn get(&self, rel: isize) -> T {
        self.locator
            .band_index(rel)
            .map_or_else(T::zero, |idx| self.values[idx])
    }

    pub fn as_slice(&self) -> &[T] {
        self.values
    }
}

/// Mutable view of one band row, obtained through [`BandedMatrix::row_mut`].
pub struct BandRowMut<'a, T> {
    values: &'a mut [T],
    locator: BandLocator,
}

impl<T: Copy + Zero + AddAssign> BandRowMut<'_, T> {
    pub fn get(&self, rel: isize) -> T {
        self.locator
            .band_index(rel)
            .map_or_else(T::zero, |idx| self.values[idx])
    }

    pub fn set(&mut self, rel: isize, value: T) {
        if let Some(idx) = self.locator.band_index(rel) {
            self.values[idx] = value;
        }
    }

    pub fn add(&mut self, rel: isize, value: T) {
        if let Some(idx) = self.locator.band_index(rel) {
            self.values[idx] += value;
        }
    }
}
