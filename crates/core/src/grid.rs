//! Uniform physical grid description.

use serde::{Deserialize, Serialize};

/// Physical grid of `ny` rows by `nx` columns, stored row-major.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid2D {
    pub nx: usize,
    pub ny: usize,
    #[serde(default = "default_length")]
    pub lx: f64,
    #[serde(default = "default_length")]
    pub ly: f64,
}

impl Grid2D {
    pub fn new(nx: usize, ny: usize, lx: f64, ly: f64) -> Self {
        Self { nx, ny, lx, ly }
    }

    /// Flat offset of the sample in row `row` (y index) and column `col` (x index).
    #[inline]
    pub fn idx(&self, row: usize, col: usize) -> usize {
        row * self.nx + col
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `[rows, cols]`.
    pub fn extent(&self) -> [usize; 2] {
        [self.ny, self.nx]
    }

    /// Resolve a possibly negative row index, counting from the last row.
    pub fn wrap_row(&self, row: isize) -> usize {
        let ny = self.ny as isize;
        let wrapped = if row < 0 { row + ny } else { row };
        assert!(
            (0..ny).contains(&wrapped),
            "row {row} out of range for grid with {} rows",
            self.ny
        );
        wrapped as usize
    }
}

fn default_length() -> f64 {
    1.0
}
