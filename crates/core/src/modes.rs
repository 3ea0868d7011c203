//! Mapping between spectral mode indices `(degree, order)` and flat offsets.
//!
//! Two layouts are supported:
//!
//! - **Rectangular**: the full coefficient array of a 2D Fourier transform,
//!   stored row-major. The order is the column (x wavenumber slot) and the
//!   degree is the row (y wavenumber slot), so every order owns the degrees
//!   `0..degrees`.
//! - **Triangular**: a spherical-harmonic truncation stored m-major,
//!
//!   ```text
//!   P_0^0, P_1^0, ..., P_N^0, P_1^1, P_2^1, ..., P_N^1, ..., P_M^M, ..., P_N^M
//!   ```
//!
//!   so order `m` owns the contiguous degrees `m..=n_max`.
//!
//! Fields and banded matrices bound to the same configuration resolve every
//! `(degree, order)` pair through the same layout.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum ModeLayout {
    Rectangular { orders: usize, degrees: usize },
    Triangular { n_max: usize, m_max: usize },
}

impl ModeLayout {
    pub fn rectangular(orders: usize, degrees: usize) -> Self {
        assert!(
            orders > 0 && degrees > 0,
            "rectangular mode layout must have non-zero dimensions"
        );
        Self::Rectangular { orders, degrees }
    }

    pub fn triangular(n_max: usize, m_max: usize) -> Self {
        assert!(
            m_max <= n_max,
            "triangular mode layout requires m_max ({m_max}) <= n_max ({n_max})"
        );
        Self::Triangular { n_max, m_max }
    }

    /// Total number of spectral coefficients.
    pub fn len(&self) -> usize {
        match *self {
            Self::Rectangular { orders, degrees } => orders * degrees,
            Self::Triangular { n_max, m_max } => {
                Self::triangular_block_start(n_max, m_max + 1)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_order(&self) -> usize {
        match *self {
            Self::Rectangular { orders, .. } => orders - 1,
            Self::Triangular { m_max, .. } => m_max,
        }
    }

    pub fn max_degree(&self) -> usize {
        match *self {
            Self::Rectangular { degrees, .. } => degrees - 1,
            Self::Triangular { n_max, .. } => n_max,
        }
    }

    /// Smallest valid degree of the block belonging to `order`.
    #[inline]
    pub fn min_degree(&self, order: usize) -> usize {
        match self {
            Self::Rectangular { .. } => 0,
            Self::Triangular { .. } => order,
        }
    }

    /// Number of degrees in the block belonging to `order`.
    pub fn block_len(&self, order: usize) -> usize {
        self.max_degree() + 1 - self.min_degree(order)
    }

    /// Degrees `min_degree(order)..=max_degree` of one order block.
    pub fn block_degrees(&self, order: usize) -> RangeInclusive<usize> {
        self.min_degree(order)..=self.max_degree()
    }

    #[inline]
    pub fn contains(&self, degree: usize, order: usize) -> bool {
        order <= self.max_order() && degree >= self.min_degree(order) && degree <= self.max_degree()
    }

    /// `[rows, cols]` of the coefficient array as seen by row/column accessors.
    pub fn extent(&self) -> [usize; 2] {
        match *self {
            Self::Rectangular { orders, degrees } => [degrees, orders],
            Self::Triangular { .. } => [1, self.len()],
        }
    }

    /// Flat offset of mode `(degree, order)`. The pair must lie inside the layout.
    #[inline]
    pub fn index(&self, degree: usize, order: usize) -> usize {
        debug_assert!(
            self.contains(degree, order),
            "mode (degree={degree}, order={order}) outside {self:?}"
        );
        match *self {
            Self::Rectangular { orders, .. } => degree * orders + order,
            Self::Triangular { n_max, .. } => {
                Self::triangular_block_start(n_max, order) + (degree - order)
            }
        }
    }

    /// Inverse of [`ModeLayout::index`]: returns `(degree, order)`.
    pub fn modes_at(&self, index: usize) -> (usize, usize) {
        assert!(
            index < self.len(),
            "spectral index {index} out of range ({} modes)",
            self.len()
        );
        match *self {
            Self::Rectangular { orders, .. } => (index / orders, index % orders),
            Self::Triangular { n_max, m_max } => {
                let mut order = 0;
                while order < m_max && Self::triangular_block_start(n_max, order + 1) <= index {
                    order += 1;
                }
                let degree = order + index - Self::triangular_block_start(n_max, order);
                (degree, order)
            }
        }
    }

    /// Flat offsets of all degrees of one order block, in ascending degree.
    ///
    /// Contiguous for triangular layouts; strided by `orders` for rectangular ones.
    pub fn block_offsets(&self, order: usize) -> impl Iterator<Item = usize> + '_ {
        self.block_degrees(order)
            .map(move |degree| self.index(degree, order))
    }

    fn triangular_block_start(n_max: usize, order: usize) -> usize {
        order * (2 * n_max + 3 - order) / 2
    }
}
