//! Dual-representation spectral fields and banded spectral operators.
//!
//! A [`SpectralField`] holds a scalar field on a physical grid and as
//! transform coefficients, converting lazily between the two. A
//! [`BandedMatrix`] stores a linear operator in spectral space as one band
//! per zonal order. Both are bound to a shared [`GridConfig`].

pub mod banded;
pub mod banded_solve;
pub mod diagnostics;
pub mod error;
pub mod field;
pub mod field_ops;
pub mod grid;
pub mod grid_config;
pub mod io;
pub mod memory;
pub mod metrics;
pub mod modes;
pub mod reduction;
pub mod transform;

pub use banded::BandedMatrix;
pub use diagnostics::{DebugContainer, FieldSummary};
pub use error::{BandedSolveError, ConfigError, FieldError};
pub use field::SpectralField;
pub use grid::Grid2D;
pub use grid_config::GridConfig;
pub use modes::ModeLayout;
pub use transform::{SpectralTransform, TransformDirection};


#[cfg(test)]
mod _tests_io;
#[cfg(test)]
mod _tests_modes;
#[cfg(test)]
mod _tests_reduction;
