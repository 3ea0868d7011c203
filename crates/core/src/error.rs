//! Error types.
//!
//! Invariant violations inside the field algebra are fatal and panic with the
//! `Display` text of these errors. The `try_*` entry points return them
//! instead, for callers that prefer to handle them.

use std::path::PathBuf;

use crate::transform::TransformDirection;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("operands are bound to different grid configurations")]
    ConfigMismatch,

    #[error("no valid data to transform from ({direction:?} transform requested on an uninitialized field)")]
    UninitializedSource { direction: TransformDirection },

    #[error("grid configuration has no transform bound ({direction:?} transform requested)")]
    NoTransform { direction: TransformDirection },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BandedSolveError {
    #[error("banded matrix and right-hand side are bound to different grid configurations")]
    ConfigMismatch,

    #[error("banded block for order {order} is singular at degree {degree}")]
    Singular { order: usize, degree: usize },
}

/// Setup-file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid mode layout: {0}")]
    InvalidModes(String),

    #[error("Invalid metrics configuration: {0}")]
    InvalidMetrics(String),
}
