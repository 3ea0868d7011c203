//! Setup file parsing.
//!
//! A solver describes its discretization in a small TOML file:
//!
//! ```toml
//! [grid]
//! nx = 64
//! ny = 32
//! lx = 6.283185307179586
//!
//! [modes]
//! layout = "rectangular"
//! orders = 64
//! degrees = 32
//!
//! [metrics]
//! enabled = true
//! output = "runs/metrics.jsonl"
//! ```
//!
//! A spherical truncation uses `layout = "triangular"` with `n_max` and
//! `m_max`. When `[modes]` is omitted the rectangular layout matching the grid
//! is used.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::Grid2D;
use crate::grid_config::GridConfig;
use crate::metrics::MetricsConfig;
use crate::modes::ModeLayout;
use crate::transform::SpectralTransform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupConfig {
    pub grid: Grid2D,
    #[serde(default)]
    pub modes: Option<ModeLayout>,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl SetupConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        info!("loaded setup from {}", path.display());
        Ok(config)
    }

    /// Mode layout, defaulting to the full rectangular spectrum of the grid.
    pub fn mode_layout(&self) -> ModeLayout {
        self.modes.unwrap_or(ModeLayout::Rectangular {
            orders: self.grid.nx,
            degrees: self.grid.ny,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.grid;
        if grid.nx == 0 || grid.ny == 0 {
            return Err(ConfigError::InvalidGrid(format!(
                "dimensions must be non-zero (got {}x{})",
                grid.nx, grid.ny
            )));
        }
        if !(grid.lx > 0.0 && grid.ly > 0.0) {
            return Err(ConfigError::InvalidGrid(format!(
                "lengths must be positive (got lx={}, ly={})",
                grid.lx, grid.ly
            )));
        }

        match self.mode_layout() {
            ModeLayout::Rectangular { orders, degrees } => {
                if orders != grid.nx || degrees != grid.ny {
                    return Err(ConfigError::InvalidModes(format!(
                        "rectangular layout {orders}x{degrees} must match grid {}x{}",
                        grid.nx, grid.ny
                    )));
                }
            }
            ModeLayout::Triangular { n_max, m_max } => {
                if m_max > n_max {
                    return Err(ConfigError::InvalidModes(format!(
                        "triangular layout requires m_max ({m_max}) <= n_max ({n_max})"
                    )));
                }
            }
        }

        if self.metrics.enabled && self.metrics.output.is_none() {
            return Err(ConfigError::InvalidMetrics(
                "metrics.output must be set when metrics are enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Shared grid configuration for this setup.
    ///
    /// Without a transform the configuration only supports spectral-space
    /// work such as operator assembly.
    pub fn build_config(&self, transform: Option<Box<dyn SpectralTransform>>) -> Arc<GridConfig> {
        let modes = self.mode_layout();
        match transform {
            Some(transform) => GridConfig::new(self.grid, modes, transform),
            None => GridConfig::without_transform(self.grid, modes),
        }
    }
}
