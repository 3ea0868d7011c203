#![cfg(test)]

use std::path::PathBuf;

use super::error::ConfigError;
use super::io::SetupConfig;
use super::metrics::MetricsConfig;
use super::modes::ModeLayout;

#[test]
fn parses_rectangular_setup_with_defaults() {
    let config = SetupConfig::from_toml_str(
        r#"
        [grid]
        nx = 8
        ny = 4
        "#,
    )
    .unwrap();
    assert_eq!(config.grid.nx, 8);
    assert_eq!(config.grid.lx, 1.0);
    assert_eq!(config.mode_layout(), ModeLayout::rectangular(8, 4));
    assert_eq!(config.metrics, MetricsConfig::default());
}

#[test]
fn parses_triangular_layout_and_metrics() {
    let config = SetupConfig::from_toml_str(
        r#"
        [grid]
        nx = 32
        ny = 16
        lx = 6.0

        [modes]
        layout = "triangular"
        n_max = 15
        m_max = 10

        [metrics]
        enabled = true
        output = "out/metrics.jsonl"
        "#,
    )
    .unwrap();
    assert_eq!(config.mode_layout(), ModeLayout::triangular(15, 10));
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.output, Some(PathBuf::from("out/metrics.jsonl")));
}

#[test]
fn rejects_zero_sized_grid() {
    let err = SetupConfig::from_toml_str("[grid]\nnx = 0\nny = 4\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidGrid(_)), "{err}");
}

#[test]
fn rejects_rectangular_layout_that_disagrees_with_grid() {
    let err = SetupConfig::from_toml_str(
        "[grid]\nnx = 8\nny = 4\n[modes]\nlayout = \"rectangular\"\norders = 4\ndegrees = 4\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidModes(_)), "{err}");
}

#[test]
fn rejects_triangular_layout_with_order_above_degree() {
    let err = SetupConfig::from_toml_str(
        "[grid]\nnx = 8\nny = 4\n[modes]\nlayout = \"triangular\"\nn_max = 2\nm_max = 3\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidModes(_)), "{err}");
}

#[test]
fn rejects_enabled_metrics_without_output() {
    let err = SetupConfig::from_toml_str("[grid]\nnx = 2\nny = 2\n[metrics]\nenabled = true\n")
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidMetrics(_)), "{err}");
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = SetupConfig::from_toml_str("[grid\nnx = 2").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err}");
}

#[test]
fn missing_file_reports_path() {
    let err = SetupConfig::from_path("/nonexistent/setup.toml").unwrap_err();
    match err {
        ConfigError::Io { path, .. } => assert_eq!(path, PathBuf::from("/nonexistent/setup.toml")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn build_config_without_transform_is_spectral_only() {
    let setup = SetupConfig::from_toml_str(
        "[grid]\nnx = 6\nny = 4\n[modes]\nlayout = \"triangular\"\nn_max = 3\nm_max = 2\n",
    )
    .unwrap();
    let config = setup.build_config(None);
    assert!(!config.has_transform());
    assert_eq!(config.spectral_element_count(), ModeLayout::triangular(3, 2).len());
    assert_eq!(config.physical_element_count(), 24);
}
