//! Integration tests for config file loading.

use pipeline_ir_cli::cli::OutputFormat;
use pipeline_ir_cli::tracing::{LogLevel, TracingFormat};
use pipeline_ir_cli::{CliConfig, CliError};

#[test]
fn test_explicit_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(
        &path,
        "log_level = \"debug\"\nlog_format = \"json\"\noutput = \"json\"\n",
    )
    .unwrap();

    let config = CliConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(
        config,
        CliConfig {
            log_level: LogLevel::Debug,
            log_format: TracingFormat::Json,
            output: OutputFormat::Json,
        }
    );
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = CliConfig::load(Some(path.as_path())).unwrap_err();
    assert!(matches!(err, CliError::File { .. }));
}

#[test]
fn test_fallback_file_used_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let fallback = dir.path().join("pipeline-ir.toml");
    std::fs::write(&fallback, "log_level = \"info\"\n").unwrap();

    let config = CliConfig::load_from(None, &fallback).unwrap();
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.output, OutputFormat::Text);
}

#[test]
fn test_defaults_without_any_file() {
    let dir = tempfile::tempdir().unwrap();
    let fallback = dir.path().join("pipeline-ir.toml");

    let config = CliConfig::load_from(None, &fallback).unwrap();
    assert_eq!(config, CliConfig::default());
}

#[test]
fn test_invalid_value_points_at_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline-ir.toml");
    std::fs::write(&path, "output = \"yaml\"\n").unwrap();

    match CliConfig::load(Some(path.as_path())).unwrap_err() {
        CliError::Config { src, span, .. } => {
            assert_eq!(src, "output = \"yaml\"\n");
            assert!(span.is_some());
        }
        other => panic!("expected config error, got {other:?}"),
    }
}
