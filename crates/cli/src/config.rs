//! CLI configuration file.
//!
//! Settings come from an optional `pipeline-ir.toml`; command-line flags take
//! precedence over file values, and defaults fill in the rest.
//!
//! ```toml
//! log_level = "info"
//! log_format = "json"
//! output = "text"
//! ```

use crate::cli::{Cli, OutputFormat};
use crate::errors::CliError;
use crate::tracing::{LogLevel, TracingConfig, TracingFormat};
use miette::SourceSpan;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "pipeline-ir.toml";

/// Settings for one CLI invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Log level for this workspace's crates.
    pub log_level: LogLevel,
    /// Log output format.
    pub log_format: TracingFormat,
    /// Command output format.
    pub output: OutputFormat,
}

impl CliConfig {
    /// Parse a config document read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] pointing at the offending span.
    pub fn from_toml(path: &Path, src: &str) -> Result<Self, CliError> {
        toml::from_str(src).map_err(|e| CliError::Config {
            path: path.to_path_buf(),
            message: e.message().to_string(),
            src: src.to_string(),
            span: e.span().map(SourceSpan::from),
        })
    }

    /// Load the config for this invocation.
    ///
    /// An explicit path must exist. Without one, [`DEFAULT_CONFIG_FILE`] in
    /// the working directory is used when present.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::File`] if an explicit file cannot be read and
    /// [`CliError::Config`] if the file is malformed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        Self::load_from(explicit, Path::new(DEFAULT_CONFIG_FILE))
    }

    /// [`load`](Self::load) with a custom fallback location.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_from(explicit: Option<&Path>, fallback: &Path) -> Result<Self, CliError> {
        let path = match explicit {
            Some(path) => path,
            None if fallback.is_file() => fallback,
            None => {
                debug!("No config file found, using defaults");
                return Ok(Self::default());
            }
        };

        let src = std::fs::read_to_string(path)
            .map_err(|e| CliError::file("read config file", path, e))?;
        let config = Self::from_toml(path, &src)?;
        debug!(path = %path.display(), ?config, "Loaded config file");
        Ok(config)
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(level) = cli.level {
            self.log_level = level;
        }
        if let Some(format) = cli.log_format {
            self.log_format = format;
        }
        if let Some(output) = cli.requested_output() {
            self.output = output;
        }
        self
    }

    /// Tracing setup for these settings.
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            format: self.log_format,
            level: self.log_level.into(),
            filter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = CliConfig::from_toml(Path::new("pipeline-ir.toml"), "").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.output, OutputFormat::Text);
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_partial_document() {
        let config =
            CliConfig::from_toml(Path::new("pipeline-ir.toml"), "output = \"json\"\n").unwrap();
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.log_format, TracingFormat::Compact);
    }

    #[test]
    fn test_unknown_key_rejected_with_span() {
        let err = CliConfig::from_toml(Path::new("pipeline-ir.toml"), "verbosity = 3\n")
            .unwrap_err();
        match err {
            CliError::Config { span, .. } => assert!(span.is_some()),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_flags_override_file() {
        let file = CliConfig {
            log_level: LogLevel::Info,
            log_format: TracingFormat::Json,
            output: OutputFormat::Text,
        };
        let cli = Cli::try_parse_from(["pipeline-ir", "-l", "debug", "--json", "schema"]).unwrap();

        let config = file.with_overrides(&cli);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.log_format, TracingFormat::Json);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.tracing_config().level, tracing::Level::DEBUG);
    }
}
