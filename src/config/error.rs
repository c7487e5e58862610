use std::path::PathBuf;
use thiserror::Error;

/// Why the run settings could not be assembled.
///
/// All of these surface before any port is opened.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Cannot read configuration file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Only reachable through `--print-config`.
    #[error("Cannot render configuration as TOML: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A value parsed fine but cannot drive a run (empty path, zero payload, ...).
    #[error("Invalid setting '{key}': {message}")]
    ValidationError { key: String, message: String },

    /// An `ACM_LOOPBACK_*` override did not parse.
    #[error("Bad value in {var}: {message}")]
    EnvParseError { var: String, message: String },
}

impl ConfigError {
    pub fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn env_parse(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
