//! Run-level error taxonomy.
//!
//! Mismatched readbacks are not errors: they are counted in the
//! [`RunSummary`](crate::loopback::RunSummary). Everything here aborts the run.

use crate::config::ConfigError;
use crate::loopback::PortRole;
use crate::port::PortError;
use thiserror::Error;

/// Fatal conditions that end a loopback run.
#[derive(Debug, Error)]
pub enum LoopbackError {
    /// A port could not be opened or prepared; no trial ran.
    #[error("failed to open {role} port '{path}': {source}")]
    Setup {
        role: PortRole,
        path: String,
        #[source]
        source: PortError,
    },

    /// A write failed outright.
    #[error("write to {role} port failed in trial {trial}: {source}")]
    Write {
        role: PortRole,
        trial: u32,
        #[source]
        source: PortError,
    },

    /// A read failed for a reason other than running out of time.
    #[error("read from {role} port failed in trial {trial}: {source}")]
    Read {
        role: PortRole,
        trial: u32,
        #[source]
        source: PortError,
    },

    /// The random source could not produce a payload.
    #[error("random payload generation failed: {0}")]
    Random(#[from] rand::Error),

    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Report output could not be written.
    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

impl LoopbackError {
    /// Whether the run failed before any trial started.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Setup { .. } | Self::Config(_))
    }
}

/// A specialized `Result` for loopback runs.
pub type LoopbackResult<T> = Result<T, LoopbackError>;
