//! Configuration module for acm-loopback.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `ACM_LOOPBACK_CONFIG` environment variable (explicit path)
//! 2. `./acm-loopback.toml` (current directory)
//! 3. `~/.config/acm-loopback/config.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\acm-loopback\config.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `ACM_LOOPBACK_<SECTION>_<KEY>`
//!
//! Examples:
//! - `ACM_LOOPBACK_PORTS_DATA=/dev/ttyACM2`
//! - `ACM_LOOPBACK_RUN_PROFILE=fail-fast`
//! - `ACM_LOOPBACK_RUN_PAYLOAD_SIZE=64`
//!
//! # Example
//!
//! ```rust,no_run
//! use acm_loopback::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let run = loader.config().resolve()?;
//!
//! println!("{} -> {}", run.data_port, run.console_port);
//! # Ok::<(), acm_loopback::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{
    Config, LogFormat, LoggingConfig, PortsConfig, Profile, RunConfig, RunPreset,
};
