//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "ACM_LOOPBACK";

/// Config file name looked up in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "acm-loopback.toml";

/// Config file name inside the per-user config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory under the per-user config directory
const APP_DIR_NAME: &str = "acm-loopback";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "ACM_LOOPBACK_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `ACM_LOOPBACK_CONFIG` environment variable (explicit path)
    /// 2. `./acm-loopback.toml` (current directory)
    /// 3. `$XDG_CONFIG_HOME/acm-loopback/config.toml` (or `%APPDATA%` on Windows)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory (Linux/macOS) or APPDATA (Windows)
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Get the default per-user config file path.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn env_var(suffix: &str) -> (String, Option<String>) {
    let name = format!("{}_{}", ENV_PREFIX, suffix);
    let value = std::env::var(&name).ok();
    (name, value)
}

fn parse_env<T: FromStr>(name: &str, value: &str, what: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(name, format!("Invalid {what}: '{value}'")))
}

fn parse_env_bool(name: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse(
            name,
            format!("Invalid boolean: '{value}'"),
        )),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `ACM_LOOPBACK_<SECTION>_<KEY>`
/// For example:
/// - `ACM_LOOPBACK_PORTS_DATA=/dev/ttyACM2`
/// - `ACM_LOOPBACK_RUN_TRIALS=500`
/// - `ACM_LOOPBACK_LOGGING_FORMAT=json`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Ports
    if let (_, Some(val)) = env_var("PORTS_DATA") {
        config.ports.data = val;
    }
    if let (_, Some(val)) = env_var("PORTS_CONSOLE") {
        config.ports.console = val;
    }
    if let (name, Some(val)) = env_var("PORTS_BAUD_RATE") {
        config.ports.baud_rate = parse_env(&name, &val, "baud rate")?;
    }
    if let (name, Some(val)) = env_var("PORTS_TIMEOUT_MS") {
        config.ports.timeout_ms = parse_env(&name, &val, "timeout")?;
    }
    if let (name, Some(val)) = env_var("PORTS_DATA_BITS") {
        config.ports.data_bits = val
            .parse()
            .map_err(|e: String| ConfigError::env_parse(name, e))?;
    }
    if let (name, Some(val)) = env_var("PORTS_PARITY") {
        config.ports.parity = val
            .parse()
            .map_err(|e: String| ConfigError::env_parse(name, e))?;
    }
    if let (name, Some(val)) = env_var("PORTS_STOP_BITS") {
        config.ports.stop_bits = val
            .parse()
            .map_err(|e: String| ConfigError::env_parse(name, e))?;
    }
    if let (name, Some(val)) = env_var("PORTS_FLOW_CONTROL") {
        config.ports.flow_control = val
            .parse()
            .map_err(|e: String| ConfigError::env_parse(name, e))?;
    }
    if let (name, Some(val)) = env_var("PORTS_CLEAR_ON_OPEN") {
        config.ports.clear_on_open = parse_env_bool(&name, &val)?;
    }

    // Run
    if let (name, Some(val)) = env_var("RUN_PROFILE") {
        config.run.profile = val
            .parse()
            .map_err(|e: String| ConfigError::env_parse(name, e))?;
    }
    if let (name, Some(val)) = env_var("RUN_TRIALS") {
        config.run.trials = Some(parse_env(&name, &val, "trial count")?);
    }
    if let (name, Some(val)) = env_var("RUN_PAYLOAD_SIZE") {
        config.run.payload_size = Some(parse_env(&name, &val, "payload size")?);
    }
    if let (name, Some(val)) = env_var("RUN_INTER_TRIAL_DELAY_US") {
        config.run.inter_trial_delay_us = Some(parse_env(&name, &val, "delay")?);
    }
    if let (name, Some(val)) = env_var("RUN_STOP_ON_FIRST_ERROR") {
        config.run.stop_on_first_error = Some(parse_env_bool(&name, &val)?);
    }
    if let (name, Some(val)) = env_var("RUN_FAIL_ON_MISMATCH") {
        config.run.fail_on_mismatch = parse_env_bool(&name, &val)?;
    }

    // Logging
    if let (_, Some(val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let (name, Some(val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = val
            .parse()
            .map_err(|e: String| ConfigError::env_parse(name, e))?;
    }

    Ok(())
}
