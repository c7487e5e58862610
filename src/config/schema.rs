//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All sections carry defaults, so an empty file (or no file) is valid.

use super::error::{ConfigError, ConfigResult};
use crate::loopback::LoopbackConfig;
use crate::port::{DataBits, FlowControl, Parity, StopBits};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The two serial endpoints under test
    pub ports: PortsConfig,
    /// Trial loop settings
    pub run: RunConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Serial endpoint configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    /// Device path of the data port
    pub data: String,
    /// Device path of the console port
    pub console: String,
    /// Baud rate for both ports
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
    /// Bits per character (5-8)
    pub data_bits: DataBits,
    /// `none`, `odd` or `even`
    pub parity: Parity,
    /// 1 or 2
    pub stop_bits: StopBits,
    /// `none`, `software` or `hardware`
    pub flow_control: FlowControl,
    /// Discard whatever is already buffered right after opening
    pub clear_on_open: bool,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            data: "/dev/ttyACM0".to_string(),
            console: "/dev/ttyACM1".to_string(),
            baud_rate: 115_200,
            timeout_ms: 1000,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            clear_on_open: false,
        }
    }
}

impl PortsConfig {
    /// Get the read timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Named run presets.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Large payloads, tight pacing, always runs every trial
    #[default]
    Stress,
    /// Smaller payloads, relaxed pacing, stops at the first mismatch
    FailFast,
}

/// Trial-loop parameters a profile expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPreset {
    pub trials: u32,
    pub payload_size: usize,
    pub inter_trial_delay: Duration,
    pub stop_on_first_error: bool,
}

impl Profile {
    pub fn preset(self) -> RunPreset {
        match self {
            Self::Stress => RunPreset {
                trials: 2000,
                payload_size: 150,
                inter_trial_delay: Duration::from_micros(100),
                stop_on_first_error: false,
            },
            Self::FailFast => RunPreset {
                trials: 2000,
                payload_size: 64,
                inter_trial_delay: Duration::from_millis(1),
                stop_on_first_error: true,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stress => "stress",
            Self::FailFast => "fail-fast",
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stress" => Ok(Self::Stress),
            "fail-fast" | "fail_fast" | "failfast" => Ok(Self::FailFast),
            other => Err(format!("unknown profile '{other}' (expected stress or fail-fast)")),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trial loop configuration section.
///
/// Unset fields fall back to the selected profile's preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Preset the remaining fields refine
    pub profile: Profile,
    /// Number of trials to attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trials: Option<u32>,
    /// Bytes written to each port per trial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_size: Option<usize>,
    /// Pause before each trial's writes, in microseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inter_trial_delay_us: Option<u64>,
    /// Stop after the first trial with a mismatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_on_first_error: Option<bool>,
    /// Exit non-zero when any mismatch was counted
    pub fail_on_mismatch: bool,
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl Config {
    /// Render the effective settings, presets unexpanded.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration and flatten it into the verifier's input.
    pub fn resolve(&self) -> ConfigResult<LoopbackConfig> {
        let preset = self.run.profile.preset();

        if self.ports.data.trim().is_empty() {
            return Err(ConfigError::validation("ports.data", "device path is empty"));
        }
        if self.ports.console.trim().is_empty() {
            return Err(ConfigError::validation("ports.console", "device path is empty"));
        }
        if self.ports.data == self.ports.console {
            return Err(ConfigError::validation(
                "ports.console",
                format!("must differ from the data port ({})", self.ports.data),
            ));
        }
        if self.ports.baud_rate == 0 {
            return Err(ConfigError::validation("ports.baud_rate", "must be positive"));
        }
        if self.ports.timeout_ms == 0 {
            return Err(ConfigError::validation(
                "ports.timeout_ms",
                "must be positive; a zero timeout returns every read empty",
            ));
        }

        let payload_size = self.run.payload_size.unwrap_or(preset.payload_size);
        if payload_size == 0 {
            return Err(ConfigError::validation(
                "run.payload_size",
                "must be at least 1 byte",
            ));
        }

        Ok(LoopbackConfig {
            data_port: self.ports.data.clone(),
            console_port: self.ports.console.clone(),
            baud_rate: self.ports.baud_rate,
            read_timeout: self.ports.timeout(),
            data_bits: self.ports.data_bits,
            parity: self.ports.parity,
            stop_bits: self.ports.stop_bits,
            flow_control: self.ports.flow_control,
            trial_count: self.run.trials.unwrap_or(preset.trials),
            payload_size,
            inter_trial_delay: self
                .run
                .inter_trial_delay_us
                .map(Duration::from_micros)
                .unwrap_or(preset.inter_trial_delay),
            stop_on_first_error: self
                .run
                .stop_on_first_error
                .unwrap_or(preset.stop_on_first_error),
            clear_on_open: self.ports.clear_on_open,
        })
    }
}
