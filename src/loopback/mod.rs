//! Bidirectional loopback verification over two serial endpoints.
//!
//! Each trial writes a fresh random payload to both ports and expects every
//! port to read back exactly what was written to the *other* one. Mismatches
//! are counted per direction; see [`LoopbackVerifier`] for the loop itself.

mod summary;
mod trial;
mod verifier;

pub use summary::RunSummary;
pub use trial::{random_payload, Direction, Mismatch, Trial};
pub use verifier::LoopbackVerifier;

use crate::port::{DataBits, FlowControl, Parity, PortConfiguration, StopBits};
use std::fmt;
use std::time::Duration;

/// Which of the two endpoints a handle plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortRole {
    Data,
    Console,
}

impl PortRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Console => "console",
        }
    }
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a single run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackConfig {
    /// Device path of the data endpoint.
    pub data_port: String,
    /// Device path of the console endpoint.
    pub console_port: String,
    /// Baud rate applied to both ports.
    pub baud_rate: u32,
    /// Longest a read may wait before returning what it has.
    pub read_timeout: Duration,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Upper bound on the number of trials.
    pub trial_count: u32,
    /// Bytes written to each port per trial.
    pub payload_size: usize,
    /// Pause before each trial's writes.
    pub inter_trial_delay: Duration,
    /// End the run after the first trial with any mismatch.
    pub stop_on_first_error: bool,
    /// Discard stale buffered bytes right after opening.
    pub clear_on_open: bool,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            data_port: "/dev/ttyACM0".to_string(),
            console_port: "/dev/ttyACM1".to_string(),
            baud_rate: 115_200,
            read_timeout: Duration::from_secs(1),
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            trial_count: 2000,
            payload_size: 150,
            inter_trial_delay: Duration::from_micros(100),
            stop_on_first_error: false,
            clear_on_open: false,
        }
    }
}

impl LoopbackConfig {
    /// Device path for a role.
    pub fn path(&self, role: PortRole) -> &str {
        match role {
            PortRole::Data => &self.data_port,
            PortRole::Console => &self.console_port,
        }
    }

    /// Settings both ports are opened with.
    pub fn port_configuration(&self) -> PortConfiguration {
        PortConfiguration {
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            flow_control: self.flow_control,
            parity: self.parity,
            stop_bits: self.stop_bits,
            timeout: self.read_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names() {
        assert_eq!(PortRole::Data.to_string(), "data");
        assert_eq!(PortRole::Console.to_string(), "console");
    }

    #[test]
    fn test_path_by_role() {
        let config = LoopbackConfig::default();
        assert_eq!(config.path(PortRole::Data), "/dev/ttyACM0");
        assert_eq!(config.path(PortRole::Console), "/dev/ttyACM1");
    }

    #[test]
    fn test_port_configuration_carries_framing() {
        let config = LoopbackConfig {
            baud_rate: 9600,
            parity: Parity::Odd,
            stop_bits: StopBits::Two,
            ..LoopbackConfig::default()
        };
        let port = config.port_configuration();
        assert_eq!(port.baud_rate, 9600);
        assert_eq!(port.parity, Parity::Odd);
        assert_eq!(port.stop_bits, StopBits::Two);
        assert_eq!(port.data_bits, DataBits::Eight);
        assert_eq!(port.timeout, Duration::from_secs(1));
    }
}
