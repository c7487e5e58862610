//! Loopback verifier for paired USB CDC-ACM serial ports.
//!
//! Writes random payloads to a "data" and a "console" port and checks that
//! each port reads back exactly what the other one was sent.
//!
//! # Modules
//!
//! - `loopback`: the trial loop, per-trial comparison and run summary
//! - `port`: serial port abstraction with a `serialport` backend and a mock
//! - `report`: run observer hooks and the console reporter
//! - `config`: TOML configuration, presets and environment overrides
//! - `error`: run-level error taxonomy
//! - `logging`: `tracing` subscriber setup

pub mod config;
pub mod error;
pub mod logging;
pub mod loopback;
pub mod port;
pub mod report;

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult, Profile};
pub use error::{LoopbackError, LoopbackResult};
pub use loopback::{Direction, LoopbackConfig, LoopbackVerifier, PortRole, RunSummary, Trial};
pub use port::{
    MockPortOpener, MockSerialPort, PortConfiguration, PortError, PortOpener, SerialPortAdapter,
    SyncSerialPort, SystemPortOpener,
};
pub use report::{ConsoleReporter, RunObserver};
