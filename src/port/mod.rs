//! Port abstraction layer for serial communication.
//!
//! Provides the `SerialPortAdapter` trait with a real `serialport`-backed
//! implementation and an in-memory mock, so the loopback verifier can be
//! driven by hardware or by tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{DeliveryFault, MockPortOpener, MockSerialPort};
pub use sync_port::*;
pub use traits::*;
