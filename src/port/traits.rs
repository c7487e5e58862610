//! Core traits for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait that allows both real serial ports
//! and mock implementations to be used interchangeably, plus the
//! `PortOpener` seam the verifier uses to acquire its two handles.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Configuration parameters for a serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Read timeout.
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: Duration::from_secs(1),
        }
    }
}

impl PortConfiguration {
    /// 8N1 without flow control at the given baud rate and read timeout.
    pub fn new(baud_rate: u32, timeout: Duration) -> Self {
        Self {
            baud_rate,
            timeout,
            ..Self::default()
        }
    }
}

/// Number of data bits per character. Written as a bare integer in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(Self::Five),
            6 => Ok(Self::Six),
            7 => Ok(Self::Seven),
            8 => Ok(Self::Eight),
            other => Err(format!("unsupported data bits {other} (expected 5-8)")),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl FromStr for DataBits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid data bits '{s}'"))?;
        Self::try_from(bits)
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl FromStr for FlowControl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "software" | "xonxoff" => Ok(Self::Software),
            "hardware" | "rtscts" => Ok(Self::Hardware),
            other => Err(format!(
                "unknown flow control '{other}' (expected none, software or hardware)"
            )),
        }
    }
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            other => Err(format!("unknown parity '{other}' (expected none, odd or even)")),
        }
    }
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits. Written as a bare integer in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    One,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(format!("unsupported stop bits {other} (expected 1 or 2)")),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl FromStr for StopBits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid stop bits '{s}'"))?;
        Self::try_from(bits)
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Trait for serial port I/O operations.
///
/// This trait abstracts over synchronous serial port operations, allowing both
/// real hardware ports and mock implementations for testing.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Set the read timeout for this port.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError>;

    /// Clear both input and output buffers.
    ///
    /// This discards any unread data in the receive buffer and any unsent
    /// data in the transmit buffer.
    fn clear_buffers(&mut self) -> Result<(), PortError>;

    /// Release the underlying device handle.
    ///
    /// Every operation after a close fails with [`PortError::NotOpen`];
    /// closing twice is a no-op.
    fn close(&mut self) -> Result<(), PortError>;
}

/// Source of open port handles, keyed by device path.
pub trait PortOpener {
    /// Open the device at `path` with the given configuration.
    fn open(
        &mut self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}

/// Read until `len` bytes arrived or the port stops delivering.
///
/// Mirrors a "read n bytes with timeout" call: partial reads are stitched
/// together, and a timeout (or `timeout` elapsing overall) ends the read with
/// whatever arrived so far. Only non-timeout failures are returned as errors.
///
/// Each underlying read is given only the time left before the deadline, so a
/// device trickling bytes cannot stretch the call past `timeout`. The port's
/// timeout is set back to `timeout` before returning.
pub fn read_up_to(
    port: &mut dyn SerialPortAdapter,
    len: usize,
    timeout: Duration,
) -> Result<Vec<u8>, PortError> {
    let mut buffer = vec![0u8; len];
    let mut filled = 0;
    let deadline = Instant::now() + timeout;
    let mut failure = None;

    while filled < len {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        port.set_timeout(remaining)?;

        match port.read_bytes(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.is_timeout() => break,
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let restored = port.set_timeout(timeout);
    if let Some(e) = failure {
        return Err(e);
    }
    restored?;

    buffer.truncate(filled);
    Ok(buffer)
}

/// Write every byte of `data`, looping over partial writes.
pub fn write_all_bytes(port: &mut dyn SerialPortAdapter, data: &[u8]) -> Result<(), PortError> {
    let mut written = 0;
    while written < data.len() {
        match port.write_bytes(&data[written..])? {
            0 => {
                return Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    format!("{} accepted no bytes", port.name()),
                )))
            }
            n => written += n,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockSerialPort;

    #[test]
    fn test_default_configuration() {
        let config = PortConfiguration::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.flow_control, FlowControl::None);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_new_keeps_8n1() {
        let config = PortConfiguration::new(9600, Duration::from_millis(250));
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
    }

    #[test]
    fn test_enum_conversions() {
        let bits: serialport::DataBits = DataBits::Eight.into();
        assert_eq!(bits, serialport::DataBits::Eight);
        let flow: serialport::FlowControl = FlowControl::Hardware.into();
        assert_eq!(flow, serialport::FlowControl::Hardware);
        let parity: serialport::Parity = Parity::Even.into();
        assert_eq!(parity, serialport::Parity::Even);
        let stop: serialport::StopBits = StopBits::Two.into();
        assert_eq!(stop, serialport::StopBits::Two);
    }

    #[test]
    fn test_framing_parses_from_text() {
        assert_eq!("7".parse::<DataBits>().unwrap(), DataBits::Seven);
        assert!("9".parse::<DataBits>().is_err());
        assert_eq!("Even".parse::<Parity>().unwrap(), Parity::Even);
        assert_eq!("2".parse::<StopBits>().unwrap(), StopBits::Two);
        assert!("3".parse::<StopBits>().is_err());
        assert_eq!("rtscts".parse::<FlowControl>().unwrap(), FlowControl::Hardware);
        assert_eq!(u8::from(DataBits::Six), 6);
    }

    #[test]
    fn test_read_up_to_stitches_chunks() {
        let mut port = MockSerialPort::new("MOCK0");
        port.set_max_chunk(3);
        port.enqueue_read(b"abcdefgh");

        let data = read_up_to(&mut port, 8, Duration::from_secs(1)).unwrap();
        assert_eq!(data, b"abcdefgh");
    }

    #[test]
    fn test_read_up_to_returns_short_on_starvation() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"abc");

        let data = read_up_to(&mut port, 10, Duration::from_secs(1)).unwrap();
        assert_eq!(data, b"abc");

        let empty = read_up_to(&mut port, 10, Duration::from_secs(1)).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_read_up_to_leaves_surplus_queued() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"0123456789");

        let data = read_up_to(&mut port, 4, Duration::from_secs(1)).unwrap();
        assert_eq!(data, b"0123");
        assert_eq!(port.available_bytes(), 6);
    }

    #[test]
    fn test_read_up_to_propagates_hard_errors() {
        let mut port = MockSerialPort::new("MOCK0");
        port.close().unwrap();

        let result = read_up_to(&mut port, 4, Duration::from_secs(1));
        assert!(matches!(result, Err(PortError::NotOpen)));
    }

    /// Hands out one byte per `interval`, honouring its read timeout the way
    /// a real tty does.
    #[derive(Debug)]
    struct TricklePort {
        interval: Duration,
        timeout: Duration,
        timeouts_seen: Vec<Duration>,
    }

    impl TricklePort {
        fn new(interval: Duration) -> Self {
            Self {
                interval,
                timeout: Duration::from_secs(1),
                timeouts_seen: Vec::new(),
            }
        }
    }

    impl SerialPortAdapter for TricklePort {
        fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
            Ok(data.len())
        }

        fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
            if self.timeout < self.interval {
                std::thread::sleep(self.timeout);
                return Err(PortError::timeout(self.timeout));
            }
            std::thread::sleep(self.interval);
            buffer[0] = 0xA5;
            Ok(1)
        }

        fn name(&self) -> &str {
            "TRICKLE"
        }

        fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
            self.timeout = timeout;
            self.timeouts_seen.push(timeout);
            Ok(())
        }

        fn clear_buffers(&mut self) -> Result<(), PortError> {
            Ok(())
        }

        fn close(&mut self) -> Result<(), PortError> {
            Ok(())
        }
    }

    #[test]
    fn test_read_up_to_bounds_total_wait() {
        let mut port = TricklePort::new(Duration::from_millis(90));
        let timeout = Duration::from_millis(100);

        let started = Instant::now();
        let data = read_up_to(&mut port, 10, timeout).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(data, vec![0xA5]);
        assert!(
            elapsed < Duration::from_millis(180),
            "read took {elapsed:?} with a {timeout:?} timeout"
        );
        // Follow-up reads only got what was left of the budget; the last entry
        // is the restore.
        let (restore, per_read) = port.timeouts_seen.split_last().unwrap();
        assert!(per_read[0] <= timeout);
        assert!(per_read[1..].iter().all(|t| *t <= Duration::from_millis(10)));
        assert_eq!(*restore, timeout);
    }

    #[test]
    fn test_read_up_to_restores_timeout_after_hard_error() {
        let mut port = MockSerialPort::new("MOCK0");
        port.fail_reads(std::io::ErrorKind::BrokenPipe);

        let result = read_up_to(&mut port, 4, Duration::from_millis(250));
        assert!(matches!(result, Err(PortError::Io(_))));
        assert_eq!(port.current_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_write_all_bytes_logs_payload() {
        let mut port = MockSerialPort::new("MOCK0");
        write_all_bytes(&mut port, b"payload").unwrap();
        assert_eq!(port.get_write_log(), vec![b"payload".to_vec()]);
    }
}
