//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates serial port behavior without
//! requiring actual hardware. Two mocks can be cross-linked so that whatever
//! one side writes becomes readable on the other, which is exactly what a
//! dual CDC-ACM device with crossed endpoints does. Deliveries can be
//! scripted to arrive corrupted, truncated or not at all.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// A scripted fault applied to one delivery into a port's read queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFault {
    /// Flip every bit of the byte at this offset (ignored when out of range).
    CorruptByte(usize),
    /// Deliver only the first `n` bytes.
    Truncate(usize),
    /// Deliver nothing.
    Drop,
}

/// Inner state of the mock port, protected by a mutex for interior mutability.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Whether the next read/write should time out.
    should_timeout: bool,
    /// Error kind the next write fails with.
    write_failure: Option<std::io::ErrorKind>,
    /// Error kind every read fails with.
    read_failure: Option<std::io::ErrorKind>,
    /// Configured timeout duration.
    timeout: Duration,
    /// Upper bound on bytes returned by one read call.
    max_chunk: Option<usize>,
    /// Whether buffers have been cleared.
    buffers_cleared: bool,
    /// Port receiving everything written here.
    peer: Option<Weak<Mutex<MockPortState>>>,
    /// Number of deliveries received from the peer (or `deliver`).
    deliveries: usize,
    /// Faults keyed by 1-based delivery number.
    faults: HashMap<usize, DeliveryFault>,
    /// Whether the handle is closed.
    closed: bool,
    /// Number of effective `close` calls.
    close_count: usize,
    /// Number of times an opener handed this port out.
    open_count: usize,
}

impl MockPortState {
    fn deliver(&mut self, data: &[u8]) {
        self.deliveries += 1;
        match self.faults.remove(&self.deliveries) {
            None => self.read_queue.extend(data),
            Some(DeliveryFault::CorruptByte(index)) => {
                let mut data = data.to_vec();
                if let Some(byte) = data.get_mut(index) {
                    *byte = !*byte;
                }
                self.read_queue.extend(data);
            }
            Some(DeliveryFault::Truncate(n)) => {
                self.read_queue.extend(&data[..n.min(data.len())]);
            }
            Some(DeliveryFault::Drop) => {}
        }
    }
}

/// Mock serial port implementation for testing.
///
/// This implementation allows you to:
/// - Enqueue data to be returned by read operations
/// - Inspect what data was written
/// - Cross-link two ports into a loopback
/// - Simulate timeouts, corrupted deliveries and hard failures
///
/// # Example
/// ```
/// use acm_loopback::port::{MockSerialPort, SerialPortAdapter};
///
/// let (mut data, mut console) = MockSerialPort::crossed_pair("DATA", "CONSOLE");
///
/// data.write_bytes(b"ping").unwrap();
///
/// let mut buffer = [0u8; 4];
/// let n = console.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"ping");
/// assert_eq!(data.get_write_log(), vec![b"ping".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, shared between clones.
    state: Arc<Mutex<MockPortState>>,
    /// Operation journal, shared with the peer of a crossed pair.
    journal: Arc<Mutex<Vec<String>>>,
}

impl MockSerialPort {
    /// Create a new, unlinked mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                timeout: Duration::from_secs(1),
                ..Default::default()
            })),
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create two ports whose writes land in each other's read queue.
    pub fn crossed_pair(a: impl Into<String>, b: impl Into<String>) -> (Self, Self) {
        let a = Self::new(a);
        let mut b = Self::new(b);
        b.journal = Arc::clone(&a.journal);
        a.lock().peer = Some(Arc::downgrade(&b.state));
        b.lock().peer = Some(Arc::downgrade(&a.state));
        (a, b)
    }

    fn lock(&self) -> MutexGuard<'_, MockPortState> {
        // A poisoned mock only happens after a panicking test; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn note(&self, op: &str) {
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{} {}", self.name, op));
    }

    /// Writes and read calls seen by this port (and its peer), in order.
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.lock().read_queue.extend(data);
    }

    /// Deliver bytes as if the peer had written them (faults apply).
    pub fn deliver(&mut self, data: &[u8]) {
        self.lock().deliver(data);
    }

    /// Apply `fault` to the `nth` (1-based) delivery into this port.
    pub fn inject_fault(&mut self, nth: usize, fault: DeliveryFault) {
        self.lock().faults.insert(nth, fault);
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.lock().write_log.clone()
    }

    /// Set whether the next read/write operation should time out.
    pub fn set_should_timeout(&mut self, should_timeout: bool) {
        self.lock().should_timeout = should_timeout;
    }

    /// Make the next write fail with an I/O error of this kind.
    pub fn fail_next_write(&mut self, kind: std::io::ErrorKind) {
        self.lock().write_failure = Some(kind);
    }

    /// Make every read fail with an I/O error of this kind.
    pub fn fail_reads(&mut self, kind: std::io::ErrorKind) {
        self.lock().read_failure = Some(kind);
    }

    /// Limit how many bytes a single read call may return.
    pub fn set_max_chunk(&mut self, max_chunk: usize) {
        self.lock().max_chunk = Some(max_chunk.max(1));
    }

    /// Get whether buffers have been cleared.
    pub fn was_cleared(&self) -> bool {
        self.lock().buffers_cleared
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.lock().read_queue.len()
    }

    /// Number of deliveries this port has received.
    pub fn deliveries(&self) -> usize {
        self.lock().deliveries
    }

    /// Read timeout last applied through `set_timeout` or the opener.
    pub fn current_timeout(&self) -> Duration {
        self.lock().timeout
    }

    /// Whether the handle has been closed.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// How many times the handle was actually closed.
    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }

    /// How many times an opener handed this port out.
    pub fn open_count(&self) -> usize {
        self.lock().open_count
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let peer = {
            let mut state = self.lock();
            if state.closed {
                return Err(PortError::NotOpen);
            }
            if state.should_timeout {
                state.should_timeout = false;
                return Err(PortError::timeout(state.timeout));
            }
            if let Some(kind) = state.write_failure.take() {
                return Err(PortError::Io(std::io::Error::new(
                    kind,
                    "simulated write failure",
                )));
            }
            state.write_log.push(data.to_vec());
            state.peer.as_ref().and_then(Weak::upgrade)
        };
        self.note("write");

        if let Some(peer) = peer {
            peer.lock().unwrap_or_else(|e| e.into_inner()).deliver(data);
        }

        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        if self.is_closed() {
            return Err(PortError::NotOpen);
        }
        self.note("read");

        let mut state = self.lock();
        if state.should_timeout {
            state.should_timeout = false;
            return Err(PortError::timeout(state.timeout));
        }
        if let Some(kind) = state.read_failure {
            return Err(PortError::Io(std::io::Error::new(
                kind,
                "simulated read failure",
            )));
        }

        let limit = state.max_chunk.unwrap_or(buffer.len()).min(buffer.len());
        let mut bytes_read = 0;
        for byte in buffer[..limit].iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 && limit > 0 {
            // Nothing buffered: behave like a read that ran into its timeout.
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.lock().timeout = timeout;
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.lock();
        if state.closed {
            return Err(PortError::NotOpen);
        }
        state.read_queue.clear();
        state.buffers_cleared = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), PortError> {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            state.close_count += 1;
        }
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Hands out registered mock ports by path.
///
/// Unknown paths fail with [`PortError::NotFound`]; paths registered through
/// [`MockPortOpener::deny`] fail like a busy or permission-protected device.
#[derive(Debug, Default)]
pub struct MockPortOpener {
    ports: HashMap<String, MockSerialPort>,
    denied: HashMap<String, std::io::ErrorKind>,
    /// Configurations seen by `open`, in call order.
    pub opened_with: Vec<(String, PortConfiguration)>,
}

impl MockPortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a port under its own name.
    pub fn with_port(mut self, port: MockSerialPort) -> Self {
        self.ports.insert(port.name.clone(), port);
        self
    }

    /// Make opening `path` fail with an I/O error of this kind.
    pub fn deny(mut self, path: impl Into<String>, kind: std::io::ErrorKind) -> Self {
        self.denied.insert(path.into(), kind);
        self
    }
}

impl PortOpener for MockPortOpener {
    fn open(
        &mut self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        self.opened_with.push((path.to_string(), config.clone()));

        if let Some(kind) = self.denied.get(path) {
            return Err(PortError::Io(std::io::Error::new(
                *kind,
                format!("cannot open {path}"),
            )));
        }

        let port = self
            .ports
            .get(path)
            .ok_or_else(|| PortError::not_found(path))?;
        {
            let mut state = port.lock();
            state.open_count += 1;
            state.closed = false;
            state.timeout = config.timeout;
        }
        Ok(Box::new(port.clone()))
    }
}
