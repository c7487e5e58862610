//! The trial loop.
//!
//! Opens the data port then the console port, runs each trial in a fixed
//! write/read order and releases both handles on every exit path.

use super::summary::RunSummary;
use super::trial::{random_payload, Trial};
use super::{LoopbackConfig, PortRole};
use crate::error::{LoopbackError, LoopbackResult};
use crate::port::{read_up_to, write_all_bytes, PortConfiguration, PortOpener, SerialPortAdapter};
use crate::report::RunObserver;
use rand::rngs::OsRng;
use rand::RngCore;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// An open handle that is closed when it goes out of scope.
///
/// Every exit path of a run (normal end, early stop, fatal error, a second
/// port failing to open) releases the handles it acquired exactly once.
struct PortGuard {
    role: PortRole,
    port: Box<dyn SerialPortAdapter>,
}

impl PortGuard {
    fn open(
        opener: &mut dyn PortOpener,
        role: PortRole,
        path: &str,
        config: &PortConfiguration,
    ) -> LoopbackResult<Self> {
        let port = opener
            .open(path, config)
            .map_err(|source| LoopbackError::Setup {
                role,
                path: path.to_string(),
                source,
            })?;
        info!(%role, port = path, baud = config.baud_rate, "opened port");
        Ok(Self { role, port })
    }

    fn write(&mut self, trial: u32, data: &[u8]) -> LoopbackResult<()> {
        write_all_bytes(&mut *self.port, data).map_err(|source| LoopbackError::Write {
            role: self.role,
            trial,
            source,
        })
    }

    fn read(&mut self, trial: u32, len: usize, config: &LoopbackConfig) -> LoopbackResult<Vec<u8>> {
        read_up_to(&mut *self.port, len, config.read_timeout).map_err(|source| {
            LoopbackError::Read {
                role: self.role,
                trial,
                source,
            }
        })
    }
}

impl Drop for PortGuard {
    fn drop(&mut self) {
        match self.port.close() {
            Ok(()) => debug!(role = %self.role, port = self.port.name(), "released port"),
            Err(e) => warn!(role = %self.role, port = self.port.name(), error = %e, "failed to close port"),
        }
    }
}

/// Runs the write/read/compare loop over a data and a console port.
///
/// # Example
/// ```
/// use acm_loopback::loopback::{LoopbackConfig, LoopbackVerifier};
/// use acm_loopback::port::{MockPortOpener, MockSerialPort};
/// use std::time::Duration;
///
/// let (data, console) = MockSerialPort::crossed_pair("/dev/ttyACM0", "/dev/ttyACM1");
/// let mut opener = MockPortOpener::new().with_port(data).with_port(console);
///
/// let config = LoopbackConfig {
///     trial_count: 10,
///     payload_size: 16,
///     inter_trial_delay: Duration::ZERO,
///     ..LoopbackConfig::default()
/// };
///
/// let summary = LoopbackVerifier::new(config).run(&mut opener, &mut ())?;
/// assert_eq!(summary.trials_run, 10);
/// assert!(summary.is_clean());
/// # Ok::<(), acm_loopback::error::LoopbackError>(())
/// ```
pub struct LoopbackVerifier<R = OsRng> {
    config: LoopbackConfig,
    rng: R,
}

impl LoopbackVerifier<OsRng> {
    /// Verifier drawing payloads from the operating system's random source.
    pub fn new(config: LoopbackConfig) -> Self {
        Self::with_rng(config, OsRng)
    }
}

impl<R: RngCore> LoopbackVerifier<R> {
    pub fn with_rng(config: LoopbackConfig, rng: R) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &LoopbackConfig {
        &self.config
    }

    /// Open both ports, run the trials and report the summary.
    pub fn run(
        &mut self,
        opener: &mut dyn PortOpener,
        observer: &mut dyn RunObserver,
    ) -> LoopbackResult<RunSummary> {
        let port_config = self.config.port_configuration();

        let mut data = PortGuard::open(opener, PortRole::Data, &self.config.data_port, &port_config)?;
        let mut console =
            PortGuard::open(opener, PortRole::Console, &self.config.console_port, &port_config)?;

        if self.config.clear_on_open {
            for guard in [&mut data, &mut console] {
                guard.port.clear_buffers().map_err(|source| LoopbackError::Setup {
                    role: guard.role,
                    path: self.config.path(guard.role).to_string(),
                    source,
                })?;
            }
        }

        observer.on_start(&self.config)?;
        info!(
            trials = self.config.trial_count,
            payload_size = self.config.payload_size,
            stop_on_first_error = self.config.stop_on_first_error,
            "loopback run started"
        );

        let mut summary = RunSummary::new(self.config.trial_count, self.config.payload_size);
        let started = Instant::now();

        for index in 1..=self.config.trial_count {
            let trial = self.run_trial(index, &mut data, &mut console)?;
            let failed = summary.record(&trial);

            for mismatch in trial.mismatches() {
                warn!(
                    trial = index,
                    direction = %mismatch.direction,
                    expected_len = mismatch.expected().len(),
                    received_len = mismatch.received().len(),
                    first_difference = mismatch.first_difference(),
                    "loopback mismatch"
                );
                observer.on_mismatch(&mismatch)?;
            }

            if failed && self.config.stop_on_first_error {
                summary.stopped_early = index < self.config.trial_count;
                info!(trial = index, "stopping at first failing trial");
                break;
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            trials_run = summary.trials_run,
            console_to_data_errors = summary.console_to_data_errors,
            data_to_console_errors = summary.data_to_console_errors,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "loopback run finished"
        );
        observer.on_finish(&summary)?;

        Ok(summary)
    }

    /// Write data then console, read data then console. The order is fixed.
    fn run_trial(
        &mut self,
        index: u32,
        data: &mut PortGuard,
        console: &mut PortGuard,
    ) -> LoopbackResult<Trial> {
        if !self.config.inter_trial_delay.is_zero() {
            std::thread::sleep(self.config.inter_trial_delay);
        }

        let len = self.config.payload_size;
        let console_write = random_payload(&mut self.rng, len)?;
        let data_write = random_payload(&mut self.rng, len)?;

        data.write(index, &data_write)?;
        console.write(index, &console_write)?;

        let data_read = data.read(index, len, &self.config)?;
        let console_read = console.read(index, len, &self.config)?;

        trace!(
            trial = index,
            data_read = data_read.len(),
            console_read = console_read.len(),
            "trial complete"
        );

        Ok(Trial {
            index,
            console_write,
            data_write,
            data_read,
            console_read,
        })
    }
}
