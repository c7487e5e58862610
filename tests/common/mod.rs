//! Shared test utilities for loopback tests.
//!
//! This module provides common test infrastructure including:
//! - A crossed mock port pair wired into a `MockPortOpener`
//! - Deterministic verifier construction
//! - A recording `RunObserver`

#![allow(dead_code)]

use acm_loopback::loopback::{Direction, LoopbackConfig, LoopbackVerifier, Mismatch, RunSummary};
use acm_loopback::port::{MockPortOpener, MockSerialPort};
use acm_loopback::report::RunObserver;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::time::Duration;

pub const DATA: &str = "/dev/mock-acm0";
pub const CONSOLE: &str = "/dev/mock-acm1";

/// Two cross-linked mock ports plus an opener that hands them out.
pub struct LoopbackRig {
    pub data: MockSerialPort,
    pub console: MockSerialPort,
    pub opener: MockPortOpener,
}

impl LoopbackRig {
    pub fn new() -> Self {
        let (data, console) = MockSerialPort::crossed_pair(DATA, CONSOLE);
        let opener = MockPortOpener::new()
            .with_port(data.clone())
            .with_port(console.clone());
        Self {
            data,
            console,
            opener,
        }
    }

    /// Run with a fixed seed and a recording observer.
    pub fn run(
        &mut self,
        config: LoopbackConfig,
    ) -> (acm_loopback::LoopbackResult<RunSummary>, RecordingObserver) {
        let mut observer = RecordingObserver::default();
        let result = verifier(config).run(&mut self.opener, &mut observer);
        (result, observer)
    }

    pub fn assert_released_once(&self) {
        assert_eq!(self.data.close_count(), 1, "data port close count");
        assert_eq!(self.console.close_count(), 1, "console port close count");
    }
}

/// Config pointing at the rig's ports, with no pacing delay.
pub fn fast_config(trials: u32, payload_size: usize) -> LoopbackConfig {
    LoopbackConfig {
        data_port: DATA.to_string(),
        console_port: CONSOLE.to_string(),
        trial_count: trials,
        payload_size,
        inter_trial_delay: Duration::ZERO,
        read_timeout: Duration::from_millis(5),
        ..LoopbackConfig::default()
    }
}

pub fn verifier(config: LoopbackConfig) -> LoopbackVerifier<StdRng> {
    LoopbackVerifier::with_rng(config, StdRng::seed_from_u64(0x5EED))
}

/// One observed mismatch, copied out of the trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenMismatch {
    pub trial: u32,
    pub direction: Direction,
    pub expected: Vec<u8>,
    pub received: Vec<u8>,
}

/// Observer that keeps every callback for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub started: usize,
    pub mismatches: Vec<SeenMismatch>,
    pub finished: Vec<RunSummary>,
}

impl RunObserver for RecordingObserver {
    fn on_start(&mut self, _config: &LoopbackConfig) -> io::Result<()> {
        self.started += 1;
        Ok(())
    }

    fn on_mismatch(&mut self, mismatch: &Mismatch<'_>) -> io::Result<()> {
        self.mismatches.push(SeenMismatch {
            trial: mismatch.trial.index,
            direction: mismatch.direction,
            expected: mismatch.expected().to_vec(),
            received: mismatch.received().to_vec(),
        });
        Ok(())
    }

    fn on_finish(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.finished.push(summary.clone());
        Ok(())
    }
}
