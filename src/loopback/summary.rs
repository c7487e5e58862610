//! Per-run counters and the throughput figures derived from them.

use super::trial::{Direction, Trial};
use serde_json::{json, Value};
use std::time::Duration;

/// Aggregate outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub trials_requested: u32,
    pub trials_run: u32,
    pub payload_size: usize,
    pub console_to_data_errors: u32,
    pub data_to_console_errors: u32,
    pub elapsed: Duration,
    /// The loop ended on a mismatch before reaching `trials_requested`.
    pub stopped_early: bool,
}

impl RunSummary {
    pub fn new(trials_requested: u32, payload_size: usize) -> Self {
        Self {
            trials_requested,
            trials_run: 0,
            payload_size,
            console_to_data_errors: 0,
            data_to_console_errors: 0,
            elapsed: Duration::ZERO,
            stopped_early: false,
        }
    }

    /// Count a finished trial. Returns whether it had any mismatch.
    pub fn record(&mut self, trial: &Trial) -> bool {
        self.trials_run += 1;
        let mut failed = false;
        if !trial.console_to_data_ok() {
            self.console_to_data_errors += 1;
            failed = true;
        }
        if !trial.data_to_console_ok() {
            self.data_to_console_errors += 1;
            failed = true;
        }
        failed
    }

    pub fn errors(&self, direction: Direction) -> u32 {
        match direction {
            Direction::ConsoleToData => self.console_to_data_errors,
            Direction::DataToConsole => self.data_to_console_errors,
        }
    }

    pub fn total_errors(&self) -> u32 {
        self.console_to_data_errors + self.data_to_console_errors
    }

    pub fn is_clean(&self) -> bool {
        self.total_errors() == 0
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn trials_per_second(&self) -> f64 {
        let secs = self.elapsed_secs();
        if self.trials_run == 0 || secs <= 0.0 {
            return 0.0;
        }
        f64::from(self.trials_run) / secs
    }

    pub fn millis_per_trial(&self) -> f64 {
        if self.trials_run == 0 {
            return 0.0;
        }
        self.elapsed_secs() * 1000.0 / f64::from(self.trials_run)
    }

    /// Payload bytes moved in one direction per second.
    pub fn bytes_per_second_one_way(&self) -> f64 {
        let secs = self.elapsed_secs();
        if secs <= 0.0 {
            return 0.0;
        }
        (self.payload_size as f64 * f64::from(self.trials_run)) / secs
    }

    pub fn kib_per_second_one_way(&self) -> f64 {
        self.bytes_per_second_one_way() / 1024.0
    }

    /// Both directions together.
    pub fn kib_per_second_total(&self) -> f64 {
        self.kib_per_second_one_way() * 2.0
    }

    pub fn to_json(&self) -> Value {
        json!({
            "trials_requested": self.trials_requested,
            "trials_run": self.trials_run,
            "payload_size": self.payload_size,
            "elapsed_secs": self.elapsed_secs(),
            "trials_per_second": self.trials_per_second(),
            "ms_per_trial": self.millis_per_trial(),
            "kib_per_second_one_way": self.kib_per_second_one_way(),
            "kib_per_second_total": self.kib_per_second_total(),
            "stopped_early": self.stopped_early,
            "errors": {
                "console_to_data": self.console_to_data_errors,
                "data_to_console": self.data_to_console_errors,
            },
        })
    }
}
