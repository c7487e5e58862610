//! Human-readable run output.
//!
//! The verifier pushes progress through [`RunObserver`]; [`ConsoleReporter`]
//! renders it as line-oriented text (or a JSON summary) on any writer.

use crate::loopback::{LoopbackConfig, Mismatch, RunSummary};
use std::fmt::Write as _;
use std::io::{self, Write};

/// Receives run progress. Every hook defaults to doing nothing.
pub trait RunObserver {
    fn on_start(&mut self, _config: &LoopbackConfig) -> io::Result<()> {
        Ok(())
    }

    fn on_mismatch(&mut self, _mismatch: &Mismatch<'_>) -> io::Result<()> {
        Ok(())
    }

    fn on_finish(&mut self, _summary: &RunSummary) -> io::Result<()> {
        Ok(())
    }
}

/// Silent observer.
impl RunObserver for () {}

/// Lowercase hex, or `<empty>` for a zero-length buffer.
pub fn hex(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "<empty>".to_string();
    }
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Writes the start banner, mismatch dumps and summary block.
pub struct ConsoleReporter<W: Write> {
    out: W,
    json_summary: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            json_summary: false,
        }
    }

    /// Emit the final summary as a single JSON object instead of text.
    pub fn with_json_summary(mut self, json_summary: bool) -> Self {
        self.json_summary = json_summary;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RunObserver for ConsoleReporter<W> {
    fn on_start(&mut self, config: &LoopbackConfig) -> io::Result<()> {
        if self.json_summary {
            return Ok(());
        }
        writeln!(
            self.out,
            "Testing started.... ({} trials of {} bytes, data={} console={} @ {} baud)",
            config.trial_count,
            config.payload_size,
            config.data_port,
            config.console_port,
            config.baud_rate
        )?;
        self.out.flush()
    }

    fn on_mismatch(&mut self, mismatch: &Mismatch<'_>) -> io::Result<()> {
        if self.json_summary {
            return Ok(());
        }
        writeln!(
            self.out,
            "\t{} error (trial {}, first difference at byte {})",
            mismatch.direction,
            mismatch.trial.index,
            mismatch.first_difference()
        )?;
        for (label, bytes) in mismatch.dump() {
            writeln!(self.out, "\t\t{} ({} bytes): {}", label, bytes.len(), hex(bytes))?;
        }
        Ok(())
    }

    fn on_finish(&mut self, summary: &RunSummary) -> io::Result<()> {
        if self.json_summary {
            serde_json::to_writer(&mut self.out, &summary.to_json())?;
            writeln!(self.out)?;
            return self.out.flush();
        }

        writeln!(
            self.out,
            "Testing complete of {} tests of {} bytes in {:.3} seconds!",
            summary.trials_run,
            summary.payload_size,
            summary.elapsed_secs()
        )?;
        if summary.stopped_early {
            writeln!(
                self.out,
                "Stopped at the first failing trial ({} of {} requested)",
                summary.trials_run, summary.trials_requested
            )?;
        }
        writeln!(
            self.out,
            "{:.1} writes/reads per second, {:.3} ms per write/read",
            summary.trials_per_second(),
            summary.millis_per_trial()
        )?;
        writeln!(
            self.out,
            "{:.2} KiB/s per direction, {:.2} KiB/s total (Console<->Data)",
            summary.kib_per_second_one_way(),
            summary.kib_per_second_total()
        )?;
        writeln!(self.out, "Errors:")?;
        writeln!(self.out, "\tConsole -> Data: {}", summary.console_to_data_errors)?;
        writeln!(self.out, "\tData -> Console: {}", summary.data_to_console_errors)?;
        self.out.flush()
    }
}
