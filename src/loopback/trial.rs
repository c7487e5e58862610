//! One generate-write-read round and the comparison of its buffers.

use rand::RngCore;
use std::fmt;

/// Direction of travel through the loopback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Written on the console port, read on the data port.
    ConsoleToData,
    /// Written on the data port, read on the console port.
    DataToConsole,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Self::ConsoleToData => "Console -> Data",
            Self::DataToConsole => "Data -> Console",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One generate-write-read round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    /// 1-based position in the run.
    pub index: u32,
    pub console_write: Vec<u8>,
    pub data_write: Vec<u8>,
    pub data_read: Vec<u8>,
    pub console_read: Vec<u8>,
}

impl Trial {
    /// `data_read` must equal what went into the console port.
    pub fn console_to_data_ok(&self) -> bool {
        self.data_read == self.console_write
    }

    /// `console_read` must equal what went into the data port.
    pub fn data_to_console_ok(&self) -> bool {
        self.console_read == self.data_write
    }

    pub fn has_mismatch(&self) -> bool {
        !self.console_to_data_ok() || !self.data_to_console_ok()
    }

    /// Failed directions in check order (console -> data first).
    pub fn mismatches(&self) -> Vec<Mismatch<'_>> {
        let mut out = Vec::with_capacity(2);
        if !self.console_to_data_ok() {
            out.push(Mismatch {
                trial: self,
                direction: Direction::ConsoleToData,
            });
        }
        if !self.data_to_console_ok() {
            out.push(Mismatch {
                trial: self,
                direction: Direction::DataToConsole,
            });
        }
        out
    }
}

/// A failed direction of a trial, with every buffer for post-mortem.
#[derive(Debug, Clone, Copy)]
pub struct Mismatch<'a> {
    pub trial: &'a Trial,
    pub direction: Direction,
}

impl<'a> Mismatch<'a> {
    /// What should have arrived.
    pub fn expected(&self) -> &'a [u8] {
        match self.direction {
            Direction::ConsoleToData => &self.trial.console_write,
            Direction::DataToConsole => &self.trial.data_write,
        }
    }

    /// What did arrive.
    pub fn received(&self) -> &'a [u8] {
        match self.direction {
            Direction::ConsoleToData => &self.trial.data_read,
            Direction::DataToConsole => &self.trial.console_read,
        }
    }

    /// Offset of the first differing byte, or the shorter length when one
    /// buffer is a prefix of the other.
    pub fn first_difference(&self) -> usize {
        let (expected, received) = (self.expected(), self.received());
        expected
            .iter()
            .zip(received)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| expected.len().min(received.len()))
    }

    /// The four labelled buffers, failing direction first.
    pub fn dump(&self) -> [(&'static str, &'a [u8]); 4] {
        let t = self.trial;
        match self.direction {
            Direction::ConsoleToData => [
                ("Written Console", t.console_write.as_slice()),
                ("Read Data", t.data_read.as_slice()),
                ("Written Data", t.data_write.as_slice()),
                ("Read Console", t.console_read.as_slice()),
            ],
            Direction::DataToConsole => [
                ("Written Data", t.data_write.as_slice()),
                ("Read Console", t.console_read.as_slice()),
                ("Written Console", t.console_write.as_slice()),
                ("Read Data", t.data_read.as_slice()),
            ],
        }
    }
}

/// Fill a fresh buffer of `len` bytes from `rng`.
pub fn random_payload<R: RngCore + ?Sized>(rng: &mut R, len: usize) -> Result<Vec<u8>, rand::Error> {
    let mut payload = vec![0u8; len];
    rng.try_fill_bytes(&mut payload)?;
    Ok(payload)
}
