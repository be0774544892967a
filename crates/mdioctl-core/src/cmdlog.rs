//! In-memory command log
//!
//! Every successful register read or write passing through a
//! [`Driver`](crate::driver::Driver) can be recorded here. The log is
//! owned by the driver handle and is off by default; it keeps at most
//! `capacity` entries and drops the oldest one when full.

use std::collections::VecDeque;
use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Default number of entries kept
pub const DEFAULT_CAPACITY: usize = 4096;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Time elapsed since the process epoch
///
/// The epoch is fixed the first time any log asks for it.
pub fn since_epoch() -> Duration {
    EPOCH.get_or_init(Instant::now).elapsed()
}

/// Kind of a logged register operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Read,
    Write,
}

impl CommandKind {
    /// Lowercase name as shown in the log
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Read => "read",
            CommandKind::Write => "write",
        }
    }
}

/// One logged register operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedCommand {
    /// Time since the process epoch
    pub timestamp: Duration,
    pub kind: CommandKind,
    pub phy: u8,
    /// Clause-45 device type, `None` for clause-22 access
    pub dev: Option<u8>,
    pub reg: u16,
    pub value: u16,
}

impl LoggedCommand {
    /// Create an entry stamped with the current time
    pub fn now(kind: CommandKind, phy: u8, reg: u16, value: u16) -> Self {
        Self {
            timestamp: since_epoch(),
            kind,
            phy,
            dev: None,
            reg,
            value,
        }
    }

    /// Create a clause-45 entry stamped with the current time
    pub fn now_c45(kind: CommandKind, phy: u8, dev: u8, reg: u16, value: u16) -> Self {
        Self {
            dev: Some(dev),
            ..Self::now(kind, phy, reg, value)
        }
    }

    /// Operand string, `phy=0x.. reg=0x.... val=0x....`
    pub fn args(&self) -> String {
        match self.dev {
            Some(dev) => format!(
                "phy=0x{:02x} dev=0x{:02x} reg=0x{:04x} val=0x{:04x}",
                self.phy, dev, self.reg, self.value
            ),
            None => format!(
                "phy=0x{:02x} reg=0x{:04x} val=0x{:04x}",
                self.phy, self.reg, self.value
            ),
        }
    }
}

impl fmt::Display for LoggedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.9}: {}, {}",
            self.timestamp.as_secs_f64(),
            self.kind.name(),
            self.args()
        )
    }
}

/// Bounded, switchable command log
#[derive(Debug)]
pub struct CommandLog {
    enabled: bool,
    capacity: usize,
    entries: VecDeque<LoggedCommand>,
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl CommandLog {
    /// Create a disabled log holding at most `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        let _ = since_epoch();
        Self {
            enabled: false,
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Turn recording on or off
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record an entry if the log is enabled
    pub fn record(&mut self, command: LoggedCommand) {
        if !self.enabled {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(command);
    }

    /// Iterate over the recorded entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &LoggedCommand> {
        self.entries.iter()
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Take all entries out of the log
    pub fn drain(&mut self) -> Vec<LoggedCommand> {
        self.entries.drain(..).collect()
    }
}
