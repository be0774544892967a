//! Driver handle
//!
//! [`Driver`] owns one [`MdioBus`], tracks whether it is open and records
//! successful register operations into its [`CommandLog`].

use super::traits::{BusFeatures, MdioBus};
use crate::cmdlog::{CommandKind, CommandLog, LoggedCommand};
use crate::error::{Result, TransportError};

/// Highest clause-22 phy address
pub const MAX_PHY: u8 = 0x1f;
/// Highest clause-22 register number
pub const MAX_REG: u16 = 0x1f;

/// Reject addresses that do not fit the 5-bit clause-22 fields
fn check_clause22(phy: u8, reg: u16) -> Result<()> {
    if phy > MAX_PHY {
        return Err(TransportError::InvalidParameter(format!(
            "phy 0x{:02x} out of range (max 0x{:02x})",
            phy, MAX_PHY
        ))
        .into());
    }
    if reg > MAX_REG {
        return Err(TransportError::InvalidParameter(format!(
            "register 0x{:02x} out of range (max 0x{:02x})",
            reg, MAX_REG
        ))
        .into());
    }
    Ok(())
}

/// Open/closed state of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Closed,
    Open,
}

/// Handle to an MDIO transport
///
/// Register access is only allowed while the handle is open. The handle
/// is not meant to be shared between threads; callers serialize access.
pub struct Driver {
    bus: Box<dyn MdioBus>,
    state: DriverState,
    log: CommandLog,
}

impl Driver {
    /// Wrap a bus in a closed handle with a default (disabled) log
    pub fn new(bus: Box<dyn MdioBus>) -> Self {
        Self::with_log(bus, CommandLog::default())
    }

    /// Wrap a bus with a caller-supplied command log
    pub fn with_log(bus: Box<dyn MdioBus>, log: CommandLog) -> Self {
        Self {
            bus,
            state: DriverState::Closed,
            log,
        }
    }

    /// Transport name
    pub fn name(&self) -> &'static str {
        self.bus.name()
    }

    pub fn features(&self) -> BusFeatures {
        self.bus.features()
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == DriverState::Open
    }

    /// Open the transport
    ///
    /// A failed open leaves the handle closed.
    pub fn open(&mut self) -> Result<()> {
        if self.is_open() {
            log::debug!("{}: already open", self.name());
            return Ok(());
        }

        log::debug!("{}: opening", self.name());
        if let Err(e) = self.bus.open() {
            if let Err(close_err) = self.bus.close() {
                log::debug!("{}: cleanup after failed open: {}", self.name(), close_err);
            }
            return Err(e);
        }

        self.state = DriverState::Open;
        Ok(())
    }

    /// Close the transport
    ///
    /// Always leaves the handle closed, even when the bus reports an error.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_open() {
            return Ok(());
        }
        self.state = DriverState::Closed;
        log::debug!("{}: closing", self.name());
        self.bus.close()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(TransportError::NotOpen.into())
        }
    }

    /// Clause-22 register read
    pub fn read(&mut self, phy: u8, reg: u16) -> Result<u16> {
        self.ensure_open()?;
        check_clause22(phy, reg)?;
        let value = self.bus.read(phy, reg)?;
        self.log
            .record(LoggedCommand::now(CommandKind::Read, phy, reg, value));
        Ok(value)
    }

    /// Clause-22 register write
    pub fn write(&mut self, phy: u8, reg: u16, value: u16) -> Result<()> {
        self.ensure_open()?;
        check_clause22(phy, reg)?;
        self.bus.write(phy, reg, value)?;
        self.log
            .record(LoggedCommand::now(CommandKind::Write, phy, reg, value));
        Ok(())
    }

    /// Clause-45 register read
    pub fn read_c45(&mut self, phy: u8, dev: u8, reg: u16) -> Result<u16> {
        self.ensure_open()?;
        let value = self.bus.read_c45(phy, dev, reg)?;
        self.log.record(LoggedCommand::now_c45(
            CommandKind::Read,
            phy,
            dev,
            reg,
            value,
        ));
        Ok(value)
    }

    /// Clause-45 register write
    pub fn write_c45(&mut self, phy: u8, dev: u8, reg: u16, value: u16) -> Result<()> {
        self.ensure_open()?;
        self.bus.write_c45(phy, dev, reg, value)?;
        self.log.record(LoggedCommand::now_c45(
            CommandKind::Write,
            phy,
            dev,
            reg,
            value,
        ));
        Ok(())
    }

    /// Select the active chip-select line (`dev_sel`)
    pub fn select_device(&mut self, index: u8) -> Result<()> {
        self.ensure_open()?;
        self.bus.select_device(index)
    }

    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut CommandLog {
        &mut self.log
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close {} on drop: {}", self.name(), e);
        }
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("bus", &self.bus.name())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;

    /// Minimal in-memory bus for core tests
    #[derive(Default)]
    pub(crate) struct MemoryBus {
        pub regs: HashMap<(u8, u16), u16>,
        pub fail_open: bool,
        pub fail_reads: bool,
    }

    impl MdioBus for MemoryBus {
        fn name(&self) -> &'static str {
            "memory"
        }

        fn open(&mut self) -> Result<()> {
            if self.fail_open {
                return Err(TransportError::DeviceNotFound("memory".into()).into());
            }
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn read(&mut self, phy: u8, reg: u16) -> Result<u16> {
            if self.fail_reads {
                return Err(TransportError::ReadTimeout {
                    expected: 2,
                    received: 0,
                }
                .into());
            }
            Ok(self.regs.get(&(phy, reg)).copied().unwrap_or(0))
        }

        fn write(&mut self, phy: u8, reg: u16, value: u16) -> Result<()> {
            self.regs.insert((phy, reg), value);
            Ok(())
        }
    }

    #[test]
    fn test_read_while_closed_fails() {
        let mut driver = Driver::new(Box::new(MemoryBus::default()));
        assert!(matches!(
            driver.read(0, 0),
            Err(Error::Transport(TransportError::NotOpen))
        ));
        assert!(driver.write(0, 0, 1).is_err());
    }

    #[test]
    fn test_failed_open_stays_closed() {
        let bus = MemoryBus {
            fail_open: true,
            ..Default::default()
        };
        let mut driver = Driver::new(Box::new(bus));
        assert!(driver.open().is_err());
        assert_eq!(driver.state(), DriverState::Closed);
        assert!(driver.close().is_ok());
    }

    #[test]
    fn test_commands_are_logged() {
        let mut driver = Driver::new(Box::new(MemoryBus::default()));
        driver.log_mut().set_enabled(true);
        driver.open().unwrap();
        driver.write(0x1a, 3, 0x55).unwrap();
        assert_eq!(driver.read(0x1a, 3).unwrap(), 0x55);

        let entries = driver.log_mut().drain();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, CommandKind::Write);
        assert_eq!(entries[1].kind, CommandKind::Read);
        assert_eq!(entries[1].value, 0x55);
    }

    #[test]
    fn test_clause22_address_out_of_range() {
        let mut driver = Driver::new(Box::new(MemoryBus::default()));
        driver.log_mut().set_enabled(true);
        driver.open().unwrap();

        assert!(matches!(
            driver.read(0x1a, 0x20),
            Err(Error::Transport(TransportError::InvalidParameter(_)))
        ));
        assert!(matches!(
            driver.write(0x20, 0, 1),
            Err(Error::Transport(TransportError::InvalidParameter(_)))
        ));
        assert!(driver.log().is_empty());

        driver.write(MAX_PHY, MAX_REG, 0x55).unwrap();
        assert_eq!(driver.read(MAX_PHY, MAX_REG).unwrap(), 0x55);
    }

    #[test]
    fn test_clause45_unsupported_by_default() {
        let mut driver = Driver::new(Box::new(MemoryBus::default()));
        driver.open().unwrap();
        assert!(matches!(
            driver.read_c45(0, 1, 0),
            Err(Error::Transport(TransportError::Unsupported(_)))
        ));
    }
}
