//! mdioctl-fake - In-memory MDIO bus for testing
//!
//! This crate provides a fake MDIO bus that keeps register values in a
//! map. Only phy ids from a configured whitelist are backed by storage;
//! accesses to other phys are logged, writes to them are dropped and
//! reads return 0. It is useful for exercising register maps, capability
//! composition and firmware loading without hardware.
//!
//! # URL
//!
//! ```text
//! fake://phy_ids
//!   phy_ids ::= Nil | phy_id[,phy_id]
//!   phy_id  ::= Hex
//! ```
//!
//! With no ids the bus answers for phy `0x1a`.

use std::collections::HashMap;

use mdioctl_core::driver::{BusFeatures, MdioBus};
use mdioctl_core::error::{ConnectionError, Result};
use mdioctl_core::url::split_args;

/// Driver scheme
pub const SCHEME: &str = "fake";

/// Usage text shown by `list-drivers --verbose`
pub const HELP: &str = "\
This is a fake mdio driver.
URL: fake://phy_ids
  phy_ids ::= Nil | phy_id[,phy_id]
  phy_id ::= Hex";

/// Phy answered when no ids are given
pub const DEFAULT_PHY: u8 = 0x1a;

/// Configuration for the fake bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeConfig {
    /// Phy ids backed by storage
    pub phy_ids: Vec<u8>,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            phy_ids: vec![DEFAULT_PHY],
        }
    }
}

/// Parse the argument string of a `fake://` URL
pub fn parse_options(args: &str) -> Result<FakeConfig> {
    let items = split_args(args);
    if items.is_empty() {
        return Ok(FakeConfig::default());
    }

    let phy_ids = items
        .into_iter()
        .map(|item| {
            let digits = item
                .strip_prefix("0x")
                .or_else(|| item.strip_prefix("0X"))
                .unwrap_or(item);
            u8::from_str_radix(digits, 16).map_err(|_| ConnectionError::InvalidArguments {
                scheme: SCHEME.to_string(),
                message: format!("invalid phy id '{}'", item),
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(FakeConfig { phy_ids })
}

/// In-memory MDIO bus
#[derive(Debug)]
pub struct FakeBus {
    config: FakeConfig,
    regs: HashMap<(u8, u8, u16), u16>,
}

impl FakeBus {
    pub fn new(config: FakeConfig) -> Self {
        log::info!("Fake: Init with phy ids {:02x?}", config.phy_ids);
        Self {
            config,
            regs: HashMap::new(),
        }
    }

    /// Build a bus from a URL argument string
    pub fn from_args(args: &str) -> Result<Self> {
        Ok(Self::new(parse_options(args)?))
    }

    pub fn config(&self) -> &FakeConfig {
        &self.config
    }

    /// Whether `phy` is backed by storage
    pub fn accepts(&self, phy: u8) -> bool {
        self.config.phy_ids.contains(&phy)
    }

    /// Stored value, without logging or remembering the access
    pub fn peek(&self, phy: u8, dev: u8, reg: u16) -> Option<u16> {
        self.regs.get(&(phy, dev, reg)).copied()
    }

    fn log_access(op: &str, phy: u8, dev: u8, reg: u16, value: u16) {
        log::info!(
            "Fake: {:5}| 0x{:02x}.0x{:02x}.0x{:04x} = 0x{:04x}",
            op,
            phy,
            dev,
            reg,
            value
        );
    }

    fn load(&mut self, phy: u8, dev: u8, reg: u16) -> u16 {
        let value = if self.accepts(phy) {
            *self.regs.entry((phy, dev, reg)).or_insert(0)
        } else {
            0
        };
        Self::log_access("read", phy, dev, reg, value);
        value
    }

    fn store(&mut self, phy: u8, dev: u8, reg: u16, value: u16) {
        if self.accepts(phy) {
            self.regs.insert((phy, dev, reg), value);
        }
        Self::log_access("write", phy, dev, reg, value);
    }
}

impl Default for FakeBus {
    fn default() -> Self {
        Self::new(FakeConfig::default())
    }
}

impl MdioBus for FakeBus {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn features(&self) -> BusFeatures {
        BusFeatures::SOFTWARE | BusFeatures::CLAUSE_45
    }

    fn open(&mut self) -> Result<()> {
        log::info!("Fake: open");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        log::info!("Fake: close");
        Ok(())
    }

    fn read(&mut self, phy: u8, reg: u16) -> Result<u16> {
        Ok(self.load(phy, 0, reg))
    }

    fn write(&mut self, phy: u8, reg: u16, value: u16) -> Result<()> {
        self.store(phy, 0, reg, value);
        Ok(())
    }

    fn read_c45(&mut self, phy: u8, dev: u8, reg: u16) -> Result<u16> {
        Ok(self.load(phy, dev, reg))
    }

    fn write_c45(&mut self, phy: u8, dev: u8, reg: u16, value: u16) -> Result<()> {
        self.store(phy, dev, reg, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdioctl_core::driver::Driver;
    use mdioctl_core::Error;

    #[test]
    fn test_parse_options() {
        assert_eq!(parse_options("").unwrap().phy_ids, vec![0x1a]);
        assert_eq!(parse_options("1a,2B").unwrap().phy_ids, vec![0x1a, 0x2b]);
        assert_eq!(parse_options("0x03").unwrap().phy_ids, vec![0x03]);
        assert!(matches!(
            parse_options("1a,zz"),
            Err(Error::Connection(ConnectionError::InvalidArguments { .. }))
        ));
    }

    #[test]
    fn test_write_then_read() {
        let mut bus = FakeBus::from_args("1a,2b").unwrap();
        for (phy, reg, value) in [(0x1a, 0, 0xFFFF), (0x2b, 31, 0x0012), (0x1a, 7, 0)] {
            bus.write(phy, reg, value).unwrap();
            assert_eq!(bus.read(phy, reg).unwrap(), value);
        }
    }

    #[test]
    fn test_unknown_phy_reads_zero() {
        let mut bus = FakeBus::default();
        bus.write(0x05, 1, 0x1234).unwrap();
        assert_eq!(bus.read(0x05, 1).unwrap(), 0);
        assert_eq!(bus.peek(0x05, 0, 1), None);
    }

    #[test]
    fn test_unknown_register_is_remembered() {
        let mut bus = FakeBus::default();
        assert_eq!(bus.peek(0x1a, 0, 9), None);
        assert_eq!(bus.read(0x1a, 9).unwrap(), 0);
        assert_eq!(bus.peek(0x1a, 0, 9), Some(0));
    }

    #[test]
    fn test_clause45_separate_from_clause22() {
        let mut bus = FakeBus::default();
        bus.write_c45(0x1a, 1, 0x1000, 0xBEEF).unwrap();
        assert_eq!(bus.read_c45(0x1a, 1, 0x1000).unwrap(), 0xBEEF);
        assert_eq!(bus.read(0x1a, 0x1000).unwrap(), 0);
    }

    #[test]
    fn test_through_driver_handle() {
        let mut driver = Driver::new(Box::new(FakeBus::default()));
        assert!(driver.features().contains(BusFeatures::SOFTWARE));
        assert!(driver.read(0x1a, 0).is_err());
        driver.open().unwrap();
        driver.write(0x1a, 4, 0x0101).unwrap();
        assert_eq!(driver.read(0x1a, 4).unwrap(), 0x0101);
        driver.close().unwrap();
    }
}
