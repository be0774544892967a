//! Driver-owning capabilities

use std::any::Any;

use super::{Capability, DriverOwner};
use crate::driver::Driver;
use crate::error::Result;
use crate::firmware::SramPort;
use crate::regmap::RegisterIo;

/// Phy address used until `config_phyid` is called
pub const DEFAULT_PHY: u8 = 0x1a;

/// Page select register
pub const REG_PAGE: u16 = 31;

/// Page-addressed access to a single phy
///
/// Registers are addressed as `(page, offset)`: the page is written to
/// [`REG_PAGE`] and the offset is then accessed with a clause-22
/// operation.
#[derive(Debug)]
pub struct Mdio {
    driver: Driver,
    phy: u8,
}

impl Mdio {
    pub fn new(driver: Driver) -> Self {
        Self::with_phy(driver, DEFAULT_PHY)
    }

    pub fn with_phy(driver: Driver, phy: u8) -> Self {
        Self { driver, phy }
    }

    /// Change the phy address used by all paged accesses
    pub fn config_phyid(&mut self, phy: u8) {
        log::debug!("mdio: phy 0x{:02x} -> 0x{:02x}", self.phy, phy);
        self.phy = phy;
    }

    pub fn phyid(&self) -> u8 {
        self.phy
    }

    pub fn set_page(&mut self, page: u16) -> Result<()> {
        self.driver.write(self.phy, REG_PAGE, page)
    }

    pub fn get_page(&mut self) -> Result<u16> {
        self.driver.read(self.phy, REG_PAGE)
    }

    /// Read `reg`, selecting `page` first when given
    pub fn read(&mut self, reg: u16, page: Option<u16>) -> Result<u16> {
        if let Some(page) = page {
            self.set_page(page)?;
        }
        self.driver.read(self.phy, reg)
    }

    /// Write `reg`, selecting `page` first when given
    pub fn write(&mut self, reg: u16, value: u16, page: Option<u16>) -> Result<()> {
        if let Some(page) = page {
            self.set_page(page)?;
        }
        self.driver.write(self.phy, reg, value)
    }
}

impl Capability for Mdio {
    fn name(&self) -> &'static str {
        "mdio"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl DriverOwner for Mdio {
    fn driver(&self) -> &Driver {
        &self.driver
    }

    fn driver_mut(&mut self) -> &mut Driver {
        &mut self.driver
    }
}

impl RegisterIo for Mdio {
    fn read_paged(&mut self, page: u16, reg: u16) -> Result<u16> {
        self.read(reg, Some(page))
    }

    fn write_paged(&mut self, page: u16, reg: u16, value: u16) -> Result<()> {
        self.write(reg, value, Some(page))
    }
}

impl SramPort for Mdio {
    fn select_page(&mut self, page: u16) -> Result<()> {
        self.set_page(page)
    }

    fn read_reg(&mut self, reg: u16) -> Result<u16> {
        self.read(reg, None)
    }

    fn write_reg(&mut self, reg: u16, value: u16) -> Result<()> {
        self.write(reg, value, None)
    }
}

/// Bare driver holder, added when no other capability owns the driver
#[derive(Debug)]
pub struct DriverHandle {
    driver: Driver,
}

impl DriverHandle {
    pub fn new(driver: Driver) -> Self {
        Self { driver }
    }
}

impl Capability for DriverHandle {
    fn name(&self) -> &'static str {
        "driver"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl DriverOwner for DriverHandle {
    fn driver(&self) -> &Driver {
        &self.driver
    }

    fn driver_mut(&mut self) -> &mut Driver {
        &mut self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryBus;

    fn open_mdio() -> Mdio {
        let mut driver = Driver::new(Box::new(MemoryBus::default()));
        driver.open().unwrap();
        Mdio::new(driver)
    }

    #[test]
    fn test_paged_write_selects_page() {
        let mut mdio = open_mdio();
        mdio.driver_mut().log_mut().set_enabled(true);
        mdio.write(5, 0xAAAA, Some(0x12)).unwrap();

        let log = mdio.driver_mut().log_mut().drain();
        assert_eq!(log.len(), 2);
        assert_eq!((log[0].phy, log[0].reg, log[0].value), (DEFAULT_PHY, REG_PAGE, 0x12));
        assert_eq!((log[1].reg, log[1].value), (5, 0xAAAA));
        assert_eq!(mdio.get_page().unwrap(), 0x12);
    }

    #[test]
    fn test_config_phyid() {
        let mut mdio = open_mdio();
        mdio.config_phyid(3);
        assert_eq!(mdio.phyid(), 3);
        mdio.write(1, 7, None).unwrap();
        assert_eq!(mdio.driver_mut().read(3, 1).unwrap(), 7);
        assert_eq!(mdio.driver_mut().read(DEFAULT_PHY, 1).unwrap(), 0);
    }
}
