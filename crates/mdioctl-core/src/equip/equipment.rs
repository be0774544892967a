//! Composed capability set bound to one driver

use std::path::Path;

use super::{Capability, DriverOwner, Mdio, Raw, RegFields, SramLoader};
use crate::driver::Driver;
use crate::error::{FramingError, Result};
use crate::firmware::{Progress, SramStatus};
use crate::regmap::FieldAccessors;

fn find<T: Capability>(caps: &[Box<dyn Capability>]) -> Option<&T> {
    caps.iter().find_map(|c| c.as_any().downcast_ref::<T>())
}

fn find_mut<T: Capability>(caps: &mut [Box<dyn Capability>]) -> Option<&mut T> {
    caps.iter_mut()
        .find_map(|c| c.as_any_mut().downcast_mut::<T>())
}

fn mdio_of(owner: &mut Box<dyn DriverOwner>) -> Result<&mut Mdio> {
    owner
        .as_any_mut()
        .downcast_mut::<Mdio>()
        .ok_or_else(|| FramingError::NotEquipped("mdio").into())
}

/// Equipment: one driver owner plus the capabilities composed with it
///
/// Every operation of every composed capability is available here; calling
/// one whose capability is missing fails with
/// [`FramingError::NotEquipped`]. The equipment is not safe for
/// concurrent use; callers serialize access.
pub struct Equipment {
    owner: Box<dyn DriverOwner>,
    caps: Vec<Box<dyn Capability>>,
    names: Vec<String>,
}

impl Equipment {
    pub(super) fn new(
        owner: Box<dyn DriverOwner>,
        caps: Vec<Box<dyn Capability>>,
        names: Vec<String>,
    ) -> Self {
        Self { owner, caps, names }
    }

    /// Names of the resolved capabilities, dependencies first
    pub fn capabilities(&self) -> &[String] {
        &self.names
    }

    pub fn has(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.names.iter().any(|n| *n == name)
    }

    /// Name of the capability holding the driver
    pub fn owner_name(&self) -> &'static str {
        self.owner.name()
    }

    pub fn driver(&self) -> &Driver {
        self.owner.driver()
    }

    pub fn driver_mut(&mut self) -> &mut Driver {
        self.owner.driver_mut()
    }

    pub fn open(&mut self) -> Result<()> {
        self.driver_mut().open()
    }

    pub fn close(&mut self) -> Result<()> {
        self.driver_mut().close()
    }

    /// Select the bridge's chip-select line
    pub fn dev_sel(&mut self, index: u8) -> Result<()> {
        self.driver_mut().select_device(index)
    }

    // mdio

    pub fn mdio(&mut self) -> Result<&mut Mdio> {
        mdio_of(&mut self.owner)
    }

    pub fn phyid(&mut self) -> Result<u8> {
        Ok(self.mdio()?.phyid())
    }

    pub fn config_phyid(&mut self, phy: u8) -> Result<()> {
        self.mdio()?.config_phyid(phy);
        Ok(())
    }

    pub fn set_page(&mut self, page: u16) -> Result<()> {
        self.mdio()?.set_page(page)
    }

    pub fn get_page(&mut self) -> Result<u16> {
        self.mdio()?.get_page()
    }

    pub fn read(&mut self, reg: u16, page: Option<u16>) -> Result<u16> {
        self.mdio()?.read(reg, page)
    }

    pub fn write(&mut self, reg: u16, value: u16, page: Option<u16>) -> Result<()> {
        self.mdio()?.write(reg, value, page)
    }

    // raw

    fn ensure_raw(&self) -> Result<()> {
        find::<Raw>(&self.caps)
            .map(|_| ())
            .ok_or_else(|| FramingError::NotEquipped("raw").into())
    }

    /// Clause-22 read of any phy, ignoring the page register
    pub fn raw_read(&mut self, phy: u8, reg: u16) -> Result<u16> {
        self.ensure_raw()?;
        self.driver_mut().read(phy, reg)
    }

    pub fn raw_write(&mut self, phy: u8, reg: u16, value: u16) -> Result<()> {
        self.ensure_raw()?;
        self.driver_mut().write(phy, reg, value)
    }

    // reg_fields

    pub fn fields(&self) -> Result<&FieldAccessors> {
        find::<RegFields>(&self.caps)
            .map(RegFields::accessors)
            .ok_or_else(|| FramingError::NotEquipped("reg_fields").into())
    }

    fn fields_and_mdio(&mut self) -> Result<(&FieldAccessors, &mut Mdio)> {
        let fields = find::<RegFields>(&self.caps)
            .map(RegFields::accessors)
            .ok_or(FramingError::NotEquipped("reg_fields"))?;
        let mdio = mdio_of(&mut self.owner)?;
        Ok((fields, mdio))
    }

    /// Field getter; `Ok(None)` when the register read failed
    pub fn get(&mut self, name: &str) -> Result<Option<u16>> {
        let (fields, mdio) = self.fields_and_mdio()?;
        fields.get(mdio, name)
    }

    /// Field setter; `Ok(false)` when the read-modify-write could not read
    pub fn set(&mut self, name: &str, value: u16) -> Result<bool> {
        let (fields, mdio) = self.fields_and_mdio()?;
        fields.set(mdio, name, value)
    }

    /// Field setter writing `value` without reading the register first
    pub fn set_raw(&mut self, name: &str, value: u16) -> Result<bool> {
        let (fields, mdio) = self.fields_and_mdio()?;
        fields.set_raw(mdio, name, value)
    }

    pub fn doc(&self, name: &str) -> Result<&str> {
        self.fields()?.doc(name)
    }

    /// 48-bit value spread over `<base>_hi`, `<base>_mi` and `<base>_lo`
    pub fn get_wide(&mut self, base: &str) -> Result<Option<u64>> {
        let (fields, mdio) = self.fields_and_mdio()?;
        fields.get_wide(mdio, base)
    }

    pub fn set_wide(&mut self, base: &str, value: u64) -> Result<bool> {
        let (fields, mdio) = self.fields_and_mdio()?;
        fields.set_wide(mdio, base, value)
    }

    // sram-loader / sram-loader-tiny

    fn loader(&self) -> Result<&SramLoader> {
        find::<SramLoader>(&self.caps).ok_or_else(|| FramingError::NotEquipped("sram-loader").into())
    }

    pub fn sram_set_firmware(&mut self, path: impl AsRef<Path>) -> Result<()> {
        find_mut::<SramLoader>(&mut self.caps)
            .ok_or(FramingError::NotEquipped("sram-loader"))?
            .set_firmware(path)
    }

    pub fn sram_set_firmware_text(&mut self, text: &str) -> Result<()> {
        find_mut::<SramLoader>(&mut self.caps)
            .ok_or(FramingError::NotEquipped("sram-loader"))?
            .set_firmware_text(text)
    }

    pub fn sram_loader(&self) -> Result<&SramLoader> {
        self.loader()
    }

    /// Load the configured firmware and start it
    pub fn sram_load(&mut self, progress: Progress<'_>) -> Result<()> {
        let loader = find::<SramLoader>(&self.caps).ok_or(FramingError::NotEquipped("sram-loader"))?;
        let mdio = mdio_of(&mut self.owner)?;
        loader.load(mdio, progress)
    }

    pub fn sram_status(&mut self) -> Result<SramStatus> {
        let loader = find::<SramLoader>(&self.caps).ok_or(FramingError::NotEquipped("sram-loader"))?;
        let mdio = mdio_of(&mut self.owner)?;
        loader.status(mdio)
    }
}

impl std::fmt::Debug for Equipment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Equipment")
            .field("owner", &self.owner.name())
            .field("capabilities", &self.names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::driver::{Driver, MemoryBus};
    use crate::equip::{CapabilityRegistry, EquipContext};
    use crate::error::{Error, FramingError, SramError};
    use crate::regmap::RegisterMap;

    const MAP: &str = "$ TAG: demo\n,# addr = 0x245\n,[11:10],0x1,,tx1_mode,Mode select\n,[3:0],0x0,,tx1_gain,\n,# addr = 0x20\n,[15:0],0x0,RD,chip_ver,\n";

    fn equip(names: &[&str], bus: MemoryBus) -> crate::equip::Equipment {
        let ctx = EquipContext {
            register_map: Some(RegisterMap::from_csv_str(MAP).unwrap()),
            phy: None,
        };
        let mut equipment = CapabilityRegistry::with_defaults()
            .equip(Driver::new(Box::new(bus)), names, &ctx)
            .unwrap();
        equipment.open().unwrap();
        equipment
    }

    #[test]
    fn test_field_read_modify_write() {
        let mut bus = MemoryBus::default();
        bus.regs.insert((0x1a, 0x05), 0xF0F5);
        let mut eq = equip(&["reg_fields"], bus);

        assert_eq!(eq.owner_name(), "mdio");
        assert_eq!(eq.get("tx1_mode").unwrap(), Some(0));
        assert!(eq.set("tx1_mode", 0x7).unwrap());
        assert_eq!(eq.get("tx1_mode").unwrap(), Some(0x3));
        // Bits outside the field are kept
        assert_eq!(eq.read(0x05, None).unwrap(), 0xFCF5);
        assert_eq!(eq.get("tx1_gain").unwrap(), Some(0x5));
        assert_eq!(eq.get_page().unwrap(), 0x12);
        assert_eq!(eq.doc("TX1_MODE").unwrap(), "Mode select");
    }

    #[test]
    fn test_field_read_failure_is_none() {
        let bus = MemoryBus {
            fail_reads: true,
            ..Default::default()
        };
        let mut eq = equip(&["reg_fields"], bus);
        assert_eq!(eq.get("tx1_mode").unwrap(), None);
        assert!(!eq.set("tx1_mode", 1).unwrap());
    }

    #[test]
    fn test_missing_capability() {
        let mut eq = equip(&["mdio"], MemoryBus::default());
        assert!(matches!(
            eq.raw_read(0, 0),
            Err(Error::Framing(FramingError::NotEquipped("raw")))
        ));
        assert!(matches!(
            eq.get("tx1_mode"),
            Err(Error::Framing(FramingError::NotEquipped("reg_fields")))
        ));
    }

    #[test]
    fn test_sram_load_without_firmware() {
        let mut eq = equip(&["sram-loader-tiny"], MemoryBus::default());
        assert!(matches!(
            eq.sram_load(&mut |_, _| {}),
            Err(Error::Sram(SramError::NoFirmware))
        ));
    }

    #[test]
    fn test_sram_tiny_load_and_status() {
        let mut eq = equip(&["sram-loader-tiny", "raw"], MemoryBus::default());
        // Single execute pair: no control polling
        eq.sram_set_firmware_text("0000000000000001\n0100000000000000\n1101111010101101\n")
            .unwrap();
        eq.sram_load(&mut |_, _| {}).unwrap();

        assert_eq!(eq.raw_read(0x1a, 31).unwrap(), 128);
        assert_eq!(eq.raw_read(0x1a, 28).unwrap(), 0x0001);
        assert_eq!(eq.raw_read(0x1a, 27).unwrap(), 0x4000);
        assert_eq!(eq.sram_status().unwrap(), crate::firmware::SramStatus::Idle);
    }
}
