//! Register read/write commands

use super::CmdResult;
use mdioctl_core::driver::MAX_REG;
use mdioctl_core::equip::{Equipment, DEFAULT_PHY};

/// Read one clause-22 register of the configured phy
pub fn run_read(eq: &mut Equipment, reg: u16, page: Option<u16>) -> CmdResult {
    let value = eq.read(reg, page)?;
    println!("0x{:04x}", value);
    Ok(())
}

/// Write one clause-22 register of the configured phy
pub fn run_write(eq: &mut Equipment, reg: u16, value: u16, page: Option<u16>) -> CmdResult {
    eq.write(reg, value, page)?;
    log::info!("Wrote 0x{:04x} to reg 0x{:02x}", value, reg);
    Ok(())
}

/// Clause-45 read; fails on transports without clause-45 support
pub fn run_read45(eq: &mut Equipment, phy: Option<u8>, dev: u8, reg: u16) -> CmdResult {
    let phy = phy.unwrap_or(DEFAULT_PHY);
    let value = eq.driver_mut().read_c45(phy, dev, reg)?;
    println!("0x{:04x}", value);
    Ok(())
}

/// Clause-45 write; fails on transports without clause-45 support
pub fn run_write45(eq: &mut Equipment, phy: Option<u8>, dev: u8, reg: u16, value: u16) -> CmdResult {
    let phy = phy.unwrap_or(DEFAULT_PHY);
    eq.driver_mut().write_c45(phy, dev, reg, value)?;
    log::info!("Wrote 0x{:04x} to {}.0x{:04x}", value, dev, reg);
    Ok(())
}

/// Print `count` registers starting at `start`, eight per line
///
/// The range stops at the last clause-22 register.
pub fn run_dump(eq: &mut Equipment, start: u16, count: u16, page: Option<u16>) -> CmdResult {
    if let Some(page) = page {
        eq.set_page(page)?;
        println!("page 0x{:02x}", page);
    }

    let values = read_range(eq, start, count)?;
    for (row, chunk) in values.chunks(8).enumerate() {
        let first = start as usize + row * 8;
        let words: Vec<String> = chunk.iter().map(|v| format!("{:04x}", v)).collect();
        println!("{:02x}: {}", first, words.join(" "));
    }
    Ok(())
}

fn read_range(eq: &mut Equipment, start: u16, count: u16) -> CmdResult<Vec<u16>> {
    if start > MAX_REG {
        return Err(format!(
            "Start register 0x{:02x} out of range (max 0x{:02x})",
            start, MAX_REG
        )
        .into());
    }
    let end = start.saturating_add(count).min(MAX_REG + 1);
    if end - start < count {
        log::warn!("Dump truncated to registers 0x{:02x}..0x{:02x}", start, MAX_REG);
    }

    let mut values = Vec::with_capacity((end - start) as usize);
    for reg in start..end {
        values.push(eq.read(reg, None)?);
    }
    Ok(values)
}

#[cfg(all(test, feature = "fake"))]
mod tests {
    use super::*;
    use mdioctl_core::equip::{CapabilityRegistry, EquipContext};
    use mdioctl_driver::DriverRegistry;

    fn fake_equipment() -> Equipment {
        let driver = DriverRegistry::with_builtin().resolve("fake://1a").unwrap();
        let mut eq = CapabilityRegistry::with_defaults()
            .equip(driver, &["mdio"], &EquipContext::default())
            .unwrap();
        eq.open().unwrap();
        eq
    }

    #[test]
    fn test_read_range() {
        let mut eq = fake_equipment();
        for reg in 0..4 {
            eq.write(reg, 0x100 + reg, None).unwrap();
        }
        assert_eq!(
            read_range(&mut eq, 1, 3).unwrap(),
            vec![0x101, 0x102, 0x103]
        );
    }

    #[test]
    fn test_read_range_stops_at_last_register() {
        let mut eq = fake_equipment();
        eq.write(MAX_REG, 0xABCD, None).unwrap();
        let values = read_range(&mut eq, 30, 100).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1], 0xABCD);
        assert!(read_range(&mut eq, 0x20, 1).is_err());
    }

    #[test]
    fn test_clause45_on_fake() {
        let mut eq = fake_equipment();
        run_write45(&mut eq, None, 1, 0x0007, 0xBEEF).unwrap();
        assert_eq!(eq.driver_mut().read_c45(DEFAULT_PHY, 1, 0x0007).unwrap(), 0xBEEF);
    }
}
