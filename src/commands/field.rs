//! Register field commands

use super::CmdResult;
use mdioctl_core::equip::Equipment;
use mdioctl_core::regmap::{FieldAccessors, RegisterMap};

/// Print every field of a map with its location
pub fn cmd_list(map: &RegisterMap) {
    if let Some(tag) = &map.tag {
        println!("Register map: {}", tag);
    }
    println!(
        "{:<24} {:>7} {:>5} {:>6} {:>8} {:>3}",
        "Name", "Addr", "Page", "Offset", "Bits", "RO"
    );
    println!("{}", "-".repeat(58));

    for field in map.fields() {
        println!(
            "{:<24} {:>#7x} {:>#5x} {:>6} {:>8} {:>3}",
            field.name,
            field.addr,
            field.page(),
            field.offset(),
            field.bits.to_string(),
            if field.readonly { "yes" } else { "" }
        );
    }

    println!();
    println!("{} fields", map.len());
}

/// Print the description of one field
pub fn cmd_doc(map: &RegisterMap, name: &str) -> CmdResult {
    let accessors = FieldAccessors::compile(map)?;
    let doc = accessors.doc(name)?;
    if doc.is_empty() {
        println!("{}: (no description)", name);
    } else {
        println!("{}: {}", name, doc);
    }
    Ok(())
}

pub fn cmd_get(eq: &mut Equipment, name: &str) -> CmdResult {
    match eq.get(name)? {
        Some(value) => {
            println!("{} = 0x{:x} ({})", name, value, value);
            Ok(())
        }
        None => Err(format!("Failed to read field '{}'", name).into()),
    }
}

/// Write a field; with `raw` the whole register is overwritten
pub fn cmd_set(eq: &mut Equipment, name: &str, value: u16, raw: bool) -> CmdResult {
    let written = if raw {
        eq.set_raw(name, value)?
    } else {
        eq.set(name, value)?
    };
    if !written {
        return Err(format!("Failed to write field '{}'", name).into());
    }
    log::info!("{} <- 0x{:x}", name, value);
    Ok(())
}

/// Read or write a `<base>_hi/_mi/_lo` counter
pub fn cmd_wide(eq: &mut Equipment, base: &str, value: Option<u64>) -> CmdResult {
    match value {
        Some(value) => {
            if !eq.set_wide(base, value)? {
                return Err(format!("Failed to write counter '{}'", base).into());
            }
            log::info!("{} <- 0x{:012x}", base, value);
        }
        None => match eq.get_wide(base)? {
            Some(value) => println!("{} = 0x{:012x} ({})", base, value, value),
            None => return Err(format!("Failed to read counter '{}'", base).into()),
        },
    }
    Ok(())
}
