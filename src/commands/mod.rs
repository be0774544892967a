//! CLI command implementations
//!
//! Device commands go through a [`Session`]: the connection URL is
//! resolved by the driver registry, the requested capabilities are
//! composed on top of the driver, and the equipment is opened. When the
//! session ends it is closed and, with `--log-commands`, the command log
//! is printed.

pub mod field;
mod list;
pub mod reg;
pub mod regmap;
pub mod sram;

pub use list::list_drivers;

use crate::cli::DeviceArgs;
use mdioctl_core::equip::{CapabilityRegistry, EquipContext, Equipment};
use mdioctl_core::error::TransportError;
use mdioctl_core::regmap::RegisterMap;
use mdioctl_core::Error;
use mdioctl_driver::DriverRegistry;
use std::path::Path;

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// An open equipment bound to one connection URL
pub struct Session {
    equipment: Equipment,
    log_commands: bool,
}

impl Session {
    /// Resolve the device URL, compose `capabilities` and open it
    pub fn open(
        args: &DeviceArgs,
        capabilities: &[&str],
        register_map: Option<RegisterMap>,
        log_commands: bool,
    ) -> CmdResult<Self> {
        let mut driver = DriverRegistry::with_builtin().resolve(&args.device)?;
        driver.log_mut().set_enabled(log_commands);

        let ctx = EquipContext {
            register_map,
            phy: args.phy,
        };
        let mut equipment = CapabilityRegistry::with_defaults().equip(driver, capabilities, &ctx)?;
        log::debug!("Capabilities: {}", equipment.capabilities().join(", "));

        equipment
            .open()
            .map_err(|e| open_error(&args.device, e))?;
        log::info!("Opened {}", args.device);

        if let Some(index) = args.dev_sel {
            equipment.dev_sel(index)?;
        }

        Ok(Self {
            equipment,
            log_commands,
        })
    }

    /// Run `f` on the equipment, then close it and print the log
    pub fn run<T>(mut self, f: impl FnOnce(&mut Equipment) -> CmdResult<T>) -> CmdResult<T> {
        let result = f(&mut self.equipment);

        if self.log_commands {
            for entry in self.equipment.driver_mut().log_mut().drain() {
                println!("{}", entry);
            }
        }
        if let Err(e) = self.equipment.close() {
            log::warn!("Failed to close device: {}", e);
        }
        result
    }
}

/// Add a hint to errors raised while opening the bridge
fn open_error(url: &str, e: Error) -> Box<dyn std::error::Error> {
    match e {
        Error::Transport(TransportError::DeviceNotFound(_))
        | Error::Transport(TransportError::OpenFailed(_)) => format!(
            "Failed to open {}: {}\nMake sure the device is connected and you have permissions.",
            url, e
        )
        .into(),
        e => e.into(),
    }
}

/// Load a register map, choosing the format by file extension
pub fn load_map(path: &Path) -> CmdResult<RegisterMap> {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let map = if is_toml {
        RegisterMap::from_toml_file(path)?
    } else {
        RegisterMap::from_csv_file(path)?
    };
    log::info!("Loaded {} fields from {}", map.len(), path.display());
    Ok(map)
}

/// Write `text` to `output`, or to stdout when no file is given
pub fn emit(text: &str, output: Option<&Path>) -> CmdResult {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_map_by_extension() {
        let mut csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        csv.write_all(b"#,map\n,# addr = 0x245\n,[11:10],0x0,,tx1_mode,Mode\n")
            .unwrap();
        let map = load_map(csv.path()).unwrap();
        assert_eq!(map.len(), 1);

        let mut toml = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        toml.write_all(map.to_toml_string().as_bytes()).unwrap();
        assert_eq!(load_map(toml.path()).unwrap().fields(), map.fields());
    }

    #[test]
    fn test_open_error_hint() {
        let e = open_error(
            "ftdi://",
            TransportError::DeviceNotFound("no FTDI device".into()).into(),
        );
        assert!(e.to_string().contains("permissions"));

        let e = open_error("fake://", TransportError::NotOpen.into());
        assert!(!e.to_string().contains("permissions"));
    }

    #[cfg(feature = "fake")]
    #[test]
    fn test_session_on_fake() {
        let args = DeviceArgs {
            device: "fake://1a".into(),
            phy: None,
            dev_sel: None,
        };
        let session = Session::open(&args, &["mdio"], None, true).unwrap();
        let value = session
            .run(|eq| {
                eq.write(4, 0x01E1, None)?;
                Ok(eq.read(4, None)?)
            })
            .unwrap();
        assert_eq!(value, 0x01E1);
    }
}
