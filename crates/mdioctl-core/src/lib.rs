//! mdioctl-core - Core library for MDIO access to Ethernet PHY test chips
//!
//! This crate holds everything that does not depend on a particular USB
//! bridge:
//!
//! - [`driver`] - the [`MdioBus`](driver::MdioBus) transport contract and
//!   the [`Driver`](driver::Driver) handle with its command log
//! - [`url`] - `scheme://args` connection URLs
//! - [`regmap`] - tabular register field maps and their compiled accessors
//! - [`firmware`] - RCF SRAM images and the two loader protocols
//! - [`equip`] - composition of capabilities on top of one driver
//!
//! # Example
//!
//! ```ignore
//! use mdioctl_core::equip::{CapabilityRegistry, EquipContext};
//!
//! let ctx = EquipContext {
//!     register_map: Some(RegisterMap::from_csv_file("regfile.csv")?),
//!     ..Default::default()
//! };
//! let mut eq = CapabilityRegistry::with_defaults().equip(driver, &["reg_fields"], &ctx)?;
//! eq.open()?;
//! println!("tx1_mode = {:?}", eq.get("tx1_mode")?);
//! ```

#![warn(rust_2018_idioms)]

pub mod cmdlog;
pub mod driver;
pub mod equip;
pub mod error;
pub mod firmware;
pub mod regmap;
pub mod url;

pub use error::{Error, Result};
