//! mdioctl-driver - open MDIO transports by connection URL
//!
//! The CLI only talks to this crate and to `mdioctl-core`; it never names
//! a transport crate directly. Each transport is an optional feature.
//!
//! ```text
//!  connection URL ── DriverRegistry ──> Driver (mdioctl-core)
//!  "fake://1a"          │                  │
//!                       ├── fake           └── CapabilityRegistry::equip
//!                       ├── ftdi                       │
//!                       └── mcp2210                    ▼
//!                                                  Equipment
//! ```
//!
//! # Example
//!
//! ```
//! use mdioctl_driver::DriverRegistry;
//!
//! let registry = DriverRegistry::with_builtin();
//! # #[cfg(feature = "fake")]
//! # {
//! let mut driver = registry.open("fake://1a")?;
//! driver.write(0x1a, 0, 0x1140)?;
//! assert_eq!(driver.read(0x1a, 0)?, 0x1140);
//! # }
//! # Ok::<(), mdioctl_core::Error>(())
//! ```

mod registry;

pub use registry::{builtin_drivers, driver_names_short, BusConstructor, DriverInfo, DriverRegistry};
