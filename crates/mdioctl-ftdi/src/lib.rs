//! mdioctl-ftdi - FTDI MPSSE MDIO transport
//!
//! This crate bit-bangs clause-22 and clause-45 MDIO frames over the MPSSE
//! engine of FTDI H-series chips (FT232H, FT2232H, FT4232H, FT4233H).
//! MDC is driven from the MPSSE clock pin, MDIO from data-out with
//! data-in wired to the same line for reads.
//!
//! # Example
//!
//! ```no_run
//! use mdioctl_core::driver::Driver;
//! use mdioctl_ftdi::FtdiMdio;
//!
//! let bus = FtdiMdio::from_args("type=2232h,port=A")?;
//! let mut driver = Driver::new(Box::new(bus));
//! driver.open()?;
//! let id = driver.read(0x1a, 2)?;
//! println!("PHY ID: {:04x}", id);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # URL
//!
//! ```text
//! ftdi://[index][,type=<232h|2232h|4232h|4233h>][,port=<A-D>][,divisor=<n>]
//! ```

mod device;
mod error;
pub mod protocol;
pub mod transport;

pub use device::{parse_options, FtdiConfig, FtdiDeviceInfo, FtdiMdio, HELP, SCHEME};
pub use error::{FtdiError, Result};
pub use protocol::{FtdiDeviceType, FtdiInterface};
pub use transport::{MpssePipe, PipeMode};

#[cfg(feature = "libftdi")]
pub use device::list_devices;
#[cfg(feature = "libftdi")]
pub use transport::LibFtdiPipe;
