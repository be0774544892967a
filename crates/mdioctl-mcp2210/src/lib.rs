//! mdioctl-mcp2210 - Microchip MCP2210 MDIO transport
//!
//! The MCP2210 is a USB HID to SPI bridge with eight chip-select lines.
//! Clause-22 MDIO frames are clocked out as 8-byte SPI transfers; the
//! bridge echoes the frame back with the phy's data phase filled in.
//!
//! Each transfer may come back in pieces, so the bus repeats the transfer
//! command until all eight bytes have been collected and then checks the
//! echoed header against what was sent.
//!
//! # URL
//!
//! ```text
//! mcp2210://[cs=<0-7>][,index=<n>]
//! ```

mod device;
mod error;
pub mod protocol;
#[cfg(feature = "usb")]
mod transport;

pub use device::{parse_options, Mcp2210, Mcp2210Config, HELP, SCHEME};
pub use error::{Mcp2210Error, Result};

#[cfg(feature = "usb")]
pub use transport::HidPipe;
