//! Bus trait definitions
//!
//! A transport crate implements [`MdioBus`] to turn logical register
//! operations into its bridge's wire protocol. Bridges that are plain
//! byte pipes underneath expose that pipe through [`ByteTransport`], so
//! the protocol encoder can be exercised against an in-memory pipe.

use crate::error::{Result, TransportError};
use bitflags::bitflags;

bitflags! {
    /// MDIO bus feature flags
    ///
    /// These flags indicate what a transport supports beyond plain
    /// clause-22 register access.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BusFeatures: u32 {
        /// Supports clause-45 (device type + 16-bit register) access
        const CLAUSE_45     = 1 << 0;
        /// Has several chip-select lines chosen with `select_device`
        const DEVICE_SELECT = 1 << 1;
        /// Does not touch hardware
        const SOFTWARE      = 1 << 2;
    }
}

impl Default for BusFeatures {
    fn default() -> Self {
        BusFeatures::empty()
    }
}

/// MDIO bus trait
///
/// This trait represents a bridge that can carry MDIO register reads and
/// writes. Implementations do not track open/closed state or log commands;
/// [`Driver`](super::Driver) wraps a bus and does both.
///
/// `read` and `write` are atomic at the logical level: one register in or
/// one register out, however many USB transactions that takes.
pub trait MdioBus {
    /// Short transport name used in log messages
    fn name(&self) -> &'static str;

    /// Get the features supported by this bus
    fn features(&self) -> BusFeatures {
        BusFeatures::empty()
    }

    /// Bring up the bridge
    fn open(&mut self) -> Result<()>;

    /// Release the bridge
    ///
    /// Must be safe to call after a failed or partial `open`.
    fn close(&mut self) -> Result<()>;

    /// Clause-22 register read
    fn read(&mut self, phy: u8, reg: u16) -> Result<u16>;

    /// Clause-22 register write
    fn write(&mut self, phy: u8, reg: u16, value: u16) -> Result<()>;

    /// Clause-45 register read
    fn read_c45(&mut self, _phy: u8, _dev: u8, _reg: u16) -> Result<u16> {
        Err(TransportError::Unsupported("clause-45 access").into())
    }

    /// Clause-45 register write
    fn write_c45(&mut self, _phy: u8, _dev: u8, _reg: u16, _value: u16) -> Result<()> {
        Err(TransportError::Unsupported("clause-45 access").into())
    }

    /// Select which chip-select line subsequent accesses use
    fn select_device(&mut self, _index: u8) -> Result<()> {
        Err(TransportError::Unsupported("device select").into())
    }
}

/// Opaque duplex byte pipe to a USB bridge
pub trait ByteTransport {
    /// Open the underlying device
    fn open(&mut self) -> Result<()>;

    /// Close the underlying device; a no-op when not open
    fn close(&mut self) -> Result<()>;

    /// Write all bytes
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `len` bytes that are already available
    fn read(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Number of bytes waiting to be read
    fn pending(&mut self) -> Result<usize>;
}
