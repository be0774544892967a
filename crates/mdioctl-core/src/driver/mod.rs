//! Transport drivers
//!
//! - [`MdioBus`] - implemented by each transport crate
//! - [`ByteTransport`] - the byte pipe under USB-backed buses
//! - [`Driver`] - state-tracking, logging handle around one bus

mod handle;
mod traits;

pub use handle::{Driver, DriverState, MAX_PHY, MAX_REG};
pub use traits::{BusFeatures, ByteTransport, MdioBus};

#[cfg(test)]
pub(crate) use handle::tests::MemoryBus;
