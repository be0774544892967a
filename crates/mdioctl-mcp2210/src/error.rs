//! Error types for the MCP2210 transport

use mdioctl_core::error::{ConnectionError, Error as CoreError, TransportError};
use thiserror::Error;

/// Result type for MCP2210 operations
pub type Result<T> = std::result::Result<T, Mcp2210Error>;

/// Errors that can occur when talking to an MCP2210
#[derive(Debug, Error)]
pub enum Mcp2210Error {
    /// Device not found
    #[error("MCP2210 device not found (VID:04d8 PID:00de)")]
    DeviceNotFound,

    /// Failed to open device
    #[error("Failed to open MCP2210: {0}")]
    OpenFailed(String),

    /// Failed to claim the HID interface
    #[error("Failed to claim interface: {0}")]
    ClaimFailed(String),

    /// USB transfer failed
    #[error("USB transfer failed: {0}")]
    TransferFailed(String),

    /// A response report shorter than a full report
    #[error("Short HID report: {0} bytes")]
    ShortReport(usize),

    /// Bad URL option
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Pipe used while closed
    #[error("Device is not open")]
    NotOpen,
}

#[cfg(feature = "usb")]
impl From<nusb::Error> for Mcp2210Error {
    fn from(e: nusb::Error) -> Self {
        Mcp2210Error::OpenFailed(e.to_string())
    }
}

impl From<Mcp2210Error> for CoreError {
    fn from(e: Mcp2210Error) -> Self {
        match e {
            Mcp2210Error::DeviceNotFound => TransportError::DeviceNotFound("MCP2210".into()).into(),
            Mcp2210Error::OpenFailed(s) | Mcp2210Error::ClaimFailed(s) => {
                TransportError::OpenFailed(s).into()
            }
            Mcp2210Error::TransferFailed(s) => TransportError::TransferFailed(s).into(),
            Mcp2210Error::ShortReport(n) => {
                TransportError::TransferFailed(format!("short HID report ({} bytes)", n)).into()
            }
            Mcp2210Error::InvalidParameter(s) => ConnectionError::InvalidArguments {
                scheme: "mcp2210".into(),
                message: s,
            }
            .into(),
            Mcp2210Error::NotOpen => TransportError::NotOpen.into(),
        }
    }
}
