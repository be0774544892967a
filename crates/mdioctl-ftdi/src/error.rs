//! Error types for the FTDI transport

use mdioctl_core::error::{ConnectionError, Error as CoreError, TransportError};
use thiserror::Error;

/// Result type for FTDI operations
pub type Result<T> = std::result::Result<T, FtdiError>;

/// Errors that can occur during FTDI operations
#[derive(Debug, Error)]
pub enum FtdiError {
    /// No FTDI device found
    #[error("No FTDI device found")]
    DeviceNotFound,

    /// Failed to open device
    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    /// USB transfer failed
    #[error("USB transfer failed: {0}")]
    TransferFailed(String),

    /// Failed to configure device
    #[error("Failed to configure device: {0}")]
    ConfigFailed(String),

    /// Invalid device type
    #[error("Invalid device type: {0}")]
    InvalidDeviceType(String),

    /// Unknown port letter
    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Fewer bytes queued than the frame requires
    #[error("Couldn't read enough bytes: expected {expected}, got {received}")]
    ShortRead { expected: usize, received: usize },

    /// Pipe used while closed
    #[error("Device is not open")]
    NotOpen,

    /// libftdi error
    #[error("libftdi error: {0}")]
    LibFtdi(String),

    /// USB enumeration error
    #[error("USB error: {0}")]
    UsbError(String),
}

#[cfg(feature = "libftdi")]
impl From<nusb::Error> for FtdiError {
    fn from(e: nusb::Error) -> Self {
        FtdiError::UsbError(e.to_string())
    }
}

#[cfg(feature = "libftdi")]
impl From<ftdi::Error> for FtdiError {
    fn from(e: ftdi::Error) -> Self {
        FtdiError::LibFtdi(e.to_string())
    }
}

impl From<FtdiError> for CoreError {
    fn from(e: FtdiError) -> Self {
        match e {
            FtdiError::DeviceNotFound => TransportError::DeviceNotFound("FTDI".into()).into(),
            FtdiError::OpenFailed(s) | FtdiError::ConfigFailed(s) => {
                TransportError::OpenFailed(s).into()
            }
            FtdiError::ShortRead { expected, received } => {
                TransportError::ReadTimeout { expected, received }.into()
            }
            FtdiError::NotOpen => TransportError::NotOpen.into(),
            FtdiError::InvalidDeviceType(s)
            | FtdiError::InvalidChannel(s)
            | FtdiError::InvalidParameter(s) => ConnectionError::InvalidArguments {
                scheme: "ftdi".into(),
                message: s,
            }
            .into(),
            FtdiError::TransferFailed(s) | FtdiError::LibFtdi(s) | FtdiError::UsbError(s) => {
                TransportError::TransferFailed(s).into()
            }
        }
    }
}
