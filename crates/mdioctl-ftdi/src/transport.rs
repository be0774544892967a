//! Byte pipe to the FTDI chip
//!
//! [`MpssePipe`] adds the FTDI setup calls to the plain
//! [`ByteTransport`] the MDIO encoder writes frames to. The libftdi
//! backed [`LibFtdiPipe`] is the real implementation; tests substitute an
//! in-memory pipe.

use std::time::Duration;

use mdioctl_core::driver::ByteTransport;
use mdioctl_core::Result;

/// Bit-bang mode of the FTDI chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeMode {
    /// Leave any bit-bang mode
    Reset,
    /// MPSSE engine
    Mpsse,
}

/// Byte pipe with the FTDI-specific setup calls
pub trait MpssePipe: ByteTransport {
    /// Reset the USB device
    fn reset(&mut self) -> Result<()>;

    /// Set read/write timeouts
    fn set_timeouts(&mut self, read: Duration, write: Duration) -> Result<()>;

    /// Switch bit mode with the given pin mask
    fn set_mode(&mut self, mask: u8, mode: PipeMode) -> Result<()>;

    /// Drop everything queued in both directions
    fn purge(&mut self) -> Result<()>;
}

#[cfg(feature = "libftdi")]
pub use libftdi::LibFtdiPipe;

#[cfg(feature = "libftdi")]
mod libftdi {
    use std::io::{Read, Write};
    use std::time::{Duration, Instant};

    use ftdi::{find_by_vid_pid, BitMode, Device, Interface};
    use mdioctl_core::driver::ByteTransport;

    use super::{MpssePipe, PipeMode};
    use crate::error::FtdiError;
    use crate::protocol::{
        FtdiDeviceType, FtdiInterface, DEFAULT_READ_TIMEOUT_MS, DEFAULT_WRITE_TIMEOUT_MS,
    };

    /// Chunk size for draining the receive FIFO
    const READ_CHUNK: usize = 512;

    /// libftdi1 backed pipe
    ///
    /// libftdi has no queue-status call, so received bytes are pulled into
    /// a local buffer whenever `pending` or `read` is called.
    pub struct LibFtdiPipe {
        device_type: FtdiDeviceType,
        interface: FtdiInterface,
        device: Option<Device>,
        rx: Vec<u8>,
        read_timeout: Duration,
        write_timeout: Duration,
    }

    impl LibFtdiPipe {
        pub fn new(device_type: FtdiDeviceType, interface: FtdiInterface) -> Self {
            Self {
                device_type,
                interface,
                device: None,
                rx: Vec::new(),
                read_timeout: Duration::from_millis(u64::from(DEFAULT_READ_TIMEOUT_MS)),
                write_timeout: Duration::from_millis(u64::from(DEFAULT_WRITE_TIMEOUT_MS)),
            }
        }

        fn device(&mut self) -> Result<&mut Device, FtdiError> {
            self.device.as_mut().ok_or(FtdiError::NotOpen)
        }

        /// Move whatever the chip has queued into the local buffer
        fn fill(&mut self) -> Result<(), FtdiError> {
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                let n = self
                    .device()?
                    .read(&mut chunk)
                    .map_err(|e| FtdiError::TransferFailed(format!("Read failed: {}", e)))?;
                if n == 0 {
                    return Ok(());
                }
                self.rx.extend_from_slice(&chunk[..n]);
            }
        }
    }

    impl ByteTransport for LibFtdiPipe {
        fn open(&mut self) -> mdioctl_core::Result<()> {
            let vid = self.device_type.vendor_id();
            let pid = self.device_type.product_id();
            log::info!(
                "Opening FTDI {} channel {}",
                self.device_type.name(),
                self.interface.letter()
            );
            log::debug!("Looking for FTDI device VID={:04X} PID={:04X}", vid, pid);

            let interface = match self.interface {
                FtdiInterface::A => Interface::A,
                FtdiInterface::B => Interface::B,
                FtdiInterface::C => Interface::C,
                FtdiInterface::D => Interface::D,
            };

            let device = find_by_vid_pid(vid, pid)
                .interface(interface)
                .open()
                .map_err(|e| FtdiError::OpenFailed(format!("{}", e)))?;

            log::debug!("Opened FTDI device VID={:04X} PID={:04X}", vid, pid);
            self.device = Some(device);
            self.rx.clear();
            Ok(())
        }

        fn close(&mut self) -> mdioctl_core::Result<()> {
            if self.device.take().is_some() {
                log::debug!("Closed FTDI {}", self.device_type.name());
            }
            self.rx.clear();
            Ok(())
        }

        fn write(&mut self, data: &[u8]) -> mdioctl_core::Result<()> {
            let timeout = self.write_timeout;
            self.device()?.write_all(data).map_err(|e| {
                FtdiError::TransferFailed(format!(
                    "Write failed (timeout {} ms): {}",
                    timeout.as_millis(),
                    e
                ))
            })?;
            log::trace!("Sent {} bytes", data.len());
            Ok(())
        }

        fn read(&mut self, len: usize) -> mdioctl_core::Result<Vec<u8>> {
            let deadline = Instant::now() + self.read_timeout;
            self.fill()?;
            while self.rx.len() < len && Instant::now() < deadline {
                std::thread::sleep(Duration::from_micros(100));
                self.fill()?;
            }
            let take = len.min(self.rx.len());
            let out: Vec<u8> = self.rx.drain(..take).collect();
            log::trace!("Received {} bytes", out.len());
            Ok(out)
        }

        fn pending(&mut self) -> mdioctl_core::Result<usize> {
            self.fill()?;
            Ok(self.rx.len())
        }
    }

    impl MpssePipe for LibFtdiPipe {
        fn reset(&mut self) -> mdioctl_core::Result<()> {
            self.device()?
                .usb_reset()
                .map_err(|e| FtdiError::ConfigFailed(format!("USB reset failed: {}", e)))?;
            Ok(())
        }

        fn set_timeouts(&mut self, read: Duration, write: Duration) -> mdioctl_core::Result<()> {
            log::debug!(
                "FTDI timeouts: read {} ms, write {} ms",
                read.as_millis(),
                write.as_millis()
            );
            self.read_timeout = read;
            self.write_timeout = write;
            Ok(())
        }

        fn set_mode(&mut self, mask: u8, mode: PipeMode) -> mdioctl_core::Result<()> {
            let bitmode = match mode {
                PipeMode::Reset => BitMode::Reset,
                PipeMode::Mpsse => BitMode::Mpsse,
            };
            self.device()?
                .set_bitmode(mask, bitmode)
                .map_err(|e| FtdiError::ConfigFailed(format!("Set bit mode failed: {}", e)))?;
            Ok(())
        }

        fn purge(&mut self) -> mdioctl_core::Result<()> {
            self.rx.clear();
            self.device()?
                .usb_purge_buffers()
                .map_err(|e| FtdiError::ConfigFailed(format!("Purge failed: {}", e)))?;
            Ok(())
        }
    }
}
