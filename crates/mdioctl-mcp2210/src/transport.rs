//! Raw HID pipe over USB interrupt endpoints
//!
//! The MCP2210 needs no HID report descriptor parsing: output reports go
//! to the interrupt OUT endpoint and input reports come back on the
//! interrupt IN endpoint, one 64-byte report per transfer.

use std::time::Duration;

use mdioctl_core::driver::ByteTransport;
use nusb::transfer::{Buffer, In, Interrupt, Out};
use nusb::{Endpoint, MaybeFuture};

use crate::error::Mcp2210Error;
use crate::protocol::{EP_IN, EP_OUT, HID_INTERFACE, MCP2210_PID, MCP2210_VID, REPORT_LEN};

/// Timeout for a single interrupt transfer
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(1);

struct Endpoints {
    out_ep: Endpoint<Interrupt, Out>,
    in_ep: Endpoint<Interrupt, In>,
}

/// nusb interrupt-transfer pipe to the nth MCP2210
pub struct HidPipe {
    index: usize,
    endpoints: Option<Endpoints>,
    rx: Vec<u8>,
}

impl HidPipe {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            endpoints: None,
            rx: Vec::new(),
        }
    }

    fn endpoints(&mut self) -> Result<&mut Endpoints, Mcp2210Error> {
        self.endpoints.as_mut().ok_or(Mcp2210Error::NotOpen)
    }

    fn receive(&mut self) -> Result<(), Mcp2210Error> {
        let ep = &mut self.endpoints()?.in_ep;
        let mut buf = Buffer::new(REPORT_LEN);
        buf.set_requested_len(REPORT_LEN);

        let data = ep
            .transfer_blocking(buf, TRANSFER_TIMEOUT)
            .into_result()
            .map_err(|e| Mcp2210Error::TransferFailed(e.to_string()))?;

        log::trace!("HID in {:02X?}", &data[..]);
        self.rx.extend_from_slice(&data);
        Ok(())
    }
}

impl ByteTransport for HidPipe {
    fn open(&mut self) -> mdioctl_core::Result<()> {
        let devices: Vec<_> = nusb::list_devices()
            .wait()
            .map_err(|e| Mcp2210Error::OpenFailed(e.to_string()))?
            .filter(|d| d.vendor_id() == MCP2210_VID && d.product_id() == MCP2210_PID)
            .collect();

        let info = devices
            .get(self.index)
            .ok_or(Mcp2210Error::DeviceNotFound)?;

        log::info!(
            "Opening MCP2210 at bus {} address {}",
            info.bus_id(),
            info.device_address()
        );

        let device = info
            .open()
            .wait()
            .map_err(|e| Mcp2210Error::OpenFailed(e.to_string()))?;

        let interface = device
            .detach_and_claim_interface(HID_INTERFACE)
            .wait()
            .map_err(|e| Mcp2210Error::ClaimFailed(e.to_string()))?;

        let out_ep = interface
            .endpoint::<Interrupt, Out>(EP_OUT)
            .map_err(|e| Mcp2210Error::ClaimFailed(e.to_string()))?;
        let in_ep = interface
            .endpoint::<Interrupt, In>(EP_IN)
            .map_err(|e| Mcp2210Error::ClaimFailed(e.to_string()))?;

        self.endpoints = Some(Endpoints { out_ep, in_ep });
        self.rx.clear();
        Ok(())
    }

    fn close(&mut self) -> mdioctl_core::Result<()> {
        if self.endpoints.take().is_some() {
            log::debug!("Closed MCP2210");
        }
        self.rx.clear();
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> mdioctl_core::Result<()> {
        let ep = &mut self.endpoints()?.out_ep;
        let mut buf = Buffer::new(data.len());
        buf.extend_from_slice(data);

        ep.transfer_blocking(buf, TRANSFER_TIMEOUT)
            .into_result()
            .map_err(|e| Mcp2210Error::TransferFailed(e.to_string()))?;

        log::trace!("HID out {:02X?}", data);
        Ok(())
    }

    /// Take up to `len` bytes, waiting for one input report when none is
    /// buffered
    fn read(&mut self, len: usize) -> mdioctl_core::Result<Vec<u8>> {
        if self.rx.is_empty() {
            self.receive()?;
        }
        let take = len.min(self.rx.len());
        Ok(self.rx.drain(..take).collect())
    }

    fn pending(&mut self) -> mdioctl_core::Result<usize> {
        Ok(self.rx.len())
    }
}
