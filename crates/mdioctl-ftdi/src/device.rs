//! FTDI MPSSE MDIO bus
//!
//! [`FtdiMdio`] turns register operations into MPSSE shift commands and
//! writes them to an [`MpssePipe`]. Reads capture the bits shifted in
//! during the frame and poll the pipe's queue until the whole frame has
//! come back.

use std::time::Duration;

use mdioctl_core::driver::{BusFeatures, ByteTransport, MdioBus};
use mdioctl_core::error::{Result as CoreResult, TransportError};
use mdioctl_core::url::split_args;

use crate::error::{FtdiError, Result};
use crate::protocol::*;
use crate::transport::{MpssePipe, PipeMode};

/// Driver scheme
pub const SCHEME: &str = "ftdi";

/// Usage text shown by `list-drivers --verbose`
pub const HELP: &str = "\
Bit-banged MDIO over an FTDI MPSSE channel.
URL: ftdi://[index][,type=<232h|2232h|4232h|4233h>][,port=<A-D>][,divisor=<n>][,gpiolN=<H|L>]
  index   ::= 0 (first matching device)
  divisor ::= MPSSE clock divisor, decimal or 0x-prefixed hex";

/// Poll attempts after the first pending-count check
const READ_POLL_RETRIES: u32 = 5;

/// Interval between pending-count polls
const READ_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Settle time after each bring-up step
const SETTLE_DELAY: Duration = Duration::from_millis(5);

/// Wait after the final purge
const PURGE_DELAY: Duration = Duration::from_millis(50);

/// Configuration for an FTDI MDIO bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtdiConfig {
    /// Device type (determines VID/PID)
    pub device_type: FtdiDeviceType,
    /// Channel wired to the MDIO bus
    pub interface: FtdiInterface,
    /// Index among matching devices
    pub index: usize,
    /// Clock options
    pub clock: ClockConfig,
    /// Initial output levels
    pub gpio: GpioConfig,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for FtdiConfig {
    fn default() -> Self {
        Self {
            device_type: FtdiDeviceType::default(),
            interface: FtdiInterface::default(),
            index: 0,
            clock: ClockConfig::default(),
            gpio: GpioConfig::mdio_default(),
            read_timeout: Duration::from_millis(u64::from(DEFAULT_READ_TIMEOUT_MS)),
            write_timeout: Duration::from_millis(u64::from(DEFAULT_WRITE_TIMEOUT_MS)),
        }
    }
}

impl FtdiConfig {
    /// Default configuration for a specific device type
    pub fn for_device(device_type: FtdiDeviceType) -> Self {
        Self {
            device_type,
            ..Self::default()
        }
    }

    /// Set the channel
    pub fn interface(mut self, interface: FtdiInterface) -> Result<Self> {
        let max_channel = self.device_type.channel_count();
        if interface.index() >= max_channel {
            return Err(FtdiError::InvalidChannel(format!(
                "Channel {} not available on {} (max: {})",
                interface.letter(),
                self.device_type.name(),
                (b'A' + max_channel - 1) as char
            )));
        }
        self.interface = interface;
        Ok(self)
    }

    /// Set the device index
    ///
    /// libftdi opens the first device matching VID/PID, so only index 0
    /// can be honoured.
    pub fn index(mut self, index: usize) -> Result<Self> {
        if index != 0 {
            return Err(FtdiError::InvalidParameter(format!(
                "Device index {} not supported: only the first {} can be opened",
                index,
                self.device_type.name()
            )));
        }
        self.index = index;
        Ok(self)
    }

    /// Set the MPSSE clock divisor
    pub fn divisor(mut self, divisor: u16) -> Self {
        self.clock.divisor = divisor;
        self
    }

    /// Drive GPIOL `pin` (0-3) high or low after bring-up
    pub fn gpiol(mut self, pin: u8, mode: char) -> Result<Self> {
        if pin > 3 {
            return Err(FtdiError::InvalidParameter(format!(
                "Invalid GPIOL pin {}: must be 0-3",
                pin
            )));
        }
        let high = match mode.to_ascii_uppercase() {
            'H' => true,
            'L' => false,
            _ => {
                return Err(FtdiError::InvalidParameter(format!(
                    "Invalid GPIOL mode '{}': must be H or L",
                    mode
                )))
            }
        };
        self.gpio = self.gpio.level(GpioBank::Low, pin + 4, high);
        Ok(self)
    }
}

fn parse_number(value: &str) -> Option<u16> {
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// Parse the argument string of an `ftdi://` URL
///
/// A leading bare item is the device index; the rest are `key=value`
/// options.
pub fn parse_options(args: &str) -> Result<FtdiConfig> {
    let mut config = FtdiConfig::default();

    for (position, item) in split_args(args).into_iter().enumerate() {
        let Some((key, value)) = item.split_once('=') else {
            if position != 0 {
                return Err(FtdiError::InvalidParameter(format!(
                    "Expected key=value, got '{}'",
                    item
                )));
            }
            let index: usize = item.parse().map_err(|_| {
                FtdiError::InvalidParameter(format!("Invalid device index '{}'", item))
            })?;
            config = config.index(index)?;
            continue;
        };

        match key.trim() {
            "type" => {
                let device_type = FtdiDeviceType::parse(value).ok_or_else(|| {
                    FtdiError::InvalidDeviceType(format!(
                        "Unknown device type '{}'. Valid types: 232h, 2232h, 4232h, 4233h",
                        value
                    ))
                })?;
                let interface = config.interface;
                config.device_type = device_type;
                // Re-validate the channel against the new type
                config = config.interface(interface)?;
            }
            "port" | "channel" => {
                let mut chars = value.chars();
                let interface = match (chars.next(), chars.next()) {
                    (Some(c), None) => FtdiInterface::from_char(c),
                    _ => None,
                }
                .ok_or_else(|| {
                    FtdiError::InvalidChannel(format!(
                        "Invalid channel '{}': must be A, B, C, or D",
                        value
                    ))
                })?;
                config = config.interface(interface)?;
            }
            "divisor" => {
                let divisor = parse_number(value).ok_or_else(|| {
                    FtdiError::InvalidParameter(format!("Invalid divisor '{}'", value))
                })?;
                config = config.divisor(divisor);
            }
            key if key.starts_with("gpiol") => {
                let pin: u8 = key[5..].parse().map_err(|_| {
                    FtdiError::InvalidParameter(format!("Invalid GPIOL pin '{}'", key))
                })?;
                let mut chars = value.chars();
                let mode = match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => {
                        return Err(FtdiError::InvalidParameter(format!(
                            "Invalid GPIOL mode '{}': must be H or L",
                            value
                        )))
                    }
                };
                config = config.gpiol(pin, mode)?;
            }
            _ => {
                log::warn!("Unknown FTDI option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

/// MDIO bus on an FTDI MPSSE channel
pub struct FtdiMdio<P: MpssePipe> {
    pipe: P,
    config: FtdiConfig,
    poll_interval: Duration,
}

impl<P: MpssePipe> FtdiMdio<P> {
    pub fn new(pipe: P, config: FtdiConfig) -> Self {
        Self {
            pipe,
            config,
            poll_interval: READ_POLL_INTERVAL,
        }
    }

    pub fn config(&self) -> &FtdiConfig {
        &self.config
    }

    pub fn pipe(&self) -> &P {
        &self.pipe
    }

    pub fn pipe_mut(&mut self) -> &mut P {
        &mut self.pipe
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn settle(&self, delay: Duration) {
        if !self.poll_interval.is_zero() {
            std::thread::sleep(delay);
        }
    }

    /// Bring the MPSSE engine up for MDIO
    fn bring_up(&mut self) -> CoreResult<()> {
        self.pipe.open()?;
        self.pipe.reset()?;

        let stale = self.pipe.pending()?;
        if stale > 0 {
            log::debug!("Draining {} stale bytes", stale);
            self.pipe.read(stale)?;
        }

        self.pipe
            .set_timeouts(self.config.read_timeout, self.config.write_timeout)?;
        self.pipe.set_mode(0, PipeMode::Reset)?;
        self.pipe.set_mode(MPSSE_PIN_MASK, PipeMode::Mpsse)?;
        self.settle(SETTLE_DELAY);

        log::debug!(
            "Clock divisor 0x{:04X}, div5={}, adaptive={}, 3-phase={}",
            self.config.clock.divisor,
            self.config.clock.divide_by_5,
            self.config.clock.adaptive,
            self.config.clock.three_phase
        );
        self.pipe.write(&self.config.clock.mode_commands())?;
        self.settle(SETTLE_DELAY);

        let mut buf = self.config.gpio.commands();
        buf.extend_from_slice(&self.config.clock.divisor_command());
        self.pipe.write(&buf)?;
        self.settle(SETTLE_DELAY);

        self.pipe.purge()?;
        self.settle(PURGE_DELAY);

        log::info!(
            "FTDI {} channel {} ready for MDIO",
            self.config.device_type.name(),
            self.config.interface.letter()
        );
        Ok(())
    }

    /// Wait until `expected` captured bytes are queued, then take them all
    fn collect(&mut self, expected: usize) -> CoreResult<Vec<u8>> {
        let mut available = self.pipe.pending()?;
        let mut retries = READ_POLL_RETRIES;
        while available < expected && retries > 0 {
            self.settle(self.poll_interval);
            available = self.pipe.pending()?;
            retries -= 1;
        }

        if available < expected {
            return Err(FtdiError::ShortRead {
                expected,
                received: available,
            }
            .into());
        }

        let rx = self.pipe.read(available)?;
        log::trace!("Captured {:02X?}", rx);
        Ok(rx)
    }

    fn value_of(rx: &[u8], frame_len: usize) -> CoreResult<u16> {
        extract_value(rx, frame_len).ok_or_else(|| {
            TransportError::ReadTimeout {
                expected: frame_len,
                received: rx.len(),
            }
            .into()
        })
    }
}

#[cfg(feature = "libftdi")]
impl FtdiMdio<crate::transport::LibFtdiPipe> {
    /// Build a libftdi-backed bus from a URL argument string
    pub fn from_args(args: &str) -> Result<Self> {
        let config = parse_options(args)?;
        let pipe = crate::transport::LibFtdiPipe::new(config.device_type, config.interface);
        Ok(Self::new(pipe, config))
    }
}

impl<P: MpssePipe> MdioBus for FtdiMdio<P> {
    fn name(&self) -> &'static str {
        "ftdi"
    }

    fn features(&self) -> BusFeatures {
        BusFeatures::CLAUSE_45
    }

    fn open(&mut self) -> CoreResult<()> {
        self.bring_up()
    }

    fn close(&mut self) -> CoreResult<()> {
        self.pipe.close()
    }

    fn read(&mut self, phy: u8, reg: u16) -> CoreResult<u16> {
        let frame = clause22_frame(MdioOp::Read, phy, reg, 0);
        log::debug!("C22 read phy 0x{:02x} reg 0x{:02x}: {:02X?}", phy, reg, frame);
        self.pipe.write(&write_buffer(ShiftCommand::MDIO_READ, &frame))?;
        let rx = self.collect(FRAME22_LEN)?;
        Self::value_of(&rx, FRAME22_LEN)
    }

    fn write(&mut self, phy: u8, reg: u16, value: u16) -> CoreResult<()> {
        let frame = clause22_frame(MdioOp::Write, phy, reg, value);
        log::debug!(
            "C22 write phy 0x{:02x} reg 0x{:02x} = 0x{:04x}: {:02X?}",
            phy,
            reg,
            value,
            frame
        );
        self.pipe.write(&write_buffer(ShiftCommand::MDIO_WRITE, &frame))
    }

    fn read_c45(&mut self, phy: u8, dev: u8, reg: u16) -> CoreResult<u16> {
        let (address, operation) = clause45_frames(MdioOp::Read, phy, dev, reg, 0);
        log::debug!(
            "C45 read phy 0x{:02x} dev 0x{:02x} reg 0x{:04x}",
            phy,
            dev,
            reg
        );
        let mut buf = write_buffer(ShiftCommand::MDIO_WRITE, &address);
        buf.extend_from_slice(&write_buffer(ShiftCommand::MDIO_READ, &operation));
        self.pipe.write(&buf)?;
        let rx = self.collect(FRAME45_LEN)?;
        Self::value_of(&rx, FRAME45_LEN)
    }

    fn write_c45(&mut self, phy: u8, dev: u8, reg: u16, value: u16) -> CoreResult<()> {
        let (address, operation) = clause45_frames(MdioOp::Write, phy, dev, reg, value);
        log::debug!(
            "C45 write phy 0x{:02x} dev 0x{:02x} reg 0x{:04x} = 0x{:04x}",
            phy,
            dev,
            reg,
            value
        );
        let mut buf = write_buffer(ShiftCommand::MDIO_WRITE, &address);
        buf.extend_from_slice(&write_buffer(ShiftCommand::MDIO_WRITE, &operation));
        self.pipe.write(&buf)
    }
}

/// Information about a connected FTDI device
#[derive(Debug, Clone)]
pub struct FtdiDeviceInfo {
    /// USB bus identifier
    pub bus: String,
    /// USB device address
    pub address: u8,
    pub device_type: FtdiDeviceType,
}

impl std::fmt::Display for FtdiDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FTDI {} at bus {} address {} ({:04X}:{:04X})",
            self.device_type.name(),
            self.bus,
            self.address,
            self.device_type.vendor_id(),
            self.device_type.product_id()
        )
    }
}

/// List attached FTDI devices of the supported types
#[cfg(feature = "libftdi")]
pub fn list_devices() -> Result<Vec<FtdiDeviceInfo>> {
    use nusb::MaybeFuture;

    let devices = nusb::list_devices()
        .wait()?
        .filter_map(|d| {
            FtdiDeviceType::from_ids(d.vendor_id(), d.product_id()).map(|device_type| {
                FtdiDeviceInfo {
                    bus: d.bus_id().to_string(),
                    address: d.device_address(),
                    device_type,
                }
            })
        })
        .collect();

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdioctl_core::Error;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Open,
        Close,
        Reset,
        Timeouts,
        Mode(u8, PipeMode),
        Purge,
        Write(Vec<u8>),
        Read(usize),
    }

    /// Records every call; captured bytes are queued by the test
    #[derive(Default)]
    struct MockPipe {
        calls: Vec<Call>,
        rx: VecDeque<u8>,
    }

    impl MockPipe {
        fn writes(&self) -> Vec<Vec<u8>> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Write(data) => Some(data.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl ByteTransport for MockPipe {
        fn open(&mut self) -> CoreResult<()> {
            self.calls.push(Call::Open);
            Ok(())
        }

        fn close(&mut self) -> CoreResult<()> {
            self.calls.push(Call::Close);
            Ok(())
        }

        fn write(&mut self, data: &[u8]) -> CoreResult<()> {
            self.calls.push(Call::Write(data.to_vec()));
            Ok(())
        }

        fn read(&mut self, len: usize) -> CoreResult<Vec<u8>> {
            self.calls.push(Call::Read(len));
            let take = len.min(self.rx.len());
            Ok(self.rx.drain(..take).collect())
        }

        fn pending(&mut self) -> CoreResult<usize> {
            Ok(self.rx.len())
        }
    }

    impl MpssePipe for MockPipe {
        fn reset(&mut self) -> CoreResult<()> {
            self.calls.push(Call::Reset);
            Ok(())
        }

        fn set_timeouts(&mut self, _read: Duration, _write: Duration) -> CoreResult<()> {
            self.calls.push(Call::Timeouts);
            Ok(())
        }

        fn set_mode(&mut self, mask: u8, mode: PipeMode) -> CoreResult<()> {
            self.calls.push(Call::Mode(mask, mode));
            Ok(())
        }

        fn purge(&mut self) -> CoreResult<()> {
            self.calls.push(Call::Purge);
            self.rx.clear();
            Ok(())
        }
    }

    fn bus() -> FtdiMdio<MockPipe> {
        FtdiMdio::new(MockPipe::default(), FtdiConfig::default())
            .with_poll_interval(Duration::ZERO)
    }

    fn open_bus() -> FtdiMdio<MockPipe> {
        let mut bus = bus();
        bus.open().unwrap();
        bus.pipe_mut().calls.clear();
        bus
    }

    #[test]
    fn test_bring_up_sequence() {
        let mut bus = bus();
        bus.pipe_mut().rx.extend([0xAA, 0xBB]);
        bus.open().unwrap();

        assert_eq!(
            bus.pipe().calls,
            vec![
                Call::Open,
                Call::Reset,
                Call::Read(2),
                Call::Timeouts,
                Call::Mode(0, PipeMode::Reset),
                Call::Mode(0x0B, PipeMode::Mpsse),
                Call::Write(vec![0x8A, 0x97, 0x8C]),
                Call::Write(vec![0x80, 0x03, 0x03, 0x86, 0x0D, 0x00]),
                Call::Purge,
            ]
        );
    }

    #[test]
    fn test_write_frame_bytes() {
        let mut bus = open_bus();
        bus.write(0x1a, 0x1f, 0xBEEF).unwrap();

        let frame = clause22_frame(MdioOp::Write, 0x1a, 0x1f, 0xBEEF);
        let mut expected = vec![0x10, 0x09, 0x00];
        expected.extend_from_slice(&frame);
        assert_eq!(bus.pipe().writes(), vec![expected]);
        assert_eq!(&frame[6..8], &[0xBE, 0xEF]);
    }

    #[test]
    fn test_read_returns_data_phase() {
        let mut bus = open_bus();
        let mut captured = clause22_frame(MdioOp::Read, 0x1a, 2, 0);
        captured[6] = 0x00;
        captured[7] = 0x1c;
        bus.pipe_mut().rx.extend(captured);

        assert_eq!(bus.read(0x1a, 2).unwrap(), 0x001c);
        let writes = bus.pipe().writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0][0], ShiftCommand::MDIO_READ.bits());
        assert_eq!(writes[0][1], 9);
    }

    #[test]
    fn test_short_read_times_out() {
        let mut bus = open_bus();
        bus.pipe_mut().rx.extend([0xFF; 4]);

        match bus.read(0, 0) {
            Err(Error::Transport(TransportError::ReadTimeout { expected, received })) => {
                assert_eq!(expected, 10);
                assert_eq!(received, 4);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_clause45_write_sends_both_frames() {
        let mut bus = open_bus();
        bus.write_c45(0x02, 0x01, 0x1234, 0x5678).unwrap();

        let writes = bus.pipe().writes();
        assert_eq!(writes.len(), 1);
        let buf = &writes[0];
        assert_eq!(buf.len(), 2 * (3 + FRAME45_LEN));
        assert_eq!(buf[0], ShiftCommand::MDIO_WRITE.bits());
        assert_eq!(&buf[9..11], &[0x12, 0x34]);
        assert_eq!(buf[11], ShiftCommand::MDIO_WRITE.bits());
        assert_eq!(&buf[20..22], &[0x56, 0x78]);
    }

    #[test]
    fn test_clause45_read_captures_operation_frame() {
        let mut bus = open_bus();
        bus.pipe_mut()
            .rx
            .extend([0xFF, 0xFF, 0xFF, 0xFF, 0x30, 0x06, 0xCA, 0xFE]);

        assert_eq!(bus.read_c45(0x00, 0x01, 0x0002).unwrap(), 0xCAFE);
        let buf = &bus.pipe().writes()[0];
        assert_eq!(buf[11], ShiftCommand::MDIO_READ.bits());
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options("").unwrap();
        assert_eq!(config, FtdiConfig::default());

        let config = parse_options("0,type=2232h,port=B,divisor=0x20").unwrap();
        assert_eq!(config.device_type, FtdiDeviceType::Ft2232H);
        assert_eq!(config.interface, FtdiInterface::B);
        assert_eq!(config.clock.divisor, 0x20);

        let config = parse_options("gpiol1=H").unwrap();
        assert_eq!(&config.gpio.commands()[..3], &[0x80, 0x23, 0x23]);
    }

    #[test]
    fn test_parse_options_rejects_bad_values() {
        assert!(parse_options("1").is_err());
        assert!(parse_options("port=B").is_err());
        assert!(parse_options("type=9000").is_err());
        assert!(parse_options("divisor=abc").is_err());
        assert!(parse_options("type=232h,3").is_err());
        assert!(parse_options("gpiol7=H").is_err());
    }
}
