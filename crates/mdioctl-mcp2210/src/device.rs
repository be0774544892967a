//! MCP2210 MDIO bus

use mdioctl_core::driver::{BusFeatures, ByteTransport, MdioBus};
use mdioctl_core::error::{Result as CoreResult, TransportError};
use mdioctl_core::url::split_args;

use crate::error::{Mcp2210Error, Result};
use crate::protocol::*;

/// Driver scheme
pub const SCHEME: &str = "mcp2210";

/// Usage text shown by `list-drivers --verbose`
pub const HELP: &str = "\
MDIO over SPI through a Microchip MCP2210 USB-HID bridge.
URL: mcp2210://[cs=<0-7>][,index=<n>]
  cs    ::= chip select line to activate right after open
  index ::= which attached MCP2210 to use, default 0";

/// Configuration for an MCP2210 bus
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mcp2210Config {
    /// Index among attached MCP2210 devices
    pub index: usize,
    /// Chip select applied after open
    pub cs: Option<u8>,
}

/// Parse the argument string of an `mcp2210://` URL
pub fn parse_options(args: &str) -> Result<Mcp2210Config> {
    let mut config = Mcp2210Config::default();

    for item in split_args(args) {
        let (key, value) = item.split_once('=').ok_or_else(|| {
            Mcp2210Error::InvalidParameter(format!("Expected key=value, got '{}'", item))
        })?;
        match key.trim() {
            "cs" => {
                let cs: u8 = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|cs| *cs < CS_LINES)
                    .ok_or_else(|| {
                        Mcp2210Error::InvalidParameter(format!(
                            "Invalid chip select '{}': must be 0-7",
                            value
                        ))
                    })?;
                config.cs = Some(cs);
            }
            "index" => {
                config.index = value.trim().parse().map_err(|_| {
                    Mcp2210Error::InvalidParameter(format!("Invalid device index '{}'", value))
                })?;
            }
            _ => {
                log::warn!("Unknown MCP2210 option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

/// MDIO bus on an MCP2210
///
/// The chip select must be picked with [`MdioBus::select_device`] after
/// `open`; accesses before that go out on line 0 with a warning.
pub struct Mcp2210<P: ByteTransport> {
    pipe: P,
    config: Mcp2210Config,
    selected: Option<u8>,
    warned: bool,
}

impl<P: ByteTransport> Mcp2210<P> {
    pub fn new(pipe: P, config: Mcp2210Config) -> Self {
        Self {
            pipe,
            config,
            selected: None,
            warned: false,
        }
    }

    pub fn config(&self) -> &Mcp2210Config {
        &self.config
    }

    /// Active chip select, if one was picked
    pub fn selected(&self) -> Option<u8> {
        self.selected
    }

    pub fn pipe(&self) -> &P {
        &self.pipe
    }

    pub fn pipe_mut(&mut self) -> &mut P {
        &mut self.pipe
    }

    /// Send one report and return the answer
    fn exchange(&mut self, command: &[u8]) -> CoreResult<Vec<u8>> {
        self.pipe.write(&report(command))?;
        let answer = self.pipe.read(REPORT_LEN)?;
        if answer.len() < REPORT_LEN {
            return Err(Mcp2210Error::ShortReport(answer.len()).into());
        }
        Ok(answer)
    }

    /// Send a setup command and require a zero status
    fn command(&mut self, command: &[u8]) -> CoreResult<()> {
        let answer = self.exchange(command)?;
        let status = answer[1];
        if status != 0 {
            return Err(TransportError::Status {
                command: command[0],
                status,
            }
            .into());
        }
        Ok(())
    }

    fn check_selected(&mut self) {
        if self.selected.is_none() && !self.warned {
            log::warn!("MCP2210 accessed before a chip select was chosen, using line 0");
            self.warned = true;
        }
    }

    /// Run one MDIO frame, repeating the transfer until all of it came back
    fn transfer(&mut self, op: MdioOp, phy: u8, reg: u16, value: u16) -> CoreResult<Vec<u8>> {
        self.check_selected();

        let command = transfer_command(op, phy, (reg & 0x1F) as u8, value);
        log::debug!("MCP2210 {:?} frame {:02X?}", op, &command[FRAME_OFFSET..]);

        let mut frame = Vec::with_capacity(TRANSFER_BYTES);
        for _ in 0..MAX_EXCHANGES {
            let answer = self.exchange(&command)?;
            let rsp = Response::parse(&answer).ok_or(Mcp2210Error::ShortReport(answer.len()))?;
            if rsp.status != 0 {
                return Err(TransportError::Status {
                    command: CMD_TRANSFER,
                    status: rsp.status,
                }
                .into());
            }
            frame.extend_from_slice(rsp.payload);
            if frame.len() >= TRANSFER_BYTES {
                break;
            }
        }

        if frame.len() < TRANSFER_BYTES {
            return Err(TransportError::ReadTimeout {
                expected: TRANSFER_BYTES,
                received: frame.len(),
            }
            .into());
        }
        frame.truncate(TRANSFER_BYTES);

        let echo = op.echo_len();
        let sent = &command[FRAME_OFFSET..FRAME_OFFSET + echo];
        if sent != &frame[..echo] {
            return Err(TransportError::EchoMismatch {
                sent: sent.to_vec(),
                received: frame[..echo].to_vec(),
            }
            .into());
        }

        Ok(frame)
    }
}

#[cfg(feature = "usb")]
impl Mcp2210<crate::transport::HidPipe> {
    /// Build a USB-backed bus from a URL argument string
    pub fn from_args(args: &str) -> Result<Self> {
        let config = parse_options(args)?;
        let pipe = crate::transport::HidPipe::new(config.index);
        Ok(Self::new(pipe, config))
    }
}

impl<P: ByteTransport> MdioBus for Mcp2210<P> {
    fn name(&self) -> &'static str {
        "mcp2210"
    }

    fn features(&self) -> BusFeatures {
        BusFeatures::DEVICE_SELECT
    }

    fn open(&mut self) -> CoreResult<()> {
        self.selected = None;
        self.warned = false;
        self.pipe.open()?;

        self.command(&CANCEL)?;
        self.command(&CHIP_SETTINGS)?;
        self.command(&SPI_SETTINGS)?;
        log::info!("MCP2210 configured for MDIO");

        if let Some(cs) = self.config.cs {
            self.select_device(cs)?;
        }
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        self.selected = None;
        self.pipe.close()
    }

    fn read(&mut self, phy: u8, reg: u16) -> CoreResult<u16> {
        let frame = self.transfer(MdioOp::Read, phy, reg, 0)?;
        Ok(u16::from_be_bytes([frame[6], frame[7]]))
    }

    fn write(&mut self, phy: u8, reg: u16, value: u16) -> CoreResult<()> {
        self.transfer(MdioOp::Write, phy, reg, value)?;
        Ok(())
    }

    fn select_device(&mut self, index: u8) -> CoreResult<()> {
        if index >= CS_LINES {
            return Err(TransportError::InvalidParameter(format!(
                "chip select {} out of range 0-{}",
                index,
                CS_LINES - 1
            ))
            .into());
        }
        self.command(&chip_settings(index))?;
        log::debug!("MCP2210 chip select {}", index);
        self.selected = Some(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdioctl_core::Error;
    use std::collections::VecDeque;

    /// Answers transfers like a phy with one register value
    struct MockHid {
        sent: Vec<Vec<u8>>,
        rx: VecDeque<u8>,
        value: u16,
        /// Payload bytes returned per transfer answer
        chunk: usize,
        /// Status returned for this command byte
        fail: Option<(u8, u8)>,
        corrupt_echo: bool,
    }

    impl Default for MockHid {
        fn default() -> Self {
            Self {
                sent: Vec::new(),
                rx: VecDeque::new(),
                value: 0,
                chunk: TRANSFER_BYTES,
                fail: None,
                corrupt_echo: false,
            }
        }
    }

    impl MockHid {
        fn answer(&self, report: &[u8], offset: &mut usize) -> [u8; REPORT_LEN] {
            let mut answer = [0u8; REPORT_LEN];
            answer[0] = report[0];
            if let Some((cmd, status)) = self.fail {
                if cmd == report[0] {
                    answer[1] = status;
                    return answer;
                }
            }
            if report[0] == CMD_TRANSFER {
                let mut frame = [0u8; TRANSFER_BYTES];
                frame.copy_from_slice(&report[FRAME_OFFSET..FRAME_OFFSET + TRANSFER_BYTES]);
                if frame[4] >> 4 == OP_READ as u8 {
                    frame[6..8].copy_from_slice(&self.value.to_be_bytes());
                }
                if self.corrupt_echo {
                    frame[5] ^= 0x04;
                }
                let end = (*offset + self.chunk).min(TRANSFER_BYTES);
                let part = &frame[*offset..end];
                answer[2] = part.len() as u8;
                answer[4..4 + part.len()].copy_from_slice(part);
                *offset = if end == TRANSFER_BYTES { 0 } else { end };
            }
            answer
        }

        fn sent_commands(&self) -> Vec<u8> {
            self.sent.iter().map(|r| r[0]).collect()
        }
    }

    struct Pipe {
        hid: MockHid,
        offset: usize,
    }

    impl ByteTransport for Pipe {
        fn open(&mut self) -> CoreResult<()> {
            Ok(())
        }

        fn close(&mut self) -> CoreResult<()> {
            Ok(())
        }

        fn write(&mut self, data: &[u8]) -> CoreResult<()> {
            assert_eq!(data.len(), REPORT_LEN);
            let answer = self.hid.answer(data, &mut self.offset);
            self.hid.sent.push(data.to_vec());
            self.hid.rx.extend(answer);
            Ok(())
        }

        fn read(&mut self, len: usize) -> CoreResult<Vec<u8>> {
            let take = len.min(self.hid.rx.len());
            Ok(self.hid.rx.drain(..take).collect())
        }

        fn pending(&mut self) -> CoreResult<usize> {
            Ok(self.hid.rx.len())
        }
    }

    fn bus(hid: MockHid, cs: Option<u8>) -> Mcp2210<Pipe> {
        Mcp2210::new(
            Pipe { hid, offset: 0 },
            Mcp2210Config {
                index: 0,
                cs,
            },
        )
    }

    #[test]
    fn test_open_sends_setup_commands() {
        let mut bus = bus(MockHid::default(), None);
        bus.open().unwrap();
        assert_eq!(bus.pipe().hid.sent_commands(), vec![0x11, 0x21, 0x40]);
        assert_eq!(&bus.pipe().hid.sent[1][..17], &CHIP_SETTINGS);
        assert_eq!(&bus.pipe().hid.sent[2][..24], &SPI_SETTINGS);
        assert_eq!(bus.selected(), None);
    }

    #[test]
    fn test_open_applies_chip_select() {
        let mut bus = bus(MockHid::default(), Some(2));
        bus.open().unwrap();
        let sent = &bus.pipe().hid.sent;
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[3][CS_LEVEL_OFFSET], 0xFB);
        assert_eq!(bus.selected(), Some(2));
    }

    #[test]
    fn test_open_fails_on_status() {
        let hid = MockHid {
            fail: Some((CMD_SET_CHIP_SETTINGS, 0xF8)),
            ..Default::default()
        };
        let mut bus = bus(hid, None);
        match bus.open() {
            Err(Error::Transport(TransportError::Status { command, status })) => {
                assert_eq!(command, CMD_SET_CHIP_SETTINGS);
                assert_eq!(status, 0xF8);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(bus.pipe().hid.sent_commands(), vec![0x11, 0x21]);
    }

    #[test]
    fn test_read_value() {
        let hid = MockHid {
            value: 0x1234,
            ..Default::default()
        };
        let mut bus = bus(hid, Some(0));
        bus.open().unwrap();
        assert_eq!(bus.read(0x1a, 2).unwrap(), 0x1234);
    }

    #[test]
    fn test_read_accumulates_partial_answers() {
        let hid = MockHid {
            value: 0xBEEF,
            chunk: 3,
            ..Default::default()
        };
        let mut bus = bus(hid, Some(0));
        bus.open().unwrap();
        assert_eq!(bus.read(0x01, 0x03).unwrap(), 0xBEEF);

        let transfers = bus
            .pipe()
            .hid
            .sent
            .iter()
            .filter(|r| r[0] == CMD_TRANSFER)
            .count();
        assert_eq!(transfers, 3);
    }

    #[test]
    fn test_write_sends_value() {
        let mut bus = bus(MockHid::default(), Some(0));
        bus.open().unwrap();
        bus.write(0, 0, 0x1234).unwrap();

        let last = bus.pipe().hid.sent.last().unwrap();
        assert_eq!(&last[8..12], &[0x50, 0x02, 0x12, 0x34]);
    }

    #[test]
    fn test_echo_mismatch() {
        let hid = MockHid {
            corrupt_echo: true,
            ..Default::default()
        };
        let mut bus = bus(hid, Some(0));
        bus.open().unwrap();
        assert!(matches!(
            bus.read(0x1a, 1),
            Err(Error::Transport(TransportError::EchoMismatch { .. }))
        ));
    }

    #[test]
    fn test_no_payload_times_out() {
        let hid = MockHid {
            chunk: 0,
            ..Default::default()
        };
        let mut bus = bus(hid, Some(0));
        bus.open().unwrap();
        assert!(matches!(
            bus.read(0x1a, 1),
            Err(Error::Transport(TransportError::ReadTimeout {
                expected: 8,
                received: 0
            }))
        ));
        let transfers = bus
            .pipe()
            .hid
            .sent
            .iter()
            .filter(|r| r[0] == CMD_TRANSFER)
            .count();
        assert_eq!(transfers, MAX_EXCHANGES);
    }

    #[test]
    fn test_transfer_status_error() {
        let hid = MockHid {
            fail: Some((CMD_TRANSFER, 0xF7)),
            ..Default::default()
        };
        let mut bus = bus(hid, Some(0));
        bus.open().unwrap();
        assert!(bus.write(0x1a, 0, 1).is_err());
    }

    #[test]
    fn test_select_out_of_range() {
        let mut bus = bus(MockHid::default(), None);
        bus.open().unwrap();
        assert!(bus.select_device(8).is_err());
        assert_eq!(bus.selected(), None);
    }

    #[test]
    fn test_parse_options() {
        assert_eq!(parse_options("").unwrap(), Mcp2210Config::default());
        assert_eq!(parse_options("cs=3").unwrap().cs, Some(3));
        assert_eq!(parse_options("index=1,cs=0").unwrap().index, 1);
        assert!(parse_options("cs=8").is_err());
        assert!(parse_options("3").is_err());
    }
}
