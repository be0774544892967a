//! FTDI MPSSE protocol constants and MDIO frame encoding
//!
//! MDIO is bit-banged over the MPSSE byte shifter: SK drives MDC, DO
//! drives MDIO out, DI samples MDIO in. A clause-22 frame is shifted out
//! MSB first as ten bytes:
//!
//! ```text
//! FF FF FF FF | ST+OP+PHY[4:1] | PHY[0]+REG+TA | DATA_HI DATA_LO | 7F 87
//!   preamble  |      address frame (2)         |    data (2)     | end
//! ```
//!
//! Every frame is prefixed with a shift command and its length:
//! `[cmd, len_lo, len_hi, ...frame]` where `len = frame.len() - 1`.

use bitflags::bitflags;

// ============================================================================
// USB VID/PID constants
// ============================================================================

/// FTDI vendor ID
pub const FTDI_VID: u16 = 0x0403;

/// PID of the two-port FT2232H
pub const FTDI_FT2232H_PID: u16 = 0x6010;

/// PID of the four-port FT4232H
pub const FTDI_FT4232H_PID: u16 = 0x6011;

/// PID of the one-port FT232H
pub const FTDI_FT232H_PID: u16 = 0x6014;

/// PID of the four-port FT4233H
pub const FTDI_FT4233H_PID: u16 = 0x6041;

// ============================================================================
// MPSSE Commands
// ============================================================================

bitflags! {
    /// Data shifting command byte
    ///
    /// Bit layout of the MPSSE shift opcodes (0x10-0x3F).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShiftCommand: u8 {
        /// Clock data out on the negative edge
        const WRITE_NEG = 0x01;
        /// Shift bits instead of bytes
        const BITMODE   = 0x02;
        /// Sample data in on the negative edge
        const READ_NEG  = 0x04;
        /// LSB first
        const LSB       = 0x08;
        /// Drive data out
        const DO_WRITE  = 0x10;
        /// Capture data in
        const DO_READ   = 0x20;
    }
}

impl ShiftCommand {
    /// Bytes out, MSB first, rising edge (0x10)
    pub const MDIO_WRITE: ShiftCommand = ShiftCommand::DO_WRITE;

    /// Bytes out and in, MSB first, sampling on the falling edge (0x34)
    pub const MDIO_READ: ShiftCommand = ShiftCommand::DO_WRITE
        .union(ShiftCommand::DO_READ)
        .union(ShiftCommand::READ_NEG);
}

/// Set data bits low byte
pub const SET_BITS_LOW: u8 = 0x80;

/// Set data bits high byte
pub const SET_BITS_HIGH: u8 = 0x82;

/// Set clock divisor
pub const TCK_DIVISOR: u8 = 0x86;

/// Flush the chip's read buffer to the host
pub const SEND_IMMEDIATE: u8 = 0x87;

/// Run the shifter from the 60 MHz master clock
pub const DIS_DIV_5: u8 = 0x8A;

/// Run the shifter from the 12 MHz legacy clock
pub const EN_DIV_5: u8 = 0x8B;

/// Enable 3-phase clocking
pub const EN_3_PHASE: u8 = 0x8C;

/// Disable 3-phase clocking
pub const DIS_3_PHASE: u8 = 0x8D;

/// Enable adaptive clocking
pub const CLK_ADAPTIVE: u8 = 0x96;

/// Disable adaptive clocking
pub const CLK_NO_ADAPTIVE: u8 = 0x97;

/// Pin mask passed with the MPSSE bit mode
pub const MPSSE_PIN_MASK: u8 = 0x0B;

/// Default clock divisor
pub const DEFAULT_DIVISOR: u16 = 0x000D;

/// Default read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u32 = 100;

/// Default write timeout in milliseconds
pub const DEFAULT_WRITE_TIMEOUT_MS: u32 = 5000;

// ============================================================================
// Pin assignments (low byte)
//
// bit 0 SK = MDC
// bit 1 DO = MDIO out
// bit 2 DI = MDIO in
// bit 3 CS = unused, held high
// ============================================================================

/// MDC pin
pub const PIN_SK: u8 = 0;

/// MDIO output pin
pub const PIN_DO: u8 = 1;

/// MDIO input pin
pub const PIN_DI: u8 = 2;

/// Chip-select pin
pub const PIN_CS: u8 = 3;

/// Which GPIO byte a pin lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioBank {
    Low,
    High,
}

/// Initial output levels, applied during bring-up
///
/// Only pins given a level are made outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpioConfig {
    low_value: u8,
    low_dir: u8,
    high_value: u8,
    high_dir: u8,
}

impl GpioConfig {
    /// MDC and MDIO out idle high
    pub fn mdio_default() -> Self {
        Self::default()
            .level(GpioBank::Low, PIN_SK, true)
            .level(GpioBank::Low, PIN_DO, true)
    }

    /// Drive `pin` of `bank` to `high` after bring-up
    pub fn level(mut self, bank: GpioBank, pin: u8, high: bool) -> Self {
        let bit = 1u8 << (pin & 7);
        let (value, dir) = match bank {
            GpioBank::Low => (&mut self.low_value, &mut self.low_dir),
            GpioBank::High => (&mut self.high_value, &mut self.high_dir),
        };
        *dir |= bit;
        if high {
            *value |= bit;
        } else {
            *value &= !bit;
        }
        self
    }

    /// Set-bits commands for every bank with at least one output
    pub fn commands(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(6);
        if self.low_dir != 0 {
            buf.extend_from_slice(&[SET_BITS_LOW, self.low_value, self.low_dir]);
        }
        if self.high_dir != 0 {
            buf.extend_from_slice(&[SET_BITS_HIGH, self.high_value, self.high_dir]);
        }
        buf
    }
}

/// Clock options applied during bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    pub divisor: u16,
    pub divide_by_5: bool,
    pub adaptive: bool,
    pub three_phase: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            divisor: DEFAULT_DIVISOR,
            divide_by_5: false,
            adaptive: false,
            three_phase: true,
        }
    }
}

impl ClockConfig {
    /// Prescaler, adaptive clocking and 3-phase opcodes
    pub fn mode_commands(&self) -> [u8; 3] {
        [
            if self.divide_by_5 { EN_DIV_5 } else { DIS_DIV_5 },
            if self.adaptive {
                CLK_ADAPTIVE
            } else {
                CLK_NO_ADAPTIVE
            },
            if self.three_phase {
                EN_3_PHASE
            } else {
                DIS_3_PHASE
            },
        ]
    }

    /// Divisor command
    pub fn divisor_command(&self) -> [u8; 3] {
        [
            TCK_DIVISOR,
            (self.divisor & 0xFF) as u8,
            (self.divisor >> 8) as u8,
        ]
    }
}

// ============================================================================
// MDIO frames
// ============================================================================

/// MDIO preamble: 32 ones
pub const PREAMBLE: [u8; 4] = [0xFF; 4];

/// Frame end: idle line plus send-immediate
pub const FRAME_END: [u8; 2] = [0x7F, SEND_IMMEDIATE];

/// Clause-22 frame length
pub const FRAME22_LEN: usize = 10;

/// Clause-45 frame length
pub const FRAME45_LEN: usize = 8;

/// Offset of the data bytes inside a frame
pub const DATA_OFFSET: usize = 6;

/// Clause-22 start + read opcode
pub const OP22_READ: u8 = 0x60;

/// Clause-22 start + write opcode
pub const OP22_WRITE: u8 = 0x50;

/// Clause-45 address opcode
pub const OP45_ADDRESS: u8 = 0x00;

/// Clause-45 write opcode
pub const OP45_WRITE: u8 = 0x10;

/// Clause-45 read opcode
pub const OP45_READ: u8 = 0x30;

/// Direction of an MDIO transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdioOp {
    Read,
    Write,
}

/// Both address fields are five bits wide
fn address_bytes(opcode: u8, phy: u8, reg: u16) -> [u8; 2] {
    let phy = phy & 0x1F;
    let reg = reg & 0x1F;
    [
        (0x0F & (phy >> 1)) | opcode,
        ((u16::from(phy) << 7) | (reg << 2) | 0x02) as u8,
    ]
}

fn data_bytes(op: MdioOp, data: u16) -> [u8; 2] {
    match op {
        MdioOp::Read => [0xFF, 0xFF],
        MdioOp::Write => data.to_be_bytes(),
    }
}

/// Build a clause-22 frame
///
/// `data` is ignored for reads; the data phase is left high so the phy
/// can drive it.
pub fn clause22_frame(op: MdioOp, phy: u8, reg: u16, data: u16) -> [u8; FRAME22_LEN] {
    let opcode = match op {
        MdioOp::Read => OP22_READ,
        MdioOp::Write => OP22_WRITE,
    };
    let mut frame = [0u8; FRAME22_LEN];
    frame[..4].copy_from_slice(&PREAMBLE);
    frame[4..6].copy_from_slice(&address_bytes(opcode, phy, reg));
    frame[6..8].copy_from_slice(&data_bytes(op, data));
    frame[8..].copy_from_slice(&FRAME_END);
    frame
}

/// Build the two clause-45 frames: address set, then the operation
pub fn clause45_frames(
    op: MdioOp,
    phy: u8,
    dev: u8,
    reg: u16,
    data: u16,
) -> ([u8; FRAME45_LEN], [u8; FRAME45_LEN]) {
    let opcode = match op {
        MdioOp::Read => OP45_READ,
        MdioOp::Write => OP45_WRITE,
    };

    let mut address = [0u8; FRAME45_LEN];
    address[..4].copy_from_slice(&PREAMBLE);
    address[4..6].copy_from_slice(&address_bytes(OP45_ADDRESS, phy, u16::from(dev)));
    address[6..].copy_from_slice(&reg.to_be_bytes());

    let mut operation = [0u8; FRAME45_LEN];
    operation[..4].copy_from_slice(&PREAMBLE);
    operation[4..6].copy_from_slice(&address_bytes(opcode, phy, u16::from(dev)));
    operation[6..].copy_from_slice(&data_bytes(op, data));

    (address, operation)
}

/// Prefix `payload` with a shift command and its length
pub fn write_buffer(cmd: ShiftCommand, payload: &[u8]) -> Vec<u8> {
    let len = payload.len().saturating_sub(1);
    let mut buf = Vec::with_capacity(payload.len() + 3);
    buf.push(cmd.bits());
    buf.push((len & 0xFF) as u8);
    buf.push(((len >> 8) & 0xFF) as u8);
    buf.extend_from_slice(payload);
    buf
}

/// Big-endian value at the data offset of the last `frame_len` bytes
pub fn extract_value(rx: &[u8], frame_len: usize) -> Option<u16> {
    let start = rx.len().checked_sub(frame_len)?;
    let frame = &rx[start..];
    Some(u16::from_be_bytes([frame[DATA_OFFSET], frame[DATA_OFFSET + 1]]))
}

// ============================================================================
// Supported device types
// ============================================================================

/// MPSSE-capable chips the transport can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtdiDeviceType {
    /// One MPSSE port
    #[default]
    Ft232H,
    /// Ports A and B
    Ft2232H,
    /// Ports A-D, MPSSE on A and B
    Ft4232H,
    /// Ports A-D, MPSSE on A and B
    Ft4233H,
}

impl FtdiDeviceType {
    /// USB vendor ID
    pub fn vendor_id(&self) -> u16 {
        FTDI_VID
    }

    /// USB product ID
    pub fn product_id(&self) -> u16 {
        match self {
            FtdiDeviceType::Ft232H => FTDI_FT232H_PID,
            FtdiDeviceType::Ft2232H => FTDI_FT2232H_PID,
            FtdiDeviceType::Ft4232H => FTDI_FT4232H_PID,
            FtdiDeviceType::Ft4233H => FTDI_FT4233H_PID,
        }
    }

    /// Number of ports on the chip
    pub fn channel_count(&self) -> u8 {
        match self {
            FtdiDeviceType::Ft232H => 1,
            FtdiDeviceType::Ft2232H => 2,
            FtdiDeviceType::Ft4232H | FtdiDeviceType::Ft4233H => 4,
        }
    }

    /// Accepts `232h`, `ft2232h` and similar, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "232h" | "ft232h" => Some(FtdiDeviceType::Ft232H),
            "2232h" | "ft2232h" => Some(FtdiDeviceType::Ft2232H),
            "4232h" | "ft4232h" => Some(FtdiDeviceType::Ft4232H),
            "4233h" | "ft4233h" => Some(FtdiDeviceType::Ft4233H),
            _ => None,
        }
    }

    /// Marketing name, e.g. `FT2232H`
    pub fn name(&self) -> &'static str {
        match self {
            FtdiDeviceType::Ft232H => "FT232H",
            FtdiDeviceType::Ft2232H => "FT2232H",
            FtdiDeviceType::Ft4232H => "FT4232H",
            FtdiDeviceType::Ft4233H => "FT4233H",
        }
    }

    /// Look up a device type by USB IDs
    pub fn from_ids(vid: u16, pid: u16) -> Option<Self> {
        SUPPORTED_DEVICES
            .iter()
            .copied()
            .find(|d| d.vendor_id() == vid && d.product_id() == pid)
    }
}

/// All device types, in probing order
pub const SUPPORTED_DEVICES: &[FtdiDeviceType] = &[
    FtdiDeviceType::Ft232H,
    FtdiDeviceType::Ft2232H,
    FtdiDeviceType::Ft4232H,
    FtdiDeviceType::Ft4233H,
];

/// Chip port carrying the MDIO lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtdiInterface {
    /// Channel A (default)
    #[default]
    A,
    /// Channel B
    B,
    /// Channel C
    C,
    /// Channel D
    D,
}

impl FtdiInterface {
    /// `A`-`D`, either case
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(FtdiInterface::A),
            'B' => Some(FtdiInterface::B),
            'C' => Some(FtdiInterface::C),
            'D' => Some(FtdiInterface::D),
            _ => None,
        }
    }

    /// Zero-based port number
    pub fn index(&self) -> u8 {
        match self {
            FtdiInterface::A => 0,
            FtdiInterface::B => 1,
            FtdiInterface::C => 2,
            FtdiInterface::D => 3,
        }
    }

    /// Get the channel letter
    pub fn letter(&self) -> char {
        (b'A' + self.index()) as char
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_commands() {
        assert_eq!(ShiftCommand::MDIO_WRITE.bits(), 0x10);
        assert_eq!(ShiftCommand::MDIO_READ.bits(), 0x34);
    }

    #[test]
    fn test_clause22_write_frame() {
        let frame = clause22_frame(MdioOp::Write, 0x1a, 0x1f, 0xABCD);
        assert_eq!(&frame[..4], &[0xFF; 4]);
        assert_eq!(frame[4], (0x0F & (0x1a >> 1)) | 0x50);
        assert_eq!(frame[5], (((0x1a_u16 << 7) | (0x1f << 2) | 0x02) & 0xFF) as u8);
        assert_eq!(&frame[6..], &[0xAB, 0xCD, 0x7F, 0x87]);
    }

    #[test]
    fn test_clause22_read_frame() {
        let frame = clause22_frame(MdioOp::Read, 0x01, 0x02, 0x1234);
        assert_eq!(
            frame,
            [0xFF, 0xFF, 0xFF, 0xFF, 0x60, 0x8A, 0xFF, 0xFF, 0x7F, 0x87]
        );
    }

    #[test]
    fn test_clause22_fields_do_not_overlap() {
        let high_reg = clause22_frame(MdioOp::Read, 0x1a, 0x20, 0);
        let next_phy = clause22_frame(MdioOp::Read, 0x1b, 0x00, 0);
        assert_ne!(high_reg[4..6], next_phy[4..6]);
        assert_eq!(high_reg, clause22_frame(MdioOp::Read, 0x1a, 0x00, 0));
        assert_eq!(
            clause22_frame(MdioOp::Read, 0x3a, 0x01, 0),
            clause22_frame(MdioOp::Read, 0x1a, 0x01, 0)
        );
    }

    #[test]
    fn test_clause45_frames() {
        let (address, operation) = clause45_frames(MdioOp::Write, 0x02, 0x01, 0x1234, 0xBEEF);
        assert_eq!(address, [0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x06, 0x12, 0x34]);
        assert_eq!(operation, [0xFF, 0xFF, 0xFF, 0xFF, 0x11, 0x06, 0xBE, 0xEF]);

        let (_, operation) = clause45_frames(MdioOp::Read, 0x02, 0x01, 0x1234, 0);
        assert_eq!(&operation[4..], &[0x31, 0x06, 0xFF, 0xFF]);
    }

    #[test]
    fn test_write_buffer() {
        let buf = write_buffer(ShiftCommand::MDIO_WRITE, &[1, 2, 3]);
        assert_eq!(buf, vec![0x10, 0x02, 0x00, 1, 2, 3]);

        let long = vec![0u8; 300];
        let buf = write_buffer(ShiftCommand::MDIO_READ, &long);
        assert_eq!(&buf[..3], &[0x34, 0x2B, 0x01]);
    }

    #[test]
    fn test_extract_value() {
        let rx = [0, 0, 0, 0, 0, 0, 0x12, 0x34, 0xFF, 0xFF];
        assert_eq!(extract_value(&rx, FRAME22_LEN), Some(0x1234));
        assert_eq!(extract_value(&rx[..9], FRAME22_LEN), None);
    }

    #[test]
    fn test_gpio_and_clock_commands() {
        assert_eq!(GpioConfig::mdio_default().commands(), vec![0x80, 0x03, 0x03]);
        assert!(GpioConfig::default().commands().is_empty());
        let clock = ClockConfig::default();
        assert_eq!(clock.mode_commands(), [0x8A, 0x97, 0x8C]);
        assert_eq!(clock.divisor_command(), [0x86, 0x0D, 0x00]);
    }

    #[test]
    fn test_device_type_parse() {
        assert_eq!(FtdiDeviceType::parse("FT2232H"), Some(FtdiDeviceType::Ft2232H));
        assert_eq!(FtdiDeviceType::parse("232h"), Some(FtdiDeviceType::Ft232H));
        assert_eq!(FtdiDeviceType::parse("x"), None);
        assert_eq!(
            FtdiDeviceType::from_ids(FTDI_VID, FTDI_FT4232H_PID),
            Some(FtdiDeviceType::Ft4232H)
        );
        assert_eq!(FtdiInterface::C.letter(), 'C');
    }
}
