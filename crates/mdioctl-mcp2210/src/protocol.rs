//! MCP2210 protocol constants and report builders
//!
//! The MCP2210 is a USB HID to SPI bridge. Every command is a 64-byte
//! output report and every answer a 64-byte input report. MDIO frames are
//! shifted out as 8-byte SPI transfers, the phy answering on MISO during
//! the data phase.

// ============================================================================
// USB identifiers
// ============================================================================

/// Microchip vendor ID
pub const MCP2210_VID: u16 = 0x04D8;

/// MCP2210 product ID
pub const MCP2210_PID: u16 = 0x00DE;

/// HID interface number
pub const HID_INTERFACE: u8 = 0;

/// Interrupt OUT endpoint
pub const EP_OUT: u8 = 0x01;

/// Interrupt IN endpoint
pub const EP_IN: u8 = 0x81;

/// Size of every HID report
pub const REPORT_LEN: usize = 64;

// ============================================================================
// Commands
// ============================================================================

/// Cancel the current SPI transfer
pub const CMD_CANCEL: u8 = 0x11;

/// Set chip settings (GPIO designation, idle/active levels)
pub const CMD_SET_CHIP_SETTINGS: u8 = 0x21;

/// Set SPI transfer settings
pub const CMD_SET_SPI_SETTINGS: u8 = 0x40;

/// Transfer SPI data
pub const CMD_TRANSFER: u8 = 0x42;

/// Cancel report
pub const CANCEL: [u8; 4] = [CMD_CANCEL, 0x00, 0x00, 0x00];

/// Chip settings: all pins GPIO except chip select 0 idle high
pub const CHIP_SETTINGS: [u8; 17] = [
    CMD_SET_CHIP_SETTINGS,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0xFE,
    0x01,
    0x00,
    0x00,
];

/// Byte of [`CHIP_SETTINGS`] holding the GPIO output levels
pub const CS_LEVEL_OFFSET: usize = 13;

/// Number of chip-select lines
pub const CS_LINES: u8 = 8;

/// SPI settings: 8-byte transfers, mode 0
pub const SPI_SETTINGS: [u8; 24] = [
    CMD_SET_SPI_SETTINGS,
    0x00,
    0x00,
    0x00,
    0x20,
    0xA1,
    0x07,
    0x00,
    0xFF,
    0x01,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x08,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
];

// ============================================================================
// MDIO transfers
// ============================================================================

/// Bytes clocked per MDIO transfer
pub const TRANSFER_BYTES: usize = 8;

/// Exchanges allowed to collect one transfer
pub const MAX_EXCHANGES: usize = 16;

/// Read opcode nibble
pub const OP_READ: u16 = 0x6;

/// Write opcode nibble
pub const OP_WRITE: u16 = 0x5;

/// Echoed bytes compared after a read (preamble and header)
pub const ECHO_READ_LEN: usize = 6;

/// Echoed bytes compared after a write (whole frame)
pub const ECHO_WRITE_LEN: usize = 8;

/// Offset of the MDIO frame inside a transfer report
pub const FRAME_OFFSET: usize = 4;

/// Direction of an MDIO transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdioOp {
    Read,
    Write,
}

impl MdioOp {
    fn opcode(self) -> u16 {
        match self {
            MdioOp::Read => OP_READ,
            MdioOp::Write => OP_WRITE,
        }
    }

    /// Bytes of the echo that must match what was sent
    pub fn echo_len(self) -> usize {
        match self {
            MdioOp::Read => ECHO_READ_LEN,
            MdioOp::Write => ECHO_WRITE_LEN,
        }
    }
}

/// Start, opcode, phy, register and turnaround packed in one word
pub fn mdio_header(op: MdioOp, phy: u8, reg: u8) -> u16 {
    (op.opcode() << 12)
        | (u16::from(phy & 0x1F) << 7)
        | (u16::from(reg & 0x1F) << 2)
        | 0x2
}

/// Transfer report for one MDIO frame
///
/// Reads leave the data phase high; writes carry `value` big-endian.
pub fn transfer_command(op: MdioOp, phy: u8, reg: u8, value: u16) -> [u8; 12] {
    let header = mdio_header(op, phy, reg).to_be_bytes();
    let trailer = match op {
        MdioOp::Read => [0xFF, 0xFF],
        MdioOp::Write => value.to_be_bytes(),
    };
    [
        CMD_TRANSFER,
        TRANSFER_BYTES as u8,
        0x00,
        0x00,
        0xFF,
        0xFF,
        0xFF,
        0xFF,
        header[0],
        header[1],
        trailer[0],
        trailer[1],
    ]
}

/// Chip settings with only line `cs` driven low
pub fn chip_settings(cs: u8) -> [u8; 17] {
    let mut settings = CHIP_SETTINGS;
    settings[CS_LEVEL_OFFSET] = 0xFF ^ (1u8 << (cs & 0x07));
    settings
}

/// Zero-pad a command to a full report
pub fn report(command: &[u8]) -> [u8; REPORT_LEN] {
    let mut buf = [0u8; REPORT_LEN];
    let len = command.len().min(REPORT_LEN);
    buf[..len].copy_from_slice(&command[..len]);
    buf
}

/// Decoded input report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<'a> {
    pub command: u8,
    pub status: u8,
    pub payload: &'a [u8],
}

impl<'a> Response<'a> {
    /// Split a report into status and payload
    ///
    /// The payload length is clamped to what the report can hold.
    pub fn parse(report: &'a [u8]) -> Option<Self> {
        if report.len() < FRAME_OFFSET {
            return None;
        }
        let len = usize::from(report[2]).min(report.len() - FRAME_OFFSET);
        Some(Self {
            command: report[0],
            status: report[1],
            payload: &report[FRAME_OFFSET..FRAME_OFFSET + len],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_header() {
        let cmd = transfer_command(MdioOp::Read, 0, 0, 0);
        assert_eq!(&cmd[8..10], &[0x60, 0x02]);
        assert_eq!(&cmd[10..12], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_write_trailer() {
        let cmd = transfer_command(MdioOp::Write, 0, 0, 0x1234);
        assert_eq!(&cmd[8..10], &[0x50, 0x02]);
        assert_eq!(&cmd[10..12], &[0x12, 0x34]);
    }

    #[test]
    fn test_header_masks_phy_and_reg() {
        assert_eq!(mdio_header(MdioOp::Read, 0x1a, 0x1f), 0x6D7E);
        assert_eq!(
            mdio_header(MdioOp::Read, 0x3a, 0x3f),
            mdio_header(MdioOp::Read, 0x1a, 0x1f)
        );
    }

    #[test]
    fn test_chip_settings_select_line() {
        assert_eq!(chip_settings(0)[CS_LEVEL_OFFSET], 0xFE);
        assert_eq!(chip_settings(3)[CS_LEVEL_OFFSET], 0xF7);
        assert_eq!(chip_settings(7)[CS_LEVEL_OFFSET], 0x7F);
        assert_eq!(&chip_settings(3)[..13], &CHIP_SETTINGS[..13]);
    }

    #[test]
    fn test_response_parse() {
        let mut buf = [0u8; REPORT_LEN];
        buf[0] = CMD_TRANSFER;
        buf[2] = 3;
        buf[4..7].copy_from_slice(&[1, 2, 3]);
        let rsp = Response::parse(&buf).unwrap();
        assert_eq!(rsp.status, 0);
        assert_eq!(rsp.payload, &[1, 2, 3]);

        buf[2] = 0xFF;
        assert_eq!(Response::parse(&buf).unwrap().payload.len(), REPORT_LEN - 4);
        assert!(Response::parse(&buf[..3]).is_none());
    }
}
