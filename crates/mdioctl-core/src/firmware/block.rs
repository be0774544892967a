//! Block-oriented SRAM images
//!
//! Image layout (after RCF decoding):
//!
//! ```text
//! +-----------------------------+
//! | d0 d1 .. d7  0x8006         |  block (repeated)
//! +-----------------------------+
//! | 0xBEEF  pc_hi pc_lo 0x4000  |  unit trailer
//! +-----------------------------+
//! | ... more units ...          |
//! +-----------------------------+
//! | 0xDEEF                      |  end of file
//! +-----------------------------+
//! ```
//!
//! Loading a unit writes each block's data words to registers 17..24 of
//! page 18 followed by the copy opcode to register 16, which the chip
//! clears once the block has been copied.

use super::{rcf, wait_control_clear, Progress, SramPort, SramStatus, MAGIC_EXECUTE};
use crate::error::{FramingError, Result, SramError};

/// Copy opcode closing every block
pub const MAGIC_COPY: u16 = 0x8006;
/// Marks the end of a unit's blocks
pub const END_OF_DATA: u16 = 0xBEEF;
/// Last word of the image
pub const END_OF_FILE: u16 = 0xDEEF;

/// Data words per block
pub const BLOCK_DATA_WORDS: usize = 8;
/// Words per block including the control word
pub const BLOCK_WORDS: usize = BLOCK_DATA_WORDS + 1;
/// Words in a unit trailer
const TRAILER_WORDS: usize = 4;

/// Loader register page
pub const PAGE_LOADER: u16 = 18;
/// Control / opcode register
pub const REG_CONTROL: u16 = 16;
/// First data register
pub const REG_DATA: u16 = 17;

const STATUS_SHIFT: u16 = 4;
const STATUS_MASK: u16 = 0x3f;
const STATUS_RUNNING: u16 = 0x08;
const STATUS_FAILED: u16 = 0x10;
const STATUS_SUCCESS: u16 = 0x20;

/// Eight data words plus a control word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub data: [u16; BLOCK_DATA_WORDS],
    pub control: u16,
}

/// A run of blocks plus the program counter to start from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareUnit {
    pub blocks: Vec<Block>,
    pub pc_hi: u16,
    pub pc_lo: u16,
    pub exec: u16,
}

impl FirmwareUnit {
    /// Program counter as a 32-bit value
    pub fn entry_point(&self) -> u32 {
        (u32::from(self.pc_hi) << 16) | u32::from(self.pc_lo)
    }

    /// Copy the unit into SRAM and start it
    ///
    /// Stops at the first block whose control register does not clear.
    pub fn load(&self, port: &mut dyn SramPort, progress: Progress<'_>) -> Result<()> {
        let total = self.blocks.len();
        port.select_page(PAGE_LOADER)?;

        for (index, block) in self.blocks.iter().enumerate() {
            for (offset, &word) in block.data.iter().enumerate() {
                port.write_reg(REG_DATA + offset as u16, word)?;
            }
            port.write_reg(REG_CONTROL, block.control)?;
            wait_control_clear(port, REG_CONTROL, index)?;
            progress(index + 1, total);
        }

        log::debug!(
            "Starting firmware at 0x{:08X} ({} blocks)",
            self.entry_point(),
            total
        );
        port.write_reg(REG_DATA, self.pc_hi)?;
        port.write_reg(REG_DATA + 1, self.pc_lo)?;
        port.write_reg(REG_CONTROL, self.exec)?;
        Ok(())
    }
}

/// Decoded block-oriented image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockImage {
    units: Vec<FirmwareUnit>,
}

impl BlockImage {
    /// Parse RCF text
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_words(&rcf::decode_words(text)?)
    }

    /// Group decoded words into blocks and units
    pub fn from_words(words: &[u16]) -> Result<Self> {
        let body = rcf::strip_sentinel(words, END_OF_FILE)?;

        let mut units = Vec::new();
        let mut blocks = Vec::new();
        let mut offset = 0;

        while offset < body.len() {
            let chunk = body
                .get(offset..offset + BLOCK_WORDS)
                .ok_or(FramingError::Truncated { offset })?;
            let control = chunk[BLOCK_DATA_WORDS];
            if control != MAGIC_COPY {
                return Err(FramingError::BadControlWord {
                    offset: offset + BLOCK_DATA_WORDS,
                    found: control,
                    expected: MAGIC_COPY,
                }
                .into());
            }
            let mut data = [0u16; BLOCK_DATA_WORDS];
            data.copy_from_slice(&chunk[..BLOCK_DATA_WORDS]);
            blocks.push(Block { data, control });
            offset += BLOCK_WORDS;

            if body.get(offset) == Some(&END_OF_DATA) {
                let trailer = body
                    .get(offset..offset + TRAILER_WORDS)
                    .ok_or(FramingError::Truncated { offset })?;
                let exec = trailer[3];
                if exec != MAGIC_EXECUTE {
                    return Err(FramingError::BadExecOpcode {
                        offset: offset + 3,
                        found: exec,
                        expected: MAGIC_EXECUTE,
                    }
                    .into());
                }
                units.push(FirmwareUnit {
                    blocks: std::mem::take(&mut blocks),
                    pc_hi: trailer[1],
                    pc_lo: trailer[2],
                    exec,
                });
                offset += TRAILER_WORDS;
            }
        }

        if !blocks.is_empty() {
            return Err(FramingError::TrailingWords {
                count: blocks.len() * BLOCK_WORDS,
            }
            .into());
        }
        if units.is_empty() {
            return Err(FramingError::EmptyImage.into());
        }

        Ok(Self { units })
    }

    pub fn units(&self) -> &[FirmwareUnit] {
        &self.units
    }

    /// Load one unit by index
    pub fn load_unit(
        &self,
        index: usize,
        port: &mut dyn SramPort,
        progress: Progress<'_>,
    ) -> Result<()> {
        let unit = self.units.get(index).ok_or(SramError::NoSuchUnit {
            index,
            count: self.units.len(),
        })?;
        unit.load(port, progress)
    }
}

fn decode_status(raw: u16) -> SramStatus {
    match (raw >> STATUS_SHIFT) & STATUS_MASK {
        0 => SramStatus::Idle,
        STATUS_RUNNING => SramStatus::Running,
        STATUS_FAILED => SramStatus::Failed,
        STATUS_SUCCESS => SramStatus::Success,
        code => SramStatus::Other(code),
    }
}

/// Read the loader status from the control register
pub(super) fn status(port: &mut dyn SramPort) -> Result<SramStatus> {
    port.select_page(PAGE_LOADER)?;
    let raw = port.read_reg(REG_CONTROL)?;
    Ok(decode_status(raw))
}
