//! Paired-word SRAM images
//!
//! The image is a flat list of `(data, control)` pairs terminated by
//! `0xDEAD`. Each pair is written as data to register 28, then control
//! to register 27 of page 128. A control word of `0x4000` starts the
//! loaded code and ends the transfer.

use super::{rcf, wait_control_clear, Progress, SramPort, SramStatus, MAGIC_EXECUTE};
use crate::error::{FramingError, Result};

/// Last word of the image
pub const END_OF_FILE: u16 = 0xDEAD;

pub const PAGE_LOADER: u16 = 128;
pub const REG_CONTROL: u16 = 27;
pub const REG_DATA: u16 = 28;

const STATUS_SHIFT: u16 = 4;
const STATUS_MASK: u16 = 0x3f;
const STATUS_RUNNING: u16 = 0x08;
const STATUS_FAILED: u16 = 0x10;
const STATUS_SUCCESS: u16 = 0x20;

/// Decoded paired-word image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedImage {
    pairs: Vec<(u16, u16)>,
}

impl PairedImage {
    /// Parse RCF text
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_words(&rcf::decode_words(text)?)
    }

    pub fn from_words(words: &[u16]) -> Result<Self> {
        let body = rcf::strip_sentinel(words, END_OF_FILE)?;
        if body.len() % 2 != 0 {
            return Err(FramingError::UnpairedWord(body.len() - 1).into());
        }
        if body.is_empty() {
            return Err(FramingError::EmptyImage.into());
        }
        let pairs = body.chunks_exact(2).map(|p| (p[0], p[1])).collect();
        Ok(Self { pairs })
    }

    /// `(data, control)` pairs in load order
    pub fn pairs(&self) -> &[(u16, u16)] {
        &self.pairs
    }

    /// Write the pairs, stopping after the execute opcode
    pub fn load(&self, port: &mut dyn SramPort, progress: Progress<'_>) -> Result<()> {
        let total = self.pairs.len();
        port.select_page(PAGE_LOADER)?;

        for (index, &(data, control)) in self.pairs.iter().enumerate() {
            port.write_reg(REG_DATA, data)?;
            port.write_reg(REG_CONTROL, control)?;
            if control == MAGIC_EXECUTE {
                log::debug!("Execute opcode after {} of {} pairs", index + 1, total);
                progress(total, total);
                return Ok(());
            }
            wait_control_clear(port, REG_CONTROL, index)?;
            progress(index + 1, total);
        }
        Ok(())
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

pub(super) fn status(port: &mut dyn SramPort) -> Result<SramStatus> {
    port.select_page(PAGE_LOADER)?;
    let raw = port.read_reg(REG_CONTROL)?;
    Ok(decode_status(raw))
}
