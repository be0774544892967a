//! SRAM firmware images and loaders
//!
//! Two incompatible image formats exist, one per chip generation:
//!
//! - [`BlockImage`] - blocks of 8 data words plus a copy opcode, grouped
//!   into units that end with a program counter and execute opcode
//! - [`PairedImage`] - a flat list of (data, control) word pairs
//!
//! Both are RCF text (see [`rcf`]) and are loaded through an
//! [`SramPort`]: select the loader page, then plain register access.
//! Loaders poll the control register with a small fixed retry budget and
//! fail with [`SramError::ControlTimeout`](crate::error::SramError) when
//! it is exhausted.

mod block;
mod paired;
pub mod rcf;

pub use block::{Block, BlockImage, FirmwareUnit};
pub use paired::PairedImage;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SramError};

/// Execute opcode, shared by both formats
pub const MAGIC_EXECUTE: u16 = 0x4000;

/// Control register reads before giving up
pub const CONTROL_POLL_ATTEMPTS: usize = 2;

/// Delay between control register reads
pub const CONTROL_POLL_DELAY: Duration = Duration::from_millis(5);

/// Register access used by the loaders
pub trait SramPort {
    /// Write the page select register
    fn select_page(&mut self, page: u16) -> Result<()>;

    /// Read a register in the selected page
    fn read_reg(&mut self, reg: u16) -> Result<u16>;

    /// Write a register in the selected page
    fn write_reg(&mut self, reg: u16, value: u16) -> Result<()>;
}

/// Progress callback: `(blocks_done, blocks_total)`
pub type Progress<'a> = &'a mut dyn FnMut(usize, usize);

/// Read `reg` until it is zero, at most [`CONTROL_POLL_ATTEMPTS`] times
pub(crate) fn wait_control_clear(port: &mut dyn SramPort, reg: u16, block: usize) -> Result<()> {
    let mut last = 0;
    for attempt in 0..CONTROL_POLL_ATTEMPTS {
        if attempt > 0 {
            std::thread::sleep(CONTROL_POLL_DELAY);
        }
        last = port.read_reg(reg)?;
        if last == 0 {
            return Ok(());
        }
        log::debug!(
            "Block {}: control register 0x{:04X} (attempt {})",
            block,
            last,
            attempt + 1
        );
    }
    Err(SramError::ControlTimeout {
        block,
        last,
        attempts: CONTROL_POLL_ATTEMPTS,
    }
    .into())
}

/// Loader state reported by the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SramStatus {
    /// No load in progress or status unknown
    Idle,
    Running,
    Failed,
    Success,
    /// Code outside the known set
    Other(u16),
}

impl SramStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, SramStatus::Failed | SramStatus::Success)
    }
}

impl fmt::Display for SramStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SramStatus::Idle => write!(f, "idle"),
            SramStatus::Running => write!(f, "running"),
            SramStatus::Failed => write!(f, "failed"),
            SramStatus::Success => write!(f, "success"),
            SramStatus::Other(code) => write!(f, "unknown (0x{:02x})", code),
        }
    }
}

/// Image format / loader protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareVariant {
    /// Block-oriented images (`sram-loader`)
    Block,
    /// Paired-word images (`sram-loader-tiny`)
    Paired,
}

impl FirmwareVariant {
    /// Capability name of the matching loader
    pub fn capability(&self) -> &'static str {
        match self {
            FirmwareVariant::Block => "sram-loader",
            FirmwareVariant::Paired => "sram-loader-tiny",
        }
    }

    /// Parse a variant name (`block`, `paired`, `tiny` or a capability name)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "block" | "a" | "sram-loader" => Some(FirmwareVariant::Block),
            "paired" | "tiny" | "b" | "sram-loader-tiny" => Some(FirmwareVariant::Paired),
            _ => None,
        }
    }
}

/// A decoded image of either format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirmwareImage {
    Block(BlockImage),
    Paired(PairedImage),
}

impl FirmwareImage {
    /// Decode RCF text in the given format
    pub fn parse(variant: FirmwareVariant, text: &str) -> Result<Self> {
        let words = rcf::decode_words(text)?;
        Self::from_words(variant, &words)
    }

    /// Build an image from decoded words
    pub fn from_words(variant: FirmwareVariant, words: &[u16]) -> Result<Self> {
        Ok(match variant {
            FirmwareVariant::Block => FirmwareImage::Block(BlockImage::from_words(words)?),
            FirmwareVariant::Paired => FirmwareImage::Paired(PairedImage::from_words(words)?),
        })
    }

    /// Read and decode an RCF file
    pub fn from_file(variant: FirmwareVariant, path: impl AsRef<Path>) -> Result<Self> {
        let words = rcf::read_words(path)?;
        Self::from_words(variant, &words)
    }

    pub fn variant(&self) -> FirmwareVariant {
        match self {
            FirmwareImage::Block(_) => FirmwareVariant::Block,
            FirmwareImage::Paired(_) => FirmwareVariant::Paired,
        }
    }

    /// Number of control-register transfers a full load performs
    pub fn transfer_count(&self) -> usize {
        match self {
            FirmwareImage::Block(image) => image.units().first().map_or(0, |u| u.blocks.len()),
            FirmwareImage::Paired(image) => image.pairs().len(),
        }
    }

    /// Load the image (first unit for block images) and start it
    pub fn load(&self, port: &mut dyn SramPort, progress: Progress<'_>) -> Result<()> {
        match self {
            FirmwareImage::Block(image) => {
                let unit = image.units().first().ok_or(SramError::NoSuchUnit {
                    index: 0,
                    count: 0,
                })?;
                unit.load(port, progress)
            }
            FirmwareImage::Paired(image) => image.load(port, progress),
        }
    }

    /// Query the loader status register for this format
    pub fn status(&self, port: &mut dyn SramPort) -> Result<SramStatus> {
        match self.variant() {
            FirmwareVariant::Block => block::status(port),
            FirmwareVariant::Paired => paired::status(port),
        }
    }
}

/// Query the loader status register of a variant
pub fn status(variant: FirmwareVariant, port: &mut dyn SramPort) -> Result<SramStatus> {
    match variant {
        FirmwareVariant::Block => block::status(port),
        FirmwareVariant::Paired => paired::status(port),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Paged register file emulating the SRAM loader
    ///
    /// Writing a control register clears it again unless `stuck` is set.
    #[derive(Default)]
    pub(crate) struct LoaderPort {
        pub page: u16,
        pub regs: HashMap<(u16, u16), u16>,
        pub writes: Vec<(u16, u16, u16)>,
        pub control_regs: Vec<u16>,
        pub stuck: bool,
    }

    impl SramPort for LoaderPort {
        fn select_page(&mut self, page: u16) -> Result<()> {
            self.page = page;
            Ok(())
        }

        fn read_reg(&mut self, reg: u16) -> Result<u16> {
            Ok(self.regs.get(&(self.page, reg)).copied().unwrap_or(0))
        }

        fn write_reg(&mut self, reg: u16, value: u16) -> Result<()> {
            self.writes.push((self.page, reg, value));
            let cleared = self.control_regs.contains(&reg) && !self.stuck && value != MAGIC_EXECUTE;
            self.regs
                .insert((self.page, reg), if cleared { 0 } else { value });
            Ok(())
        }
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(FirmwareVariant::parse("tiny"), Some(FirmwareVariant::Paired));
        assert_eq!(
            FirmwareVariant::parse("SRAM-LOADER"),
            Some(FirmwareVariant::Block)
        );
        assert_eq!(FirmwareVariant::Paired.capability(), "sram-loader-tiny");
        assert_eq!(FirmwareVariant::parse("c"), None);
    }

    #[test]
    fn test_wait_control_clear_times_out() {
        let mut port = LoaderPort::default();
        port.regs.insert((0, 16), 0x8006);
        let err = wait_control_clear(&mut port, 16, 3).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Sram(SramError::ControlTimeout {
                block: 3,
                last: 0x8006,
                attempts: CONTROL_POLL_ATTEMPTS
            })
        ));
    }
}
