use std::any::Any;
use std::path::Path;

use super::Capability;
use crate::error::{Result, SramError};
use crate::firmware::{self, FirmwareImage, FirmwareVariant, Progress, SramPort, SramStatus};

/// SRAM firmware loader for one image variant
#[derive(Debug)]
pub struct SramLoader {
    variant: FirmwareVariant,
    image: Option<FirmwareImage>,
}

impl SramLoader {
    pub fn new(variant: FirmwareVariant) -> Self {
        Self {
            variant,
            image: None,
        }
    }

    pub fn variant(&self) -> FirmwareVariant {
        self.variant
    }

    pub fn image(&self) -> Option<&FirmwareImage> {
        self.image.as_ref()
    }

    /// Decode and keep an RCF file for the next `load`
    pub fn set_firmware(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let image = FirmwareImage::from_file(self.variant, path.as_ref())?;
        log::info!(
            "Firmware {}: {} transfers",
            path.as_ref().display(),
            image.transfer_count()
        );
        self.image = Some(image);
        Ok(())
    }

    /// Decode and keep RCF text for the next `load`
    pub fn set_firmware_text(&mut self, text: &str) -> Result<()> {
        self.image = Some(FirmwareImage::parse(self.variant, text)?);
        Ok(())
    }

    pub fn load(&self, port: &mut dyn SramPort, progress: Progress<'_>) -> Result<()> {
        let image = self.image.as_ref().ok_or(SramError::NoFirmware)?;
        image.load(port, progress)
    }

    pub fn status(&self, port: &mut dyn SramPort) -> Result<SramStatus> {
        firmware::status(self.variant, port)
    }
}

impl Capability for SramLoader {
    fn name(&self) -> &'static str {
        self.variant.capability()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
