//! SRAM firmware commands

use super::CmdResult;
use indicatif::{ProgressBar, ProgressStyle};
use mdioctl_core::equip::Equipment;
use mdioctl_core::firmware::{FirmwareImage, FirmwareVariant, MAGIC_EXECUTE};
use std::path::Path;

/// Decode an image without touching a device
pub fn cmd_inspect(path: &Path, variant: FirmwareVariant) -> CmdResult {
    let image = FirmwareImage::from_file(variant, path)?;
    print!("{}", describe(&image));
    Ok(())
}

fn describe(image: &FirmwareImage) -> String {
    let mut out = String::new();
    match image {
        FirmwareImage::Block(image) => {
            out.push_str(&format!("Block image, {} unit(s)\n", image.units().len()));
            for (i, unit) in image.units().iter().enumerate() {
                out.push_str(&format!(
                    "  unit {}: {} blocks, entry 0x{:08x}, exec 0x{:04x}\n",
                    i,
                    unit.blocks.len(),
                    unit.entry_point(),
                    unit.exec
                ));
            }
        }
        FirmwareImage::Paired(image) => {
            let launches = image.pairs().iter().any(|&(_, ctrl)| ctrl == MAGIC_EXECUTE);
            out.push_str(&format!("Paired image, {} word pairs\n", image.pairs().len()));
            out.push_str(&format!(
                "  execute opcode: {}\n",
                if launches { "present" } else { "missing" }
            ));
        }
    }
    out
}

/// Load firmware into SRAM with a progress bar
pub fn cmd_load(eq: &mut Equipment, path: &Path) -> CmdResult {
    eq.sram_set_firmware(path)?;
    let total = eq
        .sram_loader()?
        .image()
        .map_or(0, |image| image.transfer_count());

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks Loading")?
            .progress_chars("#>-"),
    );

    let result = eq.sram_load(&mut |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    });
    match result {
        Ok(()) => pb.finish_with_message("done"),
        Err(e) => {
            pb.abandon();
            return Err(e.into());
        }
    }

    println!("Loaded {} ({})", path.display(), eq.sram_status()?);
    Ok(())
}

pub fn cmd_status(eq: &mut Equipment) -> CmdResult {
    let status = eq.sram_status()?;
    println!("SRAM loader: {}", status);
    Ok(())
}
