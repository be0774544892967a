//! CLI argument parsing

use clap::{Parser, Subcommand};
use mdioctl_core::firmware::FirmwareVariant;
use std::path::PathBuf;

fn parse_number(s: &str) -> Result<u64, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u64>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_number(s)?;
    u8::try_from(value).map_err(|_| format!("Value out of range (max 0xff): {}", s))
}

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let value = parse_number(s)?;
    u16::try_from(value).map_err(|_| format!("Value out of range (max 0xffff): {}", s))
}

/// Parse a clause-22 register number (0-31)
fn parse_reg(s: &str) -> Result<u16, String> {
    let value = parse_number(s)?;
    if value > 0x1f {
        return Err(format!("Register out of range (max 0x1f): {}", s));
    }
    Ok(value as u16)
}

/// Parse a string as a hex or decimal 48-bit counter value
fn parse_hex_u48(s: &str) -> Result<u64, String> {
    let value = parse_number(s)?;
    if value >> 48 != 0 {
        return Err(format!("Value does not fit in 48 bits: {}", s));
    }
    Ok(value)
}

fn parse_variant(s: &str) -> Result<FirmwareVariant, String> {
    FirmwareVariant::parse(s)
        .ok_or_else(|| format!("Unknown firmware variant '{}' (use block or tiny)", s))
}

/// Generate dynamic help text for the device argument
fn device_help() -> String {
    format!(
        "Connection URL, scheme://args [available: {}]",
        mdioctl_driver::driver_names_short()
    )
}

#[derive(Parser)]
#[command(name = "mdioctl")]
#[command(author, version, about = "Ethernet PHY register and firmware tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Record every register access and print the log when done
    #[arg(long, global = true)]
    pub log_commands: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device options shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    #[arg(short, long, help = device_help())]
    pub device: String,

    /// Phy address (default 0x1a)
    #[arg(long, value_parser = parse_hex_u8)]
    pub phy: Option<u8>,

    /// Select the target chip on multi-device bridges before the command
    #[arg(long, value_parser = parse_hex_u8)]
    pub dev_sel: Option<u8>,
}

/// Register map source
#[derive(clap::Args, Debug, Clone)]
pub struct MapArgs {
    /// Register map (CSV, or TOML when the extension is .toml)
    #[arg(short, long)]
    pub map: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List transports compiled into this binary
    ListDrivers {
        /// Show the URL options of every transport
        #[arg(long)]
        details: bool,
    },

    /// Read a clause-22 register
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        /// Register (0-31)
        #[arg(value_parser = parse_reg)]
        reg: u16,

        /// Select this page through register 31 first
        #[arg(long, value_parser = parse_hex_u16)]
        page: Option<u16>,
    },

    /// Write a clause-22 register
    Write {
        #[command(flatten)]
        device: DeviceArgs,

        /// Register (0-31)
        #[arg(value_parser = parse_reg)]
        reg: u16,

        /// Value to write
        #[arg(value_parser = parse_hex_u16)]
        value: u16,

        /// Select this page through register 31 first
        #[arg(long, value_parser = parse_hex_u16)]
        page: Option<u16>,
    },

    /// Read a clause-45 register
    Read45 {
        #[command(flatten)]
        device: DeviceArgs,

        /// MMD device type
        #[arg(value_parser = parse_hex_u8)]
        dev: u8,

        /// Register address
        #[arg(value_parser = parse_hex_u16)]
        reg: u16,
    },

    /// Write a clause-45 register
    Write45 {
        #[command(flatten)]
        device: DeviceArgs,

        /// MMD device type
        #[arg(value_parser = parse_hex_u8)]
        dev: u8,

        /// Register address
        #[arg(value_parser = parse_hex_u16)]
        reg: u16,

        /// Value to write
        #[arg(value_parser = parse_hex_u16)]
        value: u16,
    },

    /// Dump a range of clause-22 registers
    Dump {
        #[command(flatten)]
        device: DeviceArgs,

        /// First register
        #[arg(long, default_value = "0", value_parser = parse_reg)]
        start: u16,

        /// Number of registers
        #[arg(long, default_value = "32", value_parser = parse_hex_u16)]
        count: u16,

        /// Page to dump
        #[arg(long, value_parser = parse_hex_u16)]
        page: Option<u16>,
    },

    /// Register field access
    #[command(subcommand)]
    Field(FieldCommands),

    /// Register map conversion
    #[command(subcommand)]
    Regmap(RegmapCommands),

    /// SRAM firmware loading
    #[command(subcommand)]
    Sram(SramCommands),
}

/// Field-related subcommands
#[derive(Subcommand)]
pub enum FieldCommands {
    /// List the fields of a register map
    List {
        #[command(flatten)]
        map: MapArgs,
    },

    /// Read a field
    Get {
        #[command(flatten)]
        device: DeviceArgs,
        #[command(flatten)]
        map: MapArgs,

        /// Field name
        name: String,
    },

    /// Write a field (read-modify-write)
    Set {
        #[command(flatten)]
        device: DeviceArgs,
        #[command(flatten)]
        map: MapArgs,

        /// Field name
        name: String,

        /// Field value
        #[arg(value_parser = parse_hex_u16)]
        value: u16,

        /// Write the value to the whole register without reading it first
        #[arg(long)]
        raw: bool,
    },

    /// Show the description of a field
    Doc {
        #[command(flatten)]
        map: MapArgs,

        /// Field name
        name: String,
    },

    /// Read or write a 48-bit counter made of <base>_hi/_mi/_lo fields
    Wide {
        #[command(flatten)]
        device: DeviceArgs,
        #[command(flatten)]
        map: MapArgs,

        /// Counter base name
        base: String,

        /// Value to write; reads when omitted
        #[arg(value_parser = parse_hex_u48)]
        value: Option<u64>,
    },
}

/// Register map subcommands
#[derive(Subcommand)]
pub enum RegmapCommands {
    /// Markdown table of every field
    Doc {
        #[command(flatten)]
        map: MapArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rust accessor module
    Code {
        #[command(flatten)]
        map: MapArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a register map to TOML
    Toml {
        #[command(flatten)]
        map: MapArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// SRAM loader subcommands
#[derive(Subcommand)]
pub enum SramCommands {
    /// Decode a firmware image and show its layout
    Inspect {
        /// RCF image
        file: PathBuf,

        /// Image format (block or tiny)
        #[arg(long, default_value = "block", value_parser = parse_variant)]
        variant: FirmwareVariant,
    },

    /// Load a firmware image into chip SRAM and start it
    Load {
        #[command(flatten)]
        device: DeviceArgs,

        /// RCF image
        file: PathBuf,

        /// Image format (block or tiny)
        #[arg(long, default_value = "block", value_parser = parse_variant)]
        variant: FirmwareVariant,
    },

    /// Show the loader status
    Status {
        #[command(flatten)]
        device: DeviceArgs,

        /// Loader protocol (block or tiny)
        #[arg(long, default_value = "block", value_parser = parse_variant)]
        variant: FirmwareVariant,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_hex_u16("0x245"), Ok(0x245));
        assert_eq!(parse_hex_u16("31"), Ok(31));
        assert!(parse_hex_u16("0x10000").is_err());
        assert_eq!(parse_hex_u8("0x1A"), Ok(0x1a));
        assert!(parse_hex_u8("256").is_err());
        assert_eq!(parse_hex_u48("0xffffffffffff"), Ok(0xFFFF_FFFF_FFFF));
        assert!(parse_hex_u48("0x1000000000000").is_err());
        assert_eq!(parse_reg("0x1f"), Ok(31));
        assert!(parse_reg("0x20").is_err());
    }

    #[test]
    fn test_parse_read_with_page() {
        let cli = Cli::try_parse_from([
            "mdioctl", "read", "-d", "fake://1a", "--page", "0x12", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Read { device, reg, page } => {
                assert_eq!(device.device, "fake://1a");
                assert_eq!(reg, 5);
                assert_eq!(page, Some(0x12));
            }
            _ => panic!("expected read"),
        }
    }

    #[test]
    fn test_register_beyond_clause22_rejected() {
        assert!(Cli::try_parse_from(["mdioctl", "read", "-d", "fake://", "0x20"]).is_err());
        assert!(
            Cli::try_parse_from(["mdioctl", "write", "-d", "fake://", "32", "0x1"]).is_err()
        );
    }

    #[test]
    fn test_parse_sram_variant() {
        let cli = Cli::try_parse_from(["mdioctl", "sram", "inspect", "fw.rcf", "--variant", "tiny"])
            .unwrap();
        match cli.command {
            Commands::Sram(SramCommands::Inspect { variant, .. }) => {
                assert_eq!(variant, FirmwareVariant::Paired)
            }
            _ => panic!("expected sram inspect"),
        }
        assert!(
            Cli::try_parse_from(["mdioctl", "sram", "inspect", "fw.rcf", "--variant", "x"])
                .is_err()
        );
    }
}
