//! mdioctl - Ethernet PHY register and firmware tool
//!
//! Talks to a PHY test chip over MDIO through one of several USB bridges.
//!
//! # Architecture
//!
//! A connection URL (`fake://1a`, `ftdi://,type=2232h`, `mcp2210://cs=1`)
//! is resolved by `mdioctl-driver` to a driver handle. Capabilities are then
//! composed on top of that single driver:
//! - **mdio** - paged clause-22 access to the configured phy
//! - **reg_fields** - named bitfields from a register map
//! - **raw** - access to any phy address
//! - **sram-loader** / **sram-loader-tiny** - firmware loading
//!
//! Every command is implemented against the composed `Equipment`, so it
//! works the same regardless of the bridge in use.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, FieldCommands, RegmapCommands, SramCommands};
use commands::{load_map, Session};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let log_commands = cli.log_commands;

    match cli.command {
        Commands::ListDrivers { details } => {
            commands::list_drivers(details);
            Ok(())
        }
        Commands::Read { device, reg, page } => Session::open(&device, &["mdio"], None, log_commands)?
            .run(|eq| commands::reg::run_read(eq, reg, page)),
        Commands::Write {
            device,
            reg,
            value,
            page,
        } => Session::open(&device, &["mdio"], None, log_commands)?
            .run(|eq| commands::reg::run_write(eq, reg, value, page)),
        Commands::Read45 { device, dev, reg } => {
            let phy = device.phy;
            Session::open(&device, &["mdio"], None, log_commands)?
                .run(|eq| commands::reg::run_read45(eq, phy, dev, reg))
        }
        Commands::Write45 {
            device,
            dev,
            reg,
            value,
        } => {
            let phy = device.phy;
            Session::open(&device, &["mdio"], None, log_commands)?
                .run(|eq| commands::reg::run_write45(eq, phy, dev, reg, value))
        }
        Commands::Dump {
            device,
            start,
            count,
            page,
        } => Session::open(&device, &["mdio"], None, log_commands)?
            .run(|eq| commands::reg::run_dump(eq, start, count, page)),

        Commands::Field(subcmd) => match subcmd {
            FieldCommands::List { map } => {
                commands::field::cmd_list(&load_map(&map.map)?);
                Ok(())
            }
            FieldCommands::Doc { map, name } => {
                commands::field::cmd_doc(&load_map(&map.map)?, &name)
            }
            FieldCommands::Get { device, map, name } => {
                let map = load_map(&map.map)?;
                Session::open(&device, &["reg_fields"], Some(map), log_commands)?
                    .run(|eq| commands::field::cmd_get(eq, &name))
            }
            FieldCommands::Set {
                device,
                map,
                name,
                value,
                raw,
            } => {
                let map = load_map(&map.map)?;
                Session::open(&device, &["reg_fields"], Some(map), log_commands)?
                    .run(|eq| commands::field::cmd_set(eq, &name, value, raw))
            }
            FieldCommands::Wide {
                device,
                map,
                base,
                value,
            } => {
                let map = load_map(&map.map)?;
                Session::open(&device, &["reg_fields"], Some(map), log_commands)?
                    .run(|eq| commands::field::cmd_wide(eq, &base, value))
            }
        },

        Commands::Regmap(subcmd) => match subcmd {
            RegmapCommands::Doc { map, output } => {
                commands::regmap::cmd_doc(&load_map(&map.map)?, output.as_deref())
            }
            RegmapCommands::Code { map, output } => {
                commands::regmap::cmd_code(&load_map(&map.map)?, output.as_deref())
            }
            RegmapCommands::Toml { map, output } => {
                commands::regmap::cmd_toml(&load_map(&map.map)?, output.as_deref())
            }
        },

        Commands::Sram(subcmd) => match subcmd {
            SramCommands::Inspect { file, variant } => commands::sram::cmd_inspect(&file, variant),
            SramCommands::Load {
                device,
                file,
                variant,
            } => Session::open(&device, &[variant.capability()], None, log_commands)?
                .run(|eq| commands::sram::cmd_load(eq, &file)),
            SramCommands::Status { device, variant } => {
                Session::open(&device, &[variant.capability()], None, log_commands)?
                    .run(commands::sram::cmd_status)
            }
        },
    }
}
