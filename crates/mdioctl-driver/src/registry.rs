//! Driver registry
//!
//! Maps a connection URL scheme to the constructor of a transport. Schemes
//! are matched case-insensitively; the argument string after `://` is
//! handed to the constructor untouched.

use mdioctl_core::cmdlog::CommandLog;
use mdioctl_core::driver::{Driver, MdioBus};
use mdioctl_core::error::{ConnectionError, Result};
use mdioctl_core::url::ConnectionUrl;

/// Builds a bus from the URL argument string
pub type BusConstructor = fn(&str) -> Result<Box<dyn MdioBus>>;

/// Information about a registered driver
#[derive(Clone, Copy)]
pub struct DriverInfo {
    /// Short description for listings
    pub description: &'static str,
    /// Usage text including the URL grammar
    pub help: &'static str,
    pub constructor: BusConstructor,
}

impl std::fmt::Debug for DriverInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverInfo")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Scheme to driver table
#[derive(Debug, Default)]
pub struct DriverRegistry {
    entries: Vec<(String, DriverInfo)>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every transport enabled at compile time
    #[allow(unused_mut)]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for (scheme, info) in builtin_drivers() {
            // Built-in schemes are distinct
            if let Err(e) = registry.register(scheme, info) {
                log::warn!("{}", e);
            }
        }
        registry
    }

    /// Register a driver under `scheme`
    pub fn register(&mut self, scheme: &str, info: DriverInfo) -> Result<()> {
        let scheme = scheme.trim().to_lowercase();
        if self.lookup(&scheme).is_some() {
            return Err(ConnectionError::DuplicateScheme(scheme).into());
        }
        log::debug!("Registered driver '{}'", scheme);
        self.entries.push((scheme, info));
        Ok(())
    }

    fn lookup(&self, scheme: &str) -> Option<&DriverInfo> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(scheme))
            .map(|(_, info)| info)
    }

    /// Look up a driver by scheme
    pub fn get(&self, scheme: &str) -> Option<&DriverInfo> {
        self.lookup(scheme.trim())
    }

    /// Registered schemes in registration order
    pub fn list(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Help text of every driver
    pub fn help(&self) -> String {
        let mut out = String::new();
        for (name, info) in &self.entries {
            out.push_str(&format!("{}: {}\n", name, info.description));
            for line in info.help.lines() {
                out.push_str(&format!("    {}\n", line));
            }
            out.push('\n');
        }
        out
    }

    /// Resolve a connection URL to a closed driver handle
    pub fn resolve(&self, url: &str) -> Result<Driver> {
        self.resolve_with_log(url, CommandLog::default())
    }

    /// Like [`resolve`](Self::resolve), with a caller-supplied command log
    pub fn resolve_with_log(&self, url: &str, log: CommandLog) -> Result<Driver> {
        let parsed = ConnectionUrl::parse(url)?;
        let info = self
            .lookup(&parsed.scheme)
            .ok_or_else(|| ConnectionError::UnknownScheme(parsed.scheme.clone()))?;

        log::debug!("Resolving '{}' with driver '{}'", url, parsed.scheme);
        let bus = (info.constructor)(parsed.args_or_empty())?;
        Ok(Driver::with_log(bus, log))
    }

    /// Resolve a connection URL and open the driver
    pub fn open(&self, url: &str) -> Result<Driver> {
        let mut driver = self.resolve(url)?;
        driver.open()?;
        Ok(driver)
    }
}

/// Drivers enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn builtin_drivers() -> Vec<(&'static str, DriverInfo)> {
    let mut drivers = Vec::new();

    #[cfg(feature = "fake")]
    drivers.push((
        mdioctl_fake::SCHEME,
        DriverInfo {
            description: "In-memory MDIO bus for testing",
            help: mdioctl_fake::HELP,
            constructor: open_fake,
        },
    ));

    #[cfg(feature = "ftdi")]
    drivers.push((
        mdioctl_ftdi::SCHEME,
        DriverInfo {
            description: "FTDI MPSSE bit-banged MDIO (FT232H/FT2232H/FT4232H/FT4233H)",
            help: mdioctl_ftdi::HELP,
            constructor: open_ftdi,
        },
    ));

    #[cfg(feature = "mcp2210")]
    drivers.push((
        mdioctl_mcp2210::SCHEME,
        DriverInfo {
            description: "Microchip MCP2210 USB-HID SPI bridge (VID:04d8 PID:00de)",
            help: mdioctl_mcp2210::HELP,
            constructor: open_mcp2210,
        },
    ));

    drivers
}

/// Short list of driver schemes for CLI help
pub fn driver_names_short() -> String {
    let drivers = builtin_drivers();
    if drivers.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = drivers.iter().map(|(name, _)| *name).collect();
    names.join(", ")
}

#[cfg(feature = "fake")]
fn open_fake(args: &str) -> Result<Box<dyn MdioBus>> {
    Ok(Box::new(mdioctl_fake::FakeBus::from_args(args)?))
}

#[cfg(feature = "ftdi")]
fn open_ftdi(args: &str) -> Result<Box<dyn MdioBus>> {
    log::info!("Opening FTDI driver...");
    Ok(Box::new(mdioctl_ftdi::FtdiMdio::from_args(args)?))
}

#[cfg(feature = "mcp2210")]
fn open_mcp2210(args: &str) -> Result<Box<dyn MdioBus>> {
    log::info!("Opening MCP2210 driver...");
    Ok(Box::new(mdioctl_mcp2210::Mcp2210::from_args(args)?))
}
