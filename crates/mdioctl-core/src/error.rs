//! Error types for mdioctl
//!
//! Errors fall into four kinds mirroring where a failure originates:
//!
//! - [`ConnectionError`] - the connection URL could not be resolved
//! - [`TransportError`] - the USB bridge failed to open, transfer or answer
//! - [`FramingError`] - malformed input data or an invalid composition
//! - [`RegisterAccessError`] - a field accessor could not reach its register
//!
//! Firmware loader state failures get their own [`SramError`].

use thiserror::Error;

/// Result type for mdioctl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Connection URL could not be resolved to a driver
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Transport-level I/O failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed image or map, or an invalid capability composition
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// A field accessor failed to reach its register
    #[error(transparent)]
    RegisterAccess(#[from] RegisterAccessError),

    /// SRAM firmware loader failure
    #[error(transparent)]
    Sram(#[from] SramError),

    /// File access failed while loading a register map or image
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while turning a connection URL into a driver
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// More than one `://` separator
    #[error("Malformed connection URL '{0}'")]
    MalformedUrl(String),

    /// No driver registered under this scheme
    #[error("Unknown driver scheme '{0}'")]
    UnknownScheme(String),

    /// A scheme was registered twice
    #[error("Driver scheme '{0}' is already registered")]
    DuplicateScheme(String),

    /// The constructor rejected the argument string
    #[error("Invalid arguments for '{scheme}': {message}")]
    InvalidArguments { scheme: String, message: String },
}

/// Errors raised by a transport while talking to the bridge
#[derive(Debug, Error)]
pub enum TransportError {
    /// read/write issued while the driver is closed
    #[error("Driver is not open")]
    NotOpen,

    /// No matching USB device is attached
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The device was found but could not be opened or configured
    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    /// A USB transfer failed
    #[error("USB transfer failed: {0}")]
    TransferFailed(String),

    /// Fewer bytes arrived than the frame requires
    #[error("Read timeout: expected {expected} bytes, got {received}")]
    ReadTimeout { expected: usize, received: usize },

    /// The bridge answered a command with a non-zero status byte
    #[error("Command 0x{command:02X} failed with status 0x{status:02X}")]
    Status { command: u8, status: u8 },

    /// The echoed frame header does not match what was sent
    #[error("Frame echo mismatch: sent {sent:02X?}, received {received:02X?}")]
    EchoMismatch { sent: Vec<u8>, received: Vec<u8> },

    /// Operation not provided by this transport
    #[error("Operation not supported by this transport: {0}")]
    Unsupported(&'static str),

    /// Argument out of range for this transport
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors in input data or in the way capabilities were composed
#[derive(Debug, Error)]
pub enum FramingError {
    /// Firmware image line is not a 16-character binary string
    #[error("Line {line}: invalid firmware word '{text}'")]
    InvalidWord { line: usize, text: String },

    /// Firmware image does not end with the required sentinel
    #[error("Firmware image does not end with sentinel 0x{expected:04X}")]
    MissingSentinel { expected: u16 },

    /// Firmware image ends in the middle of a block or trailer
    #[error("Firmware image truncated at word {offset}")]
    Truncated { offset: usize },

    /// Block control word is not the copy opcode
    #[error("Block at word {offset}: control word 0x{found:04X}, expected 0x{expected:04X}")]
    BadControlWord {
        offset: usize,
        found: u16,
        expected: u16,
    },

    /// Execute opcode in a unit trailer is wrong
    #[error("Unit at word {offset}: execute opcode 0x{found:04X}, expected 0x{expected:04X}")]
    BadExecOpcode {
        offset: usize,
        found: u16,
        expected: u16,
    },

    /// Words left over after the last complete unit
    #[error("{count} trailing word(s) after the last firmware unit")]
    TrailingWords { count: usize },

    /// Image holds no loadable unit
    #[error("Firmware image contains no firmware unit")]
    EmptyImage,

    /// Pair-encoded image has an odd number of payload words
    #[error("Firmware image has an odd number of payload words ({0})")]
    UnpairedWord(usize),

    /// Register map row could not be parsed
    #[error("Register map line {line}: {message}")]
    MalformedRow { line: usize, message: String },

    /// Second `$ TAG:` row in a register map
    #[error("Register map line {line}: tag already set to '{existing}'")]
    DuplicateTag { line: usize, existing: String },

    /// Two fields share a name
    #[error("Duplicate field name '{0}'")]
    DuplicateField(String),

    /// Two capabilities share a name
    #[error("Duplicate capability name '{0}'")]
    DuplicateCapability(String),

    /// Capability name not registered
    #[error("Unknown capability '{0}'")]
    UnknownCapability(String),

    /// Capability dependencies loop back on themselves
    #[error("Capability dependency cycle through '{0}'")]
    DependencyCycle(String),

    /// More than one capability wants to own the driver
    #[error("More than one driver-owning capability: {}", .0.join(", "))]
    MultipleDriverOwners(Vec<String>),

    /// Two capabilities from the same exclusive group
    #[error("Capabilities '{first}' and '{second}' cannot be combined")]
    ConflictingCapabilities { first: String, second: String },

    /// A capability needs data that was not supplied
    #[error("Capability '{capability}' requires {what}")]
    MissingInput {
        capability: String,
        what: &'static str,
    },

    /// Operation needs a capability that is not part of the composition
    #[error("Capability '{0}' is not equipped")]
    NotEquipped(&'static str),
}

/// Errors raised by register field accessors
#[derive(Debug, Error)]
pub enum RegisterAccessError {
    /// No field with this name in the map
    #[error("Unknown field '{0}'")]
    UnknownField(String),

    /// Setter requested on a readonly field
    #[error("Field '{0}' is readonly")]
    ReadOnly(String),

    /// The register read behind a field failed
    #[error("Access to field '{field}' failed: {source}")]
    Failed {
        field: String,
        #[source]
        source: Box<Error>,
    },
}

/// SRAM firmware loader failures
#[derive(Debug, Error)]
pub enum SramError {
    /// sram_load called before sram_set_firmware
    #[error("No firmware image configured")]
    NoFirmware,

    /// Requested unit index is past the end of the image
    #[error("Firmware unit {index} out of range ({count} available)")]
    NoSuchUnit { index: usize, count: usize },

    /// Control register never read back as zero
    #[error("Control register still 0x{last:04X} after {attempts} reads (block {block})")]
    ControlTimeout {
        block: usize,
        last: u16,
        attempts: usize,
    },
}

impl Error {
    /// Whether the failure came from the transport layer
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
