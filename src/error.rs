use crate::address::FarPtr;
use crate::memory::MemoryError;
use thiserror::Error;

/// Errors produced by driver discovery, sector reads and HOM parsing
#[derive(Error, Debug)]
pub enum DiskError {
    #[error("Hard disk driver not found in device chain")]
    DriverNotFound,

    #[error("Device chain exceeds {limit} headers, giving up")]
    ChainTooLong { limit: usize },

    #[error("Header at {address} is not a hard disk driver (flags {flags:04X}, units {units})")]
    MisclassifiedDriver {
        address: FarPtr,
        flags: u16,
        units: u8,
    },

    #[error("Hard disk driver has not been bound")]
    NotBound,

    #[error("Disk subsystem failed to initialize: {0}")]
    SubsystemFailed(String),

    #[error("Invalid disk address C:{cylinder} H:{head} S:{sector}")]
    InvalidAddress { cylinder: u16, head: u8, sector: u8 },

    #[error("Driver reported error {status:02X} {error:02X}")]
    Io { status: u8, error: u8 },

    #[error("DPMI function {function:04X} failed with error {code:04X}")]
    Dpmi { function: u16, code: u16 },

    #[error("Invalid HOM block: {0}")]
    InvalidMetadata(String),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
}

impl DiskError {
    /// True when the driver returned without touching the status byte
    pub fn is_unresponsive(&self) -> bool {
        matches!(self, DiskError::Io { status: 0xFF, .. })
    }
}
