//! Host operating system services and version detection
//!
//! Discovery needs two answers from DOS: its version (INT 21h, AH=30h) and
//! the address of its internal variable table (INT 21h, AH=52h), whose
//! layout shifted between DOS 2 and DOS 3. The version also decides which
//! segment the resident BIOS drivers were loaded into.

use crate::address::FarPtr;
use crate::error::DiskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

/// NUL device offset from the list-of-lists pointer on DOS 2.x
pub const LEGACY_HEAD_OFFSET: u16 = 0x17;
/// NUL device offset from the list-of-lists pointer on DOS 3.0 and later
pub const CURRENT_HEAD_OFFSET: u16 = 0x22;
/// Driver segment used by the Rainbow BIOS up to DOS 3.10a
pub const LEGACY_DRIVER_SEGMENT: u16 = 0x0040;
/// Driver segment used from DOS 3.10b onwards
pub const CURRENT_DRIVER_SEGMENT: u16 = 0x0070;

/// Version triple as reported by INT 21h function 30h
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DosVersion {
    pub major: u8,
    pub minor: u8,
    /// Revision letter reported in CL, zero when absent
    pub extra: u8,
}

impl DosVersion {
    pub const fn new(major: u8, minor: u8, extra: u8) -> Self {
        Self {
            major,
            minor,
            extra,
        }
    }
}

impl fmt::Display for DosVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.extra.is_ascii_graphic() {
            write!(f, "{}", self.extra as char)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid DOS version '{0}', expected MAJOR.MINOR with optional revision letter")]
pub struct VersionParseError(pub String);

impl FromStr for DosVersion {
    type Err = VersionParseError;

    /// Accepts `3.10`, `3.10b`, `2.11`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError(s.to_string());
        let (major, rest) = s.trim().split_once('.').ok_or_else(err)?;
        let digits = rest.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        let suffix = &rest[digits.len()..];
        if suffix.len() > 1 {
            return Err(err());
        }
        Ok(Self {
            major: major.parse().map_err(|_| err())?,
            minor: digits.parse().map_err(|_| err())?,
            extra: suffix.bytes().next().unwrap_or(0),
        })
    }
}

/// The DOS calls discovery depends on
pub trait HostServices {
    fn dos_version(&self) -> DosVersion;

    /// Pointer returned in ES:BX by INT 21h function 52h
    fn list_of_lists(&self) -> Result<FarPtr, DiskError>;
}

/// Host with fixed answers, used for offline analysis of memory dumps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHost {
    pub version: DosVersion,
    pub list_of_lists: FarPtr,
}

impl StaticHost {
    pub fn new(version: DosVersion, list_of_lists: FarPtr) -> Self {
        Self {
            version,
            list_of_lists,
        }
    }
}

impl HostServices for StaticHost {
    fn dos_version(&self) -> DosVersion {
        self.version
    }

    fn list_of_lists(&self) -> Result<FarPtr, DiskError> {
        Ok(self.list_of_lists)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OffsetScheme {
    Legacy,
    Current,
}

/// Constants selected from the host version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostProfile {
    pub version: DosVersion,
    pub head_scheme: OffsetScheme,
    pub segment_scheme: OffsetScheme,
}

impl HostProfile {
    pub fn from_version(version: DosVersion) -> Self {
        if version.major == 0 {
            warn!(
                "Unexpected DOS version {}, assuming the current offset scheme",
                version
            );
            return Self {
                version,
                head_scheme: OffsetScheme::Current,
                segment_scheme: OffsetScheme::Current,
            };
        }

        let head_scheme = if version.major < 3 {
            OffsetScheme::Legacy
        } else {
            OffsetScheme::Current
        };

        let late_310 = version.minor > 10 || (version.minor == 10 && version.extra > b'a');
        let segment_scheme = if version.major > 3 || (version.major == 3 && late_310) {
            OffsetScheme::Current
        } else {
            OffsetScheme::Legacy
        };

        Self {
            version,
            head_scheme,
            segment_scheme,
        }
    }

    /// Offset of the NUL device header from the list-of-lists pointer
    pub fn head_offset(&self) -> u16 {
        match self.head_scheme {
            OffsetScheme::Legacy => LEGACY_HEAD_OFFSET,
            OffsetScheme::Current => CURRENT_HEAD_OFFSET,
        }
    }

    /// Segment the hard disk driver's entry points live in
    pub fn driver_segment(&self) -> u16 {
        match self.segment_scheme {
            OffsetScheme::Legacy => LEGACY_DRIVER_SEGMENT,
            OffsetScheme::Current => CURRENT_DRIVER_SEGMENT,
        }
    }
}

/// Queries the host version and derives the offset constants
pub fn detect_profile(host: &dyn HostServices) -> HostProfile {
    let version = host.dos_version();
    info!("DOS Version: {}", version);
    HostProfile::from_version(version)
}
