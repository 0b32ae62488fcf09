//! Heuristics that tell the Rainbow's disk drivers apart
//!
//! Neither driver carries a name, so they are recognised by shape: the RX50
//! floppy driver serves exactly four units, and the Winchester driver is a
//! block device with IOCTL and non-IBM-format bits set serving at most two.

use super::header::{DeviceDriverHeader, FLAG_NAMED};

/// Attribute bits compared for the hard disk test
pub const HARD_DISK_FLAG_MASK: u16 = 0xE00F;
/// Expected attribute bits under [`HARD_DISK_FLAG_MASK`]
pub const HARD_DISK_FLAGS: u16 = 0x6000;
pub const FLOPPY_UNITS: u8 = 4;
pub const MAX_HARD_DISK_UNITS: u8 = 2;

pub fn is_four_unit_floppy(header: &DeviceDriverHeader) -> bool {
    header.flags & FLAG_NAMED == 0 && header.unit_count() == FLOPPY_UNITS
}

pub fn is_hard_disk_candidate(header: &DeviceDriverHeader) -> bool {
    header.flags & HARD_DISK_FLAG_MASK == HARD_DISK_FLAGS
        && header.unit_count() <= MAX_HARD_DISK_UNITS
}
