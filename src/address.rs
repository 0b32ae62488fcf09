//! Real-mode segment:offset addresses

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Link offset that terminates the device driver chain
pub const END_OF_CHAIN: u16 = 0xFFFF;

/// Address lines on the 8088; anything above wraps back to zero
pub const ADDRESS_MASK: u32 = 0xF_FFFF;

/// A 16-bit `segment:offset` pointer as seen by DOS and its drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FarPtr {
    pub segment: u16,
    pub offset: u16,
}

impl FarPtr {
    pub const fn new(segment: u16, offset: u16) -> Self {
        Self { segment, offset }
    }

    /// 20-bit physical address as the 8088 forms it
    #[inline]
    pub fn linear(self) -> u32 {
        (((self.segment as u32) << 4) + self.offset as u32) & ADDRESS_MASK
    }

    #[inline]
    pub fn is_end_of_chain(self) -> bool {
        self.offset == END_OF_CHAIN
    }

    /// Moves the offset forward, wrapping inside the segment like the CPU does
    pub fn wrapping_add(self, delta: u16) -> Self {
        Self {
            segment: self.segment,
            offset: self.offset.wrapping_add(delta),
        }
    }
}

impl fmt::Display for FarPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.segment, self.offset)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid far pointer '{0}', expected SEGMENT:OFFSET in hex")]
pub struct AddressParseError(pub String);

impl FromStr for FarPtr {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AddressParseError(s.to_string());
        let (seg, off) = s.trim().split_once(':').ok_or_else(err)?;
        let segment = u16::from_str_radix(seg.trim_start_matches("0x"), 16).map_err(|_| err())?;
        let offset = u16::from_str_radix(off.trim_start_matches("0x"), 16).map_err(|_| err())?;
        Ok(Self::new(segment, offset))
    }
}
