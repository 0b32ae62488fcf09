//! Wire formats passed to the Winchester driver
//!
//! A read is a DOS device request header (command 3) whose transfer address
//! points at a Winchester control block rather than at a data buffer. The
//! control block carries the CHS address and the real destination buffer.

use crate::address::FarPtr;
use crate::geometry::Chs;
use byteorder::{ByteOrder, LittleEndian};

pub const REQUEST_HEADER_LEN: usize = 22;
pub const COMMAND_BLOCK_LEN: usize = 14;

pub const REQUEST_LENGTH: u8 = 13;
pub const REQUEST_UNIT: u8 = 5;
pub const COMMAND_READ: u8 = 0x03;

pub const FUNCTION_READ: u8 = 0x00;
/// Drive select meaning "physical unit"
pub const PHYSICAL_DRIVE: u8 = 0xFF;
/// Mode bit combined with the head number in the unit byte
pub const UNIT_MODE_BIT: u8 = 0x40;
/// Highest head number that leaves the mode bit intact
pub const MAX_HEAD: u8 = UNIT_MODE_BIT - 1;
/// Pre-call value of status and error; the driver must overwrite status
pub const STATUS_PENDING: u8 = 0xFF;
pub const STATUS_OK: u8 = 0x00;

/// DOS device request header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub length: u8,
    pub unit: u8,
    pub command: u8,
    pub status: u16,
    pub reserved: [u8; 8],
    pub media: u8,
    pub transfer: FarPtr,
    pub count: u16,
    pub start: u16,
}

impl RequestHeader {
    /// Read request whose payload is the control block at `command_block`
    pub fn read(command_block: FarPtr) -> Self {
        Self {
            length: REQUEST_LENGTH,
            unit: REQUEST_UNIT,
            command: COMMAND_READ,
            status: 0,
            reserved: [0; 8],
            media: 0,
            transfer: command_block,
            count: 0,
            start: 0,
        }
    }

    pub fn encode(&self) -> [u8; REQUEST_HEADER_LEN] {
        let mut out = [0u8; REQUEST_HEADER_LEN];
        out[0] = self.length;
        out[1] = self.unit;
        out[2] = self.command;
        LittleEndian::write_u16(&mut out[3..5], self.status);
        out[5..13].copy_from_slice(&self.reserved);
        out[13] = self.media;
        LittleEndian::write_u16(&mut out[14..16], self.transfer.offset);
        LittleEndian::write_u16(&mut out[16..18], self.transfer.segment);
        LittleEndian::write_u16(&mut out[18..20], self.count);
        LittleEndian::write_u16(&mut out[20..22], self.start);
        out
    }

    pub fn decode(bytes: &[u8; REQUEST_HEADER_LEN]) -> Self {
        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&bytes[5..13]);
        Self {
            length: bytes[0],
            unit: bytes[1],
            command: bytes[2],
            status: LittleEndian::read_u16(&bytes[3..5]),
            reserved,
            media: bytes[13],
            transfer: FarPtr::new(
                LittleEndian::read_u16(&bytes[16..18]),
                LittleEndian::read_u16(&bytes[14..16]),
            ),
            count: LittleEndian::read_u16(&bytes[18..20]),
            start: LittleEndian::read_u16(&bytes[20..22]),
        }
    }
}

/// Winchester control block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBlock {
    pub function: u8,
    pub drive: u8,
    /// 1-based
    pub sector: u8,
    /// Head number with [`UNIT_MODE_BIT`] set
    pub unit: u8,
    pub track: u16,
    pub sector_count: u16,
    pub buffer: FarPtr,
    pub status: u8,
    pub error: u8,
}

impl CommandBlock {
    /// Single-sector read of `chs` into `buffer`, status not yet reported
    pub fn read(chs: Chs, buffer: FarPtr) -> Self {
        Self {
            function: FUNCTION_READ,
            drive: PHYSICAL_DRIVE,
            sector: chs.sector,
            unit: chs.head | UNIT_MODE_BIT,
            track: chs.cylinder,
            sector_count: 1,
            buffer,
            status: STATUS_PENDING,
            error: STATUS_PENDING,
        }
    }

    /// Head number with the mode bit stripped
    #[inline]
    pub fn head(&self) -> u8 {
        self.unit & !UNIT_MODE_BIT
    }

    pub fn chs(&self) -> Chs {
        Chs::new(self.track, self.head(), self.sector)
    }

    pub fn encode(&self) -> [u8; COMMAND_BLOCK_LEN] {
        let mut out = [0u8; COMMAND_BLOCK_LEN];
        out[0] = self.function;
        out[1] = self.drive;
        out[2] = self.sector;
        out[3] = self.unit;
        LittleEndian::write_u16(&mut out[4..6], self.track);
        LittleEndian::write_u16(&mut out[6..8], self.sector_count);
        LittleEndian::write_u16(&mut out[8..10], self.buffer.offset);
        LittleEndian::write_u16(&mut out[10..12], self.buffer.segment);
        out[12] = self.status;
        out[13] = self.error;
        out
    }

    pub fn decode(bytes: &[u8; COMMAND_BLOCK_LEN]) -> Self {
        Self {
            function: bytes[0],
            drive: bytes[1],
            sector: bytes[2],
            unit: bytes[3],
            track: LittleEndian::read_u16(&bytes[4..6]),
            sector_count: LittleEndian::read_u16(&bytes[6..8]),
            buffer: FarPtr::new(
                LittleEndian::read_u16(&bytes[10..12]),
                LittleEndian::read_u16(&bytes[8..10]),
            ),
            status: bytes[12],
            error: bytes[13],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_block_layout() {
        let block = CommandBlock::read(Chs::new(0x0102, 3, 9), FarPtr::new(0x2000, 0x0400));
        let raw = block.encode();
        assert_eq!(
            raw,
            [0x00, 0xFF, 0x09, 0x43, 0x02, 0x01, 0x01, 0x00, 0x00, 0x04, 0x00, 0x20, 0xFF, 0xFF]
        );
        assert_eq!(CommandBlock::decode(&raw).chs(), Chs::new(0x0102, 3, 9));
    }

    #[test]
    fn test_request_header_layout() {
        let raw = RequestHeader::read(FarPtr::new(0x1234, 0x5678)).encode();
        assert_eq!(&raw[0..3], &[13, 5, 3]);
        assert_eq!(&raw[14..18], &[0x78, 0x56, 0x34, 0x12]);
    }
}
