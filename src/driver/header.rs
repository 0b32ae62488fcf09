use crate::address::FarPtr;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Encoded size of a device driver header
pub const HEADER_LEN: usize = 18;

/// Flag bit 15: character device, name field holds a device name
pub const FLAG_NAMED: u16 = 0x8000;

/// A DOS device driver header as found in the driver chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDriverHeader {
    pub next: FarPtr,
    pub flags: u16,
    pub strategy_offset: u16,
    pub interrupt_offset: u16,
    /// Device name, or for block devices the unit count in byte 0
    pub name: [u8; 8],
}

impl DeviceDriverHeader {
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        let mut name = [0u8; 8];
        name.copy_from_slice(&bytes[10..18]);
        Self {
            next: FarPtr::new(
                LittleEndian::read_u16(&bytes[2..4]),
                LittleEndian::read_u16(&bytes[0..2]),
            ),
            flags: LittleEndian::read_u16(&bytes[4..6]),
            strategy_offset: LittleEndian::read_u16(&bytes[6..8]),
            interrupt_offset: LittleEndian::read_u16(&bytes[8..10]),
            name,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        LittleEndian::write_u16(&mut out[0..2], self.next.offset);
        LittleEndian::write_u16(&mut out[2..4], self.next.segment);
        LittleEndian::write_u16(&mut out[4..6], self.flags);
        LittleEndian::write_u16(&mut out[6..8], self.strategy_offset);
        LittleEndian::write_u16(&mut out[8..10], self.interrupt_offset);
        out[10..18].copy_from_slice(&self.name);
        out
    }

    /// Byte 0 of the name field read as a block device unit count
    #[inline]
    pub fn unit_count(&self) -> u8 {
        self.name[0]
    }

    #[inline]
    pub fn is_named(&self) -> bool {
        self.flags & FLAG_NAMED != 0
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.next.is_end_of_chain()
    }

    /// Printable device name, only meaningful for named devices
    pub fn device_name(&self) -> String {
        self.name
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect()
    }
}

impl fmt::Display for DeviceDriverHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (units, name) = if self.is_named() {
            (0, self.device_name())
        } else {
            (self.unit_count(), " ".repeat(8))
        };
        write!(
            f,
            "Next={} Stg={:04X} Int={:04X} Flg={:04X} NU={} [{}]",
            self.next, self.strategy_offset, self.interrupt_offset, self.flags, units, name
        )
    }
}
