//! Read access to the host's real-mode memory
//!
//! The device driver chain lives in DOS-owned memory and is only ever read.
//! `RealModeMemory` holds a captured image of that memory (or a synthetic
//! one built by tests) so discovery can run anywhere.

use crate::address::{FarPtr, ADDRESS_MASK};
use byteorder::{ByteOrder, LittleEndian};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Bytes addressable by the 8088
pub const REAL_MODE_SPAN: usize = ADDRESS_MASK as usize + 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Access at {address} (linear {linear:#07X}, {len} bytes) exceeds memory size {size:#X}")]
    OutOfRange {
        address: FarPtr,
        linear: u32,
        len: usize,
        size: usize,
    },

    #[error("No selector for segment {segment:04X} (DPMI error {code:04X})")]
    Unmapped { segment: u16, code: u16 },
}

/// Read-only view of system memory addressed by far pointers
pub trait SystemMemory {
    /// Copies `buf.len()` bytes starting at `addr`
    fn read(&self, addr: FarPtr, buf: &mut [u8]) -> Result<(), MemoryError>;

    fn read_u8(&self, addr: FarPtr) -> Result<u8, MemoryError> {
        let mut buf = [0u8; 1];
        self.read(addr, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&self, addr: FarPtr) -> Result<u16, MemoryError> {
        let mut buf = [0u8; 2];
        self.read(addr, &mut buf)?;
        Ok(LittleEndian::read_u16(&buf))
    }
}

/// Flat byte image of the first megabyte
///
/// Multi-byte accesses resolve each byte the way the CPU does: the offset
/// wraps inside its segment and the linear address wraps at 1 MiB.
#[derive(Debug, Clone)]
pub struct RealModeMemory {
    data: Vec<u8>,
}

impl RealModeMemory {
    /// Zero-filled memory covering the whole real-mode span
    pub fn new() -> Self {
        Self {
            data: vec![0; REAL_MODE_SPAN],
        }
    }

    /// Wraps a memory dump taken from linear address 0
    ///
    /// Dumps shorter than the full span are accepted; reads past their end
    /// fail with [`MemoryError::OutOfRange`].
    pub fn from_bytes(mut data: Vec<u8>) -> Self {
        data.truncate(REAL_MODE_SPAN);
        Self { data }
    }

    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let data = fs::read(path)?;
        if data.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "memory dump is empty",
            ));
        }
        Ok(Self::from_bytes(data))
    }

    pub fn write(&mut self, addr: FarPtr, bytes: &[u8]) -> Result<(), MemoryError> {
        for (i, &byte) in bytes.iter().enumerate() {
            let at = self.index(addr, i, bytes.len())?;
            self.data[at] = byte;
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn index(&self, addr: FarPtr, i: usize, len: usize) -> Result<usize, MemoryError> {
        let at = addr.wrapping_add(i as u16).linear() as usize;
        if at < self.data.len() {
            Ok(at)
        } else {
            Err(MemoryError::OutOfRange {
                address: addr,
                linear: addr.linear(),
                len,
                size: self.data.len(),
            })
        }
    }
}

impl Default for RealModeMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMemory for RealModeMemory {
    fn read(&self, addr: FarPtr, buf: &mut [u8]) -> Result<(), MemoryError> {
        let len = buf.len();
        for (i, out) in buf.iter_mut().enumerate() {
            *out = self.data[self.index(addr, i, len)?];
        }
        Ok(())
    }
}
