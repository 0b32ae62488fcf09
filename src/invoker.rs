//! Calling into the bound driver
//!
//! The driver only understands real-mode segment:offset pointers, so every
//! structure it touches lives in a transfer area the invoker places where
//! the driver can reach it. A read is two far calls with ES:BX at the
//! request header: the strategy entry latches the request and the
//! interrupt entry services it. [`ScriptedInvoker`] stands in for the
//! driver wherever no Rainbow is attached.

use crate::address::FarPtr;
use crate::error::DiskError;
use crate::geometry::{Chs, SECTOR_SIZE};
use crate::memory::MemoryError;
use crate::request::{
    CommandBlock, RequestHeader, COMMAND_BLOCK_LEN, REQUEST_HEADER_LEN, STATUS_OK,
};
use std::collections::{HashMap, VecDeque};

/// Transfer area layout: request header, then control block, then sector
pub const REQUEST_OFFSET: u16 = 0x0000;
pub const COMMAND_OFFSET: u16 = 0x0020;
pub const BUFFER_OFFSET: u16 = 0x0030;
pub const TRANSFER_AREA_LEN: usize = BUFFER_OFFSET as usize + SECTOR_SIZE;

/// Far-call access to real-mode code plus the memory it reads
pub trait DriverInvoker {
    /// Real-mode address of a transfer area of [`TRANSFER_AREA_LEN`] bytes
    /// that does not cross the end of its segment
    fn transfer_area(&self) -> FarPtr;

    /// Copies `bytes` into the transfer area at `offset`
    fn store(&mut self, offset: u16, bytes: &[u8]) -> Result<(), DiskError>;

    /// Copies transfer area bytes starting at `offset` into `buf`
    fn load(&self, offset: u16, buf: &mut [u8]) -> Result<(), DiskError>;

    /// Calls `entry` with ES:BX = `es_bx` and returns after its RETF
    fn far_call(&mut self, entry: FarPtr, es_bx: FarPtr) -> Result<(), DiskError>;
}

impl<T: DriverInvoker + ?Sized> DriverInvoker for &mut T {
    fn transfer_area(&self) -> FarPtr {
        (**self).transfer_area()
    }

    fn store(&mut self, offset: u16, bytes: &[u8]) -> Result<(), DiskError> {
        (**self).store(offset, bytes)
    }

    fn load(&self, offset: u16, buf: &mut [u8]) -> Result<(), DiskError> {
        (**self).load(offset, buf)
    }

    fn far_call(&mut self, entry: FarPtr, es_bx: FarPtr) -> Result<(), DiskError> {
        (**self).far_call(entry, es_bx)
    }
}

/// Rejects accesses that would leave the transfer area
pub fn check_transfer_range(area: FarPtr, offset: u16, len: usize) -> Result<(), DiskError> {
    if offset as usize + len > TRANSFER_AREA_LEN {
        let address = area.wrapping_add(offset);
        return Err(MemoryError::OutOfRange {
            address,
            linear: address.linear(),
            len,
            size: TRANSFER_AREA_LEN,
        }
        .into());
    }
    Ok(())
}

/// Status the scripted driver reports for sectors it has no data for
pub const SCRIPTED_SECTOR_NOT_FOUND: u8 = 0x10;
/// Segment of the scripted driver's transfer area
pub const SCRIPTED_TRANSFER_SEGMENT: u16 = 0x2000;

/// One programmed driver reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedResponse {
    /// Report success, optionally filling the destination buffer
    Complete(Option<Box<[u8; SECTOR_SIZE]>>),
    /// Report the given status and error bytes
    Fail { status: u8, error: u8 },
    /// Return without touching the control block
    Silent,
}

/// A far call as the callee saw it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarCall {
    pub entry: FarPtr,
    pub es_bx: FarPtr,
}

/// A serviced request, decoded from the transfer area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedCall {
    /// Where the serviced request header was latched from
    pub request_at: FarPtr,
    pub request: RequestHeader,
    pub command: CommandBlock,
}

/// Test double for the Winchester driver
///
/// Follows the DOS two-step protocol: a far call with no request pending
/// latches ES:BX, the next one services the latched request by following
/// its pointers through the transfer area. Queued responses are consumed
/// first, in order. Without one, reads of a sector registered through
/// [`ScriptedInvoker::with_sector`] succeed with its contents and anything
/// else fails with [`SCRIPTED_SECTOR_NOT_FOUND`].
#[derive(Debug)]
pub struct ScriptedInvoker {
    area: Vec<u8>,
    queue: VecDeque<ScriptedResponse>,
    sectors: HashMap<Chs, Box<[u8; SECTOR_SIZE]>>,
    latched: Option<FarPtr>,
    far_calls: Vec<FarCall>,
    calls: Vec<RecordedCall>,
}

impl Default for ScriptedInvoker {
    fn default() -> Self {
        Self {
            area: vec![0; TRANSFER_AREA_LEN],
            queue: VecDeque::new(),
            sectors: HashMap::new(),
            latched: None,
            far_calls: Vec::new(),
            calls: Vec::new(),
        }
    }
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sector(mut self, chs: Chs, data: [u8; SECTOR_SIZE]) -> Self {
        self.sectors.insert(chs, Box::new(data));
        self
    }

    pub fn push_response(&mut self, response: ScriptedResponse) {
        self.queue.push_back(response);
    }

    /// Every far call received, in order
    pub fn far_calls(&self) -> &[FarCall] {
        &self.far_calls
    }

    /// Every request serviced, in order
    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    pub fn last_call(&self) -> Option<&RecordedCall> {
        self.calls.last()
    }

    /// Index into the area of `len` bytes at real-mode address `ptr`
    fn area_index(&self, ptr: FarPtr, len: usize) -> Option<usize> {
        let start = ptr.linear().checked_sub(self.transfer_area().linear())? as usize;
        (start + len <= self.area.len()).then_some(start)
    }

    fn respond(&mut self, chs: Chs) -> ScriptedResponse {
        if let Some(response) = self.queue.pop_front() {
            return response;
        }
        match self.sectors.get(&chs) {
            Some(data) => ScriptedResponse::Complete(Some(data.clone())),
            None => ScriptedResponse::Fail {
                status: SCRIPTED_SECTOR_NOT_FOUND,
                error: 0x00,
            },
        }
    }

    /// Pointers that leave the area are ignored, as a real driver would
    /// scribble somewhere else and leave the status pending.
    fn service(&mut self, request_at: FarPtr) {
        let Some(at) = self.area_index(request_at, REQUEST_HEADER_LEN) else {
            return;
        };
        let mut raw = [0u8; REQUEST_HEADER_LEN];
        raw.copy_from_slice(&self.area[at..at + REQUEST_HEADER_LEN]);
        let request = RequestHeader::decode(&raw);

        let Some(cmd_at) = self.area_index(request.transfer, COMMAND_BLOCK_LEN) else {
            return;
        };
        let mut raw = [0u8; COMMAND_BLOCK_LEN];
        raw.copy_from_slice(&self.area[cmd_at..cmd_at + COMMAND_BLOCK_LEN]);
        let mut command = CommandBlock::decode(&raw);
        self.calls.push(RecordedCall {
            request_at,
            request,
            command,
        });

        match self.respond(command.chs()) {
            ScriptedResponse::Complete(data) => {
                let target = self.area_index(command.buffer, SECTOR_SIZE);
                match (data, target) {
                    (Some(data), Some(buf_at)) => {
                        self.area[buf_at..buf_at + SECTOR_SIZE].copy_from_slice(&data[..]);
                        command.status = STATUS_OK;
                        command.error = 0;
                    }
                    (Some(_), None) => {
                        command.status = SCRIPTED_SECTOR_NOT_FOUND;
                        command.error = 0;
                    }
                    (None, _) => {
                        command.status = STATUS_OK;
                        command.error = 0;
                    }
                }
            }
            ScriptedResponse::Fail { status, error } => {
                command.status = status;
                command.error = error;
            }
            ScriptedResponse::Silent => return,
        }
        self.area[cmd_at..cmd_at + COMMAND_BLOCK_LEN].copy_from_slice(&command.encode());
    }
}

impl DriverInvoker for ScriptedInvoker {
    fn transfer_area(&self) -> FarPtr {
        FarPtr::new(SCRIPTED_TRANSFER_SEGMENT, 0x0000)
    }

    fn store(&mut self, offset: u16, bytes: &[u8]) -> Result<(), DiskError> {
        check_transfer_range(self.transfer_area(), offset, bytes.len())?;
        let at = offset as usize;
        self.area[at..at + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn load(&self, offset: u16, buf: &mut [u8]) -> Result<(), DiskError> {
        check_transfer_range(self.transfer_area(), offset, buf.len())?;
        let at = offset as usize;
        buf.copy_from_slice(&self.area[at..at + buf.len()]);
        Ok(())
    }

    fn far_call(&mut self, entry: FarPtr, es_bx: FarPtr) -> Result<(), DiskError> {
        self.far_calls.push(FarCall { entry, es_bx });
        match self.latched.take() {
            None => self.latched = Some(es_bx),
            Some(request_at) => self.service(request_at),
        }
        Ok(())
    }
}
