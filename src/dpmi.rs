//! Backends for running on the machine as a DPMI client
//!
//! Rust has no 16-bit x86 target. The program therefore runs as a 32-bit
//! protected-mode client of a DPMI host and reaches DOS, low memory and
//! the real-mode driver through the host's INT 31h services. The driver
//! never sees a protected-mode address: its request, control block and
//! sector buffer sit in conventional memory allocated from DOS, and every
//! pointer it receives is that block's real-mode segment plus an offset.
//!
//! Only built with the `dpmi` feature on 32-bit x86.

use crate::address::FarPtr;
use crate::error::DiskError;
use crate::host::{DosVersion, HostServices};
use crate::invoker::{check_transfer_range, DriverInvoker, TRANSFER_AREA_LEN};
use crate::memory::{MemoryError, SystemMemory};
use core::arch::asm;
use tracing::{debug, warn};

const SEGMENT_TO_DESCRIPTOR: u16 = 0x0002;
const ALLOCATE_DOS_MEMORY: u16 = 0x0100;
const FREE_DOS_MEMORY: u16 = 0x0101;
const SIMULATE_INTERRUPT: u16 = 0x0300;
const CALL_FAR_PROCEDURE: u16 = 0x0301;

/// Register image exchanged with INT 31h functions 0300h and 0301h
#[repr(C, packed)]
#[derive(Debug, Default, Clone, Copy)]
struct RealModeRegs {
    edi: u32,
    esi: u32,
    ebp: u32,
    reserved: u32,
    ebx: u32,
    edx: u32,
    ecx: u32,
    eax: u32,
    flags: u16,
    es: u16,
    ds: u16,
    fs: u16,
    gs: u16,
    ip: u16,
    cs: u16,
    sp: u16,
    ss: u16,
}

/// Runs a real-mode service with the register image at ES:EDI
///
/// SS:SP of zero asks the host for its own real-mode stack.
///
/// # Safety
/// `regs` must describe a real-mode call that returns to the host.
unsafe fn real_mode_service(function: u16, bx: u16, regs: &mut RealModeRegs) -> Result<(), u16> {
    let ax: u16;
    let carry: u8;
    // SAFETY: ES is set to the flat data selector for the call and restored.
    unsafe {
        asm!(
            "push es",
            "push ds",
            "pop es",
            "int 0x31",
            "pop es",
            "setc {carry}",
            carry = out(reg_byte) carry,
            inout("ax") function => ax,
            in("bx") bx,
            in("cx") 0u16,
            in("edi") regs as *mut RealModeRegs,
        );
    }
    if carry != 0 { Err(ax) } else { Ok(()) }
}

/// Selector whose base is `segment * 16`, limit 64 KiB
fn segment_selector(segment: u16) -> Result<u16, u16> {
    let ax: u16;
    let carry: u8;
    // SAFETY: function 0002h only returns a value in AX.
    unsafe {
        asm!(
            "int 0x31",
            "setc {carry}",
            carry = out(reg_byte) carry,
            inout("ax") SEGMENT_TO_DESCRIPTOR => ax,
            in("bx") segment,
        );
    }
    if carry != 0 { Err(ax) } else { Ok(ax) }
}

/// # Safety
/// `selector` must be a readable data selector.
unsafe fn peek(selector: u16, offset: u16) -> u8 {
    let value: u8;
    // SAFETY: ES is borrowed for one load and restored.
    unsafe {
        asm!(
            "push es",
            "mov es, {sel:x}",
            "mov {val}, byte ptr es:[{off:e}]",
            "pop es",
            sel = in(reg) selector,
            off = in(reg) offset as u32,
            val = out(reg_byte) value,
        );
    }
    value
}

/// # Safety
/// `selector` must be a writable data selector.
unsafe fn poke(selector: u16, offset: u16, value: u8) {
    // SAFETY: ES is borrowed for one store and restored.
    unsafe {
        asm!(
            "push es",
            "mov es, {sel:x}",
            "mov byte ptr es:[{off:e}], {val}",
            "pop es",
            sel = in(reg) selector,
            off = in(reg) offset as u32,
            val = in(reg_byte) value,
        );
    }
}

/// INT 21h access to the running DOS
#[derive(Debug, Default, Clone, Copy)]
pub struct DosHost;

impl HostServices for DosHost {
    fn dos_version(&self) -> DosVersion {
        let ax: u16;
        let cx: u16;
        // SAFETY: function 30h only returns values in AX, BX and CX, which
        // every DPMI host passes through unchanged.
        unsafe {
            asm!(
                "int 0x21",
                inout("ax") 0x3000u16 => ax,
                out("cx") cx,
                out("bx") _,
            );
        }
        DosVersion::new(ax as u8, (ax >> 8) as u8, cx as u8)
    }

    /// ES holds a real-mode segment, so the call goes through the host's
    /// interrupt simulation instead of a protected-mode INT 21h.
    fn list_of_lists(&self) -> Result<FarPtr, DiskError> {
        let mut regs = RealModeRegs {
            eax: 0x5200,
            ..Default::default()
        };
        // SAFETY: INT 21h function 52h returns to the host with ES:BX set.
        unsafe { real_mode_service(SIMULATE_INTERRUPT, 0x0021, &mut regs) }.map_err(|code| {
            DiskError::Dpmi {
                function: SIMULATE_INTERRUPT,
                code,
            }
        })?;
        let (segment, offset) = (regs.es, regs.ebx as u16);
        Ok(FarPtr::new(segment, offset))
    }
}

/// Reads of conventional memory through per-segment selectors
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectMemory;

impl SystemMemory for DirectMemory {
    fn read(&self, addr: FarPtr, buf: &mut [u8]) -> Result<(), MemoryError> {
        let selector = segment_selector(addr.segment).map_err(|code| MemoryError::Unmapped {
            segment: addr.segment,
            code,
        })?;
        for (i, out) in buf.iter_mut().enumerate() {
            // SAFETY: the selector spans the whole 64 KiB segment.
            *out = unsafe { peek(selector, addr.offset.wrapping_add(i as u16)) };
        }
        Ok(())
    }
}

/// Enters the Winchester driver through INT 31h function 0301h
///
/// Owns a block of conventional memory used as the transfer area; it is
/// returned to DOS on drop.
#[derive(Debug)]
pub struct FarCallInvoker {
    segment: u16,
    selector: u16,
}

impl FarCallInvoker {
    pub fn new() -> Result<Self, DiskError> {
        let paragraphs = TRANSFER_AREA_LEN.div_ceil(16) as u16;
        let ax: u16;
        let dx: u16;
        let carry: u8;
        // SAFETY: function 0100h returns the segment in AX and selector in DX.
        unsafe {
            asm!(
                "int 0x31",
                "setc {carry}",
                carry = out(reg_byte) carry,
                inout("ax") ALLOCATE_DOS_MEMORY => ax,
                inout("bx") paragraphs => _,
                out("dx") dx,
            );
        }
        if carry != 0 {
            return Err(DiskError::Dpmi {
                function: ALLOCATE_DOS_MEMORY,
                code: ax,
            });
        }
        debug!("Transfer area at {:04X}:0000 (selector {:04X})", ax, dx);
        Ok(Self {
            segment: ax,
            selector: dx,
        })
    }
}

impl Drop for FarCallInvoker {
    fn drop(&mut self) {
        let ax: u16;
        let carry: u8;
        // SAFETY: the selector came from function 0100h and is freed once.
        unsafe {
            asm!(
                "int 0x31",
                "setc {carry}",
                carry = out(reg_byte) carry,
                inout("ax") FREE_DOS_MEMORY => ax,
                in("dx") self.selector,
            );
        }
        if carry != 0 {
            warn!("Could not free transfer area {:04X}: error {:04X}", self.segment, ax);
        }
    }
}

impl DriverInvoker for FarCallInvoker {
    fn transfer_area(&self) -> FarPtr {
        FarPtr::new(self.segment, 0x0000)
    }

    fn store(&mut self, offset: u16, bytes: &[u8]) -> Result<(), DiskError> {
        check_transfer_range(self.transfer_area(), offset, bytes.len())?;
        for (i, &byte) in bytes.iter().enumerate() {
            // SAFETY: the range was checked against the allocated block.
            unsafe { poke(self.selector, offset + i as u16, byte) };
        }
        Ok(())
    }

    fn load(&self, offset: u16, buf: &mut [u8]) -> Result<(), DiskError> {
        check_transfer_range(self.transfer_area(), offset, buf.len())?;
        for (i, out) in buf.iter_mut().enumerate() {
            // SAFETY: the range was checked against the allocated block.
            *out = unsafe { peek(self.selector, offset + i as u16) };
        }
        Ok(())
    }

    fn far_call(&mut self, entry: FarPtr, es_bx: FarPtr) -> Result<(), DiskError> {
        let mut regs = RealModeRegs {
            ebx: es_bx.offset as u32,
            es: es_bx.segment,
            ds: es_bx.segment,
            cs: entry.segment,
            ip: entry.offset,
            ..Default::default()
        };
        // SAFETY: `entry` was validated against the driver chain and ends
        // with RETF; everything it reads is in the transfer area.
        unsafe { real_mode_service(CALL_FAR_PROCEDURE, 0x0000, &mut regs) }.map_err(|code| {
            DiskError::Dpmi {
                function: CALL_FAR_PROCEDURE,
                code,
            }
        })
    }
}
