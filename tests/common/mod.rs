//! Builders for synthetic driver chains and HOM sectors

#![allow(dead_code)]

use rainbow_hd::host::HostProfile;
use rainbow_hd::{DeviceDriverHeader, DosVersion, FarPtr, RealModeMemory, StaticHost, SECTOR_SIZE};

/// Pointer a DOS 3.x host would return from INT 21h/52h
pub const LOL: FarPtr = FarPtr::new(0x00A0, 0x0026);
pub const DOS_311: DosVersion = DosVersion::new(3, 11, 0);
pub const DOS_211: DosVersion = DosVersion::new(2, 11, 0);
/// Distance between consecutive headers placed by [`write_chain`]
pub const NODE_SPACING: u16 = 0x40;

pub const HD_STRATEGY: u16 = 0x1A30;
pub const HD_INTERRUPT: u16 = 0x1A3B;

#[derive(Debug, Clone, Copy)]
pub struct NodeLayout {
    pub flags: u16,
    pub name: [u8; 8],
    pub strategy: u16,
    pub interrupt: u16,
}

pub fn units(n: u8) -> [u8; 8] {
    let mut name = [0u8; 8];
    name[0] = n;
    name
}

pub fn named(s: &str) -> [u8; 8] {
    let mut name = [b' '; 8];
    for (dst, src) in name.iter_mut().zip(s.bytes()) {
        *dst = src;
    }
    name
}

pub fn nul() -> NodeLayout {
    NodeLayout {
        flags: 0x8004,
        name: named("NUL"),
        strategy: 0x0100,
        interrupt: 0x0106,
    }
}

pub fn console() -> NodeLayout {
    NodeLayout {
        flags: 0x8013,
        name: named("CON"),
        strategy: 0x0200,
        interrupt: 0x0206,
    }
}

pub fn floppy() -> NodeLayout {
    NodeLayout {
        flags: 0x0000,
        name: units(4),
        strategy: 0x1400,
        interrupt: 0x140B,
    }
}

pub fn hard_disk() -> NodeLayout {
    NodeLayout {
        flags: 0x6000,
        name: units(1),
        strategy: HD_STRATEGY,
        interrupt: HD_INTERRUPT,
    }
}

pub fn header(node: &NodeLayout, next: FarPtr) -> DeviceDriverHeader {
    DeviceDriverHeader {
        next,
        flags: node.flags,
        strategy_offset: node.strategy,
        interrupt_offset: node.interrupt,
        name: node.name,
    }
}

pub fn write_header(memory: &mut RealModeMemory, at: FarPtr, node: &NodeLayout, next: FarPtr) {
    memory.write(at, &header(node, next).encode()).unwrap();
}

/// Lays `nodes` out from `head`, linked in order, the last one terminal
pub fn write_chain(memory: &mut RealModeMemory, head: FarPtr, nodes: &[NodeLayout]) -> Vec<FarPtr> {
    let addresses: Vec<FarPtr> = (0..nodes.len())
        .map(|i| head.wrapping_add(i as u16 * NODE_SPACING))
        .collect();
    for (i, node) in nodes.iter().enumerate() {
        let next = addresses
            .get(i + 1)
            .copied()
            .unwrap_or(FarPtr::new(0xFFFF, 0xFFFF));
        write_header(memory, addresses[i], node, next);
    }
    addresses
}

pub fn head_address(version: DosVersion) -> FarPtr {
    LOL.wrapping_add(HostProfile::from_version(version).head_offset())
}

pub fn host(version: DosVersion) -> StaticHost {
    StaticHost::new(version, LOL)
}

/// Memory holding `nodes` as the driver chain of a DOS 3.11 host
pub fn memory_with_chain(nodes: &[NodeLayout]) -> RealModeMemory {
    let mut memory = RealModeMemory::new();
    write_chain(&mut memory, head_address(DOS_311), nodes);
    memory
}

/// NUL -> four-unit floppy -> hard disk
pub fn scenario_a() -> (StaticHost, RealModeMemory) {
    let nul = NodeLayout {
        flags: 0x8000,
        ..nul()
    };
    (host(DOS_311), memory_with_chain(&[nul, floppy(), hard_disk()]))
}

pub fn hom_sector(cylinders: u16, surfaces: u8, sectors_per_track: u8) -> [u8; SECTOR_SIZE] {
    let mut sector = [0u8; SECTOR_SIZE];
    sector[0..3].copy_from_slice(b"HOM");
    sector[6..14].copy_from_slice(b"RAINBOW ");
    sector[43..45].copy_from_slice(&(cylinders - 1).to_le_bytes());
    sector[45] = 1;
    sector[46] = 0x01;
    sector[64..66].copy_from_slice(&cylinders.to_le_bytes());
    sector[66] = sectors_per_track;
    sector[67..69].copy_from_slice(&512u16.to_le_bytes());
    sector[69] = surfaces;
    sector[77] = 5;
    sector[78] = 2;
    sector
}
