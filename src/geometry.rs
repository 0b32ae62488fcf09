//! HOM block parsing and disk geometry
//!
//! An initialized Rainbow Winchester keeps its geometry in the home block
//! at cylinder 0, head 0, sector 2. Disks that were never formatted under
//! MS-DOS have no HOM block and their geometry cannot be recovered here.

use crate::error::DiskError;
use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;
use std::fmt;
use std::io::Cursor;

pub const SECTOR_SIZE: usize = 512;
pub const HOM_SIGNATURE: &[u8; 3] = b"HOM";
/// Where the HOM block lives on an initialized disk
pub const HOM_LOCATION: Chs = Chs::new(0, 0, 2);

/// A cylinder/head/sector address, sector numbers starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Chs {
    pub cylinder: u16,
    pub head: u8,
    pub sector: u8,
}

impl Chs {
    pub const fn new(cylinder: u16, head: u8, sector: u8) -> Self {
        Self {
            cylinder,
            head,
            sector,
        }
    }
}

impl fmt::Display for Chs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C:{} H:{} S:{}", self.cylinder, self.head, self.sector)
    }
}

/// Decoded home block
///
/// Field order follows the Rainbow MS-DOS 2.05 technical documentation;
/// reserved areas are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeBlock {
    pub id: [u8; 3],
    pub partition_flag: i8,
    pub checksum: u16,
    pub volume_id: [u8; 8],
    pub system_id: [u16; 2],
    pub first_alt_track: u16,
    pub alt_tracks: u8,
    pub autoboot: u8,
    pub boot_track: u16,
    pub cylinders: u16,
    pub sectors_per_track: u8,
    pub sector_size: u16,
    pub surfaces: u8,
    pub maintenance_cylinder: u16,
    pub manufacturing_cylinder: u16,
    pub precompensation: u16,
    pub step_rate: u8,
    pub type_code: u8,
    pub block_number: u8,
}

impl HomeBlock {
    pub fn parse(data: &[u8]) -> Result<Self, DiskError> {
        if data.len() < SECTOR_SIZE {
            return Err(DiskError::InvalidMetadata(format!(
                "block too small ({} bytes)",
                data.len()
            )));
        }
        if &data[0..3] != HOM_SIGNATURE {
            return Err(DiskError::InvalidMetadata(format!(
                "signature {:02X?} is not HOM",
                &data[0..3]
            )));
        }

        let mut id = [0u8; 3];
        id.copy_from_slice(&data[0..3]);
        let mut volume_id = [0u8; 8];
        volume_id.copy_from_slice(&data[6..14]);

        let bad = |e: std::io::Error| DiskError::InvalidMetadata(e.to_string());
        let mut cursor = Cursor::new(data);

        cursor.set_position(3);
        let partition_flag = cursor.read_i8().map_err(bad)?;
        let checksum = cursor.read_u16::<LittleEndian>().map_err(bad)?;

        cursor.set_position(14);
        let system_id = [
            cursor.read_u16::<LittleEndian>().map_err(bad)?,
            cursor.read_u16::<LittleEndian>().map_err(bad)?,
        ];

        // Five 5-byte table descriptors (BAT, DPD, OSN, BOOT, AST) follow.
        cursor.set_position(43);
        let first_alt_track = cursor.read_u16::<LittleEndian>().map_err(bad)?;
        let alt_tracks = cursor.read_u8().map_err(bad)?;
        let autoboot = cursor.read_u8().map_err(bad)?;
        let boot_track = cursor.read_u16::<LittleEndian>().map_err(bad)?;

        cursor.set_position(64);
        let cylinders = cursor.read_u16::<LittleEndian>().map_err(bad)?;
        let sectors_per_track = cursor.read_u8().map_err(bad)?;
        let sector_size = cursor.read_u16::<LittleEndian>().map_err(bad)?;
        let surfaces = cursor.read_u8().map_err(bad)?;
        let maintenance_cylinder = cursor.read_u16::<LittleEndian>().map_err(bad)?;
        let manufacturing_cylinder = cursor.read_u16::<LittleEndian>().map_err(bad)?;
        let precompensation = cursor.read_u16::<LittleEndian>().map_err(bad)?;
        let step_rate = cursor.read_u8().map_err(bad)?;
        let type_code = cursor.read_u8().map_err(bad)?;
        let block_number = cursor.read_u8().map_err(bad)?;

        Ok(Self {
            id,
            partition_flag,
            checksum,
            volume_id,
            system_id,
            first_alt_track,
            alt_tracks,
            autoboot,
            boot_track,
            cylinders,
            sectors_per_track,
            sector_size,
            surfaces,
            maintenance_cylinder,
            manufacturing_cylinder,
            precompensation,
            step_rate,
            type_code,
            block_number,
        })
    }

    /// Volume id as text, trailing blanks and NULs removed
    pub fn volume_label(&self) -> String {
        String::from_utf8_lossy(&self.volume_id)
            .trim_end_matches([' ', '\0'])
            .to_string()
    }

    pub fn geometry(&self) -> DiskGeometry {
        DiskGeometry {
            cylinders: self.cylinders,
            heads: self.surfaces,
            sectors_per_track: self.sectors_per_track,
            sector_size: self.sector_size,
            volume_id: self.volume_id,
            volume_label: self.volume_label(),
            type_code: self.type_code,
            autoboot: self.autoboot,
            first_alt_track: self.first_alt_track,
            alt_tracks: self.alt_tracks,
            boot_track: self.boot_track,
        }
    }
}

/// Geometry and volume identification of the hard disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskGeometry {
    pub cylinders: u16,
    pub heads: u8,
    pub sectors_per_track: u8,
    pub sector_size: u16,
    #[serde(skip)]
    pub volume_id: [u8; 8],
    pub volume_label: String,
    pub type_code: u8,
    pub autoboot: u8,
    pub first_alt_track: u16,
    pub alt_tracks: u8,
    pub boot_track: u16,
}

impl DiskGeometry {
    pub fn is_autoboot(&self) -> bool {
        self.autoboot != 0
    }

    pub fn total_sectors(&self) -> u32 {
        self.cylinders as u32 * self.heads as u32 * self.sectors_per_track as u32
    }

    /// Linear sector number of `chs`, `None` if it lies outside the disk
    pub fn lba(&self, chs: Chs) -> Option<u32> {
        if chs.cylinder >= self.cylinders
            || chs.head >= self.heads
            || chs.sector == 0
            || chs.sector > self.sectors_per_track
        {
            return None;
        }
        let spt = self.sectors_per_track as u32;
        Some(
            (chs.cylinder as u32 * self.heads as u32 + chs.head as u32) * spt
                + (chs.sector as u32 - 1),
        )
    }

    pub fn chs(&self, lba: u32) -> Option<Chs> {
        if lba >= self.total_sectors() {
            return None;
        }
        let spt = self.sectors_per_track as u32;
        let per_cylinder = spt * self.heads as u32;
        Some(Chs::new(
            (lba / per_cylinder) as u16,
            ((lba % per_cylinder) / spt) as u8,
            (lba % spt + 1) as u8,
        ))
    }

    /// Every sector address in dump order: cylinder, then head, then sector
    pub fn addresses(&self) -> ChsIter {
        ChsIter {
            heads: self.heads,
            sectors_per_track: self.sectors_per_track,
            next_lba: 0,
            total: self.total_sectors(),
        }
    }
}

impl fmt::Display for DiskGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "C:{} H:{} S:{}",
            self.cylinders, self.heads, self.sectors_per_track
        )
    }
}

pub struct ChsIter {
    heads: u8,
    sectors_per_track: u8,
    next_lba: u32,
    total: u32,
}

impl Iterator for ChsIter {
    type Item = Chs;

    fn next(&mut self) -> Option<Chs> {
        if self.next_lba >= self.total {
            return None;
        }
        let lba = self.next_lba;
        self.next_lba += 1;

        let spt = self.sectors_per_track as u32;
        let per_cylinder = spt * self.heads as u32;
        Some(Chs::new(
            (lba / per_cylinder) as u16,
            ((lba % per_cylinder) / spt) as u8,
            (lba % spt + 1) as u8,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.total - self.next_lba) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ChsIter {}

/// Parses a HOM sector into the disk geometry
pub fn parse_geometry(buf: &[u8]) -> Result<DiskGeometry, DiskError> {
    HomeBlock::parse(buf).map(|hom| hom.geometry())
}

/// Boolean form of [`parse_geometry`]; `out` is left untouched on failure
pub fn parse_geometry_into(out: &mut Option<DiskGeometry>, buf: &[u8]) -> bool {
    match parse_geometry(buf) {
        Ok(geometry) => {
            *out = Some(geometry);
            true
        }
        Err(_) => false,
    }
}
