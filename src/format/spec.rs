/// Disk geometry specifications and TR-DOS presets

use crate::format::constants::{
    TRDOS_DS40, TRDOS_DS80, TRDOS_SS40, TRDOS_SS80, TRD_SECTORS_PER_TRACK, TRD_SECTOR_SIZE,
};

/// Disk geometry specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    /// Number of sides (1 or 2)
    pub num_sides: u8,
    /// Number of tracks (cylinders) per side
    pub num_tracks: u8,
    /// Sectors per track
    pub sectors_per_track: u8,
    /// Sector size in bytes
    pub sector_size: u16,
    /// First sector ID (TR-DOS numbers sectors from 1)
    pub first_sector_id: u8,
    /// GAP#3 length
    pub gap3_length: u8,
    /// Filler byte for formatting
    pub filler_byte: u8,
    /// Side arrangement mode
    pub side_mode: SideMode,
}

/// Side arrangement mode for double-sided disks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideMode {
    /// Single-sided
    SingleSide,
    /// Tracks alternate: side 0 track 0, side 1 track 0, side 0 track 1, side 1 track 1, ...
    Alternate,
    /// Tracks successive: side 0 tracks 0-N, side 1 tracks 0-N
    Successive,
}

impl FormatSpec {
    /// Create a new format specification with TR-DOS style sector numbering
    pub fn new(num_sides: u8, num_tracks: u8, sectors_per_track: u8, sector_size: u16) -> Self {
        Self {
            num_sides,
            num_tracks,
            sectors_per_track,
            sector_size,
            first_sector_id: 0x01,
            gap3_length: 0x36,
            filler_byte: 0x00,
            side_mode: if num_sides == 1 {
                SideMode::SingleSide
            } else {
                SideMode::Alternate
            },
        }
    }

    fn trdos(num_sides: u8, num_tracks: u8) -> Self {
        Self::new(
            num_sides,
            num_tracks,
            TRD_SECTORS_PER_TRACK as u8,
            TRD_SECTOR_SIZE as u16,
        )
    }

    /// TR-DOS 80 track double-sided (640K, disk type 0x16)
    pub fn trdos_ds80() -> Self {
        Self::trdos(2, 80)
    }

    /// TR-DOS 40 track double-sided (disk type 0x17)
    pub fn trdos_ds40() -> Self {
        Self::trdos(2, 40)
    }

    /// TR-DOS 80 track single-sided (disk type 0x18)
    pub fn trdos_ss80() -> Self {
        Self::trdos(1, 80)
    }

    /// TR-DOS 40 track single-sided (disk type 0x19)
    pub fn trdos_ss40() -> Self {
        Self::trdos(1, 40)
    }

    /// Spectrum +3 format (40 tracks, 9 sectors, 512 bytes)
    pub fn spectrum_plus3() -> Self {
        Self {
            num_sides: 1,
            num_tracks: 40,
            sectors_per_track: 9,
            sector_size: 512,
            first_sector_id: 0x01,
            gap3_length: 0x2A,
            filler_byte: 0xE5,
            side_mode: SideMode::SingleSide,
        }
    }

    /// Geometry for a TR-DOS disk type byte from the specification sector
    pub fn from_trdos_disk_type(disk_type: u8) -> Option<Self> {
        match disk_type {
            TRDOS_DS80 => Some(Self::trdos_ds80()),
            TRDOS_DS40 => Some(Self::trdos_ds40()),
            TRDOS_SS80 => Some(Self::trdos_ss80()),
            TRDOS_SS40 => Some(Self::trdos_ss40()),
            _ => None,
        }
    }

    /// TR-DOS disk type byte for this geometry, if it is a TR-DOS geometry
    pub fn trdos_disk_type(&self) -> Option<u8> {
        if self.sectors_per_track as usize != TRD_SECTORS_PER_TRACK
            || self.sector_size as usize != TRD_SECTOR_SIZE
        {
            return None;
        }
        match (self.num_sides, self.num_tracks) {
            (2, 80) => Some(TRDOS_DS80),
            (2, 40) => Some(TRDOS_DS40),
            (1, 80) => Some(TRDOS_SS80),
            (1, 40) => Some(TRDOS_SS40),
            _ => None,
        }
    }

    /// Number of logical 256-byte TR-DOS tracks (cylinders times sides)
    pub fn logical_tracks(&self) -> usize {
        self.num_tracks as usize * self.num_sides as usize
    }

    /// Calculate total disk capacity in bytes
    pub fn total_capacity(&self) -> usize {
        self.num_sides as usize
            * self.num_tracks as usize
            * self.sectors_per_track as usize
            * self.sector_size as usize
    }

    /// Calculate total disk capacity in kilobytes
    pub fn total_capacity_kb(&self) -> usize {
        self.total_capacity() / 1024
    }
}
