/// TR-DOS filesystem structures
///
/// TR-DOS (Beta 128) disks use 16 sectors of 256 bytes per track. Track 0
/// holds the catalog:
/// - Logical sectors 0-7: 128 directory entries of 16 bytes
/// - Logical sector 8: the specification sector (free space, label, id 0x10)
///
/// TR-DOS counts tracks across both sides (logical track `t` is cylinder
/// `t / sides`, head `t % sides`) and numbers sectors from 0, while the
/// sector ID on disk is one higher.

/// Boot loader injection
pub mod boot;
/// Read-only catalog access
pub mod catalog;

pub use boot::{insert_basic_file, insert_boot_loader, BootOutcome, SkipReason};
pub use catalog::{TrdosFileSystem, TrdosInfo};

use crate::error::{CodecError, CodecResult, RecognitionFailure};
use crate::format::FormatSpec;
use crate::image::DiskImage;

/// Value of the id byte in a TR-DOS specification sector
pub const TRDOS_ID: u8 = 0x10;

/// Size of a TR-DOS sector
pub const SECTOR_SIZE: usize = 256;

/// Sectors per TR-DOS track
pub const SECTORS_PER_TRACK: u8 = 16;

/// Physical ID of the specification sector on track 0
pub const SPEC_SECTOR_ID: u8 = 9;

/// Directory sectors at the start of track 0
pub const FAT_SECTORS: u8 = 8;

/// Size of a directory entry
pub const DIR_ENTRY_SIZE: usize = 16;

/// Directory entries per sector
pub const ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / DIR_ENTRY_SIZE;

/// Maximum number of files in the directory
pub const MAX_FILES: u8 = 128;

/// First filename byte of a deleted file
pub const DELETED_MARKER: u8 = 0x01;

/// File type tag of a BASIC program
pub const FILE_TYPE_BASIC: u8 = b'B';

/// File type tag of a code file
pub const FILE_TYPE_CODE: u8 = b'C';

/// Name of the file TR-DOS runs when a disk boots
pub const BOOT_FILENAME: &[u8; 8] = b"boot    ";

const SPEC_FIRST_FREE_SECTOR: usize = 225;
const SPEC_FIRST_FREE_TRACK: usize = 226;
const SPEC_DISK_TYPE: usize = 227;
const SPEC_FILE_COUNT: usize = 228;
const SPEC_FREE_SECTORS: usize = 229;
const SPEC_ID: usize = 231;
const SPEC_PASSWORD: usize = 234;
const SPEC_DELETED_FILES: usize = 244;
const SPEC_DISK_LABEL: usize = 245;

/// The specification sector (logical sector 8 of track 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrdosSpec {
    /// First free sector (0-15)
    pub first_free_sector: u8,
    /// First free logical track
    pub first_free_track: u8,
    /// Disk type (0x16-0x19)
    pub disk_type: u8,
    /// Number of directory entries in use, deleted ones included
    pub file_count: u8,
    /// Free sectors
    pub free_sectors: u16,
    /// TR-DOS id, always 0x10 on a recognized disk
    pub id: u8,
    /// Password (not null-terminated)
    pub password: [u8; 9],
    /// Number of deleted files
    pub deleted_files: u8,
    /// Disk label (not null-terminated)
    pub disk_label: [u8; 8],
}

/// Decode a specification sector
///
/// Byte 0 must be zero and the id byte must be 0x10; anything else is a
/// foreign sector.
pub fn read_spec(src: &[u8]) -> std::result::Result<TrdosSpec, RecognitionFailure> {
    if src.len() < SECTOR_SIZE || src[0] != 0 {
        return Err(RecognitionFailure);
    }

    let id = src[SPEC_ID];
    if id != TRDOS_ID {
        return Err(RecognitionFailure);
    }

    let mut password = [0u8; 9];
    password.copy_from_slice(&src[SPEC_PASSWORD..SPEC_PASSWORD + 9]);
    let mut disk_label = [0u8; 8];
    disk_label.copy_from_slice(&src[SPEC_DISK_LABEL..SPEC_DISK_LABEL + 8]);

    Ok(TrdosSpec {
        first_free_sector: src[SPEC_FIRST_FREE_SECTOR],
        first_free_track: src[SPEC_FIRST_FREE_TRACK],
        disk_type: src[SPEC_DISK_TYPE],
        file_count: src[SPEC_FILE_COUNT],
        free_sectors: u16::from_le_bytes([src[SPEC_FREE_SECTORS], src[SPEC_FREE_SECTORS + 1]]),
        id,
        password,
        deleted_files: src[SPEC_DELETED_FILES],
        disk_label,
    })
}

impl TrdosSpec {
    /// Specification sector of a freshly formatted, empty disk
    ///
    /// Returns `None` for geometries TR-DOS cannot describe.
    pub fn blank(geometry: &FormatSpec, label: &str) -> Option<Self> {
        let disk_type = geometry.trdos_disk_type()?;
        let total = geometry.logical_tracks() * SECTORS_PER_TRACK as usize;

        Some(Self {
            first_free_sector: 0,
            first_free_track: 1,
            disk_type,
            file_count: 0,
            free_sectors: (total - SECTORS_PER_TRACK as usize) as u16,
            id: TRDOS_ID,
            password: [b' '; 9],
            deleted_files: 0,
            disk_label: pad_name(label),
        })
    }

    /// Encode into a full 256-byte sector, unused bytes zeroed
    pub fn to_bytes(&self) -> [u8; SECTOR_SIZE] {
        let mut dest = [0u8; SECTOR_SIZE];
        dest[SPEC_FIRST_FREE_SECTOR] = self.first_free_sector;
        dest[SPEC_FIRST_FREE_TRACK] = self.first_free_track;
        dest[SPEC_DISK_TYPE] = self.disk_type;
        dest[SPEC_FILE_COUNT] = self.file_count;
        dest[SPEC_FREE_SECTORS..SPEC_FREE_SECTORS + 2].copy_from_slice(&self.free_sectors.to_le_bytes());
        dest[SPEC_ID] = self.id;
        dest[SPEC_PASSWORD..SPEC_PASSWORD + 9].copy_from_slice(&self.password);
        dest[SPEC_DELETED_FILES] = self.deleted_files;
        dest[SPEC_DISK_LABEL..SPEC_DISK_LABEL + 8].copy_from_slice(&self.disk_label);
        dest
    }

    /// Disk label with trailing spaces and nulls removed
    pub fn label(&self) -> String {
        name_to_string(&self.disk_label)
    }

    /// Number of sides the disk type declares, `None` for unknown types
    pub fn sides(&self) -> Option<u8> {
        FormatSpec::from_trdos_disk_type(self.disk_type).map(|geometry| geometry.num_sides)
    }
}

/// A 16-byte directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrdosDirEntry {
    /// Filename, space padded (not null-terminated)
    pub filename: [u8; 8],
    /// File type tag ('B', 'C', 'D', '#')
    pub file_type: u8,
    /// First parameter (BASIC: program+variables length, code: start address)
    pub param1: u16,
    /// Second parameter (BASIC: program length, code: byte length)
    pub param2: u16,
    /// Length in sectors
    pub length_sectors: u8,
    /// Start sector (0-15)
    pub start_sector: u8,
    /// Start logical track
    pub start_track: u8,
}

/// A directory slot as read from disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirSlot {
    /// Filename starts with 0x00: no entries follow in a well-formed directory
    End,
    /// Slot holds an entry, possibly a deleted one
    Entry(TrdosDirEntry),
}

/// Decode a directory slot
///
/// Slices shorter than 16 bytes read as the end of the directory.
pub fn read_dir_entry(src: &[u8]) -> DirSlot {
    if src.len() < DIR_ENTRY_SIZE || src[0] == 0 {
        return DirSlot::End;
    }

    let mut filename = [0u8; 8];
    filename.copy_from_slice(&src[..8]);

    DirSlot::Entry(TrdosDirEntry {
        filename,
        file_type: src[8],
        param1: u16::from_le_bytes([src[9], src[10]]),
        param2: u16::from_le_bytes([src[11], src[12]]),
        length_sectors: src[13],
        start_sector: src[14],
        start_track: src[15],
    })
}

impl TrdosDirEntry {
    /// Encode into 16 bytes
    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut dest = [0u8; DIR_ENTRY_SIZE];
        dest[..8].copy_from_slice(&self.filename);
        dest[8] = self.file_type;
        dest[9..11].copy_from_slice(&self.param1.to_le_bytes());
        dest[11..13].copy_from_slice(&self.param2.to_le_bytes());
        dest[13] = self.length_sectors;
        dest[14] = self.start_sector;
        dest[15] = self.start_track;
        dest
    }

    /// Entry belongs to a deleted file
    pub fn is_deleted(&self) -> bool {
        self.filename[0] == DELETED_MARKER
    }

    /// Entry is a live BASIC program
    pub fn is_basic(&self) -> bool {
        self.filename[0] > DELETED_MARKER && self.file_type == FILE_TYPE_BASIC
    }

    /// Filename with trailing spaces removed
    pub fn name(&self) -> String {
        name_to_string(&self.filename)
    }

    /// Name as TR-DOS shows it in a catalog, e.g. `boot.B`
    pub fn display_name(&self) -> String {
        format!("{}.{}", self.name(), printable(self.file_type))
    }

    /// Bytes of file content the entry describes
    ///
    /// BASIC files record program plus variables in `param1`, code files
    /// their length in `param2`; other types fill whole sectors.
    pub fn byte_length(&self) -> usize {
        let allocated = self.length_sectors as usize * SECTOR_SIZE;
        match self.file_type {
            FILE_TYPE_BASIC => (self.param1 as usize).min(allocated),
            FILE_TYPE_CODE => (self.param2 as usize).min(allocated),
            _ => allocated,
        }
    }
}

/// Facts about a disk's BASIC programs gathered by `scan_fat`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootInfo {
    /// A BASIC file named `boot` exists
    pub have_boot_file: bool,
    /// Number of live BASIC files
    pub basic_files_count: usize,
    /// Name of the first BASIC file in directory order
    pub first_basic_file: [u8; 8],
}

/// Scan the eight directory sectors for BASIC programs
///
/// All 128 slots are examined; empty and deleted slots are skipped one by
/// one rather than ending the scan.
pub fn scan_fat(data: &[u8]) -> BootInfo {
    let mut info = BootInfo::default();

    for chunk in data.chunks_exact(DIR_ENTRY_SIZE).take(MAX_FILES as usize) {
        let entry = match read_dir_entry(chunk) {
            DirSlot::Entry(entry) if entry.is_basic() => entry,
            _ => continue,
        };

        if !info.have_boot_file && &entry.filename == BOOT_FILENAME {
            info.have_boot_file = true;
        }

        if info.basic_files_count == 0 {
            info.first_basic_file = entry.filename;
        }

        info.basic_files_count += 1;
    }

    info
}

/// Physical address (side, cylinder, sector ID) of a TR-DOS logical sector
///
/// Logical tracks are interleaved over as many sides as the disk type in
/// `spec` declares, so a single-sided catalog merged onto head 0 of a
/// double-sided image keeps to head 0. The geometry supplies the side count
/// for unknown disk types and bounds the cylinder. Returns `None` when the
/// logical track lies beyond the disk.
pub fn locate(
    geometry: &FormatSpec,
    spec: &TrdosSpec,
    logical_track: u8,
    sector: u8,
) -> Option<(u8, u8, u8)> {
    let sides = spec.sides().unwrap_or(geometry.num_sides).max(1);
    let cylinder = logical_track / sides;
    if cylinder >= geometry.num_tracks || sector >= SECTORS_PER_TRACK {
        return None;
    }
    Some((logical_track % sides, cylinder, sector + 1))
}

/// Logical sector following `(track, sector)`
///
/// Returns `None` when the track number would wrap past 255.
pub(crate) fn next_sector(track: u8, sector: u8) -> Option<(u8, u8)> {
    if sector + 1 < SECTORS_PER_TRACK {
        Some((track, sector + 1))
    } else {
        Some((track.checked_add(1)?, 0))
    }
}

/// Read the specification sector of a disk, if it has one
pub fn read_disk_spec(image: &DiskImage) -> Option<TrdosSpec> {
    let data = image.read_sector(0, 0, SPEC_SECTOR_ID).ok()?;
    read_spec(data).ok()
}

/// Write an empty TR-DOS catalog onto an image
pub fn format_disk(image: &mut DiskImage, label: &str) -> CodecResult<TrdosSpec> {
    let spec = TrdosSpec::blank(image.spec(), label).ok_or_else(|| {
        CodecError::UnsupportedFormat(format!(
            "{} cylinder, {} sided geometry is not a TR-DOS disk",
            image.cylinders(),
            image.spec().num_sides
        ))
    })?;

    let empty = [0u8; SECTOR_SIZE];
    for id in 1..=FAT_SECTORS {
        image.write_sector(0, 0, id, &empty)?;
    }
    image.write_sector(0, 0, SPEC_SECTOR_ID, &spec.to_bytes())?;
    Ok(spec)
}

/// Read the directory sectors of track 0 into one buffer
pub(crate) fn read_fat(image: &DiskImage) -> CodecResult<Vec<u8>> {
    image.read_sectors(0, 0, 1, FAT_SECTORS)
}

/// Space-pad a name to TR-DOS's 8 characters
pub fn pad_name(name: &str) -> [u8; 8] {
    let mut out = [b' '; 8];
    for (dst, src) in out.iter_mut().zip(name.bytes()) {
        *dst = src;
    }
    out
}

pub(crate) fn name_to_string(raw: &[u8]) -> String {
    raw.iter()
        .map(|&b| printable(b))
        .collect::<String>()
        .trim_end_matches([' ', '\0'])
        .to_string()
}

fn printable(b: u8) -> char {
    if (0x20..0x7F).contains(&b) {
        b as char
    } else if b == 0 {
        '\0'
    } else {
        '?'
    }
}
