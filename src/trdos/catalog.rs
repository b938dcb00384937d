/// Read-only TR-DOS catalog
///
/// Lists the directory, finds files by name and reads their contents by
/// walking consecutive logical sectors from the entry's start position.

use crate::error::{DiskError, Result};
use crate::format::constants::{TRDOS_DS40, TRDOS_DS80, TRDOS_SS40, TRDOS_SS80};
use crate::image::DiskImage;
use crate::trdos::{
    locate, next_sector, read_dir_entry, read_disk_spec, read_fat, DirSlot, TrdosDirEntry,
    TrdosSpec, DIR_ENTRY_SIZE, SECTOR_SIZE,
};

/// Summary of a TR-DOS disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrdosInfo {
    /// Disk label
    pub label: String,
    /// Directory entries in use, deleted ones included
    pub file_count: u8,
    /// Deleted files
    pub deleted_files: u8,
    /// Free sectors
    pub free_sectors: u16,
    /// Disk type byte
    pub disk_type: u8,
}

impl TrdosInfo {
    /// Human-readable geometry for the disk type
    pub fn disk_type_name(&self) -> &'static str {
        match self.disk_type {
            TRDOS_DS80 => "80 tracks, double-sided",
            TRDOS_DS40 => "40 tracks, double-sided",
            TRDOS_SS80 => "80 tracks, single-sided",
            TRDOS_SS40 => "40 tracks, single-sided",
            _ => "unknown",
        }
    }

    /// Free space in bytes
    pub fn free_bytes(&self) -> usize {
        self.free_sectors as usize * SECTOR_SIZE
    }
}

/// TR-DOS filesystem mounted read-only on an image
pub struct TrdosFileSystem<'a> {
    image: &'a DiskImage,
    spec: TrdosSpec,
}

impl<'a> TrdosFileSystem<'a> {
    /// Mount the filesystem
    ///
    /// Fails when track 0 has no recognizable specification sector.
    pub fn new(image: &'a DiskImage) -> Result<Self> {
        let spec = read_disk_spec(image)
            .ok_or_else(|| DiskError::filesystem("No TR-DOS specification sector"))?;
        Ok(Self { image, spec })
    }

    /// Specification sector the filesystem was mounted with
    pub fn spec(&self) -> &TrdosSpec {
        &self.spec
    }

    /// Directory entries up to the end marker, deleted files included
    pub fn read_dir(&self) -> Result<Vec<TrdosDirEntry>> {
        let fat = read_fat(self.image)?;
        Ok(fat
            .chunks_exact(DIR_ENTRY_SIZE)
            .map_while(|raw| match read_dir_entry(raw) {
                DirSlot::Entry(entry) => Some(entry),
                DirSlot::End => None,
            })
            .collect())
    }

    /// Find a live file by name, with or without its `.T` type suffix
    pub fn find_file(&self, name: &str) -> Result<TrdosDirEntry> {
        self.read_dir()?
            .into_iter()
            .filter(|entry| !entry.is_deleted())
            .find(|entry| entry.name() == name || entry.display_name() == name)
            .ok_or_else(|| DiskError::FileNotFound(name.to_string()))
    }

    /// Read a file's contents, truncated to its recorded byte length
    pub fn read_file(&self, entry: &TrdosDirEntry) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(entry.length_sectors as usize * SECTOR_SIZE);
        let mut track = entry.start_track;
        let mut sector = entry.start_sector;

        for n in 0..entry.length_sectors {
            let beyond = || DiskError::filesystem(format!("{} runs past the end of the disk", entry.display_name()));
            let (side, cylinder, id) = locate(self.image.spec(), &self.spec, track, sector).ok_or_else(beyond)?;
            data.extend_from_slice(self.image.read_sector(side, cylinder, id)?);

            if n + 1 < entry.length_sectors {
                (track, sector) = next_sector(track, sector).ok_or_else(beyond)?;
            }
        }

        data.truncate(entry.byte_length());
        Ok(data)
    }

    /// Disk summary from the specification sector
    pub fn info(&self) -> TrdosInfo {
        TrdosInfo {
            label: self.spec.label(),
            file_count: self.spec.file_count,
            deleted_files: self.spec.deleted_files,
            free_sectors: self.spec.free_sectors,
            disk_type: self.spec.disk_type,
        }
    }
}
