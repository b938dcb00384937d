/// In-memory disk image: sides, tracks, sectors and the sector cursor

/// Image builder for creating formatted images
pub mod builder;
/// Disk side structure
pub mod disk;
/// Sector definition
pub mod sector;
/// Track definition
pub mod track;

pub use builder::DiskImageBuilder;
pub use disk::Disk;
pub use sector::{Sector, SectorId};
pub use track::Track;

use crate::error::{CodecError, CodecResult};
use crate::format::{DiskFormat, FormatSpec, SideMode};

/// Sector cursor: head, cylinder and physical sector index on that track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Head (side) the cursor is on
    pub side: u8,
    /// Cylinder the head is over
    pub cylinder: u8,
    /// Physical index of the sector found by the last seek
    pub index: usize,
}

/// Saved cursor, restored after an operation that must not disturb it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a saved position is only useful when restored"]
pub struct PositionContext(Position);

/// Main disk image container
#[derive(Debug, Clone)]
pub struct DiskImage {
    /// Container format the image was decoded from
    pub(crate) format: DiskFormat,
    /// Geometry
    pub(crate) spec: FormatSpec,
    /// Disks (one per side)
    pub(crate) disks: Vec<Disk>,
    /// Path the image was opened from
    pub(crate) filename: Option<String>,
    /// File was read-only when opened
    pub(crate) write_protect: bool,
    /// Generate a pre-index gap with index mark when writing raw tracks
    pub(crate) preindex: bool,
    pub(crate) position: Position,
    /// Has the image been modified?
    pub(crate) changed: bool,
}

impl DiskImage {
    /// Create a new builder for constructing images
    pub fn builder() -> DiskImageBuilder {
        DiskImageBuilder::new()
    }

    /// Get the container format
    pub fn format(&self) -> DiskFormat {
        self.format
    }

    /// Get the geometry
    pub fn spec(&self) -> &FormatSpec {
        &self.spec
    }

    /// Get the path the image was opened from
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Was the image file read-only when it was opened?
    pub fn is_write_protected(&self) -> bool {
        self.write_protect
    }

    /// Will raw track encoders emit a pre-index gap?
    pub fn preindex(&self) -> bool {
        self.preindex
    }

    /// Get all disks (sides)
    pub fn disks(&self) -> &[Disk] {
        &self.disks
    }

    /// Get a disk by side number
    pub fn get_disk(&self, side: u8) -> Option<&Disk> {
        self.disks.get(side as usize)
    }

    /// Get a mutable reference to a disk by side number
    pub fn get_disk_mut(&mut self, side: u8) -> Option<&mut Disk> {
        self.changed = true;
        self.disks.get_mut(side as usize)
    }

    /// Get the number of disk sides
    pub fn disk_count(&self) -> usize {
        self.disks.len()
    }

    /// Number of cylinders
    pub fn cylinders(&self) -> u8 {
        self.spec.num_tracks
    }

    fn track(&self, side: u8, track: u8) -> CodecResult<&Track> {
        let disk = self.get_disk(side).ok_or(CodecError::InvalidTrack {
            side,
            track,
            max: self.spec.num_sides.saturating_sub(1),
        })?;

        disk.get_track(track).ok_or(CodecError::InvalidTrack {
            side,
            track,
            max: self.spec.num_tracks.saturating_sub(1),
        })
    }

    fn track_mut(&mut self, side: u8, track: u8) -> CodecResult<&mut Track> {
        let max_side = self.spec.num_sides.saturating_sub(1);
        let max_track = self.spec.num_tracks.saturating_sub(1);

        let disk = self.disks.get_mut(side as usize).ok_or(CodecError::InvalidTrack {
            side,
            track,
            max: max_side,
        })?;

        disk.get_track_mut(track).ok_or(CodecError::InvalidTrack {
            side,
            track,
            max: max_track,
        })
    }

    /// Read sector data by address, without moving the cursor
    pub fn read_sector(&self, side: u8, track: u8, sector_id: u8) -> CodecResult<&[u8]> {
        self.track(side, track)?
            .get_sector(sector_id)
            .map(|s| s.data())
            .ok_or(CodecError::InvalidSector {
                side,
                track,
                id: sector_id,
            })
    }

    /// Write sector data by address, without moving the cursor
    pub fn write_sector(&mut self, side: u8, track: u8, sector_id: u8, data: &[u8]) -> CodecResult<()> {
        let sector = self
            .track_mut(side, track)?
            .get_sector_mut(sector_id)
            .ok_or(CodecError::InvalidSector {
                side,
                track,
                id: sector_id,
            })?;

        sector.write_payload(data);
        self.changed = true;
        Ok(())
    }

    /// Read `count` consecutive sector IDs from `first_id` into one buffer
    ///
    /// Fails with `InvalidSector` if any sector in the run is missing.
    pub fn read_sectors(&self, side: u8, track: u8, first_id: u8, count: u8) -> CodecResult<Vec<u8>> {
        let trk = self.track(side, track)?;
        let mut buffer = Vec::new();

        for n in 0..count {
            let id = first_id.wrapping_add(n);
            let sector = trk.get_sector(id).ok_or(CodecError::InvalidSector { side, track, id })?;
            buffer.extend_from_slice(sector.data());
        }

        Ok(buffer)
    }

    /// Current cursor position
    pub fn position(&self) -> Position {
        self.position
    }

    /// Move the head to a cylinder on a side
    pub fn set_track(&mut self, side: u8, cylinder: u8) -> CodecResult<()> {
        self.track(side, cylinder)?;
        log::trace!("set_track: side {} cylinder {}", side, cylinder);
        self.position = Position {
            side,
            cylinder,
            index: 0,
        };
        Ok(())
    }

    /// Find a sector ID on the current track and leave the cursor on it
    ///
    /// Returns the sector's payload length.
    pub fn seek_sector(&mut self, sector_id: u8) -> CodecResult<usize> {
        let Position { side, cylinder, .. } = self.position;
        let track = self.track(side, cylinder)?;
        let index = track.sector_index(sector_id).ok_or(CodecError::InvalidSector {
            side,
            track: cylinder,
            id: sector_id,
        })?;
        let length = track
            .get_sector_by_index(index)
            .map(|s| s.actual_size())
            .unwrap_or(0);

        self.position.index = index;
        Ok(length)
    }

    /// Sector under the cursor
    pub fn current_sector(&self) -> Option<&Sector> {
        let Position { side, cylinder, index } = self.position;
        self.track(side, cylinder).ok()?.get_sector_by_index(index)
    }

    /// Replace the payload of the sector under the cursor
    pub fn write_sector_payload(&mut self, payload: &[u8]) -> CodecResult<()> {
        let Position { side, cylinder, index } = self.position;
        let sector = self
            .track_mut(side, cylinder)?
            .get_sector_by_index_mut(index)
            .ok_or_else(|| CodecError::parse(index, "cursor is not on a sector"))?;

        sector.write_payload(payload);
        self.changed = true;
        Ok(())
    }

    /// Snapshot the cursor
    pub fn save_position(&self) -> PositionContext {
        PositionContext(self.position)
    }

    /// Put the cursor back where a snapshot was taken
    pub fn restore_position(&mut self, context: PositionContext) {
        self.position = context.0;
    }

    /// Check if the image has been modified
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Mark the image as unchanged
    pub fn mark_unchanged(&mut self) {
        self.changed = false;
    }

    /// Get the total capacity of the disk in bytes
    pub fn total_capacity(&self) -> usize {
        self.spec.total_capacity()
    }

    /// Read the entire disk in logical order
    ///
    /// Sectors are read in ID order within each track, tracks in the order
    /// given by the side mode:
    /// - `SingleSide`: all tracks of side 0
    /// - `Alternate`: T0S0, T0S1, T1S0, T1S1...
    /// - `Successive`: all of side 0, then all of side 1
    pub fn read_logical(&self) -> Vec<u8> {
        let mut data = Vec::new();

        match self.spec.side_mode {
            SideMode::SingleSide => {
                if let Some(disk) = self.get_disk(0) {
                    for track in disk.tracks() {
                        track.read_logical(&mut data);
                    }
                }
            }
            SideMode::Alternate => {
                let max_tracks = self.disks.iter().map(|d| d.track_count()).max().unwrap_or(0);

                for track_num in 0..max_tracks {
                    for disk in &self.disks {
                        if let Some(track) = disk.get_track(track_num as u8) {
                            track.read_logical(&mut data);
                        }
                    }
                }
            }
            SideMode::Successive => {
                for disk in &self.disks {
                    for track in disk.tracks() {
                        track.read_logical(&mut data);
                    }
                }
            }
        }

        data
    }
}

/// Combine two single-sided images into one double-sided image
///
/// `side_a` becomes head 0 and `side_b` head 1. When the images have a
/// different number of cylinders the merge fails unless `autofill` is set,
/// in which case the shorter side is extended with blank formatted tracks.
pub fn merge_sides(side_a: DiskImage, side_b: DiskImage, autofill: bool) -> CodecResult<DiskImage> {
    if side_a.disk_count() != 1 || side_b.disk_count() != 1 {
        return Err(CodecError::MergeMismatch(
            "both images must be single-sided".to_string(),
        ));
    }

    let cylinders = side_a.cylinders().max(side_b.cylinders());
    if side_a.cylinders() != side_b.cylinders() && !autofill {
        return Err(CodecError::MergeMismatch(format!(
            "side A has {} cylinders, side B has {}",
            side_a.cylinders(),
            side_b.cylinders()
        )));
    }

    let DiskImage {
        format,
        mut spec,
        disks: disks_a,
        filename,
        write_protect,
        preindex,
        ..
    } = side_a;
    let mut head0 = disks_a.into_iter().next().ok_or_else(|| {
        CodecError::MergeMismatch("side A has no disk".to_string())
    })?;
    let mut head1 = side_b.disks.into_iter().next().ok_or_else(|| {
        CodecError::MergeMismatch("side B has no disk".to_string())
    })?;

    let size_code = crate::format::bytes_to_fdc_size(spec.sector_size as usize).unwrap_or(1);
    for head in [&mut head0, &mut head1] {
        head.extend_formatted(
            cylinders as usize,
            spec.sectors_per_track,
            spec.first_sector_id,
            size_code,
            spec.filler_byte,
        );
    }
    head1.renumber_side(1);

    spec.num_sides = 2;
    spec.num_tracks = cylinders;
    spec.side_mode = SideMode::Alternate;

    log::debug!("merged sides into {} cylinder double-sided image", cylinders);

    Ok(DiskImage {
        format,
        spec,
        disks: vec![head0, head1],
        filename,
        write_protect: write_protect || side_b.write_protect,
        preindex,
        position: Position::default(),
        changed: false,
    })
}
