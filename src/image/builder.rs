/// Builder for creating blank formatted images

use crate::format::constants::bytes_to_fdc_size;
use crate::format::{DiskFormat, FormatSpec, SideMode};
use crate::image::{Disk, DiskImage, Position};

/// Builder for constructing formatted disk images
pub struct DiskImageBuilder {
    format: DiskFormat,
    spec: FormatSpec,
}

impl DiskImageBuilder {
    /// Create a new builder for a TR-DOS 80 track double-sided TRD image
    pub fn new() -> Self {
        Self {
            format: DiskFormat::Trd,
            spec: FormatSpec::trdos_ds80(),
        }
    }

    /// Set the container format
    pub fn format(mut self, format: DiskFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the format specification
    pub fn spec(mut self, spec: FormatSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Set the number of sides
    pub fn num_sides(mut self, num_sides: u8) -> Self {
        self.spec.num_sides = num_sides;
        self.spec.side_mode = if num_sides == 1 {
            SideMode::SingleSide
        } else {
            SideMode::Alternate
        };
        self
    }

    /// Set the number of tracks per side
    pub fn num_tracks(mut self, num_tracks: u8) -> Self {
        self.spec.num_tracks = num_tracks;
        self
    }

    /// Set sectors per track
    pub fn sectors_per_track(mut self, sectors_per_track: u8) -> Self {
        self.spec.sectors_per_track = sectors_per_track;
        self
    }

    /// Build the image with every sector formatted with the filler byte
    pub fn build(self) -> DiskImage {
        let size_code = bytes_to_fdc_size(self.spec.sector_size as usize).unwrap_or(1);

        let disks = (0..self.spec.num_sides)
            .map(|side| {
                let mut disk = Disk::new(side);
                disk.extend_formatted(
                    self.spec.num_tracks as usize,
                    self.spec.sectors_per_track,
                    self.spec.first_sector_id,
                    size_code,
                    self.spec.filler_byte,
                );
                for n in 0..disk.track_count() {
                    if let Some(track) = disk.get_track_mut(n as u8) {
                        track.gap3_length = self.spec.gap3_length;
                    }
                }
                disk
            })
            .collect();

        DiskImage {
            format: self.format,
            spec: self.spec,
            disks,
            filename: None,
            write_protect: false,
            preindex: false,
            position: Position::default(),
            changed: true,
        }
    }
}

impl Default for DiskImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let image = DiskImageBuilder::new().build();

        assert_eq!(image.format(), DiskFormat::Trd);
        assert_eq!(image.disk_count(), 2);
        assert_eq!(image.cylinders(), 80);
        assert_eq!(image.total_capacity(), 640 * 1024);
    }

    #[test]
    fn test_builder_custom() {
        let image = DiskImageBuilder::new()
            .format(DiskFormat::Udi)
            .num_sides(1)
            .num_tracks(2)
            .sectors_per_track(3)
            .build();

        assert_eq!(image.format(), DiskFormat::Udi);
        assert_eq!(image.disk_count(), 1);

        let track = image.get_disk(0).unwrap().get_track(1).unwrap();
        assert_eq!(track.sector_ids(), vec![1, 2, 3]);
        assert_eq!(track.get_sector(1).unwrap().actual_size(), 256);
    }

    #[test]
    fn test_builder_plus3_geometry() {
        let image = DiskImageBuilder::new()
            .format(DiskFormat::ExtendedDsk)
            .spec(FormatSpec::spectrum_plus3())
            .build();

        let track = image.get_disk(0).unwrap().get_track(0).unwrap();
        assert_eq!(track.sector_count(), 9);
        assert_eq!(track.get_sector(1).unwrap().data()[0], 0xE5);
        assert_eq!(track.gap3_length, 0x2A);
    }
}
