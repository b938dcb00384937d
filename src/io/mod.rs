/// Sector codec: decoding and encoding image files in memory
///
/// Every container is handled as a byte buffer; the manager does the file
/// I/O around it.

/// Field and file checksums
pub mod crc;
/// DSK and extended DSK reader
pub mod dsk_reader;
/// DSK and extended DSK writer
pub mod dsk_writer;
/// SCL codec
pub mod scl;
/// TRD codec
pub mod trd;
/// UDI codec
pub mod udi;

pub use dsk_reader::read_dsk;
pub use dsk_writer::write_dsk;
pub use scl::{read_scl, write_scl};
pub use trd::{read_trd, write_trd};
pub use udi::{read_udi, write_udi};

use crate::error::{CodecError, CodecResult};
use crate::format::{detect_format, DiskFormat, FormatSpec, SideMode};
use crate::image::{Disk, DiskImage};

/// Decode an image file
///
/// The format is taken from the file's signature; `hint` (usually guessed
/// from the extension) is used for signature-less TRD dumps.
pub fn decode(data: &[u8], hint: DiskFormat, preindex: bool) -> CodecResult<DiskImage> {
    let format = detect_format(data).unwrap_or(hint);
    log::debug!("decoding {} bytes as {}", data.len(), format);

    let mut image = match format {
        DiskFormat::Udi => read_udi(data, preindex)?,
        DiskFormat::Scl => read_scl(data)?,
        DiskFormat::Trd => read_trd(data)?,
        DiskFormat::Dsk | DiskFormat::ExtendedDsk => read_dsk(data, preindex)?,
        DiskFormat::None => {
            return Err(CodecError::UnsupportedFormat(
                "unrecognized disk image".to_string(),
            ))
        }
    };

    image.preindex = preindex;
    Ok(image)
}

/// Encode an image in the given container format
pub fn encode(image: &DiskImage, format: DiskFormat) -> CodecResult<Vec<u8>> {
    match format {
        DiskFormat::Udi => write_udi(image),
        DiskFormat::Trd => write_trd(image),
        DiskFormat::Scl => write_scl(image),
        DiskFormat::Dsk | DiskFormat::ExtendedDsk => write_dsk(image, format),
        DiskFormat::None => Err(CodecError::UnsupportedFormat(
            "no output format".to_string(),
        )),
    }
}

/// Build a format specification from the disk structure
pub(crate) fn build_format_spec(disks: &[Disk], num_sides: u8, num_tracks: u8) -> FormatSpec {
    let mut spec = FormatSpec::new(num_sides, num_tracks, 0, 256);

    // Geometry is taken from the first formatted track
    let first = disks
        .iter()
        .flat_map(|disk| disk.tracks())
        .find(|track| !track.is_empty());

    if let Some(track) = first {
        spec.sectors_per_track = track.sector_count() as u8;
        spec.gap3_length = track.gap3_length;
        spec.filler_byte = track.filler_byte;

        if let Some(first_id) = track.sector_ids().into_iter().min() {
            spec.first_sector_id = first_id;
        }
        if let Some(sector) = track.sectors().first() {
            spec.sector_size = sector.advertised_size() as u16;
        }
    }

    if num_sides == 1 {
        spec.side_mode = SideMode::SingleSide;
    }
    spec
}
