/// TRD raw sector dump codec
///
/// A TRD file is every 256-byte sector of a TR-DOS disk in logical order:
/// 16 sectors per track, logical tracks alternating between the heads of a
/// double-sided disk.

use crate::error::{CodecError, CodecResult};
use crate::format::constants::{TRD_SECTORS_PER_TRACK, TRD_SECTOR_SIZE, TRD_TRACK_SIZE};
use crate::format::{DiskFormat, FormatSpec};
use crate::image::DiskImage;
use crate::trdos::{read_spec, SPEC_SECTOR_ID};

/// Decode a TRD dump
///
/// The geometry comes from the disk type in the specification sector. When
/// that sector is not recognized, dumps longer than 80 tracks are taken as
/// double-sided. Short dumps are padded with zeroed sectors.
pub fn read_trd(data: &[u8]) -> CodecResult<DiskImage> {
    if data.is_empty() {
        return Err(CodecError::invalid_format("TRD image is empty"));
    }

    let logical_tracks = data.len().div_ceil(TRD_TRACK_SIZE);
    let spec_offset = (SPEC_SECTOR_ID as usize - 1) * TRD_SECTOR_SIZE;
    let preset = data
        .get(spec_offset..spec_offset + TRD_SECTOR_SIZE)
        .and_then(|sector| read_spec(sector).ok())
        .and_then(|spec| FormatSpec::from_trdos_disk_type(spec.disk_type));

    let recognized = preset.is_some();
    let mut spec = match preset {
        Some(spec) => spec,
        None if logical_tracks > 80 => FormatSpec::trdos_ds80(),
        None => FormatSpec::trdos_ss80(),
    };

    let sides = spec.num_sides as usize;
    let cylinders = logical_tracks.div_ceil(sides).max(spec.num_tracks as usize);
    if cylinders > u8::MAX as usize {
        return Err(CodecError::parse(
            data.len(),
            format!("TRD image has {} cylinders", cylinders),
        ));
    }
    spec.num_tracks = cylinders as u8;

    log::debug!(
        "TRD: {} bytes, {} cylinders, {} sides (disk type {})",
        data.len(),
        cylinders,
        sides,
        if recognized { "recognized" } else { "guessed" }
    );

    let mut image = DiskImage::builder().format(DiskFormat::Trd).spec(spec).build();

    for (logical_track, chunk) in data.chunks(TRD_TRACK_SIZE).enumerate() {
        let side = (logical_track % sides) as u8;
        let cylinder = (logical_track / sides) as u8;
        for (n, sector) in chunk.chunks(TRD_SECTOR_SIZE).enumerate() {
            image.write_sector(side, cylinder, n as u8 + 1, sector)?;
        }
    }

    image.mark_unchanged();
    Ok(image)
}

/// Encode an image as a TRD dump
///
/// Sectors missing from a track are written as zeros.
pub fn write_trd(image: &DiskImage) -> CodecResult<Vec<u8>> {
    let spec = image.spec();
    let sides = spec.num_sides.max(1);
    let mut out = Vec::with_capacity(spec.logical_tracks() * TRD_TRACK_SIZE);

    for cylinder in 0..spec.num_tracks {
        for side in 0..sides {
            for n in 0..TRD_SECTORS_PER_TRACK as u8 {
                let start = out.len();
                out.resize(start + TRD_SECTOR_SIZE, 0);
                if let Ok(data) = image.read_sector(side, cylinder, n + 1) {
                    let len = data.len().min(TRD_SECTOR_SIZE);
                    out[start..start + len].copy_from_slice(&data[..len]);
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trdos::{TrdosSpec, SECTOR_SIZE};

    fn blank_trd(geometry: FormatSpec) -> Vec<u8> {
        let mut data = vec![0u8; geometry.logical_tracks() * TRD_TRACK_SIZE];
        let spec = TrdosSpec::blank(&geometry, "TEST").unwrap();
        data[8 * SECTOR_SIZE..9 * SECTOR_SIZE].copy_from_slice(&spec.to_bytes());
        data
    }

    #[test]
    fn test_read_trd_geometry_from_disk_type() {
        let image = read_trd(&blank_trd(FormatSpec::trdos_ss40())).unwrap();
        assert_eq!(image.format(), DiskFormat::Trd);
        assert_eq!(image.spec().num_sides, 1);
        assert_eq!(image.cylinders(), 40);
        assert!(!image.is_changed());
    }

    #[test]
    fn test_read_trd_interleaves_sides() {
        let mut data = blank_trd(FormatSpec::trdos_ds80());
        data[TRD_TRACK_SIZE] = 0x11;
        data[2 * TRD_TRACK_SIZE + 3 * SECTOR_SIZE] = 0x22;

        let image = read_trd(&data).unwrap();
        assert_eq!(image.disk_count(), 2);
        assert_eq!(image.read_sector(1, 0, 1).unwrap()[0], 0x11);
        assert_eq!(image.read_sector(0, 1, 4).unwrap()[0], 0x22);
    }

    #[test]
    fn test_read_trd_pads_short_dump() {
        // Three tracks written, disk type says 80 cylinders double-sided
        let data = blank_trd(FormatSpec::trdos_ds80());
        let image = read_trd(&data[..3 * TRD_TRACK_SIZE - 100]).unwrap();

        assert_eq!(image.cylinders(), 80);
        assert_eq!(image.read_sector(0, 1, 16).unwrap(), &[0u8; 256][..]);
        assert_eq!(write_trd(&image).unwrap().len(), 640 * 1024);
    }

    #[test]
    fn test_read_trd_guesses_unrecognized() {
        let image = read_trd(&vec![0xFF; 4 * TRD_TRACK_SIZE]).unwrap();
        assert_eq!(image.spec().num_sides, 1);
        assert_eq!(image.cylinders(), 80);

        let image = read_trd(&vec![0xFF; 100 * TRD_TRACK_SIZE]).unwrap();
        assert_eq!(image.spec().num_sides, 2);
    }

    #[test]
    fn test_read_trd_rejects_empty() {
        assert!(matches!(read_trd(&[]), Err(CodecError::InvalidFormat(_))));
    }

    #[test]
    fn test_trd_round_trip_is_identical() {
        let mut data = blank_trd(FormatSpec::trdos_ds80());
        for (i, byte) in data.iter_mut().enumerate().skip(TRD_TRACK_SIZE) {
            *byte = (i % 251) as u8;
        }

        let image = read_trd(&data).unwrap();
        assert_eq!(write_trd(&image).unwrap(), data);
    }
}
