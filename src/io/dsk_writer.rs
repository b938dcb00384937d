/// DSK file writer

use crate::error::{CodecError, CodecResult};
use crate::format::constants::*;
use crate::format::DiskFormat;
use crate::image::{DiskImage, Sector, Track};
use crate::io::dsk_reader::{ST1_DATA_ERROR, ST2_CONTROL_MARK, ST2_DATA_ERROR};

/// Encode an image as a standard or extended DSK
pub fn write_dsk(image: &DiskImage, format: DiskFormat) -> CodecResult<Vec<u8>> {
    let sides = image.disk_count();
    if sides == 0 || sides > 2 {
        return Err(CodecError::UnsupportedFormat(format!("DSK cannot hold {} sides", sides)));
    }
    let cylinders = image.disks().iter().map(|d| d.track_count()).max().unwrap_or(0);

    let mut out = vec![0u8; DISK_INFO_BLOCK_SIZE];
    let signature = match format {
        DiskFormat::Dsk => STANDARD_DSK_SIGNATURE,
        _ => EXTENDED_DSK_SIGNATURE,
    };
    out[..signature.len()].copy_from_slice(signature);

    let creator_len = CREATOR_SIGNATURE.len().min(14);
    out[DISK_INFO_CREATOR_OFFSET..DISK_INFO_CREATOR_OFFSET + creator_len]
        .copy_from_slice(&CREATOR_SIGNATURE[..creator_len]);

    out[DISK_INFO_TRACK_COUNT_OFFSET] = cylinders as u8;
    out[DISK_INFO_SIDE_COUNT_OFFSET] = sides as u8;

    let tracks: Vec<Option<&Track>> = (0..cylinders)
        .flat_map(|cylinder| image.disks().iter().map(move |disk| disk.get_track(cylinder as u8)))
        .collect();

    if format == DiskFormat::Dsk {
        let track_size = tracks
            .iter()
            .flatten()
            .map(|t| track_size(t))
            .max()
            .unwrap_or(TRACK_INFO_BLOCK_SIZE);
        let track_size = u16::try_from(track_size)
            .map_err(|_| CodecError::UnsupportedFormat("track too large for standard DSK".to_string()))?;
        out[DISK_INFO_TRACK_SIZE_OFFSET..DISK_INFO_TRACK_SIZE_OFFSET + 2]
            .copy_from_slice(&track_size.to_le_bytes());

        for track in &tracks {
            match track {
                Some(track) => write_track(&mut out, track, track_size as usize),
                None => out.resize(out.len() + track_size as usize, 0),
            }
        }
    } else {
        if DISK_INFO_EXT_TRACK_SIZE_OFFSET + tracks.len() > DISK_INFO_BLOCK_SIZE {
            return Err(CodecError::UnsupportedFormat(format!(
                "{} tracks exceed the extended DSK track table",
                tracks.len()
            )));
        }

        for (index, track) in tracks.iter().enumerate() {
            let units = match track {
                Some(track) if !track.is_empty() => track_size(track).div_ceil(256),
                _ => 0,
            };
            out[DISK_INFO_EXT_TRACK_SIZE_OFFSET + index] = u8::try_from(units)
                .map_err(|_| CodecError::UnsupportedFormat("track too large for extended DSK".to_string()))?;
        }

        for track in tracks.iter().flatten().filter(|t| !t.is_empty()) {
            write_track(&mut out, track, track_size(track).div_ceil(256) * 256);
        }
    }

    Ok(out)
}

/// Append one track block, padded to `size`
fn write_track(out: &mut Vec<u8>, track: &Track, size: usize) {
    let start = out.len();
    out.resize(start + size, 0);
    let block = &mut out[start..];

    block[..TRACK_INFO_MARKER.len()].copy_from_slice(TRACK_INFO_MARKER);
    block[0x10] = track.track_number;
    block[0x11] = track.side_number;
    block[0x14] = track.sectors().first().map(|s| s.id.size_code).unwrap_or(2);
    block[0x15] = track.sector_count() as u8;
    block[0x16] = track.gap3_length;
    block[0x17] = track.filler_byte;

    let mut sector_offset = TRACK_INFO_BLOCK_SIZE;

    for (i, sector) in track.sectors().iter().enumerate() {
        let sib_offset = 0x18 + (i * SECTOR_INFO_SIZE);
        if sib_offset + SECTOR_INFO_SIZE > TRACK_INFO_BLOCK_SIZE {
            break;
        }

        let stored_len = stored_size(sector);
        let (st1, st2) = status_bytes(sector);
        let sib = &mut block[sib_offset..sib_offset + SECTOR_INFO_SIZE];
        sib[0] = sector.id.track;
        sib[1] = sector.id.side;
        sib[2] = sector.id.sector;
        sib[3] = sector.id.size_code;
        sib[4] = st1;
        sib[5] = st2;
        sib[6..8].copy_from_slice(&(stored_len as u16).to_le_bytes());

        let copy_len = stored_len.min(block.len().saturating_sub(sector_offset));
        block[sector_offset..sector_offset + copy_len].copy_from_slice(&sector.data()[..copy_len]);
        sector_offset += stored_len;
    }
}

fn status_bytes(sector: &Sector) -> (u8, u8) {
    let mut st1 = 0;
    let mut st2 = 0;
    if sector.crc_error {
        st1 |= ST1_DATA_ERROR;
        st2 |= ST2_DATA_ERROR;
    }
    if sector.deleted {
        st2 |= ST2_CONTROL_MARK;
    }
    (st1, st2)
}

/// Bytes a sector occupies in the file (at most 6144)
fn stored_size(sector: &Sector) -> usize {
    sector.actual_size().min(DSK_MAX_STORED_SECTOR)
}

/// Size of a track block including its info block
fn track_size(track: &Track) -> usize {
    TRACK_INFO_BLOCK_SIZE + track.sectors().iter().map(stored_size).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatSpec;
    use crate::io::dsk_reader::read_dsk;

    #[test]
    fn test_track_size() {
        let image = DiskImage::builder().spec(FormatSpec::spectrum_plus3()).build();
        let track = image.get_disk(0).unwrap().get_track(0).unwrap();
        assert_eq!(track_size(track), 256 + 9 * 512);
    }

    #[test]
    fn test_extended_dsk_round_trip() {
        let mut image = DiskImage::builder().num_tracks(2).build();
        image.write_sector(1, 1, 7, &[0x77; 256]).unwrap();
        {
            let sector = image
                .get_disk_mut(0)
                .unwrap()
                .get_track_mut(1)
                .unwrap()
                .get_sector_mut(2)
                .unwrap();
            sector.deleted = true;
            sector.crc_error = true;
        }

        let bytes = write_dsk(&image, DiskFormat::ExtendedDsk).unwrap();
        assert!(bytes.starts_with(b"EXTENDED"));
        assert_eq!(bytes[DISK_INFO_EXT_TRACK_SIZE_OFFSET], 17);

        let decoded = read_dsk(&bytes, false).unwrap();
        assert_eq!(decoded.format(), DiskFormat::ExtendedDsk);
        assert_eq!(decoded.disk_count(), 2);
        assert_eq!(decoded.read_sector(1, 1, 7).unwrap(), &[0x77; 256][..]);
        assert_eq!(
            decoded.get_disk(1).unwrap().get_track(1).unwrap().sector_ids(),
            (1..=16).collect::<Vec<u8>>()
        );

        let sector = decoded.get_disk(0).unwrap().get_track(1).unwrap().get_sector(2).unwrap();
        assert!(sector.deleted);
        assert!(sector.crc_error);
    }

    #[test]
    fn test_standard_dsk_round_trip() {
        let mut image = DiskImage::builder()
            .format(DiskFormat::Dsk)
            .spec(FormatSpec::spectrum_plus3())
            .num_tracks(3)
            .build();
        image.write_sector(0, 2, 9, &[0x99; 512]).unwrap();

        let bytes = write_dsk(&image, DiskFormat::Dsk).unwrap();
        assert_eq!(bytes.len(), 256 + 3 * (256 + 9 * 512));

        let decoded = read_dsk(&bytes, false).unwrap();
        assert_eq!(decoded.format(), DiskFormat::Dsk);
        assert_eq!(decoded.spec().sectors_per_track, 9);
        assert_eq!(decoded.read_sector(0, 2, 9).unwrap()[511], 0x99);
    }
}
