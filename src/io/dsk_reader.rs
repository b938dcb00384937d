/// DSK file reader

use crate::error::{CodecError, CodecResult};
use crate::format::constants::*;
use crate::format::DiskFormat;
use crate::image::{Disk, DiskImage, Position, Sector, SectorId, Track};
use crate::io::build_format_spec;

/// ST1 bit set when the data field failed its CRC
pub(crate) const ST1_DATA_ERROR: u8 = 0x20;
/// ST2 bit set when the data field CRC failed
pub(crate) const ST2_DATA_ERROR: u8 = 0x20;
/// ST2 bit set when the sector has a deleted data address mark
pub(crate) const ST2_CONTROL_MARK: u8 = 0x40;

/// Read a standard or extended DSK image from memory
pub fn read_dsk(data: &[u8], preindex: bool) -> CodecResult<DiskImage> {
    let disk_info = data
        .get(..DISK_INFO_BLOCK_SIZE)
        .ok_or_else(|| CodecError::parse(data.len(), "Truncated disk info block"))?;

    let format = match crate::format::detect_format(disk_info) {
        Some(format @ (DiskFormat::Dsk | DiskFormat::ExtendedDsk)) => format,
        _ => return Err(CodecError::invalid_format("Unknown DSK format")),
    };

    let num_tracks = disk_info[DISK_INFO_TRACK_COUNT_OFFSET];
    let num_sides = disk_info[DISK_INFO_SIDE_COUNT_OFFSET];
    if num_sides == 0 || num_sides > 2 {
        return Err(CodecError::parse(
            DISK_INFO_SIDE_COUNT_OFFSET,
            format!("DSK image has {} sides", num_sides),
        ));
    }

    // Standard DSK has one size for every track, extended DSK one per track
    // in 256-byte units
    let standard_size = u16::from_le_bytes([
        disk_info[DISK_INFO_TRACK_SIZE_OFFSET],
        disk_info[DISK_INFO_TRACK_SIZE_OFFSET + 1],
    ]) as usize;
    let track_size = |index: usize| -> usize {
        match format {
            DiskFormat::Dsk => standard_size,
            _ => disk_info
                .get(DISK_INFO_EXT_TRACK_SIZE_OFFSET + index)
                .map(|&units| units as usize * 256)
                .unwrap_or(0),
        }
    };

    let mut disks: Vec<Disk> = (0..num_sides).map(Disk::new).collect();
    let mut offset = DISK_INFO_BLOCK_SIZE;
    let mut track_index = 0;

    // Tracks are stored cylinder by cylinder, heads interleaved
    for track_num in 0..num_tracks {
        for side in 0..num_sides {
            let size = track_size(track_index);
            track_index += 1;

            let track = if size == 0 {
                Track::new(track_num, side)
            } else {
                let block = data
                    .get(offset..offset + size)
                    .ok_or_else(|| CodecError::parse(offset, "Truncated track data"))?;
                let track = read_track(block, offset, track_num, side)?;
                offset += size;
                track
            };

            disks[side as usize].add_track(track);
        }
    }

    let spec = build_format_spec(&disks, num_sides, num_tracks);

    Ok(DiskImage {
        format,
        spec,
        disks,
        filename: None,
        write_protect: false,
        preindex,
        position: Position::default(),
        changed: false,
    })
}

/// Parse one track block
fn read_track(track_data: &[u8], offset: usize, track_num: u8, side: u8) -> CodecResult<Track> {
    if track_data.len() < TRACK_INFO_BLOCK_SIZE {
        return Err(CodecError::parse(offset, "Track too small"));
    }

    if !track_data.starts_with(b"Track-Info") {
        return Err(CodecError::parse(offset, "Invalid track marker"));
    }

    let num_sectors = track_data[0x15];
    let gap3_length = track_data[0x16];
    let filler_byte = track_data[0x17];

    let mut track = Track::new(track_num, side);
    track.gap3_length = gap3_length;
    track.filler_byte = filler_byte;

    // Sector info list starts at 0x18, 8 bytes per sector
    let mut sector_offset = TRACK_INFO_BLOCK_SIZE;

    for i in 0..num_sectors as usize {
        let sib_offset = 0x18 + (i * SECTOR_INFO_SIZE);
        if sib_offset + SECTOR_INFO_SIZE > TRACK_INFO_BLOCK_SIZE {
            break;
        }

        let sib = &track_data[sib_offset..sib_offset + SECTOR_INFO_SIZE];
        let size_code = sib[3];
        let st1 = sib[4];
        let st2 = sib[5];
        let data_length = u16::from_le_bytes([sib[6], sib[7]]) as usize;

        // Standard DSK leaves the length at zero
        let actual_size = if data_length > 0 {
            data_length
        } else {
            fdc_size_to_stored_bytes(size_code)
        };

        let sector_data = match track_data.get(sector_offset..sector_offset + actual_size) {
            Some(bytes) => bytes.to_vec(),
            None => {
                let mut bytes = track_data.get(sector_offset..).unwrap_or(&[]).to_vec();
                bytes.resize(actual_size, filler_byte);
                bytes
            }
        };
        sector_offset += actual_size;

        let id = SectorId::new(sib[0], sib[1], sib[2], size_code);
        let mut sector = Sector::with_data(id, sector_data);
        sector.deleted = st2 & ST2_CONTROL_MARK != 0;
        sector.crc_error = st1 & ST1_DATA_ERROR != 0 || st2 & ST2_DATA_ERROR != 0;
        track.add_sector(sector);
    }

    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_info(signature: &[u8], tracks: u8, sides: u8) -> Vec<u8> {
        let mut info = vec![0u8; DISK_INFO_BLOCK_SIZE];
        info[..signature.len()].copy_from_slice(signature);
        info[DISK_INFO_TRACK_COUNT_OFFSET] = tracks;
        info[DISK_INFO_SIDE_COUNT_OFFSET] = sides;
        info
    }

    fn track_block(track: u8, side: u8, ids: &[u8], st2: u8) -> Vec<u8> {
        let mut block = vec![0u8; TRACK_INFO_BLOCK_SIZE + ids.len() * 512];
        block[..TRACK_INFO_MARKER.len()].copy_from_slice(TRACK_INFO_MARKER);
        block[0x10] = track;
        block[0x11] = side;
        block[0x14] = 2;
        block[0x15] = ids.len() as u8;
        block[0x16] = 0x2A;
        block[0x17] = 0xE5;
        for (i, &id) in ids.iter().enumerate() {
            let sib = &mut block[0x18 + i * 8..0x20 + i * 8];
            sib.copy_from_slice(&[track, side, id, 2, 0, st2, 0, 0]);
            block[TRACK_INFO_BLOCK_SIZE + i * 512] = id;
        }
        block
    }

    #[test]
    fn test_read_standard_dsk() {
        let mut data = disk_info(STANDARD_DSK_SIGNATURE, 2, 1);
        let size = (TRACK_INFO_BLOCK_SIZE + 2 * 512) as u16;
        data[DISK_INFO_TRACK_SIZE_OFFSET..DISK_INFO_TRACK_SIZE_OFFSET + 2].copy_from_slice(&size.to_le_bytes());
        data.extend(track_block(0, 0, &[0xC1, 0xC2], 0));
        data.extend(track_block(1, 0, &[0xC1, 0xC2], ST2_CONTROL_MARK));

        let image = read_dsk(&data, false).unwrap();
        assert_eq!(image.format(), DiskFormat::Dsk);
        assert_eq!(image.spec().sectors_per_track, 2);
        assert_eq!(image.spec().first_sector_id, 0xC1);
        assert_eq!(image.read_sector(0, 1, 0xC2).unwrap()[0], 0xC2);
        assert!(image.get_disk(0).unwrap().get_track(1).unwrap().get_sector(0xC1).unwrap().deleted);
    }

    #[test]
    fn test_read_extended_dsk_interleaved_heads() {
        let mut data = disk_info(EXTENDED_DSK_SIGNATURE, 1, 2);
        data[DISK_INFO_EXT_TRACK_SIZE_OFFSET] = 3;
        data[DISK_INFO_EXT_TRACK_SIZE_OFFSET + 1] = 5;
        data.extend(track_block(0, 0, &[1], 0));
        data.extend(track_block(0, 1, &[1, 2], 0));

        let image = read_dsk(&data, false).unwrap();
        assert_eq!(image.disk_count(), 2);
        assert_eq!(image.get_disk(1).unwrap().get_track(0).unwrap().sector_count(), 2);
        assert_eq!(image.read_sector(1, 0, 2).unwrap()[0], 2);
    }

    #[test]
    fn test_read_dsk_rejects_bad_marker() {
        let mut data = disk_info(EXTENDED_DSK_SIGNATURE, 1, 1);
        data[DISK_INFO_EXT_TRACK_SIZE_OFFSET] = 1;
        data.extend(vec![0u8; 256]);

        assert!(matches!(read_dsk(&data, false), Err(CodecError::Parse { offset: 256, .. })));
        assert!(matches!(
            read_dsk(&[0u8; 256], false),
            Err(CodecError::InvalidFormat(_))
        ));
    }
}
