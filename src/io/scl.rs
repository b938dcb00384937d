/// SCL compact TR-DOS container codec
///
/// Layout:
/// - `SINCLAIR` signature and a file count byte
/// - one 14-byte header per file (the directory entry without its start
///   sector and track)
/// - the sectors of every file, back to back
/// - a little-endian 32-bit sum of all preceding bytes

use crate::error::{CodecError, CodecResult};
use crate::format::constants::{SCL_HEADER_SIZE, SCL_SIGNATURE};
use crate::format::{DiskFormat, FormatSpec};
use crate::image::DiskImage;
use crate::trdos::{
    self, locate, next_sector, read_dir_entry, DirSlot, TrdosDirEntry, MAX_FILES, SECTORS_PER_TRACK,
    SECTOR_SIZE, SPEC_SECTOR_ID,
};

/// Decode an SCL container into an 80 track double-sided TR-DOS disk
///
/// Files are laid out from logical track 1 in container order and the
/// catalog is rebuilt around them. A checksum mismatch is logged, not fatal.
pub fn read_scl(data: &[u8]) -> CodecResult<DiskImage> {
    if !data.starts_with(SCL_SIGNATURE) || data.len() <= SCL_SIGNATURE.len() {
        return Err(CodecError::invalid_format("Missing SINCLAIR signature"));
    }

    let count_offset = SCL_SIGNATURE.len();
    let file_count = data[count_offset];
    if file_count > MAX_FILES {
        return Err(CodecError::parse(
            count_offset,
            format!("{} files exceed the TR-DOS directory", file_count),
        ));
    }

    let headers_start = count_offset + 1;
    let data_start = headers_start + file_count as usize * SCL_HEADER_SIZE;
    if data.len() < data_start {
        return Err(CodecError::parse(data.len(), "Truncated SCL file headers"));
    }

    let geometry = FormatSpec::trdos_ds80();
    let mut image = DiskImage::builder()
        .format(DiskFormat::Scl)
        .spec(geometry.clone())
        .build();
    let mut spec = trdos::format_disk(&mut image, "")?;

    let mut offset = data_start;
    let mut track = spec.first_free_track;
    let mut sector = spec.first_free_sector;

    for n in 0..file_count as usize {
        let header = &data[headers_start + n * SCL_HEADER_SIZE..headers_start + (n + 1) * SCL_HEADER_SIZE];
        let mut raw = [0u8; 16];
        raw[..SCL_HEADER_SIZE].copy_from_slice(header);
        raw[14] = sector;
        raw[15] = track;

        let entry = match read_dir_entry(&raw) {
            DirSlot::Entry(entry) => entry,
            DirSlot::End => {
                return Err(CodecError::parse(
                    headers_start + n * SCL_HEADER_SIZE,
                    "SCL file header has an empty name",
                ))
            }
        };

        let length = entry.length_sectors as usize * SECTOR_SIZE;
        let body = data
            .get(offset..offset + length)
            .ok_or_else(|| CodecError::parse(offset, format!("Truncated data for {}", entry.display_name())))?;

        if entry.length_sectors as u16 > spec.free_sectors {
            return Err(CodecError::UnsupportedFormat(format!(
                "{} does not fit on an 80 track disk",
                entry.display_name()
            )));
        }

        for chunk in body.chunks(SECTOR_SIZE) {
            let (side, cylinder, id) = locate(&geometry, &spec, track, sector)
                .ok_or_else(|| CodecError::parse(offset, "SCL data overflows the disk"))?;
            image.write_sector(side, cylinder, id, chunk)?;
            sector += 1;
            if sector == SECTORS_PER_TRACK {
                sector = 0;
                track += 1;
            }
        }

        write_entry(&mut image, n, &entry)?;
        spec.free_sectors -= entry.length_sectors as u16;
        offset += length;
    }

    spec.file_count = file_count;
    spec.first_free_sector = sector;
    spec.first_free_track = track;
    image.write_sector(0, 0, SPEC_SECTOR_ID, &spec.to_bytes())?;

    match data.get(offset..offset + 4) {
        Some(trailer) => {
            let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
            let computed = checksum(&data[..offset]);
            if stored != computed {
                log::warn!(
                    "SCL checksum mismatch: stored {:#010x}, computed {:#010x}",
                    stored,
                    computed
                );
            }
        }
        None => log::warn!("SCL checksum missing"),
    }

    log::debug!("SCL: {} files, {} sectors free", file_count, spec.free_sectors);

    image.mark_unchanged();
    Ok(image)
}

/// Encode the live files of a TR-DOS disk as an SCL container
///
/// Deleted entries are left out. Fails when the disk has no recognizable
/// specification sector.
pub fn write_scl(image: &DiskImage) -> CodecResult<Vec<u8>> {
    let spec = trdos::read_disk_spec(image)
        .ok_or_else(|| CodecError::UnsupportedFormat("SCL needs a TR-DOS disk".to_string()))?;

    let fat = trdos::read_fat(image)?;
    let entries: Vec<TrdosDirEntry> = fat
        .chunks_exact(trdos::DIR_ENTRY_SIZE)
        .take(spec.file_count as usize)
        .map_while(|raw| match read_dir_entry(raw) {
            DirSlot::Entry(entry) => Some(entry),
            DirSlot::End => None,
        })
        .filter(|entry| !entry.is_deleted())
        .collect();

    let mut out = Vec::new();
    out.extend_from_slice(SCL_SIGNATURE);
    out.push(entries.len() as u8);
    for entry in &entries {
        out.extend_from_slice(&entry.to_bytes()[..SCL_HEADER_SIZE]);
    }

    for entry in &entries {
        let mut track = entry.start_track;
        let mut sector = entry.start_sector;
        for n in 0..entry.length_sectors {
            let (side, cylinder, id) = locate(image.spec(), &spec, track, sector).ok_or_else(|| {
                CodecError::parse(
                    out.len(),
                    format!("{} runs past the end of the disk", entry.display_name()),
                )
            })?;
            let data = image.read_sector(side, cylinder, id)?;
            let start = out.len();
            out.resize(start + SECTOR_SIZE, 0);
            let len = data.len().min(SECTOR_SIZE);
            out[start..start + len].copy_from_slice(&data[..len]);

            if n + 1 < entry.length_sectors {
                (track, sector) = next_sector(track, sector).ok_or_else(|| {
                    CodecError::parse(out.len(), format!("{} runs past track 255", entry.display_name()))
                })?;
            }
        }
    }

    let sum = checksum(&out);
    out.extend_from_slice(&sum.to_le_bytes());
    Ok(out)
}

fn checksum(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |sum, &b| sum.wrapping_add(b as u32))
}

fn write_entry(image: &mut DiskImage, slot: usize, entry: &TrdosDirEntry) -> CodecResult<()> {
    let id = 1 + (slot / trdos::ENTRIES_PER_SECTOR) as u8;
    let offset = (slot % trdos::ENTRIES_PER_SECTOR) * trdos::DIR_ENTRY_SIZE;
    let mut sector = image.read_sector(0, 0, id)?.to_vec();
    sector[offset..offset + trdos::DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
    image.write_sector(0, 0, id, &sector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trdos::{pad_name, read_disk_spec, TrdosFileSystem};

    fn build_scl(files: &[(&str, u8, u16, u16, Vec<u8>)]) -> Vec<u8> {
        let mut out = SCL_SIGNATURE.to_vec();
        out.push(files.len() as u8);
        for (name, file_type, p1, p2, body) in files {
            out.extend_from_slice(&pad_name(name));
            out.push(*file_type);
            out.extend_from_slice(&p1.to_le_bytes());
            out.extend_from_slice(&p2.to_le_bytes());
            out.push((body.len() / SECTOR_SIZE) as u8);
        }
        for (.., body) in files {
            out.extend_from_slice(body);
        }
        let sum = checksum(&out);
        out.extend_from_slice(&sum.to_le_bytes());
        out
    }

    fn sample() -> Vec<u8> {
        build_scl(&[
            ("game", b'B', 300, 300, vec![0x11; 2 * SECTOR_SIZE]),
            ("screen", b'C', 16384, 6912, vec![0x22; 27 * SECTOR_SIZE]),
        ])
    }

    #[test]
    fn test_read_scl_builds_catalog() {
        let image = read_scl(&sample()).unwrap();
        assert_eq!(image.format(), DiskFormat::Scl);
        assert_eq!(image.disk_count(), 2);

        let spec = read_disk_spec(&image).unwrap();
        assert_eq!(spec.file_count, 2);
        assert_eq!(spec.free_sectors, 2544 - 29);
        // 29 sectors from track 1 sector 0 end at track 2 sector 13
        assert_eq!(spec.first_free_track, 2);
        assert_eq!(spec.first_free_sector, 13);

        let fs = TrdosFileSystem::new(&image).unwrap();
        let entries = fs.read_dir().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].display_name(), "screen.C");
        assert_eq!(entries[1].start_track, 1);
        assert_eq!(entries[1].start_sector, 2);
    }

    #[test]
    fn test_read_scl_data_placement() {
        let image = read_scl(&sample()).unwrap();
        // Logical track 1 is head 1 of cylinder 0
        assert_eq!(image.read_sector(1, 0, 1).unwrap()[0], 0x11);
        assert_eq!(image.read_sector(1, 0, 3).unwrap()[0], 0x22);
        assert_eq!(image.read_sector(0, 1, 13).unwrap()[0], 0x22);
        assert_eq!(image.read_sector(0, 1, 14).unwrap()[0], 0x00);
    }

    #[test]
    fn test_scl_round_trip_is_identical() {
        let data = sample();
        let image = read_scl(&data).unwrap();
        assert_eq!(write_scl(&image).unwrap(), data);
    }

    #[test]
    fn test_read_scl_bad_checksum_is_not_fatal() {
        let mut data = sample();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        assert!(read_scl(&data).is_ok());
    }

    #[test]
    fn test_read_scl_truncated() {
        let data = sample();
        assert!(matches!(
            read_scl(&data[..100]),
            Err(CodecError::Parse { .. })
        ));
        assert!(matches!(
            read_scl(b"SINCLAI"),
            Err(CodecError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_read_scl_empty_container() {
        let image = read_scl(&build_scl(&[])).unwrap();
        let spec = read_disk_spec(&image).unwrap();
        assert_eq!(spec.file_count, 0);
        assert_eq!(spec.free_sectors, 2544);
    }

    #[test]
    fn test_write_scl_skips_deleted() {
        let image = read_scl(&sample()).unwrap();
        let mut image = image;
        let mut fat = image.read_sector(0, 0, 1).unwrap().to_vec();
        fat[0] = trdos::DELETED_MARKER;
        image.write_sector(0, 0, 1, &fat).unwrap();

        let scl = write_scl(&image).unwrap();
        assert_eq!(scl[8], 1);
        assert_eq!(&scl[9..15], b"screen");
    }

    #[test]
    fn test_write_scl_needs_trdos() {
        let image = DiskImage::builder().build();
        assert!(matches!(
            write_scl(&image),
            Err(CodecError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_write_scl_from_merged_disk() {
        let side = |fill: u8| {
            let mut image = DiskImage::builder().spec(FormatSpec::trdos_ss80()).build();
            let mut spec = trdos::format_disk(&mut image, "").unwrap();
            trdos::insert_basic_file(&mut image, &mut spec, &pad_name("game"), &[fill; 4]).unwrap();
            image
        };
        let merged = crate::image::merge_sides(side(0xAB), side(0xCD), false).unwrap();

        let scl = write_scl(&merged).unwrap();
        assert_eq!(scl[8], 1);
        let body = 9 + SCL_HEADER_SIZE;
        assert_eq!(&scl[body..body + 4], &[0xAB; 4]);
    }
}
