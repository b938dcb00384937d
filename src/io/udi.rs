/// UDI (Ultra Disk Image) codec
///
/// A UDI file holds every track as raw MFM bytes plus a bitmap marking
/// which bytes were written with missing clock bits (the A1/C2 sync marks):
/// - 16-byte header: `UDI!`, file size without the CRC, version, highest
///   cylinder, highest side, reserved byte, extra header length
/// - per track: type byte, 16-bit length, data, clock bitmap
/// - CRC-32 of everything before it

use crate::error::{CodecError, CodecResult};
use crate::format::constants::{UDI_HEADER_SIZE, UDI_SIGNATURE, UDI_TRACK_LENGTH};
use crate::format::DiskFormat;
use crate::image::{Disk, DiskImage, Position, Sector, SectorId, Track};
use crate::io::build_format_spec;
use crate::io::crc::{crc16, udi_crc32, CRC16_INIT};

const TRACK_TYPE_MFM: u8 = 0x00;
const MARK_SYNC: u8 = 0xA1;
const MARK_INDEX_SYNC: u8 = 0xC2;
const MARK_INDEX: u8 = 0xFC;
const MARK_ID: u8 = 0xFE;
const MARK_DATA: u8 = 0xFB;
const MARK_DELETED_DATA: u8 = 0xF8;
const GAP_BYTE: u8 = 0x4E;
const GAP2_LENGTH: usize = 22;

/// Bytes searched after an ID field for its data mark
const DATA_MARK_WINDOW: usize = 64;

/// Raw MFM track being assembled or scanned
struct RawTrack {
    data: Vec<u8>,
    marks: Vec<bool>,
}

impl RawTrack {
    fn new() -> Self {
        Self {
            data: Vec::with_capacity(UDI_TRACK_LENGTH),
            marks: Vec::with_capacity(UDI_TRACK_LENGTH),
        }
    }

    fn push(&mut self, byte: u8, count: usize) {
        self.data.extend(std::iter::repeat(byte).take(count));
        self.marks.extend(std::iter::repeat(false).take(count));
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.marks.extend(std::iter::repeat(false).take(bytes.len()));
    }

    fn push_marks(&mut self, byte: u8) {
        self.data.extend_from_slice(&[byte; 3]);
        self.marks.extend_from_slice(&[true; 3]);
    }

    fn clock_bitmap(&self) -> Vec<u8> {
        let mut bitmap = vec![0u8; self.data.len().div_ceil(8)];
        for (i, _) in self.marks.iter().enumerate().filter(|(_, &m)| m) {
            bitmap[i / 8] |= 1 << (i % 8);
        }
        bitmap
    }

    fn is_sync(&self, pos: usize) -> bool {
        pos + 3 < self.data.len()
            && (pos..pos + 3).all(|i| self.marks[i] && self.data[i] == MARK_SYNC)
    }
}

/// Lay a track out as an MFM byte stream
fn encode_track(track: &Track, preindex: bool) -> RawTrack {
    let mut raw = RawTrack::new();

    if preindex {
        raw.push(GAP_BYTE, 80);
        raw.push(0x00, 12);
        raw.push_marks(MARK_INDEX_SYNC);
        raw.push(MARK_INDEX, 1);
        raw.push(GAP_BYTE, 50);
    } else {
        raw.push(GAP_BYTE, 60);
    }

    for sector in track.sectors() {
        let id = sector.id;
        raw.push(0x00, 12);
        raw.push_marks(MARK_SYNC);
        let header = [MARK_ID, id.track, id.side, id.sector, id.size_code];
        raw.push_bytes(&header);
        let crc = crc16(crc16(CRC16_INIT, &[MARK_SYNC; 3]), &header);
        raw.push_bytes(&crc.to_be_bytes());

        raw.push(GAP_BYTE, GAP2_LENGTH);
        raw.push(0x00, 12);
        raw.push_marks(MARK_SYNC);
        let mark = if sector.deleted { MARK_DELETED_DATA } else { MARK_DATA };
        raw.push(mark, 1);
        raw.push_bytes(sector.data());
        let mut crc = crc16(crc16(CRC16_INIT, &[MARK_SYNC, MARK_SYNC, MARK_SYNC, mark]), sector.data());
        if sector.crc_error {
            crc = !crc;
        }
        raw.push_bytes(&crc.to_be_bytes());
        raw.push(GAP_BYTE, track.gap3_length as usize);
    }

    if raw.data.len() < UDI_TRACK_LENGTH {
        raw.push(GAP_BYTE, UDI_TRACK_LENGTH - raw.data.len());
    }

    raw
}

/// Recover sectors from an MFM byte stream
fn decode_track(raw: &RawTrack, cylinder: u8, side: u8) -> Track {
    let mut track = Track::new(cylinder, side);
    let mut pos = 0;

    while pos < raw.data.len() {
        if !(raw.is_sync(pos) && raw.data[pos + 3] == MARK_ID) {
            pos += 1;
            continue;
        }

        let Some(header) = raw.data.get(pos + 3..pos + 10) else {
            break;
        };
        let stored = u16::from_be_bytes([header[5], header[6]]);
        if crc16(crc16(CRC16_INIT, &[MARK_SYNC; 3]), &header[..5]) != stored {
            log::debug!("UDI: bad ID CRC at byte {} of cylinder {} side {}", pos, cylinder, side);
            pos += 4;
            continue;
        }

        let id = SectorId::new(header[1], header[2], header[3], header[4]);
        pos += 10;

        let window_end = (pos + DATA_MARK_WINDOW).min(raw.data.len());
        let Some(data_pos) = (pos..window_end).find(|&p| {
            raw.is_sync(p) && matches!(raw.data[p + 3], MARK_DATA | MARK_DELETED_DATA)
        }) else {
            log::debug!("UDI: sector {} on cylinder {} has no data field", id.sector, cylinder);
            continue;
        };

        let mark = raw.data[data_pos + 3];
        let start = data_pos + 4;
        let size = id.size_bytes();
        let end = (start + size).min(raw.data.len());
        let data = raw.data[start..end].to_vec();

        let crc_ok = raw
            .data
            .get(end..end + 2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .is_some_and(|stored| {
                data.len() == size
                    && crc16(crc16(CRC16_INIT, &[MARK_SYNC, MARK_SYNC, MARK_SYNC, mark]), &data) == stored
            });

        let mut sector = Sector::with_data(id, data);
        sector.deleted = mark == MARK_DELETED_DATA;
        sector.crc_error = !crc_ok;
        track.add_sector(sector);

        pos = end;
    }

    track
}

/// Decode a UDI image
///
/// Fails when the CRC-32 trailer does not match the contents.
pub fn read_udi(data: &[u8], preindex: bool) -> CodecResult<DiskImage> {
    if data.len() < UDI_HEADER_SIZE || !data.starts_with(UDI_SIGNATURE) {
        return Err(CodecError::invalid_format("Missing UDI! signature"));
    }

    let size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    let version = data[8];
    let max_cylinder = data[9];
    let max_side = data[10];
    let ext_len = u32::from_le_bytes([data[12], data[13], data[14], data[15]]) as usize;

    if version != 0 {
        return Err(CodecError::UnsupportedFormat(format!("UDI version {}", version)));
    }
    if max_side > 1 {
        return Err(CodecError::parse(10, format!("UDI image has {} sides", max_side as usize + 1)));
    }
    if size > data.len() {
        return Err(CodecError::parse(4, "UDI file is shorter than its header says"));
    }

    if let Some(trailer) = data.get(size..size + 4) {
        let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let computed = udi_crc32(&data[..size]);
        if stored != computed {
            return Err(CodecError::integrity(format!(
                "UDI CRC stored {:#010x}, computed {:#010x}",
                stored, computed
            )));
        }
    } else {
        log::warn!("UDI CRC missing");
    }

    let mut disks: Vec<Disk> = (0..=max_side).map(Disk::new).collect();
    let mut offset = UDI_HEADER_SIZE + ext_len;

    for cylinder in 0..=max_cylinder {
        for side in 0..=max_side {
            let header = data
                .get(offset..offset + 3)
                .ok_or_else(|| CodecError::parse(offset, "Truncated UDI track header"))?;
            let track_type = header[0];
            let length = u16::from_le_bytes([header[1], header[2]]) as usize;
            offset += 3;

            let bitmap_len = length.div_ceil(8);
            let bytes = data
                .get(offset..offset + length)
                .ok_or_else(|| CodecError::parse(offset, "Truncated UDI track data"))?;
            let bitmap = data
                .get(offset + length..offset + length + bitmap_len)
                .ok_or_else(|| CodecError::parse(offset + length, "Truncated UDI clock bitmap"))?;
            offset += length + bitmap_len;

            let track = if track_type == TRACK_TYPE_MFM {
                let raw = RawTrack {
                    data: bytes.to_vec(),
                    marks: (0..length).map(|i| bitmap[i / 8] & (1 << (i % 8)) != 0).collect(),
                };
                decode_track(&raw, cylinder, side)
            } else {
                log::warn!(
                    "UDI: track type {:#04x} on cylinder {} side {} left unformatted",
                    track_type,
                    cylinder,
                    side
                );
                Track::new(cylinder, side)
            };

            disks[side as usize].add_track(track);
        }
    }

    let spec = build_format_spec(&disks, max_side + 1, max_cylinder.saturating_add(1));
    log::debug!("UDI: {} cylinders, {} sides", spec.num_tracks, spec.num_sides);

    Ok(DiskImage {
        format: DiskFormat::Udi,
        spec,
        disks,
        filename: None,
        write_protect: false,
        preindex,
        position: Position::default(),
        changed: false,
    })
}

/// Encode an image as UDI with synthesized MFM tracks
pub fn write_udi(image: &DiskImage) -> CodecResult<Vec<u8>> {
    let sides = image.disk_count();
    if sides == 0 || sides > 2 {
        return Err(CodecError::UnsupportedFormat(format!("UDI cannot hold {} sides", sides)));
    }

    let cylinders = image.disks().iter().map(|d| d.track_count()).max().unwrap_or(0);
    if cylinders == 0 {
        return Err(CodecError::UnsupportedFormat("image has no tracks".to_string()));
    }

    let mut out = vec![0u8; UDI_HEADER_SIZE];
    out[..4].copy_from_slice(UDI_SIGNATURE);
    out[9] = (cylinders - 1) as u8;
    out[10] = (sides - 1) as u8;

    for cylinder in 0..cylinders {
        for disk in image.disks() {
            let raw = match disk.get_track(cylinder as u8) {
                Some(track) => encode_track(track, image.preindex()),
                None => {
                    let mut raw = RawTrack::new();
                    raw.push(GAP_BYTE, UDI_TRACK_LENGTH);
                    raw
                }
            };

            let length = u16::try_from(raw.data.len()).map_err(|_| {
                CodecError::UnsupportedFormat(format!("cylinder {} is too long for UDI", cylinder))
            })?;
            out.push(TRACK_TYPE_MFM);
            out.extend_from_slice(&length.to_le_bytes());
            out.extend_from_slice(&raw.data);
            out.extend_from_slice(&raw.clock_bitmap());
        }
    }

    let size = out.len() as u32;
    out[4..8].copy_from_slice(&size.to_le_bytes());
    let crc = udi_crc32(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatSpec;

    fn sample_image() -> DiskImage {
        let mut image = DiskImage::builder().num_tracks(3).build();
        image.write_sector(0, 0, 9, &[0x10; 256]).unwrap();
        image.write_sector(1, 2, 16, &[0x55; 256]).unwrap();
        image
            .get_disk_mut(1)
            .unwrap()
            .get_track_mut(1)
            .unwrap()
            .get_sector_mut(3)
            .unwrap()
            .deleted = true;
        image
    }

    #[test]
    fn test_encode_track_layout() {
        let image = sample_image();
        let track = image.get_disk(0).unwrap().get_track(0).unwrap();
        let raw = encode_track(track, false);

        assert_eq!(raw.data.len(), UDI_TRACK_LENGTH);
        assert_eq!(raw.data[..60], [GAP_BYTE; 60]);
        assert!(raw.is_sync(72));
        assert_eq!(raw.data[75], MARK_ID);
        assert_eq!(&raw.data[76..80], &[0, 0, 1, 1]);
    }

    #[test]
    fn test_encode_track_preindex() {
        let image = sample_image();
        let track = image.get_disk(0).unwrap().get_track(0).unwrap();
        let raw = encode_track(track, true);

        assert_eq!(&raw.data[92..96], &[0xC2, 0xC2, 0xC2, 0xFC]);
        assert!(raw.marks[92] && raw.marks[94] && !raw.marks[95]);
    }

    #[test]
    fn test_clock_bitmap_bit_order() {
        let mut raw = RawTrack::new();
        raw.push(0, 9);
        raw.push_marks(MARK_SYNC);
        assert_eq!(raw.clock_bitmap(), vec![0x00, 0x0E]);
    }

    #[test]
    fn test_udi_round_trip() {
        let image = sample_image();
        let bytes = write_udi(&image).unwrap();

        assert_eq!(&bytes[..4], b"UDI!");
        assert_eq!(bytes[9], 2);
        assert_eq!(bytes[10], 1);

        let decoded = read_udi(&bytes, false).unwrap();
        assert_eq!(decoded.format(), DiskFormat::Udi);
        assert_eq!(decoded.spec().num_sides, 2);
        assert_eq!(decoded.cylinders(), 3);

        for side in 0..2 {
            for cylinder in 0..3 {
                for id in 1..=16 {
                    let before = image.get_disk(side).unwrap().get_track(cylinder).unwrap().get_sector(id).unwrap();
                    let after = decoded.get_disk(side).unwrap().get_track(cylinder).unwrap().get_sector(id).unwrap();
                    assert_eq!(before.data(), after.data());
                    assert_eq!(before.deleted, after.deleted);
                    assert!(!after.crc_error);
                }
            }
        }
    }

    #[test]
    fn test_udi_keeps_crc_errors() {
        let mut image = DiskImage::builder()
            .spec(FormatSpec::trdos_ss40())
            .num_tracks(1)
            .build();
        image
            .get_disk_mut(0)
            .unwrap()
            .get_track_mut(0)
            .unwrap()
            .get_sector_mut(5)
            .unwrap()
            .crc_error = true;

        let decoded = read_udi(&write_udi(&image).unwrap(), false).unwrap();
        let track = decoded.get_disk(0).unwrap().get_track(0).unwrap();
        assert!(track.get_sector(5).unwrap().crc_error);
        assert!(!track.get_sector(6).unwrap().crc_error);
    }

    #[test]
    fn test_udi_crc_mismatch() {
        let mut bytes = write_udi(&sample_image()).unwrap();
        bytes[UDI_HEADER_SIZE + 10] ^= 0xFF;
        assert!(matches!(read_udi(&bytes, false), Err(CodecError::Integrity(_))));
    }

    #[test]
    fn test_udi_truncated() {
        let bytes = write_udi(&sample_image()).unwrap();
        assert!(read_udi(&bytes[..12], false).is_err());
        assert!(matches!(
            read_udi(&bytes[..5000], false),
            Err(CodecError::Parse { .. })
        ));
    }

    #[test]
    fn test_udi_remembers_preindex() {
        let bytes = write_udi(&sample_image()).unwrap();
        assert!(read_udi(&bytes, true).unwrap().preindex());
    }
}
