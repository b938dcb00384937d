/// Image format magic bytes and constants

/// Standard DSK format signature
pub const STANDARD_DSK_SIGNATURE: &[u8] = b"MV - CPCEMU Disk-File\r\nDisk-Info\r\n";

/// Extended DSK format signature
pub const EXTENDED_DSK_SIGNATURE: &[u8] = b"EXTENDED CPC DSK File\r\nDisk-Info\r\n";

/// Track-Info block marker
pub const TRACK_INFO_MARKER: &[u8] = b"Track-Info\r\n";

/// Creator signature written into DSK headers
pub const CREATOR_SIGNATURE: &[u8] = b"trdmanager 0.1";

/// Size of disk info block
pub const DISK_INFO_BLOCK_SIZE: usize = 256;

/// Size of track info block
pub const TRACK_INFO_BLOCK_SIZE: usize = 256;

/// Size of sector info entry
pub const SECTOR_INFO_SIZE: usize = 8;

/// Largest sector payload a DSK file stores
pub const DSK_MAX_STORED_SECTOR: usize = 0x1800;

/// Offset of creator in disk info block
pub const DISK_INFO_CREATOR_OFFSET: usize = 34;

/// Offset of track count in disk info block
pub const DISK_INFO_TRACK_COUNT_OFFSET: usize = 0x30;

/// Offset of side count in disk info block
pub const DISK_INFO_SIDE_COUNT_OFFSET: usize = 0x31;

/// Offset of track size in disk info block (standard format)
pub const DISK_INFO_TRACK_SIZE_OFFSET: usize = 0x32;

/// Offset of extended track size table in disk info block (extended format)
pub const DISK_INFO_EXT_TRACK_SIZE_OFFSET: usize = 0x34;

/// TRD sector size
pub const TRD_SECTOR_SIZE: usize = 256;

/// TRD sectors per track
pub const TRD_SECTORS_PER_TRACK: usize = 16;

/// Bytes in one TRD track
pub const TRD_TRACK_SIZE: usize = TRD_SECTOR_SIZE * TRD_SECTORS_PER_TRACK;

/// TR-DOS disk type: 80 tracks, double-sided
pub const TRDOS_DS80: u8 = 0x16;

/// TR-DOS disk type: 40 tracks, double-sided
pub const TRDOS_DS40: u8 = 0x17;

/// TR-DOS disk type: 80 tracks, single-sided
pub const TRDOS_SS80: u8 = 0x18;

/// TR-DOS disk type: 40 tracks, single-sided
pub const TRDOS_SS40: u8 = 0x19;

/// SCL file signature
pub const SCL_SIGNATURE: &[u8] = b"SINCLAIR";

/// SCL per-file header size
pub const SCL_HEADER_SIZE: usize = 14;

/// UDI file signature
pub const UDI_SIGNATURE: &[u8] = b"UDI!";

/// UDI file header size
pub const UDI_HEADER_SIZE: usize = 16;

/// Raw MFM track length written to UDI files (250 kbit/s, 300 rpm)
pub const UDI_TRACK_LENGTH: usize = 6250;

/// FDC sector size code to actual byte size mapping
/// Index: size_code (0-8), Value: actual size in bytes
pub const FDC_SECTOR_SIZES: [usize; 9] = [
    128,    // 0
    256,    // 1
    512,    // 2
    1024,   // 3
    2048,   // 4
    4096,   // 5
    8192,   // 6
    16384,  // 7
    32768,  // 8
];

/// Convert FDC size code to actual byte size
#[inline]
pub fn fdc_size_to_bytes(size_code: u8) -> usize {
    if size_code as usize >= FDC_SECTOR_SIZES.len() {
        // Invalid size code, return default
        512
    } else {
        FDC_SECTOR_SIZES[size_code as usize]
    }
}

/// Bytes a DSK file stores for a sector of the given size code
#[inline]
pub fn fdc_size_to_stored_bytes(size_code: u8) -> usize {
    fdc_size_to_bytes(size_code).min(DSK_MAX_STORED_SECTOR)
}

/// Convert byte size to FDC size code
#[inline]
pub fn bytes_to_fdc_size(bytes: usize) -> Option<u8> {
    match bytes {
        128 => Some(0),
        256 => Some(1),
        512 => Some(2),
        1024 => Some(3),
        2048 => Some(4),
        4096 => Some(5),
        8192 => Some(6),
        16384 => Some(7),
        32768 => Some(8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fdc_size_to_bytes() {
        assert_eq!(fdc_size_to_bytes(0), 128);
        assert_eq!(fdc_size_to_bytes(1), 256);
        assert_eq!(fdc_size_to_bytes(2), 512);
        assert_eq!(fdc_size_to_bytes(8), 32768);
        assert_eq!(fdc_size_to_bytes(9), 512);
    }

    #[test]
    fn test_stored_bytes_are_capped() {
        assert_eq!(fdc_size_to_stored_bytes(1), 256);
        assert_eq!(fdc_size_to_stored_bytes(6), DSK_MAX_STORED_SECTOR);
        assert_eq!(fdc_size_to_stored_bytes(8), DSK_MAX_STORED_SECTOR);
    }

    #[test]
    fn test_round_trip_conversion() {
        for size_code in 0..=8 {
            let bytes = fdc_size_to_bytes(size_code);
            assert_eq!(bytes_to_fdc_size(bytes), Some(size_code));
        }
        assert_eq!(bytes_to_fdc_size(100), None);
    }

    #[test]
    fn test_trd_track_size() {
        assert_eq!(TRD_TRACK_SIZE, 4096);
    }
}
