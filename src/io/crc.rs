/// Checksums used by the raw track codecs

/// Initial value of the MFM address and data field CRC
pub const CRC16_INIT: u16 = 0xFFFF;

/// CRC-16/CCITT as computed by the WD1793 over ID and data fields
pub fn crc16(crc_seed: u16, buf: &[u8]) -> u16 {
    let mut crc = crc_seed;
    for &byte in buf {
        crc ^= (byte as u16) << 8;
        for _bit in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// CRC-32 of a UDI image
///
/// UDI runs the reflected 0xEDB88320 polynomial from a zero register and
/// complements the result, which differs from the zlib CRC-32.
pub fn udi_crc32(buf: &[u8]) -> u32 {
    let mut crc = 0u32;
    for &byte in buf {
        crc ^= byte as u32;
        for _bit in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
    }
    !crc
}
