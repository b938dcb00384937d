/// Sector data structures

use crate::format::constants::fdc_size_to_bytes;

/// Sector ID (CHRN) - addressing information for a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorId {
    /// C - Cylinder/Track number
    pub track: u8,
    /// H - Head/Side number
    pub side: u8,
    /// R - Sector ID/Record number
    pub sector: u8,
    /// N - Size code (0=128, 1=256, 2=512, 3=1024, 4=2048, etc.)
    pub size_code: u8,
}

impl SectorId {
    /// Create a new sector ID
    pub fn new(track: u8, side: u8, sector: u8, size_code: u8) -> Self {
        Self {
            track,
            side,
            sector,
            size_code,
        }
    }

    /// Get the advertised sector size in bytes based on size code
    pub fn size_bytes(&self) -> usize {
        fdc_size_to_bytes(self.size_code)
    }
}

/// A disk sector: ID field, data mark kind and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    /// Sector addressing information (CHRN)
    pub id: SectorId,
    /// Data was recorded with a deleted data address mark
    pub deleted: bool,
    /// Data field CRC did not match when the image was read
    pub crc_error: bool,
    data: Vec<u8>,
}

impl Sector {
    /// Create a new sector filled with the given byte
    pub fn new(id: SectorId, filler_byte: u8) -> Self {
        let size = id.size_bytes();
        Self {
            id,
            deleted: false,
            crc_error: false,
            data: vec![filler_byte; size],
        }
    }

    /// Create a new sector with specific data
    pub fn with_data(id: SectorId, data: Vec<u8>) -> Self {
        Self {
            id,
            deleted: false,
            crc_error: false,
            data,
        }
    }

    /// Get a reference to the sector data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the payload as a freshly written sector
    ///
    /// The payload keeps the sector's current length: shorter input is
    /// zero padded, longer input is cut. A rewritten sector is never deleted
    /// and carries a good CRC.
    pub fn write_payload(&mut self, payload: &[u8]) {
        let len = self.data.len();
        let n = payload.len().min(len);
        self.data[..n].copy_from_slice(&payload[..n]);
        self.data[n..].fill(0);
        self.deleted = false;
        self.crc_error = false;
    }

    /// Get the advertised size from the size code
    pub fn advertised_size(&self) -> usize {
        self.id.size_bytes()
    }

    /// Get the actual data size
    pub fn actual_size(&self) -> usize {
        self.data.len()
    }

    /// Check if the actual size matches the advertised size
    pub fn has_size_mismatch(&self) -> bool {
        self.actual_size() != self.advertised_size()
    }
}
