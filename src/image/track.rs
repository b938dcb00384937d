/// Track data structures

use crate::image::sector::Sector;
use std::collections::HashMap;

/// A disk track containing multiple sectors
#[derive(Debug, Clone)]
pub struct Track {
    /// Physical track (cylinder) number
    pub track_number: u8,
    /// Physical side number (0 or 1)
    pub side_number: u8,
    /// GAP#3 length
    pub gap3_length: u8,
    /// Filler byte used for formatting
    pub filler_byte: u8,
    /// Sectors in physical order
    sectors: Vec<Sector>,
    /// Map from sector ID to index in sectors vector for fast lookup
    sector_map: HashMap<u8, usize>,
}

impl Track {
    /// Create a new unformatted track
    pub fn new(track_number: u8, side_number: u8) -> Self {
        Self {
            track_number,
            side_number,
            gap3_length: 0x36,
            filler_byte: 0x00,
            sectors: Vec::new(),
            sector_map: HashMap::new(),
        }
    }

    /// Add a sector to this track
    ///
    /// When two sectors share an ID, lookups by ID find the first one, as a
    /// controller searching from the index hole would.
    pub fn add_sector(&mut self, sector: Sector) {
        let sector_id = sector.id.sector;
        let index = self.sectors.len();
        self.sectors.push(sector);
        self.sector_map.entry(sector_id).or_insert(index);
    }

    /// Get a reference to all sectors
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Get a sector by its ID
    pub fn get_sector(&self, sector_id: u8) -> Option<&Sector> {
        self.sector_map
            .get(&sector_id)
            .and_then(|&idx| self.sectors.get(idx))
    }

    /// Get a mutable reference to a sector by its ID
    pub fn get_sector_mut(&mut self, sector_id: u8) -> Option<&mut Sector> {
        self.sector_map
            .get(&sector_id)
            .and_then(|&idx| self.sectors.get_mut(idx))
    }

    /// Physical position of a sector ID on this track
    pub fn sector_index(&self, sector_id: u8) -> Option<usize> {
        self.sector_map.get(&sector_id).copied()
    }

    /// Get a sector by its position index
    pub fn get_sector_by_index(&self, index: usize) -> Option<&Sector> {
        self.sectors.get(index)
    }

    /// Get a mutable reference to a sector by its position index
    pub fn get_sector_by_index_mut(&mut self, index: usize) -> Option<&mut Sector> {
        self.sectors.get_mut(index)
    }

    /// Get the number of sectors in this track
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// Check if this track has any sectors
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Get the total data size of all sectors in bytes
    pub fn total_data_size(&self) -> usize {
        self.sectors.iter().map(|s| s.actual_size()).sum()
    }

    /// Get list of all sector IDs in this track
    pub fn sector_ids(&self) -> Vec<u8> {
        self.sectors.iter().map(|s| s.id.sector).collect()
    }

    /// Append sector data in ascending ID order, as an FDC reads a track
    pub fn read_logical(&self, out: &mut Vec<u8>) {
        let mut ids = self.sector_ids();
        ids.sort_unstable();
        ids.dedup();
        for id in ids {
            if let Some(sector) = self.get_sector(id) {
                out.extend_from_slice(sector.data());
            }
        }
    }
}
