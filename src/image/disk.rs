/// Disk side data structures

use crate::image::sector::{Sector, SectorId};
use crate::image::track::Track;

/// One side of a disk: the tracks under a single head
#[derive(Debug, Clone)]
pub struct Disk {
    /// Side number (0 or 1)
    pub side_number: u8,
    /// Tracks on this disk side
    tracks: Vec<Track>,
}

impl Disk {
    /// Create a new disk side
    pub fn new(side_number: u8) -> Self {
        Self {
            side_number,
            tracks: Vec::new(),
        }
    }

    /// Add a track to this disk
    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Get a reference to all tracks
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Get a track by its track number
    pub fn get_track(&self, track_number: u8) -> Option<&Track> {
        self.tracks.get(track_number as usize)
    }

    /// Get a mutable reference to a track by its track number
    pub fn get_track_mut(&mut self, track_number: u8) -> Option<&mut Track> {
        self.tracks.get_mut(track_number as usize)
    }

    /// Get the number of tracks on this disk
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Check if this disk has any tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Get the total size of all track data in bytes
    pub fn total_size(&self) -> usize {
        self.tracks.iter().map(|t| t.total_data_size()).sum()
    }

    /// Move this side under another head, renumbering its tracks
    pub fn renumber_side(&mut self, side_number: u8) {
        self.side_number = side_number;
        for track in &mut self.tracks {
            track.side_number = side_number;
        }
    }

    /// Extend this side to `num_tracks` tracks
    ///
    /// New tracks are formatted with `sectors` sectors of `size_code`,
    /// numbered from `first_sector_id` and filled with `filler_byte`.
    pub fn extend_formatted(
        &mut self,
        num_tracks: usize,
        sectors: u8,
        first_sector_id: u8,
        size_code: u8,
        filler_byte: u8,
    ) {
        while self.tracks.len() < num_tracks {
            let track_number = self.tracks.len() as u8;
            let mut track = Track::new(track_number, self.side_number);
            track.filler_byte = filler_byte;
            for n in 0..sectors {
                let id = SectorId::new(track_number, self.side_number, first_sector_id + n, size_code);
                track.add_sector(Sector::new(id, filler_byte));
            }
            self.tracks.push(track);
        }
    }
}
