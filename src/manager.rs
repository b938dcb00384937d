/// Disk image manager: opening, side merging and writing image files
///
/// A split double-sided disk is usually distributed as two files such as
/// `game_Side_A.trd` and `game_Side_B.trd`. When asked to, the manager
/// finds the other side by its file name and merges both into one image.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::config::Settings;
use crate::error::{DiskError, Result};
use crate::format::DiskFormat;
use crate::image::{merge_sides, DiskImage};
use crate::io;
use crate::trdos::{insert_boot_loader, BootOutcome};

/// Question asked before merging two sides
pub const MERGE_QUESTION: &str = "Try to merge 'B' side of this disk?";

/// Shortest path that is scanned for a side suffix
const MIN_MERGE_NAME_LEN: usize = 7;

/// Yes/no confirmation asked of the user
pub trait Prompt {
    /// Ask a question, returning `true` for yes
    fn confirm(&mut self, question: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Prompt for F {
    fn confirm(&mut self, question: &str) -> bool {
        self(question)
    }
}

/// Opens and writes disk images according to the user's settings
pub struct DiskManager<P: Prompt> {
    settings: Settings,
    prompt: P,
}

impl<P: Prompt> DiskManager<P> {
    /// Create a manager
    pub fn new(settings: Settings, prompt: P) -> Self {
        Self { settings, prompt }
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings, for changing
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Open a disk image
    ///
    /// With `merge` set, a path whose file name ends in a side suffix such
    /// as `Side_A.` is opened together with its other side as one
    /// double-sided image. Any failure to find, open or merge the other side
    /// falls back to opening `path` on its own.
    pub fn open<Q: AsRef<Path>>(&mut self, path: Q, preindex: bool, merge: bool) -> Result<DiskImage> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(DiskError::open(path));
        }

        let other_side = if merge { side_two_name(path) } else { None };
        let Some(other_side) = other_side else {
            return self.open_single(path, preindex);
        };

        if self.settings.disk_ask_merge && !self.prompt.confirm(MERGE_QUESTION) {
            log::debug!("merge of {} declined", path.display());
            return self.open_single(path, preindex);
        }

        let side2 = match self.open_single(Path::new(&other_side), preindex) {
            Ok(image) => image,
            Err(e) => {
                log::debug!("cannot open other side {}: {}", other_side, e);
                return self.open_single(path, preindex);
            }
        };

        let side1 = self.open_single(path, preindex)?;

        // merge_sides consumes both images, so keep a copy of side 1 to fall back on
        match merge_sides(side1.clone(), side2, false) {
            Ok(merged) => {
                log::info!("merged {} and {}", path.display(), other_side);
                Ok(merged)
            }
            Err(e) => {
                log::info!("cannot merge {} with {}: {}", path.display(), other_side, e);
                Ok(side1)
            }
        }
    }

    /// Open a single image file
    fn open_single(&self, path: &Path, preindex: bool) -> Result<DiskImage> {
        let write_protect = fs::metadata(path)
            .map(|m| m.permissions().readonly())
            .unwrap_or(false);

        let data = fs::read(path).map_err(|e| DiskError::Open {
            path: path.to_path_buf(),
            source: Some(e),
        })?;

        let mut image = io::decode(&data, DiskFormat::from_path(path), preindex)?;
        image.filename = Some(path.to_string_lossy().into_owned());
        image.write_protect = write_protect;
        image.preindex = preindex;

        if image.format().is_trdos() && self.settings.auto_load {
            let position = image.save_position();
            match insert_boot_loader(&mut image) {
                Ok(BootOutcome::Inserted { program }) => {
                    log::debug!("{}: boots \"{}\"", path.display(), program)
                }
                Ok(BootOutcome::Skipped(reason)) => {
                    log::debug!("{}: no boot loader added, {}", path.display(), reason)
                }
                Err(e) => log::warn!("{}: boot loader not added: {}", path.display(), e),
            }
            image.restore_position(position);
        }

        log::debug!(
            "opened {} as {} ({} sides, {} cylinders)",
            path.display(),
            image.format(),
            image.disk_count(),
            image.cylinders()
        );
        Ok(image)
    }

    /// Write an image to a file
    ///
    /// The container is the image's own format, else the one named by the
    /// path's extension, else UDI.
    pub fn write<Q: AsRef<Path>>(&self, image: &DiskImage, path: Q) -> Result<()> {
        let path = path.as_ref();
        let format = match image.format() {
            DiskFormat::None => match DiskFormat::from_path(path) {
                DiskFormat::None => DiskFormat::Udi,
                format => format,
            },
            format => format,
        };

        let mut file = File::create(path).map_err(|e| DiskError::write(path, e))?;
        let buffer = io::encode(image, format)?;

        file.write_all(&buffer).map_err(|e| DiskError::write(path, e))?;
        file.sync_all().map_err(|e| DiskError::write(path, e))?;

        log::debug!("wrote {} bytes of {} to {}", buffer.len(), format, path.display());
        Ok(())
    }
}

/// Name of the other side of a split disk
///
/// Scans the path backwards for `[Ss]ide[ _][1aA2bB][._ ]` inside the file
/// name, not at its very start, and toggles the side character (1 and 2, a and b, A and B). Returns
/// `None` when the name carries no side suffix.
pub fn side_two_name(path: &Path) -> Option<String> {
    let full = path.to_str()?;
    let name = path.file_name()?.to_str()?;
    if full.len() < MIN_MERGE_NAME_LEN {
        return None;
    }

    let bytes = full.as_bytes();
    let name_start = full.len() - name.len();
    let mut stage = 0;
    let mut toggle = None;

    for i in (name_start..bytes.len()).rev() {
        let c = bytes[i];
        match (stage, c) {
            (0, b'.' | b'_' | b' ') => stage = 1,
            (1, b'1' | b'a' | b'A') => {
                toggle = Some((i, c + 1));
                stage = 2;
            }
            (1, b'2' | b'b' | b'B') => {
                toggle = Some((i, c - 1));
                stage = 2;
            }
            (2, b'_' | b' ') => stage = 3,
            (3, _) if i >= name_start + 4 && is_side_word(&bytes[i - 3..=i]) => {
                stage = 4;
                break;
            }
            _ => stage = 0,
        }
    }

    if stage != 4 {
        return None;
    }

    let (pos, replacement) = toggle?;
    let mut other = bytes.to_vec();
    other[pos] = replacement;
    String::from_utf8(other).ok()
}

fn is_side_word(word: &[u8]) -> bool {
    word == b"Side" || word == b"side"
}
