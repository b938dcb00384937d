/// Image format tags, detection and geometry specifications

/// Format constants
pub mod constants;
/// Disk geometry specification types
pub mod spec;

pub use constants::*;
pub use spec::{FormatSpec, SideMode};

use std::path::Path;

/// Disk image container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiskFormat {
    /// Not known; writers guess from the file extension
    #[default]
    None,
    /// Ultra Disk Image (raw MFM tracks)
    Udi,
    /// TR-DOS raw sector dump
    Trd,
    /// TR-DOS compact file container
    Scl,
    /// Standard CPCEMU DSK
    Dsk,
    /// Extended CPCEMU DSK
    ExtendedDsk,
}

impl DiskFormat {
    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            DiskFormat::None => "Unknown",
            DiskFormat::Udi => "UDI",
            DiskFormat::Trd => "TRD",
            DiskFormat::Scl => "SCL",
            DiskFormat::Dsk => "Standard DSK",
            DiskFormat::ExtendedDsk => "Extended DSK",
        }
    }

    /// Does this format hold a TR-DOS filesystem?
    pub fn is_trdos(&self) -> bool {
        matches!(self, DiskFormat::Trd | DiskFormat::Scl)
    }

    /// Guess the format from a file extension
    ///
    /// Returns `DiskFormat::None` when the extension is missing or unknown.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("udi") => DiskFormat::Udi,
            Some("trd") => DiskFormat::Trd,
            Some("scl") => DiskFormat::Scl,
            Some("dsk") => DiskFormat::ExtendedDsk,
            _ => DiskFormat::None,
        }
    }
}

impl std::fmt::Display for DiskFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the image format from its leading magic bytes
///
/// TRD images carry no signature and are never detected here.
pub fn detect_format(magic: &[u8]) -> Option<DiskFormat> {
    if magic.starts_with(UDI_SIGNATURE) {
        Some(DiskFormat::Udi)
    } else if magic.starts_with(SCL_SIGNATURE) {
        Some(DiskFormat::Scl)
    } else if magic.starts_with(b"EXTENDED") {
        Some(DiskFormat::ExtendedDsk)
    } else if magic.starts_with(b"MV - CPC") {
        Some(DiskFormat::Dsk)
    } else {
        None
    }
}
