use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for disk operations
pub type Result<T> = std::result::Result<T, DiskError>;

/// Result type alias for sector codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Errors raised by the disk image manager and the TR-DOS layer
#[derive(Debug, Error)]
pub enum DiskError {
    /// The image path was empty or the file could not be read
    #[error("Cannot open disk image '{}'", path.display())]
    Open {
        /// Path that failed to open
        path: PathBuf,
        /// Underlying I/O failure, if any
        #[source]
        source: Option<std::io::Error>,
    },

    /// Error passed through unchanged from the sector codec
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The operation cannot be carried out on this disk
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// The destination file could not be created or fully written
    #[error("Cannot write disk image '{}'", path.display())]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Filesystem-related error
    #[error("Filesystem error: {0}")]
    FileSystem(String),

    /// File not found in filesystem
    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl DiskError {
    /// Create an open error without an underlying I/O cause
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        DiskError::Open {
            path: path.into(),
            source: None,
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        DiskError::Unsupported(message.into())
    }

    /// Create a write error
    pub fn write<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        DiskError::Write {
            path: path.into(),
            source,
        }
    }

    /// Create a filesystem error
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        DiskError::FileSystem(message.into())
    }
}

/// Errors raised by the sector codec while decoding, encoding or addressing sectors
#[derive(Debug, Error)]
pub enum CodecError {
    /// I/O error inside the codec
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unrecognized image format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Invalid track (cylinder) specified
    #[error("Invalid track {track} on side {side} (max: {max})")]
    InvalidTrack {
        /// Side number
        side: u8,
        /// Track number
        track: u8,
        /// Maximum allowed track number
        max: u8,
    },

    /// Sector ID not present on the current track
    #[error("Invalid sector: id={id} on track {track}, side {side}")]
    InvalidSector {
        /// Side number
        side: u8,
        /// Track number
        track: u8,
        /// Sector ID
        id: u8,
    },

    /// Format cannot represent this image
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Parse error at specific offset
    #[error("Parse error at offset {offset}: {message}")]
    Parse {
        /// Byte offset where error occurred
        offset: usize,
        /// Error message
        message: String,
    },

    /// Checksum or CRC mismatch
    #[error("Data integrity error: {0}")]
    Integrity(String),

    /// Two images could not be merged into one double-sided image
    #[error("Cannot merge sides: {0}")]
    MergeMismatch(String),
}

impl CodecError {
    /// Create a parse error with context
    pub fn parse<S: Into<String>>(offset: usize, message: S) -> Self {
        CodecError::Parse {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid format error
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        CodecError::InvalidFormat(message.into())
    }

    /// Create an integrity error
    pub fn integrity<S: Into<String>>(message: S) -> Self {
        CodecError::Integrity(message.into())
    }
}

/// A sector is not a TR-DOS specification sector
///
/// Only gates internal logic; it is never surfaced by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Not a TR-DOS specification sector")]
pub struct RecognitionFailure;
