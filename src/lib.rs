/*!
# trdmanager

A Rust library for opening, merging and writing ZX Spectrum disk images with
TR-DOS filesystem support.

## Features

- Read and write TRD, SCL, UDI, Standard and Extended DSK images
- Merge two single-sided images named `..._Side_A` / `..._Side_B` into one
  double-sided disk
- Read the TR-DOS catalog and files
- Give TR-DOS disks a `boot` program that runs their first BASIC program
- List Sinclair BASIC programs

## Quick Start

```rust,no_run
use trdmanager::{DiskManager, Settings, TrdosFileSystem};

let mut manager = DiskManager::new(Settings::load(), |_: &str| true);

// Opening a TR-DOS disk adds a boot loader when auto-load is enabled
let image = manager.open("game_Side_A.trd", false, true)?;

let fs = TrdosFileSystem::new(&image)?;
for entry in fs.read_dir()? {
    println!("{}: {} bytes", entry.display_name(), entry.byte_length());
}

manager.write(&image, "game.udi")?;
# Ok::<(), trdmanager::DiskError>(())
```

## Modules

- `manager`: opening, side merging and writing image files
- `trdos`: TR-DOS specification sector, directory and boot loader
- `image`: in-memory sides, tracks and sectors with a sector cursor
- `io`: container codecs
- `format`: container formats and disk geometry
- `config`: user settings
- `error`: error types and Result alias
*/

#![warn(missing_docs)]

/// User settings
pub mod config;
/// Error types and Result alias
pub mod error;
/// Container formats and disk geometry
pub mod format;
/// Core image data structures (DiskImage, Track, Sector)
pub mod image;
/// Container codecs
pub mod io;
/// Opening, merging and writing image files
pub mod manager;
/// Sinclair BASIC lister
pub mod sinclair_basic;
/// TR-DOS filesystem
pub mod trdos;

// Re-export common types
pub use config::Settings;
pub use error::{CodecError, CodecResult, DiskError, RecognitionFailure, Result};
pub use format::{DiskFormat, FormatSpec, SideMode};
pub use image::{merge_sides, Disk, DiskImage, DiskImageBuilder, Position, PositionContext, Sector, SectorId, Track};
pub use manager::{side_two_name, DiskManager, Prompt};
pub use sinclair_basic::{decode_sinclair_basic, list_basic, SinclairBasicMode};
pub use trdos::{
    insert_basic_file, insert_boot_loader, scan_fat, BootInfo, BootOutcome, SkipReason,
    TrdosDirEntry, TrdosFileSystem, TrdosInfo, TrdosSpec,
};
