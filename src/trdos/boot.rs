/// Boot loader injection
///
/// TR-DOS runs a BASIC program named `boot` when a disk is started. Disks
/// without one get a one-line loader that chains to the first BASIC program
/// in the directory.

use std::fmt;

use crate::error::{DiskError, Result};
use crate::image::DiskImage;
use crate::trdos::{
    locate, name_to_string, next_sector, read_fat, read_spec, scan_fat, TrdosDirEntry, TrdosSpec,
    BOOT_FILENAME, DIR_ENTRY_SIZE, ENTRIES_PER_SECTOR, FAT_SECTORS, FILE_TYPE_BASIC, MAX_FILES,
    SECTOR_SIZE, SPEC_SECTOR_ID,
};

/// `1 RANDOMIZE USR 15619: REM : RUN "        "`
///
/// USR 15619 enters TR-DOS, which executes the rest of the line as a DOS
/// command.
const BOOT_STUB: [u8; 32] = [
    0x00, 0x01, 0x1C, 0x00, 0xF9, 0xC0, 0x31, 0x35, 0x36, 0x31, 0x39, 0x0E, 0x00, 0x00, 0x03,
    0x3D, 0x00, 0x3A, 0xEA, 0x3A, 0xF7, 0x22, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x22, 0x0D,
];

/// Offset of the program name inside the boot stub
const BOOT_STUB_NAME_OFFSET: usize = 22;

/// Appended to every saved BASIC program: variables end marker and the
/// auto-start line number 1
const BASIC_TRAILER: [u8; 4] = [0x80, 0xAA, 0x01, 0x00];

/// Result of trying to make a disk bootable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootOutcome {
    /// A boot loader was written that runs `program`
    Inserted {
        /// Name of the BASIC program the loader runs
        program: String,
    },
    /// The disk was left untouched
    Skipped(SkipReason),
}

/// Why a disk was left without a new boot loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Track 0 has no 256-byte sector 9
    NoSpecSector,
    /// Sector 9 is not a TR-DOS specification sector
    NotTrdos,
    /// All 128 directory slots are in use
    DirectoryFull,
    /// No free sectors left
    DiskFull,
    /// The eight directory sectors are not all readable
    NoDirectory,
    /// A BASIC program named `boot` already exists
    AlreadyBootable,
    /// There is no BASIC program to run
    NoBasicProgram,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NoSpecSector => "no specification sector",
            SkipReason::NotTrdos => "not a TR-DOS disk",
            SkipReason::DirectoryFull => "directory is full",
            SkipReason::DiskFull => "disk is full",
            SkipReason::NoDirectory => "directory is unreadable",
            SkipReason::AlreadyBootable => "disk already has a boot file",
            SkipReason::NoBasicProgram => "no BASIC program to boot",
        };
        f.write_str(text)
    }
}

/// Give a TR-DOS disk a `boot` program if it lacks one
///
/// Disks that cannot or need not take a loader are reported as skipped
/// without being modified. Errors come only from writing the loader.
pub fn insert_boot_loader(image: &mut DiskImage) -> Result<BootOutcome> {
    let spec_data = match read_spec_sector(image) {
        Some(data) => data,
        None => return Ok(BootOutcome::Skipped(SkipReason::NoSpecSector)),
    };

    let mut spec = match read_spec(&spec_data) {
        Ok(spec) => spec,
        Err(_) => return Ok(BootOutcome::Skipped(SkipReason::NotTrdos)),
    };

    if spec.file_count >= MAX_FILES {
        return Ok(BootOutcome::Skipped(SkipReason::DirectoryFull));
    }
    if spec.free_sectors == 0 {
        return Ok(BootOutcome::Skipped(SkipReason::DiskFull));
    }

    let fat_complete = (1..=FAT_SECTORS)
        .all(|id| matches!(image.read_sector(0, 0, id), Ok(data) if data.len() == SECTOR_SIZE));
    let fat = match read_fat(image) {
        Ok(fat) if fat_complete => fat,
        _ => return Ok(BootOutcome::Skipped(SkipReason::NoDirectory)),
    };

    let info = scan_fat(&fat);
    if info.have_boot_file {
        return Ok(BootOutcome::Skipped(SkipReason::AlreadyBootable));
    }
    if info.basic_files_count == 0 {
        return Ok(BootOutcome::Skipped(SkipReason::NoBasicProgram));
    }

    let stub = boot_stub(&info.first_basic_file);
    insert_basic_file(image, &mut spec, BOOT_FILENAME, &stub)?;

    let program = name_to_string(&info.first_basic_file);
    log::info!("inserted boot loader for \"{}\"", program);

    Ok(BootOutcome::Inserted { program })
}

/// The loader program for a BASIC file name
fn boot_stub(program: &[u8; 8]) -> [u8; 32] {
    let mut stub = BOOT_STUB;
    stub[BOOT_STUB_NAME_OFFSET..BOOT_STUB_NAME_OFFSET + 8].copy_from_slice(program);
    stub
}

/// Read sector 9 of track 0 through the cursor
fn read_spec_sector(image: &mut DiskImage) -> Option<Vec<u8>> {
    image.set_track(0, 0).ok()?;
    let length = image.seek_sector(SPEC_SECTOR_ID).ok()?;
    if length != SECTOR_SIZE {
        return None;
    }
    image.current_sector().map(|s| s.data().to_vec())
}

/// A sector write planned by `insert_basic_file`
struct PlannedWrite {
    side: u8,
    cylinder: u8,
    id: u8,
    payload: Vec<u8>,
}

/// Save a BASIC program as a new file
///
/// The program is stored from the first free sector with the auto-start
/// trailer appended, a directory entry is added in slot `file_count` and
/// the specification sector is updated. Every target sector is checked
/// before the first one is written, so a failure leaves the disk unchanged.
pub fn insert_basic_file(
    image: &mut DiskImage,
    spec: &mut TrdosSpec,
    name: &[u8; 8],
    data: &[u8],
) -> Result<()> {
    if spec.file_count >= MAX_FILES {
        return Err(DiskError::unsupported("TR-DOS directory is full"));
    }

    let length = u16::try_from(data.len())
        .map_err(|_| DiskError::unsupported(format!("{} bytes is too long for a BASIC file", data.len())))?;
    let total = data.len() + BASIC_TRAILER.len();
    let sectors = total.div_ceil(SECTOR_SIZE);
    if sectors > spec.free_sectors as usize {
        return Err(DiskError::unsupported(format!(
            "{} sectors needed, {} free",
            sectors, spec.free_sectors
        )));
    }
    let length_sectors = u8::try_from(sectors)
        .map_err(|_| DiskError::unsupported(format!("{} sectors is too long for a TR-DOS file", sectors)))?;

    let mut body = Vec::with_capacity(sectors * SECTOR_SIZE);
    body.extend_from_slice(data);
    body.extend_from_slice(&BASIC_TRAILER);
    body.resize(sectors * SECTOR_SIZE, 0);

    let start_sector = spec.first_free_sector;
    let start_track = spec.first_free_track;
    let mut sector = start_sector;
    let mut track = start_track;
    let mut plan = Vec::with_capacity(sectors + 2);

    let beyond = |track: u16| DiskError::unsupported(format!("logical track {} is beyond the disk", track));
    for chunk in body.chunks(SECTOR_SIZE) {
        let (side, cylinder, id) = locate(image.spec(), spec, track, sector).ok_or_else(|| beyond(track as u16))?;
        plan.push(PlannedWrite {
            side,
            cylinder,
            id,
            payload: chunk.to_vec(),
        });

        // The next free position must stay on the disk, even after the last sector
        (track, sector) = next_sector(track, sector).ok_or_else(|| beyond(track as u16 + 1))?;
        if sector == 0 && locate(image.spec(), spec, track, 0).is_none() {
            return Err(beyond(track as u16));
        }
    }

    let slot = spec.file_count as usize;
    let dir_id = 1 + (slot / ENTRIES_PER_SECTOR) as u8;
    let mut dir_sector = checked_sector(image, 0, 0, dir_id)?.to_vec();
    let entry = TrdosDirEntry {
        filename: *name,
        file_type: FILE_TYPE_BASIC,
        param1: length,
        param2: length,
        length_sectors,
        start_sector,
        start_track,
    };
    let offset = (slot % ENTRIES_PER_SECTOR) * DIR_ENTRY_SIZE;
    dir_sector[offset..offset + DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
    plan.push(PlannedWrite {
        side: 0,
        cylinder: 0,
        id: dir_id,
        payload: dir_sector,
    });

    let mut updated = *spec;
    updated.file_count += 1;
    updated.free_sectors -= length_sectors as u16;
    updated.first_free_sector = sector;
    updated.first_free_track = track;
    checked_sector(image, 0, 0, SPEC_SECTOR_ID)?;
    plan.push(PlannedWrite {
        side: 0,
        cylinder: 0,
        id: SPEC_SECTOR_ID,
        payload: updated.to_bytes().to_vec(),
    });

    for write in &plan[..sectors] {
        checked_sector(image, write.side, write.cylinder, write.id)?;
    }

    for write in &plan {
        image.set_track(write.side, write.cylinder)?;
        image.seek_sector(write.id)?;
        image.write_sector_payload(&write.payload)?;
    }

    *spec = updated;
    log::debug!(
        "saved {} ({} bytes) at track {} sector {}, {} sectors free",
        entry.display_name(),
        data.len(),
        start_track,
        start_sector,
        spec.free_sectors
    );
    Ok(())
}

/// A sector that exists and holds exactly 256 bytes
fn checked_sector(image: &DiskImage, side: u8, cylinder: u8, id: u8) -> Result<&[u8]> {
    match image.read_sector(side, cylinder, id) {
        Ok(data) if data.len() == SECTOR_SIZE => Ok(data),
        Ok(data) => Err(DiskError::unsupported(format!(
            "sector {} on cylinder {} side {} holds {} bytes",
            id,
            cylinder,
            side,
            data.len()
        ))),
        Err(_) => Err(DiskError::unsupported(format!(
            "sector {} on cylinder {} side {} is missing",
            id, cylinder, side
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatSpec;
    use crate::image::{merge_sides, Sector, SectorId};
    use crate::sinclair_basic::list_basic;
    use crate::trdos::{format_disk, pad_name, read_dir_entry, read_disk_spec, DirSlot, TrdosFileSystem};

    fn disk_with(files: &[(&str, u8)]) -> (DiskImage, TrdosSpec) {
        let mut image = DiskImage::builder().build();
        let mut spec = format_disk(&mut image, "TEST").unwrap();
        for (name, file_type) in files {
            if *file_type == FILE_TYPE_BASIC {
                insert_basic_file(&mut image, &mut spec, &pad_name(name), &[0x00, 0x0A, 0x01, 0x00, 0x0D]).unwrap();
            } else {
                let slot = spec.file_count as usize;
                let entry = TrdosDirEntry {
                    filename: pad_name(name),
                    file_type: *file_type,
                    param1: 32768,
                    param2: 256,
                    length_sectors: 1,
                    start_sector: spec.first_free_sector,
                    start_track: spec.first_free_track,
                };
                let mut fat = image.read_sector(0, 0, 1).unwrap().to_vec();
                fat[slot * 16..slot * 16 + 16].copy_from_slice(&entry.to_bytes());
                image.write_sector(0, 0, 1, &fat).unwrap();
                spec.file_count += 1;
                spec.free_sectors -= 1;
                spec.first_free_sector += 1;
                image.write_sector(0, 0, SPEC_SECTOR_ID, &spec.to_bytes()).unwrap();
            }
        }
        (image, spec)
    }

    fn dir_entry(image: &DiskImage, slot: usize) -> DirSlot {
        let fat = read_fat(image).unwrap();
        read_dir_entry(&fat[slot * 16..slot * 16 + 16])
    }

    #[test]
    fn test_boot_stub_listing() {
        let stub = boot_stub(b"elite   ");
        assert_eq!(stub[22..30], *b"elite   ");
        assert_eq!(
            list_basic(&stub),
            "1 RANDOMIZE USR 15619: REM : RUN \"elite   \"\n"
        );
    }

    #[test]
    fn test_insert_boot_loader() {
        let (mut image, before) = disk_with(&[("loader", b'C'), ("game", b'B'), ("menu", b'B')]);

        let outcome = insert_boot_loader(&mut image).unwrap();
        assert_eq!(
            outcome,
            BootOutcome::Inserted {
                program: "game".to_string()
            }
        );

        let spec = read_disk_spec(&image).unwrap();
        assert_eq!(spec.file_count, before.file_count + 1);
        assert_eq!(spec.free_sectors, before.free_sectors - 1);

        let DirSlot::Entry(entry) = dir_entry(&image, 3) else {
            panic!("boot entry missing");
        };
        assert_eq!(&entry.filename, BOOT_FILENAME);
        assert_eq!(entry.file_type, b'B');
        assert_eq!(entry.param1, 32);
        assert_eq!(entry.param2, 32);
        assert_eq!(entry.length_sectors, 1);
        assert_eq!(entry.start_track, before.first_free_track);
        assert_eq!(entry.start_sector, before.first_free_sector);

        let fs = TrdosFileSystem::new(&image).unwrap();
        assert_eq!(fs.read_file(&entry).unwrap(), boot_stub(b"game    ").to_vec());
    }

    #[test]
    fn test_insert_boot_loader_is_idempotent() {
        let (mut image, _) = disk_with(&[("game", b'B')]);
        insert_boot_loader(&mut image).unwrap();
        let first = image.clone();

        assert_eq!(
            insert_boot_loader(&mut image).unwrap(),
            BootOutcome::Skipped(SkipReason::AlreadyBootable)
        );
        assert_eq!(image.read_logical(), first.read_logical());
    }

    #[test]
    fn test_no_basic_program_leaves_disk_unchanged() {
        let (mut image, _) = disk_with(&[("screen", b'C'), ("data", b'D')]);
        let before = image.read_logical();

        assert_eq!(
            insert_boot_loader(&mut image).unwrap(),
            BootOutcome::Skipped(SkipReason::NoBasicProgram)
        );
        assert_eq!(image.read_logical(), before);
    }

    #[test]
    fn test_skip_reasons() {
        let mut blank = DiskImage::builder().build();
        assert_eq!(
            insert_boot_loader(&mut blank).unwrap(),
            BootOutcome::Skipped(SkipReason::NotTrdos)
        );

        let mut plus3 = DiskImage::builder().spec(FormatSpec::spectrum_plus3()).build();
        assert_eq!(
            insert_boot_loader(&mut plus3).unwrap(),
            BootOutcome::Skipped(SkipReason::NoSpecSector)
        );

        let (mut full, mut spec) = disk_with(&[("game", b'B')]);
        spec.free_sectors = 0;
        full.write_sector(0, 0, SPEC_SECTOR_ID, &spec.to_bytes()).unwrap();
        assert_eq!(
            insert_boot_loader(&mut full).unwrap(),
            BootOutcome::Skipped(SkipReason::DiskFull)
        );

        spec.free_sectors = 10;
        spec.file_count = 128;
        full.write_sector(0, 0, SPEC_SECTOR_ID, &spec.to_bytes()).unwrap();
        assert_eq!(
            insert_boot_loader(&mut full).unwrap(),
            BootOutcome::Skipped(SkipReason::DirectoryFull)
        );
    }

    #[test]
    fn test_missing_directory_sector() {
        let (mut image, _) = disk_with(&[("game", b'B')]);
        let track = image.get_disk_mut(0).unwrap().get_track_mut(0).unwrap();
        let mut rebuilt = crate::image::Track::new(0, 0);
        for sector in track.sectors().iter().filter(|s| s.id.sector != 5) {
            rebuilt.add_sector(sector.clone());
        }
        *track = rebuilt;

        assert_eq!(
            insert_boot_loader(&mut image).unwrap(),
            BootOutcome::Skipped(SkipReason::NoDirectory)
        );
    }

    #[test]
    fn test_insert_leaves_cursor_on_spec_sector() {
        let (mut image, _) = disk_with(&[("game", b'B')]);
        image.set_track(1, 5).unwrap();
        insert_boot_loader(&mut image).unwrap();
        // Cursor ends on the spec sector; callers restore it themselves
        assert_eq!(image.current_sector().unwrap().id.sector, SPEC_SECTOR_ID);
    }

    #[test]
    fn test_insert_basic_file_layout() {
        let (mut image, mut spec) = disk_with(&[]);
        let program = vec![0x55; 600];
        insert_basic_file(&mut image, &mut spec, &pad_name("big"), &program).unwrap();

        // 604 bytes take three sectors from logical track 1
        assert_eq!(spec.file_count, 1);
        assert_eq!(spec.free_sectors, 2544 - 3);
        assert_eq!((spec.first_free_track, spec.first_free_sector), (1, 3));

        let third = image.read_sector(1, 0, 3).unwrap();
        assert_eq!(third[600 - 512 - 1], 0x55);
        assert_eq!(third[88..92], BASIC_TRAILER);
        assert!(third[92..].iter().all(|&b| b == 0));
        assert_eq!(read_disk_spec(&image), Some(spec));
    }

    #[test]
    fn test_insert_basic_file_wraps_track() {
        let (mut image, mut spec) = disk_with(&[]);
        spec.first_free_sector = 15;
        insert_basic_file(&mut image, &mut spec, &pad_name("wrap"), &[0x77; 300]).unwrap();

        assert_eq!(image.read_sector(1, 0, 16).unwrap()[0], 0x77);
        // Logical track 2 is cylinder 1 head 0
        assert_eq!(image.read_sector(0, 1, 1).unwrap()[300 - 256], 0x80);
        assert_eq!((spec.first_free_track, spec.first_free_sector), (2, 1));
    }

    #[test]
    fn test_insert_basic_file_space_boundary() {
        let (mut image, mut spec) = disk_with(&[]);

        // 508 bytes plus the trailer fill exactly two sectors
        spec.free_sectors = 2;
        insert_basic_file(&mut image, &mut spec, &pad_name("fits"), &[1; 508]).unwrap();
        assert_eq!(spec.free_sectors, 0);

        let (mut image, mut spec) = disk_with(&[]);
        spec.free_sectors = 2;
        let err = insert_basic_file(&mut image, &mut spec, &pad_name("big"), &[1; 509]).unwrap_err();
        assert!(matches!(err, DiskError::Unsupported(_)));
    }

    #[test]
    fn test_insert_basic_file_directory_full() {
        let (mut image, mut spec) = disk_with(&[]);
        spec.file_count = MAX_FILES;
        let err = insert_basic_file(&mut image, &mut spec, &pad_name("x"), &[0]).unwrap_err();
        assert!(matches!(err, DiskError::Unsupported(_)));
    }

    #[test]
    fn test_insert_basic_file_no_partial_write() {
        let (mut image, mut spec) = disk_with(&[]);
        // Last free position is the final sector of the disk
        spec.first_free_track = 159;
        spec.first_free_sector = 15;
        let before = image.read_logical();
        let saved = spec;

        let err = insert_basic_file(&mut image, &mut spec, &pad_name("tail"), &[9; 300]).unwrap_err();
        assert!(matches!(err, DiskError::Unsupported(_)));
        assert_eq!(spec, saved);
        assert_eq!(image.read_logical(), before);
    }

    #[test]
    fn test_insert_basic_file_short_sector() {
        let (mut image, mut spec) = disk_with(&[]);
        let track = image.get_disk_mut(1).unwrap().get_track_mut(0).unwrap();
        *track.get_sector_mut(1).unwrap() = Sector::with_data(SectorId::new(0, 1, 1, 0), vec![0; 128]);
        let before = image.read_logical();

        assert!(insert_basic_file(&mut image, &mut spec, &pad_name("x"), &[0]).is_err());
        assert_eq!(image.read_logical(), before);
    }

    #[test]
    fn test_insert_rejects_file_ending_on_last_sector() {
        let (mut image, mut spec) = disk_with(&[]);
        spec.first_free_track = 159;
        spec.first_free_sector = 15;
        let saved = spec;
        let before = image.read_logical();

        // The file fits, but the next free position would be track 160
        let err = insert_basic_file(&mut image, &mut spec, &pad_name("last"), &[3; 10]).unwrap_err();
        assert!(matches!(err, DiskError::Unsupported(_)));
        assert_eq!(spec, saved);
        assert_eq!(image.read_logical(), before);
    }

    #[test]
    fn test_insert_stops_at_last_track_number() {
        let mut image = DiskImage::builder().num_tracks(128).build();
        let mut spec = TrdosSpec::blank(&FormatSpec::trdos_ds80(), "BIG").unwrap();
        image.write_sector(0, 0, SPEC_SECTOR_ID, &spec.to_bytes()).unwrap();
        spec.first_free_track = 255;
        spec.first_free_sector = 15;
        let before = image.read_logical();

        let err = insert_basic_file(&mut image, &mut spec, &pad_name("tail"), &[1; 10]).unwrap_err();
        assert!(matches!(err, DiskError::Unsupported(_)));
        assert_eq!(image.read_logical(), before);
    }

    #[test]
    fn test_boot_loader_on_merged_disk_stays_on_side_a() {
        let side = |label: &str| {
            let mut image = DiskImage::builder().spec(FormatSpec::trdos_ss80()).build();
            let mut spec = format_disk(&mut image, label).unwrap();
            insert_basic_file(&mut image, &mut spec, &pad_name("game"), &[0x00, 0x0A, 0x01, 0x00, 0x0D]).unwrap();
            image
        };
        let mut merged = merge_sides(side("A"), side("B"), false).unwrap();
        let side_b_catalog = merged.read_sectors(1, 0, 1, 9).unwrap();
        let side_b_track_1 = merged.read_sectors(1, 1, 1, 16).unwrap();

        assert_eq!(
            insert_boot_loader(&mut merged).unwrap(),
            BootOutcome::Inserted { program: "game".to_string() }
        );
        assert_eq!(merged.read_sectors(1, 0, 1, 9).unwrap(), side_b_catalog);
        assert_eq!(merged.read_sectors(1, 1, 1, 16).unwrap(), side_b_track_1);

        // The loader follows game on head 0, logical track 1 being cylinder 1
        let fs = TrdosFileSystem::new(&merged).unwrap();
        let boot = fs.find_file("boot").unwrap();
        assert_eq!((boot.start_track, boot.start_sector), (1, 1));
        assert_eq!(merged.read_sector(0, 1, 2).unwrap()[..4], BOOT_STUB[..4]);
        assert_eq!(
            list_basic(&fs.read_file(&boot).unwrap()),
            "1 RANDOMIZE USR 15619: REM : RUN \"game    \"\n"
        );
    }
}
