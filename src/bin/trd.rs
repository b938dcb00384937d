/// Interactive TR-DOS disk console

use std::path::PathBuf;

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use trdmanager::*;

type Console = Editor<CommandCompleter, DefaultHistory>;

/// Command completer for the REPL
struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                "boot",
                "cat",
                "dir",
                "exit",
                "help",
                "info",
                "list",
                "ls",
                "open",
                "quit",
                "read-sector",
                "save",
                "set",
                "settings",
                "tracks",
            ],
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only the command name is completed
        let line_to_cursor = &line[..pos];
        if line_to_cursor.contains(' ') {
            return Ok((pos, vec![]));
        }

        let prefix = line_to_cursor.to_lowercase();
        let matches: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(&prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Get the path to the history file
fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".trdmanager_history");
        p
    })
}

fn save_history(rl: &mut Console) {
    if let Some(history_path) = history_path() {
        let _ = rl.save_history(&history_path);
    }
}

/// Ask a yes/no question on the console
fn ask(rl: &mut Console, question: &str) -> bool {
    match rl.readline(&format!("{} (y/n) ", question)) {
        Ok(answer) => matches!(answer.trim().chars().next(), Some('y' | 'Y')),
        Err(_) => false,
    }
}

fn main() {
    env_logger::init();

    println!("=== TRDManager ===");
    println!("Interactive console for exploring TR-DOS disk images.");
    println!("Type 'help' for available commands\n");

    let mut rl: Console = Editor::new().expect("Failed to create editor");
    rl.set_helper(Some(CommandCompleter::new()));

    if let Some(history_path) = history_path() {
        let _ = rl.load_history(&history_path);
    }

    let mut settings = Settings::load();
    let mut image: Option<DiskImage> = None;

    loop {
        let input = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                save_history(&mut rl);
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        let parts = parse_command_line(input);
        if parts.is_empty() {
            continue;
        }
        let command = parts[0].to_lowercase();

        match command.as_str() {
            "help" => print_help(),
            "quit" | "exit" => {
                save_history(&mut rl);
                println!("Goodbye!");
                break;
            }
            "open" => {
                if parts.len() < 2 {
                    println!("Usage: open <path>");
                    continue;
                }
                let merge = settings.disk_try_merge;
                let mut manager = DiskManager::new(settings, |q: &str| ask(&mut rl, q));
                match manager.open(&parts[1], false, merge) {
                    Ok(img) => {
                        println!("Opened: {} ({} sides)", parts[1], img.disk_count());
                        image = Some(img);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "info" => {
                if let Some(ref img) = image {
                    print_info(img);
                } else {
                    println!("No image loaded. Use 'open <path>' first.");
                }
            }
            "tracks" => {
                if let Some(ref img) = image {
                    list_tracks(img);
                } else {
                    println!("No image loaded.");
                }
            }
            "cat" | "dir" | "ls" => {
                if let Some(ref img) = image {
                    list_files(img);
                } else {
                    println!("No image loaded.");
                }
            }
            "list" => {
                if let Some(ref img) = image {
                    if parts.len() < 2 {
                        println!("Usage: list <filename>");
                        continue;
                    }
                    list_program(img, &parts[1]);
                } else {
                    println!("No image loaded.");
                }
            }
            "read-sector" => {
                if let Some(ref img) = image {
                    if parts.len() < 4 {
                        println!("Usage: read-sector <side> <track> <sector_id>");
                        continue;
                    }
                    let (Some(side), Some(track), Some(sector_id)) = (
                        parse_hex_or_dec(&parts[1]),
                        parse_hex_or_dec(&parts[2]),
                        parse_hex_or_dec(&parts[3]),
                    ) else {
                        println!("Side, track and sector ID must be numbers.");
                        continue;
                    };

                    match img.read_sector(side, track, sector_id) {
                        Ok(data) => {
                            println!("Sector {}:{}:{} ({} bytes):", side, track, sector_id, data.len());
                            print_hex_dump(data, 256);
                        }
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    println!("No image loaded.");
                }
            }
            "boot" => {
                if let Some(ref mut img) = image {
                    let position = img.save_position();
                    match insert_boot_loader(img) {
                        Ok(BootOutcome::Inserted { program }) => {
                            println!("Added boot loader for \"{}\"", program)
                        }
                        Ok(BootOutcome::Skipped(reason)) => println!("Not added: {}", reason),
                        Err(e) => println!("Error: {}", e),
                    }
                    img.restore_position(position);
                } else {
                    println!("No image loaded.");
                }
            }
            "save" => {
                if let Some(ref img) = image {
                    let Some(path) = parts.get(1).cloned().or_else(|| img.filename().map(String::from))
                    else {
                        println!("Usage: save <path>");
                        continue;
                    };
                    if parts.len() < 2 && img.is_write_protected() {
                        println!("{} is read-only. Use 'save <path>'.", path);
                        continue;
                    }
                    let manager = DiskManager::new(settings, |_: &str| false);
                    match manager.write(img, &path) {
                        Ok(()) => println!("Saved to: {}", path),
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    println!("No image loaded.");
                }
            }
            "settings" => print_settings(&settings),
            "set" => {
                if parts.len() < 3 {
                    println!("Usage: set <autoLoad|diskAskMerge|diskTryMerge> <on|off>");
                    continue;
                }
                let value = match parts[2].to_lowercase().as_str() {
                    "on" | "yes" | "true" | "1" => true,
                    "off" | "no" | "false" | "0" => false,
                    other => {
                        println!("Unknown value: {}", other);
                        continue;
                    }
                };
                if !settings.set(&parts[1], value) {
                    println!("Unknown setting: {}", parts[1]);
                    continue;
                }
                match settings.save() {
                    Ok(path) => println!("Saved settings to {}", path.display()),
                    Err(e) => println!("Error saving settings: {}", e),
                }
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for available commands.", command);
            }
        }
    }
}

/// Parse command line input, respecting quoted strings
fn parse_command_line(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn print_help() {
    println!("Available commands:");
    println!("  open <path>                    - Open a disk image (merges Side_A/Side_B pairs)");
    println!("  info                           - Show disk information");
    println!("  tracks                         - List all tracks");
    println!("  cat, dir                       - List files on the TR-DOS disk");
    println!("  list <filename>                - List a BASIC program");
    println!("  read-sector <s> <t> <id>       - Read and display a sector");
    println!("  boot                           - Add a boot loader if the disk lacks one");
    println!("  save [path]                    - Save image (to the opened file by default)");
    println!("  settings                       - Show settings");
    println!("  set <name> <on|off>            - Change and save a setting");
    println!("  help                           - Show this help");
    println!("  quit, exit                     - Exit");
}

fn print_info(image: &DiskImage) {
    if let Some(filename) = image.filename() {
        println!("Filename: {}", filename);
    }
    println!("Format: {}", image.format().name());
    println!("Sides: {}", image.spec().num_sides);
    println!("Tracks per side: {}", image.spec().num_tracks);
    println!("Total capacity: {} KB", image.spec().total_capacity_kb());
    println!("Write protected: {}", if image.is_write_protected() { "Yes" } else { "No" });
    println!("Changed: {}", if image.is_changed() { "Yes" } else { "No" });

    match TrdosFileSystem::new(image) {
        Ok(fs) => {
            let info = fs.info();
            println!("\nTR-DOS label: {}", info.label);
            println!("Disk type: {}", info.disk_type_name());
            println!("Files: {} ({} deleted)", info.file_count, info.deleted_files);
            println!("Free: {} sectors ({} KB)", info.free_sectors, info.free_bytes() / 1024);
        }
        Err(_) => println!("\nNo TR-DOS filesystem"),
    }
}

fn list_tracks(image: &DiskImage) {
    for (side_idx, disk) in image.disks().iter().enumerate() {
        println!("\nSide {}:", side_idx);
        println!("{:<6} {:<8} {:<10} {}", "Track", "Sectors", "Data Size", "IDs");
        println!("{}", "-".repeat(60));

        for track in disk.tracks() {
            let ids: Vec<String> = track.sector_ids().iter().map(|id| id.to_string()).collect();
            println!(
                "{:<6} {:<8} {:<10} {}",
                track.track_number,
                track.sector_count(),
                track.total_data_size(),
                if track.is_empty() { "Unformatted".to_string() } else { ids.join(",") }
            );
        }
    }
}

fn list_files(image: &DiskImage) {
    let fs = match TrdosFileSystem::new(image) {
        Ok(fs) => fs,
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    };

    match fs.read_dir() {
        Ok(entries) if entries.is_empty() => println!("No files found."),
        Ok(entries) => {
            println!(
                "{:<12} {:>6} {:>6} {:>5} {:>5} {:>7} {:>3}",
                "Name", "Param1", "Param2", "Secs", "Trk:S", "Size", "Del"
            );
            println!("{}", "-".repeat(52));
            for entry in entries {
                println!(
                    "{:<12} {:>6} {:>6} {:>5} {:>2}:{:<2} {:>7} {:>3}",
                    entry.display_name(),
                    entry.param1,
                    entry.param2,
                    entry.length_sectors,
                    entry.start_track,
                    entry.start_sector,
                    entry.byte_length(),
                    if entry.is_deleted() { "Yes" } else { "" }
                );
            }
            let info = fs.info();
            println!("\n{} files, {} sectors free", info.file_count, info.free_sectors);
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn list_program(image: &DiskImage, name: &str) {
    let fs = match TrdosFileSystem::new(image) {
        Ok(fs) => fs,
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    };

    let result = fs.find_file(name).and_then(|entry| {
        let data = fs.read_file(&entry)?;
        Ok((entry, data))
    });

    match result {
        Ok((entry, data)) if entry.is_basic() => print!("{}", list_basic(&data)),
        Ok((entry, data)) => {
            println!("{} is not a BASIC program ({} bytes):", entry.display_name(), data.len());
            print_hex_dump(&data, 256);
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn print_settings(settings: &Settings) {
    let on_off = |v: bool| if v { "on" } else { "off" };
    println!("autoLoad:     {}", on_off(settings.auto_load));
    println!("diskAskMerge: {}", on_off(settings.disk_ask_merge));
    println!("diskTryMerge: {}", on_off(settings.disk_try_merge));
    if let Some(path) = Settings::default_path() {
        println!("File: {}", path.display());
    }
}

fn print_hex_dump(data: &[u8], max_bytes: usize) {
    let len = data.len().min(max_bytes);

    for (i, chunk) in data[..len].chunks(16).enumerate() {
        print!("{:04X}: ", i * 16);

        for (j, byte) in chunk.iter().enumerate() {
            print!("{:02X} ", byte);
            if j == 7 {
                print!(" ");
            }
        }

        // Pad a short last line
        for j in chunk.len()..16 {
            print!("   ");
            if j == 7 {
                print!(" ");
            }
        }

        print!(" |");
        for byte in chunk {
            let c = if (32..127).contains(byte) { *byte as char } else { '.' };
            print!("{}", c);
        }
        println!("|");
    }

    if data.len() > max_bytes {
        println!("... ({} more bytes)", data.len() - max_bytes);
    }
}

fn parse_hex_or_dec(s: &str) -> Option<u8> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}
