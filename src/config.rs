/// User settings consumed by the disk manager
///
/// Stored as JSON in `<config dir>/trdmanager/settings.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory name under the platform configuration directory
const CONFIG_DIR_NAME: &str = "trdmanager";

/// Settings file name
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Disk handling preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Add a boot loader to TR-DOS disks when they are opened
    pub auto_load: bool,
    /// Ask before merging the two sides of a split disk
    pub disk_ask_merge: bool,
    /// Look for the other side of a split disk when opening
    pub disk_try_merge: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_load: true,
            disk_ask_merge: false,
            disk_try_merge: true,
        }
    }
}

impl Settings {
    /// Default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Load settings from the default location
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from a file
    ///
    /// A missing file gives the defaults; an unreadable or malformed one is
    /// reported and also gives the defaults.
    pub fn load_from(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                log::warn!("cannot read settings {}: {}", path.display(), e);
                return Self::default();
            }
        };

        serde_json::from_str(&text).unwrap_or_else(|e| {
            log::warn!("ignoring malformed settings {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Save settings to the default location
    pub fn save(&self) -> std::io::Result<PathBuf> {
        let path = Self::default_path().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no configuration directory")
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save settings to a file, creating its directory
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, text)
    }

    /// Change a setting by its name
    ///
    /// Accepts the JSON key or the snake_case field name. Returns `false`
    /// for unknown names.
    pub fn set(&mut self, key: &str, value: bool) -> bool {
        match key {
            "autoLoad" | "auto_load" => self.auto_load = value,
            "diskAskMerge" | "disk_ask_merge" => self.disk_ask_merge = value,
            "diskTryMerge" | "disk_try_merge" => self.disk_try_merge = value,
            _ => return false,
        }
        true
    }
}
