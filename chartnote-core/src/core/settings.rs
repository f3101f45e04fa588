//! Application settings persistence for Chartnote.
//!
//! Stores user preferences (workspace directory, page size limit, default
//! panel split) in a JSON file at an OS-appropriate location.

use crate::core::ui_state::DEFAULT_PANEL_SIZES;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Largest page body accepted by default: 1 MiB.
pub const DEFAULT_MAX_PAGE_BYTES: usize = 1024 * 1024;

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Directory where new workspaces are created and listed from.
    pub workspace_directory: String,
    /// Page size limit enforced on write-back; `None` disables it.
    pub max_page_bytes: Option<usize>,
    /// Split used before the user has moved the splitter.
    pub default_panel_sizes: (i32, i32),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace_directory: default_workspace_directory()
                .to_string_lossy()
                .to_string(),
            max_page_bytes: Some(DEFAULT_MAX_PAGE_BYTES),
            default_panel_sizes: DEFAULT_PANEL_SIZES,
        }
    }
}

/// Extension of workspace database files.
pub const WORKSPACE_EXTENSION: &str = "chartnote";

impl Settings {
    /// Path of the workspace file called `name` inside [`workspace_directory`](Self::workspace_directory).
    pub fn workspace_path(&self, name: &str) -> PathBuf {
        Path::new(&self.workspace_directory).join(format!("{name}.{WORKSPACE_EXTENSION}"))
    }
}

/// Returns the path to the settings JSON file.
///
/// - macOS / Linux: `~/.config/chartnote/settings.json`
/// - Windows: `%APPDATA%/Chartnote/settings.json`
pub fn settings_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("Chartnote").join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("chartnote").join("settings.json")
    }
}

/// Returns the default workspace directory: `~/Documents/Chartnote`.
pub fn default_workspace_directory() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Documents")
        })
        .join("Chartnote")
}

/// Loads settings from the default location.
pub fn load_settings() -> Settings {
    load_settings_from(settings_file_path())
}

/// Loads settings from `path`; returns defaults if the file is missing or corrupt.
pub fn load_settings_from<P: AsRef<Path>>(path: P) -> Settings {
    match fs::read_to_string(path.as_ref()) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable settings {}: {e}", path.as_ref().display());
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}

/// Saves settings to the default location.
///
/// # Errors
///
/// See [`save_settings_to`].
pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings_file_path(), settings)
}

/// Saves settings to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`crate::ChartnoteError::Io`] if the file cannot be written, or
/// [`crate::ChartnoteError::Json`] if serialization fails.
pub fn save_settings_to<P: AsRef<Path>>(path: P, settings: &Settings) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}
