//! Unified path management for RagDesk files.
//!
//! This ensures consistency across all platforms (Linux, macOS, Windows).

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for RagDesk.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/ragdesk/                 # Config directory
/// └── config.toml                    # Client configuration
///
/// ~/.local/share/ragdesk/            # Data directory
/// └── store/                         # Key/value records
///     ├── ragdesk.conversations.json
///     └── ragdesk.chat_history.json  # legacy, migrated on first load
/// ```
pub struct RagDeskPaths;

impl RagDeskPaths {
    const APP_DIR: &'static str = "ragdesk";

    /// Returns the RagDesk configuration directory (e.g., `~/.config/ragdesk/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the RagDesk data directory (e.g., `~/.local/share/ragdesk/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(Self::APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory holding key/value records.
    ///
    /// `data_dir_override` comes from configuration and replaces the platform
    /// data directory when set.
    pub fn store_dir(data_dir_override: Option<&PathBuf>) -> Result<PathBuf, PathError> {
        let base = match data_dir_override {
            Some(dir) => dir.clone(),
            None => Self::data_dir()?,
        };
        Ok(base.join("store"))
    }
}
