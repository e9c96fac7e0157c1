//! User settings persistence.
//!
//! A single JSON record under the platform config directory, using the
//! camelCase field names the gateway ecosystem settled on. Loading never
//! fails hard: missing files, unreadable files, and malformed JSON all
//! degrade to defaults, and a partial record merges over the defaults
//! field by field.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

/// Composer input cap, matching the gateway's request limit.
pub const MAX_MESSAGE_LENGTH: usize = 32_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub temperature: f64,
    pub max_tokens: u32,
    pub streaming: bool,
    pub dark_mode: bool,
    pub auto_scroll: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            streaming: true,
            dark_mode: false,
            auto_scroll: true,
        }
    }
}

/// Errors that can occur while writing settings to disk. Load failures are
/// not errors; they resolve to defaults.
#[derive(Debug)]
pub enum SettingsError {
    Write {
        path: PathBuf,
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Write { path, source } => {
                write!(f, "failed to write settings at {}: {}", path.display(), source)
            }
        }
    }
}

impl StdError for SettingsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SettingsError::Write { source, .. } => Some(source.as_ref()),
        }
    }
}

/// Handle on the persisted settings record.
#[derive(Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn open() -> Self {
        Self {
            path: default_settings_path(),
        }
    }

    /// Store rooted at an explicit path. Used by tests and by anyone pointing
    /// the client at a sandboxed config dir.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Settings {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Settings::default();
            }
            Err(source) => {
                warn!(path = %self.path.display(), %source, "settings unreadable, using defaults");
                return Settings::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(source) => {
                warn!(path = %self.path.display(), %source, "settings malformed, using defaults");
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let write_err = |source: Box<dyn StdError + Send + Sync>| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = self.path.parent().filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(|e| write_err(Box::new(e)))?;
        }

        let contents =
            serde_json::to_string_pretty(settings).map_err(|e| write_err(Box::new(e)))?;

        // Write-then-rename so a crash mid-save never leaves a truncated
        // record behind.
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(|e| write_err(Box::new(e)))?;
        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| write_err(Box::new(e)))?;
        temp_file
            .as_file_mut()
            .sync_all()
            .map_err(|e| write_err(Box::new(e)))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| write_err(Box::new(e)))?;
        Ok(())
    }

    /// Clears the persisted record; the next `load` returns defaults.
    pub fn reset(&self) -> Result<(), SettingsError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SettingsError::Write {
                path: self.path.clone(),
                source: Box::new(source),
            }),
        }
    }
}

fn default_settings_path() -> PathBuf {
    let proj_dirs = ProjectDirs::from("org", "permacommons", "parley")
        .expect("Failed to determine config directory");
    proj_dirs.config_dir().join("settings.json")
}
