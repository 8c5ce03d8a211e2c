//! Preferences file save/load operations

use super::EditorPreferences;
use directories::ProjectDirs;
use std::io;
use std::path::{Path, PathBuf};

const PREFERENCES_FILE: &str = "preferences.json";

/// Failure reading or writing the preferences file, with the file involved
#[derive(Debug)]
pub enum PreferencesError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    NoConfigDir,
}

impl PreferencesError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| PreferencesError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path) -> impl FnOnce(serde_json::Error) -> Self + '_ {
        move |source| PreferencesError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl std::fmt::Display for PreferencesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreferencesError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            PreferencesError::Json { path, source } => {
                write!(f, "{}: malformed preferences: {}", path.display(), source)
            }
            PreferencesError::NoConfigDir => write!(f, "no config directory on this platform"),
        }
    }
}

impl std::error::Error for PreferencesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PreferencesError::Io { source, .. } => Some(source),
            PreferencesError::Json { source, .. } => Some(source),
            PreferencesError::NoConfigDir => None,
        }
    }
}

impl EditorPreferences {
    /// Platform config directory for the editor
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "aiv_map_editor", "aiv_map_editor")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn preferences_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(PREFERENCES_FILE))
    }

    /// Load preferences from the config directory, falling back to defaults
    pub fn load() -> Self {
        let result = Self::preferences_path()
            .ok_or(PreferencesError::NoConfigDir)
            .and_then(|path| Self::load_from(&path));
        match result {
            Ok(preferences) => preferences,
            Err(e) => {
                bevy::log::warn!("Could not load preferences: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Load preferences from `path`. A missing file gives the defaults.
    pub fn load_from(path: &Path) -> Result<Self, PreferencesError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(PreferencesError::io(path))?;
        serde_json::from_str(&content).map_err(PreferencesError::json(path))
    }

    /// Save preferences to the config directory
    pub fn save(&self) -> Result<(), PreferencesError> {
        let path = Self::preferences_path().ok_or(PreferencesError::NoConfigDir)?;
        self.save_to(&path)?;
        bevy::log::info!("Saved preferences to {:?}", path);
        Ok(())
    }

    /// Save preferences to `path`, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<(), PreferencesError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(PreferencesError::io(dir))?;
        }

        let content = serde_json::to_string_pretty(self).map_err(PreferencesError::json(path))?;
        std::fs::write(path, content).map_err(PreferencesError::io(path))
    }
}
