//! Persisted collection settings.
//!
//! Settings live in `~/.config/localcollection/settings.toml` under a
//! `[collection]` table. Every key is optional; missing keys take the
//! reference defaults.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Similarity an artist name must exceed to count as a match.
pub const DEFAULT_ARTIST_THRESHOLD: f64 = 0.7;
/// Similarity a title must exceed to count as a match.
pub const DEFAULT_TITLE_THRESHOLD: f64 = 0.7;
/// Ids per statement for batched mutations.
pub const DEFAULT_CHUNK_SIZE: usize = 100;
/// File name of the collection database inside the data directory.
pub const DATABASE_FILE_NAME: &str = "LocalCollection.db";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Tunables for the collection store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    /// Explicit database location. `None` means the default data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    pub artist_threshold: f64,
    pub title_threshold: f64,
    pub batch_chunk_size: usize,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            artist_threshold: DEFAULT_ARTIST_THRESHOLD,
            title_threshold: DEFAULT_TITLE_THRESHOLD,
            batch_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    collection: CollectionSettings,
}

impl CollectionSettings {
    /// Parse settings from the contents of a settings file.
    pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
        let file: SettingsFile = toml::from_str(contents)?;
        Ok(file.collection)
    }

    /// Serialize as a full settings file with a `[collection]` table.
    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        let file = SettingsFile {
            collection: self.clone(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Resolve where the database lives using a priority chain:
    ///
    /// 1. Explicit override (if `Some`)
    /// 2. `database_path` from these settings
    /// 3. `<data_dir>/localcollection/LocalCollection.db`
    pub fn resolve_database_path(&self, override_path: Option<PathBuf>) -> PathBuf {
        override_path
            .or_else(|| self.database_path.clone())
            .unwrap_or_else(default_database_path)
    }
}

/// Canonical path to the settings file.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("localcollection").join("settings.toml")
}

/// Default database location in the platform data directory.
pub fn default_database_path() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("localcollection").join(DATABASE_FILE_NAME)
}

/// Load settings from the canonical settings file.
pub fn load_settings() -> Result<CollectionSettings, SettingsError> {
    load_settings_from(&settings_path())
}

/// Load settings from `path`. A missing file yields the defaults.
pub fn load_settings_from(path: &Path) -> Result<CollectionSettings, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => CollectionSettings::from_toml_str(&contents),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("No settings at {}, using defaults", path.display());
            Ok(CollectionSettings::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Save settings to `path`. Writes atomically through a temp file.
pub fn save_settings_to(path: &Path, settings: &CollectionSettings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let serialized = settings.to_toml_string()?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, serialized)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Save settings to the canonical settings file.
pub fn save_settings(settings: &CollectionSettings) -> Result<(), SettingsError> {
    save_settings_to(&settings_path(), settings)
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
