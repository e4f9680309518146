//! Data model, similarity scoring and settings for the local music
//! collection. Nothing in this crate touches SQLite.

pub mod settings;
pub mod similarity;
pub mod types;
pub mod util;

pub use settings::{
    CollectionSettings, DEFAULT_ARTIST_THRESHOLD, DEFAULT_CHUNK_SIZE, DEFAULT_TITLE_THRESHOLD,
    SettingsError, load_settings, save_settings,
};
pub use similarity::{NormalizedLevenshtein, Similarity, levenshtein_distance};
pub use types::*;
pub use util::normalize_name;
