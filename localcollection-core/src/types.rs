//! Data model types for the local collection.
//!
//! These mirror the persisted schema (sources, directories, files, tags)
//! plus the result shapes handed to the resolver, player and tagging
//! pipeline.

use serde::{Deserialize, Serialize};

// ── Sources & scan configuration ────────────────────────────────────────────

/// A storage volume that holds indexed files.
///
/// `volume` is a mount path on unix or a volume GUID path on windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub volume: String,
    pub available: bool,
}

/// A directory excluded from scanning below a start directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusion {
    pub path: String,
    /// Whether subdirectories of `path` are excluded too.
    pub subdirs: bool,
}

impl Exclusion {
    pub fn new(path: impl Into<String>, subdirs: bool) -> Self {
        Self {
            path: path.into(),
            subdirs,
        }
    }
}

/// Exclusions compare by path only, ignoring case.
impl PartialEq for Exclusion {
    fn eq(&self, other: &Self) -> bool {
        self.path.to_lowercase() == other.path.to_lowercase()
    }
}

impl Eq for Exclusion {}

/// Query parameter selecting whether files on unavailable sources count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    AllSources,
    AvailableSources,
}

// ── Files ───────────────────────────────────────────────────────────────────

/// Metadata extracted from an audio file by the scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub artist: String,
    pub album: String,
    pub title: String,
    /// Bitrate in kbps.
    pub kbps: u32,
    /// Duration in seconds.
    pub duration: u32,
}

/// A file row as the scanner sees it when diffing a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: i64,
    pub filename: String,
    /// Last modification time, seconds since the epoch.
    pub modified: i64,
}

/// A file looked up by id, with enough location data to play it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResult {
    pub album: String,
    pub artist: String,
    pub title: String,
    pub source_name: String,
    pub path: String,
    pub filename: String,
    pub duration: u32,
}

/// One hit from the fuzzy resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub artist_quality: f64,
    pub title_quality: f64,
    pub filename: String,
    pub kbps: u32,
    pub duration: u32,
    /// Directory path on the source volume.
    pub path: String,
    pub volume: String,
}

/// A file due for a tag refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileToTag {
    pub file_id: i64,
    pub artist: String,
    pub album: String,
    pub title: String,
}

// ── Tags ────────────────────────────────────────────────────────────────────

/// A tag name with a weight in `0..=100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedTag {
    pub name: String,
    pub weight: i32,
}

impl WeightedTag {
    pub fn new(name: impl Into<String>, weight: i32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// A single (file, tag) edge for bulk insertion. Always global (user 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackTagEdge {
    pub file_id: i64,
    pub tag_id: i64,
    pub weight: i32,
}

/// Averaged tag weights for one artist, as produced by `all_tags`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistTags {
    pub artist_id: i64,
    /// `(tag_id, average weight / 100)`, ordered by tag id.
    pub tags: Vec<(i64, f32)>,
}
