//! Read queries for the collection database.
//!
//! Fuzzy filters call the `levenshtein(a, b)` SQL function registered by
//! [`register_similarity`], so matching runs row by row inside SQLite.

use std::sync::Arc;

use localcollection_core::{
    ArtistTags, Availability, Exclusion, FileEntry, FileResult, FileToTag, Match, Similarity,
    Source,
};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, named_params, params};

use crate::error::{OperationContext, StoreError};

/// Name of the similarity function inside SQL.
pub const SIMILARITY_FUNCTION: &str = "levenshtein";

/// Register `similarity` as the SQL function `levenshtein(a, b)`.
///
/// NULL arguments score as empty strings.
pub fn register_similarity(
    conn: &Connection,
    similarity: Arc<dyn Similarity>,
) -> Result<(), StoreError> {
    conn.create_scalar_function(
        SIMILARITY_FUNCTION,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |ctx| {
            let a: Option<String> = ctx.get(0)?;
            let b: Option<String> = ctx.get(1)?;
            Ok(similarity.score(
                a.as_deref().unwrap_or_default(),
                b.as_deref().unwrap_or_default(),
            ))
        },
    )
    .during("register_similarity")
}

// ── Fuzzy resolution ────────────────────────────────────────────────────────

/// Find playable files matching an already-normalized artist and title.
///
/// An artist matches when its similarity to `artist` is strictly greater
/// than `artist_threshold`; a file's title likewise against
/// `title_threshold`. Files on unavailable sources are never returned.
/// Results are unordered.
pub fn resolve(
    conn: &Connection,
    artist: &str,
    title: &str,
    artist_threshold: f64,
    title_threshold: f64,
) -> Result<Vec<Match>, StoreError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT a.lowercase_name, f.album, f.lowercase_title,
                    levenshtein(a.lowercase_name, :artist) AS aq,
                    levenshtein(f.lowercase_title, :title) AS tq,
                    f.filename, f.kbps, f.duration, d.path, s.volume
             FROM files AS f
             INNER JOIN artists AS a ON f.artist = a.id
             INNER JOIN directories AS d ON f.directory = d.id
             INNER JOIN sources AS s ON d.source = s.id
             WHERE s.available = 1
               AND a.id IN (
                   SELECT id FROM artists
                   WHERE levenshtein(lowercase_name, :artist) > :artist_threshold)
               AND levenshtein(f.lowercase_title, :title) > :title_threshold",
        )
        .during("resolve")?;
    let rows = stmt
        .query_map(
            named_params! {
                ":artist": artist,
                ":title": title,
                ":artist_threshold": artist_threshold,
                ":title_threshold": title_threshold,
            },
            |row| {
                Ok(Match {
                    artist: row.get(0)?,
                    album: row.get(1)?,
                    title: row.get(2)?,
                    artist_quality: row.get(3)?,
                    title_quality: row.get(4)?,
                    filename: row.get(5)?,
                    kbps: row.get::<_, Option<u32>>(6)?.unwrap_or(0),
                    duration: row.get::<_, Option<u32>>(7)?.unwrap_or(0),
                    path: row.get(8)?,
                    volume: row.get(9)?,
                })
            },
        )
        .during("resolve")?;
    rows.collect::<rusqlite::Result<Vec<_>>>().during("resolve")
}

/// Files by any artist whose name fuzzily matches `artist` (normalized).
pub fn files_by_artist(
    conn: &Connection,
    artist: &str,
    artist_threshold: f64,
    availability: Availability,
) -> Result<Vec<i64>, StoreError> {
    let sql = match availability {
        Availability::AllSources => {
            "SELECT id FROM files WHERE artist IN (
                 SELECT id FROM artists
                 WHERE levenshtein(lowercase_name, ?1) > ?2)"
        }
        Availability::AvailableSources => {
            "SELECT files.id FROM files
             INNER JOIN directories ON files.directory = directories.id
             INNER JOIN sources ON directories.source = sources.id
             WHERE files.artist IN (
                 SELECT id FROM artists
                 WHERE levenshtein(lowercase_name, ?1) > ?2)
               AND sources.available = 1"
        }
    };
    let mut stmt = conn.prepare_cached(sql).during("files_by_artist")?;
    let rows = stmt
        .query_map(params![artist, artist_threshold], |row| row.get(0))
        .during("files_by_artist")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .during("files_by_artist")
}

// ── File lookups ────────────────────────────────────────────────────────────

/// Files by exactly this artist id.
pub fn files_by_artist_id(
    conn: &Connection,
    artist_id: i64,
    availability: Availability,
) -> Result<Vec<i64>, StoreError> {
    let sql = match availability {
        Availability::AllSources => "SELECT id FROM files WHERE artist = ?1",
        Availability::AvailableSources => {
            "SELECT files.id FROM files
             INNER JOIN directories ON files.directory = directories.id
             INNER JOIN sources ON directories.source = sources.id
             WHERE files.artist = ?1 AND sources.available = 1"
        }
    };
    let mut stmt = conn.prepare_cached(sql).during("files_by_artist_id")?;
    let rows = stmt
        .query_map(params![artist_id], |row| row.get(0))
        .during("files_by_artist_id")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .during("files_by_artist_id")
}

/// `(file id, weight)` for every edge carrying this tag id.
pub fn files_with_tag(
    conn: &Connection,
    tag_id: i64,
    availability: Availability,
) -> Result<Vec<(i64, f32)>, StoreError> {
    let sql = match availability {
        Availability::AllSources => "SELECT file, weight FROM tracktags WHERE tag = ?1",
        Availability::AvailableSources => {
            "SELECT tracktags.file, tracktags.weight FROM tracktags
             INNER JOIN files ON tracktags.file = files.id
             INNER JOIN directories ON files.directory = directories.id
             INNER JOIN sources ON directories.source = sources.id
             WHERE tracktags.tag = ?1 AND sources.available = 1"
        }
    };
    let mut stmt = conn.prepare_cached(sql).during("files_with_tag")?;
    let rows = stmt
        .query_map(params![tag_id], |row| {
            Ok((row.get(0)?, row.get::<_, f64>(1)? as f32))
        })
        .during("files_with_tag")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .during("files_with_tag")
}

/// Everything needed to locate and display one file.
pub fn file_by_id(conn: &Connection, file_id: i64) -> Result<Option<FileResult>, StoreError> {
    conn.query_row(
        "SELECT files.album, artists.lowercase_name, files.lowercase_title,
                sources.volume, directories.path, files.filename, files.duration
         FROM files
         INNER JOIN artists ON files.artist = artists.id
         INNER JOIN directories ON files.directory = directories.id
         INNER JOIN sources ON directories.source = sources.id
         WHERE files.id = ?1",
        params![file_id],
        |row| {
            Ok(FileResult {
                album: row.get(0)?,
                artist: row.get(1)?,
                title: row.get(2)?,
                source_name: row.get(3)?,
                path: row.get(4)?,
                filename: row.get(5)?,
                duration: row.get::<_, Option<u32>>(6)?.unwrap_or(0),
            })
        },
    )
    .optional()
    .during("file_by_id")
}

/// Files recorded in one directory, for diffing against disk.
pub fn files_in_directory(
    conn: &Connection,
    directory_id: i64,
) -> Result<Vec<FileEntry>, StoreError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, filename, modification_date FROM files
             WHERE directory = ?1 ORDER BY id",
        )
        .during("files_in_directory")?;
    let rows = stmt
        .query_map(params![directory_id], |row| {
            Ok(FileEntry {
                id: row.get(0)?,
                filename: row.get(1)?,
                modified: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
            })
        })
        .during("files_in_directory")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .during("files_in_directory")
}

/// The stored fingerprint id for a file, if any.
pub fn fingerprint(conn: &Connection, file_id: i64) -> Result<Option<i64>, StoreError> {
    let fpid: Option<Option<i64>> = conn
        .query_row(
            "SELECT lastfm_fpid FROM files WHERE id = ?1",
            params![file_id],
            |row| row.get(0),
        )
        .optional()
        .during("fingerprint")?;
    Ok(fpid.flatten())
}

/// Files never tagged, or last tagged before `cutoff` (epoch seconds).
pub fn files_to_tag(conn: &Connection, cutoff: i64) -> Result<Vec<FileToTag>, StoreError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT files.id, artists.lowercase_name, files.album, files.lowercase_title
             FROM files
             INNER JOIN artists ON artists.id = files.artist
             WHERE files.tag_time IS NULL OR files.tag_time < ?1
             ORDER BY files.id",
        )
        .during("files_to_tag")?;
    let rows = stmt
        .query_map(params![cutoff], |row| {
            Ok(FileToTag {
                file_id: row.get(0)?,
                artist: row.get(1)?,
                album: row.get(2)?,
                title: row.get(3)?,
            })
        })
        .during("files_to_tag")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .during("files_to_tag")
}

// ── Tag aggregation ─────────────────────────────────────────────────────────

/// Average tag weights per artist, across all of the artist's files.
///
/// One query ordered by artist then tag, folded in a single pass: a new
/// entry starts whenever the artist id changes.
pub fn all_tags(conn: &Connection) -> Result<Vec<ArtistTags>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT files.artist, tracktags.tag, AVG(tracktags.weight)
             FROM tracktags
             INNER JOIN files ON tracktags.file = files.id
             GROUP BY files.artist, tracktags.tag
             ORDER BY files.artist, tracktags.tag",
        )
        .during("all_tags")?;
    let mut rows = stmt.query([]).during("all_tags")?;

    let mut result = Vec::new();
    let mut current: Option<ArtistTags> = None;
    while let Some(row) = rows.next().during("all_tags")? {
        let artist_id: i64 = row.get(0).during("all_tags")?;
        let tag_id: i64 = row.get(1).during("all_tags")?;
        let weight = (row.get::<_, f64>(2).during("all_tags")? / 100.0) as f32;

        match current.as_mut() {
            Some(entry) if entry.artist_id == artist_id => entry.tags.push((tag_id, weight)),
            _ => {
                result.extend(current.take());
                current = Some(ArtistTags {
                    artist_id,
                    tags: vec![(tag_id, weight)],
                });
            }
        }
    }
    result.extend(current);
    Ok(result)
}

// ── Sources & scan configuration ────────────────────────────────────────────

/// List every known source.
pub fn all_sources(conn: &Connection) -> Result<Vec<Source>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT id, volume, available FROM sources ORDER BY id")
        .during("all_sources")?;
    let rows = stmt.query_map([], row_to_source).during("all_sources")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .during("all_sources")
}

/// Look a source up by its volume string.
pub fn find_source(conn: &Connection, volume: &str) -> Result<Option<Source>, StoreError> {
    conn.query_row(
        "SELECT id, volume, available FROM sources WHERE volume = ?1",
        params![volume],
        row_to_source,
    )
    .optional()
    .during("find_source")
}

/// Scan roots configured on a source.
pub fn start_directories(conn: &Connection, source_id: i64) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT path FROM startDirs WHERE source = ?1 ORDER BY id")
        .during("start_directories")?;
    let rows = stmt
        .query_map(params![source_id], |row| row.get(0))
        .during("start_directories")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .during("start_directories")
}

/// Exclusions under any start directory of a source.
pub fn excluded_directories(
    conn: &Connection,
    source_id: i64,
) -> Result<Vec<Exclusion>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT exclusions.path, exclusions.subDirs
             FROM exclusions
             INNER JOIN startDirs ON exclusions.startDir = startDirs.id
             WHERE startDirs.source = ?1
             ORDER BY exclusions.id",
        )
        .during("excluded_directories")?;
    let rows = stmt
        .query_map(params![source_id], |row| {
            Ok(Exclusion {
                path: row.get(0)?,
                subdirs: row.get::<_, Option<bool>>(1)?.unwrap_or(true),
            })
        })
        .during("excluded_directories")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .during("excluded_directories")
}

/// Id of the directory at `path` on a source, if recorded.
pub fn directory_id(
    conn: &Connection,
    source_id: i64,
    path: &str,
) -> Result<Option<i64>, StoreError> {
    conn.query_row(
        "SELECT id FROM directories WHERE path = ?1 AND source = ?2",
        params![path, source_id],
        |row| row.get(0),
    )
    .optional()
    .during("directory_id")
}

// ── Similar artists ─────────────────────────────────────────────────────────

/// `(artist_b, weight)` edges out of an artist, heaviest first.
pub fn similar_artists(conn: &Connection, artist_id: i64) -> Result<Vec<(i64, i64)>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT artist_b, weight FROM simartists
             WHERE artist_a = ?1 ORDER BY weight DESC, artist_b",
        )
        .during("similar_artists")?;
    let rows = stmt
        .query_map(params![artist_id], |row| {
            Ok((row.get(0)?, row.get::<_, Option<i64>>(1)?.unwrap_or(0)))
        })
        .during("similar_artists")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .during("similar_artists")
}

// ── Statistics ──────────────────────────────────────────────────────────────

/// Row counts across the collection.
pub fn collection_stats(conn: &Connection) -> Result<CollectionStats, StoreError> {
    let count = |sql: &str| -> Result<i64, StoreError> {
        conn.query_row(sql, [], |r| r.get(0))
            .during("collection_stats")
    };

    Ok(CollectionStats {
        sources: count("SELECT COUNT(*) FROM sources")?,
        available_sources: count("SELECT COUNT(*) FROM sources WHERE available = 1")?,
        directories: count("SELECT COUNT(*) FROM directories")?,
        files: count("SELECT COUNT(*) FROM files")?,
        artists: count("SELECT COUNT(*) FROM artists")?,
        tags: count("SELECT COUNT(*) FROM tags")?,
        track_tags: count("SELECT COUNT(*) FROM tracktags")?,
        similar_artists: count("SELECT COUNT(*) FROM simartists")?,
    })
}

/// Summary statistics for the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub sources: i64,
    pub available_sources: i64,
    pub directories: i64,
    pub files: i64,
    pub artists: i64,
    pub tags: i64,
    pub track_tags: i64,
    pub similar_artists: i64,
}

// ── Row Mapping Helpers ─────────────────────────────────────────────────────

fn row_to_source(row: &rusqlite::Row<'_>) -> rusqlite::Result<Source> {
    Ok(Source {
        id: row.get(0)?,
        volume: row.get(1)?,
        available: row.get::<_, i64>(2)? != 0,
    })
}
