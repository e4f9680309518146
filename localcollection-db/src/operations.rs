//! Write operations for sources, directories, files and tags.
//!
//! These run as single autocommit statements. Multi-statement mutations
//! (chunked deletes, global tag replacement) are composed by the store
//! inside a [`TransactionScope`](crate::TransactionScope).

use localcollection_core::{FileMeta, Source, TrackTagEdge, normalize_name};
use rusqlite::{Connection, params, params_from_iter};

use crate::batch::placeholders;
use crate::error::{OperationContext, StoreError};
use crate::interner;

/// User id that marks a global, non-personal tag.
pub const GLOBAL_USER: u32 = 0;

/// Weight given to a tag a user applied personally.
pub const USER_TAG_WEIGHT: i32 = 100;

// ── Sources & scan configuration ────────────────────────────────────────────

/// Register a new storage volume, initially available.
///
/// A volume that is already registered fails with
/// [`StoreError::ConstraintViolation`].
pub fn add_source(conn: &Connection, volume: &str) -> Result<Source, StoreError> {
    conn.execute(
        "INSERT INTO sources (volume, available) VALUES (?1, 1)",
        params![volume],
    )
    .during("add_source")?;
    Ok(Source {
        id: conn.last_insert_rowid(),
        volume: volume.to_string(),
        available: true,
    })
}

/// Mark a source mounted or unmounted.
pub fn set_source_availability(
    conn: &Connection,
    source_id: i64,
    available: bool,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE sources SET available = ?1 WHERE id = ?2",
        params![available, source_id],
    )
    .during("set_source_availability")?;
    Ok(())
}

/// Add a scan root on a source. Returns the new start directory id.
pub fn add_start_directory(
    conn: &Connection,
    source_id: i64,
    path: &str,
) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO startDirs (path, source) VALUES (?1, ?2)",
        params![path, source_id],
    )
    .during("add_start_directory")?;
    Ok(conn.last_insert_rowid())
}

/// Exclude `path` from scanning below a start directory.
pub fn add_exclusion(
    conn: &Connection,
    start_dir_id: i64,
    path: &str,
    subdirs: bool,
) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO exclusions (path, startDir, subDirs) VALUES (?1, ?2, ?3)",
        params![path, start_dir_id, subdirs],
    )
    .during("add_exclusion")?;
    Ok(conn.last_insert_rowid())
}

// ── Directories ─────────────────────────────────────────────────────────────

/// Record a scanned directory on a source. Returns the new directory id.
pub fn add_directory(conn: &Connection, source_id: i64, path: &str) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO directories (source, path) VALUES (?1, ?2)",
        params![source_id, path],
    )
    .during("add_directory")?;
    Ok(conn.last_insert_rowid())
}

/// Delete a directory row. Files in it are removed separately by the scanner.
pub fn remove_directory(conn: &Connection, directory_id: i64) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM directories WHERE id = ?1",
        params![directory_id],
    )
    .during("remove_directory")?;
    Ok(())
}

// ── Files ───────────────────────────────────────────────────────────────────

/// Insert a scanned file. The artist is interned first so the file never
/// points at a missing artist row. Returns the new file id.
pub fn add_file(
    conn: &Connection,
    directory_id: i64,
    filename: &str,
    last_modified: i64,
    meta: &FileMeta,
) -> Result<i64, StoreError> {
    let artist_id = interner::intern_artist(conn, &meta.artist)?;
    conn.execute(
        "INSERT INTO files (directory, filename, modification_date, lowercase_title,
             artist, album, kbps, duration)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            directory_id,
            filename,
            last_modified,
            normalize_name(&meta.title),
            artist_id,
            meta.album,
            meta.kbps,
            meta.duration,
        ],
    )
    .during("add_file")?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite a rescanned file's metadata. Tags are left untouched.
///
/// Returns `false` if no file has this id.
pub fn update_file(
    conn: &Connection,
    file_id: i64,
    last_modified: i64,
    meta: &FileMeta,
) -> Result<bool, StoreError> {
    let artist_id = interner::intern_artist(conn, &meta.artist)?;
    let changed = conn
        .execute(
            "UPDATE files SET
                 modification_date = ?2,
                 lowercase_title = ?3,
                 artist = ?4,
                 album = ?5,
                 kbps = ?6,
                 duration = ?7
             WHERE id = ?1",
            params![
                file_id,
                last_modified,
                normalize_name(&meta.title),
                artist_id,
                meta.album,
                meta.kbps,
                meta.duration,
            ],
        )
        .during("update_file")?;
    Ok(changed > 0)
}

/// Store the fingerprint id computed for a file.
pub fn set_fingerprint(
    conn: &Connection,
    file_id: i64,
    fingerprint_id: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE files SET lastfm_fpid = ?2 WHERE id = ?1",
        params![file_id, fingerprint_id],
    )
    .during("set_fingerprint")?;
    Ok(())
}

// ── Tags ────────────────────────────────────────────────────────────────────

/// Delete one owner's tags from every file by an artist.
///
/// `user_id == GLOBAL_USER` deletes only global tags; any other id deletes
/// only that user's personal tags.
pub fn delete_track_tags_for_artist(
    conn: &Connection,
    artist_id: i64,
    user_id: u32,
) -> Result<usize, StoreError> {
    conn.execute(
        "DELETE FROM tracktags
         WHERE user_id = ?2
           AND file IN (SELECT id FROM files WHERE artist = ?1)",
        params![artist_id, user_id],
    )
    .during("delete_track_tags_for_artist")
}

/// Tag every file by an artist. Returns the number of edges written.
pub fn insert_track_tag(
    conn: &Connection,
    artist_id: i64,
    tag_id: i64,
    user_id: u32,
    weight: i32,
) -> Result<usize, StoreError> {
    conn.prepare_cached(
        "INSERT INTO tracktags (file, tag, weight, user_id)
         SELECT id, ?2, ?3, ?4 FROM files WHERE artist = ?1",
    )
    .during("insert_track_tag")?
    .execute(params![artist_id, tag_id, weight, user_id])
    .during("insert_track_tag")
}

/// Apply a global tag with `weight` to every file by an artist.
pub fn insert_global_artist_tag(
    conn: &Connection,
    artist_id: i64,
    tag_id: i64,
    weight: i32,
) -> Result<usize, StoreError> {
    insert_track_tag(conn, artist_id, tag_id, GLOBAL_USER, weight)
}

/// Apply a user's personal tag to every file by an artist, at full weight.
pub fn insert_user_artist_tag(
    conn: &Connection,
    artist_id: i64,
    tag_id: i64,
    user_id: u32,
) -> Result<usize, StoreError> {
    insert_track_tag(conn, artist_id, tag_id, user_id, USER_TAG_WEIGHT)
}

/// Insert individual global (file, tag, weight) edges.
pub fn insert_track_tags(conn: &Connection, edges: &[TrackTagEdge]) -> Result<(), StoreError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO tracktags (file, tag, weight, user_id) VALUES (?1, ?2, ?3, ?4)",
        )
        .during("insert_track_tags")?;
    for edge in edges {
        stmt.execute(params![edge.file_id, edge.tag_id, edge.weight, GLOBAL_USER])
            .during("insert_track_tags")?;
    }
    Ok(())
}

// ── Similar artists ─────────────────────────────────────────────────────────

/// Record that `artist_a` is similar to `artist_b`.
pub fn add_similar_artist(
    conn: &Connection,
    artist_a: i64,
    artist_b: i64,
    weight: i32,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO simartists (artist_a, artist_b, weight) VALUES (?1, ?2, ?3)",
        params![artist_a, artist_b, weight],
    )
    .during("add_similar_artist")?;
    Ok(())
}

// ── Chunk operations ────────────────────────────────────────────────────────
//
// One statement per chunk of ids, driven by `BatchExecutor`.

/// Delete a chunk of files along with their tag edges.
pub fn remove_files_chunk(conn: &Connection, file_ids: &[i64]) -> Result<(), StoreError> {
    let list = placeholders(file_ids.len());
    conn.prepare_cached(&format!("DELETE FROM files WHERE id IN ({list})"))
        .during("remove_files")?
        .execute(params_from_iter(file_ids))
        .during("remove_files")?;
    conn.prepare_cached(&format!("DELETE FROM tracktags WHERE file IN ({list})"))
        .during("remove_files")?
        .execute(params_from_iter(file_ids))
        .during("remove_files")?;
    Ok(())
}

/// Delete every tag edge on a chunk of files.
pub fn delete_track_tags_chunk(conn: &Connection, file_ids: &[i64]) -> Result<(), StoreError> {
    conn.prepare_cached(&format!(
        "DELETE FROM tracktags WHERE file IN ({})",
        placeholders(file_ids.len())
    ))
    .during("delete_track_tags")?
    .execute(params_from_iter(file_ids))
    .during("delete_track_tags")?;
    Ok(())
}

/// Stamp a chunk of files as tagged at `tag_time` (epoch seconds).
pub fn set_file_tag_time_chunk(
    conn: &Connection,
    file_ids: &[i64],
    tag_time: i64,
) -> Result<(), StoreError> {
    // ?1 is the timestamp; the anonymous ids number from 2
    conn.prepare_cached(&format!(
        "UPDATE files SET tag_time = ?1 WHERE id IN ({})",
        placeholders(file_ids.len())
    ))
    .during("set_file_tag_time")?
    .execute(params_from_iter(
        std::iter::once(&tag_time).chain(file_ids.iter()),
    ))
    .during("set_file_tag_time")?;
    Ok(())
}
