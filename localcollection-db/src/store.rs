//! The collection store handle.
//!
//! [`LocalCollection`] owns one SQLite connection with the similarity
//! function registered and the schema checked. Thin wrappers forward to the
//! free functions in [`operations`](crate::operations) and
//! [`queries`](crate::queries); multi-statement mutations run inside a
//! [`TransactionScope`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use localcollection_core::util::SECONDS_PER_DAY;
use localcollection_core::{
    ArtistTags, Availability, CollectionSettings, Exclusion, FileEntry, FileMeta, FileResult,
    FileToTag, Match, NormalizedLevenshtein, Similarity, Source, TrackTagEdge, WeightedTag,
    normalize_name,
};
use rusqlite::Connection;

use crate::batch::BatchExecutor;
use crate::error::StoreError;
use crate::interner::{self, Creation, NameCache};
use crate::operations::{self, GLOBAL_USER};
use crate::queries::{self, CollectionStats, register_similarity};
use crate::schema;
use crate::transaction::TransactionScope;

// Serializes handle construction. Queries never take it.
static OPEN_LOCK: Mutex<()> = Mutex::new(());

/// A handle on one collection database.
///
/// `Send` but not `Sync`: share it across threads behind a mutex, or open
/// one handle per thread.
pub struct LocalCollection {
    conn: Connection,
    path: Option<PathBuf>,
    settings: CollectionSettings,
    batch: BatchExecutor,
}

impl LocalCollection {
    // ── Opening ─────────────────────────────────────────────────────────────

    /// Open or create the collection at `path`, scoring with
    /// [`NormalizedLevenshtein`].
    pub fn open(path: &Path, settings: CollectionSettings) -> Result<Self, StoreError> {
        Self::open_with_similarity(path, settings, Arc::new(NormalizedLevenshtein))
    }

    /// Open or create the collection at `path` with a custom similarity.
    ///
    /// A missing parent directory is created. Anything that keeps SQLite
    /// from opening or reading the file is [`StoreError::StorageUnavailable`].
    pub fn open_with_similarity(
        path: &Path,
        settings: CollectionSettings,
        similarity: Arc<dyn Similarity>,
    ) -> Result<Self, StoreError> {
        let _guard = OPEN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        log::debug!("Opening collection database at {}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::storage_unavailable(path, e))?;
        }
        let conn = Connection::open(path).map_err(|e| StoreError::storage_unavailable(path, e))?;
        // SQLite opens lazily; touch the header so a non-database file fails here
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| StoreError::storage_unavailable(path, e))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| StoreError::storage_unavailable(path, e))?;

        Self::prepare(conn, Some(path.to_path_buf()), settings, similarity)
    }

    /// Open an in-memory collection with the full schema. Useful for testing.
    pub fn open_memory(settings: CollectionSettings) -> Result<Self, StoreError> {
        let _guard = OPEN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::storage_unavailable(":memory:", e))?;
        Self::prepare(conn, None, settings, Arc::new(NormalizedLevenshtein))
    }

    /// Open the collection where `settings` says it lives, falling back to
    /// the platform data directory.
    pub fn open_default(settings: CollectionSettings) -> Result<Self, StoreError> {
        let path = settings.resolve_database_path(None);
        Self::open(&path, settings)
    }

    fn prepare(
        conn: Connection,
        path: Option<PathBuf>,
        settings: CollectionSettings,
        similarity: Arc<dyn Similarity>,
    ) -> Result<Self, StoreError> {
        register_similarity(&conn, similarity)?;
        schema::init_schema(&conn)?;
        let batch = BatchExecutor::new(settings.batch_chunk_size);
        Ok(Self {
            conn,
            path,
            settings,
            batch,
        })
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    /// The underlying connection, for callers composing their own queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Database file, or `None` for an in-memory collection.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        schema::schema_version(&self.conn)
    }

    /// Begin a write transaction on this collection's connection.
    pub fn transaction(&self) -> Result<TransactionScope<'_>, StoreError> {
        TransactionScope::begin(&self.conn)
    }

    // ── Resolution ──────────────────────────────────────────────────────────

    /// Find available files whose artist and title fuzzily match.
    ///
    /// `album` is not used for matching. A blank artist or title matches
    /// nothing and issues no query.
    pub fn resolve(
        &self,
        artist: &str,
        album: &str,
        title: &str,
    ) -> Result<Vec<Match>, StoreError> {
        let artist = normalize_name(artist);
        let title = normalize_name(title);
        if artist.is_empty() || title.is_empty() {
            return Ok(Vec::new());
        }
        log::debug!("Resolving '{artist}' - '{title}' (album '{album}')");
        queries::resolve(
            &self.conn,
            &artist,
            &title,
            self.settings.artist_threshold,
            self.settings.title_threshold,
        )
    }

    // ── Interning ───────────────────────────────────────────────────────────

    pub fn artist_id(&self, name: &str, creation: Creation) -> Result<Option<i64>, StoreError> {
        interner::artist_id(&self.conn, name, creation)
    }

    pub fn tag_id(&self, name: &str, creation: Creation) -> Result<Option<i64>, StoreError> {
        interner::tag_id(&self.conn, name, creation)
    }

    /// Resolve tag names to ids through a caller-owned cache.
    pub fn resolve_tags<S: AsRef<str>>(
        &self,
        names: &[S],
        cache: &mut NameCache,
    ) -> Result<Vec<i64>, StoreError> {
        interner::resolve_tags(&self.conn, names, cache)
    }

    // ── Sources & scan configuration ────────────────────────────────────────

    pub fn add_source(&self, volume: &str) -> Result<Source, StoreError> {
        operations::add_source(&self.conn, volume)
    }

    pub fn find_source(&self, volume: &str) -> Result<Option<Source>, StoreError> {
        queries::find_source(&self.conn, volume)
    }

    pub fn all_sources(&self) -> Result<Vec<Source>, StoreError> {
        queries::all_sources(&self.conn)
    }

    pub fn set_source_availability(
        &self,
        source_id: i64,
        available: bool,
    ) -> Result<(), StoreError> {
        operations::set_source_availability(&self.conn, source_id, available)
    }

    pub fn add_start_directory(&self, source_id: i64, path: &str) -> Result<i64, StoreError> {
        operations::add_start_directory(&self.conn, source_id, path)
    }

    pub fn start_directories(&self, source_id: i64) -> Result<Vec<String>, StoreError> {
        queries::start_directories(&self.conn, source_id)
    }

    pub fn add_exclusion(
        &self,
        start_dir_id: i64,
        path: &str,
        subdirs: bool,
    ) -> Result<i64, StoreError> {
        operations::add_exclusion(&self.conn, start_dir_id, path, subdirs)
    }

    pub fn excluded_directories(&self, source_id: i64) -> Result<Vec<Exclusion>, StoreError> {
        queries::excluded_directories(&self.conn, source_id)
    }

    // ── Directories & files ─────────────────────────────────────────────────

    pub fn add_directory(&self, source_id: i64, path: &str) -> Result<i64, StoreError> {
        operations::add_directory(&self.conn, source_id, path)
    }

    pub fn directory_id(&self, source_id: i64, path: &str) -> Result<Option<i64>, StoreError> {
        queries::directory_id(&self.conn, source_id, path)
    }

    pub fn remove_directory(&self, directory_id: i64) -> Result<(), StoreError> {
        operations::remove_directory(&self.conn, directory_id)
    }

    pub fn add_file(
        &self,
        directory_id: i64,
        filename: &str,
        last_modified: i64,
        meta: &FileMeta,
    ) -> Result<i64, StoreError> {
        operations::add_file(&self.conn, directory_id, filename, last_modified, meta)
    }

    pub fn update_file(
        &self,
        file_id: i64,
        last_modified: i64,
        meta: &FileMeta,
    ) -> Result<bool, StoreError> {
        operations::update_file(&self.conn, file_id, last_modified, meta)
    }

    pub fn files_in_directory(&self, directory_id: i64) -> Result<Vec<FileEntry>, StoreError> {
        queries::files_in_directory(&self.conn, directory_id)
    }

    /// Delete files and their tag edges, chunked, in one transaction.
    pub fn remove_files(&self, file_ids: &[i64]) -> Result<(), StoreError> {
        self.in_batches(file_ids, operations::remove_files_chunk)
    }

    pub fn file_by_id(&self, file_id: i64) -> Result<Option<FileResult>, StoreError> {
        queries::file_by_id(&self.conn, file_id)
    }

    pub fn set_fingerprint(&self, file_id: i64, fingerprint_id: i64) -> Result<(), StoreError> {
        operations::set_fingerprint(&self.conn, file_id, fingerprint_id)
    }

    pub fn fingerprint(&self, file_id: i64) -> Result<Option<i64>, StoreError> {
        queries::fingerprint(&self.conn, file_id)
    }

    // ── Tags ────────────────────────────────────────────────────────────────

    /// Replace an artist's global tags with `tags`, on every file by the
    /// artist, in one transaction.
    ///
    /// An artist with no files in the collection is a no-op.
    pub fn set_global_tags_for_artist(
        &self,
        artist: &str,
        tags: &[WeightedTag],
    ) -> Result<(), StoreError> {
        let Some(artist_id) = interner::artist_id(&self.conn, artist, Creation::LookupOnly)? else {
            log::debug!("No artist '{artist}' in collection, skipping {} tags", tags.len());
            return Ok(());
        };

        let tx = TransactionScope::begin(&self.conn)?;
        operations::delete_track_tags_for_artist(&tx, artist_id, GLOBAL_USER)?;
        let mut cache = NameCache::new();
        for tag in tags {
            let tag_id = interner::resolve_tag(&tx, &tag.name, &mut cache)?;
            operations::insert_global_artist_tag(&tx, artist_id, tag_id, tag.weight)?;
        }
        tx.commit()
    }

    /// Delete one owner's tags from an artist's files. `user_id` 0 means
    /// global tags only.
    pub fn delete_track_tags_for_artist(
        &self,
        artist_id: i64,
        user_id: u32,
    ) -> Result<usize, StoreError> {
        operations::delete_track_tags_for_artist(&self.conn, artist_id, user_id)
    }

    pub fn delete_global_track_tags_for_artist(&self, artist_id: i64) -> Result<usize, StoreError> {
        operations::delete_track_tags_for_artist(&self.conn, artist_id, GLOBAL_USER)
    }

    pub fn insert_global_artist_tag(
        &self,
        artist_id: i64,
        tag_id: i64,
        weight: i32,
    ) -> Result<usize, StoreError> {
        operations::insert_global_artist_tag(&self.conn, artist_id, tag_id, weight)
    }

    pub fn insert_user_artist_tag(
        &self,
        artist_id: i64,
        tag_id: i64,
        user_id: u32,
    ) -> Result<usize, StoreError> {
        operations::insert_user_artist_tag(&self.conn, artist_id, tag_id, user_id)
    }

    /// Insert global tag edges in one transaction.
    pub fn insert_track_tags(&self, edges: &[TrackTagEdge]) -> Result<(), StoreError> {
        if edges.is_empty() {
            return Ok(());
        }
        let tx = TransactionScope::begin(&self.conn)?;
        operations::insert_track_tags(&tx, edges)?;
        tx.commit()
    }

    /// Files carrying the tag `name`. An unknown tag yields nothing and is
    /// not created.
    pub fn files_with_tag(
        &self,
        name: &str,
        availability: Availability,
    ) -> Result<Vec<(i64, f32)>, StoreError> {
        match interner::tag_id(&self.conn, name, Creation::LookupOnly)? {
            Some(tag_id) => queries::files_with_tag(&self.conn, tag_id, availability),
            None => Ok(Vec::new()),
        }
    }

    /// Files by any artist fuzzily matching `artist`.
    pub fn files_by_artist(
        &self,
        artist: &str,
        availability: Availability,
    ) -> Result<Vec<i64>, StoreError> {
        let artist = normalize_name(artist);
        if artist.is_empty() {
            return Ok(Vec::new());
        }
        queries::files_by_artist(
            &self.conn,
            &artist,
            self.settings.artist_threshold,
            availability,
        )
    }

    pub fn files_by_artist_id(
        &self,
        artist_id: i64,
        availability: Availability,
    ) -> Result<Vec<i64>, StoreError> {
        queries::files_by_artist_id(&self.conn, artist_id, availability)
    }

    pub fn all_tags(&self) -> Result<Vec<ArtistTags>, StoreError> {
        queries::all_tags(&self.conn)
    }

    /// Files never tagged, or last tagged more than `max_age_days` ago.
    pub fn files_to_tag(&self, max_age_days: u32) -> Result<Vec<FileToTag>, StoreError> {
        let cutoff = Utc::now().timestamp() - i64::from(max_age_days) * SECONDS_PER_DAY;
        queries::files_to_tag(&self.conn, cutoff)
    }

    /// Stamp files as tagged now.
    pub fn set_file_tag_time(&self, file_ids: &[i64]) -> Result<(), StoreError> {
        let now = Utc::now().timestamp();
        self.in_batches(file_ids, |conn: &Connection, chunk: &[i64]| {
            operations::set_file_tag_time_chunk(conn, chunk, now)
        })
    }

    /// Delete every tag edge, global and personal, on these files.
    pub fn delete_track_tags(&self, file_ids: &[i64]) -> Result<(), StoreError> {
        self.in_batches(file_ids, operations::delete_track_tags_chunk)
    }

    // ── Similar artists ─────────────────────────────────────────────────────

    pub fn add_similar_artist(
        &self,
        artist_a: i64,
        artist_b: i64,
        weight: i32,
    ) -> Result<(), StoreError> {
        operations::add_similar_artist(&self.conn, artist_a, artist_b, weight)
    }

    pub fn similar_artists(&self, artist_id: i64) -> Result<Vec<(i64, i64)>, StoreError> {
        queries::similar_artists(&self.conn, artist_id)
    }

    // ── Statistics ──────────────────────────────────────────────────────────

    pub fn stats(&self) -> Result<CollectionStats, StoreError> {
        queries::collection_stats(&self.conn)
    }

    /// Run `op` over `ids` in chunks inside one transaction. Empty input
    /// touches nothing.
    fn in_batches<F>(&self, ids: &[i64], mut op: F) -> Result<(), StoreError>
    where
        F: FnMut(&Connection, &[i64]) -> Result<(), StoreError>,
    {
        if ids.is_empty() {
            return Ok(());
        }
        let tx = TransactionScope::begin(&self.conn)?;
        self.batch
            .run(ids, |chunk: &[i64]| -> Result<(), StoreError> {
                op(&tx, chunk)
            })?;
        tx.commit()
    }
}

impl std::fmt::Debug for LocalCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCollection")
            .field("path", &self.path)
            .field("settings", &self.settings)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}
