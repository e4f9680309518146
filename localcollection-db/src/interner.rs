//! Name → id interning for artists and tags.
//!
//! Names are normalized (trimmed, whitespace collapsed, lowercased) before
//! every lookup and insert, and this module is the only writer of the
//! `artists` and `tags` tables. Two writers racing to intern the same new
//! name hit the UNIQUE constraint and get
//! [`StoreError::ConstraintViolation`]; nothing here retries.

use std::collections::HashMap;

use localcollection_core::normalize_name;
use rusqlite::{Connection, OptionalExtension};

use crate::error::{OperationContext, StoreError};

/// What to do when a name has no id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creation {
    /// Insert the name and return the new id.
    Create,
    /// Return `None` and leave the table untouched.
    LookupOnly,
}

struct InternedTable {
    select: &'static str,
    insert: &'static str,
    operation: &'static str,
}

const ARTISTS: InternedTable = InternedTable {
    select: "SELECT id FROM artists WHERE lowercase_name = ?1",
    insert: "INSERT INTO artists (lowercase_name) VALUES (?1)",
    operation: "artist_id",
};

const TAGS: InternedTable = InternedTable {
    select: "SELECT id FROM tags WHERE name = ?1",
    insert: "INSERT INTO tags (name) VALUES (?1)",
    operation: "tag_id",
};

/// Resolve an artist name to its id.
pub fn artist_id(
    conn: &Connection,
    name: &str,
    creation: Creation,
) -> Result<Option<i64>, StoreError> {
    resolve(conn, &ARTISTS, name, creation)
}

/// Resolve an artist name, creating the artist if needed.
pub fn intern_artist(conn: &Connection, name: &str) -> Result<i64, StoreError> {
    intern(conn, &ARTISTS, &normalize_name(name))
}

/// Resolve a tag name to its id.
pub fn tag_id(
    conn: &Connection,
    name: &str,
    creation: Creation,
) -> Result<Option<i64>, StoreError> {
    resolve(conn, &TAGS, name, creation)
}

/// Resolve a tag name, creating the tag if needed.
pub fn intern_tag(conn: &Connection, name: &str) -> Result<i64, StoreError> {
    intern(conn, &TAGS, &normalize_name(name))
}

fn resolve(
    conn: &Connection,
    table: &InternedTable,
    name: &str,
    creation: Creation,
) -> Result<Option<i64>, StoreError> {
    let key = normalize_name(name);
    match creation {
        Creation::Create => intern(conn, table, &key).map(Some),
        Creation::LookupOnly => lookup(conn, table, &key),
    }
}

fn lookup(conn: &Connection, table: &InternedTable, key: &str) -> Result<Option<i64>, StoreError> {
    conn.prepare_cached(table.select)
        .during(table.operation)?
        .query_row([key], |row| row.get(0))
        .optional()
        .during(table.operation)
}

fn intern(conn: &Connection, table: &InternedTable, key: &str) -> Result<i64, StoreError> {
    if let Some(id) = lookup(conn, table, key)? {
        return Ok(id);
    }
    conn.prepare_cached(table.insert)
        .during(table.operation)?
        .execute([key])
        .during(table.operation)?;
    Ok(conn.last_insert_rowid())
}

// ── Batch cache ─────────────────────────────────────────────────────────────

/// Short-lived name → id cache for resolving many names in one batch.
///
/// Owned by the caller and dropped when the batch is done; never persisted.
/// Keys are normalized names, so `"Rock"` and `" rock"` share an entry.
#[derive(Debug, Default)]
pub struct NameCache {
    ids: HashMap<String, i64>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.ids.get(&normalize_name(name)).copied()
    }

    pub fn insert(&mut self, name: &str, id: i64) {
        self.ids.insert(normalize_name(name), id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Resolve one tag through `cache`, creating it in the database on a miss.
pub fn resolve_tag(
    conn: &Connection,
    name: &str,
    cache: &mut NameCache,
) -> Result<i64, StoreError> {
    let key = normalize_name(name);
    if let Some(&id) = cache.ids.get(&key) {
        return Ok(id);
    }
    let id = intern_tag(conn, &key)?;
    cache.ids.insert(key, id);
    Ok(id)
}

/// Resolve a list of tag names to ids, in order, creating missing tags.
pub fn resolve_tags<S: AsRef<str>>(
    conn: &Connection,
    names: &[S],
    cache: &mut NameCache,
) -> Result<Vec<i64>, StoreError> {
    names
        .iter()
        .map(|name| resolve_tag(conn, name.as_ref(), cache))
        .collect()
}
