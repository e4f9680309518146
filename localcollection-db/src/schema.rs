//! SQLite schema creation and version checking.
//!
//! The schema version lives in the single-row `metadata` table. Upgrades are
//! destructive: an older database has every table dropped and the empty
//! schema recreated, so rescanning repopulates it. A newer database is
//! refused.

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};

use crate::error::{OperationContext, StoreError};
use crate::transaction::TransactionScope;

/// Current schema version. Bumping it wipes existing collections on open.
pub const CURRENT_VERSION: i64 = 3;

/// Every table the schema defines.
pub const TABLES: [&str; 10] = [
    "files",
    "artists",
    "simartists",
    "tags",
    "tracktags",
    "directories",
    "sources",
    "startDirs",
    "exclusions",
    "metadata",
];

/// Bring a freshly opened connection up to [`CURRENT_VERSION`].
///
/// Creates the schema in an empty database. A database holding tables but
/// no `metadata` is unversioned and is dropped and recreated, as is one with
/// an older version. A newer version fails with
/// [`StoreError::SchemaIncompatible`].
pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    if !table_exists(conn, "metadata")? {
        if user_tables(conn)?.is_empty() {
            create_schema(conn)?;
        } else {
            // Tables from before versioning can't be trusted
            log::info!("Collection has tables but no schema version, recreating empty schema");
            recreate_schema(conn)?;
        }
    }

    let version = schema_version(conn)?;
    if version < CURRENT_VERSION {
        log::info!(
            "Collection schema v{version} is older than v{CURRENT_VERSION}, recreating empty schema"
        );
        recreate_schema(conn)?;
    } else if version > CURRENT_VERSION {
        return Err(StoreError::SchemaIncompatible {
            expected: CURRENT_VERSION,
            found: version,
        });
    }
    Ok(())
}

/// Create all tables and indexes and seed the version row.
///
/// Idempotent: existing tables and an existing version row are left alone.
pub fn create_schema(conn: &Connection) -> Result<(), StoreError> {
    log::debug!("Creating collection schema v{CURRENT_VERSION}");
    let tx = TransactionScope::begin(conn)?;
    tx.execute_batch(SCHEMA_SQL).during("create_schema")?;
    tx.execute(
        "INSERT OR IGNORE INTO metadata (key, value) VALUES ('version', ?1)",
        [CURRENT_VERSION.to_string()],
    )
    .during("create_schema")?;
    tx.commit()
}

/// Read the stored schema version.
///
/// A missing row, a NULL, or a value that is not an integer is
/// [`StoreError::SchemaCorrupt`].
pub fn schema_version(conn: &Connection) -> Result<i64, StoreError> {
    let value: Option<Value> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .during("schema_version")?;

    match value {
        Some(Value::Integer(v)) => Ok(v),
        Some(Value::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| StoreError::schema_corrupt(format!("version '{s}' is not an integer"))),
        Some(other) => Err(StoreError::schema_corrupt(format!(
            "version has unexpected value {other:?}"
        ))),
        None => Err(StoreError::schema_corrupt("no version in metadata")),
    }
}

/// Whether a table with this name exists.
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool, StoreError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [name],
        |row| row.get(0),
    )
    .during("table_exists")
}

/// Names of all tables except SQLite's own `sqlite_*` bookkeeping tables.
pub fn user_tables(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND substr(name, 1, 7) != 'sqlite_'
             ORDER BY name",
        )
        .during("user_tables")?;
    let rows = stmt
        .query_map([], |row| row.get(0))
        .during("user_tables")?;
    rows.collect::<rusqlite::Result<Vec<String>>>()
        .during("user_tables")
}

/// Drop every user table and create the schema from scratch, atomically.
fn recreate_schema(conn: &Connection) -> Result<(), StoreError> {
    let tx = TransactionScope::begin(conn)?;

    for table in &user_tables(&tx)? {
        log::debug!("Dropping table {table}");
        tx.execute_batch(&format!("DROP TABLE \"{}\"", table.replace('"', "\"\"")))
            .during("recreate_schema")?;
    }

    tx.execute_batch(SCHEMA_SQL).during("recreate_schema")?;
    tx.execute(
        "INSERT INTO metadata (key, value) VALUES ('version', ?1)",
        [CURRENT_VERSION.to_string()],
    )
    .during("recreate_schema")?;
    tx.commit()
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id                INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    directory         INTEGER NOT NULL,
    filename          TEXT NOT NULL,
    modification_date INTEGER,
    lowercase_title   TEXT NOT NULL,
    artist            INTEGER,
    album             TEXT NOT NULL,
    kbps              INTEGER,
    duration          INTEGER,
    mbid              VARCHAR(36),
    puid              VARCHAR(36),
    lastfm_fpid       INTEGER,
    tag_time          INTEGER
);
CREATE INDEX IF NOT EXISTS files_directory_idx ON files (directory);
CREATE INDEX IF NOT EXISTS files_artist_idx ON files (artist);

CREATE TABLE IF NOT EXISTS artists (
    id                INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    lowercase_name    TEXT NOT NULL UNIQUE
);
CREATE INDEX IF NOT EXISTS artists_name_idx ON artists (lowercase_name);

-- artist_a has similar artist artist_b with weight
CREATE TABLE IF NOT EXISTS simartists (
    artist_a          INTEGER,
    artist_b          INTEGER,
    weight            INTEGER
);
CREATE INDEX IF NOT EXISTS simartists_artist_a_idx ON simartists (artist_a);

CREATE TABLE IF NOT EXISTS tags (
    id                INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    name              TEXT NOT NULL UNIQUE
);
CREATE INDEX IF NOT EXISTS tags_name_idx ON tags (name);

-- user_id 0 marks a global (downloaded) tag, anything else a personal one
CREATE TABLE IF NOT EXISTS tracktags (
    file              INTEGER NOT NULL,
    tag               INTEGER NOT NULL,
    weight            INTEGER NOT NULL CHECK (weight BETWEEN 0 AND 100),
    user_id           INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS tracktags_file_idx ON tracktags (file);

CREATE TABLE IF NOT EXISTS directories (
    id                INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    source            INTEGER,
    path              TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS directories_path_idx ON directories (path);

-- volume: "/" on unix, "\\?\Volume{...}\" on windows
CREATE TABLE IF NOT EXISTS sources (
    id                INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    volume            TEXT NOT NULL UNIQUE,
    available         INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS startDirs (
    id                INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    path              TEXT NOT NULL,
    source            INTEGER
);

CREATE TABLE IF NOT EXISTS exclusions (
    id                INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    path              TEXT NOT NULL,
    startDir          INTEGER,
    subDirs           INTEGER
);

CREATE TABLE IF NOT EXISTS metadata (
    key               TEXT NOT NULL UNIQUE,
    value             TEXT
);
"#;
