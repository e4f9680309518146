//! SQLite persistence layer for the local music collection.
//!
//! Provides schema management, name interning, fuzzy track resolution and
//! the tag store, backed by SQLite (via rusqlite with the bundled and
//! functions features). Most callers only need [`LocalCollection`].

pub mod batch;
pub mod error;
pub mod interner;
pub mod operations;
pub mod queries;
pub mod schema;
pub mod store;
pub mod transaction;

pub use batch::{BatchExecutor, ChunkOperation};
pub use error::{OperationContext, StoreError};
pub use interner::{
    Creation, NameCache, artist_id, intern_artist, intern_tag, resolve_tag, resolve_tags, tag_id,
};
pub use operations::{GLOBAL_USER, USER_TAG_WEIGHT};
pub use queries::{CollectionStats, SIMILARITY_FUNCTION, register_similarity};
pub use schema::{CURRENT_VERSION, init_schema, schema_version};
pub use store::LocalCollection;
pub use transaction::TransactionScope;
