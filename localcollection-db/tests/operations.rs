use localcollection_core::{Availability, CollectionSettings, FileMeta, TrackTagEdge, WeightedTag};
use localcollection_db::*;

fn open_memory() -> LocalCollection {
    LocalCollection::open_memory(CollectionSettings::default()).unwrap()
}

fn meta(artist: &str, title: &str) -> FileMeta {
    FileMeta {
        artist: artist.to_string(),
        album: "Greatest Hits".to_string(),
        title: title.to_string(),
        kbps: 320,
        duration: 240,
    }
}

/// One available source with one directory. Returns the directory id.
fn setup_directory(store: &LocalCollection) -> i64 {
    let source = store.add_source("/").unwrap();
    store.add_directory(source.id, "/music").unwrap()
}

fn count(store: &LocalCollection, sql: &str) -> i64 {
    store.connection().query_row(sql, [], |row| row.get(0)).unwrap()
}

// ── Interner ────────────────────────────────────────────────────────────────

#[test]
fn lookup_only_miss_inserts_nothing() {
    let store = open_memory();
    assert_eq!(store.artist_id("Nobody", Creation::LookupOnly).unwrap(), None);
    assert_eq!(store.tag_id("nothing", Creation::LookupOnly).unwrap(), None);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM artists"), 0);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM tags"), 0);
}

#[test]
fn create_is_idempotent_and_normalizes() {
    let store = open_memory();
    let first = store.artist_id("Queen", Creation::Create).unwrap();
    let second = store.artist_id("  QUEEN ", Creation::Create).unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(store.artist_id("queen", Creation::LookupOnly).unwrap(), first);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM artists"), 1);

    let name: String = store
        .connection()
        .query_row("SELECT lowercase_name FROM artists", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "queen");
}

#[test]
fn artists_and_tags_are_separate_namespaces() {
    let store = open_memory();
    let artist = store.artist_id("Rock", Creation::Create).unwrap();
    let tag = store.tag_id("Rock", Creation::Create).unwrap();
    assert!(artist.is_some());
    assert!(tag.is_some());
    assert_eq!(store.tag_id("rock", Creation::LookupOnly).unwrap(), tag);
}

#[test]
fn resolve_tags_uses_cache() {
    let store = open_memory();
    let mut cache = NameCache::new();
    let ids = store
        .resolve_tags(&["Rock", "Pop", "rock"], &mut cache)
        .unwrap();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], ids[2]);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("ROCK"), Some(ids[0]));

    // A cached id is returned even after the row is gone
    store.connection().execute("DELETE FROM tags", []).unwrap();
    let again = store.resolve_tags(&["rock"], &mut cache).unwrap();
    assert_eq!(again, vec![ids[0]]);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM tags"), 0);
}

#[test]
fn interning_race_is_constraint_violation() {
    let store = open_memory();
    // Stand-in for a second writer inserting the name between lookup and insert
    store
        .connection()
        .execute_batch(
            "CREATE TEMP TRIGGER concurrent_artist BEFORE INSERT ON artists
             BEGIN
                 INSERT OR IGNORE INTO artists (lowercase_name) VALUES (NEW.lowercase_name);
             END;",
        )
        .unwrap();

    let err = intern_artist(store.connection(), "Queen").unwrap_err();
    assert!(matches!(
        err,
        StoreError::ConstraintViolation {
            operation: "artist_id",
            ..
        }
    ));
    // The failed statement is rolled back together with the trigger's insert
    assert_eq!(count(&store, "SELECT COUNT(*) FROM artists"), 0);

    store
        .connection()
        .execute_batch("DROP TRIGGER concurrent_artist")
        .unwrap();
    let id = intern_artist(store.connection(), "Queen").unwrap();
    assert_eq!(store.artist_id("queen", Creation::LookupOnly).unwrap(), Some(id));
    assert_eq!(count(&store, "SELECT COUNT(*) FROM artists"), 1);
}

#[test]
fn interning_race_on_tags_is_constraint_violation() {
    let store = open_memory();
    store
        .connection()
        .execute_batch(
            "CREATE TEMP TRIGGER concurrent_tag BEFORE INSERT ON tags
             BEGIN
                 INSERT OR IGNORE INTO tags (name) VALUES (NEW.name);
             END;",
        )
        .unwrap();

    let mut cache = NameCache::new();
    let err = store.resolve_tags(&["Rock"], &mut cache).unwrap_err();
    assert!(matches!(
        err,
        StoreError::ConstraintViolation {
            operation: "tag_id",
            ..
        }
    ));
    assert!(cache.is_empty());
}

// ── Sources & scan configuration ────────────────────────────────────────────

#[test]
fn add_and_find_source() {
    let store = open_memory();
    let source = store.add_source("/").unwrap();
    assert!(source.available);
    assert_eq!(store.find_source("/").unwrap(), Some(source.clone()));
    assert_eq!(store.find_source("/mnt/usb").unwrap(), None);

    store.set_source_availability(source.id, false).unwrap();
    let sources = store.all_sources().unwrap();
    assert_eq!(sources.len(), 1);
    assert!(!sources[0].available);
}

#[test]
fn duplicate_source_is_constraint_violation() {
    let store = open_memory();
    store.add_source("/").unwrap();
    let err = store.add_source("/").unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation { .. }));
    assert_eq!(err.operation(), Some("add_source"));
}

#[test]
fn directories_round_trip() {
    let store = open_memory();
    let source = store.add_source("/").unwrap();
    let dir_id = store.add_directory(source.id, "/music/rock").unwrap();
    assert_eq!(
        store.directory_id(source.id, "/music/rock").unwrap(),
        Some(dir_id)
    );
    assert_eq!(store.directory_id(source.id, "/music/pop").unwrap(), None);

    store.remove_directory(dir_id).unwrap();
    assert_eq!(store.directory_id(source.id, "/music/rock").unwrap(), None);
}

// ── Files ───────────────────────────────────────────────────────────────────

#[test]
fn add_file_interns_artist_and_normalizes_title() {
    let store = open_memory();
    let dir_id = setup_directory(&store);
    let file_id = store
        .add_file(dir_id, "01.mp3", 1_700_000_000, &meta("Queen", "Bohemian  Rhapsody"))
        .unwrap();

    let artist = store.artist_id("queen", Creation::LookupOnly).unwrap();
    assert!(artist.is_some());
    let (title, artist_ref): (String, i64) = store
        .connection()
        .query_row(
            "SELECT lowercase_title, artist FROM files WHERE id = ?1",
            [file_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(title, "bohemian rhapsody");
    assert_eq!(Some(artist_ref), artist);

    let entries = store.files_in_directory(dir_id).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, file_id);
    assert_eq!(entries[0].filename, "01.mp3");
    assert_eq!(entries[0].modified, 1_700_000_000);
}

#[test]
fn update_file_keeps_tags() {
    let store = open_memory();
    let dir_id = setup_directory(&store);
    let file_id = store
        .add_file(dir_id, "01.mp3", 1, &meta("Queen", "Bohemian Rhapsody"))
        .unwrap();
    store
        .set_global_tags_for_artist("Queen", &[WeightedTag::new("rock", 80)])
        .unwrap();

    let updated = store
        .update_file(file_id, 2, &meta("Queen", "Bohemian Rhapsody (Remastered)"))
        .unwrap();
    assert!(updated);
    assert!(!store.update_file(9999, 2, &meta("Queen", "x")).unwrap());

    let entries = store.files_in_directory(dir_id).unwrap();
    assert_eq!(entries[0].modified, 2);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM tracktags"), 1);
}

#[test]
fn remove_files_deletes_tags_too() {
    let store = open_memory();
    let dir_id = setup_directory(&store);
    let a = store.add_file(dir_id, "a.mp3", 1, &meta("Queen", "One")).unwrap();
    let b = store.add_file(dir_id, "b.mp3", 1, &meta("Queen", "Two")).unwrap();
    store
        .set_global_tags_for_artist("Queen", &[WeightedTag::new("rock", 90)])
        .unwrap();
    assert_eq!(count(&store, "SELECT COUNT(*) FROM tracktags"), 2);

    store.remove_files(&[a]).unwrap();
    let remaining: Vec<i64> = store
        .files_in_directory(dir_id)
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(remaining, vec![b]);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM tracktags"), 1);
}

#[test]
fn remove_files_empty_is_noop() {
    let store = open_memory();
    let dir_id = setup_directory(&store);
    store.add_file(dir_id, "a.mp3", 1, &meta("Queen", "One")).unwrap();
    let before = store.stats().unwrap();
    store.remove_files(&[]).unwrap();
    assert_eq!(store.stats().unwrap(), before);
}

#[test]
fn fingerprint_round_trip() {
    let store = open_memory();
    let dir_id = setup_directory(&store);
    let file_id = store.add_file(dir_id, "a.mp3", 1, &meta("Queen", "One")).unwrap();
    assert_eq!(store.fingerprint(file_id).unwrap(), None);
    store.set_fingerprint(file_id, 424242).unwrap();
    assert_eq!(store.fingerprint(file_id).unwrap(), Some(424242));
    assert_eq!(store.fingerprint(9999).unwrap(), None);
}

// ── Tags ────────────────────────────────────────────────────────────────────

#[test]
fn global_tags_are_superseded() {
    let store = open_memory();
    let dir_id = setup_directory(&store);
    store.add_file(dir_id, "a.mp3", 1, &meta("Queen", "One")).unwrap();
    store.add_file(dir_id, "b.mp3", 1, &meta("Queen", "Two")).unwrap();

    store
        .set_global_tags_for_artist(
            "Queen",
            &[WeightedTag::new("rock", 100), WeightedTag::new("glam", 60)],
        )
        .unwrap();
    assert_eq!(count(&store, "SELECT COUNT(*) FROM tracktags"), 4);

    store
        .set_global_tags_for_artist("Queen", &[WeightedTag::new("pop", 50)])
        .unwrap();
    let pop = store.tag_id("pop", Creation::LookupOnly).unwrap().unwrap();
    let tags: Vec<(i64, i64)> = {
        let mut stmt = store
            .connection()
            .prepare("SELECT tag, weight FROM tracktags")
            .unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        rows
    };
    assert_eq!(tags, vec![(pop, 50), (pop, 50)]);
}

#[test]
fn unknown_artist_tags_are_skipped() {
    let store = open_memory();
    store
        .set_global_tags_for_artist("Nobody", &[WeightedTag::new("rock", 100)])
        .unwrap();
    assert_eq!(count(&store, "SELECT COUNT(*) FROM tracktags"), 0);
    assert_eq!(store.artist_id("nobody", Creation::LookupOnly).unwrap(), None);
}

#[test]
fn global_and_user_deletion_do_not_overlap() {
    let store = open_memory();
    let dir_id = setup_directory(&store);
    store.add_file(dir_id, "a.mp3", 1, &meta("Queen", "One")).unwrap();
    let artist = store.artist_id("queen", Creation::LookupOnly).unwrap().unwrap();
    let rock = store.tag_id("rock", Creation::Create).unwrap().unwrap();
    let mine = store.tag_id("favourite", Creation::Create).unwrap().unwrap();

    assert_eq!(store.insert_global_artist_tag(artist, rock, 75).unwrap(), 1);
    assert_eq!(store.insert_user_artist_tag(artist, mine, 7).unwrap(), 1);

    assert_eq!(store.delete_global_track_tags_for_artist(artist).unwrap(), 1);
    let left: (i64, i64, i64) = store
        .connection()
        .query_row("SELECT tag, weight, user_id FROM tracktags", [], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .unwrap();
    assert_eq!(left, (mine, i64::from(USER_TAG_WEIGHT), 7));

    store.insert_global_artist_tag(artist, rock, 75).unwrap();
    assert_eq!(store.delete_track_tags_for_artist(artist, 7).unwrap(), 1);
    let user: i64 = store
        .connection()
        .query_row("SELECT user_id FROM tracktags", [], |row| row.get(0))
        .unwrap();
    assert_eq!(user, i64::from(GLOBAL_USER));
}

#[test]
fn weight_out_of_range_is_constraint_violation() {
    let store = open_memory();
    let dir_id = setup_directory(&store);
    store.add_file(dir_id, "a.mp3", 1, &meta("Queen", "One")).unwrap();
    let artist = store.artist_id("queen", Creation::LookupOnly).unwrap().unwrap();
    let tag = store.tag_id("rock", Creation::Create).unwrap().unwrap();

    let err = store.insert_global_artist_tag(artist, tag, 101).unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation { .. }));
    let err = store.insert_global_artist_tag(artist, tag, -1).unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation { .. }));
    assert_eq!(count(&store, "SELECT COUNT(*) FROM tracktags"), 0);
}

#[test]
fn failed_tag_replacement_rolls_back() {
    let store = open_memory();
    let dir_id = setup_directory(&store);
    store.add_file(dir_id, "a.mp3", 1, &meta("Queen", "One")).unwrap();
    store
        .set_global_tags_for_artist("Queen", &[WeightedTag::new("rock", 80)])
        .unwrap();

    let err = store
        .set_global_tags_for_artist(
            "Queen",
            &[WeightedTag::new("pop", 50), WeightedTag::new("bad", 500)],
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation { .. }));

    // The old tag survives and neither new tag was created
    let rock = store.tag_id("rock", Creation::LookupOnly).unwrap().unwrap();
    let only: i64 = store
        .connection()
        .query_row("SELECT tag FROM tracktags", [], |row| row.get(0))
        .unwrap();
    assert_eq!(only, rock);
    assert_eq!(store.tag_id("pop", Creation::LookupOnly).unwrap(), None);
    assert!(store.connection().is_autocommit());
}

#[test]
fn insert_track_tags_in_bulk() {
    let store = open_memory();
    let dir_id = setup_directory(&store);
    let a = store.add_file(dir_id, "a.mp3", 1, &meta("Queen", "One")).unwrap();
    let b = store.add_file(dir_id, "b.mp3", 1, &meta("Queen", "Two")).unwrap();
    let rock = store.tag_id("rock", Creation::Create).unwrap().unwrap();

    store
        .insert_track_tags(&[
            TrackTagEdge {
                file_id: a,
                tag_id: rock,
                weight: 40,
            },
            TrackTagEdge {
                file_id: b,
                tag_id: rock,
                weight: 60,
            },
        ])
        .unwrap();
    let mut files = store.files_with_tag("rock", Availability::AllSources).unwrap();
    files.sort_by_key(|(id, _)| *id);
    assert_eq!(files, vec![(a, 40.0), (b, 60.0)]);
}

#[test]
fn delete_track_tags_by_file() {
    let store = open_memory();
    let dir_id = setup_directory(&store);
    let a = store.add_file(dir_id, "a.mp3", 1, &meta("Queen", "One")).unwrap();
    let b = store.add_file(dir_id, "b.mp3", 1, &meta("Queen", "Two")).unwrap();
    let artist = store.artist_id("queen", Creation::LookupOnly).unwrap().unwrap();
    let rock = store.tag_id("rock", Creation::Create).unwrap().unwrap();
    store.insert_global_artist_tag(artist, rock, 50).unwrap();
    store.insert_user_artist_tag(artist, rock, 3).unwrap();

    store.delete_track_tags(&[a]).unwrap();
    let files: Vec<i64> = store
        .files_with_tag("rock", Availability::AllSources)
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(files, vec![b, b]);
}

// ── Similar artists ─────────────────────────────────────────────────────────

#[test]
fn similar_artists_heaviest_first() {
    let store = open_memory();
    let queen = store.artist_id("Queen", Creation::Create).unwrap().unwrap();
    let bowie = store.artist_id("David Bowie", Creation::Create).unwrap().unwrap();
    let mercury = store.artist_id("Freddie Mercury", Creation::Create).unwrap().unwrap();

    store.add_similar_artist(queen, bowie, 40).unwrap();
    store.add_similar_artist(queen, mercury, 90).unwrap();
    assert_eq!(
        store.similar_artists(queen).unwrap(),
        vec![(mercury, 90), (bowie, 40)]
    );
    assert!(store.similar_artists(bowie).unwrap().is_empty());
}

// ── Transactions ────────────────────────────────────────────────────────────

#[test]
fn abandoned_transaction_leaves_no_trace() {
    let store = open_memory();
    {
        let tx = store.transaction().unwrap();
        operations::add_source(&tx, "/").unwrap();
    }
    assert!(store.all_sources().unwrap().is_empty());
}

#[test]
fn committed_transaction_persists() {
    let store = open_memory();
    let tx = store.transaction().unwrap();
    let source = operations::add_source(&tx, "/").unwrap();
    operations::add_directory(&tx, source.id, "/music").unwrap();
    tx.commit().unwrap();
    let stats = store.stats().unwrap();
    assert_eq!(stats.sources, 1);
    assert_eq!(stats.directories, 1);
}
