use super::*;

#[test]
fn defaults_match_reference_constants() {
    let s = CollectionSettings::default();
    assert_eq!(s.artist_threshold, 0.7);
    assert_eq!(s.title_threshold, 0.7);
    assert_eq!(s.batch_chunk_size, 100);
    assert!(s.database_path.is_none());
}

#[test]
fn missing_keys_take_defaults() {
    let s = CollectionSettings::from_toml_str("[collection]\ntitle_threshold = 0.5\n").unwrap();
    assert_eq!(s.title_threshold, 0.5);
    assert_eq!(s.artist_threshold, DEFAULT_ARTIST_THRESHOLD);
    assert_eq!(s.batch_chunk_size, DEFAULT_CHUNK_SIZE);
}

#[test]
fn empty_file_is_all_defaults() {
    let s = CollectionSettings::from_toml_str("").unwrap();
    assert_eq!(s, CollectionSettings::default());
}

#[test]
fn malformed_file_is_parse_error() {
    let err = CollectionSettings::from_toml_str("[collection]\nartist_threshold = \"high\"\n")
        .unwrap_err();
    assert!(matches!(err, SettingsError::Parse(_)));
}

#[test]
fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.toml");
    let settings = CollectionSettings {
        database_path: Some(PathBuf::from("/tmp/collection.db")),
        artist_threshold: 0.8,
        title_threshold: 0.65,
        batch_chunk_size: 250,
    };
    save_settings_to(&path, &settings).unwrap();
    assert_eq!(load_settings_from(&path).unwrap(), settings);
}

#[test]
fn load_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let s = load_settings_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(s, CollectionSettings::default());
}

#[test]
fn database_path_priority() {
    let mut s = CollectionSettings::default();
    assert_eq!(
        s.resolve_database_path(None).file_name().unwrap(),
        DATABASE_FILE_NAME
    );

    s.database_path = Some(PathBuf::from("/from/settings.db"));
    assert_eq!(s.resolve_database_path(None), PathBuf::from("/from/settings.db"));
    assert_eq!(
        s.resolve_database_path(Some(PathBuf::from("/override.db"))),
        PathBuf::from("/override.db")
    );
}
