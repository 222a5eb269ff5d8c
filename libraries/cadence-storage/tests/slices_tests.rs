//! Integration tests for the table slices and `LocalStore`


use cadence_core::{
    CadenceError, ConfigFlags, OrderMap, PlaybackCatalog, QueueCommit, QueueCursor, QueueStore,
    Quote, UpdatePlaylist, UpdateTrack, FAVORITES_PLAYLIST_TITLE, HISTORY_PLAYLIST_TITLE,
};
use cadence_storage::{
    artists, playlist_configs, playlist_content, playlists, queue_state, quotes, settings, tracks,
};
use test_helpers::*;

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn test_open_creates_system_playlists_once() {
    let db = TestDb::new().await;

    // Re-opening the same pool must not duplicate anything
    let reopened = cadence_storage::LocalStore::open(db.pool().clone(), 10)
        .await
        .unwrap();
    assert_eq!(reopened.history().config_id, db.store.history().config_id);

    let mut conn = db.conn().await;
    let all = playlists::get_all(&mut conn).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|p| p.title == HISTORY_PLAYLIST_TITLE));
    assert!(all.iter().any(|p| p.title == FAVORITES_PLAYLIST_TITLE));

    assert!(playlists::user_playlists(&mut conn).await.unwrap().is_empty());
    assert_eq!(playlist_configs::get_all(&mut conn).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_initial_cursor_is_empty() {
    let db = TestDb::new().await;
    let cursor = db.store.load_cursor().await.unwrap();
    assert_eq!(cursor, QueueCursor::initial());
}

// ============================================================================
// Artists & tracks
// ============================================================================

#[tokio::test]
async fn test_resolve_artist_is_case_sensitive() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;
    let locks = db.store.locks();

    let a = artists::resolve_or_create(&mut conn, locks, "Nina").await.unwrap();
    let b = artists::resolve_or_create(&mut conn, locks, "Nina").await.unwrap();
    let c = artists::resolve_or_create(&mut conn, locks, "nina").await.unwrap();

    assert_eq!(a.id, b.id);
    assert_ne!(a.id, c.id);
    assert_eq!(artists::get_all(&mut conn).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_duplicate_file_uri_is_duplicate_track() {
    let db = TestDb::new().await;
    create_test_track(&db, "One", "file://a.mp3", "Artist").await;

    let mut conn = db.conn().await;
    let artist = artists::find_by_name(&mut conn, "Artist").await.unwrap().unwrap();
    let result = tracks::create(&mut conn, artist.id, &new_track("Two", "file://a.mp3", "Artist")).await;

    assert!(matches!(
        result,
        Err(CadenceError::DuplicateTrack { ref file_uri }) if file_uri == "file://a.mp3"
    ));
    assert_eq!(tracks::get_all(&mut conn).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_find_track_by_file_uri() {
    let db = TestDb::new().await;
    let track = create_test_track(&db, "One", "file://a.mp3", "Artist").await;

    let mut conn = db.conn().await;
    let found = tracks::find_by_file_uri(&mut conn, "file://a.mp3").await.unwrap();
    assert_eq!(found.map(|t| t.id), Some(track.id));
    assert!(tracks::find_by_file_uri(&mut conn, "file://b.mp3")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_get_many_preserves_requested_order() {
    let db = TestDb::new().await;
    let a = create_test_track(&db, "A", "file://a.mp3", "X").await;
    let b = create_test_track(&db, "B", "file://b.mp3", "X").await;
    let c = create_test_track(&db, "C", "file://c.mp3", "X").await;

    let mut conn = db.conn().await;
    let found = tracks::get_many(&mut conn, &[c.id, a.id, 999, b.id]).await.unwrap();
    let ids: Vec<_> = found.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![c.id, a.id, b.id]);
}

#[tokio::test]
async fn test_update_track_fields() {
    let db = TestDb::new().await;
    let track = create_test_track(&db, "Old", "file://a.mp3", "X").await;

    let mut conn = db.conn().await;
    let updated = tracks::update(
        &mut conn,
        track.id,
        &UpdateTrack {
            title: Some("New".into()),
            cover_uri: Some(Some("file://cover.png".into())),
            millis: Some(1_000),
            ..UpdateTrack::default()
        },
        None,
    )
    .await
    .unwrap();

    assert_eq!(updated.title, "New");
    assert_eq!(updated.cover_uri.as_deref(), Some("file://cover.png"));
    assert_eq!(updated.millis, 1_000);
    assert_eq!(updated.file_uri, track.file_uri);

    let missing = tracks::update(&mut conn, 999, &UpdateTrack::default(), None).await;
    assert!(missing.unwrap_err().is_not_found());
}

// ============================================================================
// Playlists, configs & links
// ============================================================================

#[tokio::test]
async fn test_playlist_config_starts_empty() {
    let db = TestDb::new().await;
    let (playlist, config) = create_test_playlist(&db, "Road trip").await;

    assert_eq!(config.playlist_id, playlist.id);
    assert!(config.order_map.is_empty());
    assert_eq!(config.flags, ConfigFlags::default());

    let mut conn = db.conn().await;
    let user = playlists::user_playlists(&mut conn).await.unwrap();
    assert_eq!(user.len(), 1);
    assert_eq!(user[0].title, "Road trip");
}

#[tokio::test]
async fn test_second_config_for_playlist_is_rejected() {
    let db = TestDb::new().await;
    let (playlist, _) = create_test_playlist(&db, "Road trip").await;

    let mut conn = db.conn().await;
    let result = playlist_configs::create(&mut conn, playlist.id).await;
    assert!(matches!(result, Err(CadenceError::ConstraintViolation(_))));
}

#[tokio::test]
async fn test_link_twice_is_duplicate_link() {
    let db = TestDb::new().await;
    let (playlist, _) = create_test_playlist(&db, "Mix").await;
    let track = create_test_track(&db, "A", "file://a.mp3", "X").await;

    let mut conn = db.conn().await;
    playlist_content::link(&mut conn, playlist.id, track.id).await.unwrap();
    let again = playlist_content::link(&mut conn, playlist.id, track.id).await;

    assert!(matches!(
        again,
        Err(CadenceError::DuplicateLink { playlist_id, track_id })
            if playlist_id == playlist.id && track_id == track.id
    ));
    assert_eq!(
        playlist_content::track_ids(&mut conn, playlist.id).await.unwrap(),
        vec![track.id]
    );
}

#[tokio::test]
async fn test_link_to_missing_track_is_constraint_violation() {
    let db = TestDb::new().await;
    let (playlist, _) = create_test_playlist(&db, "Mix").await;

    let mut conn = db.conn().await;
    let result = playlist_content::link(&mut conn, playlist.id, 404).await;
    assert!(matches!(result, Err(CadenceError::ConstraintViolation(_))));
}

#[tokio::test]
async fn test_find_configs_containing_track() {
    let db = TestDb::new().await;
    let (_, first) = create_test_playlist(&db, "One").await;
    let (_, second) = create_test_playlist(&db, "Two").await;

    let mut conn = db.conn().await;
    playlist_configs::set_order_map(&mut conn, first.id, &OrderMap::from(vec![3, 7]))
        .await
        .unwrap();
    playlist_configs::set_order_map(&mut conn, second.id, &OrderMap::from(vec![9]))
        .await
        .unwrap();

    let containing = playlist_configs::find_containing(&mut conn, 7).await.unwrap();
    assert_eq!(containing.len(), 1);
    assert_eq!(containing[0].id, first.id);
    assert_eq!(containing[0].order_map.as_slice(), &[3, 7]);
}

#[tokio::test]
async fn test_system_playlist_cannot_be_edited() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;
    let history = db.store.history();

    let result = playlists::update(
        &mut conn,
        history.playlist_id,
        &UpdatePlaylist {
            title: Some("Mine now".into()),
            ..UpdatePlaylist::default()
        },
    )
    .await;
    assert!(matches!(result, Err(CadenceError::InvalidArgument(_))));
}

// ============================================================================
// Queue store
// ============================================================================

#[tokio::test]
async fn test_commit_writes_cursor_and_map_together() {
    let db = TestDb::new().await;
    let (_, config) = create_test_playlist(&db, "Mix").await;

    let cursor = QueueCursor {
        current_index: 1,
        current_millis: 4_200,
        playlist_config_id: Some(config.id),
    };
    let flags = ConfigFlags {
        is_looping: true,
        ..ConfigFlags::default()
    };
    db.store
        .commit(
            QueueCommit::cursor(cursor)
                .with_order_map(config.id, OrderMap::from(vec![5, 9]))
                .with_flags(config.id, flags),
        )
        .await
        .unwrap();

    assert_eq!(db.store.load_cursor().await.unwrap(), cursor);
    let stored = db.store.load_config(config.id).await.unwrap().unwrap();
    assert_eq!(stored.order_map.as_slice(), &[5, 9]);
    assert!(stored.flags.is_looping);
}

#[tokio::test]
async fn test_failed_commit_leaves_cursor_untouched() {
    let db = TestDb::new().await;

    let cursor = QueueCursor {
        current_index: 3,
        current_millis: 0,
        playlist_config_id: Some(777),
    };
    let result = db
        .store
        .commit(QueueCommit::cursor(cursor).with_order_map(777, OrderMap::from(vec![1])))
        .await;

    assert!(result.unwrap_err().is_not_found());
    assert_eq!(db.store.load_cursor().await.unwrap(), QueueCursor::initial());
}

#[tokio::test]
async fn test_missing_config_reads_as_none() {
    let db = TestDb::new().await;
    assert!(db.store.load_config(12345).await.unwrap().is_none());

    let mut conn = db.conn().await;
    queue_state::save(
        &mut conn,
        &QueueCursor {
            current_index: 0,
            current_millis: 0,
            playlist_config_id: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(queue_state::get(&mut conn).await.unwrap(), QueueCursor::initial());
}

// ============================================================================
// Playback catalog
// ============================================================================

#[tokio::test]
async fn test_resolve_tracks_joins_artist_names() {
    let db = TestDb::new().await;
    let a = create_test_track(&db, "A", "file://a.mp3", "Nina").await;
    let b = create_test_track(&db, "B", "file://b.mp3", "Ella").await;

    let resolved = db.store.resolve_tracks(&[b.id, a.id]).await.unwrap();
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].id, b.id);
    assert_eq!(resolved[0].artist, "Ella");
    assert_eq!(resolved[1].url, "file://a.mp3");

    let missing = db.store.resolve_tracks(&[a.id, 404]).await;
    assert!(missing.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_history_moves_replays_to_end_and_caps() {
    let db = TestDb::with_history_limit(2).await;
    let a = create_test_track(&db, "A", "file://a.mp3", "X").await;
    let b = create_test_track(&db, "B", "file://b.mp3", "X").await;
    let c = create_test_track(&db, "C", "file://c.mp3", "X").await;
    let history = db.store.history();

    db.store.record_history(a.id, None).await.unwrap();
    db.store.record_history(b.id, None).await.unwrap();
    db.store.record_history(a.id, None).await.unwrap();

    let config = db.store.load_config(history.config_id).await.unwrap().unwrap();
    assert_eq!(config.order_map.as_slice(), &[b.id, a.id]);

    db.store.record_history(c.id, None).await.unwrap();
    let config = db.store.load_config(history.config_id).await.unwrap().unwrap();
    assert_eq!(config.order_map.as_slice(), &[a.id, c.id]);

    // Evicted entries are unlinked too
    let mut conn = db.conn().await;
    let linked = playlist_content::track_ids(&mut conn, history.playlist_id).await.unwrap();
    assert_eq!(linked.len(), 2);
    assert!(!linked.contains(&b.id));
}

#[tokio::test]
async fn test_history_not_recorded_while_history_plays() {
    let db = TestDb::new().await;
    let a = create_test_track(&db, "A", "file://a.mp3", "X").await;
    let history = db.store.history();

    db.store
        .record_history(a.id, Some(history.config_id))
        .await
        .unwrap();

    let config = db.store.load_config(history.config_id).await.unwrap().unwrap();
    assert!(config.order_map.is_empty());
}

#[tokio::test]
async fn test_history_bumps_change_revision() {
    let db = TestDb::new().await;
    let a = create_test_track(&db, "A", "file://a.mp3", "X").await;

    let mut changes = db.store.changes();
    assert_eq!(changes.next().await, Some(0));

    db.store.record_history(a.id, None).await.unwrap();
    assert_eq!(changes.next().await, Some(1));
}

// ============================================================================
// Settings & quotes
// ============================================================================

#[tokio::test]
async fn test_settings_round_trip() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    assert!(settings::get(&mut conn, settings::SETTING_ONBOARDED)
        .await
        .unwrap()
        .is_none());

    settings::set(&mut conn, settings::SETTING_ONBOARDED, &serde_json::json!(false))
        .await
        .unwrap();
    settings::set(&mut conn, settings::SETTING_ONBOARDED, &serde_json::json!(true))
        .await
        .unwrap();

    assert_eq!(
        settings::get(&mut conn, settings::SETTING_ONBOARDED).await.unwrap(),
        Some(serde_json::json!(true))
    );
    assert_eq!(settings::get_all(&mut conn).await.unwrap().len(), 1);

    assert!(settings::delete(&mut conn, settings::SETTING_ONBOARDED).await.unwrap());
    assert!(!settings::delete(&mut conn, settings::SETTING_ONBOARDED).await.unwrap());
}

#[tokio::test]
async fn test_quote_cache_keeps_only_latest() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    assert!(quotes::latest(&mut conn).await.unwrap().is_none());

    let first = Quote {
        text: "First".into(),
        author: "A".into(),
        fetched_at: chrono::Utc::now() - chrono::Duration::days(2),
    };
    let second = Quote {
        text: "Second".into(),
        author: "B".into(),
        fetched_at: chrono::Utc::now(),
    };
    quotes::replace(&mut conn, &first).await.unwrap();
    quotes::replace(&mut conn, &second).await.unwrap();

    let latest = quotes::latest(&mut conn).await.unwrap().unwrap();
    assert_eq!(latest.text, "Second");
    assert_eq!(latest.fetched_at.timestamp(), second.fetched_at.timestamp());
}
