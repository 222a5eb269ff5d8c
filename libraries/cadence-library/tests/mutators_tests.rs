//! Integration tests for the library mutators and read model


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cadence_core::{
    CadenceError, CreatePlaylist, PlayMode, UpdatePlaylist, UpdateTrack,
    FAVORITES_PLAYLIST_TITLE, HISTORY_PLAYLIST_TITLE,
};
use cadence_library::LinkOutcome;
use test_helpers::*;

// ============================================================================
// Playlists and links (Scenario A)
// ============================================================================

#[tokio::test]
async fn test_road_trip_playlist_lifecycle() {
    let lib = TestLibrary::new().await;
    let tracks = import_tracks(&lib, 3).await;
    let [t5, t7, t9] = [tracks[0].id, tracks[1].id, tracks[2].id];

    let playlist = lib
        .library
        .create_playlist(&CreatePlaylist::new("Road trip"))
        .await
        .unwrap();
    assert!(lib.config_of(&playlist).await.order_map.is_empty());

    lib.library.link_tracks(playlist.id, &[t5, t7, t9]).await.unwrap();
    assert_eq!(lib.config_of(&playlist).await.order_map.as_slice(), &[t5, t7, t9]);

    assert!(lib.library.delete_track(t7, true).await.unwrap());
    assert_eq!(lib.config_of(&playlist).await.order_map.as_slice(), &[t5, t9]);

    let snapshot = lib.snapshot();
    assert!(!snapshot
        .links
        .iter()
        .any(|l| l.playlist_id == playlist.id && l.track_id == t7));
    assert!(!snapshot.tracks.iter().any(|t| t.id == t7));
    assert_consistent(&snapshot);
}

#[tokio::test]
async fn test_link_batch_reports_each_track() {
    let lib = TestLibrary::new().await;
    let tracks = import_tracks(&lib, 2).await;
    let playlist = playlist_with(&lib, "Mix", &tracks[..1]).await;

    let outcomes = lib
        .library
        .link_tracks(playlist.id, &[tracks[0].id, tracks[1].id, 999])
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes[0],
        LinkOutcome::AlreadyLinked {
            track_id: tracks[0].id
        }
    );
    assert_eq!(
        outcomes[1],
        LinkOutcome::Linked {
            track_id: tracks[1].id
        }
    );
    assert!(matches!(outcomes[2], LinkOutcome::Failed { track_id: 999, .. }));

    assert_eq!(
        lib.config_of(&playlist).await.order_map.as_slice(),
        ids(&tracks).as_slice()
    );
    assert_consistent(&lib.snapshot());
}

#[tokio::test]
async fn test_link_to_missing_playlist_is_not_found() {
    let lib = TestLibrary::new().await;
    let tracks = import_tracks(&lib, 1).await;

    let result = lib.library.link_tracks(404, &ids(&tracks)).await;
    assert!(matches!(result, Err(e) if e.is_not_found()));
}

#[tokio::test]
async fn test_delete_from_playlist_keeps_track_elsewhere() {
    let lib = TestLibrary::new().await;
    let tracks = import_tracks(&lib, 2).await;
    let first = playlist_with(&lib, "First", &tracks).await;
    let second = playlist_with(&lib, "Second", &tracks).await;

    assert!(lib
        .library
        .delete_from_playlist(first.id, tracks[0].id, true)
        .await
        .unwrap());
    assert!(!lib
        .library
        .delete_from_playlist(first.id, tracks[0].id, true)
        .await
        .unwrap());

    assert_eq!(lib.config_of(&first).await.order_map.as_slice(), &[tracks[1].id]);
    assert_eq!(
        lib.config_of(&second).await.order_map.as_slice(),
        ids(&tracks).as_slice()
    );
    assert_consistent(&lib.snapshot());
}

#[tokio::test]
async fn test_delete_playlist_removes_config_and_links() {
    let lib = TestLibrary::new().await;
    let tracks = import_tracks(&lib, 2).await;
    let playlist = playlist_with(&lib, "Gone soon", &tracks).await;

    lib.library.delete_playlist(playlist.id, true).await.unwrap();

    let snapshot = lib.snapshot();
    assert!(!snapshot.playlists.iter().any(|p| p.id == playlist.id));
    assert!(!snapshot.configs.iter().any(|c| c.playlist_id == playlist.id));
    assert!(!snapshot.links.iter().any(|l| l.playlist_id == playlist.id));
    // Tracks survive their playlist
    assert_eq!(snapshot.tracks.len(), 2);
    assert_consistent(&snapshot);
}

#[tokio::test]
async fn test_user_playlists_hide_system_playlists() {
    let lib = TestLibrary::new().await;
    playlist_with(&lib, "Mine", &[]).await;

    let titles: Vec<String> = lib
        .library
        .user_playlists()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["Mine".to_string()]);
    assert!(!lib
        .snapshot()
        .playlists
        .iter()
        .any(|p| p.title == HISTORY_PLAYLIST_TITLE || p.title == FAVORITES_PLAYLIST_TITLE));
}

#[tokio::test]
async fn test_system_playlists_cannot_be_edited_or_deleted() {
    let lib = TestLibrary::new().await;
    let history = lib.library.store().history().playlist_id;

    let deleted = lib.library.delete_playlist(history, true).await;
    assert!(matches!(deleted, Err(CadenceError::InvalidArgument(_))));

    let renamed = lib
        .library
        .update_playlist(
            history,
            &UpdatePlaylist {
                description: Some("mine now".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(renamed, Err(CadenceError::InvalidArgument(_))));
}

// ============================================================================
// Tracks (Scenario C)
// ============================================================================

#[tokio::test]
async fn test_duplicate_import_is_rejected() {
    let lib = TestLibrary::new().await;
    lib.library
        .add_track(&new_track("A", "file://a.mp3", "Artist"))
        .await
        .unwrap();

    let result = lib
        .library
        .add_track(&new_track("A again", "file://a.mp3", "Artist"))
        .await;

    match result {
        Err(CadenceError::DuplicateTrack { file_uri }) => assert_eq!(file_uri, "file://a.mp3"),
        other => panic!("expected DuplicateTrack, got {other:?}"),
    }
    assert_eq!(lib.snapshot().tracks.len(), 1);
}

#[tokio::test]
async fn test_import_reuses_artist_by_exact_name() {
    let lib = TestLibrary::new().await;
    let a = lib
        .library
        .add_track(&new_track("A", "file://a.mp3", "Nina"))
        .await
        .unwrap();
    let b = lib
        .library
        .add_track(&new_track("B", "file://b.mp3", "Nina"))
        .await
        .unwrap();
    let c = lib
        .library
        .add_track(&new_track("C", "file://c.mp3", "nina"))
        .await
        .unwrap();

    assert_eq!(a.artist_id, b.artist_id);
    assert_ne!(a.artist_id, c.artist_id);
    assert_eq!(lib.snapshot().artists.len(), 2);
}

#[tokio::test]
async fn test_invalid_input_reports_fields() {
    let lib = TestLibrary::new().await;

    let result = lib.library.add_track(&new_track("", "", "Artist")).await;
    match result {
        Err(CadenceError::Validation(errors)) => {
            assert!(errors.get("title").is_some());
            assert!(errors.get("file_uri").is_some());
            assert!(errors.get("artist_name").is_none());
        }
        other => panic!("expected Validation, got {other:?}"),
    }

    let result = lib
        .library
        .create_playlist(&CreatePlaylist::new(HISTORY_PLAYLIST_TITLE))
        .await;
    assert!(matches!(result, Err(CadenceError::Validation(_))));
    assert!(lib.snapshot().tracks.is_empty());
}

#[tokio::test]
async fn test_update_track_renames_artist() {
    let lib = TestLibrary::new().await;
    let track = import_tracks(&lib, 1).await.remove(0);

    let updated = lib
        .library
        .update_track(
            track.id,
            &UpdateTrack {
                title: Some("Renamed".to_string()),
                artist_name: Some("Someone Else".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Renamed");
    assert_ne!(updated.artist_id, track.artist_id);
    let snapshot = lib.snapshot();
    assert!(snapshot.artists.iter().any(|a| a.name == "Someone Else"));
}

#[tokio::test]
async fn test_destructive_operations_require_confirmation() {
    let lib = TestLibrary::new().await;
    let tracks = import_tracks(&lib, 1).await;
    let playlist = playlist_with(&lib, "Keep", &tracks).await;

    let result = lib.library.delete_track(tracks[0].id, false).await;
    assert!(matches!(result, Err(CadenceError::ConfirmationRequired(_))));

    let result = lib.library.delete_playlist(playlist.id, false).await;
    assert!(matches!(result, Err(CadenceError::ConfirmationRequired(_))));

    let result = lib
        .library
        .delete_from_playlist(playlist.id, tracks[0].id, false)
        .await;
    assert!(matches!(result, Err(CadenceError::ConfirmationRequired(_))));

    let snapshot = lib.snapshot();
    assert_eq!(snapshot.tracks.len(), 1);
    assert!(snapshot.playlists.iter().any(|p| p.id == playlist.id));
    assert_eq!(lib.config_of(&playlist).await.order_map.len(), 1);
}

#[tokio::test]
async fn test_deleting_missing_track_returns_false() {
    let lib = TestLibrary::new().await;
    assert!(!lib.library.delete_track(12345, true).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_favorite_toggles_are_not_lost() {
    let lib = TestLibrary::new().await;
    let track = import_tracks(&lib, 1).await.remove(0);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let library = lib.library.clone();
        handles.push(tokio::spawn(async move {
            library.toggle_track_favorite(track.id).await.unwrap()
        }));
    }
    let mut on = 0;
    for handle in handles {
        if handle.await.unwrap() {
            on += 1;
        }
    }

    // Ten serialized flips: five saw `false -> true`
    assert_eq!(on, 5);
    let stored = lib.snapshot().tracks.into_iter().find(|t| t.id == track.id).unwrap();
    assert!(!stored.favorite);
}

#[tokio::test]
async fn test_playlist_and_artist_favorites() {
    let lib = TestLibrary::new().await;
    let track = import_tracks(&lib, 1).await.remove(0);
    let playlist = playlist_with(&lib, "Faves", &[]).await;

    assert!(lib.library.toggle_playlist_favorite(playlist.id).await.unwrap());
    assert!(lib.library.toggle_artist_favorite(track.artist_id).await.unwrap());

    let snapshot = lib.snapshot();
    assert!(snapshot.playlists.iter().any(|p| p.id == playlist.id && p.favorite));
    assert!(snapshot.artists.iter().any(|a| a.id == track.artist_id && a.favorite));
}

// ============================================================================
// Read model
// ============================================================================

#[tokio::test]
async fn test_subscribers_see_committed_writes() {
    let lib = TestLibrary::new().await;
    let mut sub = lib.library.subscribe();
    let before = sub.latest().unwrap();

    let playlist = lib
        .library
        .create_playlist(&CreatePlaylist::new("Fresh"))
        .await
        .unwrap();

    let after = sub.latest().unwrap();
    assert!(after.revision > before.revision);
    assert!(after.playlists.iter().any(|p| p.id == playlist.id));
    assert!(after.configs.iter().any(|c| c.playlist_id == playlist.id));
}

#[tokio::test]
async fn test_mixed_operations_keep_invariants() {
    let lib = TestLibrary::new().await;
    let tracks = import_tracks(&lib, 6).await;
    let a = playlist_with(&lib, "A", &tracks[..4]).await;
    let b = playlist_with(&lib, "B", &tracks[2..]).await;
    playlist_with(&lib, "C", &tracks).await;

    lib.library.delete_track(tracks[2].id, true).await.unwrap();
    lib.library
        .delete_from_playlist(b.id, tracks[5].id, true)
        .await
        .unwrap();
    lib.library
        .link_tracks(a.id, &[tracks[5].id, tracks[0].id])
        .await
        .unwrap();
    lib.library.delete_track(tracks[0].id, true).await.unwrap();
    lib.library.delete_playlist(b.id, true).await.unwrap();

    let snapshot = lib.snapshot();
    assert_consistent(&snapshot);
    assert_eq!(
        lib.config_of(&a).await.order_map.as_slice(),
        &[tracks[1].id, tracks[3].id, tracks[5].id]
    );
}

// ============================================================================
// Concurrent writers
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_deletes_succeed_alongside_other_writers() {
    let lib = TestLibrary::new().await;
    let tracks = import_tracks(&lib, 30).await;
    let playlist = playlist_with(&lib, "Busy", &tracks).await;
    let survivor = lib
        .library
        .add_track(&new_track("Stays", "file://stays.mp3", "Other"))
        .await
        .unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let library = lib.library.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut n = 0;
            while !stop.load(Ordering::SeqCst) {
                n += 1;
                library.toggle_track_favorite(survivor.id).await.unwrap();
                library
                    .add_track(&new_track(
                        &format!("Extra {n}"),
                        &format!("file://extra-{n}.mp3"),
                        &format!("Artist {n}"),
                    ))
                    .await
                    .unwrap();
                library
                    .set_setting("counter", &serde_json::json!(n))
                    .await
                    .unwrap();
            }
        })
    };

    let mut failures = Vec::new();
    for track in &tracks {
        if let Err(e) = lib.library.delete_track(track.id, true).await {
            failures.push(format!("delete {}: {e}", track.id));
        }
    }
    stop.store(true, Ordering::SeqCst);
    writer.await.unwrap();

    assert!(failures.is_empty(), "deletes failed: {failures:?}");
    assert!(lib.config_of(&playlist).await.order_map.is_empty());
    assert_consistent(&lib.snapshot());
}

#[tokio::test]
async fn test_reorder_racing_delete_keeps_order_map_linked() {
    let lib = TestLibrary::new().await;
    let tracks = import_tracks(&lib, 6).await;
    let playlist = playlist_with(&lib, "Racing", &tracks).await;
    lib.library.play(playlist.id, PlayMode::Simple).await.unwrap();

    let victim = tracks[3].id;
    let reorder = lib.library.reorder_queue(5, 1);
    let delete = lib.library.delete_track(victim, true);
    let (reordered, deleted) = tokio::join!(reorder, delete);
    reordered.unwrap();
    assert!(deleted.unwrap());
    lib.settle().await;

    let config = lib.config_of(&playlist).await;
    assert!(!config.order_map.contains(victim));
    assert_eq!(config.order_map, lib.library.queue().order_map);
    assert_consistent(&lib.snapshot());
}
