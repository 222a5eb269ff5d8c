//! Integration tests for the generic CRUD primitives and table lifecycle


use cadence_core::CadenceError;
use cadence_storage::schema;
use cadence_storage::store::{self, Record, Value};
use cadence_storage::Table;
use test_helpers::*;

#[tokio::test]
async fn test_unrestricted_select_returns_all_rows() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    for name in ["Alpha", "Beta", "Gamma"] {
        store::insert_into(&mut conn, Table::Artists, &Record::new().with("name", name))
            .await
            .unwrap();
    }

    let rows = store::select_from(&mut conn, Table::Artists, None, None, &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get_string("name").unwrap(), "Alpha");
    assert!(rows[0].get("favorite").is_some());
}

#[tokio::test]
async fn test_select_with_columns_and_predicate() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    store::insert_into(&mut conn, Table::Artists, &Record::new().with("name", "Alpha"))
        .await
        .unwrap();
    store::insert_into(&mut conn, Table::Artists, &Record::new().with("name", "Beta"))
        .await
        .unwrap();

    let rows = store::select_from(
        &mut conn,
        Table::Artists,
        Some(&["name"]),
        Some("name = ?"),
        &["Beta".into()],
    )
    .await
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::Text("Beta".into())));
}

#[tokio::test]
async fn test_malformed_predicate_is_an_error() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    let result =
        store::select_from(&mut conn, Table::Artists, None, Some("name = = ?"), &["x".into()]).await;
    assert!(matches!(result, Err(CadenceError::Database(_))));
}

#[tokio::test]
async fn test_bad_column_name_is_rejected_before_sql() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    let result = store::select_from(
        &mut conn,
        Table::Artists,
        Some(&["name; DROP TABLE artists"]),
        None,
        &[],
    )
    .await;
    assert!(matches!(result, Err(CadenceError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_empty_insert_is_invalid_argument() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    let result = store::insert_into(&mut conn, Table::Artists, &Record::new()).await;
    assert!(matches!(result, Err(CadenceError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_unique_violation_is_constraint_violation() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    let record = Record::new().with("name", "Alpha");
    store::insert_into(&mut conn, Table::Artists, &record)
        .await
        .unwrap();
    let result = store::insert_into(&mut conn, Table::Artists, &record).await;
    assert!(matches!(result, Err(CadenceError::ConstraintViolation(_))));
}

#[tokio::test]
async fn test_foreign_key_violation_is_constraint_violation() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    let record = Record::new()
        .with("title", "Orphan")
        .with("file_uri", "file://orphan.mp3")
        .with("artist_id", 999_i64);
    let result = store::insert_into(&mut conn, Table::Tracks, &record).await;
    assert!(matches!(result, Err(CadenceError::ConstraintViolation(_))));
}

#[tokio::test]
async fn test_update_and_delete_report_affected_rows() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    for name in ["Alpha", "Beta", "Gamma"] {
        store::insert_into(&mut conn, Table::Artists, &Record::new().with("name", name))
            .await
            .unwrap();
    }

    let updated = store::update(
        &mut conn,
        Table::Artists,
        &Record::new().with("favorite", true),
        Some("name != ?"),
        &["Beta".into()],
    )
    .await
    .unwrap();
    assert_eq!(updated, 2);

    let deleted = store::delete_from(&mut conn, Table::Artists, Some("favorite = 1"), &[])
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    assert!(store::exists_in(&mut conn, Table::Artists, "name = ?", &["Beta".into()])
        .await
        .unwrap());
    assert!(!store::exists_in(&mut conn, Table::Artists, "name = ?", &["Alpha".into()])
        .await
        .unwrap());
}

#[tokio::test]
async fn test_insert_if_not_exists_is_serialized() {
    let db = TestDb::new().await;
    let locks = db.store.locks().clone();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = db.pool().clone();
        let locks = locks.clone();
        handles.push(tokio::spawn(async move {
            let mut conn = pool.acquire().await.unwrap();
            store::insert_if_not_exists(
                &mut conn,
                &locks,
                Table::Artists,
                "name = ?",
                &["Racer".into()],
                &Record::new().with("name", "Racer"),
            )
            .await
            .unwrap()
        }));
    }

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
}

#[tokio::test]
async fn test_concurrent_toggles_do_not_lose_updates() {
    let db = TestDb::new().await;
    let track = create_test_track(&db, "Song", "file://song.mp3", "Artist").await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let pool = db.pool().clone();
        let locks = db.store.locks().clone();
        handles.push(tokio::spawn(async move {
            let mut conn = pool.acquire().await.unwrap();
            cadence_storage::tracks::toggle_favorite(&mut conn, &locks, track.id)
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut conn = db.conn().await;
    let stored = cadence_storage::tracks::get_by_id(&mut conn, track.id)
        .await
        .unwrap()
        .unwrap();
    // Ten negations from `false`
    assert!(!stored.favorite);
}

#[tokio::test]
async fn test_toggle_missing_row_is_not_found() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    let result =
        store::toggle_flag(&mut conn, db.store.locks(), Table::Tracks, 42, "favorite").await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_truncate_twice_resets_autoincrement() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    let first = store::insert_into(&mut conn, Table::Artists, &Record::new().with("name", "A"))
        .await
        .unwrap();
    store::insert_into(&mut conn, Table::Artists, &Record::new().with("name", "B"))
        .await
        .unwrap();

    schema::truncate(&mut conn, Table::Artists).await.unwrap();
    assert!(store::select_from(&mut conn, Table::Artists, None, None, &[])
        .await
        .unwrap()
        .is_empty());

    schema::truncate(&mut conn, Table::Artists).await.unwrap();
    assert!(store::select_from(&mut conn, Table::Artists, None, None, &[])
        .await
        .unwrap()
        .is_empty());

    let reinserted = store::insert_into(&mut conn, Table::Artists, &Record::new().with("name", "C"))
        .await
        .unwrap();
    assert_eq!(reinserted, first);
}

#[tokio::test]
async fn test_lifecycle_is_idempotent() {
    let db = TestDb::new().await;
    let mut conn = db.conn().await;

    schema::create_all(&mut conn).await.unwrap();
    schema::create_all(&mut conn).await.unwrap();

    schema::truncate_all(&mut conn).await.unwrap();
    schema::truncate_all(&mut conn).await.unwrap();

    schema::drop_all(&mut conn).await.unwrap();
    schema::drop_all(&mut conn).await.unwrap();

    // Truncating a dropped table is a no-op
    schema::truncate(&mut conn, Table::Tracks).await.unwrap();

    schema::create_table(&mut conn, Table::Artists).await.unwrap();
    let id = store::insert_into(&mut conn, Table::Artists, &Record::new().with("name", "Fresh"))
        .await
        .unwrap();
    assert_eq!(id, 1);
}
