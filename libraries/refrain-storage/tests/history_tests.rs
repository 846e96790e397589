//! Integration tests for the listening history vertical slice


use chrono::{Duration, Utc};
use test_helpers::*;

#[tokio::test]
async fn test_is_liked_defaults_to_false() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let user = create_test_user(pool, "alice").await;
    let song = create_test_song(pool, "a").await;

    assert!(!refrain_storage::history::is_liked(pool, user.id, song).await.unwrap());
    assert!(refrain_storage::history::get(pool, user.id, song).await.unwrap().is_none());
}

#[tokio::test]
async fn test_like_then_unlike() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let user = create_test_user(pool, "alice").await;
    let song = create_test_song(pool, "a").await;

    refrain_storage::history::set_liked(pool, user.id, song, true).await.unwrap();
    assert!(refrain_storage::history::is_liked(pool, user.id, song).await.unwrap());

    refrain_storage::history::set_liked(pool, user.id, song, false).await.unwrap();
    assert!(!refrain_storage::history::is_liked(pool, user.id, song).await.unwrap());
}

#[tokio::test]
async fn test_record_listen_keeps_first_and_moves_last() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let user = create_test_user(pool, "alice").await;
    let song = create_test_song(pool, "a").await;

    let t0 = Utc::now() - Duration::hours(1);
    let t1 = Utc::now();

    refrain_storage::history::record_listen(pool, user.id, song, t0).await.unwrap();
    refrain_storage::history::record_listen(pool, user.id, song, t1).await.unwrap();

    let entry = refrain_storage::history::get(pool, user.id, song)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(entry.listen_count, 2);
    assert_eq!(entry.first_listen_at.map(|t| t.timestamp()), Some(t0.timestamp()));
    assert_eq!(entry.last_listen_at.map(|t| t.timestamp()), Some(t1.timestamp()));
    assert!(!entry.skipped);
}

#[tokio::test]
async fn test_mark_skipped_preserves_other_fields() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let user = create_test_user(pool, "alice").await;
    let song = create_test_song(pool, "a").await;

    refrain_storage::history::set_liked(pool, user.id, song, true).await.unwrap();
    refrain_storage::history::mark_skipped(pool, user.id, song).await.unwrap();

    let entry = refrain_storage::history::get(pool, user.id, song)
        .await
        .unwrap()
        .unwrap();
    assert!(entry.liked);
    assert!(entry.skipped);
    assert_eq!(entry.listen_count, 0);
}

#[tokio::test]
async fn test_find_owner_prefers_earliest_link() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let alice = create_test_user(pool, "alice").await;
    let bob = create_test_user(pool, "bob").await;
    let song = create_test_placeholder(pool).await;

    assert!(refrain_storage::history::find_owner(pool, song).await.unwrap().is_none());

    refrain_storage::history::link(pool, alice.id, song).await.unwrap();
    refrain_storage::history::link(pool, bob.id, song).await.unwrap();
    // Linking twice is harmless
    refrain_storage::history::link(pool, alice.id, song).await.unwrap();

    let owner = refrain_storage::history::find_owner(pool, song).await.unwrap();
    assert_eq!(owner, Some(alice.id));
}

#[tokio::test]
async fn test_delete_for_song_removes_every_link() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let alice = create_test_user(pool, "alice").await;
    let bob = create_test_user(pool, "bob").await;
    let song = create_test_placeholder(pool).await;

    refrain_storage::history::link(pool, alice.id, song).await.unwrap();
    refrain_storage::history::link(pool, bob.id, song).await.unwrap();

    let removed = refrain_storage::history::delete_for_song(pool, song).await.unwrap();
    assert_eq!(removed, 2);
    assert!(refrain_storage::history::find_owner(pool, song).await.unwrap().is_none());
}

#[tokio::test]
async fn test_song_delete_cascades_to_history() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let user = create_test_user(pool, "alice").await;
    let song = create_test_placeholder(pool).await;
    refrain_storage::history::link(pool, user.id, song).await.unwrap();

    refrain_storage::songs::delete(pool, song).await.unwrap();

    assert!(refrain_storage::history::get(pool, user.id, song).await.unwrap().is_none());
    assert!(refrain_storage::history::songs_for_user(pool, user.id)
        .await
        .unwrap()
        .is_empty());
}
