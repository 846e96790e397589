/// Refill orchestrator tests
/// Reservation, completion, failure and consumption paths against a real database
mod common;

use async_trait::async_trait;
use common::{build_state, create_playable_song, sourcing_requests, test_config, TestApp};
use mockall::mock;
use refrain_core::{EventProducer, OutboundMessage, RefrainError};
use refrain_server::services::{Consumption, RefillPolicy};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Producer {}

    #[async_trait]
    impl EventProducer for Producer {
        async fn send(&self, message: OutboundMessage) -> refrain_core::Result<()>;
    }
}

const TTL: Duration = Duration::from_secs(600);

#[tokio::test]
async fn test_alice_single_slot_backfill() {
    let mut app = TestApp::new().await;
    let alice = app.create_user("alice").await;
    let song_a = create_playable_song(&app.pool, "a").await;
    let song_b = create_playable_song(&app.pool, "b").await;

    app.state.queue.append(alice.id, song_a).await.unwrap();
    app.state.queue.append(alice.id, song_b).await.unwrap();

    app.state.queue.remove_first_match(alice.id, song_a).await.unwrap();

    let entries = app.state.queue.entries(alice.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].song_id, song_b);
    assert_eq!(entries[0].position, 0);

    let policy = RefillPolicy {
        min_size: 10,
        max_batch: 1,
    };
    let success = app
        .state
        .refill
        .ensure_minimum_size("alice", policy)
        .await
        .unwrap();
    assert!(success);

    let requests = sourcing_requests(&app.drain_published());
    assert_eq!(requests.len(), 1);

    // Queue only grows when the completion event arrives
    assert_eq!(app.state.queue.len(alice.id).await.unwrap(), 1);
    assert_eq!(
        app.state.catalog.pending_reservations(alice.id, TTL).await.unwrap(),
        1
    );

    let owner = app.state.directory.owner_of(requests[0]).await.unwrap().unwrap();
    assert_eq!(owner.id, alice.id);
}

#[tokio::test]
async fn test_full_queue_is_left_alone() {
    let mut app = TestApp::new().await;
    let alice = app.create_user("alice").await;

    for i in 0..10 {
        let song = create_playable_song(&app.pool, &format!("song-{i}")).await;
        app.state.queue.append(alice.id, song).await.unwrap();
    }

    let policy = app.state.refill.manual_policy();
    assert!(app
        .state
        .refill
        .ensure_minimum_size("alice", policy)
        .await
        .unwrap());
    assert!(app.drain_published().is_empty());
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let app = TestApp::new().await;
    let policy = app.state.refill.manual_policy();

    let err = app
        .state
        .refill
        .ensure_minimum_size("nobody", policy)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

/// Completes every outstanding sourcing request until none remain
async fn run_sourcing_backend(app: &mut TestApp, user: &refrain_core::User) -> usize {
    let mut completed = 0;

    loop {
        let requests = sourcing_requests(&app.drain_published());
        if requests.is_empty() {
            return completed;
        }

        for song_id in requests {
            let refill = app
                .state
                .refill
                .on_sourcing_completed(song_id, &format!("/music/{song_id}.mp3"))
                .await
                .unwrap()
                .expect("sourced song should have an owner");
            completed += 1;

            assert!(app.state.queue.len(user.id).await.unwrap() <= 10);
            assert!(refill.wait().await);
        }
    }
}

#[tokio::test]
async fn test_event_driven_refill_converges_to_min_size() {
    let mut app = TestApp::new().await;
    let alice = app.create_user("alice").await;

    for i in 0..7 {
        let song = create_playable_song(&app.pool, &format!("song-{i}")).await;
        app.state.queue.append(alice.id, song).await.unwrap();
    }

    let policy = app.state.refill.event_policy();
    assert!(app
        .state
        .refill
        .ensure_minimum_size("alice", policy)
        .await
        .unwrap());

    let completed = run_sourcing_backend(&mut app, &alice).await;

    assert_eq!(completed, 3);
    assert_eq!(app.state.queue.len(alice.id).await.unwrap(), 10);
    assert_eq!(
        app.state.catalog.pending_reservations(alice.id, TTL).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_manual_batch_does_not_overshoot() {
    let mut app = TestApp::new().await;
    let alice = app.create_user("alice").await;

    for i in 0..4 {
        let song = create_playable_song(&app.pool, &format!("song-{i}")).await;
        app.state.queue.append(alice.id, song).await.unwrap();
    }

    let policy = app.state.refill.manual_policy();
    assert!(app
        .state
        .refill
        .ensure_minimum_size("alice", policy)
        .await
        .unwrap());

    // A second check while the batch is in flight reserves nothing new
    assert!(app
        .state
        .refill
        .ensure_minimum_size("alice", policy)
        .await
        .unwrap());

    let completed = run_sourcing_backend(&mut app, &alice).await;

    assert_eq!(completed, 6);
    assert_eq!(app.state.queue.len(alice.id).await.unwrap(), 10);
}

#[tokio::test]
async fn test_concurrent_checks_reserve_once() {
    let mut app = TestApp::new().await;
    let _alice = app.create_user("alice").await;

    let policy = app.state.refill.manual_policy();
    let checks: Vec<_> = (0..4)
        .map(|_| app.state.refill.schedule("alice".to_string(), policy))
        .collect();

    for check in checks {
        assert!(check.wait().await);
    }

    assert_eq!(sourcing_requests(&app.drain_published()).len(), 10);
}

#[tokio::test]
async fn test_duplicate_completion_appends_once() {
    let mut app = TestApp::new().await;
    let alice = app.create_user("alice").await;

    let policy = RefillPolicy {
        min_size: 1,
        max_batch: 1,
    };
    app.state
        .refill
        .ensure_minimum_size("alice", policy)
        .await
        .unwrap();
    let song_id = sourcing_requests(&app.drain_published())[0];

    for _ in 0..2 {
        app.state
            .refill
            .on_sourcing_completed(song_id, "/music/x.mp3")
            .await
            .unwrap();
    }

    assert_eq!(app.queue_song_ids(&alice).await, vec![song_id]);
}

#[tokio::test]
async fn test_sourcing_failure_cleans_up_and_reschedules() {
    let mut app = TestApp::new().await;
    let alice = app.create_user("alice").await;
    let queued = create_playable_song(&app.pool, "queued").await;
    app.state.queue.append(alice.id, queued).await.unwrap();

    let policy = app.state.refill.event_policy();
    app.state
        .refill
        .ensure_minimum_size("alice", policy)
        .await
        .unwrap();
    let placeholder = sourcing_requests(&app.drain_published())[0];

    let refill = app
        .state
        .refill
        .on_sourcing_failed(placeholder)
        .await
        .unwrap()
        .expect("owner should be resolved");

    let err = app.state.catalog.find_by_id(placeholder).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(app.state.directory.owner_of(placeholder).await.unwrap().is_none());
    assert_eq!(app.queue_song_ids(&alice).await, vec![queued]);

    assert!(refill.wait().await);
    let retried = sourcing_requests(&app.drain_published());
    assert_eq!(retried.len(), 1);
    assert_ne!(retried[0], placeholder);
}

#[tokio::test]
async fn test_sourcing_failure_removes_queued_placeholder() {
    let mut app = TestApp::new().await;
    let alice = app.create_user("alice").await;

    let policy = RefillPolicy {
        min_size: 1,
        max_batch: 1,
    };
    app.state
        .refill
        .ensure_minimum_size("alice", policy)
        .await
        .unwrap();
    let placeholder = sourcing_requests(&app.drain_published())[0];
    app.state.queue.insert_at(alice.id, placeholder, 0).await.unwrap();

    let refill = app
        .state
        .refill
        .on_sourcing_failed(placeholder)
        .await
        .unwrap()
        .expect("owner should be resolved");

    assert!(app.queue_song_ids(&alice).await.is_empty());
    let err = app.state.catalog.find_by_id(placeholder).await.unwrap_err();
    assert!(err.is_not_found());

    assert!(refill.wait().await);
    assert_eq!(sourcing_requests(&app.drain_published()).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_completions_racing_manual_checks_do_not_over_reserve() {
    let mut app = TestApp::new().await;
    let refill = Arc::clone(&app.state.refill);
    let policy = refill.manual_policy();

    for round in 0..5 {
        let username = format!("listener-{round}");
        let user = app.create_user(&username).await;
        for i in 0..5 {
            let song = create_playable_song(&app.pool, &format!("r{round}-{i}")).await;
            app.state.queue.append(user.id, song).await.unwrap();
        }

        assert!(refill.ensure_minimum_size(&username, policy).await.unwrap());
        let requests = sourcing_requests(&app.drain_published());
        assert_eq!(requests.len(), 5);

        let mut chained = Vec::new();
        for song_id in requests {
            let path = format!("/music/{song_id}.mp3");
            let (completed, checked) = tokio::join!(
                refill.on_sourcing_completed(song_id, &path),
                refill.ensure_minimum_size(&username, policy),
            );
            chained.extend(completed.unwrap());
            assert!(checked.unwrap());

            let queued = app.state.queue.len(user.id).await.unwrap();
            let pending = app
                .state
                .catalog
                .pending_reservations(user.id, TTL)
                .await
                .unwrap();
            assert!(
                queued + pending <= 10,
                "round {round}: {queued} queued + {pending} pending"
            );
        }

        for check in chained {
            assert!(check.wait().await);
        }

        assert!(sourcing_requests(&app.drain_published()).is_empty());
        assert_eq!(app.state.queue.len(user.id).await.unwrap(), 10);
    }
}

#[tokio::test]
async fn test_failure_for_playable_song_is_ignored() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice").await;
    let song = create_playable_song(&app.pool, "done").await;
    app.state.directory.link_song(alice.id, song).await.unwrap();

    let refill = app.state.refill.on_sourcing_failed(song).await.unwrap();

    assert!(refill.is_none());
    assert!(app.state.catalog.find_by_id(song).await.unwrap().is_playable());
    assert!(app.state.directory.owner_of(song).await.unwrap().is_some());
}

#[tokio::test]
async fn test_skip_by_entry_id_removes_that_entry() {
    let mut app = TestApp::new().await;
    let alice = app.create_user("alice").await;
    let song = create_playable_song(&app.pool, "twice").await;
    let other = create_playable_song(&app.pool, "other").await;

    app.state.queue.append(alice.id, song).await.unwrap();
    app.state.queue.append(alice.id, other).await.unwrap();
    let second = app.state.queue.insert_at(alice.id, song, 2).await.unwrap();

    let refill = app
        .state
        .refill
        .on_consumed(&alice, song, Some(second.id), Consumption::Skipped)
        .await
        .unwrap();

    assert_eq!(app.queue_song_ids(&alice).await, vec![song, other]);

    let history = refrain_storage::history::get(&app.pool, alice.id, song)
        .await
        .unwrap()
        .unwrap();
    assert!(history.skipped);

    assert!(refill.wait().await);
    assert_eq!(sourcing_requests(&app.drain_published()).len(), 8);
}

#[tokio::test]
async fn test_finish_without_entry_id_removes_first_match() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice").await;
    let song = create_playable_song(&app.pool, "played").await;
    let other = create_playable_song(&app.pool, "other").await;

    app.state.queue.append(alice.id, song).await.unwrap();
    app.state.queue.append(alice.id, other).await.unwrap();

    for _ in 0..2 {
        app.state
            .refill
            .on_consumed(&alice, song, None, Consumption::Finished)
            .await
            .unwrap()
            .wait()
            .await;
    }

    assert_eq!(app.queue_song_ids(&alice).await, vec![other]);

    let history = refrain_storage::history::get(&app.pool, alice.id, song)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(history.listen_count, 2);
    assert!(history.first_listen_at.is_some());
}

#[tokio::test]
async fn test_one_failed_reservation_does_not_stop_the_batch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut producer = MockProducer::new();
    {
        let calls = Arc::clone(&calls);
        producer.expect_send().times(3).returning(move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 1 {
                Err(RefrainError::messaging("broker down"))
            } else {
                Ok(())
            }
        });
    }

    let mut config = test_config();
    config.refill.min_size = 3;
    let (state, _pool, _temp_dir) = build_state(Arc::new(producer), &config).await;
    let alice = state.directory.create_user("alice", None).await.unwrap();

    let policy = state.refill.manual_policy();
    let success = state
        .refill
        .ensure_minimum_size("alice", policy)
        .await
        .unwrap();

    assert!(!success);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // The unsent reservation is released and no longer counts as in flight
    assert_eq!(
        state.catalog.pending_reservations(alice.id, TTL).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn test_unsent_reservations_do_not_block_later_checks() {
    let broker_up = Arc::new(AtomicBool::new(false));
    let sent = Arc::new(AtomicUsize::new(0));
    let mut producer = MockProducer::new();
    {
        let broker_up = Arc::clone(&broker_up);
        let sent = Arc::clone(&sent);
        producer.expect_send().returning(move |_| {
            if broker_up.load(Ordering::SeqCst) {
                sent.fetch_add(1, Ordering::SeqCst);
                Ok(())
            } else {
                Err(RefrainError::messaging("broker down"))
            }
        });
    }

    let mut config = test_config();
    config.refill.min_size = 2;
    let (state, _pool, _temp_dir) = build_state(Arc::new(producer), &config).await;
    let alice = state.directory.create_user("alice", None).await.unwrap();
    let policy = state.refill.manual_policy();

    assert!(!state
        .refill
        .ensure_minimum_size("alice", policy)
        .await
        .unwrap());
    assert_eq!(
        state.catalog.pending_reservations(alice.id, TTL).await.unwrap(),
        0
    );

    broker_up.store(true, Ordering::SeqCst);

    assert!(state
        .refill
        .ensure_minimum_size("alice", policy)
        .await
        .unwrap());
    assert_eq!(sent.load(Ordering::SeqCst), 2);
    assert_eq!(
        state.catalog.pending_reservations(alice.id, TTL).await.unwrap(),
        2
    );

    // The unsent placeholders are orphans for the startup purge
    assert_eq!(state.catalog.list_invalid().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_like_survives_publish_failure() {
    let mut producer = MockProducer::new();
    producer
        .expect_send()
        .times(1)
        .returning(|_| Err(RefrainError::messaging("broker down")));

    let config = test_config();
    let (state, pool, _temp_dir) = build_state(Arc::new(producer), &config).await;
    let alice = state.directory.create_user("alice", None).await.unwrap();
    let song = create_playable_song(&pool, "liked").await;

    state.directory.mark_liked(&alice, song, true).await.unwrap();

    assert!(state.directory.is_liked(&alice, song).await.unwrap());
}
