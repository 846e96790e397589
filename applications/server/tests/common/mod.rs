//! Common test utilities and fixtures
//!
//! Every test gets its own SQLite file in a temp directory and a channel
//! producer that records outbound messages.

#![allow(dead_code)]

use chrono::Utc;
use refrain_core::{EventProducer, Song, SongId, User};
use refrain_messaging::{ChannelProducer, PublishedRecord};
use refrain_server::{config::ServerConfig, state::AppState};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

pub const TEST_SECRET: &str = "test-secret-key";

/// A fully wired service over a temporary database
pub struct TestApp {
    pub state: AppState,
    pub pool: SqlitePool,
    pub published: UnboundedReceiver<PublishedRecord>,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        let (producer, published) = ChannelProducer::new(config.messaging.topics.clone());
        let (state, pool, temp_dir) = build_state(Arc::new(producer), &config).await;

        Self {
            state,
            pool,
            published,
            _temp_dir: temp_dir,
        }
    }

    /// Everything published so far
    pub fn drain_published(&mut self) -> Vec<PublishedRecord> {
        let mut records = Vec::new();
        while let Ok(record) = self.published.try_recv() {
            records.push(record);
        }
        records
    }

    pub async fn create_user(&self, username: &str) -> User {
        self.state
            .directory
            .create_user(username, None)
            .await
            .expect("Failed to create test user")
    }

    pub async fn queue_song_ids(&self, user: &User) -> Vec<SongId> {
        self.state
            .queue
            .entries(user.id)
            .await
            .expect("Failed to read queue")
            .into_iter()
            .map(|entry| entry.song_id)
            .collect()
    }
}

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.ingress.workers = 2;
    config
}

/// Wire an `AppState` with any producer
pub async fn build_state(
    producer: Arc<dyn EventProducer>,
    config: &ServerConfig,
) -> (AppState, SqlitePool, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_url = format!("sqlite://{}", temp_dir.path().join("test.db").display());

    let pool = refrain_storage::create_pool(&db_url)
        .await
        .expect("Failed to create pool");
    refrain_storage::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let state = AppState::new(pool.clone(), producer, config);
    (state, pool, temp_dir)
}

/// Insert a playable song
pub async fn create_playable_song(pool: &SqlitePool, title: &str) -> SongId {
    let song = Song {
        title: Some(title.to_string()),
        artist: Some("Test Artist".to_string()),
        url: Some(format!("/music/{title}.mp3")),
        created_at: Utc::now(),
        ..Song::placeholder(SongId::generate())
    };
    refrain_storage::songs::insert(pool, &song)
        .await
        .expect("Failed to insert song");
    song.id
}

/// Song ids of every sourcing request in `records`
pub fn sourcing_requests(records: &[PublishedRecord]) -> Vec<SongId> {
    records
        .iter()
        .filter_map(|record| match &record.message {
            refrain_core::OutboundMessage::SourcingRequest(request) => Some(request.song_id),
            _ => None,
        })
        .collect()
}
