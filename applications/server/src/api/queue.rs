/// Queue API routes
use crate::{
    error::{Result, ServerError},
    middleware::AuthenticatedUser,
    services::Consumption,
    state::AppState,
};
use axum::{extract::State, http::StatusCode, Json};
use refrain_core::{QueueEntryId, QueuedSong, RefrainError, SongId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueResponse {
    pub songs: Vec<QueuedSong>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertSongRequest {
    pub song_id: SongId,
    pub position: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedSongRequest {
    pub song_id: SongId,
    #[serde(default)]
    pub queue_entry_id: Option<QueueEntryId>,
}

/// GET /api/queue
///
/// Also starts a refill check in the background; the response does not
/// wait for it.
pub async fn get_queue(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<QueueResponse>> {
    let user = app_state.directory.get_by_username(auth.username()).await?;
    let songs = app_state.queue.get_or_create(&user).await?;

    let policy = app_state.refill.manual_policy();
    drop(app_state.refill.schedule(user.username, policy));

    Ok(Json(QueueResponse { songs }))
}

/// POST /api/queue
pub async fn insert_song(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Json(req): Json<InsertSongRequest>,
) -> Result<StatusCode> {
    let user = app_state.directory.get_by_username(auth.username()).await?;
    let song = app_state.catalog.find_by_id(req.song_id).await?;
    if !song.is_playable() {
        return Err(RefrainError::invalid_argument(format!(
            "song {} has not been sourced yet",
            song.id
        ))
        .into());
    }

    app_state
        .queue
        .insert_at(user.id, req.song_id, req.position)
        .await?;

    Ok(StatusCode::OK)
}

/// POST /api/queue/check
///
/// Runs the check in-request; 500 if any reservation failed.
pub async fn check_queue(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<StatusCode> {
    let policy = app_state.refill.manual_policy();
    let success = app_state
        .refill
        .ensure_minimum_size(auth.username(), policy)
        .await?;

    if success {
        Ok(StatusCode::OK)
    } else {
        Err(ServerError::Internal(format!(
            "refill for {} did not complete",
            auth.username()
        )))
    }
}

/// POST /api/queue/skipped
pub async fn song_skipped(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Json(req): Json<ConsumedSongRequest>,
) -> Result<StatusCode> {
    consume(&app_state, &auth, req, Consumption::Skipped).await
}

/// POST /api/queue/finished
pub async fn song_finished(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Json(req): Json<ConsumedSongRequest>,
) -> Result<StatusCode> {
    consume(&app_state, &auth, req, Consumption::Finished).await
}

async fn consume(
    app_state: &AppState,
    auth: &AuthenticatedUser,
    req: ConsumedSongRequest,
    consumption: Consumption,
) -> Result<StatusCode> {
    let user = app_state.directory.get_by_username(auth.username()).await?;

    let refill = app_state
        .refill
        .on_consumed(&user, req.song_id, req.queue_entry_id, consumption)
        .await?;
    drop(refill);

    Ok(StatusCode::OK)
}
