/// Song like/unlike routes
use crate::{error::Result, middleware::AuthenticatedUser, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use refrain_core::SongId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct SongLikedResponse {
    pub liked: bool,
}

/// GET /api/songs/:id/liked
pub async fn get_liked(
    Path(song_id): Path<SongId>,
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<SongLikedResponse>> {
    let user = app_state.directory.get_by_username(auth.username()).await?;
    app_state.catalog.find_by_id(song_id).await?;

    let liked = app_state.directory.is_liked(&user, song_id).await?;
    Ok(Json(SongLikedResponse { liked }))
}

/// POST /api/songs/:id/liked
pub async fn like(
    Path(song_id): Path<SongId>,
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<StatusCode> {
    set_liked(&app_state, &auth, song_id, true).await
}

/// POST /api/songs/:id/unliked
pub async fn unlike(
    Path(song_id): Path<SongId>,
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<StatusCode> {
    set_liked(&app_state, &auth, song_id, false).await
}

async fn set_liked(
    app_state: &AppState,
    auth: &AuthenticatedUser,
    song_id: SongId,
    liked: bool,
) -> Result<StatusCode> {
    let user = app_state.directory.get_by_username(auth.username()).await?;
    app_state.catalog.find_by_id(song_id).await?;

    app_state.directory.mark_liked(&user, song_id, liked).await?;
    Ok(StatusCode::OK)
}
