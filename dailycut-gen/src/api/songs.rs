//! Song read endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dailycut_common::time;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::Song;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub owner_id: Uuid,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SongListResponse {
    pub songs: Vec<Song>,
    pub total: usize,
}

/// GET /songs - paginated list, newest first
pub async fn list_songs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<SongListResponse>> {
    let limit = query.limit.clamp(1, 100);
    let songs = db::songs::list_songs(&state.db, query.owner_id, limit, query.offset.max(0)).await?;
    let total = songs.len();
    Ok(Json(SongListResponse { songs, total }))
}

/// GET /songs/today - today's song, or null when none exists yet
/// (a missing song for today is a valid state, not an error)
pub async fn get_today_song(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<Option<Song>>> {
    let today = time::day_key(time::now());
    let song = db::songs::load_song_for_day(&state.db, query.owner_id, today).await?;
    Ok(Json(song))
}

/// GET /songs/:id
pub async fn get_song(
    State(state): State<AppState>,
    Path(song_id): Path<Uuid>,
) -> ApiResult<Json<Song>> {
    let song = db::songs::load_song(&state.db, song_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("song {}", song_id)))?;
    Ok(Json(song))
}

/// GET /share/:token - public lookup by share token
pub async fn get_shared_song(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<Song>> {
    let song = db::songs::load_song_by_share_token(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::NotFound("shared song".to_string()))?;
    Ok(Json(song))
}

/// Build song routes
pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/songs", get(list_songs))
        .route("/songs/today", get(get_today_song))
        .route("/songs/:id", get(get_song))
        .route("/share/:token", get(get_shared_song))
}
