//! Album read endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Album, Song};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AlbumListQuery {
    pub owner_id: Uuid,
    /// When set, returns just the album for this week (its Monday)
    pub week_start: Option<NaiveDate>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct AlbumListResponse {
    pub albums: Vec<Album>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct AlbumDetailResponse {
    #[serde(flatten)]
    pub album: Album,
    pub songs: Vec<Song>,
}

/// GET /albums - paginated list, newest week first; `week_start`
/// narrows to one week's album
pub async fn list_albums(
    State(state): State<AppState>,
    Query(query): Query<AlbumListQuery>,
) -> ApiResult<Json<AlbumListResponse>> {
    let albums = match query.week_start {
        Some(week_start) => {
            db::albums::load_album_by_week(&state.db, query.owner_id, week_start)
                .await?
                .into_iter()
                .collect()
        }
        None => {
            let limit = query.limit.clamp(1, 100);
            db::albums::list_albums(&state.db, query.owner_id, limit, query.offset.max(0)).await?
        }
    };
    let total = albums.len();
    Ok(Json(AlbumListResponse { albums, total }))
}

/// GET /albums/:id - album with its songs in creation order
pub async fn get_album(
    State(state): State<AppState>,
    Path(album_id): Path<Uuid>,
) -> ApiResult<Json<AlbumDetailResponse>> {
    let album = db::albums::load_album(&state.db, album_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("album {}", album_id)))?;
    let songs = db::songs::list_songs_for_album(&state.db, album_id).await?;

    Ok(Json(AlbumDetailResponse { album, songs }))
}

/// Build album routes
pub fn album_routes() -> Router<AppState> {
    Router::new()
        .route("/albums", get(list_albums))
        .route("/albums/:id", get(get_album))
}
