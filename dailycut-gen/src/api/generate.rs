//! Generation endpoint - the entry point into the pipeline

use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dailycut_common::time;

use crate::error::ApiResult;
use crate::models::{Album, Song};
use crate::AppState;

/// Request body for POST /songs/generate
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub owner_id: Uuid,
    /// Timestamp the generation counts against; defaults to now (UTC)
    pub date: Option<DateTime<Utc>>,
}

/// Response for a successful generation
#[derive(Debug, Serialize)]
pub struct SongResponse {
    pub song: Song,
    pub album_name: String,
    pub album_vinyl_disk_ref: Option<String>,
    pub album: Album,
}

/// POST /songs/generate
///
/// Runs the whole pipeline synchronously - with audio synthesis in the
/// loop this call can take minutes. Rejections come back as 409/429,
/// pipeline failures as 502/504.
pub async fn generate_song(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Json<SongResponse>> {
    let date = request.date.unwrap_or_else(time::now);
    let cancel = state.shutdown.child_token();

    let generated = match state.pipeline.generate(request.owner_id, date, cancel).await {
        Ok(generated) => generated,
        Err(error) => {
            *state.last_error.write().await = Some(error.to_string());
            return Err(error.into());
        }
    };

    Ok(Json(SongResponse {
        album_name: generated.album.name.clone(),
        album_vinyl_disk_ref: generated.album.vinyl_disk_ref.clone(),
        song: generated.song,
        album: generated.album,
    }))
}

/// Build generation routes
pub fn generate_routes() -> Router<AppState> {
    Router::new().route("/songs/generate", post(generate_song))
}
