//! Song database operations

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::Song;

fn song_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Song> {
    let guid: String = row.get("guid");
    let owner_id: String = row.get("owner_id");
    let album_id: String = row.get("album_id");
    let attempts_json: String = row.get("provider_attempts");
    let created_at: String = row.get("created_at");

    Ok(Song {
        guid: Uuid::parse_str(&guid)?,
        owner_id: Uuid::parse_str(&owner_id)?,
        album_id: Uuid::parse_str(&album_id)?,
        title: row.get("title"),
        description: row.get("description"),
        lyrics: row.get("lyrics"),
        genre_tags: row.get("genre_tags"),
        audio_ref: row.get("audio_ref"),
        share_token: row.get("share_token"),
        provider_attempts: serde_json::from_str(&attempts_json)?,
        generation_seconds: row.get("generation_seconds"),
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
    })
}

const SELECT_SONG: &str = r#"
    SELECT guid, owner_id, album_id, title, description, lyrics, genre_tags,
           audio_ref, share_token, provider_attempts, generation_seconds, created_at
    FROM songs
"#;

/// Save a new song record
pub async fn save_song(pool: &SqlitePool, song: &Song) -> Result<()> {
    let attempts_json = serde_json::to_string(&song.provider_attempts)?;

    sqlx::query(
        r#"
        INSERT INTO songs (
            guid, owner_id, album_id, title, description, lyrics, genre_tags,
            audio_ref, share_token, provider_attempts, generation_seconds, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(song.guid.to_string())
    .bind(song.owner_id.to_string())
    .bind(song.album_id.to_string())
    .bind(&song.title)
    .bind(&song.description)
    .bind(&song.lyrics)
    .bind(&song.genre_tags)
    .bind(&song.audio_ref)
    .bind(&song.share_token)
    .bind(attempts_json)
    .bind(song.generation_seconds)
    .bind(song.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load song by guid
pub async fn load_song(pool: &SqlitePool, guid: Uuid) -> Result<Option<Song>> {
    let row = sqlx::query(&format!("{} WHERE guid = ?", SELECT_SONG))
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(song_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Load song by its public share token
pub async fn load_song_by_share_token(pool: &SqlitePool, token: &str) -> Result<Option<Song>> {
    let row = sqlx::query(&format!("{} WHERE share_token = ?", SELECT_SONG))
        .bind(token)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(song_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Whether a share token is already taken
pub async fn share_token_exists(pool: &SqlitePool, token: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE share_token = ?")
        .bind(token)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// List an owner's songs, newest first
pub async fn list_songs(
    pool: &SqlitePool,
    owner_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!(
        "{} WHERE owner_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
        SELECT_SONG
    ))
    .bind(owner_id.to_string())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(song_from_row).collect()
}

/// List the songs of one album, oldest first
pub async fn list_songs_for_album(pool: &SqlitePool, album_id: Uuid) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!(
        "{} WHERE album_id = ? ORDER BY created_at ASC",
        SELECT_SONG
    ))
    .bind(album_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(song_from_row).collect()
}

/// Load the first song an owner generated on a given UTC day, if any
pub async fn load_song_for_day(
    pool: &SqlitePool,
    owner_id: Uuid,
    day: NaiveDate,
) -> Result<Option<Song>> {
    let row = sqlx::query(&format!(
        "{} WHERE owner_id = ? AND date(created_at) = ? ORDER BY created_at ASC LIMIT 1",
        SELECT_SONG
    ))
    .bind(owner_id.to_string())
    .bind(day.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(song_from_row(&row)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::executor::{AttemptOutcome, TierAttempt};

    fn test_song(owner_id: Uuid, token: &str) -> Song {
        Song {
            guid: Uuid::new_v4(),
            owner_id,
            album_id: Uuid::new_v4(),
            title: "Morning Light".to_string(),
            description: "A song about the day ahead".to_string(),
            lyrics: "[verse]\nsun comes up\n\n[chorus]\nhere we go\n".to_string(),
            genre_tags: "indie-pop piano uplifting female warm vocal".to_string(),
            audio_ref: "assets/audio/test.wav".to_string(),
            share_token: token.to_string(),
            provider_attempts: vec![TierAttempt {
                capability: "compose".to_string(),
                tier: "openai".to_string(),
                outcome: AttemptOutcome::Succeeded,
                elapsed_ms: 1200,
            }],
            generation_seconds: 431.5,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_song_roundtrips_attempts() {
        let pool = test_pool().await;
        let owner_id = Uuid::new_v4();
        let song = test_song(owner_id, "tok000000001");

        save_song(&pool, &song).await.expect("Failed to save song");

        let loaded = load_song(&pool, song.guid)
            .await
            .expect("Failed to load song")
            .expect("Song not found");

        assert_eq!(loaded.title, "Morning Light");
        assert_eq!(loaded.provider_attempts.len(), 1);
        assert_eq!(loaded.provider_attempts[0].tier, "openai");
    }

    #[tokio::test]
    async fn test_share_token_lookup_and_uniqueness() {
        let pool = test_pool().await;
        let song = test_song(Uuid::new_v4(), "tok000000002");
        save_song(&pool, &song).await.unwrap();

        assert!(share_token_exists(&pool, "tok000000002").await.unwrap());
        assert!(!share_token_exists(&pool, "tok000000003").await.unwrap());

        let loaded = load_song_by_share_token(&pool, "tok000000002")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.guid, song.guid);

        // Duplicate token violates the uniqueness constraint
        let dupe = test_song(Uuid::new_v4(), "tok000000002");
        assert!(save_song(&pool, &dupe).await.is_err());
    }

    #[tokio::test]
    async fn test_load_song_for_day() {
        let pool = test_pool().await;
        let owner_id = Uuid::new_v4();
        let song = test_song(owner_id, "tok000000004");
        save_song(&pool, &song).await.unwrap();

        let today = song.created_at.date_naive();
        let found = load_song_for_day(&pool, owner_id, today).await.unwrap();
        assert!(found.is_some());

        let other_day = today.pred_opt().unwrap();
        let missing = load_song_for_day(&pool, owner_id, other_day).await.unwrap();
        assert!(missing.is_none());
    }
}
