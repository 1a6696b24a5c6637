//! Album database operations

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::Album;
use crate::models::album::SONGS_PER_ALBUM;

fn album_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Album> {
    let guid: String = row.get("guid");
    let owner_id: String = row.get("owner_id");
    let week_start: String = row.get("week_start");
    let week_end: String = row.get("week_end");
    let created_at: String = row.get("created_at");
    let is_complete: i64 = row.get("is_complete");

    Ok(Album {
        guid: Uuid::parse_str(&guid)?,
        owner_id: Uuid::parse_str(&owner_id)?,
        name: row.get("name"),
        week_start: NaiveDate::parse_from_str(&week_start, "%Y-%m-%d")?,
        week_end: NaiveDate::parse_from_str(&week_end, "%Y-%m-%d")?,
        vinyl_disk_ref: row.get("vinyl_disk_ref"),
        song_count: row.get("song_count"),
        is_complete: is_complete != 0,
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
    })
}

/// Insert a new album. Ignores the insert if an album for the same
/// `(owner_id, week_start)` already exists, so concurrent creators
/// converge on one row; callers re-load after insert.
pub async fn insert_album(pool: &SqlitePool, album: &Album) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO albums (
            guid, owner_id, name, week_start, week_end,
            vinyl_disk_ref, song_count, is_complete, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(owner_id, week_start) DO NOTHING
        "#,
    )
    .bind(album.guid.to_string())
    .bind(album.owner_id.to_string())
    .bind(&album.name)
    .bind(album.week_start.to_string())
    .bind(album.week_end.to_string())
    .bind(&album.vinyl_disk_ref)
    .bind(album.song_count)
    .bind(album.is_complete as i64)
    .bind(album.created_at.to_rfc3339())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load album by owner and week start
pub async fn load_album_by_week(
    pool: &SqlitePool,
    owner_id: Uuid,
    week_start: NaiveDate,
) -> Result<Option<Album>> {
    let row = sqlx::query(
        r#"
        SELECT guid, owner_id, name, week_start, week_end,
               vinyl_disk_ref, song_count, is_complete, created_at
        FROM albums
        WHERE owner_id = ? AND week_start = ?
        "#,
    )
    .bind(owner_id.to_string())
    .bind(week_start.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(album_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Load album by guid
pub async fn load_album(pool: &SqlitePool, guid: Uuid) -> Result<Option<Album>> {
    let row = sqlx::query(
        r#"
        SELECT guid, owner_id, name, week_start, week_end,
               vinyl_disk_ref, song_count, is_complete, created_at
        FROM albums
        WHERE guid = ?
        "#,
    )
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(album_from_row(&row)?)),
        None => Ok(None),
    }
}

/// List an owner's albums, newest week first
pub async fn list_albums(
    pool: &SqlitePool,
    owner_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Album>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, owner_id, name, week_start, week_end,
               vinyl_disk_ref, song_count, is_complete, created_at
        FROM albums
        WHERE owner_id = ?
        ORDER BY week_start DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(owner_id.to_string())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(album_from_row).collect()
}

/// Compare-and-set the vinyl disk reference.
///
/// Only succeeds when the reference is still NULL, so exactly one of
/// several concurrent generators wins; the others must re-read and
/// reuse the winner's artwork. Returns whether this caller won.
pub async fn set_vinyl_disk_ref(pool: &SqlitePool, guid: Uuid, disk_ref: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE albums
        SET vinyl_disk_ref = ?, updated_at = ?
        WHERE guid = ? AND vinyl_disk_ref IS NULL
        "#,
    )
    .bind(disk_ref)
    .bind(Utc::now().to_rfc3339())
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Increment the song count, flipping `is_complete` once the album
/// reaches its seventh song. Returns the updated album.
pub async fn record_song_added(pool: &SqlitePool, guid: Uuid) -> Result<Album> {
    sqlx::query(
        r#"
        UPDATE albums
        SET song_count = song_count + 1,
            is_complete = CASE WHEN song_count + 1 >= ? THEN 1 ELSE 0 END,
            updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(SONGS_PER_ALBUM)
    .bind(Utc::now().to_rfc3339())
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    load_album(pool, guid)
        .await?
        .ok_or_else(|| anyhow::anyhow!("album {} vanished during count update", guid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn test_album(owner_id: Uuid) -> Album {
        Album::new(
            owner_id,
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 16).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_load_album() {
        let pool = test_pool().await;
        let owner_id = Uuid::new_v4();
        let album = test_album(owner_id);

        insert_album(&pool, &album).await.expect("Failed to insert album");

        let loaded = load_album_by_week(&pool, owner_id, album.week_start)
            .await
            .expect("Failed to load album")
            .expect("Album not found");

        assert_eq!(loaded.guid, album.guid);
        assert_eq!(loaded.name, album.name);
        assert!(loaded.vinyl_disk_ref.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_week_insert_is_ignored() {
        let pool = test_pool().await;
        let owner_id = Uuid::new_v4();
        let first = test_album(owner_id);
        let second = test_album(owner_id);

        insert_album(&pool, &first).await.unwrap();
        insert_album(&pool, &second).await.unwrap();

        let loaded = load_album_by_week(&pool, owner_id, first.week_start)
            .await
            .unwrap()
            .unwrap();
        // First writer's row survives
        assert_eq!(loaded.guid, first.guid);
    }

    #[tokio::test]
    async fn test_vinyl_disk_ref_set_exactly_once() {
        let pool = test_pool().await;
        let album = test_album(Uuid::new_v4());
        insert_album(&pool, &album).await.unwrap();

        let won = set_vinyl_disk_ref(&pool, album.guid, "assets/artwork/a.png")
            .await
            .unwrap();
        assert!(won);

        let lost = set_vinyl_disk_ref(&pool, album.guid, "assets/artwork/b.png")
            .await
            .unwrap();
        assert!(!lost);

        let loaded = load_album(&pool, album.guid).await.unwrap().unwrap();
        assert_eq!(loaded.vinyl_disk_ref.as_deref(), Some("assets/artwork/a.png"));
    }

    #[tokio::test]
    async fn test_completion_at_seven_songs() {
        let pool = test_pool().await;
        let album = test_album(Uuid::new_v4());
        insert_album(&pool, &album).await.unwrap();

        for expected in 1..=7i64 {
            let updated = record_song_added(&pool, album.guid).await.unwrap();
            assert_eq!(updated.song_count, expected);
            assert_eq!(updated.is_complete, expected == 7);
        }
    }
}
