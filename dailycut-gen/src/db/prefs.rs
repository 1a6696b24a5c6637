//! User preference database operations

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::UserPreferences;

/// Load an owner's preferences, falling back to the documented
/// defaults when no row exists (new users get technology/business
/// news and uplifting female-vocal pop).
pub async fn load_preferences(pool: &SqlitePool, owner_id: Uuid) -> Result<UserPreferences> {
    let row = sqlx::query(
        r#"
        SELECT news_categories, music_genres, vocal_preference, mood_preference, location
        FROM user_preferences
        WHERE owner_id = ?
        "#,
    )
    .bind(owner_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let categories: String = row.get("news_categories");
            let genres: String = row.get("music_genres");

            Ok(UserPreferences {
                news_categories: serde_json::from_str(&categories)?,
                music_genres: serde_json::from_str(&genres)?,
                vocal_preference: row.get("vocal_preference"),
                mood_preference: row.get("mood_preference"),
                location: row.get("location"),
            })
        }
        None => {
            tracing::debug!(owner_id = %owner_id, "No stored preferences, using defaults");
            Ok(UserPreferences::default())
        }
    }
}

/// Upsert an owner's preferences
pub async fn save_preferences(
    pool: &SqlitePool,
    owner_id: Uuid,
    prefs: &UserPreferences,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_preferences (
            owner_id, news_categories, music_genres,
            vocal_preference, mood_preference, location, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(owner_id) DO UPDATE SET
            news_categories = excluded.news_categories,
            music_genres = excluded.music_genres,
            vocal_preference = excluded.vocal_preference,
            mood_preference = excluded.mood_preference,
            location = excluded.location,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(owner_id.to_string())
    .bind(serde_json::to_string(&prefs.news_categories)?)
    .bind(serde_json::to_string(&prefs.music_genres)?)
    .bind(&prefs.vocal_preference)
    .bind(&prefs.mood_preference)
    .bind(&prefs.location)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_missing_row_yields_defaults() {
        let pool = test_pool().await;
        let prefs = load_preferences(&pool, Uuid::new_v4()).await.unwrap();
        assert_eq!(prefs.news_categories, vec!["technology", "business"]);
        assert_eq!(prefs.vocal_preference, "female");
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let pool = test_pool().await;
        let owner_id = Uuid::new_v4();

        let prefs = UserPreferences {
            news_categories: vec!["science".to_string()],
            music_genres: vec!["jazz".to_string(), "r&b".to_string()],
            vocal_preference: "male".to_string(),
            mood_preference: "calm".to_string(),
            location: Some("Berlin".to_string()),
        };
        save_preferences(&pool, owner_id, &prefs).await.unwrap();

        let loaded = load_preferences(&pool, owner_id).await.unwrap();
        assert_eq!(loaded.news_categories, vec!["science"]);
        assert_eq!(loaded.music_genres, vec!["jazz", "r&b"]);
        assert_eq!(loaded.location.as_deref(), Some("Berlin"));
    }
}
