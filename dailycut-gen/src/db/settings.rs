//! Settings database operations
//!
//! Key-value accessors for the settings table. Holds per-owner
//! calendar access tokens and optional provider key overrides.

use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use dailycut_common::{Error, Result};

/// Get an owner's calendar access token, if connected
pub async fn get_calendar_token(db: &Pool<Sqlite>, owner_id: Uuid) -> Result<Option<String>> {
    get_setting::<String>(db, &format!("calendar_token:{}", owner_id)).await
}

/// Store an owner's calendar access token
pub async fn set_calendar_token(db: &Pool<Sqlite>, owner_id: Uuid, token: String) -> Result<()> {
    set_setting(db, &format!("calendar_token:{}", owner_id), token).await
}

/// Generic setting getter
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
{
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Internal(format!("Failed to parse setting '{}'", key))),
        None => Ok(None),
    }
}

/// Generic setting setter
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_get_missing_setting_is_none() {
        let pool = test_pool().await;
        let value: Option<String> = get_setting(&pool, "nope").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_set_and_get_overwrites() {
        let pool = test_pool().await;
        set_setting(&pool, "k", "v1").await.unwrap();
        set_setting(&pool, "k", "v2").await.unwrap();

        let value: Option<String> = get_setting(&pool, "k").await.unwrap();
        assert_eq!(value.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_calendar_token_is_per_owner() {
        let pool = test_pool().await;
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        set_calendar_token(&pool, a, "token-a".to_string()).await.unwrap();

        assert_eq!(
            get_calendar_token(&pool, a).await.unwrap().as_deref(),
            Some("token-a")
        );
        assert!(get_calendar_token(&pool, b).await.unwrap().is_none());
    }
}
