//! Daily quota database operations
//!
//! The per-(owner, day) quota row carries the success count and the
//! in-flight lock. All lock handling uses conditional UPDATEs so that
//! multiple orchestrator instances sharing one database stay correct -
//! there is no in-process lock state.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a lock acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Lock taken; holder token is recorded in the row
    Acquired,
    /// The day's success count has reached the limit
    LimitReached,
    /// A live (non-stale) lock is held by another request
    InFlight,
}

/// Ensure the quota row for `(owner, day)` exists
pub async fn ensure_row(pool: &SqlitePool, owner_id: Uuid, day: NaiveDate) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_quota (owner_id, day, count)
        VALUES (?, ?, 0)
        ON CONFLICT(owner_id, day) DO NOTHING
        "#,
    )
    .bind(owner_id.to_string())
    .bind(day.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Try to take the in-flight lock for `(owner, day)`.
///
/// A single conditional UPDATE enforces both invariants at once: the
/// success count must be under `limit`, and the lock must be free or
/// stale (held longer than `stale_horizon`). When the update misses,
/// the row is read back to classify the rejection.
pub async fn try_acquire(
    pool: &SqlitePool,
    owner_id: Uuid,
    day: NaiveDate,
    limit: u32,
    holder: Uuid,
    stale_horizon: Duration,
) -> Result<AcquireOutcome> {
    ensure_row(pool, owner_id, day).await?;

    let now = Utc::now();
    let stale_cutoff = now - chrono::Duration::from_std(stale_horizon)?;

    let result = sqlx::query(
        r#"
        UPDATE daily_quota
        SET lock_holder = ?, lock_acquired_at = ?
        WHERE owner_id = ? AND day = ?
          AND count < ?
          AND (lock_holder IS NULL OR lock_acquired_at <= ?)
        "#,
    )
    .bind(holder.to_string())
    .bind(now.to_rfc3339())
    .bind(owner_id.to_string())
    .bind(day.to_string())
    .bind(limit as i64)
    .bind(stale_cutoff.to_rfc3339())
    .execute(pool)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(AcquireOutcome::Acquired);
    }

    let count = get_count(pool, owner_id, day).await?;
    if count >= limit as i64 {
        Ok(AcquireOutcome::LimitReached)
    } else {
        Ok(AcquireOutcome::InFlight)
    }
}

/// Release the lock if still held by `holder`. Idempotent: releasing a
/// lock that was already released or displaced is a no-op.
pub async fn release(pool: &SqlitePool, owner_id: Uuid, day: NaiveDate, holder: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE daily_quota
        SET lock_holder = NULL, lock_acquired_at = NULL
        WHERE owner_id = ? AND day = ? AND lock_holder = ?
        "#,
    )
    .bind(owner_id.to_string())
    .bind(day.to_string())
    .bind(holder.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Increment the success count for `(owner, day)`
pub async fn increment_count(pool: &SqlitePool, owner_id: Uuid, day: NaiveDate) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE daily_quota
        SET count = count + 1
        WHERE owner_id = ? AND day = ?
        "#,
    )
    .bind(owner_id.to_string())
    .bind(day.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Current success count for `(owner, day)`; 0 when no row exists
pub async fn get_count(pool: &SqlitePool, owner_id: Uuid, day: NaiveDate) -> Result<i64> {
    let count: Option<i64> =
        sqlx::query_scalar("SELECT count FROM daily_quota WHERE owner_id = ? AND day = ?")
            .bind(owner_id.to_string())
            .bind(day.to_string())
            .fetch_optional(pool)
            .await?;

    Ok(count.unwrap_or(0))
}

/// Current lock holder for `(owner, day)`, if any
pub async fn get_lock_holder(
    pool: &SqlitePool,
    owner_id: Uuid,
    day: NaiveDate,
) -> Result<Option<Uuid>> {
    let row = sqlx::query("SELECT lock_holder FROM daily_quota WHERE owner_id = ? AND day = ?")
        .bind(owner_id.to_string())
        .bind(day.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let holder: Option<String> = row.get("lock_holder");
            Ok(match holder {
                Some(s) => Some(Uuid::parse_str(&s)?),
                None => None,
            })
        }
        None => Ok(None),
    }
}
