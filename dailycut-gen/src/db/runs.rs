//! Generation run state persistence

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::GenerationRun;

/// Save (upsert) a generation run. Called on every state transition so
/// a crashed run leaves its last known stage behind for diagnostics.
pub async fn save_run(pool: &SqlitePool, run: &GenerationRun) -> Result<()> {
    let state = serde_json::to_string(&run.state)?;
    let failure = match &run.failure {
        Some(f) => Some(serde_json::to_string(f)?),
        None => None,
    };

    sqlx::query(
        r#"
        INSERT INTO generation_runs (
            run_id, owner_id, day, state, failure, started_at, ended_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(run_id) DO UPDATE SET
            state = excluded.state,
            failure = excluded.failure,
            ended_at = excluded.ended_at
        "#,
    )
    .bind(run.run_id.to_string())
    .bind(run.owner_id.to_string())
    .bind(run.day.to_string())
    .bind(state)
    .bind(failure)
    .bind(run.started_at.to_rfc3339())
    .bind(run.ended_at.map(|dt| dt.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a generation run by id
pub async fn load_run(pool: &SqlitePool, run_id: Uuid) -> Result<Option<GenerationRun>> {
    let row = sqlx::query(
        r#"
        SELECT run_id, owner_id, day, state, failure, started_at, ended_at
        FROM generation_runs
        WHERE run_id = ?
        "#,
    )
    .bind(run_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let run_id_str: String = row.get("run_id");
    let owner_id: String = row.get("owner_id");
    let day: String = row.get("day");
    let state: String = row.get("state");
    let failure: Option<String> = row.get("failure");
    let started_at: String = row.get("started_at");
    let ended_at: Option<String> = row.get("ended_at");

    Ok(Some(GenerationRun {
        run_id: Uuid::parse_str(&run_id_str)?,
        owner_id: Uuid::parse_str(&owner_id)?,
        day: NaiveDate::parse_from_str(&day, "%Y-%m-%d")?,
        state: serde_json::from_str(&state)?,
        failure: match failure {
            Some(f) => Some(serde_json::from_str(&f)?),
            None => None,
        },
        started_at: DateTime::parse_from_rfc3339(&started_at)?.with_timezone(&Utc),
        ended_at: match ended_at {
            Some(e) => Some(DateTime::parse_from_rfc3339(&e)?.with_timezone(&Utc)),
            None => None,
        },
    }))
}
