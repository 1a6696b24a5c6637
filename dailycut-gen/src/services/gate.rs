//! Daily generation gate
//!
//! Admission control for generation requests: at most `daily_limit`
//! successful songs per (owner, UTC day), and at most one in-flight
//! generation per (owner, day). The lock lives in the daily_quota
//! table, so concurrency is scoped per owner and survives process
//! restarts; an abandoned lock expires after the synthesis timeout
//! plus margin.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use uuid::Uuid;

use dailycut_common::config::GenerationConfig;

use crate::db::quota::{self, AcquireOutcome};
use crate::models::RejectionReason;

/// Proof of admission for one generation run. Carries the holder token
/// the release must present.
#[derive(Debug, Clone)]
pub struct LockHandle {
    pub owner_id: Uuid,
    pub day: NaiveDate,
    pub holder: Uuid,
}

pub struct DailyGate {
    db: SqlitePool,
    config: GenerationConfig,
}

impl DailyGate {
    pub fn new(db: SqlitePool, config: GenerationConfig) -> Self {
        Self { db, config }
    }

    /// Admit a generation request, taking the in-flight lock.
    ///
    /// `Ok(Err(reason))` is a client-correctable rejection; `Err` is an
    /// internal storage error.
    pub async fn admit(
        &self,
        owner_id: Uuid,
        day: NaiveDate,
    ) -> Result<std::result::Result<LockHandle, RejectionReason>> {
        let holder = Uuid::new_v4();
        let outcome = quota::try_acquire(
            &self.db,
            owner_id,
            day,
            self.config.daily_limit,
            holder,
            self.config.stale_lock_horizon(),
        )
        .await?;

        match outcome {
            AcquireOutcome::Acquired => {
                tracing::debug!(owner_id = %owner_id, %day, "Generation admitted");
                Ok(Ok(LockHandle { owner_id, day, holder }))
            }
            AcquireOutcome::LimitReached => {
                tracing::info!(owner_id = %owner_id, %day, "Generation rejected: daily limit");
                Ok(Err(RejectionReason::LimitReached))
            }
            AcquireOutcome::InFlight => {
                tracing::info!(owner_id = %owner_id, %day, "Generation rejected: already in flight");
                Ok(Err(RejectionReason::AlreadyInFlight))
            }
        }
    }

    /// Release the in-flight lock. Idempotent; called on both success
    /// and failure paths.
    pub async fn release(&self, handle: &LockHandle) -> Result<()> {
        quota::release(&self.db, handle.owner_id, handle.day, handle.holder).await
    }

    /// Record one successful generation against the day's quota.
    ///
    /// Failed runs never reach this, so a failed attempt does not
    /// consume the owner's daily slot.
    pub async fn record_success(&self, handle: &LockHandle) -> Result<()> {
        quota::increment_count(&self.db, handle.owner_id, handle.day).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    fn gate(pool: SqlitePool) -> DailyGate {
        DailyGate::new(pool, GenerationConfig::default())
    }

    #[tokio::test]
    async fn test_admit_then_reject_in_flight_then_release() {
        let pool = test_pool().await;
        let gate = gate(pool);
        let owner = Uuid::new_v4();

        let handle = gate.admit(owner, day()).await.unwrap().unwrap();

        let rejected = gate.admit(owner, day()).await.unwrap().unwrap_err();
        assert_eq!(rejected, RejectionReason::AlreadyInFlight);

        gate.release(&handle).await.unwrap();
        assert!(gate.admit(owner, day()).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_limit_reached_after_configured_successes() {
        let pool = test_pool().await;
        let gate = gate(pool);
        let owner = Uuid::new_v4();

        // Three successful cycles (default limit)
        for _ in 0..3 {
            let handle = gate.admit(owner, day()).await.unwrap().unwrap();
            gate.record_success(&handle).await.unwrap();
            gate.release(&handle).await.unwrap();
        }

        let rejected = gate.admit(owner, day()).await.unwrap().unwrap_err();
        assert_eq!(rejected, RejectionReason::LimitReached);
    }

    #[tokio::test]
    async fn test_failed_run_does_not_consume_slot() {
        let pool = test_pool().await;
        let gate = gate(pool);
        let owner = Uuid::new_v4();

        // Admit and release without recording success (failure path)
        for _ in 0..5 {
            let handle = gate.admit(owner, day()).await.unwrap().unwrap();
            gate.release(&handle).await.unwrap();
        }

        // Still admissible
        assert!(gate.admit(owner, day()).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_distinct_owners_do_not_contend() {
        let pool = test_pool().await;
        let gate = gate(pool);

        let first = gate.admit(Uuid::new_v4(), day()).await.unwrap();
        let second = gate.admit(Uuid::new_v4(), day()).await.unwrap();
        assert!(first.is_ok());
        assert!(second.is_ok());
    }
}
