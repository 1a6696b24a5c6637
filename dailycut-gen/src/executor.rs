//! Resilient call executor
//!
//! Every upstream capability (news, weather, calendar, text, image,
//! audio) is invoked through one generic fallback loop over an ordered
//! list of provider tiers. Each tier call gets its own timeout; any
//! failure (error, timeout, provider-reported rate limit) is logged as
//! an attempt and the next tier is tried. The first success wins and
//! is tagged with the tier that produced it. Exhaustion is a value,
//! not a panic - callers decide whether it is fatal or degrades.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by a single provider tier call
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network-level failure reaching the provider
    #[error("network error: {0}")]
    Network(String),

    /// Provider returned a non-success HTTP status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Provider reported a rate limit
    #[error("rate limited")]
    RateLimited,

    /// Provider responded but the payload failed parsing or validation
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Provider is not usable (missing credentials, disabled)
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// One concrete provider implementing a capability, ordered by preference
#[async_trait]
pub trait ProviderTier<I, O>: Send + Sync
where
    I: Send + Sync,
    O: Send,
{
    /// Stable tier name used in attempt logs (e.g. "openai", "newsapi")
    fn name(&self) -> &str;

    async fn call(&self, input: &I) -> Result<O, ProviderError>;
}

/// Outcome of one tier attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed(String),
    TimedOut,
    RateLimited,
}

/// Record of one tier attempt, kept for observability regardless of
/// the final outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierAttempt {
    pub capability: String,
    pub tier: String,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

/// Successful invocation result, tagged with the winning tier
#[derive(Debug)]
pub struct TierOutput<O> {
    pub value: O,
    /// Name of the tier that produced the value
    pub tier: String,
    /// Ordered per-tier attempt log, including the winning attempt
    pub attempts: Vec<TierAttempt>,
}

/// Every configured tier for a capability has failed
#[derive(Debug, Error)]
#[error("all {} tiers exhausted for capability '{capability}'", .attempts.len())]
pub struct FallbackExhausted {
    pub capability: String,
    pub attempts: Vec<TierAttempt>,
}

/// Invoke a capability through its ordered tier list.
///
/// Tiers are tried in order; each call is wrapped in `tier_timeout`.
/// Returns on the first tier that succeeds. Never raises past this
/// boundary: exhaustion comes back as `FallbackExhausted` carrying the
/// full attempt log.
pub async fn invoke<I, O>(
    capability: &str,
    tiers: &[Arc<dyn ProviderTier<I, O>>],
    input: &I,
    tier_timeout: Duration,
) -> Result<TierOutput<O>, FallbackExhausted>
where
    I: Send + Sync,
    O: Send,
{
    let mut attempts = Vec::with_capacity(tiers.len());

    for tier in tiers {
        let started = Instant::now();
        let result = tokio::time::timeout(tier_timeout, tier.call(input)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(value)) => {
                attempts.push(TierAttempt {
                    capability: capability.to_string(),
                    tier: tier.name().to_string(),
                    outcome: AttemptOutcome::Succeeded,
                    elapsed_ms,
                });
                tracing::debug!(
                    capability,
                    tier = tier.name(),
                    elapsed_ms,
                    "Tier call succeeded"
                );
                return Ok(TierOutput {
                    value,
                    tier: tier.name().to_string(),
                    attempts,
                });
            }
            Ok(Err(ProviderError::RateLimited)) => {
                tracing::warn!(capability, tier = tier.name(), "Tier rate limited, falling back");
                attempts.push(TierAttempt {
                    capability: capability.to_string(),
                    tier: tier.name().to_string(),
                    outcome: AttemptOutcome::RateLimited,
                    elapsed_ms,
                });
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    capability,
                    tier = tier.name(),
                    error = %e,
                    "Tier call failed, falling back"
                );
                attempts.push(TierAttempt {
                    capability: capability.to_string(),
                    tier: tier.name().to_string(),
                    outcome: AttemptOutcome::Failed(e.to_string()),
                    elapsed_ms,
                });
            }
            Err(_) => {
                tracing::warn!(
                    capability,
                    tier = tier.name(),
                    timeout_ms = tier_timeout.as_millis() as u64,
                    "Tier call timed out, falling back"
                );
                attempts.push(TierAttempt {
                    capability: capability.to_string(),
                    tier: tier.name().to_string(),
                    outcome: AttemptOutcome::TimedOut,
                    elapsed_ms,
                });
            }
        }
    }

    tracing::error!(capability, tiers = tiers.len(), "All tiers exhausted");
    Err(FallbackExhausted {
        capability: capability.to_string(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticTier {
        name: &'static str,
        result: Result<u32, fn() -> ProviderError>,
    }

    #[async_trait]
    impl ProviderTier<String, u32> for StaticTier {
        fn name(&self) -> &str {
            self.name
        }

        async fn call(&self, _input: &String) -> Result<u32, ProviderError> {
            match &self.result {
                Ok(v) => Ok(*v),
                Err(make) => Err(make()),
            }
        }
    }

    struct SlowTier;

    #[async_trait]
    impl ProviderTier<String, u32> for SlowTier {
        fn name(&self) -> &str {
            "slow"
        }

        async fn call(&self, _input: &String) -> Result<u32, ProviderError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(1)
        }
    }

    fn ok_tier(name: &'static str, value: u32) -> Arc<dyn ProviderTier<String, u32>> {
        Arc::new(StaticTier { name, result: Ok(value) })
    }

    fn failing_tier(name: &'static str) -> Arc<dyn ProviderTier<String, u32>> {
        Arc::new(StaticTier {
            name,
            result: Err(|| ProviderError::Api(500, "boom".to_string())),
        })
    }

    fn rate_limited_tier(name: &'static str) -> Arc<dyn ProviderTier<String, u32>> {
        Arc::new(StaticTier { name, result: Err(|| ProviderError::RateLimited) })
    }

    #[tokio::test]
    async fn test_first_tier_success_short_circuits() {
        let tiers = vec![ok_tier("primary", 42), ok_tier("fallback", 7)];
        let output = invoke("test", &tiers, &"in".to_string(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(output.value, 42);
        assert_eq!(output.tier, "primary");
        assert_eq!(output.attempts.len(), 1);
        assert_eq!(output.attempts[0].outcome, AttemptOutcome::Succeeded);
    }

    #[tokio::test]
    async fn test_fallback_after_failure_tags_winning_tier() {
        let tiers = vec![failing_tier("primary"), ok_tier("fallback", 7)];
        let output = invoke("test", &tiers, &"in".to_string(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(output.value, 7);
        assert_eq!(output.tier, "fallback");
        assert_eq!(output.attempts.len(), 2);
        assert!(matches!(output.attempts[0].outcome, AttemptOutcome::Failed(_)));
        assert_eq!(output.attempts[1].outcome, AttemptOutcome::Succeeded);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_full_attempt_log() {
        let tiers = vec![failing_tier("a"), failing_tier("b")];
        let err = invoke("compose", &tiers, &"in".to_string(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(err.capability, "compose");
        assert_eq!(err.attempts.len(), 2);
        assert_eq!(err.attempts[0].tier, "a");
        assert_eq!(err.attempts[1].tier, "b");
    }

    #[tokio::test]
    async fn test_rate_limit_is_classified_and_falls_back() {
        let tiers = vec![rate_limited_tier("primary"), ok_tier("fallback", 9)];
        let output = invoke("news", &tiers, &"in".to_string(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(output.attempts[0].outcome, AttemptOutcome::RateLimited);
        assert_eq!(output.tier, "fallback");
    }

    #[tokio::test]
    async fn test_timeout_is_classified_and_falls_back() {
        let tiers: Vec<Arc<dyn ProviderTier<String, u32>>> =
            vec![Arc::new(SlowTier), ok_tier("fallback", 3)];
        let output = invoke("weather", &tiers, &"in".to_string(), Duration::from_millis(50))
            .await
            .unwrap();

        assert_eq!(output.attempts[0].outcome, AttemptOutcome::TimedOut);
        assert_eq!(output.value, 3);
    }

    #[tokio::test]
    async fn test_empty_tier_list_is_immediately_exhausted() {
        let tiers: Vec<Arc<dyn ProviderTier<String, u32>>> = Vec::new();
        let err = invoke("image", &tiers, &"in".to_string(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(err.attempts.is_empty());
    }
}
