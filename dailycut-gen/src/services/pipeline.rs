//! Generation pipeline coordinator
//!
//! Sequences one generation request through the daily gate and the
//! stage machine:
//! Gathering → Composing → ResolvingCollection → Synthesizing → Persisting → Done.
//!
//! Non-critical trouble (weather, calendar, artwork) degrades in
//! place; critical exhaustion (compose, synthesis) fails the run with
//! the full per-tier attempt log. Every exit path - success, failure,
//! cancellation - releases the daily lock before returning.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use dailycut_common::config::GenerationConfig;
use dailycut_common::events::{EventBus, GenEvent};
use dailycut_common::time;
use dailycut_common::token::generate_share_token;

use crate::db;
use crate::executor::{self, AttemptOutcome, TierAttempt};
use crate::models::{
    Album, ComposeRequest, FailureReason, GenerationRun, RejectionReason, RunState, Song,
    SongSheet, SynthesisRequest,
};
use crate::providers::{capability, synth, ProviderSet};
use crate::services::albums::AlbumService;
use crate::services::context::ContextAggregator;
use crate::services::gate::{DailyGate, LockHandle};
use crate::storage::AssetStore;

/// Attempts to mint a unique share token before giving up
const SHARE_TOKEN_MINT_ATTEMPTS: usize = 5;
/// Interval between synthesis progress events
const SYNTHESIS_PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of a successful generation
#[derive(Debug, Clone)]
pub struct GeneratedSong {
    pub song: Song,
    pub album: Album,
}

/// Everything a generation request can come back with besides a song
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Client-correctable: not admitted by the daily gate
    #[error("generation rejected: {0:?}")]
    Rejected(RejectionReason),

    /// Pipeline failure with a structured reason
    #[error("{0}")]
    Failed(FailureReason),

    /// Storage or infrastructure trouble
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct GenerationPipeline {
    db: SqlitePool,
    events: EventBus,
    providers: ProviderSet,
    aggregator: ContextAggregator,
    albums: AlbumService,
    gate: DailyGate,
    assets: AssetStore,
    config: GenerationConfig,
}

impl GenerationPipeline {
    pub fn new(
        db: SqlitePool,
        events: EventBus,
        providers: ProviderSet,
        assets: AssetStore,
        config: GenerationConfig,
    ) -> Self {
        let aggregator = ContextAggregator::new(providers.clone(), config.clone());
        let albums = AlbumService::new(
            db.clone(),
            providers.imagegen.clone(),
            assets.clone(),
            events.clone(),
            config.clone(),
        );
        let gate = DailyGate::new(db.clone(), config.clone());

        Self { db, events, providers, aggregator, albums, gate, assets, config }
    }

    /// Run one generation request end to end.
    ///
    /// Enters through the daily gate; the returned lock is released on
    /// every path out of this function.
    pub async fn generate(
        &self,
        owner_id: Uuid,
        date: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> Result<GeneratedSong, GenerationError> {
        let day = time::day_key(date);

        let handle = match self.gate.admit(owner_id, day).await? {
            Ok(handle) => handle,
            Err(reason) => return Err(GenerationError::Rejected(reason)),
        };

        let mut run = GenerationRun::new(owner_id, day);
        db::runs::save_run(&self.db, &run).await?;
        self.events.emit_lossy(GenEvent::RunStarted {
            run_id: run.run_id,
            owner_id,
            timestamp: time::now(),
        });
        tracing::info!(run_id = %run.run_id, owner_id = %owner_id, %day, "Starting generation run");

        let result = self.run_stages(&mut run, &handle, &cancel).await;

        // The lock is released whatever happened; a failed attempt
        // must not consume the owner's daily slot beyond the attempt.
        if let Err(e) = self.gate.release(&handle).await {
            tracing::error!(run_id = %run.run_id, error = %e, "Failed to release daily lock");
        }

        match &result {
            Ok(generated) => {
                tracing::info!(
                    run_id = %run.run_id,
                    song = %generated.song.guid,
                    share_token = %generated.song.share_token,
                    "Generation run complete"
                );
            }
            Err(error) => {
                if !run.is_terminal() {
                    // Internal errors land here; structured failures
                    // already moved the run to Failed
                    run.fail(FailureReason::PersistConflict { reason: error.to_string() });
                    let _ = db::runs::save_run(&self.db, &run).await;
                }
                self.events.emit_lossy(GenEvent::RunFailed {
                    run_id: run.run_id,
                    reason: error.to_string(),
                    timestamp: time::now(),
                });
                tracing::warn!(run_id = %run.run_id, error = %error, "Generation run failed");
            }
        }

        result
    }

    async fn run_stages(
        &self,
        run: &mut GenerationRun,
        handle: &LockHandle,
        cancel: &CancellationToken,
    ) -> Result<GeneratedSong, GenerationError> {
        // Stage 1: Gathering - sub-fetch failures degrade in place
        let preferences = db::prefs::load_preferences(&self.db, run.owner_id).await?;
        let context = self.aggregator.aggregate(run.owner_id, run.day, preferences).await;
        self.check_cancelled(cancel)?;

        // Stage 2: Composing
        self.transition(run, RunState::Composing).await?;
        let compose_request = ComposeRequest::from_context(&context);
        let (sheet, compose_attempts) = match executor::invoke(
            capability::COMPOSE,
            &self.providers.textgen,
            &compose_request,
            self.config.short_call_timeout,
        )
        .await
        {
            Ok(output) => {
                tracing::info!(run_id = %run.run_id, tier = %output.tier, title = %output.value.title, "Song composed");
                (output.value, output.attempts)
            }
            Err(exhausted) => {
                return self
                    .fail(run, FailureReason::ComposeExhausted { attempts: exhausted.attempts })
                    .await;
            }
        };
        self.check_cancelled(cancel)?;

        // Stage 3: ResolvingCollection - cannot fail the pipeline;
        // artwork exhaustion degrades to default artwork inside
        self.transition(run, RunState::ResolvingCollection).await?;
        let (album, artwork_attempts) = self
            .albums
            .resolve(run.owner_id, run.day, &[sheet.title.clone()], &context.preferences)
            .await?;
        self.check_cancelled(cancel)?;

        // Stage 4: Synthesizing - single long-timeout tier
        self.transition(run, RunState::Synthesizing).await?;
        let synthesis_request = SynthesisRequest {
            genre_tags: sheet.genre_tags.clone(),
            lyrics: synth::format_lyrics_for_synthesis(&sheet.lyrics),
        };

        let progress_reporter = self.spawn_progress_reporter(run.run_id);
        let synthesis_started = Instant::now();
        let synthesis_result = executor::invoke(
            capability::SYNTHESIS,
            &self.providers.synth,
            &synthesis_request,
            self.config.synthesis_timeout,
        )
        .await;
        progress_reporter.abort();
        let elapsed = synthesis_started.elapsed();

        let (audio, synth_attempts) = match synthesis_result {
            Ok(output) => (output.value, output.attempts),
            Err(exhausted) => {
                let reason = classify_synthesis_failure(&exhausted.attempts, elapsed);
                return self.fail_with_attempts(run, reason, exhausted.attempts).await;
            }
        };
        self.check_cancelled(cancel)?;

        // Stage 5: Persisting
        self.transition(run, RunState::Persisting).await?;
        let audio_ref = self
            .assets
            .store_audio(run.owner_id, &audio.filename, &audio.data)
            .await?;
        let share_token = self.mint_share_token(run).await?;

        let mut provider_attempts = context.attempts.clone();
        provider_attempts.extend(compose_attempts);
        provider_attempts.extend(artwork_attempts);
        provider_attempts.extend(synth_attempts);

        let song = build_song(run, &album, &sheet, audio_ref, share_token, provider_attempts, elapsed);
        if let Err(e) = db::songs::save_song(&self.db, &song).await {
            return self
                .fail(run, FailureReason::PersistConflict { reason: e.to_string() })
                .await;
        }

        let album = self.albums.record_song_added(album.guid).await?;
        self.gate.record_success(handle).await?;

        self.transition(run, RunState::Done).await?;
        self.events.emit_lossy(GenEvent::RunCompleted {
            run_id: run.run_id,
            song_id: song.guid,
            share_token: song.share_token.clone(),
            timestamp: time::now(),
        });

        Ok(GeneratedSong { song, album })
    }

    async fn transition(
        &self,
        run: &mut GenerationRun,
        new_state: RunState,
    ) -> Result<(), GenerationError> {
        let old_state = run.state;
        run.transition_to(new_state);
        db::runs::save_run(&self.db, run).await?;
        self.events.emit_lossy(GenEvent::StageChanged {
            run_id: run.run_id,
            old_stage: old_state.to_string(),
            new_stage: new_state.to_string(),
            timestamp: time::now(),
        });
        tracing::debug!(run_id = %run.run_id, %old_state, %new_state, "Stage transition");
        Ok(())
    }

    async fn fail(
        &self,
        run: &mut GenerationRun,
        reason: FailureReason,
    ) -> Result<GeneratedSong, GenerationError> {
        run.fail(reason.clone());
        db::runs::save_run(&self.db, run).await?;
        Err(GenerationError::Failed(reason))
    }

    async fn fail_with_attempts(
        &self,
        run: &mut GenerationRun,
        reason: FailureReason,
        attempts: Vec<TierAttempt>,
    ) -> Result<GeneratedSong, GenerationError> {
        tracing::warn!(
            run_id = %run.run_id,
            attempts = attempts.len(),
            reason = %reason,
            "Critical capability exhausted"
        );
        self.fail(run, reason).await
    }

    fn check_cancelled(&self, cancel: &CancellationToken) -> Result<(), GenerationError> {
        if cancel.is_cancelled() {
            Err(GenerationError::Internal(anyhow::anyhow!("generation cancelled")))
        } else {
            Ok(())
        }
    }

    /// Emit coarse progress while the synthesis job blocks
    fn spawn_progress_reporter(&self, run_id: Uuid) -> tokio::task::JoinHandle<()> {
        let events = self.events.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let mut interval = tokio::time::interval(SYNTHESIS_PROGRESS_INTERVAL);
            interval.tick().await; // consume the immediate first tick
            loop {
                interval.tick().await;
                let elapsed = started.elapsed();
                events.emit_lossy(GenEvent::SynthesisProgress {
                    run_id,
                    elapsed_seconds: elapsed.as_secs(),
                    message: synth::synthesis_status_message(elapsed).to_string(),
                    timestamp: time::now(),
                });
            }
        })
    }

    /// Mint a share token, collision-checked against existing songs
    async fn mint_share_token(&self, run: &GenerationRun) -> Result<String, GenerationError> {
        for _ in 0..SHARE_TOKEN_MINT_ATTEMPTS {
            let token = generate_share_token();
            if !db::songs::share_token_exists(&self.db, &token).await? {
                return Ok(token);
            }
            tracing::warn!(run_id = %run.run_id, "Share token collision, reminting");
        }

        Err(GenerationError::Failed(FailureReason::PersistConflict {
            reason: "could not mint a unique share token".to_string(),
        }))
    }
}

/// Map synthesis exhaustion to the timeout-vs-rejection taxonomy so
/// callers can tell "might succeed if retried" from "provider said no"
fn classify_synthesis_failure(attempts: &[TierAttempt], elapsed: Duration) -> FailureReason {
    match attempts.last().map(|a| &a.outcome) {
        Some(AttemptOutcome::TimedOut) => {
            FailureReason::SynthesisTimeout { elapsed_seconds: elapsed.as_secs() }
        }
        Some(AttemptOutcome::Failed(message)) => {
            FailureReason::SynthesisRejected { reason: message.clone() }
        }
        Some(AttemptOutcome::RateLimited) => {
            FailureReason::SynthesisRejected { reason: "provider rate limited".to_string() }
        }
        _ => FailureReason::SynthesisRejected { reason: "no synthesis tier configured".to_string() },
    }
}

fn build_song(
    run: &GenerationRun,
    album: &Album,
    sheet: &SongSheet,
    audio_ref: String,
    share_token: String,
    provider_attempts: Vec<TierAttempt>,
    elapsed: Duration,
) -> Song {
    Song {
        guid: Uuid::new_v4(),
        owner_id: run.owner_id,
        album_id: album.guid,
        title: sheet.title.clone(),
        description: sheet.description.clone(),
        lyrics: sheet.lyrics.clone(),
        genre_tags: sheet.genre_tags.clone(),
        audio_ref,
        share_token,
        provider_attempts,
        generation_seconds: elapsed.as_secs_f64(),
        created_at: time::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(outcome: AttemptOutcome) -> TierAttempt {
        TierAttempt {
            capability: capability::SYNTHESIS.to_string(),
            tier: "runpod".to_string(),
            outcome,
            elapsed_ms: 1000,
        }
    }

    #[test]
    fn test_synthesis_timeout_classification() {
        let reason = classify_synthesis_failure(
            &[attempt(AttemptOutcome::TimedOut)],
            Duration::from_secs(901),
        );
        assert!(matches!(reason, FailureReason::SynthesisTimeout { elapsed_seconds: 901 }));
    }

    #[test]
    fn test_synthesis_rejection_classification() {
        let reason = classify_synthesis_failure(
            &[attempt(AttemptOutcome::Failed("handler error".to_string()))],
            Duration::from_secs(5),
        );
        match reason {
            FailureReason::SynthesisRejected { reason } => {
                assert!(reason.contains("handler error"))
            }
            other => panic!("unexpected reason: {:?}", other),
        }
    }

    #[test]
    fn test_unconfigured_synthesis_classification() {
        let reason = classify_synthesis_failure(&[], Duration::from_secs(0));
        assert!(matches!(reason, FailureReason::SynthesisRejected { .. }));
    }
}
