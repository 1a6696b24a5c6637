//! Weekly album lifecycle
//!
//! Lazily creates the owner's album for the week of a generation,
//! generates its vinyl disk artwork exactly once (first successful
//! generation of the week wins the compare-and-set; everyone else
//! reuses), and tracks song count and completion.

use anyhow::Result;
use chrono::NaiveDate;
use uuid::Uuid;

use dailycut_common::config::GenerationConfig;
use dailycut_common::events::{EventBus, GenEvent};
use dailycut_common::time;

use crate::db;
use crate::executor::{self, TierAttempt};
use crate::models::{Album, UserPreferences};
use crate::providers::{capability, ArtworkPromptInput, ImageGenTier};
use crate::services::vinyl;
use crate::storage::{AssetStore, DEFAULT_ARTWORK_REF};

pub struct AlbumService {
    db: sqlx::SqlitePool,
    imagegen: Vec<ImageGenTier>,
    assets: AssetStore,
    events: EventBus,
    config: GenerationConfig,
}

impl AlbumService {
    pub fn new(
        db: sqlx::SqlitePool,
        imagegen: Vec<ImageGenTier>,
        assets: AssetStore,
        events: EventBus,
        config: GenerationConfig,
    ) -> Self {
        Self { db, imagegen, assets, events, config }
    }

    /// Resolve the owner's album for the week containing `date`,
    /// creating it (and its artwork, exactly once) if needed.
    ///
    /// Never fails the pipeline on artwork trouble: image exhaustion
    /// degrades to the fixed default artwork and the album stays
    /// usable. Returns the album plus the artwork tier attempts for
    /// the run's provider log.
    pub async fn resolve(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        themes: &[String],
        preferences: &UserPreferences,
    ) -> Result<(Album, Vec<TierAttempt>)> {
        let (week_start, week_end) = time::week_bounds(date);

        let album = match db::albums::load_album_by_week(&self.db, owner_id, week_start).await? {
            Some(existing) => {
                tracing::debug!(album = %existing.guid, name = %existing.name, "Found existing weekly album");
                existing
            }
            None => {
                tracing::info!(owner_id = %owner_id, %week_start, "Creating new weekly album");
                let fresh = Album::new(owner_id, week_start, week_end);
                db::albums::insert_album(&self.db, &fresh).await?;
                // Re-load: a concurrent creator may have won the insert
                db::albums::load_album_by_week(&self.db, owner_id, week_start)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("album row missing after insert"))?
            }
        };

        if album.vinyl_disk_ref.is_some() {
            return Ok((album, Vec::new()));
        }

        let attempts = self.ensure_artwork(&album, themes, preferences).await?;
        let album = db::albums::load_album(&self.db, album.guid)
            .await?
            .ok_or_else(|| anyhow::anyhow!("album row missing after artwork update"))?;

        Ok((album, attempts))
    }

    /// Record a song appended to the album; flips completion at seven
    pub async fn record_song_added(&self, album_id: Uuid) -> Result<Album> {
        let album = db::albums::record_song_added(&self.db, album_id).await?;
        if album.is_complete {
            tracing::info!(album = %album.guid, "Weekly album complete");
        }
        Ok(album)
    }

    /// Generate and attach artwork, at most once per album.
    ///
    /// The generated disk is written to the asset store first, then a
    /// compare-and-set claims the `vinyl_disk_ref` column. A CAS loss
    /// means a concurrent run already attached artwork; the stored
    /// bytes are simply abandoned and the winner's artwork is reused.
    async fn ensure_artwork(
        &self,
        album: &Album,
        themes: &[String],
        preferences: &UserPreferences,
    ) -> Result<Vec<TierAttempt>> {
        let prompt = ArtworkPromptInput {
            prompt: build_artwork_prompt(album.week_start, album.week_end, themes, preferences),
        };

        let (disk_ref, attempts, tier) = match executor::invoke(
            capability::ARTWORK,
            &self.imagegen,
            &prompt,
            self.config.short_call_timeout,
        )
        .await
        {
            Ok(output) => {
                match vinyl::create_vinyl_disk(&output.value, self.config.disk_size) {
                    Ok(disk) => {
                        let disk_ref = self
                            .assets
                            .store_artwork(album.owner_id, album.week_start, &disk)
                            .await?;
                        (disk_ref, output.attempts, Some(output.tier))
                    }
                    Err(e) => {
                        tracing::warn!(album = %album.guid, error = %e, "Vinyl transform failed, using default artwork");
                        (DEFAULT_ARTWORK_REF.to_string(), output.attempts, None)
                    }
                }
            }
            Err(exhausted) => {
                tracing::warn!(
                    album = %album.guid,
                    attempts = exhausted.attempts.len(),
                    "Image generation exhausted, using default artwork"
                );
                (DEFAULT_ARTWORK_REF.to_string(), exhausted.attempts, None)
            }
        };

        let won = db::albums::set_vinyl_disk_ref(&self.db, album.guid, &disk_ref).await?;
        if won {
            if let Some(tier) = tier {
                self.events.emit_lossy(GenEvent::ArtworkGenerated {
                    album_id: album.guid,
                    tier,
                    timestamp: time::now(),
                });
            }
        } else {
            tracing::debug!(album = %album.guid, "Lost artwork race, reusing existing vinyl disk");
        }

        Ok(attempts)
    }
}

/// Build the artwork prompt from the week, the accumulated song
/// themes, and the owner's genre taste
pub fn build_artwork_prompt(
    week_start: NaiveDate,
    week_end: NaiveDate,
    themes: &[String],
    preferences: &UserPreferences,
) -> String {
    let themes_text = if themes.is_empty() {
        "daily life".to_string()
    } else {
        themes.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
    };
    let genre_style = preferences
        .music_genres
        .first()
        .cloned()
        .unwrap_or_else(|| "modern".to_string());

    format!(
        r#"Create an album cover artwork for a weekly music collection.

Style: {genre} music aesthetic, modern and vibrant
Themes: {themes}
Time period: Week of {start} to {end}

Requirements:
- Square format (1:1 aspect ratio)
- Vibrant colors that match {genre} music style
- Abstract or minimalist design
- No text or typography
- Professional album cover quality
- Suitable for vinyl disk transformation"#,
        genre = genre_style,
        themes = themes_text,
        start = week_start,
        end = week_end,
    )
}
