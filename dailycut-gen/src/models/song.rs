//! Song models: the composed song sheet, synthesis payloads, and the
//! persisted song record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::executor::TierAttempt;

/// Number of components a genre tag string must carry:
/// genre, instrument, mood, gender, timbre
pub const GENRE_TAG_COMPONENTS: usize = 5;

/// Composed song sheet returned by a text generation tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongSheet {
    /// Song title (max 50 characters requested from the model)
    pub title: String,
    /// One-sentence description
    pub description: String,
    /// Lyrics with one `[verse]` and one `[chorus]` section
    pub lyrics: String,
    /// Space-separated 5-component tag string
    pub genre_tags: String,
}

/// Compose request handed to a text generation tier - a flattened
/// summary of the context snapshot
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub weather_summary: String,
    pub news_titles: Vec<String>,
    pub activity_titles: Vec<String>,
    pub genres: Vec<String>,
    pub vocal_preference: String,
    pub mood_preference: String,
}

impl ComposeRequest {
    pub fn from_context(context: &super::SongContext) -> Self {
        Self {
            weather_summary: context.weather.summary(),
            news_titles: context.news.iter().take(3).map(|n| n.title.clone()).collect(),
            activity_titles: context
                .activities
                .iter()
                .take(3)
                .map(|a| a.title.clone())
                .collect(),
            genres: context.preferences.music_genres.clone(),
            vocal_preference: context.preferences.vocal_preference.clone(),
            mood_preference: context.preferences.mood_preference.clone(),
        }
    }
}

/// Request handed to the audio synthesis tier
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub genre_tags: String,
    /// Lyrics already normalized for the synthesis model
    pub lyrics: String,
}

/// Synthesized audio returned by the synthesis tier
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub data: Vec<u8>,
    pub filename: String,
}

/// One persisted generated track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub guid: Uuid,
    pub owner_id: Uuid,
    pub album_id: Uuid,
    pub title: String,
    pub description: String,
    pub lyrics: String,
    pub genre_tags: String,
    /// Asset store reference to the audio file
    pub audio_ref: String,
    /// Unique public share token
    pub share_token: String,
    /// Ordered log of which fallback tier succeeded (or failed) per capability
    pub provider_attempts: Vec<TierAttempt>,
    /// Wall-clock seconds the synthesis job took
    pub generation_seconds: f64,
    pub created_at: DateTime<Utc>,
}
