//! Context models: the immutable per-request snapshot of news,
//! weather, calendar, and preferences that seeds song composition.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::executor::TierAttempt;

/// One aggregated news item (normalized across news tiers)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    pub source: String,
    /// Category the item was fetched under ("general" when uncategorized)
    pub category: String,
    pub url: String,
    pub published_at: String,
}

/// Query issued to a news tier
#[derive(Debug, Clone)]
pub struct NewsQuery {
    /// Categories to search; None means general news
    pub categories: Option<Vec<String>>,
    /// Country code, empty for worldwide
    pub location: String,
    /// Maximum items to return
    pub count: usize,
}

/// Current weather conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub country: String,
    pub condition: String,
    pub temp_c: f64,
    pub temp_f: f64,
    pub humidity: u8,
    pub wind_kph: f64,
}

/// Weather signal in the context: either a report or an explicit
/// unavailable sentinel. A missing signal never blocks generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WeatherSnapshot {
    Available(WeatherReport),
    Unavailable,
}

impl WeatherSnapshot {
    pub fn is_available(&self) -> bool {
        matches!(self, WeatherSnapshot::Available(_))
    }

    /// Short human-readable summary for the compose prompt
    pub fn summary(&self) -> String {
        match self {
            WeatherSnapshot::Available(report) => {
                format!("{}, {:.0}°C", report.condition, report.temp_c)
            }
            WeatherSnapshot::Unavailable => "unavailable".to_string(),
        }
    }
}

/// Query issued to the weather tier
#[derive(Debug, Clone)]
pub struct WeatherQuery {
    pub location: String,
}

/// One calendar event for the generation day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub all_day: bool,
}

/// Query issued to the calendar tier
#[derive(Debug, Clone)]
pub struct CalendarQuery {
    pub owner_id: Uuid,
    pub date: NaiveDate,
}

/// Music and news preferences for one owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub news_categories: Vec<String>,
    pub music_genres: Vec<String>,
    pub vocal_preference: String,
    pub mood_preference: String,
    pub location: Option<String>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            news_categories: vec!["technology".to_string(), "business".to_string()],
            music_genres: vec!["pop".to_string(), "indie".to_string()],
            vocal_preference: "female".to_string(),
            mood_preference: "uplifting".to_string(),
            location: None,
        }
    }
}

/// Immutable context snapshot assembled once per generation request.
///
/// Built by the aggregator, owned by the pipeline for the lifetime of
/// one run, never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongContext {
    pub news: Vec<NewsItem>,
    pub weather: WeatherSnapshot,
    pub activities: Vec<CalendarEvent>,
    pub preferences: UserPreferences,
    /// Per-tier outcomes from every upstream fetch, carried forward
    /// into the song's provider attempt log
    pub attempts: Vec<TierAttempt>,
}
