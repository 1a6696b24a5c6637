//! Upstream provider clients
//!
//! Each capability (news, weather, calendar, text, image, audio) has
//! one or more interchangeable tiers behind the `ProviderTier` trait;
//! the executor walks them in preference order. A missing API key
//! disables a tier at startup rather than failing requests later.

pub mod calendar;
pub mod imagegen;
pub mod news;
pub mod synth;
pub mod textgen;
pub mod weather;

use std::sync::Arc;

use sqlx::SqlitePool;

use dailycut_common::config::{GenerationConfig, ProviderKeys};

use crate::executor::ProviderTier;
use crate::models::{
    CalendarEvent, CalendarQuery, ComposeRequest, NewsItem, NewsQuery, SongSheet,
    SynthesisRequest, SynthesizedAudio, WeatherQuery, WeatherReport,
};

/// Capability names used in attempt logs and error reports
pub mod capability {
    pub const NEWS: &str = "news";
    pub const WEATHER: &str = "weather";
    pub const CALENDAR: &str = "calendar";
    pub const COMPOSE: &str = "compose";
    pub const ARTWORK: &str = "artwork";
    pub const SYNTHESIS: &str = "synthesis";
}

pub type NewsTier = Arc<dyn ProviderTier<NewsQuery, Vec<NewsItem>>>;
pub type WeatherTier = Arc<dyn ProviderTier<WeatherQuery, WeatherReport>>;
pub type CalendarTier = Arc<dyn ProviderTier<CalendarQuery, Vec<CalendarEvent>>>;
pub type TextGenTier = Arc<dyn ProviderTier<ComposeRequest, SongSheet>>;
pub type ImageGenTier = Arc<dyn ProviderTier<ArtworkPromptInput, Vec<u8>>>;
pub type SynthTier = Arc<dyn ProviderTier<SynthesisRequest, SynthesizedAudio>>;

/// Prompt handed to an image generation tier
#[derive(Debug, Clone)]
pub struct ArtworkPromptInput {
    pub prompt: String,
}

/// Ordered tier lists for every capability
#[derive(Clone)]
pub struct ProviderSet {
    pub news: Vec<NewsTier>,
    pub weather: Vec<WeatherTier>,
    pub calendar: Vec<CalendarTier>,
    pub textgen: Vec<TextGenTier>,
    pub imagegen: Vec<ImageGenTier>,
    pub synth: Vec<SynthTier>,
}

impl ProviderSet {
    /// Assemble the tier lists from environment credentials.
    ///
    /// Tier order encodes preference: SerpAPI → NewsAPI → WorldNewsAPI
    /// for news, OpenAI → Gemini for composing, Gemini → OpenAI for
    /// artwork (mirroring each capability's primary provider).
    pub fn from_keys(keys: &ProviderKeys, db: SqlitePool, config: &GenerationConfig) -> Self {
        let mut news: Vec<NewsTier> = Vec::new();
        if let Some(key) = &keys.serpapi_key {
            match news::SerpApiNews::new(key.clone()) {
                Ok(client) => news.push(Arc::new(client)),
                Err(e) => tracing::error!(error = %e, "Failed to initialize SerpAPI client"),
            }
        }
        if let Some(key) = &keys.newsapi_key {
            match news::NewsApiNews::new(key.clone()) {
                Ok(client) => news.push(Arc::new(client)),
                Err(e) => tracing::error!(error = %e, "Failed to initialize NewsAPI client"),
            }
        }
        if let Some(key) = &keys.worldnews_key {
            match news::WorldNewsApi::new(key.clone()) {
                Ok(client) => news.push(Arc::new(client)),
                Err(e) => tracing::error!(error = %e, "Failed to initialize WorldNewsAPI client"),
            }
        }
        if news.is_empty() {
            tracing::warn!("No news API keys configured; news context will be empty");
        }

        let mut weather: Vec<WeatherTier> = Vec::new();
        match &keys.openweather_key {
            Some(key) => match weather::OpenWeatherClient::new(key.clone()) {
                Ok(client) => weather.push(Arc::new(client)),
                Err(e) => tracing::error!(error = %e, "Failed to initialize OpenWeather client"),
            },
            None => tracing::warn!("No OpenWeather API key configured; weather will be unavailable"),
        }

        let mut calendar: Vec<CalendarTier> = Vec::new();
        match calendar::GoogleCalendarClient::new(db) {
            Ok(client) => calendar.push(Arc::new(client)),
            Err(e) => tracing::error!(error = %e, "Failed to initialize calendar client"),
        }

        let mut textgen: Vec<TextGenTier> = Vec::new();
        if let Some(key) = &keys.openai_key {
            match textgen::OpenAiTextGen::new(key.clone()) {
                Ok(client) => textgen.push(Arc::new(client)),
                Err(e) => tracing::error!(error = %e, "Failed to initialize OpenAI text client"),
            }
        }
        if let Some(key) = &keys.gemini_key {
            match textgen::GeminiTextGen::new(key.clone()) {
                Ok(client) => textgen.push(Arc::new(client)),
                Err(e) => tracing::error!(error = %e, "Failed to initialize Gemini text client"),
            }
        }
        if textgen.is_empty() {
            tracing::warn!("No text generation API keys configured; generation will fail");
        }

        let mut imagegen: Vec<ImageGenTier> = Vec::new();
        if let Some(key) = &keys.gemini_key {
            match imagegen::GeminiImageGen::new(key.clone()) {
                Ok(client) => imagegen.push(Arc::new(client)),
                Err(e) => tracing::error!(error = %e, "Failed to initialize Gemini image client"),
            }
        }
        if let Some(key) = &keys.openai_key {
            match imagegen::OpenAiImageGen::new(key.clone()) {
                Ok(client) => imagegen.push(Arc::new(client)),
                Err(e) => tracing::error!(error = %e, "Failed to initialize OpenAI image client"),
            }
        }
        if imagegen.is_empty() {
            tracing::warn!("No image generation API keys configured; albums will use default artwork");
        }

        let mut synth: Vec<SynthTier> = Vec::new();
        match (&keys.synth_api_key, &keys.synth_endpoint_id) {
            (Some(key), Some(endpoint)) => {
                match synth::ServerlessSynthClient::new(
                    key.clone(),
                    endpoint.clone(),
                    config.synthesis_timeout,
                ) {
                    Ok(client) => synth.push(Arc::new(client)),
                    Err(e) => tracing::error!(error = %e, "Failed to initialize synthesis client"),
                }
            }
            _ => {
                tracing::warn!("Synthesis endpoint not configured; generation will fail");
            }
        }

        Self { news, weather, calendar, textgen, imagegen, synth }
    }
}
