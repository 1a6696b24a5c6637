//! Shared test fixtures: stub provider tiers and pipeline construction

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use sqlx::SqlitePool;

use dailycut_common::config::GenerationConfig;
use dailycut_common::events::EventBus;

use dailycut_gen::executor::{ProviderError, ProviderTier};
use dailycut_gen::models::{
    CalendarEvent, CalendarQuery, ComposeRequest, NewsItem, NewsQuery, SongSheet,
    SynthesisRequest, SynthesizedAudio, WeatherQuery, WeatherReport,
};
use dailycut_gen::providers::{ArtworkPromptInput, ProviderSet};
use dailycut_gen::services::pipeline::GenerationPipeline;
use dailycut_gen::storage::AssetStore;

// ============================================================================
// News stubs
// ============================================================================

pub struct StubNews {
    pub preferred: Vec<NewsItem>,
    pub general: Vec<NewsItem>,
}

#[async_trait]
impl ProviderTier<NewsQuery, Vec<NewsItem>> for StubNews {
    fn name(&self) -> &str {
        "stub_news"
    }

    async fn call(&self, query: &NewsQuery) -> Result<Vec<NewsItem>, ProviderError> {
        let pool = match &query.categories {
            Some(_) => &self.preferred,
            None => &self.general,
        };
        Ok(pool.iter().take(query.count).cloned().collect())
    }
}

pub fn news_item(title: &str, category: &str) -> NewsItem {
    NewsItem {
        title: title.to_string(),
        summary: format!("summary of {}", title),
        source: "stub".to_string(),
        category: category.to_string(),
        url: format!("https://example.com/{}", title.replace(' ', "-")),
        published_at: "2025-03-12".to_string(),
    }
}

pub struct FailingNews;

#[async_trait]
impl ProviderTier<NewsQuery, Vec<NewsItem>> for FailingNews {
    fn name(&self) -> &str {
        "failing_news"
    }

    async fn call(&self, _query: &NewsQuery) -> Result<Vec<NewsItem>, ProviderError> {
        Err(ProviderError::Api(503, "news backend down".to_string()))
    }
}

// ============================================================================
// Weather stubs
// ============================================================================

pub struct StubWeather;

#[async_trait]
impl ProviderTier<WeatherQuery, WeatherReport> for StubWeather {
    fn name(&self) -> &str {
        "stub_weather"
    }

    async fn call(&self, query: &WeatherQuery) -> Result<WeatherReport, ProviderError> {
        Ok(WeatherReport {
            city: query.location.clone(),
            country: "US".to_string(),
            condition: "Clouds".to_string(),
            temp_c: 18.0,
            temp_f: 64.4,
            humidity: 60,
            wind_kph: 12.0,
        })
    }
}

pub struct FailingWeather;

#[async_trait]
impl ProviderTier<WeatherQuery, WeatherReport> for FailingWeather {
    fn name(&self) -> &str {
        "failing_weather"
    }

    async fn call(&self, _query: &WeatherQuery) -> Result<WeatherReport, ProviderError> {
        Err(ProviderError::Network("connection refused".to_string()))
    }
}

// ============================================================================
// Calendar stub (no calendar connected)
// ============================================================================

pub struct UnavailableCalendar;

#[async_trait]
impl ProviderTier<CalendarQuery, Vec<CalendarEvent>> for UnavailableCalendar {
    fn name(&self) -> &str {
        "stub_calendar"
    }

    async fn call(&self, _query: &CalendarQuery) -> Result<Vec<CalendarEvent>, ProviderError> {
        Err(ProviderError::Unavailable("calendar not connected".to_string()))
    }
}

// ============================================================================
// Text generation stubs
// ============================================================================

pub fn valid_sheet(title: &str) -> SongSheet {
    SongSheet {
        title: title.to_string(),
        description: "A stubbed daily song".to_string(),
        lyrics: "[verse]\nRain taps on the window\nCoffee in my hand\n\n[chorus]\nHere comes the day\nI'm on my way"
            .to_string(),
        genre_tags: "indie-pop piano uplifting female warm".to_string(),
    }
}

pub struct StubTextGen {
    pub title: String,
}

#[async_trait]
impl ProviderTier<ComposeRequest, SongSheet> for StubTextGen {
    fn name(&self) -> &str {
        "stub_textgen"
    }

    async fn call(&self, _request: &ComposeRequest) -> Result<SongSheet, ProviderError> {
        Ok(valid_sheet(&self.title))
    }
}

pub struct FailingTextGen {
    pub name: &'static str,
}

#[async_trait]
impl ProviderTier<ComposeRequest, SongSheet> for FailingTextGen {
    fn name(&self) -> &str {
        self.name
    }

    async fn call(&self, _request: &ComposeRequest) -> Result<SongSheet, ProviderError> {
        Err(ProviderError::Malformed("no [chorus] section".to_string()))
    }
}

// ============================================================================
// Image generation stubs
// ============================================================================

pub fn tiny_png() -> Vec<u8> {
    let img = RgbaImage::from_pixel(64, 64, Rgba([10, 120, 200, 255]));
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

/// Counts invocations so tests can assert artwork is generated once
pub struct CountingImageGen {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ProviderTier<ArtworkPromptInput, Vec<u8>> for CountingImageGen {
    fn name(&self) -> &str {
        "stub_imagegen"
    }

    async fn call(&self, _input: &ArtworkPromptInput) -> Result<Vec<u8>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(tiny_png())
    }
}

pub struct FailingImageGen;

#[async_trait]
impl ProviderTier<ArtworkPromptInput, Vec<u8>> for FailingImageGen {
    fn name(&self) -> &str {
        "failing_imagegen"
    }

    async fn call(&self, _input: &ArtworkPromptInput) -> Result<Vec<u8>, ProviderError> {
        Err(ProviderError::Api(500, "image backend down".to_string()))
    }
}

// ============================================================================
// Synthesis stubs
// ============================================================================

pub struct StubSynth {
    pub delay: Duration,
}

#[async_trait]
impl ProviderTier<SynthesisRequest, SynthesizedAudio> for StubSynth {
    fn name(&self) -> &str {
        "stub_synth"
    }

    async fn call(&self, _request: &SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(SynthesizedAudio { data: b"RIFF-fake-wav".to_vec(), filename: "song.wav".to_string() })
    }
}

pub struct RejectingSynth;

#[async_trait]
impl ProviderTier<SynthesisRequest, SynthesizedAudio> for RejectingSynth {
    fn name(&self) -> &str {
        "rejecting_synth"
    }

    async fn call(&self, _request: &SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        Err(ProviderError::Api(500, "synthesis handler error: bad lyrics".to_string()))
    }
}

/// Never completes inside any sane timeout
pub struct HangingSynth;

#[async_trait]
impl ProviderTier<SynthesisRequest, SynthesizedAudio> for HangingSynth {
    fn name(&self) -> &str {
        "hanging_synth"
    }

    async fn call(&self, _request: &SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("test synthesis should have timed out")
    }
}

// ============================================================================
// Fixture assembly
// ============================================================================

/// Provider set with everything healthy; returns the artwork call counter
pub fn healthy_providers(synth_delay: Duration) -> (ProviderSet, Arc<AtomicUsize>) {
    let artwork_calls = Arc::new(AtomicUsize::new(0));
    let providers = ProviderSet {
        news: vec![Arc::new(StubNews {
            preferred: (0..10).map(|i| news_item(&format!("tech {}", i), "technology")).collect(),
            general: (0..10).map(|i| news_item(&format!("world {}", i), "general")).collect(),
        })],
        weather: vec![Arc::new(StubWeather)],
        calendar: vec![Arc::new(UnavailableCalendar)],
        textgen: vec![Arc::new(StubTextGen { title: "Morning Light".to_string() })],
        imagegen: vec![Arc::new(CountingImageGen { calls: artwork_calls.clone() })],
        synth: vec![Arc::new(StubSynth { delay: synth_delay })],
    };
    (providers, artwork_calls)
}

/// Fast test config: short timeouts, default daily limit
pub fn test_config() -> GenerationConfig {
    GenerationConfig {
        synthesis_timeout: Duration::from_secs(5),
        short_call_timeout: Duration::from_secs(2),
        disk_size: 64,
        ..Default::default()
    }
}

pub struct TestHarness {
    pub pipeline: Arc<GenerationPipeline>,
    pub db: SqlitePool,
    pub events: EventBus,
    // Held for the lifetime of the harness so assets stay on disk
    _assets_dir: tempfile::TempDir,
}

pub async fn build_harness(providers: ProviderSet, config: GenerationConfig) -> TestHarness {
    let db = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    dailycut_gen::db::init_tables(&db).await.expect("Failed to init tables");

    let assets_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let assets = AssetStore::open(assets_dir.path()).expect("Failed to open asset store");
    let events = EventBus::new(64);

    let pipeline = GenerationPipeline::new(
        db.clone(),
        events.clone(),
        providers,
        assets,
        config,
    );

    TestHarness {
        pipeline: Arc::new(pipeline),
        db,
        events,
        _assets_dir: assets_dir,
    }
}
