//! Context aggregator
//!
//! Assembles the immutable per-request context: news, weather, and
//! calendar fetched concurrently, each through its own fallback tier
//! list and its own cache (news 1 h, weather 30 min, calendar never).
//! A failed non-critical fetch degrades to a sentinel in place - a
//! missing signal must not block song generation.

use chrono::NaiveDate;
use uuid::Uuid;

use dailycut_common::config::GenerationConfig;

use crate::executor::{self, TierAttempt};
use crate::models::{
    CalendarEvent, CalendarQuery, NewsItem, NewsQuery, SongContext, UserPreferences,
    WeatherQuery, WeatherReport, WeatherSnapshot,
};
use crate::providers::{capability, ProviderSet};
use crate::services::cache::TtlCache;

/// Default city when the owner has no stored location
const DEFAULT_WEATHER_LOCATION: &str = "New York";
/// Country scope for news queries
const NEWS_LOCATION: &str = "us";

pub struct ContextAggregator {
    providers: ProviderSet,
    config: GenerationConfig,
    news_cache: TtlCache<String, Vec<NewsItem>>,
    weather_cache: TtlCache<String, WeatherReport>,
}

impl ContextAggregator {
    pub fn new(providers: ProviderSet, config: GenerationConfig) -> Self {
        let news_cache = TtlCache::new(config.news_cache_ttl);
        let weather_cache = TtlCache::new(config.weather_cache_ttl);
        Self { providers, config, news_cache, weather_cache }
    }

    /// Assemble the context snapshot for one generation request.
    ///
    /// The three fetches run concurrently and are joined before
    /// returning; the snapshot is never mutated afterwards.
    pub async fn aggregate(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        preferences: UserPreferences,
    ) -> SongContext {
        let (news_result, weather_result, calendar_result) = tokio::join!(
            self.fetch_news(owner_id, date, &preferences),
            self.fetch_weather(owner_id, date, &preferences),
            self.fetch_calendar(owner_id, date),
        );

        let (news, mut attempts) = news_result;
        let (weather, weather_attempts) = weather_result;
        let (activities, calendar_attempts) = calendar_result;
        attempts.extend(weather_attempts);
        attempts.extend(calendar_attempts);

        tracing::info!(
            owner_id = %owner_id,
            news_items = news.len(),
            weather_available = weather.is_available(),
            activities = activities.len(),
            "Context aggregated"
        );

        SongContext { news, weather, activities, preferences, attempts }
    }

    async fn fetch_news(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        preferences: &UserPreferences,
    ) -> (Vec<NewsItem>, Vec<TierAttempt>) {
        let cache_key = format!(
            "{}:{}:news:{}",
            owner_id,
            date,
            preferences.news_categories.join(",")
        );
        if let Some(cached) = self.news_cache.get(&cache_key).await {
            tracing::debug!(owner_id = %owner_id, items = cached.len(), "Returning cached news");
            return (cached, Vec::new());
        }

        let request_size = self.config.news_request_size;
        let preferred_target = preferred_target(request_size, self.config.preferred_news_share);
        let mut attempts = Vec::new();
        let mut pool: Vec<NewsItem> = Vec::new();

        // Preferred-category and general fetches go through the same
        // tier list independently; either may exhaust on its own.
        let preferred_query = NewsQuery {
            categories: Some(preferences.news_categories.clone()),
            location: NEWS_LOCATION.to_string(),
            count: preferred_target,
        };
        match executor::invoke(
            capability::NEWS,
            &self.providers.news,
            &preferred_query,
            self.config.short_call_timeout,
        )
        .await
        {
            Ok(output) => {
                attempts.extend(output.attempts);
                pool.extend(output.value);
            }
            Err(exhausted) => {
                tracing::warn!(owner_id = %owner_id, "Preferred news fetch exhausted");
                attempts.extend(exhausted.attempts);
            }
        }

        let general_query = NewsQuery {
            categories: None,
            location: NEWS_LOCATION.to_string(),
            count: request_size,
        };
        match executor::invoke(
            capability::NEWS,
            &self.providers.news,
            &general_query,
            self.config.short_call_timeout,
        )
        .await
        {
            Ok(output) => {
                attempts.extend(output.attempts);
                pool.extend(output.value);
            }
            Err(exhausted) => {
                tracing::warn!(owner_id = %owner_id, "General news fetch exhausted");
                attempts.extend(exhausted.attempts);
            }
        }

        let selected = select_news(
            pool,
            &preferences.news_categories,
            request_size,
            self.config.preferred_news_share,
        );

        if !selected.is_empty() {
            self.news_cache.put(cache_key, selected.clone()).await;
        }

        (selected, attempts)
    }

    async fn fetch_weather(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        preferences: &UserPreferences,
    ) -> (WeatherSnapshot, Vec<TierAttempt>) {
        let location = preferences
            .location
            .clone()
            .unwrap_or_else(|| DEFAULT_WEATHER_LOCATION.to_string());

        let cache_key = format!("{}:{}:weather:{}", owner_id, date, location.to_lowercase());
        if let Some(cached) = self.weather_cache.get(&cache_key).await {
            tracing::debug!(owner_id = %owner_id, city = %location, "Returning cached weather");
            return (WeatherSnapshot::Available(cached), Vec::new());
        }

        let query = WeatherQuery { location };
        match executor::invoke(
            capability::WEATHER,
            &self.providers.weather,
            &query,
            self.config.short_call_timeout,
        )
        .await
        {
            Ok(output) => {
                self.weather_cache.put(cache_key, output.value.clone()).await;
                (WeatherSnapshot::Available(output.value), output.attempts)
            }
            Err(exhausted) => {
                tracing::warn!(owner_id = %owner_id, "Weather fetch exhausted, degrading");
                (WeatherSnapshot::Unavailable, exhausted.attempts)
            }
        }
    }

    async fn fetch_calendar(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
    ) -> (Vec<CalendarEvent>, Vec<TierAttempt>) {
        // Always fresh: schedules change too often to cache
        let query = CalendarQuery { owner_id, date };
        match executor::invoke(
            capability::CALENDAR,
            &self.providers.calendar,
            &query,
            self.config.short_call_timeout,
        )
        .await
        {
            Ok(output) => (output.value, output.attempts),
            Err(exhausted) => {
                tracing::debug!(owner_id = %owner_id, "Calendar fetch unavailable, degrading");
                (Vec::new(), exhausted.attempts)
            }
        }
    }
}

/// Preferred-category item count for a request size (70% by default)
fn preferred_target(request_size: usize, share: f64) -> usize {
    ((request_size as f64) * share).round() as usize
}

/// Select news from the fetched pool at the target preferred/general
/// ratio.
///
/// The pool is deduplicated by case-folded title, partitioned by
/// preferred-category membership, then drawn at the target ratio for
/// the requested size. When the preferred pool is short the balance is
/// backfilled from general (and vice versa) - the ratio only holds
/// when the pool is large enough, which is logged as degradation.
pub fn select_news(
    pool: Vec<NewsItem>,
    preferred_categories: &[String],
    request_size: usize,
    share: f64,
) -> Vec<NewsItem> {
    let mut seen = std::collections::HashSet::new();
    let mut preferred = Vec::new();
    let mut general = Vec::new();

    for item in pool {
        let key = item.title.trim().to_lowercase();
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        if preferred_categories.iter().any(|c| c.eq_ignore_ascii_case(&item.category)) {
            preferred.push(item);
        } else {
            general.push(item);
        }
    }

    let target = preferred_target(request_size, share).min(request_size);
    let take_preferred = target.min(preferred.len());
    let take_general = (request_size - take_preferred).min(general.len());

    let mut selected: Vec<NewsItem> = preferred.drain(..take_preferred).collect();
    selected.extend(general.drain(..take_general));

    // Backfill from leftover preferred when general ran short
    if selected.len() < request_size && !preferred.is_empty() {
        let missing = (request_size - selected.len()).min(preferred.len());
        selected.extend(preferred.drain(..missing));
    }

    if take_preferred < target {
        tracing::debug!(
            requested = request_size,
            preferred_available = take_preferred,
            target,
            "Preferred news pool short of target ratio, backfilled from general"
        );
    }

    selected
}
