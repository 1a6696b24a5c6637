//! News provider tiers
//!
//! Three interchangeable news sources, in preference order:
//! SerpAPI (Google News) → NewsAPI → WorldNewsAPI. Each normalizes
//! its wire format into `NewsItem`, tagged with the category the
//! query was issued under.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::executor::{ProviderError, ProviderTier};
use crate::models::{NewsItem, NewsQuery};

const SERPAPI_BASE_URL: &str = "https://serpapi.com/search";
const NEWSAPI_BASE_URL: &str = "https://newsapi.org/v2";
const WORLDNEWS_BASE_URL: &str = "https://api.worldnewsapi.com/search-news";
const HTTP_TIMEOUT_SECS: u64 = 15;

fn build_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|e| ProviderError::Network(e.to_string()))
}

/// Category tag applied to the fetched items: the first queried
/// category, or "general" for an uncategorized query
fn query_category(query: &NewsQuery) -> String {
    query
        .categories
        .as_ref()
        .and_then(|c| c.first().cloned())
        .unwrap_or_else(|| "general".to_string())
}

/// Search term for query-based APIs: categories OR-joined, or "news"
fn query_text(query: &NewsQuery) -> String {
    match &query.categories {
        Some(categories) if !categories.is_empty() => categories.join(" OR "),
        _ => "news".to_string(),
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.as_u16() == 429 {
        return Err(ProviderError::RateLimited);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api(status.as_u16(), body));
    }
    Ok(response)
}

// ============================================================================
// SerpAPI (Google News) - primary
// ============================================================================

pub struct SerpApiNews {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    news_results: Vec<SerpNewsResult>,
}

#[derive(Debug, Deserialize)]
struct SerpNewsResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    date: String,
    source: Option<SerpSource>,
}

#[derive(Debug, Deserialize)]
struct SerpSource {
    #[serde(default)]
    name: String,
}

impl SerpApiNews {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Ok(Self { client: build_client()?, api_key })
    }
}

#[async_trait]
impl ProviderTier<NewsQuery, Vec<NewsItem>> for SerpApiNews {
    fn name(&self) -> &str {
        "serpapi"
    }

    async fn call(&self, query: &NewsQuery) -> Result<Vec<NewsItem>, ProviderError> {
        let mut params = vec![
            ("engine".to_string(), "google_news".to_string()),
            ("q".to_string(), query_text(query)),
            ("num".to_string(), query.count.to_string()),
            ("api_key".to_string(), self.api_key.clone()),
        ];
        if !query.location.trim().is_empty() {
            params.push(("gl".to_string(), query.location.to_lowercase()));
        }

        let response = self
            .client
            .get(SERPAPI_BASE_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let response = check_status(response).await?;

        let parsed: SerpResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let category = query_category(query);
        let items = parsed
            .news_results
            .into_iter()
            .take(query.count)
            .map(|item| NewsItem {
                title: item.title,
                summary: item.snippet,
                source: item.source.map(|s| s.name).unwrap_or_else(|| "Unknown".to_string()),
                category: category.clone(),
                url: item.link,
                published_at: item.date,
            })
            .collect();

        Ok(items)
    }
}

// ============================================================================
// NewsAPI - fallback 1
// ============================================================================

pub struct NewsApiNews {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    #[serde(default)]
    title: String,
    description: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(rename = "publishedAt", default)]
    published_at: String,
    source: Option<NewsApiSource>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

/// Categories NewsAPI's top-headlines endpoint understands
const NEWSAPI_CATEGORIES: &[&str] =
    &["technology", "business", "entertainment", "health", "science", "sports"];

impl NewsApiNews {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Ok(Self { client: build_client()?, api_key })
    }
}

#[async_trait]
impl ProviderTier<NewsQuery, Vec<NewsItem>> for NewsApiNews {
    fn name(&self) -> &str {
        "newsapi"
    }

    async fn call(&self, query: &NewsQuery) -> Result<Vec<NewsItem>, ProviderError> {
        // Worldwide queries use /everything; located queries use
        // /top-headlines with NewsAPI's fixed category vocabulary
        let (url, mut params) = if query.location.trim().is_empty() {
            (
                format!("{}/everything", NEWSAPI_BASE_URL),
                vec![
                    ("q".to_string(), query_text(query)),
                    ("sortBy".to_string(), "publishedAt".to_string()),
                    ("language".to_string(), "en".to_string()),
                ],
            )
        } else {
            let mut params = vec![("country".to_string(), query.location.to_lowercase())];
            if let Some(categories) = &query.categories {
                // Top-headlines accepts a single category only
                if let Some(category) = categories
                    .iter()
                    .find(|c| NEWSAPI_CATEGORIES.contains(&c.to_lowercase().as_str()))
                {
                    params.push(("category".to_string(), category.to_lowercase()));
                }
            }
            (format!("{}/top-headlines", NEWSAPI_BASE_URL), params)
        };
        params.push(("pageSize".to_string(), query.count.to_string()));
        params.push(("apiKey".to_string(), self.api_key.clone()));

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let response = check_status(response).await?;

        let parsed: NewsApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let category = query_category(query);
        let items = parsed
            .articles
            .into_iter()
            .take(query.count)
            .map(|article| NewsItem {
                title: article.title,
                summary: article.description.unwrap_or_default(),
                source: article
                    .source
                    .and_then(|s| s.name)
                    .unwrap_or_else(|| "Unknown".to_string()),
                category: category.clone(),
                url: article.url,
                published_at: article.published_at,
            })
            .collect();

        Ok(items)
    }
}

// ============================================================================
// WorldNewsAPI - fallback 2
// ============================================================================

pub struct WorldNewsApi {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct WorldNewsResponse {
    #[serde(default)]
    news: Vec<WorldNewsItem>,
}

#[derive(Debug, Deserialize)]
struct WorldNewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    publish_date: String,
    source: Option<String>,
}

impl WorldNewsApi {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Ok(Self { client: build_client()?, api_key })
    }
}

#[async_trait]
impl ProviderTier<NewsQuery, Vec<NewsItem>> for WorldNewsApi {
    fn name(&self) -> &str {
        "worldnews"
    }

    async fn call(&self, query: &NewsQuery) -> Result<Vec<NewsItem>, ProviderError> {
        let mut params = vec![
            ("api-key".to_string(), self.api_key.clone()),
            ("text".to_string(), query_text(query)),
            ("number".to_string(), query.count.to_string()),
            ("sort".to_string(), "publish-time".to_string()),
            ("sort-direction".to_string(), "DESC".to_string()),
        ];
        if !query.location.trim().is_empty() {
            params.push(("source-countries".to_string(), query.location.to_lowercase()));
        }

        let response = self
            .client
            .get(WORLDNEWS_BASE_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let response = check_status(response).await?;

        let parsed: WorldNewsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let category = query_category(query);
        let items = parsed
            .news
            .into_iter()
            .take(query.count)
            .map(|item| {
                // Full article text comes back; keep a snippet as summary
                let summary: String = item.text.chars().take(200).collect();
                NewsItem {
                    title: item.title,
                    summary,
                    source: item.source.unwrap_or_else(|| "Unknown".to_string()),
                    category: category.clone(),
                    url: item.url,
                    published_at: item.publish_date,
                }
            })
            .collect();

        Ok(items)
    }
}
