//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root folder resolution priority order:
/// 1. Environment variable (highest priority)
/// 2. TOML config file (`root_folder` key)
/// 3. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: TOML config file
    if let Ok(config_path) = load_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(root_folder));
                }
            }
        }
    }

    // Priority 3: OS-dependent compiled default
    Ok(get_default_root_folder())
}

/// Get default configuration file path for the platform
fn load_config_file() -> Result<PathBuf> {
    let config_path = dirs::config_dir()
        .map(|d| d.join("dailycut").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", config_path)))
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("dailycut"))
        .unwrap_or_else(|| PathBuf::from("./dailycut_data"))
}

/// Tunables for the generation service
///
/// All values have compiled defaults; a `[generation]` table in the
/// config file under the root folder overrides them individually.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Maximum successful generations per owner per UTC day
    pub daily_limit: u32,
    /// Number of news items requested per generation
    pub news_request_size: usize,
    /// Share of the news selection drawn from preferred categories
    pub preferred_news_share: f64,
    /// News cache time-to-live
    pub news_cache_ttl: Duration,
    /// Weather cache time-to-live
    pub weather_cache_ttl: Duration,
    /// Timeout applied to each news/weather/calendar/text/image tier call
    pub short_call_timeout: Duration,
    /// Timeout applied to the audio synthesis call (minutes-scale)
    pub synthesis_timeout: Duration,
    /// Margin added to the synthesis timeout before an abandoned
    /// in-flight lock may be displaced
    pub lock_stale_margin: Duration,
    /// Output size of the vinyl disk artwork in pixels
    pub disk_size: u32,
    /// HTTP bind address
    pub bind_addr: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            daily_limit: 3,
            news_request_size: 10,
            preferred_news_share: 0.7,
            news_cache_ttl: Duration::from_secs(3600),
            weather_cache_ttl: Duration::from_secs(1800),
            short_call_timeout: Duration::from_secs(20),
            synthesis_timeout: Duration::from_secs(900),
            lock_stale_margin: Duration::from_secs(60),
            disk_size: 1000,
            bind_addr: "127.0.0.1:5780".to_string(),
        }
    }
}

impl GenerationConfig {
    /// Load config from `<root>/dailycut.toml`, falling back to defaults
    /// for any key not present (or for a missing file entirely).
    pub fn load(root_folder: &Path) -> Self {
        let mut config = Self::default();
        let path = root_folder.join("dailycut.toml");

        let Ok(content) = std::fs::read_to_string(&path) else {
            return config;
        };
        let Ok(value) = toml::from_str::<toml::Value>(&content) else {
            tracing::warn!(path = %path.display(), "Ignoring unparseable config file");
            return config;
        };
        let Some(table) = value.get("generation") else {
            return config;
        };

        if let Some(v) = table.get("daily_limit").and_then(|v| v.as_integer()) {
            config.daily_limit = v.max(1) as u32;
        }
        if let Some(v) = table.get("news_request_size").and_then(|v| v.as_integer()) {
            config.news_request_size = v.max(1) as usize;
        }
        if let Some(v) = table.get("preferred_news_share").and_then(|v| v.as_float()) {
            if v > 0.0 && v < 1.0 {
                config.preferred_news_share = v;
            }
        }
        if let Some(v) = table.get("news_cache_ttl_seconds").and_then(|v| v.as_integer()) {
            config.news_cache_ttl = Duration::from_secs(v.max(0) as u64);
        }
        if let Some(v) = table.get("weather_cache_ttl_seconds").and_then(|v| v.as_integer()) {
            config.weather_cache_ttl = Duration::from_secs(v.max(0) as u64);
        }
        if let Some(v) = table.get("short_call_timeout_seconds").and_then(|v| v.as_integer()) {
            config.short_call_timeout = Duration::from_secs(v.max(1) as u64);
        }
        if let Some(v) = table.get("synthesis_timeout_seconds").and_then(|v| v.as_integer()) {
            config.synthesis_timeout = Duration::from_secs(v.max(1) as u64);
        }
        if let Some(v) = table.get("lock_stale_margin_seconds").and_then(|v| v.as_integer()) {
            config.lock_stale_margin = Duration::from_secs(v.max(0) as u64);
        }
        if let Some(v) = table.get("disk_size").and_then(|v| v.as_integer()) {
            config.disk_size = v.clamp(64, 4096) as u32;
        }
        if let Some(v) = table.get("bind_addr").and_then(|v| v.as_str()) {
            config.bind_addr = v.to_string();
        }

        config
    }

    /// Horizon after which an in-flight lock is considered abandoned.
    ///
    /// Equal to the maximum synthesis timeout plus margin - the only
    /// time-based lock recovery mechanism in the system.
    pub fn stale_lock_horizon(&self) -> Duration {
        self.synthesis_timeout + self.lock_stale_margin
    }
}

/// Provider API credentials, read from the environment.
///
/// A missing key disables that provider tier rather than failing
/// startup; the fallback executor simply has fewer tiers to try.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    pub serpapi_key: Option<String>,
    pub newsapi_key: Option<String>,
    pub worldnews_key: Option<String>,
    pub openweather_key: Option<String>,
    pub openai_key: Option<String>,
    pub gemini_key: Option<String>,
    pub synth_api_key: Option<String>,
    pub synth_endpoint_id: Option<String>,
}

impl ProviderKeys {
    pub fn from_env() -> Self {
        fn read(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }

        Self {
            serpapi_key: read("SERPAPI_API_KEY"),
            newsapi_key: read("NEWSAPI_API_KEY"),
            worldnews_key: read("WORLDNEWS_API_KEY"),
            openweather_key: read("OPENWEATHER_API_KEY"),
            openai_key: read("OPENAI_API_KEY"),
            gemini_key: read("GEMINI_API_KEY"),
            synth_api_key: read("SYNTH_API_KEY"),
            synth_endpoint_id: read("SYNTH_ENDPOINT_ID"),
        }
    }
}
