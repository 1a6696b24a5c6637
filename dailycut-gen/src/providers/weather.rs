//! Weather provider tier (OpenWeather)

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::executor::{ProviderError, ProviderTier};
use crate::models::{WeatherQuery, WeatherReport};

const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const HTTP_TIMEOUT_SECS: u64 = 15;

pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct OwResponse {
    name: String,
    sys: Option<OwSys>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwCondition>,
    wind: Option<OwWind>,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    /// Celsius (requested with units=metric)
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    /// Metres per second
    speed: f64,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl ProviderTier<WeatherQuery, WeatherReport> for OpenWeatherClient {
    fn name(&self) -> &str {
        "openweather"
    }

    async fn call(&self, query: &WeatherQuery) -> Result<WeatherReport, ProviderError> {
        let response = self
            .client
            .get(OPENWEATHER_BASE_URL)
            .query(&[
                ("q", query.location.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let parsed: OwResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let temp_c = parsed.main.temp;
        let report = WeatherReport {
            city: parsed.name,
            country: parsed
                .sys
                .and_then(|s| s.country)
                .unwrap_or_default(),
            condition: parsed
                .weather
                .first()
                .map(|w| w.main.clone())
                .unwrap_or_else(|| "Clear".to_string()),
            temp_c,
            temp_f: temp_c * 9.0 / 5.0 + 32.0,
            humidity: parsed.main.humidity,
            wind_kph: parsed.wind.map(|w| w.speed * 3.6).unwrap_or(0.0),
        };

        tracing::debug!(
            city = %report.city,
            condition = %report.condition,
            temp_c = report.temp_c,
            "Weather fetched"
        );

        Ok(report)
    }
}
