//! Calendar provider tier (Google Calendar)
//!
//! Reads the owner's stored OAuth access token from the settings table
//! and fetches the day's events. An unconnected calendar is an
//! `Unavailable` tier error; the aggregator degrades it to an empty
//! activity list.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::time::Duration;

use crate::db::settings;
use crate::executor::{ProviderError, ProviderTier};
use crate::models::{CalendarEvent, CalendarQuery};

const CALENDAR_EVENTS_URL: &str =
    "https://www.googleapis.com/calendar/v3/calendars/primary/events";
const HTTP_TIMEOUT_SECS: u64 = 15;

pub struct GoogleCalendarClient {
    client: reqwest::Client,
    db: SqlitePool,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<GcalEvent>,
}

#[derive(Debug, Deserialize)]
struct GcalEvent {
    summary: Option<String>,
    location: Option<String>,
    start: Option<GcalTime>,
    end: Option<GcalTime>,
}

#[derive(Debug, Deserialize)]
struct GcalTime {
    /// RFC 3339 timestamp for timed events
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    /// YYYY-MM-DD for all-day events
    date: Option<String>,
}

impl GcalTime {
    fn resolve(&self) -> Option<(DateTime<Utc>, bool)> {
        if let Some(ts) = &self.date_time {
            let parsed = DateTime::parse_from_rfc3339(ts).ok()?;
            return Some((parsed.with_timezone(&Utc), false));
        }
        if let Some(day) = &self.date {
            let date = chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
            let midnight = date.and_time(NaiveTime::MIN).and_utc();
            return Some((midnight, true));
        }
        None
    }
}

impl GoogleCalendarClient {
    pub fn new(db: SqlitePool) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self { client, db })
    }
}

#[async_trait]
impl ProviderTier<CalendarQuery, Vec<CalendarEvent>> for GoogleCalendarClient {
    fn name(&self) -> &str {
        "google_calendar"
    }

    async fn call(&self, query: &CalendarQuery) -> Result<Vec<CalendarEvent>, ProviderError> {
        let token = settings::get_calendar_token(&self.db, query.owner_id)
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?
            .ok_or_else(|| {
                ProviderError::Unavailable("calendar not connected for owner".to_string())
            })?;

        let time_min = query.date.and_time(NaiveTime::MIN).and_utc();
        let time_max = time_min + chrono::Duration::days(1);

        let response = self
            .client
            .get(CALENDAR_EVENTS_URL)
            .bearer_auth(&token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", "10".to_string()),
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

        let parsed: EventsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let events = parsed
            .items
            .into_iter()
            .filter_map(|event| {
                let (start_time, all_day) = event.start.as_ref()?.resolve()?;
                Some(CalendarEvent {
                    title: event.summary.unwrap_or_else(|| "(untitled)".to_string()),
                    start_time,
                    end_time: event.end.as_ref().and_then(|t| t.resolve()).map(|(ts, _)| ts),
                    location: event.location,
                    all_day,
                })
            })
            .collect();

        Ok(events)
    }
}
