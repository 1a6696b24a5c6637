//! Weekly album model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of songs that completes a weekly album
pub const SONGS_PER_ALBUM: i64 = 7;

/// Weekly album: the 7-day grouping of daily cuts sharing one vinyl
/// disk artwork. Identity is `(owner_id, week_start)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub guid: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Monday of the album's week (UTC)
    pub week_start: NaiveDate,
    /// Sunday of the album's week (UTC)
    pub week_end: NaiveDate,
    /// Asset store reference to the vinyl disk artwork; None until the
    /// first successful generation of the week, set exactly once
    pub vinyl_disk_ref: Option<String>,
    pub song_count: i64,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
}

impl Album {
    /// Create a new empty album for an owner's week
    pub fn new(owner_id: Uuid, week_start: NaiveDate, week_end: NaiveDate) -> Self {
        Self {
            guid: Uuid::new_v4(),
            owner_id,
            name: format!("Week of {}", week_start.format("%B %-d, %Y")),
            week_start,
            week_end,
            vinyl_disk_ref: None,
            song_count: 0,
            is_complete: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_album_starts_empty() {
        let week_start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let week_end = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
        let album = Album::new(Uuid::new_v4(), week_start, week_end);

        assert_eq!(album.song_count, 0);
        assert!(!album.is_complete);
        assert!(album.vinyl_disk_ref.is_none());
        assert_eq!(album.name, "Week of March 10, 2025");
    }
}
