//! Data models for the generation service

pub mod album;
pub mod context;
pub mod run;
pub mod song;

pub use album::Album;
pub use context::{
    CalendarEvent, CalendarQuery, NewsItem, NewsQuery, SongContext, UserPreferences,
    WeatherQuery, WeatherReport, WeatherSnapshot,
};
pub use run::{FailureReason, GenerationRun, RejectionReason, RunState};
pub use song::{ComposeRequest, Song, SongSheet, SynthesisRequest, SynthesizedAudio};
