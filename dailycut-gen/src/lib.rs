//! dailycut-gen - Daily Song Generation Microservice
//!
//! Generates one personalized song per user per day from news,
//! weather, and calendar context, and files it into the user's weekly
//! vinyl album. The orchestration core - fallback execution across
//! provider tiers, the daily idempotency gate, the weekly album
//! lifecycle, and the pipeline state machine - lives in `services`
//! and `executor`; provider wire clients live in `providers`.

pub mod api;
pub mod db;
pub mod error;
pub mod executor;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use dailycut_common::events::EventBus;

use crate::services::pipeline::GenerationPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// The generation pipeline coordinator
    pub pipeline: Arc<GenerationPipeline>,
    /// Cancelled on shutdown; in-flight runs observe child tokens
    pub shutdown: CancellationToken,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, pipeline: GenerationPipeline) -> Self {
        Self {
            db,
            event_bus,
            pipeline: Arc::new(pipeline),
            shutdown: CancellationToken::new(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .merge(api::generate_routes())
        .merge(api::song_routes())
        .merge(api::album_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
