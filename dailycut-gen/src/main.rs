//! dailycut-gen - Daily Song Generation Microservice
//!
//! Startup: resolve the root folder, open the SQLite database, wire
//! the provider tiers from environment credentials, and serve the
//! generation API.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dailycut_common::config::{self, GenerationConfig, ProviderKeys};
use dailycut_common::events::EventBus;

use dailycut_gen::providers::ProviderSet;
use dailycut_gen::services::pipeline::GenerationPipeline;
use dailycut_gen::storage::AssetStore;
use dailycut_gen::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting dailycut-gen (Daily Song Generation) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve root folder and load tunables
    let root_folder = config::resolve_root_folder("DAILYCUT_ROOT")?;
    std::fs::create_dir_all(&root_folder)?;
    info!("Root folder: {}", root_folder.display());

    let gen_config = GenerationConfig::load(&root_folder);
    info!(
        daily_limit = gen_config.daily_limit,
        synthesis_timeout_secs = gen_config.synthesis_timeout.as_secs(),
        "Configuration loaded"
    );

    // Step 2: Open or create database
    let db_path = root_folder.join("dailycut.db");
    info!("Database: {}", db_path.display());
    let db_pool = dailycut_gen::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Step 3: Asset store and event bus
    let assets = AssetStore::open(&root_folder)?;
    let event_bus = EventBus::new(100);
    info!("Event bus initialized");

    // Step 4: Provider tiers from environment credentials
    let keys = ProviderKeys::from_env();
    let providers = ProviderSet::from_keys(&keys, db_pool.clone(), &gen_config);
    info!(
        news_tiers = providers.news.len(),
        textgen_tiers = providers.textgen.len(),
        imagegen_tiers = providers.imagegen.len(),
        synth_tiers = providers.synth.len(),
        "Provider tiers configured"
    );

    // Step 5: Pipeline and application state
    let pipeline = GenerationPipeline::new(
        db_pool.clone(),
        event_bus.clone(),
        providers,
        assets,
        gen_config.clone(),
    );
    let state = AppState::new(db_pool, event_bus, pipeline);
    let shutdown = state.shutdown.clone();

    // Step 6: Serve
    let app = dailycut_gen::build_router(state);
    let listener = tokio::net::TcpListener::bind(&gen_config.bind_addr).await?;
    info!("Listening on http://{}", gen_config.bind_addr);
    info!("Health check: http://{}/health", gen_config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, cancelling in-flight runs");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
