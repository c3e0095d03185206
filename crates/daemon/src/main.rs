//! Studio Daemon - Main Entry Point
//! Composition root: generation queue + image API + SQLite sinks + JSON-RPC server

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use config::StudioConfig;
use studio_api_rpc::{RpcHandler, RpcServer};
use studio_core::application::QueueProcessor;
use studio_core::port::id_provider::UuidProvider;
use studio_core::port::time_provider::SystemTimeProvider;
use studio_infra_http::ImageApiClient;
use studio_infra_sqlite::{create_pool, run_migrations, SqliteGallery, SqliteUsageRecorder};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration (before logging, which it configures)
    let config = StudioConfig::load()?;

    // 2. Initialize logging (+ optional OpenTelemetry)
    let (telemetry, otel_status) = telemetry::init(&config)?;
    info!("Studio daemon v{} starting...", VERSION);
    otel_status.log();

    // 3. Initialize database
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    info!(db_path = %db_path.display(), "Initializing database...");

    let pool = create_pool(&db_path.to_string_lossy())
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let gallery = Arc::new(SqliteGallery::new(pool.clone()));
    let usage = Arc::new(SqliteUsageRecorder::new(
        pool.clone(),
        time_provider.clone(),
    ));

    if config.image_api.api_key.is_empty() {
        warn!("No image API key configured (STUDIO_IMAGE_API__API_KEY); requests will be unauthenticated");
    }
    let generation = Arc::new(
        ImageApiClient::new(config.image_api_config())
            .map_err(|e| anyhow::anyhow!("Image API client setup failed: {}", e))?,
    );

    let processor_config = config.processor_config();
    info!(
        max_queue_size = processor_config.max_queue_size,
        usage_feature = %processor_config.usage_feature,
        generation_timeout = ?processor_config.generation_timeout,
        model = %config.image_api.model,
        "Queue processor configured"
    );
    let processor = QueueProcessor::new(
        processor_config,
        generation,
        gallery.clone(),
        usage.clone(),
        id_provider,
        time_provider,
    );

    // 5. Start JSON-RPC server
    let rpc_server = RpcServer::new(
        config.rpc_config(),
        RpcHandler::new(processor.clone(), gallery, usage),
    );
    let (addr, rpc_handle) = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, "System ready. Waiting for prompts...");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown; an in-flight generation is abandoned
    let snapshot = processor.snapshot();
    if let Some(active) = &snapshot.active_id {
        warn!(item_id = %active, "Abandoning in-flight generation");
    }
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), rpc_handle.stopped()).await;
    pool.close().await;

    info!("Shutdown complete.");
    telemetry.shutdown();

    Ok(())
}
